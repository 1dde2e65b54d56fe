use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::state::{AppState, Session};

/// Persisted login state and account selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(rename = "userToken", default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    #[serde(rename = "userMail", default, skip_serializing_if = "Option::is_none")]
    pub user_mail: Option<String>,
    #[serde(rename = "selectedAccounts", default)]
    pub selected_accounts: Vec<String>,
}

pub fn session_path() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join(".local")
                .join("share")
        });
    base.join("ccost").join("session.json")
}

impl SessionFile {
    pub fn load() -> Self {
        Self::load_from(&session_path())
    }

    /// Load the session file, or an empty session if it is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&session_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write session to {}", path.display()))?;
        Ok(())
    }

    pub fn into_state(self) -> AppState {
        AppState::new(
            Session {
                token: self.user_token,
                mail: self.user_mail,
            },
            self.selected_accounts,
        )
    }

    /// Take over the session of `state`, keeping the account selection.
    pub fn sync_from(&mut self, state: &AppState) {
        self.user_token = state.session.token.clone();
        self.user_mail = state.session.mail.clone();
    }

    pub fn clear_login(&mut self) {
        self.user_token = None;
        self.user_mail = None;
    }
}
