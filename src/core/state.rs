use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::core::formatter::Granularity;
use crate::core::models::cost_tree::CostTree;
use crate::core::models::resources::{Account, BucketStat, InstanceReport};
use crate::core::models::series::DifferentiatorTable;

/// Identifies one sequence invocation against one state slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub key: String,
    pub generation: u64,
}

/// Read-only snapshot handed to a sequence when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub token: Option<String>,
    pub account_scope: Vec<String>,
    pub ticket: Ticket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Costs(CostTree),
    Accounts(Vec<Account>),
    Differentiator(DifferentiatorTable),
    Buckets(Vec<BucketStat>),
    Instances(Vec<InstanceReport>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Data { key: String, payload: Payload },
    Interval { key: String, interval: Interval },
    Login { token: String, mail: String },
}

/// The single terminal state update of a sequence invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Logout,
    Success { ticket: Ticket, patches: Vec<Patch> },
    Failed { ticket: Ticket, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// A newer invocation for the same slice was started; nothing changed.
    Stale,
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SliceStatus {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    #[serde(skip)]
    pub generation: u64,
    pub status: SliceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub mail: Option<String>,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub session: Session,
    pub selected_accounts: Vec<String>,
    slices: HashMap<String, Slice>,
}

impl AppState {
    pub fn new(session: Session, selected_accounts: Vec<String>) -> Self {
        Self {
            session,
            selected_accounts,
            slices: HashMap::new(),
        }
    }

    /// Start an invocation for `key`: bump its generation, mark it loading and
    /// snapshot the token and account scope.
    pub fn begin(&mut self, key: &str) -> Context {
        let slice = self.slices.entry(key.to_string()).or_insert(Slice {
            generation: 0,
            status: SliceStatus::Loading,
            payload: None,
            interval: None,
        });
        slice.generation += 1;
        slice.status = SliceStatus::Loading;

        Context {
            token: self.session.token.clone(),
            account_scope: self.selected_accounts.clone(),
            ticket: Ticket {
                key: key.to_string(),
                generation: slice.generation,
            },
        }
    }

    pub fn apply(&mut self, emission: Emission) -> Applied {
        match emission {
            Emission::Logout => {
                tracing::info!("session expired, logging out");
                self.session = Session::default();
                self.slices.clear();
                Applied::LoggedOut
            }
            Emission::Success { ticket, patches } => {
                if self.is_stale(&ticket) {
                    return Applied::Stale;
                }
                for patch in patches {
                    self.apply_patch(patch);
                }
                if let Some(slice) = self.slices.get_mut(&ticket.key) {
                    slice.status = SliceStatus::Ready;
                }
                Applied::Updated
            }
            Emission::Failed { ticket, message } => {
                if self.is_stale(&ticket) {
                    return Applied::Stale;
                }
                let slice = self.slice_mut(&ticket.key);
                slice.status = SliceStatus::Failed(message);
                slice.payload = None;
                Applied::Updated
            }
        }
    }

    pub fn slice(&self, key: &str) -> Option<&Slice> {
        self.slices.get(key)
    }

    fn is_stale(&self, ticket: &Ticket) -> bool {
        let stale = self
            .slices
            .get(&ticket.key)
            .is_some_and(|slice| slice.generation > ticket.generation);
        if stale {
            tracing::debug!(key = %ticket.key, generation = ticket.generation, "dropping stale emission");
        }
        stale
    }

    fn slice_mut(&mut self, key: &str) -> &mut Slice {
        self.slices.entry(key.to_string()).or_insert(Slice {
            generation: 0,
            status: SliceStatus::Loading,
            payload: None,
            interval: None,
        })
    }

    fn apply_patch(&mut self, patch: Patch) {
        match patch {
            Patch::Data { key, payload } => {
                self.slice_mut(&key).payload = Some(payload);
            }
            Patch::Interval { key, interval } => {
                self.slice_mut(&key).interval = Some(interval);
            }
            Patch::Login { token, mail } => {
                self.session = Session {
                    token: Some(token),
                    mail: Some(mail),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in() -> AppState {
        AppState::new(
            Session {
                token: Some("tok".into()),
                mail: Some("me@example.com".into()),
            },
            vec!["111".into()],
        )
    }

    fn accounts_patch(key: &str) -> Patch {
        Patch::Data {
            key: key.into(),
            payload: Payload::Accounts(vec![]),
        }
    }

    #[test]
    fn begin_snapshots_context() {
        let mut state = logged_in();
        let ctx = state.begin("costs");
        assert_eq!(ctx.token.as_deref(), Some("tok"));
        assert_eq!(ctx.account_scope, vec!["111".to_string()]);
        assert_eq!(ctx.ticket.generation, 1);
        assert_eq!(state.slice("costs").unwrap().status, SliceStatus::Loading);
    }

    #[test]
    fn success_applies_all_patches_together() {
        let mut state = logged_in();
        let ctx = state.begin("costs");
        let interval = Interval {
            begin: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            granularity: Granularity::Day,
        };
        let applied = state.apply(Emission::Success {
            ticket: ctx.ticket,
            patches: vec![
                Patch::Data {
                    key: "costs".into(),
                    payload: Payload::Costs(CostTree::default()),
                },
                Patch::Interval {
                    key: "costs".into(),
                    interval,
                },
            ],
        });
        assert_eq!(applied, Applied::Updated);
        let slice = state.slice("costs").unwrap();
        assert_eq!(slice.status, SliceStatus::Ready);
        assert_eq!(slice.payload, Some(Payload::Costs(CostTree::default())));
        assert_eq!(slice.interval, Some(interval));
    }

    #[test]
    fn failure_records_message() {
        let mut state = logged_in();
        let ctx = state.begin("s3");
        state.apply(Emission::Failed {
            ticket: ctx.ticket,
            message: "Error with request".into(),
        });
        assert_eq!(
            state.slice("s3").unwrap().status,
            SliceStatus::Failed("Error with request".into())
        );
    }

    #[test]
    fn stale_emission_is_ignored() {
        let mut state = logged_in();
        let first = state.begin("accounts");
        let second = state.begin("accounts");

        assert_eq!(
            state.apply(Emission::Success {
                ticket: second.ticket,
                patches: vec![accounts_patch("accounts")],
            }),
            Applied::Updated
        );
        assert_eq!(
            state.apply(Emission::Failed {
                ticket: first.ticket,
                message: "late".into(),
            }),
            Applied::Stale
        );
        assert_eq!(state.slice("accounts").unwrap().status, SliceStatus::Ready);
    }

    #[test]
    fn slices_are_independent() {
        let mut state = logged_in();
        let a = state.begin("a");
        let _b = state.begin("b");
        state.apply(Emission::Success {
            ticket: a.ticket,
            patches: vec![accounts_patch("a")],
        });
        assert_eq!(state.slice("a").unwrap().status, SliceStatus::Ready);
        assert_eq!(state.slice("b").unwrap().status, SliceStatus::Loading);
    }

    #[test]
    fn logout_clears_session_and_slices() {
        let mut state = logged_in();
        state.begin("costs");
        assert_eq!(state.apply(Emission::Logout), Applied::LoggedOut);
        assert_eq!(state.session, Session::default());
        assert!(state.slice("costs").is_none());
    }

    #[test]
    fn login_patch_sets_session() {
        let mut state = AppState::default();
        let ctx = state.begin("session");
        assert!(ctx.token.is_none());
        state.apply(Emission::Success {
            ticket: ctx.ticket,
            patches: vec![Patch::Login {
                token: "new".into(),
                mail: "a@b.c".into(),
            }],
        });
        assert_eq!(state.session.token.as_deref(), Some("new"));
        assert_eq!(state.session.mail.as_deref(), Some("a@b.c"));
    }
}
