use std::io::IsTerminal;

use serde::Serialize;

use crate::core::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub detailed: bool,
}

impl OutputOptions {
    /// Command-line flags win over the config file settings.
    pub fn resolve(
        format_flag: Option<&str>,
        json_flag: bool,
        pretty: bool,
        no_color: bool,
        settings: &Settings,
    ) -> Self {
        let format = if json_flag {
            OutputFormat::Json
        } else {
            match format_flag.unwrap_or(settings.default_format.as_str()) {
                "json" => OutputFormat::Json,
                _ => OutputFormat::Text,
            }
        };
        let use_color = match settings.color.as_str() {
            _ if no_color => false,
            "always" => true,
            "never" => false,
            _ => detect_color(),
        };
        Self {
            format,
            pretty,
            use_color,
            detailed: false,
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", json);
        Ok(())
    }
}

pub fn detect_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}
