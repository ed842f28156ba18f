use std::env;

pub const SERVICE_NAME_ENV: &str = "MESSAGING_SERVICE_NAME";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub service_name: String,
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl LoggingConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        let service_name =
            env::var(SERVICE_NAME_ENV).unwrap_or_else(|_| default_service_name.to_string());
        let format = env::var(LOG_FORMAT_ENV)
            .map(|v| parse_format(&v))
            .unwrap_or(LogFormat::Json);

        Self {
            service_name,
            format,
            default_filter: "info".into(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

fn parse_format(value: &str) -> LogFormat {
    match value.trim().to_lowercase().as_str() {
        "text" | "pretty" | "plain" => LogFormat::Text,
        _ => LogFormat::Json,
    }
}
