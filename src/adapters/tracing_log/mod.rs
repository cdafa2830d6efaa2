// Tracing log adapter - Subscriber setup for the binary

use tracing_subscriber::EnvFilter;

use crate::domain::errors::*;

/// Log level accepted by the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::Config(format!(
                "invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when it is set. Logs go to
/// stderr so task output on stdout stays clean.
pub fn init_tracing(level: LogLevel, json: bool) -> DomainResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_directive()))
        .map_err(|e| DomainError::Config(format!("invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| DomainError::Config(format!("failed to install log subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(LogLevel::parse("DEBUG").unwrap(), LogLevel::Debug);
        assert!(LogLevel::parse("loud").is_err());
    }

    #[test]
    fn levels_order_from_verbose_to_quiet() {
        assert!(LogLevel::Trace < LogLevel::Error);
    }
}
