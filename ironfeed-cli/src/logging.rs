//! Diagnostic logging for the ironfeed CLI.
//!
//! Engine and fetcher diagnostics are written to stderr. Stdout is
//! reserved for rendered records, status lines and `--output json`
//! documents, so piping `ironfeed run --output json` stays parseable
//! whatever the log level.

use anyhow::{Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use ironfeed_core::config::GeneralConfig;

/// Shape of the diagnostic lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// One JSON object per event, for log shippers.
    Json,
    /// Multi-line colored output for someone watching a terminal.
    Pretty,
}

impl LogFormat {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => bail!("general.log_format must be 'json' or 'pretty', got '{other}'"),
        }
    }

    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer().with_writer(std::io::stderr);
        match self {
            Self::Json => layer.json().boxed(),
            Self::Pretty => layer.pretty().boxed(),
        }
    }
}

/// Install the process-wide subscriber for an ironfeed invocation.
///
/// `RUST_LOG` takes precedence over `general.log_level` (which `--log-level`
/// has already overridden). Fails when the format is unknown or a
/// subscriber is already installed.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format = LogFormat::parse(&config.log_format)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(format.layer())
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install {format:?} log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse_known_names() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_init_tracing_rejects_unknown_format_before_installing() {
        let config = GeneralConfig {
            log_format: "xml".to_owned(),
            ..GeneralConfig::default()
        };
        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("general.log_format"), "got: {err}");
    }
}
