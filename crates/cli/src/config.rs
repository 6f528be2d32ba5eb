//! Configuration file for the CLI

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::OptionExt;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use nexum_card_request::{AtrCardType, RequestConfig, Timeout};
use serde::{Deserialize, Serialize};

use crate::WaitArgs;

/// Timeout used when neither the command line nor the file sets one
pub(crate) const DEFAULT_WAIT_SECS: f64 = 10.0;

/// Settings read from `~/.nxm/card-request.toml`
///
/// Every key can also be set through a `CARD_REQUEST_` environment variable.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub(crate) struct Config {
    /// Seconds to wait for a card
    #[serde(default)]
    pub(crate) timeout: Option<f64>,
    /// Length of a single status change wait
    #[serde(default)]
    pub(crate) polling_interval_ms: Option<u64>,
    /// Readers to watch instead of every reader
    #[serde(default)]
    pub(crate) readers: Vec<String>,
    /// ATR pattern cards must match
    #[serde(default)]
    pub(crate) atr: Option<String>,
}

impl Config {
    /// Request configuration for `args`, command-line values taking precedence
    pub(crate) fn request_config(&self, args: &WaitArgs) -> eyre::Result<RequestConfig> {
        let mut config = RequestConfig::new().with_timeout(self.timeout(args));

        if let Some(millis) = self.polling_interval_ms {
            config = config.with_polling_interval(Duration::from_millis(millis));
        }

        let readers = if args.readers.is_empty() {
            &self.readers
        } else {
            &args.readers
        };
        if !readers.is_empty() {
            config = config.with_readers(readers.iter().cloned());
        }

        if let Some(pattern) = args.atr.as_ref().or(self.atr.as_ref()) {
            config = config.with_card_type(AtrCardType::from_pattern(pattern)?);
        }

        Ok(config)
    }

    fn timeout(&self, args: &WaitArgs) -> Timeout {
        if args.forever {
            return Timeout::Infinite;
        }
        Timeout::from_secs_f64(args.timeout.or(self.timeout).unwrap_or(DEFAULT_WAIT_SECS))
    }
}

/// Returns the base config directory for nexum
pub(crate) fn config_dir() -> eyre::Result<PathBuf> {
    Ok(std::env::home_dir()
        .ok_or_eyre("home directory not found")?
        .join(".nxm"))
}

/// Load the configuration from `path`, or from the default location
///
/// A missing default file yields the defaults, a missing explicit file is an
/// error.
pub(crate) fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let file = match path {
        Some(path) if !path.exists() => {
            eyre::bail!("config file {} not found", path.display())
        }
        Some(path) => path.to_path_buf(),
        None => config_dir()?.join("card-request.toml"),
    };

    Ok(Figment::new()
        .merge(Toml::file(file))
        .merge(Env::prefixed("CARD_REQUEST_"))
        .extract()?)
}
