//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use byocar_core::Error;
use clap::Parser;

/// Exporter configuration.
///
/// Every option can also be set through the upper-snake-case environment
/// variable of the same name.
#[derive(Debug, Clone, Parser)]
#[command(name = "byocar-exporter", version, about)]
pub struct Config {
    /// Client-ID of the Mercedes Developers Console app
    #[arg(long, env = "CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// Client-Secret of the Mercedes Developers Console app
    #[arg(long, env = "CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub client_secret: String,

    /// Where to store tokens when using client-id from the command line
    #[arg(long, env = "CREDENTIAL_FILE", default_value = "credentials.json")]
    pub credential_file: PathBuf,

    /// How often to ask the Mercedes API for updates
    #[arg(long, env = "FETCH_INTERVAL", default_value = "15m", value_parser = parse_interval)]
    pub fetch_interval: Duration,

    /// Set to url (http[s]://user:pass@host[:port]/database) to enable Influx exporter
    #[arg(long, env = "INFLUX_EXPORT", default_value = "", hide_env_values = true)]
    pub influx_export: String,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Redirect URL registered in the Mercedes Developers Console
    #[arg(
        long,
        env = "REDIRECT_URL",
        default_value = "http://127.0.0.1:3000/store-token"
    )]
    pub redirect_url: String,

    /// Use credentials from and update them in Vault at this key
    #[arg(long, env = "VAULT_KEY", default_value = "")]
    pub vault_key: String,

    /// Vehicle identification number (e.g. WDB111111ZZZ22222)
    #[arg(long = "vehicle-id", env = "VEHICLE_ID", value_delimiter = ',')]
    pub vehicle_id: Vec<String>,
}

/// Where client credentials and tokens are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSelection {
    File {
        path: PathBuf,
        client_id: String,
        client_secret: String,
    },
    Vault {
        key: String,
    },
}

impl Config {
    /// Configured vehicle ids, ignoring empty entries.
    pub fn vehicle_ids(&self) -> Vec<String> {
        self.vehicle_id
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The Influx connection URL, if that exporter is enabled.
    pub fn influx_export(&self) -> Option<&str> {
        Some(self.influx_export.trim()).filter(|url| !url.is_empty())
    }

    /// Check option combinations that clap cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        let message = if self.vehicle_ids().is_empty() {
            "at least one vehicle-id is required"
        } else if self.vault_key.is_empty() && self.client_id.is_empty() {
            "either vault-key or client-id/secret is required"
        } else if !self.client_id.is_empty() && self.client_secret.is_empty() {
            "client-id is set and client-secret is not"
        } else if !self.client_id.is_empty() && !self.vault_key.is_empty() {
            "client-id and vault-key are configured, use only one of them"
        } else {
            return Ok(());
        };

        Err(Error::Config {
            message: message.to_string(),
        })
    }

    /// The credential store backend selected by the options.
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeded.
    pub fn store_selection(&self) -> StoreSelection {
        if self.client_id.is_empty() {
            StoreSelection::Vault {
                key: self.vault_key.clone(),
            }
        } else {
            StoreSelection::File {
                path: self.credential_file.clone(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
            }
        }
    }
}

/// Parse a duration such as `90s`, `15m` or `1h30m`.
///
/// Zero is rejected since the fetch loop would spin.
pub fn parse_interval(input: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(input.trim())
        .map_err(|e| format!("invalid duration {:?}: {}", input, e))?;

    if interval.is_zero() {
        return Err("fetch interval must be greater than zero".to_string());
    }

    Ok(interval)
}
