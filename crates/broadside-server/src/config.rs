//! Server configuration from environment variables.

use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_SCRIPTED_DELAY_MS: u64 = 1500;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SERVER_ADDR`
    pub addr: SocketAddr,
    /// `BROADSIDE_DATA_DIR`, root of the snapshot store
    pub data_dir: PathBuf,
    /// `BROADSIDE_SCRIPTED_DELAY_MS`, pause before the computer replies
    pub scripted_delay: Duration,
    /// `BROADSIDE_PERSIST`, whether snapshots are written at all
    pub persist: bool,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.into())
            .parse()
            .context("SERVER_ADDR is not a socket address")?;

        let data_dir = lookup("BROADSIDE_DATA_DIR")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.into())
            .into();

        let delay_ms = match lookup("BROADSIDE_SCRIPTED_DELAY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("BROADSIDE_SCRIPTED_DELAY_MS is not a number")?,
            None => DEFAULT_SCRIPTED_DELAY_MS,
        };
        if delay_ms == 0 {
            bail!("BROADSIDE_SCRIPTED_DELAY_MS must be positive");
        }

        let persist = match lookup("BROADSIDE_PERSIST").as_deref() {
            None => true,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => bail!("BROADSIDE_PERSIST has unexpected value {other:?}"),
        };

        Ok(Self {
            addr,
            data_dir,
            scripted_delay: Duration::from_millis(delay_ms),
            persist,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 8080).into(),
            data_dir: DEFAULT_DATA_DIR.into(),
            scripted_delay: Duration::from_millis(DEFAULT_SCRIPTED_DELAY_MS),
            persist: true,
        }
    }
}
