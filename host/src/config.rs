//! CLI-flags-over-config-file merge (§10.3): a `clap` derive struct for the
//! flags plus an optional TOML file read the way Hubris's `packager` reads
//! its build manifests, CLI values winning over file values.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
  pub target: Option<SocketAddr>,
  pub card_id: Option<u8>,
  pub credit_unit: Option<String>,
  pub cred_wait_ms: Option<u64>,
}

impl FileConfig {
  pub fn load(path: &Path) -> Result<Self, crate::Error> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|source| crate::Error::Config {
      path: path.display().to_string(),
      source,
    })
  }
}

/// Resolved settings the rest of `host` operates on, after merging a
/// config file (if any) under explicit CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
  pub target: SocketAddr,
  pub card_id: u8,
  pub cred_wait_ms: u64,
}

impl Settings {
  pub fn resolve(file: FileConfig, target: Option<SocketAddr>, card_id: Option<u8>, cred_wait_ms: Option<u64>) -> anyhow::Result<Self> {
    let target = target
      .or(file.target)
      .ok_or_else(|| anyhow::anyhow!("no target address given on the CLI or in the config file"))?;
    let card_id = card_id.or(file.card_id).unwrap_or(0);
    let cred_wait_ms = cred_wait_ms.or(file.cred_wait_ms).unwrap_or(1000);
    Ok(Settings { target, card_id, cred_wait_ms })
  }
}
