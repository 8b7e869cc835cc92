use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::journal::TailPolicy;
use crate::session::{LengthPolicy, SessionOptions, DEFAULT_CHUNK_SIZE, DEFAULT_MULTIPLICITY};
use crate::speed;
use crate::transport::TransportOptions;

/// Global configuration loaded from `~/.config/mfetch/config.toml`.
/// Command-line flags override individual values per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfetchConfig {
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Concurrent connections per mirror.
    pub multiplicity: usize,
    /// Total time allowed for one chunk fetch, in seconds.
    pub attempt_timeout_secs: u64,
    /// Time allowed to establish a connection, in seconds.
    pub connect_timeout_secs: u64,
    /// User-Agent sent with every request (None = `mfetch/<version>`).
    pub user_agent: Option<String>,
    /// "unanimous" (default) or "first_success".
    pub length_policy: LengthPolicy,
    /// "strict" (default) refuses a journal with a partial last record;
    /// "truncate" cuts it off and resumes.
    pub journal_tail: TailPolicy,
    /// Smoothing age of the speed estimate, in chunks.
    pub ewma_age: f64,
}

impl Default for MfetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            multiplicity: DEFAULT_MULTIPLICITY,
            attempt_timeout_secs: 30,
            connect_timeout_secs: 15,
            user_agent: None,
            length_policy: LengthPolicy::default(),
            journal_tail: TailPolicy::default(),
            ewma_age: speed::DEFAULT_AGE,
        }
    }
}

impl MfetchConfig {
    pub fn transport_options(&self) -> TransportOptions {
        let mut opts = TransportOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            ..TransportOptions::default()
        };
        if let Some(ua) = &self.user_agent {
            opts.user_agent = ua.clone();
        }
        opts
    }

    /// Session options with no cancellation token attached.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            chunk_size: self.chunk_size,
            multiplicity: self.multiplicity,
            length_policy: self.length_policy,
            journal_tail: self.journal_tail,
            ewma_age: self.ewma_age,
            cancel: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MfetchConfig> {
    load_or_init_at(&config_path()?)
}

fn load_or_init_at(path: &Path) -> Result<MfetchConfig> {
    if !path.exists() {
        let default_cfg = MfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: MfetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = MfetchConfig::default();
        assert_eq!(cfg.chunk_size, 4 * 1024 * 1024);
        assert_eq!(cfg.multiplicity, 3);
        assert_eq!(cfg.attempt_timeout_secs, 30);
        assert_eq!(cfg.length_policy, LengthPolicy::Unanimous);
        assert_eq!(cfg.journal_tail, TailPolicy::Strict);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = MfetchConfig {
            user_agent: Some("probe/1".into()),
            ..MfetchConfig::default()
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: MfetchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml = r#"
            chunk_size = 1048576
            length_policy = "first_success"
            journal_tail = "truncate"
        "#;
        let cfg: MfetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.chunk_size, 1 << 20);
        assert_eq!(cfg.multiplicity, 3);
        assert_eq!(cfg.length_policy, LengthPolicy::FirstSuccess);
        assert_eq!(cfg.journal_tail, TailPolicy::Truncate);
        assert!(cfg.user_agent.is_none());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(toml::from_str::<MfetchConfig>(r#"length_policy = "majority""#).is_err());
    }

    #[test]
    fn derived_options() {
        let toml = r#"
            multiplicity = 5
            attempt_timeout_secs = 7
            connect_timeout_secs = 2
            user_agent = "custom/2"
            ewma_age = 10.0
        "#;
        let cfg: MfetchConfig = toml::from_str(toml).unwrap();
        let t = cfg.transport_options();
        assert_eq!(t.attempt_timeout, Duration::from_secs(7));
        assert_eq!(t.connect_timeout, Duration::from_secs(2));
        assert_eq!(t.user_agent, "custom/2");
        let s = cfg.session_options();
        assert_eq!(s.multiplicity, 5);
        assert_eq!(s.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!((s.ewma_age - 10.0).abs() < 1e-9);
        assert!(s.cancel.is_none());
    }

    #[test]
    fn load_or_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, MfetchConfig::default());
        assert!(path.exists());

        fs::write(&path, "multiplicity = 8\n").unwrap();
        assert_eq!(load_or_init_at(&path).unwrap().multiplicity, 8);
    }
}
