use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};

use trackmap_ingest_replay::ReplayConfig;
use trackmap_ingest_udp::UdpConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Udp,
    Replay,
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "replay" => Ok(Self::Replay),
            other => bail!("unknown source {:?} (expected udp or replay)", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UdpSection {
    pub bind_addr: String,
    pub idle_timeout_ms: u64,
}

impl Default for UdpSection {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:9870".into(), idle_timeout_ms: 2000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    pub path: Option<PathBuf>,
    pub tick_ms: u64,
    pub track_name: String,
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self { path: None, tick_ms: 16, track_name: "replay".into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceKind,
    pub udp: UdpSection,
    pub replay: ReplaySection,
    pub tracks_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::Udp,
            udp: UdpSection::default(),
            replay: ReplaySection::default(),
            tracks_dir: None,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|d| d.join("trackmap").join("config.json"))
}

impl Config {
    /// Reads `path` (or the default location) and applies `TRACKMAP_*`
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let explicit = path.is_some();
        let mut cfg = match path.or_else(default_config_path) {
            Some(p) if p.exists() => {
                let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
                Self::from_json(&s).with_context(|| format!("parse {}", p.display()))?
            }
            Some(p) if explicit => bail!("config file {} not found", p.display()),
            _ => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = get("TRACKMAP_SOURCE") {
            self.source = v.parse()?;
        }
        if let Some(v) = get("TRACKMAP_BIND") {
            self.udp.bind_addr = v;
        }
        if let Some(v) = get("TRACKMAP_REPLAY") {
            self.replay.path = Some(PathBuf::from(v));
            self.source = SourceKind::Replay;
        }
        if let Some(v) = get("TRACKMAP_TRACKS_DIR") {
            self.tracks_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn tracks_dir(&self) -> PathBuf {
        self.tracks_dir.clone().unwrap_or_else(|| {
            dirs_next::data_dir()
                .map(|d| d.join("trackmap").join("tracks"))
                .unwrap_or_else(|| PathBuf::from("tracks"))
        })
    }

    pub fn udp_config(&self) -> UdpConfig {
        UdpConfig {
            bind_addr: self.udp.bind_addr.clone(),
            idle_timeout: Duration::from_millis(self.udp.idle_timeout_ms),
        }
    }

    pub fn replay_config(&self) -> Result<ReplayConfig> {
        let Some(path) = self.replay.path.clone() else {
            bail!("replay source selected but no replay.path configured");
        };
        Ok(ReplayConfig {
            path,
            track_name: self.replay.track_name.clone(),
            tick: Duration::from_millis(self.replay.tick_ms),
        })
    }
}
