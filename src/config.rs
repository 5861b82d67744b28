use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use handkey_gesture::{FlagSchedule, HashProfile, JointTable, PipelineParams, MAX_BINS};
use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::matcher::{MatchPolicy, DEFAULT_THRESHOLD, MAX_THRESHOLD, MIN_THRESHOLD};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("HANDKEY_CONFIG_PATH").unwrap_or("/usr/local/etc/handkey/config.toml"))
});

pub static STORE_PREFIX: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("HANDKEY_STORE_PREFIX").unwrap_or("/usr/local/etc/handkey"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    Exact,
    Similarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub joint_table: JointTable,
    pub num_bins: NonZeroU32,
    pub flag_schedule: FlagSchedule,
    pub profile: HashProfile,
    pub match_policy: PolicyKind,
    /// Only read with `match_policy = "similarity"`.
    pub threshold: f64,
    /// Flip captures horizontally before extraction.
    pub mirror: bool,
    pub registry: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            joint_table: params.joint_table,
            num_bins: params.num_bins,
            flag_schedule: params.flag_schedule,
            profile: params.profile,
            match_policy: PolicyKind::Exact,
            threshold: DEFAULT_THRESHOLD,
            mirror: false,
            registry: STORE_PREFIX.join("gestures.json"),
        }
    }
}

impl Config {
    pub fn params(&self) -> PipelineParams {
        PipelineParams {
            joint_table: self.joint_table,
            num_bins: self.num_bins,
            flag_schedule: self.flag_schedule,
            profile: self.profile,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        match self.match_policy {
            PolicyKind::Exact => MatchPolicy::Exact,
            PolicyKind::Similarity => MatchPolicy::Similarity {
                threshold: self.threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD),
            },
        }
    }

    fn sanitize(mut self) -> Self {
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.threshold) {
            let clamped = if self.threshold.is_nan() {
                DEFAULT_THRESHOLD
            } else {
                self.threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
            };
            warn!(
                "threshold {} outside [{}, {}], using {}",
                self.threshold, MIN_THRESHOLD, MAX_THRESHOLD, clamped
            );
            self.threshold = clamped;
        }
        self
    }
}

pub fn parse_config(raw: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(raw)?;
    if !cfg.params().is_supported() {
        bail!("num_bins {} exceeds the maximum of {}", cfg.num_bins, MAX_BINS);
    }
    Ok(cfg.sanitize())
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
