use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use handkey_gesture::Credential;
use serde::{Deserialize, Serialize};

use crate::matcher::{self, Decision, MatchPolicy};

/// Named gestures recognised without a username, kept as one JSON file.
///
/// Entries are derived unsalted: the registry answers "which pose is this",
/// not "who is this".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureRegistry {
    gestures: BTreeMap<String, Credential>,
}

impl GestureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading gesture registry {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing gesture registry {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("writing gesture registry {}", path.display()))
    }

    /// Returns the credential previously registered under `name`, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        credential: Credential,
    ) -> Option<Credential> {
        self.gestures.insert(name.into(), credential)
    }

    pub fn get(&self, name: &str) -> Option<&Credential> {
        self.gestures.get(name)
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Credential)> {
        self.gestures.iter().map(|(name, cred)| (name.as_str(), cred))
    }

    pub fn best_match(&self, probe: &Credential, policy: MatchPolicy) -> Option<(&str, Decision)> {
        matcher::best_match(self.iter(), probe, policy)
    }
}
