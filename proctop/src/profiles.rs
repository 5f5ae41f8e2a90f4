//! Data-source profiles: a JSON map of profile name -> { url, interval_ms }.
//! Stored under $XDG_CONFIG_HOME/proctop/profiles.json (fallback ~/.config/proctop/profiles.json)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed profiles file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileEntry {
    pub url: String,
    /// Default auto-refresh interval for this data source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

/// Outcome of comparing a requested entry against what is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    /// No entry under that name yet; saved without asking.
    New,
    Unchanged,
    /// Differs from the stored entry; needs `--save` or confirmation.
    Changed,
}

impl ProfilesFile {
    pub fn decide(&self, name: &str, entry: &ProfileEntry) -> SaveDecision {
        match self.profiles.get(name) {
            None => SaveDecision::New,
            Some(existing) if existing == entry => SaveDecision::Unchanged,
            Some(_) => SaveDecision::Changed,
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("proctop")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proctop")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

/// A missing file is an empty profile set.
pub fn load_profiles() -> Result<ProfilesFile, ProfileError> {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).map_err(|source| ProfileError::Json { path, source }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ProfilesFile::default()),
        Err(source) => Err(ProfileError::Io { path, source }),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> Result<(), ProfileError> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ProfileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = serde_json::to_vec_pretty(p).map_err(|source| ProfileError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, data).map_err(|source| ProfileError::Io { path, source })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveProfile {
    /// Use the runtime inputs (maybe saved by the caller under the profile name).
    Direct(ProfileEntry),
    /// Loaded from an existing profile entry.
    Loaded(ProfileEntry),
    /// Should prompt user to select among profile names
    PromptSelect(Vec<String>),
    /// Should prompt user to create a new profile (name)
    PromptCreate(String),
    /// Nothing given and nothing stored: use the default data source.
    Default,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub interval_ms: Option<u64>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        match (self.profile_name, self.url) {
            // Only a profile name: load it, or offer to create it.
            (Some(name), None) => match pf.profiles.get(&name) {
                Some(entry) => {
                    let mut entry = entry.clone();
                    if self.interval_ms.is_some() {
                        entry.interval_ms = self.interval_ms;
                    }
                    ResolveProfile::Loaded(entry)
                }
                None => ResolveProfile::PromptCreate(name),
            },
            (_, Some(url)) => ResolveProfile::Direct(ProfileEntry {
                url,
                interval_ms: self.interval_ms,
            }),
            (None, None) if pf.profiles.is_empty() => ResolveProfile::Default,
            (None, None) => ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect()),
        }
    }
}
