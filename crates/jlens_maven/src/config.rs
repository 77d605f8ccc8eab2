use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Settings for the external Maven executable and the local repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MavenConfig {
    /// When set, resolution is delegated to this executable.
    pub executable: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
    pub local_repository: Option<PathBuf>,
    pub offline: bool,
    pub update_snapshots: bool,
    pub fail_fast: bool,
    pub timeout_seconds: u64,
}

impl Default for MavenConfig {
    fn default() -> Self {
        Self {
            executable: None,
            settings_file: None,
            local_repository: None,
            offline: false,
            update_snapshots: false,
            fail_fast: true,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl MavenConfig {
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Configured local repository, else `~/.m2/repository`.
    pub fn effective_local_repository(&self) -> Option<PathBuf> {
        self.local_repository
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".m2").join("repository")))
    }

    /// Applies override layers in priority order (later layers win).
    pub fn with_layers(mut self, layers: &[MavenConfigLayer]) -> Self {
        for layer in layers {
            self.apply_layer(layer);
        }
        self
    }

    fn apply_layer(&mut self, layer: &MavenConfigLayer) {
        if let Some(executable) = &layer.executable {
            self.executable = executable.clone();
        }
        if let Some(settings_file) = &layer.settings_file {
            self.settings_file = settings_file.clone();
        }
        if let Some(local_repository) = &layer.local_repository {
            self.local_repository = local_repository.clone();
        }
        if let Some(offline) = layer.offline {
            self.offline = offline;
        }
        if let Some(update_snapshots) = layer.update_snapshots {
            self.update_snapshots = update_snapshots;
        }
        if let Some(fail_fast) = layer.fail_fast {
            self.fail_fast = fail_fast;
        }
        if let Some(timeout_seconds) = layer.timeout_seconds {
            self.timeout_seconds = timeout_seconds;
        }
    }
}

/// Environment or command line overrides. `Some(None)` clears a path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MavenConfigLayer {
    pub executable: Option<Option<PathBuf>>,
    pub settings_file: Option<Option<PathBuf>>,
    pub local_repository: Option<Option<PathBuf>>,
    pub offline: Option<bool>,
    pub update_snapshots: Option<bool>,
    pub fail_fast: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

impl MavenConfigLayer {
    pub fn is_empty(&self) -> bool {
        self.executable.is_none()
            && self.settings_file.is_none()
            && self.local_repository.is_none()
            && self.offline.is_none()
            && self.update_snapshots.is_none()
            && self.fail_fast.is_none()
            && self.timeout_seconds.is_none()
    }
}
