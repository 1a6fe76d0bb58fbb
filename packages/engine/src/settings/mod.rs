// packages/engine/src/settings/mod.rs
//! Persisted override settings and operator actions
//!
//! The operator chooses between the official servers and a custom endpoint.
//! Choices are stored in a small JSON record using the same keys the
//! settings screen has always written (`forceUrl`, `serverip`), and are
//! applied to the runtime override state as they happen.

use crate::interception::override_state::{OverrideSnapshot, OverrideState};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// On-disk settings record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    #[serde(rename = "forceUrl")]
    pub force_url: bool,

    #[serde(rename = "serverip")]
    pub server: String,
}

impl From<&PersistedSettings> for OverrideSnapshot {
    fn from(settings: &PersistedSettings) -> Self {
        OverrideSnapshot::new(settings.force_url, settings.server.clone())
    }
}

/// JSON-file backed settings store
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    values: Mutex<PersistedSettings>,
}

impl SettingsStore {
    /// Open the store, starting from defaults when the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                EngineError::Settings(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                PersistedSettings::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current record
    pub fn get(&self) -> PersistedSettings {
        self.values.lock().clone()
    }

    pub fn set_force_url(&self, force_url: bool) -> Result<()> {
        self.modify(|s| s.force_url = force_url)
    }

    pub fn set_server(&self, server: impl Into<String>) -> Result<()> {
        let server = server.into();
        self.modify(move |s| s.server = server)
    }

    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut PersistedSettings),
    {
        let mut values = self.values.lock();
        let mut next = values.clone();
        f(&mut next);

        // Memory only follows a successful write
        self.write(&next)?;
        *values = next;
        Ok(())
    }

    fn write(&self, values: &PersistedSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Operator choices delivered by the settings collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperatorAction {
    /// Load persisted settings into the runtime state
    Load,
    /// Edit the stored endpoint; takes effect on the next custom-server choice
    EditEndpoint { endpoint: String },
    /// Toggle forced mode, persisted and applied immediately
    SetForce { enabled: bool },
    /// Use the stored endpoint
    UseCustomServer,
    /// Use the official servers for this session
    UseOfficialServer,
}

/// Apply an operator action to the store and the runtime state
///
/// Returns the override snapshot in effect afterwards.
pub fn apply_action(
    action: &OperatorAction,
    store: &SettingsStore,
    state: &OverrideState,
) -> Result<Arc<OverrideSnapshot>> {
    match action {
        OperatorAction::Load => {
            let settings = store.get();
            Ok(state.replace(OverrideSnapshot::from(&settings)))
        }
        OperatorAction::EditEndpoint { endpoint } => {
            store.set_server(endpoint.clone())?;
            Ok(state.snapshot())
        }
        OperatorAction::SetForce { enabled } => {
            store.set_force_url(*enabled)?;
            Ok(state.set_enabled(*enabled))
        }
        OperatorAction::UseCustomServer => {
            let server = store.get().server;
            if server.is_empty() {
                warn!("Custom server requested without an address");
                return Err(EngineError::ServerAddressMissing);
            }
            info!("Switching to custom server {}", server);
            Ok(state.activate(server))
        }
        OperatorAction::UseOfficialServer => {
            info!("Switching to official servers");
            Ok(state.deactivate())
        }
    }
}
