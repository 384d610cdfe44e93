//! Board settings kept in three tiers: the local store, the remote settings
//! service, and the built-in defaults.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::remote::{RemoteError, SettingsRemote};
use crate::settings::{BoardSettings, BoardSettingsPatch, merge_fields};
use crate::storage::{KeyValueStore, StorageError};

pub const SETTINGS_KEY: &str = "backyard-board-settings";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored board settings are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SettingsError {
    /// True when the failure came from the settings service rather than the local store.
    pub fn is_remote(&self) -> bool {
        matches!(self, SettingsError::Remote(_))
    }
}

pub struct SettingsPersistence<S, R> {
    store: S,
    remote: R,
}

impl<S: KeyValueStore, R: SettingsRemote> SettingsPersistence<S, R> {
    pub fn new(store: S, remote: R) -> Self {
        Self { store, remote }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Reads the locally cached settings. `Ok(None)` when nothing is cached.
    pub fn try_load(&self) -> Result<Option<BoardSettings>, SettingsError> {
        let Some(raw) = self.store.get_item(SETTINGS_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Locally cached settings, or the defaults when the cache is missing or unreadable.
    pub fn load(&self) -> BoardSettings {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => BoardSettings::default(),
            Err(err) => {
                tracing::warn!(error = %err, "falling back to default board settings");
                BoardSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &BoardSettings) -> Result<(), SettingsError> {
        let result = serde_json::to_string(settings)
            .map_err(SettingsError::from)
            .and_then(|raw| Ok(self.store.set_item(SETTINGS_KEY, &raw)?));
        if let Err(err) = &result {
            tracing::warn!(error = %err, "failed to cache board settings locally");
        }
        result
    }

    /// Stores the full record remotely, then mirrors it locally. The result
    /// only reports the remote call.
    pub async fn save_to_server(
        &self,
        user_id: &str,
        settings: &BoardSettings,
    ) -> Result<(), SettingsError> {
        if let Err(err) = self.remote.create(user_id, settings).await {
            tracing::warn!(user_id, error = %err, "failed to save board settings to server");
            return Err(err.into());
        }
        // `save` logs its own failure.
        let _ = self.save(settings);
        Ok(())
    }

    /// Fetches the remote record. Only a present record is mirrored locally.
    pub async fn load_from_server(
        &self,
        user_id: &str,
    ) -> Result<Option<BoardSettings>, SettingsError> {
        let settings = match self.remote.fetch(user_id).await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "failed to load board settings from server");
                return Err(err.into());
            }
        };
        if let Some(settings) = &settings {
            // Local mirroring is best effort; the fetched record is still returned.
            let _ = self.save(settings);
        }
        Ok(settings)
    }

    /// Sends `patch` to the server and merges it into the local record whatever
    /// the server answered. The result only reports the remote call.
    pub async fn update_on_server(
        &self,
        user_id: &str,
        patch: &BoardSettingsPatch,
    ) -> Result<(), SettingsError> {
        let remote = self.remote.update(user_id, patch).await;
        if let Err(err) = &remote {
            tracing::warn!(user_id, error = %err, "failed to update board settings on server");
        }

        if let Err(err) = self.merge_local(patch) {
            tracing::warn!(error = %err, "failed to merge board settings locally");
        }

        remote.map_err(SettingsError::from)
    }

    fn merge_local(&self, patch: &BoardSettingsPatch) -> Result<(), SettingsError> {
        let mut current = self.local_fields();
        merge_fields(&mut current, patch);
        let raw = serde_json::to_string(&Value::Object(current))?;
        self.store.set_item(SETTINGS_KEY, &raw)?;
        Ok(())
    }

    /// The stored JSON object as-is, so fields outside the patch survive a merge
    /// untouched. Defaults stand in when nothing readable is stored.
    fn local_fields(&self) -> Map<String, Value> {
        let stored = self
            .store
            .get_item(SETTINGS_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());
        match stored {
            Some(Value::Object(fields)) => fields,
            _ => match serde_json::to_value(BoardSettings::default()) {
                Ok(Value::Object(fields)) => fields,
                _ => Map::new(),
            },
        }
    }
}
