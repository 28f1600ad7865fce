//! Persistent credential store
//!
//! Provisioning state (API key, network credentials, backend endpoint)
//! lives in a single fixed namespace of a small TOML file, surviving
//! restarts. The engine only sees the [`KeyValueStore`] trait; the typed
//! [`DeviceSettings`] facade sits on top so callers never touch raw keys.

use crate::error::{Error, Result};
use crate::link::CommandEffects;
use std::path::{Path, PathBuf};

/// Namespace table holding all tracker credentials in the store file.
const NAMESPACE: &str = "rakshak";

const KEY_API_KEY: &str = "api_key";
const KEY_WIFI_SSID: &str = "wifi_ssid";
const KEY_WIFI_PASSWORD: &str = "wifi_password";
const KEY_API_ENDPOINT: &str = "api_endpoint";

/// String key-value store scoped to the tracker's namespace.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// TOML-file-backed store, write-through on every `set`.
pub struct FileStore {
    path: PathBuf,
    table: toml::Table,
}

impl FileStore {
    /// Open the store file, creating an empty store if it does not exist
    /// yet. The file itself is only written on the first `set`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            log::info!("Credential store {} not found, starting empty", path.display());
            toml::Table::new()
        };
        Ok(FileStore { path, table })
    }

    fn namespace(&self) -> Option<&toml::Table> {
        self.table.get(NAMESPACE).and_then(|v| v.as_table())
    }

    fn persist(&self) -> Result<()> {
        let contents = toml::to_string_pretty(&self.table)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .namespace()
            .and_then(|table| table.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_owned))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let namespace = self
            .table
            .entry(NAMESPACE)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let Some(table) = namespace.as_table_mut() else {
            return Err(Error::Other(format!(
                "credential namespace '{}' is not a table",
                NAMESPACE
            )));
        };
        table.insert(key.to_string(), toml::Value::String(value.to_string()));
        self.persist()
    }
}

/// In-memory store for tests and the simulation backend.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

#[cfg(any(test, feature = "mock"))]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "mock"))]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed facade over the credential namespace.
pub struct DeviceSettings<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> DeviceSettings<S> {
    pub fn new(store: S) -> Self {
        DeviceSettings { store }
    }

    /// Backend API key, warned about when missing since every upload will
    /// be rejected without it.
    pub fn api_key(&self) -> Result<Option<String>> {
        let key = self.store.get(KEY_API_KEY)?;
        if key.is_none() {
            log::warn!("API key not set; backend requests will be aborted");
        }
        Ok(key)
    }

    pub fn set_api_key(&mut self, key: &str) -> Result<()> {
        self.store.set(KEY_API_KEY, key)?;
        log::info!("API key stored");
        Ok(())
    }

    pub fn api_key_set(&self) -> Result<bool> {
        self.store.contains(KEY_API_KEY)
    }

    /// Backend base URL override; config supplies the default.
    pub fn api_endpoint(&self) -> Result<Option<String>> {
        self.store.get(KEY_API_ENDPOINT)
    }

    pub fn wifi_ssid(&self) -> Result<Option<String>> {
        self.store.get(KEY_WIFI_SSID)
    }

    pub fn wifi_password(&self) -> Result<Option<String>> {
        self.store.get(KEY_WIFI_PASSWORD)
    }
}

impl<S: KeyValueStore> CommandEffects for DeviceSettings<S> {
    fn set_wifi_ssid(&mut self, ssid: &str) -> Result<()> {
        self.store.set(KEY_WIFI_SSID, ssid)
    }

    fn set_wifi_password(&mut self, password: &str) -> Result<()> {
        self.store.set(KEY_WIFI_PASSWORD, password)
    }

    fn set_api_endpoint(&mut self, endpoint: &str) -> Result<()> {
        self.store.set(KEY_API_ENDPOINT, endpoint)
    }

    fn calibrate_sensor(&mut self) -> Result<()> {
        // The inertial driver owns the actual calibration sequence; the
        // store has nothing to persist for it.
        log::info!("Inertial sensor recalibration triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rakshak-store-{}-{}.toml", tag, std::process::id()))
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = temp_store_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        {
            let mut store = FileStore::open(&path).unwrap();
            assert_eq!(store.get("api_key").unwrap(), None);
            store.set("api_key", "secret-123").unwrap();
            store.set("wifi_ssid", "HomeNet").unwrap();
        }

        // Fresh open reads back what was persisted
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("api_key").unwrap().as_deref(), Some("secret-123"));
        assert_eq!(store.get("wifi_ssid").unwrap().as_deref(), Some("HomeNet"));
        assert!(store.contains("wifi_ssid").unwrap());
        assert!(!store.contains("wifi_password").unwrap());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_namespaced() {
        let path = temp_store_path("namespace");
        let _ = std::fs::remove_file(&path);

        let mut store = FileStore::open(&path).unwrap();
        store.set("api_key", "k").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[rakshak]"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_settings_effects_persist() {
        let mut settings = DeviceSettings::new(MemoryStore::new());

        CommandEffects::set_wifi_ssid(&mut settings, "HomeNet").unwrap();
        CommandEffects::set_wifi_password(&mut settings, "hunter2").unwrap();
        CommandEffects::set_api_endpoint(&mut settings, "https://api.example.com").unwrap();

        assert_eq!(settings.wifi_ssid().unwrap().as_deref(), Some("HomeNet"));
        assert_eq!(settings.wifi_password().unwrap().as_deref(), Some("hunter2"));
        assert_eq!(
            settings.api_endpoint().unwrap().as_deref(),
            Some("https://api.example.com")
        );
    }

    #[test]
    fn test_api_key_facade() {
        let mut settings = DeviceSettings::new(MemoryStore::new());
        assert!(!settings.api_key_set().unwrap());
        assert_eq!(settings.api_key().unwrap(), None);

        settings.set_api_key("secret").unwrap();
        assert!(settings.api_key_set().unwrap());
        assert_eq!(settings.api_key().unwrap().as_deref(), Some("secret"));
    }
}
