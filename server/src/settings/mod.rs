//! Application settings stored as JSON files beside the stores.
//!
//! The main scope lives in `<data>/settings.json`. A session scope lives in
//! `<data>/sessions/<id>.settings.json` and falls back to the resolved main
//! settings for anything it does not set. Merging is shallow: a top-level
//! key present in the file replaces the default wholesale.
//!
//! Each settings file has its own `tokio::sync::Mutex`, held across the
//! read-modify-write of an update. Files are replaced by rename, so a
//! reader never sees a partial write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::persistence::PersistenceError;
use crate::registry::validate_session_id;
use scoring::PointsSettings;

/// Ages covered by an age group: a single age or an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgeGroup {
    Age(u32),
    Range([u32; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub age_groups: BTreeMap<String, AgeGroup>,
    /// Measurement unit → validation pattern for entered values.
    pub metrics: BTreeMap<String, String>,
    pub points: PointsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let age_groups = [
            ("U14", AgeGroup::Range([12, 13])),
            ("U16", AgeGroup::Range([14, 15])),
            ("U18", AgeGroup::Range([16, 17])),
            ("open", AgeGroup::Age(18)),
        ];
        let metrics = [
            ("m", r"^(0|[1-9]\\d*)(\\.\\d+)?$"),
            ("sec", r"^(0|[1-5]?\\d)(\\.\\d+)?$"),
            ("min", r"^(0|[1-5]?\\d)(\\.\\d+)?$"),
        ];
        Self {
            age_groups: age_groups
                .into_iter()
                .map(|(name, ages)| (name.to_string(), ages))
                .collect(),
            metrics: metrics
                .into_iter()
                .map(|(unit, pattern)| (unit.to_string(), pattern.to_string()))
                .collect(),
            points: PointsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsScope {
    Main,
    Session(String),
}

impl SettingsScope {
    /// `None` or an empty id means the main scope.
    pub fn from_session_id(session_id: Option<&str>) -> Self {
        match session_id {
            Some(id) if !id.is_empty() => SettingsScope::Session(id.to_string()),
            _ => SettingsScope::Main,
        }
    }
}

type FileLock = Arc<Mutex<()>>;

pub struct SettingsStore {
    data_dir: PathBuf,
    locks: RwLock<HashMap<PathBuf, FileLock>>,
}

impl SettingsStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn file_path(&self, scope: &SettingsScope) -> Result<PathBuf, PersistenceError> {
        match scope {
            SettingsScope::Main => Ok(self.data_dir.join("settings.json")),
            SettingsScope::Session(id) => {
                validate_session_id(id)?;
                Ok(self
                    .data_dir
                    .join("sessions")
                    .join(format!("{id}.settings.json")))
            }
        }
    }

    /// Resolve the settings for `scope`, creating its file from defaults if
    /// it does not exist yet.
    pub async fn get(&self, scope: &SettingsScope) -> Result<Settings, PersistenceError> {
        let path = self.file_path(scope)?;
        let defaults = self.defaults_for(scope).await?;

        let lock = self.lock_for(&path).await;
        let _guard = lock.lock().await;
        load_or_create(&path, defaults)
    }

    /// Merge `partial` over the current settings for `scope` and persist.
    pub async fn update(
        &self,
        scope: &SettingsScope,
        partial: Value,
    ) -> Result<Settings, PersistenceError> {
        let Value::Object(partial) = partial else {
            return Err(PersistenceError::InvalidPayload(
                "settings update must be a JSON object".to_string(),
            ));
        };
        let path = self.file_path(scope)?;
        let defaults = self.defaults_for(scope).await?;

        let lock = self.lock_for(&path).await;
        let _guard = lock.lock().await;
        let mut merged = to_object(&load_or_create(&path, defaults)?)?;
        shallow_merge(&mut merged, partial);
        let settings: Settings = serde_json::from_value(Value::Object(merged))
            .map_err(|e| PersistenceError::InvalidPayload(e.to_string()))?;

        write_json(&path, &settings)?;
        debug!(path = %path.display(), "Settings updated");
        Ok(settings)
    }

    /// A session scope starts from the resolved main settings.
    async fn defaults_for(&self, scope: &SettingsScope) -> Result<Settings, PersistenceError> {
        match scope {
            SettingsScope::Main => Ok(Settings::default()),
            SettingsScope::Session(_) => {
                let path = self.file_path(&SettingsScope::Main)?;
                let lock = self.lock_for(&path).await;
                let _guard = lock.lock().await;
                load_or_create(&path, Settings::default())
            }
        }
    }

    async fn lock_for(&self, path: &Path) -> FileLock {
        if let Some(lock) = self.locks.read().await.get(path) {
            return Arc::clone(lock);
        }
        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

fn load_or_create(path: &Path, defaults: Settings) -> Result<Settings, PersistenceError> {
    let Some(stored) = read_object(path)? else {
        write_json(path, &defaults)?;
        info!(path = %path.display(), "Settings file created from defaults");
        return Ok(defaults);
    };

    let mut merged = to_object(&defaults)?;
    shallow_merge(&mut merged, stored);
    Ok(serde_json::from_value(Value::Object(merged))?)
}

fn read_object(path: &Path) -> Result<Option<Map<String, Value>>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str(&contents)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(PersistenceError::InvalidPayload(format!(
            "{} does not hold a JSON object",
            path.display()
        ))),
    }
}

fn write_json(path: &Path, settings: &Settings) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(settings)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn to_object(settings: &Settings) -> Result<Map<String, Value>, PersistenceError> {
    match serde_json::to_value(settings)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn shallow_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoring::{EventKind, PointTable};
    use serde_json::json;

    #[test]
    fn test_defaults_serialize_like_the_settings_file() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["ageGroups"]["U14"], json!([12, 13]));
        assert_eq!(json["ageGroups"]["open"], json!(18));
        assert_eq!(json["points"]["individual"]["1"], json!(10.0));
        assert_eq!(json["points"]["team"]["3"], json!(6.0));
        assert!(json["metrics"]["m"].is_string());
    }

    #[tokio::test]
    async fn test_missing_file_is_created_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());

        let settings = store.get(&SettingsScope::Main).await.unwrap();
        assert_eq!(settings, Settings::default());
        assert!(dir.path().join("settings.json").exists());
    }

    #[tokio::test]
    async fn test_file_keys_replace_defaults_shallowly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"points": {"individual": {"1": 5}}}"#,
        )
        .unwrap();
        let store = SettingsStore::new(dir.path());

        let settings = store.get(&SettingsScope::Main).await.unwrap();
        assert_eq!(settings.points.individual, PointTable::from_pairs(&[(1, 5.0)]));
        assert!(settings.points.team.is_empty());
        assert_eq!(settings.age_groups, Settings::default().age_groups);
    }

    #[tokio::test]
    async fn test_session_scope_inherits_main_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store
            .update(
                &SettingsScope::Main,
                json!({"metrics": {"pts": "^\\d+$"}}),
            )
            .await
            .unwrap();

        let session = SettingsScope::Session("s1".to_string());
        let inherited = store.get(&session).await.unwrap();
        assert_eq!(inherited.metrics.len(), 1);
        assert!(dir.path().join("sessions").join("s1.settings.json").exists());

        let updated = store
            .update(
                &session,
                json!({"points": {"individual": {"1": 3, "2": 1}}}),
            )
            .await
            .unwrap();
        assert_eq!(updated.points.table_for(EventKind::Individual).points_for(2), 1.0);
        assert_eq!(
            store.get(&SettingsScope::Main).await.unwrap().points,
            PointsSettings::default()
        );
    }

    #[tokio::test]
    async fn test_update_rejects_bad_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());

        let err = store.update(&SettingsScope::Main, json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidPayload(_)));

        let err = store
            .update(&SettingsScope::Main, json!({"ageGroups": "everyone"}))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidPayload(_)));

        let err = store
            .get(&SettingsScope::Session("../x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidSessionId(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SettingsStore::new(dir.path()));

        for round in 0..50u32 {
            let metrics = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .update(
                            &SettingsScope::Main,
                            json!({"metrics": {"m": format!("a{round}")}}),
                        )
                        .await
                })
            };
            let ages = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .update(&SettingsScope::Main, json!({"ageGroups": {"U10": round}}))
                        .await
                })
            };
            metrics.await.unwrap().unwrap();
            ages.await.unwrap().unwrap();

            let settings = store.get(&SettingsScope::Main).await.unwrap();
            assert_eq!(settings.metrics["m"], format!("a{round}"));
            assert_eq!(settings.age_groups["U10"], AgeGroup::Age(round));
        }
        assert!(!dir.path().join("settings.json.tmp").exists());
    }
}
