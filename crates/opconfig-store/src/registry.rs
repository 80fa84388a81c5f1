/*!
 * The process-wide configuration registry.
 *
 * [`Configurations`] owns every routine's [`OpModeConfig`] and the JSON file
 * they persist to. Loading and saving always cover the whole file; saving
 * writes a sibling temp file and renames it over the original.
 *
 * File form: `{"opmodes": [<opmode>, ...]}`.
 */
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::json;
use tracing::{debug, info, warn};

use opconfig_core::config::{Settings, StorageSettings};
use opconfig_core::error::{Error, Result};
use opconfig_core::logging::{opmode_span, operation_span};
use opconfig_core::types::json_type_name;

use crate::opmode::OpModeConfig;
use crate::profile::{write_profile, SharedProfile};
use crate::routine::ConfiguredOpMode;

static GLOBAL: OnceLock<Configurations> = OnceLock::new();
static SHUT_DOWN: AtomicBool = AtomicBool::new(false);

/// Every routine's configuration, backed by one JSON file
#[derive(Debug)]
pub struct Configurations {
    storage: StorageSettings,
    opmodes: RwLock<Vec<Arc<OpModeConfig>>>,
}

impl Configurations {
    /// Create an empty registry that will save to `storage.path`
    pub fn new(storage: StorageSettings) -> Self {
        Self {
            storage,
            opmodes: RwLock::new(Vec::new()),
        }
    }

    /// Load the registry from `storage.path`. A missing file loads empty.
    pub fn load(storage: StorageSettings) -> Result<Self> {
        let _span = operation_span("load", None).entered();

        if !storage.path.exists() {
            info!("No configuration file at {}, starting empty", storage.path.display());
            return Ok(Self::new(storage));
        }

        let text = fs::read_to_string(&storage.path)?;
        let json: serde_json::Value = serde_json::from_str(&text)?;
        let configurations = Self::from_json(storage, &json)?;
        info!(
            "Loaded {} opmode configs from {}",
            configurations.read_opmodes()?.len(),
            configurations.storage.path.display()
        );
        Ok(configurations)
    }

    /// Build a registry from the `{"opmodes": [...]}` document
    pub fn from_json(storage: StorageSettings, json: &serde_json::Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| {
            Error::malformed(format!("configuration file must hold an object, got {}", json_type_name(json)))
        })?;
        let raw_opmodes = object
            .get("opmodes")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::malformed("configuration file needs an 'opmodes' array"))?;
        if object.len() != 1 {
            warn!("Ignoring {} unknown top-level keys", object.len() - 1);
        }

        let mut opmodes: Vec<Arc<OpModeConfig>> = Vec::with_capacity(raw_opmodes.len());
        for raw in raw_opmodes {
            let opmode = OpModeConfig::from_json(raw)?;
            if opmodes.iter().any(|o| o.name() == opmode.name()) {
                return Err(Error::malformed(format!("duplicate opmode '{}'", opmode.name())));
            }
            opmodes.push(opmode);
        }

        Ok(Self {
            storage,
            opmodes: RwLock::new(opmodes),
        })
    }

    /// Encode the whole registry
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let opmodes = self
            .read_opmodes()?
            .iter()
            .map(|o| o.to_json())
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "opmodes": opmodes }))
    }

    /// Write the whole registry to its file
    pub fn save(&self) -> Result<()> {
        let _span = operation_span("save", None).entered();

        let json = self.to_json()?;
        let text = if self.storage.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };

        if let Some(parent) = self.storage.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = temp_path(&self.storage.path);
        if let Err(e) = fs::write(&temp, text).and_then(|_| fs::rename(&temp, &self.storage.path)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        info!("Saved configuration to {}", self.storage.path.display());
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.storage.path
    }

    /// Look up a routine's config without creating it
    pub fn get_opmode(&self, name: &str) -> Result<Option<Arc<OpModeConfig>>> {
        Ok(self
            .read_opmodes()?
            .iter()
            .find(|o| o.name() == name)
            .cloned())
    }

    /// Get a routine's config, creating an empty one on first use
    pub fn opmode(&self, name: &str) -> Result<Arc<OpModeConfig>> {
        if let Some(opmode) = self.get_opmode(name)? {
            return Ok(opmode);
        }

        let mut opmodes = self.write_opmodes()?;
        // Another caller may have created it between the two locks
        if let Some(opmode) = opmodes.iter().find(|o| o.name() == name) {
            return Ok(opmode.clone());
        }
        let opmode = OpModeConfig::new(name);
        opmodes.push(opmode.clone());
        debug!(opmode = name, "Created opmode config");
        Ok(opmode)
    }

    /// Drop a routine's config entirely. Returns whether it existed.
    pub fn remove_opmode(&self, name: &str) -> Result<bool> {
        let mut opmodes = self.write_opmodes()?;
        let before = opmodes.len();
        opmodes.retain(|o| o.name() != name);
        Ok(opmodes.len() != before)
    }

    /// Names of all known routines
    pub fn opmode_names(&self) -> Result<Vec<String>> {
        Ok(self
            .read_opmodes()?
            .iter()
            .map(|o| o.name().to_string())
            .collect())
    }

    /// Resolve a routine to its active profile
    pub fn active_profile(&self, routine: &str) -> Result<SharedProfile> {
        self.opmode(routine)?.active_profile()
    }

    /// Hand a routine its active profile so it can read its values
    pub fn configure<R: ConfiguredOpMode + ?Sized>(&self, routine: &mut R) -> Result<()> {
        let _span = opmode_span(routine.name()).entered();
        let profile = self.active_profile(routine.name())?;
        let mut profile = write_profile(&profile)?;
        let _operation = operation_span("configure", Some(profile.name())).entered();
        debug!("Configuring routine");
        routine.configure(&mut profile)
    }

    fn read_opmodes(&self) -> Result<RwLockReadGuard<'_, Vec<Arc<OpModeConfig>>>> {
        self.opmodes
            .read()
            .map_err(|_| Error::lock("Failed to acquire read lock on configurations"))
    }

    fn write_opmodes(&self) -> Result<RwLockWriteGuard<'_, Vec<Arc<OpModeConfig>>>> {
        self.opmodes
            .write()
            .map_err(|_| Error::lock("Failed to acquire write lock on configurations"))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load the process-wide registry. Call once at start-up.
pub fn init(settings: &Settings) -> Result<&'static Configurations> {
    if GLOBAL.get().is_some() {
        return Err(Error::already_exists("configurations are already initialized"));
    }
    let configurations = Configurations::load(settings.storage.clone())?;
    GLOBAL
        .set(configurations)
        .map_err(|_| Error::already_exists("configurations are already initialized"))?;
    global()
}

/// The process-wide registry
pub fn global() -> Result<&'static Configurations> {
    GLOBAL
        .get()
        .ok_or_else(|| Error::runtime("configurations are not initialized"))
}

/// Save the process-wide registry. Only the first successful call writes.
///
/// Returns whether this call saved. A failed save leaves the registry
/// unsaved so a later call tries again.
pub fn shutdown() -> Result<bool> {
    let configurations = global()?;
    if SHUT_DOWN.swap(true, Ordering::SeqCst) {
        return Ok(false);
    }
    if let Err(e) = configurations.save() {
        SHUT_DOWN.store(false, Ordering::SeqCst);
        return Err(e);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opmode::DEFAULT_PROFILE;
    use crate::profile::{read_profile, Profile};
    use opconfig_core::types::Value;
    use tempfile::tempdir;
    use test_log::test;

    fn storage(path: PathBuf) -> StorageSettings {
        StorageSettings { path, pretty: true }
    }

    struct Drive {
        power: f64,
        reversed: bool,
    }

    impl ConfiguredOpMode for Drive {
        fn name(&self) -> &str {
            "Drive"
        }

        fn configure(&mut self, profile: &mut Profile) -> Result<()> {
            self.power = profile.get("power", 0.8)?;
            self.reversed = profile.get("reversed", false)?;
            Ok(())
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let configurations = Configurations::load(storage(dir.path().join("none.json"))).unwrap();
        assert!(configurations.opmode_names().unwrap().is_empty());
    }

    #[test]
    fn test_opmode_get_or_create() {
        let configurations = Configurations::new(StorageSettings::default());
        assert!(configurations.get_opmode("Auto").unwrap().is_none());

        let first = configurations.opmode("Auto").unwrap();
        let second = configurations.opmode("Auto").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(configurations.opmode_names().unwrap(), ["Auto"]);

        assert!(configurations.remove_opmode("Auto").unwrap());
        assert!(!configurations.remove_opmode("Auto").unwrap());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("opconfig.json");

        let configurations = Configurations::new(storage(path.clone()));
        {
            let auto = configurations.opmode("Auto").unwrap();
            let blue = auto.create_profile("blue").unwrap();
            let mut blue = write_profile(&blue).unwrap();
            blue.set("alliance", "blue").unwrap();
            blue.set("delay_ms", 1500i64).unwrap();
            blue.set("park", true).unwrap();
            blue.set("kp", 0.05).unwrap();
            assert!(blue.activate());
        }
        configurations.opmode("TeleOp").unwrap();
        configurations.save().unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let loaded = Configurations::load(storage(path)).unwrap();
        assert_eq!(loaded.opmode_names().unwrap(), ["Auto", "TeleOp"]);

        let auto = loaded.opmode("Auto").unwrap();
        assert_eq!(auto.active_name().unwrap(), "blue");
        let blue = loaded.active_profile("Auto").unwrap();
        let blue = read_profile(&blue).unwrap();
        assert_eq!(blue.value("alliance"), Some(&Value::String("blue".into())));
        assert_eq!(blue.value("delay_ms"), Some(&Value::Long(1500)));
        assert_eq!(blue.value("park"), Some(&Value::Bool(true)));
        assert_eq!(blue.value("kp"), Some(&Value::Double(0.05)));

        let teleop = loaded.active_profile("TeleOp").unwrap();
        assert_eq!(read_profile(&teleop).unwrap().name(), DEFAULT_PROFILE);
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();

        let configurations = Configurations::new(storage(path.clone()));
        configurations.opmode("Auto").unwrap();
        assert!(matches!(configurations.save(), Err(Error::Io(_))));
        assert!(!temp_path(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_load_skips_bad_entries_but_not_bad_profiles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("opconfig.json");

        fs::write(
            &path,
            r#"{"opmodes": [{"name": "Auto", "active": "default", "profiles": [
                {"name": "default", "config": [["a", "l", 1], ["b", "q", 2], ["c", "b", true]]}
            ]}]}"#,
        )
        .unwrap();
        let loaded = Configurations::load(storage(path.clone())).unwrap();
        let profile = loaded.active_profile("Auto").unwrap();
        assert_eq!(read_profile(&profile).unwrap().len(), 2);

        fs::write(
            &path,
            r#"{"opmodes": [{"name": "Auto", "active": "default", "profiles": [
                {"name": "default", "config": [], "extra": 0}
            ]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            Configurations::load(storage(path.clone())),
            Err(Error::MalformedData(_))
        ));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Configurations::load(storage(path)),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_bad_documents() {
        let cases = [
            json!([]),
            json!({"routines": []}),
            json!({"opmodes": [
                {"name": "A", "active": "default", "profiles": []},
                {"name": "A", "active": "default", "profiles": []},
            ]}),
        ];
        for case in &cases {
            assert!(matches!(
                Configurations::from_json(StorageSettings::default(), case),
                Err(Error::MalformedData(_))
            ));
        }
    }

    #[test]
    fn test_configure_stores_defaults() {
        let configurations = Configurations::new(StorageSettings::default());
        let mut drive = Drive {
            power: 0.0,
            reversed: true,
        };

        configurations.configure(&mut drive).unwrap();
        assert_eq!(drive.power, 0.8);
        assert!(!drive.reversed);

        let profile = configurations.active_profile("Drive").unwrap();
        write_profile(&profile).unwrap().set("power", 0.4).unwrap();
        configurations.configure(&mut drive).unwrap();
        assert_eq!(drive.power, 0.4);

        write_profile(&profile).unwrap().set("power", "full").unwrap();
        assert!(matches!(
            configurations.configure(&mut drive),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_global_lifecycle() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let mut settings = Settings::default();
        settings.storage.path = blocker.join("global.json");

        assert!(matches!(shutdown(), Err(Error::Runtime(_))));

        let configurations = init(&settings).unwrap();
        assert!(matches!(init(&settings), Err(Error::AlreadyExists(_))));
        assert!(std::ptr::eq(configurations, global().unwrap()));

        let profile = global().unwrap().active_profile("TeleOp").unwrap();
        write_profile(&profile).unwrap().set("speed", 1i64).unwrap();

        // The parent directory cannot be created while a file sits there
        assert!(matches!(shutdown(), Err(Error::Io(_))));
        assert!(!settings.storage.path.exists());

        fs::remove_file(&blocker).unwrap();
        assert!(shutdown().unwrap());
        assert!(!shutdown().unwrap());
        assert!(settings.storage.path.exists());
    }
}
