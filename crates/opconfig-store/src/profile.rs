/*!
 * Profiles: one named set of configuration values for one routine.
 *
 * A profile reads like a typed map with default insertion. Reading a key that
 * is not there stores the default, so a routine's first run writes out every
 * value it depends on and the UI can then edit them.
 *
 * Wire form: `{"name": <string>, "config": [<entry>, ...]}`.
 */
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::json;
use tracing::{debug, error, warn};

use opconfig_core::error::{Error, Result};
use opconfig_core::types::{json_type_name, Value, ValueType};

use crate::entry::DataEntry;

static NEXT_PROFILE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one profile instance.
///
/// A profile recreated under an old name gets a new id, so a handle to the
/// deleted one cannot act on its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileId(u64);

impl ProfileId {
    fn next() -> Self {
        Self(NEXT_PROFILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The container a profile belongs to.
///
/// Profiles hold only a weak handle to their owner and use it to ask for
/// their own deletion or activation.
pub trait ProfileOwner: Send + Sync {
    /// Owner name, used in diagnostics
    fn name(&self) -> &str;

    /// Remove the profile `name` if it is still the instance `id`.
    /// Returns whether anything was removed.
    fn delete_profile(&self, name: &str, id: ProfileId) -> bool;

    /// Make the profile `name` active if it is still the instance `id`.
    /// Returns whether it is now the active one.
    fn set_active_profile(&self, name: &str, id: ProfileId) -> bool;
}

/// A profile behind its own lock
pub type SharedProfile = Arc<RwLock<Profile>>;

/// Read-lock a shared profile
pub fn read_profile(profile: &SharedProfile) -> Result<RwLockReadGuard<'_, Profile>> {
    profile
        .read()
        .map_err(|_| Error::lock("Failed to acquire read lock on profile"))
}

/// Write-lock a shared profile
pub fn write_profile(profile: &SharedProfile) -> Result<RwLockWriteGuard<'_, Profile>> {
    profile
        .write()
        .map_err(|_| Error::lock("Failed to acquire write lock on profile"))
}

/// A named set of configuration entries
#[derive(Clone)]
pub struct Profile {
    id: ProfileId,
    name: String,
    entries: Vec<DataEntry>,
    owner: Option<Weak<dyn ProfileOwner>>,
}

impl Profile {
    /// Create an empty profile with no owner
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: ProfileId::next(),
            name: name.into(),
            entries: Vec::new(),
            owner: None,
        }
    }

    /// Create an empty profile belonging to `owner`
    pub fn with_owner<S: Into<String>>(name: S, owner: Weak<dyn ProfileOwner>) -> Self {
        Self {
            owner: Some(owner),
            ..Self::new(name)
        }
    }

    /// Profile name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance identity
    pub fn id(&self) -> ProfileId {
        self.id
    }

    /// Name of the owner, if it is still alive
    pub fn owner_name(&self) -> Option<String> {
        self.owner()
            .map(|owner| owner.name().to_string())
    }

    /// Typed read with default insertion.
    ///
    /// If `name` has no entry, an entry holding `default` is stored and
    /// `default` is returned. If it has one of a different kind, the read
    /// fails with [`Error::TypeMismatch`].
    pub fn get<T: ValueType>(&mut self, name: &str, default: T) -> Result<T> {
        if let Some(entry) = self.entry(name) {
            debug!(profile = %self.name, entry = name, value = %entry.value(), "Config lookup");
            return T::from_value(entry.value())
                .ok_or_else(|| Error::type_mismatch(name, entry.kind(), T::KIND));
        }

        debug!(profile = %self.name, entry = name, "Config entry missing, storing default");
        self.upsert(DataEntry::new(name, default.clone().into_value())?);
        Ok(default)
    }

    /// Typed boolean read, see [`Profile::get`]
    pub fn get_bool(&mut self, name: &str, default: bool) -> Result<bool> {
        self.get(name, default)
    }

    /// Typed integer read, see [`Profile::get`]
    pub fn get_long(&mut self, name: &str, default: i64) -> Result<i64> {
        self.get(name, default)
    }

    /// Typed float read, see [`Profile::get`]
    pub fn get_double(&mut self, name: &str, default: f64) -> Result<f64> {
        self.get(name, default)
    }

    /// Typed string read, see [`Profile::get`]
    pub fn get_string(&mut self, name: &str, default: &str) -> Result<String> {
        self.get(name, default.to_string())
    }

    /// Store `value` under `name`, replacing any entry regardless of its kind
    pub fn set<V: Into<Value>>(&mut self, name: &str, value: V) -> Result<()> {
        self.upsert(DataEntry::new(name, value)?);
        Ok(())
    }

    /// Store a dynamically typed JSON value under `name`
    pub fn set_raw(&mut self, name: &str, raw: &serde_json::Value) -> Result<()> {
        self.upsert(DataEntry::from_raw(name, raw)?);
        Ok(())
    }

    /// Replace an existing entry from user-entered text, keeping its kind
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<()> {
        let kind = self
            .entry(name)
            .map(DataEntry::kind)
            .ok_or_else(|| Error::not_found(format!("entry '{}' in profile '{}'", name, self.name)))?;
        self.upsert(DataEntry::new(name, Value::parse(kind, text)?)?);
        Ok(())
    }

    /// Remove an entry
    pub fn remove(&mut self, name: &str) -> Option<DataEntry> {
        let index = self.entries.iter().position(|e| e.name() == name)?;
        Some(self.entries.remove(index))
    }

    /// Look up an entry
    pub fn entry(&self, name: &str) -> Option<&DataEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Look up a value without inserting anything
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entry(name).map(DataEntry::value)
    }

    /// Whether an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[DataEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the profile has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ask the owner to remove this profile.
    ///
    /// Returns `false` when nothing changed, including a second delete.
    pub fn delete(&self) -> bool {
        match self.owner() {
            Some(owner) => owner.delete_profile(&self.name, self.id),
            None => {
                warn!(profile = %self.name, "Cannot delete a profile without an owner");
                false
            }
        }
    }

    /// Ask the owner to make this profile active.
    ///
    /// Returns `false` when the owner settled on a different profile.
    pub fn activate(&self) -> bool {
        match self.owner() {
            Some(owner) => owner.set_active_profile(&self.name, self.id),
            None => {
                warn!(profile = %self.name, "Cannot activate a profile without an owner");
                false
            }
        }
    }

    /// Encode as `{"name": ..., "config": [...]}`
    pub fn to_json(&self) -> serde_json::Value {
        let config: Vec<serde_json::Value> = self.entries.iter().map(DataEntry::to_json).collect();
        json!({
            "name": self.name,
            "config": config,
        })
    }

    /// Parse a profile.
    ///
    /// The object must have exactly the keys `name` and `config`. Entries in
    /// `config` that fail to parse are logged and skipped.
    pub fn from_json(owner: Option<Weak<dyn ProfileOwner>>, json: &serde_json::Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::malformed(format!("profile must be an object, got {}", json_type_name(json))))?;
        if object.len() != 2 {
            return Err(Error::malformed(format!(
                "profile must have exactly 2 keys, got {}",
                object.len()
            )));
        }

        let name = object
            .get("name")
            .ok_or_else(|| Error::malformed("profile is missing 'name'"))?
            .as_str()
            .ok_or_else(|| Error::malformed("profile 'name' must be a string"))?;
        let config = object
            .get("config")
            .ok_or_else(|| Error::malformed(format!("profile '{}' is missing 'config'", name)))?
            .as_array()
            .ok_or_else(|| Error::malformed(format!("profile '{}' 'config' must be an array", name)))?;

        let mut profile = Self {
            id: ProfileId::next(),
            name: name.to_string(),
            entries: Vec::with_capacity(config.len()),
            owner,
        };
        for (index, raw) in config.iter().enumerate() {
            match DataEntry::from_json(raw) {
                Ok(entry) => profile.upsert(entry),
                Err(e) => error!(
                    profile = %profile.name,
                    index,
                    entry = %raw,
                    error = %e,
                    "Skipping unreadable config entry"
                ),
            }
        }

        Ok(profile)
    }

    /// Copy of this profile's entries under a new name and owner
    pub(crate) fn duplicate<S: Into<String>>(&self, name: S, owner: Option<Weak<dyn ProfileOwner>>) -> Self {
        Self {
            id: ProfileId::next(),
            name: name.into(),
            entries: self.entries.clone(),
            owner,
        }
    }

    fn owner(&self) -> Option<Arc<dyn ProfileOwner>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    fn upsert(&mut self, entry: DataEntry) {
        match self.entries.iter_mut().find(|e| e.name() == entry.name()) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .field("owner", &self.owner_name())
            .finish()
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.entries == other.entries
    }
}
