/*!
 * Per-routine profile sets.
 *
 * An [`OpModeConfig`] owns every profile of one routine and remembers which
 * one is active. A profile named [`DEFAULT_PROFILE`] always exists and is
 * what the active selection falls back to.
 *
 * Lock order: a profile's lock may be held while taking the config's state
 * lock, never the other way round.
 *
 * Wire form: `{"name": <string>, "active": <string>, "profiles": [<profile>, ...]}`.
 */
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::json;
use tracing::{debug, error, info, warn};

use opconfig_core::error::{Error, Result};
use opconfig_core::types::json_type_name;

use crate::profile::{read_profile, Profile, ProfileId, ProfileOwner, SharedProfile};

/// Name of the profile every routine has
pub const DEFAULT_PROFILE: &str = "default";

/// The profiles of one routine
pub struct OpModeConfig {
    name: String,
    state: RwLock<OpModeState>,
    this: Weak<OpModeConfig>,
}

/// A stored profile with its name and id kept outside its lock
#[derive(Debug)]
struct ProfileSlot {
    name: String,
    id: ProfileId,
    profile: SharedProfile,
}

impl ProfileSlot {
    fn new(profile: Profile) -> Self {
        Self {
            name: profile.name().to_string(),
            id: profile.id(),
            profile: Arc::new(RwLock::new(profile)),
        }
    }

    fn matches(&self, name: &str, id: Option<ProfileId>) -> bool {
        self.name == name && id.map_or(true, |id| id == self.id)
    }
}

#[derive(Debug)]
struct OpModeState {
    profiles: Vec<ProfileSlot>,
    active: String,
}

impl OpModeState {
    fn find(&self, name: &str, id: Option<ProfileId>) -> Option<&ProfileSlot> {
        self.profiles.iter().find(|slot| slot.matches(name, id))
    }

    fn get(&self, name: &str) -> Option<&SharedProfile> {
        self.find(name, None).map(|slot| &slot.profile)
    }
}

impl OpModeConfig {
    /// Create a routine config holding an empty, active default profile
    pub fn new<S: Into<String>>(name: S) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|this: &Weak<OpModeConfig>| {
            let owner: Weak<dyn ProfileOwner> = this.clone();
            let default = Profile::with_owner(DEFAULT_PROFILE, owner);
            Self {
                name,
                state: RwLock::new(OpModeState {
                    profiles: vec![ProfileSlot::new(default)],
                    active: DEFAULT_PROFILE.to_string(),
                }),
                this: this.clone(),
            }
        })
    }

    /// Routine name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle profiles use to reach this config
    pub fn owner_handle(&self) -> Weak<dyn ProfileOwner> {
        self.this.clone()
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<Option<SharedProfile>> {
        Ok(self.read_state()?.get(name).cloned())
    }

    /// The active profile
    pub fn active_profile(&self) -> Result<SharedProfile> {
        let state = self.read_state()?;
        state
            .get(&state.active)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("active profile '{}' of '{}'", state.active, self.name)))
    }

    /// Name of the active profile
    pub fn active_name(&self) -> Result<String> {
        Ok(self.read_state()?.active.clone())
    }

    /// Names of all profiles, in insertion order
    pub fn profile_names(&self) -> Result<Vec<String>> {
        Ok(self
            .read_state()?
            .profiles
            .iter()
            .map(|slot| slot.name.clone())
            .collect())
    }

    /// Create a new empty profile
    pub fn create_profile(&self, name: &str) -> Result<SharedProfile> {
        self.insert_profile(Profile::with_owner(name, self.owner_handle()))
    }

    /// Create a new profile holding a copy of `source`'s entries
    pub fn duplicate_profile(&self, source: &str, target: &str) -> Result<SharedProfile> {
        let source_profile = self
            .profile(source)?
            .ok_or_else(|| Error::not_found(format!("profile '{}' of '{}'", source, self.name)))?;
        let copy = read_profile(&source_profile)?.duplicate(target, Some(self.owner_handle()));
        self.insert_profile(copy)
    }

    /// Remove a profile by name. Returns whether anything was removed.
    pub fn remove_profile(&self, name: &str) -> bool {
        self.remove(name, None)
    }

    /// Make a profile active by name.
    ///
    /// An unknown name activates the default profile and returns `false`.
    pub fn activate_profile(&self, name: &str) -> bool {
        self.activate(name, None)
    }

    /// Encode as `{"name": ..., "active": ..., "profiles": [...]}`
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let (active, shared) = {
            let state = self.read_state()?;
            let shared: Vec<SharedProfile> = state.profiles.iter().map(|slot| slot.profile.clone()).collect();
            (state.active.clone(), shared)
        };
        let profiles = shared
            .iter()
            .map(|p| read_profile(p).map(|p| p.to_json()))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "name": self.name,
            "active": active,
            "profiles": profiles,
        }))
    }

    /// Parse a routine config.
    ///
    /// Any malformed profile object aborts the parse. A missing default
    /// profile is recreated and an unknown active name falls back to it.
    pub fn from_json(json: &serde_json::Value) -> Result<Arc<Self>> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::malformed(format!("opmode must be an object, got {}", json_type_name(json))))?;
        if object.len() != 3 {
            return Err(Error::malformed(format!(
                "opmode must have exactly 3 keys, got {}",
                object.len()
            )));
        }

        let name = object
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::malformed("opmode 'name' must be a string"))?;
        let active = object
            .get("active")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::malformed(format!("opmode '{}' 'active' must be a string", name)))?;
        let profiles = object
            .get("profiles")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::malformed(format!("opmode '{}' 'profiles' must be an array", name)))?;

        let config = Self::new(name);
        {
            let mut state = config.write_state()?;
            state.profiles.clear();
            for raw in profiles {
                let profile = Profile::from_json(Some(config.owner_handle()), raw)?;
                if state.get(profile.name()).is_some() {
                    return Err(Error::malformed(format!(
                        "opmode '{}' has duplicate profile '{}'",
                        name,
                        profile.name()
                    )));
                }
                state.profiles.push(ProfileSlot::new(profile));
            }

            if state.get(DEFAULT_PROFILE).is_none() {
                warn!(opmode = name, "No default profile stored, creating an empty one");
                let default = Profile::with_owner(DEFAULT_PROFILE, config.owner_handle());
                state.profiles.insert(0, ProfileSlot::new(default));
            }

            if state.get(active).is_some() {
                state.active = active.to_string();
            } else {
                warn!(opmode = name, active, "Stored active profile does not exist, using default");
                state.active = DEFAULT_PROFILE.to_string();
            }
        }

        debug!(opmode = name, "Loaded opmode config");
        Ok(config)
    }

    fn insert_profile(&self, profile: Profile) -> Result<SharedProfile> {
        let mut state = self.write_state()?;
        if state.get(profile.name()).is_some() {
            return Err(Error::already_exists(format!(
                "profile '{}' of '{}'",
                profile.name(),
                self.name
            )));
        }
        let slot = ProfileSlot::new(profile);
        let shared = slot.profile.clone();
        info!(opmode = %self.name, profile = %slot.name, "Created profile");
        state.profiles.push(slot);
        Ok(shared)
    }

    fn remove(&self, name: &str, id: Option<ProfileId>) -> bool {
        if name == DEFAULT_PROFILE {
            warn!(opmode = %self.name, "The default profile cannot be deleted");
            return false;
        }

        let mut state = match self.write_state() {
            Ok(state) => state,
            Err(e) => {
                error!(opmode = %self.name, error = %e, "Cannot delete profile");
                return false;
            }
        };

        let before = state.profiles.len();
        state.profiles.retain(|slot| !slot.matches(name, id));
        if state.profiles.len() == before {
            debug!(opmode = %self.name, profile = name, "Profile already gone");
            return false;
        }

        if state.active == name {
            state.active = DEFAULT_PROFILE.to_string();
        }
        info!(opmode = %self.name, profile = name, "Deleted profile");
        true
    }

    fn activate(&self, name: &str, id: Option<ProfileId>) -> bool {
        let mut state = match self.write_state() {
            Ok(state) => state,
            Err(e) => {
                error!(opmode = %self.name, error = %e, "Cannot change active profile");
                return false;
            }
        };

        if state.find(name, id).is_some() {
            state.active = name.to_string();
            info!(opmode = %self.name, profile = name, "Activated profile");
            true
        } else {
            warn!(opmode = %self.name, profile = name, "Unknown profile, activating default");
            state.active = DEFAULT_PROFILE.to_string();
            false
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, OpModeState>> {
        self.state.read().map_err(|_| {
            Error::lock(format!("Failed to acquire read lock on opmode '{}'", self.name))
        })
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, OpModeState>> {
        self.state.write().map_err(|_| {
            Error::lock(format!("Failed to acquire write lock on opmode '{}'", self.name))
        })
    }
}

impl ProfileOwner for OpModeConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_profile(&self, name: &str, id: ProfileId) -> bool {
        self.remove(name, Some(id))
    }

    fn set_active_profile(&self, name: &str, id: ProfileId) -> bool {
        self.activate(name, Some(id))
    }
}

impl fmt::Debug for OpModeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpModeConfig")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish()
    }
}
