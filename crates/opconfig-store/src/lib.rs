/*!
 * opconfig store
 *
 * Named, typed configuration values for robot routines, grouped into
 * switchable profiles and persisted to a single JSON file.
 *
 * ```no_run
 * use opconfig_core::config::SettingsBuilder;
 * use opconfig_store::{registry, write_profile};
 *
 * let settings = SettingsBuilder::new().build()?;
 * let configurations = registry::init(&settings)?;
 *
 * let profile = configurations.active_profile("TeleOp")?;
 * let speed: f64 = write_profile(&profile)?.get("speed", 0.7)?;
 * # let _ = speed;
 *
 * registry::shutdown()?;
 * # Ok::<(), opconfig_core::error::Error>(())
 * ```
 */

#![warn(missing_docs)]

pub mod entry;
pub mod opmode;
pub mod profile;
pub mod registry;
pub mod routine;

pub use entry::DataEntry;
pub use opmode::{OpModeConfig, DEFAULT_PROFILE};
pub use profile::{read_profile, write_profile, Profile, ProfileId, ProfileOwner, SharedProfile};
pub use registry::Configurations;
pub use routine::ConfiguredOpMode;

/// opconfig store crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from `settings` and load the global registry
pub fn init(
    settings: &opconfig_core::config::Settings,
) -> Result<&'static Configurations, opconfig_core::error::Error> {
    opconfig_core::logging::init_with_settings(&settings.logging)?;
    tracing::info!("opconfig store {} initialized", VERSION);
    registry::init(settings)
}
