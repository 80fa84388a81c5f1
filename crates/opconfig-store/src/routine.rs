/*!
 * Routine-side integration.
 *
 * A routine implements [`ConfiguredOpMode`] and reads its tunables from the
 * profile it is handed; [`crate::registry::Configurations::configure`] finds
 * the right profile.
 */
use opconfig_core::error::Result;

use crate::profile::Profile;

/// A routine that declares named configuration values
pub trait ConfiguredOpMode {
    /// Routine name, the key its profiles are stored under
    fn name(&self) -> &str;

    /// Read configuration values from the routine's active profile.
    ///
    /// Values are usually read with [`Profile::get`], which stores the given
    /// default on first use.
    fn configure(&mut self, profile: &mut Profile) -> Result<()>;
}
