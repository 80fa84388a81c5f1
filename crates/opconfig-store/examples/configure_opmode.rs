//! Walks one routine through a season: first run writes defaults, the
//! drive team tunes a second profile, and the routine picks it up.
//!
//! Run with `OPCONFIG__STORAGE__PATH=/tmp/opconfig.json cargo run --example configure_opmode`.

use anyhow::Result;
use tracing::info;

use opconfig_core::config::{SettingsBuilder, ENV_PREFIX};
use opconfig_store::{read_profile, write_profile, ConfiguredOpMode, Profile};

struct AutoPark {
    alliance: String,
    delay_ms: i64,
    drive_power: f64,
    use_camera: bool,
}

impl ConfiguredOpMode for AutoPark {
    fn name(&self) -> &str {
        "AutoPark"
    }

    fn configure(&mut self, profile: &mut Profile) -> opconfig_core::error::Result<()> {
        self.alliance = profile.get_string("alliance", "red")?;
        self.delay_ms = profile.get_long("delay_ms", 0)?;
        self.drive_power = profile.get_double("drive_power", 0.6)?;
        self.use_camera = profile.get_bool("use_camera", true)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    let settings = SettingsBuilder::new()
        .with_environment_prefix(ENV_PREFIX)
        .build()?;
    let configurations = opconfig_store::init(&settings)?;

    let mut routine = AutoPark {
        alliance: String::new(),
        delay_ms: 0,
        drive_power: 0.0,
        use_camera: false,
    };
    configurations.configure(&mut routine)?;
    info!(
        alliance = %routine.alliance,
        delay_ms = routine.delay_ms,
        drive_power = routine.drive_power,
        use_camera = routine.use_camera,
        "Configured with defaults"
    );

    // What the on-device editor does
    let opmode = configurations.opmode(routine.name())?;
    let blue = match opmode.profile("blue")? {
        Some(profile) => profile,
        None => opmode.duplicate_profile(opconfig_store::DEFAULT_PROFILE, "blue")?,
    };
    {
        let mut blue = write_profile(&blue)?;
        blue.set_text("alliance", "blue")?;
        blue.set_text("delay_ms", "2500")?;
    }
    read_profile(&blue)?.activate();

    configurations.configure(&mut routine)?;
    info!(alliance = %routine.alliance, delay_ms = routine.delay_ms, "Configured from 'blue'");

    opconfig_store::registry::shutdown()?;
    Ok(())
}
