/*!
 * Prelude module for opconfig core.
 *
 * Re-exports the types most callers need in one import.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export value types
pub use crate::types::{Kind, Value, ValueType};

// Re-export settings types
pub use crate::config::{LoggingSettings, Settings, SettingsBuilder, StorageSettings};

// Re-export logging macros
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::init;
