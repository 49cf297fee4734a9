//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and where configuration lives.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "SiteLayers";

/// The binary name of the application (used in command examples).
pub const APP_BINARY_NAME: &str = "sitelayers";

/// Directory name under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "SiteLayers";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "SITELAYERS_CONFIG_DIR";
