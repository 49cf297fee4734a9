//! CLI command handlers for SiteLayers.
//!
//! This module provides headless, scriptable access to the viewer core:
//! color lookups, dataset loading reports, legends and configuration.

pub mod common;
pub mod config;
pub mod inspect;
pub mod legend;
pub mod style;

// Re-export types used by main.rs and tests
pub use common::{CliError, CliResult, ExitCode};
pub use config::ConfigArgs;
pub use inspect::InspectArgs;
pub use legend::LegendArgs;
pub use style::StyleArgs;
