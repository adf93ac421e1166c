//! Document loaders.

pub mod settings_xml;

pub use settings_xml::{FairingSettings, SettingsError, parse_settings};
