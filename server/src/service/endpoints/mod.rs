//! Endpoint handlers organized by domain

pub mod crud;
pub mod results;
pub mod session;
pub mod settings;
pub mod tables;

pub use session::SessionEndpoints;
pub use settings::SettingsEndpoints;
