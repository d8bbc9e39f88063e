//! Lumen viewer: window, input, configuration and the control panel
//! around the `lumen-render` frame renderer

mod app;
pub mod config;
pub mod input;
pub mod panels;

pub use app::LumenApp;
pub use config::{ConfigOverrides, ViewerConfig};
