//! GUI panels for the viewer

mod control_panel;

pub use control_panel::{control_panel, ControlPanelView};
