//! Lumen Core - Foundational types for the Lumen scene viewer
//!
//! This crate provides the pieces every other Lumen crate leans on:
//! - `LumenError` and the `Result` alias
//! - `BezierCurve` - closed-form cubic curve used to animate lights
//! - `GameClock` - frame timing with a fixed-step accumulator
//! - Re-exported `glam` math types

mod bezier;
mod clock;
mod error;

pub use bezier::{BezierCurve, DEFAULT_SAMPLE_STEP};
pub use clock::GameClock;
pub use error::{LumenError, Result};
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
