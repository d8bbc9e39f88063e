//! Lumen Viewer - shadow-casting multi-light scene viewer
//!
//! Usage:
//!   lumen-viewer [--config <lumen.toml>] [--scene <mesh>] [--resources <dir>]

use anyhow::{Context, Result};
use clap::Parser;
use lumen_viewer::{ConfigOverrides, LumenApp, ViewerConfig};
use std::path::PathBuf;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "lumen-viewer")]
#[command(about = "Lumen viewer - multi-light shadow rendering with a minimap and control panel")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene mesh, relative to the resource directory
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Resource directory
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Shadow map side length in texels
    #[arg(long)]
    shadow_resolution: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Launch in fullscreen mode
    #[arg(long)]
    fullscreen: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str()))
        .init();

    let overrides = ConfigOverrides {
        scene: args.scene,
        resources: args.resources,
        shadow_resolution: args.shadow_resolution,
        width: args.width,
        height: args.height,
        fullscreen: args.fullscreen,
    };
    let config = ViewerConfig::resolve(args.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;

    println!("Scene: {}", config.resource_path(&config.scene).display());
    println!();
    println!("Controls:");
    println!("  WASD       - Move");
    println!("  Space / C  - Up / Down");
    println!("  Shift/Alt  - Fast / Slow");
    println!("  Left drag  - Look");
    println!("  V          - Toggle fly / third person");
    println!("  1-4        - Fly, third person, minimap, light camera");
    println!("  M          - Toggle minimap");
    println!("  F11        - Toggle fullscreen");
    println!("  Escape     - Exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LumenApp::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.take_startup_error() {
        return Err(err);
    }
    Ok(())
}
