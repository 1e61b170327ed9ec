//! MVP command implementation
//!
//! Builds model, view and projection matrices for a camera setup and prints
//! them along with the SystemVerilog initialiser for the geometry engine.

use anyhow::{Context, Result};
use clap::Args;
use nalgebra::Point3;
use std::fs;
use std::path::PathBuf;

use hwraster_core::memfile::verilog_matrix;
use hwraster_core::{Camera, Mat4, Transform, Vec3};

use crate::args::parse_triple;

#[derive(Debug, Clone, Args)]
pub struct MvpArgs {
    /// Camera position as X,Y,Z
    #[arg(long, value_parser = parse_triple, default_value = "0,5,10", allow_hyphen_values = true)]
    pub eye: [f64; 3],

    /// Point the camera looks at
    #[arg(long, value_parser = parse_triple, default_value = "0,0,0", allow_hyphen_values = true)]
    pub target: [f64; 3],

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 90.0)]
    pub fov: f64,

    #[arg(long, default_value_t = 1.0)]
    pub near: f64,

    #[arg(long, default_value_t = 20.0)]
    pub far: f64,

    /// Model translation as X,Y,Z
    #[arg(long, value_parser = parse_triple, default_value = "0,0,0", allow_hyphen_values = true)]
    pub position: [f64; 3],

    /// Model scale as X,Y,Z
    #[arg(long, value_parser = parse_triple, default_value = "1,1,1", allow_hyphen_values = true)]
    pub scale: [f64; 3],

    /// Model rotation about Z in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rot_z: f64,

    /// Also write the SystemVerilog initialiser to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl MvpArgs {
    pub fn camera(&self) -> Camera {
        let mut camera = Camera::new(320, 240);
        let [ex, ey, ez] = self.eye;
        let [tx, ty, tz] = self.target;
        camera.position = Point3::new(ex, ey, ez);
        camera.target = Point3::new(tx, ty, tz);
        camera.fov = self.fov;
        camera.near = self.near;
        camera.far = self.far;
        camera
    }

    pub fn model(&self) -> Mat4 {
        Transform::model_matrix(
            Vec3::from(self.position),
            Vec3::from(self.scale),
            self.rot_z.to_radians(),
        )
    }
}

/// Run the mvp command
pub fn run(args: &MvpArgs) -> Result<()> {
    let camera = args.camera();
    let model = args.model();
    let view = camera.view_matrix();
    let projection = camera.projection_matrix();
    let mvp = Transform::mvp_matrix(&model, &view, &projection);

    println!("Model:{model:.4}");
    println!("View:{view:.4}");
    println!("Projection:{projection:.4}");
    println!("MVP:{mvp:.4}");

    let verilog = verilog_matrix(&mvp);
    println!("{verilog}");

    if let Some(path) = &args.output {
        fs::write(path, &verilog).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}
