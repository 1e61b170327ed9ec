//! Verify command implementation
//!
//! Traces each vertex through the same stages as the geometry engine so the
//! numbers can be compared against a simulation waveform.

use anyhow::Result;
use clap::Args;

use hwraster_core::projection::trace;
use hwraster_core::{fixed, Camera, Mat4, MaterialAllocator, Viewport};

use crate::args::{MeshArgs, VerticalArg};

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub mesh: MeshArgs,

    /// Use the default look-at camera instead of the MVP baked into the hardware
    #[arg(long)]
    pub camera: bool,

    /// Screen Y direction
    #[arg(long, value_enum, default_value = "math")]
    pub vertical: VerticalArg,

    /// Trace at most this many vertices
    #[arg(long, default_value_t = 3)]
    pub limit: usize,
}

/// Run the verify command
pub fn run(args: &VerifyArgs) -> Result<()> {
    let mesh = args.mesh.load(&mut MaterialAllocator::new())?;
    let mvp = if args.camera {
        Camera::default().mvp(&Mat4::identity())
    } else {
        Camera::hardware_mvp()
    };
    let viewport = Viewport::default().with_vertical(args.vertical.into());

    println!("--- GEOMETRY ENGINE VERIFICATION ---");
    println!("MVP:{mvp:.4}");

    for (i, v) in mesh.positions.iter().take(args.limit).enumerate() {
        let t = trace(v, &mvp, &viewport);
        println!("\nVertex {i}: ({:.4}, {:.4}, {:.4})", v.x, v.y, v.z);
        println!(
            "  [1] clip  x {:.4}  y {:.4}  z {:.4}  w {:.4}",
            t.clip.x, t.clip.y, t.clip.z, t.clip.w
        );
        if t.screen.guarded {
            println!("      w is near zero; the divide used a substitute");
        }
        println!("  [2] ndc   x {:.4}  y {:.4}  z {:.4}", t.ndc.x, t.ndc.y, t.ndc.z);
        println!("  [3] registers");
        for (name, value) in [("x", t.screen.x), ("y", t.screen.y), ("z", t.depth)] {
            println!(
                "      {name}: {} (hex {})",
                value.trunc() as i64,
                fixed::to_hex(value)
            );
        }
    }

    let drift = (Camera::default().mvp(&Mat4::identity()) - Camera::hardware_mvp())
        .abs()
        .max();
    println!("\nmax |camera - hardware| = {drift:.2e}");
    Ok(())
}
