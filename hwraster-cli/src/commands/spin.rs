//! Spin command implementation
//!
//! Renders the mesh rotating about Z and saves the frames as a looping GIF.

use anyhow::{bail, Context, Result};
use clap::Args;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame};
use nalgebra::Point3;
use std::fs;
use std::path::PathBuf;

use hwraster_core::{Camera, Renderer};

use crate::args::{parse_triple, AtlasArgs, MeshArgs, RenderArgs};

#[derive(Debug, Clone, Args)]
pub struct SpinArgs {
    #[command(flatten)]
    pub mesh: MeshArgs,

    #[command(flatten)]
    pub atlas: AtlasArgs,

    #[command(flatten)]
    pub render: RenderArgs,

    /// Number of frames in one full turn
    #[arg(long, default_value_t = 12)]
    pub frames: usize,

    /// Time each frame is shown, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u32,

    /// Camera position as X,Y,Z
    #[arg(long, value_parser = parse_triple, default_value = "0,0,10", allow_hyphen_values = true)]
    pub eye: [f64; 3],

    /// Output GIF
    #[arg(short, long, default_value = "spin.gif")]
    pub output: PathBuf,
}

/// Run the spin command
pub fn run(args: &SpinArgs) -> Result<()> {
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }

    let mut materials = args.atlas.allocator(&args.mesh);
    let mesh = args.mesh.load(&mut materials)?;
    let mut provider = args.atlas.provider(&args.mesh)?;
    let atlas = provider.produce(&materials)?;

    let config = args.render.config(320, 240)?;
    let mut camera = Camera::new(config.width, config.height);
    let [x, y, z] = args.eye;
    camera.position = Point3::new(x, y, z);

    let rendered = Renderer::new(config).spin_frames(&mesh, &camera, args.frames, &atlas, |m, uv| {
        provider.map_uv(m, uv)
    })?;

    let delay = Delay::from_numer_denom_ms(args.delay_ms, 1);
    let frames = rendered.iter().map(|f| {
        let rgba = DynamicImage::ImageRgb8(f.canvas.to_image()).to_rgba8();
        Frame::from_parts(rgba, 0, 0, delay)
    });

    let mut gif = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut gif);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder
            .encode_frames(frames)
            .context("failed to encode GIF frames")?;
    }
    fs::write(&args.output, &gif)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let pixels: usize = rendered.iter().map(|f| f.stats.pixels).sum();
    println!(
        "Saved {} frames to {} ({} pixels drawn)",
        rendered.len(),
        args.output.display(),
        pixels
    );
    Ok(())
}
