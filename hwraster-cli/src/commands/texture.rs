//! Texture command implementation
//!
//! Converts an image (or a generated test pattern) into RGB444 texture memory.

use anyhow::{bail, Context, Result};
use clap::Args;
use image::imageops::{self, FilterType};
use log::warn;
use std::fs;
use std::path::PathBuf;

use hwraster_core::atlas::xor_texture;
use hwraster_core::memfile::write_texture_mem;
use hwraster_core::TextureAtlas;

#[derive(Debug, Clone, Args)]
pub struct TextureArgs {
    /// Source image
    #[arg(required_unless_present = "xor")]
    pub input: Option<PathBuf>,

    /// Generate the XOR test pattern instead of reading an image
    #[arg(long, conflicts_with = "input")]
    pub xor: bool,

    /// Edge length of the texture memory in pixels
    #[arg(long, default_value_t = 64)]
    pub size: u32,

    /// Output memory file
    #[arg(short, long, default_value = "texture.mem")]
    pub output: PathBuf,

    /// Also save the converted texture as a PNG
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

/// Load `path` as a square texture of `size`, resizing when needed
pub fn load_texture(path: &std::path::Path, size: u32) -> Result<TextureAtlas> {
    let img = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgb8();
    let img = if img.dimensions() != (size, size) {
        warn!(
            "{} is {}x{}, resizing to {size}x{size}",
            path.display(),
            img.width(),
            img.height()
        );
        imageops::resize(&img, size, size, FilterType::Nearest)
    } else {
        img
    };
    Ok(TextureAtlas::from_image(&img)?)
}

/// Run the texture command
pub fn run(args: &TextureArgs) -> Result<()> {
    let atlas = match (&args.input, args.xor) {
        (_, true) => xor_texture(args.size)?,
        (Some(path), false) => load_texture(path, args.size)?,
        (None, false) => bail!("an input image or --xor is required"),
    };

    let mut mem = Vec::new();
    write_texture_mem(&mut mem, &atlas)?;
    fs::write(&args.output, &mem)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(preview) = &args.preview {
        atlas
            .to_image()
            .save(preview)
            .with_context(|| format!("failed to write {}", preview.display()))?;
    }

    println!(
        "Wrote {} ({}x{}, {} lines)",
        args.output.display(),
        atlas.width(),
        atlas.height(),
        atlas.pixels().len()
    );
    Ok(())
}
