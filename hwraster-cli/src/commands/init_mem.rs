//! Init-mem command implementation
//!
//! Writes the frame buffer and depth buffer initialisation files.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use hwraster_core::memfile::{write_fill_mem, FRAME_BUFFER_DEPTH};

#[derive(Debug, Clone, Args)]
pub struct InitMemArgs {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Number of entries in each buffer
    #[arg(long, default_value_t = FRAME_BUFFER_DEPTH)]
    pub depth: usize,
}

/// Run the init-mem command
pub fn run(args: &InitMemArgs) -> Result<()> {
    // black RGB444 pixels, and the farthest 8-bit depth
    let buffers = [("frame_buffer.mem", 3, 0x000), ("z_buffer.mem", 2, 0xFF)];

    let mut contents = Vec::with_capacity(buffers.len());
    for (name, digits, value) in buffers {
        let mut bytes = Vec::new();
        write_fill_mem(&mut bytes, args.depth, digits, value)?;
        contents.push((name, bytes));
    }

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create output directory: {}", args.out.display()))?;
    for (name, bytes) in contents {
        let path = args.out.join(name);
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {} ({} entries)", path.display(), args.depth);
    }
    Ok(())
}
