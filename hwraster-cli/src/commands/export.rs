//! Export command implementation
//!
//! Turns a mesh into the vertex and texture memory images the hardware
//! loads, plus PNG previews of the atlas and of the rendered scene.

use anyhow::{bail, Context, Result};
use clap::Args;
use image::ImageFormat;
use log::{debug, info, warn};
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use hwraster_core::memfile::{
    vertex_records, write_texture_mem, write_vertex_mem, VertexMemOptions, DEFAULT_MAX_LINES,
};
use hwraster_core::{Camera, Mat4, Renderer};

use crate::args::{AtlasArgs, MeshArgs, RenderArgs};
use crate::renderer::HalfBlockRenderer;

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub mesh: MeshArgs,

    #[command(flatten)]
    pub atlas: AtlasArgs,

    #[command(flatten)]
    pub render: RenderArgs,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Title written as the first comment of vertex_data.mem
    #[arg(long)]
    pub title: Option<String>,

    /// Vertex memory budget in lines
    #[arg(long, default_value_t = DEFAULT_MAX_LINES)]
    pub max_lines: usize,

    /// Comment every vertex with its decoded values
    #[arg(long)]
    pub annotate: bool,

    /// Also print the scene preview to the terminal
    #[arg(long)]
    pub preview_terminal: bool,
}

/// Run the export command
pub fn run(args: &ExportArgs) -> Result<()> {
    let mut materials = args.atlas.allocator(&args.mesh);
    let mesh = args.mesh.load(&mut materials)?;
    for material in materials.iter() {
        info!(
            "material {} `{}` texture {}",
            material.id,
            material.name,
            material.texture.as_deref().unwrap_or("-")
        );
    }

    let mut provider = args.atlas.provider(&args.mesh)?;
    let atlas = provider
        .produce(&materials)
        .context("failed to build the texture atlas")?;

    // Everything is produced in memory first; nothing touches disk on error
    let records = vertex_records(&mesh, |m, uv| provider.map_uv(m, uv))?;
    let options = VertexMemOptions {
        title: args.title.clone(),
        annotate: args.annotate,
        max_lines: args.max_lines,
    };
    let mut vertex_mem = Vec::new();
    let summary = write_vertex_mem(&mut vertex_mem, &records, &options)?;

    let mut texture_mem = Vec::new();
    write_texture_mem(&mut texture_mem, &atlas)?;

    let config = args.render.config(320, 240)?;
    let renderer = Renderer::new(config);
    let mvp = Camera::new(config.width, config.height).mvp(&Mat4::identity());
    let frame = renderer.render(&mesh, &mvp, &atlas, |m, uv| provider.map_uv(m, uv))?;

    let mut texture_png = Vec::new();
    atlas
        .to_image()
        .write_to(&mut Cursor::new(&mut texture_png), ImageFormat::Png)
        .context("failed to encode the atlas preview")?;
    let mut scene_png = Vec::new();
    frame
        .canvas
        .to_image()
        .write_to(&mut Cursor::new(&mut scene_png), ImageFormat::Png)
        .context("failed to encode the scene preview")?;

    write_outputs(
        &args.out,
        &[
            ("vertex_data.mem", vertex_mem.as_slice()),
            ("texture.mem", texture_mem.as_slice()),
            ("preview_texture.png", texture_png.as_slice()),
            ("preview_scene.png", scene_png.as_slice()),
        ],
    )?;

    println!(
        "Exported {} triangles ({} vertex lines of {}, {} wrapped values) to {}",
        mesh.faces.len(),
        summary.data_lines,
        args.max_lines,
        summary.wrapped,
        args.out.display()
    );
    println!(
        "Preview: {} drawn, {} culled, {} degenerate, {} pixels",
        frame.stats.drawn, frame.stats.culled, frame.stats.degenerate, frame.stats.pixels
    );

    if args.preview_terminal {
        let (columns, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let cells = HalfBlockRenderer::new(columns, rows.saturating_sub(2));
        let mut stdout = io::stdout();
        cells.draw(&mut stdout, &frame.canvas)?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    Ok(())
}

/// Write every file under a `.partial` name, then rename them into place.
///
/// A failed write removes the staged files, so the targets are either all
/// replaced or all left as they were.
fn write_outputs(dir: &Path, files: &[(&str, &[u8])]) -> Result<()> {
    for (name, _) in files {
        let path = dir.join(name);
        if path.is_dir() {
            bail!("output path is a directory: {}", path.display());
        }
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let target = dir.join(name);
        let partial = dir.join(format!("{name}.partial"));
        if let Err(e) = fs::write(&partial, bytes) {
            for (path, _) in &staged {
                if let Err(e) = fs::remove_file(path) {
                    warn!("failed to remove {}: {e}", path.display());
                }
            }
            return Err(e).with_context(|| format!("failed to write {}", partial.display()));
        }
        staged.push((partial, target));
    }

    for (partial, target) in &staged {
        fs::rename(partial, target)
            .with_context(|| format!("failed to move {} into place", target.display()))?;
        debug!("wrote {}", target.display());
    }
    Ok(())
}
