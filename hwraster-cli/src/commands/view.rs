//! View command implementation
//!
//! Opens the interactive terminal viewer on a mesh.

use anyhow::{Context, Result};
use clap::Args;

use crate::args::{AtlasArgs, MeshArgs, RenderArgs};
use crate::TerminalApp;

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub mesh: MeshArgs,

    #[command(flatten)]
    pub atlas: AtlasArgs,

    #[command(flatten)]
    pub render: RenderArgs,
}

/// Run the view command
pub fn run(args: &ViewArgs) -> Result<()> {
    let mut materials = args.atlas.allocator(&args.mesh);
    let mesh = args.mesh.load(&mut materials)?;
    let mut provider = args.atlas.provider(&args.mesh)?;
    let atlas = provider.produce(&materials)?;
    // width and height are replaced every frame by the terminal size
    let config = args.render.config(320, 240)?;

    let mut app = TerminalApp::new(mesh, atlas, provider, config);
    app.run().context("terminal viewer failed")
}
