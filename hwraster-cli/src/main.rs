//! hwraster - mesh exporter and software preview for the FPGA rasterizer
//!
//! Subcommands produce the memory images the hardware loads at start-up and
//! check the geometry engine's arithmetic against a software reference.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::process::ExitCode;

use hwraster_cli::commands;

/// hwraster - Q16.16 mesh export and preview
#[derive(Parser)]
#[command(name = "hwraster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a mesh to vertex_data.mem and texture.mem with PNG previews
    Export(commands::export::ExportArgs),

    /// Render a mesh spinning about Z into an animated GIF
    Spin(commands::spin::SpinArgs),

    /// Print camera matrices and the SystemVerilog MVP initialiser
    Mvp(commands::mvp::MvpArgs),

    /// Trace vertices through every stage of the geometry engine
    Verify(commands::verify::VerifyArgs),

    /// Convert an image to RGB444 texture memory
    Texture(commands::texture::TextureArgs),

    /// Write frame buffer and depth buffer initialisation files
    InitMem(commands::init_mem::InitMemArgs),

    /// Interactive terminal viewer
    View(commands::view::ViewArgs),
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Export(args) => commands::export::run(args),
        Commands::Spin(args) => commands::spin::run(args),
        Commands::Mvp(args) => commands::mvp::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Texture(args) => commands::texture::run(args),
        Commands::InitMem(args) => commands::init_mem::run(args),
        Commands::View(args) => commands::view::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
