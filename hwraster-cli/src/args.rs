/// Arguments shared by several subcommands, and the mesh/atlas setup they drive
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use log::info;

use hwraster_core::atlas::{star_texture, xor_texture};
use hwraster_core::obj::{parse_mtl, parse_obj, ObjOptions};
use hwraster_core::transform::normalize_positions;
use hwraster_core::{
    AtlasProvider, CullMode, DepthOrder, Error, GridPalette, MaterialAllocator, Mesh,
    Passthrough, PipelineConfig, Rgb, RotationState, VerticalConvention, VerticalStrips,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Builtin {
    Triangle,
    Cube,
    D20,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AtlasKind {
    /// One flat colour per material in an 8x8 grid
    Grid,
    /// One texture per material in stacked strips
    Strips,
    /// A finished atlas image given with --texture
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CullArg {
    Positive,
    Negative,
    Off,
}

impl From<CullArg> for CullMode {
    fn from(arg: CullArg) -> Self {
        match arg {
            CullArg::Positive => CullMode::Positive,
            CullArg::Negative => CullMode::Negative,
            CullArg::Off => CullMode::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerticalArg {
    Image,
    Math,
}

impl From<VerticalArg> for VerticalConvention {
    fn from(arg: VerticalArg) -> Self {
        match arg {
            VerticalArg::Image => VerticalConvention::Image,
            VerticalArg::Math => VerticalConvention::Math,
        }
    }
}

/// Parse `X,Y,Z` into three floats
pub fn parse_triple(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected X,Y,Z but got `{s}`"));
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("`{part}` is not a number"))?;
    }
    Ok(out)
}

/// Parse `R,G,B` into an 8-bit colour
pub fn parse_rgb(s: &str) -> Result<Rgb, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected R,G,B but got `{s}`"));
    }
    let mut out = [0u8; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("`{part}` is not a 0-255 channel"))?;
    }
    Ok(out)
}

/// Where the geometry comes from and how it is normalised
#[derive(Debug, Clone, Args)]
pub struct MeshArgs {
    /// Wavefront OBJ file
    #[arg(conflicts_with = "builtin")]
    pub obj: Option<PathBuf>,

    /// Built-in mesh used when no OBJ is given
    #[arg(long, value_enum)]
    pub builtin: Option<Builtin>,

    /// MTL file (default: the OBJ path with an .mtl extension, if present)
    #[arg(long)]
    pub mtl: Option<PathBuf>,

    /// Uniform scale applied after recentring
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// Rotation in degrees applied after scaling, as X,Y,Z
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    pub rotate: Option<[f64; 3]>,

    /// Reverse the winding of every OBJ polygon
    #[arg(long)]
    pub flip_winding: bool,
}

impl MeshArgs {
    pub fn builtin_or_default(&self) -> Option<Builtin> {
        match (&self.obj, self.builtin) {
            (Some(_), _) => None,
            (None, Some(b)) => Some(b),
            (None, None) => Some(Builtin::Triangle),
        }
    }

    /// Load, validate and normalise the mesh, registering materials as it goes
    pub fn load(&self, materials: &mut MaterialAllocator) -> Result<Mesh> {
        let [x, y, z] = self.rotate.unwrap_or([0.0; 3]);
        let rotation = RotationState::from_degrees(x, y, z);

        let mesh = match (&self.obj, self.builtin_or_default()) {
            (Some(path), _) => {
                let mut mesh = self.load_obj(path, materials)?;
                normalize_positions(&mut mesh.positions, self.scale, &rotation);
                mesh
            }
            (None, builtin) => {
                let mut mesh = match builtin {
                    Some(Builtin::Cube) => Mesh::cube(2.0),
                    Some(Builtin::D20) => Mesh::icosahedron(3.5),
                    _ => Mesh::test_triangle(),
                };
                // built-ins are authored in place; scale and rotate about the origin
                let rot = rotation.matrix3();
                for p in mesh.positions.iter_mut() {
                    *p = rot * (*p * self.scale);
                }
                mesh
            }
        };
        info!(
            "mesh: {} positions, {} uvs, {} triangles",
            mesh.positions.len(),
            mesh.uvs.len(),
            mesh.faces.len()
        );
        Ok(mesh)
    }

    fn load_obj(&self, path: &Path, materials: &mut MaterialAllocator) -> Result<Mesh> {
        let mtl = match &self.mtl {
            Some(mtl) => Some(mtl.clone()),
            None => Some(path.with_extension("mtl")).filter(|p| p.exists()),
        };
        if let Some(mtl) = mtl {
            let text = fs::read_to_string(&mtl)
                .with_context(|| format!("failed to read MTL file: {}", mtl.display()))?;
            parse_mtl(&text, materials)
                .with_context(|| format!("failed to parse MTL file: {}", mtl.display()))?;
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read OBJ file: {}", path.display()))?;
        let options = ObjOptions {
            flip_winding: self.flip_winding,
        };
        parse_obj(&text, materials, &options)
            .with_context(|| format!("failed to parse OBJ file: {}", path.display()))
    }
}

/// How the texture atlas is built
#[derive(Debug, Clone, Args)]
pub struct AtlasArgs {
    /// Atlas layout (default: grid for OBJ input, a procedural texture for built-ins)
    #[arg(long, value_enum)]
    pub atlas: Option<AtlasKind>,

    /// Atlas image for --atlas image
    #[arg(long)]
    pub texture: Option<PathBuf>,

    /// Directory material textures are looked up in (default: next to the OBJ)
    #[arg(long)]
    pub texture_dir: Option<PathBuf>,

    /// Atlas edge length in pixels
    #[arg(long, default_value_t = 64)]
    pub atlas_size: u32,
}

const BLUE: Rgb = [0, 0, 255];
const YELLOW: Rgb = [255, 255, 0];
const RED: Rgb = [255, 0, 0];

impl AtlasArgs {
    /// The material allocator matching the chosen layout
    pub fn allocator(&self, mesh: &MeshArgs) -> MaterialAllocator {
        match self.kind(mesh) {
            Some(AtlasKind::Grid) => MaterialAllocator::with_capacity(GridPalette::default().slots()),
            _ => MaterialAllocator::new(),
        }
    }

    fn kind(&self, mesh: &MeshArgs) -> Option<AtlasKind> {
        match (self.atlas, &mesh.obj) {
            (Some(kind), _) => Some(kind),
            (None, Some(_)) => Some(AtlasKind::Grid),
            (None, None) => None,
        }
    }

    pub fn provider(&self, mesh: &MeshArgs) -> Result<Box<dyn AtlasProvider>> {
        let texture_dir = self
            .texture_dir
            .clone()
            .or_else(|| mesh.obj.as_ref().and_then(|p| p.parent()).map(Path::to_path_buf));

        let provider: Box<dyn AtlasProvider> = match self.kind(mesh) {
            Some(AtlasKind::Grid) => {
                let grid = GridPalette::new(self.atlas_size, 8);
                Box::new(match texture_dir {
                    Some(dir) => grid.with_texture_dir(dir),
                    None => grid,
                })
            }
            Some(AtlasKind::Strips) => {
                let strips = VerticalStrips::new(self.atlas_size, 2);
                Box::new(match texture_dir {
                    Some(dir) => strips.with_texture_dir(dir),
                    None => strips,
                })
            }
            Some(AtlasKind::Image) => {
                let Some(path) = &self.texture else {
                    return Err(Error::MissingAtlas).context("--atlas image needs --texture");
                };
                Box::new(
                    Passthrough::open(path)
                        .with_context(|| format!("failed to open atlas: {}", path.display()))?,
                )
            }
            None => {
                let atlas = match mesh.builtin_or_default() {
                    Some(Builtin::D20) => star_texture(self.atlas_size, BLUE, YELLOW)?,
                    Some(Builtin::Cube) => xor_texture(self.atlas_size)?,
                    _ => hwraster_core::TextureAtlas::solid(RED),
                };
                Box::new(Passthrough::new(atlas.to_image()))
            }
        };
        Ok(provider)
    }
}

/// Preview rendering switches
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Which screen-space winding is treated as a back face
    #[arg(long, value_enum, default_value = "positive")]
    pub cull: CullArg,

    /// Screen Y direction
    #[arg(long, value_enum, default_value = "image")]
    pub vertical: VerticalArg,

    /// Draw in face order instead of farthest first
    #[arg(long)]
    pub no_sort: bool,

    /// Preview background colour as R,G,B
    #[arg(long, value_parser = parse_rgb, default_value = "10,10,10")]
    pub background: Rgb,
}

impl RenderArgs {
    pub fn config(&self, width: u32, height: u32) -> Result<PipelineConfig> {
        if width == 0 || height == 0 {
            bail!("preview size must be non-zero, got {width}x{height}");
        }
        Ok(PipelineConfig {
            width,
            height,
            vertical: self.vertical.into(),
            cull: self.cull.into(),
            depth_order: if self.no_sort {
                DepthOrder::Submission
            } else {
                DepthOrder::FarthestFirst
            },
            background: self.background,
        })
    }
}
