/// One-frame software render: project, cull, sort, rasterize
use log::{debug, warn};

use crate::atlas::TextureAtlas;
use crate::error::Result;
use crate::geometry::{Mat4, MaterialId, Mesh, Vec2, Vec3};
use crate::projection::{project, Camera, ScreenVertex, VerticalConvention, Viewport};
use crate::raster::{draw, Canvas, Coverage, Rgb};
use crate::transform::Transform;
use crate::visibility::{build_render_list, order, CullMode, DepthOrder};

/// Everything that varies between asset families and preview targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub vertical: VerticalConvention,
    pub cull: CullMode,
    pub depth_order: DepthOrder,
    pub background: Rgb,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            vertical: VerticalConvention::Image,
            cull: CullMode::Positive,
            depth_order: DepthOrder::FarthestFirst,
            background: [10, 10, 10],
        }
    }
}

impl PipelineConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height).with_vertical(self.vertical)
    }
}

/// Counters gathered while rendering one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub faces: usize,
    pub culled: usize,
    pub degenerate: usize,
    pub guarded_vertices: usize,
    /// Triangles handed to the rasterizer that had non-zero area
    pub drawn: usize,
    pub pixels: usize,
}

/// A finished frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub canvas: Canvas,
    pub stats: FrameStats,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub config: PipelineConfig,
}

impl Renderer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Render `mesh` through `mvp` onto a fresh canvas.
    ///
    /// The mesh is validated first; bad indices or non-finite coordinates
    /// are returned as errors and nothing is drawn.
    ///
    /// `uv_map` is usually the atlas provider's [`map_uv`], so faces sample
    /// their material's slot.
    ///
    /// [`map_uv`]: crate::atlas::AtlasProvider::map_uv
    pub fn render<F>(&self, mesh: &Mesh, mvp: &Mat4, atlas: &TextureAtlas, uv_map: F) -> Result<Frame>
    where
        F: Fn(MaterialId, Vec2) -> Vec2,
    {
        mesh.validate()?;
        let viewport = self.config.viewport();
        let mut canvas = Canvas::new(self.config.width, self.config.height, self.config.background);
        let mut stats = FrameStats {
            faces: mesh.faces.len(),
            ..FrameStats::default()
        };

        let screen: Vec<ScreenVertex> = mesh
            .positions
            .iter()
            .map(|p| project(p, mvp, &viewport))
            .collect();
        stats.guarded_vertices = screen.iter().filter(|v| v.guarded).count();
        if stats.guarded_vertices > 0 {
            warn!(
                "{} vertices projected with w near zero; coordinates may be extreme",
                stats.guarded_vertices
            );
        }

        let mut list = build_render_list(mesh, &screen, self.config.cull, uv_map)?;
        stats.culled = list.culled;
        order(&mut list.items, self.config.depth_order);

        for item in &list.items {
            match draw(&mut canvas, atlas, item) {
                Coverage::Degenerate => stats.degenerate += 1,
                Coverage::Drawn(n) => {
                    stats.drawn += 1;
                    stats.pixels += n;
                }
            }
        }
        if stats.degenerate > 0 {
            warn!("skipped {} zero-area triangles", stats.degenerate);
        }
        debug!("frame: {stats:?}");

        Ok(Frame { canvas, stats })
    }

    /// Render `frames` independent frames, turning the model about Z by
    /// `360 / frames` degrees each time.
    pub fn spin_frames<F>(
        &self,
        mesh: &Mesh,
        camera: &Camera,
        frames: usize,
        atlas: &TextureAtlas,
        uv_map: F,
    ) -> Result<Vec<Frame>>
    where
        F: Fn(MaterialId, Vec2) -> Vec2,
    {
        (0..frames)
            .map(|i| {
                let angle = (i as f64 * 360.0 / frames as f64).to_radians();
                let model = Transform::model_matrix(Vec3::zeros(), Vec3::repeat(1.0), angle);
                self.render(mesh, &camera.mvp(&model), atlas, &uv_map)
            })
            .collect()
    }
}
