/// Camera, perspective divide and viewport mapping
use nalgebra::Point3;

use crate::geometry::{Mat4, Vec3, Vec4};

/// Substituted for |w| below this value so the divide never produces Inf/NaN
pub const W_EPSILON: f64 = 1e-9;

/// Which way screen Y grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalConvention {
    /// Y grows downward from the top row: `(1 - ndc.y) * height / 2`
    #[default]
    Image,
    /// Y grows upward from the bottom row: `(ndc.y + 1) * height / 2`
    Math,
}

/// Target resolution plus the vertical mapping in use
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub vertical: VerticalConvention,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            vertical: VerticalConvention::Image,
        }
    }

    pub fn with_vertical(mut self, vertical: VerticalConvention) -> Self {
        self.vertical = vertical;
        self
    }

    /// Map normalized device coordinates to pixel space
    pub fn map(&self, ndc_x: f64, ndc_y: f64) -> (f64, f64) {
        let half_w = self.width as f64 / 2.0;
        let half_h = self.height as f64 / 2.0;
        let x = (ndc_x + 1.0) * half_w;
        let y = match self.vertical {
            VerticalConvention::Image => (1.0 - ndc_y) * half_h,
            VerticalConvention::Math => (ndc_y + 1.0) * half_h,
        };
        (x, y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

/// A vertex after projection. Recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    /// The clip-space w was too close to zero and got replaced by [`W_EPSILON`]
    pub guarded: bool,
}

impl ScreenVertex {
    pub fn new(x: f64, y: f64, w: f64) -> Self {
        Self {
            x,
            y,
            w,
            guarded: false,
        }
    }
}

fn guard_w(w: f64) -> (f64, bool) {
    if w.abs() < W_EPSILON {
        (W_EPSILON, true)
    } else {
        (w, false)
    }
}

/// Transform a point by the MVP, divide by w and map it onto the viewport.
///
/// No clipping happens here; off-screen coordinates are left for the
/// rasterizer's clamped scan bounds.
pub fn project(v: &Vec3, mvp: &Mat4, viewport: &Viewport) -> ScreenVertex {
    let clip = mvp * Vec4::new(v.x, v.y, v.z, 1.0);
    let (w, guarded) = guard_w(clip.w);
    let (x, y) = viewport.map(clip.x / w, clip.y / w);
    ScreenVertex { x, y, w, guarded }
}

/// Every intermediate value of one vertex's trip through the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexTrace {
    pub clip: Vec4,
    pub ndc: Vec3,
    pub screen: ScreenVertex,
    /// NDC z remapped from [-1, 1] to [0, 255]
    pub depth: f64,
}

/// Same computation as [`project`], keeping the intermediate stages
pub fn trace(v: &Vec3, mvp: &Mat4, viewport: &Viewport) -> VertexTrace {
    let clip = mvp * Vec4::new(v.x, v.y, v.z, 1.0);
    let (w, guarded) = guard_w(clip.w);
    let ndc = Vec3::new(clip.x / w, clip.y / w, clip.z / w);
    let (x, y) = viewport.map(ndc.x, ndc.y);
    VertexTrace {
        clip,
        ndc,
        screen: ScreenVertex { x, y, w, guarded },
        depth: (ndc.z + 1.0) * 127.5,
    }
}

/// Look-at camera with an OpenGL-style perspective projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 5.0, 10.0),
            target: Point3::origin(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 90.0,
            aspect: width as f64 / height as f64,
            near: 1.0,
            far: 20.0,
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov.to_radians(), self.near, self.far)
    }

    pub fn mvp(&self, model: &Mat4) -> Mat4 {
        self.projection_matrix() * self.view_matrix() * model
    }

    /// The MVP baked into the hardware's geometry engine: the default camera
    /// with an identity model, rounded to single precision.
    #[rustfmt::skip]
    pub fn hardware_mvp() -> Mat4 {
        Mat4::new(
            0.75, 0.0, 0.0, 0.0,
            0.0, 0.894_427_18, -0.447_213_59, -1.192_092_9e-7,
            0.0, -0.494_288_68, -0.988_577_37, 10.251_953,
            0.0, -0.447_213_59, -0.894_427_18, 11.180_34,
        )
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(320, 240)
    }
}
