/// Model transforms and asset normalisation
use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::geometry::{Mat4, Vec3};

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RotationState {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_degrees(x: f64, y: f64, z: f64) -> Self {
        Self::new(x.to_radians(), y.to_radians(), z.to_radians())
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    /// 3x3 rotation applying X first, then Y, then Z
    pub fn matrix3(&self) -> Matrix3<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.x);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.y);
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), self.z);
        (rz * ry * rx).into_inner()
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Homogeneous rotation matrix, Rz * Ry * Rx
    pub fn rotation_matrix(rotation: &RotationState) -> Mat4 {
        rotation.matrix3().to_homogeneous()
    }

    pub fn translation_matrix(x: f64, y: f64, z: f64) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }

    pub fn scale_matrix(sx: f64, sy: f64, sz: f64) -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz))
    }

    /// Object placement used by the camera tooling: T * (Rz * S)
    pub fn model_matrix(position: Vec3, scale: Vec3, z_rotation: f64) -> Mat4 {
        let rz = Mat4::new_rotation(Vec3::new(0.0, 0.0, z_rotation));
        let s = Mat4::new_nonuniform_scaling(&scale);
        Mat4::new_translation(&position) * rz * s
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(model: &Mat4, view: &Mat4, projection: &Mat4) -> Mat4 {
        projection * view * model
    }
}

/// Recentre positions on their centroid, scale uniformly, then rotate.
///
/// This is the normalisation every exported asset goes through before its
/// coordinates are written to vertex memory.
pub fn normalize_positions(positions: &mut [Vec3], scale: f64, rotation: &RotationState) {
    if positions.is_empty() {
        return;
    }
    let centroid =
        positions.iter().fold(Vec3::zeros(), |acc, p| acc + p) / positions.len() as f64;
    let rot = rotation.matrix3();
    for p in positions.iter_mut() {
        *p = rot * ((*p - centroid) * scale);
    }
}
