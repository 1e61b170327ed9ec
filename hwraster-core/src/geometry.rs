/// Geometry primitives shared by the exporter and the preview rasterizer
use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

use crate::error::{Error, IndexKind, Result};

pub type Vec2 = Vector2<f64>;
pub type Vec3 = Vector3<f64>;
pub type Vec4 = Vector4<f64>;
/// Row-major 4x4 transform (`Matrix4::new` takes its arguments row by row)
pub type Mat4 = Matrix4<f64>;

/// Atlas slot / material handle assigned by a [`crate::atlas::MaterialAllocator`]
pub type MaterialId = u32;

/// A resolved vertex: position plus the UV it carries on one face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64, u: f64, v: f64) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            uv: Vec2::new(u, v),
        }
    }
}

/// A triangle of (position index, uv index) pairs with a material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub positions: [usize; 3],
    pub uvs: [usize; 3],
    pub material: MaterialId,
}

impl Face {
    pub fn new(positions: [usize; 3], uvs: [usize; 3], material: MaterialId) -> Self {
        Self {
            positions,
            uvs,
            material,
        }
    }
}

/// Indexed triangle mesh. UVs follow the image convention (V=0 is the top row).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(positions: usize, faces: usize) -> Self {
        Self {
            positions: Vec::with_capacity(positions),
            uvs: Vec::new(),
            faces: Vec::with_capacity(faces),
        }
    }

    pub fn add_position(&mut self, x: f64, y: f64, z: f64) -> usize {
        self.positions.push(Vec3::new(x, y, z));
        self.positions.len() - 1
    }

    pub fn add_uv(&mut self, u: f64, v: f64) -> usize {
        self.uvs.push(Vec2::new(u, v));
        self.uvs.len() - 1
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    /// Check that every coordinate is finite and every face references
    /// existing positions and UVs
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.positions.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(Error::NonFinite {
                kind: IndexKind::Position,
                index: i,
            });
        }
        if let Some(i) = self.uvs.iter().position(|t| !t.iter().all(|c| c.is_finite())) {
            return Err(Error::NonFinite {
                kind: IndexKind::Uv,
                index: i,
            });
        }
        for (i, face) in self.faces.iter().enumerate() {
            for &p in &face.positions {
                if p >= self.positions.len() {
                    return Err(Error::IndexOutOfRange {
                        face: i,
                        kind: IndexKind::Position,
                        index: p as i64,
                        len: self.positions.len(),
                    });
                }
            }
            for &t in &face.uvs {
                if t >= self.uvs.len() {
                    return Err(Error::IndexOutOfRange {
                        face: i,
                        kind: IndexKind::Uv,
                        index: t as i64,
                        len: self.uvs.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve one corner of a face. Indices must have been validated.
    pub fn vertex(&self, face: &Face, corner: usize) -> Vertex {
        Vertex {
            position: self.positions[face.positions[corner]],
            uv: self.uvs[face.uvs[corner]],
        }
    }

    /// Mean of all positions, or the origin for an empty mesh
    pub fn centroid(&self) -> Vec3 {
        if self.positions.is_empty() {
            return Vec3::zeros();
        }
        let sum = self.positions.iter().fold(Vec3::zeros(), |acc, p| acc + p);
        sum / self.positions.len() as f64
    }

    /// The single test triangle used to bring up the geometry engine
    pub fn test_triangle() -> Self {
        let mut mesh = Self::new();
        mesh.add_position(-1.0, -1.0, 1.0);
        mesh.add_position(1.0, -1.0, 1.0);
        mesh.add_position(1.0, 1.0, 1.0);
        mesh.add_uv(0.0, 1.0);
        mesh.add_uv(1.0, 1.0);
        mesh.add_uv(1.0, 0.0);
        mesh.add_face(Face::new([0, 1, 2], [0, 1, 2], 0));
        mesh
    }

    /// Cube textured from a 2x2 atlas: sides top-left, top face top-right,
    /// bottom face bottom-left. Face order is front, right, left, top,
    /// bottom, back; each quad is split (0,1,2) / (0,2,3).
    pub fn cube(size: f64) -> Self {
        let h = size / 2.0;
        let mut mesh = Self::with_capacity(8, 12);

        let fbl = mesh.add_position(-h, -h, h);
        let fbr = mesh.add_position(h, -h, h);
        let ftr = mesh.add_position(h, h, h);
        let ftl = mesh.add_position(-h, h, h);
        let bbl = mesh.add_position(-h, -h, -h);
        let bbr = mesh.add_position(h, -h, -h);
        let btr = mesh.add_position(h, h, -h);
        let btl = mesh.add_position(-h, h, -h);

        let side = (0.0, 0.0);
        let top = (0.5, 0.0);
        let bottom = (0.0, 0.5);

        let quads = [
            ([fbl, fbr, ftr, ftl], side),
            ([fbr, bbr, btr, ftr], side),
            ([bbl, fbl, ftl, btl], side),
            ([ftl, ftr, btr, btl], top),
            ([bbl, bbr, fbr, fbl], bottom),
            ([bbr, bbl, btl, btr], side),
        ];

        for (corners, (ou, ov)) in quads {
            // BL, BR, TR, TL of the quadrant
            let base = mesh.uvs.len();
            for (u, v) in [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)] {
                mesh.add_uv(ou + u * 0.5, ov + v * 0.5);
            }
            mesh.add_face(Face::new(
                [corners[0], corners[1], corners[2]],
                [base, base + 1, base + 2],
                0,
            ));
            mesh.add_face(Face::new(
                [corners[0], corners[2], corners[3]],
                [base, base + 2, base + 3],
                0,
            ));
        }

        mesh
    }

    /// Regular icosahedron; every face maps the same triangle of the texture
    pub fn icosahedron(scale: f64) -> Self {
        let phi = (1.0 + 5f64.sqrt()) / 2.0;
        let corners = [
            (-1.0, phi, 0.0),
            (1.0, phi, 0.0),
            (-1.0, -phi, 0.0),
            (1.0, -phi, 0.0),
            (0.0, -1.0, phi),
            (0.0, 1.0, phi),
            (0.0, -1.0, -phi),
            (0.0, 1.0, -phi),
            (phi, 0.0, -1.0),
            (phi, 0.0, 1.0),
            (-phi, 0.0, -1.0),
            (-phi, 0.0, 1.0),
        ];
        let faces = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        let mut mesh = Self::with_capacity(corners.len(), faces.len());
        for (x, y, z) in corners {
            mesh.add_position(x * scale, y * scale, z * scale);
        }
        // bottom-left, bottom-right, top-centre
        mesh.add_uv(0.1, 0.9);
        mesh.add_uv(0.9, 0.9);
        mesh.add_uv(0.5, 0.1);
        for positions in faces {
            mesh.add_face(Face::new(positions, [0, 1, 2], 0));
        }
        mesh
    }
}
