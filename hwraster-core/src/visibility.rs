/// Screen-space backface culling and painter's-algorithm ordering
use crate::error::{Error, IndexKind, Result};
use crate::geometry::{MaterialId, Mesh, Vec2};
use crate::projection::ScreenVertex;

/// Which sign of the screen-space cross product marks a back face.
///
/// Asset producers disagree on winding, so this is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    /// Draw every triangle
    Disabled,
    /// Positive cross is a back face (counter-clockwise on a Y-down screen)
    #[default]
    Positive,
    /// Negative cross is a back face
    Negative,
}

/// Draw order of the surviving triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthOrder {
    /// Descending mean w, ties in face order
    #[default]
    FarthestFirst,
    /// Face-list order, no sorting
    Submission,
}

/// One triangle ready for the rasterizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub depth: f64,
    pub screen: [ScreenVertex; 3],
    pub uvs: [Vec2; 3],
}

/// Signed 2D cross product of the edges p0->p1 and p0->p2
pub fn screen_cross(p0: &ScreenVertex, p1: &ScreenVertex, p2: &ScreenVertex) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p1.y - p0.y) * (p2.x - p0.x)
}

pub fn is_back_face(cross: f64, mode: CullMode) -> bool {
    match mode {
        CullMode::Disabled => false,
        CullMode::Positive => cross > 0.0,
        CullMode::Negative => cross < 0.0,
    }
}

/// Mean w of the three vertices, used as the sort key
pub fn triangle_depth(screen: &[ScreenVertex; 3]) -> f64 {
    (screen[0].w + screen[1].w + screen[2].w) / 3.0
}

/// Visible triangles in face order plus how many were culled
#[derive(Debug, Clone, Default)]
pub struct RenderList {
    pub items: Vec<RenderItem>,
    pub culled: usize,
}

/// Cull the faces of `mesh` given its projected positions.
///
/// `screen` is indexed like `mesh.positions`. `uv_map` lets an atlas
/// provider remap each face's UVs into its slot. A face pointing past
/// `screen` or `mesh.uvs` is an error.
pub fn build_render_list<F>(
    mesh: &Mesh,
    screen: &[ScreenVertex],
    cull: CullMode,
    uv_map: F,
) -> Result<RenderList>
where
    F: Fn(MaterialId, Vec2) -> Vec2,
{
    let mut list = RenderList {
        items: Vec::with_capacity(mesh.faces.len()),
        culled: 0,
    };

    for (i, face) in mesh.faces.iter().enumerate() {
        check_indices(i, &face.positions, screen.len(), IndexKind::Position)?;
        check_indices(i, &face.uvs, mesh.uvs.len(), IndexKind::Uv)?;

        let tri = face.positions.map(|p| screen[p]);
        if is_back_face(screen_cross(&tri[0], &tri[1], &tri[2]), cull) {
            list.culled += 1;
            continue;
        }
        list.items.push(RenderItem {
            depth: triangle_depth(&tri),
            screen: tri,
            uvs: face.uvs.map(|t| uv_map(face.material, mesh.uvs[t])),
        });
    }

    Ok(list)
}

fn check_indices(face: usize, indices: &[usize; 3], len: usize, kind: IndexKind) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(Error::IndexOutOfRange {
            face,
            kind,
            index: index as i64,
            len,
        }),
        None => Ok(()),
    }
}

/// Put render items into draw order. The sort is stable.
pub fn order(items: &mut [RenderItem], policy: DepthOrder) {
    if policy == DepthOrder::FarthestFirst {
        items.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Face;

    fn sv(x: f64, y: f64) -> ScreenVertex {
        ScreenVertex::new(x, y, 1.0)
    }

    fn item(depth: f64, tag: f64) -> RenderItem {
        RenderItem {
            depth,
            screen: [sv(tag, 0.0), sv(0.0, 0.0), sv(0.0, 0.0)],
            uvs: [Vec2::zeros(); 3],
        }
    }

    #[test]
    fn test_winding_sign() {
        let cross = screen_cross(&sv(0.0, 0.0), &sv(10.0, 0.0), &sv(0.0, 10.0));
        assert!(cross > 0.0);
        assert!(is_back_face(cross, CullMode::Positive));
        assert!(!is_back_face(cross, CullMode::Disabled));
        assert!(!is_back_face(cross, CullMode::Negative));
        assert!(is_back_face(-cross, CullMode::Negative));
    }

    #[test]
    fn test_farthest_first() {
        let mut items = vec![item(5.0, 0.0), item(10.0, 1.0), item(2.0, 2.0)];
        order(&mut items, DepthOrder::FarthestFirst);
        let depths: Vec<f64> = items.iter().map(|i| i.depth).collect();
        assert_eq!(depths, vec![10.0, 5.0, 2.0]);
    }

    #[test]
    fn test_ties_keep_face_order() {
        let mut items = vec![item(3.0, 0.0), item(7.0, 1.0), item(3.0, 2.0), item(3.0, 3.0)];
        order(&mut items, DepthOrder::FarthestFirst);
        let tags: Vec<f64> = items.iter().map(|i| i.screen[0].x).collect();
        assert_eq!(tags, vec![1.0, 0.0, 2.0, 3.0]);
    }

    #[test]
    fn test_submission_order_untouched() {
        let mut items = vec![item(1.0, 0.0), item(9.0, 1.0)];
        order(&mut items, DepthOrder::Submission);
        assert_eq!(items[0].depth, 1.0);
    }

    #[test]
    fn test_build_render_list() {
        let mut mesh = Mesh::new();
        mesh.add_uv(0.25, 0.75);
        // one triangle per winding
        mesh.add_face(Face::new([0, 1, 2], [0, 0, 0], 3));
        mesh.add_face(Face::new([0, 2, 1], [0, 0, 0], 3));
        let screen = [
            ScreenVertex::new(0.0, 0.0, 2.0),
            ScreenVertex::new(10.0, 0.0, 4.0),
            ScreenVertex::new(0.0, 10.0, 6.0),
        ];

        let list = build_render_list(&mesh, &screen, CullMode::Positive, |material, uv| {
            assert_eq!(material, 3);
            uv * 2.0
        })
        .unwrap();
        assert_eq!(list.culled, 1);
        assert_eq!(list.items.len(), 1);
        assert!((list.items[0].depth - 4.0).abs() < 1e-12);
        assert_eq!(list.items[0].uvs[0], Vec2::new(0.5, 1.5));
        assert_eq!(list.items[0].screen[1].x, 0.0);

        let all = build_render_list(&mesh, &screen, CullMode::Disabled, |_, uv| uv).unwrap();
        assert_eq!(all.culled, 0);
        assert_eq!(all.items.len(), 2);
    }

    #[test]
    fn test_build_render_list_rejects_bad_indices() {
        let mut mesh = Mesh::new();
        mesh.add_uv(0.0, 0.0);
        mesh.add_face(Face::new([0, 1, 2], [0, 0, 0], 0));
        mesh.add_face(Face::new([0, 1, 9], [0, 0, 0], 0));
        let screen = [sv(0.0, 0.0), sv(10.0, 0.0), sv(0.0, 10.0)];

        let err = build_render_list(&mesh, &screen, CullMode::Disabled, |_, uv| uv).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexOutOfRange {
                face: 1,
                kind: IndexKind::Position,
                index: 9,
                len: 3
            }
        ));

        mesh.faces[1] = Face::new([0, 1, 2], [0, 1, 0], 0);
        let err = build_render_list(&mesh, &screen, CullMode::Disabled, |_, uv| uv).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexOutOfRange {
                kind: IndexKind::Uv,
                ..
            }
        ));
    }
}
