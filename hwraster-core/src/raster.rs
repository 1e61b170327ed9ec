/// Affine-textured triangle rasterizer
///
/// Mirrors the hardware fill: integer pixel positions tested against three
/// edge functions, UVs interpolated linearly in screen space, and a single
/// nearest-neighbour texel fetch per pixel. There is no depth buffer; draw
/// order comes from [`crate::visibility::order`].
use image::RgbImage;

use crate::atlas::TextureAtlas;
use crate::geometry::Vec2;
use crate::projection::ScreenVertex;
use crate::visibility::RenderItem;

pub type Rgb = [u8; 3];

/// Below this |area| a triangle is treated as degenerate and skipped
pub const AREA_EPSILON: f64 = 1e-9;
/// Edge-function slack so pixels on shared edges are still covered
pub const EDGE_TOLERANCE: f64 = 1e-9;

/// Fixed-size RGB frame, owned by one frame's rasterization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    pub fn get(&self, x: u32, y: u32) -> Rgb {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn put(&mut self, x: u32, y: u32, color: Rgb) {
        self.pixels[y as usize * self.width as usize + x as usize] = color;
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| image::Rgb(self.get(x, y)))
    }

    pub fn from_image(img: &RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            pixels: img.pixels().map(|p| p.0).collect(),
        }
    }
}

/// Outcome of drawing one triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Zero-area triangle, nothing drawn
    Degenerate,
    /// Number of pixels written (0 when fully off-canvas)
    Drawn(usize),
}

/// `(x - a.x) * (b.y - a.y) - (y - a.y) * (b.x - a.x)`
#[inline]
pub fn edge(a: &ScreenVertex, b: &ScreenVertex, x: f64, y: f64) -> f64 {
    (x - a.x) * (b.y - a.y) - (y - a.y) * (b.x - a.x)
}

/// Barycentric weights of (x, y), or `None` for a degenerate triangle
pub fn barycentric(tri: &[ScreenVertex; 3], x: f64, y: f64) -> Option<[f64; 3]> {
    let [p0, p1, p2] = tri;
    let area = edge(p0, p1, p2.x, p2.y);
    if area.abs() < AREA_EPSILON {
        return None;
    }
    Some([
        edge(p1, p2, x, y) / area,
        edge(p2, p0, x, y) / area,
        edge(p0, p1, x, y) / area,
    ])
}

/// Inclusive pixel bounds of the triangle clipped to the canvas
fn scan_bounds(tri: &[ScreenVertex; 3], width: u32, height: u32) -> (i64, i64, i64, i64) {
    let min_x = tri[0].x.min(tri[1].x).min(tri[2].x).floor().max(0.0);
    let max_x = tri[0].x.max(tri[1].x).max(tri[2].x).ceil().min(width as f64 - 1.0);
    let min_y = tri[0].y.min(tri[1].y).min(tri[2].y).floor().max(0.0);
    let max_y = tri[0].y.max(tri[1].y).max(tri[2].y).ceil().min(height as f64 - 1.0);
    (min_x as i64, max_x as i64, min_y as i64, max_y as i64)
}

/// Fill one triangle with affinely interpolated, nearest-sampled texels
pub fn rasterize(
    canvas: &mut Canvas,
    atlas: &TextureAtlas,
    tri: &[ScreenVertex; 3],
    uvs: &[Vec2; 3],
) -> Coverage {
    let [p0, p1, p2] = tri;
    let area = edge(p0, p1, p2.x, p2.y);
    if area.abs() < AREA_EPSILON {
        return Coverage::Degenerate;
    }
    // Normalise orientation so coverage is "all weights non-negative"
    let sign = area.signum();

    let (min_x, max_x, min_y, max_y) = scan_bounds(tri, canvas.width, canvas.height);
    let mut written = 0;

    for y in min_y..=max_y {
        let py = y as f64;
        for x in min_x..=max_x {
            let px = x as f64;
            let w0 = edge(p1, p2, px, py);
            let w1 = edge(p2, p0, px, py);
            let w2 = edge(p0, p1, px, py);

            if w0 * sign < -EDGE_TOLERANCE
                || w1 * sign < -EDGE_TOLERANCE
                || w2 * sign < -EDGE_TOLERANCE
            {
                continue;
            }

            let l0 = w0 / area;
            let l1 = w1 / area;
            let l2 = w2 / area;
            let uv = uvs[0] * l0 + uvs[1] * l1 + uvs[2] * l2;

            canvas.put(x as u32, y as u32, atlas.sample(uv));
            written += 1;
        }
    }

    Coverage::Drawn(written)
}

/// Rasterize a render item
pub fn draw(canvas: &mut Canvas, atlas: &TextureAtlas, item: &RenderItem) -> Coverage {
    rasterize(canvas, atlas, &item.screen, &item.uvs)
}

/// Fill the polygon formed by fanning `ring` around `centre` with one colour.
///
/// The ring is closed implicitly. Works for star-shaped outlines as long as
/// every ring point is visible from the centre.
pub fn fill_fan(canvas: &mut Canvas, centre: (f64, f64), ring: &[(f64, f64)], color: Rgb) {
    let solid = TextureAtlas::solid(color);
    let c = ScreenVertex::new(centre.0, centre.1, 1.0);
    let uvs = [Vec2::zeros(); 3];
    for (i, &(ax, ay)) in ring.iter().enumerate() {
        let (bx, by) = ring[(i + 1) % ring.len()];
        let tri = [c, ScreenVertex::new(ax, ay, 1.0), ScreenVertex::new(bx, by, 1.0)];
        rasterize(canvas, &solid, &tri, &uvs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const RED: Rgb = [255, 0, 0];
    const BLACK: Rgb = [0, 0, 0];

    fn sv(x: f64, y: f64) -> ScreenVertex {
        ScreenVertex::new(x, y, 1.0)
    }

    fn covered(canvas: &Canvas, color: Rgb) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.get(x, y) == color {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_right_triangle_coverage() {
        let mut canvas = Canvas::new(8, 8, BLACK);
        let atlas = TextureAtlas::solid(RED);
        let tri = [sv(0.0, 0.0), sv(4.0, 0.0), sv(0.0, 4.0)];

        let result = rasterize(&mut canvas, &atlas, &tri, &[Vec2::zeros(); 3]);
        assert_eq!(result, Coverage::Drawn(15));

        let mut expected = Vec::new();
        for y in 0..8u32 {
            for x in 0..8u32 {
                if x + y <= 4 {
                    expected.push((x, y));
                }
            }
        }
        assert_eq!(covered(&canvas, RED), expected);
        assert_eq!(covered(&canvas, BLACK).len(), 64 - 15);
    }

    #[test]
    fn test_winding_does_not_matter() {
        let atlas = TextureAtlas::solid(RED);
        let mut a = Canvas::new(8, 8, BLACK);
        let mut b = Canvas::new(8, 8, BLACK);
        let uvs = [Vec2::zeros(); 3];
        rasterize(&mut a, &atlas, &[sv(0.0, 0.0), sv(4.0, 0.0), sv(0.0, 4.0)], &uvs);
        rasterize(&mut b, &atlas, &[sv(0.0, 0.0), sv(0.0, 4.0), sv(4.0, 0.0)], &uvs);
        assert_eq!(a, b);
    }

    #[test]
    fn test_barycentric_partition() {
        let tri = [sv(1.0, 1.0), sv(9.0, 2.0), sv(3.0, 8.0)];
        for &(x, y) in &[(3.0, 3.0), (4.3, 3.7), (5.0, 4.0)] {
            let l = barycentric(&tri, x, y).unwrap();
            for li in l {
                assert!(li > 0.0 && li < 1.0, "{li} out of (0,1)");
            }
            assert!((l.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        }
        let flat = [sv(0.0, 0.0), sv(1.0, 1.0), sv(2.0, 2.0)];
        assert_eq!(barycentric(&flat, 1.0, 1.0), None);
    }

    #[test]
    fn test_degenerate_is_skipped() {
        let mut canvas = Canvas::new(4, 4, BLACK);
        let tri = [sv(0.0, 0.0), sv(2.0, 2.0), sv(3.0, 3.0)];
        let result = rasterize(&mut canvas, &TextureAtlas::solid(RED), &tri, &[Vec2::zeros(); 3]);
        assert_eq!(result, Coverage::Degenerate);
        assert!(covered(&canvas, RED).is_empty());
    }

    #[test]
    fn test_off_canvas_is_noop() {
        let mut canvas = Canvas::new(8, 8, BLACK);
        let atlas = TextureAtlas::solid(RED);
        let uvs = [Vec2::zeros(); 3];
        let left = [sv(-20.0, 0.0), sv(-10.0, 0.0), sv(-20.0, 5.0)];
        let below = [sv(0.0, 50.0), sv(5.0, 50.0), sv(0.0, 60.0)];
        assert_eq!(rasterize(&mut canvas, &atlas, &left, &uvs), Coverage::Drawn(0));
        assert_eq!(rasterize(&mut canvas, &atlas, &below, &uvs), Coverage::Drawn(0));
        assert!(covered(&canvas, RED).is_empty());
    }

    #[test]
    fn test_partially_off_canvas_is_clamped() {
        let mut canvas = Canvas::new(4, 4, BLACK);
        let tri = [sv(-10.0, -10.0), sv(100.0, -10.0), sv(-10.0, 100.0)];
        let result = rasterize(&mut canvas, &TextureAtlas::solid(RED), &tri, &[Vec2::zeros(); 3]);
        assert_eq!(result, Coverage::Drawn(16));
    }

    #[test]
    fn test_affine_uv_sampling() {
        // Left half red, right half blue
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb(RED));
        img.put_pixel(1, 0, image::Rgb([0, 0, 255]));
        let atlas = TextureAtlas::from_image(&img).unwrap();

        let mut canvas = Canvas::new(9, 9, BLACK);
        let tri = [sv(0.0, 0.0), sv(8.0, 0.0), sv(0.0, 8.0)];
        let uvs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 0.0)];
        rasterize(&mut canvas, &atlas, &tri, &uvs);

        // u = x / 8 along the top row
        assert_eq!(canvas.get(3, 0), RED);
        assert_eq!(canvas.get(4, 0), [0, 0, 255]);
        assert_eq!(canvas.get(8, 0), [0, 0, 255]);
    }

    #[test]
    fn test_fill_fan_square() {
        let mut canvas = Canvas::new(6, 6, BLACK);
        let ring = [(1.0, 1.0), (4.0, 1.0), (4.0, 4.0), (1.0, 4.0)];
        fill_fan(&mut canvas, (2.5, 2.5), &ring, RED);
        assert_eq!(covered(&canvas, RED).len(), 16);
    }

    #[test]
    fn test_canvas_image_round_trip() {
        let mut canvas = Canvas::new(3, 2, BLACK);
        canvas.put(2, 1, RED);
        let img = canvas.to_image();
        assert_eq!(img.get_pixel(2, 1).0, RED);
        assert_eq!(Canvas::from_image(&img), canvas);
    }

    proptest! {
        #[test]
        fn barycentric_partitions_interior_points(
            a in (-200.0f64..200.0, -200.0f64..200.0),
            b in (-200.0f64..200.0, -200.0f64..200.0),
            c in (-200.0f64..200.0, -200.0f64..200.0),
            w in (0.01f64..1.0, 0.01f64..1.0, 0.01f64..1.0),
        ) {
            let tri = [sv(a.0, a.1), sv(b.0, b.1), sv(c.0, c.1)];
            prop_assume!(edge(&tri[0], &tri[1], c.0, c.1).abs() > 1.0);

            let total = w.0 + w.1 + w.2;
            let weights = [w.0 / total, w.1 / total, w.2 / total];
            let x = weights[0] * a.0 + weights[1] * b.0 + weights[2] * c.0;
            let y = weights[0] * a.1 + weights[1] * b.1 + weights[2] * c.1;

            let l = barycentric(&tri, x, y).unwrap();
            for li in l {
                prop_assert!(li > 0.0 && li < 1.0, "{} out of (0,1)", li);
            }
            prop_assert!((l.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        }
    }
}
