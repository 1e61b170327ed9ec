/// Texture atlases and the providers that build them
///
/// The rasterizer only ever sees a [`TextureAtlas`]. How materials are packed
/// into it, and how their UVs are moved into their slot, is the business of an
/// [`AtlasProvider`].
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbImage};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::geometry::{MaterialId, Vec2};
use crate::raster::{fill_fan, Canvas, Rgb};

/// Stand-in colour for materials whose texture cannot be found
pub const MISSING_COLOR: Rgb = [255, 0, 255];

/// Fixed-size RGB image addressed by normalised UVs (V=0 is the top row)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAtlas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl TextureAtlas {
    pub fn new(width: u32, height: u32, fill: Rgb) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions(format!(
                "atlas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        })
    }

    /// 1x1 atlas; every UV samples `color`
    pub fn solid(color: Rgb) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
        }
    }

    pub fn from_image(img: &RgbImage) -> Result<Self> {
        let mut atlas = Self::new(img.width(), img.height(), [0, 0, 0])?;
        for (dst, src) in atlas.pixels.iter_mut().zip(img.pixels()) {
            *dst = src.0;
        }
        Ok(atlas)
    }

    pub fn from_canvas(canvas: &Canvas) -> Result<Self> {
        let mut atlas = Self::new(canvas.width(), canvas.height(), [0, 0, 0])?;
        atlas.pixels.copy_from_slice(canvas.pixels());
        Ok(atlas)
    }

    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| image::Rgb(self.pixel(x, y)))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Pixels in row-major order, the order texture memory is written in
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Nearest texel: truncate `uv * size`, then clamp to the image
    pub fn sample(&self, uv: Vec2) -> Rgb {
        let w = self.width as f64;
        let h = self.height as f64;
        let tx = (uv.x * w).floor().clamp(0.0, w - 1.0) as u32;
        let ty = (uv.y * h).floor().clamp(0.0, h - 1.0) as u32;
        self.pixel(tx, ty)
    }

    /// Fill a rectangle, clipped to the atlas
    pub fn fill_rect(&mut self, x0: u32, y0: u32, w: u32, h: u32, color: Rgb) {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels[y as usize * self.width as usize + x as usize] = color;
            }
        }
    }

    /// Copy an image in at (x0, y0), clipped to the atlas
    pub fn blit(&mut self, img: &RgbImage, x0: u32, y0: u32) {
        for (x, y, p) in img.enumerate_pixels() {
            let (tx, ty) = (x0 + x, y0 + y);
            if tx < self.width && ty < self.height {
                self.pixels[ty as usize * self.width as usize + tx as usize] = p.0;
            }
        }
    }
}

/// A named material and the texture file its MTL entry points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub texture: Option<String>,
}

/// Hands out material ids in first-seen order.
///
/// Owned by one parse/export invocation so concurrent exports never share
/// id state.
#[derive(Debug, Clone, Default)]
pub struct MaterialAllocator {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
    capacity: Option<usize>,
}

impl MaterialAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that stops handing out new ids after `capacity` materials
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Id for `name`, allocating the next one on first sight.
    ///
    /// Once the capacity is exhausted unknown names fall back to id 0.
    pub fn id_for(&mut self, name: &str) -> MaterialId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        if self.capacity.is_some_and(|cap| self.materials.len() >= cap) {
            warn!("too many materials, mapping {name} to id 0");
            return 0;
        }
        let id = self.materials.len() as MaterialId;
        self.materials.push(Material {
            id,
            name: name.to_string(),
            texture: None,
        });
        self.by_name.insert(name.to_string(), id);
        debug!("material {name} -> {id}");
        id
    }

    pub fn lookup(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    /// Record the texture file of a material, allocating it if needed
    pub fn set_texture(&mut self, name: &str, file: &str) {
        let id = self.id_for(name);
        if let Some(material) = self.materials.get_mut(id as usize) {
            if material.name == name {
                material.texture = Some(file.to_string());
            }
        }
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Packs materials into one atlas and remaps their UVs into it
pub trait AtlasProvider {
    /// Build the atlas image for the given materials
    fn produce(&mut self, materials: &MaterialAllocator) -> Result<TextureAtlas>;

    /// Move a face UV of `material` into the material's region of the atlas
    fn map_uv(&self, material: MaterialId, uv: Vec2) -> Vec2;
}

/// Texture path of a material: its MTL entry, else `<name>.png`, resolved
/// against `dir` when relative
fn texture_path(dir: Option<&Path>, material: &Material) -> PathBuf {
    let file = material
        .texture
        .clone()
        .unwrap_or_else(|| format!("{}.png", material.name));
    match dir {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

/// N x N grid of flat-coloured square slots, one per material.
///
/// Each slot takes the top-left pixel of the material's texture. Face UVs are
/// ignored; every vertex samples the centre of its material's slot.
#[derive(Debug, Clone)]
pub struct GridPalette {
    pub size: u32,
    pub grid: u32,
    pub texture_dir: Option<PathBuf>,
    colors: HashMap<String, Rgb>,
}

impl GridPalette {
    pub fn new(size: u32, grid: u32) -> Self {
        Self {
            size,
            grid,
            texture_dir: None,
            colors: HashMap::new(),
        }
    }

    pub fn with_texture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.texture_dir = Some(dir.into());
        self
    }

    /// Use `color` for `name` instead of reading its texture
    pub fn with_color(mut self, name: &str, color: Rgb) -> Self {
        self.colors.insert(name.to_string(), color);
        self
    }

    /// Maximum number of materials the grid holds
    pub fn slots(&self) -> usize {
        (self.grid * self.grid) as usize
    }

    fn slot_size(&self) -> u32 {
        self.size / self.grid.max(1)
    }

    fn material_color(&self, material: &Material) -> Rgb {
        if let Some(&color) = self.colors.get(&material.name) {
            return color;
        }
        let path = texture_path(self.texture_dir.as_deref(), material);
        if !path.exists() {
            warn!("missing texture {}, using pink", path.display());
            return MISSING_COLOR;
        }
        match image::open(&path) {
            Ok(img) => img.to_rgb8().get_pixel(0, 0).0,
            Err(e) => {
                warn!("error reading {}: {e}", path.display());
                MISSING_COLOR
            }
        }
    }
}

impl Default for GridPalette {
    fn default() -> Self {
        Self::new(64, 8)
    }
}

impl AtlasProvider for GridPalette {
    fn produce(&mut self, materials: &MaterialAllocator) -> Result<TextureAtlas> {
        if self.grid == 0 || self.size < self.grid {
            return Err(Error::InvalidDimensions(format!(
                "{}x{} grid does not fit a {}px atlas",
                self.grid, self.grid, self.size
            )));
        }
        let slot = self.slot_size();
        let mut atlas = TextureAtlas::new(self.size, self.size, [0, 0, 0])?;
        for material in materials.iter() {
            let row = material.id / self.grid;
            let col = material.id % self.grid;
            let color = self.material_color(material);
            atlas.fill_rect(col * slot, row * slot, slot, slot, color);
        }
        Ok(atlas)
    }

    fn map_uv(&self, material: MaterialId, _uv: Vec2) -> Vec2 {
        let slot = self.slot_size() as f64;
        let row = (material / self.grid.max(1)) as f64;
        let col = (material % self.grid.max(1)) as f64;
        let size = self.size as f64;
        Vec2::new(
            (col * slot + slot / 2.0) / size,
            (row * slot + slot / 2.0) / size,
        )
    }
}

/// Full-width strips stacked top to bottom, one textured material each.
///
/// A material's V range is squeezed into its strip; materials without a
/// loadable texture keep their UVs untouched.
#[derive(Debug, Clone)]
pub struct VerticalStrips {
    pub size: u32,
    pub strips: u32,
    pub texture_dir: Option<PathBuf>,
    placed: HashSet<MaterialId>,
}

impl VerticalStrips {
    pub fn new(size: u32, strips: u32) -> Self {
        Self {
            size,
            strips,
            texture_dir: None,
            placed: HashSet::new(),
        }
    }

    pub fn with_texture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.texture_dir = Some(dir.into());
        self
    }
}

impl Default for VerticalStrips {
    fn default() -> Self {
        Self::new(64, 2)
    }
}

impl AtlasProvider for VerticalStrips {
    fn produce(&mut self, materials: &MaterialAllocator) -> Result<TextureAtlas> {
        if self.strips == 0 || self.size < self.strips {
            return Err(Error::InvalidDimensions(format!(
                "{} strips do not fit a {}px atlas",
                self.strips, self.size
            )));
        }
        let strip_h = self.size / self.strips;
        let mut atlas = TextureAtlas::new(self.size, self.size, MISSING_COLOR)?;
        self.placed.clear();

        for material in materials.iter() {
            if material.texture.is_none() {
                continue;
            }
            if material.id >= self.strips {
                warn!("no strip left for material {}", material.name);
                continue;
            }
            let path = texture_path(self.texture_dir.as_deref(), material);
            if !path.exists() {
                warn!("missing texture {}", path.display());
                continue;
            }
            let img = match image::open(&path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    warn!("error reading {}: {e}", path.display());
                    continue;
                }
            };
            let img = image::imageops::resize(&img, self.size, strip_h, FilterType::Nearest);
            atlas.blit(&img, 0, material.id * strip_h);
            self.placed.insert(material.id);
        }
        Ok(atlas)
    }

    fn map_uv(&self, material: MaterialId, uv: Vec2) -> Vec2 {
        if !self.placed.contains(&material) {
            return uv;
        }
        let n = self.strips as f64;
        Vec2::new(uv.x, uv.y / n + material as f64 / n)
    }
}

/// An atlas supplied as a finished image; UVs already point into it
#[derive(Debug, Clone)]
pub struct Passthrough {
    image: RgbImage,
}

impl Passthrough {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(image::open(path)?.to_rgb8()))
    }
}

impl AtlasProvider for Passthrough {
    fn produce(&mut self, _materials: &MaterialAllocator) -> Result<TextureAtlas> {
        TextureAtlas::from_image(&self.image)
    }

    fn map_uv(&self, _material: MaterialId, uv: Vec2) -> Vec2 {
        uv
    }
}

/// Five-pointed star centred on a square background
pub fn star_texture(size: u32, background: Rgb, star: Rgb) -> Result<TextureAtlas> {
    let mut canvas = Canvas::new(size, size, background);
    let c = size as f64 / 2.0;
    let outer = size as f64 * 0.25;
    let inner = size as f64 * 0.1;

    let step = std::f64::consts::PI / 5.0;
    let ring: Vec<(f64, f64)> = (0..10)
        .map(|i| {
            let angle = -std::f64::consts::FRAC_PI_2 + step * i as f64;
            let r = if i % 2 == 0 { outer } else { inner };
            (c + angle.cos() * r, c + angle.sin() * r)
        })
        .collect();
    fill_fan(&mut canvas, (c, c), &ring, star);

    TextureAtlas::from_canvas(&canvas)
}

/// XOR test pattern with 4-bit channels, for exercising texture addressing
pub fn xor_texture(size: u32) -> Result<TextureAtlas> {
    let mut atlas = TextureAtlas::new(size, size, [0, 0, 0])?;
    for y in 0..size {
        for x in 0..size {
            let r = ((x ^ y) & 0xF) as u8;
            let g = ((x + y) & 0xF) as u8;
            let b = ((x & y) & 0xF) as u8;
            // n * 17 expands a nibble so its top nibble is n again
            atlas.fill_rect(x, y, 1, 1, [r * 17, g * 17, b * 17]);
        }
    }
    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_truncates_and_clamps() {
        let mut atlas = TextureAtlas::new(4, 4, [0, 0, 0]).unwrap();
        atlas.fill_rect(3, 0, 1, 1, [1, 2, 3]);
        assert_eq!(atlas.sample(Vec2::new(0.76, 0.0)), [1, 2, 3]);
        assert_eq!(atlas.sample(Vec2::new(0.74, 0.0)), [0, 0, 0]);
        assert_eq!(atlas.sample(Vec2::new(1.0, 0.0)), [1, 2, 3]);
        assert_eq!(atlas.sample(Vec2::new(7.5, -3.0)), [1, 2, 3]);
    }

    #[test]
    fn test_zero_size_atlas_rejected() {
        assert!(matches!(
            TextureAtlas::new(0, 64, [0, 0, 0]),
            Err(Error::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_allocator_is_stable_and_bounded() {
        let mut materials = MaterialAllocator::with_capacity(2);
        assert_eq!(materials.id_for("hull"), 0);
        assert_eq!(materials.id_for("wing"), 1);
        assert_eq!(materials.id_for("hull"), 0);
        assert_eq!(materials.id_for("engine"), 0);
        assert_eq!(materials.len(), 2);
        assert_eq!(materials.lookup("engine"), None);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut a = MaterialAllocator::new();
        let mut b = MaterialAllocator::new();
        a.id_for("x");
        a.id_for("y");
        assert_eq!(b.id_for("y"), 0);
    }

    #[test]
    fn test_grid_palette() {
        let mut materials = MaterialAllocator::new();
        for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i"] {
            materials.id_for(name);
        }
        let mut grid = GridPalette::new(64, 8)
            .with_color("a", [10, 20, 30])
            .with_color("i", [200, 0, 0]);
        let atlas = grid.produce(&materials).unwrap();

        assert_eq!(atlas.pixel(0, 0), [10, 20, 30]);
        assert_eq!(atlas.pixel(7, 7), [10, 20, 30]);
        // ninth material wraps to the second row
        assert_eq!(atlas.pixel(0, 8), [200, 0, 0]);
        // no texture on disk for "b"
        assert_eq!(atlas.pixel(8, 0), MISSING_COLOR);

        let uv = grid.map_uv(8, Vec2::new(0.9, 0.9));
        assert_eq!(uv, Vec2::new(4.0 / 64.0, 12.0 / 64.0));
        assert_eq!(atlas.sample(uv), [200, 0, 0]);
    }

    #[test]
    fn test_grid_palette_reads_texture_corner() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(0, 0, image::Rgb([0x12, 0x34, 0x56]));
        img.save(dir.path().join("color_EE.png")).unwrap();

        let mut materials = MaterialAllocator::new();
        materials.id_for("color_EE");
        let mut grid = GridPalette::default().with_texture_dir(dir.path());
        let atlas = grid.produce(&materials).unwrap();
        assert_eq!(atlas.pixel(3, 3), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_vertical_strips() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(8, 8, image::Rgb([0, 255, 0]))
            .save(dir.path().join("eye.png"))
            .unwrap();

        let mut materials = MaterialAllocator::new();
        materials.id_for("body");
        materials.set_texture("eye", "eye.png");

        let mut strips = VerticalStrips::default().with_texture_dir(dir.path());
        let atlas = strips.produce(&materials).unwrap();

        assert_eq!(atlas.pixel(10, 10), MISSING_COLOR);
        assert_eq!(atlas.pixel(10, 40), [0, 255, 0]);
        assert_eq!(strips.map_uv(1, Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.75));
        assert_eq!(strips.map_uv(0, Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_vertical_strips_skip_unreadable_texture() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eye.png"), b"not a png").unwrap();

        let mut materials = MaterialAllocator::new();
        materials.id_for("body");
        materials.set_texture("eye", "eye.png");

        let mut strips = VerticalStrips::default().with_texture_dir(dir.path());
        let atlas = strips.produce(&materials).unwrap();
        assert_eq!(atlas.pixel(10, 40), MISSING_COLOR);
        // an unplaced material keeps its own UVs
        assert_eq!(strips.map_uv(1, Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_star_texture() {
        let atlas = star_texture(64, [0, 0, 255], [255, 255, 0]).unwrap();
        assert_eq!(atlas.pixel(32, 32), [255, 255, 0]);
        // tip of the top point
        assert_eq!(atlas.pixel(32, 18), [255, 255, 0]);
        assert_eq!(atlas.pixel(0, 0), [0, 0, 255]);
        assert_eq!(atlas.pixel(32, 60), [0, 0, 255]);
    }

    #[test]
    fn test_xor_texture_nibbles() {
        let atlas = xor_texture(64).unwrap();
        let [r, g, b] = atlas.pixel(5, 3);
        assert_eq!((r >> 4, g >> 4, b >> 4), (6, 8, 1));
    }
}
