//! Whole export flow: parse, normalise, pack the atlas, write memory images
//! and render the preview.

use std::fs;

use hwraster_core::atlas::star_texture;
use hwraster_core::memfile::{
    encode_stream, vertex_records, write_texture_mem, write_vertex_mem, VertexMemOptions, SENTINEL,
};
use hwraster_core::obj::{parse_mtl, parse_obj, ObjOptions};
use hwraster_core::transform::normalize_positions;
use hwraster_core::{
    AtlasProvider, Camera, GridPalette, MaterialAllocator, Mesh, Passthrough, Renderer,
    RotationState,
};
use image::{Rgb, RgbImage};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const OBJ: &str = "\
mtllib model.mtl
v 10 10 10
v 12 10 10
v 12 12 10
v 10 12 10
vt 0 0
vt 1 0
vt 1 1
usemtl body
f 1/1 2/2 3/3
usemtl eye
f 1/1 3/3 4/3
";

const MTL: &str = "\
newmtl body
map_Kd textures/body.png
newmtl eye
";

#[test]
fn grid_palette_export() {
    let dir = tempdir().unwrap();
    RgbImage::from_pixel(4, 4, Rgb([0, 200, 0]))
        .save(dir.path().join("body.png"))
        .unwrap();

    let mut materials = MaterialAllocator::with_capacity(64);
    parse_mtl(MTL, &mut materials).unwrap();
    let mut mesh = parse_obj(OBJ, &mut materials, &ObjOptions::default()).unwrap();
    assert_eq!(mesh.faces.len(), 2);

    normalize_positions(&mut mesh.positions, 1.0, &RotationState::zero());
    assert!(mesh.centroid().norm() < 1e-12);

    let mut provider = GridPalette::default().with_texture_dir(dir.path());
    let atlas = provider.produce(&materials).unwrap();
    assert_eq!(atlas.pixel(0, 0), [0, 200, 0]);
    assert_eq!(atlas.pixel(8, 0), [255, 0, 255]);

    let records = vertex_records(&mesh, |m, uv| provider.map_uv(m, uv)).unwrap();
    let path = dir.path().join("vertex_data.mem");
    let mut file = fs::File::create(&path).unwrap();
    let summary = write_vertex_mem(&mut file, &records, &VertexMemOptions::default()).unwrap();
    drop(file);
    assert_eq!(summary.data_lines, 30);
    assert_eq!(summary.wrapped, 0);

    let text = fs::read_to_string(&path).unwrap();
    let data: Vec<&str> = text.lines().filter(|l| !l.starts_with("//")).collect();
    assert_eq!(data.len(), 30 + 5);
    // first vertex: (-1, -1, 0) after recentring, body slot centre
    assert_eq!(&data[..5], &["FFFF0000", "FFFF0000", "00000000", "00001000", "00001000"]);
    // the eye triangle samples the second slot
    assert_eq!(&data[18..20], &["00003000", "00001000"]);
    assert!(data[30..].iter().all(|l| *l == "FFFFFFFF"));

    let mut tex = Vec::new();
    write_texture_mem(&mut tex, &atlas).unwrap();
    let tex = String::from_utf8(tex).unwrap();
    assert_eq!(tex.lines().count(), 64 * 64);
    assert_eq!(tex.lines().next(), Some("0C0"));
}

#[test]
fn d20_export_and_preview() {
    let mesh = Mesh::icosahedron(3.5);
    let star = star_texture(64, [0, 0, 255], [255, 255, 0]).unwrap();
    let mut provider = Passthrough::new(star.to_image());
    let atlas = provider.produce(&MaterialAllocator::new()).unwrap();
    assert_eq!(atlas.pixel(32, 32), [255, 255, 0]);
    assert_eq!(atlas.pixel(0, 0), [0, 0, 255]);

    let records = vertex_records(&mesh, |m, uv| provider.map_uv(m, uv)).unwrap();
    let words = encode_stream(&records);
    assert_eq!(words.len(), 20 * 3 * 5 + 5);
    assert_eq!(&words[words.len() - 5..], &[SENTINEL; 5]);

    let frame = Renderer::default()
        .render(&mesh, &Camera::hardware_mvp(), &atlas, |m, uv| provider.map_uv(m, uv))
        .unwrap();
    // a closed convex solid shows roughly half its faces
    assert!(frame.stats.culled > 0);
    assert!(frame.stats.drawn > 0);
    assert_eq!(frame.stats.culled + frame.stats.drawn + frame.stats.degenerate, 20);
    assert_eq!(frame.canvas.get(0, 0), [10, 10, 10]);
    assert_ne!(frame.canvas.get(160, 120), [10, 10, 10]);
}

#[test]
fn malformed_obj_fails_before_output() {
    let mut materials = MaterialAllocator::new();
    let err = parse_obj("v 0 0 0\nf 1 2 3\n", &mut materials, &ObjOptions::default());
    assert!(err.is_err());
}
