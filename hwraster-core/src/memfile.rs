/// Hex memory images for `$readmemh`
///
/// Vertex memory holds five Q16.16 words per vertex (X, Y, Z, U, V), three
/// vertices per face in face order, then five `FFFFFFFF` words that tell the
/// loader the stream has ended. Texture memory holds one RGB444 word per
/// atlas pixel in row-major order.
use std::io::Write;

use log::{info, warn};

use crate::atlas::TextureAtlas;
use crate::error::Result;
use crate::fixed;
use crate::geometry::{Mat4, MaterialId, Mesh, Vec2};

/// End-of-stream word
pub const SENTINEL: u32 = 0xFFFF_FFFF;
/// Sentinel words terminating the vertex stream
pub const SENTINEL_WORDS: usize = 5;
/// Words per vertex record
pub const WORDS_PER_VERTEX: usize = 5;
/// Vertex BRAM depth of the reference design
pub const DEFAULT_MAX_LINES: usize = 1024;
/// 320x240 frame and depth buffers
pub const FRAME_BUFFER_DEPTH: usize = 320 * 240;

/// X, Y, Z, U, V of one emitted vertex
pub type VertexRecord = [f64; WORDS_PER_VERTEX];

/// Flatten a mesh into vertex records, face by face.
///
/// Positions are written as they are in the mesh (model space); UVs go
/// through `uv_map` so they land in the material's atlas slot. The mesh is
/// validated first.
pub fn vertex_records<F>(mesh: &Mesh, uv_map: F) -> Result<Vec<VertexRecord>>
where
    F: Fn(MaterialId, Vec2) -> Vec2,
{
    mesh.validate()?;
    let mut records = Vec::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        for corner in 0..3 {
            let vertex = mesh.vertex(face, corner);
            let uv = uv_map(face.material, vertex.uv);
            let p = vertex.position;
            records.push([p.x, p.y, p.z, uv.x, uv.y]);
        }
    }
    Ok(records)
}

/// The raw words the hardware loads, sentinel included
pub fn encode_stream(records: &[VertexRecord]) -> Vec<u32> {
    let mut words: Vec<u32> = records
        .iter()
        .flat_map(|r| r.iter().map(|&v| fixed::encode(v)))
        .collect();
    words.extend(std::iter::repeat(SENTINEL).take(SENTINEL_WORDS));
    words
}

/// Vertex memory layout switches
#[derive(Debug, Clone)]
pub struct VertexMemOptions {
    /// First header comment line
    pub title: Option<String>,
    /// Add a comment with the decoded values before every vertex
    pub annotate: bool,
    /// Data-line budget; exceeding it warns but still writes
    pub max_lines: usize,
}

impl Default for VertexMemOptions {
    fn default() -> Self {
        Self {
            title: None,
            annotate: false,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

/// What went into a vertex memory file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub vertices: usize,
    /// Data words, excluding the sentinel
    pub data_lines: usize,
    /// Values outside the Q16.16 range, written wrapped
    pub wrapped: usize,
}

pub fn write_vertex_mem<W: Write>(
    writer: &mut W,
    records: &[VertexRecord],
    options: &VertexMemOptions,
) -> Result<StreamSummary> {
    let data_lines = records.len() * WORDS_PER_VERTEX;
    info!("memory usage: {data_lines} / {} lines", options.max_lines);
    if data_lines > options.max_lines {
        warn!(
            "model needs {data_lines} lines but vertex memory holds {}; reduce geometry",
            options.max_lines
        );
    }

    if let Some(title) = &options.title {
        writeln!(writer, "// {title}")?;
    }
    writeln!(writer, "// X, Y, Z, U, V (Q16.16)")?;

    let mut wrapped = 0;
    for (i, record) in records.iter().enumerate() {
        if options.annotate {
            if i % 3 == 0 {
                writeln!(writer, "// --- Triangle {} ---", i / 3)?;
            }
            let [x, y, z, u, v] = record;
            writeln!(
                writer,
                "// V{i}: ({x:.3}, {y:.3}, {z:.3}) UV:({u:.3}, {v:.3})"
            )?;
        }
        for &value in record {
            if fixed::overflows(value) {
                warn!("vertex {i}: {value} is outside Q16.16 and wraps");
                wrapped += 1;
            }
            writeln!(writer, "{}", fixed::to_hex(value))?;
        }
    }

    writeln!(writer, "// EOS")?;
    for _ in 0..SENTINEL_WORDS {
        writeln!(writer, "{SENTINEL:08X}")?;
    }

    Ok(StreamSummary {
        vertices: records.len(),
        data_lines,
        wrapped,
    })
}

/// One RGB444 line per atlas pixel, row by row
pub fn write_texture_mem<W: Write>(writer: &mut W, atlas: &TextureAtlas) -> Result<()> {
    for &[r, g, b] in atlas.pixels() {
        writeln!(writer, "{}", fixed::rgb444_hex(r, g, b))?;
    }
    Ok(())
}

/// `depth` identical lines of `value` as `digits` hex digits
pub fn write_fill_mem<W: Write>(
    writer: &mut W,
    depth: usize,
    digits: usize,
    value: u32,
) -> Result<()> {
    let line = format!("{value:0digits$X}\n");
    for _ in 0..depth {
        writer.write_all(line.as_bytes())?;
    }
    Ok(())
}

/// SystemVerilog initialiser for the geometry engine's MVP registers
pub fn verilog_matrix(mvp: &Mat4) -> String {
    const OUTPUTS: [&str; 4] = ["X", "Y", "Z", "W"];
    const RULE: &str = "// ==========================================\n";

    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("// SystemVerilog Fixed Point Matrix (Q16.16)\n");
    out.push_str(RULE);
    out.push_str("logic signed [31:0] MVP_MATRIX [0:15] = '{\n");
    for (r, name) in OUTPUTS.iter().enumerate() {
        let row: Vec<String> = (0..4).map(|c| fixed::to_verilog_hex(mvp[(r, c)])).collect();
        let sep = if r < 3 { "," } else { " " };
        out.push_str(&format!(
            "    {}{sep} // Row {r} ({name}_out = row . {{Vx, Vy, Vz, Vw}})\n",
            row.join(", ")
        ));
    }
    out.push_str("};\n");
    out.push_str("// Access pattern: MVP_MATRIX[row*4 + col]\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::geometry::Face;
    use pretty_assertions::assert_eq;

    fn two_triangles() -> Mesh {
        let mut mesh = Mesh::test_triangle();
        mesh.add_face(Face::new([2, 1, 0], [2, 1, 0], 1));
        mesh
    }

    #[test]
    fn test_records_follow_face_order() {
        let records = vertex_records(&two_triangles(), |_, uv| uv).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0], [-1.0, -1.0, 1.0, 0.0, 1.0]);
        assert_eq!(records[3], [1.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_records_use_uv_map() {
        let records = vertex_records(&two_triangles(), |material, _| {
            Vec2::new(material as f64, 0.5)
        })
        .unwrap();
        assert_eq!((records[0][3], records[0][4]), (0.0, 0.5));
        assert_eq!((records[5][3], records[5][4]), (1.0, 0.5));
    }

    #[test]
    fn test_records_reject_invalid_mesh() {
        let mut mesh = Mesh::test_triangle();
        mesh.faces[0].uvs[1] = 5;
        assert!(matches!(
            vertex_records(&mesh, |_, uv| uv),
            Err(Error::IndexOutOfRange { index: 5, .. })
        ));

        let mut mesh = Mesh::test_triangle();
        mesh.positions[2].z = f64::NEG_INFINITY;
        assert!(matches!(
            vertex_records(&mesh, |_, uv| uv),
            Err(Error::NonFinite { index: 2, .. })
        ));
    }

    #[test]
    fn test_stream_ends_with_sentinel() {
        let records = vertex_records(&Mesh::test_triangle(), |_, uv| uv).unwrap();
        let words = encode_stream(&records);
        assert_eq!(words.len(), 3 * 5 + 5);
        assert_eq!(&words[..5], &[0xFFFF_0000, 0xFFFF_0000, 0x0001_0000, 0, 0x0001_0000]);
        assert!(words[15..].iter().all(|&w| w == SENTINEL));
    }

    #[test]
    fn test_write_vertex_mem() {
        let records = vec![[0.5, -0.5, 40000.0, 0.25, 0.75]];
        let mut out = Vec::new();
        let summary = write_vertex_mem(
            &mut out,
            &records,
            &VertexMemOptions {
                title: Some("Star Data".to_string()),
                ..VertexMemOptions::default()
            },
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "// Star Data",
                "// X, Y, Z, U, V (Q16.16)",
                "00008000",
                "FFFF8000",
                "9C400000",
                "00004000",
                "0000C000",
                "// EOS",
                "FFFFFFFF",
                "FFFFFFFF",
                "FFFFFFFF",
                "FFFFFFFF",
                "FFFFFFFF",
            ]
        );
        assert_eq!(
            summary,
            StreamSummary {
                vertices: 1,
                data_lines: 5,
                wrapped: 1
            }
        );
    }

    #[test]
    fn test_annotated_vertex_mem() {
        let records = vertex_records(&Mesh::test_triangle(), |_, uv| uv).unwrap();
        let mut out = Vec::new();
        let options = VertexMemOptions {
            annotate: true,
            ..VertexMemOptions::default()
        };
        write_vertex_mem(&mut out, &records, &options).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("// --- Triangle 0 ---\n// V0: (-1.000, -1.000, 1.000) UV:(0.000, 1.000)\nFFFF0000\n"));
        assert_eq!(text.matches("// V").count(), 3);
    }

    #[test]
    fn test_texture_mem() {
        let mut atlas = TextureAtlas::new(2, 2, [0, 0, 0]).unwrap();
        atlas.fill_rect(1, 0, 1, 1, [0xFF, 0x80, 0x10]);
        atlas.fill_rect(0, 1, 1, 1, [0x91, 0xBD, 0x59]);
        let mut out = Vec::new();
        write_texture_mem(&mut out, &atlas).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "000\nF81\n9B5\n000\n");
    }

    #[test]
    fn test_fill_mem() {
        let mut out = Vec::new();
        write_fill_mem(&mut out, 3, 2, 0xFF).unwrap();
        assert_eq!(out, b"FF\nFF\nFF\n");

        let mut out = Vec::new();
        write_fill_mem(&mut out, 2, 3, 0).unwrap();
        assert_eq!(out, b"000\n000\n");
    }

    #[test]
    fn test_verilog_matrix() {
        let text = verilog_matrix(&crate::projection::Camera::hardware_mvp());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "logic signed [31:0] MVP_MATRIX [0:15] = '{");
        assert!(lines[4].starts_with("    32'h0000C000, 32'h00000000, 32'h00000000, 32'h00000000, // Row 0"));
        assert!(lines[7].starts_with(
            "    32'h00000000, 32'hFFFF8D84, 32'hFFFF1B07, 32'h000B2E2A  // Row 3 (W_out"
        ));
        assert_eq!(lines[8], "};");
    }
}
