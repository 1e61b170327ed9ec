/// Wavefront OBJ and MTL parsing
///
/// Only what the exporters need: positions, texture coordinates, material
/// switches and polygonal faces. Polygons are fan-triangulated; normals and
/// every other directive are skipped.
use log::{debug, warn};
use nom::{
    bytes::complete::tag,
    character::complete::{char, i64 as parse_i64, space1},
    combinator::{opt, rest},
    multi::many1,
    number::complete::double,
    sequence::{preceded, tuple},
    IResult,
};

use crate::atlas::MaterialAllocator;
use crate::error::{Error, IndexKind, Result};
use crate::geometry::{Face, MaterialId, Mesh};

/// Parser switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjOptions {
    /// Reverse every polygon's vertex order, flipping which side is culled
    pub flip_winding: bool,
}

/// One `v/vt/vn` reference of a face, still 1-based or negative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FaceRef {
    v: i64,
    vt: Option<i64>,
}

fn parse_vector3(input: &str) -> IResult<&str, (f64, f64, f64)> {
    tuple((
        preceded(space1, double),
        preceded(space1, double),
        preceded(space1, double),
    ))(input)
}

fn parse_position(input: &str) -> IResult<&str, (f64, f64, f64)> {
    preceded(tag("v"), parse_vector3)(input)
}

fn parse_tex_coord(input: &str) -> IResult<&str, (f64, Option<f64>)> {
    preceded(
        tag("vt"),
        tuple((preceded(space1, double), opt(preceded(space1, double)))),
    )(input)
}

fn parse_face_ref(input: &str) -> IResult<&str, FaceRef> {
    let (input, v) = parse_i64(input)?;
    let (input, vt) = opt(preceded(char('/'), opt(parse_i64)))(input)?;
    // normal index, unused
    let (input, _) = opt(preceded(char('/'), opt(parse_i64)))(input)?;
    Ok((input, FaceRef { v, vt: vt.flatten() }))
}

fn parse_face(input: &str) -> IResult<&str, Vec<FaceRef>> {
    preceded(tag("f"), many1(preceded(space1, parse_face_ref)))(input)
}

fn parse_named<'a>(keyword: &str, input: &'a str) -> IResult<&'a str, &'a str> {
    let (input, _) = tag(keyword)(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = rest(input)?;
    Ok((input, name.trim()))
}

fn finish<'a, T>(line: usize, text: &str, result: IResult<&'a str, T>) -> Result<T> {
    result.map(|(_, value)| value).map_err(|_| Error::Parse {
        line,
        message: format!("malformed directive `{text}`"),
    })
}

/// Reject `nan` and `inf`, which `double` accepts as numbers
fn finite<const N: usize>(line: usize, text: &str, values: [f64; N]) -> Result<[f64; N]> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(values)
    } else {
        Err(Error::Parse {
            line,
            message: format!("non-finite value in `{text}`"),
        })
    }
}

/// Resolve a 1-based or negative (relative) OBJ index against `len` items
fn resolve(index: i64, len: usize, face: usize, kind: IndexKind) -> Result<usize> {
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len as i64 + i,
        _ => -1,
    };
    if resolved < 0 {
        return Err(Error::IndexOutOfRange {
            face,
            kind,
            index,
            len,
        });
    }
    Ok(resolved as usize)
}

/// Parse OBJ text into a triangle mesh.
///
/// Texture V is flipped to the image convention (V=0 at the top). Material
/// names are turned into ids by `materials`, which the caller owns.
pub fn parse_obj(
    input: &str,
    materials: &mut MaterialAllocator,
    options: &ObjOptions,
) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    let mut material: MaterialId = 0;

    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        let Some(keyword) = text.split_whitespace().next() else {
            continue;
        };
        if keyword.starts_with('#') {
            continue;
        }

        match keyword {
            "v" => {
                let (x, y, z) = finish(line, text, parse_position(text))?;
                let [x, y, z] = finite(line, text, [x, y, z])?;
                mesh.add_position(x, y, z);
            }
            "vt" => {
                let (u, v) = finish(line, text, parse_tex_coord(text))?;
                let [u, v] = finite(line, text, [u, v.unwrap_or(0.0)])?;
                let v = v.rem_euclid(1.0);
                mesh.add_uv(u, 1.0 - v);
            }
            "usemtl" => {
                let name = finish(line, text, parse_named("usemtl", text))?;
                material = materials.id_for(name);
            }
            "f" => {
                let mut refs = finish(line, text, parse_face(text))?;
                if refs.len() < 3 {
                    return Err(Error::FaceTooSmall {
                        line,
                        vertices: refs.len(),
                    });
                }
                if options.flip_winding {
                    refs.reverse();
                }

                let face_index = mesh.faces.len();
                let mut positions = Vec::with_capacity(refs.len());
                let mut uvs = Vec::with_capacity(refs.len());
                for r in &refs {
                    positions.push(resolve(
                        r.v,
                        mesh.positions.len(),
                        face_index,
                        IndexKind::Position,
                    )?);
                    uvs.push(match r.vt {
                        Some(vt) => resolve(vt, mesh.uvs.len(), face_index, IndexKind::Uv)?,
                        None => 0,
                    });
                }

                // fan split: (0,1,2), (0,2,3), ...
                for i in 1..refs.len() - 1 {
                    mesh.add_face(Face::new(
                        [positions[0], positions[i], positions[i + 1]],
                        [uvs[0], uvs[i], uvs[i + 1]],
                        material,
                    ));
                }
            }
            other => debug!("line {line}: skipping `{other}`"),
        }
    }

    if mesh.uvs.is_empty() {
        mesh.add_uv(0.0, 0.0);
    }
    mesh.validate()?;
    Ok(mesh)
}

/// Register the materials of an MTL file, in declaration order, along with
/// their diffuse (or ambient) texture file names.
pub fn parse_mtl(input: &str, materials: &mut MaterialAllocator) -> Result<()> {
    let mut current: Option<String> = None;

    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        let Some(keyword) = text.split_whitespace().next() else {
            continue;
        };

        match keyword {
            "newmtl" => {
                let name = finish(line, text, parse_named("newmtl", text))?;
                materials.id_for(name);
                current = Some(name.to_string());
            }
            "map_Kd" | "map_Ka" => {
                let args = finish(line, text, parse_named(keyword, text))?;
                let Some(name) = current.as_deref() else {
                    warn!("line {line}: texture map outside of a material");
                    continue;
                };
                // options may precede the file; keep only its last path component
                let path = args.split_whitespace().last().unwrap_or(args);
                let file = path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path);
                materials.set_texture(name, file);
            }
            _ => {}
        }
    }

    Ok(())
}
