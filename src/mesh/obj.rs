/// Minimal wavefront `.obj` reader.
///
/// Supports `v`, `vt`, `vn` and `f` records; every other record is ignored.
/// Face corners may be written as `v`, `v/vt`, `v//vn` or `v/vt/vn`, with
/// 1-based or negative (relative) indices. Polygons are fan-triangulated.
use super::{Face, Mesh};
use crate::error::{Error, Result};
use glam::{Vec2, Vec3};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load and resolve a model file into a [`Mesh`].
pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = parse_obj(BufReader::new(file)).map_err(|err| match err {
        Error::Io { source, .. } => Error::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    log::info!("loaded {} ({} faces)", path.display(), mesh.len());
    Ok(mesh)
}

#[derive(Clone, Copy)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Parse model text from any buffered reader.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line_no = line_index + 1;
        let line = line.map_err(|source| Error::Io {
            path: Default::default(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut words = line.split_whitespace();
        let Some(tag) = words.next() else { continue };

        match tag {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut words, line_no)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&mut words, line_no)?;
                uvs.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&mut words, line_no)?;
                normals.push(Vec3::new(x, y, z));
            }
            "f" => {
                let corners = words
                    .map(|word| {
                        parse_corner(word, line_no, positions.len(), uvs.len(), normals.len())
                    })
                    .collect::<Result<Vec<_>>>()?;
                if corners.len() < 3 {
                    return Err(Error::ObjParse {
                        line: line_no,
                        message: format!("face has {} corners", corners.len()),
                    });
                }
                for i in 1..corners.len() - 1 {
                    let tri = [corners[0], corners[i], corners[i + 1]];
                    faces.push(resolve_face(&tri, &positions, &uvs, &normals));
                }
            }
            _ => {}
        }
    }

    Ok(Mesh::new(faces))
}

fn parse_floats<'a, const N: usize>(
    words: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    for slot in out.iter_mut() {
        let word = words.next().ok_or_else(|| Error::ObjParse {
            line,
            message: format!("expected {N} numbers"),
        })?;
        *slot = word.parse().map_err(|_| Error::ObjParse {
            line,
            message: format!("invalid number `{word}`"),
        })?;
    }
    Ok(out)
}

fn parse_corner(
    word: &str,
    line: usize,
    position_count: usize,
    uv_count: usize,
    normal_count: usize,
) -> Result<Corner> {
    let mut parts = word.split('/');
    let position = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::ObjParse {
            line,
            message: format!("corner `{word}` has no position index"),
        })?;
    let position = resolve_index(position, position_count, line, "vertex")?;

    let uv = match parts.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, uv_count, line, "texture")?),
        _ => None,
    };
    let normal = match parts.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, normal_count, line, "normal")?),
        _ => None,
    };

    Ok(Corner {
        position,
        uv,
        normal,
    })
}

fn resolve_index(text: &str, count: usize, line: usize, kind: &'static str) -> Result<usize> {
    let raw: i64 = text.parse().map_err(|_| Error::ObjParse {
        line,
        message: format!("invalid {kind} index `{text}`"),
    })?;
    let resolved = if raw < 0 { count as i64 + raw } else { raw - 1 };
    if resolved < 0 || resolved >= count as i64 {
        return Err(Error::ObjIndex {
            line,
            kind,
            index: raw,
        });
    }
    Ok(resolved as usize)
}

fn resolve_face(corners: &[Corner; 3], positions: &[Vec3], uvs: &[Vec2], normals: &[Vec3]) -> Face {
    let pts = corners.map(|c| positions[c.position]);
    let fallback = (pts[1] - pts[0]).cross(pts[2] - pts[0]).normalize_or_zero();

    Face {
        positions: pts,
        normals: corners.map(|c| c.normal.map_or(fallback, |i| normals[i])),
        uvs: corners.map(|c| c.uv.map_or(Vec2::ZERO, |i| uvs[i])),
    }
}
