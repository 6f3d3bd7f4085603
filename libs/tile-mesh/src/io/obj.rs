//! # Wavefront OBJ
//!
//! Reads and writes the subset of OBJ used for scene input and section
//! output: `o`, `v`, `vt`, `vn`, `f`, `usemtl` and `s`. Groups, material
//! libraries and free-form geometry are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use config::constants::DEFAULT_MATERIAL;
use glam::{DVec2, DVec3};
use tracing::debug;

use crate::error::MeshError;
use crate::mesh::{Corner, Face, Mesh};

/// A named mesh from an OBJ file.
#[derive(Debug, Clone)]
pub struct ObjObject {
    pub name: String,
    pub mesh: Mesh,
}

impl ObjObject {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
        }
    }
}

// =============================================================================
// READING
// =============================================================================

/// Collects the faces of one `o` block. Global OBJ indices are remapped to
/// object-local vertices on first use.
struct ObjectBuilder {
    name: String,
    mesh: Mesh,
    remap: HashMap<usize, u32>,
    face_materials: Vec<Option<String>>,
}

impl ObjectBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            mesh: Mesh::new(),
            remap: HashMap::new(),
            face_materials: Vec::new(),
        }
    }

    fn local_vertex(&mut self, global: usize, positions: &[DVec3]) -> u32 {
        let mesh = &mut self.mesh;
        *self
            .remap
            .entry(global)
            .or_insert_with(|| mesh.add_vertex(positions[global]))
    }

    fn finish(mut self) -> Option<ObjObject> {
        if self.mesh.is_empty() {
            return None;
        }

        // Faces before the first `usemtl` only get a named slot when the
        // object uses materials at all.
        let uses_materials = self.face_materials.iter().any(Option::is_some);
        if uses_materials && self.face_materials.iter().any(Option::is_none) {
            let slot = self.mesh.material_slot(DEFAULT_MATERIAL);
            for (face, material) in self.mesh.faces_mut().iter_mut().zip(&self.face_materials) {
                if material.is_none() {
                    face.material = slot;
                }
            }
        }

        Some(ObjObject::new(self.name, self.mesh))
    }
}

/// Resolves a 1-based (or negative, relative) OBJ index.
fn resolve_index(token: &str, count: usize, line: usize) -> Result<usize, MeshError> {
    let raw: i64 = token
        .parse()
        .map_err(|_| MeshError::parse(line, format!("invalid index '{token}'")))?;
    let index = match raw {
        0 => return Err(MeshError::parse(line, "index 0 is not valid in OBJ")),
        i if i > 0 => (i - 1) as usize,
        i => {
            let back = i.unsigned_abs() as usize;
            count
                .checked_sub(back)
                .ok_or_else(|| MeshError::parse(line, format!("relative index {i} out of range")))?
        }
    };
    if index >= count {
        return Err(MeshError::parse(line, format!("index {raw} out of range ({count} defined)")));
    }
    Ok(index)
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize) -> Result<[f64; N], MeshError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = parts
            .get(i)
            .ok_or_else(|| MeshError::parse(line, format!("expected {N} numbers")))?;
        *slot = token
            .parse()
            .map_err(|_| MeshError::parse(line, format!("invalid number '{token}'")))?;
    }
    Ok(out)
}

/// Parses OBJ text into one object per `o` block.
///
/// Faces before the first `o` statement belong to an object named
/// `default_name`. Objects without faces are skipped. Any `vn` reference marks
/// the object's normals as custom.
pub fn read_obj<R: BufRead>(reader: R, default_name: &str) -> Result<Vec<ObjObject>, MeshError> {
    let mut positions: Vec<DVec3> = Vec::new();
    let mut uvs: Vec<DVec2> = Vec::new();
    let mut normals: Vec<DVec3> = Vec::new();

    let mut objects = Vec::new();
    let mut current = ObjectBuilder::new(default_name.to_string());
    let mut material: Option<String> = None;
    let mut smooth = false;

    for (number, line) in reader.lines().enumerate() {
        let number = number + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "o" => {
                let name = parts[1..].join(" ");
                let next = ObjectBuilder::new(if name.is_empty() { default_name.to_string() } else { name });
                if let Some(object) = std::mem::replace(&mut current, next).finish() {
                    objects.push(object);
                }
            }
            "v" => {
                let [x, y, z] = parse_floats::<3>(&parts[1..], number)?;
                positions.push(DVec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&parts[1..], number)?;
                uvs.push(DVec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&parts[1..], number)?;
                normals.push(DVec3::new(x, y, z));
            }
            "usemtl" => material = parts.get(1).map(|s| s.to_string()),
            "s" => smooth = !matches!(parts.get(1), None | Some(&"off") | Some(&"0")),
            "f" => {
                if parts.len() < 4 {
                    return Err(MeshError::parse(number, "face needs at least three corners"));
                }
                let mut corners = Vec::with_capacity(parts.len() - 1);
                for token in &parts[1..] {
                    let mut refs = token.split('/');
                    let v = resolve_index(refs.next().unwrap_or(""), positions.len(), number)?;
                    let vt = match refs.next() {
                        Some(t) if !t.is_empty() => Some(resolve_index(t, uvs.len(), number)?),
                        _ => None,
                    };
                    let vn = match refs.next() {
                        Some(t) if !t.is_empty() => Some(resolve_index(t, normals.len(), number)?),
                        _ => None,
                    };

                    let mut corner = Corner::new(current.local_vertex(v, &positions));
                    if let Some(vt) = vt {
                        corner.uv = uvs[vt];
                    }
                    if let Some(vn) = vn {
                        corner.normal = normals[vn];
                        current.mesh.set_custom_normals(true);
                    }
                    corners.push(corner);
                }

                let slot = match &material {
                    Some(name) => current.mesh.material_slot(name),
                    None => 0,
                };
                let mut face = Face::new(corners, slot);
                face.smooth = smooth;
                current.mesh.add_face(face);
                current.face_materials.push(material.clone());
            }
            other => debug!(line = number, keyword = other, "skipping unsupported OBJ statement"),
        }
    }

    if let Some(object) = current.finish() {
        objects.push(object);
    }
    Ok(objects)
}

/// Reads an OBJ file; the file stem names an unnamed leading object.
pub fn read_obj_file(path: &Path) -> Result<Vec<ObjObject>, MeshError> {
    let file = File::open(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Object".to_string());
    read_obj(BufReader::new(file), &stem)
}

// =============================================================================
// WRITING
// =============================================================================

/// Writes objects as OBJ text with one `vt`/`vn` per face corner.
pub fn write_obj<W: Write>(mut writer: W, objects: &[ObjObject]) -> Result<(), MeshError> {
    let mut vertex_base = 1usize;
    let mut corner_base = 1usize;

    for object in objects {
        let mesh = &object.mesh;
        writeln!(writer, "o {}", object.name)?;
        for v in mesh.vertices() {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for corner in mesh.faces().iter().flat_map(|f| &f.corners) {
            writeln!(writer, "vt {} {}", corner.uv.x, corner.uv.y)?;
        }
        for corner in mesh.faces().iter().flat_map(|f| &f.corners) {
            writeln!(writer, "vn {} {} {}", corner.normal.x, corner.normal.y, corner.normal.z)?;
        }

        let mut material: Option<u16> = None;
        let mut smooth: Option<bool> = None;
        let mut corner_index = corner_base;
        for face in mesh.faces() {
            if material != Some(face.material) {
                if let Some(name) = mesh.material_name(face.material) {
                    writeln!(writer, "usemtl {name}")?;
                }
                material = Some(face.material);
            }
            if smooth != Some(face.smooth) {
                writeln!(writer, "s {}", if face.smooth { "1" } else { "off" })?;
                smooth = Some(face.smooth);
            }

            write!(writer, "f")?;
            for corner in &face.corners {
                let v = vertex_base + corner.vertex as usize;
                write!(writer, " {v}/{corner_index}/{corner_index}")?;
                corner_index += 1;
            }
            writeln!(writer)?;
        }

        vertex_base += mesh.vertex_count();
        corner_base = corner_index;
    }

    writer.flush()?;
    Ok(())
}

/// Writes objects to an OBJ file.
pub fn write_obj_file(path: &Path, objects: &[ObjObject]) -> Result<(), MeshError> {
    let file = File::create(path)?;
    write_obj(BufWriter::new(file), objects)
}
