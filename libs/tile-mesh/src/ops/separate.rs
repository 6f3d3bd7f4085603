//! # Loose Part Separation
//!
//! Splits a mesh into one mesh per connected component. Faces belong to the
//! same component when they share a vertex.

use super::split::{find, union};
use crate::mesh::{Face, Mesh};

/// Separates `mesh` into its connected components.
///
/// Components are ordered by their first face in the input, so the result is
/// deterministic. Each part keeps the full material slot list and the custom
/// normal flag of the input.
pub fn separate_loose(mesh: &Mesh) -> Vec<Mesh> {
    if mesh.is_empty() {
        return Vec::new();
    }

    let mut parent: Vec<usize> = (0..mesh.vertex_count()).collect();
    for face in mesh.faces() {
        let mut ids = face.vertex_ids();
        if let Some(first) = ids.next() {
            for v in ids {
                union(&mut parent, first as usize, v as usize);
            }
        }
    }

    let mut component_of_root: Vec<usize> = vec![usize::MAX; mesh.vertex_count()];
    let mut parts: Vec<Vec<&Face>> = Vec::new();
    for face in mesh.faces() {
        let Some(first) = face.corners.first() else {
            continue;
        };
        let root = find(&mut parent, first.vertex as usize);
        if component_of_root[root] == usize::MAX {
            component_of_root[root] = parts.len();
            parts.push(Vec::new());
        }
        parts[component_of_root[root]].push(face);
    }

    parts
        .into_iter()
        .map(|faces| extract_faces(mesh, faces.into_iter()))
        .collect()
}

/// Builds a new mesh from a subset of faces, keeping only their vertices.
pub fn extract_faces<'a>(mesh: &Mesh, faces: impl Iterator<Item = &'a Face>) -> Mesh {
    let mut part = Mesh::new();
    for name in mesh.materials() {
        part.material_slot(name);
    }
    part.set_custom_normals(mesh.has_custom_normals());

    let mut remap = vec![u32::MAX; mesh.vertex_count()];
    for face in faces {
        let mut face = face.clone();
        for corner in &mut face.corners {
            let slot = &mut remap[corner.vertex as usize];
            if *slot == u32::MAX {
                *slot = part.add_vertex(mesh.vertex(corner.vertex));
            }
            corner.vertex = *slot;
        }
        part.add_face(face);
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn two_islands() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.material_slot("Grass");
        for x in [0.0, 10.0] {
            let a = mesh.add_vertex(DVec3::new(x, 0.0, 0.0));
            let b = mesh.add_vertex(DVec3::new(x + 1.0, 0.0, 0.0));
            let c = mesh.add_vertex(DVec3::new(x, 1.0, 0.0));
            let d = mesh.add_vertex(DVec3::new(x + 1.0, 1.0, 0.0));
            mesh.add_triangle(a, b, c);
            mesh.add_triangle(b, d, c);
        }
        mesh
    }

    #[test]
    fn test_separate_two_islands() {
        let parts = separate_loose(&two_islands());
        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert_eq!(part.vertex_count(), 4);
            assert_eq!(part.face_count(), 2);
            assert_eq!(part.materials(), ["Grass".to_string()]);
        }
        assert!(parts[0].bounds_center().x < parts[1].bounds_center().x);
    }

    #[test]
    fn test_separate_single_component() {
        let mut mesh = two_islands();
        // Bridge the islands.
        mesh.add_triangle(1, 4, 3);
        assert_eq!(separate_loose(&mesh).len(), 1);
    }

    #[test]
    fn test_separate_empty() {
        assert!(separate_loose(&Mesh::new()).is_empty());
    }
}
