//! # Normals
//!
//! Vertex normals, split (per-corner) normals, custom normals and
//! nearest-surface normal transfer between meshes.

use glam::DVec3;

use crate::mesh::Mesh;
use crate::spatial_index::SpatialIndex;

/// Area-weighted vertex normals.
pub fn vertex_normals(mesh: &Mesh) -> Vec<DVec3> {
    let mut normals = vec![DVec3::ZERO; mesh.vertex_count()];

    for face in mesh.faces() {
        let normal = mesh.face_normal_raw(face);
        for v in face.vertex_ids() {
            normals[v as usize] += normal;
        }
    }

    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }
    normals
}

/// Recomputes split normals.
///
/// Authored (custom) normals are kept and renormalized. Otherwise smooth
/// faces take the vertex normal and flat faces the face normal.
pub fn calc_split_normals(mesh: &mut Mesh) {
    if mesh.has_custom_normals() {
        for face in mesh.faces_mut() {
            for corner in &mut face.corners {
                corner.normal = corner.normal.normalize_or_zero();
            }
        }
        return;
    }

    let vertex = vertex_normals(mesh);
    let face_normals: Vec<DVec3> = mesh.faces().iter().map(|f| mesh.face_normal(f)).collect();
    for (face, face_normal) in mesh.faces_mut().iter_mut().zip(face_normals) {
        for corner in &mut face.corners {
            corner.normal = if face.smooth {
                vertex[corner.vertex as usize]
            } else {
                face_normal
            };
        }
    }
}

/// Enables custom split normals seeded from the vertex normals.
pub fn set_custom_normals_from_vertices(mesh: &mut Mesh) {
    let vertex = vertex_normals(mesh);
    for face in mesh.faces_mut() {
        for corner in &mut face.corners {
            corner.normal = vertex[corner.vertex as usize];
        }
    }
    mesh.set_custom_normals(true);
}

/// Transfers corner normals from the nearest point of `source` onto
/// `target`, blending with the existing normals by `factor` (1.0 replaces).
///
/// The source corner normals are interpolated barycentrically on the hit
/// triangle. Corners of `target` become custom normals. Returns the number of
/// corners updated.
pub fn transfer_normals(target: &mut Mesh, source: &Mesh, factor: f64) -> usize {
    transfer_normals_with(target, source, &SpatialIndex::from_mesh(source), factor)
}

/// [`transfer_normals`] with a prebuilt index over `source`, for transferring
/// from one source onto many targets.
pub fn transfer_normals_with(target: &mut Mesh, source: &Mesh, index: &SpatialIndex, factor: f64) -> usize {
    let factor = factor.clamp(0.0, 1.0);

    let positions: Vec<Vec<DVec3>> = target
        .faces()
        .iter()
        .map(|f| f.vertex_ids().map(|v| target.vertex(v)).collect())
        .collect();

    let mut updated = 0;
    for (face, points) in target.faces_mut().iter_mut().zip(positions) {
        for (corner, p) in face.corners.iter_mut().zip(points) {
            let Some(hit) = index.nearest(p) else {
                continue;
            };
            let tri = index.triangles()[hit.triangle];
            let source_face = &source.faces()[tri.face];
            let w = hit.barycentric;
            let transferred = source_face.corners[tri.corners[0]].normal * w.x
                + source_face.corners[tri.corners[1]].normal * w.y
                + source_face.corners[tri.corners[2]].normal * w.z;

            let blended = corner.normal.lerp(transferred, factor);
            if let Some(n) = blended.try_normalize() {
                corner.normal = n;
                updated += 1;
            }
        }
    }

    target.set_custom_normals(true);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Corner, Face};
    use approx::assert_relative_eq;

    /// Two triangles folded along the y axis like an open book.
    fn fold() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, 0.0, 1.0));
        mesh.add_vertex(DVec3::new(-1.0, 0.0, 1.0));
        let mut a = Face::new(vec![Corner::new(0), Corner::new(2), Corner::new(1)], 0);
        let mut b = Face::new(vec![Corner::new(0), Corner::new(1), Corner::new(3)], 0);
        a.smooth = true;
        b.smooth = true;
        mesh.add_face(a);
        mesh.add_face(b);
        mesh
    }

    #[test]
    fn test_smooth_split_normals_share_vertex_normal() {
        let mut mesh = fold();
        calc_split_normals(&mut mesh);
        let n0 = mesh.faces()[0].corners[0].normal;
        let n1 = mesh.faces()[1].corners[0].normal;
        assert_relative_eq!(n0.x, n1.x, epsilon = 1e-12);
        assert_relative_eq!(n0.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_split_normals_use_face_normal() {
        let mut mesh = fold();
        for face in mesh.faces_mut() {
            face.smooth = false;
        }
        calc_split_normals(&mut mesh);
        let n0 = mesh.faces()[0].corners[0].normal;
        let n1 = mesh.faces()[1].corners[0].normal;
        assert!(n0.dot(n1) < 0.99);
    }

    #[test]
    fn test_custom_normals_survive_recalculation() {
        let mut mesh = fold();
        for face in mesh.faces_mut() {
            for corner in &mut face.corners {
                corner.normal = DVec3::new(0.0, 0.0, 2.0);
            }
        }
        mesh.set_custom_normals(true);
        calc_split_normals(&mut mesh);
        assert_eq!(mesh.faces()[0].corners[1].normal, DVec3::Z);
    }

    #[test]
    fn test_transfer_normals_replaces_with_source() {
        let mut source = Mesh::new();
        source.add_vertex(DVec3::new(-10.0, -10.0, 0.0));
        source.add_vertex(DVec3::new(10.0, -10.0, 0.0));
        source.add_vertex(DVec3::new(0.0, 10.0, 0.0));
        let tilted = DVec3::new(1.0, 0.0, 1.0).normalize();
        let mut face = Face::new(vec![Corner::new(0), Corner::new(1), Corner::new(2)], 0);
        for corner in &mut face.corners {
            corner.normal = tilted;
        }
        source.add_face(face);

        let mut target = Mesh::new();
        target.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        target.add_vertex(DVec3::new(1.0, 0.0, 0.0));
        target.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        target.add_triangle(0, 1, 2);
        set_custom_normals_from_vertices(&mut target);

        let updated = transfer_normals(&mut target, &source, 1.0);
        assert_eq!(updated, 3);
        assert!(target.has_custom_normals());
        for corner in &target.faces()[0].corners {
            assert_relative_eq!(corner.normal.dot(tilted), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_transfer_normals_zero_factor_keeps_target() {
        let mut source = fold();
        calc_split_normals(&mut source);

        let mut target = fold();
        set_custom_normals_from_vertices(&mut target);
        let before: Vec<DVec3> = target.faces()[0].corners.iter().map(|c| c.normal).collect();

        transfer_normals(&mut target, &source, 0.0);
        let after: Vec<DVec3> = target.faces()[0].corners.iter().map(|c| c.normal).collect();
        for (a, b) in before.iter().zip(after) {
            assert!((*a - b).length() < 1e-12);
        }
    }

    #[test]
    fn test_shared_index_matches_per_call_index() {
        let mut source = fold();
        calc_split_normals(&mut source);
        let index = SpatialIndex::from_mesh(&source);

        let mut shared = fold();
        let mut fresh = fold();
        set_custom_normals_from_vertices(&mut shared);
        set_custom_normals_from_vertices(&mut fresh);

        let a = transfer_normals_with(&mut shared, &source, &index, 1.0);
        let b = transfer_normals(&mut fresh, &source, 1.0);
        assert_eq!(a, b);
        for (fa, fb) in shared.faces().iter().zip(fresh.faces()) {
            for (ca, cb) in fa.corners.iter().zip(&fb.corners) {
                assert!((ca.normal - cb.normal).length() < 1e-12);
            }
        }
    }
}
