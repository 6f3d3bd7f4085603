//! # Beautify Fill
//!
//! Flips the shared edge of adjacent, nearly coplanar triangle pairs when
//! that raises the smallest angle of the pair. Repeated sweeps converge on a
//! Delaunay-like triangulation without moving any vertex.

use std::collections::HashMap;

use config::constants::BEAUTIFY_MAX_PASSES;
use glam::DVec3;

use crate::mesh::{edge_key, Corner, Mesh};

/// Tolerance for treating two corner attributes as continuous.
const ATTRIBUTE_EPSILON: f64 = 1e-9;

/// Runs edge-flip sweeps over all triangle pairs whose normals differ by at
/// most `angle_limit` radians.
///
/// Pairs separated by a material change, a shading change or a UV seam are
/// never flipped. Returns the number of flips performed.
pub fn beautify_fill(mesh: &mut Mesh, angle_limit: f64) -> usize {
    let cos_limit = angle_limit.cos();
    let mut total = 0;

    for _ in 0..BEAUTIFY_MAX_PASSES {
        let flips = beautify_pass(mesh, cos_limit);
        total += flips;
        if flips == 0 {
            break;
        }
    }

    total
}

fn beautify_pass(mesh: &mut Mesh, cos_limit: f64) -> usize {
    let mut edges: HashMap<(u32, u32), Vec<(usize, usize)>> = HashMap::new();
    for (fi, face) in mesh.faces().iter().enumerate() {
        if face.len() != 3 {
            continue;
        }
        for (ci, (a, b)) in face.edges().enumerate() {
            edges.entry(edge_key(a, b)).or_default().push((fi, ci));
        }
    }

    let mut keys: Vec<(u32, u32)> = edges
        .iter()
        .filter(|(_, uses)| uses.len() == 2)
        .map(|(&k, _)| k)
        .collect();
    keys.sort_unstable();

    let mut modified = vec![false; mesh.face_count()];
    let mut flips = 0;

    for key in keys {
        let uses = &edges[&key];
        let (fa, ia) = uses[0];
        let (fb, ib) = uses[1];
        if fa == fb || modified[fa] || modified[fb] {
            continue;
        }

        let Some([first, second]) = flip_candidate(mesh, fa, ia, fb, ib, cos_limit, &edges) else {
            continue;
        };

        mesh.faces_mut()[fa].corners = first;
        mesh.faces_mut()[fb].corners = second;
        modified[fa] = true;
        modified[fb] = true;
        flips += 1;
    }

    flips
}

/// Returns the corners of the two flipped triangles if flipping the edge
/// shared by faces `fa` and `fb` is allowed and improves the pair.
fn flip_candidate(
    mesh: &Mesh,
    fa: usize,
    ia: usize,
    fb: usize,
    ib: usize,
    cos_limit: f64,
    edges: &HashMap<(u32, u32), Vec<(usize, usize)>>,
) -> Option<[Vec<Corner>; 2]> {
    let face_a = &mesh.faces()[fa];
    let face_b = &mesh.faces()[fb];
    if face_a.material != face_b.material || face_a.smooth != face_b.smooth {
        return None;
    }

    let a = face_a.corners[ia];
    let b = face_a.corners[(ia + 1) % 3];
    let c = face_a.corners[(ia + 2) % 3];

    // Face B must run the shared edge the opposite way.
    let b2 = face_b.corners[ib];
    let a2 = face_b.corners[(ib + 1) % 3];
    let d = face_b.corners[(ib + 2) % 3];
    if b2.vertex != b.vertex || a2.vertex != a.vertex || c.vertex == d.vertex {
        return None;
    }
    if !continuous(&a, &a2) || !continuous(&b, &b2) {
        return None;
    }
    if edges.contains_key(&edge_key(c.vertex, d.vertex)) {
        return None;
    }

    let normal_a = mesh.face_normal(face_a);
    let normal_b = mesh.face_normal(face_b);
    if normal_a.dot(normal_b) < cos_limit {
        return None;
    }

    let [pa, pb, pc, pd] = [a, b, c, d].map(|k| mesh.vertex(k.vertex));
    let reference = normal_a + normal_b;
    let facing = |p: DVec3, q: DVec3, r: DVec3| (q - p).cross(r - p).dot(reference) > 0.0;
    if !facing(pc, pa, pd) || !facing(pd, pb, pc) {
        return None;
    }

    let before = min_angle(pa, pb, pc).min(min_angle(pb, pa, pd));
    let after = min_angle(pc, pa, pd).min(min_angle(pd, pb, pc));
    if after <= before + 1e-9 {
        return None;
    }

    Some([vec![c, a, d], vec![d, b, c]])
}

fn continuous(x: &Corner, y: &Corner) -> bool {
    x.uv.distance_squared(y.uv) <= ATTRIBUTE_EPSILON
        && x.normal.distance_squared(y.normal) <= ATTRIBUTE_EPSILON
}

/// Smallest interior angle of triangle `pqr` in radians.
fn min_angle(p: DVec3, q: DVec3, r: DVec3) -> f64 {
    let angle = |o: DVec3, u: DVec3, v: DVec3| (u - o).angle_between(v - o);
    angle(p, q, r).min(angle(q, r, p)).min(angle(r, p, q))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Long thin quad split along its long diagonal.
    fn skinny_pair() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(4.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(4.2, 1.0, 0.0));
        mesh.add_vertex(DVec3::new(0.2, 1.0, 0.0));
        // Diagonal 0-2 is the long one for this parallelogram.
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        mesh
    }

    #[test]
    fn test_beautify_flips_long_diagonal() {
        let mut mesh = skinny_pair();
        let area = mesh.surface_area();
        let flips = beautify_fill(&mut mesh, std::f64::consts::PI);
        assert_eq!(flips, 1);
        assert!((mesh.surface_area() - area).abs() < 1e-12);
        let uses_13 = mesh
            .faces()
            .iter()
            .all(|f| f.vertex_ids().any(|v| v == 1) && f.vertex_ids().any(|v| v == 3));
        assert!(uses_13);
        for face in mesh.faces() {
            assert!(mesh.face_normal(face).z > 0.0);
        }
    }

    #[test]
    fn test_beautify_respects_material_boundary() {
        let mut mesh = skinny_pair();
        mesh.faces_mut()[1].material = 1;
        assert_eq!(beautify_fill(&mut mesh, std::f64::consts::PI), 0);
    }

    #[test]
    fn test_beautify_respects_angle_limit() {
        let mut mesh = skinny_pair();
        mesh.vertices_mut()[3].z = 1.0;
        assert_eq!(beautify_fill(&mut mesh, 0.01), 0);
    }

    #[test]
    fn test_beautify_is_stable() {
        let mut mesh = skinny_pair();
        beautify_fill(&mut mesh, std::f64::consts::PI);
        assert_eq!(beautify_fill(&mut mesh, std::f64::consts::PI), 0);
    }
}
