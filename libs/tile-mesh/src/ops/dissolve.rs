//! # Limited Dissolve
//!
//! Merges regions of nearly coplanar faces into single polygons. Regions are
//! delimited by material, shading flag, UV seams and the angle limit, and a
//! region is only merged when its border is one simple loop.

use std::collections::{HashMap, VecDeque};

use glam::DVec3;
use tracing::trace;

use crate::mesh::{edge_key, Corner, Face, Mesh};

const UNASSIGNED: usize = usize::MAX;

/// Corner attribute tolerance (squared distance).
const SEAM_EPSILON: f64 = 1e-12;

/// Edge adjacency: undirected edge to (face, corner) pairs, where the corner
/// starts the directed edge inside that face.
type EdgeUses = HashMap<(u32, u32), Vec<(usize, usize)>>;

/// Dissolves coplanar face regions whose normals stay within `angle_limit`
/// radians of the region's first face.
///
/// Border vertices that end up used by a single polygon and lie on a straight
/// run are dissolved as well. Returns the number of faces removed.
pub fn dissolve_planar(mesh: &mut Mesh, angle_limit: f64) -> usize {
    let before = mesh.face_count();
    if before < 2 {
        return 0;
    }

    let cos_limit = angle_limit.cos();
    let uses = edge_uses(mesh);
    let normals: Vec<DVec3> = mesh.faces().iter().map(|f| mesh.face_normal(f)).collect();
    let regions = grow_regions(mesh, &uses, &normals, cos_limit);

    let mut merged: HashMap<usize, Face> = HashMap::new();
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    for (face, &region) in regions.iter().enumerate() {
        members.entry(region).or_default().push(face);
    }
    for (&region, faces) in &members {
        if faces.len() < 2 {
            continue;
        }
        match region_loop(mesh, &uses, &regions, region, faces) {
            Some(face) => {
                merged.insert(region, face);
            }
            None => trace!(region, faces = faces.len(), "region border is not a single loop"),
        }
    }

    let mut faces = Vec::with_capacity(before);
    for (index, face) in mesh.faces().iter().enumerate() {
        let region = regions[index];
        match merged.get(&region) {
            // The region's seed is its lowest face index.
            Some(polygon) if region == index => faces.push(polygon.clone()),
            Some(_) => {}
            None => faces.push(face.clone()),
        }
    }

    mesh.set_faces(faces);
    dissolve_border_vertices(mesh, cos_limit);
    mesh.compact();
    before - mesh.face_count()
}

fn edge_uses(mesh: &Mesh) -> EdgeUses {
    let mut uses = EdgeUses::new();
    for (fi, face) in mesh.faces().iter().enumerate() {
        for (ci, (a, b)) in face.edges().enumerate() {
            uses.entry(edge_key(a, b)).or_default().push((fi, ci));
        }
    }
    uses
}

/// True when faces `f` and `g` share the edge starting at corners `i` and `j`
/// without any attribute discontinuity across it.
fn compatible(mesh: &Mesh, (f, i): (usize, usize), (g, j): (usize, usize)) -> bool {
    let face_f = &mesh.faces()[f];
    let face_g = &mesh.faces()[g];
    if face_f.material != face_g.material || face_f.smooth != face_g.smooth {
        return false;
    }

    let nf = face_f.len();
    let ng = face_g.len();
    let f0 = &face_f.corners[i];
    let f1 = &face_f.corners[(i + 1) % nf];
    let g0 = &face_g.corners[j];
    let g1 = &face_g.corners[(j + 1) % ng];

    // Opposite winding across the shared edge.
    if f0.vertex != g1.vertex || f1.vertex != g0.vertex {
        return false;
    }
    same_attributes(f0, g1) && same_attributes(f1, g0)
}

fn same_attributes(x: &Corner, y: &Corner) -> bool {
    x.uv.distance_squared(y.uv) <= SEAM_EPSILON
        && x.normal.distance_squared(y.normal) <= SEAM_EPSILON
}

/// Flood-fills face regions. A region id is the index of its seed face.
fn grow_regions(mesh: &Mesh, uses: &EdgeUses, normals: &[DVec3], cos_limit: f64) -> Vec<usize> {
    let mut region = vec![UNASSIGNED; mesh.face_count()];
    let mut queue = VecDeque::new();

    for seed in 0..mesh.face_count() {
        if region[seed] != UNASSIGNED {
            continue;
        }
        region[seed] = seed;
        let seed_normal = normals[seed];
        if seed_normal == DVec3::ZERO {
            continue;
        }

        queue.push_back(seed);
        while let Some(f) = queue.pop_front() {
            for (i, (a, b)) in mesh.faces()[f].edges().enumerate() {
                let Some(&[first, second]) = uses.get(&edge_key(a, b)).map(Vec::as_slice) else {
                    continue;
                };
                let (g, j) = if first.0 == f { second } else { first };
                if region[g] != UNASSIGNED || normals[g].dot(seed_normal) < cos_limit {
                    continue;
                }
                if compatible(mesh, (f, i), (g, j)) {
                    region[g] = seed;
                    queue.push_back(g);
                }
            }
        }
    }

    region
}

/// Builds the merged polygon of a region from its border, or `None` when the
/// border is not one simple loop or the region hides a seam.
fn region_loop(
    mesh: &Mesh,
    uses: &EdgeUses,
    regions: &[usize],
    region: usize,
    faces: &[usize],
) -> Option<Face> {
    let mut next: HashMap<u32, (Corner, u32)> = HashMap::new();

    for &f in faces {
        let face = &mesh.faces()[f];
        for (i, (a, b)) in face.edges().enumerate() {
            let shared = &uses[&edge_key(a, b)];
            let interior = shared.len() == 2 && shared.iter().all(|&(g, _)| regions[g] == region);
            if interior {
                let other = if shared[0].0 == f { shared[1] } else { shared[0] };
                if !compatible(mesh, (f, i), other) {
                    return None;
                }
                continue;
            }
            if next.insert(a, (face.corners[i], b)).is_some() {
                return None;
            }
        }
    }

    let start = *next.keys().min()?;
    let mut corners = Vec::with_capacity(next.len());
    let mut current = start;
    loop {
        let &(corner, to) = next.get(&current)?;
        corners.push(corner);
        current = to;
        if current == start || corners.len() > next.len() {
            break;
        }
    }
    if current != start || corners.len() != next.len() || corners.len() < 3 {
        return None;
    }

    let seed = &mesh.faces()[region];
    Some(Face {
        corners,
        material: seed.material,
        smooth: seed.smooth,
    })
}

/// Removes polygon corners on straight border runs when no other face uses
/// the vertex and the UVs interpolate linearly through it.
fn dissolve_border_vertices(mesh: &mut Mesh, cos_limit: f64) {
    let mut use_count = vec![0usize; mesh.vertex_count()];
    for face in mesh.faces() {
        for v in face.vertex_ids() {
            use_count[v as usize] += 1;
        }
    }

    let positions = mesh.vertices().to_vec();
    for face in mesh.faces_mut() {
        let mut i = 0;
        while face.corners.len() > 3 && i < face.corners.len() {
            let n = face.corners.len();
            let prev = face.corners[(i + n - 1) % n];
            let corner = face.corners[i];
            let next = face.corners[(i + 1) % n];

            if use_count[corner.vertex as usize] == 1
                && straight(&positions, &prev, &corner, &next, cos_limit)
            {
                face.corners.remove(i);
                use_count[corner.vertex as usize] = 0;
            } else {
                i += 1;
            }
        }
    }
}

fn straight(positions: &[DVec3], prev: &Corner, corner: &Corner, next: &Corner, cos_limit: f64) -> bool {
    let p = positions[prev.vertex as usize];
    let c = positions[corner.vertex as usize];
    let n = positions[next.vertex as usize];

    let (Some(d0), Some(d1)) = ((c - p).try_normalize(), (n - c).try_normalize()) else {
        return false;
    };
    if d0.dot(d1) < cos_limit {
        return false;
    }

    let before = p.distance(c);
    let t = before / (before + c.distance(n));
    let expected = prev.lerp(next, t, corner.vertex);
    same_attributes(&expected, corner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    /// `n` x `n` grid of unit quads in the XY plane.
    fn grid(n: u32) -> Mesh {
        let mut mesh = Mesh::new();
        for y in 0..=n {
            for x in 0..=n {
                mesh.add_vertex(DVec3::new(x as f64, y as f64, 0.0));
            }
        }
        let id = |x: u32, y: u32| y * (n + 1) + x;
        for y in 0..n {
            for x in 0..n {
                let corners = [id(x, y), id(x + 1, y), id(x + 1, y + 1), id(x, y + 1)]
                    .map(Corner::new)
                    .to_vec();
                mesh.add_face(Face::new(corners, 0));
            }
        }
        mesh
    }

    #[test]
    fn test_dissolve_flat_grid_to_single_quad() {
        let mut mesh = grid(2);
        let removed = dissolve_planar(&mut mesh, 1e-3);
        assert_eq!(removed, 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.faces()[0].len(), 4);
        assert_eq!(mesh.vertex_count(), 4);
        assert!((mesh.surface_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_dissolve_stops_at_material_change() {
        let mut mesh = grid(2);
        mesh.faces_mut()[0].material = 1;
        mesh.faces_mut()[2].material = 1;
        dissolve_planar(&mut mesh, 1e-3);
        assert_eq!(mesh.face_count(), 2);
        assert!((mesh.surface_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_dissolve_respects_angle_limit() {
        let mut mesh = grid(2);
        // Lift the far row so the grid folds.
        for v in mesh.vertices_mut() {
            if v.y > 1.5 {
                v.z = 1.0;
            }
        }
        dissolve_planar(&mut mesh, 1e-3);
        assert_eq!(mesh.face_count(), 2);
    }

    #[test]
    fn test_dissolve_stops_at_uv_seam() {
        let mut mesh = grid(1);
        mesh.add_vertex(DVec3::new(2.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(2.0, 1.0, 0.0));
        let seam = DVec2::new(0.5, 0.5);
        mesh.add_face(Face::new(
            vec![
                Corner::with_uv(1, seam),
                Corner::new(4),
                Corner::new(5),
                Corner::with_uv(3, seam),
            ],
            0,
        ));
        assert_eq!(dissolve_planar(&mut mesh, 1e-3), 0);
    }
}
