//! # Plane Bisection
//!
//! Cuts mesh faces by an infinite plane. Faces spanning the plane are split
//! into a front and a back polygon; edges crossing the plane receive a new
//! vertex that adjacent faces share, so the mesh stays connected until the
//! cut edges are split with [`split_edges`](super::split::split_edges).
//!
//! ## Example
//!
//! ```rust
//! use tile_mesh::ops::{bisect_plane, split_edges, Axis, Plane};
//! use tile_mesh::Mesh;
//! use glam::DVec3;
//!
//! let mut mesh = Mesh::new();
//! mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
//! mesh.add_vertex(DVec3::new(2.0, 0.0, 0.0));
//! mesh.add_vertex(DVec3::new(0.0, 2.0, 0.0));
//! mesh.add_triangle(0, 1, 2);
//!
//! let cut = bisect_plane(&mut mesh, &Plane::axis_aligned(Axis::X, 1.0)).unwrap();
//! split_edges(&mut mesh, &cut);
//! assert_eq!(mesh.face_count(), 2);
//! ```

use std::collections::{HashMap, HashSet};

use super::plane::Plane;
use super::triangulate::triangulate_face;
use crate::error::MeshError;
use crate::mesh::{edge_key, Corner, Face, Mesh};

/// Bisects `mesh` by `plane`.
///
/// Returns the edges lying on the plane after the cut (new cut edges as well
/// as pre-existing edges that were already on the plane).
///
/// # Errors
///
/// [`MeshError::BisectMissed`] when no geometry lies strictly on both sides
/// of the plane. The mesh is left untouched in that case.
pub fn bisect_plane(mesh: &mut Mesh, plane: &Plane) -> Result<Vec<[u32; 2]>, MeshError> {
    if mesh.is_empty() {
        return Err(MeshError::BisectMissed);
    }

    let side: Vec<i8> = mesh
        .vertices()
        .iter()
        .map(|&p| plane.classify_point(p).sign())
        .collect();

    let used = mesh.faces().iter().flat_map(Face::vertex_ids);
    let (mut front, mut back) = (false, false);
    for v in used {
        match side[v as usize] {
            1 => front = true,
            -1 => back = true,
            _ => {}
        }
    }
    if !(front && back) {
        return Err(MeshError::BisectMissed);
    }

    // Non-convex faces may cross the plane more than twice; triangulate those
    // first so every split yields exactly two polygons.
    let mut faces = Vec::with_capacity(mesh.face_count());
    for face in mesh.faces() {
        if face.len() > 3 && crossings(face, &side) > 2 {
            faces.extend(triangulate_face(mesh, face));
        } else {
            faces.push(face.clone());
        }
    }

    let mut distances: Vec<f64> = mesh
        .vertices()
        .iter()
        .map(|&p| plane.signed_distance(p))
        .collect();
    let mut side = side;
    let mut crossing_vertices: HashMap<(u32, u32), u32> = HashMap::new();
    let mut cut_edges: HashSet<(u32, u32)> = HashSet::new();
    let mut result = Vec::with_capacity(faces.len() + 8);

    for face in faces {
        let n = face.len();
        let spans = face.vertex_ids().any(|v| side[v as usize] > 0)
            && face.vertex_ids().any(|v| side[v as usize] < 0);

        if !spans {
            // Record edges that already lie on the plane.
            for (a, b) in face.edges() {
                if side[a as usize] == 0 && side[b as usize] == 0 {
                    cut_edges.insert(edge_key(a, b));
                }
            }
            result.push(face);
            continue;
        }

        // Walk the loop, inserting a corner wherever an edge crosses.
        let mut ring: Vec<Corner> = Vec::with_capacity(n + 2);
        for i in 0..n {
            let ci = face.corners[i];
            let cj = face.corners[(i + 1) % n];
            ring.push(ci);

            let (si, sj) = (side[ci.vertex as usize], side[cj.vertex as usize]);
            if si * sj < 0 {
                let di = distances[ci.vertex as usize];
                let dj = distances[cj.vertex as usize];
                let t = di / (di - dj);
                let key = edge_key(ci.vertex, cj.vertex);
                let vertex = match crossing_vertices.get(&key) {
                    Some(&v) => v,
                    None => {
                        let p = mesh.vertex(ci.vertex).lerp(mesh.vertex(cj.vertex), t);
                        let v = mesh.add_vertex(p);
                        side.push(0);
                        distances.push(0.0);
                        crossing_vertices.insert(key, v);
                        v
                    }
                };
                ring.push(ci.lerp(&cj, t, vertex));
            }
        }

        let mut front_corners = Vec::new();
        let mut back_corners = Vec::new();
        let mut on_plane = Vec::new();
        for corner in &ring {
            match side[corner.vertex as usize] {
                1 => front_corners.push(*corner),
                -1 => back_corners.push(*corner),
                _ => {
                    front_corners.push(*corner);
                    back_corners.push(*corner);
                    on_plane.push(corner.vertex);
                }
            }
        }

        if on_plane.len() == 2 {
            cut_edges.insert(edge_key(on_plane[0], on_plane[1]));
        }

        for corners in [front_corners, back_corners] {
            if corners.len() >= 3 {
                result.push(Face {
                    corners,
                    material: face.material,
                    smooth: face.smooth,
                });
            }
        }
    }

    mesh.set_faces(result);

    let mut edges: Vec<[u32; 2]> = cut_edges.into_iter().map(|(a, b)| [a, b]).collect();
    edges.sort_unstable();
    Ok(edges)
}

/// Number of sign changes around a face loop, ignoring on-plane corners.
fn crossings(face: &Face, side: &[i8]) -> usize {
    let signs: Vec<i8> = face
        .vertex_ids()
        .map(|v| side[v as usize])
        .filter(|&s| s != 0)
        .collect();
    let n = signs.len();
    (0..n).filter(|&i| signs[i] != signs[(i + 1) % n]).count()
}
