//! # Edge Splitting
//!
//! Disconnects faces across a set of edges by duplicating the vertices on
//! those edges, once per fan of faces that stays connected around the vertex
//! through edges that are not being split.

use std::collections::{HashMap, HashSet};

use crate::mesh::{edge_key, Mesh};

/// Splits the mesh along `edges`.
///
/// Returns the number of vertices added.
pub fn split_edges(mesh: &mut Mesh, edges: &[[u32; 2]]) -> usize {
    if edges.is_empty() {
        return 0;
    }

    let split: HashSet<(u32, u32)> = edges.iter().map(|&[a, b]| edge_key(a, b)).collect();
    let mut touched: Vec<u32> = edges.iter().flat_map(|e| e.iter().copied()).collect();
    touched.sort_unstable();
    touched.dedup();

    // vertex -> [(face, corner)]
    let mut incident: HashMap<u32, Vec<(usize, usize)>> = HashMap::new();
    let touched_set: HashSet<u32> = touched.iter().copied().collect();
    for (fi, face) in mesh.faces().iter().enumerate() {
        for (ci, corner) in face.corners.iter().enumerate() {
            if touched_set.contains(&corner.vertex) {
                incident.entry(corner.vertex).or_default().push((fi, ci));
            }
        }
    }

    let mut added = 0;
    for v in touched {
        let Some(uses) = incident.get(&v) else {
            continue;
        };
        if uses.len() < 2 {
            continue;
        }

        // Union faces that share a non-split edge at v.
        let mut parent: Vec<usize> = (0..uses.len()).collect();
        let mut by_edge: HashMap<(u32, u32), usize> = HashMap::new();
        for (k, &(fi, ci)) in uses.iter().enumerate() {
            let face = &mesh.faces()[fi];
            let n = face.len();
            let prev = face.corners[(ci + n - 1) % n].vertex;
            let next = face.corners[(ci + 1) % n].vertex;
            for w in [prev, next] {
                let key = edge_key(v, w);
                if split.contains(&key) {
                    continue;
                }
                match by_edge.get(&key) {
                    Some(&other) => union(&mut parent, k, other),
                    None => {
                        by_edge.insert(key, k);
                    }
                }
            }
        }

        // First fan keeps the original vertex; later fans get copies.
        let mut fan_vertex: HashMap<usize, u32> = HashMap::new();
        for k in 0..uses.len() {
            let root = find(&mut parent, k);
            let vertex = match fan_vertex.get(&root) {
                Some(&vertex) => vertex,
                None => {
                    let vertex = if fan_vertex.is_empty() {
                        v
                    } else {
                        added += 1;
                        mesh.duplicate_vertex(v)
                    };
                    fan_vertex.insert(root, vertex);
                    vertex
                }
            };
            let (fi, ci) = uses[k];
            mesh.faces_mut()[fi].corners[ci].vertex = vertex;
        }
    }

    added
}

pub(crate) fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

pub(crate) fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::separate::separate_loose;
    use glam::DVec3;

    /// Two triangles sharing the diagonal 1-2 of a unit square.
    fn square() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, 1.0, 0.0));
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(1, 3, 2);
        mesh
    }

    #[test]
    fn test_split_shared_edge_disconnects() {
        let mut mesh = square();
        assert_eq!(separate_loose(&mesh).len(), 1);

        let added = split_edges(&mut mesh, &[[1, 2]]);
        assert_eq!(added, 2);
        assert_eq!(separate_loose(&mesh).len(), 2);
    }

    #[test]
    fn test_split_boundary_edge_is_noop() {
        let mut mesh = square();
        assert_eq!(split_edges(&mut mesh, &[[0, 1]]), 0);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_split_keeps_fan_connected_through_other_edges() {
        // Three triangles around vertex 0; splitting one spoke keeps the
        // remaining two faces joined around it.
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::ZERO);
        mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        mesh.add_vertex(DVec3::new(-1.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, -1.0, 0.0));
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        mesh.add_triangle(0, 3, 4);

        let added = split_edges(&mut mesh, &[[0, 2]]);
        assert_eq!(added, 2);
        assert_eq!(separate_loose(&mesh).len(), 2);
    }
}
