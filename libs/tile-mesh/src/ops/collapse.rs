//! # Edge Collapse Decimation
//!
//! Ratio-driven simplification using quadric error metrics. Edges are
//! collapsed cheapest first from a lazily invalidated priority queue until the
//! triangle count reaches the requested ratio.
//!
//! Vertices on open borders, material or shading borders and UV seams are
//! locked in place; an edge with one locked end collapses onto that end.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use std::ops::Add;

use config::constants::EPSILON;
use glam::DVec3;
use tracing::debug;

use super::triangulate::triangulate;
use crate::mesh::{edge_key, Corner, Face, Mesh};

/// Smallest allowed cosine between a face normal before and after a collapse.
const FLIP_COS_LIMIT: f64 = 0.2;

/// Symmetric 4x4 error quadric stored as its upper triangle.
#[derive(Debug, Clone, Copy, Default)]
struct Quadric([f64; 10]);

impl Quadric {
    /// Quadric of the plane `n·p + d = 0`, scaled by `weight`.
    fn from_plane(n: DVec3, d: f64, weight: f64) -> Self {
        let (a, b, c) = (n.x, n.y, n.z);
        Self([a * a, a * b, a * c, a * d, b * b, b * c, b * d, c * c, c * d, d * d].map(|x| x * weight))
    }

    fn error(&self, p: DVec3) -> f64 {
        let q = &self.0;
        let (x, y, z) = (p.x, p.y, p.z);
        q[0] * x * x
            + 2.0 * q[1] * x * y
            + 2.0 * q[2] * x * z
            + 2.0 * q[3] * x
            + q[4] * y * y
            + 2.0 * q[5] * y * z
            + 2.0 * q[6] * y
            + q[7] * z * z
            + 2.0 * q[8] * z
            + q[9]
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, other: Quadric) -> Quadric {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a += b;
        }
        self
    }
}

/// A queued collapse of `remove` into `keep`.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    keep: u32,
    remove: u32,
    stamp: (u32, u32),
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Reversed so the max-heap pops the cheapest edge first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| (other.keep, other.remove).cmp(&(self.keep, self.remove)))
    }
}

/// Resolved collapse: where the kept vertex moves and how far its corner
/// attributes blend towards the removed one.
#[derive(Debug, Clone, Copy)]
struct Plan {
    keep: u32,
    remove: u32,
    position: DVec3,
    t: f64,
    cost: f64,
}

struct Collapser {
    positions: Vec<DVec3>,
    faces: Vec<Face>,
    alive: Vec<bool>,
    alive_count: usize,
    vertex_faces: Vec<Vec<usize>>,
    quadrics: Vec<Quadric>,
    locked: Vec<bool>,
    removed: Vec<bool>,
    version: Vec<u32>,
}

impl Collapser {
    fn new(mesh: &mut Mesh) -> Self {
        let positions = mesh.vertices().to_vec();
        let faces = std::mem::take(mesh.faces_mut());
        let n = positions.len();

        let mut vertex_faces = vec![Vec::new(); n];
        let mut quadrics = vec![Quadric::default(); n];
        for (fi, face) in faces.iter().enumerate() {
            let [a, b, c] = corner_positions(&positions, face);
            let raw = (b - a).cross(c - a);
            let area = raw.length() * 0.5;
            let normal = raw.normalize_or_zero();
            let plane = Quadric::from_plane(normal, -normal.dot(a), area);
            for v in face.vertex_ids() {
                vertex_faces[v as usize].push(fi);
                quadrics[v as usize] = quadrics[v as usize] + plane;
            }
        }

        let locked = locked_vertices(n, &faces);
        let alive_count = faces.len();
        Self {
            positions,
            alive: vec![true; faces.len()],
            alive_count,
            faces,
            vertex_faces,
            quadrics,
            locked,
            removed: vec![false; n],
            version: vec![0; n],
        }
    }

    fn plan(&self, a: u32, b: u32) -> Option<Plan> {
        let (la, lb) = (self.locked[a as usize], self.locked[b as usize]);
        let (keep, remove) = match (la, lb) {
            (true, true) => return None,
            (false, true) => (b, a),
            _ => (a, b),
        };

        let q = self.quadrics[keep as usize] + self.quadrics[remove as usize];
        let pk = self.positions[keep as usize];
        let pr = self.positions[remove as usize];
        let options: &[f64] = if la || lb { &[0.0] } else { &[0.0, 0.5, 1.0] };

        let mut best: Option<Plan> = None;
        for &t in options {
            let position = pk.lerp(pr, t);
            let cost = q.error(position);
            if best.map_or(true, |b| cost < b.cost) {
                best = Some(Plan {
                    keep,
                    remove,
                    position,
                    t,
                    cost,
                });
            }
        }
        best
    }

    fn push(&self, heap: &mut BinaryHeap<Candidate>, a: u32, b: u32) {
        if a == b || self.removed[a as usize] || self.removed[b as usize] {
            return;
        }
        if let Some(plan) = self.plan(a, b) {
            heap.push(Candidate {
                cost: plan.cost,
                keep: plan.keep,
                remove: plan.remove,
                stamp: (self.version[plan.keep as usize], self.version[plan.remove as usize]),
            });
        }
    }

    fn is_stale(&self, c: &Candidate) -> bool {
        self.removed[c.keep as usize]
            || self.removed[c.remove as usize]
            || c.stamp != (self.version[c.keep as usize], self.version[c.remove as usize])
    }

    fn live_faces(&self, v: u32) -> impl Iterator<Item = usize> + '_ {
        self.vertex_faces[v as usize].iter().copied().filter(|&f| self.alive[f])
    }

    fn neighbours(&self, v: u32) -> BTreeSet<u32> {
        self.live_faces(v)
            .flat_map(|f| self.faces[f].vertex_ids().collect::<Vec<_>>())
            .filter(|&n| n != v)
            .collect()
    }

    /// Checks the link condition and normal flips, then applies the plan.
    fn try_collapse(&mut self, plan: Plan) -> bool {
        let Plan {
            keep,
            remove,
            position,
            t,
            ..
        } = plan;

        let shared: Vec<usize> = self
            .live_faces(keep)
            .filter(|&f| self.faces[f].vertex_ids().any(|v| v == remove))
            .collect();
        if shared.is_empty() {
            return false;
        }

        // Link condition: common neighbours are exactly the apexes of the
        // faces on the collapsing edge.
        let common: BTreeSet<u32> = self
            .neighbours(keep)
            .intersection(&self.neighbours(remove))
            .copied()
            .collect();
        let apexes: BTreeSet<u32> = shared
            .iter()
            .flat_map(|&f| self.faces[f].vertex_ids().collect::<Vec<_>>())
            .filter(|&v| v != keep && v != remove)
            .collect();
        if common != apexes {
            return false;
        }

        let moved = |v: u32| v == keep || v == remove;
        let touched: BTreeSet<usize> = self.live_faces(keep).chain(self.live_faces(remove)).collect();
        for &f in &touched {
            if shared.contains(&f) {
                continue;
            }
            let before = corner_positions(&self.positions, &self.faces[f]);
            let after = self.faces[f]
                .vertex_ids()
                .map(|v| if moved(v) { position } else { self.positions[v as usize] })
                .collect::<Vec<_>>();
            let n0 = (before[1] - before[0]).cross(before[2] - before[0]);
            let n1 = (after[1] - after[0]).cross(after[2] - after[0]);
            if n1.length() < EPSILON || n0.normalize_or_zero().dot(n1.normalize_or_zero()) < FLIP_COS_LIMIT {
                return false;
            }
        }

        let edge_face = &self.faces[shared[0]];
        let keep_corner = corner_of(edge_face, keep);
        let remove_corner = corner_of(edge_face, remove);
        let (Some(keep_corner), Some(remove_corner)) = (keep_corner, remove_corner) else {
            return false;
        };
        let blended = keep_corner.lerp(&remove_corner, t, keep);
        let keep_free = !self.locked[keep as usize];

        for &f in &shared {
            self.alive[f] = false;
            self.alive_count -= 1;
        }
        for &f in &touched {
            if !self.alive[f] {
                continue;
            }
            for corner in &mut self.faces[f].corners {
                if corner.vertex == remove || (corner.vertex == keep && keep_free) {
                    corner.vertex = keep;
                    corner.uv = blended.uv;
                    corner.normal = blended.normal;
                }
            }
        }

        let mut faces: Vec<usize> = touched.into_iter().filter(|&f| self.alive[f]).collect();
        faces.sort_unstable();
        self.vertex_faces[keep as usize] = faces;
        self.vertex_faces[remove as usize].clear();
        self.positions[keep as usize] = position;
        self.quadrics[keep as usize] = self.quadrics[keep as usize] + self.quadrics[remove as usize];
        self.removed[remove as usize] = true;
        self.version[keep as usize] += 1;
        true
    }

    fn finish(self, mesh: &mut Mesh) {
        let faces = self
            .faces
            .into_iter()
            .zip(self.alive)
            .filter_map(|(face, alive)| alive.then_some(face))
            .collect();
        mesh.vertices_mut().copy_from_slice(&self.positions);
        mesh.set_faces(faces);
        mesh.compact();
    }
}

fn corner_positions(positions: &[DVec3], face: &Face) -> [DVec3; 3] {
    [0, 1, 2].map(|i| positions[face.corners[i].vertex as usize])
}

fn corner_of(face: &Face, vertex: u32) -> Option<Corner> {
    face.corners.iter().copied().find(|c| c.vertex == vertex)
}

/// Vertices on open or non-manifold edges, attribute seams, material or
/// shading borders.
fn locked_vertices(vertex_count: usize, faces: &[Face]) -> Vec<bool> {
    let mut locked = vec![false; vertex_count];
    let mut first: Vec<Option<(Corner, u16, bool)>> = vec![None; vertex_count];
    let mut edge_count: std::collections::HashMap<(u32, u32), usize> = Default::default();

    for face in faces {
        for (a, b) in face.edges() {
            *edge_count.entry(edge_key(a, b)).or_default() += 1;
        }
        for corner in &face.corners {
            let v = corner.vertex as usize;
            match first[v] {
                None => first[v] = Some((*corner, face.material, face.smooth)),
                Some((seen, material, smooth)) => {
                    if material != face.material
                        || smooth != face.smooth
                        || seen.uv.distance_squared(corner.uv) > EPSILON
                        || seen.normal.distance_squared(corner.normal) > EPSILON
                    {
                        locked[v] = true;
                    }
                }
            }
        }
    }

    for ((a, b), count) in edge_count {
        if count != 2 {
            locked[a as usize] = true;
            locked[b as usize] = true;
        }
    }
    locked
}

/// Collapses edges until the triangle count is at most `ratio` of the input.
///
/// The mesh is triangulated first. A ratio of 1.0 or more leaves the mesh
/// untouched. Returns the number of triangles removed.
pub fn collapse_edges(mesh: &mut Mesh, ratio: f64) -> usize {
    if ratio >= 1.0 || mesh.is_empty() {
        return 0;
    }
    triangulate(mesh);

    let before = mesh.face_count();
    let target = (before as f64 * ratio.max(0.0)).ceil() as usize;
    let mut collapser = Collapser::new(mesh);

    let mut heap = BinaryHeap::new();
    let mut edges: Vec<(u32, u32)> = collapser
        .faces
        .iter()
        .flat_map(|f| f.edges().map(|(a, b)| edge_key(a, b)).collect::<Vec<_>>())
        .collect();
    edges.sort_unstable();
    edges.dedup();
    for (a, b) in edges {
        collapser.push(&mut heap, a, b);
    }

    let mut collapses = 0;
    while collapser.alive_count > target {
        let Some(candidate) = heap.pop() else {
            break;
        };
        if collapser.is_stale(&candidate) {
            continue;
        }
        let Some(plan) = collapser.plan(candidate.keep, candidate.remove) else {
            continue;
        };
        if !collapser.try_collapse(plan) {
            continue;
        }
        collapses += 1;
        for n in collapser.neighbours(plan.keep) {
            collapser.push(&mut heap, plan.keep, n);
        }
    }

    debug!(collapses, before, target, after = collapser.alive_count, "edge collapse finished");
    collapser.finish(mesh);
    before - mesh.face_count()
}

#[cfg(test)]
mod tests {
    use super::*;

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
                mesh.add_triangle(id(x, y), id(x + 1, y), id(x + 1, y + 1));
                mesh.add_triangle(id(x, y), id(x + 1, y + 1), id(x, y + 1));
            }
        }
        mesh
    }

    #[test]
    fn test_collapse_reduces_flat_grid() {
        let mut mesh = grid(4);
        let removed = collapse_edges(&mut mesh, 0.5);
        assert!(removed > 0);
        assert!(mesh.face_count() >= 16);
        assert!((mesh.surface_area() - 16.0).abs() < 1e-9);
        assert!(mesh.validate());
    }

    #[test]
    fn test_collapse_keeps_border() {
        let mut mesh = grid(4);
        collapse_edges(&mut mesh, 0.1);
        let (min, max) = mesh.bounding_box();
        assert_eq!(min, DVec3::ZERO);
        assert_eq!(max, DVec3::new(4.0, 4.0, 0.0));
        for face in mesh.faces() {
            assert!(mesh.face_normal(face).z > 0.0);
        }
    }

    #[test]
    fn test_collapse_ratio_one_is_noop() {
        let mut mesh = grid(2);
        assert_eq!(collapse_edges(&mut mesh, 1.0), 0);
        assert_eq!(mesh.face_count(), 8);
    }

    #[test]
    fn test_quadric_error_is_zero_on_plane() {
        let q = Quadric::from_plane(DVec3::Z, 0.0, 1.0);
        assert_eq!(q.error(DVec3::new(3.0, -2.0, 0.0)), 0.0);
        assert!((q.error(DVec3::new(0.0, 0.0, 2.0)) - 4.0).abs() < 1e-12);
    }
}
