//! # Spatial Index for Nearest-Surface Queries
//!
//! Uses spatial hashing for O(1) average-case triangle lookups.
//! Normal transfer asks, for every corner of the target mesh, which point of
//! the source surface is closest; this index keeps that query local.
//!
//! ## Example
//!
//! ```rust
//! use tile_mesh::{Mesh, SpatialIndex};
//! use glam::DVec3;
//!
//! let mut mesh = Mesh::new();
//! mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
//! mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
//! mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
//! mesh.add_triangle(0, 1, 2);
//!
//! let index = SpatialIndex::from_mesh(&mesh);
//! let hit = index.nearest(DVec3::new(0.2, 0.2, 3.0)).unwrap();
//! assert!((hit.distance - 3.0).abs() < 1e-12);
//! ```

use std::collections::HashMap;

use glam::DVec3;

use crate::mesh::Mesh;

/// Cell size multiplier for spatial hashing.
/// Larger values = fewer cells but more triangles per cell.
const CELL_SIZE_FACTOR: f64 = 2.0;

/// Minimum cell size to avoid too many cells.
const MIN_CELL_SIZE: f64 = 0.1;

/// 3D cell coordinate for spatial hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i32,
    y: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a cell coordinate from 3D position.
    fn from_position(pos: DVec3, cell_size: f64) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i32,
            y: (pos.y / cell_size).floor() as i32,
            z: (pos.z / cell_size).floor() as i32,
        }
    }
}

/// A triangle of the indexed mesh, remembering which face corners it came
/// from so per-corner attributes can be interpolated.
#[derive(Debug, Clone, Copy)]
pub struct IndexedTriangle {
    /// Source face index.
    pub face: usize,
    /// Corner indices within the source face.
    pub corners: [usize; 3],
    /// Vertex positions.
    pub points: [DVec3; 3],
}

/// Result of a nearest-surface query.
#[derive(Debug, Clone, Copy)]
pub struct NearestHit {
    /// Index into [`SpatialIndex::triangles`].
    pub triangle: usize,
    /// Closest point on the surface.
    pub point: DVec3,
    /// Barycentric weights of `point` for the triangle's three corners.
    pub barycentric: DVec3,
    /// Distance from the query point.
    pub distance: f64,
}

/// Spatial index for fast triangle queries.
///
/// Uses a hash grid to map 3D space to triangle lists.
#[derive(Debug)]
pub struct SpatialIndex {
    /// Hash grid: cell -> triangle indices
    grid: HashMap<CellCoord, Vec<usize>>,
    /// Cell size for hashing
    cell_size: f64,
    /// Mesh bounding box min
    bounds_min: DVec3,
    /// Mesh bounding box max
    bounds_max: DVec3,
    /// Fan-triangulated faces
    triangles: Vec<IndexedTriangle>,
}

impl SpatialIndex {
    /// Creates a spatial index from a mesh.
    ///
    /// Faces with more than three corners are fan-triangulated. The cell size
    /// is derived from the mesh extent and triangle count.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let (bounds_min, bounds_max) = mesh.bounding_box();

        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        for (fi, face) in mesh.faces().iter().enumerate() {
            for corners in face.fan() {
                let points = corners.map(|c| mesh.vertex(face.corners[c].vertex));
                triangles.push(IndexedTriangle {
                    face: fi,
                    corners,
                    points,
                });
            }
        }

        let extent = bounds_max - bounds_min;
        let avg_extent = (extent.x + extent.y + extent.z) / 3.0;
        let count = triangles.len().max(1) as f64;
        let cell_size = (avg_extent / count.cbrt() * CELL_SIZE_FACTOR).max(MIN_CELL_SIZE);

        let mut grid: HashMap<CellCoord, Vec<usize>> = HashMap::new();
        for (i, tri) in triangles.iter().enumerate() {
            let [v0, v1, v2] = tri.points;
            let cell_min = CellCoord::from_position(v0.min(v1).min(v2), cell_size);
            let cell_max = CellCoord::from_position(v0.max(v1).max(v2), cell_size);

            for cx in cell_min.x..=cell_max.x {
                for cy in cell_min.y..=cell_max.y {
                    for cz in cell_min.z..=cell_max.z {
                        grid.entry(CellCoord { x: cx, y: cy, z: cz })
                            .or_default()
                            .push(i);
                    }
                }
            }
        }

        Self {
            grid,
            cell_size,
            bounds_min,
            bounds_max,
            triangles,
        }
    }

    /// Indexed triangles.
    pub fn triangles(&self) -> &[IndexedTriangle] {
        &self.triangles
    }

    /// Queries triangles in an axis-aligned bounding box.
    ///
    /// Returns triangle indices that may intersect the box.
    pub fn query_box(&self, min: DVec3, max: DVec3) -> Vec<usize> {
        let min = min.max(self.bounds_min - DVec3::splat(self.cell_size));
        let max = max.min(self.bounds_max + DVec3::splat(self.cell_size));
        if min.cmpgt(max).any() {
            return Vec::new();
        }

        let cell_min = CellCoord::from_position(min, self.cell_size);
        let cell_max = CellCoord::from_position(max, self.cell_size);

        let mut result = Vec::new();
        let mut seen = vec![false; self.triangles.len()];

        for cx in cell_min.x..=cell_max.x {
            for cy in cell_min.y..=cell_max.y {
                for cz in cell_min.z..=cell_max.z {
                    let cell = CellCoord { x: cx, y: cy, z: cz };
                    if let Some(tris) = self.grid.get(&cell) {
                        for &tri_idx in tris {
                            if !seen[tri_idx] {
                                seen[tri_idx] = true;
                                result.push(tri_idx);
                            }
                        }
                    }
                }
            }
        }

        result
    }

    /// Finds the closest surface point to `point`.
    ///
    /// Grows the search box until a hit closer than the box half-size is
    /// found, which guarantees no unvisited triangle can be closer.
    pub fn nearest(&self, point: DVec3) -> Option<NearestHit> {
        if self.triangles.is_empty() {
            return None;
        }

        let reach = (point - self.bounds_min)
            .abs()
            .max((point - self.bounds_max).abs())
            .length();

        let mut radius = self.cell_size;
        loop {
            let candidates: Vec<usize> = if radius > reach {
                (0..self.triangles.len()).collect()
            } else {
                self.query_box(point - DVec3::splat(radius), point + DVec3::splat(radius))
            };

            let best = candidates
                .into_iter()
                .map(|i| self.hit(i, point))
                .min_by(|a, b| a.distance.total_cmp(&b.distance).then(a.triangle.cmp(&b.triangle)));

            match best {
                Some(hit) if hit.distance <= radius || radius > reach => return Some(hit),
                _ if radius > reach => return None,
                _ => radius *= 2.0,
            }
        }
    }

    fn hit(&self, triangle: usize, point: DVec3) -> NearestHit {
        let [a, b, c] = self.triangles[triangle].points;
        let barycentric = closest_point_barycentric(point, a, b, c);
        let closest = a * barycentric.x + b * barycentric.y + c * barycentric.z;
        NearestHit {
            triangle,
            point: closest,
            barycentric,
            distance: closest.distance(point),
        }
    }
}

/// Barycentric weights of the point on triangle `abc` closest to `p`.
///
/// Region-based method from Ericson, *Real-Time Collision Detection* 5.1.5.
pub fn closest_point_barycentric(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return DVec3::X;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return DVec3::Y;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return DVec3::new(1.0 - v, v, 0.0);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return DVec3::Z;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return DVec3::new(1.0 - w, 0.0, w);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return DVec3::new(0.0, 1.0 - w, w);
    }

    let denom = va + vb + vc;
    if denom.abs() < f64::MIN_POSITIVE {
        return DVec3::X;
    }
    let v = vb / denom;
    let w = vc / denom;
    DVec3::new(1.0 - v - w, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(n: u32) -> Mesh {
        let mut mesh = Mesh::new();
        for i in 0..=n {
            mesh.add_vertex(DVec3::new(i as f64, 0.0, 0.0));
            mesh.add_vertex(DVec3::new(i as f64, 1.0, 0.0));
        }
        for i in 0..n {
            let a = 2 * i;
            mesh.add_triangle(a, a + 2, a + 1);
            mesh.add_triangle(a + 2, a + 3, a + 1);
        }
        mesh
    }

    #[test]
    fn test_closest_point_inside() {
        let w = closest_point_barycentric(
            DVec3::new(0.25, 0.25, 1.0),
            DVec3::ZERO,
            DVec3::X,
            DVec3::Y,
        );
        assert!((w - DVec3::new(0.5, 0.25, 0.25)).length() < 1e-12);
    }

    #[test]
    fn test_closest_point_vertex_region() {
        let w = closest_point_barycentric(DVec3::new(-1.0, -1.0, 0.0), DVec3::ZERO, DVec3::X, DVec3::Y);
        assert_eq!(w, DVec3::X);
    }

    #[test]
    fn test_closest_point_edge_region() {
        let w = closest_point_barycentric(DVec3::new(0.5, -1.0, 0.0), DVec3::ZERO, DVec3::X, DVec3::Y);
        assert!((w - DVec3::new(0.5, 0.5, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let mesh = strip(20);
        let index = SpatialIndex::from_mesh(&mesh);
        for p in [
            DVec3::new(3.3, 0.4, 0.2),
            DVec3::new(19.9, 0.9, -2.0),
            DVec3::new(-5.0, 0.5, 0.0),
            DVec3::new(10.0, 30.0, 0.0),
        ] {
            let hit = index.nearest(p).unwrap();
            let brute = (0..index.triangles().len())
                .map(|i| index.hit(i, p).distance)
                .fold(f64::INFINITY, f64::min);
            assert!((hit.distance - brute).abs() < 1e-9);
        }
    }

    #[test]
    fn test_nearest_on_empty_mesh() {
        let index = SpatialIndex::from_mesh(&Mesh::new());
        assert!(index.nearest(DVec3::ZERO).is_none());
    }

    #[test]
    fn test_query_box_finds_local_triangles() {
        let mesh = strip(20);
        let index = SpatialIndex::from_mesh(&mesh);
        let found = index.query_box(DVec3::new(5.1, 0.1, -0.1), DVec3::new(5.2, 0.2, 0.1));
        assert!(!found.is_empty());
        assert!(found.len() < index.triangles().len());
    }
}
