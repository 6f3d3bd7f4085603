//! # Remove Doubles
//!
//! Welds vertices closer than a merge distance, using a spatial hash so the
//! lookup stays linear in the vertex count.

use std::collections::HashMap;

use config::constants::EPSILON;
use glam::DVec3;

use crate::mesh::{Corner, Face, Mesh};

/// 3D cell coordinate for spatial hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i64,
    y: i64,
    z: i64,
}

impl CellCoord {
    fn from_position(pos: DVec3, cell_size: f64) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i64,
            y: (pos.y / cell_size).floor() as i64,
            z: (pos.z / cell_size).floor() as i64,
        }
    }
}

/// Merges vertices within `distance` of an earlier vertex.
///
/// Faces collapsing below three distinct corners are removed, unused
/// vertices are compacted away. Returns the number of vertices removed.
pub fn remove_doubles(mesh: &mut Mesh, distance: f64) -> usize {
    let before = mesh.vertex_count();
    let cell_size = distance.max(EPSILON);
    let limit = distance * distance;

    let mut grid: HashMap<CellCoord, Vec<u32>> = HashMap::new();
    let mut remap: Vec<u32> = Vec::with_capacity(before);

    for (i, &p) in mesh.vertices().iter().enumerate() {
        let cell = CellCoord::from_position(p, cell_size);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = CellCoord {
                        x: cell.x + dx,
                        y: cell.y + dy,
                        z: cell.z + dz,
                    };
                    if let Some(reps) = grid.get(&key) {
                        for &r in reps {
                            if mesh.vertex(r).distance_squared(p) <= limit {
                                found = Some(r);
                                break 'search;
                            }
                        }
                    }
                }
            }
        }

        match found {
            Some(r) => remap.push(r),
            None => {
                grid.entry(cell).or_default().push(i as u32);
                remap.push(i as u32);
            }
        }
    }

    let faces: Vec<Face> = mesh
        .faces()
        .iter()
        .filter_map(|face| {
            let mut corners: Vec<Corner> = Vec::with_capacity(face.len());
            for corner in &face.corners {
                let mut corner = *corner;
                corner.vertex = remap[corner.vertex as usize];
                if corners.last().map(|c| c.vertex) != Some(corner.vertex) {
                    corners.push(corner);
                }
            }
            while corners.len() > 1 && corners[0].vertex == corners[corners.len() - 1].vertex {
                corners.pop();
            }
            (corners.len() >= 3).then(|| Face {
                corners,
                material: face.material,
                smooth: face.smooth,
            })
        })
        .collect();

    mesh.set_faces(faces);
    mesh.compact();
    before - mesh.vertex_count()
}
