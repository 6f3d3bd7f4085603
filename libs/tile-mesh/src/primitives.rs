//! # Primitives
//!
//! Mesh generation for flat test and demo geometry.

use glam::{DVec2, DVec3};

use crate::error::MeshError;
use crate::mesh::{Corner, Face, Mesh};

/// Creates a subdivided plane in the XY plane, centred at the origin.
///
/// # Arguments
///
/// * `size` - Extent along X and Y
/// * `subdivisions` - Number of quads along X and Y
///
/// Vertices are shared between neighbouring quads and UVs span `[0, 1]`
/// over the whole plane, so the result has no seams.
///
/// # Example
///
/// ```rust
/// use tile_mesh::primitives::create_grid;
/// use glam::DVec2;
///
/// let mesh = create_grid(DVec2::new(32.0, 16.0), (4, 2)).unwrap();
/// assert_eq!(mesh.vertex_count(), 15);
/// assert_eq!(mesh.face_count(), 8);
/// ```
pub fn create_grid(size: DVec2, subdivisions: (u32, u32)) -> Result<Mesh, MeshError> {
    let (nx, ny) = subdivisions;
    if size.x <= 0.0 || size.y <= 0.0 {
        return Err(MeshError::degenerate(format!("Grid size must be positive: {size:?}")));
    }
    if nx == 0 || ny == 0 {
        return Err(MeshError::degenerate(format!(
            "Grid needs at least one quad per axis: {subdivisions:?}"
        )));
    }

    let columns = nx + 1;
    let mut mesh = Mesh::with_capacity((columns * (ny + 1)) as usize, (nx * ny) as usize);
    let half = size * 0.5;
    let mut uvs = Vec::with_capacity((columns * (ny + 1)) as usize);
    for j in 0..=ny {
        for i in 0..=nx {
            let uv = DVec2::new(i as f64 / nx as f64, j as f64 / ny as f64);
            let p = uv * size - half;
            mesh.add_vertex(DVec3::new(p.x, p.y, 0.0));
            uvs.push(uv);
        }
    }

    for j in 0..ny {
        for i in 0..nx {
            let v0 = j * columns + i;
            let corners = [v0, v0 + 1, v0 + 1 + columns, v0 + columns]
                .into_iter()
                .map(|v| Corner::with_uv(v, uvs[v as usize]))
                .collect();
            mesh.add_face(Face::new(corners, 0));
        }
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_area_and_bounds() {
        let mesh = create_grid(DVec2::new(10.0, 4.0), (5, 2)).unwrap();
        assert!((mesh.surface_area() - 40.0).abs() < 1e-9);
        let (min, max) = mesh.bounding_box();
        assert_eq!(min, DVec3::new(-5.0, -2.0, 0.0));
        assert_eq!(max, DVec3::new(5.0, 2.0, 0.0));
        for face in mesh.faces() {
            assert!(mesh.face_normal(face).z > 0.0);
        }
        assert!(mesh.validate());
    }

    #[test]
    fn test_grid_rejects_degenerate_input() {
        assert!(create_grid(DVec2::new(0.0, 1.0), (1, 1)).is_err());
        assert!(create_grid(DVec2::ONE, (0, 1)).is_err());
    }
}
