//! # Tile Mesh
//!
//! Polygon mesh toolkit for cutting large meshes into grid tiles.
//!
//! ## Model
//!
//! A [`Mesh`] is a vertex list plus polygon faces. Each face corner carries
//! its own UV and split normal so seams and hard edges survive editing, and
//! each face refers to a named material slot.
//!
//! ## Operations
//!
//! - **Cutting**: [`ops::bisect_plane`], [`ops::split_edges`]
//! - **Connectivity**: [`ops::separate_loose`]
//! - **Cleanup**: [`ops::triangulate`], [`ops::beautify_fill`], [`ops::remove_doubles`]
//! - **Decimation**: [`ops::dissolve_planar`], [`ops::collapse_edges`]
//! - **Normals**: [`ops::calc_split_normals`], [`ops::transfer_normals`]
//! - **Primitives**: [`primitives::create_grid`]
//!
//! ## Usage
//!
//! ```rust
//! use tile_mesh::ops::{bisect_plane, separate_loose, split_edges, Axis, Plane};
//! use tile_mesh::Mesh;
//! use glam::DVec3;
//!
//! let mut mesh = Mesh::new();
//! mesh.add_vertex(DVec3::new(-1.0, 0.0, 0.0));
//! mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
//! mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
//! mesh.add_triangle(0, 1, 2);
//!
//! let cut = bisect_plane(&mut mesh, &Plane::axis_aligned(Axis::X, 0.0)).unwrap();
//! split_edges(&mut mesh, &cut);
//! assert_eq!(separate_loose(&mesh).len(), 2);
//! ```

pub mod error;
pub mod io;
pub mod mesh;
pub mod ops;
pub mod primitives;
pub mod spatial_index;

pub use error::MeshError;
pub use mesh::{Corner, Face, Mesh};
pub use spatial_index::SpatialIndex;
