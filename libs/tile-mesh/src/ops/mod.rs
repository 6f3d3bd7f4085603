//! # Mesh Operations
//!
//! Editing operations on [`Mesh`](crate::Mesh): plane cuts, edge splitting,
//! connectivity separation, triangulation and cleanup, decimation and normals.

pub mod beautify;
pub mod bisect;
pub mod collapse;
pub mod dissolve;
pub mod normals;
pub mod plane;
pub mod separate;
pub mod split;
pub mod triangulate;
pub mod weld;

pub use beautify::beautify_fill;
pub use bisect::bisect_plane;
pub use collapse::collapse_edges;
pub use dissolve::dissolve_planar;
pub use normals::{calc_split_normals, set_custom_normals_from_vertices, transfer_normals, transfer_normals_with, vertex_normals};
pub use plane::{Axis, Classification, Plane};
pub use separate::{extract_faces, separate_loose};
pub use split::split_edges;
pub use triangulate::{ear_clip, triangulate, triangulate_face};
pub use weld::remove_doubles;
