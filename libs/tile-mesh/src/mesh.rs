//! # Mesh Data Structure
//!
//! Polygon mesh with shared vertex positions, per-corner attributes
//! (UV and split normal) and named material slots.

use config::constants::EPSILON;
use glam::{DAffine3, DVec2, DVec3};

/// Undirected edge key with the smaller vertex index first.
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

// =============================================================================
// CORNER
// =============================================================================

/// One corner (loop) of a face: a vertex reference plus the attributes that
/// may differ between faces sharing the vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Index into the mesh vertex list.
    pub vertex: u32,
    /// Texture coordinate.
    pub uv: DVec2,
    /// Split normal.
    pub normal: DVec3,
}

impl Corner {
    /// Creates a corner with zero UV and normal.
    pub fn new(vertex: u32) -> Self {
        Self {
            vertex,
            uv: DVec2::ZERO,
            normal: DVec3::ZERO,
        }
    }

    /// Creates a corner with a texture coordinate.
    pub fn with_uv(vertex: u32, uv: DVec2) -> Self {
        Self {
            vertex,
            uv,
            normal: DVec3::ZERO,
        }
    }

    /// Interpolates the attributes of two corners onto a new vertex.
    pub fn lerp(&self, other: &Corner, t: f64, vertex: u32) -> Corner {
        Corner {
            vertex,
            uv: self.uv.lerp(other.uv, t),
            normal: self.normal.lerp(other.normal, t),
        }
    }
}

// =============================================================================
// FACE
// =============================================================================

/// A polygon with three or more corners in counter-clockwise order.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Corners in winding order.
    pub corners: Vec<Corner>,
    /// Material slot index.
    pub material: u16,
    /// Whether the face is shaded smooth.
    pub smooth: bool,
}

impl Face {
    /// Creates a flat-shaded face.
    pub fn new(corners: Vec<Corner>, material: u16) -> Self {
        Self {
            corners,
            material,
            smooth: false,
        }
    }

    /// Number of corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    /// Returns true if the face has no corners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Iterates the vertex indices of the face.
    pub fn vertex_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.corners.iter().map(|c| c.vertex)
    }

    /// Iterates directed edges `(from, to)` in winding order.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let n = self.corners.len();
        (0..n).map(move |i| (self.corners[i].vertex, self.corners[(i + 1) % n].vertex))
    }

    /// Number of triangles the face is worth in a fan triangulation.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.corners.len().saturating_sub(2)
    }

    /// Corner index triples of a fan triangulation.
    ///
    /// Quads expand to `(0, 1, 2), (2, 3, 0)`, the order the engine loader
    /// expects.
    pub fn fan(&self) -> Vec<[usize; 3]> {
        match self.corners.len() {
            0..=2 => Vec::new(),
            3 => vec![[0, 1, 2]],
            4 => vec![[0, 1, 2], [2, 3, 0]],
            n => (1..n - 1).map(|i| [0, i, i + 1]).collect(),
        }
    }
}

// =============================================================================
// MESH
// =============================================================================

/// A polygon mesh.
///
/// # Example
///
/// ```rust
/// use tile_mesh::Mesh;
/// use glam::DVec3;
///
/// let mut mesh = Mesh::new();
/// mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
/// mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
/// mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
/// mesh.add_triangle(0, 1, 2);
/// assert_eq!(mesh.triangle_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions
    vertices: Vec<DVec3>,
    /// Polygons
    faces: Vec<Face>,
    /// Material slot names
    materials: Vec<String>,
    /// Corner normals are authored rather than derived
    custom_normals: bool,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            materials: Vec::new(),
            custom_normals: false,
        }
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns the number of triangles after fan triangulation.
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(Face::triangle_count).sum()
    }

    /// Returns true if the mesh has no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Adds a vertex and returns its index.
    pub fn add_vertex(&mut self, position: DVec3) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position);
        index
    }

    /// Adds a face.
    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    /// Adds a flat triangle in material slot 0.
    pub fn add_triangle(&mut self, v0: u32, v1: u32, v2: u32) {
        self.faces.push(Face::new(
            vec![Corner::new(v0), Corner::new(v1), Corner::new(v2)],
            0,
        ));
    }

    /// Returns a reference to the vertices.
    #[inline]
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Returns a mutable reference to the vertices.
    #[inline]
    pub fn vertices_mut(&mut self) -> &mut [DVec3] {
        &mut self.vertices
    }

    /// Returns the vertex at the given index.
    #[inline]
    pub fn vertex(&self, index: u32) -> DVec3 {
        self.vertices[index as usize]
    }

    /// Returns a reference to the faces.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Returns a mutable reference to the faces.
    #[inline]
    pub fn faces_mut(&mut self) -> &mut Vec<Face> {
        &mut self.faces
    }

    /// Replaces all faces.
    pub fn set_faces(&mut self, faces: Vec<Face>) {
        self.faces = faces;
    }

    /// Returns the material slot names.
    #[inline]
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Returns the slot index of a material, appending a slot if needed.
    pub fn material_slot(&mut self, name: &str) -> u16 {
        if let Some(i) = self.materials.iter().position(|m| m == name) {
            return i as u16;
        }
        self.materials.push(name.to_string());
        (self.materials.len() - 1) as u16
    }

    /// Returns the material name of a slot.
    pub fn material_name(&self, slot: u16) -> Option<&str> {
        self.materials.get(slot as usize).map(String::as_str)
    }

    /// Returns true if corner normals are authored.
    #[inline]
    pub fn has_custom_normals(&self) -> bool {
        self.custom_normals
    }

    /// Marks corner normals as authored (or derived).
    pub fn set_custom_normals(&mut self, custom: bool) {
        self.custom_normals = custom;
    }

    /// Appends a vertex copy and returns the new index.
    pub(crate) fn duplicate_vertex(&mut self, index: u32) -> u32 {
        let position = self.vertices[index as usize];
        self.add_vertex(position)
    }

    /// Unnormalized face normal using Newell's method.
    ///
    /// Robust for non-planar and concave polygons; its length is twice the
    /// polygon area.
    pub fn face_normal_raw(&self, face: &Face) -> DVec3 {
        let mut normal = DVec3::ZERO;
        let n = face.corners.len();
        for i in 0..n {
            let a = self.vertex(face.corners[i].vertex);
            let b = self.vertex(face.corners[(i + 1) % n].vertex);
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal
    }

    /// Unit face normal, or zero for degenerate faces.
    pub fn face_normal(&self, face: &Face) -> DVec3 {
        self.face_normal_raw(face).normalize_or_zero()
    }

    /// Area of a face.
    pub fn face_area(&self, face: &Face) -> f64 {
        self.face_normal_raw(face).length() * 0.5
    }

    /// Mean of the corner positions of a face.
    pub fn face_center(&self, face: &Face) -> DVec3 {
        if face.corners.is_empty() {
            return DVec3::ZERO;
        }
        let sum: DVec3 = face.vertex_ids().map(|v| self.vertex(v)).sum();
        sum / face.corners.len() as f64
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.faces.iter().map(|f| self.face_area(f)).sum()
    }

    /// Computes the axis-aligned bounding box of referenced vertices.
    ///
    /// Returns (min, max) corners of the bounding box.
    pub fn bounding_box(&self) -> (DVec3, DVec3) {
        let mut used = self.faces.iter().flat_map(Face::vertex_ids);
        let Some(first) = used.next() else {
            return (DVec3::ZERO, DVec3::ZERO);
        };

        let mut min = self.vertex(first);
        let mut max = min;
        for v in used {
            let p = self.vertex(v);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Extent of the bounding box.
    pub fn dimensions(&self) -> DVec3 {
        let (min, max) = self.bounding_box();
        max - min
    }

    /// Centre of the bounding box.
    pub fn bounds_center(&self) -> DVec3 {
        let (min, max) = self.bounding_box();
        (min + max) * 0.5
    }

    /// Mean of the vertices referenced by faces, each counted once.
    pub fn median_center(&self) -> DVec3 {
        let mut seen = vec![false; self.vertices.len()];
        let mut sum = DVec3::ZERO;
        let mut count = 0usize;
        for v in self.faces.iter().flat_map(Face::vertex_ids) {
            if !std::mem::replace(&mut seen[v as usize], true) {
                sum += self.vertex(v);
                count += 1;
            }
        }
        if count == 0 {
            DVec3::ZERO
        } else {
            sum / count as f64
        }
    }

    /// Transforms all vertices by an affine matrix.
    ///
    /// Corner normals use the inverse transpose; windings are reversed when
    /// the transform mirrors.
    pub fn transform(&mut self, matrix: &DAffine3) {
        for v in &mut self.vertices {
            *v = matrix.transform_point3(*v);
        }

        let normal_matrix = matrix.matrix3.inverse().transpose();
        let mirrored = matrix.matrix3.determinant() < 0.0;
        for face in &mut self.faces {
            for corner in &mut face.corners {
                corner.normal = (normal_matrix * corner.normal).normalize_or_zero();
            }
            if mirrored {
                face.corners.reverse();
            }
        }
    }

    /// Translates the mesh by a vector.
    pub fn translate(&mut self, offset: DVec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Merges another mesh into this one.
    ///
    /// Material slots are matched by name; unknown names are appended.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);

        let remap: Vec<u16> = other
            .materials
            .iter()
            .map(|name| self.material_slot(name))
            .collect();

        for face in &other.faces {
            let mut face = face.clone();
            for corner in &mut face.corners {
                corner.vertex += offset;
            }
            face.material = remap.get(face.material as usize).copied().unwrap_or(0);
            self.faces.push(face);
        }

        self.custom_normals |= other.custom_normals;
    }

    /// Drops vertices no face references and renumbers the rest.
    ///
    /// Returns the number of vertices removed.
    pub fn compact(&mut self) -> usize {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.vertices.len());

        for face in &mut self.faces {
            for corner in &mut face.corners {
                let slot = &mut remap[corner.vertex as usize];
                if *slot == u32::MAX {
                    *slot = vertices.len() as u32;
                    vertices.push(self.vertices[corner.vertex as usize]);
                }
                corner.vertex = *slot;
            }
        }

        let removed = self.vertices.len() - vertices.len();
        self.vertices = vertices;
        removed
    }

    /// Validates the mesh for correctness.
    ///
    /// Checks:
    /// - All corner indices are valid
    /// - Every face has at least three distinct vertices
    /// - No zero-area faces
    ///
    /// Returns true if valid.
    pub fn validate(&self) -> bool {
        let vertex_count = self.vertices.len() as u32;

        for face in &self.faces {
            if face.corners.len() < 3 {
                return false;
            }
            if face.vertex_ids().any(|v| v >= vertex_count) {
                return false;
            }
            if face.edges().any(|(a, b)| a == b) {
                return false;
            }
            if self.face_area(face) < EPSILON {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;

    fn unit_quad() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        mesh.add_face(Face::new((0..4).map(Corner::new).collect(), 0));
        mesh
    }

    #[test]
    fn test_mesh_new() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_quad_counts_as_two_triangles() {
        let mesh = unit_quad();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.faces()[0].fan(), vec![[0, 1, 2], [2, 3, 0]]);
    }

    #[test]
    fn test_face_normal_and_area() {
        let mesh = unit_quad();
        let face = &mesh.faces()[0];
        assert_eq!(mesh.face_normal(face), DVec3::Z);
        assert!((mesh.face_area(face) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_box_ignores_unused_vertices() {
        let mut mesh = unit_quad();
        mesh.add_vertex(DVec3::splat(100.0));
        let (min, max) = mesh.bounding_box();
        assert_eq!(min, DVec3::ZERO);
        assert_eq!(max, DVec3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.bounds_center(), DVec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_median_center_counts_shared_vertices_once() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(4.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(4.0, 4.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 4.0, 0.0));
        mesh.add_vertex(DVec3::new(100.0, 100.0, 0.0));
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        assert_eq!(mesh.median_center(), DVec3::new(2.0, 2.0, 0.0));
        assert_eq!(Mesh::new().median_center(), DVec3::ZERO);
    }

    #[test]
    fn test_material_slot_reuses_names() {
        let mut mesh = Mesh::new();
        assert_eq!(mesh.material_slot("Grass"), 0);
        assert_eq!(mesh.material_slot("Rock"), 1);
        assert_eq!(mesh.material_slot("Grass"), 0);
        assert_eq!(mesh.material_name(1), Some("Rock"));
    }

    #[test]
    fn test_merge_remaps_materials_and_offsets() {
        let mut a = unit_quad();
        a.material_slot("Grass");

        let mut b = unit_quad();
        b.material_slot("Rock");

        a.merge(&b);
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.face_count(), 2);
        assert_eq!(a.materials(), ["Grass".to_string(), "Rock".to_string()]);
        assert_eq!(a.faces()[1].material, 1);
        assert_eq!(a.faces()[1].corners[0].vertex, 4);
    }

    #[test]
    fn test_compact_removes_unused() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::splat(9.0));
        mesh.add_vertex(DVec3::ZERO);
        mesh.add_vertex(DVec3::X);
        mesh.add_vertex(DVec3::Y);
        mesh.add_triangle(1, 2, 3);

        assert_eq!(mesh.compact(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces()[0].corners[0].vertex, 0);
        assert_eq!(mesh.vertex(0), DVec3::ZERO);
    }

    #[test]
    fn test_transform_mirror_flips_winding() {
        let mut mesh = unit_quad();
        let mirror = DAffine3::from_scale(DVec3::new(-1.0, 1.0, 1.0));
        mesh.transform(&mirror);
        let face = &mesh.faces()[0];
        assert!(mesh.face_normal(face).z > 0.99);
    }

    #[test]
    fn test_transform_rotates_normals() {
        let mut mesh = unit_quad();
        for corner in &mut mesh.faces_mut()[0].corners {
            corner.normal = DVec3::Z;
        }
        let rotation = DAffine3::from_quat(DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2));
        mesh.transform(&rotation);
        let n = mesh.faces()[0].corners[0].normal;
        assert!((n - DVec3::new(0.0, -1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_mesh_validate_invalid_index() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::ZERO);
        mesh.add_triangle(0, 1, 2);
        assert!(!mesh.validate());
        assert!(unit_quad().validate());
    }
}
