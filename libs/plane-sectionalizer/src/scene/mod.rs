//! # Scene Graph
//!
//! A flat collection of named mesh objects. Objects are addressed by
//! [`ObjectId`]; names are unique within a scene and clashes get a numeric
//! suffix (`Plane`, `Plane.001`, ...).
//!
//! Pipelines never keep an implicit "active" object: every operation takes
//! the ids it works on, and temporaries are tracked by a [`TempScope`].

pub mod modifier;
pub mod temp;
pub mod transform;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use config::constants::{format_id, MIN_ID_WIDTH};
use tile_mesh::ops::calc_split_normals;
use tile_mesh::Mesh;

pub use modifier::{evaluate_stack, Modifier, ModifierEntry};
pub use temp::TempScope;
pub use transform::Transform;

use crate::settings::ModifierSettings;

/// Handle to an object in a [`Scene`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named mesh with a transform and a modifier stack.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub mesh: Mesh,
    pub transform: Transform,
    pub modifiers: Vec<ModifierEntry>,
}

impl Object {
    /// Object at the origin with no modifiers.
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform: Transform::default(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_modifier(mut self, modifier: ModifierEntry) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Mesh in world space with the modifier stack baked in (or skipped when
    /// `apply_modifiers` is false). Split normals are computed so the result
    /// can serve as a normal-transfer source.
    pub fn evaluated_mesh(&self, apply_modifiers: bool, settings: ModifierSettings) -> Mesh {
        let mut mesh = if apply_modifiers {
            evaluate_stack(&self.mesh, &self.modifiers, settings)
        } else {
            self.mesh.clone()
        };
        calc_split_normals(&mut mesh);
        mesh.transform(&self.transform.matrix());
        mesh
    }

    /// Mesh in world space without modifiers and without recomputing normals.
    pub fn world_mesh(&self) -> Mesh {
        let mut mesh = self.mesh.clone();
        mesh.transform(&self.transform.matrix());
        mesh
    }
}

/// Owner of all objects.
///
/// Names are indexed when an object is added; renaming through
/// [`Scene::get_mut`] is not tracked by [`Scene::find`].
#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, Object>,
    names: HashMap<String, ObjectId>,
    /// Per base name, a suffix below which every `.NNN` name is taken.
    suffix_hint: HashMap<String, usize>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, renaming it if the name is taken.
    pub fn add(&mut self, mut object: Object) -> ObjectId {
        object.name = self.unique_name(&object.name);
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.names.insert(object.name.clone(), id);
        self.objects.insert(id, object);
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        let object = self.objects.remove(&id)?;
        if self.names.get(&object.name) == Some(&id) {
            self.names.remove(&object.name);
        }
        if let Some((base, n)) = split_suffix(&object.name) {
            if let Some(hint) = self.suffix_hint.get_mut(base) {
                *hint = (*hint).min(n);
            }
        }
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Looks up an object by exact name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.names
            .get(name)
            .copied()
            .filter(|id| self.objects.get(id).is_some_and(|o| o.name == name))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(&id, object)| (id, object))
    }

    /// Ids in creation order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// `base` if free, otherwise `base.NNN` with the lowest free suffix.
    fn unique_name(&mut self, base: &str) -> String {
        if !self.names.contains_key(base) {
            return base.to_string();
        }
        let mut n = self.suffix_hint.get(base).copied().unwrap_or(1);
        let name = loop {
            let candidate = format!("{base}.{}", format_id(n, MIN_ID_WIDTH));
            if !self.names.contains_key(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.suffix_hint.insert(base.to_string(), n + 1);
        name
    }
}

/// Splits `Plane.003` into `("Plane", 3)`.
fn split_suffix(name: &str) -> Option<(&str, usize)> {
    let (base, digits) = name.rsplit_once('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, digits.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::ZERO);
        mesh.add_vertex(DVec3::X);
        mesh.add_vertex(DVec3::Y);
        mesh.add_triangle(0, 1, 2);
        mesh
    }

    #[test]
    fn test_names_are_unique() {
        let mut scene = Scene::new();
        let a = scene.add(Object::new("Plane", triangle()));
        let b = scene.add(Object::new("Plane", triangle()));
        let c = scene.add(Object::new("Plane", triangle()));
        assert_eq!(scene.get(a).unwrap().name, "Plane");
        assert_eq!(scene.get(b).unwrap().name, "Plane.001");
        assert_eq!(scene.get(c).unwrap().name, "Plane.002");
        assert_eq!(scene.find("Plane.001"), Some(b));
    }

    #[test]
    fn test_freed_suffix_is_taken_again() {
        let mut scene = Scene::new();
        let ids: Vec<ObjectId> = (0..4).map(|_| scene.add(Object::new("Part", triangle()))).collect();
        scene.remove(ids[2]);
        scene.remove(ids[1]);

        let a = scene.add(Object::new("Part", triangle()));
        let b = scene.add(Object::new("Part", triangle()));
        let c = scene.add(Object::new("Part", triangle()));
        assert_eq!(scene.get(a).unwrap().name, "Part.001");
        assert_eq!(scene.get(b).unwrap().name, "Part.002");
        assert_eq!(scene.get(c).unwrap().name, "Part.004");
        assert_eq!(scene.find("Part.002"), Some(b));
    }

    #[test]
    fn test_many_same_named_objects_stay_fast() {
        let mut scene = Scene::new();
        let start = std::time::Instant::now();
        let mut last = None;
        for _ in 0..5000 {
            last = Some(scene.add(Object::new("Plane_PART", Mesh::new())));
        }
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(scene.len(), 5000);
        assert_eq!(scene.get(last.unwrap()).unwrap().name, "Plane_PART.4999");
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add(Object::new("A", triangle()));
        scene.remove(a);
        let b = scene.add(Object::new("A", triangle()));
        assert_ne!(a, b);
        assert_eq!(scene.get(b).unwrap().name, "A");
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_evaluated_mesh_applies_transform_and_modifiers() {
        let object = Object::new("Tri", triangle())
            .with_transform(Transform::from_location(DVec3::new(10.0, 0.0, 0.0)))
            .with_modifier(ModifierEntry::new(Modifier::Array {
                count: 2,
                offset: [0.0, 0.0, 1.0],
            }));

        let baked = object.evaluated_mesh(true, ModifierSettings::Preview);
        assert_eq!(baked.face_count(), 2);
        assert_eq!(baked.bounding_box().0.x, 10.0);
        assert_eq!(baked.faces()[0].corners[0].normal, DVec3::Z);

        let plain = object.evaluated_mesh(false, ModifierSettings::Preview);
        assert_eq!(plain.face_count(), 1);
    }
}
