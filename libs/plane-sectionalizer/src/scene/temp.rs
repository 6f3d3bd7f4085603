//! # Temporary Object Scope
//!
//! Exclusive access to a [`Scene`] that remembers which objects were created
//! as temporaries and removes them when the scope ends, whether the pipeline
//! returns normally, fails with an error or unwinds.

use tracing::debug;

use super::{Object, ObjectId, Scene};

/// Guard owning the temporaries of one pipeline run.
pub struct TempScope<'a> {
    scene: &'a mut Scene,
    tracked: Vec<ObjectId>,
}

impl<'a> TempScope<'a> {
    pub fn new(scene: &'a mut Scene) -> Self {
        Self {
            scene,
            tracked: Vec::new(),
        }
    }

    /// Adds a temporary object, removed when the scope ends.
    pub fn add_temp(&mut self, object: Object) -> ObjectId {
        let id = self.scene.add(object);
        self.tracked.push(id);
        id
    }

    /// Adds an object that outlives the scope.
    pub fn add_persistent(&mut self, object: Object) -> ObjectId {
        self.scene.add(object)
    }

    /// Removes an object right away.
    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.tracked.retain(|&t| t != id);
        self.scene.remove(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.scene.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.scene.get_mut(id)
    }

    /// Number of live temporaries.
    pub fn temp_count(&self) -> usize {
        self.tracked.len()
    }

    /// Removes every temporary now. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.tracked.len();
        for id in self.tracked.drain(..) {
            self.scene.remove(id);
        }
        count
    }
}

impl Drop for TempScope<'_> {
    fn drop(&mut self) {
        let removed = self.clear();
        if removed > 0 {
            debug!(removed, "removed temporary objects");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_mesh::Mesh;

    #[test]
    fn test_temporaries_removed_on_drop() {
        let mut scene = Scene::new();
        let keep;
        {
            let mut scope = TempScope::new(&mut scene);
            scope.add_temp(Object::new("Temp", Mesh::new()));
            scope.add_temp(Object::new("Temp", Mesh::new()));
            keep = scope.add_persistent(Object::new("Keep", Mesh::new()));
            assert_eq!(scope.temp_count(), 2);
        }
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(keep));
    }

    #[test]
    fn test_temporaries_removed_on_error_path() {
        fn failing(scene: &mut Scene) -> Result<(), &'static str> {
            let mut scope = TempScope::new(scene);
            scope.add_temp(Object::new("Temp", Mesh::new()));
            Err("stage failed")
        }

        let mut scene = Scene::new();
        assert!(failing(&mut scene).is_err());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_temporaries_removed_on_unwind() {
        let mut scene = Scene::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut scope = TempScope::new(&mut scene);
            scope.add_temp(Object::new("Temp", Mesh::new()));
            panic!("stage panicked");
        }));
        assert!(result.is_err());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_explicit_remove_untracks() {
        let mut scene = Scene::new();
        let mut scope = TempScope::new(&mut scene);
        let id = scope.add_temp(Object::new("Temp", Mesh::new()));
        assert!(scope.remove(id).is_some());
        assert_eq!(scope.temp_count(), 0);
        assert_eq!(scope.clear(), 0);
    }
}
