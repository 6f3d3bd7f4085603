//! # Scene Loading
//!
//! Builds a [`Scene`] from either a Wavefront OBJ file or a TOML manifest.
//!
//! An OBJ file becomes one object per `o` block at the identity transform,
//! all of them selected. A manifest places meshes with transforms and
//! modifier stacks and may carry settings:
//!
//! ```toml
//! selection = ["Ground"]
//!
//! [settings]
//! size = [16.0, 16.0]
//! rounding = "auto"
//!
//! [[objects]]
//! name = "Ground"
//! mesh = "terrain.obj"     # relative to the manifest
//! object = "Ground"        # `o` block to use; all blocks when omitted
//! location = [100.0, 50.0, 0.0]
//! rotation = [0.0, 0.0, 90.0]   # degrees, XYZ
//! scale = [1.0, 1.0, 1.0]
//!
//! [[objects.modifiers]]
//! type = "mirror"
//! axis = "x"
//! ```
//!
//! Without `selection` every object is selected in manifest order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::Deserialize;
use tile_mesh::io::{read_obj_file, ObjObject};
use tile_mesh::Mesh;
use tracing::debug;

use crate::error::{Result, SectionalizeError};
use crate::scene::{ModifierEntry, Object, ObjectId, Scene, Transform};
use crate::settings::SectionalizerSettings;

/// A loaded scene with its selection.
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    /// Selected objects; the first names the output.
    pub selection: Vec<ObjectId>,
    /// Settings from the manifest, if it had a `[settings]` table.
    pub settings: Option<SectionalizerSettings>,
}

// =============================================================================
// MANIFEST FORMAT
// =============================================================================

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    selection: Option<Vec<String>>,
    settings: Option<SectionalizerSettings>,
    #[serde(default)]
    objects: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectEntry {
    name: String,
    mesh: PathBuf,
    object: Option<String>,
    #[serde(default)]
    location: [f64; 3],
    #[serde(default)]
    rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    scale: [f64; 3],
    #[serde(default)]
    modifiers: Vec<ModifierEntry>,
}

// =============================================================================
// LOADING
// =============================================================================

/// Loads a manifest (`.toml`) or an OBJ file (anything else).
pub fn load_scene(path: &Path) -> Result<LoadedScene> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => load_manifest(path),
        _ => load_obj_scene(path),
    }
}

/// Loads every object of an OBJ file and selects them all.
pub fn load_obj_scene(path: &Path) -> Result<LoadedScene> {
    let mut scene = Scene::new();
    let selection = read_obj_file(path)?
        .into_iter()
        .map(|o| scene.add(Object::new(o.name, o.mesh)))
        .collect();
    Ok(LoadedScene {
        scene,
        selection,
        settings: None,
    })
}

/// Loads a TOML manifest; mesh paths resolve against its directory.
pub fn load_manifest(path: &Path) -> Result<LoadedScene> {
    let text = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&text, base_dir)
}

/// Parses manifest text.
///
/// # Errors
///
/// [`SectionalizeError::Manifest`] for malformed TOML, duplicate object names
/// or a missing `o` block, [`SectionalizeError::ObjectNotFound`] for an
/// unknown selection entry, and mesh errors from reading the OBJ files.
pub fn parse_manifest(text: &str, base_dir: &Path) -> Result<LoadedScene> {
    let manifest: Manifest = toml::from_str(text)?;
    if manifest.objects.is_empty() {
        return Err(SectionalizeError::manifest("no objects defined"));
    }

    let mut files: HashMap<PathBuf, Vec<ObjObject>> = HashMap::new();
    let mut scene = Scene::new();
    let mut ids: Vec<(String, ObjectId)> = Vec::with_capacity(manifest.objects.len());

    for entry in manifest.objects {
        if ids.iter().any(|(name, _)| *name == entry.name) {
            return Err(SectionalizeError::manifest(format!(
                "duplicate object name '{}'",
                entry.name
            )));
        }

        let path = base_dir.join(&entry.mesh);
        if !files.contains_key(&path) {
            let objects = read_obj_file(&path)?;
            debug!(path = %path.display(), objects = objects.len(), "read mesh file");
            files.insert(path.clone(), objects);
        }
        let objects = files.get(&path).map(Vec::as_slice).unwrap_or_default();
        let mesh = select_mesh(objects, entry.object.as_deref(), &path)?;

        let transform = Transform::from_euler_degrees(
            DVec3::from_array(entry.location),
            entry.rotation,
            DVec3::from_array(entry.scale),
        );
        let mut object = Object::new(entry.name.clone(), mesh).with_transform(transform);
        object.modifiers = entry.modifiers;
        ids.push((entry.name, scene.add(object)));
    }

    let selection = match manifest.selection {
        Some(names) => names
            .iter()
            .map(|name| {
                ids.iter()
                    .find(|(n, _)| n == name)
                    .map(|&(_, id)| id)
                    .ok_or_else(|| SectionalizeError::ObjectNotFound(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?,
        None => ids.iter().map(|&(_, id)| id).collect(),
    };

    Ok(LoadedScene {
        scene,
        selection,
        settings: manifest.settings,
    })
}

/// Picks the named `o` block, or joins all blocks when no name is given.
fn select_mesh(objects: &[ObjObject], name: Option<&str>, path: &Path) -> Result<Mesh> {
    match name {
        Some(name) => objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.mesh.clone())
            .ok_or_else(|| {
                SectionalizeError::manifest(format!("no object '{name}' in {}", path.display()))
            }),
        None => {
            let mut mesh = Mesh::new();
            for object in objects {
                mesh.merge(&object.mesh);
            }
            Ok(mesh)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Modifier;
    use crate::settings::Rounding;

    const QUADS: &str = "\
o Ground
v 0 0 0
v 4 0 0
v 4 4 0
v 0 4 0
f 1 2 3 4
o Rock
v 10 0 0
v 11 0 0
v 10 1 0
f 5 6 7
";

    fn write_quads(dir: &Path) {
        fs::write(dir.join("terrain.obj"), QUADS).unwrap();
    }

    #[test]
    fn test_obj_scene_selects_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_quads(dir.path());
        let loaded = load_scene(&dir.path().join("terrain.obj")).unwrap();
        assert_eq!(loaded.selection.len(), 2);
        assert!(loaded.settings.is_none());
        let first = loaded.scene.get(loaded.selection[0]).unwrap();
        assert_eq!(first.name, "Ground");
        assert_eq!(first.mesh.face_count(), 1);
    }

    #[test]
    fn test_manifest_places_objects() {
        let dir = tempfile::tempdir().unwrap();
        write_quads(dir.path());
        let text = r#"
            selection = ["Hill"]

            [settings]
            rounding = "auto"

            [[objects]]
            name = "Flat"
            mesh = "terrain.obj"

            [[objects]]
            name = "Hill"
            mesh = "terrain.obj"
            object = "Ground"
            location = [10.0, 0.0, 0.0]
            rotation = [0.0, 0.0, 90.0]

            [[objects.modifiers]]
            type = "mirror"
            axis = "y"
        "#;
        let loaded = parse_manifest(text, dir.path()).unwrap();
        assert_eq!(loaded.scene.len(), 2);
        assert_eq!(loaded.settings.unwrap().rounding, Rounding::Auto);

        let flat = loaded.scene.get(loaded.scene.find("Flat").unwrap()).unwrap();
        assert_eq!(flat.mesh.face_count(), 2);

        assert_eq!(loaded.selection.len(), 1);
        let hill = loaded.scene.get(loaded.selection[0]).unwrap();
        assert_eq!(hill.name, "Hill");
        assert_eq!(hill.mesh.face_count(), 1);
        assert_eq!(hill.transform.location, DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(hill.transform.scale, DVec3::ONE);
        assert_eq!(hill.modifiers.len(), 1);
        assert!(matches!(hill.modifiers[0].modifier, Modifier::Mirror { .. }));

        let p = hill.transform.matrix().transform_point3(DVec3::X);
        assert!((p - DVec3::new(10.0, 1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_manifest_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_quads(dir.path());

        let err = parse_manifest("objects = []", dir.path()).unwrap_err();
        assert!(matches!(err, SectionalizeError::Manifest(_)));

        let err = parse_manifest("bogus = 1", dir.path()).unwrap_err();
        assert!(matches!(err, SectionalizeError::Manifest(_)));

        let duplicate = r#"
            [[objects]]
            name = "A"
            mesh = "terrain.obj"
            [[objects]]
            name = "A"
            mesh = "terrain.obj"
        "#;
        let err = parse_manifest(duplicate, dir.path()).unwrap_err();
        assert!(matches!(err, SectionalizeError::Manifest(_)));

        let unknown = r#"
            selection = ["Nope"]
            [[objects]]
            name = "A"
            mesh = "terrain.obj"
        "#;
        let err = parse_manifest(unknown, dir.path()).unwrap_err();
        assert!(matches!(err, SectionalizeError::ObjectNotFound(ref n) if n == "Nope"));

        let missing_block = r#"
            [[objects]]
            name = "A"
            mesh = "terrain.obj"
            object = "Lake"
        "#;
        let err = parse_manifest(missing_block, dir.path()).unwrap_err();
        assert!(matches!(err, SectionalizeError::Manifest(_)));

        let missing_file = r#"
            [[objects]]
            name = "A"
            mesh = "nowhere.obj"
        "#;
        assert!(parse_manifest(missing_file, dir.path()).is_err());
    }
}
