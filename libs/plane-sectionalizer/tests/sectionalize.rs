//! End-to-end runs: scene in, sections and `.sctx` JSON out.

use std::fs;
use std::path::Path;

use config::constants::{DEFAULT_MATERIAL, VERTEX_BUDGET};
use glam::{DVec2, DVec3};
use plane_sectionalizer::scene::{Object, ObjectId, Scene, Transform};
use plane_sectionalizer::settings::{NumberOrSize, OutputMode, Rounding, SectionalizerSettings};
use plane_sectionalizer::{run, JsonStatus, SectionalizeError};
use serde_json::Value;
use tile_mesh::primitives::create_grid;
use tile_mesh::Mesh;

fn by_size(size: f64) -> SectionalizerSettings {
    SectionalizerSettings {
        number_or_size: NumberOrSize::BySize,
        size: (size, size),
        rounding: Rounding::Auto,
        ..Default::default()
    }
}

fn plane_scene(size: f64, subdivisions: u32, location: DVec3) -> (Scene, ObjectId) {
    let mut scene = Scene::new();
    let mesh = create_grid(DVec2::splat(size), (subdivisions, subdivisions)).unwrap();
    let id = scene.add(Object::new("Plane", mesh).with_transform(Transform::from_location(location)));
    (scene, id)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// A 12x12 grid of `22 x 31` quads plus `extra` loose triangles, all inside a
/// single 16x16 cell. The single section holds `1364 + extra` triangles.
fn dense_scene(extra: usize) -> (Scene, ObjectId) {
    let mut mesh = create_grid(DVec2::splat(12.0), (22, 31)).unwrap();
    for i in 0..extra {
        let x = 6.2 + 0.1 * i as f64;
        let a = mesh.add_vertex(DVec3::new(x, 6.2, 0.0));
        let b = mesh.add_vertex(DVec3::new(x + 0.05, 6.2, 0.0));
        let c = mesh.add_vertex(DVec3::new(x, 6.25, 0.0));
        mesh.add_triangle(a, b, c);
    }
    let mut scene = Scene::new();
    let id = scene.add(Object::new("Dense", mesh));
    (scene, id)
}

#[test]
fn test_two_by_two_scenario_writes_four_objects() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, id) = plane_scene(32.0, 1, DVec3::ZERO);
    let report = run(&mut scene, &[id], &by_size(16.0), dir.path()).unwrap();

    assert_eq!(report.base_name, "Plane");
    assert_eq!(report.section_count, 4);
    assert_eq!(report.sections.len(), 4);
    let path = match &report.json {
        JsonStatus::Written(path) => path.clone(),
        other => panic!("unexpected status: {other:?}"),
    };
    assert_eq!(path, dir.path().join("Plane.sctx"));

    let json = read_json(&path);
    assert_eq!(json["offset"], serde_json::json!([8.0, 8.0, 0.0]));
    assert_eq!(json["size"], serde_json::json!([16.0, 16.0, 0.0]));
    let objects = json["objects"].as_object().unwrap();
    assert_eq!(objects.len(), 4);

    let first = &objects["Plane_SECT.000"];
    assert_eq!(first["position"], serde_json::json!([-8.0, -8.0, 0.0]));
    let floats = first["model"][DEFAULT_MATERIAL].as_array().unwrap();
    assert_eq!(floats.len(), 6 * 8);
    assert_eq!(report.max_vertices, Some(("Plane_SECT.000".to_string(), DEFAULT_MATERIAL.to_string(), 6)));
}

#[test]
fn test_json_only_removes_sections() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, id) = plane_scene(32.0, 2, DVec3::ZERO);
    let settings = SectionalizerSettings {
        output: OutputMode::JsonOnly,
        ..by_size(16.0)
    };
    let report = run(&mut scene, &[id], &settings, dir.path()).unwrap();

    assert!(matches!(report.json, JsonStatus::Written(_)));
    assert!(report.sections.is_empty());
    assert_eq!(report.section_count, 4);
    assert_eq!(scene.len(), 1);
    assert!(scene.contains(id));
}

#[test]
fn test_sections_only_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, id) = plane_scene(32.0, 2, DVec3::ZERO);
    let settings = SectionalizerSettings {
        output: OutputMode::SectionsOnly,
        ..by_size(16.0)
    };
    let report = run(&mut scene, &[id], &settings, dir.path()).unwrap();

    assert!(matches!(report.json, JsonStatus::NotRequested));
    assert_eq!(report.sections.len(), 4);
    assert_eq!(report.max_vertices, None);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_vertex_budget_boundary() {
    let dir = tempfile::tempdir().unwrap();

    let (mut scene, id) = dense_scene(1);
    let report = run(&mut scene, &[id], &by_size(16.0), dir.path()).unwrap();
    assert_eq!(report.section_count, 1);
    assert_eq!(report.max_vertices.as_ref().map(|m| m.2), Some(VERTEX_BUDGET));
    assert!(matches!(report.json, JsonStatus::Written(_)));

    let dir = tempfile::tempdir().unwrap();
    let (mut scene, id) = dense_scene(2);
    let report = run(&mut scene, &[id], &by_size(16.0), dir.path()).unwrap();
    match &report.json {
        JsonStatus::Rejected(SectionalizeError::VertexBudgetExceeded { count, max, .. }) => {
            assert_eq!(*count, VERTEX_BUDGET + 3);
            assert_eq!(*max, VERTEX_BUDGET);
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(!dir.path().join("Dense.sctx").exists());
    // Sections survive a rejected export.
    assert_eq!(report.sections.len(), 1);
}

#[test]
fn test_approximate_limits_decimals() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, id) = plane_scene(32.0, 3, DVec3::new(0.3, -0.7, 0.0));
    let settings = SectionalizerSettings {
        approximate: true,
        approx_digits: 2,
        ..by_size(16.0)
    };
    let report = run(&mut scene, &[id], &settings, dir.path()).unwrap();
    let JsonStatus::Written(path) = &report.json else {
        panic!("json not written");
    };

    let json = read_json(path);
    let mut checked = 0;
    for object in json["objects"].as_object().unwrap().values() {
        for floats in object["model"].as_object().unwrap().values() {
            for value in floats.as_array().unwrap() {
                let text = value.as_f64().unwrap().to_string();
                let decimals = text.split('.').nth(1).map_or(0, str::len);
                assert!(decimals <= 2, "{text} has more than two decimals");
                checked += 1;
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_precondition_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = Scene::new();
    let id = scene.add(Object::new("Empty", Mesh::new()));
    let err = run(&mut scene, &[id], &by_size(16.0), dir.path()).unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(scene.len(), 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
