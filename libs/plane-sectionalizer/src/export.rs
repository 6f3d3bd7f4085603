//! # Sections Exporter
//!
//! Serializes extracted sections into the `.sctx` JSON document:
//!
//! ```json
//! {
//!   "objects": {
//!     "Plane_SECT.000": {
//!       "model": { "Stone": [px, py, pz, nx, ny, nz, u, v, ...] },
//!       "position": [8.0, 8.0, 0.0]
//!     }
//!   },
//!   "offset": [8.0, 8.0, 0.0],
//!   "size": [16.0, 16.0, 0.0]
//! }
//! ```
//!
//! Objects are keyed by section name in sorted order; materials keep slot
//! order. Nothing is written when any material of any section exceeds the
//! vertex budget.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use config::constants::{SECTIONS_EXTENSION, VERTEX_BUDGET};
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::error::{Result, SectionalizeError};
use crate::extract::{max_vertex_count, ExtractedSection};
use crate::grid::GridSpec;

// =============================================================================
// DOCUMENT
// =============================================================================

/// Material buffers serialized as a map in slot order.
struct Model<'a>(&'a [(String, Vec<f64>)]);

impl Serialize for Model<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, floats)| (name, floats)))
    }
}

#[derive(Serialize)]
struct ObjectRecord<'a> {
    model: Model<'a>,
    position: [f64; 3],
}

#[derive(Serialize)]
struct SectionsDocument<'a> {
    objects: BTreeMap<&'a str, ObjectRecord<'a>>,
    offset: [f64; 3],
    size: [f64; 3],
}

impl<'a> SectionsDocument<'a> {
    fn new(sections: &'a [ExtractedSection], grid: &GridSpec) -> Self {
        let objects = sections
            .iter()
            .map(|s| {
                let record = ObjectRecord {
                    model: Model(&s.materials),
                    position: s.position.to_array(),
                };
                (s.name.as_str(), record)
            })
            .collect();
        let offset = grid.export_offset();
        Self {
            objects,
            offset: [offset.x, offset.y, 0.0],
            size: [grid.cell_size.x, grid.cell_size.y, 0.0],
        }
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// Fails when a material of some section has more than [`VERTEX_BUDGET`]
/// vertices.
///
/// # Errors
///
/// [`SectionalizeError::VertexBudgetExceeded`] for the largest offender.
pub fn check_budget(sections: &[ExtractedSection]) -> Result<()> {
    match max_vertex_count(sections) {
        Some((section, material, count)) if count > VERTEX_BUDGET => {
            Err(SectionalizeError::VertexBudgetExceeded {
                section: section.to_string(),
                material: material.to_string(),
                count,
                max: VERTEX_BUDGET,
            })
        }
        _ => Ok(()),
    }
}

/// Renders the document as a JSON string without checking the budget.
pub fn to_json(sections: &[ExtractedSection], grid: &GridSpec) -> Result<String> {
    Ok(serde_json::to_string(&SectionsDocument::new(sections, grid))?)
}

/// Checks the budget and writes the document to `path`.
///
/// The JSON goes to a sibling temporary file first and is renamed into place,
/// so `path` never holds a partial document.
///
/// # Errors
///
/// [`SectionalizeError::VertexBudgetExceeded`] (nothing written), or an I/O
/// or JSON error.
pub fn export_sections(path: &Path, sections: &[ExtractedSection], grid: &GridSpec) -> Result<()> {
    if let Err(err) = check_budget(sections) {
        warn!("{err}; no file written");
        return Err(err);
    }

    let json = to_json(sections, grid)?;
    let tmp = path.with_extension(format!("{SECTIONS_EXTENSION}.tmp"));
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }

    info!(path = %path.display(), objects = sections.len(), "exported sections");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use config::constants::{DEFAULT_MATERIAL, FLOATS_PER_VERTEX};
    use glam::{DVec2, DVec3};

    fn section(name: &str, materials: &[(&str, usize)]) -> ExtractedSection {
        ExtractedSection {
            name: name.to_string(),
            position: DVec3::new(8.0, -8.0, 0.0),
            materials: materials
                .iter()
                .map(|&(m, vertices)| (m.to_string(), vec![0.5; vertices * FLOATS_PER_VERTEX]))
                .collect(),
        }
    }

    fn grid() -> GridSpec {
        GridSpec::from_parts((2, 3), DVec2::new(16.0, 10.0))
    }

    #[test]
    fn test_document_layout() {
        let sections = [
            section("P_SECT.001", &[("Zinc", 3), ("Alpha", 3)]),
            section("P_SECT.000", &[(DEFAULT_MATERIAL, 3)]),
        ];
        let json = to_json(&sections, &grid()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["offset"], serde_json::json!([8.0, 0.0, 0.0]));
        assert_eq!(value["size"], serde_json::json!([16.0, 10.0, 0.0]));
        let objects = value["objects"].as_object().unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects["P_SECT.000"]["position"], serde_json::json!([8.0, -8.0, 0.0]));
        assert_eq!(objects["P_SECT.001"]["model"]["Zinc"].as_array().unwrap().len(), 24);

        // Objects sorted by name, materials in slot order.
        assert!(json.find("P_SECT.000").unwrap() < json.find("P_SECT.001").unwrap());
        assert!(json.find("Zinc").unwrap() < json.find("Alpha").unwrap());
    }

    #[test]
    fn test_budget_limit() {
        assert!(check_budget(&[section("A", &[("M", VERTEX_BUDGET)])]).is_ok());

        let err = check_budget(&[
            section("A", &[("M", 3)]),
            section("B", &[("N", 3), ("M", VERTEX_BUDGET + 1)]),
        ])
        .unwrap_err();
        match err {
            SectionalizeError::VertexBudgetExceeded {
                section,
                material,
                count,
                max,
            } => {
                assert_eq!(section, "B");
                assert_eq!(material, "M");
                assert_eq!(count, VERTEX_BUDGET + 1);
                assert_eq!(max, VERTEX_BUDGET);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_export_writes_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Plane.sctx");
        export_sections(&path, &[section("A", &[("M", 3)])], &grid()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\"objects\""));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_rejected_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Plane.sctx");
        let result = export_sections(&path, &[section("A", &[("M", VERTEX_BUDGET + 1)])], &grid());
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
