//! # Sectionalizer Settings
//!
//! Runtime options for one sectionalizer run. Settings deserialize from the
//! `[settings]` table of a scene manifest; missing keys take their defaults.
//!
//! | Key | Default |
//! |-----|---------|
//! | `number_or_size` | `by_size` |
//! | `number` | `[4, 4]` |
//! | `size` | `[16.0, 16.0]` |
//! | `rounding` | `even` |
//! | `apply_modifiers` | `true` |
//! | `modifier_settings` | `preview` |
//! | `decimate` | `false` |
//! | `decimate_angle_limit` | 1° in radians |
//! | `decimate_collapse_ratio` | `0.9` |
//! | `output` | `json_and_sections` |
//! | `approximate` | `false` |
//! | `approx_digits` | `4` |

use config::constants::{
    DEFAULT_APPROX_DIGITS, DEFAULT_COLLAPSE_RATIO, DEFAULT_DISSOLVE_ANGLE_LIMIT,
    DEFAULT_SECTION_NUMBER, DEFAULT_SECTION_SIZE, MAX_APPROX_DIGITS, MIN_SECTION_SIZE,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SectionalizeError};

/// How the grid is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberOrSize {
    /// Fixed cell count; cell size follows from the bounds.
    ByNumber,
    /// Fixed cell size; cell count follows from the bounds.
    #[default]
    BySize,
}

/// Parity policy for by-size cell counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    Auto,
    #[default]
    Even,
    Odd,
}

/// Which modifier visibility flag applies when baking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierSettings {
    #[default]
    Preview,
    Render,
}

/// What a run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Write the JSON file and remove the sections afterwards.
    JsonOnly,
    /// Keep the sections, write no JSON.
    SectionsOnly,
    /// Keep the sections and write the JSON file.
    #[default]
    JsonAndSections,
}

impl OutputMode {
    /// True when the JSON file is produced.
    pub fn writes_json(self) -> bool {
        !matches!(self, OutputMode::SectionsOnly)
    }

    /// True when the sections stay in the scene.
    pub fn keeps_sections(self) -> bool {
        !matches!(self, OutputMode::JsonOnly)
    }
}

/// Options for one sectionalizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionalizerSettings {
    pub number_or_size: NumberOrSize,
    /// Cell count per axis (by-number mode).
    pub number: (u32, u32),
    /// Cell size per axis (by-size mode).
    pub size: (f64, f64),
    pub rounding: Rounding,
    /// Bake modifier stacks into the working copy.
    pub apply_modifiers: bool,
    pub modifier_settings: ModifierSettings,
    /// Simplify the working copy before cutting.
    pub decimate: bool,
    /// Planar dissolve angle limit in radians.
    pub decimate_angle_limit: f64,
    /// Fraction of triangles kept by edge collapse.
    pub decimate_collapse_ratio: f64,
    pub output: OutputMode,
    /// Round exported floats.
    pub approximate: bool,
    /// Decimal digits kept when rounding.
    pub approx_digits: u32,
}

impl Default for SectionalizerSettings {
    fn default() -> Self {
        Self {
            number_or_size: NumberOrSize::default(),
            number: DEFAULT_SECTION_NUMBER,
            size: DEFAULT_SECTION_SIZE,
            rounding: Rounding::default(),
            apply_modifiers: true,
            modifier_settings: ModifierSettings::default(),
            decimate: false,
            decimate_angle_limit: DEFAULT_DISSOLVE_ANGLE_LIMIT,
            decimate_collapse_ratio: DEFAULT_COLLAPSE_RATIO,
            output: OutputMode::default(),
            approximate: false,
            approx_digits: DEFAULT_APPROX_DIGITS,
        }
    }
}

impl SectionalizerSettings {
    /// Checks every option against its allowed range.
    ///
    /// # Errors
    ///
    /// [`SectionalizeError::InvalidSettings`] naming the first bad option.
    pub fn validate(&self) -> Result<()> {
        let (nx, ny) = self.number;
        if nx < 1 || ny < 1 {
            return Err(SectionalizeError::invalid_settings(format!(
                "number must be at least 1 per axis, got ({nx}, {ny})"
            )));
        }

        let (sx, sy) = self.size;
        let size_ok = |s: f64| s.is_finite() && s >= MIN_SECTION_SIZE;
        if !size_ok(sx) || !size_ok(sy) {
            return Err(SectionalizeError::invalid_settings(format!(
                "size must be at least {MIN_SECTION_SIZE} per axis, got ({sx}, {sy})"
            )));
        }

        let angle = self.decimate_angle_limit;
        if !(0.0..=std::f64::consts::PI).contains(&angle) {
            return Err(SectionalizeError::invalid_settings(format!(
                "decimate_angle_limit must be within [0, pi], got {angle}"
            )));
        }

        let ratio = self.decimate_collapse_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(SectionalizeError::invalid_settings(format!(
                "decimate_collapse_ratio must be within [0, 1], got {ratio}"
            )));
        }

        if self.approx_digits > MAX_APPROX_DIGITS {
            return Err(SectionalizeError::invalid_settings(format!(
                "approx_digits must be at most {MAX_APPROX_DIGITS}, got {}",
                self.approx_digits
            )));
        }

        Ok(())
    }

    /// Decimal digits to round exported floats to, if rounding is enabled.
    pub fn rounding_digits(&self) -> Option<u32> {
        self.approximate.then_some(self.approx_digits)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SectionalizerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.number_or_size, NumberOrSize::BySize);
        assert_eq!(settings.rounding, Rounding::Even);
        assert_eq!(settings.output, OutputMode::JsonAndSections);
        assert_eq!(settings.rounding_digits(), None);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let cases: Vec<Box<dyn Fn(&mut SectionalizerSettings)>> = vec![
            Box::new(|s| s.number = (0, 2)),
            Box::new(|s| s.size = (0.5, 16.0)),
            Box::new(|s| s.size = (16.0, f64::NAN)),
            Box::new(|s| s.decimate_angle_limit = 4.0),
            Box::new(|s| s.decimate_collapse_ratio = 1.5),
            Box::new(|s| s.approx_digits = 16),
        ];
        for mutate in cases {
            let mut settings = SectionalizerSettings::default();
            mutate(&mut settings);
            let err = settings.validate().unwrap_err();
            assert!(matches!(err, SectionalizeError::InvalidSettings(_)));
        }
    }

    #[test]
    fn test_deserialize_partial_table() {
        let settings: SectionalizerSettings = toml::from_str(
            r#"
            number_or_size = "by_number"
            number = [2, 3]
            output = "json_only"
            approximate = true
            approx_digits = 2
            "#,
        )
        .unwrap();
        assert_eq!(settings.number_or_size, NumberOrSize::ByNumber);
        assert_eq!(settings.number, (2, 3));
        assert_eq!(settings.size, DEFAULT_SECTION_SIZE);
        assert!(!settings.output.keeps_sections());
        assert!(settings.output.writes_json());
        assert_eq!(settings.rounding_digits(), Some(2));
    }
}
