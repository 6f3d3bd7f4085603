//! # Grid Partitioner
//!
//! Derives the cell grid from settings and the bounds of the baked mesh.
//!
//! ## Layout
//!
//! Coordinates are grid-local: the baked mesh is shifted by `-origin_offset`
//! before cutting. Cell `i` along an axis with `n` cells of size `s` spans
//!
//! ```text
//! [(i - 1 - n/2) * s, (i - n/2) * s]
//! ```
//!
//! so the default range `i ∈ [1, n + 1)` holds exactly `n` cells centred on
//! the grid origin. The range grows by whole cells wherever the geometry
//! overflows it. Cells are numbered row-major, y outer and x inner.

use std::ops::Range;

use config::constants::{digit_count, EPSILON, PLANE_EPSILON};
use glam::DVec2;
use tile_mesh::ops::Axis;

use crate::error::{Result, SectionalizeError};
use crate::settings::{NumberOrSize, Rounding, SectionalizerSettings};

/// Applies the parity policy to a raw cell count.
///
/// A count that already has the requested parity is kept, otherwise it is
/// incremented by one.
pub fn rounded_count(raw: u32, rounding: Rounding) -> u32 {
    match rounding {
        Rounding::Auto => raw,
        Rounding::Even if raw % 2 == 1 => raw + 1,
        Rounding::Odd if raw % 2 == 0 => raw + 1,
        _ => raw,
    }
}

/// Cell count and cell size for `dimensions` (width, height).
///
/// # Errors
///
/// [`SectionalizeError::DegenerateBounds`] in by-number mode when an axis has
/// no extent.
pub fn partition(settings: &SectionalizerSettings, dimensions: DVec2) -> Result<((u32, u32), DVec2)> {
    match settings.number_or_size {
        NumberOrSize::ByNumber => {
            if dimensions.x <= EPSILON || dimensions.y <= EPSILON {
                return Err(SectionalizeError::DegenerateBounds {
                    width: dimensions.x,
                    height: dimensions.y,
                });
            }
            let (nx, ny) = settings.number;
            let size = dimensions / DVec2::new(nx as f64, ny as f64);
            Ok(((nx, ny), size))
        }
        NumberOrSize::BySize => {
            let size = DVec2::new(settings.size.0, settings.size.1);
            let raw = |d: f64, s: f64| ((d / s).ceil() as u32).max(1);
            let nx = rounded_count(raw(dimensions.x, size.x), settings.rounding);
            let ny = rounded_count(raw(dimensions.y, size.y), settings.rounding);
            Ok(((nx, ny), size))
        }
    }
}

/// Cell layout for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub cell_count: (u32, u32),
    pub cell_size: DVec2,
    /// World position of the grid origin; z is always zero.
    pub origin_offset: DVec2,
    range_x: Range<i64>,
    range_y: Range<i64>,
}

impl GridSpec {
    /// Grid for `dimensions` with the origin at zero and the default range.
    pub fn new(settings: &SectionalizerSettings, dimensions: DVec2) -> Result<Self> {
        let (cell_count, cell_size) = partition(settings, dimensions)?;
        Ok(Self::from_parts(cell_count, cell_size))
    }

    /// Grid with an explicit count and size.
    pub fn from_parts(cell_count: (u32, u32), cell_size: DVec2) -> Self {
        Self {
            cell_count,
            cell_size,
            origin_offset: DVec2::ZERO,
            range_x: 1..cell_count.0 as i64 + 1,
            range_y: 1..cell_count.1 as i64 + 1,
        }
    }

    /// Snaps `center` down to a multiple of the cell size and uses it as the
    /// grid origin.
    pub fn with_origin(mut self, center: DVec2) -> Self {
        self.origin_offset = (center / self.cell_size).floor() * self.cell_size;
        self
    }

    /// Extends the cell range so grid-local bounds `min..max` are covered.
    ///
    /// Growing by overflow covers the single extra cell on the offset side
    /// that a sign-of-offset rule would add, plus any further overflow.
    pub fn fit_bounds(mut self, min: DVec2, max: DVec2) -> Self {
        let fit = |range: &mut Range<i64>, n: u32, s: f64, lo: f64, hi: f64| {
            let half = n as f64 * s * 0.5;
            let extra = |overflow: f64| {
                if overflow > PLANE_EPSILON {
                    (overflow / s).ceil() as i64
                } else {
                    0
                }
            };
            range.start = 1 - extra(-half - lo);
            range.end = n as i64 + 1 + extra(hi - half);
        };
        fit(&mut self.range_x, self.cell_count.0, self.cell_size.x, min.x, max.x);
        fit(&mut self.range_y, self.cell_count.1, self.cell_size.y, min.y, max.y);
        self
    }

    /// Cell index range along `axis` (X or Y).
    pub fn range(&self, axis: Axis) -> Range<i64> {
        match axis {
            Axis::Y => self.range_y.clone(),
            _ => self.range_x.clone(),
        }
    }

    fn count_and_size(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Y => (self.cell_count.1 as f64, self.cell_size.y),
            _ => (self.cell_count.0 as f64, self.cell_size.x),
        }
    }

    /// Upper boundary of cell `i` along `axis`.
    pub fn boundary(&self, axis: Axis, i: i64) -> f64 {
        let (n, s) = self.count_and_size(axis);
        (i as f64 - 0.5 * n) * s
    }

    /// Grid-local positions of the cutting planes along `axis`: every cell
    /// boundary of the range, lowest first.
    pub fn cut_positions(&self, axis: Axis) -> Vec<f64> {
        let range = self.range(axis);
        (range.start - 1..range.end).map(|i| self.boundary(axis, i)).collect()
    }

    /// Grid-local cell centres, row-major.
    pub fn cell_centers(&self) -> Vec<DVec2> {
        let half = self.cell_size * 0.5;
        let mut centers = Vec::with_capacity(self.cell_total());
        for j in self.range_y.clone() {
            for i in self.range_x.clone() {
                let x = self.boundary(Axis::X, i) - half.x;
                let y = self.boundary(Axis::Y, j) - half.y;
                centers.push(DVec2::new(x, y));
            }
        }
        centers
    }

    /// Number of cells in the range.
    pub fn cell_total(&self) -> usize {
        let width = (self.range_x.end - self.range_x.start).max(0) as usize;
        let height = (self.range_y.end - self.range_y.start).max(0) as usize;
        width * height
    }

    /// Digit width of cell ids.
    pub fn cell_id_width(&self) -> usize {
        digit_count(self.cell_total())
    }

    /// First cell (in scan order) whose closed rectangle contains `point`.
    pub fn find_cell(&self, point: DVec2) -> Option<usize> {
        let half = self.cell_size * 0.5;
        self.cell_centers().iter().position(|c| {
            let d = (*c - point).abs();
            d.x <= half.x && d.y <= half.y
        })
    }

    /// Export offset: zero on axes with an odd cell count, half a cell on
    /// axes with an even count.
    pub fn export_offset(&self) -> DVec2 {
        let half = self.cell_size * 0.5;
        DVec2::new(
            if self.cell_count.0 % 2 == 1 { 0.0 } else { half.x },
            if self.cell_count.1 % 2 == 1 { 0.0 } else { half.y },
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
