//! # Configuration Constants
//!
//! Centralized constants for the plane sectionalizer. Geometry tolerances,
//! engine limits, naming conventions and setting defaults live here.
//!
//! ## Categories
//!
//! - **Precision**: Floating-point comparison tolerances
//! - **Engine Limits**: Vertex budget and export layout
//! - **Naming**: Object suffixes, id padding, file extensions
//! - **Defaults**: Initial values for sectionalizer settings

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Epsilon for floating-point comparisons.
///
/// # Example
///
/// ```rust
/// use config::constants::EPSILON;
///
/// fn approximately_equal(a: f64, b: f64) -> bool {
///     (a - b).abs() < EPSILON
/// }
///
/// assert!(approximately_equal(1.0, 1.0 + 1e-11));
/// ```
pub const EPSILON: f64 = 1e-10;

/// Distance below which a point counts as lying on a cutting plane.
///
/// Bisection treats vertices within this distance as on the plane and leaves
/// them where they are, so no sliver triangles are cut off next to them.
///
/// # Example
///
/// ```rust
/// use config::constants::PLANE_EPSILON;
///
/// let distance: f64 = 5e-7;
/// assert!(distance.abs() < PLANE_EPSILON);
/// ```
pub const PLANE_EPSILON: f64 = 1e-6;

/// Merge distance used by remove-doubles.
///
/// Vertices closer than this are welded into one.
///
/// # Example
///
/// ```rust
/// use config::constants::WELD_DISTANCE;
///
/// assert!(WELD_DISTANCE > 0.0 && WELD_DISTANCE < 0.01);
/// ```
pub const WELD_DISTANCE: f64 = 1e-4;

/// Cosine tolerance when comparing normals for coplanarity.
pub const COPLANAR_COS_TOLERANCE: f64 = 1e-6;

// =============================================================================
// ENGINE LIMITS
// =============================================================================

/// Maximum vertex count per material per tile.
///
/// The engine indexes vertices with 12-bit indices per draw call, so any
/// material buffer above this count is rejected at export time.
///
/// # Example
///
/// ```rust
/// use config::constants::VERTEX_BUDGET;
///
/// let vertex_count = 4095;
/// assert!(vertex_count <= VERTEX_BUDGET);
/// ```
pub const VERTEX_BUDGET: usize = 4095;

/// Number of floats written per exported vertex (position, normal, uv).
pub const FLOATS_PER_VERTEX: usize = 8;

/// Material name used when a mesh has no material slots.
pub const DEFAULT_MATERIAL: &str = "__BDX_DEFAULT";

/// Largest accepted value for the approximation precision.
pub const MAX_APPROX_DIGITS: u32 = 15;

// =============================================================================
// NAMING
// =============================================================================

/// Suffix of the working copy object.
pub const TEMP_SUFFIX: &str = "_TEMP";

/// Suffix of intermediate part objects.
pub const PART_SUFFIX: &str = "_PART";

/// Suffix of finished section objects.
pub const SECT_SUFFIX: &str = "_SECT";

/// Minimum width of zero-padded section ids.
///
/// # Example
///
/// ```rust
/// use config::constants::{MIN_ID_WIDTH, format_id};
///
/// assert_eq!(format_id(4, MIN_ID_WIDTH), "004");
/// ```
pub const MIN_ID_WIDTH: usize = 3;

/// Extension of exported section files.
pub const SECTIONS_EXTENSION: &str = "sctx";

/// Path of the engine asset folder, relative to the project root.
pub const ASSETS_SUBDIR: [&str; 3] = ["android", "assets", "bdx"];

/// Width that progress labels are padded to before the elapsed time.
pub const PROFILER_LABEL_WIDTH: usize = 60;

// =============================================================================
// SETTING DEFAULTS
// =============================================================================

/// Default number of sections per axis when generating by number.
pub const DEFAULT_SECTION_NUMBER: (u32, u32) = (4, 4);

/// Default section size per axis when generating by size.
pub const DEFAULT_SECTION_SIZE: (f64, f64) = (16.0, 16.0);

/// Smallest accepted section size.
pub const MIN_SECTION_SIZE: f64 = 1.0;

/// Default dissolve angle limit (one degree, in radians).
pub const DEFAULT_DISSOLVE_ANGLE_LIMIT: f64 = std::f64::consts::PI / 180.0;

/// Default collapse ratio.
pub const DEFAULT_COLLAPSE_RATIO: f64 = 0.9;

/// Default approximation precision in decimal digits.
pub const DEFAULT_APPROX_DIGITS: u32 = 4;

/// Upper bound on beautify edge-flip sweeps over a mesh.
pub const BEAUTIFY_MAX_PASSES: usize = 16;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Zero-pads `n` to at least `width` digits.
///
/// # Example
///
/// ```rust
/// use config::constants::format_id;
///
/// assert_eq!(format_id(12, 4), "0012");
/// assert_eq!(format_id(12345, 3), "12345");
/// ```
pub fn format_id(n: usize, width: usize) -> String {
    format!("{n:0width$}")
}

/// Number of decimal digits needed to print `n`.
///
/// # Example
///
/// ```rust
/// use config::constants::digit_count;
///
/// assert_eq!(digit_count(0), 1);
/// assert_eq!(digit_count(100), 3);
/// ```
pub fn digit_count(n: usize) -> usize {
    n.to_string().len()
}

/// Checks if two floating-point values are approximately equal.
///
/// # Example
///
/// ```rust
/// use config::constants::approx_equal;
///
/// assert!(approx_equal(1.0, 1.0 + 1e-11));
/// assert!(!approx_equal(1.0, 1.1));
/// ```
#[inline]
pub fn approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Checks if a floating-point value is approximately zero.
#[inline]
pub fn approx_zero(value: f64) -> bool {
    value.abs() < EPSILON
}
