//! Internal length units and unit-suffix handling.
//!
//! All board coordinates and distances are stored as signed 64-bit
//! nanometres ("internal units", IU). Rule files and expressions may write
//! lengths with a unit suffix; those are normalized to IU at compile time.

/// Internal units per millimetre.
pub const IU_PER_MM: i64 = 1_000_000;

/// Internal units per mil (1/1000 inch).
pub const IU_PER_MIL: i64 = 25_400;

/// Accepted unit suffixes and their scale in internal units.
pub const UNIT_SUFFIXES: &[(&str, f64)] = &[
    ("nm", 1.0),
    ("um", 1_000.0),
    ("mm", IU_PER_MM as f64),
    ("mil", IU_PER_MIL as f64),
    ("in", 25_400_000.0),
];

/// Look up the IU scale factor for a unit suffix.
#[must_use]
pub fn suffix_scale(suffix: &str) -> Option<f64> {
    UNIT_SUFFIXES
        .iter()
        .find(|(s, _)| *s == suffix)
        .map(|(_, scale)| *scale)
}

/// Format an internal-unit length as millimetres for human-readable
/// messages, trimming trailing zeros ("0.15 mm", "2 mm").
#[must_use]
pub fn to_mm_string(iu: i64) -> String {
    let mm = iu as f64 / IU_PER_MM as f64;
    let mut s = format!("{mm:.6}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    format!("{s} mm")
}

/// Convert a millimetre value to internal units, rounding to the nearest IU.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn from_mm(mm: f64) -> i64 {
    (mm * IU_PER_MM as f64).round() as i64
}
