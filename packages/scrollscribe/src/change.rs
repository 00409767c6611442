//! Pixel-exact change detection between successive captures.
use crate::capture::Capture;

/// Returns whether `curr` differs from `prev`.
///
/// The first capture of a run (`prev == None`) always counts as changed.
///
/// # Panics
///
/// Panics when both captures exist and their dimensions differ. Captures of a
/// run come from one fixed region, so a mismatch is a bug in the capture
/// adapter.
pub fn changed(prev: Option<&Capture>, curr: &Capture) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    assert_eq!(
        prev.dimensions(),
        curr.dimensions(),
        "captures of one run must share the region's dimensions"
    );
    prev.pixels() != curr.pixels()
}
