// Canonical half-hour time grid and run-length expansion.
//
// The facility renders one row per 30-minute slot. A closed span is encoded
// on its first slot only, as a marker whose height covers the whole span;
// `expand_run_lengths` turns that per-slot code sequence back into booleans.

use once_cell::sync::Lazy;

/// A slot is identified by its start-time label, e.g. "07:00".
pub type TimeSlot = String;

/// Default operating window: 07:00 through 22:30 inclusive, 30-minute steps.
/// Individual facilities may render a narrower axis; decoders always prefer
/// the axis extracted from the page itself.
pub static DEFAULT_SLOTS: Lazy<Vec<TimeSlot>> = Lazy::new(|| slot_labels(7, 23));

/// Ordered slot labels for `[from_hour, to_hour)` at 30-minute granularity.
pub fn slot_labels(from_hour: u32, to_hour: u32) -> Vec<TimeSlot> {
    let mut labels = Vec::new();
    for hour in from_hour..to_hour {
        labels.push(format!("{hour:02}:00"));
        labels.push(format!("{hour:02}:30"));
    }
    labels
}

/// Expand per-slot closure codes into an availability sequence.
///
/// A code of 0 means the slot is open. A code N > 0 at position i means slots
/// i..i+N-1 are closed and scanning resumes at i+N; codes encountered inside
/// a prior run describe the same visual span and are ignored. Runs that would
/// overrun the axis are clamped. The output always has the input's length.
pub fn expand_run_lengths(codes: &[u32]) -> Vec<bool> {
    let mut open = vec![false; codes.len()];
    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            0 => {
                open[i] = true;
                i += 1;
            }
            n => {
                i = (i + n as usize).min(codes.len());
            }
        }
    }
    open
}
