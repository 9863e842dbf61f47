//! The RL state representation used as the Q-table lookup key.

use serde::{Deserialize, Serialize};

/// Maximum number of simultaneously active delivery points.
pub const MAX_DELIVERIES: usize = 3;

/// Padding value for unused delivery-corner slots.
const UNUSED_CORNER: u8 = u8::MAX;

/// The discrete RL state: drone position, cargo/flight mode, per-delivery
/// completion, battery bucket, and the corner indices of this episode's
/// delivery points.
///
/// The record is fixed-size and hashable across episodes regardless of how
/// many deliveries are active: `n_deliveries` tags the active prefix of the
/// `delivered` and `delivery_corners` arrays, and the remaining slots hold
/// padding. Keys from episodes with different delivery counts therefore
/// never compare equal, even when the active prefixes match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub row: u8,
    pub col: u8,
    pub has_cargo: bool,
    pub is_flying: bool,
    /// Number of active delivery points this episode (1..=3).
    pub n_deliveries: u8,
    /// Completion flags, active in the first `n_deliveries` slots.
    pub delivered: [bool; MAX_DELIVERIES],
    /// Battery discretized to `min(battery / 10, 10)` (11 levels).
    pub battery_bucket: u8,
    /// Corner indices of the active delivery points, in selection order.
    pub delivery_corners: [u8; MAX_DELIVERIES],
}

impl StateKey {
    /// Builds a key from raw episode state.
    ///
    /// `delivered` and `corner_indices` must have equal length in `1..=3`.
    pub fn new(
        row: u8,
        col: u8,
        has_cargo: bool,
        is_flying: bool,
        delivered: &[bool],
        battery: i32,
        corner_indices: &[u8],
    ) -> Self {
        debug_assert_eq!(delivered.len(), corner_indices.len());
        debug_assert!((1..=MAX_DELIVERIES).contains(&delivered.len()));

        let mut flags = [false; MAX_DELIVERIES];
        let mut corners = [UNUSED_CORNER; MAX_DELIVERIES];
        for (i, (&d, &c)) in delivered.iter().zip(corner_indices).enumerate() {
            flags[i] = d;
            corners[i] = c;
        }

        Self {
            row,
            col,
            has_cargo,
            is_flying,
            n_deliveries: delivered.len() as u8,
            delivered: flags,
            battery_bucket: battery_bucket(battery),
            delivery_corners: corners,
        }
    }
}

/// Discretizes a battery percentage into one of 11 buckets.
pub fn battery_bucket(battery: i32) -> u8 {
    (battery.max(0) / 10).min(10) as u8
}
