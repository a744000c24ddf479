// Sync adapter configuration.
//
// `SyncConfig` is plain data, deserializable from JSON so a game can ship
// it next to its other tuning files. Every participant in a room must use
// the same grid size: the host validates follower placements against its
// own grid, and snapshot tower coordinates are only meaningful on a grid of
// the same shape.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Tower grid width in cells.
    pub width: u32,
    /// Tower grid height in cells (one lane per row).
    pub height: u32,
    /// Wave number after a reset.
    pub starting_wave: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 8,
            starting_wave: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"width": 10}"#).unwrap();
        assert_eq!(
            config,
            SyncConfig {
                width: 10,
                ..SyncConfig::default()
            }
        );
    }
}
