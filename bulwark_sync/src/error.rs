// Refusals for local player actions.

use thiserror::Error;

/// Why a local place/remove click did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("cell ({x}, {y}) is outside the grid")]
    OutOfBounds { x: u32, y: u32 },
    #[error("no tower at ({x}, {y})")]
    EmptyCell { x: u32, y: u32 },
    #[error("cell ({x}, {y}) holds another player's tower")]
    CellOccupied { x: u32, y: u32 },
    #[error("tower at ({x}, {y}) belongs to another player")]
    NotOwner { x: u32, y: u32 },
    #[error("no tower of kind {stats_index} left in the inventory")]
    OutOfStock { stats_index: u32 },
}

/// A host simulation hook was called on a follower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("only the host or an offline game may drive the simulation")]
pub struct NotInControl;
