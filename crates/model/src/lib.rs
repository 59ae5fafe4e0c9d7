//! Contains models that are shared between the draft engine and the adapters
//! around it (transport, persistence, catalog import).

pub mod draft;
pub mod event;
pub mod manager;
pub mod player;

pub use {
    draft::{DraftStatus, Snapshot, Timing},
    event::Event,
    manager::{Manager, ManagerId, PositionCounts},
    player::{Player, PlayerId, Position},
};
