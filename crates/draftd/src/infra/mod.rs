pub mod catalog;
pub mod persistence;
pub mod roster;

pub use {
    catalog::{BootstrapApi, Catalog, PlayerSource},
    persistence::Snapshots,
    roster::Roster,
};
