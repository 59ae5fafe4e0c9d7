use {
    super::{draft::Snapshot, player::Player},
    serde::{Deserialize, Serialize},
};

/// Outbound notification pushed to all observers of the draft.
///
/// `State` broadcasts fully supersede each other and are observed in the
/// order the transitions were applied. `Relief` and `Error` are transient
/// and never part of the durable snapshot.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// The full current draft state, including the hydrated record of the
    /// player on the block.
    #[serde(rename_all = "camelCase")]
    State {
        snapshot: Snapshot,
        current_player: Option<Player>,
    },
    /// Forced pause between rounds. Announces who nominates next.
    #[serde(rename_all = "camelCase")]
    Relief {
        seconds: u64,
        up_next: Option<String>,
        player: Option<String>,
    },
    /// Systemic failure visible to everyone (persistence, catalog).
    /// Validation failures are answered to the requesting actor only and do
    /// not show up here.
    Error { message: String },
}
