use {
    super::{manager::ManagerId, player::PlayerId},
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Top level lifecycle of the auction. `Completed` is terminal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

/// Durations controlling the phase lengths of the draft.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    /// How long the current manager has to nominate a player.
    #[serde(with = "humantime_serde")]
    pub nomination_time: Duration,
    /// How long an auction runs after a nomination.
    #[serde(with = "humantime_serde")]
    pub auction_time: Duration,
    /// Minimum time left on the clock after any accepted bid. A late bid
    /// never shortens the countdown, it only guarantees this floor.
    #[serde(with = "humantime_serde")]
    pub min_respond_time: Duration,
    /// Forced pause between auction rounds during which no input is accepted.
    #[serde(with = "humantime_serde")]
    pub relief_time: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            nomination_time: Duration::from_secs(30),
            auction_time: Duration::from_secs(30),
            min_respond_time: Duration::from_secs(10),
            relief_time: Duration::from_secs(3),
        }
    }
}

/// The durable serialized form of the draft state used for crash recovery.
///
/// Derived data is excluded: the full record of the player currently on the
/// block is re-hydrated from the catalog by id when the snapshot is loaded.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub status: DraftStatus,
    #[serde(default)]
    pub paused: bool,
    pub manager_order: Vec<ManagerId>,
    pub current_turn: usize,
    pub current_player: Option<PlayerId>,
    pub current_bid: u64,
    pub highest_bidder: Option<ManagerId>,
    /// Seconds remaining in the current phase.
    pub timer: u64,
    pub total_picks: u64,
    #[serde(default)]
    pub timing: Timing,
}
