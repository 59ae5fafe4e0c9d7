use model::{DraftStatus, ManagerId, Player, Snapshot, Timing};

/// The single authoritative draft state. Exactly one instance exists per
/// running auction and it is exclusively owned and mutated by the engine.
#[derive(Clone, Debug)]
pub struct DraftState {
    pub status: DraftStatus,
    pub paused: bool,
    /// Turn rotation, fixed once the draft starts. Non-empty while active.
    pub manager_order: Vec<ManagerId>,
    pub current_turn: usize,
    /// The player currently on the block. Absent between turns. The
    /// `highest_bidder` must be absent iff this is absent.
    pub current_player: Option<Player>,
    pub current_bid: u64,
    pub highest_bidder: Option<ManagerId>,
    /// Seconds remaining in the current phase. Zero triggers a transition.
    pub timer: u64,
    pub total_picks: u64,
    pub timing: Timing,
}

impl DraftState {
    pub fn new(timing: Timing) -> Self {
        Self {
            status: DraftStatus::Pending,
            paused: false,
            manager_order: Vec::new(),
            current_turn: 0,
            current_player: None,
            current_bid: 0,
            highest_bidder: None,
            timer: timing.nomination_time.as_secs(),
            total_picks: 0,
            timing,
        }
    }

    /// Re-hydrates a loaded snapshot. The current player record is looked up
    /// from the catalog by the caller since the snapshot only stores its id.
    pub fn from_snapshot(snapshot: Snapshot, current_player: Option<Player>) -> Self {
        Self {
            status: snapshot.status,
            paused: snapshot.paused,
            manager_order: snapshot.manager_order,
            current_turn: snapshot.current_turn,
            current_player,
            current_bid: snapshot.current_bid,
            highest_bidder: snapshot.highest_bidder,
            timer: snapshot.timer,
            total_picks: snapshot.total_picks,
            timing: snapshot.timing,
        }
    }

    /// Recovers a loaded snapshot at startup. An in-flight auction comes
    /// back paused; the countdown is only rearmed by an explicit admin
    /// resume, never automatically on boot.
    pub fn recover(snapshot: Snapshot, current_player: Option<Player>) -> Self {
        let mut state = Self::from_snapshot(snapshot, current_player);
        if state.status == DraftStatus::Active {
            state.paused = true;
        }
        state
    }

    /// The durable form of this state. Excludes the hydrated player record.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            paused: self.paused,
            manager_order: self.manager_order.clone(),
            current_turn: self.current_turn,
            current_player: self.current_player.as_ref().map(|player| player.id.clone()),
            current_bid: self.current_bid,
            highest_bidder: self.highest_bidder.clone(),
            timer: self.timer,
            total_picks: self.total_picks,
            timing: self.timing,
        }
    }

    /// The manager whose turn it is to nominate.
    pub fn current_manager(&self) -> Option<&ManagerId> {
        self.manager_order.get(self.current_turn)
    }

    pub fn advance_turn(&mut self) {
        if !self.manager_order.is_empty() {
            self.current_turn = (self.current_turn + 1) % self.manager_order.len();
        }
    }

    /// Drops the player on the block together with its bid and bidder so the
    /// "highest bidder absent iff no player on the block" invariant holds.
    pub fn clear_auction(&mut self) {
        self.current_player = None;
        self.current_bid = 0;
        self.highest_bidder = None;
    }
}

/// Draws a uniformly random permutation of the given manager ids using an
/// explicit Fisher-Yates shuffle. The random source is injected so tests can
/// pin the turn order with a seeded rng.
pub fn shuffled_order<R: rand::Rng>(mut ids: Vec<ManagerId>, rng: &mut R) -> Vec<ManagerId> {
    for i in (1..ids.len()).rev() {
        let j = rng.gen_range(0..=i);
        ids.swap(i, j);
    }
    ids
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{SeedableRng, rngs::StdRng},
        std::collections::BTreeSet,
    };

    fn ids(n: usize) -> Vec<ManagerId> {
        (0..n).map(|i| ManagerId(format!("manager-{i}"))).collect()
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let order = shuffled_order(ids(10), &mut rng);
        assert_eq!(order.len(), 10);
        assert_eq!(
            order.iter().collect::<BTreeSet<_>>(),
            ids(10).iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn shuffle_is_deterministic_for_a_seed() {
        let first = shuffled_order(ids(10), &mut StdRng::seed_from_u64(42));
        let second = shuffled_order(ids(10), &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn turn_rotation_wraps() {
        let mut state = DraftState::new(Timing::default());
        state.manager_order = ids(3);
        state.current_turn = 2;
        state.advance_turn();
        assert_eq!(state.current_turn, 0);
    }

    #[test]
    fn clearing_the_block_drops_bidder_and_bid() {
        let mut state = DraftState::new(Timing::default());
        state.current_bid = 50;
        state.highest_bidder = Some("somebody".into());
        state.clear_auction();
        assert_eq!(state.current_bid, 0);
        assert!(state.highest_bidder.is_none());
        assert!(state.current_player.is_none());
    }

    #[test]
    fn recovery_of_an_active_draft_comes_back_paused() {
        let mut snapshot = DraftState::new(Timing::default()).snapshot();
        snapshot.status = DraftStatus::Active;
        snapshot.timer = 17;
        let state = DraftState::recover(snapshot, None);
        assert!(state.paused);
        assert_eq!(state.timer, 17);

        let mut snapshot = DraftState::new(Timing::default()).snapshot();
        snapshot.status = DraftStatus::Pending;
        assert!(!DraftState::recover(snapshot, None).paused);
    }

    #[test]
    fn snapshot_round_trip_keeps_player_id_only() {
        let mut state = DraftState::new(Timing::default());
        state.status = DraftStatus::Active;
        state.manager_order = ids(2);
        state.current_player = Some(Player {
            id: "p1".into(),
            first_name: "Erling".to_string(),
            second_name: "Haaland".to_string(),
            web_name: "Haaland".to_string(),
            position: model::Position::Fwd,
            team: "MCI".to_string(),
            now_cost: 14.1,
            drafted: false,
            final_bid: None,
            acquired_by: None,
        });
        state.current_bid = 120;
        state.highest_bidder = Some("manager-0".into());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.current_player, Some("p1".into()));

        let restored = DraftState::from_snapshot(snapshot, state.current_player.clone());
        assert_eq!(restored.current_bid, 120);
        assert_eq!(restored.current_player, state.current_player);
    }
}
