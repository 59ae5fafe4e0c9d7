use model::{Manager, Player, Position, PositionCounts};

/// Economic rules of the auction.
#[derive(Clone, Copy, Debug)]
pub struct Rules {
    /// Bids must be positive multiples of this.
    pub min_increment: u64,
    /// Budget a manager must retain for every slot still to be filled after
    /// the current one. Caps the maximum permissible bid at
    /// `budget - (slots_remaining - 1) * min_reserve` so nobody can bid
    /// themselves into a corner where the roster can no longer be completed.
    pub min_reserve: u64,
    /// Fixed per-position roster limits.
    pub position_limits: PositionCounts,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_increment: 10,
            min_reserve: 10,
            position_limits: PositionCounts::new(2, 5, 5, 3),
        }
    }
}

impl Rules {
    /// The most a manager may bid without becoming mathematically unable to
    /// fill the rest of their roster at the minimum reserve.
    pub fn max_bid(&self, manager: &Manager) -> u64 {
        let reserved = u64::from(manager.slots_remaining.saturating_sub(1)) * self.min_reserve;
        manager.budget.saturating_sub(reserved)
    }
}

/// Reason a request was turned down. Reported only to the requesting actor;
/// the draft state is unchanged whenever one of these is returned.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("unauthorized: admin privileges required")]
    NotAdmin,
    #[error("manager not found")]
    UnknownManager,
    #[error("player not found")]
    UnknownPlayer,
    #[error("draft is not active")]
    NotActive,
    #[error("draft already started")]
    AlreadyStarted,
    #[error("no managers registered")]
    EmptyRoster,
    #[error("draft is paused")]
    Paused,
    #[error("draft is not paused")]
    NotPaused,
    #[error("draft is already paused")]
    AlreadyPaused,
    #[error("waiting for the next turn to begin")]
    Relief,
    #[error("not your turn to nominate")]
    NotYourTurn,
    #[error("a player is already up for auction")]
    AuctionInProgress,
    #[error("no active auction or no bidder")]
    NoAuction,
    #[error("invalid bid: wrong player or insufficient amount")]
    WrongPlayerOrAmount,
    #[error("player already drafted")]
    PlayerDrafted,
    #[error("no roster slots remaining")]
    RosterFull,
    #[error("{0} position limit ({1}) reached")]
    PositionLimit(Position, u32),
    #[error("bid must be a positive multiple of {0}")]
    BidIncrement(u64),
    #[error("bid exceeds the maximum permissible bid of {0}")]
    BidTooHigh(u64),
    #[error("internal error, the draft state was not changed")]
    Internal,
    #[error("draft engine is unavailable")]
    Unavailable,
}

/// Checks a proposed price against the manager's roster and budget. Pure
/// function of its inputs; nomination and raising a bid run the exact same
/// rule set, they only differ in the turn/auction guards applied by the
/// engine before calling this.
pub fn check(manager: &Manager, player: &Player, bid: u64, rules: &Rules) -> Result<(), Rejection> {
    if player.drafted {
        return Err(Rejection::PlayerDrafted);
    }
    if manager.slots_remaining == 0 {
        return Err(Rejection::RosterFull);
    }
    let limit = rules.position_limits.get(player.position);
    if manager.position_counts.get(player.position) >= limit {
        return Err(Rejection::PositionLimit(player.position, limit));
    }
    if bid == 0 || bid % rules.min_increment != 0 {
        return Err(Rejection::BidIncrement(rules.min_increment));
    }
    let max_bid = rules.max_bid(manager);
    if bid > max_bid {
        return Err(Rejection::BidTooHigh(max_bid));
    }
    Ok(())
}
