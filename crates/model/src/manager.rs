use {
    super::player::{PlayerId, Position},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Stable identifier of a participating manager, handed out by the external
/// identity provider.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ManagerId(pub String);

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManagerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Number of players a manager owns per position.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PositionCounts {
    pub gkp: u32,
    pub def: u32,
    pub mid: u32,
    pub fwd: u32,
}

impl PositionCounts {
    pub fn new(gkp: u32, def: u32, mid: u32, fwd: u32) -> Self {
        Self { gkp, def, mid, fwd }
    }

    pub fn get(&self, position: Position) -> u32 {
        match position {
            Position::Gkp => self.gkp,
            Position::Def => self.def,
            Position::Mid => self.mid,
            Position::Fwd => self.fwd,
        }
    }

    pub fn bump(&mut self, position: Position) {
        let count = match position {
            Position::Gkp => &mut self.gkp,
            Position::Def => &mut self.def,
            Position::Mid => &mut self.mid,
            Position::Fwd => &mut self.fwd,
        };
        *count += 1;
    }

    pub fn total(&self) -> u32 {
        Position::ALL.iter().map(|position| self.get(*position)).sum()
    }
}

/// An auction participant with budget and a roster quota.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub id: ManagerId,
    pub name: String,
    pub email: String,
    /// Admin managers may run the draft (start, restart, pause, skip, close).
    #[serde(default)]
    pub is_admin: bool,
    pub budget: u64,
    /// Roster slots still to be filled. The draft completes once this reaches
    /// zero for every manager.
    pub slots_remaining: u32,
    #[serde(default)]
    pub position_counts: PositionCounts,
    #[serde(default)]
    pub players_owned: Vec<PlayerId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_indexed_by_position() {
        let mut counts = PositionCounts::default();
        counts.bump(Position::Def);
        counts.bump(Position::Def);
        counts.bump(Position::Fwd);
        assert_eq!(counts.get(Position::Def), 2);
        assert_eq!(counts.get(Position::Fwd), 1);
        assert_eq!(counts.get(Position::Gkp), 0);
        assert_eq!(counts.total(), 3);
    }
}
