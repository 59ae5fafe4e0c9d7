use {
    super::manager::ManagerId,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Stable identifier of a player in the catalog.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Squad position a player occupies. Every player belongs to exactly one
/// position and every roster has a fixed limit per position.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Position {
    Gkp,
    Def,
    Mid,
    Fwd,
}

impl Position {
    pub const ALL: [Self; 4] = [Self::Gkp, Self::Def, Self::Mid, Self::Fwd];
}

/// A biddable unit of the catalog. Acquired by at most one manager; once
/// drafted it stays immutable until an administrative full reset.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub first_name: String,
    pub second_name: String,
    /// Short display name used in broadcasts.
    pub web_name: String,
    pub position: Position,
    /// Short code of the club the player plays for.
    pub team: String,
    /// List price from the upstream catalog, for display only. Bids are
    /// integer budget units and are not related to this value.
    pub now_cost: f64,
    #[serde(default)]
    pub drafted: bool,
    #[serde(default)]
    pub final_bid: Option<u64>,
    #[serde(default)]
    pub acquired_by: Option<ManagerId>,
}
