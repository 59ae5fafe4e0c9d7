use {
    anyhow::{Context, Result},
    model::{Manager, ManagerId, Player, PositionCounts},
    serde::Deserialize,
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
    },
};

/// Identity of a manager as listed in the seed file. Budget, quota and
/// ownership are derived from the configured defaults, not seeded.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seed {
    id: ManagerId,
    name: String,
    email: String,
    #[serde(default)]
    is_admin: bool,
}

/// The participant roster. Doubles as the identity collaborator since the
/// admin flag lives on the manager record.
///
/// Records are mutated only through [`Roster::apply_allocation`] and
/// [`Roster::reset_all`]; every mutation persists the whole roster as one
/// JSON document next to the draft snapshot.
#[derive(Debug)]
pub struct Roster {
    path: PathBuf,
    managers: BTreeMap<ManagerId, Manager>,
}

impl Roster {
    /// Loads the persisted roster, falling back to the seed file for a fresh
    /// data directory. An empty roster is allowed; starting the draft is
    /// rejected until managers exist.
    pub async fn load_or_seed(
        data_dir: &Path,
        seed: Option<&Path>,
        budget: u64,
        quota: u32,
    ) -> Result<Self> {
        let path = data_dir.join("managers.json");
        match tokio::fs::read(&path).await {
            Ok(raw) => {
                let records: Vec<Manager> =
                    serde_json::from_slice(&raw).context("parse roster")?;
                return Ok(Self::from_records(path, records));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err).context("read roster"),
        }

        let records = match seed {
            Some(seed) => {
                let raw = tokio::fs::read(seed)
                    .await
                    .with_context(|| format!("read roster seed {seed:?}"))?;
                let seeds: Vec<Seed> = serde_json::from_slice(&raw).context("parse roster seed")?;
                seeds
                    .into_iter()
                    .map(|seed| Manager {
                        id: seed.id,
                        name: seed.name,
                        email: seed.email,
                        is_admin: seed.is_admin,
                        budget,
                        slots_remaining: quota,
                        position_counts: PositionCounts::default(),
                        players_owned: Vec::new(),
                    })
                    .collect()
            }
            None => {
                tracing::warn!("no roster found and no seed configured, starting empty");
                Vec::new()
            }
        };

        let roster = Self::from_records(path, records);
        roster.persist().await?;
        Ok(roster)
    }

    pub fn from_records(path: PathBuf, records: Vec<Manager>) -> Self {
        Self {
            path,
            managers: records
                .into_iter()
                .map(|manager| (manager.id.clone(), manager))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn ids(&self) -> Vec<ManagerId> {
        self.managers.keys().cloned().collect()
    }

    pub fn get(&self, id: &ManagerId) -> Option<&Manager> {
        self.managers.get(id)
    }

    pub fn exists(&self, id: &ManagerId) -> bool {
        self.managers.contains_key(id)
    }

    pub fn is_admin(&self, id: &ManagerId) -> bool {
        self.managers
            .get(id)
            .is_some_and(|manager| manager.is_admin)
    }

    pub fn name_of(&self, id: &ManagerId) -> Option<String> {
        self.managers.get(id).map(|manager| manager.name.clone())
    }

    /// Whether every manager has filled their roster quota. This is the
    /// draft's termination condition.
    pub fn all_done(&self) -> bool {
        !self.managers.is_empty()
            && self
                .managers
                .values()
                .all(|manager| manager.slots_remaining == 0)
    }

    /// Books a won auction against the winner: debits the budget, consumes a
    /// roster slot, bumps the position counter and records ownership.
    ///
    /// The budget and slot checks were already enforced at bid acceptance;
    /// failing them here means the state machine's guards were violated, so
    /// this fails loudly before mutating instead of saturating. Does not
    /// persist; the caller follows up with [`Roster::persist`] and treats a
    /// write failure as reportable, not as a rollback.
    pub fn book_allocation(
        &mut self,
        winner: &ManagerId,
        player: &Player,
        bid: u64,
    ) -> Result<()> {
        let manager = self
            .managers
            .get_mut(winner)
            .with_context(|| format!("allocation winner {winner} not in roster"))?;
        let budget = manager
            .budget
            .checked_sub(bid)
            .context("allocation would overdraw the winner's budget")?;
        let slots_remaining = manager
            .slots_remaining
            .checked_sub(1)
            .context("allocation for a manager with no open slots")?;
        manager.budget = budget;
        manager.slots_remaining = slots_remaining;
        manager.position_counts.bump(player.position);
        manager.players_owned.push(player.id.clone());
        Ok(())
    }

    /// Restores every manager to the initial budget and quota with empty
    /// ownership. Part of the administrative full reset.
    pub async fn reset_all(&mut self, budget: u64, quota: u32) -> Result<()> {
        for manager in self.managers.values_mut() {
            manager.budget = budget;
            manager.slots_remaining = quota;
            manager.position_counts = PositionCounts::default();
            manager.players_owned.clear();
        }
        self.persist().await
    }

    pub async fn persist(&self) -> Result<()> {
        let records: Vec<&Manager> = self.managers.values().collect();
        let raw = serde_json::to_vec_pretty(&records).context("serialize roster")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await.context("write roster")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("replace roster")?;
        Ok(())
    }
}
