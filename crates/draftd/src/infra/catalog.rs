use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    model::{ManagerId, Player, PlayerId},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
        sync::Arc,
    },
    url::Url,
};

/// Where the player catalog comes from. Hidden behind a trait so the engine
/// never touches the network and tests can inject fixtures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Player>>;
}

/// Fetches the bootstrap-static document of the upstream fantasy API and
/// converts its elements into catalog players.
pub struct BootstrapApi {
    url: Url,
    client: reqwest::Client,
}

impl BootstrapApi {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PlayerSource for BootstrapApi {
    async fn fetch(&self) -> Result<Vec<Player>> {
        let document: dto::BootstrapStatic = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .context("fetch bootstrap document")?
            .error_for_status()
            .context("bootstrap document status")?
            .json()
            .await
            .context("decode bootstrap document")?;
        document.into_players()
    }
}

mod dto {
    //! Subset of the upstream bootstrap-static document this service reads.

    use {
        super::*,
        model::Position,
        serde::Deserialize,
        std::collections::HashMap,
    };

    #[derive(Debug, Deserialize)]
    pub struct BootstrapStatic {
        pub elements: Vec<Element>,
        pub teams: Vec<Team>,
        pub element_types: Vec<ElementType>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Element {
        pub id: u64,
        pub first_name: String,
        pub second_name: String,
        pub web_name: String,
        pub element_type: u64,
        pub team: u64,
        /// List price in tenths of a unit.
        pub now_cost: u64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Team {
        pub id: u64,
        pub short_name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ElementType {
        pub id: u64,
        pub singular_name_short: String,
    }

    impl BootstrapStatic {
        pub fn into_players(self) -> Result<Vec<Player>> {
            let teams: HashMap<u64, String> = self
                .teams
                .into_iter()
                .map(|team| (team.id, team.short_name))
                .collect();
            let positions: HashMap<u64, Position> = self
                .element_types
                .into_iter()
                .map(|element_type| {
                    let position = element_type
                        .singular_name_short
                        .parse()
                        .with_context(|| {
                            format!("unknown position {:?}", element_type.singular_name_short)
                        })?;
                    Ok((element_type.id, position))
                })
                .collect::<Result<_>>()?;

            self.elements
                .into_iter()
                .map(|element| {
                    let position = *positions
                        .get(&element.element_type)
                        .with_context(|| format!("element {} has unknown type", element.id))?;
                    let team = teams
                        .get(&element.team)
                        .with_context(|| format!("element {} has unknown team", element.id))?
                        .clone();
                    Ok(Player {
                        id: PlayerId(element.id.to_string()),
                        first_name: element.first_name,
                        second_name: element.second_name,
                        web_name: element.web_name,
                        position,
                        team,
                        now_cost: element.now_cost as f64 / 10.0,
                        drafted: false,
                        final_bid: None,
                        acquired_by: None,
                    })
                })
                .collect()
        }
    }
}

/// The player catalog. Mutated only by [`Catalog::mark_drafted`] and the
/// administrative [`Catalog::reset_and_reimport`]; persisted as one JSON
/// document next to the draft snapshot.
pub struct Catalog {
    path: PathBuf,
    players: BTreeMap<PlayerId, Player>,
    source: Arc<dyn PlayerSource>,
}

impl Catalog {
    /// Loads the persisted catalog, importing from the source on a fresh
    /// data directory.
    pub async fn load_or_import(data_dir: &Path, source: Arc<dyn PlayerSource>) -> Result<Self> {
        let path = data_dir.join("players.json");
        let players = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let records: Vec<Player> =
                    serde_json::from_slice(&raw).context("parse catalog")?;
                records
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no catalog found, importing from source");
                source.fetch().await.context("import catalog")?
            }
            Err(err) => return Err(err).context("read catalog"),
        };
        let catalog = Self::from_records(path, players, source);
        catalog.persist().await?;
        Ok(catalog)
    }

    pub fn from_records(
        path: PathBuf,
        records: Vec<Player>,
        source: Arc<dyn PlayerSource>,
    ) -> Self {
        Self {
            path,
            players: records
                .into_iter()
                .map(|player| (player.id.clone(), player))
                .collect(),
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn find(&self, id: &PlayerId) -> Option<Player> {
        self.players.get(id).cloned()
    }

    /// Marks a player as acquired. Persistence failures are returned but the
    /// in-memory record keeps the allocation.
    pub async fn mark_drafted(
        &mut self,
        id: &PlayerId,
        final_bid: u64,
        acquired_by: &ManagerId,
    ) -> Result<()> {
        let player = self
            .players
            .get_mut(id)
            .with_context(|| format!("drafted player {id} not in catalog"))?;
        player.drafted = true;
        player.final_bid = Some(final_bid);
        player.acquired_by = Some(acquired_by.clone());
        self.persist().await
    }

    /// Replaces the whole catalog with a fresh import, dropping every
    /// drafted flag. Part of the administrative full reset.
    pub async fn reset_and_reimport(&mut self) -> Result<()> {
        let records = self.source.fetch().await.context("reimport catalog")?;
        self.players = records
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect();
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let records: Vec<&Player> = self.players.values().collect();
        let raw = serde_json::to_vec(&records).context("serialize catalog")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await.context("write catalog")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("replace catalog")?;
        Ok(())
    }
}
