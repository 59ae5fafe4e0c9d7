use {
    crate::{
        domain::{
            draft::{self, DraftState},
            validation::{self, Rejection, Rules},
        },
        infra::{Catalog, Roster, Snapshots},
    },
    anyhow::Result,
    model::{DraftStatus, Event, ManagerId, Player, PlayerId},
    prometheus::{IntCounter, IntCounterVec},
    rand::rngs::StdRng,
    std::pin::Pin,
    tokio::{
        sync::{broadcast, mpsc, oneshot},
        time::{self, Duration, Instant, Interval, MissedTickBehavior, Sleep},
    },
    tracing::Instrument,
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "draft")]
struct Metrics {
    /// Commands processed, by kind and outcome.
    #[metric(labels("command", "result"))]
    commands: IntCounterVec,

    /// Countdown ticks applied.
    ticks: IntCounter,

    /// Completed allocations.
    allocations: IntCounter,

    /// Snapshot writes that failed.
    snapshot_write_failures: IntCounter,
}

/// A mutating request against the draft, submitted on behalf of an actor.
#[derive(Clone, Debug)]
pub enum Command {
    Start,
    Restart,
    Nominate { player: PlayerId, bid: u64 },
    Bid { player: PlayerId, bid: u64 },
    Skip,
    Close,
    Pause,
    Resume,
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Restart => "restart",
            Self::Nominate { .. } => "nominate",
            Self::Bid { .. } => "bid",
            Self::Skip => "skip",
            Self::Close => "close",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

struct Envelope {
    actor: ManagerId,
    command: Command,
    reply: oneshot::Sender<Result<(), Rejection>>,
}

/// Submits commands into the engine's mailbox. Cheap to clone; transport
/// adapters hold one of these per connection.
#[derive(Clone)]
pub struct Handle {
    commands: mpsc::Sender<Envelope>,
}

impl Handle {
    /// Sends the command and waits for the engine's verdict. Rejections are
    /// scoped to this caller; the broadcast channel never sees them.
    pub async fn submit(&self, actor: ManagerId, command: Command) -> Result<(), Rejection> {
        let (reply, verdict) = oneshot::channel();
        self.commands
            .send(Envelope {
                actor,
                command,
                reply,
            })
            .await
            .map_err(|_| Rejection::Unavailable)?;
        verdict.await.map_err(|_| Rejection::Unavailable)?
    }
}

/// Economic configuration the engine needs beyond the per-draft timing.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    pub rules: Rules,
    /// Budget every manager starts with and is reset to.
    pub starting_budget: u64,
    /// Roster slots every manager has to fill.
    pub roster_quota: u32,
}

/// What the countdown does once a relief interval ends.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReliefKind {
    /// A new round: the timer restarts from the nomination time.
    NextTurn,
    /// Back from a pause: the countdown resumes from the preserved value.
    Resume,
}

struct Relief {
    sleep: Pin<Box<Sleep>>,
    kind: ReliefKind,
}

enum TimerEvent {
    Tick,
    ReliefElapsed,
}

/// The draft coordination engine. Owns the authoritative [`DraftState`] and
/// serializes every mutation, inbound commands and timer ticks alike,
/// through a single task so that no two transitions ever interleave.
pub struct Engine {
    state: DraftState,
    roster: Roster,
    catalog: Catalog,
    snapshots: Snapshots,
    events: broadcast::Sender<Event>,
    settings: Settings,
    rng: StdRng,
    ticker: Option<Interval>,
    relief: Option<Relief>,
    metrics: &'static Metrics,
}

impl Engine {
    pub fn new(
        state: DraftState,
        roster: Roster,
        catalog: Catalog,
        snapshots: Snapshots,
        events: broadcast::Sender<Event>,
        settings: Settings,
        rng: StdRng,
    ) -> Self {
        Self {
            state,
            roster,
            catalog,
            snapshots,
            events,
            settings,
            rng,
            ticker: None,
            relief: None,
            metrics: Metrics::instance(observe::metrics::get_storage_registry()).unwrap(),
        }
    }

    /// Spawns the engine's mailbox task. Dropping every [`Handle`] shuts the
    /// engine down after a final snapshot save.
    pub fn spawn(self) -> (Handle, tokio::task::JoinHandle<()>) {
        let (commands, mailbox) = mpsc::channel(64);
        let join = tokio::spawn(
            self.run(mailbox)
                .instrument(tracing::info_span!("draft_engine")),
        );
        (Handle { commands }, join)
    }

    async fn run(mut self, mut mailbox: mpsc::Receiver<Envelope>) {
        loop {
            tokio::select! {
                envelope = mailbox.recv() => match envelope {
                    Some(Envelope { actor, command, reply }) => {
                        let verdict = self.handle(&actor, command).await;
                        let _ = reply.send(verdict);
                    }
                    None => break,
                },
                event = Self::timer_event(&mut self.ticker, &mut self.relief) => match event {
                    TimerEvent::Tick => self.on_tick().await,
                    TimerEvent::ReliefElapsed => self.on_relief_elapsed().await,
                },
            }
        }
        if let Err(err) = self.snapshots.save(&self.state.snapshot()).await {
            tracing::error!(?err, "failed to save final snapshot");
        }
    }

    /// Resolves to the next timer-driven transition. The countdown and the
    /// relief interval are mutually exclusive; with neither armed this pends
    /// forever, leaving the mailbox as the only event source.
    async fn timer_event(
        ticker: &mut Option<Interval>,
        relief: &mut Option<Relief>,
    ) -> TimerEvent {
        match (ticker.as_mut(), relief.as_mut()) {
            (Some(ticker), None) => {
                ticker.tick().await;
                TimerEvent::Tick
            }
            (None, Some(relief)) => {
                relief.sleep.as_mut().await;
                TimerEvent::ReliefElapsed
            }
            _ => std::future::pending().await,
        }
    }

    async fn handle(&mut self, actor: &ManagerId, command: Command) -> Result<(), Rejection> {
        let label = command.label();
        let verdict = match command {
            Command::Start => self.start(actor).await,
            Command::Restart => self.restart(actor).await,
            Command::Nominate { player, bid } => self.nominate(actor, &player, bid).await,
            Command::Bid { player, bid } => self.place_bid(actor, &player, bid).await,
            Command::Skip => self.skip_turn(actor).await,
            Command::Close => self.close_bid(actor).await,
            Command::Pause => self.pause(actor).await,
            Command::Resume => self.resume(actor).await,
        };
        match &verdict {
            Ok(()) => {
                self.metrics
                    .commands
                    .with_label_values(&[label, "ok"])
                    .inc();
            }
            Err(rejection) => {
                tracing::debug!(%actor, command = label, %rejection, "command rejected");
                self.metrics
                    .commands
                    .with_label_values(&[label, "rejected"])
                    .inc();
            }
        }
        verdict
    }

    fn ensure_admin(&self, actor: &ManagerId) -> Result<(), Rejection> {
        if self.roster.is_admin(actor) {
            Ok(())
        } else {
            Err(Rejection::NotAdmin)
        }
    }

    /// Guards every bidding-phase input: the draft must be running and not
    /// inside the forced pause between rounds.
    fn ensure_live(&self) -> Result<(), Rejection> {
        if self.state.status != DraftStatus::Active {
            return Err(Rejection::NotActive);
        }
        if self.state.paused {
            return Err(Rejection::Paused);
        }
        if self.relief.is_some() {
            return Err(Rejection::Relief);
        }
        Ok(())
    }

    async fn start(&mut self, actor: &ManagerId) -> Result<(), Rejection> {
        self.ensure_admin(actor)?;
        if self.state.status != DraftStatus::Pending {
            return Err(Rejection::AlreadyStarted);
        }
        if self.roster.is_empty() {
            return Err(Rejection::EmptyRoster);
        }

        self.state.manager_order = draft::shuffled_order(self.roster.ids(), &mut self.rng);
        self.state.current_turn = 0;
        self.state.total_picks = 0;
        self.state.clear_auction();
        self.state.status = DraftStatus::Active;
        self.state.paused = false;
        self.state.timer = self.nomination_secs();
        tracing::info!(%actor, order = ?self.state.manager_order, "draft started");

        self.save_and_publish().await;
        self.enter_relief(ReliefKind::NextTurn, None);
        Ok(())
    }

    async fn restart(&mut self, actor: &ManagerId) -> Result<(), Rejection> {
        self.ensure_admin(actor)?;
        self.stop_countdown();
        self.relief = None;
        if let Err(err) = self.snapshots.clear().await {
            self.report_systemic(&err, "failed to clear the draft snapshot");
        }
        self.state = DraftState::new(self.state.timing);
        if let Err(err) = self
            .roster
            .reset_all(self.settings.starting_budget, self.settings.roster_quota)
            .await
        {
            self.report_systemic(&err, "failed to reset the roster");
        }
        if let Err(err) = self.catalog.reset_and_reimport().await {
            self.report_systemic(&err, "failed to reimport the catalog");
        }
        tracing::info!(%actor, "draft restarted");
        self.save_and_publish().await;
        Ok(())
    }

    async fn nominate(
        &mut self,
        actor: &ManagerId,
        player: &PlayerId,
        bid: u64,
    ) -> Result<(), Rejection> {
        self.ensure_live()?;
        if self.state.current_player.is_some() {
            return Err(Rejection::AuctionInProgress);
        }
        if self.state.current_manager() != Some(actor) {
            return Err(Rejection::NotYourTurn);
        }
        let manager = self.roster.get(actor).ok_or(Rejection::UnknownManager)?;
        let player = self.catalog.find(player).ok_or(Rejection::UnknownPlayer)?;
        validation::check(manager, &player, bid, &self.settings.rules)?;

        tracing::info!(%actor, player = %player.web_name, bid, "player nominated");
        self.state.current_bid = bid;
        self.state.highest_bidder = Some(actor.clone());
        self.state.current_player = Some(player);
        self.state.timer = self.auction_secs();
        self.save_and_publish().await;
        Ok(())
    }

    async fn place_bid(
        &mut self,
        actor: &ManagerId,
        player: &PlayerId,
        bid: u64,
    ) -> Result<(), Rejection> {
        self.ensure_live()?;
        let on_block = match &self.state.current_player {
            Some(current) if current.id == *player && bid > self.state.current_bid => {
                current.clone()
            }
            // Wrong player and insufficient amount are deliberately one
            // rejection; the block may have moved on since the bidder chose.
            _ => return Err(Rejection::WrongPlayerOrAmount),
        };
        let manager = self.roster.get(actor).ok_or(Rejection::UnknownManager)?;
        validation::check(manager, &on_block, bid, &self.settings.rules)?;

        self.state.current_bid = bid;
        self.state.highest_bidder = Some(actor.clone());
        // A late bid never shortens the countdown, it only guarantees a
        // floor so the next bidder has time to respond.
        self.state.timer = self.state.timer.max(self.min_respond_secs());
        tracing::info!(
            %actor,
            player = %on_block.web_name,
            bid,
            timer = self.state.timer,
            "bid placed"
        );
        self.save_and_publish().await;
        Ok(())
    }

    async fn skip_turn(&mut self, actor: &ManagerId) -> Result<(), Rejection> {
        self.ensure_admin(actor)?;
        if self.state.status != DraftStatus::Active {
            return Err(Rejection::NotActive);
        }
        if self.state.current_player.is_some() {
            return Err(Rejection::AuctionInProgress);
        }
        tracing::info!(%actor, "turn skipped");
        self.next_turn(None).await;
        Ok(())
    }

    async fn close_bid(&mut self, actor: &ManagerId) -> Result<(), Rejection> {
        self.ensure_admin(actor)?;
        if self.state.status != DraftStatus::Active {
            return Err(Rejection::NotActive);
        }
        if self.state.current_player.is_none() || self.state.highest_bidder.is_none() {
            return Err(Rejection::NoAuction);
        }
        // Cancel the countdown before allocating so no stale tick can
        // observe this auction again.
        self.stop_countdown();
        match self.allocate().await {
            Ok(sold) => {
                tracing::info!(%actor, player = %sold.web_name, "bid closed");
                self.finish_round(Some(sold.web_name)).await;
                Ok(())
            }
            Err(err) => {
                self.report_systemic(&err, "allocation failed");
                Err(Rejection::Internal)
            }
        }
    }

    async fn pause(&mut self, actor: &ManagerId) -> Result<(), Rejection> {
        self.ensure_admin(actor)?;
        if self.state.status != DraftStatus::Active {
            return Err(Rejection::NotActive);
        }
        if self.state.paused {
            return Err(Rejection::AlreadyPaused);
        }
        self.stop_countdown();
        // Pausing inside the between-turns pause settles the timer to the
        // value the relief interval would have installed.
        if let Some(relief) = self.relief.take() {
            if relief.kind == ReliefKind::NextTurn {
                self.state.timer = self.nomination_secs();
            }
        }
        self.state.paused = true;
        tracing::info!(%actor, timer = self.state.timer, "draft paused");
        self.save_and_publish().await;
        Ok(())
    }

    async fn resume(&mut self, actor: &ManagerId) -> Result<(), Rejection> {
        self.ensure_admin(actor)?;
        if self.state.status != DraftStatus::Active {
            return Err(Rejection::NotActive);
        }
        if !self.state.paused {
            return Err(Rejection::NotPaused);
        }
        self.state.paused = false;
        tracing::info!(%actor, timer = self.state.timer, "draft resumed");
        self.save_and_publish().await;
        // Re-enter a relief interval, then continue the countdown from the
        // preserved timer value.
        self.enter_relief(ReliefKind::Resume, None);
        Ok(())
    }

    async fn on_tick(&mut self) {
        if self.state.status != DraftStatus::Active || self.state.paused || self.relief.is_some()
        {
            // A stale tick after a pause, a close or completion must not
            // apply a transition.
            self.stop_countdown();
            return;
        }
        self.metrics.ticks.inc();
        if self.state.timer > 0 {
            self.state.timer -= 1;
            self.save_and_publish().await;
            return;
        }

        // Time expired.
        if self.state.current_player.is_some() && self.state.highest_bidder.is_some() {
            match self.allocate().await {
                Ok(sold) => self.finish_round(Some(sold.web_name)).await,
                Err(err) => {
                    self.report_systemic(&err, "allocation failed");
                    self.next_turn(None).await;
                }
            }
        } else {
            // The nominator let the clock lapse; nomination is optional but
            // time-boxed.
            self.next_turn(None).await;
        }
    }

    async fn on_relief_elapsed(&mut self) {
        let Some(relief) = self.relief.take() else {
            return;
        };
        if self.state.status != DraftStatus::Active || self.state.paused {
            return;
        }
        if relief.kind == ReliefKind::NextTurn {
            self.state.timer = self.nomination_secs();
            self.save_and_publish().await;
        }
        self.start_countdown();
    }

    /// Atomic transfer of the player on the block to the highest bidder.
    /// The engine's guards make the preconditions unreachable; hitting one
    /// is a programming error that fails the operation without mutating
    /// anything.
    async fn allocate(&mut self) -> Result<Player> {
        let (player, winner) = match (&self.state.current_player, &self.state.highest_bidder) {
            (Some(player), Some(winner)) => (player.clone(), winner.clone()),
            _ => anyhow::bail!("allocation without a player and a bidder on the block"),
        };
        let bid = self.state.current_bid;
        self.roster.book_allocation(&winner, &player, bid)?;

        self.metrics.allocations.inc();
        self.state.total_picks += 1;
        tracing::info!(player = %player.web_name, %winner, bid, "player allocated");

        // Persistence failures are reported but never roll back the
        // in-memory allocation; memory stays authoritative until the next
        // good write.
        if let Err(err) = self.roster.persist().await {
            self.report_systemic(&err, "failed to persist the roster");
        }
        if let Err(err) = self.catalog.mark_drafted(&player.id, bid, &winner).await {
            self.report_systemic(&err, "failed to persist the catalog");
        }
        Ok(player)
    }

    /// Shared tail of an allocation, reached identically from an admin
    /// close and from timer expiry.
    async fn finish_round(&mut self, sold: Option<String>) {
        if self.roster.all_done() {
            self.complete().await;
        } else {
            self.next_turn(sold).await;
        }
    }

    async fn next_turn(&mut self, sold: Option<String>) {
        self.state.advance_turn();
        self.state.clear_auction();
        if self.roster.all_done() {
            self.complete().await;
            return;
        }
        self.state.timer = self.relief_secs();
        self.save_and_publish().await;
        self.enter_relief(ReliefKind::NextTurn, sold);
    }

    async fn complete(&mut self) {
        self.stop_countdown();
        self.relief = None;
        self.state.status = DraftStatus::Completed;
        self.state.paused = false;
        self.state.clear_auction();
        self.state.timer = 0;
        tracing::info!(total_picks = self.state.total_picks, "draft completed");
        self.save_and_publish().await;
    }

    /// Arms the forced pause between rounds, cancelling any running
    /// countdown, and announces it with the name of the upcoming nominator.
    fn enter_relief(&mut self, kind: ReliefKind, sold: Option<String>) {
        self.stop_countdown();
        let seconds = self.relief_secs();
        self.relief = Some(Relief {
            sleep: Box::pin(time::sleep(Duration::from_secs(seconds))),
            kind,
        });
        let up_next = self
            .state
            .current_manager()
            .and_then(|id| self.roster.name_of(id));
        let player = sold.or_else(|| {
            self.state
                .current_player
                .as_ref()
                .map(|player| player.web_name.clone())
        });
        self.publish(Event::Relief {
            seconds,
            up_next,
            player,
        });
    }

    fn start_countdown(&mut self) {
        debug_assert!(self.relief.is_none());
        let mut ticker = time::interval_at(
            Instant::now() + Duration::from_secs(1),
            Duration::from_secs(1),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    fn stop_countdown(&mut self) {
        self.ticker = None;
    }

    /// Durably saves the snapshot, then broadcasts the new state. Persisting
    /// first means a crash in between only costs observers a notification,
    /// never a transition.
    async fn save_and_publish(&mut self) {
        let snapshot = self.state.snapshot();
        if let Err(err) = self.snapshots.save(&snapshot).await {
            self.metrics.snapshot_write_failures.inc();
            self.report_systemic(&err, "failed to persist the draft state");
        }
        self.publish(Event::State {
            snapshot,
            current_player: self.state.current_player.clone(),
        });
    }

    fn publish(&self, event: Event) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn report_systemic(&self, err: &anyhow::Error, message: &str) {
        tracing::error!(?err, "{message}");
        self.publish(Event::Error {
            message: message.to_string(),
        });
    }

    fn nomination_secs(&self) -> u64 {
        self.state.timing.nomination_time.as_secs()
    }

    fn auction_secs(&self) -> u64 {
        self.state.timing.auction_time.as_secs()
    }

    fn min_respond_secs(&self) -> u64 {
        self.state.timing.min_respond_time.as_secs()
    }

    fn relief_secs(&self) -> u64 {
        self.state.timing.relief_time.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::infra::catalog::MockPlayerSource,
        model::{Manager, Position, PositionCounts, Timing},
        rand::SeedableRng,
        std::sync::Arc,
    };

    const ADMIN: &str = "alice";

    fn manager(id: &str, is_admin: bool, quota: u32) -> Manager {
        Manager {
            id: id.into(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            is_admin,
            budget: 1000,
            slots_remaining: quota,
            position_counts: PositionCounts::default(),
            players_owned: Vec::new(),
        }
    }

    fn player(id: &str, web_name: &str, position: Position) -> Player {
        Player {
            id: id.into(),
            first_name: web_name.to_string(),
            second_name: web_name.to_string(),
            web_name: web_name.to_string(),
            position,
            team: "ARS".to_string(),
            now_cost: 7.5,
            drafted: false,
            final_bid: None,
            acquired_by: None,
        }
    }

    fn catalog_players() -> Vec<Player> {
        vec![
            player("p1", "Raya", Position::Gkp),
            player("p2", "Saka", Position::Mid),
            player("p3", "Havertz", Position::Fwd),
            player("p4", "Gabriel", Position::Def),
            player("p5", "Rice", Position::Mid),
        ]
    }

    struct Fixture {
        engine: Engine,
        events: broadcast::Receiver<Event>,
        _dir: tempfile::TempDir,
    }

    fn fixture(managers: Vec<Manager>, quota: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = Snapshots::new(dir.path());
        let roster = Roster::from_records(dir.path().join("managers.json"), managers);
        let mut source = MockPlayerSource::new();
        source.expect_fetch().returning(|| Ok(catalog_players()));
        let catalog = Catalog::from_records(
            dir.path().join("players.json"),
            catalog_players(),
            Arc::new(source),
        );
        let (events, subscription) = broadcast::channel(256);
        let engine = Engine::new(
            DraftState::new(Timing::default()),
            roster,
            catalog,
            snapshots,
            events,
            Settings {
                rules: Rules::default(),
                starting_budget: 1000,
                roster_quota: quota,
            },
            StdRng::seed_from_u64(1),
        );
        Fixture {
            engine,
            events: subscription,
            _dir: dir,
        }
    }

    fn trio() -> Fixture {
        fixture(
            vec![
                manager(ADMIN, true, 15),
                manager("bob", false, 15),
                manager("carol", false, 15),
            ],
            15,
        )
    }

    /// Starts the draft as the admin and lets the opening relief interval
    /// pass, returning whose turn it is.
    async fn started(fixture: &mut Fixture) -> ManagerId {
        fixture
            .engine
            .handle(&ADMIN.into(), Command::Start)
            .await
            .unwrap();
        fixture.engine.on_relief_elapsed().await;
        fixture.engine.state.current_manager().cloned().unwrap()
    }

    fn other_than(fixture: &Fixture, id: &ManagerId) -> ManagerId {
        fixture
            .engine
            .state
            .manager_order
            .iter()
            .find(|candidate| *candidate != id)
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn start_requires_admin() {
        let mut f = trio();
        assert_eq!(
            f.engine.handle(&"bob".into(), Command::Start).await,
            Err(Rejection::NotAdmin)
        );
        assert_eq!(f.engine.state.status, DraftStatus::Pending);
    }

    #[tokio::test]
    async fn start_draws_a_permutation_of_all_managers() {
        let mut managers = vec![manager(ADMIN, true, 15)];
        managers.extend((1..10).map(|i| manager(&format!("m{i}"), false, 15)));
        let expected: std::collections::BTreeSet<_> =
            managers.iter().map(|m| m.id.clone()).collect();
        let mut f = fixture(managers, 15);

        f.engine.handle(&ADMIN.into(), Command::Start).await.unwrap();

        let state = &f.engine.state;
        assert_eq!(state.status, DraftStatus::Active);
        assert!(!state.paused);
        assert_eq!(state.timer, 30);
        assert_eq!(state.total_picks, 0);
        assert_eq!(state.manager_order.len(), 10);
        assert_eq!(
            state.manager_order.iter().cloned().collect::<std::collections::BTreeSet<_>>(),
            expected
        );
        // The opening relief interval is armed, the countdown is not.
        assert!(f.engine.relief.is_some());
        assert!(f.engine.ticker.is_none());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let mut f = trio();
        f.engine.handle(&ADMIN.into(), Command::Start).await.unwrap();
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Start).await,
            Err(Rejection::AlreadyStarted)
        );
    }

    #[tokio::test]
    async fn relief_blocks_nomination_and_bidding() {
        let mut f = trio();
        f.engine.handle(&ADMIN.into(), Command::Start).await.unwrap();
        let current = f.engine.state.current_manager().cloned().unwrap();
        let nominate = Command::Nominate {
            player: "p2".into(),
            bid: 50,
        };
        assert_eq!(
            f.engine.handle(&current, nominate).await,
            Err(Rejection::Relief)
        );
        let bid = Command::Bid {
            player: "p2".into(),
            bid: 60,
        };
        assert_eq!(f.engine.handle(&current, bid).await, Err(Rejection::Relief));
    }

    #[tokio::test]
    async fn relief_elapsing_arms_the_countdown() {
        let mut f = trio();
        started(&mut f).await;
        assert!(f.engine.relief.is_none());
        assert!(f.engine.ticker.is_some());
        assert_eq!(f.engine.state.timer, 30);
    }

    #[tokio::test]
    async fn nomination_out_of_turn_is_rejected() {
        let mut f = trio();
        let current = started(&mut f).await;
        let intruder = other_than(&f, &current);
        assert_eq!(
            f.engine
                .handle(
                    &intruder,
                    Command::Nominate {
                        player: "p2".into(),
                        bid: 50,
                    }
                )
                .await,
            Err(Rejection::NotYourTurn)
        );
    }

    #[tokio::test]
    async fn nomination_puts_the_player_on_the_block() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();

        let state = &f.engine.state;
        assert_eq!(state.current_player.as_ref().unwrap().id, "p2".into());
        assert_eq!(state.current_bid, 50);
        assert_eq!(state.highest_bidder, Some(current));
        assert_eq!(state.timer, 30);
    }

    #[tokio::test]
    async fn late_bid_gets_the_respond_time_floor() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        let rival = other_than(&f, &current);

        f.engine.state.timer = 5;
        f.engine
            .handle(
                &rival,
                Command::Bid {
                    player: "p2".into(),
                    bid: 60,
                },
            )
            .await
            .unwrap();

        assert_eq!(f.engine.state.current_bid, 60);
        assert_eq!(f.engine.state.highest_bidder, Some(rival));
        // The floor never shortens a longer countdown either.
        assert_eq!(f.engine.state.timer, 10);
    }

    #[tokio::test]
    async fn bid_must_strictly_increase_and_match_the_block() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        let rival = other_than(&f, &current);

        for (player, bid) in [("p2", 50), ("p2", 40), ("p3", 60)] {
            assert_eq!(
                f.engine
                    .handle(
                        &rival,
                        Command::Bid {
                            player: player.into(),
                            bid,
                        }
                    )
                    .await,
                Err(Rejection::WrongPlayerOrAmount)
            );
        }
        // 55 beats the current bid but is not a multiple of the increment.
        assert_eq!(
            f.engine
                .handle(
                    &rival,
                    Command::Bid {
                        player: "p2".into(),
                        bid: 55,
                    }
                )
                .await,
            Err(Rejection::BidIncrement(10))
        );
        // Rejections left the state untouched.
        assert_eq!(f.engine.state.current_bid, 50);
        assert_eq!(f.engine.state.highest_bidder, Some(current));
    }

    #[tokio::test]
    async fn closing_allocates_and_advances_the_turn() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        let rival = other_than(&f, &current);
        f.engine
            .handle(
                &rival,
                Command::Bid {
                    player: "p2".into(),
                    bid: 60,
                },
            )
            .await
            .unwrap();

        f.engine.handle(&ADMIN.into(), Command::Close).await.unwrap();

        let winner = f.engine.roster.get(&rival).unwrap();
        assert_eq!(winner.budget, 940);
        assert_eq!(winner.slots_remaining, 14);
        assert_eq!(winner.position_counts.get(Position::Mid), 1);
        assert_eq!(winner.players_owned, vec!["p2".into()]);
        // Budget invariant: enough is left to reserve every open slot.
        assert!(winner.budget >= u64::from(winner.slots_remaining) * 10);

        let sold = f.engine.catalog.find(&"p2".into()).unwrap();
        assert!(sold.drafted);
        assert_eq!(sold.final_bid, Some(60));
        assert_eq!(sold.acquired_by, Some(rival));

        let state = &f.engine.state;
        assert_eq!(state.total_picks, 1);
        assert_eq!(state.current_turn, 1);
        assert!(state.current_player.is_none());
        assert!(state.highest_bidder.is_none());
        assert!(f.engine.relief.is_some());
    }

    #[tokio::test]
    async fn close_without_an_auction_is_rejected() {
        let mut f = trio();
        started(&mut f).await;
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Close).await,
            Err(Rejection::NoAuction)
        );
    }

    #[tokio::test]
    async fn timer_expiry_allocates_exactly_like_a_close() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p3".into(),
                    bid: 70,
                },
            )
            .await
            .unwrap();

        f.engine.state.timer = 0;
        f.engine.on_tick().await;

        let winner = f.engine.roster.get(&current).unwrap();
        assert_eq!(winner.budget, 930);
        assert_eq!(winner.slots_remaining, 14);
        assert!(f.engine.catalog.find(&"p3".into()).unwrap().drafted);
        assert_eq!(f.engine.state.total_picks, 1);
        assert_eq!(f.engine.state.current_turn, 1);
    }

    #[tokio::test]
    async fn a_stale_tick_after_close_cannot_allocate_twice() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        f.engine.handle(&ADMIN.into(), Command::Close).await.unwrap();

        let budget = f.engine.roster.get(&current).unwrap().budget;
        let picks = f.engine.state.total_picks;
        let turn = f.engine.state.current_turn;

        f.engine.on_tick().await;

        assert_eq!(f.engine.roster.get(&current).unwrap().budget, budget);
        assert_eq!(f.engine.state.total_picks, picks);
        assert_eq!(f.engine.state.current_turn, turn);
    }

    #[tokio::test]
    async fn ticks_count_down_and_persist() {
        let mut f = trio();
        started(&mut f).await;
        f.engine.on_tick().await;
        assert_eq!(f.engine.state.timer, 29);
        let saved = f.engine.snapshots.load().await.unwrap().unwrap();
        assert_eq!(saved.timer, 29);
    }

    #[tokio::test]
    async fn lapsed_nomination_advances_the_turn_without_allocation() {
        let mut f = trio();
        started(&mut f).await;
        f.engine.state.timer = 0;
        f.engine.on_tick().await;

        assert_eq!(f.engine.state.current_turn, 1);
        assert_eq!(f.engine.state.total_picks, 0);
        assert!(f.engine.relief.is_some());
        assert_eq!(f.engine.state.timer, 3);
        for manager in f.engine.roster.ids() {
            assert_eq!(f.engine.roster.get(&manager).unwrap().budget, 1000);
        }
    }

    #[tokio::test]
    async fn pause_preserves_the_timer_and_resume_reliefs_first() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        f.engine.state.timer = 17;

        f.engine.handle(&ADMIN.into(), Command::Pause).await.unwrap();
        assert!(f.engine.state.paused);
        assert!(f.engine.ticker.is_none());
        assert_eq!(f.engine.state.timer, 17);

        // A stale tick while paused is ignored.
        f.engine.on_tick().await;
        assert_eq!(f.engine.state.timer, 17);

        f.engine.handle(&ADMIN.into(), Command::Resume).await.unwrap();
        assert!(!f.engine.state.paused);
        assert!(f.engine.relief.is_some());

        f.engine.on_relief_elapsed().await;
        assert!(f.engine.ticker.is_some());
        // The preserved value survives the relief interval.
        assert_eq!(f.engine.state.timer, 17);
    }

    #[tokio::test]
    async fn pause_and_resume_are_admin_only_and_stateful() {
        let mut f = trio();
        started(&mut f).await;
        assert_eq!(
            f.engine.handle(&"bob".into(), Command::Pause).await,
            Err(Rejection::NotAdmin)
        );
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Resume).await,
            Err(Rejection::NotPaused)
        );
        f.engine.handle(&ADMIN.into(), Command::Pause).await.unwrap();
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Pause).await,
            Err(Rejection::AlreadyPaused)
        );
    }

    #[tokio::test]
    async fn skip_advances_the_rotation_but_never_a_live_auction() {
        let mut f = trio();
        let current = started(&mut f).await;
        assert_eq!(
            f.engine.handle(&"bob".into(), Command::Skip).await,
            Err(Rejection::NotAdmin)
        );

        f.engine.handle(&ADMIN.into(), Command::Skip).await.unwrap();
        assert_eq!(f.engine.state.current_turn, 1);
        assert!(f.engine.relief.is_some());

        f.engine.on_relief_elapsed().await;
        let next = f.engine.state.current_manager().cloned().unwrap();
        assert_ne!(next, current);
        f.engine
            .handle(
                &next,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Skip).await,
            Err(Rejection::AuctionInProgress)
        );
    }

    #[tokio::test]
    async fn full_rotation_returns_to_the_first_manager() {
        let mut f = trio();
        let first = started(&mut f).await;
        for _ in 0..3 {
            f.engine.handle(&ADMIN.into(), Command::Skip).await.unwrap();
            f.engine.on_relief_elapsed().await;
        }
        assert_eq!(f.engine.state.current_manager(), Some(&first));
    }

    #[tokio::test]
    async fn draft_completes_when_every_roster_is_full() {
        let mut f = fixture(
            vec![manager(ADMIN, true, 1), manager("bob", false, 1)],
            1,
        );
        let first = started(&mut f).await;

        f.engine
            .handle(
                &first,
                Command::Nominate {
                    player: "p1".into(),
                    bid: 10,
                },
            )
            .await
            .unwrap();
        f.engine.handle(&ADMIN.into(), Command::Close).await.unwrap();
        assert_eq!(f.engine.state.status, DraftStatus::Active);

        f.engine.on_relief_elapsed().await;
        let second = f.engine.state.current_manager().cloned().unwrap();
        assert_ne!(second, first);
        f.engine
            .handle(
                &second,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 10,
                },
            )
            .await
            .unwrap();
        f.engine.handle(&ADMIN.into(), Command::Close).await.unwrap();

        let state = &f.engine.state;
        assert_eq!(state.status, DraftStatus::Completed);
        assert_eq!(state.timer, 0);
        assert!(state.current_player.is_none());
        assert!(f.engine.ticker.is_none());
        assert!(f.engine.relief.is_none());
        assert_eq!(state.total_picks, 2);

        // Completed is absorbing: no listed operation leaves it.
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Start).await,
            Err(Rejection::AlreadyStarted)
        );
        assert_eq!(
            f.engine.handle(&ADMIN.into(), Command::Skip).await,
            Err(Rejection::NotActive)
        );
        assert_eq!(
            f.engine
                .handle(
                    &second,
                    Command::Nominate {
                        player: "p3".into(),
                        bid: 10,
                    }
                )
                .await,
            Err(Rejection::NotActive)
        );
        assert_eq!(f.engine.state.status, DraftStatus::Completed);
    }

    #[tokio::test]
    async fn restart_resets_state_roster_and_catalog() {
        let mut f = trio();
        let current = started(&mut f).await;
        f.engine
            .handle(
                &current,
                Command::Nominate {
                    player: "p2".into(),
                    bid: 50,
                },
            )
            .await
            .unwrap();
        f.engine.handle(&ADMIN.into(), Command::Close).await.unwrap();

        assert_eq!(
            f.engine.handle(&"bob".into(), Command::Restart).await,
            Err(Rejection::NotAdmin)
        );
        f.engine
            .handle(&ADMIN.into(), Command::Restart)
            .await
            .unwrap();

        let state = &f.engine.state;
        assert_eq!(state.status, DraftStatus::Pending);
        assert!(state.manager_order.is_empty());
        assert_eq!(state.total_picks, 0);
        for manager in f.engine.roster.ids() {
            let record = f.engine.roster.get(&manager).unwrap();
            assert_eq!(record.budget, 1000);
            assert_eq!(record.slots_remaining, 15);
            assert!(record.players_owned.is_empty());
        }
        assert!(!f.engine.catalog.find(&"p2".into()).unwrap().drafted);

        let saved = f.engine.snapshots.load().await.unwrap().unwrap();
        assert_eq!(saved.status, DraftStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_engine_serializes_commands_through_the_mailbox() {
        let Fixture {
            engine,
            mut events,
            _dir,
        } = trio();
        let snapshots = engine.snapshots.clone();
        let (handle, join) = engine.spawn();

        assert_eq!(
            handle.submit("bob".into(), Command::Start).await,
            Err(Rejection::NotAdmin)
        );
        handle.submit(ADMIN.into(), Command::Start).await.unwrap();

        match events.recv().await.unwrap() {
            Event::State { snapshot, .. } => {
                assert_eq!(snapshot.status, DraftStatus::Active);
            }
            event => panic!("expected a state broadcast, got {event:?}"),
        }

        drop(handle);
        join.await.unwrap();
        assert!(snapshots.load().await.unwrap().is_some());
    }
}
