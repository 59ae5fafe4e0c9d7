use {
    crate::domain::{Rules, Settings},
    model::{PositionCounts, Timing},
    std::{path::PathBuf, time::Duration},
    tracing::level_filters::LevelFilter,
    url::Url,
};

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(long, env, default_value = "warn,draftd=debug")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    /// Directory holding the draft snapshot, the roster and the player
    /// catalog.
    #[clap(long, env, default_value = "data")]
    pub data_dir: PathBuf,

    /// JSON file listing the managers (id, name, email, admin flag) used to
    /// seed a fresh data directory.
    #[clap(long, env)]
    pub roster_seed: Option<PathBuf>,

    /// Upstream bootstrap-static document the player catalog is imported
    /// from.
    #[clap(
        long,
        env,
        default_value = "https://fantasy.premierleague.com/api/bootstrap-static/"
    )]
    pub import_url: Url,

    /// How long the current manager has to nominate a player.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub nomination_time: Duration,

    /// How long an auction runs after a nomination.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub auction_time: Duration,

    /// Minimum time left on the clock after any accepted bid.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub min_respond_time: Duration,

    /// Forced pause between auction rounds.
    #[clap(long, env, default_value = "3s", value_parser = humantime::parse_duration)]
    pub relief_time: Duration,

    /// Budget every manager starts with.
    #[clap(long, env, default_value = "1000")]
    pub starting_budget: u64,

    /// Roster slots every manager has to fill.
    #[clap(long, env, default_value = "15")]
    pub roster_quota: u32,

    /// Bids must be positive multiples of this.
    #[clap(long, env, default_value = "10")]
    pub min_increment: u64,

    /// Budget a manager must retain per open roster slot.
    #[clap(long, env, default_value = "10")]
    pub min_reserve: u64,

    #[clap(long, env, default_value = "2")]
    pub gkp_limit: u32,

    #[clap(long, env, default_value = "5")]
    pub def_limit: u32,

    #[clap(long, env, default_value = "5")]
    pub mid_limit: u32,

    #[clap(long, env, default_value = "3")]
    pub fwd_limit: u32,

    /// Fixes the turn-order shuffle. Only useful for reproducing drafts in
    /// development.
    #[clap(long, env)]
    pub shuffle_seed: Option<u64>,
}

impl Arguments {
    pub fn timing(&self) -> Timing {
        Timing {
            nomination_time: self.nomination_time,
            auction_time: self.auction_time,
            min_respond_time: self.min_respond_time,
            relief_time: self.relief_time,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            rules: Rules {
                min_increment: self.min_increment,
                min_reserve: self.min_reserve,
                position_limits: PositionCounts::new(
                    self.gkp_limit,
                    self.def_limit,
                    self.mid_limit,
                    self.fwd_limit,
                ),
            },
            starting_budget: self.starting_budget,
            roster_quota: self.roster_quota,
        }
    }
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "log_filter: {}", self.log_filter)?;
        writeln!(f, "log_stderr_threshold: {}", self.log_stderr_threshold)?;
        writeln!(f, "data_dir: {:?}", self.data_dir)?;
        writeln!(f, "roster_seed: {:?}", self.roster_seed)?;
        writeln!(f, "import_url: {}", self.import_url)?;
        writeln!(f, "nomination_time: {:?}", self.nomination_time)?;
        writeln!(f, "auction_time: {:?}", self.auction_time)?;
        writeln!(f, "min_respond_time: {:?}", self.min_respond_time)?;
        writeln!(f, "relief_time: {:?}", self.relief_time)?;
        writeln!(f, "starting_budget: {}", self.starting_budget)?;
        writeln!(f, "roster_quota: {}", self.roster_quota)?;
        writeln!(f, "min_increment: {}", self.min_increment)?;
        writeln!(f, "min_reserve: {}", self.min_reserve)?;
        writeln!(
            f,
            "position_limits: GKP {} / DEF {} / MID {} / FWD {}",
            self.gkp_limit, self.def_limit, self.mid_limit, self.fwd_limit
        )?;
        writeln!(f, "shuffle_seed: {:?}", self.shuffle_seed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    #[test]
    fn defaults_parse() {
        let args = Arguments::parse_from(["draftd"]);
        let timing = args.timing();
        assert_eq!(timing, Timing::default());
        let settings = args.settings();
        assert_eq!(settings.rules.min_increment, 10);
        assert_eq!(settings.rules.position_limits.total(), 15);
        assert_eq!(settings.roster_quota, 15);
    }

    #[test]
    fn durations_accept_humantime() {
        let args = Arguments::parse_from(["draftd", "--relief-time", "1500ms"]);
        assert_eq!(args.relief_time, Duration::from_millis(1500));
    }
}
