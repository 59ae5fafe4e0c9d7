use clap::Parser;

#[tokio::main]
async fn main() {
    let args = draftd::arguments::Arguments::parse();
    observe::tracing::initialize(args.log_filter.as_str(), args.log_stderr_threshold);
    observe::metrics::setup_registry(Some("draftd".into()), None);
    tracing::info!("running draftd with validated arguments:\n{}", args);
    draftd::run::run(args).await;
}
