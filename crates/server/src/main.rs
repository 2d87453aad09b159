use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use server::config::{Args, normalize_sqlite_url, prepare_sqlite_file};
use server::router;
use services::{AppServices, Clock};

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let practice_config = args.practice_config()?;

    // Open + migrate SQLite at startup so handlers only ever see a ready store.
    let db_url = normalize_sqlite_url(&args.db_url);
    prepare_sqlite_file(&db_url)?;
    let services =
        AppServices::new_sqlite(&db_url, Clock::default_clock(), practice_config).await?;
    info!(db = %db_url, start_offset_secs = args.start_offset_secs, "storage ready");

    if args.seed {
        let report = services.seed_demo(args.seed_per_format).await?;
        info!(
            formats = report.formats,
            inserted = report.questions_inserted,
            skipped = report.formats_skipped,
            "demo question bank seeded"
        );
    }

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(listen = %args.listen, "server listening");
    axum::serve(listener, router(services))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| args.default_log_filter().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run(args).await {
        error!(error = %err, "server exited with error");
        std::process::exit(2);
    }
}
