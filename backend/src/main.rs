use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use backend::{
    create_router,
    itinerary::ItineraryBook,
    session::{RouteSession, DEFAULT_REVEAL_INTERVAL},
    AppState,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Route-progress backend replaying scripted itineraries.
#[derive(Debug, Parser)]
#[command(name = "backend")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:5000")]
    bind: SocketAddr,
    /// JSON itinerary book; unknown pairs are routed directly
    #[arg(long)]
    itinerary: Option<PathBuf>,
    /// Delay before each node is revealed
    #[arg(long, default_value_t = DEFAULT_REVEAL_INTERVAL.as_millis() as u64)]
    reveal_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let itineraries = match &args.itinerary {
        Some(path) => {
            let book = ItineraryBook::from_path(path)?;
            tracing::info!("loaded {} itineraries from {}", book.len(), path.display());
            book
        }
        None => ItineraryBook::default(),
    };

    let session = RouteSession::new(itineraries, Duration::from_millis(args.reveal_ms));
    tracing::info!("revealing one node every {:?}", session.reveal_interval());
    let app = create_router(AppState {
        session: Arc::new(session),
    });

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!("starting backend on http://{}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
