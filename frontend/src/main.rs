use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, ValueEnum};
use frontend::{
    ClientConfig, Geocoder, HttpBackend, HttpSegmentRouter, SceneProvider, SegmentRouteProvider,
    SessionController, SessionState, StraightLineRouter,
};
use shared::{OptimizeRequest, Preferences};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RouterKind {
    /// Ask the backend's `/api/route` endpoint
    Http,
    /// Interpolate locally
    Straight,
}

/// Follow a route optimization live and animate the chosen path.
#[derive(Debug, Parser)]
#[command(name = "route-viz")]
struct Args {
    #[arg(long, default_value = "Kuragallu")]
    source: String,
    #[arg(long, default_value = "Mangalagiri")]
    destination: String,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    traffic: u8,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    weather: u8,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    elevation: u8,
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    air_quality: u8,
    /// Backend root URL (defaults to $ROUTE_VIZ_API_ROOT or http://localhost:5000)
    #[arg(long)]
    api: Option<String>,
    #[arg(long)]
    poll_ms: Option<u64>,
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Extra named places, as a JSON object of `"Name": [lat, lon]`
    #[arg(long)]
    places: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = RouterKind::Http)]
    router: RouterKind,
    /// Write the final scene as GeoJSON
    #[arg(long)]
    scene_out: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(api) = &self.api {
            config = config.with_api_root(api);
        }
        if let Some(ms) = self.poll_ms {
            config.polling_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.tick_ms {
            config.animation_tick = Duration::from_millis(ms);
        }
        config
    }

    fn request(&self) -> OptimizeRequest {
        OptimizeRequest {
            source: self.source.clone(),
            destination: self.destination.clone(),
            preferences: Preferences {
                traffic: self.traffic,
                weather: self.weather,
                elevation: self.elevation,
                air_quality: self.air_quality,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frontend=info,route_viz=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.config();
    tracing::info!("using backend at {}", config.api_base_url);

    let mut geocoder = Geocoder::default();
    if let Some(path) = &args.places {
        if let Err(err) = geocoder.extend_from_file(path) {
            tracing::error!("{err}");
            return ExitCode::FAILURE;
        }
    }

    match args.router {
        RouterKind::Http => {
            let router = HttpSegmentRouter::new(&config);
            drive(&args, &config, geocoder, router).await
        }
        RouterKind::Straight => {
            drive(&args, &config, geocoder, StraightLineRouter::default()).await
        }
    }
}

async fn drive<R: SegmentRouteProvider>(
    args: &Args,
    config: &ClientConfig,
    geocoder: Geocoder,
    router: R,
) -> ExitCode {
    let backend = HttpBackend::new(config.clone());
    let mut controller =
        SessionController::new(config, backend, router, SceneProvider::default())
            .with_geocoder(geocoder);

    controller.announce().await;
    if controller.submit(args.request()).await.is_err() {
        controller.reset();
        return ExitCode::FAILURE;
    }

    tokio::select! {
        _ = controller.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, tearing down session");
        }
    }

    let outcome = match controller.state() {
        SessionState::Completed => {
            let route = controller.route();
            tracing::info!(
                "route completed: {}",
                route
                    .final_route
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
            ExitCode::SUCCESS
        }
        SessionState::Error(message) => {
            tracing::error!("route failed: {message}");
            ExitCode::FAILURE
        }
        other => {
            tracing::warn!("stopped while {}", other.name());
            ExitCode::SUCCESS
        }
    };

    if let (Some(path), Some(scene)) = (&args.scene_out, controller.map()) {
        match serde_json::to_string_pretty(&scene.to_geojson()) {
            Ok(body) => match std::fs::write(path, body) {
                Ok(()) => tracing::info!("scene written to {}", path.display()),
                Err(err) => tracing::error!("failed to write {}: {err}", path.display()),
            },
            Err(err) => tracing::error!("failed to encode scene: {err}"),
        }
    }

    controller.reset();
    outcome
}
