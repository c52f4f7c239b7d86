mod app;
mod engine;
mod fitness;
mod prov;
mod util;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use engine::ClusterDimension;
use prov::{TraversalDirection, TraversalSettings};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the provenance service.
    #[arg(long, default_value = "http://localhost:8080/plus")]
    server: String,
    /// Object to open at start-up.
    #[arg(long)]
    oid: Option<String>,
    #[arg(long, default_value_t = 50)]
    max_nodes: u32,
    #[arg(long, default_value_t = 8)]
    max_hops: u32,
    /// Leave non-provenance edges out of fetched graphs.
    #[arg(long)]
    no_npes: bool,
    #[arg(long)]
    follow_npids: bool,
    #[arg(long, default_value_t = TraversalDirection::Both)]
    direction: TraversalDirection,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Initial clustering dimension.
    #[arg(long, default_value_t = ClusterDimension::Order)]
    cluster: ClusterDimension,
}

impl Args {
    fn settings(&self) -> TraversalSettings {
        TraversalSettings {
            max_nodes: self.max_nodes,
            max_hops: self.max_hops,
            include_npes: !self.no_npes,
            follow_npids: self.follow_npids,
            direction: self.direction,
        }
        .clamped()
    }
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prov_vis=info")),
        )
        .init();

    let config = app::AppConfig {
        server: args.server.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        initial_oid: args.oid.clone(),
        settings: args.settings(),
        dimension: args.cluster,
    };
    tracing::info!(server = %config.server, "starting prov-vis");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "prov-vis",
        options,
        Box::new(move |cc| Ok(Box::new(app::ProvVisApp::new(cc, config)))),
    )
}
