//! HyPeerWeb node binary
//!
//! Runs one segment: a coordinator holding the web in RocksDB, or a member
//! forwarding to a coordinator.

use std::sync::Arc;

use hypeerweb_segment::{Role, Segment, SegmentConfig};
use hypeerweb_store::RocksStore;
use hypeerweb_topology::{Attributes, SearchConfig};
use hypeerweb_transfer::{TransportConfig, UdpTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hypeerweb=info,hypeerweb_node=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SegmentConfig::from_env();
    tracing::info!(?config, "Starting HyPeerWeb node");

    let role = match config.coordinator {
        Some(coordinator) => Role::Member { coordinator },
        None => Role::Coordinator,
    };
    let store = Arc::new(RocksStore::open(&config.data_dir)?);
    let (transport, incoming) = UdpTransport::bind(TransportConfig {
        bind: config.bind,
        ..Default::default()
    })
    .await?;

    let search = SearchConfig::default().with_fallback_depth(config.fallback_depth);
    let segment = Arc::new(Segment::open(role, store, transport, search, config.seed)?);

    let mut events = segment.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(?event, "topology changed");
        }
    });

    if role == Role::Coordinator && segment.ordered_nodes().await?.is_empty() {
        for _ in 0..config.bootstrap_nodes {
            segment.insert(Attributes::new()).await?;
        }
        tracing::info!(nodes = config.bootstrap_nodes, valid = segment.validate().await?, "bootstrap complete");
    }

    tokio::spawn(Arc::clone(&segment).serve(incoming));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
