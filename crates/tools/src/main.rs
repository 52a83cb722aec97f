use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use feeds::{HazardKind, SourceSet};
use foundation::LatLng;
use layers::{
    CredentialFormat, FixedGeolocator, LayerId, OverlayConfig, OverlayManager,
    ProviderAvailability, RecordingBackend, SelectionOutcome,
};
use tools::{describe_overlays, normalize_report};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hazard feed and overlay tooling")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a saved feed response and print accepted/rejected records as JSON
    Normalize {
        file: PathBuf,

        /// Hazard kind that decides risk classification
        #[arg(long, default_value = "flood")]
        kind: HazardKind,
    },

    /// Check a map-provider credential against the expected format
    CheckCredential {
        key: String,

        /// Accept any non-empty key
        #[arg(long)]
        any: bool,
    },

    /// Run one layer selection against a live feed and list the overlays
    Select {
        /// all, flood, landslide, seismic, weather or fire
        #[arg(default_value = "all")]
        layer: LayerId,

        #[arg(long, env = "HAZARD_FEED_BASE_URL")]
        base_url: Option<String>,

        #[arg(long, env = "MAP_PROVIDER_KEY")]
        credential: Option<String>,

        /// Scope center; both coordinates must be given
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        #[arg(long)]
        radius_km: Option<f64>,

        /// Also query the fire feed
        #[arg(long)]
        fire: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Normalize { file, kind } => cmd_normalize(file, kind),
        Command::CheckCredential { key, any } => cmd_check_credential(&key, any),
        Command::Select {
            layer,
            base_url,
            credential,
            lat,
            lng,
            radius_km,
            fire,
        } => {
            let mut config = OverlayConfig::from_env();
            if let Some(base_url) = base_url {
                config.feed.base_url = base_url;
            }
            config.provider_credential = credential;
            if let Some(radius_km) = radius_km {
                config.scope_radius_km = radius_km;
            }
            let center = lat.zip(lng).map(|(lat, lng)| LatLng::new(lat, lng));
            cmd_select(config, layer, center, fire).await
        }
    }
}

fn cmd_normalize(file: PathBuf, kind: HazardKind) -> anyhow::Result<()> {
    let input = fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
    let report = normalize_report(&input, kind).with_context(|| format!("parse {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_check_credential(key: &str, any: bool) -> anyhow::Result<()> {
    let format = if any {
        CredentialFormat::any_non_empty()
    } else {
        CredentialFormat::default()
    };
    let mut provider = ProviderAvailability::new(format);
    let state = provider.check_credential(Some(key));
    println!("{state}");
    if !state.is_usable() {
        bail!("{}", state.user_message());
    }
    Ok(())
}

async fn cmd_select(
    config: OverlayConfig,
    layer: LayerId,
    center: Option<LatLng>,
    fire: bool,
) -> anyhow::Result<()> {
    let kinds: &[HazardKind] = if fire { &HazardKind::ALL } else { &HazardKind::REQUIRED };
    let sources = SourceSet::http(&config.feed, kinds);
    let manager = OverlayManager::mount(config, sources, RecordingBackend::new());

    if let Some(center) = center {
        manager
            .locate_user(&FixedGeolocator::at(center))
            .await
            .context("scope center")?;
    }

    let outcome = manager.select_layer(layer).await;
    info!(?outcome, overlays = manager.live_overlay_count(), "selection finished");
    match outcome {
        SelectionOutcome::Settled {
            layer,
            rendered,
            failed_sources,
        } => {
            println!("{layer}: {rendered} overlays");
            for kind in failed_sources {
                println!("  {kind} feed failed");
            }
        }
        SelectionOutcome::Superseded => println!("selection superseded"),
        SelectionOutcome::Fallback(state) => {
            println!("fallback map: {}", state.user_message());
        }
    }

    let (lines, viewport) =
        manager.with_backend(|backend| (describe_overlays(backend), backend.viewport()));
    if let Some(viewport) = viewport {
        let center = viewport.center();
        println!("  viewport center {:.4},{:.4}", center.lat, center.lng);
    }
    for line in lines {
        println!("  {line}");
    }
    for notice in manager.drain_notices() {
        eprintln!("{}: {}", notice.subject, notice.message);
    }
    manager.unmount();
    Ok(())
}
