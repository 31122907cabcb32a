//! # Track Hub Hermes - The Publisher
//!
//! Delivery side of the track hub system. Responsible for:
//! - Discovering hub definitions (`<definitions>/<hub>/hub.yaml`)
//! - Registering them by hub name
//! - Building, validating and rendering each hub
//! - Staging rendered files and data links locally
//! - Mirroring the staging directory with `rsync` when a target is set
//!
//! ## Environment
//!
//! - `HUB_DEFINITIONS`: definitions directory (default `./hubs`)
//! - `STAGING_DIR`: staging root (default `./staging`)
//! - `UPLOAD_PATH`: enables upload; remote directory or local mirror
//! - `UPLOAD_HOST`, `UPLOAD_USER`, `UPLOAD_PORT`: remote target settings
//! - `RUST_LOG`: log filter

mod discovery;
mod error;
mod publisher;
mod registry;
mod stage;
mod upload;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use discovery::DiscoveryService;
use publisher::{PublishStatus, Publisher};
use upload::{RsyncUploader, UploadTarget};

/// Runtime settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    definitions_dir: PathBuf,
    staging_dir: PathBuf,
    target: Option<UploadTarget>,
}

impl Settings {
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("UPLOAD_PORT") {
            Some(port) => Some(
                port.parse::<u16>()
                    .with_context(|| format!("UPLOAD_PORT '{}' is not a port number", port))?,
            ),
            None => None,
        };

        let target = match get("UPLOAD_PATH") {
            Some(path) => Some(UploadTarget {
                host: get("UPLOAD_HOST"),
                user: get("UPLOAD_USER"),
                path: PathBuf::from(path),
                port,
            }),
            None => {
                if get("UPLOAD_HOST").is_some() {
                    bail!("UPLOAD_HOST is set but UPLOAD_PATH is not");
                }
                None
            }
        };

        Ok(Self {
            definitions_dir: PathBuf::from(get("HUB_DEFINITIONS").unwrap_or_else(|| "./hubs".into())),
            staging_dir: PathBuf::from(get("STAGING_DIR").unwrap_or_else(|| "./staging".into())),
            target,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackhub_hermes=info,trackhub_libs=info".into()),
        )
        .init();

    info!("Starting Track Hub Hermes - The Publisher");

    let settings = Settings::from_env()?;

    let discovery_service = DiscoveryService::new(&settings.definitions_dir);
    info!("Discovering hubs in {:?}...", settings.definitions_dir);

    let registry = discovery_service
        .discover_hubs()
        .context("Failed to scan hub definitions")?;

    info!("Discovered {} hubs", registry.count());
    if registry.count() == 0 {
        warn!("No hubs found in {:?}", settings.definitions_dir);
        return Ok(());
    }

    let mut publisher = Publisher::new(&settings.staging_dir);
    if let Some(target) = settings.target.clone() {
        info!("Uploading to {}", target.destination());
        publisher = publisher.with_upload(Arc::new(RsyncUploader::new()), target);
    }

    let mut failed = 0;
    for entry in registry.hubs() {
        let report = publisher.publish(&entry.config).await;
        info!("Report: {}", serde_json::to_string(&report)?);
        if report.status != PublishStatus::Success {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} hubs failed to publish", failed, registry.count());
    }

    info!("Published {} hubs", registry.count());
    Ok(())
}
