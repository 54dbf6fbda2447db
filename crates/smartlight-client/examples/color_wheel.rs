//! Cycles every colour bulb on the LAN through red, green and blue.
//!
//! ```text
//! cargo run -p smartlight-client --example color_wheel -- --config smartlight.toml
//! ```
//!
//! The scan uses the `[discovery]` and `[network]` settings of the config
//! file (defaults when it does not exist); the model filter is always forced
//! to colour bulbs.  Each colour change fades over `--interval` seconds, and
//! the hue advances by 120° once the fade has finished.  Stop with Ctrl-C.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Parser;
use smartlight_client::application::bulb::MODEL_TAG;
use smartlight_client::{load_config, Bulb, DiscoveryScanner};
use smartlight_core::LightStateParams;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SATURATION: u8 = 60;
const BRIGHTNESS: u8 = 60;

/// Extra wait after each fade so consecutive transitions do not overlap.
const SETTLE: Duration = Duration::from_millis(100);

/// Fades every colour bulb on the LAN around the colour wheel.
#[derive(Debug, Parser)]
#[command(name = "color_wheel", version)]
struct Cli {
    /// Client configuration file.
    #[arg(long, default_value = "smartlight.toml", env = "SMARTLIGHT_CONFIG")]
    config: PathBuf,

    /// Seconds per colour.
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Stop discovery after this many bulbs.
    #[arg(long)]
    bulbs: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let interval = Duration::from_secs(cli.interval);
    let config = load_config(&cli.config)?;
    let mut options = config.scan_options()?.with_model_filter(MODEL_TAG);
    if let Some(max) = cli.bulbs {
        options = options.with_max_devices(max);
    }

    // ── Discovery ─────────────────────────────────────────────────────────────
    let bulbs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&bulbs);
    let found = DiscoveryScanner::new(options)
        .scan(move |device| {
            info!("discovered bulb #{} at {:?}", device.ordinal, device.identity.ip);
            if let Ok(mut bulbs) = sink.lock() {
                bulbs.push(Bulb::from(device));
            }
            async {}
        })
        .await?;

    let bulbs: Vec<Bulb> = bulbs
        .lock()
        .map(|guard| guard.clone())
        .map_err(|_| anyhow::anyhow!("bulb list lock poisoned"))?;
    if bulbs.is_empty() {
        warn!("no bulbs found");
        return Ok(());
    }
    info!("cycling {found} bulbs");

    // ── Colour wheel ──────────────────────────────────────────────────────────
    let mut hue: u16 = 0;
    loop {
        info!("transitioning to HSB({hue}, {SATURATION}, {BRIGHTNESS}) over {interval:?}");

        let mut fades = JoinSet::new();
        for bulb in &bulbs {
            fades.spawn(fade(bulb.clone(), hue, interval));
        }
        tokio::time::sleep(interval + SETTLE).await;
        while fades.join_next().await.is_some() {}

        hue = (hue + 120) % 360;
    }
}

/// Starts a fade to `hue`, retrying timeouts while at least a second of the
/// interval is left.  The fade period shrinks by the time already lost.
async fn fade(bulb: Bulb, hue: u16, interval: Duration) {
    let started = Instant::now();
    let mut period = interval;

    loop {
        let params = LightStateParams::new()
            .hsb(hue, SATURATION, BRIGHTNESS)
            .transition_period(period_millis(period));

        match bulb.transition_light_state(&params).await {
            Ok(_) => return,
            Err(e) if e.is_timeout() => {
                period = interval.saturating_sub(started.elapsed());
                if period < Duration::from_secs(1) {
                    warn!("giving up on {:?} this round", bulb.link().endpoint());
                    return;
                }
            }
            Err(e) => {
                warn!("transition failed for {:?}: {e}", bulb.link().endpoint());
                return;
            }
        }
    }
}

/// Fade period in milliseconds, capped at the largest value the device field
/// holds.
fn period_millis(period: Duration) -> u32 {
    u32::try_from(period.as_millis()).unwrap_or(u32::MAX)
}
