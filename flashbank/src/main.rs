use anyhow::{Context, Result};
use bankio::linux::{Board, SpidevChipId};
use bankio::{read_switches, SlotSelect};
use banktools::speed::BusSpeed;
use banktools::Slot;
use std::io::Write;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flashbank::animator::Animator;
use flashbank::coordinator::{Coordinator, Request, WorkflowState};
use flashbank::indicators::ModeTable;
use flashbank::monitor::InputMonitor;
use flashbank::programmer::Flashrom;
use flashbank::{CliArgs, Config};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();

    if args.version {
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(env!("CARGO_BIN_NAME"), " ", "{}"),
            GIT_VERSION,
        )?;
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::default();
    let Board {
        indicators,
        mut selector,
        mut switches,
        buttons,
    } = Board::open(&cfg.gpio_chip, cfg.active_low_leds)
        .with_context(|| format!("opening GPIO lines on {}", cfg.gpio_chip.display()))?;

    let modes = ModeTable::new();
    info!("starting indicators");
    let animator = Animator::start(indicators, modes.clone(), cfg.tick)?;

    let speed = BusSpeed::from_switches(
        read_switches(&mut switches).context("reading speed switches")?,
    );
    info!("bus speed {}", speed);

    modes.startup_sweep(cfg.startup_step);
    selector
        .select(Slot::SOURCE)
        .context("parking bus on slot 0")?;

    let programmer = Arc::new(Flashrom::new(&cfg, speed));
    let coordinator = Arc::new(
        Coordinator::new(Box::new(selector), programmer, modes, &cfg)
            .with_chip_id(Box::new(SpidevChipId::new(&cfg.spi_dev, speed.hz()))),
    );

    info!("watching buttons");
    let monitor = InputMonitor::start(
        buttons,
        cfg.poll,
        cfg.debounce,
        coordinator.handler(Request::Check),
        coordinator.handler(Request::Write),
    )?;
    info!("ready: CHECK scans, WRITE clones slot 0");

    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("waiting for ctrl-c")?,
        _ = terminate.recv() => {}
    }

    info!("shutting down");
    if !monitor.stop(cfg.join_timeout) {
        warn!("input monitor left running");
    }
    if !animator.stop(cfg.join_timeout) {
        warn!("indicator animation left running");
    }
    if coordinator.state() != WorkflowState::Idle {
        warn!("exiting during a {:?} sweep", coordinator.state());
    }
    Ok(())
}
