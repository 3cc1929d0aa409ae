//! # Buzon CLI
//!
//! The household message mailbox daemon: polls a chat gateway, filters
//! and dedups incoming messages, and prints each new one on a thermal
//! printer.
//!
//! ## Usage
//!
//! ```bash
//! # Run the daemon (config from environment, see the config module)
//! buzon run
//!
//! # Print a self-test page and exit
//! buzon test-print
//!
//! # Validate the environment configuration without connecting
//! buzon check-config
//! ```

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio::sync::watch;

use buzon::{
    BuzonError,
    config::Config,
    gateway::TelegramGateway,
    intake::{IntakeLoop, IntakeSettings},
    job::OutputJob,
    state::SeenStore,
    status::LogStatus,
    transport::PrinterTransport,
};

/// Buzon - message-to-thermal-printer mailbox
#[derive(Parser, Debug)]
#[command(name = "buzon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the gateway and print incoming messages until interrupted
    Run,
    /// Print a short self-test page on the configured printer
    TestPrint,
    /// Load and report the configuration, then exit
    CheckConfig,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), BuzonError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_daemon(),
        Commands::TestPrint => test_print(),
        Commands::CheckConfig => check_config(),
    }
}

fn run_daemon() -> Result<(), BuzonError> {
    let config = Config::from_env()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_intake(&config))
}

async fn run_intake(config: &Config) -> Result<(), BuzonError> {
    let gateway = TelegramGateway::new(
        config.gateway_token.clone(),
        config.poll_timeout,
        config.max_photo_bytes,
        true,
    )?;
    let seen = SeenStore::load(&config.state_file, config.state_limit);
    let settings = IntakeSettings {
        header_text: config.header_text.clone(),
        line_width: config.line_width,
        raster_width: config.raster_width,
        max_attachments: config.max_attachments,
        max_attachment_bytes: config.max_photo_bytes,
    };
    let mut intake = IntakeLoop::new(
        gateway,
        config.allowlist.clone(),
        config.contacts.clone(),
        seen,
        config.transport.clone(),
        settings,
    )
    .with_status(Box::new(LogStatus));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    intake.run(shutdown_rx).await;
    intake.seen().persist();
    Ok(())
}

fn test_print() -> Result<(), BuzonError> {
    let config = Config::from_env()?;

    let Some(mut transport) = PrinterTransport::open(&config.transport) else {
        return Err(BuzonError::Transport(
            "No printer available for test print".to_string(),
        ));
    };
    info!("Test printing on {}", transport.describe());

    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string();
    let job = OutputJob::receipt(
        &config.header_text,
        &timestamp,
        "self-test",
        "If you can read this, the printer works.",
        &[],
        config.line_width,
    );
    transport.submit(&job.encode())?;
    println!("Test page sent to {}", transport.describe());
    Ok(())
}

fn check_config() -> Result<(), BuzonError> {
    let config = Config::from_env()?;

    println!("Configuration OK");
    println!("  printer: {:?}", config.transport);
    println!(
        "  line width: {} chars, raster width: {} dots",
        config.line_width, config.raster_width
    );
    println!(
        "  state file: {} (limit {})",
        config.state_file.display(),
        config.state_limit
    );
    println!(
        "  poll timeout: {}s, max photo: {} MiB, max attachments: {}",
        config.poll_timeout.as_secs(),
        config.max_photo_bytes / (1024 * 1024),
        config.max_attachments
    );
    if config.allowlist.permits_everyone() {
        warn!("Allowlist is empty: ALL senders are permitted");
        println!("  allowlist: EMPTY (all senders permitted)");
    } else {
        println!("  allowlist: {} sender(s)", config.allowlist.len());
    }
    println!("  contacts: {} name(s)", config.contacts.len());
    Ok(())
}
