//! colabstrap - main entry point

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use colabstrap::cli::{Cli, Commands};
use colabstrap::{
    Bootstrap, BootstrapConfig, CloneOptions, CommandExecutor, DisplayPayload, EnvironmentState,
    PayloadKind, RecordingExecutor, SecretInput, process_guard,
};

/// Initialize tracing with `RUST_LOG` override, writing to stderr
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    if let Err(e) = run(cli) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let secrets = read_secrets_arg(cli.secrets, cli.secrets_file.as_deref())?;
    if cli.dry_run {
        info!("Dry-run mode: commands are printed, not executed");
        let bootstrap = Bootstrap::new(config, RecordingExecutor::dry_run())
            .with_environment(EnvironmentState::from_process());
        dispatch(bootstrap, secrets, cli.command)
    } else {
        dispatch(Bootstrap::system(config), secrets, cli.command)
    }
}

fn load_config(path: Option<&Path>) -> Result<BootstrapConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            BootstrapConfig::load_from_file(path)?
        }
        None => BootstrapConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_secrets_arg(inline: Option<String>, file: Option<&Path>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(json), _) => Ok(Some(json)),
        (None, Some(path)) => fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("Failed to read secrets from {:?}", path)),
        (None, None) => Ok(None),
    }
}

fn dispatch<E: CommandExecutor>(
    mut bootstrap: Bootstrap<E>,
    secrets: Option<String>,
    command: Commands,
) -> Result<()> {
    // Secrets given alongside another command configure this invocation first
    if !matches!(command, Commands::Secrets { .. }) {
        if let Some(ref json) = secrets {
            bootstrap.load_secrets(json.as_str(), false)?;
            if !bootstrap.executor().is_dry_run() {
                // Git spawned by pip reads the credentials through the global helper
                // SAFETY: the only other thread is the signal watcher, which never
                // touches the environment
                unsafe { bootstrap.env().export_to_process() };
            }
        }
    }

    match command {
        Commands::Secrets { overwrite, emit_env } => {
            let summary = bootstrap.load_secrets(SecretInput::from(secrets), overwrite)?;
            if emit_env {
                for line in bootstrap.env().shell_exports() {
                    println!("{}", line);
                }
            } else {
                println!("✓ {}", summary);
            }
        }
        Commands::Download { urls, silent } => {
            let targets = bootstrap.download(&urls, silent)?;
            for target in targets {
                debug!("{} -> {}", target.url, target.output);
            }
        }
        Commands::Clone {
            repos,
            depth,
            quiet,
            dest,
        } => {
            let options = CloneOptions {
                depth,
                quiet,
                dest_root: dest,
            };
            let cloned = bootstrap.clone(&repos, &options)?;
            let failed = cloned.iter().filter(|r| !r.success).count();
            if failed > 0 {
                warn!("{} of {} clone(s) failed", failed, cloned.len());
            }
        }
        Commands::Install {
            packages,
            silent,
            force,
        } => {
            bootstrap.install(&packages, silent, force)?;
        }
        Commands::Gpu => {
            bootstrap.report_gpu()?;
        }
        Commands::Display {
            kind,
            payload,
            level,
        } => {
            let payload = match kind {
                PayloadKind::Json => DisplayPayload::Json(
                    serde_json::from_str(&payload).context("Display payload is not valid JSON")?,
                ),
                PayloadKind::Html => DisplayPayload::Html(payload),
                PayloadKind::Markdown => DisplayPayload::Markdown(payload),
                PayloadKind::Heading => DisplayPayload::heading(level, payload),
            };
            println!("{}", serde_json::to_string(&payload.to_mime_bundle())?);
        }
    }

    Ok(())
}
