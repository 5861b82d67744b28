use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use handkey::{
    config, identity, AuthError, Authenticator, CaptureFileSource, FileStore, GestureRegistry,
    LandmarkSet, LandmarkSource, Pipeline,
};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "handkey")]
#[command(version, about = "Hand-gesture credentials from hand landmark captures")]
struct Cli {
    /// Config file (defaults to the compiled-in path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a gesture from one or more captures, using the first with a hand
    Enroll {
        /// User to enroll (defaults to current user)
        #[arg(short, long)]
        user: Option<String>,
        /// Landmark capture files, tried in order
        #[arg(required = true)]
        captures: Vec<PathBuf>,
    },
    /// Verify a gesture against the enrolled credential
    Verify {
        /// User to verify (defaults to current user)
        #[arg(short, long)]
        user: Option<String>,
        /// Landmark capture files, tried in order until one matches
        #[arg(required = true)]
        captures: Vec<PathBuf>,
    },
    /// Remove the enrolled gesture for a user
    Purge {
        /// User to purge (defaults to current user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Print features, buckets and credential for a capture
    Inspect {
        /// Salt the credential with this username
        #[arg(short, long)]
        user: Option<String>,
        capture: PathBuf,
    },
    /// Add a named gesture to the registry
    Register { name: String, capture: PathBuf },
    /// Find the registered gesture closest to a capture
    Recognize { capture: PathBuf },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Enroll { user, captures } => enroll(&cfg, &resolve_user(user)?, &captures),
        Commands::Verify { user, captures } => verify(&cfg, &resolve_user(user)?, &captures),
        Commands::Purge { user } => purge(&cfg, &resolve_user(user)?),
        Commands::Inspect { user, capture } => inspect(&cfg, user.as_deref(), &capture),
        Commands::Register { name, capture } => register(&cfg, &name, &capture),
        Commands::Recognize { capture } => recognize(&cfg, &capture),
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

fn resolve_user(user: Option<String>) -> Result<String> {
    match user {
        Some(user) => Ok(user),
        None => identity::default_username(),
    }
}

fn read_hand(cfg: &config::Config, capture: &Path) -> Result<Option<LandmarkSet>> {
    CaptureFileSource::new(cfg.mirror).detect(capture)
}

fn enroll(cfg: &config::Config, user: &str, captures: &[PathBuf]) -> Result<()> {
    info!("Enrolling user: {}", user);
    let auth = Authenticator::from_config(FileStore::system(), cfg);
    let mut source = CaptureFileSource::new(cfg.mirror);

    let enrollment = auth
        .enroll_from(user, &mut source, captures)
        .map_err(with_hint)
        .context("Enrollment failed")?;

    info!(
        "✓ Enrolled {} for user {} ({})",
        enrollment.gesture, enrollment.user, enrollment.credential
    );
    Ok(())
}

fn verify(cfg: &config::Config, user: &str, captures: &[PathBuf]) -> Result<()> {
    info!("Verifying user: {}", user);
    let auth = Authenticator::from_config(FileStore::system(), cfg);
    let mut source = CaptureFileSource::new(cfg.mirror);

    let verification = auth
        .verify_from(user, &mut source, captures)
        .map_err(with_hint)
        .context("Authentication failed")?;

    info!(
        "✓ Authentication successful for {} (similarity {:.3})",
        verification.user, verification.similarity
    );
    Ok(())
}

fn with_hint(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<AuthError>().map(AuthError::hint) {
        Some(hint) => err.context(hint),
        None => err,
    }
}

fn purge(cfg: &config::Config, user: &str) -> Result<()> {
    info!("Purging enrolled gesture for user: {}", user);
    let auth = Authenticator::from_config(FileStore::system(), cfg);
    auth.purge(user).context("Failed to purge gesture")?;
    info!("✓ Gesture purged for user: {}", user);
    Ok(())
}

fn inspect(cfg: &config::Config, user: Option<&str>, capture: &Path) -> Result<()> {
    let hand = read_hand(cfg, capture)?.ok_or(AuthError::NoHandDetected)?;
    let pipeline = Pipeline::new(cfg.params());
    let derivation = pipeline.derive(&hand, user.map(str::trim));

    println!("params:     {}", pipeline.params());
    println!("gesture:    {}", handkey::Gesture::of(&hand));
    println!("angles:     {:.4?}", derivation.features.angles());
    println!("flags:      {:?}", derivation.features.flags());
    println!("buckets:    {:?}", derivation.quantized.as_slice());
    println!("credential: {}", derivation.credential);
    Ok(())
}

fn register(cfg: &config::Config, name: &str, capture: &Path) -> Result<()> {
    let hand = read_hand(cfg, capture)?.ok_or(AuthError::NoHandDetected)?;
    let credential = Pipeline::new(cfg.params()).credential(&hand, None);

    let mut registry = GestureRegistry::load(&cfg.registry)?;
    if registry.register(name, credential.clone()).is_some() {
        warn!("Replacing registered gesture '{}'", name);
    }
    registry.save(&cfg.registry)?;

    info!("✓ Registered '{}' as {}", name, credential);
    Ok(())
}

fn recognize(cfg: &config::Config, capture: &Path) -> Result<()> {
    let hand = read_hand(cfg, capture)?.ok_or(AuthError::NoHandDetected)?;
    let probe = Pipeline::new(cfg.params()).credential(&hand, None);

    let registry = GestureRegistry::load(&cfg.registry)?;
    if registry.is_empty() {
        anyhow::bail!("No gestures registered. Run 'register' first.");
    }

    match registry.best_match(&probe, cfg.policy()) {
        Some((name, decision)) => {
            println!("{} (similarity {:.3})", name, decision.similarity);
            Ok(())
        }
        None => anyhow::bail!("No registered gesture matches {}", probe),
    }
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
