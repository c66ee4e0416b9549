//! Aurora stack CLI entrypoint.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aurora_stack::cli::{Cli, Commands, OutputFormatter};
use aurora_stack::config::{ConfigParser, ConfigValidator, EngineKind, StackConfig, find_config_file};
use aurora_stack::engine::{DryRunEngine, HttpEngine, ProvisioningEngine};
use aurora_stack::error::{ConfigError, Result};
use aurora_stack::pipeline::{StackPipeline, StackPlan};
use aurora_stack::state::{ManifestStore, StackManifest, open_store};
use aurora_stack::topology::{Declaration, Ec2ZoneSource, StaticZoneSource, Zone, ZoneSource};

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run stopped during {}", e.stage());
            if let Some(resource) = e.failed_resource() {
                eprintln!("Error while declaring '{resource}': {e}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Zones => cmd_zones(config_path, &formatter).await,
        Commands::Plan { detailed } => cmd_plan(config_path, detailed, &formatter).await,
        Commands::Apply { yes } => cmd_apply(config_path, yes, &formatter).await,
        Commands::Show => cmd_show(config_path, &formatter).await,
    }
}

/// Write a starter configuration.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing stack configuration in: {}", path.display());

    let config_path = path.join("aurora.stack.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/aurora.stack.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    let ignored = [".env", ".aurora/"];
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = ignored
            .iter()
            .copied()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new().append(true).open(&gitignore_path)?;
            writeln!(file, "\n# Aurora stack")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!("{}\n", ignored.join("\n")))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nStack initialized.");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in the database values");
    eprintln!("  2. Edit aurora.stack.yaml for your region and engine");
    eprintln!("  3. Run 'aurora-stack validate' to check the configuration");
    eprintln!("  4. Run 'aurora-stack plan' to see the declarations");
    eprintln!("  5. Run 'aurora-stack apply' to submit them");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let result = ConfigValidator::new().validate(&config)?;

    println!("{}", formatter.format_validation(&config, &result, show_warnings));
    Ok(())
}

/// List the zones a plan would use.
async fn cmd_zones(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_and_validate(config_path)?;
    let zone_source = create_zone_source(&config).await;
    let network = StackPipeline::new(&config, zone_source.as_ref()).plan_network().await?;

    println!(
        "{}",
        formatter.format_zones(config.region_label(), &network.zones, &network.layout)
    );
    Ok(())
}

/// Derive and print the declarations without submitting them.
async fn cmd_plan(config_path: Option<&PathBuf>, detailed: bool, formatter: &OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_and_validate(config_path)?;
    let store = open_store(&config.state, &base_dir).await?;

    let preview = prepare(&config).await?.preview().await?;
    let fingerprint = preview.fingerprint()?;

    let diff = match store.load().await? {
        Some(previous) => Some(previous.diff(preview.declarations())?),
        None => None,
    };

    println!(
        "{}",
        formatter.format_plan(&preview, &fingerprint, diff.as_ref(), detailed)
    );
    Ok(())
}

/// Submit the declarations and record the manifest.
async fn cmd_apply(config_path: Option<&PathBuf>, auto_approve: bool, formatter: &OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_and_validate(config_path)?;
    let store = open_store(&config.state, &base_dir).await?;
    let engine = create_engine(&config)?;

    let plan = prepare(&config).await?;
    let preview = plan.preview().await?;
    let fingerprint = preview.fingerprint()?;

    let previous = store.load().await?;
    let diff = match &previous {
        Some(previous) => Some(previous.diff(preview.declarations())?),
        None => None,
    };

    if let (Some(previous), Some(diff)) = (&previous, &diff) {
        if previous.is_current(engine.name(), diff) {
            eprintln!("No changes since the last apply.");
            return Ok(());
        }
        if previous.engine != engine.name() {
            eprintln!(
                "Last apply went to the {} engine; submitting everything to {}.",
                previous.engine,
                engine.name()
            );
        }
    }

    eprintln!("{}", formatter.format_plan(&preview, &fingerprint, diff.as_ref(), false));

    if !auto_approve {
        eprint!("Submit these declarations to the {} engine? [y/N]: ", engine.name());
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let applied = plan.provision(&engine).await?;
    let preview_declarations: Vec<Declaration> = preview.declarations().cloned().collect();

    let manifest = StackManifest::from_run(
        &config.project.name,
        &config.project.environment,
        applied.engine,
        applied.zones.clone(),
        &applied.to_submissions(),
        &preview_declarations,
    )?
    .with_history(previous);

    store.save(&manifest).await?;

    println!("{}", formatter.format_applied(&manifest, &store.location()));
    Ok(())
}

/// Show the manifest of the last apply.
async fn cmd_show(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_config(config_path)?;
    let store = open_store(&config.state, &base_dir).await?;

    if let Some(manifest) = store.load().await? {
        println!("{}", formatter.format_manifest(&manifest, &store.location()));
    } else {
        eprintln!("No manifest found at {}.", store.location());
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads `.env` and the configuration, returning it with its directory.
fn load_config(config_path: Option<&PathBuf>) -> Result<(StackConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let base_dir = config_file
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(base_dir.clone());
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    Ok((config, base_dir))
}

/// Loads and validates the configuration.
fn load_and_validate(config_path: Option<&PathBuf>) -> Result<(StackConfig, PathBuf)> {
    let (config, base_dir) = load_config(config_path)?;
    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        debug!("Configuration warning: {warning}");
    }
    Ok((config, base_dir))
}

/// Runs the derivation stages against the configured zone source.
async fn prepare(config: &StackConfig) -> Result<StackPlan> {
    let zone_source = create_zone_source(config).await;
    StackPipeline::new(config, zone_source.as_ref()).prepare().await
}

/// Pinned zones are used as-is; otherwise zones are discovered through EC2.
async fn create_zone_source(config: &StackConfig) -> Box<dyn ZoneSource> {
    if config.network.zones.is_empty() {
        Box::new(Ec2ZoneSource::new(config.project.region.as_deref()).await)
    } else {
        let zones = config.network.zones.iter().map(|z| Zone::new(z.as_str())).collect();
        Box::new(StaticZoneSource::new(config.region_label(), zones))
    }
}

/// Creates the configured provisioning engine.
fn create_engine(config: &StackConfig) -> Result<Box<dyn ProvisioningEngine>> {
    match config.engine.kind {
        EngineKind::DryRun => Ok(Box::new(DryRunEngine::new())),
        EngineKind::Http => {
            let url = config
                .engine
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::missing("engine.url"))?;
            let token = ConfigParser::get_engine_token(&config.engine.token_env).ok();
            if token.is_none() {
                debug!("{} not set, submitting without a bearer token", config.engine.token_env);
            }
            Ok(Box::new(HttpEngine::new(url, token, config.engine.timeout_secs)?))
        }
    }
}
