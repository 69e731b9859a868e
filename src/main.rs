mod cli;

use fileserve::{
    config::{self, Config},
    server::{self, AppContext},
    webify::{ArtifactStore, BatchPolicy, BatchReport, FileOutcome, Transcoder, WebifyOrchestrator},
};
use fileserve_av::{FfmpegToolkit, MediaClassifier, MediaToolkit, ToolRegistry};
use fileserve_db::pool::{get_conn, init_pool, DbPool};
use fileserve_db::queries::{share_files, shares};
use fileserve_db::{Share, SqliteShareRepository};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ShareSelector};
use std::path::Path;
use std::sync::Arc;

/// Load config, make sure the data directory exists, and open the database.
fn open_database(config_path: Option<&Path>) -> Result<(Config, DbPool)> {
    let config = config::load_config_or_default(config_path)?;

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!("Failed to create data directory {:?}", config.storage.data_dir)
    })?;

    let db_path = config.storage.database_path();
    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Opening database at {}", db_path_str);
    let pool = init_pool(&db_path_str)?;

    Ok((config, pool))
}

fn toolkit(config: &Config) -> Arc<dyn MediaToolkit> {
    let registry = ToolRegistry::discover(&config.tools);
    Arc::new(FfmpegToolkit::from_registry(&registry).with_encode_timeout(config.encoding.timeout()))
}

fn select_share(pool: &DbPool, selector: &ShareSelector) -> Result<Share> {
    let conn = get_conn(pool)?;
    let share = match (&selector.share_reference, selector.share_id) {
        (Some(reference), _) => shares::get_share_by_reference(&conn, reference)?,
        (None, Some(id)) => shares::get_share_by_id(&conn, id)?,
        (None, None) => anyhow::bail!("Either --share-reference or --share-id is required"),
    };
    share.context("Share not found")
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let (mut config, pool) = open_database(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting fileserve");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Delivery mode: {:?}", config.delivery.mode);

    let toolkit = toolkit(&config);
    let repository = Arc::new(SqliteShareRepository::new(pool));
    let ctx = AppContext::new(config, repository, toolkit);

    server::start_server(ctx).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fileserve=trace,fileserve_av=trace,fileserve_db=debug,fileserve_common=debug,tower_http=debug".to_string()
        } else {
            "fileserve=debug,fileserve_av=debug,fileserve_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, config_path))
        }
        Commands::CreateShare { name, password } => create_share(config_path, &name, password.as_deref()),
        Commands::DeleteShare { share } => delete_share(config_path, &share),
        Commands::AddFile {
            share,
            file_path,
            name,
        } => add_file(config_path, &share, &file_path, name.as_deref()),
        Commands::RemoveFile { reference } => remove_file(config_path, &reference),
        Commands::SetPassword {
            share,
            password,
            clear: _,
        } => set_password(config_path, &share, password.as_deref()),
        Commands::ListShares => list_shares(config_path),
        Commands::Webify { share, fail_fast } => {
            let policy = if fail_fast {
                BatchPolicy::FailFast
            } else {
                BatchPolicy::ContinueOnError
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(config_path, &share, Batch::Webify(policy)))
        }
        Commands::Previews { share } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(config_path, &share, Batch::Previews))
        }
        Commands::Probe { file, json } => {
            let config = config::load_config_or_default(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&config, &file, json))
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Version => {
            println!("fileserve {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn create_share(config_path: Option<&Path>, name: &str, password: Option<&str>) -> Result<()> {
    let (_, pool) = open_database(config_path)?;
    let conn = get_conn(&pool)?;
    let share = shares::create_share(&conn, name, password)?;

    println!("Created share {} (id {})", share.name, share.id);
    println!("  Reference: {}", share.reference);
    println!("  Protected: {}", share.is_protected());
    Ok(())
}

fn delete_share(config_path: Option<&Path>, selector: &ShareSelector) -> Result<()> {
    let (_, pool) = open_database(config_path)?;
    let share = select_share(&pool, selector)?;
    let conn = get_conn(&pool)?;
    shares::delete_share(&conn, share.id)?;

    println!("Deleted share {} ({})", share.name, share.reference);
    Ok(())
}

fn add_file(
    config_path: Option<&Path>,
    selector: &ShareSelector,
    file_path: &Path,
    name: Option<&str>,
) -> Result<()> {
    let (_, pool) = open_database(config_path)?;
    let share = select_share(&pool, selector)?;

    let absolute = std::path::absolute(file_path)
        .with_context(|| format!("Cannot make {:?} absolute", file_path))?;
    let conn = get_conn(&pool)?;
    let file = share_files::add_file_to_share(&conn, share.id, &absolute, name)?;

    println!("Added {} to share {}", file.file_name, share.name);
    println!("  Reference: {}", file.reference);
    Ok(())
}

fn remove_file(config_path: Option<&Path>, reference: &str) -> Result<()> {
    let (_, pool) = open_database(config_path)?;
    let conn = get_conn(&pool)?;
    if !share_files::remove_share_file(&conn, reference)? {
        anyhow::bail!("File not found: {}", reference);
    }

    println!("Removed file {}", reference);
    Ok(())
}

fn set_password(config_path: Option<&Path>, selector: &ShareSelector, password: Option<&str>) -> Result<()> {
    let (_, pool) = open_database(config_path)?;
    let share = select_share(&pool, selector)?;
    let conn = get_conn(&pool)?;
    shares::update_share_password(&conn, share.id, password)?;

    match password {
        Some(_) => println!("Password set for share {}", share.name),
        None => println!("Share {} is now open", share.name),
    }
    Ok(())
}

fn list_shares(config_path: Option<&Path>) -> Result<()> {
    let (_, pool) = open_database(config_path)?;
    let conn = get_conn(&pool)?;
    let all = shares::list_shares(&conn)?;

    if all.is_empty() {
        println!("No shares.");
        return Ok(());
    }

    for share in all {
        let lock = if share.is_protected() { " [protected]" } else { "" };
        println!("[{}] {}{} - {}", share.id, share.name, lock, share.reference);
        for file in share_files::get_share_files(&conn, share.id)? {
            println!("    {} {} ({})", file.reference, file.file_name, file.file_path);
        }
    }
    Ok(())
}

enum Batch {
    Webify(BatchPolicy),
    Previews,
}

async fn run_batch(config_path: Option<&Path>, selector: &ShareSelector, batch: Batch) -> Result<()> {
    let (config, pool) = open_database(config_path)?;
    let share = select_share(&pool, selector)?;

    let toolkit = toolkit(&config);
    let transcoder = Transcoder::new(
        toolkit.clone(),
        ArtifactStore::from_config(&config.storage),
        config.encoding.settings(),
    );
    let orchestrator = WebifyOrchestrator::new(
        Arc::new(SqliteShareRepository::new(pool)),
        MediaClassifier::new(toolkit),
        transcoder,
    );

    let progress = |message: &str| println!("{}", message);
    let report = match batch {
        Batch::Webify(policy) => {
            orchestrator
                .with_policy(policy)
                .ensure_artifacts(share.id, progress)
                .await?
        }
        Batch::Previews => orchestrator.ensure_previews(share.id, progress).await?,
    };

    print_report(&report);
    if report.failed() > 0 {
        anyhow::bail!("{} file(s) failed", report.failed());
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    for file in &report.files {
        let status = match &file.outcome {
            FileOutcome::Generated(kind) => format!("✓ generated {}", kind),
            FileOutcome::AlreadyPresent(kind) => format!("✓ {} already present", kind),
            FileOutcome::NotNeeded => "- not needed".to_string(),
            FileOutcome::Skipped => "- skipped (not a video)".to_string(),
            FileOutcome::Failed { kind, reason } => format!("✗ {} failed: {}", kind, reason),
        };
        println!("{}  {}", file.file_name, status);
    }
    println!(
        "\n{} generated, {} failed, {} total",
        report.generated(),
        report.failed(),
        report.files.len()
    );
}

async fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let classifier = MediaClassifier::new(toolkit(config));
    let meta = classifier.inspect(file).await?;

    if json {
        let json_str = serde_json::to_string_pretty(&meta)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", file.display());
    if let Some(duration) = meta.duration {
        let secs = duration as u64;
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if let Some(bit_rate) = meta.bit_rate {
        println!("Bitrate: {} kb/s", bit_rate / 1000);
    }
    if let Some(ref video) = meta.video {
        println!(
            "Video: {} {}x{}",
            video.codec.as_deref().unwrap_or("unknown"),
            video.width.map_or("?".to_string(), |w| w.to_string()),
            video.height.map_or("?".to_string(), |h| h.to_string()),
        );
    }

    match fileserve_av::classify::needs_preview(&meta) {
        Ok(needed) => println!("Needs preview: {}", needed),
        Err(e) => println!("Needs preview: unknown ({})", e),
    }
    match fileserve_av::classify::webify_mode(&meta) {
        Ok(mode) => println!("Webify mode: {}", mode),
        Err(e) => println!("Webify mode: unknown ({})", e),
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Video conversion will not work until they are installed.");
    }

    Ok(())
}
