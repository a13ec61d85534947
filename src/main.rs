use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meli_flip::config::{self, Config};
use meli_flip::engine::CategoryResolver;
use meli_flip::execution::Publisher;
use meli_flip::meli::auth::{TokenManager, TokenPair};
use meli_flip::meli::rest::MeliRest;
use meli_flip::{pipeline, report};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "meli-flip",
    version,
    about = "Scrape a distributor portal, price the catalog against Mercado Livre and manage the listings"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Enable debug logging.
    #[arg(long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log into the portal, scrape every category and write the comparison
    /// spreadsheet.
    Run,
    /// Publish rows from a comparison spreadsheet to Mercado Livre.
    Publish {
        /// Publish every row, not only the worthwhile ones.
        #[arg(long)]
        all: bool,
        /// Log what would be published without calling the API.
        #[arg(long)]
        dry_run: bool,
        /// Spreadsheet to read (defaults to the configured report path).
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Delete every active listing on the Mercado Livre account.
    Purge {
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
        /// Log what would be deleted without calling the API.
        #[arg(long)]
        dry_run: bool,
    },
    /// Exchange an OAuth authorization code for the initial token pair.
    Auth {
        /// Code from the OAuth redirect (TG-...).
        #[arg(long)]
        code: String,
        /// Redirect URI registered with the application.
        #[arg(long)]
        redirect_uri: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "meli_flip=debug"
    } else {
        "meli_flip=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Saved credentials from .env; real environment variables win.
    Config::load_env_file();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Run => {
            println!();
            println!("  meli-flip v{}", env!("CARGO_PKG_VERSION"));
            println!("  Portal: {}", config.portal.base_url);
            let username = Config::portal_username()?;
            let cnpj = Config::portal_cnpj()?;
            let summary = pipeline::run(&config, &username, &cnpj).await?;
            println!();
            println!(
                "  {} products compared, {} worth publishing. Report: {}",
                summary.scraped,
                summary.worthwhile,
                summary.report_path.display()
            );
        }
        Command::Publish { all, dry_run, input } => {
            let path = input.unwrap_or_else(|| PathBuf::from(&config.report.output_path));
            let rows = report::read_report(&path).with_context(|| {
                format!(
                    "could not read comparison spreadsheet {} (run `meli-flip run` first)",
                    path.display()
                )
            })?;
            let mut rest = authed_rest(&config)?;
            let resolver = CategoryResolver::new(
                config.meli.category_map.clone(),
                config.meli.default_category.clone(),
            );
            let mut publisher = Publisher::new(
                &mut rest,
                resolver,
                config.strategy.clone(),
                config.meli.clone(),
                dry_run,
            );
            let summary = publisher.publish_batch(&rows, all).await?;
            println!();
            if dry_run {
                println!(
                    "  Dry run: {} of {} rows would be published.",
                    summary.attempted,
                    rows.len()
                );
            } else {
                println!(
                    "  {} published, {} failed, {} skipped (of {} rows).",
                    summary.published,
                    summary.failed,
                    summary.skipped,
                    rows.len()
                );
            }
        }
        Command::Purge { yes, dry_run } => {
            if !yes && !dry_run {
                // A bare Enter aborts like any other answer.
                let answer = config::prompt_optional(
                    "Delete ALL active listings on the account? Type 'delete' to confirm",
                )?;
                if answer != "delete" {
                    println!("  Aborted.");
                    return Ok(());
                }
            }
            let mut rest = authed_rest(&config)?;
            let resolver = CategoryResolver::new(
                config.meli.category_map.clone(),
                config.meli.default_category.clone(),
            );
            let mut publisher = Publisher::new(
                &mut rest,
                resolver,
                config.strategy.clone(),
                config.meli.clone(),
                dry_run,
            );
            let summary = publisher.purge_all().await?;
            println!();
            if dry_run {
                println!(
                    "  Dry run: {} active listings would be deleted.",
                    summary.found
                );
            } else {
                println!(
                    "  {} of {} active listings deleted ({} failed).",
                    summary.deleted, summary.found, summary.failed
                );
            }
        }
        Command::Auth { code, redirect_uri } => {
            let client_id = Config::meli_client_id()?;
            let client_secret = Config::meli_client_secret()?;
            let mut auth = TokenManager::new(
                &config.meli.api_base,
                client_id,
                client_secret,
                TokenPair::default(),
                PathBuf::from(config::ENV_FILE),
            );
            auth.exchange_code(&code, &redirect_uri).await?;
            println!("  Token pair obtained and saved to {}", config::ENV_FILE);
        }
    }

    Ok(())
}

/// REST client with the account credentials loaded (env vars, .env, or an
/// interactive prompt).
fn authed_rest(config: &Config) -> Result<MeliRest> {
    let client_id = Config::meli_client_id()?;
    let client_secret = Config::meli_client_secret()?;
    let tokens = TokenPair {
        access_token: Config::meli_access_token()?,
        refresh_token: Config::meli_refresh_token()?,
    };
    let auth = TokenManager::new(
        &config.meli.api_base,
        client_id,
        client_secret,
        tokens,
        PathBuf::from(config::ENV_FILE),
    );
    Ok(MeliRest::new(&config.meli, Some(auth)))
}
