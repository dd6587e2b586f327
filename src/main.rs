use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use naqra_bot::backend::{MediaBackend, YtDlpBackend};
use naqra_bot::bot::Bot;
use naqra_bot::utils;
use naqra_bot::{derive_menu, Cli, Commands, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run { token } => {
            warn_missing_dependencies(&config.backend.yt_dlp_path).await;

            let bot = Bot::new(config.with_token(token))?;
            bot.run().await?;
        }
        Commands::Resolve { url } => {
            let url = utils::validate_and_normalize_url(&url)?;
            let backend = YtDlpBackend::new(config.backend.yt_dlp_path.clone());

            tracing::info!("Resolving {} with {}", url, backend.name());
            let media = backend.resolve_metadata(&url).await?;
            let messages = config.messages();

            println!("Title: {}", media.title.as_deref().unwrap_or(messages.untitled()));
            println!("Duration: {}", messages.duration(media.duration));
            println!("Source: {}", media.source_url);
            if let Some(count) = media.entry_count {
                println!("Playlist entries: {}", count);
            }
            println!("Renditions: {}", media.renditions.len());
            println!();
            println!("Menu:");
            for entry in derive_menu(&media, &config.menu_options(), &messages) {
                println!("  [{}] {}", entry.choice, entry.label);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::config_path()?,
                };
                println!("Edit the config file to change settings:");
                println!("  {}", path.display());
            }
        }
        Commands::Check => {
            let missing = utils::check_dependencies(&config.backend.yt_dlp_path).await;
            if missing.is_empty() {
                println!("✅ yt-dlp and ffmpeg are available");
            } else {
                for dep in &missing {
                    eprintln!("   • {}", dep);
                }
                anyhow::bail!("{} required tool(s) missing", missing.len());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "naqra=debug,naqra_bot=debug"
    } else {
        "naqra=info,naqra_bot=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Missing tools are reported but not fatal; they may live outside PATH
async fn warn_missing_dependencies(yt_dlp_path: &str) {
    let missing = utils::check_dependencies(yt_dlp_path).await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}
