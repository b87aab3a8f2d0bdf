use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ludex::{
    build_reconciler, policy, scan_library, Choice, ChoiceHandler, ChooserRequest, HttpFetcher,
    LibraryData, PersistenceGateway, Platform, ReconcileOutcome, ReconcileRequest,
    ReconcilerConfig, SqliteGateway,
};

#[derive(Parser)]
#[command(name = "ludex")]
#[command(about = "Ludex game-library reconciler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path
    #[arg(short, long, default_value = "ludex.db")]
    db: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate game folders under a library root
    Scan {
        /// Library root folder
        path: PathBuf,

        /// Platform the library is registered for
        #[arg(short, long, default_value = "windows")]
        platform: String,
    },

    /// Reconcile one game against the configured providers and save it
    Reconcile {
        /// Game name to search for
        name: String,

        /// Game folder path
        path: PathBuf,

        /// Platform of the game
        #[arg(short, long, default_value = "windows")]
        platform: String,

        /// Provider configuration file (JSON)
        #[arg(short, long, default_value = "ludex.json")]
        config: PathBuf,

        /// Answer ambiguous choices with the best filtered candidate
        /// instead of prompting
        #[arg(long)]
        auto: bool,

        /// Download the poster image into this directory after saving
        #[arg(long)]
        download_art: Option<PathBuf>,
    },

    /// Show the games saved under a library root
    List {
        /// Library root folder
        path: PathBuf,

        /// Platform the library is registered for
        #[arg(short, long, default_value = "windows")]
        platform: String,
    },
}

/// Prompts on stdin for ambiguous candidates
struct StdinChooser;

#[async_trait]
impl ChoiceHandler for StdinChooser {
    async fn present(&self, request: ChooserRequest) -> Choice {
        let outcome = tokio::task::spawn_blocking(move || {
            println!(
                "\n❓ {} candidates from {} for '{}':",
                request.results.len(),
                request.provider_id,
                request.name
            );
            for (i, result) in request.results.iter().enumerate() {
                let marker = if request.filtered_results.contains(result) {
                    "*"
                } else {
                    " "
                };
                println!(" {}{:>3}. {}", marker, i + 1, result.display_name());
            }
            print!("Pick a number, [s]kip provider, or e[x]clude game: ");
            std::io::stdout().flush().ok();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return Choice::Skip;
            }
            match line.trim() {
                "s" | "S" | "" => Choice::Skip,
                "x" | "X" => Choice::Exclude,
                n => match n.parse::<usize>() {
                    Ok(i) if i >= 1 && i <= request.results.len() => {
                        Choice::Accept(request.results[i - 1].clone())
                    }
                    _ => Choice::Skip,
                },
            }
        })
        .await;

        outcome.unwrap_or(Choice::Skip)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { path, platform } => {
            let platform: Platform = platform.parse().map_err(anyhow::Error::msg)?;
            let library = LibraryData::new(&path, "cli", platform);

            let candidates = scan_library(&library)?;
            println!("🔍 {} candidate(s) under {}", candidates.len(), path.display());
            for candidate in candidates {
                println!("   {} ({})", candidate.name, candidate.path.display());
            }
        }

        Commands::Reconcile {
            name,
            path,
            platform,
            config,
            auto,
            download_art,
        } => {
            let platform: Platform = platform.parse().map_err(anyhow::Error::msg)?;
            let config: ReconcilerConfig =
                serde_json::from_str(&std::fs::read_to_string(&config)?)?;

            let handler: Arc<dyn ChoiceHandler> = if auto {
                Arc::new(policy::FirstMatch)
            } else {
                Arc::new(StdinChooser)
            };
            let service = build_reconciler(&config, handler)?;

            println!("🔍 Reconciling '{}' ({})", name, platform);
            let outcome = service
                .reconcile(ReconcileRequest::new(&name, &path, platform))
                .await?;

            match outcome {
                ReconcileOutcome::Matched(game) => {
                    println!("\n✅ Matched: {}", game.game_data.name);
                    if let Some(date) = game.game_data.release_date {
                        println!("   Released: {}", date);
                    }
                    if let Some(score) = game.game_data.critic_score {
                        println!("   Critic score: {:.1}", score);
                    }
                    if !game.game_data.genres.is_empty() {
                        println!("   Genres: {}", game.game_data.genres.join(", "));
                    }
                    println!(
                        "   Providers: {}",
                        game.provider_data
                            .iter()
                            .map(|p| p.provider_id.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );

                    let library_root = path.parent().unwrap_or(&path).to_path_buf();
                    let library = LibraryData::new(library_root, "cli", platform);
                    let gateway = SqliteGateway::new(&cli.db)?;
                    gateway.save(&game, &library).await?;
                    println!("💾 Saved to {}", cli.db);

                    if let Some(dir) = download_art {
                        download_poster(&game.image_urls.poster, &game.game_data.name, &dir)
                            .await?;
                    }
                }
                ReconcileOutcome::Excluded => {
                    println!("🚫 Excluded; no record saved");
                }
                ReconcileOutcome::Failed(errors) => {
                    println!("❌ Failed:");
                    for error in errors {
                        println!("   {}", error);
                    }
                }
            }
        }

        Commands::List { path, platform } => {
            let platform: Platform = platform.parse().map_err(anyhow::Error::msg)?;
            let library = LibraryData::new(&path, "cli", platform);
            let gateway = SqliteGateway::new(&cli.db)?;

            let games = gateway.list(&library).await?;
            println!("📚 {} game(s) under {}", games.len(), path.display());
            for game in games {
                let providers = game
                    .provider_data
                    .iter()
                    .map(|p| p.provider_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("   {} [{}]", game.game_data.name, providers);
            }
        }
    }

    Ok(())
}

async fn download_poster(
    poster: &Option<String>,
    game_name: &str,
    dir: &Path,
) -> anyhow::Result<()> {
    let Some(url) = poster else {
        println!("⚠️ No poster URL to download");
        return Ok(());
    };

    std::fs::create_dir_all(dir)?;
    let fetcher = HttpFetcher::new(Duration::from_secs(30))?;

    let progress = |downloaded: u64, total: Option<u64>| match total {
        Some(total) if total > 0 => {
            print!("\r⬇️  {} / {} bytes", downloaded, total);
            std::io::stdout().flush().ok();
        }
        _ => {
            print!("\r⬇️  {} bytes", downloaded);
            std::io::stdout().flush().ok();
        }
    };

    let bytes = fetcher.get_bytes(url, Some(&progress)).await?;
    println!();

    let file_name = format!("{}.jpg", game_name.replace('/', "_"));
    let target = dir.join(file_name);
    std::fs::write(&target, bytes)?;
    println!("🖼️  Poster saved to {}", target.display());

    Ok(())
}
