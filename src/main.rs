use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use souk::api::events::ChatEvent;
use souk::api::models::KycStatus;
use souk::app::AppConfig;
use souk::storage::Storage;
use souk::ui::browse::SortOrder;
use souk::ui::login::LoginForm;
use souk::ui::main_window::MainWindow;

#[derive(Parser)]
#[command(name = "souk", about = "Marketplace client")]
struct Cli {
    /// Backend origin; overrides the config file
    #[arg(long, env = "SOUK_API_URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Login {
        email: String,
        #[arg(long, env = "SOUK_PASSWORD")]
        password: String,
    },
    Logout,
    Search {
        query: String,
    },
    Browse {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "")]
        term: String,
        #[arg(long)]
        sort_reviews: bool,
    },
    Inbox,
    Chat {
        counterpart: String,
        #[arg(long)]
        send: Option<String>,
        /// Keep polling for this many seconds
        #[arg(long, default_value_t = 0)]
        follow: u64,
    },
    AdminKyc {
        #[arg(long)]
        approve: Option<String>,
    },
    /// Save the server URL to the config file
    Config,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if let Some(server) = &cli.server {
        config.base_url = souk::utils::normalize_url(server);
    }
    let storage = Arc::new(Storage::open_default().context("opening local storage")?);
    let window = MainWindow::new(config, Some(storage))?;

    souk::utils::block_on(run(window, cli.command))
}

async fn run(window: MainWindow, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = window.auth().login(&LoginForm { email, password }).await?;
            println!("Signed in as {:?}", session.role.unwrap_or_default());
        }
        Command::Logout => {
            window.auth().logout()?;
            println!("Signed out");
        }
        Command::Search { query } => {
            window.search().search_sellers(&query).await;
            for seller in window.search().results() {
                println!("{}\t{}\t{}, {}", seller.id, seller.name, seller.location.city, seller.location.state);
            }
        }
        Command::Browse { category, term, sort_reviews } => {
            let mut browser = window.browser().await?;
            if let Some(id) = category {
                browser.select_category(&id)?;
            }
            browser.set_term(&term);
            if sort_reviews {
                browser.set_sort(SortOrder::MostReviewed);
            }
            for seller in browser.visible_sellers() {
                println!("{}\t{}\t{} reviews", seller.id, seller.name, seller.reviews);
            }
        }
        Command::Inbox => {
            let mut inbox = window.inbox();
            inbox.refresh().await?;
            for conv in inbox.items() {
                println!("{}\t{}\t{} unread", conv.counterpart_id, conv.counterpart_name, conv.unread_count);
            }
        }
        Command::Chat { counterpart, send, follow } => {
            let mut panel = window.chat_with(&counterpart)?;
            let mut events = panel.events();
            panel.open();
            if let Some(text) = send {
                panel.send(&text).await?;
            }
            let wait = std::time::Duration::from_secs(follow).max(window.config().request_timeout());
            let deadline = tokio::time::Instant::now() + wait;
            loop {
                match tokio::time::timeout_at(deadline, events.recv()).await {
                    Ok(Ok(ChatEvent::Refreshed(messages))) => {
                        for m in messages {
                            println!("[{}] {}: {}", m.timestamp, m.sender_id, m.content);
                        }
                        if follow == 0 {
                            break;
                        }
                    }
                    Ok(Ok(ChatEvent::FetchFailed(e))) => eprintln!("fetch failed: {e}"),
                    Ok(Ok(ChatEvent::Closed)) | Ok(Err(_)) | Err(_) => break,
                }
            }
            panel.close();
        }
        Command::AdminKyc { approve } => {
            let mut dash = window.admin_dashboard()?;
            dash.load().await;
            if let Some(id) = approve {
                if let souk::ui::optimistic::MutationOutcome::RolledBack(e) = dash.approve_kyc(&id).await? {
                    bail!("approval of {id} failed: {e}");
                }
            }
            for req in dash.kyc_with_status(KycStatus::Pending) {
                println!("{}\t{}\t{}", req.id, req.seller_name, req.document_type);
            }
        }
        Command::Config => {
            let status = window.client().ping().await?;
            log::info!("server answered HTTP {status}");
            window.config().save()?;
            println!("Saved {}", window.config().base_url);
        }
    }
    Ok(())
}
