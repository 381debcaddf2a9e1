use anyhow::Context;
use clap::{Parser, Subcommand};
use tether_auth::JwtAuthenticator;
use tether_config::{load as load_config, AppConfig};
use tether_database::format_timestamp;
use tether_gateway::{create_router, GatewayState};
use tether_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Tether chat backend (serves HTTP and WebSocket by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print a bearer token for a user, for local testing
    IssueToken {
        #[arg(long)]
        user_id: i64,
    },
    /// Print a user's conversations with their latest message
    DumpConversations {
        #[arg(long)]
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Migrate => migrate().await,
        Commands::IssueToken { user_id } => issue_token(user_id).await,
        Commands::DumpConversations { user_id } => dump_conversations(user_id).await,
    }
}

async fn bootstrap() -> anyhow::Result<(AppConfig, BackendServices)> {
    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;
    Ok((config, services))
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting Tether backend");

    let (config, services) = bootstrap().await?;

    let state = GatewayState::new(
        services.hub.clone(),
        services.identity(),
        config.hub.connection_buffer,
    );
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(tether_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    services.db_pool.close().await;
    info!("backend shut down");
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    let pool = tether_database::initialize_database(&config.database)
        .await
        .context("failed to apply migrations")?;
    pool.close().await;

    println!("Migrations applied to {}", config.database.url);
    Ok(())
}

async fn issue_token(user_id: i64) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    let authenticator = JwtAuthenticator::new(&config.auth);
    let token = authenticator
        .issue(user_id)
        .with_context(|| format!("failed to issue token for user {user_id}"))?;

    println!("{token}");
    Ok(())
}

async fn dump_conversations(user_id: i64) -> anyhow::Result<()> {
    let (_config, services) = bootstrap().await?;

    let conversations = services
        .chat_service
        .list_conversations(user_id)
        .await
        .context("failed to list conversations")?;

    println!("=== CONVERSATIONS FOR USER {user_id} ===");
    if conversations.is_empty() {
        println!("No conversations found");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<34} {:<10} {:<40}",
        "ID", "With", "Last Activity", "Status", "Last Message (truncated)"
    );
    println!("{}", "-".repeat(104));

    for entry in conversations {
        let other = entry
            .conversation
            .other_participant(user_id)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string());
        let (status, preview) = match &entry.last_message {
            Some(message) => (message.status.to_string(), truncate(&message.content, 37)),
            None => ("-".to_string(), String::new()),
        };

        println!(
            "{:<6} {:<10} {:<34} {:<10} {:<40}",
            entry.conversation.id,
            other,
            format_timestamp(&entry.last_activity()),
            status,
            preview
        );
    }

    Ok(())
}

fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let head: String = content.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}
