//! Loan Advisor Server Entry Point

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use loan_advisor_agent::LoanAdvisor;
use loan_advisor_config::{load_settings, Settings};
use loan_advisor_core::{CustomerDirectory, LanguageModel};
use loan_advisor_llm::{OpenAIBackend, OpenAIConfig};
use loan_advisor_server::{create_router, init_metrics, AppState, Console, ConsoleExit};
use loan_advisor_telephony::{Dialer, TwilioClient};

#[derive(Debug, Parser)]
#[command(name = "loan-advisor", version, about = "Twilio voice loan advisor")]
struct Cli {
    /// Config overlay to load from config/{env}.yaml (defaults to $LOAN_ADVISOR_ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook server (default)
    Serve {
        /// Also run the interactive dialer on stdin
        #[arg(long)]
        console: bool,
    },
    /// Place one outbound call and exit
    Dial {
        #[arg(long)]
        phone: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = cli.env.or_else(|| std::env::var("LOAN_ADVISOR_ENV").ok());
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);
    config.validate().context("invalid configuration")?;

    tracing::info!("Starting Loan Advisor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let directory: Arc<dyn CustomerDirectory> = Arc::new(
        config
            .customers
            .directory()
            .context("failed to load customer records")?,
    );
    let dialer = build_dialer(&config);

    match cli.command.unwrap_or(Command::Serve { console: false }) {
        Command::Dial { phone } => dial_once(directory.as_ref(), dialer, &phone).await,
        Command::Serve { console } => serve(config, directory, dialer, console).await,
    }
}

/// Twilio client when credentials and a public URL are configured
fn build_dialer(config: &Settings) -> Option<Arc<dyn Dialer>> {
    if let Err(e) = config.check_telephony_ready() {
        tracing::warn!(error = %e, "Outbound calling disabled");
        return None;
    }

    match TwilioClient::new(&config.telephony) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build Twilio client");
            None
        }
    }
}

async fn dial_once(
    directory: &dyn CustomerDirectory,
    dialer: Option<Arc<dyn Dialer>>,
    phone: &str,
) -> anyhow::Result<()> {
    let customer = directory
        .get(phone)
        .with_context(|| format!("Customer not found for phone number: {}", phone))?;
    let dialer = dialer.context("Twilio credentials and public_base_url must be configured")?;

    tracing::info!(phone = %phone, customer = %customer.full_name, "Dialing customer");
    let call_sid = dialer.place_call(phone).await?;
    println!("Call initiated: {} ({})", call_sid, customer.full_name);
    Ok(())
}

async fn serve(
    config: Settings,
    directory: Arc<dyn CustomerDirectory>,
    dialer: Option<Arc<dyn Dialer>>,
    console: bool,
) -> anyhow::Result<()> {
    let llm: Arc<dyn LanguageModel> = Arc::new(
        OpenAIBackend::new(OpenAIConfig::from(&config.llm)).context("failed to build LLM backend")?,
    );
    tracing::info!(model = %llm.model_name(), "LLM backend ready");

    let advisor = Arc::new(LoanAdvisor::from_settings(&config, llm.clone(), directory.clone()));

    let mut state = AppState::new(config.clone(), llm, advisor);
    if let Some(dialer) = dialer.clone() {
        state = state.with_dialer(dialer);
    }
    if config.observability.metrics_enabled {
        if let Some(handle) = init_metrics() {
            state = state.with_metrics(handle);
            tracing::info!("Initialized Prometheus metrics at /metrics");
        }
    }

    let cleanup = state.calls.start_cleanup_task();
    let app = create_router(state);

    let ip: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid server.host {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);
    tracing::info!(
        base_url = %config.telephony.public_base_url,
        "Webhooks: /voice/start, /voice/process, /voice/status"
    );

    let shutdown = async move {
        if console {
            run_console(directory, dialer).await;
        } else {
            shutdown_signal().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let _ = cleanup.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Drive the dialer console until it exits or a signal arrives
async fn run_console(directory: Arc<dyn CustomerDirectory>, dialer: Option<Arc<dyn Dialer>>) {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut console = Console::new(input, tokio::io::stdout(), directory, dialer);

    tokio::select! {
        _ = shutdown_signal() => {}
        exit = console.run() => {
            match exit {
                Ok(ConsoleExit::Quit) => {
                    println!("\nThank you for using the Loan Advisor system!");
                }
                Ok(ConsoleExit::InputClosed) => tracing::info!("Console input closed"),
                Err(e) => tracing::error!(error = %e, "Console failed"),
            }
            tracing::info!("Console exited, initiating graceful shutdown...");
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("loan_advisor={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
