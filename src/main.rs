use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use donations::commands::{
    add_gateway::AddGatewayArgs, handle_add_gateway, handle_link_customer, handle_migrate,
    handle_serve,
};
use donations::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "donations",
    about = "Reconcile Stripe webhooks into the donation ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        interface: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Port for the Prometheus /metrics endpoint
        #[arg(long, default_value_t = 9091)]
        metrics_port: u16,
    },
    /// Apply pending database migrations
    Migrate,
    /// Store a tenant's Stripe keys, encrypted
    AddGateway {
        #[arg(long)]
        tenant_id: Uuid,
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        secret_key: String,
        #[arg(long)]
        webhook_key: String,
        /// Stripe product that recurring donations are billed under
        #[arg(long)]
        product_id: Option<String>,
    },
    /// Attribute a Stripe customer's donations to a person
    LinkCustomer {
        #[arg(long)]
        tenant_id: Uuid,
        #[arg(long)]
        customer_id: String,
        #[arg(long)]
        person_id: Uuid,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ServerConfig::from_env()?;

    // Guard must outlive the runtime so queued events are flushed
    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });
    init_tracing();

    let result = match cli.command {
        Commands::Serve {
            interface,
            port,
            metrics_port,
        } => handle_serve(config, interface, port, metrics_port).await,
        Commands::Migrate => handle_migrate(&config).await,
        Commands::AddGateway {
            tenant_id,
            public_key,
            secret_key,
            webhook_key,
            product_id,
        } => {
            handle_add_gateway(
                &config,
                AddGatewayArgs {
                    tenant_id,
                    public_key,
                    secret_key,
                    webhook_key,
                    product_id,
                },
            )
            .await
        }
        Commands::LinkCustomer {
            tenant_id,
            customer_id,
            person_id,
        } => handle_link_customer(&config, tenant_id, customer_id, person_id).await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}
