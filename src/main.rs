use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;
mod node;

use blockchain::{Address, Blockchain, Consensus, Ed25519Identity, HttpPeerFetcher};
use config::Config;
use node::Node;

// Wire the ledger, the peer set and the identity service into one node
fn initialize_node(config: &Config) -> anyhow::Result<Node> {
    let node_identifier = config.node_identifier();
    info!("Mining rewards go to {}", node_identifier);

    let fetcher = HttpPeerFetcher::new(config.peer_timeout())
        .context("Failed to build the peer HTTP client")?;

    let node = Node::new(
        Blockchain::new(Address(node_identifier)),
        Consensus::new(Arc::new(fetcher)),
        Arc::new(Ed25519Identity),
        config.resolve_before_balance,
    );

    for peer in &config.peers {
        match node.consensus().register_node(peer) {
            Ok(location) => info!("Registered peer {}", location),
            Err(err) => warn!("Ignoring configured peer: {}", err),
        }
    }

    Ok(node)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::mine,
        api::handlers::new_transaction,
        api::handlers::get_pending_transactions,
        api::handlers::get_balance,
        api::handlers::get_chain,
        api::handlers::validate_chain,
        api::handlers::register_nodes,
        api::handlers::resolve_conflicts,
        api::handlers::create_wallet
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::Address,
            blockchain::KeyPair,
            blockchain::ChainSnapshot,
            api::handlers::ErrorResponse,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::BalanceRequest,
            api::handlers::BalanceResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::ResolveResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "1.0.0",
        description = "A proof-of-work ledger node with longest-chain consensus",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::parse();
    let node = web::Data::new(initialize_node(&config)?);

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(node.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
