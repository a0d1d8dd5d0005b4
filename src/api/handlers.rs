use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Block, BlockchainError, ChainSnapshot, KeyPair, Transaction};
use crate::node::{Node, NodeError};

/// Data structure for the node state
pub type NodeData = web::Data<Node>;

/// Body of every error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender: String,

    /// The sender's private key, proving ownership of the address
    pub pkey: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: i64,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// Index of the new block
    pub index: u64,

    /// Transactions in the new block
    pub transactions: Vec<Transaction>,

    /// Proof of work of the new block
    pub proof: u64,

    /// Hash of the block before it
    pub previous_hash: String,
}

/// Request for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceRequest {
    /// The address to look up
    pub pkey: String,
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// Confirmed balance
    pub balance: i64,
}

/// Request for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer addresses, e.g. http://192.168.0.5:5000
    pub nodes: Option<Vec<String>>,
}

/// Response for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesResponse {
    /// The message
    pub message: String,

    /// Every registered peer
    pub total_nodes: Vec<String>,
}

/// Response for the resolve endpoint
///
/// Exactly one of `chain` and `new_chain` is present.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    /// The message
    pub message: String,

    /// The local chain, when it was kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<Block>>,

    /// The adopted chain, when it was replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chain: Option<Vec<Block>>,
}

fn error_response(err: NodeError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };

    match err {
        NodeError::MalformedRequest(_)
        | NodeError::Unauthorized(_)
        | NodeError::InsufficientFunds { .. }
        | NodeError::BlockchainError(BlockchainError::TransactionError(_)) => {
            HttpResponse::BadRequest().json(body)
        }
        NodeError::BlockchainError(_) => {
            error!("Request failed: {}", body.error);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Mine a new block
///
/// Runs the proof of work and forges a block from the pending transactions,
/// paying the reward to this node
#[utoipa::path(
    get,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn mine(node: NodeData) -> impl Responder {
    match node.mine().await {
        Ok(block) => HttpResponse::Ok().json(MineResponse {
            message: "New Block Forged".to_string(),
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        }),
        Err(err) => error_response(err),
    }
}

/// Create a new transaction
///
/// Adds a new transaction to the pending transactions once the sender's key
/// and funds check out
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction queued", body = TransactionResponse),
        (status = 400, description = "Invalid transaction data", body = ErrorResponse)
    )
)]
pub async fn new_transaction(
    node: NodeData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let request = transaction_req.into_inner();

    match node
        .submit_transaction(&request.sender, &request.pkey, &request.recipient, request.amount)
        .await
    {
        Ok(index) => HttpResponse::Created().json(TransactionResponse {
            message: format!("Transaction will be added to Block {}", index),
        }),
        Err(err) => error_response(err),
    }
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.blockchain().get_pending_transactions())
}

/// Get a balance
///
/// Returns the confirmed balance of an address
#[utoipa::path(
    post,
    path = "/api/v1/balance",
    request_body = BalanceRequest,
    responses(
        (status = 201, description = "Balance computed", body = BalanceResponse),
        (status = 400, description = "Missing values", body = ErrorResponse)
    )
)]
pub async fn get_balance(node: NodeData, balance_req: web::Json<BalanceRequest>) -> impl Responder {
    let balance = node.balance(&balance_req.pkey).await;
    HttpResponse::Created().json(BalanceResponse { balance })
}

/// Get the full blockchain
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainSnapshot)
    )
)]
pub async fn get_chain(node: NodeData) -> impl Responder {
    let chain = node.blockchain().get_chain();

    HttpResponse::Ok().json(ChainSnapshot {
        length: chain.len(),
        chain,
    })
}

/// Check if the blockchain is valid
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.blockchain().is_valid())
}

/// Register peers
#[utoipa::path(
    post,
    path = "/api/v1/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 201, description = "Peers registered", body = RegisterNodesResponse),
        (status = 400, description = "Missing or invalid node list", body = ErrorResponse)
    )
)]
pub async fn register_nodes(
    node: NodeData,
    register_req: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    let nodes = match &register_req.nodes {
        Some(nodes) => nodes,
        None => {
            return error_response(NodeError::MalformedRequest(
                "Please supply a valid list of nodes".to_string(),
            ))
        }
    };

    match node.register_nodes(nodes) {
        Ok(total_nodes) => HttpResponse::Created().json(RegisterNodesResponse {
            message: "New nodes have been added".to_string(),
            total_nodes,
        }),
        Err(err) => error_response(err),
    }
}

/// Resolve conflicts
///
/// Adopts the longest valid chain among the registered peers
#[utoipa::path(
    get,
    path = "/api/v1/nodes/resolve",
    responses(
        (status = 200, description = "Consensus outcome", body = ResolveResponse)
    )
)]
pub async fn resolve_conflicts(node: NodeData) -> impl Responder {
    let replaced = node.resolve().await;
    let chain = node.blockchain().get_chain();

    let response = if replaced {
        ResolveResponse {
            message: "Our chain was replaced".to_string(),
            chain: None,
            new_chain: Some(chain),
        }
    } else {
        ResolveResponse {
            message: "Our chain is authoritative".to_string(),
            chain: Some(chain),
            new_chain: None,
        }
    };

    HttpResponse::Ok().json(response)
}

/// Create a new wallet
///
/// Creates a new address with a random keypair
///
/// The private key must be stored by your own
#[utoipa::path(
    get,
    path = "/api/v1/wallet/new",
    responses(
        (status = 200, description = "Wallet created successfully", body = KeyPair)
    )
)]
pub async fn create_wallet(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.identity().generate_key_pair())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::blockchain::Ed25519Identity;
    use crate::blockchain::IdentityService;
    use crate::node::tests::test_node;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    macro_rules! service {
        ($node:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($node))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_get_chain() {
        let app = service!(test_node("miner"));

        let req = test::TestRequest::get().uri("/api/v1/chain").to_request();
        let body: ChainSnapshot = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.length, 1);
        assert_eq!(body.chain[0].index, 1);
        assert_eq!(body.chain[0].previous_hash, "1");
    }

    #[actix_web::test]
    async fn test_mine() {
        let app = service!(test_node("miner"));

        let req = test::TestRequest::get().uri("/api/v1/mine").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "New Block Forged");
        assert_eq!(body["index"], 2);
        assert_eq!(body["proof"], 35293);
        assert_eq!(body["transactions"], json!([{"sender": "0", "recipient": "miner", "amount": 1}]));
    }

    #[actix_web::test]
    async fn test_new_transaction_flow() {
        let identity = Ed25519Identity;
        let miner = identity.generate_key_pair();
        let friend = identity.generate_key_pair();
        let app = service!(test_node(&miner.address));

        let req = test::TestRequest::get().uri("/api/v1/mine").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(json!({
                "sender": miner.address,
                "pkey": miner.private_key,
                "recipient": friend.address,
                "amount": 1
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: TransactionResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "Transaction will be added to Block 3");

        let req = test::TestRequest::get().uri("/api/v1/transactions/pending").to_request();
        let pending: Vec<Transaction> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient.0, friend.address);
    }

    #[actix_web::test]
    async fn test_new_transaction_rejections() {
        let identity = Ed25519Identity;
        let miner = identity.generate_key_pair();
        let friend = identity.generate_key_pair();
        let app = service!(test_node(&miner.address));

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(json!({"sender": miner.address, "recipient": friend.address, "amount": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // No coins mined yet
        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(json!({
                "sender": miner.address,
                "pkey": miner.private_key,
                "recipient": friend.address,
                "amount": 1
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Insufficient funds"));
    }

    #[actix_web::test]
    async fn test_balance() {
        let app = service!(test_node("miner"));

        let req = test::TestRequest::get().uri("/api/v1/mine").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/balance")
            .set_json(json!({"pkey": "miner"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: BalanceResponse = test::read_body_json(resp).await;
        assert_eq!(body.balance, 1);
    }

    #[actix_web::test]
    async fn test_register_and_resolve() {
        let app = service!(test_node("miner"));

        let req = test::TestRequest::post()
            .uri("/api/v1/nodes/register")
            .set_json(json!({"nodes": ["http://127.0.0.1:5001", "127.0.0.1:5002"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: RegisterNodesResponse = test::read_body_json(resp).await;
        assert_eq!(body.total_nodes, vec!["127.0.0.1:5001", "127.0.0.1:5002"]);

        let req = test::TestRequest::post()
            .uri("/api/v1/nodes/register")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/v1/nodes/resolve").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Our chain is authoritative");
        assert_eq!(body["chain"].as_array().map(Vec::len), Some(1));
        assert!(body.get("new_chain").is_none());
    }

    #[actix_web::test]
    async fn test_create_wallet() {
        let app = service!(test_node("miner"));

        let req = test::TestRequest::get().uri("/api/v1/wallet/new").to_request();
        let pair: KeyPair = test::call_and_read_body_json(&app, req).await;

        let identity = Ed25519Identity;
        assert!(identity.check_key_ownership(&pair.address, &pair.private_key));
    }

    #[actix_web::test]
    async fn test_validate_chain() {
        let app = service!(test_node("miner"));

        let req = test::TestRequest::get().uri("/api/v1/validate").to_request();
        let valid: bool = test::call_and_read_body_json(&app, req).await;
        assert!(valid);
    }
}
