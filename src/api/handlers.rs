use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, Amount, Block, Blockchain, BlockchainError, ChainInfo, Transaction};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address; system-issued transfers cannot be submitted here
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer in coins, e.g. "12.50"
    pub amount: String,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: u64,

    /// Hash of the accepted transaction
    pub hash: String,
}

/// Request for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineRequest {
    /// The miner's address
    pub miner_address: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: Block,
}

/// Response for the validate endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// Whether the chain is valid
    pub valid: bool,

    /// Description of the first failure
    pub error: Option<String>,

    /// Index of the first offending block
    pub block_index: Option<usize>,
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// The queried address
    pub address: String,

    /// Balance in coins, e.g. "25.00"; may be negative
    pub balance: String,
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

fn parse_address(value: &str, field: &str) -> Result<Address, HttpResponse> {
    let value = value.trim();
    if value.is_empty() {
        return Err(bad_request(format!("{} must not be empty", field)));
    }
    Ok(Address::from(value))
}

/// Get the full blockchain
///
/// Returns the entire blockchain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    let chain = blockchain.get_chain();
    let is_valid = blockchain.is_chain_valid();

    let response = ChainResponse {
        length: chain.len(),
        chain,
        is_valid,
    };

    HttpResponse::Ok().json(response)
}

/// Get chain statistics
#[utoipa::path(
    get,
    path = "/api/v1/chain/info",
    responses(
        (status = 200, description = "Chain statistics", body = ChainInfo)
    )
)]
pub async fn get_chain_info(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(blockchain.chain_info())
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
pub async fn get_pending_transactions(blockchain: BlockchainData) -> impl Responder {
    let transactions = blockchain.get_pending_transactions();
    HttpResponse::Ok().json(transactions)
}

/// Create a new transaction
///
/// Adds a new transaction to the pending transactions. Every request names a
/// sender whose mined balance covers the amount; new coins only enter through
/// mining rewards.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction accepted", body = TransactionResponse),
        (status = 400, description = "Transaction rejected")
    )
)]
pub async fn new_transaction(
    blockchain: BlockchainData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let request = transaction_req.into_inner();

    let sender = match parse_address(&request.sender, "sender") {
        Ok(address) => address,
        Err(response) => return response,
    };

    let recipient = match parse_address(&request.recipient, "recipient") {
        Ok(address) => address,
        Err(response) => return response,
    };

    let amount: Amount = match request.amount.parse() {
        Ok(amount) => amount,
        Err(err) => return bad_request(err.to_string()),
    };

    let transaction = Transaction::new(Some(sender), recipient, amount);
    let hash = transaction.content_hash();

    match blockchain.submit_transaction(transaction) {
        Ok(block_index) => HttpResponse::Created().json(TransactionResponse {
            message: "Transaction will be added to Block".to_string(),
            block_index,
            hash,
        }),
        Err(err) => bad_request(format!("Transaction rejected: {}", err)),
    }
}

/// Mine a new block
///
/// Seals all pending transactions into a new block. The proof-of-work search
/// runs on the blocking thread pool so other requests keep being served.
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    request_body = MineRequest,
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 400, description = "Invalid mining request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(
    blockchain: BlockchainData,
    mine_req: web::Json<MineRequest>,
) -> impl Responder {
    let miner_address = match parse_address(&mine_req.miner_address, "miner_address") {
        Ok(address) => address,
        Err(response) => return response,
    };

    let chain = blockchain.get_ref().clone();
    match web::block(move || chain.mine_pending_transactions(&miner_address)).await {
        Ok(Ok(block)) => HttpResponse::Ok().json(MineResponse {
            message: "New Block Mined".to_string(),
            block,
        }),
        Ok(Err(err @ BlockchainError::EmptyChain)) => {
            error!("Mining failed: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to mine block: {}", err)
            }))
        }
        Ok(Err(err)) => bad_request(format!("Failed to mine block: {}", err)),
        Err(err) => {
            error!("Mining worker failed: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Mining worker failed"
            }))
        }
    }
}

/// Check if the blockchain is valid
///
/// Validates the entire blockchain and reports the first offending block
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = ValidationResponse)
    )
)]
pub async fn validate_chain(blockchain: BlockchainData) -> impl Responder {
    let response = match blockchain.validate() {
        Ok(()) => ValidationResponse {
            valid: true,
            error: None,
            block_index: None,
        },
        Err(err) => ValidationResponse {
            valid: false,
            block_index: err.index(),
            error: Some(err.to_string()),
        },
    };

    HttpResponse::Ok().json(response)
}

/// Get the balance of an address
///
/// Sums every mined transaction involving the address
#[utoipa::path(
    get,
    path = "/api/v1/balance/{address}",
    params(
        ("address" = String, Path, description = "Address to query")
    ),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse)
    )
)]
pub async fn get_balance(blockchain: BlockchainData, address: web::Path<String>) -> impl Responder {
    let address = Address(address.into_inner());
    let balance = blockchain.get_balance(&address);

    HttpResponse::Ok().json(BalanceResponse {
        address: address.0,
        balance: balance.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::blockchain::Balance;
    use actix_web::{http::StatusCode, test, App};

    macro_rules! service {
        ($blockchain:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($blockchain.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_get_chain() {
        let blockchain = Blockchain::new(1);
        let app = service!(blockchain);

        let req = test::TestRequest::get().uri("/api/v1/chain").to_request();
        let response: ChainResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(response.length, 1);
        assert_eq!(response.chain[0].previous_hash, "0");
        assert!(response.is_valid);
    }

    #[actix_web::test]
    async fn test_rejected_transactions() {
        let blockchain = Blockchain::new(1);
        let app = service!(blockchain);

        for body in [
            serde_json::json!({ "sender": "Alice", "recipient": "Bob", "amount": "0" }),
            serde_json::json!({ "sender": "Alice", "recipient": "Bob", "amount": "50" }),
            serde_json::json!({ "sender": "Alice", "recipient": "Bob", "amount": "ten" }),
            serde_json::json!({ "sender": "Alice", "recipient": " ", "amount": "1" }),
            serde_json::json!({ "sender": "", "recipient": "Bob", "amount": "1" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/v1/transactions/new")
                .set_json(body)
                .to_request();
            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        assert!(blockchain.get_pending_transactions().is_empty());
    }

    #[actix_web::test]
    async fn test_system_issued_transfers_are_refused() {
        let blockchain = Blockchain::new(1);
        let app = service!(blockchain);

        for body in [
            serde_json::json!({ "recipient": "Mallory", "amount": "1000000" }),
            serde_json::json!({ "sender": null, "recipient": "Mallory", "amount": "1000000" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/v1/transactions/new")
                .set_json(body)
                .to_request();
            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        assert!(blockchain.get_pending_transactions().is_empty());
        assert_eq!(blockchain.get_balance(&Address::from("Mallory")), Balance::ZERO);
    }

    #[actix_web::test]
    async fn test_submit_mine_and_query_balance() {
        let blockchain = Blockchain::new(1);
        let app = service!(blockchain);

        let req = test::TestRequest::post()
            .uri("/api/v1/mine")
            .set_json(serde_json::json!({ "miner_address": "Alice" }))
            .to_request();
        let mined: MineResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mined.block.index, 1);

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(serde_json::json!({ "sender": "Alice", "recipient": "Bob", "amount": "12.50" }))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let accepted: TransactionResponse = test::read_body_json(response).await;
        assert_eq!(accepted.block_index, 2);

        let req = test::TestRequest::post()
            .uri("/api/v1/mine")
            .set_json(serde_json::json!({ "miner_address": "Miner1" }))
            .to_request();
        let mined: MineResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mined.block.index, 2);
        assert_eq!(mined.block.transactions.len(), 2);
        assert_eq!(mined.block.transactions[0].content_hash(), accepted.hash);

        let req = test::TestRequest::get().uri("/api/v1/balance/Alice").to_request();
        let balance: BalanceResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(balance.balance, "87.50");

        let req = test::TestRequest::get().uri("/api/v1/balance/Bob").to_request();
        let balance: BalanceResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(balance.balance, "12.50");

        let req = test::TestRequest::get().uri("/api/v1/balance/Miner1").to_request();
        let balance: BalanceResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(balance.balance, "100.00");

        let req = test::TestRequest::get().uri("/api/v1/chain/info").to_request();
        let info: ChainInfo = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info.blocks, 3);
        assert_eq!(info.pending_transactions, 0);
        assert!(info.is_valid);
    }

    #[actix_web::test]
    async fn test_mine_requires_address() {
        let blockchain = Blockchain::new(1);
        let app = service!(blockchain);

        let req = test::TestRequest::post()
            .uri("/api/v1/mine")
            .set_json(serde_json::json!({ "miner_address": "" }))
            .to_request();
        let response = test::call_service(&app, req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(blockchain.block_count(), 1);
    }

    #[actix_web::test]
    async fn test_validate_reports_tampering() {
        let blockchain = Blockchain::new(1);
        blockchain.mine_pending_transactions(&Address::from("Alice")).unwrap();
        let app = service!(blockchain);

        let req = test::TestRequest::get().uri("/api/v1/validate").to_request();
        let response: ValidationResponse = test::call_and_read_body_json(&app, req).await;
        assert!(response.valid);
        assert_eq!(response.block_index, None);

        blockchain.tamper_block(1, |block| {
            block.transactions[0].amount = Amount::coins(999_999);
        });

        let req = test::TestRequest::get().uri("/api/v1/validate").to_request();
        let response: ValidationResponse = test::call_and_read_body_json(&app, req).await;
        assert!(!response.valid);
        assert_eq!(response.block_index, Some(1));
        assert_eq!(response.error.as_deref(), Some("Block 1 hash is invalid"));
    }
}
