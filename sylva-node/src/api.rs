//! HTTP routes for verification, the ledger and the credit marketplace

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sylva_ledger::{AuditEntry, Block, BlockData, LedgerError, TradeRecord};
use sylva_market::{
    Company, CompanyProfile, Listing, ListingFilter, ListingRequest, MarketError, MarketStats,
    OrderOutcome, Transaction,
};
use sylva_sentinel::{SentinelError, VerificationRecord, SENTINEL_MODEL_VERSION};
use tracing::{error, info, warn};

use crate::state::AppState;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Errors surfaced to HTTP clients as `{success: false, error}`
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Sentinel(#[from] SentinelError),

    #[error("Malformed request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("Malformed query: {0}")]
    Query(#[from] QueryRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Market(MarketError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Market(MarketError::DuplicateCompany(_)) => StatusCode::CONFLICT,
            ApiError::Market(MarketError::InvalidAmount(_) | MarketError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Market(MarketError::ConfigurationError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Ledger(LedgerError::BlockNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Ledger(e) if e.is_integrity_failure() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Sentinel(SentinelError::InvalidCoordinates { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Sentinel(SentinelError::InvalidConfig(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Query(rejection) => rejection.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the node's router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/verify", post(verify))
        .route("/api/estimate", post(estimate))
        .route("/api/chain", get(chain))
        .route("/api/chain/verify", get(verify_chain))
        .route("/api/audit-log", get(audit_log))
        .route("/api/sentinel-log", get(sentinel_log))
        .route("/api/marketplace/register", post(register_company))
        .route("/api/marketplace/create-listing", post(create_listing))
        .route("/api/marketplace/listings", get(listings))
        .route("/api/marketplace/buy", post(buy))
        .route("/api/marketplace/transactions", get(transactions))
        .route("/api/marketplace/stats", get(stats))
        .route("/api/marketplace/companies", get(companies))
        .route("/api/marketplace/companies/:company_id", get(company_profile))
        .route("/api/marketplace/inquiry", post(inquiry))
        .route("/health", get(health))
        .route("/version", get(version))
        .with_state(state)
}

// ---- verification and ledger ----

#[derive(Debug, Deserialize)]
pub struct CoordinatesRequest {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verification: VerificationRecord,
    pub block_index: u64,
    pub block_hash: String,
}

/// POST /api/verify
///
/// Records the verification on the ledger, whatever its status.
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<CoordinatesRequest>, JsonRejection>,
) -> ApiResult<VerifyResponse> {
    let Json(request) = payload?;
    let mut platform = state.platform.write().await;

    // Checked first so a halted ledger leaves the sentinel history untouched
    platform.ledger.ensure_writable()?;

    let record = platform.sentinel.verify(request.lat, request.lon)?;
    let block = platform
        .ledger
        .append(BlockData::Verification(record.clone()))?;
    state.persist(&mut platform.ledger, &block)?;

    info!(
        "Verification at {} recorded as block {}: {:?}",
        record.location(),
        block.index,
        record.status
    );

    Ok(Json(VerifyResponse {
        verification: record,
        block_index: block.index,
        block_hash: block.hash,
    }))
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub estimation: VerificationRecord,
}

/// POST /api/estimate
pub async fn estimate(
    State(state): State<AppState>,
    payload: Result<Json<CoordinatesRequest>, JsonRejection>,
) -> ApiResult<EstimateResponse> {
    let Json(request) = payload?;
    let platform = state.platform.read().await;
    let estimation = platform.sentinel.estimate(request.lat, request.lon)?;
    Ok(Json(EstimateResponse { estimation }))
}

#[derive(Debug, Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// GET /api/chain
pub async fn chain(State(state): State<AppState>) -> ApiResult<ChainResponse> {
    let platform = state.platform.read().await;
    let chain = platform.ledger.chain()?.to_vec();
    Ok(Json(ChainResponse {
        length: chain.len(),
        chain,
    }))
}

#[derive(Debug, Serialize)]
pub struct ChainVerifyResponse {
    pub success: bool,
    pub valid: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/chain/verify
pub async fn verify_chain(State(state): State<AppState>) -> Json<ChainVerifyResponse> {
    let platform = state.platform.read().await;
    let error = platform.ledger.chain().err().map(|e| e.to_string());

    Json(ChainVerifyResponse {
        success: true,
        valid: error.is_none(),
        length: platform.ledger.len(),
        error,
    })
}

#[derive(Debug, Serialize)]
pub struct AuditLogResponse {
    pub entries: Vec<AuditEntry>,
    pub total_entries: usize,
}

/// GET /api/audit-log
pub async fn audit_log(State(state): State<AppState>) -> ApiResult<AuditLogResponse> {
    let platform = state.platform.read().await;
    let entries = platform.ledger.audit_log()?;
    Ok(Json(AuditLogResponse {
        total_entries: entries.len(),
        entries,
    }))
}

#[derive(Debug, Serialize)]
pub struct SentinelLogResponse {
    pub logs: Vec<VerificationRecord>,
    pub total_verifications: usize,
    pub sentinel_status: &'static str,
    pub ai_model_version: &'static str,
}

/// GET /api/sentinel-log
pub async fn sentinel_log(State(state): State<AppState>) -> Json<SentinelLogResponse> {
    let platform = state.platform.read().await;
    let logs = platform.sentinel.history().to_vec();

    Json(SentinelLogResponse {
        total_verifications: logs.len(),
        logs,
        sentinel_status: "ACTIVE",
        ai_model_version: SENTINEL_MODEL_VERSION,
    })
}

// ---- marketplace ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub company_id: String,
}

/// POST /api/marketplace/register
pub async fn register_company(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(request) = payload?;
    let mut platform = state.platform.write().await;
    let company_id = platform.market.register_company(
        &request.company_name,
        &request.industry,
        &request.country,
        request.email.as_deref(),
    )?;

    Ok(Json(RegisterResponse {
        success: true,
        company_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct CreateListingResponse {
    pub success: bool,
    pub listing: Listing,
    pub message: String,
}

/// POST /api/marketplace/create-listing
pub async fn create_listing(
    State(state): State<AppState>,
    payload: Result<Json<ListingRequest>, JsonRejection>,
) -> ApiResult<CreateListingResponse> {
    let Json(request) = payload?;
    let mut platform = state.platform.write().await;
    let listing = platform.market.create_listing(request)?;

    Ok(Json(CreateListingResponse {
        success: true,
        message: format!("Listing {} created", listing.listing_id),
        listing,
    }))
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub success: bool,
    pub listings: Vec<Listing>,
}

/// GET /api/marketplace/listings?max_price&min_amount
pub async fn listings(
    State(state): State<AppState>,
    filter: Result<Query<ListingFilter>, QueryRejection>,
) -> ApiResult<ListingsResponse> {
    let Query(filter) = filter?;
    let platform = state.platform.read().await;
    Ok(Json(ListingsResponse {
        success: true,
        listings: platform.market.active_listings(&filter),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub buyer_id: String,
    pub credit_amount: f64,
    pub max_price_per_credit: f64,
}

#[derive(Debug, Serialize)]
pub struct BuyResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: OrderOutcome,
}

/// POST /api/marketplace/buy
///
/// Every resulting transaction is appended to the ledger as a trade block
/// before the lock is released.
pub async fn buy(
    State(state): State<AppState>,
    payload: Result<Json<BuyRequest>, JsonRejection>,
) -> ApiResult<BuyResponse> {
    let Json(request) = payload?;
    let mut guard = state.platform.write().await;
    let platform = &mut *guard;

    platform.ledger.ensure_writable()?;

    let outcome = platform.market.place_buy_order(
        &request.buyer_id,
        request.credit_amount,
        request.max_price_per_credit,
    )?;

    for transaction in &outcome.match_result.transactions {
        let block = platform
            .ledger
            .append(BlockData::CarbonCreditTrade(trade_record(transaction)))?;
        state.persist(&mut platform.ledger, &block)?;
    }

    Ok(Json(BuyResponse {
        success: true,
        outcome,
    }))
}

fn trade_record(transaction: &Transaction) -> TradeRecord {
    TradeRecord {
        transaction_id: transaction.transaction_id.clone(),
        buyer: transaction.buyer_name.clone(),
        seller: transaction.seller_name.clone(),
        amount: transaction.credit_amount,
        price: transaction.price_per_credit,
        total_value: transaction.total_price,
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub company_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub success: bool,
    pub transactions: Vec<Transaction>,
}

/// GET /api/marketplace/transactions?company_id
pub async fn transactions(
    State(state): State<AppState>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> ApiResult<TransactionsResponse> {
    let Query(query) = query?;
    let platform = state.platform.read().await;
    Ok(Json(TransactionsResponse {
        success: true,
        transactions: platform.market.transactions(query.company_id.as_deref()),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: MarketStats,
}

/// GET /api/marketplace/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let platform = state.platform.read().await;
    Json(StatsResponse {
        success: true,
        stats: platform.market.compute_stats(),
    })
}

#[derive(Debug, Serialize)]
pub struct CompaniesResponse {
    pub success: bool,
    pub companies: Vec<Company>,
}

/// GET /api/marketplace/companies
pub async fn companies(State(state): State<AppState>) -> Json<CompaniesResponse> {
    let platform = state.platform.read().await;
    Json(CompaniesResponse {
        success: true,
        companies: platform.market.companies(),
    })
}

#[derive(Debug, Serialize)]
pub struct CompanyProfileResponse {
    pub success: bool,
    pub company: CompanyProfile,
}

/// GET /api/marketplace/companies/:company_id
pub async fn company_profile(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<CompanyProfileResponse> {
    let platform = state.platform.read().await;
    Ok(Json(CompanyProfileResponse {
        success: true,
        company: platform.market.company_profile(&company_id)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct InquiryRequest {
    pub listing_id: String,
    pub buyer_id: String,
}

#[derive(Debug, Serialize)]
pub struct InquiryResponse {
    pub success: bool,
    pub message: String,
    pub seller_email: String,
}

/// POST /api/marketplace/inquiry
pub async fn inquiry(
    State(state): State<AppState>,
    payload: Result<Json<InquiryRequest>, JsonRejection>,
) -> ApiResult<InquiryResponse> {
    let Json(request) = payload?;
    let mut platform = state.platform.write().await;
    let inquiry = platform
        .market
        .send_inquiry(&request.listing_id, &request.buyer_id)?;

    Ok(Json(InquiryResponse {
        success: true,
        message: inquiry.message,
        seller_email: inquiry.seller_email,
    }))
}

// ---- service ----

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct Version {
    pub version: &'static str,
}

/// GET /version
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
    })
}
