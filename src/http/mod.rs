//! # HTTP API
//!
//! Builds the axum router that exposes the ledger over HTTP. All handlers
//! share one explicitly injected `LedgerService` through axum's `State`
//! extractor; there is no global storage handle. Failures are reported as
//! JSON `{"error": "<message>"}`, including bodies that fail to parse.
//!
//! ## Endpoints
//!
//! | Method | Path                  | Description                        |
//! |--------|-----------------------|------------------------------------|
//! | GET    | `/`                   | Liveness message                   |
//! | POST   | `/register`           | Register a new user                |
//! | POST   | `/deposit`            | Deposit an amount to a user        |
//! | POST   | `/withdraw`           | Withdraw an amount from a user     |
//! | GET    | `/balance/:username`  | Current balance                    |
//! | GET    | `/history/:username`  | Deposits and withdrawals           |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::application::{LedgerError, LedgerService};
use crate::domain::{TransactionKind, TransactionRecord, cents_to_amount, format_cents};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone - the service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The ledger store every handler reads from and writes to.
    pub ledger: Arc<LedgerService>,
}

impl AppState {
    pub fn new(service: LedgerService) -> Self {
        Self {
            ledger: Arc::new(service),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router with all routes and shared state.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/register", post(register_handler))
        .route("/deposit", post(deposit_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/balance/:username", get(balance_handler))
        .route("/history/:username", get(history_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Request payload for `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
}

/// Request payload for `POST /deposit` and `POST /withdraw`.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub username: Option<String>,
    /// Decimal amount; must be positive, finite, and a whole number of cents.
    pub amount: Option<f64>,
}

/// Response payload for `POST /register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub username: String,
}

/// Response payload for endpoints that only report an outcome message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response payload for `GET /balance/:username`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub username: String,
    /// Current balance as a decimal amount.
    pub balance: f64,
}

/// One committed deposit or withdrawal in a history response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub amount: f64,
    /// RFC 3339 commit timestamp.
    pub date: String,
}

impl HistoryEntry {
    fn from_record(record: &TransactionRecord) -> Self {
        Self {
            amount: cents_to_amount(record.amount_cents),
            date: record.date.to_rfc3339(),
        }
    }
}

/// Response payload for `GET /history/:username`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub deposits: Vec<HistoryEntry>,
    pub withdrawals: Vec<HistoryEntry>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` - liveness message.
async fn home_handler() -> impl IntoResponse {
    Json(MessageResponse {
        message: "vestup ledger API is running".to_string(),
    })
}

/// `POST /register` - create a new user with balance 0.
async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let body = match require_json(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(username) = body.username else {
        return json_error(StatusCode::BAD_REQUEST, "Username required");
    };

    match state.ledger.register_user(&username).await {
        Ok(user) => (
            StatusCode::OK,
            Json(RegisterResponse {
                message: "User registered".to_string(),
                username: user.username,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /deposit` - credit an amount to a user's balance.
async fn deposit_handler(
    State(state): State<AppState>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Response {
    apply_transaction(state, body, TransactionKind::Deposit).await
}

/// `POST /withdraw` - debit an amount from a user's balance.
async fn withdraw_handler(
    State(state): State<AppState>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Response {
    apply_transaction(state, body, TransactionKind::Withdrawal).await
}

/// Shared body of the deposit and withdraw handlers.
async fn apply_transaction(
    state: AppState,
    body: Result<Json<TransactionRequest>, JsonRejection>,
    kind: TransactionKind,
) -> Response {
    let body = match require_json(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(username) = body.username else {
        return json_error(StatusCode::BAD_REQUEST, "Username required");
    };
    let Some(amount) = body.amount else {
        return json_error(StatusCode::BAD_REQUEST, "Amount required");
    };

    match state
        .ledger
        .record_transaction(&username, amount, kind)
        .await
    {
        Ok(result) => {
            let amount = format_cents(result.record.amount_cents);
            let message = match kind {
                TransactionKind::Deposit => format!("Deposited {} to {}", amount, username),
                TransactionKind::Withdrawal => format!("Withdrew {} from {}", amount, username),
            };
            (StatusCode::OK, Json(MessageResponse { message })).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /balance/:username` - current balance.
async fn balance_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Response {
    match state.ledger.balance(&username).await {
        Ok(balance) => (
            StatusCode::OK,
            Json(BalanceResponse {
                username,
                balance: cents_to_amount(balance),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /history/:username` - all deposits and withdrawals, insertion order.
async fn history_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Response {
    match state.ledger.history(&username).await {
        Ok(history) => (
            StatusCode::OK,
            Json(HistoryResponse {
                deposits: history
                    .deposits
                    .iter()
                    .map(HistoryEntry::from_record)
                    .collect(),
                withdrawals: history
                    .withdrawals
                    .iter()
                    .map(HistoryEntry::from_record)
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Build a JSON error response with the given status code.
fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Map a ledger error to its HTTP status and JSON body.
fn error_response(err: LedgerError) -> Response {
    let status = match &err {
        LedgerError::InvalidInput(_)
        | LedgerError::DuplicateUser(_)
        | LedgerError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        LedgerError::UserNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    if status == StatusCode::SERVICE_UNAVAILABLE {
        tracing::error!(error = %err, "storage failure while handling request");
    }

    json_error(status, &err.to_string())
}

/// Unwrap a JSON request body. A rejection (syntax error, wrong field type,
/// missing content type) is reported as invalid input, not as axum's
/// plain-text response.
fn require_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(error_response(LedgerError::InvalidInput(
            rejection.body_text(),
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
