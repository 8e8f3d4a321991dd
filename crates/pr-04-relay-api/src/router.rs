//! Routes:
//!
//! - `POST /api/mint` `{recipient, amount?}` → `{success, hash|error}`
//! - `GET /health` → `{status: "OK", timestamp}`
//! - `GET /metrics` → Prometheus text

use crate::domain::error::ApiError;
use crate::ports::Minter;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Address, U256};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    minter: Arc<dyn Minter>,
}

/// Mint request body. Both fields are loosely typed so that validation
/// produces this API's own error messages.
#[derive(Debug, Default, Deserialize)]
pub struct MintBody {
    #[serde(default)]
    pub recipient: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub timestamp: String,
}

/// Build the API router around `minter`.
pub fn build_router(minter: Arc<dyn Minter>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/mint", post(mint))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { minter })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

async fn mint(
    State(state): State<AppState>,
    body: Result<Json<MintBody>, JsonRejection>,
) -> Result<Json<MintReply>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let recipient = match body.recipient {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(other) => Some(other),
    }
    .ok_or_else(|| ApiError::BadRequest("Recipient address is required".into()))?;

    let recipient = recipient
        .as_str()
        .and_then(|s| Address::parse(s).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid recipient address".into()))?;

    let amount = body.amount.as_ref().map(parse_amount).transpose()?;

    // Mint failures are reported in the body, not as HTTP errors
    let reply = match state.minter.mint(&recipient, amount).await {
        Ok(tx_hash) => {
            info!(%recipient, %tx_hash, "Mint served");
            MintReply {
                success: true,
                hash: Some(tx_hash.to_hex()),
                error: None,
            }
        }
        Err(e) => {
            warn!(%recipient, error = %e, "Mint request failed");
            MintReply {
                success: false,
                hash: None,
                error: Some(e.message),
            }
        }
    };
    Ok(Json(reply))
}

/// Amounts arrive as a JSON number, a decimal string or a `0x` hex string.
fn parse_amount(value: &Value) -> Result<U256, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid amount".into());
    let amount = match value {
        Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(invalid)?,
        Value::String(s) => match s.strip_prefix("0x") {
            Some(digits) => U256::from_str_radix(digits, 16).map_err(|_| invalid())?,
            None => U256::from_dec_str(s).map_err(|_| invalid())?,
        },
        _ => return Err(invalid()),
    };
    if amount.is_zero() {
        return Err(invalid());
    }
    Ok(amount)
}

async fn health() -> Json<HealthReply> {
    Json(HealthReply {
        status: "OK".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let text = registry_telemetry::encode_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
