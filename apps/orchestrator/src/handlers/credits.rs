// [apps/orchestrator/src/handlers/credits.rs]
/*!
 * =================================================================
 * APARATO: CREDIT LEDGER HANDLER (V4.0 - IDEMPOTENT SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOP-UPS, BALANCE E HISTORIAL DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT TOPUP: Un replay con el mismo 'reference_id' responde
 *    200 con el balance vigente; el Ledger ya absorbió el original.
 * 2. BOUNDARY TRANSLATION: El catálogo del Ledger se traduce a HTTP
 *    únicamente en esta frontera.
 * =================================================================
 */

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};
use wopr_domain_billing::errors::LedgerError;
use wopr_domain_models::{BearerCredential, CreditTransactionType, TokenScope};

use crate::middleware::insufficient_scope_response;
use crate::state::AppState;

/// Cuerpo de un abono de créditos (top-up del procesador externo).
#[derive(Debug, Deserialize)]
pub struct TopUpPayload {
    /// Monto en créditos (1 crédito = 10^-8 USD).
    pub amount_credits: i64,
    /// Ancla de idempotencia (sesión de checkout del procesador).
    pub reference_id: String,
    #[serde(default)]
    pub funding_source: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Paginación del historial.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_history_limit() -> u32 {
    50
}

fn ledger_fault_response(fault: LedgerError) -> Response {
    match fault {
        LedgerError::InvalidAmount(amount) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid credit amount: {}", amount) })),
        )
            .into_response(),
        LedgerError::DuplicateReference => {
            // La frontera jamás debe llegar aquí: el replay se absorbe antes.
            (StatusCode::OK, Json(json!({ "status": "already_settled" }))).into_response()
        }
        LedgerError::StorageFailure(detail) => {
            error!("❌ [LEDGER_SURFACE_FAULT]: {}", detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Ledger temporarily unavailable" })),
            )
                .into_response()
        }
    }
}

/**
 * Endpoint: POST /api/v1/credits/topup
 *
 * Abono idempotente: el replay de un checkout ya liquidado responde
 * 200 con 'already_settled' y el balance vigente.
 */
#[instrument(skip(application_state, topup_payload, credential), fields(tenant = %credential.tenant_id))]
pub async fn handle_credit_topup(
    State(application_state): State<AppState>,
    Extension(credential): Extension<BearerCredential>,
    Json(topup_payload): Json<TopUpPayload>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Write) {
        return insufficient_scope_response(TokenScope::Write, credential.scope);
    }

    let credit_outcome = application_state
        .credit_ledger
        .credit(
            &credential.tenant_id,
            topup_payload.amount_credits,
            CreditTransactionType::Purchase,
            topup_payload.description,
            Some(topup_payload.reference_id.clone()),
            topup_payload.funding_source,
        )
        .await;

    match credit_outcome {
        Ok(sealed_transaction) => {
            info!(
                "💳 [TOPUP_SEALED]: Tenant {} credited {} credits.",
                credential.tenant_id, sealed_transaction.amount_credits
            );
            (
                StatusCode::OK,
                Json(json!({
                    "status": "settled",
                    "transaction_identifier": sealed_transaction.id,
                    "balance_credits": sealed_transaction.balance_after_credits,
                })),
            )
                .into_response()
        }
        // IDEMPOTENCIA: el ancla ya fue consumida; el abono original rige.
        Err(LedgerError::DuplicateReference) => {
            let current_balance = application_state
                .credit_ledger
                .balance(&credential.tenant_id)
                .await
                .unwrap_or(0);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "already_settled",
                    "reference_id": topup_payload.reference_id,
                    "balance_credits": current_balance,
                })),
            )
                .into_response()
        }
        Err(other_fault) => ledger_fault_response(other_fault),
    }
}

/// Endpoint: GET /api/v1/credits/balance
#[instrument(skip(application_state, credential), fields(tenant = %credential.tenant_id))]
pub async fn handle_balance_query(
    State(application_state): State<AppState>,
    Extension(credential): Extension<BearerCredential>,
) -> Response {
    match application_state.credit_ledger.balance(&credential.tenant_id).await {
        Ok(balance_credits) => {
            (StatusCode::OK, Json(json!({ "balance_credits": balance_credits }))).into_response()
        }
        Err(balance_fault) => ledger_fault_response(balance_fault),
    }
}

/// Endpoint: GET /api/v1/credits/history?limit&offset
#[instrument(skip(application_state, credential), fields(tenant = %credential.tenant_id))]
pub async fn handle_history_query(
    State(application_state): State<AppState>,
    Extension(credential): Extension<BearerCredential>,
    Query(history_query): Query<HistoryQuery>,
) -> Response {
    let bounded_limit = history_query.limit.min(200);

    match application_state
        .credit_ledger
        .history(&credential.tenant_id, bounded_limit, history_query.offset)
        .await
    {
        Ok(transaction_history) => {
            (StatusCode::OK, Json(json!({ "transactions": transaction_history }))).into_response()
        }
        Err(history_fault) => ledger_fault_response(history_fault),
    }
}
