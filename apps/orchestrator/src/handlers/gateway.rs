// [apps/orchestrator/src/handlers/gateway.rs]
/*!
 * =================================================================
 * APARATO: CAPABILITY GATEWAY HANDLER (V5.0 - ADMISSION PIPELINE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: INVOCACIÓN DE CAPACIDADES CON MEDICIÓN Y LIQUIDACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BOUNDARY TRANSLATION: Los resultados estructurados del dominio se
 *    traducen a HTTP únicamente aquí; el dominio jamás ve StatusCode.
 * 2. SETTLE-AFTER-METER: Tras el éxito del adaptador y el sellado del
 *    evento, el cargo se liquida como débito de consumo en el Ledger.
 * 3. SCOPE DISCIPLINE: La invocación de capacidades exige 'write'.
 * =================================================================
 */

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, instrument, warn};
use wopr_domain_gateway::{ExecuteDirective, GatewayError};
use wopr_domain_models::{
    BearerCredential, Capability, CreditTransactionType, PricingPlan, TokenScope, CREDITS_PER_USD,
};

use crate::middleware::insufficient_scope_response;
use crate::state::AppState;

/// Cuerpo de invocación de una capacidad del gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayInvocationPayload {
    /// Entrada tipada por capacidad, relevada al adaptador.
    pub input: Value,
    /// Adaptador explícito (anula la heurística de selección).
    #[serde(default)]
    pub adapter: Option<String>,
    /// Preferencia comercial puntual; en su ausencia rige el perfil.
    #[serde(default)]
    pub pricing_plan: Option<PricingPlan>,
    /// Margen puntual sobre el coste del proveedor.
    #[serde(default)]
    pub margin: Option<f64>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// El tenant aporta su propia credencial de proveedor.
    #[serde(default)]
    pub byok: bool,
}

/// Traducción canónica del catálogo del gateway hacia HTTP.
fn translate_gateway_fault(fault: GatewayError) -> Response {
    let http_status =
        StatusCode::from_u16(fault.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let diagnostic_body = match &fault {
        GatewayError::BudgetExceeded { reason } => json!({ "error": reason }),
        GatewayError::Provider(diagnostic) => json!({ "error": diagnostic }),
        other => json!({ "error": other.to_string() }),
    };

    (http_status, Json(diagnostic_body)).into_response()
}

/**
 * Endpoint: POST /api/v1/gateway/:capability
 *
 * Pipeline: (perímetro ya aplicó RateLimiter y CircuitBreaker) ->
 * BudgetChecker -> adaptador -> evento de medición -> liquidación.
 *
 * # Errors:
 * - `NOT_FOUND`: Segmento de capacidad desconocido.
 * - `TOO_MANY_REQUESTS`: Veto presupuestario con ventana nominada.
 * - `SERVICE_UNAVAILABLE`: Capacidad sin adaptador armado.
 */
#[instrument(skip(application_state, invocation_payload, credential), fields(tenant = %credential.tenant_id, capability = %capability_segment))]
pub async fn handle_capability_invocation(
    State(application_state): State<AppState>,
    Path(capability_segment): Path<String>,
    Extension(credential): Extension<BearerCredential>,
    Json(invocation_payload): Json<GatewayInvocationPayload>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Write) {
        return insufficient_scope_response(TokenScope::Write, credential.scope);
    }

    let Some(capability) = Capability::from_wire_name(&capability_segment) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown capability '{}'", capability_segment) })),
        )
            .into_response();
    };

    // Sonda de disponibilidad: capacidad sin adaptador -> 503 inmediato.
    if !application_state.adapter_socket.serves(capability) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": format!("Capability '{}' is not armed", capability_segment) })),
        )
            .into_response();
    }

    // Perfil comercial: techos de gasto y plan por defecto del tenant.
    let tenant_profile = match application_state
        .tenant_repository
        .fetch_profile(&credential.tenant_id)
        .await
    {
        Ok(profile) => profile,
        Err(profile_fault) => {
            error!("❌ [GATEWAY_FAULT]: Tenant profile read collapsed: {}", profile_fault);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Tenant profile unavailable" })),
            )
                .into_response();
        }
    };

    let mut directive =
        ExecuteDirective::new(&credential.tenant_id, capability, invocation_payload.input);
    directive.adapter = invocation_payload.adapter;
    directive.margin = invocation_payload.margin;
    directive.session_id = invocation_payload.session_id;
    directive.byok = invocation_payload.byok;
    if let Some(profile) = &tenant_profile {
        directive.spend_limits = Some(profile.spend_limits);
        directive.pricing_plan = invocation_payload.pricing_plan.or(profile.pricing_plan);
    } else {
        directive.pricing_plan = invocation_payload.pricing_plan;
    }

    let (capability_result, meter_receipt) =
        match application_state.adapter_socket.execute_with_receipt(directive).await {
            Ok(execution) => execution,
            Err(gateway_fault) => {
                warn!("⛔ [GATEWAY_VETO]: {}", gateway_fault);
                return translate_gateway_fault(gateway_fault);
            }
        };

    // LIQUIDACIÓN: el cargo medido se deduce del Ledger prepago.
    let charge_credits = (meter_receipt.charge_usd * CREDITS_PER_USD as f64).round() as i64;
    if charge_credits > 0 {
        if let Err(settlement_fault) = application_state
            .credit_ledger
            .debit(
                &credential.tenant_id,
                charge_credits,
                CreditTransactionType::Consumption,
                Some(format!("{} via {}", capability_segment, meter_receipt.provider)),
                None,
            )
            .await
        {
            // El evento ya está sellado; la conciliación nocturna nivelará
            // cualquier débito perdido desde los agregados.
            error!(
                "❌ [SETTLEMENT_FAULT]: Consumption debit failed for tenant {}: {}",
                credential.tenant_id, settlement_fault
            );
        }
    }

    (StatusCode::OK, Json(json!({ "result": capability_result }))).into_response()
}
