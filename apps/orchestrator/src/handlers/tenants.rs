// [apps/orchestrator/src/handlers/tenants.rs]
/*!
 * =================================================================
 * APARATO: TENANT LIFECYCLE HANDLER (V3.0 - TERMINAL SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: BORRADO TERMINAL Y GOBERNANZA DE PERFIL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. INVERTED BOUNDARY: El borrado siempre responde 200; los fallos
 *    por paso viajan en 'errors[]' del resumen (disciplina best-effort).
 * 2. ADMIN ONLY: Ambas superficies exigen el scope 'admin'.
 * =================================================================
 */

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};
use wopr_domain_models::{BearerCredential, PricingPlan, SpendLimits, TokenScope};
use wopr_infra_db::repositories::TenantProfile;

use crate::middleware::insufficient_scope_response;
use crate::state::AppState;

/**
 * Endpoint: DELETE /api/v1/admin/tenants/:tenant_id (scope admin)
 *
 * Ejecuta el pipeline de purga completo. La operación externa siempre
 * concluye en 200; el resumen porta conteos por paso y fallos capturados.
 */
#[instrument(skip(application_state, credential), fields(tenant = %tenant_id))]
pub async fn handle_tenant_deletion(
    State(application_state): State<AppState>,
    Path(tenant_id): Path<String>,
    Extension(credential): Extension<BearerCredential>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Admin) {
        return insufficient_scope_response(TokenScope::Admin, credential.scope);
    }

    info!("🗑️ [TENANT_PURGE]: Operator '{}' engaged purge for '{}'.", credential.tenant_id, tenant_id);
    let deletion_outcome = application_state.deletion_executor.execute(&tenant_id).await;

    (
        StatusCode::OK,
        Json(json!({
            "tenant_identifier": tenant_id,
            "deleted_counts": deletion_outcome.deleted_counts,
            "errors": deletion_outcome.errors,
        })),
    )
        .into_response()
}

/// Cuerpo de gobernanza del perfil comercial de un tenant.
#[derive(Debug, Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub max_per_hour_usd: Option<f64>,
    #[serde(default)]
    pub max_per_month_usd: Option<f64>,
    #[serde(default)]
    pub pricing_plan: Option<PricingPlan>,
}

/// Endpoint: PUT /api/v1/admin/tenants/:tenant_id/profile (scope admin)
#[instrument(skip(application_state, credential, profile_payload), fields(tenant = %tenant_id))]
pub async fn handle_tenant_profile_update(
    State(application_state): State<AppState>,
    Path(tenant_id): Path<String>,
    Extension(credential): Extension<BearerCredential>,
    Json(profile_payload): Json<ProfilePayload>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Admin) {
        return insufficient_scope_response(TokenScope::Admin, credential.scope);
    }

    let profile = TenantProfile {
        spend_limits: SpendLimits {
            max_per_hour_usd: profile_payload.max_per_hour_usd,
            max_per_month_usd: profile_payload.max_per_month_usd,
        },
        pricing_plan: profile_payload.pricing_plan,
    };

    match application_state.tenant_repository.upsert_profile(&tenant_id, &profile).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "applied" }))).into_response(),
        Err(profile_fault) => {
            error!("❌ [TENANT_SURFACE_FAULT]: Profile upsert collapsed: {}", profile_fault);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Profile update failed" })),
            )
                .into_response()
        }
    }
}
