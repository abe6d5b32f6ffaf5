// [apps/orchestrator/src/handlers/auth.rs]
/*!
 * =================================================================
 * APARATO: SESSION AUTH HANDLER (V3.0 - BROWSER CITIZENSHIP)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EMISIÓN DE COOKIES DE SESIÓN FIRMADAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TOKEN EXCHANGE: El navegador canjea un token portador válido por
 *    una cookie de sesión firmada HMAC con el secreto maestro.
 * 2. PERIMETER SYNERGY: Esta ruta vive bajo la regla 'auth-login' del
 *    limitador (5 intentos / 15 minutos por clave de cliente).
 * =================================================================
 */

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use wopr_domain_models::BearerCredential;

use crate::middleware::{derive_token_principal, forge_session_cookie};
use crate::state::AppState;

/// Cuerpo del canje de sesión.
#[derive(Debug, Deserialize)]
pub struct SignInPayload {
    /// Token portador a canjear por la cookie de sesión.
    pub access_token: String,
}

/**
 * Endpoint: POST /api/auth/sign-in
 *
 * Canjea un token portador válido (mapeado o de scope inline) por una
 * cookie de sesión firmada. Los intentos fallidos cuentan contra la
 * regla 'auth-login' del limitador.
 */
#[instrument(skip(application_state, signin_payload))]
pub async fn handle_sign_in(
    State(application_state): State<AppState>,
    Json(signin_payload): Json<SignInPayload>,
) -> Response {
    let token_material = signin_payload.access_token.as_str();

    let resolved_tenant = if let Some(mapped) =
        application_state.config.fleet_token_map.get(token_material)
    {
        Some(mapped.tenant_id.clone())
    } else if BearerCredential::parse_inline_scope(token_material).is_some() {
        Some(derive_token_principal(&application_state.config.platform_secret, token_material))
    } else {
        None
    };

    let Some(tenant_id) = resolved_tenant else {
        warn!("❌ [SIGNIN_REJECTION]: Presented token failed every resolution path.");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid or expired token" })))
            .into_response();
    };

    let session_cookie_value =
        forge_session_cookie(&application_state.config.platform_secret, &tenant_id);
    let set_cookie_header = format!(
        "wopr_session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400",
        session_cookie_value
    );

    info!("👤 [SIGNIN_SEALED]: Session issued for tenant '{}'.", tenant_id);

    let mut response = (
        StatusCode::OK,
        Json(json!({ "status": "signed_in", "tenant_identifier": tenant_id })),
    )
        .into_response();

    if let Ok(cookie_header_value) = HeaderValue::from_str(&set_cookie_header) {
        response.headers_mut().insert(header::SET_COOKIE, cookie_header_value);
    }
    response
}
