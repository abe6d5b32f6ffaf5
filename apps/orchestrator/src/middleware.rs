// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: PERIMETER GUARD MATRIX (V5.0 - ADMISSION SOVEREIGN)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: AUTENTICACIÓN, CONTENCIÓN DE RÁFAGAS Y CORTACIRCUITOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GATE ORDERING: RateLimiter -> CircuitBreaker -> (Budget en el
 *    socket). El veto barato siempre precede al trabajo por tenant.
 * 2. DUAL CITIZENSHIP: Tokens portadores con scope inline
 *    (wopr_<scope>_<random>), tokens mapeados por entorno
 *    (FLEET_TOKEN_*) y cookies de sesión firmadas HMAC.
 * 3. HEADER CONTRACT: Toda respuesta gobernada porta la tríada
 *    X-RateLimit-*; las denegaciones añaden Retry-After.
 * =================================================================
 */

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::net::SocketAddr;
use tracing::{debug, warn};
use wopr_domain_gateway::rate_limiter::{resolve_client_key, RateLimitDecision};
use wopr_domain_gateway::BreakerVerdict;
use wopr_domain_models::{BearerCredential, TokenScope};

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Nombre de la cookie de sesión firmada para navegadores.
const SESSION_COOKIE_NAME: &str = "wopr_session";

// =================================================================
// DERIVACIÓN CRIPTOGRÁFICA (PLATFORM_SECRET)
// =================================================================

fn keyed_mac(platform_secret: &str, material: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(platform_secret.as_bytes())
        .expect("FATAL: HMAC accepts any key length.");
    mac.update(material.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Principal estable derivado del material de un token con scope inline.
pub fn derive_token_principal(platform_secret: &str, token_material: &str) -> String {
    let derived_digest = keyed_mac(platform_secret, token_material);
    format!("tok-{}", &derived_digest[..16])
}

/// Forja el valor de una cookie de sesión firmada: '<tenant>.<firma>'.
pub fn forge_session_cookie(platform_secret: &str, tenant_id: &str) -> String {
    format!("{}.{}", tenant_id, keyed_mac(platform_secret, tenant_id))
}

/// Verifica una cookie de sesión y devuelve el tenant firmado.
pub fn verify_session_cookie(platform_secret: &str, cookie_value: &str) -> Option<String> {
    let (tenant_id, presented_signature) = cookie_value.rsplit_once('.')?;
    let expected_signature = keyed_mac(platform_secret, tenant_id);
    if presented_signature == expected_signature {
        Some(tenant_id.to_string())
    } else {
        None
    }
}

// =================================================================
// GUARDIA DE AUTENTICACIÓN
// =================================================================

fn unauthorized_response(diagnostic: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": diagnostic }))).into_response()
}

/// Respuesta canónica 403 por privilegio insuficiente.
pub fn insufficient_scope_response(required: TokenScope, provided: TokenScope) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Insufficient scope",
            "required": required.as_str(),
            "provided": provided.as_str(),
        })),
    )
        .into_response()
}

/// Extrae la cookie de sesión de la cabecera Cookie.
fn session_cookie_of(request: &Request) -> Option<String> {
    let cookie_header = request.headers().get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|cookie_pair| {
        let (cookie_name, cookie_value) = cookie_pair.trim().split_once('=')?;
        (cookie_name == SESSION_COOKIE_NAME).then(|| cookie_value.to_string())
    })
}

/**
 * Guardia de Autenticación: el portero soberano del plano de control.
 *
 * # Logic:
 * 1. Token mapeado por entorno (FLEET_TOKEN_*) -> tenant y scope del mapa.
 * 2. Token con scope inline 'wopr_<scope>_<random>' -> principal derivado.
 * 3. Cookie de sesión firmada -> ciudadano navegador con scope write.
 * 4. En otro caso -> 401 con el diagnóstico canónico.
 */
pub async fn auth_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer_material = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok())
        .and_then(|header_text| header_text.strip_prefix("Bearer "));

    // --- ESCENARIO ALFA: TOKEN PORTADOR ---
    if let Some(token_material) = bearer_material {
        // 1. Tokens arbitrarios mapeados por configuración.
        if let Some(mapped) = application_state.config.fleet_token_map.get(token_material) {
            debug!("🔑 [AUTH]: Mapped token recognized for tenant '{}'.", mapped.tenant_id);
            request.extensions_mut().insert(BearerCredential {
                tenant_id: mapped.tenant_id.clone(),
                scope: mapped.scope,
            });
            return next.run(request).await;
        }

        // 2. Tokens con scope inline.
        if let Some(inline_scope) = BearerCredential::parse_inline_scope(token_material) {
            let principal = derive_token_principal(
                &application_state.config.platform_secret,
                token_material,
            );
            debug!("🔑 [AUTH]: Inline-scope token resolved to principal '{}'.", principal);
            request
                .extensions_mut()
                .insert(BearerCredential { tenant_id: principal, scope: inline_scope });
            return next.run(request).await;
        }

        warn!("❌ [AUTH_REJECTION]: Bearer token failed every resolution path.");
        return unauthorized_response("Invalid or expired token");
    }

    // --- ESCENARIO BETA: COOKIE DE SESIÓN FIRMADA ---
    if let Some(cookie_value) = session_cookie_of(&request) {
        match verify_session_cookie(&application_state.config.platform_secret, &cookie_value) {
            Some(tenant_id) => {
                debug!("👤 [AUTH]: Browser session accepted for tenant '{}'.", tenant_id);
                request
                    .extensions_mut()
                    .insert(BearerCredential { tenant_id, scope: TokenScope::Write });
                return next.run(request).await;
            }
            None => return unauthorized_response("Invalid or expired token"),
        }
    }

    unauthorized_response("Authentication required")
}

// =================================================================
// GUARDIA DE CONTENCIÓN DE RÁFAGAS
// =================================================================

fn apply_rate_headers(response: &mut Response, decision: &RateLimitDecision) {
    let response_headers = response.headers_mut();
    if let Ok(limit_value) = HeaderValue::from_str(&decision.limit.to_string()) {
        response_headers.insert("X-RateLimit-Limit", limit_value);
    }
    if let Ok(remaining_value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        response_headers.insert("X-RateLimit-Remaining", remaining_value);
    }
    if let Ok(reset_value) = HeaderValue::from_str(&decision.reset_epoch_seconds.to_string()) {
        response_headers.insert("X-RateLimit-Reset", reset_value);
    }
}

/**
 * Guardia de contención: consulta el contador compartido bajo la regla
 * gobernante y sella la tríada de cabeceras en TODA respuesta.
 */
pub async fn rate_limit_guard(
    State(application_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip().to_string())
        .unwrap_or_else(|| "unknown-peer".to_string());

    let forwarded_for_header = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|header_value| header_value.to_str().ok())
        .map(|header_text| header_text.to_string());

    let client_key = resolve_client_key(
        &peer_address,
        forwarded_for_header.as_deref(),
        &application_state.config.trusted_proxy_ips,
    );

    let method_label = request.method().to_string();
    let path_label = request.uri().path().to_string();

    let decision = match application_state
        .rate_limiter
        .check(&client_key, &method_label, &path_label)
        .await
    {
        Ok(decision) => decision,
        Err(counter_fault) => {
            // El contador compartido no respondió: la petición avanza sin
            // cabeceras antes que colapsar la superficie completa.
            warn!("⚠️ [RATE_GUARD_BYPASS]: Shared counter unreachable: {}", counter_fault);
            return next.run(request).await;
        }
    };

    if !decision.allowed {
        let retry_after_seconds = decision.retry_after_seconds.unwrap_or(1);
        let mut rejection = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": format!(
                    "Rate limit exceeded for scope '{}'. Retry in {}s.",
                    decision.scope, retry_after_seconds
                )
            })),
        )
            .into_response();
        apply_rate_headers(&mut rejection, &decision);
        if let Ok(retry_value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
            rejection.headers_mut().insert(header::RETRY_AFTER, retry_value);
        }
        return rejection;
    }

    let mut response = next.run(request).await;
    apply_rate_headers(&mut response, &decision);
    response
}

// =================================================================
// GUARDIA DEL CORTACIRCUITOS
// =================================================================

/**
 * Guardia del cortacircuitos del gateway: deniega con 503 mientras la
 * instancia esté en pausa defensiva.
 */
pub async fn circuit_guard(
    State(application_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match application_state.circuit_breaker.admit().await {
        Ok(BreakerVerdict::Allowed) => next.run(request).await,
        Ok(BreakerVerdict::Paused { retry_after_seconds }) => {
            let mut rejection = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Gateway circuit breaker open",
                    "retry_after": retry_after_seconds
                })),
            )
                .into_response();
            if let Ok(retry_value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                rejection.headers_mut().insert(header::RETRY_AFTER, retry_value);
            }
            rejection
        }
        Err(breaker_fault) => {
            warn!("⚠️ [BREAKER_GUARD_BYPASS]: Shared state unreachable: {}", breaker_fault);
            next.run(request).await
        }
    }
}
