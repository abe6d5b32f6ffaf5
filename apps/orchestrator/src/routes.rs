// INICIO DEL ARCHIVO [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V4.0 - CONTROL PLANE TOPOLOGY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA DE RED Y ORDEN DE GUARDIAS
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología soporta:
 * 1. REST del gateway de capacidades (alta frecuencia, triple guardia).
 * 2. WebSockets de flota (handshake propio, fuera del escudo API).
 * 3. Superficie administrativa (scope admin en cada handler).
 *
 * Orden de guardias sobre /api: RateLimiter (externo) -> Auth ->
 * CircuitBreaker (solo gateway) -> BudgetChecker (dentro del socket).
 * =================================================================
 */

use crate::handlers::{auth, credits, fleet, gateway, tenants};
use crate::middleware::{auth_guard, circuit_guard, rate_limit_guard};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_control_plane_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para el Dashboard y herramientas de Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE GATEWAY: invocación de capacidades (triple guardia).
    let gateway_stratum = Router::new()
        .route("/gateway/:capability", post(gateway::handle_capability_invocation))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            circuit_guard,
        ));

    // ESTRATO FINANCIERO: Ledger de créditos.
    let credits_stratum = Router::new()
        .route("/credits/topup", post(credits::handle_credit_topup))
        .route("/credits/balance", get(credits::handle_balance_query))
        .route("/credits/history", get(credits::handle_history_query));

    // ESTRATO DE FLOTA: inventario y mando (scope admin por handler).
    let fleet_stratum = Router::new()
        .route("/fleet/nodes", get(fleet::handle_list_nodes))
        .route("/fleet/nodes/:node_id/instances", get(fleet::handle_node_instances))
        .route("/fleet/nodes/:node_id/drain", post(fleet::handle_node_drain))
        .route("/fleet/nodes/:node_id/command", post(fleet::handle_node_command));

    // ESTRATO ADMINISTRATIVO: ciclo de vida terminal y gobernanza.
    let admin_stratum = Router::new()
        .route("/admin/tenants/:tenant_id", delete(tenants::handle_tenant_deletion))
        .route("/admin/tenants/:tenant_id/profile", put(tenants::handle_tenant_profile_update));

    // COMPOSICIÓN DEL ESCUDO API (Auth interno, RateLimiter externo).
    let api_surface = Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(gateway_stratum)
                .merge(credits_stratum)
                .merge(fleet_stratum)
                .merge(admin_stratum)
                .layer(middleware::from_fn_with_state(
                    application_shared_state.clone(),
                    auth_guard,
                )),
        )
        // Canje de sesión: gobernado por 'auth-login', sin auth_guard.
        .route("/api/auth/sign-in", post(auth::handle_sign_in))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            rate_limit_guard,
        ));

    // COMPOSICIÓN GLOBAL (Root Topology).
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .merge(api_surface)
        // Stream de flota: handshake dual-secret propio del handler.
        .route("/internal/nodes/:node_id/ws", get(fleet::establish_node_uplink))
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
// FIN DEL ARCHIVO [apps/orchestrator/src/routes.rs]
