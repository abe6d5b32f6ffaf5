// [apps/orchestrator/src/handlers/fleet.rs]
/*!
 * =================================================================
 * APARATO: FLEET UPLINK HANDLER (V6.0 - FULL DUPLEX MASTER)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: STREAM BIDIRECCIONAL DE NODOS Y SUPERFICIE ADMIN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL SECRET HANDSHAKE: El upgrade acepta el secreto estático de
 *    plataforma (NODE_SECRET) o el secreto persistente del nodo.
 * 2. TASK TRINITY: Downstream (comandos + keep-alive) y Upstream
 *    (despacho por tipo de trama) con limpieza determinista vía
 *    AbortHandles.
 * 3. SUPERSEDE AWARENESS: Cuando el registro instala un relevo, el
 *    stream huérfano muere sin retirar el enlace del sucesor.
 * =================================================================
 */

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};
use wopr_domain_fleet::{FleetError, NodeStore};
use wopr_domain_models::{BearerCredential, DrainStatus, NodeEnvelope, TokenScope};

use crate::middleware::insufficient_scope_response;
use crate::state::AppState;

/// Intervalo de latido físico (Ping-Pong): 25s.
/// Sintonizado para prevenir cierres por inactividad en proxies Capa 7.
const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;

/// Plazo por defecto de un comando administrativo: 10s.
const DEFAULT_COMMAND_DEADLINE_MS: u64 = 10_000;
/// Techo del plazo configurable por el llamador: 60s.
const MAX_COMMAND_DEADLINE_MS: u64 = 60_000;

/// Motivo de terminación del proceso downstream.
enum DownstreamEnd {
    /// El socket físico colapsó o el peer cerró.
    SocketLost,
    /// Un relevo selló nuestro canal; el sucesor gobierna el enlace.
    Superseded,
}

// =================================================================
// UPGRADE Y CICLO DE VIDA DEL STREAM
// =================================================================

/**
 * Endpoint: GET /internal/nodes/:node_id/ws
 *
 * Handshake del stream de nodo: bearer contra NODE_SECRET o contra el
 * secreto persistente del nodo, luego transición a WebSocket (RFC 6455).
 */
#[instrument(skip(application_state, websocket_upgrade, request_headers), fields(node = %node_id))]
pub async fn establish_node_uplink(
    State(application_state): State<AppState>,
    Path(node_id): Path<String>,
    request_headers: HeaderMap,
    websocket_upgrade: WebSocketUpgrade,
) -> Response {
    let bearer_material = request_headers
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok())
        .and_then(|header_text| header_text.strip_prefix("Bearer "));

    let Some(presented_secret) = bearer_material else {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Authentication required" })))
            .into_response();
    };

    let platform_secret_matches = application_state
        .config
        .node_secret
        .as_deref()
        .map(|node_secret| node_secret == presented_secret)
        .unwrap_or(false);

    let node_secret_matches = if platform_secret_matches {
        true
    } else {
        match application_state.node_repository.fetch(&node_id).await {
            Ok(Some(node)) => node.secret.as_deref() == Some(presented_secret),
            Ok(None) => false,
            Err(lookup_fault) => {
                error!("❌ [UPLINK_FAULT]: Node secret lookup collapsed: {}", lookup_fault);
                false
            }
        }
    };

    if !node_secret_matches {
        warn!("❌ [UPLINK_REJECTION]: Node '{}' failed the handshake.", node_id);
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid or expired token" })))
            .into_response();
    }

    debug!("🔌 [UPLINK_UPGRADE]: Negotiating protocol transition for node '{}'...", node_id);
    websocket_upgrade
        .on_upgrade(move |socket| handle_active_node_stream(socket, application_state, node_id))
}

/**
 * Orquestador soberano de la sesión de nodo.
 * Arquitectura de doble tarea: Downstream (registro -> nodo) y
 * Upstream (nodo -> procesadores), con limpieza determinista.
 */
async fn handle_active_node_stream(socket: WebSocket, application_state: AppState, node_id: String) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let mut outbound_frame_receiver =
        application_state.connection_registry.accept(&node_id).await;

    info!("⚡ [UPLINK_OPEN]: Node '{}' full-duplex stream established.", node_id);

    // --- TAREA 1: DOWNSTREAM (Registro -> Nodo) ---
    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));

        loop {
            tokio::select! {
                // Brazo 1: Pulso de vida físico (Ping-Pong).
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break DownstreamEnd::SocketLost;
                    }
                },
                // Brazo 2: Sifón de tramas salientes del CommandBus.
                outbound_frame = outbound_frame_receiver.recv() => {
                    match outbound_frame {
                        Some(serialized_frame) => {
                            if socket_sender.send(Message::Text(serialized_frame)).await.is_err() {
                                break DownstreamEnd::SocketLost;
                            }
                        },
                        // Canal sellado: un relevo gobierna el enlace.
                        None => break DownstreamEnd::Superseded,
                    }
                },
            }
        }
    });

    // --- TAREA 2: UPSTREAM (Nodo -> Procesadores) ---
    let application_state_for_upstream = application_state.clone();
    let node_id_for_upstream = node_id.clone();
    let mut upstream_task = tokio::spawn(async move {
        while let Some(network_read_result) = socket_receiver.next().await {
            match network_read_result {
                Ok(Message::Text(raw_frame)) => {
                    dispatch_inbound_frame(
                        &application_state_for_upstream,
                        &node_id_for_upstream,
                        &raw_frame,
                    )
                    .await;
                }
                Ok(Message::Close(_)) => {
                    debug!("🔌 [UPLINK_CLOSE]: Node '{}' sent termination.", node_id_for_upstream);
                    break;
                }
                Err(physical_layer_fault) => {
                    warn!(
                        "❌ [UPLINK_FAULT]: Node '{}' network error: {}",
                        node_id_for_upstream, physical_layer_fault
                    );
                    break;
                }
                _ => {} // Binary y Pong se descartan en este estrato.
            }
        }
    });

    // --- LIMPIEZA DETERMINISTA ---
    // El primer centinela que finalice dispara el colapso controlado del otro.
    tokio::select! {
        downstream_outcome = (&mut downstream_task) => {
            upstream_task.abort();
            match downstream_outcome {
                Ok(DownstreamEnd::Superseded) => {
                    // El sucesor gobierna el enlace: jamás retirarlo.
                    debug!("🔌 [UPLINK_SUPERSEDED]: Node '{}' orphan stream sealed.", node_id);
                }
                _ => application_state.connection_registry.close(&node_id).await,
            }
        },
        _ = (&mut upstream_task) => {
            downstream_task.abort();
            application_state.connection_registry.close(&node_id).await;
        },
    };

    info!("💀 [UPLINK_TERMINATED]: Node '{}' stream resources released.", node_id);
}

/**
 * Despacho por tipo de trama entrante del protocolo de flota.
 */
async fn dispatch_inbound_frame(application_state: &AppState, node_id: &str, raw_frame: &str) {
    let envelope = match serde_json::from_str::<NodeEnvelope>(raw_frame) {
        Ok(envelope) => envelope,
        Err(decoding_fault) => {
            warn!("⚠️ [FRAME_REJECTED]: Node '{}' sent malformed frame: {}", node_id, decoding_fault);
            return;
        }
    };

    match envelope {
        NodeEnvelope::Heartbeat(heartbeat) => {
            // El identificador de la trama debe coincidir con el del stream.
            if heartbeat.node_id != node_id {
                warn!(
                    "🛡️ [FRAME_SPOOF]: Stream '{}' carried heartbeat for '{}'. Dropped.",
                    node_id, heartbeat.node_id
                );
                return;
            }
            if let Err(processing_fault) =
                application_state.heartbeat_processor.process(&heartbeat).await
            {
                warn!("⚠️ [HEARTBEAT_REJECTED]: Node '{}': {}", node_id, processing_fault);
            }
        }
        NodeEnvelope::CommandResult(command_result) => {
            application_state.command_bus.resolve(command_result).await;
        }
        NodeEnvelope::Register(registration) => {
            if registration.node_id != node_id {
                warn!(
                    "🛡️ [FRAME_SPOOF]: Stream '{}' carried registration for '{}'. Dropped.",
                    node_id, registration.node_id
                );
                return;
            }
            if let Err(registration_fault) =
                application_state.node_registrar.register(&registration).await
            {
                warn!("⚠️ [REGISTRATION_REJECTED]: Node '{}': {}", node_id, registration_fault);
            }
        }
        NodeEnvelope::HealthEvent(health_event) => {
            warn!(
                "🩺 [NODE_HEALTH_EVENT]: Node '{}' [{}]: {}",
                node_id, health_event.severity, health_event.message
            );
        }
    }
}

// =================================================================
// SUPERFICIE ADMINISTRATIVA DE FLOTA
// =================================================================

/// Cuerpo de mutación del estado de drenado.
#[derive(Debug, Deserialize)]
pub struct DrainPayload {
    pub drain_status: String,
}

/// Cuerpo de despacho de un comando administrativo.
#[derive(Debug, Deserialize)]
pub struct CommandPayload {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Endpoint: GET /api/v1/fleet/nodes (scope admin)
#[instrument(skip(application_state, credential))]
pub async fn handle_list_nodes(
    State(application_state): State<AppState>,
    Extension(credential): Extension<BearerCredential>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Admin) {
        return insufficient_scope_response(TokenScope::Admin, credential.scope);
    }

    match application_state.node_repository.list_all().await {
        Ok(fleet_inventory) => {
            (StatusCode::OK, Json(json!({ "nodes": fleet_inventory }))).into_response()
        }
        Err(inventory_fault) => {
            error!("❌ [FLEET_SURFACE_FAULT]: Inventory read collapsed: {}", inventory_fault);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Fleet inventory unavailable" })),
            )
                .into_response()
        }
    }
}

/// Endpoint: GET /api/v1/fleet/nodes/:node_id/instances (scope admin)
#[instrument(skip(application_state, credential), fields(node = %node_id))]
pub async fn handle_node_instances(
    State(application_state): State<AppState>,
    Path(node_id): Path<String>,
    Extension(credential): Extension<BearerCredential>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Admin) {
        return insufficient_scope_response(TokenScope::Admin, credential.scope);
    }

    match application_state.instance_repository.list_for_node(&node_id).await {
        Ok(placed_instances) => {
            (StatusCode::OK, Json(json!({ "instances": placed_instances }))).into_response()
        }
        Err(placement_fault) => {
            error!("❌ [FLEET_SURFACE_FAULT]: Placement read collapsed: {}", placement_fault);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Placement ledger unavailable" })),
            )
                .into_response()
        }
    }
}

/// Endpoint: POST /api/v1/fleet/nodes/:node_id/drain (scope admin)
#[instrument(skip(application_state, credential, drain_payload), fields(node = %node_id))]
pub async fn handle_node_drain(
    State(application_state): State<AppState>,
    Path(node_id): Path<String>,
    Extension(credential): Extension<BearerCredential>,
    Json(drain_payload): Json<DrainPayload>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Admin) {
        return insufficient_scope_response(TokenScope::Admin, credential.scope);
    }

    let drain_status = match drain_payload.drain_status.as_str() {
        "accepting" => DrainStatus::Accepting,
        "draining" => DrainStatus::Draining,
        "drained" => DrainStatus::Drained,
        other_label => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Unknown drain status '{}'", other_label) })),
            )
                .into_response()
        }
    };

    match application_state.node_repository.set_drain_status(&node_id, drain_status).await {
        Ok(()) => {
            info!("🚰 [FLEET_DRAIN]: Node '{}' drain status updated.", node_id);
            (StatusCode::OK, Json(json!({ "status": "applied" }))).into_response()
        }
        Err(FleetError::UnknownNode(_)) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Node not found" }))).into_response()
        }
        Err(drain_fault) => {
            error!("❌ [FLEET_SURFACE_FAULT]: Drain mutation collapsed: {}", drain_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Drain mutation failed" })))
                .into_response()
        }
    }
}

/// Endpoint: POST /api/v1/fleet/nodes/:node_id/command (scope admin)
#[instrument(skip(application_state, credential, command_payload), fields(node = %node_id, command = %command_payload.command))]
pub async fn handle_node_command(
    State(application_state): State<AppState>,
    Path(node_id): Path<String>,
    Extension(credential): Extension<BearerCredential>,
    Json(command_payload): Json<CommandPayload>,
) -> Response {
    if !credential.scope.satisfies(TokenScope::Admin) {
        return insufficient_scope_response(TokenScope::Admin, credential.scope);
    }

    let caller_deadline_ms = command_payload
        .timeout_ms
        .unwrap_or(DEFAULT_COMMAND_DEADLINE_MS)
        .min(MAX_COMMAND_DEADLINE_MS);

    let dispatch_outcome = application_state
        .command_bus
        .dispatch(
            &node_id,
            &command_payload.command,
            command_payload.payload,
            Duration::from_millis(caller_deadline_ms),
        )
        .await;

    match dispatch_outcome {
        Ok(command_result) => (StatusCode::OK, Json(json!({ "result": command_result }))).into_response(),
        Err(FleetError::CommandTimeout(correlation_anchor)) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({
                "error": "Command deadline expired",
                "command_id": correlation_anchor
            })),
        )
            .into_response(),
        Err(FleetError::LinkAbsent(_)) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Node has no live stream" })),
        )
            .into_response(),
        Err(dispatch_fault) => {
            error!("❌ [FLEET_SURFACE_FAULT]: Command dispatch collapsed: {}", dispatch_fault);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": "Command dispatch failed" })))
                .into_response()
        }
    }
}
