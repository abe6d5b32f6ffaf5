// [libs/domain/models-rs/src/wire.rs]
/*!
 * =================================================================
 * APARATO: FLEET WIRE PROTOCOL (V7.0 - FULL DUPLEX MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: TRAMAS JSON DEL STREAM BIDIRECCIONAL DE NODOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DISCRIMINATED UNION: Las tramas entrantes viajan bajo el
 *    discriminador 'type', permitiendo el despacho por tipo en el
 *    receptor sin inspección manual de claves.
 * 2. COMMAND CORRELATION: El 'id' del sobre de comando es el ancla
 *    de correlación con su 'command_result' asíncrono.
 * 3. TYPESHARE SYNERGY: El agente de nodo (TypeScript) hereda estos
 *    contratos sin deriva.
 *
 * # Mathematical Proof (Correlation Integrity):
 * Cada sobre porta un UUID v4 fresco; la probabilidad de colisión de
 * correlación en la vida útil del proceso es despreciable (< 2^-60),
 * por lo que el mapa de futuros pendientes es inequívoco.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typeshare::typeshare;

/// Telemetría agregada de recursos del host reportada en cada latido.
#[typeshare]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeResourceUsage {
    /// Porcentaje de carga de CPU (0.0 - 100.0).
    pub cpu_load_percentage: f32,
    /// Memoria consumida del host (MB).
    #[typeshare(serialized_as = "number")]
    pub memory_used_mb: u64,
    /// Espacio de disco consumido (MB).
    #[typeshare(serialized_as = "number")]
    pub disk_used_mb: u64,
}

/// Resumen de un contenedor de bot vivo, tal como lo ve el agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "instance_identifier")]
    pub instance_id: String,
    /// Huella de memoria del contenedor (MB).
    #[typeshare(serialized_as = "number")]
    pub size_mb: i64,
    /// Estado del runtime ("running", "restarting", "exited").
    pub runtime_state: String,
}

/// Latido periódico del agente de nodo.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHeartbeat {
    #[serde(rename = "node_id")]
    pub node_id: String,
    #[typeshare(serialized_as = "String")]
    pub timestamp: DateTime<Utc>,
    pub resource_usage: NodeResourceUsage,
    #[serde(default)]
    pub container_summary: Vec<ContainerSummary>,
}

/// Registro idempotente emitido por el agente tras el arranque.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistration {
    #[serde(rename = "node_id")]
    pub node_id: String,
    pub host: String,
    #[typeshare(serialized_as = "number")]
    pub capacity_mb: i64,
    pub agent_version: String,
}

/// Resultado asíncrono de un comando previamente despachado.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Ancla de correlación con el sobre original.
    #[serde(rename = "id")]
    pub command_id: String,
    /// Nombre del comando ejecutado.
    pub command: String,
    pub success: bool,
    /// Carga útil devuelta por el agente en caso de éxito.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Diagnóstico del agente en caso de fallo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Evento de salud espontáneo del agente (OOM, disco lleno, reinicio).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHealthEvent {
    #[serde(rename = "node_id")]
    pub node_id: String,
    pub severity: String,
    pub message: String,
    #[typeshare(serialized_as = "String")]
    pub timestamp: DateTime<Utc>,
}

/**
 * Unión discriminada de todas las tramas entrantes del stream de nodo.
 * El receptor despacha por 'type' hacia el procesador correspondiente.
 */
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeEnvelope {
    Heartbeat(NodeHeartbeat),
    CommandResult(CommandResult),
    Register(NodeRegistration),
    HealthEvent(NodeHealthEvent),
}

/// Sobre saliente de comando hacia el agente de nodo.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Ancla de correlación (UUID v4 fresco por despacho).
    pub id: String,
    /// Discriminador de trama para el agente.
    #[serde(rename = "type")]
    pub frame_kind: String,
    /// Nombre del comando ("deploy_instance", "destroy_instance", ...).
    pub command: String,
    /// Parámetros específicos del comando.
    pub payload: Value,
}

impl CommandEnvelope {
    /// Forja un sobre nuevo con ancla de correlación fresca.
    pub fn forge(command_name: &str, command_payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            frame_kind: "command".to_string(),
            command: command_name.to_string(),
            payload: command_payload,
        }
    }
}
