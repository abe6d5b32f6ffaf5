// [libs/domain/models-rs/src/node.rs]
/*!
 * =================================================================
 * APARATO: FLEET NODE CONTRACT (V6.0 - WATCHDOG ALIGNED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDAD SOBERANA DE NODO TRABAJADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATE MACHINE PURITY: Las transiciones de estado pertenecen en
 *    exclusiva al HeartbeatProcessor y al Watchdog.
 * 2. CAPACITY INVARIANT: used_mb nunca excede capacity_mb; el agregado
 *    proviene de la suma de contenedores reportados en el latido.
 * 3. WEAK OWNERSHIP: El nodo jamás apunta a sus BotInstances; la
 *    relación vive como referencia débil en la instancia.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Máquina de estados de vitalidad de un nodo de la flota.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Aprovisionamiento en curso; aún sin primer latido.
    Provisioning,
    /// Latido reciente; apto para despacho de comandos.
    Active,
    /// Latido vencido más allá del umbral de degradación.
    Degraded,
    /// Latido vencido más allá del umbral de inalcanzabilidad.
    Unreachable,
    /// Estado terminal; el nodo no regresa a la rotación.
    Failed,
}

impl NodeStatus {
    /// Etiqueta persistida en el Motor A.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Provisioning => "provisioning",
            NodeStatus::Active => "active",
            NodeStatus::Degraded => "degraded",
            NodeStatus::Unreachable => "unreachable",
            NodeStatus::Failed => "failed",
        }
    }

    /// Resolución inversa desde la etiqueta persistida.
    pub fn from_str_label(raw_label: &str) -> Option<Self> {
        match raw_label {
            "provisioning" => Some(NodeStatus::Provisioning),
            "active" => Some(NodeStatus::Active),
            "degraded" => Some(NodeStatus::Degraded),
            "unreachable" => Some(NodeStatus::Unreachable),
            "failed" => Some(NodeStatus::Failed),
            _ => None,
        }
    }
}

/// Estado de drenado operativo para mantenimiento planificado.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrainStatus {
    /// Acepta nuevas instancias con normalidad.
    Accepting,
    /// No acepta instancias nuevas; las existentes siguen vivas.
    Draining,
    /// Vaciado completo; apto para retiro.
    Drained,
}

/// Host remoto que ejecuta contenedores de bots de tenants.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "node_identifier")]
    pub id: String,

    /// Dirección de red del agente (host:puerto o FQDN).
    pub host: String,

    pub status: NodeStatus,

    /// Etapa de aprovisionamiento reportada por el instalador.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provision_stage: Option<String>,

    /// Capacidad total de memoria para contenedores (MB).
    #[typeshare(serialized_as = "number")]
    pub capacity_mb: i64,

    /// Memoria consumida por los contenedores reportados (MB).
    #[typeshare(serialized_as = "number")]
    pub used_mb: i64,

    pub drain_status: DrainStatus,

    /// Último latido aceptado por el HeartbeatProcessor.
    #[typeshare(serialized_as = "String")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at: Option<DateTime<Utc>>,

    /// Versión del agente instalada en el host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,

    /// Secreto persistente por nodo para el handshake del stream.
    #[serde(skip_serializing)]
    #[typeshare(skip)]
    pub secret: Option<String>,
}

impl Node {
    /// Memoria libre disponible para nuevas instancias (MB).
    pub fn available_mb(&self) -> i64 {
        (self.capacity_mb - self.used_mb).max(0)
    }
}
