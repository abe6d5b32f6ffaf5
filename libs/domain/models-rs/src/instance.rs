// [libs/domain/models-rs/src/instance.rs]
/*!
 * =================================================================
 * APARATO: BOT INSTANCE CONTRACT (V3.0 - LIFECYCLE READY)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CARGA DE TRABAJO DE TENANT SOBRE LA FLOTA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Ciclo de vida de facturación de una instancia de bot.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceBillingState {
    /// Facturando con normalidad.
    Active,
    /// Suspendida por balance insuficiente.
    Suspended,
    /// Periodo de gracia previo a la destrucción.
    Grace,
    /// Contenedor destruido; la fila permanece para auditoría.
    Destroyed,
}

/**
 * Carga de trabajo de un tenant desplegada en algún nodo de la flota.
 * Porta una referencia débil 'node_id'; el nodo nunca apunta de vuelta.
 */
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInstance {
    #[serde(rename = "instance_identifier")]
    pub id: String,

    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,

    /// Nodo anfitrión actual; None mientras espera colocación.
    #[serde(rename = "node_identifier", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    pub billing_state: InstanceBillingState,

    /// Nivel de recursos contratado (p.ej. "standard", "performance").
    pub resource_tier: String,

    /// Reserva de almacenamiento del contenedor (MB).
    #[typeshare(serialized_as = "number")]
    pub storage_mb: i64,

    /// Instante de suspensión por impago, si aplica.
    #[typeshare(serialized_as = "String")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended_at: Option<DateTime<Utc>>,

    /// Fecha límite tras la cual el contenedor se destruye.
    #[typeshare(serialized_as = "String")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destroy_after: Option<DateTime<Utc>>,
}
