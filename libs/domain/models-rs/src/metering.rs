// [libs/domain/models-rs/src/metering.rs]
/*!
 * =================================================================
 * APARATO: METERING DOMAIN CONTRACT (V5.0 - AGGREGATION READY)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: RASTRO INMUTABLE DE CONSUMO Y AGREGADOS DE PERIODO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL PRICE TRACK: Cada evento preserva 'cost_usd' (lo que paga
 *    la plataforma) y 'charge_usd' (lo que paga el tenant).
 * 2. EXACTLY-ONCE MATERIALIZATION: Los agregados de periodo se anclan
 *    a la tupla única (tenant, capability, provider, period_start).
 * 3. BYOK NEUTRALITY: Un evento BYOK viaja con cost=0 y charge=0,
 *    preservando el conteo sin generar cargo.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::capability::Capability;

/// Nivel comercial bajo el que se ejecutó la invocación.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeterTier {
    /// Capacidad servida con credenciales de la plataforma.
    Wopr,
    /// Capacidad servida bajo marca blanca de un revendedor.
    Branded,
    /// El tenant aporta su propia credencial (sin cargo).
    Byok,
}

/**
 * Registro durable de una única invocación de capacidad.
 * Se emite tras el retorno exitoso del adaptador, nunca antes.
 */
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterEvent {
    /// Identificador unívoco del evento (UUID v4).
    #[serde(rename = "event_identifier")]
    pub id: String,

    /// Tenant facturable.
    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,

    /// Capacidad invocada.
    pub capability: Capability,

    /// Proveedor upstream que sirvió la petición.
    #[serde(rename = "provider_identifier")]
    pub provider: String,

    /// Coste del proveedor para la plataforma (USD).
    pub cost_usd: f64,

    /// Precio aplicado al tenant (USD).
    pub charge_usd: f64,

    /// Duración facturable de audio/ejecución cuando aplica (segundos).
    #[serde(default)]
    pub duration_seconds: f64,

    /// Sello temporal de emisión.
    #[typeshare(serialized_as = "String")]
    pub timestamp: DateTime<Utc>,

    /// Sesión conversacional opcional que agrupa invocaciones.
    #[serde(rename = "session_identifier", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Nivel comercial de la invocación.
    pub tier: MeterTier,
}

/// Agregado de ventana móvil para las vistas del Dashboard.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,
    pub capability: Capability,
    #[serde(rename = "provider_identifier")]
    pub provider: String,
    #[typeshare(serialized_as = "String")]
    pub window_start: DateTime<Utc>,
    #[typeshare(serialized_as = "number")]
    pub event_count: i64,
    pub total_cost_usd: f64,
    pub total_charge_usd: f64,
    /// Duración acumulada de audio/ejecución cuando aplica (segundos).
    pub total_duration_seconds: f64,
}

/**
 * Agregado de periodo fijo, materializado exactamente una vez por el
 * UsageAggregator. La tupla (tenant, capability, provider, period_start)
 * porta una restricción de unicidad en el Motor A.
 */
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingPeriodSummary {
    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,
    pub capability: Capability,
    #[serde(rename = "provider_identifier")]
    pub provider: String,
    #[typeshare(serialized_as = "String")]
    pub period_start: DateTime<Utc>,
    #[typeshare(serialized_as = "number")]
    pub event_count: i64,
    pub total_cost_usd: f64,
    pub total_charge_usd: f64,
    pub total_duration_seconds: f64,
}

impl BillingPeriodSummary {
    /// Un periodo sin cargo se marca como reportado sin llamada externa.
    pub fn is_zero_value(&self) -> bool {
        self.total_charge_usd == 0.0
    }
}

/// Prueba de reporte: una fila por periodo ya transmitido al procesador externo.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalUsageReport {
    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,
    pub capability: Capability,
    #[serde(rename = "provider_identifier")]
    pub provider: String,
    #[typeshare(serialized_as = "String")]
    pub period_start: DateTime<Utc>,
    #[typeshare(serialized_as = "String")]
    pub reported_at: DateTime<Utc>,
}
