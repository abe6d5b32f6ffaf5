// [libs/domain/gateway/src/errors.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY ERROR CATALOG (V4.2 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: TAXONOMÍA SEMÁNTICA DE FALLOS DE ADMISIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRUCTURED RESULTS: Los estratos de admisión devuelven resultados
 *    estructurados; la traducción a HTTP ocurre solo en la frontera.
 * 2. PANOPTICON COMPLIANCE: Prefijos de estrato para el renderizado
 *    cromático en el Dashboard.
 * =================================================================
 */

use thiserror::Error;
use wopr_domain_models::Capability;

use wopr_domain_billing::errors::MeteringError;

/// Fallos del pipeline de admisión y despacho del gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Entrada malformada del cliente.
    #[error("[L2_GATEWAY_FAULT]: INVALID_REQUEST -> {0}")]
    Validation(String),

    /// Ningún adaptador registrado declara la capacidad (llave ausente).
    #[error("[L2_GATEWAY_FAULT]: CAPABILITY_UNAVAILABLE -> {0:?}")]
    CapabilityUnavailable(Capability),

    /// El adaptador solicitado explícitamente no está registrado.
    #[error("[L2_GATEWAY_FAULT]: ADAPTER_NOT_REGISTERED -> {0}")]
    AdapterNotRegistered(String),

    /// El adaptador solicitado no declara la capacidad pedida.
    #[error("[L2_GATEWAY_FAULT]: ADAPTER_CAPABILITY_MISMATCH -> {adapter} / {capability:?}")]
    AdapterCapabilityMismatch { adapter: String, capability: Capability },

    /// Veto del BudgetChecker; porta la ventana nominada.
    #[error("[L2_GATEWAY_FAULT]: BUDGET_EXCEEDED -> {reason}")]
    BudgetExceeded { reason: String },

    /// Veto del limitador de ráfagas.
    #[error("[L2_GATEWAY_FAULT]: RATE_LIMITED -> retry in {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: i64 },

    /// El cortacircuitos de la instancia está en pausa.
    #[error("[L2_GATEWAY_FAULT]: CIRCUIT_OPEN -> resumes in {retry_after_seconds}s")]
    CircuitOpen { retry_after_seconds: i64 },

    /// El proveedor upstream rechazó la invocación (pass-through).
    #[error("[L2_GATEWAY_FAULT]: PROVIDER_REJECTION -> {0}")]
    Provider(String),

    /// El proveedor upstream no respondió dentro del plazo.
    #[error("[L2_GATEWAY_FAULT]: PROVIDER_DEADLINE_EXPIRED")]
    ProviderTimeout,

    /// La cristalización del evento de medición falló tras el éxito
    /// del adaptador; el llamador debe ver el fallo.
    #[error("[L2_GATEWAY_FAULT]: METERING_COLLAPSED -> {0}")]
    Metering(String),

    /// Fallo transitorio de los contadores persistentes.
    #[error("[L2_GATEWAY_FAULT]: COUNTER_STORE_SEVERED -> {0}")]
    Storage(String),
}

impl GatewayError {
    /// Traducción canónica hacia el código HTTP de la frontera.
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 400,
            GatewayError::AdapterNotRegistered(_) => 400,
            GatewayError::AdapterCapabilityMismatch { .. } => 400,
            GatewayError::BudgetExceeded { .. } => 429,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::CapabilityUnavailable(_) => 503,
            GatewayError::CircuitOpen { .. } => 503,
            GatewayError::Provider(_) => 502,
            GatewayError::ProviderTimeout => 504,
            GatewayError::Metering(_) => 500,
            GatewayError::Storage(_) => 500,
        }
    }
}

impl From<MeteringError> for GatewayError {
    fn from(metering_fault: MeteringError) -> Self {
        match metering_fault {
            MeteringError::AppendFailure(detail) => GatewayError::Metering(detail),
            MeteringError::ScanFailure(detail) => GatewayError::Storage(detail),
        }
    }
}
