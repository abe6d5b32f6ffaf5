// [libs/domain/gateway/src/adapter.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER ADAPTER CONTRACT (V4.0 - CAPABILITY SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN PORTS (ESTRATO L2)
 * RESPONSABILIDAD: COSTURA UNIFORME HACIA PROVEEDORES UPSTREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATIC METHOD TABLE: Un método nominal por capacidad; el
 *    despacho capacidad -> método es tabla fija, no reflexión.
 * 2. DEFAULT REFUSAL: Todo método no sobreescrito rechaza con
 *    'UnsupportedCapability', blindando registros incoherentes.
 * 3. DUAL PRICE TRACK: El adaptador reporta su coste real y puede
 *    imponer un cargo propio; en su ausencia rige cost x margin.
 * =================================================================
 */

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use wopr_domain_models::Capability;

/// Fallos reportados por un adaptador de proveedor.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// El proveedor rechazó la invocación (el mensaje viaja al cliente).
    #[error("{0}")]
    Upstream(String),

    /// El proveedor no respondió dentro del plazo configurado.
    #[error("[L3_ADAPTER_FAULT]: UPSTREAM_DEADLINE_EXPIRED")]
    DeadlineExpired,

    /// El adaptador no implementa la capacidad invocada.
    #[error("[L3_ADAPTER_FAULT]: UNSUPPORTED_CAPABILITY -> {0:?}")]
    UnsupportedCapability(Capability),
}

/// Resultado tipado de una invocación de adaptador.
#[derive(Debug, Clone)]
pub struct AdapterOutcome {
    /// Carga útil devuelta al cliente.
    pub result: Value,
    /// Coste del proveedor para la plataforma (USD).
    pub cost_usd: f64,
    /// Cargo impuesto por el adaptador; None delega en cost x margin.
    pub charge_usd: Option<f64>,
    /// Duración de audio/ejecución facturable cuando aplica (segundos).
    pub duration_seconds: f64,
}

impl AdapterOutcome {
    pub fn new(result: Value, cost_usd: f64) -> Self {
        Self { result, cost_usd, charge_usd: None, duration_seconds: 0.0 }
    }
}

/**
 * Costura uniforme hacia un proveedor upstream.
 *
 * Cada implementación declara sus capacidades y su condición de
 * auto-hospedaje; el AdapterSocket usa ambas para la selección.
 */
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Identificador nominal del proveedor ("whisper-farm", "openai", ...).
    fn provider_name(&self) -> &str;

    /// Capacidades que este adaptador sirve.
    fn declared_capabilities(&self) -> &[Capability];

    /// Verdadero si la plataforma hospeda el motor (margen máximo).
    fn is_self_hosted(&self) -> bool;

    /// Evalúa si el adaptador declara la capacidad dada.
    fn declares(&self, capability: Capability) -> bool {
        self.declared_capabilities().contains(&capability)
    }

    async fn transcribe(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::UnsupportedCapability(Capability::Transcription))
    }

    async fn generate_image(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::UnsupportedCapability(Capability::ImageGeneration))
    }

    async fn generate_text(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::UnsupportedCapability(Capability::TextGeneration))
    }

    async fn synthesize_speech(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::UnsupportedCapability(Capability::Tts))
    }

    async fn embed(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::UnsupportedCapability(Capability::Embeddings))
    }

    async fn relay_telephony(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::UnsupportedCapability(Capability::Telephony))
    }
}
