// [libs/infra/providers/src/self_hosted.rs]
/*!
 * =================================================================
 * APARATO: SELF-HOSTED INFERENCE ADAPTER (V3.0 - WOPR FARM)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE CON LA GRANJA DE INFERENCIA PROPIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SOVEREIGN MARGIN: Al ser auto-hospedado, el coste reportado es
 *    el coste real de silicio; el margen lo impone el gateway.
 * 2. UNIFORM PROTOCOL: Toda operación responde con la tripleta
 *    {result, cost_usd, duration_seconds} del protocolo de granja.
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use wopr_domain_gateway::adapter::{AdapterError, AdapterOutcome, ProviderAdapter};
use wopr_domain_models::Capability;

/// Capacidades servidas por la granja de inferencia propia.
const FARM_CAPABILITIES: &[Capability] =
    &[Capability::Tts, Capability::Transcription, Capability::Embeddings];

/// Respuesta uniforme del protocolo de granja.
#[derive(Deserialize)]
struct FarmInvocationEnvelope {
    result: Value,
    cost_usd: f64,
    #[serde(default)]
    duration_seconds: f64,
}

/// Adaptador de la granja de inferencia auto-hospedada.
pub struct SelfHostedInferenceAdapter {
    network_session_client: Client,
    farm_base_endpoint: String,
}

impl SelfHostedInferenceAdapter {
    pub fn new(farm_base_url: String, farm_access_token: String) -> Self {
        let mut header_map = reqwest::header::HeaderMap::new();
        let authorization_value = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            farm_access_token
        ))
        .expect("CRITICAL: Invalid farm token format.");
        header_map.insert(reqwest::header::AUTHORIZATION, authorization_value);

        Self {
            network_session_client: Client::builder()
                .default_headers(header_map)
                .user_agent("WOPR-Inference-Uplink/V3.0")
                .timeout(Duration::from_secs(120))
                .build()
                .expect("FATAL: Farm client initialization failed."),
            farm_base_endpoint: farm_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Despacho uniforme contra una operación de la granja.
    #[instrument(skip(self, input))]
    async fn invoke_farm_operation(
        &self,
        operation_path: &str,
        input: &Value,
    ) -> Result<AdapterOutcome, AdapterError> {
        let operation_endpoint = format!("{}{}", self.farm_base_endpoint, operation_path);

        let network_response = self
            .network_session_client
            .post(&operation_endpoint)
            .json(input)
            .send()
            .await
            .map_err(|network_fault| {
                if network_fault.is_timeout() {
                    AdapterError::DeadlineExpired
                } else {
                    AdapterError::Upstream(network_fault.to_string())
                }
            })?;

        if !network_response.status().is_success() {
            let http_status = network_response.status();
            let diagnostic_body = network_response.text().await.unwrap_or_default();
            return Err(AdapterError::Upstream(format!("HTTP_{}: {}", http_status, diagnostic_body)));
        }

        let farm_envelope = network_response
            .json::<FarmInvocationEnvelope>()
            .await
            .map_err(|decoding_fault| AdapterError::Upstream(decoding_fault.to_string()))?;

        debug!(
            "🏭 [FARM_INVOCATION]: '{}' served at {:.6} USD silicon cost.",
            operation_path, farm_envelope.cost_usd
        );

        Ok(AdapterOutcome {
            result: farm_envelope.result,
            cost_usd: farm_envelope.cost_usd,
            charge_usd: None,
            duration_seconds: farm_envelope.duration_seconds,
        })
    }
}

#[async_trait]
impl ProviderAdapter for SelfHostedInferenceAdapter {
    fn provider_name(&self) -> &str {
        "wopr-inference"
    }

    fn declared_capabilities(&self) -> &[Capability] {
        FARM_CAPABILITIES
    }

    fn is_self_hosted(&self) -> bool {
        true
    }

    async fn transcribe(&self, input: &Value) -> Result<AdapterOutcome, AdapterError> {
        self.invoke_farm_operation("/v1/transcribe", input).await
    }

    async fn synthesize_speech(&self, input: &Value) -> Result<AdapterOutcome, AdapterError> {
        self.invoke_farm_operation("/v1/speech", input).await
    }

    async fn embed(&self, input: &Value) -> Result<AdapterOutcome, AdapterError> {
        self.invoke_farm_operation("/v1/embeddings", input).await
    }
}
