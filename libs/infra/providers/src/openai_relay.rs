// [libs/infra/providers/src/openai_relay.rs]
/*!
 * =================================================================
 * APARATO: OPENAI RELAY ADAPTER (V3.0 - PREMIUM TRACK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RELEVO HACIA EL PROVEEDOR PREMIUM DE TERCEROS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COST TELEMETRY: El coste real se deriva del bloque 'usage' de la
 *    respuesta; el precio al tenant lo impone el gateway.
 * 2. PASS-THROUGH FIDELITY: El cuerpo del proveedor viaja intacto al
 *    tenant; este aparato no reinterpreta resultados.
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use wopr_domain_gateway::adapter::{AdapterError, AdapterOutcome, ProviderAdapter};
use wopr_domain_models::Capability;

/// Capacidades relevadas al proveedor premium.
const RELAY_CAPABILITIES: &[Capability] =
    &[Capability::TextGeneration, Capability::ImageGeneration, Capability::Embeddings];

/// Tarifa de tokens de entrada (USD por 1K tokens).
const PROMPT_TOKEN_RATE_USD: f64 = 0.0025;
/// Tarifa de tokens de salida (USD por 1K tokens).
const COMPLETION_TOKEN_RATE_USD: f64 = 0.01;
/// Tarifa plana por imagen generada (USD).
const IMAGE_FLAT_RATE_USD: f64 = 0.04;
/// Tarifa de vectorización (USD por 1K tokens).
const EMBEDDING_TOKEN_RATE_USD: f64 = 0.0001;

/// Relevo hacia la API del proveedor premium.
pub struct OpenAiRelayAdapter {
    network_session_client: Client,
    api_base_endpoint: String,
}

impl OpenAiRelayAdapter {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com".to_string())
    }

    pub fn with_base_url(api_key: String, api_base_url: String) -> Self {
        let mut header_map = reqwest::header::HeaderMap::new();
        let authorization_value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .expect("CRITICAL: Invalid provider key format.");
        header_map.insert(reqwest::header::AUTHORIZATION, authorization_value);

        Self {
            network_session_client: Client::builder()
                .default_headers(header_map)
                .user_agent("WOPR-Provider-Relay/V3.0")
                .timeout(Duration::from_secs(120))
                .build()
                .expect("FATAL: Relay client initialization failed."),
            api_base_endpoint: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self, input))]
    async fn relay_request(&self, api_path: &str, input: &Value) -> Result<Value, AdapterError> {
        let relay_endpoint = format!("{}{}", self.api_base_endpoint, api_path);

        let network_response = self
            .network_session_client
            .post(&relay_endpoint)
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

        network_response
            .json::<Value>()
            .await
            .map_err(|decoding_fault| AdapterError::Upstream(decoding_fault.to_string()))
    }

    /// Coste real derivado del bloque 'usage' de la respuesta.
    fn token_cost(provider_body: &Value, prompt_rate: f64, completion_rate: f64) -> f64 {
        let prompt_tokens = provider_body["usage"]["prompt_tokens"].as_f64().unwrap_or(0.0);
        let completion_tokens =
            provider_body["usage"]["completion_tokens"].as_f64().unwrap_or(0.0);
        (prompt_tokens / 1000.0) * prompt_rate + (completion_tokens / 1000.0) * completion_rate
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiRelayAdapter {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn declared_capabilities(&self) -> &[Capability] {
        RELAY_CAPABILITIES
    }

    fn is_self_hosted(&self) -> bool {
        false
    }

    async fn generate_text(&self, input: &Value) -> Result<AdapterOutcome, AdapterError> {
        let provider_body = self.relay_request("/v1/chat/completions", input).await?;
        let invocation_cost =
            Self::token_cost(&provider_body, PROMPT_TOKEN_RATE_USD, COMPLETION_TOKEN_RATE_USD);

        debug!("🛰️ [RELAY_TEXT]: Completion served at {:.6} USD.", invocation_cost);
        Ok(AdapterOutcome::new(provider_body, invocation_cost))
    }

    async fn generate_image(&self, input: &Value) -> Result<AdapterOutcome, AdapterError> {
        let provider_body = self.relay_request("/v1/images/generations", input).await?;
        let generated_count = provider_body["data"].as_array().map(|d| d.len()).unwrap_or(1);

        Ok(AdapterOutcome::new(provider_body, IMAGE_FLAT_RATE_USD * generated_count as f64))
    }

    async fn embed(&self, input: &Value) -> Result<AdapterOutcome, AdapterError> {
        let provider_body = self.relay_request("/v1/embeddings", input).await?;
        let consumed_tokens = provider_body["usage"]["total_tokens"].as_f64().unwrap_or(0.0);

        Ok(AdapterOutcome::new(provider_body, (consumed_tokens / 1000.0) * EMBEDDING_TOKEN_RATE_USD))
    }
}
