// [apps/orchestrator/src/config.rs]
/*!
 * =================================================================
 * APARATO: PLATFORM CONFIGURATION (V4.0 - SOVEREIGN HYDRATION)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: HIDRATACIÓN TIPADA DEL ENTORNO DEL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE HYDRATION: El entorno se lee una única vez en el arranque;
 *    el resto del sistema consume la configuración tipada.
 * 2. SECRET DISCIPLINE: PLATFORM_SECRET es obligatorio y de longitud
 *    mínima; de él se derivan las claves por tenant y las firmas de
 *    cookies de sesión.
 * 3. KEY-GATED CAPABILITIES: La ausencia de la credencial de un
 *    proveedor desarma su adaptador; el gateway degrada a 503.
 * =================================================================
 */

use std::collections::HashMap;
use std::env;

use anyhow::{bail, Context, Result};
use wopr_domain_gateway::circuit_breaker::BreakerConfig;
use wopr_domain_models::TokenScope;

/// Longitud mínima del secreto maestro de la plataforma.
const PLATFORM_SECRET_MIN_LENGTH: usize = 32;

/// Techo por defecto de peticiones por minuto para rutas sin regla.
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 300;

/// Credencial mapeada por configuración (FLEET_TOKEN_<TENANT>).
#[derive(Debug, Clone)]
pub struct MappedFleetToken {
    pub tenant_id: String,
    pub scope: TokenScope,
}

/// Configuración tipada completa del plano de control.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Secreto maestro (>= 32 caracteres) para derivación de claves.
    pub platform_secret: String,
    /// Peers cuyo primer valor de X-Forwarded-For es de confianza.
    pub trusted_proxy_ips: Vec<String>,

    // --- PROCESADOR EXTERNO ---
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,

    // --- FLOTA ---
    /// Secreto estático de handshake de nodos (alternativa al secreto por nodo).
    pub node_secret: Option<String>,

    // --- CORTACIRCUITOS DEL GATEWAY ---
    pub breaker: BreakerConfig,

    // --- TECHOS POR CAPACIDAD (peticiones por minuto) ---
    pub rate_limit_llm: u32,
    pub rate_limit_image: u32,
    pub rate_limit_audio: u32,
    pub rate_limit_telephony: u32,
    pub rate_limit_default: u32,

    // --- AGREGACIÓN ---
    pub billing_period_ms: i64,
    pub late_arrival_grace_ms: i64,

    // --- PROVEEDORES (la ausencia desarma la capacidad) ---
    pub inference_farm_url: Option<String>,
    pub inference_farm_token: Option<String>,
    pub openai_api_key: Option<String>,

    // --- ALMACÉN DE OBJETOS ---
    pub snapshot_bucket_url: Option<String>,
    pub snapshot_bucket_token: Option<String>,

    /// Tokens arbitrarios mapeados por entorno: token -> (tenant, scope).
    pub fleet_token_map: HashMap<String, MappedFleetToken>,
}

impl PlatformConfig {
    /**
     * Hidrata la configuración desde el entorno del proceso.
     *
     * # Errors:
     * - PLATFORM_SECRET ausente o por debajo de la longitud mínima.
     * - Valores numéricos malformados en los knobs del gateway.
     */
    pub fn hydrate() -> Result<Self> {
        let platform_secret = env::var("PLATFORM_SECRET")
            .context("CRITICAL_CONFIG_VOID: PLATFORM_SECRET not defined")?;
        if platform_secret.len() < PLATFORM_SECRET_MIN_LENGTH {
            bail!(
                "CRITICAL_CONFIG_FAULT: PLATFORM_SECRET below {} characters",
                PLATFORM_SECRET_MIN_LENGTH
            );
        }

        let trusted_proxy_ips = env::var("TRUSTED_PROXY_IPS")
            .unwrap_or_default()
            .split(',')
            .map(|peer| peer.trim().to_string())
            .filter(|peer| !peer.is_empty())
            .collect();

        let breaker = BreakerConfig {
            max_requests_per_window: parse_env_knob("GATEWAY_CIRCUIT_BREAKER_MAX", 300)?,
            window_ms: parse_env_knob("GATEWAY_CIRCUIT_BREAKER_WINDOW_MS", 60_000)?,
            pause_duration_ms: parse_env_knob("GATEWAY_CIRCUIT_BREAKER_PAUSE_MS", 120_000)?,
        };

        Ok(Self {
            platform_secret,
            trusted_proxy_ips,
            stripe_secret_key: non_empty_env("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: non_empty_env("STRIPE_WEBHOOK_SECRET"),
            node_secret: non_empty_env("NODE_SECRET"),
            breaker,
            rate_limit_llm: parse_env_knob("GATEWAY_RATE_LIMIT_LLM", 120)?,
            rate_limit_image: parse_env_knob("GATEWAY_RATE_LIMIT_IMAGE", 30)?,
            rate_limit_audio: parse_env_knob("GATEWAY_RATE_LIMIT_AUDIO", 120)?,
            rate_limit_telephony: parse_env_knob("GATEWAY_RATE_LIMIT_TELEPHONY", 60)?,
            rate_limit_default: DEFAULT_RATE_LIMIT_PER_MINUTE,
            billing_period_ms: parse_env_knob("BILLING_PERIOD_MS", 300_000)?,
            late_arrival_grace_ms: parse_env_knob("LATE_ARRIVAL_GRACE_MS", 60_000)?,
            inference_farm_url: non_empty_env("INFERENCE_FARM_URL"),
            inference_farm_token: non_empty_env("INFERENCE_FARM_TOKEN"),
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            snapshot_bucket_url: non_empty_env("SNAPSHOT_BUCKET_URL"),
            snapshot_bucket_token: non_empty_env("SNAPSHOT_BUCKET_TOKEN"),
            fleet_token_map: scan_fleet_token_map(env::vars()),
        })
    }
}

/// Variable opcional: la cadena vacía cuenta como ausencia.
fn non_empty_env(variable_name: &str) -> Option<String> {
    env::var(variable_name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_knob<T: std::str::FromStr>(variable_name: &str, default_value: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(variable_name) {
        Ok(raw_value) if !raw_value.trim().is_empty() => raw_value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("CONFIG_FAULT: {} malformed: {}", variable_name, e)),
        _ => Ok(default_value),
    }
}

/**
 * Escanea el entorno por entradas FLEET_TOKEN_<TENANT> = <scope>:<token>.
 * El sufijo de la variable identifica al tenant (minúsculas).
 */
fn scan_fleet_token_map(
    environment: impl Iterator<Item = (String, String)>,
) -> HashMap<String, MappedFleetToken> {
    let mut token_map = HashMap::new();

    for (variable_name, variable_value) in environment {
        let Some(tenant_suffix) = variable_name.strip_prefix("FLEET_TOKEN_") else {
            continue;
        };
        let Some((scope_label, token_material)) = variable_value.split_once(':') else {
            continue;
        };
        let Some(scope) = TokenScope::from_str_label(scope_label.trim()) else {
            continue;
        };
        if token_material.is_empty() {
            continue;
        }

        token_map.insert(
            token_material.to_string(),
            MappedFleetToken { tenant_id: tenant_suffix.to_lowercase(), scope },
        );
    }

    token_map
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// El escaneo de FLEET_TOKEN_* resuelve tenant, scope y material.
    #[test]
    fn certify_fleet_token_scan() {
        let environment = vec![
            ("FLEET_TOKEN_ACME".to_string(), "write:tok-acme-77".to_string()),
            ("FLEET_TOKEN_GLOBEX".to_string(), "admin:tok-globex-13".to_string()),
            // Entradas inválidas: scope desconocido, sin separador, token vacío.
            ("FLEET_TOKEN_BAD".to_string(), "root:tok-x".to_string()),
            ("FLEET_TOKEN_WORSE".to_string(), "no-separator".to_string()),
            ("FLEET_TOKEN_EMPTY".to_string(), "read:".to_string()),
            ("UNRELATED_VAR".to_string(), "write:tok-y".to_string()),
        ];

        let token_map = scan_fleet_token_map(environment.into_iter());

        assert_eq!(token_map.len(), 2);
        let acme = token_map.get("tok-acme-77").unwrap();
        assert_eq!(acme.tenant_id, "acme");
        assert_eq!(acme.scope, TokenScope::Write);
        let globex = token_map.get("tok-globex-13").unwrap();
        assert_eq!(globex.tenant_id, "globex");
        assert_eq!(globex.scope, TokenScope::Admin);
    }

    #[test]
    fn certify_non_empty_env_semantics() {
        // Una variable inexistente y una vacía cuentan igual como ausencia.
        assert_eq!(non_empty_env("WOPR_TEST_VARIABLE_THAT_DOES_NOT_EXIST"), None);
    }
}
