// [libs/domain/gateway/src/rate_limiter.rs]
/*!
 * =================================================================
 * APARATO: FIXED-WINDOW RATE LIMITER (V5.0 - PERIMETER SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONTENCIÓN DE RÁFAGAS POR CLAVE Y ALCANCE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FIRST-WINS MATCHING: Las reglas se evalúan en orden de registro
 *    por (método, prefijo de ruta); la primera coincidencia gobierna.
 * 2. SHARED COUNTERS: La ventana vive en el almacén persistente para
 *    que múltiples instancias del plano compartan estado.
 * 3. SPOOFING SHIELD: 'X-Forwarded-For' solo se honra cuando el peer
 *    pertenece al conjunto de proxies de confianza.
 *
 * # Mathematical Proof (Header Arithmetic):
 * Remaining = max(0, max - count) y Reset = ceil((window_start +
 * window_ms) / 1000). Ambos se derivan del par (count, window_start)
 * devuelto por el incremento atómico, por lo que toda respuesta es
 * coherente con el contador observado.
 * =================================================================
 */

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::errors::GatewayError;

/// Regla de contención para una familia de rutas.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    /// Alcance nominal persistido junto al contador ("auth-login", "gateway-llm").
    pub scope: String,
    /// Método HTTP gobernado; None cubre todos.
    pub method: Option<String>,
    /// Prefijo de ruta gobernado.
    pub path_prefix: String,
    /// Techo de peticiones por ventana.
    pub max_requests: u32,
    /// Longitud de la ventana fija (ms).
    pub window_ms: i64,
}

/// Veredicto del limitador con la aritmética de cabeceras ya sellada.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub scope: String,
    /// Valor de 'X-RateLimit-Limit'.
    pub limit: u32,
    /// Valor de 'X-RateLimit-Remaining' (saturado en cero).
    pub remaining: u32,
    /// Valor de 'X-RateLimit-Reset' (segundos epoch del fin de ventana).
    pub reset_epoch_seconds: i64,
    /// Valor de 'Retry-After' en denegaciones (segundos hasta el reset).
    pub retry_after_seconds: Option<i64>,
}

/// Puerto del contador persistente de ventana fija.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /**
     * Incremento atómico del contador de (key, scope).
     *
     * Si la ventana registrada es más vieja que `window_ms`, la ventana
     * se reinicia a 'ahora' con contador 1. Devuelve el par
     * (contador tras el incremento, inicio de ventana vigente).
     */
    async fn increment(
        &self,
        key: &str,
        scope: &str,
        window_ms: i64,
    ) -> Result<(u32, DateTime<Utc>), GatewayError>;
}

/**
 * Limitador perimetral: emparejamiento de reglas first-wins y
 * aritmética de cabeceras sobre el contador compartido.
 */
pub struct RateLimiter {
    counter_store: Arc<dyn RateLimitStore>,
    /// Reglas en orden de precedencia.
    rules: Vec<RateLimitRule>,
    /// Regla de contención para rutas sin regla dedicada.
    default_rule: RateLimitRule,
}

impl RateLimiter {
    pub fn new(
        counter_store: Arc<dyn RateLimitStore>,
        rules: Vec<RateLimitRule>,
        default_rule: RateLimitRule,
    ) -> Self {
        Self { counter_store, rules, default_rule }
    }

    /// Primera regla cuyo (método, prefijo) cubre la petición.
    pub fn match_rule(&self, method: &str, path: &str) -> &RateLimitRule {
        self.rules
            .iter()
            .find(|rule| {
                let method_matches = rule
                    .method
                    .as_deref()
                    .map(|governed| governed.eq_ignore_ascii_case(method))
                    .unwrap_or(true);
                method_matches && path.starts_with(&rule.path_prefix)
            })
            .unwrap_or(&self.default_rule)
    }

    /**
     * Evalúa la admisión de una petición bajo su regla gobernante.
     *
     * # Errors:
     * - `GatewayError::Storage`: El contador compartido no respondió.
     */
    #[instrument(skip(self), fields(key = %client_key))]
    pub async fn check(
        &self,
        client_key: &str,
        method: &str,
        path: &str,
    ) -> Result<RateLimitDecision, GatewayError> {
        let governing_rule = self.match_rule(method, path);

        let (count_after_increment, window_start) = self
            .counter_store
            .increment(client_key, &governing_rule.scope, governing_rule.window_ms)
            .await?;

        let window_end_ms = window_start.timestamp_millis() + governing_rule.window_ms;
        let reset_epoch_seconds = (window_end_ms + 999) / 1000;

        let allowed = count_after_increment <= governing_rule.max_requests;
        let remaining = governing_rule.max_requests.saturating_sub(count_after_increment);

        let retry_after_seconds = if allowed {
            None
        } else {
            let milliseconds_until_reset = window_end_ms - Utc::now().timestamp_millis();
            warn!(
                "🚦 [RATE_VETO]: Key '{}' exceeded scope '{}' ({} > {}).",
                client_key, governing_rule.scope, count_after_increment, governing_rule.max_requests
            );
            Some(((milliseconds_until_reset + 999) / 1000).max(1))
        };

        debug!(
            "🚦 [RATE_GATE]: scope={} count={} remaining={}",
            governing_rule.scope, count_after_increment, remaining
        );

        Ok(RateLimitDecision {
            allowed,
            scope: governing_rule.scope.clone(),
            limit: governing_rule.max_requests,
            remaining,
            reset_epoch_seconds,
            retry_after_seconds,
        })
    }
}

/**
 * Resuelve la clave de cliente blindada contra spoofing.
 *
 * # Logic:
 * El primer valor de 'X-Forwarded-For' solo se honra cuando la
 * dirección del peer pertenece al conjunto de proxies de confianza;
 * en cualquier otro caso gobierna la dirección del peer.
 */
pub fn resolve_client_key(
    peer_address: &str,
    forwarded_for_header: Option<&str>,
    trusted_proxies: &[String],
) -> String {
    let peer_is_trusted = trusted_proxies.iter().any(|proxy| proxy == peer_address);

    if peer_is_trusted {
        if let Some(forwarded_chain) = forwarded_for_header {
            if let Some(first_hop) = forwarded_chain.split(',').next() {
                let candidate = first_hop.trim();
                if !candidate.is_empty() {
                    return candidate.to_string();
                }
            }
        }
    }

    peer_address.to_string()
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// Contador en RAM con reloj manual para auditar la física de ventana.
    struct ManualClockStore {
        windows: Mutex<HashMap<(String, String), (u32, DateTime<Utc>)>>,
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClockStore {
        fn new(origin: DateTime<Utc>) -> Self {
            Self { windows: Mutex::new(HashMap::new()), now: Mutex::new(origin) }
        }

        async fn advance_ms(&self, delta_ms: i64) {
            let mut now_guard = self.now.lock().await;
            *now_guard += chrono::Duration::milliseconds(delta_ms);
        }
    }

    #[async_trait]
    impl RateLimitStore for ManualClockStore {
        async fn increment(
            &self,
            key: &str,
            scope: &str,
            window_ms: i64,
        ) -> Result<(u32, DateTime<Utc>), GatewayError> {
            let current_instant = *self.now.lock().await;
            let mut windows_guard = self.windows.lock().await;
            let entry = windows_guard
                .entry((key.to_string(), scope.to_string()))
                .or_insert((0, current_instant));

            let window_age_ms =
                (current_instant - entry.1).num_milliseconds();
            if window_age_ms >= window_ms {
                *entry = (0, current_instant);
            }
            entry.0 += 1;
            Ok(*entry)
        }
    }

    fn login_rule() -> RateLimitRule {
        RateLimitRule {
            scope: "auth-login".into(),
            method: Some("POST".into()),
            path_prefix: "/api/auth/sign-in".into(),
            max_requests: 5,
            window_ms: 15 * 60 * 1000,
        }
    }

    fn default_rule() -> RateLimitRule {
        RateLimitRule {
            scope: "default".into(),
            method: None,
            path_prefix: "/".into(),
            max_requests: 100,
            window_ms: 60_000,
        }
    }

    fn forge_limiter(store: Arc<ManualClockStore>) -> RateLimiter {
        RateLimiter::new(store, vec![login_rule()], default_rule())
    }

    /**
     * CERTIFICACIÓN: Frontera exacta de la ventana fija (escenario S1).
     * 5 admisiones con Remaining 4..0, sexto veto con Retry-After acotado,
     * y reapertura tras 15 minutos + 1 ms.
     */
    #[tokio::test]
    async fn certify_fixed_window_boundary() {
        println!("\n🚦 [PROVING_GROUNDS]: Auditing fixed-window boundary...");

        let store = Arc::new(ManualClockStore::new(Utc::now()));
        let limiter = forge_limiter(store.clone());

        for expected_remaining in (0..5).rev() {
            let decision =
                limiter.check("10.0.0.1", "POST", "/api/auth/sign-in").await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.limit, 5);
        }

        let veto = limiter.check("10.0.0.1", "POST", "/api/auth/sign-in").await.unwrap();
        assert!(!veto.allowed);
        assert_eq!(veto.remaining, 0);
        let retry_after = veto.retry_after_seconds.unwrap();
        assert!(retry_after > 0 && retry_after <= 900, "Retry-After out of (0, 900]: {}", retry_after);

        // Avance de reloj: 15 minutos + 1 ms reabren la ventana.
        store.advance_ms(15 * 60 * 1000 + 1).await;
        let reopened = limiter.check("10.0.0.1", "POST", "/api/auth/sign-in").await.unwrap();
        assert!(reopened.allowed);
        assert_eq!(reopened.remaining, 4);

        println!("   ✅ [SUCCESS]: Window boundary certified at the millisecond.");
    }

    /**
     * CERTIFICACIÓN: Claves independientes no comparten contador (escenario S2).
     */
    #[tokio::test]
    async fn certify_independent_keys() {
        let store = Arc::new(ManualClockStore::new(Utc::now()));
        let limiter = forge_limiter(store);

        for _ in 0..5 {
            assert!(limiter.check("203.0.113.7", "POST", "/api/auth/sign-in").await.unwrap().allowed);
        }
        // Clave B intacta aunque A esté agotada.
        assert!(limiter.check("203.0.113.9", "POST", "/api/auth/sign-in").await.unwrap().allowed);
        // Clave A sigue vetada.
        assert!(!limiter.check("203.0.113.7", "POST", "/api/auth/sign-in").await.unwrap().allowed);
    }

    /// La aritmética de Reset es el techo del fin de ventana en segundos.
    #[tokio::test]
    async fn certify_reset_epoch_arithmetic() {
        let origin = Utc::now();
        let store = Arc::new(ManualClockStore::new(origin));
        let limiter = forge_limiter(store);

        let decision = limiter.check("10.0.0.1", "POST", "/api/auth/sign-in").await.unwrap();
        let expected_reset = (origin.timestamp_millis() + 15 * 60 * 1000 + 999) / 1000;
        assert_eq!(decision.reset_epoch_seconds, expected_reset);
    }

    /// First-wins: la regla dedicada gobierna antes que la default.
    #[tokio::test]
    async fn certify_first_wins_rule_matching() {
        let store = Arc::new(ManualClockStore::new(Utc::now()));
        let limiter = forge_limiter(store);

        assert_eq!(limiter.match_rule("POST", "/api/auth/sign-in").scope, "auth-login");
        // Método distinto cae a la regla default.
        assert_eq!(limiter.match_rule("GET", "/api/auth/sign-in").scope, "default");
        assert_eq!(limiter.match_rule("POST", "/api/v1/gateway/tts").scope, "default");
    }

    /**
     * CERTIFICACIÓN: Blindaje anti-spoofing de 'X-Forwarded-For'.
     */
    #[test]
    fn certify_trusted_proxy_resolution() {
        println!("\n🚦 [PROVING_GROUNDS]: Auditing spoofing shield...");

        let trusted = vec!["10.0.0.254".to_string()];

        // Peer de confianza: gobierna el primer salto del XFF.
        assert_eq!(
            resolve_client_key("10.0.0.254", Some("198.51.100.7, 10.0.0.254"), &trusted),
            "198.51.100.7"
        );
        // Peer fuera del conjunto: el XFF se ignora por completo.
        assert_eq!(
            resolve_client_key("203.0.113.66", Some("198.51.100.7"), &trusted),
            "203.0.113.66"
        );
        // Proxy de confianza sin cabecera: gobierna el peer.
        assert_eq!(resolve_client_key("10.0.0.254", None, &trusted), "10.0.0.254");
        // Cabecera vacía no produce clave vacía.
        assert_eq!(resolve_client_key("10.0.0.254", Some("  "), &trusted), "10.0.0.254");

        println!("   ✅ [SUCCESS]: Spoofing shield certified.");
    }
}
