// [libs/domain/gateway/src/circuit_breaker.rs]
/*!
 * =================================================================
 * APARATO: INSTANCE CIRCUIT BREAKER (V4.0 - TRIP-ONCE MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PAUSA DEFENSIVA ANTE RÁFAGAS ANÓMALAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SHARED STATE: La ventana vive en el almacén persistente; todas
 *    las instancias del plano observan el mismo disparo.
 * 2. TRIP-ONCE OBSERVABILITY: El gancho 'on_trip' se invoca exactamente
 *    una vez por disparo, en la transición closed -> open.
 * 3. SELF-HEALING: open -> closed cuando now >= paused_until; sin
 *    intervención del operador.
 *
 * # Mathematical Proof (Single Trip Emission):
 * El gancho se dispara solo en la escritura que instala 'paused_until'
 * sobre un estado sin pausa vigente. Mientras la pausa rige, la rama
 * de denegación retorna antes de tocar el contador, por lo que no
 * existe segunda transición hasta expirar la pausa.
 * =================================================================
 */

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::errors::GatewayError;

/// Estado persistido del cortacircuitos de una instancia.
#[derive(Debug, Clone, Default)]
pub struct BreakerWindow {
    pub count: u32,
    pub window_start: Option<DateTime<Utc>>,
    pub paused_until: Option<DateTime<Utc>>,
}

/// Parámetros del cortacircuitos (ver GATEWAY_CIRCUIT_BREAKER_*).
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub max_requests_per_window: u32,
    pub window_ms: i64,
    pub pause_duration_ms: i64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { max_requests_per_window: 300, window_ms: 60_000, pause_duration_ms: 120_000 }
    }
}

/// Veredicto del cortacircuitos.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakerVerdict {
    Allowed,
    /// Denegado; porta los segundos hasta la reapertura.
    Paused { retry_after_seconds: i64 },
}

/// Puerto de persistencia del estado del cortacircuitos.
#[async_trait]
pub trait BreakerStore: Send + Sync {
    async fn load(&self, instance_id: &str) -> Result<BreakerWindow, GatewayError>;
    async fn save(&self, instance_id: &str, window: &BreakerWindow) -> Result<(), GatewayError>;
}

/// Observador del disparo para la emisión de eventos de observabilidad.
pub type TripObserver = Arc<dyn Fn(&str, DateTime<Utc>) + Send + Sync>;

/**
 * Cortacircuitos por instancia: ventana deslizante de conteo con pausa
 * defensiva y gancho de observabilidad de disparo único.
 */
pub struct CircuitBreaker {
    instance_id: String,
    breaker_store: Arc<dyn BreakerStore>,
    config: BreakerConfig,
    on_trip: Option<TripObserver>,
}

impl CircuitBreaker {
    pub fn new(instance_id: &str, breaker_store: Arc<dyn BreakerStore>, config: BreakerConfig) -> Self {
        Self { instance_id: instance_id.to_string(), breaker_store, config, on_trip: None }
    }

    pub fn with_trip_observer(mut self, observer: TripObserver) -> Self {
        self.on_trip = Some(observer);
        self
    }

    /// Evalúa la admisión en el instante actual.
    pub async fn admit(&self) -> Result<BreakerVerdict, GatewayError> {
        self.admit_at(Utc::now()).await
    }

    /**
     * Núcleo determinista del cortacircuitos, parametrizado por instante
     * para el Proving Grounds.
     *
     * # Logic:
     * 1. Pausa vigente -> denegación inmediata (sin tocar el contador).
     * 2. Ventana vencida -> reinicio de ventana y contador.
     * 3. Incremento; cruce del techo -> instalación de pausa + gancho.
     */
    #[instrument(skip(self, now), fields(instance = %self.instance_id))]
    pub async fn admit_at(&self, now: DateTime<Utc>) -> Result<BreakerVerdict, GatewayError> {
        let mut window = self.breaker_store.load(&self.instance_id).await?;

        // 1. PAUSA VIGENTE
        if let Some(paused_until) = window.paused_until {
            if now < paused_until {
                let retry_after_seconds =
                    ((paused_until - now).num_milliseconds() + 999) / 1000;
                return Ok(BreakerVerdict::Paused { retry_after_seconds: retry_after_seconds.max(1) });
            }
            // open -> closed: la pausa expiró; la ventana nace limpia.
            window.paused_until = None;
            window.count = 0;
            window.window_start = None;
        }

        // 2. FÍSICA DE VENTANA
        let window_expired = window
            .window_start
            .map(|start| (now - start).num_milliseconds() >= self.config.window_ms)
            .unwrap_or(true);
        if window_expired {
            window.window_start = Some(now);
            window.count = 0;
        }

        window.count += 1;

        // 3. CRUCE DEL TECHO -> DISPARO
        if window.count > self.config.max_requests_per_window {
            let paused_until = now + chrono::Duration::milliseconds(self.config.pause_duration_ms);
            window.paused_until = Some(paused_until);
            self.breaker_store.save(&self.instance_id, &window).await?;

            warn!(
                "🧯 [BREAKER_TRIP]: Instance '{}' exceeded {} req/window. Paused until {}.",
                self.instance_id, self.config.max_requests_per_window, paused_until
            );
            if let Some(trip_observer) = &self.on_trip {
                trip_observer(&self.instance_id, paused_until);
            }

            let retry_after_seconds = (self.config.pause_duration_ms + 999) / 1000;
            return Ok(BreakerVerdict::Paused { retry_after_seconds });
        }

        self.breaker_store.save(&self.instance_id, &window).await?;
        debug!("🧯 [BREAKER_GATE]: count={} within ceiling.", window.count);
        Ok(BreakerVerdict::Allowed)
    }
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryBreakerStore {
        windows: Mutex<HashMap<String, BreakerWindow>>,
    }

    #[async_trait]
    impl BreakerStore for MemoryBreakerStore {
        async fn load(&self, instance_id: &str) -> Result<BreakerWindow, GatewayError> {
            Ok(self.windows.lock().await.get(instance_id).cloned().unwrap_or_default())
        }

        async fn save(&self, instance_id: &str, window: &BreakerWindow) -> Result<(), GatewayError> {
            self.windows.lock().await.insert(instance_id.to_string(), window.clone());
            Ok(())
        }
    }

    fn tight_config() -> BreakerConfig {
        BreakerConfig { max_requests_per_window: 3, window_ms: 1_000, pause_duration_ms: 5_000 }
    }

    /**
     * CERTIFICACIÓN: Disparo al cruzar el techo, gancho exactamente una
     * vez, y reapertura tras la pausa.
     */
    #[tokio::test]
    async fn certify_trip_once_and_self_heal() {
        println!("\n🧯 [PROVING_GROUNDS]: Auditing trip-once semantics...");

        let store = Arc::new(MemoryBreakerStore::default());
        let trip_emissions = Arc::new(AtomicU32::new(0));
        let observer_counter = trip_emissions.clone();

        let breaker = CircuitBreaker::new("gateway-main", store, tight_config())
            .with_trip_observer(Arc::new(move |_instance, _until| {
                observer_counter.fetch_add(1, Ordering::SeqCst);
            }));

        let origin = Utc::now();

        // 3 admisiones dentro del techo.
        for _ in 0..3 {
            assert_eq!(breaker.admit_at(origin).await.unwrap(), BreakerVerdict::Allowed);
        }

        // Cuarta petición: disparo con gancho.
        let tripped = breaker.admit_at(origin).await.unwrap();
        assert!(matches!(tripped, BreakerVerdict::Paused { .. }));
        assert_eq!(trip_emissions.load(Ordering::SeqCst), 1);

        // Durante la pausa: denegación sin segunda emisión.
        let still_paused = breaker.admit_at(origin + chrono::Duration::seconds(2)).await.unwrap();
        assert!(matches!(still_paused, BreakerVerdict::Paused { .. }));
        assert_eq!(trip_emissions.load(Ordering::SeqCst), 1, "TRIP_FAULT: Hook re-fired while open.");

        // Pausa expirada: open -> closed y admisión limpia.
        let healed = breaker.admit_at(origin + chrono::Duration::seconds(6)).await.unwrap();
        assert_eq!(healed, BreakerVerdict::Allowed);

        println!("   ✅ [SUCCESS]: Trip-once and self-heal certified.");
    }

    /// Las ventanas vencidas reinician el contador sin disparo.
    #[tokio::test]
    async fn certify_window_rollover_without_trip() {
        let store = Arc::new(MemoryBreakerStore::default());
        let breaker = CircuitBreaker::new("gateway-main", store, tight_config());

        let origin = Utc::now();
        for _ in 0..3 {
            assert_eq!(breaker.admit_at(origin).await.unwrap(), BreakerVerdict::Allowed);
        }

        // Nueva ventana: el contador renace.
        let next_window = origin + chrono::Duration::milliseconds(1_001);
        for _ in 0..3 {
            assert_eq!(breaker.admit_at(next_window).await.unwrap(), BreakerVerdict::Allowed);
        }
    }

    /// El Retry-After de la pausa refleja la duración configurada.
    #[tokio::test]
    async fn certify_pause_retry_after() {
        let store = Arc::new(MemoryBreakerStore::default());
        let breaker = CircuitBreaker::new("gateway-main", store, tight_config());

        let origin = Utc::now();
        for _ in 0..3 {
            breaker.admit_at(origin).await.unwrap();
        }
        let BreakerVerdict::Paused { retry_after_seconds } =
            breaker.admit_at(origin).await.unwrap()
        else {
            panic!("Expected trip on ceiling crossing.");
        };
        assert_eq!(retry_after_seconds, 5);
    }
}
