// [libs/domain/billing/src/budget.rs]
/*!
 * =================================================================
 * APARATO: BUDGET ADMISSION GATE (V4.0 - WINDOW SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ESCRUTINIO DE TECHOS DE GASTO POR VENTANA MÓVIL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. READ AMPLIFICATION SHIELD: Un cache de veredictos por tenant con
 *    TTL corto acota las lecturas del log de eventos bajo ráfagas.
 * 2. BYOK NEUTRALITY: Las peticiones con credencial propia del tenant
 *    no consumen presupuesto y omiten el escrutinio.
 * 3. WINDOW NAMING: Todo veredicto de denegación nombra la ventana
 *    que lo produjo para el diagnóstico del operador.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use wopr_domain_models::SpendLimits;

use crate::errors::MeteringError;
use crate::store::MeterEventStore;

/// TTL por defecto del cache de veredictos: 1 segundo.
const DEFAULT_VERDICT_CACHE_TTL: Duration = Duration::from_secs(1);

/// Ventana móvil horaria en segundos.
const HOUR_WINDOW_SECONDS: i64 = 3_600;
/// Ventana móvil mensual en segundos (30 días).
const MONTH_WINDOW_SECONDS: i64 = 30 * 24 * 3_600;

/// Veredicto del escrutinio de presupuesto.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetVerdict {
    pub allowed: bool,
    /// Diagnóstico nominal de la ventana excedida.
    pub reason: Option<String>,
    /// Código HTTP sugerido para la superficie perimetral.
    pub http_status: Option<u16>,
}

impl BudgetVerdict {
    fn allowed() -> Self {
        Self { allowed: true, reason: None, http_status: None }
    }

    fn denied(window_diagnostic: String) -> Self {
        Self { allowed: false, reason: Some(window_diagnostic), http_status: Some(429) }
    }
}

/**
 * Puerta de admisión presupuestaria: suma el 'charge_usd' de las ventanas
 * móviles de 1 hora y 1 mes y las confronta con los techos del tenant.
 */
pub struct BudgetChecker {
    meter_store: Arc<dyn MeterEventStore>,
    /// Cache de veredictos por tenant (sello temporal + veredicto).
    verdict_cache: Mutex<HashMap<String, (Instant, BudgetVerdict)>>,
    cache_ttl: Duration,
}

impl BudgetChecker {
    pub fn new(meter_store: Arc<dyn MeterEventStore>) -> Self {
        Self::with_cache_ttl(meter_store, DEFAULT_VERDICT_CACHE_TTL)
    }

    pub fn with_cache_ttl(meter_store: Arc<dyn MeterEventStore>, cache_ttl: Duration) -> Self {
        Self { meter_store, verdict_cache: Mutex::new(HashMap::new()), cache_ttl }
    }

    /**
     * Evalúa la admisión presupuestaria de una petición.
     *
     * # Logic:
     * 1. BYOK o techos ausentes -> admisión inmediata (sin lectura).
     * 2. Veredicto cacheado vigente -> se reutiliza.
     * 3. Suma de ventanas móviles contra el log de eventos; la primera
     *    ventana excedida produce la denegación (la horaria primero).
     *
     * # Errors:
     * - `MeteringError::ScanFailure`: El Motor A rechazó la lectura.
     */
    #[instrument(skip(self, spend_limits), fields(tenant = %tenant_id))]
    pub async fn evaluate(
        &self,
        tenant_id: &str,
        spend_limits: &SpendLimits,
        is_byok: bool,
    ) -> Result<BudgetVerdict, MeteringError> {
        if is_byok || spend_limits.is_unbounded() {
            return Ok(BudgetVerdict::allowed());
        }

        {
            let cache_guard = self.verdict_cache.lock().await;
            if let Some((sealed_at, cached_verdict)) = cache_guard.get(tenant_id) {
                if sealed_at.elapsed() < self.cache_ttl {
                    debug!("🗃️ [BUDGET_CACHE]: Reusing sealed verdict for tenant {}.", tenant_id);
                    return Ok(cached_verdict.clone());
                }
            }
        }

        let fresh_verdict = self.compute_verdict(tenant_id, spend_limits).await?;

        let mut cache_guard = self.verdict_cache.lock().await;
        cache_guard.insert(tenant_id.to_string(), (Instant::now(), fresh_verdict.clone()));
        Ok(fresh_verdict)
    }

    async fn compute_verdict(
        &self,
        tenant_id: &str,
        spend_limits: &SpendLimits,
    ) -> Result<BudgetVerdict, MeteringError> {
        let now = Utc::now();

        if let Some(hourly_ceiling_usd) = spend_limits.max_per_hour_usd {
            let hourly_window_start = now - chrono::Duration::seconds(HOUR_WINDOW_SECONDS);
            let hourly_spend_usd =
                self.meter_store.charge_sum_since(tenant_id, hourly_window_start).await?;

            if hourly_spend_usd >= hourly_ceiling_usd {
                warn!(
                    "⛔ [BUDGET_VETO]: Tenant {} burned {:.4} USD in the hourly window (ceiling {:.4}).",
                    tenant_id, hourly_spend_usd, hourly_ceiling_usd
                );
                return Ok(BudgetVerdict::denied(format!(
                    "Hourly spending limit exceeded: ${:.2} of ${:.2}",
                    hourly_spend_usd, hourly_ceiling_usd
                )));
            }
        }

        if let Some(monthly_ceiling_usd) = spend_limits.max_per_month_usd {
            let monthly_window_start = now - chrono::Duration::seconds(MONTH_WINDOW_SECONDS);
            let monthly_spend_usd =
                self.meter_store.charge_sum_since(tenant_id, monthly_window_start).await?;

            if monthly_spend_usd >= monthly_ceiling_usd {
                warn!(
                    "⛔ [BUDGET_VETO]: Tenant {} burned {:.4} USD in the monthly window (ceiling {:.4}).",
                    tenant_id, monthly_spend_usd, monthly_ceiling_usd
                );
                return Ok(BudgetVerdict::denied(format!(
                    "Monthly spending limit exceeded: ${:.2} of ${:.2}",
                    monthly_spend_usd, monthly_ceiling_usd
                )));
            }
        }

        Ok(BudgetVerdict::allowed())
    }
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MeteringError;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicU64, Ordering};
    use wopr_domain_models::MeterEvent;

    /// Fake del log de eventos: suma de cargos controlada por el test.
    #[derive(Default)]
    struct FakeMeterStore {
        /// Cargo devuelto por cada escaneo, en centésimas de USD.
        charge_cents: AtomicU64,
        scan_count: AtomicU64,
    }

    impl FakeMeterStore {
        fn set_charge_usd(&self, charge_usd: f64) {
            self.charge_cents.store((charge_usd * 100.0) as u64, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MeterEventStore for FakeMeterStore {
        async fn append(&self, _event: &MeterEvent) -> Result<(), MeteringError> {
            Ok(())
        }

        async fn charge_sum_since(
            &self,
            _tenant_id: &str,
            _since: DateTime<Utc>,
        ) -> Result<f64, MeteringError> {
            self.scan_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.charge_cents.load(Ordering::SeqCst) as f64 / 100.0)
        }
    }

    fn limits(hourly: Option<f64>, monthly: Option<f64>) -> SpendLimits {
        SpendLimits { max_per_hour_usd: hourly, max_per_month_usd: monthly }
    }

    /**
     * CERTIFICACIÓN: El techo horario excedido produce 429 con ventana nominada.
     */
    #[tokio::test]
    async fn certify_hourly_ceiling_veto() {
        println!("\n🛡️ [PROVING_GROUNDS]: Auditing hourly budget veto...");

        let meter_store = Arc::new(FakeMeterStore::default());
        meter_store.set_charge_usd(0.60);
        let checker = BudgetChecker::new(meter_store.clone());

        let verdict = checker
            .evaluate("tenant-alpha", &limits(Some(0.50), None), false)
            .await
            .unwrap();

        assert!(!verdict.allowed);
        assert_eq!(verdict.http_status, Some(429));
        assert!(verdict.reason.as_deref().unwrap().contains("Hourly spending limit exceeded"));

        println!("   ✅ [SUCCESS]: Hourly veto certified with named window.");
    }

    #[tokio::test]
    async fn certify_monthly_ceiling_veto() {
        let meter_store = Arc::new(FakeMeterStore::default());
        meter_store.set_charge_usd(120.0);
        let checker = BudgetChecker::new(meter_store);

        let verdict = checker
            .evaluate("tenant-alpha", &limits(None, Some(100.0)), false)
            .await
            .unwrap();

        assert!(!verdict.allowed);
        assert!(verdict.reason.as_deref().unwrap().contains("Monthly spending limit exceeded"));
    }

    /// BYOK y techos ausentes no generan ni una sola lectura del log.
    #[tokio::test]
    async fn certify_byok_and_unbounded_bypass() {
        let meter_store = Arc::new(FakeMeterStore::default());
        meter_store.set_charge_usd(9_999.0);
        let checker = BudgetChecker::new(meter_store.clone());

        let byok_verdict =
            checker.evaluate("tenant-alpha", &limits(Some(0.01), None), true).await.unwrap();
        assert!(byok_verdict.allowed);

        let unbounded_verdict =
            checker.evaluate("tenant-alpha", &limits(None, None), false).await.unwrap();
        assert!(unbounded_verdict.allowed);

        assert_eq!(meter_store.scan_count.load(Ordering::SeqCst), 0);
    }

    /**
     * CERTIFICACIÓN: El cache de veredictos absorbe ráfagas dentro del TTL.
     */
    #[tokio::test]
    async fn certify_verdict_cache_bounds_read_amplification() {
        println!("\n🛡️ [PROVING_GROUNDS]: Auditing verdict cache strata...");

        let meter_store = Arc::new(FakeMeterStore::default());
        meter_store.set_charge_usd(0.10);
        let checker =
            BudgetChecker::with_cache_ttl(meter_store.clone(), Duration::from_secs(30));

        let first = checker
            .evaluate("tenant-alpha", &limits(Some(0.50), None), false)
            .await
            .unwrap();
        assert!(first.allowed);

        // El gasto real cruza el techo, pero el veredicto sellado sigue vigente.
        meter_store.set_charge_usd(5.0);
        let cached = checker
            .evaluate("tenant-alpha", &limits(Some(0.50), None), false)
            .await
            .unwrap();
        assert!(cached.allowed, "CACHE_FAULT: Sealed verdict was not reused.");
        assert_eq!(meter_store.scan_count.load(Ordering::SeqCst), 1);

        println!("   ✅ [SUCCESS]: Read amplification bounded by TTL cache.");
    }
}
