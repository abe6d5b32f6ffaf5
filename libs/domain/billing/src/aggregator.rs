// [libs/domain/billing/src/aggregator.rs]
/*!
 * =================================================================
 * APARATO: USAGE AGGREGATION ENGINE (V6.0 - EXACTLY-ONCE MASTER)
 * CLASIFICACIÓN: BACKGROUND DOMAIN SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: COLAPSO DE EVENTOS CRUDOS Y REPORTE EXTERNO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXACTLY-ONCE MATERIALIZATION: La clave única de periodo convierte
 *    cada pasada en un upsert idempotente; los reintentos son gratis.
 * 2. HALF-REPORT SHIELD: La fila de reporte externo se inserta solo
 *    tras el éxito upstream; jamás queda un periodo semi-reportado.
 * 3. BACKPRESSURE MERCY: El primer fallo de reporte detiene la pasada
 *    del tick para no martillar al procesador externo; el siguiente
 *    tick retoma desde la contabilidad de filas.
 * 4. GRACEFUL SHUTDOWN: La señal de apagado se observa entre periodos
 *    y entre reportes, nunca a mitad de uno.
 *
 * # Mathematical Proof (Idempotent Reporting):
 * Sea R el conjunto de tuplas reportadas. Un periodo entra a R solo
 * tras ACK upstream, y la unicidad de la tupla impide el re-ingreso.
 * Por lo tanto cada periodo se transmite al procesador a lo sumo una
 * vez y se marca exactamente una vez.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::AggregationError;
use crate::store::{UsageReporter, UsageStore};

/// Periodo de facturación por defecto: 5 minutos.
const DEFAULT_BILLING_PERIOD_MS: i64 = 300_000;
/// Gracia por defecto para eventos rezagados: 60 segundos.
const DEFAULT_LATE_ARRIVAL_GRACE_MS: i64 = 60_000;
/// Tamaño de ráfaga de reporte para acotar el RTT por tick.
const REPORT_BATCH_MAX_SIZE: u32 = 50;

/// Parámetros operativos del motor de agregación.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Longitud del periodo de facturación (ms).
    pub billing_period_ms: i64,
    /// Gracia para eventos rezagados antes de sellar un periodo (ms).
    pub late_arrival_grace_ms: i64,
    /// Cadencia del bucle de escrutinio.
    pub scan_interval: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            billing_period_ms: DEFAULT_BILLING_PERIOD_MS,
            late_arrival_grace_ms: DEFAULT_LATE_ARRIVAL_GRACE_MS,
            scan_interval: Duration::from_millis(DEFAULT_BILLING_PERIOD_MS as u64),
        }
    }
}

/**
 * Motor de agregación: colapsa el log de eventos en agregados de periodo
 * y nivela los pendientes contra el procesador externo de pagos.
 */
pub struct UsageAggregator {
    usage_store: Arc<dyn UsageStore>,
    report_sink: Arc<dyn UsageReporter>,
    config: AggregatorConfig,
    shutdown_signal: watch::Receiver<bool>,
}

impl UsageAggregator {
    pub fn new(
        usage_store: Arc<dyn UsageStore>,
        report_sink: Arc<dyn UsageReporter>,
        config: AggregatorConfig,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self { usage_store, report_sink, config, shutdown_signal }
    }

    /**
     * Bucle perpetuo de nivelación en el reactor de Tokio.
     * Cada tick ejecuta la materialización y después la pasada de reporte.
     */
    pub async fn spawn_aggregation_loop(mut self) {
        info!(
            "📊 [AGGREGATOR_DAEMON]: Usage leveling engine online. Period: {}ms, grace: {}ms.",
            self.config.billing_period_ms, self.config.late_arrival_grace_ms
        );

        let mut scan_timer = interval(self.config.scan_interval);

        loop {
            tokio::select! {
                _ = scan_timer.tick() => {
                    if let Err(tick_fault) = self.execute_tick().await {
                        error!("❌ [AGGREGATOR_FAULT]: Tick aborted: {}", tick_fault);
                    }
                },
                _ = self.shutdown_signal.changed() => {
                    if *self.shutdown_signal.borrow() {
                        info!("🛑 [AGGREGATOR_DAEMON]: Shutdown signal observed. Leveling loop sealed.");
                        break;
                    }
                },
            }
        }
    }

    /**
     * Una pasada completa: materialización de periodos maduros + reporte.
     * Visible para el Proving Grounds.
     */
    #[instrument(skip(self))]
    pub async fn execute_tick(&self) -> Result<(), AggregationError> {
        let maturity_horizon =
            Utc::now() - chrono::Duration::milliseconds(self.config.late_arrival_grace_ms);

        let materialized_count = self
            .usage_store
            .materialize_due_periods(self.config.billing_period_ms, maturity_horizon)
            .await?;

        if materialized_count > 0 {
            debug!("📊 [AGGREGATOR]: {} period summaries crystallized.", materialized_count);
        }

        self.execute_reporting_pass().await;
        Ok(())
    }

    /**
     * Pasada de reporte: transmite cada agregado sin fila de reporte y
     * sella la contabilidad tras el ACK upstream.
     *
     * # Logic:
     * - Periodos de valor cero: solo se marcan (sin llamada externa).
     * - Primer fallo upstream: la pasada termina para este tick.
     * - Señal de apagado: se respeta entre reportes.
     */
    async fn execute_reporting_pass(&self) {
        let pending_batch = match self.usage_store.unreported_summaries(REPORT_BATCH_MAX_SIZE).await
        {
            Ok(batch) => batch,
            Err(scan_fault) => {
                error!("❌ [REPORT_SCAN_FAULT]: Pending summary scan collapsed: {}", scan_fault);
                return;
            }
        };

        if pending_batch.is_empty() {
            return;
        }

        info!("📤 [AGGREGATOR]: Leveling {} period summaries upstream...", pending_batch.len());

        for period_summary in pending_batch {
            if *self.shutdown_signal.borrow() {
                warn!("🛑 [AGGREGATOR]: Shutdown observed mid-pass. Remaining periods deferred.");
                return;
            }

            if !period_summary.is_zero_value() {
                if let Err(upstream_fault) = self.report_sink.report_usage(&period_summary).await {
                    warn!(
                        "⚠️ [REPORT_DEFERRED]: Upstream rejected period {}/{:?}/{}: {}. Pass sealed for this tick.",
                        period_summary.tenant_id,
                        period_summary.capability,
                        period_summary.period_start,
                        upstream_fault
                    );
                    return;
                }
            }

            if let Err(bookkeeping_fault) =
                self.usage_store.mark_reported(&period_summary, Utc::now()).await
            {
                error!(
                    "❌ [REPORT_BOOKKEEPING_FAULT]: Could not seal report row for {}: {}",
                    period_summary.tenant_id, bookkeeping_fault
                );
                return;
            }
        }
    }
}
