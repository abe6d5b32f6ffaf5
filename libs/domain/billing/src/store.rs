// [libs/domain/billing/src/store.rs]
/*!
 * =================================================================
 * APARATO: BILLING SEAM CONTRACTS (V2.0 - TRAIT SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN PORTS (ESTRATO L2)
 * RESPONSABILIDAD: COSTURAS DE PERSISTENCIA Y REPORTE EXTERNO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PORT/ADAPTER DISCIPLINE: El dominio define los puertos; la
 *    infraestructura (libSQL, Stripe) provee los adaptadores.
 * 2. FAKE-FRIENDLY: Cada trait es implementable en una decena de
 *    líneas para el Proving Grounds.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wopr_domain_models::{BillingPeriodSummary, CreditTransaction, MeterEvent};

use crate::errors::{AggregationError, LedgerError, MeteringError};

/// Puerto de persistencia del Ledger de créditos.
///
/// El adaptador debe garantizar que la inserción de una transacción con un
/// ancla (tenant, reference_id) ya existente falle con `DuplicateReference`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Devuelve el `balance_after` de la transacción más reciente del tenant.
    async fn last_balance(&self, tenant_id: &str) -> Result<Option<i64>, LedgerError>;

    /// Cristaliza una transacción ya sellada con su `balance_after`.
    async fn insert_transaction(&self, transaction: &CreditTransaction) -> Result<(), LedgerError>;

    /// Evalúa si el ancla de idempotencia ya existe para el tenant.
    async fn has_reference(&self, tenant_id: &str, reference_id: &str) -> Result<bool, LedgerError>;

    /// Historial paginado en orden de inserción descendente.
    async fn history(
        &self,
        tenant_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, LedgerError>;
}

/// Puerto del log durable de eventos de medición.
#[async_trait]
pub trait MeterEventStore: Send + Sync {
    /// Append total y durable; el fallo debe aflorar al AdapterSocket.
    async fn append(&self, event: &MeterEvent) -> Result<(), MeteringError>;

    /// Suma de `charge_usd` del tenant desde el instante dado (ventana móvil).
    async fn charge_sum_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<f64, MeteringError>;
}

/// Puerto de materialización y contabilidad de reportes de periodo.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /**
     * Materializa los agregados de todo periodo presente en el log de
     * eventos cuyo fin sea anterior a `mature_before`. La clave única
     * (tenant, capability, provider, period_start) garantiza exactly-once.
     *
     * @returns Cantidad de agregados upserteados en esta pasada.
     */
    async fn materialize_due_periods(
        &self,
        period_ms: i64,
        mature_before: DateTime<Utc>,
    ) -> Result<u64, AggregationError>;

    /// Agregados de periodo aún sin fila de reporte externo.
    async fn unreported_summaries(
        &self,
        batch_limit: u32,
    ) -> Result<Vec<BillingPeriodSummary>, AggregationError>;

    /// Inserta la fila de reporte externo; solo tras éxito upstream.
    async fn mark_reported(
        &self,
        summary: &BillingPeriodSummary,
        reported_at: DateTime<Utc>,
    ) -> Result<(), AggregationError>;
}

/// Puerto del procesador externo de pagos para reportes de consumo.
#[async_trait]
pub trait UsageReporter: Send + Sync {
    /// Transmite un agregado de periodo al procesador externo.
    async fn report_usage(&self, summary: &BillingPeriodSummary) -> Result<(), AggregationError>;
}
