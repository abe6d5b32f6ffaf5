// [libs/infra/db-turso/src/repositories/usage.rs]
/*!
 * =================================================================
 * APARATO: USAGE AGGREGATION REPOSITORY (V4.0 - EXACTLY-ONCE SQL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MATERIALIZACIÓN DE PERIODOS Y CONTABILIDAD DE REPORTES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SET-BASED MATERIALIZATION: Un único INSERT..SELECT con upsert
 *    colapsa el log crudo en agregados; la clave compuesta garantiza
 *    la materialización exactly-once.
 * 2. ROLLING MIRROR: La misma pasada nivela el agregado de ventana
 *    móvil horaria que consume el Dashboard.
 * 3. REPORT LEDGER: 'external_usage_reports' es la prueba de reporte;
 *    el LEFT JOIN sobre su ausencia define el backlog pendiente.
 *
 * # Mathematical Proof (Period Bucketing):
 * period_start = floor(timestamp / period) * period. Todo evento cae
 * en exactamente un cubo, y un cubo queda maduro cuando su fin es
 * anterior al horizonte de gracia.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::params;
use tracing::{debug, instrument};
use wopr_domain_billing::errors::AggregationError;
use wopr_domain_billing::store::UsageStore;
use wopr_domain_models::{BillingPeriodSummary, Capability};

use crate::TursoClient;

/// Ventana del agregado móvil del Dashboard: 1 hora.
const ROLLING_WINDOW_MS: i64 = 3_600_000;

/// Adaptador de materialización y reporte del consumo.
pub struct UsageRepository {
    database_client: TursoClient,
}

impl UsageRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn storage_fault(detail: impl std::fmt::Display) -> AggregationError {
        AggregationError::Storage(detail.to_string())
    }

    fn hydrate_summary(row: &libsql::Row) -> Result<BillingPeriodSummary, AggregationError> {
        let capability_label =
            row.get::<String>(1).map_err(Self::storage_fault)?;
        let capability = Capability::from_wire_name(&capability_label).ok_or_else(|| {
            Self::storage_fault(format!("MAPPING_FAULT: unknown capability '{}'", capability_label))
        })?;

        let period_start_ms = row.get::<i64>(3).map_err(Self::storage_fault)?;
        let period_start = Utc
            .timestamp_millis_opt(period_start_ms)
            .single()
            .ok_or_else(|| Self::storage_fault("MAPPING_FAULT: period_start_ms out of range"))?;

        Ok(BillingPeriodSummary {
            tenant_id: row.get::<String>(0).map_err(Self::storage_fault)?,
            capability,
            provider: row.get::<String>(2).map_err(Self::storage_fault)?,
            period_start,
            event_count: row.get::<i64>(4).map_err(Self::storage_fault)?,
            total_cost_usd: row.get::<f64>(5).map_err(Self::storage_fault)?,
            total_charge_usd: row.get::<f64>(6).map_err(Self::storage_fault)?,
            total_duration_seconds: row.get::<f64>(7).map_err(Self::storage_fault)?,
        })
    }
}

#[async_trait]
impl UsageStore for UsageRepository {
    #[instrument(skip(self))]
    async fn materialize_due_periods(
        &self,
        period_ms: i64,
        mature_before: DateTime<Utc>,
    ) -> Result<u64, AggregationError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;
        let horizon_ms = mature_before.timestamp_millis();

        // 1. AGREGADOS DE PERIODO FIJO (contabilidad externa).
        let materialized_rows = database_connection
            .execute(
                "INSERT INTO billing_period_summaries (
                    tenant_id, capability, provider, period_start_ms,
                    event_count, total_cost_usd, total_charge_usd, total_duration_seconds
                 )
                 SELECT tenant_id, capability, provider,
                        (timestamp_ms / ?1) * ?1 AS period_start_ms,
                        COUNT(*), SUM(cost_usd), SUM(charge_usd), SUM(duration_seconds)
                 FROM meter_events
                 WHERE (timestamp_ms / ?1) * ?1 + ?1 <= ?2
                 GROUP BY tenant_id, capability, provider, period_start_ms
                 ON CONFLICT(tenant_id, capability, provider, period_start_ms) DO UPDATE SET
                    event_count = excluded.event_count,
                    total_cost_usd = excluded.total_cost_usd,
                    total_charge_usd = excluded.total_charge_usd,
                    total_duration_seconds = excluded.total_duration_seconds",
                params![period_ms, horizon_ms],
            )
            .await
            .map_err(Self::storage_fault)?;

        // 2. ESPEJO DE VENTANA MÓVIL HORARIA (Dashboard).
        database_connection
            .execute(
                "INSERT INTO usage_summaries (
                    tenant_id, capability, provider, window_start_ms,
                    event_count, total_cost_usd, total_charge_usd, total_duration_seconds
                 )
                 SELECT tenant_id, capability, provider,
                        (timestamp_ms / ?1) * ?1 AS window_start_ms,
                        COUNT(*), SUM(cost_usd), SUM(charge_usd), SUM(duration_seconds)
                 FROM meter_events
                 GROUP BY tenant_id, capability, provider, window_start_ms
                 ON CONFLICT(tenant_id, capability, provider, window_start_ms) DO UPDATE SET
                    event_count = excluded.event_count,
                    total_cost_usd = excluded.total_cost_usd,
                    total_charge_usd = excluded.total_charge_usd,
                    total_duration_seconds = excluded.total_duration_seconds",
                params![ROLLING_WINDOW_MS],
            )
            .await
            .map_err(Self::storage_fault)?;

        debug!("📊 [USAGE_MATERIALIZE]: {} period rows leveled.", materialized_rows);
        Ok(materialized_rows)
    }

    async fn unreported_summaries(
        &self,
        batch_limit: u32,
    ) -> Result<Vec<BillingPeriodSummary>, AggregationError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT s.tenant_id, s.capability, s.provider, s.period_start_ms,
                        s.event_count, s.total_cost_usd, s.total_charge_usd, s.total_duration_seconds
                 FROM billing_period_summaries s
                 LEFT JOIN external_usage_reports r
                   ON r.tenant_id = s.tenant_id
                  AND r.capability = s.capability
                  AND r.provider = s.provider
                  AND r.period_start_ms = s.period_start_ms
                 WHERE r.tenant_id IS NULL
                 ORDER BY s.period_start_ms ASC
                 LIMIT ?1",
                params![batch_limit as i64],
            )
            .await
            .map_err(Self::storage_fault)?;

        let mut pending_summaries = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(Self::storage_fault)? {
            pending_summaries.push(Self::hydrate_summary(&data_row)?);
        }
        Ok(pending_summaries)
    }

    async fn mark_reported(
        &self,
        summary: &BillingPeriodSummary,
        reported_at: DateTime<Utc>,
    ) -> Result<(), AggregationError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        // La clave compuesta absorbe el replay: marcar dos veces es inocuo.
        database_connection
            .execute(
                "INSERT OR IGNORE INTO external_usage_reports (
                    tenant_id, capability, provider, period_start_ms, reported_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    summary.tenant_id.clone(),
                    summary.capability.wire_name(),
                    summary.provider.clone(),
                    summary.period_start.timestamp_millis(),
                    reported_at.to_rfc3339()
                ],
            )
            .await
            .map_err(Self::storage_fault)?;

        Ok(())
    }
}
