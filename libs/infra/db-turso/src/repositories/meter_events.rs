// [libs/infra/db-turso/src/repositories/meter_events.rs]
/*!
 * =================================================================
 * APARATO: METER EVENT REPOSITORY (V3.0 - APPEND ONLY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LOG DURABLE DE EVENTOS DE CONSUMO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. APPEND-ONLY DISCIPLINE: Sin UPDATE ni DELETE; la retirada vive
 *    exclusivamente en el ejecutor de borrado y la retención.
 * 2. WINDOW SCANS: Índices (tenant, timestamp) y (timestamp) sirven
 *    al BudgetChecker y al agregador sin escaneo completo.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params;
use tracing::{debug, instrument};
use wopr_domain_billing::errors::MeteringError;
use wopr_domain_billing::store::MeterEventStore;
use wopr_domain_models::{MeterEvent, MeterTier};

use crate::TursoClient;

/// Etiqueta persistida del nivel comercial.
fn tier_label(tier: MeterTier) -> &'static str {
    match tier {
        MeterTier::Wopr => "wopr",
        MeterTier::Branded => "branded",
        MeterTier::Byok => "byok",
    }
}

/// Sumidero oficial del rastro de consumo en el Motor A.
pub struct MeterEventRepository {
    database_client: TursoClient,
}

impl MeterEventRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }
}

#[async_trait]
impl MeterEventStore for MeterEventRepository {
    #[instrument(skip(self, event), fields(tenant = %event.tenant_id))]
    async fn append(&self, event: &MeterEvent) -> Result<(), MeteringError> {
        let database_connection = self
            .database_client
            .get_connection()
            .map_err(|e| MeteringError::AppendFailure(e.to_string()))?;

        database_connection
            .execute(
                "INSERT INTO meter_events (
                    id, tenant_id, capability, provider, cost_usd, charge_usd,
                    duration_seconds, timestamp_ms, session_id, tier
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event.id.clone(),
                    event.tenant_id.clone(),
                    event.capability.wire_name(),
                    event.provider.clone(),
                    event.cost_usd,
                    event.charge_usd,
                    event.duration_seconds,
                    event.timestamp.timestamp_millis(),
                    event.session_id.clone(),
                    tier_label(event.tier)
                ],
            )
            .await
            .map_err(|e| MeteringError::AppendFailure(e.to_string()))?;

        debug!("📊 [METER_APPEND]: Event {} crystallized.", event.id);
        Ok(())
    }

    async fn charge_sum_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<f64, MeteringError> {
        let database_connection = self
            .database_client
            .get_connection()
            .map_err(|e| MeteringError::ScanFailure(e.to_string()))?;

        let mut query_results = database_connection
            .query(
                "SELECT COALESCE(SUM(charge_usd), 0.0) FROM meter_events
                 WHERE tenant_id = ?1 AND timestamp_ms >= ?2",
                params![tenant_id, since.timestamp_millis()],
            )
            .await
            .map_err(|e| MeteringError::ScanFailure(e.to_string()))?;

        match query_results.next().await.map_err(|e| MeteringError::ScanFailure(e.to_string()))? {
            Some(data_row) => {
                data_row.get::<f64>(0).map_err(|e| MeteringError::ScanFailure(e.to_string()))
            }
            None => Ok(0.0),
        }
    }
}
