// [libs/infra/db-turso/src/repositories/circuit_breaker.rs]
/*!
 * =================================================================
 * APARATO: CIRCUIT BREAKER REPOSITORY (V2.0 - SHARED STATE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ESTADO PERSISTENTE DEL CORTACIRCUITOS
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use libsql::params;
use wopr_domain_gateway::circuit_breaker::{BreakerStore, BreakerWindow};
use wopr_domain_gateway::errors::GatewayError;

use crate::TursoClient;

/// Estado compartido del cortacircuitos en el Motor A.
pub struct CircuitBreakerRepository {
    database_client: TursoClient,
}

impl CircuitBreakerRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn storage_fault(detail: impl std::fmt::Display) -> GatewayError {
        GatewayError::Storage(detail.to_string())
    }
}

#[async_trait]
impl BreakerStore for CircuitBreakerRepository {
    async fn load(&self, instance_id: &str) -> Result<BreakerWindow, GatewayError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT count, window_start_ms, paused_until_ms
                 FROM circuit_breaker_windows WHERE instance_id = ?1",
                params![instance_id],
            )
            .await
            .map_err(Self::storage_fault)?;

        match query_results.next().await.map_err(Self::storage_fault)? {
            Some(data_row) => {
                let count = data_row.get::<i64>(0).map_err(Self::storage_fault)? as u32;
                let window_start = data_row
                    .get::<Option<i64>>(1)
                    .map_err(Self::storage_fault)?
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
                let paused_until = data_row
                    .get::<Option<i64>>(2)
                    .map_err(Self::storage_fault)?
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
                Ok(BreakerWindow { count, window_start, paused_until })
            }
            None => Ok(BreakerWindow::default()),
        }
    }

    async fn save(&self, instance_id: &str, window: &BreakerWindow) -> Result<(), GatewayError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        database_connection
            .execute(
                "INSERT INTO circuit_breaker_windows (instance_id, count, window_start_ms, paused_until_ms)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(instance_id) DO UPDATE SET
                    count = excluded.count,
                    window_start_ms = excluded.window_start_ms,
                    paused_until_ms = excluded.paused_until_ms",
                params![
                    instance_id,
                    window.count as i64,
                    window.window_start.map(|ts| ts.timestamp_millis()),
                    window.paused_until.map(|ts| ts.timestamp_millis())
                ],
            )
            .await
            .map_err(Self::storage_fault)?;

        Ok(())
    }
}
