// [libs/infra/db-turso/src/repositories/rate_limit.rs]
/*!
 * =================================================================
 * APARATO: RATE LIMIT REPOSITORY (V3.0 - ATOMIC WINDOW MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CONTADOR COMPARTIDO DE VENTANA FIJA
 *
 * # Mathematical Proof (Atomic Upsert):
 * El incremento es un único upsert con CASE de reinicio: todas las
 * expresiones SET se evalúan contra la fila original, por lo que el
 * par (count, window_start) devuelto por RETURNING es el estado
 * exacto observado por esta petición.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::params;
use wopr_domain_gateway::errors::GatewayError;
use wopr_domain_gateway::rate_limiter::RateLimitStore;

use crate::TursoClient;

/// Contador de ventana fija compartido entre instancias del plano.
pub struct RateLimitRepository {
    database_client: TursoClient,
}

impl RateLimitRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn storage_fault(detail: impl std::fmt::Display) -> GatewayError {
        GatewayError::Storage(detail.to_string())
    }
}

#[async_trait]
impl RateLimitStore for RateLimitRepository {
    async fn increment(
        &self,
        key: &str,
        scope: &str,
        window_ms: i64,
    ) -> Result<(u32, DateTime<Utc>), GatewayError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;
        let now_ms = Utc::now().timestamp_millis();

        let mut query_results = database_connection
            .query(
                "INSERT INTO rate_limit_windows (key, scope, count, window_start_ms)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(key, scope) DO UPDATE SET
                    count = CASE
                        WHEN ?3 - rate_limit_windows.window_start_ms >= ?4 THEN 1
                        ELSE rate_limit_windows.count + 1
                    END,
                    window_start_ms = CASE
                        WHEN ?3 - rate_limit_windows.window_start_ms >= ?4 THEN ?3
                        ELSE rate_limit_windows.window_start_ms
                    END
                 RETURNING count, window_start_ms",
                params![key, scope, now_ms, window_ms],
            )
            .await
            .map_err(Self::storage_fault)?;

        let data_row = query_results
            .next()
            .await
            .map_err(Self::storage_fault)?
            .ok_or_else(|| Self::storage_fault("RETURNING produced no row"))?;

        let count = data_row.get::<i64>(0).map_err(Self::storage_fault)? as u32;
        let window_start_ms = data_row.get::<i64>(1).map_err(Self::storage_fault)?;
        let window_start = Utc
            .timestamp_millis_opt(window_start_ms)
            .single()
            .ok_or_else(|| Self::storage_fault("window_start_ms out of range"))?;

        Ok((count, window_start))
    }
}
