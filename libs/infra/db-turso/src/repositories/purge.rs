// [libs/infra/db-turso/src/repositories/purge.rs]
/*!
 * =================================================================
 * APARATO: TENANT PURGE REPOSITORY (V3.0 - REGULATORY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PASOS DE BORRADO Y ANONIMIZACIÓN POR TENANT
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STEP GRANULARITY: Un método por paso del pipeline; el ejecutor
 *    del estrato L2 gobierna el orden y las fronteras de error.
 * 2. REGULATORY ANCHOR: La auditoría administrativa se anonimiza con
 *    UPDATE; este aparato no expone DELETE para esa tabla.
 * =================================================================
 */

use async_trait::async_trait;
use libsql::params;
use tracing::instrument;
use wopr_domain_lifecycle::errors::LifecycleError;
use wopr_domain_lifecycle::store::{PurgeStore, SnapshotRecord, TableCounts, TenantCustomerStore};

use crate::TursoClient;

/// Adaptador de purga del Motor A.
pub struct PurgeRepository {
    database_client: TursoClient,
}

impl PurgeRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn storage_fault(detail: impl std::fmt::Display) -> LifecycleError {
        LifecycleError::Storage(detail.to_string())
    }

    /// DELETE parametrizado por tenant con conteo de filas.
    async fn delete_where_tenant(&self, sql: &str, tenant_id: &str) -> Result<u64, LifecycleError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;
        database_connection.execute(sql, params![tenant_id]).await.map_err(Self::storage_fault)
    }
}

#[async_trait]
impl PurgeStore for PurgeRepository {
    async fn purge_bot_instances(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM bot_instances WHERE tenant_id = ?1", tenant_id).await
    }

    async fn purge_credit_ledger(&self, tenant_id: &str) -> Result<TableCounts, LifecycleError> {
        Ok(vec![
            (
                "credit_transactions",
                self.delete_where_tenant(
                    "DELETE FROM credit_transactions WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "credit_balances",
                self.delete_where_tenant(
                    "DELETE FROM credit_balances WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "credit_adjustments",
                self.delete_where_tenant(
                    "DELETE FROM credit_adjustments WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
        ])
    }

    async fn purge_usage_data(&self, tenant_id: &str) -> Result<TableCounts, LifecycleError> {
        Ok(vec![
            (
                "meter_events",
                self.delete_where_tenant("DELETE FROM meter_events WHERE tenant_id = ?1", tenant_id)
                    .await?,
            ),
            (
                "usage_summaries",
                self.delete_where_tenant(
                    "DELETE FROM usage_summaries WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "billing_period_summaries",
                self.delete_where_tenant(
                    "DELETE FROM billing_period_summaries WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "external_usage_reports",
                self.delete_where_tenant(
                    "DELETE FROM external_usage_reports WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
        ])
    }

    async fn purge_notification_data(
        &self,
        tenant_id: &str,
    ) -> Result<TableCounts, LifecycleError> {
        Ok(vec![
            (
                "notification_queue",
                self.delete_where_tenant(
                    "DELETE FROM notification_queue WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "notification_preferences",
                self.delete_where_tenant(
                    "DELETE FROM notification_preferences WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "notification_history",
                self.delete_where_tenant(
                    "DELETE FROM notification_history WHERE tenant_id = ?1",
                    tenant_id,
                )
                .await?,
            ),
        ])
    }

    async fn purge_user_audit_log(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM user_audit_log WHERE tenant_id = ?1", tenant_id).await
    }

    #[instrument(skip(self, sentinel), fields(tenant = %tenant_id))]
    async fn anonymize_admin_audit_log(
        &self,
        tenant_id: &str,
        sentinel: &str,
    ) -> Result<u64, LifecycleError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        // Las filas permanecen; los identificadores reciben el centinela.
        database_connection
            .execute(
                "UPDATE admin_audit_log SET target_tenant = ?2, target_user = ?2
                 WHERE target_tenant = ?1",
                params![tenant_id, sentinel],
            )
            .await
            .map_err(Self::storage_fault)
    }

    async fn purge_admin_notes(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM admin_notes WHERE tenant_id = ?1", tenant_id).await
    }

    async fn list_snapshots(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<SnapshotRecord>, LifecycleError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT id, object_key FROM snapshots WHERE tenant_id = ?1 ORDER BY id ASC",
                params![tenant_id],
            )
            .await
            .map_err(Self::storage_fault)?;

        let mut snapshot_records = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(Self::storage_fault)? {
            snapshot_records.push(SnapshotRecord {
                id: data_row.get::<String>(0).map_err(Self::storage_fault)?,
                object_key: data_row.get::<String>(1).map_err(Self::storage_fault)?,
            });
        }
        Ok(snapshot_records)
    }

    async fn purge_snapshot_rows(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM snapshots WHERE tenant_id = ?1", tenant_id).await
    }

    async fn purge_backup_status(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM backup_status WHERE tenant_id = ?1", tenant_id).await
    }

    async fn purge_external_charges(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM external_charges WHERE tenant_id = ?1", tenant_id)
            .await
    }

    async fn purge_tenant_status(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM tenant_status WHERE tenant_id = ?1", tenant_id).await
    }

    async fn purge_user_roles(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;
        // Ambas direcciones de la relación.
        database_connection
            .execute(
                "DELETE FROM user_roles WHERE user_id = ?1 OR role_id = ?1",
                params![tenant_id],
            )
            .await
            .map_err(Self::storage_fault)
    }

    async fn purge_customer_mapping(&self, tenant_id: &str) -> Result<u64, LifecycleError> {
        self.delete_where_tenant("DELETE FROM customer_mappings WHERE tenant_id = ?1", tenant_id)
            .await
    }

    async fn purge_auth_records(&self, tenant_id: &str) -> Result<TableCounts, LifecycleError> {
        Ok(vec![
            (
                "sessions",
                self.delete_where_tenant("DELETE FROM sessions WHERE user_id = ?1", tenant_id)
                    .await?,
            ),
            (
                "accounts",
                self.delete_where_tenant("DELETE FROM accounts WHERE user_id = ?1", tenant_id)
                    .await?,
            ),
            (
                "verification_tokens",
                self.delete_where_tenant(
                    "DELETE FROM verification_tokens WHERE identifier = ?1",
                    tenant_id,
                )
                .await?,
            ),
            (
                "users",
                self.delete_where_tenant("DELETE FROM users WHERE id = ?1", tenant_id).await?,
            ),
        ])
    }
}

#[async_trait]
impl TenantCustomerStore for PurgeRepository {
    async fn customer_id_for(&self, tenant_id: &str) -> Result<Option<String>, LifecycleError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT customer_id FROM customer_mappings WHERE tenant_id = ?1",
                params![tenant_id],
            )
            .await
            .map_err(Self::storage_fault)?;

        match query_results.next().await.map_err(Self::storage_fault)? {
            Some(data_row) => {
                Ok(Some(data_row.get::<String>(0).map_err(Self::storage_fault)?))
            }
            None => Ok(None),
        }
    }
}
