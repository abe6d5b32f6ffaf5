// [libs/infra/db-turso/src/repositories/nodes.rs]
/*!
 * =================================================================
 * APARATO: FLEET NODE REPOSITORY (V5.0 - VITALITY LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL REGISTRO DE NODOS DE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE WRITER DISCIPLINE: Las mutaciones llegan ya serializadas
 *    por el retículo de candados del estrato L2 (fleet).
 * 2. STATUS SOVEREIGNTY: Solo HeartbeatProcessor y Watchdog mutan el
 *    estado; los handlers consultan.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::params;
use tracing::instrument;
use wopr_domain_fleet::errors::FleetError;
use wopr_domain_fleet::store::NodeStore;
use wopr_domain_models::{DrainStatus, Node, NodeRegistration, NodeResourceUsage, NodeStatus};

use crate::TursoClient;

fn drain_label(drain: DrainStatus) -> &'static str {
    match drain {
        DrainStatus::Accepting => "accepting",
        DrainStatus::Draining => "draining",
        DrainStatus::Drained => "drained",
    }
}

fn drain_from_label(raw_label: &str) -> DrainStatus {
    match raw_label {
        "draining" => DrainStatus::Draining,
        "drained" => DrainStatus::Drained,
        _ => DrainStatus::Accepting,
    }
}

/// Registro persistente de la flota en el Motor A.
pub struct NodeRepository {
    database_client: TursoClient,
}

impl NodeRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn storage_fault(detail: impl std::fmt::Display) -> FleetError {
        FleetError::Storage(detail.to_string())
    }

    fn hydrate_node(data_row: &libsql::Row) -> Result<Node, FleetError> {
        let status_label = data_row.get::<String>(2).map_err(Self::storage_fault)?;
        let status = NodeStatus::from_str_label(&status_label).ok_or_else(|| {
            Self::storage_fault(format!("MAPPING_FAULT: unknown node status '{}'", status_label))
        })?;

        let drain_label_raw =
            data_row.get::<Option<String>>(6).unwrap_or(None).unwrap_or_default();

        let last_heartbeat_at = data_row
            .get::<Option<i64>>(7)
            .unwrap_or(None)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        Ok(Node {
            id: data_row.get::<String>(0).map_err(Self::storage_fault)?,
            host: data_row.get::<String>(1).map_err(Self::storage_fault)?,
            status,
            provision_stage: data_row.get::<Option<String>>(3).unwrap_or(None),
            capacity_mb: data_row.get::<i64>(4).map_err(Self::storage_fault)?,
            used_mb: data_row.get::<i64>(5).map_err(Self::storage_fault)?,
            drain_status: drain_from_label(&drain_label_raw),
            last_heartbeat_at,
            agent_version: data_row.get::<Option<String>>(8).unwrap_or(None),
            secret: data_row.get::<Option<String>>(9).unwrap_or(None),
        })
    }

    const NODE_PROJECTION: &'static str =
        "id, host, status, provision_stage, capacity_mb, used_mb, drain_status,
         last_heartbeat_ms, agent_version, secret";

    /// Inventario completo para las superficies administrativas.
    pub async fn list_all(&self) -> Result<Vec<Node>, FleetError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let projection_query =
            format!("SELECT {} FROM nodes ORDER BY id ASC", Self::NODE_PROJECTION);
        let mut query_results =
            database_connection.query(&projection_query, ()).await.map_err(Self::storage_fault)?;

        let mut fleet_inventory = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(Self::storage_fault)? {
            fleet_inventory.push(Self::hydrate_node(&data_row)?);
        }
        Ok(fleet_inventory)
    }

    /// Mutación del estado de drenado para mantenimiento planificado.
    pub async fn set_drain_status(
        &self,
        node_id: &str,
        drain: DrainStatus,
    ) -> Result<(), FleetError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let affected_rows = database_connection
            .execute(
                "UPDATE nodes SET drain_status = ?2 WHERE id = ?1",
                params![node_id, drain_label(drain)],
            )
            .await
            .map_err(Self::storage_fault)?;

        if affected_rows == 0 {
            return Err(FleetError::UnknownNode(node_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeStore for NodeRepository {
    async fn fetch(&self, node_id: &str) -> Result<Option<Node>, FleetError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let projection_query =
            format!("SELECT {} FROM nodes WHERE id = ?1", Self::NODE_PROJECTION);
        let mut query_results = database_connection
            .query(&projection_query, params![node_id])
            .await
            .map_err(Self::storage_fault)?;

        match query_results.next().await.map_err(Self::storage_fault)? {
            Some(data_row) => Ok(Some(Self::hydrate_node(&data_row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, registration), fields(node = %registration.node_id))]
    async fn upsert_registration(
        &self,
        registration: &NodeRegistration,
    ) -> Result<(), FleetError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        database_connection
            .execute(
                "INSERT INTO nodes (id, host, status, provision_stage, capacity_mb, agent_version)
                 VALUES (?1, ?2, 'provisioning', 'registered', ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    host = excluded.host,
                    capacity_mb = excluded.capacity_mb,
                    agent_version = excluded.agent_version",
                params![
                    registration.node_id.clone(),
                    registration.host.clone(),
                    registration.capacity_mb,
                    registration.agent_version.clone()
                ],
            )
            .await
            .map_err(Self::storage_fault)?;

        Ok(())
    }

    async fn record_heartbeat(
        &self,
        node_id: &str,
        beat_at: DateTime<Utc>,
        used_mb: i64,
        resource_usage: &NodeResourceUsage,
        next_status: NodeStatus,
    ) -> Result<(), FleetError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let affected_rows = database_connection
            .execute(
                "UPDATE nodes SET
                    last_heartbeat_ms = ?2,
                    used_mb = ?3,
                    cpu_load_percentage = ?4,
                    memory_used_mb = ?5,
                    disk_used_mb = ?6,
                    status = ?7
                 WHERE id = ?1",
                params![
                    node_id,
                    beat_at.timestamp_millis(),
                    used_mb,
                    resource_usage.cpu_load_percentage as f64,
                    resource_usage.memory_used_mb as i64,
                    resource_usage.disk_used_mb as i64,
                    next_status.as_str()
                ],
            )
            .await
            .map_err(Self::storage_fault)?;

        if affected_rows == 0 {
            return Err(FleetError::UnknownNode(node_id.to_string()));
        }
        Ok(())
    }

    async fn list_with_status(&self, statuses: &[NodeStatus]) -> Result<Vec<Node>, FleetError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        // Las etiquetas provienen del enum; la cláusula IN es estática.
        let status_labels: Vec<String> =
            statuses.iter().map(|status| format!("'{}'", status.as_str())).collect();
        let filtered_query = format!(
            "SELECT {} FROM nodes WHERE status IN ({}) ORDER BY id ASC",
            Self::NODE_PROJECTION,
            status_labels.join(", ")
        );

        let mut query_results =
            database_connection.query(&filtered_query, ()).await.map_err(Self::storage_fault)?;

        let mut matching_nodes = Vec::new();
        while let Some(data_row) = query_results.next().await.map_err(Self::storage_fault)? {
            matching_nodes.push(Self::hydrate_node(&data_row)?);
        }
        Ok(matching_nodes)
    }

    async fn set_status(&self, node_id: &str, status: NodeStatus) -> Result<(), FleetError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::storage_fault)?;

        let affected_rows = database_connection
            .execute(
                "UPDATE nodes SET status = ?2 WHERE id = ?1",
                params![node_id, status.as_str()],
            )
            .await
            .map_err(Self::storage_fault)?;

        if affected_rows == 0 {
            return Err(FleetError::UnknownNode(node_id.to_string()));
        }
        Ok(())
    }
}
