// [libs/domain/fleet/src/store.rs]
/*!
 * =================================================================
 * APARATO: FLEET STORE CONTRACT (V3.0 - TRAIT SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN PORTS (ESTRATO L2)
 * RESPONSABILIDAD: COSTURA DE PERSISTENCIA DEL REGISTRO DE NODOS
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wopr_domain_models::{Node, NodeRegistration, NodeResourceUsage, NodeStatus};

use crate::errors::FleetError;

/// Puerto de persistencia del registro de nodos (Motor A).
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Recupera un nodo por identificador.
    async fn fetch(&self, node_id: &str) -> Result<Option<Node>, FleetError>;

    /// Alta o actualización idempotente desde un mensaje 'register'.
    async fn upsert_registration(&self, registration: &NodeRegistration)
        -> Result<(), FleetError>;

    /**
     * Cristaliza un latido aceptado: sello temporal, telemetría de
     * recursos, memoria agregada y el estado resultante de la transición.
     */
    async fn record_heartbeat(
        &self,
        node_id: &str,
        beat_at: DateTime<Utc>,
        used_mb: i64,
        resource_usage: &NodeResourceUsage,
        next_status: NodeStatus,
    ) -> Result<(), FleetError>;

    /// Nodos en cualquiera de los estados dados (escaneo del Watchdog).
    async fn list_with_status(&self, statuses: &[NodeStatus]) -> Result<Vec<Node>, FleetError>;

    /// Mutación directa de estado (transiciones del Watchdog).
    async fn set_status(&self, node_id: &str, status: NodeStatus) -> Result<(), FleetError>;
}

// =================================================================
// SOPORTE DEL PROVING GROUNDS (compartido por heartbeat y watchdog)
// =================================================================
#[cfg(test)]
pub mod tests_support {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;
    use wopr_domain_models::DrainStatus;

    /// Registro de nodos en RAM con sembrado directo para los tests.
    #[derive(Default)]
    pub struct MemoryNodeStore {
        pub nodes: Mutex<HashMap<String, Node>>,
    }

    impl MemoryNodeStore {
        pub async fn seed(
            &self,
            node_id: &str,
            status: NodeStatus,
            capacity_mb: i64,
            last_heartbeat_at: Option<DateTime<Utc>>,
        ) {
            self.nodes.lock().await.insert(
                node_id.to_string(),
                Node {
                    id: node_id.to_string(),
                    host: format!("{}.fleet.internal", node_id),
                    status,
                    provision_stage: None,
                    capacity_mb,
                    used_mb: 0,
                    drain_status: DrainStatus::Accepting,
                    last_heartbeat_at,
                    agent_version: Some("1.4.0".into()),
                    secret: None,
                },
            );
        }
    }

    #[async_trait]
    impl NodeStore for MemoryNodeStore {
        async fn fetch(&self, node_id: &str) -> Result<Option<Node>, FleetError> {
            Ok(self.nodes.lock().await.get(node_id).cloned())
        }

        async fn upsert_registration(
            &self,
            registration: &NodeRegistration,
        ) -> Result<(), FleetError> {
            let mut nodes_guard = self.nodes.lock().await;
            match nodes_guard.get_mut(&registration.node_id) {
                Some(existing) => {
                    existing.host = registration.host.clone();
                    existing.capacity_mb = registration.capacity_mb;
                    existing.agent_version = Some(registration.agent_version.clone());
                }
                None => {
                    nodes_guard.insert(
                        registration.node_id.clone(),
                        Node {
                            id: registration.node_id.clone(),
                            host: registration.host.clone(),
                            status: NodeStatus::Provisioning,
                            provision_stage: Some("registered".into()),
                            capacity_mb: registration.capacity_mb,
                            used_mb: 0,
                            drain_status: DrainStatus::Accepting,
                            last_heartbeat_at: None,
                            agent_version: Some(registration.agent_version.clone()),
                            secret: None,
                        },
                    );
                }
            }
            Ok(())
        }

        async fn record_heartbeat(
            &self,
            node_id: &str,
            beat_at: DateTime<Utc>,
            used_mb: i64,
            _resource_usage: &NodeResourceUsage,
            next_status: NodeStatus,
        ) -> Result<(), FleetError> {
            let mut nodes_guard = self.nodes.lock().await;
            let node = nodes_guard
                .get_mut(node_id)
                .ok_or_else(|| FleetError::UnknownNode(node_id.to_string()))?;
            node.last_heartbeat_at = Some(beat_at);
            node.used_mb = used_mb;
            node.status = next_status;
            Ok(())
        }

        async fn list_with_status(
            &self,
            statuses: &[NodeStatus],
        ) -> Result<Vec<Node>, FleetError> {
            Ok(self
                .nodes
                .lock()
                .await
                .values()
                .filter(|node| statuses.contains(&node.status))
                .cloned()
                .collect())
        }

        async fn set_status(&self, node_id: &str, status: NodeStatus) -> Result<(), FleetError> {
            let mut nodes_guard = self.nodes.lock().await;
            let node = nodes_guard
                .get_mut(node_id)
                .ok_or_else(|| FleetError::UnknownNode(node_id.to_string()))?;
            node.status = status;
            Ok(())
        }
    }
}
