// [libs/domain/fleet/src/heartbeat.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT PROCESSOR (V6.0 - VITALITY MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: INGESTA DE LATIDOS Y TRANSICIONES DE RESURRECCIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RESURRECTION PATH: provisioning -> active en el primer latido;
 *    degraded/unreachable -> active en cualquier latido posterior.
 * 2. TERMINAL RESPECT: 'failed' es terminal; un latido de un nodo
 *    fallado se registra pero no lo resucita.
 * 3. CAPACITY AGGREGATION: used_mb = Σ(container.size_mb), saturado
 *    al techo de capacidad del nodo.
 * =================================================================
 */

use std::sync::Arc;

use tracing::{debug, instrument, warn};
use wopr_domain_models::{NodeHeartbeat, NodeStatus};

use crate::errors::FleetError;
use crate::locks::NodeWriteLattice;
use crate::store::NodeStore;

/// Procesador de latidos: autoridad de las transiciones de resurrección.
pub struct HeartbeatProcessor {
    node_store: Arc<dyn NodeStore>,
    write_lattice: Arc<NodeWriteLattice>,
}

impl HeartbeatProcessor {
    pub fn new(node_store: Arc<dyn NodeStore>, write_lattice: Arc<NodeWriteLattice>) -> Self {
        Self { node_store, write_lattice }
    }

    /**
     * Procesa un latido entrante bajo el candado de escritura del nodo.
     *
     * # Logic:
     * 1. Agrega la memoria de contenedores y la satura al techo.
     * 2. Resuelve la transición de estado de resurrección.
     * 3. Cristaliza sello temporal, telemetría y estado en una escritura.
     *
     * @returns Estado resultante del nodo tras el latido.
     */
    #[instrument(skip(self, heartbeat), fields(node = %heartbeat.node_id))]
    pub async fn process(&self, heartbeat: &NodeHeartbeat) -> Result<NodeStatus, FleetError> {
        let _write_guard = self.write_lattice.lock_for(&heartbeat.node_id).lock().await;

        let node = self
            .node_store
            .fetch(&heartbeat.node_id)
            .await?
            .ok_or_else(|| FleetError::UnknownNode(heartbeat.node_id.clone()))?;

        let aggregated_container_mb: i64 =
            heartbeat.container_summary.iter().map(|container| container.size_mb).sum();

        let bounded_used_mb = if aggregated_container_mb > node.capacity_mb {
            warn!(
                "⚠️ [CAPACITY_DRIFT]: Node '{}' reports {}MB over its {}MB ceiling. Saturating.",
                heartbeat.node_id, aggregated_container_mb, node.capacity_mb
            );
            node.capacity_mb
        } else {
            aggregated_container_mb
        };

        let next_status = match node.status {
            // Primer latido del aprovisionamiento o resurrección.
            NodeStatus::Provisioning
            | NodeStatus::Active
            | NodeStatus::Degraded
            | NodeStatus::Unreachable => NodeStatus::Active,
            // Estado terminal: el latido se registra sin resurrección.
            NodeStatus::Failed => NodeStatus::Failed,
        };

        if node.status != next_status {
            debug!(
                "💓 [VITALITY_SHIFT]: Node '{}' transitions {:?} -> {:?}.",
                heartbeat.node_id, node.status, next_status
            );
        }

        self.node_store
            .record_heartbeat(
                &heartbeat.node_id,
                heartbeat.timestamp,
                bounded_used_mb,
                &heartbeat.resource_usage,
                next_status,
            )
            .await?;

        Ok(next_status)
    }
}
