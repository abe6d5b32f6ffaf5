// [libs/domain/fleet/src/registrar.rs]
/*!
 * =================================================================
 * APARATO: NODE REGISTRAR (V3.0 - IDEMPOTENT ENROLLMENT)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ALTA IDEMPOTENTE DE AGENTES TRAS EL ARRANQUE
 * =================================================================
 */

use std::sync::Arc;

use tracing::{info, instrument};
use wopr_domain_models::NodeRegistration;

use crate::errors::FleetError;
use crate::store::NodeStore;

/// Procesador de mensajes 'register' emitidos por el agente tras el boot.
pub struct NodeRegistrar {
    node_store: Arc<dyn NodeStore>,
}

impl NodeRegistrar {
    pub fn new(node_store: Arc<dyn NodeStore>) -> Self {
        Self { node_store }
    }

    /**
     * Alta o actualización idempotente: host, capacidad y versión del
     * agente. Un re-registro tras reinicio del agente es la vía normal.
     */
    #[instrument(skip(self, registration), fields(node = %registration.node_id))]
    pub async fn register(&self, registration: &NodeRegistration) -> Result<(), FleetError> {
        self.node_store.upsert_registration(registration).await?;
        info!(
            "📇 [REGISTRAR]: Node '{}' enrolled (host {}, {}MB, agent {}).",
            registration.node_id,
            registration.host,
            registration.capacity_mb,
            registration.agent_version
        );
        Ok(())
    }
}
