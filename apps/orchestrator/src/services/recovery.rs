// [apps/orchestrator/src/services/recovery.rs]
/*!
 * =================================================================
 * APARATO: FLEET RECOVERY COORDINATOR (V3.1 - QUARANTINE RESPONSE)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: RESPUESTA ANTE NODOS INALCANZABLES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STREAM QUARANTINE: Un nodo inalcanzable pierde su stream vivo;
 *    un socket zombi no debe recibir comandos nuevos.
 * 2. WORKLOAD RELEASE: Las instancias del nodo en cuarentena quedan
 *    desancladas a la espera del planificador de recolocación.
 * 3. RECOVERY TRAIL: Cada cuarentena emite el evento de recuperación
 *    estructurado que consume el Panóptico y la guardia de turno.
 * =================================================================
 */

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};
use wopr_domain_fleet::{ConnectionRegistry, RecoveryManager};
use wopr_domain_models::Node;
use wopr_infra_db::repositories::InstanceRepository;

/// Coordinador de recuperación invocado por el Watchdog.
pub struct FleetRecoveryCoordinator {
    connection_registry: Arc<ConnectionRegistry>,
    instance_repository: Arc<InstanceRepository>,
}

impl FleetRecoveryCoordinator {
    pub fn new(
        connection_registry: Arc<ConnectionRegistry>,
        instance_repository: Arc<InstanceRepository>,
    ) -> Self {
        Self { connection_registry, instance_repository }
    }
}

#[async_trait]
impl RecoveryManager for FleetRecoveryCoordinator {
    async fn on_node_unreachable(&self, node: &Node) {
        // 1. EVENTO DE RECUPERACIÓN (rastro estructurado para el Panóptico).
        error!(
            target: "recovery_monitor",
            node = %node.id,
            host = %node.host,
            used_mb = node.used_mb,
            "🚨 [RECOVERY_EVENT]: Node quarantined as unreachable. Reassignment pending."
        );

        // 2. CUARENTENA DEL STREAM: un socket zombi no recibe comandos.
        if self.connection_registry.is_connected(&node.id).await {
            warn!("🔌 [RECOVERY_QUARANTINE]: Severing stale stream of node '{}'.", node.id);
            self.connection_registry.close(&node.id).await;
        }

        // 3. LIBERACIÓN DE CARGAS: desanclaje para la recolocación.
        match self.instance_repository.detach_for_reassignment(&node.id).await {
            Ok(released_count) if released_count > 0 => {
                warn!(
                    "📦 [RECOVERY_RELEASE]: {} workloads of node '{}' await placement.",
                    released_count, node.id
                );
            }
            Ok(_) => {}
            Err(release_fault) => {
                error!(
                    "❌ [RECOVERY_FAULT]: Workload release failed for node '{}': {}",
                    node.id, release_fault
                );
            }
        }
    }
}
