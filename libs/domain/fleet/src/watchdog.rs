// [libs/domain/fleet/src/watchdog.rs]
/*!
 * =================================================================
 * APARATO: FLEET WATCHDOG (V7.0 - ZOMBIE REAPER MASTER)
 * CLASIFICACIÓN: BACKGROUND DOMAIN SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: ESCRUTINIO PERIÓDICO DE VITALIDAD DE NODOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STALENESS LADDER: active -(degraded_threshold)-> degraded
 *    -(unreachable_threshold)-> unreachable; 'failed' es terminal.
 * 2. RECOVERY EMISSION: La transición a 'unreachable' emite el evento
 *    de recuperación exactamente una vez e invoca al RecoveryManager.
 * 3. RACE SHIELD: Cada mutación re-lee el nodo bajo su candado de
 *    escritura; un latido entrante durante el escaneo gana la carrera.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};
use wopr_domain_models::{Node, NodeStatus};

use crate::errors::FleetError;
use crate::locks::NodeWriteLattice;
use crate::store::NodeStore;

/// Gestor de recuperación invocado ante nodos inalcanzables.
/// La remediación profunda (reconexión, realojo de cargas, escalado de
/// alertas) vive detrás de esta costura.
#[async_trait]
pub trait RecoveryManager: Send + Sync {
    async fn on_node_unreachable(&self, node: &Node);
}

/// Umbrales y cadencia del escrutinio de vitalidad.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Edad de latido que degrada un nodo activo.
    pub degraded_threshold: chrono::Duration,
    /// Edad de latido que vuelve inalcanzable a un nodo degradado.
    pub unreachable_threshold: chrono::Duration,
    /// Cadencia del bucle de escaneo.
    pub scan_interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            degraded_threshold: chrono::Duration::seconds(60),
            unreachable_threshold: chrono::Duration::seconds(180),
            scan_interval: Duration::from_secs(30),
        }
    }
}

/// Centinela periódico de la escalera de obsolescencia de latidos.
pub struct Watchdog {
    node_store: Arc<dyn NodeStore>,
    write_lattice: Arc<NodeWriteLattice>,
    recovery_manager: Arc<dyn RecoveryManager>,
    config: WatchdogConfig,
    shutdown_signal: watch::Receiver<bool>,
}

impl Watchdog {
    pub fn new(
        node_store: Arc<dyn NodeStore>,
        write_lattice: Arc<NodeWriteLattice>,
        recovery_manager: Arc<dyn RecoveryManager>,
        config: WatchdogConfig,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self { node_store, write_lattice, recovery_manager, config, shutdown_signal }
    }

    /// Bucle perpetuo de escaneo en el reactor de Tokio.
    pub async fn spawn_watchdog_loop(mut self) {
        info!(
            "🐕 [WATCHDOG_DAEMON]: Vitality sentinel online (degraded {}s, unreachable {}s).",
            self.config.degraded_threshold.num_seconds(),
            self.config.unreachable_threshold.num_seconds()
        );

        let mut scan_timer = interval(self.config.scan_interval);

        loop {
            tokio::select! {
                _ = scan_timer.tick() => {
                    if let Err(scan_fault) = self.execute_scan_at(Utc::now()).await {
                        error!("❌ [WATCHDOG_FAULT]: Scan aborted: {}", scan_fault);
                    }
                },
                _ = self.shutdown_signal.changed() => {
                    if *self.shutdown_signal.borrow() {
                        info!("🛑 [WATCHDOG_DAEMON]: Shutdown signal observed. Sentinel sealed.");
                        break;
                    }
                },
            }
        }
    }

    /**
     * Una pasada del escrutinio en el instante dado.
     * Visible para el Proving Grounds.
     *
     * @returns Cantidad de transiciones aplicadas.
     */
    #[instrument(skip(self, now))]
    pub async fn execute_scan_at(&self, now: DateTime<Utc>) -> Result<u32, FleetError> {
        let scan_candidates = self
            .node_store
            .list_with_status(&[NodeStatus::Active, NodeStatus::Degraded])
            .await?;

        let mut applied_transitions = 0u32;

        for stale_candidate in scan_candidates {
            let _write_guard = self.write_lattice.lock_for(&stale_candidate.id).lock().await;

            // Re-lectura bajo candado: un latido pudo ganar la carrera.
            let Some(current_node) = self.node_store.fetch(&stale_candidate.id).await? else {
                continue;
            };
            let Some(last_heartbeat_at) = current_node.last_heartbeat_at else {
                continue;
            };
            let heartbeat_age = now - last_heartbeat_at;

            match current_node.status {
                NodeStatus::Active if heartbeat_age >= self.config.degraded_threshold => {
                    warn!(
                        "🐕 [WATCHDOG_DEMOTION]: Node '{}' silent for {}s. active -> degraded.",
                        current_node.id,
                        heartbeat_age.num_seconds()
                    );
                    self.node_store.set_status(&current_node.id, NodeStatus::Degraded).await?;
                    applied_transitions += 1;
                }
                NodeStatus::Degraded if heartbeat_age >= self.config.unreachable_threshold => {
                    warn!(
                        "🐕 [WATCHDOG_QUARANTINE]: Node '{}' silent for {}s. degraded -> unreachable.",
                        current_node.id,
                        heartbeat_age.num_seconds()
                    );
                    self.node_store.set_status(&current_node.id, NodeStatus::Unreachable).await?;
                    applied_transitions += 1;

                    // Emisión de recuperación: exactamente una por transición.
                    self.recovery_manager.on_node_unreachable(&current_node).await;
                }
                _ => {
                    debug!("🐕 [WATCHDOG]: Node '{}' within vitality envelope.", current_node.id);
                }
            }
        }

        Ok(applied_transitions)
    }
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests_support::MemoryNodeStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingRecoveryManager {
        emissions: AtomicU32,
    }

    #[async_trait]
    impl RecoveryManager for RecordingRecoveryManager {
        async fn on_node_unreachable(&self, _node: &Node) {
            self.emissions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn forge_watchdog(
        store: Arc<MemoryNodeStore>,
        recovery: Arc<RecordingRecoveryManager>,
    ) -> Watchdog {
        let (_shutdown_sender, shutdown_receiver) = watch::channel(false);
        Watchdog::new(
            store,
            Arc::new(NodeWriteLattice::new()),
            recovery,
            WatchdogConfig::default(),
            shutdown_receiver,
        )
    }

    /**
     * CERTIFICACIÓN: Escalera completa del escenario de silencio.
     * 90s de silencio -> degraded; 210s -> unreachable con una única
     * emisión de recuperación; escaneos posteriores no re-emiten.
     */
    #[tokio::test]
    async fn certify_staleness_ladder_with_single_recovery_emission() {
        println!("\n🐕 [PROVING_GROUNDS]: Auditing staleness ladder...");

        let origin = Utc::now();
        let store = Arc::new(MemoryNodeStore::default());
        store
            .seed("N1", NodeStatus::Active, 4096, Some(origin - chrono::Duration::seconds(90)))
            .await;

        let recovery = Arc::new(RecordingRecoveryManager::default());
        let watchdog = forge_watchdog(store.clone(), recovery.clone());

        // Pasada 1: 90s >= 60s -> degraded (sin emisión de recuperación).
        assert_eq!(watchdog.execute_scan_at(origin).await.unwrap(), 1);
        assert_eq!(store.fetch("N1").await.unwrap().unwrap().status, NodeStatus::Degraded);
        assert_eq!(recovery.emissions.load(Ordering::SeqCst), 0);

        // Pasada 2: edad 210s >= 180s -> unreachable + emisión única.
        let later = origin + chrono::Duration::seconds(120);
        assert_eq!(watchdog.execute_scan_at(later).await.unwrap(), 1);
        assert_eq!(store.fetch("N1").await.unwrap().unwrap().status, NodeStatus::Unreachable);
        assert_eq!(recovery.emissions.load(Ordering::SeqCst), 1);

        // Pasada 3: el nodo ya no es candidato; cero re-emisiones.
        assert_eq!(watchdog.execute_scan_at(later + chrono::Duration::seconds(60)).await.unwrap(), 0);
        assert_eq!(recovery.emissions.load(Ordering::SeqCst), 1, "RECOVERY_FAULT: Re-emission detected.");

        println!("   ✅ [SUCCESS]: Ladder certified with single recovery emission.");
    }

    /// Un nodo activo con latido fresco no sufre transición alguna.
    #[tokio::test]
    async fn certify_fresh_nodes_untouched() {
        let origin = Utc::now();
        let store = Arc::new(MemoryNodeStore::default());
        store
            .seed("N2", NodeStatus::Active, 4096, Some(origin - chrono::Duration::seconds(10)))
            .await;

        let recovery = Arc::new(RecordingRecoveryManager::default());
        let watchdog = forge_watchdog(store.clone(), recovery);

        assert_eq!(watchdog.execute_scan_at(origin).await.unwrap(), 0);
        assert_eq!(store.fetch("N2").await.unwrap().unwrap().status, NodeStatus::Active);
    }

    /// Un nodo sin latido registrado (aprovisionando) queda fuera del escaneo.
    #[tokio::test]
    async fn certify_heartbeatless_nodes_skipped() {
        let store = Arc::new(MemoryNodeStore::default());
        store.seed("N3", NodeStatus::Active, 4096, None).await;

        let recovery = Arc::new(RecordingRecoveryManager::default());
        let watchdog = forge_watchdog(store.clone(), recovery);

        assert_eq!(watchdog.execute_scan_at(Utc::now()).await.unwrap(), 0);
    }
}
