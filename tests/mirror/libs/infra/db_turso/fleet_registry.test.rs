// [tests/mirror/libs/infra/db_turso/fleet_registry.test.rs]
/**
 * =================================================================
 * APARATO: FLEET REGISTRY TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE VITALIDAD Y ESCALERA DE ESTADOS
 * =================================================================
 */

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::watch;
use wopr_domain_fleet::store::NodeStore;
use wopr_domain_fleet::{
    HeartbeatProcessor, NodeWriteLattice, RecoveryManager, Watchdog, WatchdogConfig,
};
use wopr_domain_models::{
    ContainerSummary, Node, NodeHeartbeat, NodeRegistration, NodeResourceUsage, NodeStatus,
};
use wopr_infra_db::repositories::NodeRepository;
use wopr_infra_db::TursoClient;

#[derive(Default)]
struct RecordingRecovery {
    emissions: AtomicU32,
}

#[async_trait]
impl RecoveryManager for RecordingRecovery {
    async fn on_node_unreachable(&self, _node: &Node) {
        self.emissions.fetch_add(1, Ordering::SeqCst);
    }
}

fn forge_registration(node_id: &str) -> NodeRegistration {
    NodeRegistration {
        node_id: node_id.into(),
        host: format!("{}.fleet.internal", node_id),
        capacity_mb: 4096,
        agent_version: "1.4.0".into(),
    }
}

fn forge_heartbeat(node_id: &str, container_mbs: &[i64]) -> NodeHeartbeat {
    NodeHeartbeat {
        node_id: node_id.into(),
        timestamp: Utc::now(),
        resource_usage: NodeResourceUsage {
            cpu_load_percentage: 21.5,
            memory_used_mb: 2048,
            disk_used_mb: 8192,
        },
        container_summary: container_mbs
            .iter()
            .enumerate()
            .map(|(index, size_mb)| ContainerSummary {
                instance_id: format!("bot-{}", index),
                size_mb: *size_mb,
                runtime_state: "running".into(),
            })
            .collect(),
    }
}

async fn forge_repository(database_label: &str) -> Arc<NodeRepository> {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_label),
        None,
    )
    .await
    .expect("Memory strata ignition failed");
    Arc::new(NodeRepository::new(client))
}

#[tokio::test]
async fn certify_registration_and_first_heartbeat() {
    println!("\n💓 [PROVING_GROUNDS]: Auditing enrollment and activation in Motor A...");

    let repository = forge_repository("fleet_enrollment_test").await;
    let lattice = Arc::new(NodeWriteLattice::new());
    let processor = HeartbeatProcessor::new(repository.clone(), lattice);

    // 1. ALTA IDEMPOTENTE: dos registros, una sola fila.
    repository.upsert_registration(&forge_registration("node-berlin-01")).await.unwrap();
    repository.upsert_registration(&forge_registration("node-berlin-01")).await.unwrap();

    let enrolled = repository.fetch("node-berlin-01").await.unwrap().unwrap();
    assert_eq!(enrolled.status, NodeStatus::Provisioning);

    // 2. PRIMER LATIDO: provisioning -> active con memoria agregada.
    let status = processor.process(&forge_heartbeat("node-berlin-01", &[512, 768])).await.unwrap();
    assert_eq!(status, NodeStatus::Active);

    let activated = repository.fetch("node-berlin-01").await.unwrap().unwrap();
    assert_eq!(activated.status, NodeStatus::Active);
    assert_eq!(activated.used_mb, 1280);
    assert!(activated.last_heartbeat_at.is_some());

    println!("   ✅ [SUCCESS]: Enrollment and activation certified.");
}

#[tokio::test]
async fn certify_staleness_ladder_in_motor_a() {
    println!("\n🐕 [PROVING_GROUNDS]: Auditing watchdog ladder against Motor A...");

    let repository = forge_repository("fleet_ladder_test").await;
    let lattice = Arc::new(NodeWriteLattice::new());
    let processor = HeartbeatProcessor::new(repository.clone(), lattice.clone());

    // Nodo activo con último latido hace 90 segundos.
    repository.upsert_registration(&forge_registration("N1")).await.unwrap();
    let mut stale_heartbeat = forge_heartbeat("N1", &[]);
    stale_heartbeat.timestamp = Utc::now() - Duration::seconds(90);
    processor.process(&stale_heartbeat).await.unwrap();

    let recovery = Arc::new(RecordingRecovery::default());
    let (_shutdown_sender, shutdown_receiver) = watch::channel(false);
    let watchdog = Watchdog::new(
        repository.clone(),
        lattice,
        recovery.clone(),
        WatchdogConfig::default(),
        shutdown_receiver,
    );

    // Pasada 1: 90s >= 60s -> degraded.
    watchdog.execute_scan_at(Utc::now()).await.unwrap();
    assert_eq!(repository.fetch("N1").await.unwrap().unwrap().status, NodeStatus::Degraded);
    assert_eq!(recovery.emissions.load(Ordering::SeqCst), 0);

    // Pasada 2 (120s después): 210s >= 180s -> unreachable + emisión única.
    watchdog.execute_scan_at(Utc::now() + Duration::seconds(120)).await.unwrap();
    assert_eq!(repository.fetch("N1").await.unwrap().unwrap().status, NodeStatus::Unreachable);
    assert_eq!(recovery.emissions.load(Ordering::SeqCst), 1);

    // Pasada 3: sin candidatos nuevos; cero re-emisiones.
    watchdog.execute_scan_at(Utc::now() + Duration::seconds(240)).await.unwrap();
    assert_eq!(recovery.emissions.load(Ordering::SeqCst), 1);

    println!("   ✅ [SUCCESS]: Staleness ladder certified end to end.");
}
