// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: BACKGROUND SERVICE REGISTRY (V4.0 - DAEMON MATRIX)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: IGNICIÓN DE DAEMONS DEL PLANO DE CONTROL
 * =================================================================
 */

pub mod recovery;

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use wopr_domain_billing::{AggregatorConfig, UsageAggregator};
use wopr_domain_fleet::{Watchdog, WatchdogConfig};

use crate::services::recovery::FleetRecoveryCoordinator;
use crate::state::AppState;

/**
 * Ignición del motor de agregación de consumo.
 * Drena el log crudo hacia agregados de periodo y reportes externos.
 */
pub async fn spawn_usage_aggregator(
    application_state: AppState,
    shutdown_signal: watch::Receiver<bool>,
) {
    let aggregator_config = AggregatorConfig {
        billing_period_ms: application_state.config.billing_period_ms,
        late_arrival_grace_ms: application_state.config.late_arrival_grace_ms,
        scan_interval: Duration::from_millis(application_state.config.billing_period_ms as u64),
    };

    let aggregation_engine = UsageAggregator::new(
        application_state.usage_repository.clone(),
        application_state.stripe_gateway.clone(),
        aggregator_config,
        shutdown_signal,
    );

    tokio::spawn(async move { aggregation_engine.spawn_aggregation_loop().await });
    info!("📊 [SERVICE_MATRIX]: Usage aggregation daemon armed.");
}

/**
 * Ignición del watchdog de vitalidad de la flota.
 * Escanea latidos y muta la escalera de estados de nodo.
 */
pub async fn spawn_fleet_watchdog(
    application_state: AppState,
    shutdown_signal: watch::Receiver<bool>,
) {
    let recovery_coordinator = std::sync::Arc::new(FleetRecoveryCoordinator::new(
        application_state.connection_registry.clone(),
        application_state.instance_repository.clone(),
    ));

    let vitality_sentinel = Watchdog::new(
        application_state.node_repository.clone(),
        application_state.write_lattice.clone(),
        recovery_coordinator,
        WatchdogConfig::default(),
        shutdown_signal,
    );

    tokio::spawn(async move { vitality_sentinel.spawn_watchdog_loop().await });
    info!("🐕 [SERVICE_MATRIX]: Fleet watchdog daemon armed.");
}
