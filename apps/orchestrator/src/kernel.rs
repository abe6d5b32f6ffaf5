// INICIO DEL ARCHIVO [apps/orchestrator/src/kernel.rs]
/**
 * =================================================================
 * APARATO: ORCHESTRATOR SOVEREIGN KERNEL (V4.0 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * Motor A, estado neural, daemons de agregación y watchdog, y el
 * transporte HTTP/WS con apagado coordinado por canal watch.
 * =================================================================
 */

use crate::config::PlatformConfig;
use crate::routes::create_control_plane_router;
use crate::services::{spawn_fleet_watchdog, spawn_usage_aggregator};
use crate::state::AppState;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, instrument};
use wopr_infra_db::TursoClient;

pub struct OrchestratorKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
}

impl OrchestratorKernel {
    /**
     * Realiza la ignición del cliente táctico y el estado neural.
     * Establece la conexión a la base de datos antes de levantar servicios.
     */
    #[instrument(skip(database_access_token, platform_config))]
    pub async fn ignite(
        database_connection_url: &str,
        database_access_token: Option<String>,
        platform_config: PlatformConfig,
        listening_port: u16,
    ) -> Self {
        let database_client = TursoClient::connect(database_connection_url, database_access_token)
            .await
            .expect("FATAL: Database link collapse. Ignition aborted.");

        Self {
            server_network_port: listening_port,
            application_shared_state: AppState::new(database_client, Arc::new(platform_config)),
        }
    }

    /**
     * Lanza la ejecución de todas las operaciones autónomas del plano.
     * Configura los daemons de fondo y el servidor HTTP principal.
     */
    pub async fn launch_control_plane_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. CANAL SOBERANO DE APAGADO ---
        // Los daemons observan la señal entre periodos, jamás a mitad de uno.
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);

        // --- 2. DESPLIEGUE DE DAEMONS ---
        // A. Agregación de consumo (eventos -> periodos -> reportes).
        spawn_usage_aggregator(shared_application_state.clone(), shutdown_receiver.clone()).await;
        // B. Watchdog de vitalidad de flota (escalera de estados).
        spawn_fleet_watchdog(shared_application_state.clone(), shutdown_receiver).await;

        // --- 3. IGNICIÓN DEL TRANSPORTE HTTP/WS (AXUM) ---
        let control_plane_router = create_control_plane_router(shared_application_state);

        let bind_address =
            SocketAddr::new("0.0.0.0".parse::<IpAddr>().unwrap(), self.server_network_port);

        info!("🚀 [KERNEL_ONLINE]: Sovereign Control Plane listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        let serve_outcome = axum::serve(
            tcp_listener,
            control_plane_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("🛑 [KERNEL_SHUTDOWN]: Termination signal observed. Sealing daemons...");
            let _ = shutdown_sender.send(true);
        })
        .await;

        if let Err(server_error) = serve_outcome {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }
    }
}
// FIN DEL ARCHIVO [apps/orchestrator/src/kernel.rs]
