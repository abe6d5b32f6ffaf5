// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V4.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONFIG-BEFORE-SOCKET: La hidratación del entorno (incluido el
 *    secreto maestro) ocurre antes de abrir el socket TCP; un entorno
 *    malformado aborta la ignición con diagnóstico nominal.
 * 2. RUNTIME REFINERY: Pila de Tokio de 4MB para los receptores de
 *    stream de flota y el motor de agregación.
 * =================================================================
 */

use dotenvy::dotenv;
use tracing::{error, info};
use wopr_orchestrator::prelude::*;
use wopr_shared_watchtower::init_tracing;

/**
 * Punto de ignición supremo del binario del plano de control.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD (WATCHTOWER)
    init_tracing("wopr_orchestrator");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO CON PROTECCIÓN DE PILA (4MB)
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️  [CONTROL_PLANE]: Global ignition sequence starting...");

        // 4. HIDRATACIÓN TIPADA DEL ENTORNO
        let platform_config = match PlatformConfig::hydrate() {
            Ok(config) => config,
            Err(hydration_fault) => {
                error!("❌ [CONFIG_COLLAPSE]: {}", hydration_fault);
                std::process::exit(1);
            }
        };

        // 5. ADQUISICIÓN DE COORDENADAS TÁCTICAS
        let database_connection_url = std::env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment.");

        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let listening_network_port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        // 6. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let kernel_instance = OrchestratorKernel::ignite(
            &database_connection_url,
            database_access_token,
            platform_config,
            listening_network_port,
        )
        .await;

        // 7. IGNICIÓN DE OPERACIONES DEL PLANO DE CONTROL
        info!("🚀 [WOPR_ONLINE]: System fully operational on port {}.", listening_network_port);
        kernel_instance.launch_control_plane_operations().await;

        Ok(())
    })
}
