// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT (V4.0 - SOVEREIGN AUTHORITY)
 * CLASIFICACIÓN: CRATE ROOT (ESTRATO L3)
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MODULE HIERARCHY HARDENING: Autoridad única de módulos para la
 *    resolución determinista de 'crate::' en librería y binario.
 * 2. PUBLIC INTERFACE: Expone 'prelude' para la ignición del Kernel
 *    desde 'main.rs' y desde la matriz de certificación.
 * =================================================================
 */

// --- ESTRATO DE CONFIGURACIÓN Y ARRANQUE ---
/// Hidratación tipada del entorno soberano.
pub mod config;
/// Núcleo de mando y control para la ignición de servicios.
pub mod kernel;

// --- ESTRATO DE DATOS Y ESTADO (L1-APP) ---
/// Gestor del sistema nervioso central del plano de control.
pub mod state;

// --- ESTRATO DE TRANSPORTE Y ACCIÓN ---
/// Adaptadores de entrada para ráfagas HTTP y streams de nodo.
pub mod handlers;
/// El túnel de mando: Definición de rutas y topología de red.
pub mod routes;

// --- ESTRATO DE SEGURIDAD Y SOPORTE ---
/// Guardianes perimetrales de autenticación y contención de ráfagas.
pub mod middleware;
/// Daemons de fondo: agregación de consumo y watchdog de flota.
pub mod services;

/**
 * PRELUDIO DEL ORQUESTADOR
 *
 * Re-exportación estratégica de los componentes necesarios para
 * la ignición mínima del sistema.
 */
pub mod prelude {
    pub use crate::config::PlatformConfig;
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::AppState;
}
