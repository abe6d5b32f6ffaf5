// [libs/domain/lifecycle/src/errors.rs]
/*!
 * =================================================================
 * APARATO: LIFECYCLE ERROR CATALOG (V2.0 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: FALLOS DEL CICLO DE VIDA TERMINAL
 * =================================================================
 */

use thiserror::Error;

/// Fallos de los colaboradores de purga.
/// El ejecutor los captura por paso; jamás abortan el pipeline.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Fallo de persistencia en un paso de borrado.
    #[error("[L2_LIFECYCLE_FAULT]: PURGE_STORAGE_SEVERED -> {0}")]
    Storage(String),

    /// Fallo de un colaborador externo (procesador de pagos, objetos).
    #[error("[L2_LIFECYCLE_FAULT]: EXTERNAL_COLLABORATOR_REJECTED -> {0}")]
    External(String),
}
