// [libs/domain/fleet/src/errors.rs]
/*!
 * =================================================================
 * APARATO: FLEET ERROR CATALOG (V5.1 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE FLOTA
 * =================================================================
 */

use thiserror::Error;

/// Fallos de la orquestación de flota.
#[derive(Error, Debug)]
pub enum FleetError {
    /// El nodo no tiene stream vivo en el registro de conexiones.
    #[error("[L2_FLEET_FAULT]: LINK_ABSENT -> {0}")]
    LinkAbsent(String),

    /// El canal hacia el nodo colapsó durante el envío.
    #[error("[L2_FLEET_FAULT]: LINK_SEVERED -> {0}")]
    LinkSevered(String),

    /// El nodo referenciado no existe en el registro persistente.
    #[error("[L2_FLEET_FAULT]: NODE_UNKNOWN -> {0}")]
    UnknownNode(String),

    /// El comando no recibió resultado dentro del plazo del llamador.
    #[error("[L2_FLEET_FAULT]: COMMAND_DEADLINE_EXPIRED -> {0}")]
    CommandTimeout(String),

    /// Fallo de serialización de una trama del protocolo.
    #[error("[L2_FLEET_FAULT]: FRAME_ENCODING_COLLAPSED -> {0}")]
    FrameEncoding(String),

    /// Fallo transitorio del registro persistente de nodos.
    #[error("[L2_FLEET_FAULT]: NODE_STORE_SEVERED -> {0}")]
    Storage(String),
}
