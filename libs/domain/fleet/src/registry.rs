// [libs/domain/fleet/src/registry.rs]
/*!
 * =================================================================
 * APARATO: CONNECTION REGISTRY (V6.0 - SINGLE LINK MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: MAPA ATÓMICO DE STREAMS VIVOS POR NODO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. AT-MOST-ONE LINK: Un accept nuevo sella el canal del predecesor
 *    antes de instalar el relevo; el receptor huérfano observa el
 *    cierre y termina su tarea.
 * 2. TRANSPORT AGNOSTIC: El registro transporta tramas JSON ya
 *    serializadas; el estrato axum/ws vive en la aplicación.
 * =================================================================
 */

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::errors::FleetError;

/// Capacidad del buffer saliente por nodo: 64 tramas.
/// Amortigua ráfagas de comandos sin permitir acumulación ilimitada.
const OUTBOUND_FRAME_BUFFER_CAPACITY: usize = 64;

/// Extremo de escritura de un stream de nodo (tramas JSON serializadas).
pub type OutboundFrameSender = mpsc::Sender<String>;

/**
 * Registro de conexiones vivas: mapa único guardado por candado.
 * Las operaciones son atómicas respecto al mapa.
 */
#[derive(Default)]
pub struct ConnectionRegistry {
    live_links: Mutex<HashMap<String, OutboundFrameSender>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Instala el stream vivo de un nodo y forja su canal saliente.
     * Si el nodo ya tenía stream, el canal previo se sella primero.
     *
     * @returns Receptor del canal saliente para la tarea de transporte.
     */
    pub async fn accept(&self, node_id: &str) -> mpsc::Receiver<String> {
        let (frame_sender, frame_receiver) = mpsc::channel(OUTBOUND_FRAME_BUFFER_CAPACITY);

        let mut links_guard = self.live_links.lock().await;
        if let Some(previous_sender) = links_guard.insert(node_id.to_string(), frame_sender) {
            // El drop del sender sella el canal; el receptor previo observa
            // el cierre y aborta su tarea de transporte.
            drop(previous_sender);
            warn!("🔌 [LINK_RELEVO]: Node '{}' reconnected. Previous stream sealed.", node_id);
        } else {
            info!("🔌 [LINK_OPEN]: Node '{}' stream installed.", node_id);
        }

        frame_receiver
    }

    /// Sella y retira el stream del nodo (desconexión o purga).
    pub async fn close(&self, node_id: &str) {
        let mut links_guard = self.live_links.lock().await;
        if links_guard.remove(node_id).is_some() {
            info!("🔌 [LINK_CLOSE]: Node '{}' stream removed from registry.", node_id);
        }
    }

    /**
     * Serializa y encola una trama hacia el nodo.
     *
     * # Errors:
     * - `LinkAbsent`: El nodo no tiene stream vivo.
     * - `LinkSevered`: El canal colapsó con la trama en vuelo.
     */
    pub async fn send<F: Serialize>(&self, node_id: &str, frame: &F) -> Result<(), FleetError> {
        let serialized_frame = serde_json::to_string(frame)
            .map_err(|encoding_fault| FleetError::FrameEncoding(encoding_fault.to_string()))?;

        let frame_sender = {
            let links_guard = self.live_links.lock().await;
            links_guard
                .get(node_id)
                .cloned()
                .ok_or_else(|| FleetError::LinkAbsent(node_id.to_string()))?
        };

        frame_sender
            .send(serialized_frame)
            .await
            .map_err(|send_fault| FleetError::LinkSevered(send_fault.to_string()))?;

        debug!("📡 [LINK_TX]: Frame queued for node '{}'.", node_id);
        Ok(())
    }

    /// Evalúa si el nodo tiene stream vivo.
    pub async fn is_connected(&self, node_id: &str) -> bool {
        self.live_links.lock().await.contains_key(node_id)
    }

    /// Cardinalidad de streams vivos (telemetría del Panóptico).
    pub async fn connected_count(&self) -> usize {
        self.live_links.lock().await.len()
    }
}
