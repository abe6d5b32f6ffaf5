// [libs/domain/fleet/src/command_bus.rs]
/*!
 * =================================================================
 * APARATO: CORRELATED COMMAND BUS (V5.0 - FUTURE MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DESPACHO DE COMANDOS CON RESOLUCIÓN ASÍNCRONA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CORRELATION MAP: Cada despacho asocia un ancla UUID fresca con
 *    un futuro oneshot pendiente; el resultado entrante lo resuelve.
 * 2. DEADLINE EVICTION: El vencimiento del plazo rechaza el futuro y
 *    desaloja el ancla; un resultado tardío se descarta con aviso.
 * 3. UNORDERED ARRIVAL: Los resultados llegan sin orden; el
 *    emparejamiento es exclusivamente por 'command.id'.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, instrument, warn};
use wopr_domain_models::{CommandEnvelope, CommandResult};

use crate::errors::FleetError;
use crate::registry::ConnectionRegistry;

/**
 * Bus de comandos: serializa sobres por el ConnectionRegistry y
 * resuelve los futuros pendientes al llegar el 'command_result'.
 */
pub struct CommandBus {
    connection_registry: Arc<ConnectionRegistry>,
    pending_commands: Mutex<HashMap<String, oneshot::Sender<CommandResult>>>,
}

impl CommandBus {
    pub fn new(connection_registry: Arc<ConnectionRegistry>) -> Self {
        Self { connection_registry, pending_commands: Mutex::new(HashMap::new()) }
    }

    /**
     * Despacha un comando y espera su resultado correlacionado.
     *
     * # Errors:
     * - `LinkAbsent` / `LinkSevered`: El nodo no está alcanzable.
     * - `CommandTimeout`: El plazo venció; el ancla queda desalojada.
     */
    #[instrument(skip(self, command_payload), fields(node = %node_id, command = %command_name))]
    pub async fn dispatch(
        &self,
        node_id: &str,
        command_name: &str,
        command_payload: Value,
        caller_deadline: Duration,
    ) -> Result<CommandResult, FleetError> {
        let command_envelope = CommandEnvelope::forge(command_name, command_payload);
        let correlation_anchor = command_envelope.id.clone();

        let (resolution_sender, resolution_receiver) = oneshot::channel();
        {
            let mut pending_guard = self.pending_commands.lock().await;
            pending_guard.insert(correlation_anchor.clone(), resolution_sender);
        }

        // El envío puede fallar con el futuro ya instalado: desalojo inmediato.
        if let Err(transmission_fault) =
            self.connection_registry.send(node_id, &command_envelope).await
        {
            self.evict_anchor(&correlation_anchor).await;
            return Err(transmission_fault);
        }

        debug!("🎯 [COMMAND_TX]: '{}' dispatched with anchor {}.", command_name, correlation_anchor);

        match tokio::time::timeout(caller_deadline, resolution_receiver).await {
            Ok(Ok(command_result)) => Ok(command_result),
            Ok(Err(_resolution_dropped)) => {
                Err(FleetError::LinkSevered(format!("anchor {} abandoned", correlation_anchor)))
            }
            Err(_deadline_expired) => {
                self.evict_anchor(&correlation_anchor).await;
                warn!(
                    "⏱️ [COMMAND_DEADLINE]: Anchor {} evicted after {}ms without result.",
                    correlation_anchor,
                    caller_deadline.as_millis()
                );
                Err(FleetError::CommandTimeout(correlation_anchor))
            }
        }
    }

    /**
     * Resuelve un resultado entrante contra su futuro pendiente.
     * Resultados sin ancla (tardíos o desconocidos) se descartan con aviso.
     */
    pub async fn resolve(&self, command_result: CommandResult) {
        let pending_sender = {
            let mut pending_guard = self.pending_commands.lock().await;
            pending_guard.remove(&command_result.command_id)
        };

        match pending_sender {
            Some(resolution_sender) => {
                if resolution_sender.send(command_result).is_err() {
                    warn!("⚠️ [COMMAND_ORPHAN]: Resolver dropped before delivery.");
                }
            }
            None => {
                warn!(
                    "⚠️ [COMMAND_LATE]: Unmatched result for anchor {} dropped.",
                    command_result.command_id
                );
            }
        }
    }

    /// Cardinalidad de anclas pendientes (telemetría del Panóptico).
    pub async fn pending_count(&self) -> usize {
        self.pending_commands.lock().await.len()
    }

    async fn evict_anchor(&self, correlation_anchor: &str) {
        let mut pending_guard = self.pending_commands.lock().await;
        pending_guard.remove(correlation_anchor);
    }
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Extrae el ancla de la trama serializada que recibió el nodo fake.
    fn anchor_of(serialized_frame: &str) -> String {
        let parsed: Value = serde_json::from_str(serialized_frame).unwrap();
        parsed["id"].as_str().unwrap().to_string()
    }

    /**
     * CERTIFICACIÓN: Resolución correlacionada de un comando exitoso.
     */
    #[tokio::test]
    async fn certify_dispatch_and_correlated_resolution() {
        println!("\n🎯 [PROVING_GROUNDS]: Auditing command correlation...");

        let registry = Arc::new(ConnectionRegistry::new());
        let mut node_frames = registry.accept("node-berlin-01").await;
        let bus = Arc::new(CommandBus::new(registry));

        // Nodo fake: lee la trama y responde con el resultado correlacionado.
        let responder_bus = bus.clone();
        tokio::spawn(async move {
            let frame = node_frames.recv().await.unwrap();
            responder_bus
                .resolve(CommandResult {
                    command_id: anchor_of(&frame),
                    command: "deploy_instance".into(),
                    success: true,
                    payload: Some(serde_json::json!({"container": "bot-a"})),
                    error: None,
                })
                .await;
        });

        let result = bus
            .dispatch(
                "node-berlin-01",
                "deploy_instance",
                serde_json::json!({"instance_id": "bot-a"}),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.payload.unwrap()["container"], "bot-a");
        assert_eq!(bus.pending_count().await, 0);

        println!("   ✅ [SUCCESS]: Correlated resolution certified.");
    }

    /**
     * CERTIFICACIÓN: El vencimiento del plazo desaloja el ancla y el
     * resultado tardío se descarta sin efectos.
     */
    #[tokio::test]
    async fn certify_deadline_eviction_and_late_result_drop() {
        println!("\n🎯 [PROVING_GROUNDS]: Auditing deadline eviction...");

        let registry = Arc::new(ConnectionRegistry::new());
        let mut node_frames = registry.accept("node-berlin-01").await;
        let bus = Arc::new(CommandBus::new(registry));

        let timeout_fault = bus
            .dispatch(
                "node-berlin-01",
                "collect_logs",
                serde_json::json!({}),
                Duration::from_millis(50),
            )
            .await
            .unwrap_err();
        assert!(matches!(timeout_fault, FleetError::CommandTimeout(_)));
        assert_eq!(bus.pending_count().await, 0, "EVICTION_FAULT: Anchor leaked after deadline.");

        // El resultado llega tarde: se descarta con advertencia, sin pánico.
        let stale_frame = node_frames.recv().await.unwrap();
        bus.resolve(CommandResult {
            command_id: anchor_of(&stale_frame),
            command: "collect_logs".into(),
            success: true,
            payload: None,
            error: None,
        })
        .await;

        println!("   ✅ [SUCCESS]: Late result absorbed without residue.");
    }

    /// El despacho hacia un nodo sin stream no deja anclas pendientes.
    #[tokio::test]
    async fn certify_absent_link_leaves_no_anchor() {
        let registry = Arc::new(ConnectionRegistry::new());
        let bus = CommandBus::new(registry);

        let fault = bus
            .dispatch("node-ghost", "noop", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(fault, FleetError::LinkAbsent(_)));
        assert_eq!(bus.pending_count().await, 0);
    }
}
