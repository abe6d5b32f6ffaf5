// [libs/domain/fleet/src/lib.rs]
/*!
 * =================================================================
 * APARATO: FLEET DOMAIN ROOT (V5.0 - ORCHESTRATION SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GOBERNANZA DE LA FLOTA DE NODOS TRABAJADORES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE LINK INVARIANT: A lo sumo un stream vivo por nodo; un
 *    accept nuevo sella el predecesor antes de instalarse.
 * 2. PER-NODE WRITE SERIALIZATION: HeartbeatProcessor y Watchdog
 *    comparten el retículo de candados por nodo.
 * 3. CORRELATION BUS: Los comandos viajan con ancla UUID; los
 *    resultados tardíos se descartan con advertencia.
 * =================================================================
 */

pub mod command_bus;
pub mod errors;
pub mod heartbeat;
pub mod locks;
pub mod registrar;
pub mod registry;
pub mod store;
pub mod watchdog;

pub use command_bus::CommandBus;
pub use errors::FleetError;
pub use heartbeat::HeartbeatProcessor;
pub use locks::NodeWriteLattice;
pub use registrar::NodeRegistrar;
pub use registry::ConnectionRegistry;
pub use store::NodeStore;
pub use watchdog::{RecoveryManager, Watchdog, WatchdogConfig};
