// [libs/domain/lifecycle/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LIFECYCLE DOMAIN ROOT (V2.0 - PURGE SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CICLO DE VIDA TERMINAL DE TENANTS
 * =================================================================
 */

pub mod deletion;
pub mod errors;
pub mod store;

pub use deletion::{DeletionExecutor, DeletionOutcome, ANONYMIZED_SENTINEL};
pub use errors::LifecycleError;
pub use store::{CustomerRegistry, ObjectStore, PurgeStore, SnapshotRecord, TenantCustomerStore};
