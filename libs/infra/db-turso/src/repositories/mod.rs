// [libs/infra/db-turso/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY REGISTRY (V3.0 - ACCESS MATRIX)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: AUTORIDAD ÚNICA DE ADAPTADORES DE PERSISTENCIA
 * =================================================================
 */

pub mod circuit_breaker;
pub mod credit_ledger;
pub mod instances;
pub mod meter_events;
pub mod nodes;
pub mod purge;
pub mod rate_limit;
pub mod tenants;
pub mod usage;

pub use circuit_breaker::CircuitBreakerRepository;
pub use credit_ledger::CreditLedgerRepository;
pub use instances::InstanceRepository;
pub use meter_events::MeterEventRepository;
pub use nodes::NodeRepository;
pub use purge::PurgeRepository;
pub use rate_limit::RateLimitRepository;
pub use tenants::{TenantProfile, TenantRepository};
pub use usage::UsageRepository;
