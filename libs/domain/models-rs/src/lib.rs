// [libs/domain/models-rs/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS ROOT (V2.0 - CONTROL PLANE MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: AUTORIDAD ÚNICA DE TIPOS DEL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SOURCE OF TRUTH: Toda entidad que cruza un estrato
 *    (Gateway, Ledger, Flota, Borrado) nace en esta crate.
 * 2. TYPESHARE SYNERGY: Los contratos de cable se transpilan al
 *    Dashboard sin deriva de tipos.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta en los campos.
 * =================================================================
 */

pub mod auth;
pub mod capability;
pub mod credit;
pub mod instance;
pub mod metering;
pub mod node;
pub mod wire;

pub use auth::{TokenScope, BearerCredential};
pub use capability::{Capability, PricingPlan, SpendLimits};
pub use credit::{CreditTransaction, CreditTransactionType, CREDITS_PER_USD};
pub use instance::{BotInstance, InstanceBillingState};
pub use metering::{
    BillingPeriodSummary, ExternalUsageReport, MeterEvent, MeterTier, UsageSummary,
};
pub use node::{DrainStatus, Node, NodeStatus};
pub use wire::{
    CommandEnvelope, CommandResult, ContainerSummary, NodeEnvelope, NodeHealthEvent,
    NodeHeartbeat, NodeRegistration, NodeResourceUsage,
};
