// [libs/domain/billing/src/lib.rs]
/*!
 * =================================================================
 * APARATO: BILLING DOMAIN ROOT (V3.0 - LEDGER SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: AUTORIDAD FINANCIERA DEL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LEDGER AUTHORITY: Toda mutación de balance pasa por el
 *    CreditLedger; los repositorios jamás se invocan directamente.
 * 2. SEAM DISCIPLINE: Las costuras (LedgerStore, MeterEventStore,
 *    UsageStore, UsageReporter) son traits; los tests inyectan fakes.
 * 3. ASYNC AGGREGATION: El UsageAggregator drena eventos crudos hacia
 *    agregados de periodo y reportes externos de forma idempotente.
 * =================================================================
 */

pub mod aggregator;
pub mod budget;
pub mod errors;
pub mod ledger;
pub mod store;

pub use aggregator::{AggregatorConfig, UsageAggregator};
pub use budget::{BudgetChecker, BudgetVerdict};
pub use errors::{AggregationError, LedgerError, MeteringError};
pub use ledger::CreditLedger;
pub use store::{LedgerStore, MeterEventStore, UsageReporter, UsageStore};
