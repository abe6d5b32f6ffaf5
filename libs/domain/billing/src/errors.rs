// [libs/domain/billing/src/errors.rs]
/*!
 * =================================================================
 * APARATO: BILLING ERROR CATALOG (V3.1 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS FINANCIEROS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENCY AWARENESS: 'DuplicateReference' es un fallo de
 *    inserción pero un éxito de negocio; los llamadores lo tratan
 *    como confirmación de un top-up ya aplicado.
 * 2. PANOPTICON COMPLIANCE: Prefijos de estrato para el renderizado
 *    cromático en el Dashboard.
 * =================================================================
 */

use thiserror::Error;

/// Fallos del Ledger de créditos.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Fallo transitorio de persistencia; apto para reintento.
    #[error("[L2_LEDGER_FAULT]: STORAGE_UPLINK_SEVERED -> {0}")]
    StorageFailure(String),

    /// Colisión del ancla de idempotencia (tenant, reference_id).
    /// Los llamadores interpretan esta señal como éxito idempotente.
    #[error("[L2_LEDGER_FAULT]: REFERENCE_ANCHOR_COLLISION")]
    DuplicateReference,

    /// Monto nulo o fuera del rango representable en créditos i64.
    #[error("[L2_LEDGER_FAULT]: INVALID_AMOUNT_MAGNITUDE -> {0}")]
    InvalidAmount(i64),
}

/// Fallos del rastro de medición (eventos crudos).
#[derive(Error, Debug)]
pub enum MeteringError {
    /// La cristalización del evento en el Motor A falló.
    #[error("[L2_METER_FAULT]: EVENT_APPEND_REJECTED -> {0}")]
    AppendFailure(String),

    /// La lectura de ventanas de gasto falló.
    #[error("[L2_METER_FAULT]: WINDOW_SCAN_COLLAPSED -> {0}")]
    ScanFailure(String),
}

/// Fallos del pipeline de agregación y reporte externo.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// Fallo de persistencia durante la materialización de periodos.
    #[error("[L4_AGGREGATION_FAULT]: MATERIALIZATION_COLLAPSED -> {0}")]
    Storage(String),

    /// El procesador externo rechazó o no respondió al reporte.
    #[error("[L4_AGGREGATION_FAULT]: EXTERNAL_REPORT_REJECTED -> {0}")]
    Reporting(String),
}
