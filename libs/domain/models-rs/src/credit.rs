// [libs/domain/models-rs/src/credit.rs]
/*!
 * =================================================================
 * APARATO: CREDIT LEDGER CONTRACT (V4.1 - DOUBLE ENTRY MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN INMUTABLE DEL RASTRO FINANCIERO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. INTEGER SOVEREIGNTY: Los créditos son enteros i64 (1 crédito =
 *    10^-8 USD). Ningún flotante toca el Ledger.
 * 2. RUNNING BALANCE: Cada transacción sella el 'balance_after',
 *    convirtiendo el historial en una cadena auditable.
 * 3. REFERENCE ANCHOR: 'reference_id' es el ancla de idempotencia
 *    para top-ups de Stripe (único por tenant).
 *
 * # Mathematical Proof (Ledger Chain):
 * balance_after(N) = balance_after(N-1) + amount(N). Por inducción,
 * el balance vigente es la suma de todos los montos firmados, y toda
 * fila intermedia es verificable sin recomputar el agregado.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Factor de conversión soberano: 1 USD = 10^8 créditos.
pub const CREDITS_PER_USD: i64 = 100_000_000;

/// Clasificación contable de un movimiento del Ledger.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    /// Regalo inicial de alta de cuenta.
    SignupGrant,
    /// Compra de créditos vía procesador externo.
    Purchase,
    /// Consumo de capacidad medido por el gateway.
    Consumption,
    /// Devolución de un consumo o compra.
    Refund,
    /// Ajuste manual de operaciones.
    Correction,
    /// Reparto promocional de la plataforma.
    Dividend,
    /// Comisión de afiliado.
    AffiliateBonus,
    /// Deducción por runtime de instancias de bot.
    RuntimeDeduction,
}

impl CreditTransactionType {
    /// Etiqueta persistida en el Motor A.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::SignupGrant => "signup_grant",
            CreditTransactionType::Purchase => "purchase",
            CreditTransactionType::Consumption => "consumption",
            CreditTransactionType::Refund => "refund",
            CreditTransactionType::Correction => "correction",
            CreditTransactionType::Dividend => "dividend",
            CreditTransactionType::AffiliateBonus => "affiliate_bonus",
            CreditTransactionType::RuntimeDeduction => "runtime_deduction",
        }
    }

    /// Resolución inversa desde la etiqueta persistida.
    pub fn from_str_label(raw_label: &str) -> Option<Self> {
        match raw_label {
            "signup_grant" => Some(CreditTransactionType::SignupGrant),
            "purchase" => Some(CreditTransactionType::Purchase),
            "consumption" => Some(CreditTransactionType::Consumption),
            "refund" => Some(CreditTransactionType::Refund),
            "correction" => Some(CreditTransactionType::Correction),
            "dividend" => Some(CreditTransactionType::Dividend),
            "affiliate_bonus" => Some(CreditTransactionType::AffiliateBonus),
            "runtime_deduction" => Some(CreditTransactionType::RuntimeDeduction),
            _ => None,
        }
    }
}

/**
 * Fila inmutable del Ledger de créditos.
 *
 * Las transacciones de un tenant forman una secuencia totalmente ordenada;
 * la escritura ocurre únicamente a través del CreditLedger (estrato L2-Billing).
 */
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Identificador unívoco de la transacción (UUID v4).
    #[serde(rename = "transaction_identifier")]
    pub id: String,

    /// Tenant propietario del movimiento.
    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,

    /// Monto firmado en créditos (positivo = abono, negativo = cargo).
    #[typeshare(serialized_as = "number")]
    pub amount_credits: i64,

    /// Balance resultante tras aplicar este movimiento.
    #[typeshare(serialized_as = "number")]
    pub balance_after_credits: i64,

    /// Clasificación contable del movimiento.
    #[serde(rename = "transaction_type")]
    pub transaction_kind: CreditTransactionType,

    /// Descripción humana opcional para el historial del Dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ancla de idempotencia (única por tenant cuando está presente).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,

    /// Origen de los fondos (sesión de checkout, promoción, interno).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_source: Option<String>,

    /// Sello temporal de inserción.
    #[typeshare(serialized_as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Conversión de conveniencia hacia USD para superficies de reporte.
    pub fn amount_usd(&self) -> f64 {
        self.amount_credits as f64 / CREDITS_PER_USD as f64
    }
}
