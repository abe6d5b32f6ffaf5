// [libs/infra/db-turso/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V3.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONSTRAINT AWARENESS: Distingue la violación de unicidad (ancla
 *    de idempotencia del Ledger) del resto de fallos de consulta.
 * 2. PANOPTICON COMPLIANCE: Formatea los mensajes con prefijos de
 *    estrato para su renderizado cromático en el Dashboard.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster de Turso.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Violación de restricción de unicidad (anclas de idempotencia).
    #[error("[L3_DB_CONSTRAINT_FAULT]: UNIQUE_ANCHOR_COLLISION -> {0}")]
    UniqueViolation(String),

    /// Fallo en la transformación de tipos entre SQLite y el dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,
}

impl DbError {
    /**
     * Clasifica un fallo de libSQL, separando la colisión de unicidad
     * del resto del catálogo.
     */
    pub fn classify(raw_fault: libsql::Error) -> Self {
        let diagnostic = raw_fault.to_string();
        if diagnostic.contains("UNIQUE constraint failed") {
            DbError::UniqueViolation(diagnostic)
        } else {
            DbError::QueryError(raw_fault)
        }
    }
}
