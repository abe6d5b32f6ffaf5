// [libs/infra/db-turso/src/repositories/credit_ledger.rs]
/*!
 * =================================================================
 * APARATO: CREDIT LEDGER REPOSITORY (V4.0 - DOUBLE ENTRY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA TRANSACCIONAL DEL RASTRO FINANCIERO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRANSACTIONAL ATOMICITY: La fila del Ledger y el balance cacheado
 *    se sellan en una única ráfaga ACID.
 * 2. IDEMPOTENCY ANCHOR: El índice único parcial (tenant, reference_id)
 *    convierte el replay de un top-up en una colisión semántica.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 *
 * # Mathematical Proof (Ledger Mirror):
 * credit_balances(tenant) siempre refleja el 'balance_after' de la
 * última fila: ambas escrituras comparten la misma transacción, por
 * lo que ningún lector observa un estado intermedio.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::DateTime;
use libsql::params;
use tracing::{debug, error, instrument};
use wopr_domain_billing::errors::LedgerError;
use wopr_domain_billing::store::LedgerStore;
use wopr_domain_models::{CreditTransaction, CreditTransactionType};

use crate::errors::DbError;
use crate::TursoClient;

/// Repositorio de autoridad única del rastro financiero en el Motor A.
pub struct CreditLedgerRepository {
    database_client: TursoClient,
}

impl CreditLedgerRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn map_storage_fault(db_fault: DbError) -> LedgerError {
        match db_fault {
            DbError::UniqueViolation(_) => LedgerError::DuplicateReference,
            other => LedgerError::StorageFailure(other.to_string()),
        }
    }

    fn hydrate_transaction(row: &libsql::Row) -> Result<CreditTransaction, LedgerError> {
        let transaction_type_label = row
            .get::<String>(4)
            .map_err(|e| LedgerError::StorageFailure(e.to_string()))?;
        let transaction_kind = CreditTransactionType::from_str_label(&transaction_type_label)
            .ok_or_else(|| {
                LedgerError::StorageFailure(format!(
                    "MAPPING_FAULT: unknown transaction_type '{}'",
                    transaction_type_label
                ))
            })?;

        let created_at_raw =
            row.get::<String>(8).map_err(|e| LedgerError::StorageFailure(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
            .map_err(|e| LedgerError::StorageFailure(format!("MAPPING_FAULT: created_at: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(CreditTransaction {
            id: row.get::<String>(0).map_err(|e| LedgerError::StorageFailure(e.to_string()))?,
            tenant_id: row.get::<String>(1).map_err(|e| LedgerError::StorageFailure(e.to_string()))?,
            amount_credits: row.get::<i64>(2).map_err(|e| LedgerError::StorageFailure(e.to_string()))?,
            balance_after_credits: row
                .get::<i64>(3)
                .map_err(|e| LedgerError::StorageFailure(e.to_string()))?,
            transaction_kind,
            description: row.get::<Option<String>>(5).unwrap_or(None),
            reference_id: row.get::<Option<String>>(6).unwrap_or(None),
            funding_source: row.get::<Option<String>>(7).unwrap_or(None),
            created_at,
        })
    }
}

#[async_trait]
impl LedgerStore for CreditLedgerRepository {
    async fn last_balance(&self, tenant_id: &str) -> Result<Option<i64>, LedgerError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::map_storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT balance_after_credits FROM credit_transactions
                 WHERE tenant_id = ?1 ORDER BY rowid DESC LIMIT 1",
                params![tenant_id],
            )
            .await
            .map_err(|e| Self::map_storage_fault(DbError::classify(e)))?;

        match query_results.next().await.map_err(|e| LedgerError::StorageFailure(e.to_string()))? {
            Some(data_row) => Ok(Some(
                data_row.get::<i64>(0).map_err(|e| LedgerError::StorageFailure(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, transaction), fields(tenant = %transaction.tenant_id))]
    async fn insert_transaction(&self, transaction: &CreditTransaction) -> Result<(), LedgerError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::map_storage_fault)?;

        let atomic_ledger_transaction = database_connection
            .transaction()
            .await
            .map_err(|e| Self::map_storage_fault(DbError::classify(e)))?;

        // 1. FILA INMUTABLE DEL LEDGER (el índice único vigila el ancla).
        let insertion_outcome = atomic_ledger_transaction
            .execute(
                "INSERT INTO credit_transactions (
                    id, tenant_id, amount_credits, balance_after_credits,
                    transaction_type, description, reference_id, funding_source, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    transaction.id.clone(),
                    transaction.tenant_id.clone(),
                    transaction.amount_credits,
                    transaction.balance_after_credits,
                    transaction.transaction_kind.as_str(),
                    transaction.description.clone(),
                    transaction.reference_id.clone(),
                    transaction.funding_source.clone(),
                    transaction.created_at.to_rfc3339()
                ],
            )
            .await;

        if let Err(insertion_fault) = insertion_outcome {
            let classified = DbError::classify(insertion_fault);
            if !matches!(classified, DbError::UniqueViolation(_)) {
                error!("❌ [LEDGER_FAULT]: Transaction row rejected: {}", classified);
            }
            return Err(Self::map_storage_fault(classified));
        }

        // 2. ESPEJO DE BALANCE (lectura O(1) para el Dashboard).
        atomic_ledger_transaction
            .execute(
                "INSERT INTO credit_balances (tenant_id, balance_credits, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                    balance_credits = excluded.balance_credits,
                    updated_at = excluded.updated_at",
                params![
                    transaction.tenant_id.clone(),
                    transaction.balance_after_credits,
                    transaction.created_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| Self::map_storage_fault(DbError::classify(e)))?;

        atomic_ledger_transaction
            .commit()
            .await
            .map_err(|e| Self::map_storage_fault(DbError::classify(e)))?;

        debug!(
            "💳 [LEDGER_CRYSTALLIZED]: {} credits sealed for tenant {}.",
            transaction.amount_credits, transaction.tenant_id
        );
        Ok(())
    }

    async fn has_reference(&self, tenant_id: &str, reference_id: &str) -> Result<bool, LedgerError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::map_storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT 1 FROM credit_transactions
                 WHERE tenant_id = ?1 AND reference_id = ?2 LIMIT 1",
                params![tenant_id, reference_id],
            )
            .await
            .map_err(|e| Self::map_storage_fault(DbError::classify(e)))?;

        Ok(query_results
            .next()
            .await
            .map_err(|e| LedgerError::StorageFailure(e.to_string()))?
            .is_some())
    }

    async fn history(
        &self,
        tenant_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, LedgerError> {
        let database_connection =
            self.database_client.get_connection().map_err(Self::map_storage_fault)?;

        let mut query_results = database_connection
            .query(
                "SELECT id, tenant_id, amount_credits, balance_after_credits,
                        transaction_type, description, reference_id, funding_source, created_at
                 FROM credit_transactions
                 WHERE tenant_id = ?1
                 ORDER BY rowid DESC LIMIT ?2 OFFSET ?3",
                params![tenant_id, limit as i64, offset as i64],
            )
            .await
            .map_err(|e| Self::map_storage_fault(DbError::classify(e)))?;

        let mut transaction_history = Vec::new();
        while let Some(data_row) =
            query_results.next().await.map_err(|e| LedgerError::StorageFailure(e.to_string()))?
        {
            transaction_history.push(Self::hydrate_transaction(&data_row)?);
        }
        Ok(transaction_history)
    }
}
