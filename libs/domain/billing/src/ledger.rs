// [libs/domain/billing/src/ledger.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN CREDIT LEDGER (V5.0 - TOTAL ORDER MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONTABILIDAD AUTORITATIVA DE CRÉDITOS POR TENANT
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PER-TENANT SERIALIZATION: Un retículo de mutex fragmentado
 *    serializa a los escritores del mismo tenant; tenants distintos
 *    progresan en paralelo.
 * 2. RUNNING BALANCE SEAL: 'balance_after' se computa dentro de la
 *    misma sección crítica que la inserción.
 * 3. NEGATIVE TOLERANCE: Los débitos no rechazan balance negativo;
 *    esa gobernanza pertenece al BudgetChecker.
 *
 * # Mathematical Proof (Shard Serialization):
 * Todo escritor de un tenant T adquiere shard(hash(T) mod N). Dos
 * escrituras de T jamás se solapan, por lo que la secuencia de
 * 'balance_after' de T es la suma prefija de sus montos firmados.
 * =================================================================
 */

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use wopr_domain_models::{CreditTransaction, CreditTransactionType};

use crate::errors::LedgerError;
use crate::store::LedgerStore;

/// Cardinalidad del retículo de serialización por tenant.
/// 64 fragmentos acotan la contención sin inflar la huella de memoria.
const LEDGER_LOCK_SHARD_COUNT: usize = 64;

/**
 * Autoridad única de mutación de balances de créditos.
 * Toda escritura del Ledger del plano de control cruza este aparato.
 */
pub struct CreditLedger {
    /// Puerto de persistencia del rastro transaccional.
    ledger_store: Arc<dyn LedgerStore>,
    /// Retículo de mutex para la serialización por tenant.
    tenant_lock_shards: Vec<Mutex<()>>,
}

impl CreditLedger {
    pub fn new(ledger_store: Arc<dyn LedgerStore>) -> Self {
        let tenant_lock_shards = (0..LEDGER_LOCK_SHARD_COUNT).map(|_| Mutex::new(())).collect();
        Self { ledger_store, tenant_lock_shards }
    }

    /**
     * Abona créditos al tenant (monto positivo).
     *
     * # Errors:
     * - `InvalidAmount`: Monto no positivo.
     * - `DuplicateReference`: El ancla (tenant, reference_id) ya existe;
     *   el llamador lo trata como éxito idempotente.
     * - `StorageFailure`: Fallo transitorio del Motor A.
     */
    #[instrument(skip(self, description, funding_source), fields(tenant = %tenant_id))]
    pub async fn credit(
        &self,
        tenant_id: &str,
        amount_credits: i64,
        transaction_kind: CreditTransactionType,
        description: Option<String>,
        reference_id: Option<String>,
        funding_source: Option<String>,
    ) -> Result<CreditTransaction, LedgerError> {
        if amount_credits <= 0 {
            return Err(LedgerError::InvalidAmount(amount_credits));
        }
        self.apply_signed_movement(
            tenant_id,
            amount_credits,
            transaction_kind,
            description,
            reference_id,
            funding_source,
        )
        .await
    }

    /**
     * Carga créditos al tenant (monto positivo; se aplica con signo negativo).
     * Un débito puede dejar el balance en territorio negativo.
     */
    #[instrument(skip(self, description), fields(tenant = %tenant_id))]
    pub async fn debit(
        &self,
        tenant_id: &str,
        amount_credits: i64,
        transaction_kind: CreditTransactionType,
        description: Option<String>,
        reference_id: Option<String>,
    ) -> Result<CreditTransaction, LedgerError> {
        if amount_credits <= 0 {
            return Err(LedgerError::InvalidAmount(amount_credits));
        }
        self.apply_signed_movement(
            tenant_id,
            -amount_credits,
            transaction_kind,
            description,
            reference_id,
            None,
        )
        .await
    }

    /// Balance vigente: el 'balance_after' más reciente, o cero sin historial.
    pub async fn balance(&self, tenant_id: &str) -> Result<i64, LedgerError> {
        Ok(self.ledger_store.last_balance(tenant_id).await?.unwrap_or(0))
    }

    /// Evalúa si un ancla de idempotencia ya fue consumida por el tenant.
    pub async fn has_reference_id(
        &self,
        tenant_id: &str,
        reference_id: &str,
    ) -> Result<bool, LedgerError> {
        self.ledger_store.has_reference(tenant_id, reference_id).await
    }

    /// Historial paginado para el Dashboard.
    pub async fn history(
        &self,
        tenant_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, LedgerError> {
        self.ledger_store.history(tenant_id, limit, offset).await
    }

    /**
     * Sección crítica del Ledger: lee el último balance, sella la nueva
     * transacción con su suma prefija y la cristaliza, todo bajo el
     * candado del fragmento del tenant.
     */
    async fn apply_signed_movement(
        &self,
        tenant_id: &str,
        signed_amount_credits: i64,
        transaction_kind: CreditTransactionType,
        description: Option<String>,
        reference_id: Option<String>,
        funding_source: Option<String>,
    ) -> Result<CreditTransaction, LedgerError> {
        let shard_guard = self.shard_for_tenant(tenant_id).lock().await;

        let previous_balance = self.ledger_store.last_balance(tenant_id).await?.unwrap_or(0);
        let next_balance = previous_balance
            .checked_add(signed_amount_credits)
            .ok_or(LedgerError::InvalidAmount(signed_amount_credits))?;

        let sealed_transaction = CreditTransaction {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            amount_credits: signed_amount_credits,
            balance_after_credits: next_balance,
            transaction_kind,
            description,
            reference_id,
            funding_source,
            created_at: Utc::now(),
        };

        match self.ledger_store.insert_transaction(&sealed_transaction).await {
            Ok(()) => {
                debug!(
                    "💳 [LEDGER_SEAL]: Tenant {} moved {} credits. Balance: {}.",
                    tenant_id, signed_amount_credits, next_balance
                );
                drop(shard_guard);
                Ok(sealed_transaction)
            }
            Err(LedgerError::DuplicateReference) => {
                warn!(
                    "♻️ [LEDGER_REPLAY]: Reference anchor already consumed for tenant {}. Treating as settled.",
                    tenant_id
                );
                Err(LedgerError::DuplicateReference)
            }
            Err(insertion_fault) => Err(insertion_fault),
        }
    }

    fn shard_for_tenant(&self, tenant_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        tenant_id.hash(&mut hasher);
        let shard_index = (hasher.finish() as usize) % LEDGER_LOCK_SHARD_COUNT;
        &self.tenant_lock_shards[shard_index]
    }
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::LedgerStore;
    use async_trait::async_trait;

    /// Fake de persistencia: HashMap protegido, con ancla de idempotencia.
    #[derive(Default)]
    struct FakeLedgerStore {
        rows: Mutex<HashMap<String, Vec<CreditTransaction>>>,
    }

    #[async_trait]
    impl LedgerStore for FakeLedgerStore {
        async fn last_balance(&self, tenant_id: &str) -> Result<Option<i64>, LedgerError> {
            let rows_guard = self.rows.lock().await;
            Ok(rows_guard
                .get(tenant_id)
                .and_then(|chain| chain.last())
                .map(|transaction| transaction.balance_after_credits))
        }

        async fn insert_transaction(
            &self,
            transaction: &CreditTransaction,
        ) -> Result<(), LedgerError> {
            let mut rows_guard = self.rows.lock().await;
            let chain = rows_guard.entry(transaction.tenant_id.clone()).or_default();
            if let Some(reference) = &transaction.reference_id {
                let collision = chain
                    .iter()
                    .any(|existing| existing.reference_id.as_deref() == Some(reference));
                if collision {
                    return Err(LedgerError::DuplicateReference);
                }
            }
            chain.push(transaction.clone());
            Ok(())
        }

        async fn has_reference(
            &self,
            tenant_id: &str,
            reference_id: &str,
        ) -> Result<bool, LedgerError> {
            let rows_guard = self.rows.lock().await;
            Ok(rows_guard
                .get(tenant_id)
                .map(|chain| {
                    chain
                        .iter()
                        .any(|transaction| transaction.reference_id.as_deref() == Some(reference_id))
                })
                .unwrap_or(false))
        }

        async fn history(
            &self,
            tenant_id: &str,
            limit: u32,
            offset: u32,
        ) -> Result<Vec<CreditTransaction>, LedgerError> {
            let rows_guard = self.rows.lock().await;
            Ok(rows_guard
                .get(tenant_id)
                .map(|chain| {
                    chain
                        .iter()
                        .rev()
                        .skip(offset as usize)
                        .take(limit as usize)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn forge_ledger() -> (CreditLedger, Arc<FakeLedgerStore>) {
        let store = Arc::new(FakeLedgerStore::default());
        (CreditLedger::new(store.clone()), store)
    }

    /**
     * CERTIFICACIÓN: La cadena de 'balance_after' es la suma prefija
     * de los montos, incluso bajo escritores concurrentes.
     */
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn certify_running_balance_under_concurrency() {
        println!("\n💳 [PROVING_GROUNDS]: Auditing per-tenant total order...");

        let (ledger, store) = forge_ledger();
        let shared_ledger = Arc::new(ledger);

        let mut writer_handles = Vec::new();
        for burst_index in 0..25 {
            let credit_ledger = shared_ledger.clone();
            writer_handles.push(tokio::spawn(async move {
                credit_ledger
                    .credit(
                        "tenant-alpha",
                        100,
                        CreditTransactionType::Purchase,
                        Some(format!("burst {}", burst_index)),
                        None,
                        None,
                    )
                    .await
                    .unwrap();
            }));
            let debit_ledger = shared_ledger.clone();
            writer_handles.push(tokio::spawn(async move {
                debit_ledger
                    .debit(
                        "tenant-alpha",
                        40,
                        CreditTransactionType::Consumption,
                        None,
                        None,
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in writer_handles {
            handle.await.unwrap();
        }

        // Invariante universal: balance = Σ montos; cadena = suma prefija.
        let rows_guard = store.rows.lock().await;
        let chain = rows_guard.get("tenant-alpha").unwrap();
        assert_eq!(chain.len(), 50);

        let mut running_sum = 0i64;
        for transaction in chain {
            running_sum += transaction.amount_credits;
            assert_eq!(
                transaction.balance_after_credits, running_sum,
                "L2_LEDGER_CORRUPTION: Prefix-sum chain broken."
            );
        }
        assert_eq!(running_sum, 25 * 100 - 25 * 40);
        drop(rows_guard);

        assert_eq!(shared_ledger.balance("tenant-alpha").await.unwrap(), 1500);
        println!("   ✅ [SUCCESS]: Total order certified across 50 concurrent writers.");
    }

    /**
     * CERTIFICACIÓN: Top-up idempotente (escenario Stripe checkout replay).
     */
    #[tokio::test]
    async fn certify_idempotent_topup_replay() {
        println!("\n💳 [PROVING_GROUNDS]: Auditing reference anchor idempotency...");

        let (ledger, _store) = forge_ledger();

        ledger
            .credit(
                "tenant-alpha",
                1000,
                CreditTransactionType::Purchase,
                None,
                Some("stripe_cs_XYZ".into()),
                Some("stripe".into()),
            )
            .await
            .expect("First top-up must settle.");

        let replay_outcome = ledger
            .credit(
                "tenant-alpha",
                1000,
                CreditTransactionType::Purchase,
                None,
                Some("stripe_cs_XYZ".into()),
                Some("stripe".into()),
            )
            .await;

        assert!(matches!(replay_outcome, Err(LedgerError::DuplicateReference)));
        assert_eq!(ledger.balance("tenant-alpha").await.unwrap(), 1000);
        assert!(ledger.has_reference_id("tenant-alpha", "stripe_cs_XYZ").await.unwrap());

        println!("   ✅ [SUCCESS]: Replay absorbed; balance settled exactly once.");
    }

    /// Los débitos no rechazan balance negativo; esa gobernanza es del BudgetChecker.
    #[tokio::test]
    async fn certify_debit_tolerates_negative_balance() {
        let (ledger, _store) = forge_ledger();

        let movement = ledger
            .debit("tenant-beta", 500, CreditTransactionType::RuntimeDeduction, None, None)
            .await
            .unwrap();

        assert_eq!(movement.balance_after_credits, -500);
        assert_eq!(ledger.balance("tenant-beta").await.unwrap(), -500);
    }

    #[tokio::test]
    async fn certify_zero_and_negative_amounts_rejected() {
        let (ledger, _store) = forge_ledger();

        assert!(matches!(
            ledger
                .credit("tenant-gamma", 0, CreditTransactionType::Correction, None, None, None)
                .await,
            Err(LedgerError::InvalidAmount(0))
        ));
        assert!(matches!(
            ledger
                .debit("tenant-gamma", -5, CreditTransactionType::Consumption, None, None)
                .await,
            Err(LedgerError::InvalidAmount(-5))
        ));
    }

    #[tokio::test]
    async fn certify_virgin_tenant_balance_is_zero() {
        let (ledger, _store) = forge_ledger();
        assert_eq!(ledger.balance("tenant-never-seen").await.unwrap(), 0);
        assert!(ledger.history("tenant-never-seen", 10, 0).await.unwrap().is_empty());
    }
}
