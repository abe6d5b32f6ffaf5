// [tests/mirror/libs/infra/db_turso/ledger_integrity.test.rs]
/**
 * =================================================================
 * APARATO: LEDGER INTEGRITY TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE ORDEN TOTAL E IDEMPOTENCIA
 * =================================================================
 */

use std::sync::Arc;

use wopr_domain_billing::errors::LedgerError;
use wopr_domain_billing::CreditLedger;
use wopr_domain_models::CreditTransactionType;
use wopr_infra_db::repositories::CreditLedgerRepository;
use wopr_infra_db::TursoClient;

async fn forge_ledger(database_label: &str) -> CreditLedger {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_label),
        None,
    )
    .await
    .expect("Memory strata ignition failed");
    CreditLedger::new(Arc::new(CreditLedgerRepository::new(client)))
}

#[tokio::test]
async fn certify_running_balance_chain_in_motor_a() {
    println!("\n💳 [PROVING_GROUNDS]: Auditing ledger chain against Motor A...");

    let ledger = forge_ledger("ledger_chain_test").await;

    // 1. ESCENARIO: Secuencia mixta de abonos y cargos.
    ledger
        .credit("tenant-alpha", 1_000, CreditTransactionType::SignupGrant, None, None, None)
        .await
        .unwrap();
    ledger
        .debit("tenant-alpha", 300, CreditTransactionType::Consumption, None, None)
        .await
        .unwrap();
    let final_movement = ledger
        .credit("tenant-alpha", 50, CreditTransactionType::AffiliateBonus, None, None, None)
        .await
        .unwrap();

    // 2. VALIDACIÓN: Balance = Σ montos; cadena = suma prefija.
    assert_eq!(final_movement.balance_after_credits, 750);
    assert_eq!(ledger.balance("tenant-alpha").await.unwrap(), 750);

    let history = ledger.history("tenant-alpha", 10, 0).await.unwrap();
    assert_eq!(history.len(), 3);
    // El historial viaja en orden descendente de inserción.
    assert_eq!(history[0].balance_after_credits, 750);
    assert_eq!(history[1].balance_after_credits, 700);
    assert_eq!(history[2].balance_after_credits, 1_000);

    println!("   ✅ [SUCCESS]: Prefix-sum chain certified in Motor A.");
}

#[tokio::test]
async fn certify_reference_anchor_idempotency_in_motor_a() {
    println!("\n💳 [PROVING_GROUNDS]: Auditing idempotency anchor against Motor A...");

    let ledger = forge_ledger("ledger_anchor_test").await;

    // 1. Top-up original.
    ledger
        .credit(
            "tenant-alpha",
            1_000,
            CreditTransactionType::Purchase,
            None,
            Some("stripe_cs_XYZ".into()),
            Some("stripe".into()),
        )
        .await
        .expect("First settlement must land");

    // 2. Replay del checkout: el índice único del Motor A lo rechaza.
    let replay = ledger
        .credit(
            "tenant-alpha",
            1_000,
            CreditTransactionType::Purchase,
            None,
            Some("stripe_cs_XYZ".into()),
            Some("stripe".into()),
        )
        .await;
    assert!(matches!(replay, Err(LedgerError::DuplicateReference)));

    // 3. El balance quedó liquidado exactamente una vez.
    assert_eq!(ledger.balance("tenant-alpha").await.unwrap(), 1_000);
    assert!(ledger.has_reference_id("tenant-alpha", "stripe_cs_XYZ").await.unwrap());

    // 4. El mismo ancla en OTRO tenant es legítima (unicidad por tenant).
    ledger
        .credit(
            "tenant-beta",
            500,
            CreditTransactionType::Purchase,
            None,
            Some("stripe_cs_XYZ".into()),
            None,
        )
        .await
        .expect("Per-tenant anchor must not collide across tenants");

    println!("   ✅ [SUCCESS]: Anchor idempotency certified bit-perfect.");
}

#[tokio::test]
async fn certify_tenant_isolation_in_motor_a() {
    let ledger = forge_ledger("ledger_isolation_test").await;

    ledger
        .credit("tenant-alpha", 100, CreditTransactionType::Purchase, None, None, None)
        .await
        .unwrap();
    ledger
        .debit("tenant-beta", 40, CreditTransactionType::RuntimeDeduction, None, None)
        .await
        .unwrap();

    assert_eq!(ledger.balance("tenant-alpha").await.unwrap(), 100);
    assert_eq!(ledger.balance("tenant-beta").await.unwrap(), -40);
    assert_eq!(ledger.history("tenant-alpha", 10, 0).await.unwrap().len(), 1);
}
