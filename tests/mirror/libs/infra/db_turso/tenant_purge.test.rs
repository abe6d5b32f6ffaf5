// [tests/mirror/libs/infra/db_turso/tenant_purge.test.rs]
/**
 * =================================================================
 * APARATO: TENANT PURGE TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE PURGA Y ANONIMIZACIÓN REGULATORIA
 * =================================================================
 */

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::params;
use tokio::sync::Mutex;
use wopr_domain_lifecycle::errors::LifecycleError;
use wopr_domain_lifecycle::store::{CustomerRegistry, ObjectStore};
use wopr_domain_lifecycle::{DeletionExecutor, ANONYMIZED_SENTINEL};
use wopr_infra_db::repositories::PurgeRepository;
use wopr_infra_db::TursoClient;

/// Bucket fake con claves envenenadas (fallo de retirada inyectado).
#[derive(Default)]
struct ScriptedBucket {
    poisoned_keys: Mutex<HashSet<String>>,
    removed_keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for ScriptedBucket {
    async fn remove(&self, object_key: &str) -> Result<(), LifecycleError> {
        if self.poisoned_keys.lock().await.contains(object_key) {
            return Err(LifecycleError::External("bucket access denied".into()));
        }
        self.removed_keys.lock().await.push(object_key.to_string());
        Ok(())
    }
}

/// Registro de clientes fake del procesador externo.
#[derive(Default)]
struct ScriptedCustomerRegistry {
    deleted_customers: Mutex<Vec<String>>,
}

#[async_trait]
impl CustomerRegistry for ScriptedCustomerRegistry {
    async fn delete_customer(&self, customer_id: &str) -> Result<(), LifecycleError> {
        self.deleted_customers.lock().await.push(customer_id.to_string());
        Ok(())
    }
}

async fn seed_tenant_universe(client: &TursoClient, tenant: &str) {
    let connection = client.get_connection().unwrap();

    let seed_statements = [
        format!("INSERT INTO bot_instances (id, tenant_id) VALUES ('bot-1', '{t}'), ('bot-2', '{t}')", t = tenant),
        format!("INSERT INTO credit_transactions (id, tenant_id, amount_credits, balance_after_credits, transaction_type, created_at) VALUES ('tx-1', '{t}', 100, 100, 'purchase', '2026-01-01T00:00:00Z')", t = tenant),
        format!("INSERT INTO credit_balances (tenant_id, balance_credits) VALUES ('{t}', 100)", t = tenant),
        format!("INSERT INTO meter_events (id, tenant_id, capability, provider, timestamp_ms) VALUES ('ev-1', '{t}', 'tts', 'wopr-inference', 1700000000000)", t = tenant),
        format!("INSERT INTO user_audit_log (id, tenant_id, action) VALUES ('ua-1', '{t}', 'login')", t = tenant),
        format!("INSERT INTO admin_audit_log (id, actor, action, target_tenant, target_user) VALUES ('aa-1', 'operator-1', 'suspend', '{t}', 'user-{t}')", t = tenant),
        format!("INSERT INTO admin_audit_log (id, actor, action, target_tenant, target_user) VALUES ('aa-2', 'operator-2', 'note', '{t}', 'user-{t}')", t = tenant),
        format!("INSERT INTO snapshots (id, tenant_id, object_key) VALUES ('snap-fail', '{t}', 'snapshots/snap-fail.tar'), ('snap-ok', '{t}', 'snapshots/snap-ok.tar')", t = tenant),
        format!("INSERT INTO customer_mappings (tenant_id, customer_id) VALUES ('{t}', 'cus_9f8e')", t = tenant),
        format!("INSERT INTO tenant_status (tenant_id, status) VALUES ('{t}', 'active')", t = tenant),
        format!("INSERT INTO users (id, email) VALUES ('{t}', 'owner@example.com')", t = tenant),
        format!("INSERT INTO sessions (id, user_id) VALUES ('sess-1', '{t}')", t = tenant),
    ];

    for statement in seed_statements {
        connection.execute(&statement, ()).await.unwrap();
    }
}

async fn count_rows(client: &TursoClient, table: &str, tenant_column: &str, tenant: &str) -> i64 {
    let connection = client.get_connection().unwrap();
    let mut rows = connection
        .query(
            &format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, tenant_column),
            params![tenant],
        )
        .await
        .unwrap();
    rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
}

#[tokio::test]
async fn certify_full_purge_with_regulatory_anonymization() {
    println!("\n🗑️ [PROVING_GROUNDS]: Auditing tenant purge against Motor A...");

    let client = TursoClient::connect("file:tenant_purge_test?mode=memory&cache=shared", None)
        .await
        .expect("Memory strata ignition failed");
    seed_tenant_universe(&client, "tenant-alpha").await;

    let purge_repository = Arc::new(PurgeRepository::new(client.clone()));
    let bucket = Arc::new(ScriptedBucket::default());
    bucket.poisoned_keys.lock().await.insert("snapshots/snap-fail.tar".into());
    let customer_registry = Arc::new(ScriptedCustomerRegistry::default());

    let executor = DeletionExecutor::new(
        purge_repository.clone(),
        bucket.clone(),
        purge_repository,
        customer_registry.clone(),
    );

    let outcome = executor.execute("tenant-alpha").await;

    // 1. S3 PARCIAL: el fallo viaja en errors[]; el objeto sano cayó.
    assert!(outcome.errors.iter().any(|e| e.contains("s3_snapshot(snap-fail)")));
    assert_eq!(outcome.deleted_counts.get("s3_object:snap-ok"), Some(&1));
    assert_eq!(outcome.deleted_counts.get("snapshots"), Some(&2));
    assert_eq!(bucket.removed_keys.lock().await.as_slice(), ["snapshots/snap-ok.tar"]);

    // 2. CLIENTE EXTERNO: resuelto desde el mapeo y borrado upstream.
    assert_eq!(customer_registry.deleted_customers.lock().await.as_slice(), ["cus_9f8e"]);

    // 3. TABLAS BORRABLES: cero filas residuales del tenant.
    for (table, column) in [
        ("bot_instances", "tenant_id"),
        ("credit_transactions", "tenant_id"),
        ("credit_balances", "tenant_id"),
        ("meter_events", "tenant_id"),
        ("user_audit_log", "tenant_id"),
        ("snapshots", "tenant_id"),
        ("customer_mappings", "tenant_id"),
        ("tenant_status", "tenant_id"),
        ("users", "id"),
        ("sessions", "user_id"),
    ] {
        assert_eq!(
            count_rows(&client, table, column, "tenant-alpha").await,
            0,
            "RESIDUE_FAULT: table '{}' still holds tenant rows.",
            table
        );
    }

    // 4. ANONIMIZACIÓN REGULATORIA: las filas permanecen, selladas.
    let connection = client.get_connection().unwrap();
    let mut rows = connection
        .query("SELECT target_tenant, target_user FROM admin_audit_log ORDER BY id", ())
        .await
        .unwrap();
    let mut surviving_rows = 0;
    while let Some(row) = rows.next().await.unwrap() {
        surviving_rows += 1;
        assert_eq!(row.get::<String>(0).unwrap(), ANONYMIZED_SENTINEL);
        assert_eq!(row.get::<String>(1).unwrap(), ANONYMIZED_SENTINEL);
    }
    assert_eq!(surviving_rows, 2, "REGULATORY_FAULT: Admin audit rows were deleted.");
    assert_eq!(outcome.deleted_counts.get("admin_audit_log_anonymized"), Some(&2));

    println!("   ✅ [SUCCESS]: Purge and regulatory anonymization certified.");
}
