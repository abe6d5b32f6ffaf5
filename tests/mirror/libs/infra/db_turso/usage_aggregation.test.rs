// [tests/mirror/libs/infra/db_turso/usage_aggregation.test.rs]
/**
 * =================================================================
 * APARATO: USAGE AGGREGATION TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE MATERIALIZACIÓN EXACTLY-ONCE
 * =================================================================
 */

use chrono::{Duration, Utc};
use uuid::Uuid;
use wopr_domain_billing::store::{MeterEventStore, UsageStore};
use wopr_domain_models::{Capability, MeterEvent, MeterTier};
use wopr_infra_db::repositories::{MeterEventRepository, UsageRepository};
use wopr_infra_db::TursoClient;

const PERIOD_MS: i64 = 60_000;

fn forge_event(tenant: &str, charge_usd: f64, age_minutes: i64) -> MeterEvent {
    MeterEvent {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.into(),
        capability: Capability::Transcription,
        provider: "wopr-inference".into(),
        cost_usd: charge_usd / 1.3,
        charge_usd,
        duration_seconds: 4.2,
        timestamp: Utc::now() - Duration::minutes(age_minutes),
        session_id: None,
        tier: MeterTier::Wopr,
    }
}

async fn forge_repositories(database_label: &str) -> (MeterEventRepository, UsageRepository) {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_label),
        None,
    )
    .await
    .expect("Memory strata ignition failed");
    (MeterEventRepository::new(client.clone()), UsageRepository::new(client))
}

#[tokio::test]
async fn certify_exactly_once_materialization() {
    println!("\n📊 [PROVING_GROUNDS]: Auditing exactly-once materialization...");

    let (meter_repository, usage_repository) =
        forge_repositories("usage_materialize_test").await;

    // 1. ESCENARIO: Dos eventos maduros del mismo periodo + uno fresco.
    // Los maduros comparten minuto para caer en el mismo cubo.
    let twin_alpha = forge_event("tenant-alpha", 0.20, 30);
    let mut twin_beta = forge_event("tenant-alpha", 0.10, 30);
    twin_beta.timestamp = twin_alpha.timestamp;
    let fresh_event = forge_event("tenant-alpha", 9.99, 0);

    meter_repository.append(&twin_alpha).await.unwrap();
    meter_repository.append(&twin_beta).await.unwrap();
    meter_repository.append(&fresh_event).await.unwrap();

    // 2. EXECUTION: El horizonte de gracia excluye al evento fresco.
    let grace_horizon = Utc::now() - Duration::seconds(60);
    usage_repository.materialize_due_periods(PERIOD_MS, grace_horizon).await.unwrap();

    let pending = usage_repository.unreported_summaries(10).await.unwrap();
    assert_eq!(pending.len(), 1, "MATERIALIZE_FAULT: Expected a single mature period.");
    let summary = &pending[0];
    assert_eq!(summary.event_count, 2);
    assert!((summary.total_charge_usd - 0.30).abs() < 1e-9);
    assert!((summary.total_duration_seconds - 8.4).abs() < 1e-9);

    // 3. REPLAY: Una segunda pasada no duplica el agregado.
    usage_repository.materialize_due_periods(PERIOD_MS, grace_horizon).await.unwrap();
    assert_eq!(usage_repository.unreported_summaries(10).await.unwrap().len(), 1);

    println!("   ✅ [SUCCESS]: Exactly-once materialization certified.");
}

#[tokio::test]
async fn certify_report_bookkeeping_uniqueness() {
    println!("\n📊 [PROVING_GROUNDS]: Auditing report ledger uniqueness...");

    let (meter_repository, usage_repository) = forge_repositories("usage_report_test").await;

    meter_repository.append(&forge_event("tenant-alpha", 0.50, 30)).await.unwrap();
    let grace_horizon = Utc::now() - Duration::seconds(60);
    usage_repository.materialize_due_periods(PERIOD_MS, grace_horizon).await.unwrap();

    let pending = usage_repository.unreported_summaries(10).await.unwrap();
    assert_eq!(pending.len(), 1);

    // 1. Sellado de la contabilidad de reporte.
    usage_repository.mark_reported(&pending[0], Utc::now()).await.unwrap();
    assert!(usage_repository.unreported_summaries(10).await.unwrap().is_empty());

    // 2. Replay del sellado: la clave compuesta lo absorbe sin fallo.
    usage_repository.mark_reported(&pending[0], Utc::now()).await.unwrap();
    assert!(usage_repository.unreported_summaries(10).await.unwrap().is_empty());

    println!("   ✅ [SUCCESS]: Report ledger uniqueness certified.");
}
