// [tests/mirror/libs/infra/db_turso/rate_window.test.rs]
/**
 * =================================================================
 * APARATO: RATE WINDOW TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA FÍSICA DE VENTANA FIJA
 * =================================================================
 */

use std::time::Duration;

use wopr_domain_gateway::rate_limiter::RateLimitStore;
use wopr_infra_db::repositories::RateLimitRepository;
use wopr_infra_db::TursoClient;

async fn forge_repository(database_label: &str) -> RateLimitRepository {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_label),
        None,
    )
    .await
    .expect("Memory strata ignition failed");
    RateLimitRepository::new(client)
}

#[tokio::test]
async fn certify_monotonic_count_within_window() {
    println!("\n🚦 [PROVING_GROUNDS]: Auditing shared counter monotonicity...");

    let repository = forge_repository("rate_monotonic_test").await;

    let (first, window_origin) =
        repository.increment("10.0.0.1", "auth-login", 900_000).await.unwrap();
    let (second, second_origin) =
        repository.increment("10.0.0.1", "auth-login", 900_000).await.unwrap();
    let (third, third_origin) =
        repository.increment("10.0.0.1", "auth-login", 900_000).await.unwrap();

    assert_eq!((first, second, third), (1, 2, 3));
    // La ventana no se mueve mientras siga vigente.
    assert_eq!(window_origin, second_origin);
    assert_eq!(window_origin, third_origin);

    println!("   ✅ [SUCCESS]: Counter monotonicity certified.");
}

#[tokio::test]
async fn certify_key_and_scope_isolation() {
    let repository = forge_repository("rate_isolation_test").await;

    repository.increment("10.0.0.1", "auth-login", 900_000).await.unwrap();
    repository.increment("10.0.0.1", "auth-login", 900_000).await.unwrap();

    // Otra clave dentro del mismo alcance nace en 1.
    let (other_key_count, _) =
        repository.increment("10.0.0.2", "auth-login", 900_000).await.unwrap();
    assert_eq!(other_key_count, 1);

    // La misma clave bajo otro alcance también nace en 1.
    let (other_scope_count, _) =
        repository.increment("10.0.0.1", "gateway-llm", 60_000).await.unwrap();
    assert_eq!(other_scope_count, 1);
}

#[tokio::test]
async fn certify_window_expiry_resets_counter() {
    println!("\n🚦 [PROVING_GROUNDS]: Auditing window expiry reset...");

    let repository = forge_repository("rate_expiry_test").await;

    // Ventana diminuta para observar el reinicio físico.
    let (initial_count, initial_origin) =
        repository.increment("10.0.0.1", "expiry-probe", 50).await.unwrap();
    assert_eq!(initial_count, 1);
    repository.increment("10.0.0.1", "expiry-probe", 50).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;

    let (reset_count, reset_origin) =
        repository.increment("10.0.0.1", "expiry-probe", 50).await.unwrap();
    assert_eq!(reset_count, 1, "WINDOW_FAULT: Expired window did not reset.");
    assert!(reset_origin > initial_origin, "WINDOW_FAULT: Window origin did not advance.");

    println!("   ✅ [SUCCESS]: Fixed-window reset certified.");
}
