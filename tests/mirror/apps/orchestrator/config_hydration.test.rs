// [tests/mirror/apps/orchestrator/config_hydration.test.rs]
/**
 * =================================================================
 * APARATO: CONFIG HYDRATION TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA HIDRATACIÓN DEL ENTORNO
 *
 * NOTA TÉCNICA:
 * La hidratación lee el entorno del proceso; todo el escenario vive en
 * una única función de test para evitar carreras entre tests.
 * =================================================================
 */

use wopr_domain_models::TokenScope;
use wopr_orchestrator::config::PlatformConfig;

#[test]
fn certify_environment_hydration_end_to_end() {
    println!("\n⚙️ [PROVING_GROUNDS]: Auditing sovereign environment hydration...");

    // 1. ESCENARIO: entorno completo del plano de control.
    std::env::set_var("PLATFORM_SECRET", "a-sovereign-platform-secret-of-proper-length");
    std::env::set_var("TRUSTED_PROXY_IPS", "10.0.0.254, 10.0.0.253");
    std::env::set_var("GATEWAY_CIRCUIT_BREAKER_MAX", "120");
    std::env::set_var("GATEWAY_CIRCUIT_BREAKER_WINDOW_MS", "30000");
    std::env::set_var("GATEWAY_CIRCUIT_BREAKER_PAUSE_MS", "90000");
    std::env::set_var("GATEWAY_RATE_LIMIT_LLM", "60");
    std::env::set_var("BILLING_PERIOD_MS", "120000");
    std::env::set_var("LATE_ARRIVAL_GRACE_MS", "45000");
    std::env::set_var("FLEET_TOKEN_ACME", "write:tok-acme-77");
    std::env::set_var("STRIPE_SECRET_KEY", "");

    let config = PlatformConfig::hydrate().expect("Hydration must settle");

    // 2. VALIDACIÓN: knobs numéricos y listas.
    assert_eq!(config.breaker.max_requests_per_window, 120);
    assert_eq!(config.breaker.window_ms, 30_000);
    assert_eq!(config.breaker.pause_duration_ms, 90_000);
    assert_eq!(config.rate_limit_llm, 60);
    assert_eq!(config.billing_period_ms, 120_000);
    assert_eq!(config.late_arrival_grace_ms, 45_000);
    assert_eq!(config.trusted_proxy_ips, vec!["10.0.0.254", "10.0.0.253"]);

    // 3. La clave de Stripe vacía cuenta como integración dormida.
    assert!(config.stripe_secret_key.is_none());

    // 4. Mapeo de tokens de flota.
    let mapped = config.fleet_token_map.get("tok-acme-77").expect("Mapped token must resolve");
    assert_eq!(mapped.tenant_id, "acme");
    assert_eq!(mapped.scope, TokenScope::Write);

    // 5. SECRETO DÉBIL: por debajo de la longitud mínima, la ignición aborta.
    std::env::set_var("PLATFORM_SECRET", "too-short");
    assert!(PlatformConfig::hydrate().is_err());

    println!("   ✅ [SUCCESS]: Environment hydration certified.");
}
