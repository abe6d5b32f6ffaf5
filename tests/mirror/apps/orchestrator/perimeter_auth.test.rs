// [tests/mirror/apps/orchestrator/perimeter_auth.test.rs]
/**
 * =================================================================
 * APARATO: PERIMETER AUTH TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL MATERIAL CRIPTOGRÁFICO PERIMETRAL
 * =================================================================
 */

use wopr_domain_models::{BearerCredential, TokenScope};
use wopr_orchestrator::middleware::{
    derive_token_principal, forge_session_cookie, verify_session_cookie,
};

const PLATFORM_SECRET: &str = "a-sovereign-platform-secret-of-proper-length";

#[test]
fn certify_session_cookie_roundtrip_and_tamper_rejection() {
    println!("\n🔐 [PROVING_GROUNDS]: Auditing session cookie signatures...");

    let cookie_value = forge_session_cookie(PLATFORM_SECRET, "tenant-alpha");

    // 1. ROUNDTRIP: la firma legítima resuelve al tenant original.
    assert_eq!(
        verify_session_cookie(PLATFORM_SECRET, &cookie_value),
        Some("tenant-alpha".to_string())
    );

    // 2. MANIPULACIÓN: alterar el tenant invalida la firma.
    let tampered = cookie_value.replacen("tenant-alpha", "tenant-omega", 1);
    assert_eq!(verify_session_cookie(PLATFORM_SECRET, &tampered), None);

    // 3. MATERIAL MALFORMADO: sin separador no hay firma que validar.
    assert_eq!(verify_session_cookie(PLATFORM_SECRET, "garbage-without-dot"), None);

    println!("   ✅ [SUCCESS]: Cookie signature strata certified.");
}

#[test]
fn certify_inline_scope_lattice_for_gateway_tokens() {
    println!("\n🔐 [PROVING_GROUNDS]: Auditing inline-scope token lattice...");

    // Orden total de privilegios: admin >= write >= read.
    assert_eq!(BearerCredential::parse_inline_scope("wopr_admin_9f8e"), Some(TokenScope::Admin));
    assert_eq!(BearerCredential::parse_inline_scope("wopr_write_9f8e"), Some(TokenScope::Write));
    assert_eq!(BearerCredential::parse_inline_scope("wopr_read_9f8e"), Some(TokenScope::Read));

    assert!(TokenScope::Admin.satisfies(TokenScope::Write));
    assert!(!TokenScope::Read.satisfies(TokenScope::Admin));

    // Material ilegítimo: prefijo ajeno, scope desconocido, sufijo vacío.
    assert_eq!(BearerCredential::parse_inline_scope("sk_live_XYZ"), None);
    assert_eq!(BearerCredential::parse_inline_scope("wopr_root_9f8e"), None);
    assert_eq!(BearerCredential::parse_inline_scope("wopr_admin_"), None);

    println!("   ✅ [SUCCESS]: Privilege lattice certified.");
}

#[test]
fn certify_token_principal_stability() {
    // El principal derivado es estable, opaco y sensible al secreto.
    let principal = derive_token_principal(PLATFORM_SECRET, "wopr_write_a1b2c3");
    assert_eq!(principal, derive_token_principal(PLATFORM_SECRET, "wopr_write_a1b2c3"));
    assert_ne!(
        principal,
        derive_token_principal("another-secret-of-proper-length-here!!", "wopr_write_a1b2c3")
    );
    assert!(principal.starts_with("tok-"));
    assert!(!principal.contains("a1b2c3"));
}
