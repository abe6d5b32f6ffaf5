// [libs/infra/providers/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PROVIDER ADAPTERS ROOT (V2.0 - DUAL TRACK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTERS (ESTRATO L3)
 * RESPONSABILIDAD: IMPLEMENTACIONES CONCRETAS DEL PROVIDER ADAPTER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL TRACK: El motor auto-hospedado sirve el plan standard con
 *    margen máximo; el relevo de terceros sirve el plan premium.
 * 2. KEY-GATED REGISTRATION: Cada adaptador se registra únicamente
 *    cuando su credencial de entorno existe; la ausencia degrada la
 *    capacidad a 503 en el gateway.
 * =================================================================
 */

pub mod openai_relay;
pub mod self_hosted;

pub use openai_relay::OpenAiRelayAdapter;
pub use self_hosted::SelfHostedInferenceAdapter;
