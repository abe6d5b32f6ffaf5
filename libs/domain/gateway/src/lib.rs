// [libs/domain/gateway/src/lib.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY DOMAIN ROOT (V4.0 - ADMISSION SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ADMISIÓN, ENRUTADO Y MEDICIÓN DE CAPACIDADES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GATE ORDERING: RateLimiter -> CircuitBreaker -> BudgetChecker.
 *    El veto barato siempre precede al escrutinio por tenant.
 * 2. METER-ON-SUCCESS: El evento de medición se emite únicamente tras
 *    el retorno exitoso del adaptador; un adaptador que falla no deja
 *    rastro facturable.
 * 3. SEAM DISCIPLINE: ProviderAdapter, RateLimitStore y BreakerStore
 *    son traits; los tests inyectan fakes manuscritos.
 * =================================================================
 */

pub mod adapter;
pub mod circuit_breaker;
pub mod errors;
pub mod rate_limiter;
pub mod socket;

pub use adapter::{AdapterError, AdapterOutcome, ProviderAdapter};
pub use circuit_breaker::{BreakerConfig, BreakerStore, BreakerVerdict, BreakerWindow, CircuitBreaker};
pub use errors::GatewayError;
pub use rate_limiter::{
    resolve_client_key, RateLimitDecision, RateLimitRule, RateLimitStore, RateLimiter,
};
pub use socket::{AdapterSocket, ExecuteDirective};
