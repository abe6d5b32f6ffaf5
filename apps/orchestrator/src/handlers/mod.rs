// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER REGISTRY (V4.0 - API ADAPTER MATRIX)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: AUTORIDAD ÚNICA DE ADAPTADORES DE ENTRADA
 * =================================================================
 */

pub mod auth;
pub mod credits;
pub mod fleet;
pub mod gateway;
pub mod tenants;
