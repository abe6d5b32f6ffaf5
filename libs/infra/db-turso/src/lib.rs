// [libs/infra/db-turso/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL PERSISTENCE ROOT (V3.0 - MOTOR A SOVEREIGN)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: AUTORIDAD DE PERSISTENCIA DEL PLANO DE CONTROL
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::TursoClient;
pub use errors::DbError;
