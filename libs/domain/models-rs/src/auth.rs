// [libs/domain/models-rs/src/auth.rs]
/*!
 * =================================================================
 * APARATO: AUTH SCOPE CONTRACT (V2.1 - PRIVILEGE LATTICE)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ORDEN TOTAL DE PRIVILEGIOS Y PARSEO DE TOKENS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. INLINE SCOPE: Los tokens 'wopr_<scope>_<random>' portan su
 *    privilegio en el propio material, sin viaje a base de datos.
 * 2. TOTAL ORDER: admin >= write >= read se deriva del orden de
 *    variantes, eliminando tablas de comparación manuales.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Clase de privilegio adjunta a un token portador.
/// El orden de declaración define el retículo: Read < Write < Admin.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    Read,
    Write,
    Admin,
}

impl TokenScope {
    /// Etiqueta canónica del scope tal como viaja en el token.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Read => "read",
            TokenScope::Write => "write",
            TokenScope::Admin => "admin",
        }
    }

    /// Resolución inversa desde la etiqueta del token.
    pub fn from_str_label(raw_label: &str) -> Option<Self> {
        match raw_label {
            "read" => Some(TokenScope::Read),
            "write" => Some(TokenScope::Write),
            "admin" => Some(TokenScope::Admin),
            _ => None,
        }
    }

    /// Evalúa si este privilegio cubre el requerido (admin >= write >= read).
    pub fn satisfies(&self, required_scope: TokenScope) -> bool {
        *self >= required_scope
    }
}

/**
 * Credencial portadora ya resuelta por el guardián perimetral.
 * Inyectada como extensión de petición para consumo de los handlers.
 */
#[derive(Debug, Clone)]
pub struct BearerCredential {
    /// Tenant al que pertenece la credencial.
    pub tenant_id: String,
    /// Privilegio resuelto del material del token.
    pub scope: TokenScope,
}

impl BearerCredential {
    /**
     * Parsea el material de un token con scope inline: 'wopr_<scope>_<random>'.
     *
     * # Logic:
     * El segmento intermedio es el scope; el sufijo aleatorio identifica la
     * credencial pero no se interpreta aquí. Tokens arbitrarios se resuelven
     * por configuración (FLEET_TOKEN_<TENANT>) en el estrato perimetral.
     */
    pub fn parse_inline_scope(raw_token_material: &str) -> Option<TokenScope> {
        let remainder = raw_token_material.strip_prefix("wopr_")?;
        let (scope_segment, random_segment) = remainder.split_once('_')?;
        if random_segment.is_empty() {
            return None;
        }
        TokenScope::from_str_label(scope_segment)
    }
}
