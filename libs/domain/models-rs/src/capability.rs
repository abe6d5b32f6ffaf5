// [libs/domain/models-rs/src/capability.rs]
/*!
 * =================================================================
 * APARATO: CAPABILITY DOMAIN CONTRACT (V3.0 - GATEWAY ALIGNED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: TAXONOMÍA SOBERANA DE CAPACIDADES DE PROVEEDOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATIC DISPATCH TABLE: El mapeo capacidad -> método de adaptador
 *    es una tabla fija de compilación, no una convención de strings.
 * 2. TYPESHARE SYNERGY: El Dashboard hereda la taxonomía bit-perfecta.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Taxonomía cerrada de operaciones facturables contra proveedores upstream.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Síntesis de voz (Text-To-Speech).
    Tts,
    /// Generación de texto (Large Language Model).
    TextGeneration,
    /// Transcripción de audio a texto.
    Transcription,
    /// Generación de imágenes.
    ImageGeneration,
    /// Vectorización semántica de texto.
    Embeddings,
    /// Telefonía programable (llamadas y SMS).
    Telephony,
}

impl Capability {
    /**
     * Tabla estática de despacho: capacidad -> método nominal del adaptador.
     *
     * # Logic:
     * El AdapterSocket consulta esta tabla para invocar el método correcto;
     * una capacidad sin método (telefonía) se despacha por su canal dedicado.
     */
    pub fn adapter_method(&self) -> &'static str {
        match self {
            Capability::Transcription => "transcribe",
            Capability::ImageGeneration => "generate_image",
            Capability::TextGeneration => "generate_text",
            Capability::Tts => "synthesize_speech",
            Capability::Embeddings => "embed",
            Capability::Telephony => "relay_telephony",
        }
    }

    /// Identificador de cable en kebab-case, tal como viaja en la URL del gateway.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Capability::Tts => "tts",
            Capability::TextGeneration => "text-generation",
            Capability::Transcription => "transcription",
            Capability::ImageGeneration => "image-generation",
            Capability::Embeddings => "embeddings",
            Capability::Telephony => "telephony",
        }
    }

    /// Resolución inversa desde el segmento de ruta del gateway.
    pub fn from_wire_name(raw_segment: &str) -> Option<Self> {
        match raw_segment {
            "tts" => Some(Capability::Tts),
            "text-generation" | "llm" => Some(Capability::TextGeneration),
            "transcription" => Some(Capability::Transcription),
            "image-generation" => Some(Capability::ImageGeneration),
            "embeddings" => Some(Capability::Embeddings),
            "telephony" => Some(Capability::Telephony),
            _ => None,
        }
    }
}

/// Preferencia comercial del tenant para la selección de adaptadores.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricingPlan {
    /// Prefiere adaptadores auto-hospedados (margen máximo).
    Standard,
    /// Prefiere proveedores premium de terceros.
    Premium,
}

/// Límites de gasto configurados por tenant para el BudgetChecker.
#[typeshare]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SpendLimits {
    /// Techo de gasto en la ventana móvil de 1 hora (USD).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_per_hour_usd: Option<f64>,
    /// Techo de gasto en la ventana móvil de 1 mes (USD).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_per_month_usd: Option<f64>,
}

impl SpendLimits {
    /// Un contrato sin techos definidos no activa el escrutinio de presupuesto.
    pub fn is_unbounded(&self) -> bool {
        self.max_per_hour_usd.is_none() && self.max_per_month_usd.is_none()
    }
}
