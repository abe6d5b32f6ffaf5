// [libs/domain/models-rs/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V2.0 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DEL PROTOCOLO DE FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WIRE PARITY: Valida que las tramas del stream de nodos conserven
 *    el discriminador 'type' y los nombres de campo del agente.
 * 2. LEDGER INTEGRITY: Certifica que los montos i64 del Ledger viajen
 *    sin pérdida de precisión por JSON.
 * =================================================================
 */
