// [libs/domain/gateway/src/socket.rs]
/*!
 * =================================================================
 * APARATO: ADAPTER SOCKET ROUTER (V5.0 - SELECTION SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: SELECCIÓN DE ADAPTADOR, DESPACHO Y MEDICIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SELECTION LATTICE: adaptador explícito > preferencia de plan
 *    (standard: auto-hospedado, premium: terceros) > orden de registro.
 * 2. METER-ON-SUCCESS: Un adaptador que falla no deja rastro
 *    facturable; el evento se emite tras el retorno exitoso.
 * 3. BYOK NEUTRALITY: Eventos BYOK cristalizan con cost=0 y charge=0.
 *
 * # Mathematical Proof (No Partial Meter):
 * La emisión del evento es el último paso previo al retorno. Si la
 * ejecución se cancela en cualquier punto de suspensión anterior, el
 * evento no existe; si el append falla, el fallo aflora al llamador.
 * =================================================================
 */

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use wopr_domain_models::{Capability, MeterEvent, MeterTier, PricingPlan, SpendLimits};

use wopr_domain_billing::{BudgetChecker, MeterEventStore};

use crate::adapter::{AdapterError, AdapterOutcome, ProviderAdapter};
use crate::errors::GatewayError;

/// Multiplicador de margen por defecto sobre el coste del proveedor.
const DEFAULT_CHARGE_MARGIN: f64 = 1.3;

/// Directiva de ejecución de una capacidad contra el gateway.
#[derive(Debug, Clone)]
pub struct ExecuteDirective {
    pub tenant_id: String,
    pub capability: Capability,
    pub input: Value,
    /// Adaptador explícito; anula toda heurística de selección.
    pub adapter: Option<String>,
    /// Preferencia comercial del tenant.
    pub pricing_plan: Option<PricingPlan>,
    /// Margen aplicado cuando el adaptador no impone cargo propio.
    pub margin: Option<f64>,
    pub session_id: Option<String>,
    /// El tenant aporta su propia credencial de proveedor.
    pub byok: bool,
    pub spend_limits: Option<SpendLimits>,
}

impl ExecuteDirective {
    pub fn new(tenant_id: &str, capability: Capability, input: Value) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            capability,
            input,
            adapter: None,
            pricing_plan: None,
            margin: None,
            session_id: None,
            byok: false,
            spend_limits: None,
        }
    }
}

/**
 * Enrutador de capacidades: registro ordenado de adaptadores, puerta
 * presupuestaria opcional y sumidero de medición obligatorio.
 */
pub struct AdapterSocket {
    /// Adaptadores en orden de registro (la regla 4 depende del orden).
    registered_adapters: Vec<Arc<dyn ProviderAdapter>>,
    budget_checker: Option<Arc<BudgetChecker>>,
    meter_store: Arc<dyn MeterEventStore>,
}

impl AdapterSocket {
    pub fn new(meter_store: Arc<dyn MeterEventStore>) -> Self {
        Self { registered_adapters: Vec::new(), budget_checker: None, meter_store }
    }

    pub fn with_budget_checker(mut self, budget_checker: Arc<BudgetChecker>) -> Self {
        self.budget_checker = Some(budget_checker);
        self
    }

    /// Registra un adaptador; el orden de registro es significativo.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        debug!(
            "🔌 [SOCKET_REGISTRY]: Adapter '{}' registered ({} capabilities, self_hosted={}).",
            adapter.provider_name(),
            adapter.declared_capabilities().len(),
            adapter.is_self_hosted()
        );
        self.registered_adapters.push(adapter);
    }

    /// Evalúa si alguna ruta sirve la capacidad (sonda de disponibilidad).
    pub fn serves(&self, capability: Capability) -> bool {
        self.registered_adapters.iter().any(|adapter| adapter.declares(capability))
    }

    /**
     * Ejecuta una capacidad de punta a punta.
     *
     * # Logic:
     * 1. Selección de adaptador por el retículo de prioridad.
     * 2. Escrutinio presupuestario (omitido para BYOK/techos ausentes).
     * 3. Despacho por la tabla estática capacidad -> método.
     * 4. Emisión del evento de medición y retorno del resultado.
     *
     * # Errors:
     * - `BudgetExceeded`: Veto del BudgetChecker (429 + ventana nominada).
     * - `Provider` / `ProviderTimeout`: Fallo upstream; sin evento.
     * - `Metering`: El append del evento falló tras el éxito upstream.
     */
    pub async fn execute(&self, directive: ExecuteDirective) -> Result<Value, GatewayError> {
        self.execute_with_receipt(directive).await.map(|(result, _receipt)| result)
    }

    /**
     * Variante con recibo: devuelve además el evento de medición sellado
     * para que la frontera liquide la deducción de créditos.
     */
    #[instrument(skip(self, directive), fields(tenant = %directive.tenant_id, capability = ?directive.capability))]
    pub async fn execute_with_receipt(
        &self,
        directive: ExecuteDirective,
    ) -> Result<(Value, MeterEvent), GatewayError> {
        let selected_adapter = self.select_adapter(&directive)?;

        // 1. PUERTA PRESUPUESTARIA (por tenant, cacheada)
        if let (Some(budget_checker), Some(spend_limits)) =
            (&self.budget_checker, &directive.spend_limits)
        {
            let verdict =
                budget_checker.evaluate(&directive.tenant_id, spend_limits, directive.byok).await?;
            if !verdict.allowed {
                let window_diagnostic =
                    verdict.reason.unwrap_or_else(|| "Spending limit exceeded".to_string());
                warn!(
                    "⛔ [SOCKET_VETO]: Tenant {} rejected by budget gate: {}",
                    directive.tenant_id, window_diagnostic
                );
                return Err(GatewayError::BudgetExceeded { reason: window_diagnostic });
            }
        }

        // 2. DESPACHO POR TABLA ESTÁTICA
        let invocation_outcome =
            Self::dispatch_capability(selected_adapter.as_ref(), &directive).await;

        let adapter_outcome = match invocation_outcome {
            Ok(outcome) => outcome,
            // Fallo upstream: propagación sin rastro facturable.
            Err(AdapterError::DeadlineExpired) => return Err(GatewayError::ProviderTimeout),
            Err(AdapterError::UnsupportedCapability(capability)) => {
                return Err(GatewayError::AdapterCapabilityMismatch {
                    adapter: selected_adapter.provider_name().to_string(),
                    capability,
                })
            }
            Err(AdapterError::Upstream(diagnostic)) => {
                return Err(GatewayError::Provider(diagnostic))
            }
        };

        // 3. SELLADO DEL EVENTO DE MEDICIÓN
        let meter_event = self.forge_meter_event(&directive, selected_adapter.as_ref(), &adapter_outcome);
        self.meter_store
            .append(&meter_event)
            .await
            .map_err(|append_fault| GatewayError::Metering(append_fault.to_string()))?;

        debug!(
            "📊 [SOCKET_METER]: Event {} sealed for tenant {} (charge {:.6} USD).",
            meter_event.id, directive.tenant_id, meter_event.charge_usd
        );

        Ok((adapter_outcome.result, meter_event))
    }

    /**
     * Retículo de selección de adaptador.
     *
     * 1. Adaptador explícito: debe existir y declarar la capacidad.
     * 2. Plan standard: prefiere auto-hospedado; degrada a cualquiera.
     * 3. Plan premium: prefiere terceros; degrada a cualquiera.
     * 4. Sin plan: primer adaptador registrado que declare la capacidad.
     */
    fn select_adapter(
        &self,
        directive: &ExecuteDirective,
    ) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
        if let Some(requested_name) = &directive.adapter {
            let adapter = self
                .registered_adapters
                .iter()
                .find(|candidate| candidate.provider_name() == requested_name)
                .ok_or_else(|| GatewayError::AdapterNotRegistered(requested_name.clone()))?;

            if !adapter.declares(directive.capability) {
                return Err(GatewayError::AdapterCapabilityMismatch {
                    adapter: requested_name.clone(),
                    capability: directive.capability,
                });
            }
            return Ok(adapter.clone());
        }

        let declaring: Vec<&Arc<dyn ProviderAdapter>> = self
            .registered_adapters
            .iter()
            .filter(|candidate| candidate.declares(directive.capability))
            .collect();

        let Some(&first_registered) = declaring.first() else {
            return Err(GatewayError::CapabilityUnavailable(directive.capability));
        };

        let preferred: Option<&Arc<dyn ProviderAdapter>> = match directive.pricing_plan {
            Some(PricingPlan::Standard) => {
                declaring.iter().find(|candidate| candidate.is_self_hosted()).copied()
            }
            Some(PricingPlan::Premium) => {
                declaring.iter().find(|candidate| !candidate.is_self_hosted()).copied()
            }
            None => None,
        };

        Ok(preferred.unwrap_or(first_registered).clone())
    }

    /// Tabla estática de despacho: capacidad -> método del adaptador.
    async fn dispatch_capability(
        adapter: &dyn ProviderAdapter,
        directive: &ExecuteDirective,
    ) -> Result<AdapterOutcome, AdapterError> {
        match directive.capability {
            Capability::Transcription => adapter.transcribe(&directive.input).await,
            Capability::ImageGeneration => adapter.generate_image(&directive.input).await,
            Capability::TextGeneration => adapter.generate_text(&directive.input).await,
            Capability::Tts => adapter.synthesize_speech(&directive.input).await,
            Capability::Embeddings => adapter.embed(&directive.input).await,
            Capability::Telephony => adapter.relay_telephony(&directive.input).await,
        }
    }

    fn forge_meter_event(
        &self,
        directive: &ExecuteDirective,
        adapter: &dyn ProviderAdapter,
        outcome: &AdapterOutcome,
    ) -> MeterEvent {
        let charge_margin = directive.margin.unwrap_or(DEFAULT_CHARGE_MARGIN);
        let (cost_usd, charge_usd, tier) = if directive.byok {
            (0.0, 0.0, MeterTier::Byok)
        } else {
            let computed_charge =
                outcome.charge_usd.unwrap_or(outcome.cost_usd * charge_margin);
            (outcome.cost_usd, computed_charge, MeterTier::Wopr)
        };

        MeterEvent {
            id: Uuid::new_v4().to_string(),
            tenant_id: directive.tenant_id.clone(),
            capability: directive.capability,
            provider: adapter.provider_name().to_string(),
            cost_usd,
            charge_usd,
            duration_seconds: outcome.duration_seconds,
            timestamp: Utc::now(),
            session_id: directive.session_id.clone(),
            tier,
        }
    }
}

// =================================================================
// PROVING GROUNDS
// =================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::Mutex;
    use wopr_domain_billing::errors::MeteringError;

    /// Sumidero de medición en RAM para el escrutinio de eventos.
    #[derive(Default)]
    struct RecordingMeterStore {
        events: Mutex<Vec<MeterEvent>>,
        /// Cargo preexistente devuelto a las sondas de ventana.
        window_charge_cents: AtomicU64,
    }

    #[async_trait]
    impl MeterEventStore for RecordingMeterStore {
        async fn append(&self, event: &MeterEvent) -> Result<(), MeteringError> {
            self.events.lock().await.push(event.clone());
            Ok(())
        }

        async fn charge_sum_since(
            &self,
            _tenant_id: &str,
            _since: DateTime<Utc>,
        ) -> Result<f64, MeteringError> {
            Ok(self.window_charge_cents.load(Ordering::SeqCst) as f64 / 100.0)
        }
    }

    /// Adaptador de prueba con fallo inyectable.
    struct ScriptedAdapter {
        name: String,
        capabilities: Vec<Capability>,
        self_hosted: bool,
        failure_message: Option<String>,
        cost_usd: f64,
        charge_override_usd: Option<f64>,
    }

    impl ScriptedAdapter {
        fn healthy(name: &str, capabilities: Vec<Capability>, self_hosted: bool) -> Self {
            Self {
                name: name.into(),
                capabilities,
                self_hosted,
                failure_message: None,
                cost_usd: 0.10,
                charge_override_usd: None,
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn provider_name(&self) -> &str {
            &self.name
        }
        fn declared_capabilities(&self) -> &[Capability] {
            &self.capabilities
        }
        fn is_self_hosted(&self) -> bool {
            self.self_hosted
        }

        async fn transcribe(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
            if let Some(diagnostic) = &self.failure_message {
                return Err(AdapterError::Upstream(diagnostic.clone()));
            }
            let mut outcome =
                AdapterOutcome::new(serde_json::json!({"text": "hello"}), self.cost_usd);
            outcome.charge_usd = self.charge_override_usd;
            Ok(outcome)
        }

        async fn generate_text(&self, _input: &Value) -> Result<AdapterOutcome, AdapterError> {
            Ok(AdapterOutcome::new(serde_json::json!({"completion": "ok"}), self.cost_usd))
        }
    }

    fn forge_socket(meter: Arc<RecordingMeterStore>) -> AdapterSocket {
        AdapterSocket::new(meter)
    }

    fn transcription_directive(tenant: &str) -> ExecuteDirective {
        ExecuteDirective::new(tenant, Capability::Transcription, serde_json::json!({"audio": "a.wav"}))
    }

    /**
     * CERTIFICACIÓN: La puerta presupuestaria precede al adaptador y
     * un veto no deja rastro facturable (escenario S3).
     */
    #[tokio::test]
    async fn certify_budget_gate_precedes_adapter() {
        println!("\n🛡️ [PROVING_GROUNDS]: Auditing budget-before-adapter ordering...");

        let meter = Arc::new(RecordingMeterStore::default());
        meter.window_charge_cents.store(60, Ordering::SeqCst); // $0.60 ya quemados

        let budget_checker = Arc::new(BudgetChecker::new(meter.clone()));
        let mut socket = forge_socket(meter.clone()).with_budget_checker(budget_checker);
        socket.register(Arc::new(ScriptedAdapter::healthy(
            "whisper-farm",
            vec![Capability::Transcription],
            true,
        )));

        let mut directive = transcription_directive("tenant-alpha");
        directive.spend_limits =
            Some(SpendLimits { max_per_hour_usd: Some(0.50), max_per_month_usd: None });

        let rejection = socket.execute(directive).await.unwrap_err();

        assert_eq!(rejection.http_status(), 429);
        assert!(rejection.to_string().contains("Hourly spending limit exceeded"));
        assert!(meter.events.lock().await.is_empty(), "Veto must not meter.");

        println!("   ✅ [SUCCESS]: Budget veto certified with zero meter residue.");
    }

    /**
     * CERTIFICACIÓN: Un adaptador que falla no deja eventos (escenario S5).
     */
    #[tokio::test]
    async fn certify_adapter_failure_leaves_no_meter_trace() {
        println!("\n🛡️ [PROVING_GROUNDS]: Auditing failure isolation...");

        let meter = Arc::new(RecordingMeterStore::default());
        let mut socket = forge_socket(meter.clone());
        let mut failing =
            ScriptedAdapter::healthy("whisper-farm", vec![Capability::Transcription], true);
        failing.failure_message = Some("provider unavailable".into());
        socket.register(Arc::new(failing));

        let rejection = socket.execute(transcription_directive("tenant-alpha")).await.unwrap_err();

        assert!(rejection.to_string().contains("provider unavailable"));
        assert!(meter.events.lock().await.is_empty());

        println!("   ✅ [SUCCESS]: Zero events after upstream rejection.");
    }

    /// BYOK cristaliza con cost=0 y charge=0, preservando el conteo.
    #[tokio::test]
    async fn certify_byok_events_are_neutral() {
        let meter = Arc::new(RecordingMeterStore::default());
        let mut socket = forge_socket(meter.clone());
        socket.register(Arc::new(ScriptedAdapter::healthy(
            "whisper-farm",
            vec![Capability::Transcription],
            true,
        )));

        let mut directive = transcription_directive("tenant-alpha");
        directive.byok = true;
        socket.execute(directive).await.unwrap();

        let events = meter.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cost_usd, 0.0);
        assert_eq!(events[0].charge_usd, 0.0);
        assert_eq!(events[0].tier, MeterTier::Byok);
    }

    /// El margen por defecto (1.3) rige cuando el adaptador no impone cargo.
    #[tokio::test]
    async fn certify_default_margin_pricing() {
        let meter = Arc::new(RecordingMeterStore::default());
        let mut socket = forge_socket(meter.clone());
        socket.register(Arc::new(ScriptedAdapter::healthy(
            "whisper-farm",
            vec![Capability::Transcription],
            true,
        )));

        socket.execute(transcription_directive("tenant-alpha")).await.unwrap();

        let events = meter.events.lock().await;
        assert!((events[0].charge_usd - 0.13).abs() < 1e-9);
        assert!((events[0].cost_usd - 0.10).abs() < 1e-9);
    }

    /**
     * CERTIFICACIÓN: Retículo de selección completo.
     */
    #[tokio::test]
    async fn certify_selection_lattice() {
        println!("\n🛡️ [PROVING_GROUNDS]: Auditing adapter selection lattice...");

        let meter = Arc::new(RecordingMeterStore::default());
        let mut socket = forge_socket(meter.clone());
        socket.register(Arc::new(ScriptedAdapter::healthy(
            "openai",
            vec![Capability::Transcription, Capability::TextGeneration],
            false,
        )));
        socket.register(Arc::new(ScriptedAdapter::healthy(
            "whisper-farm",
            vec![Capability::Transcription],
            true,
        )));

        // Plan standard: prefiere el auto-hospedado aunque se registró después.
        let mut standard = transcription_directive("tenant-alpha");
        standard.pricing_plan = Some(PricingPlan::Standard);
        socket.execute(standard).await.unwrap();

        // Plan premium: prefiere el de terceros.
        let mut premium = transcription_directive("tenant-alpha");
        premium.pricing_plan = Some(PricingPlan::Premium);
        socket.execute(premium).await.unwrap();

        // Sin plan: primer registrado que declara la capacidad.
        socket.execute(transcription_directive("tenant-alpha")).await.unwrap();

        // Explícito: anula heurísticas.
        let mut explicit = transcription_directive("tenant-alpha");
        explicit.adapter = Some("whisper-farm".into());
        socket.execute(explicit).await.unwrap();

        let events = meter.events.lock().await;
        let providers: Vec<&str> = events.iter().map(|e| e.provider.as_str()).collect();
        assert_eq!(providers, ["whisper-farm", "openai", "openai", "whisper-farm"]);

        // Explícito inexistente y desajuste de capacidad.
        drop(events);
        let mut ghost = transcription_directive("tenant-alpha");
        ghost.adapter = Some("ghost-provider".into());
        assert_eq!(socket.execute(ghost).await.unwrap_err().http_status(), 400);

        let mut mismatch =
            ExecuteDirective::new("tenant-alpha", Capability::Embeddings, serde_json::json!({}));
        mismatch.adapter = Some("openai".into());
        assert!(matches!(
            socket.execute(mismatch).await.unwrap_err(),
            GatewayError::AdapterCapabilityMismatch { .. }
        ));

        // Capacidad sin adaptadores: 503.
        let orphan =
            ExecuteDirective::new("tenant-alpha", Capability::Telephony, serde_json::json!({}));
        assert_eq!(socket.execute(orphan).await.unwrap_err().http_status(), 503);

        println!("   ✅ [SUCCESS]: Selection lattice certified.");
    }
}
