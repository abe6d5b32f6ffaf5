// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V4.0 - CONTROL PLANE HUB)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ESTRATOS, REPOSITORIOS Y PUERTAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza la forja del Ledger, las puertas de
 *    admisión, el socket de adaptadores y los aparatos de flota.
 * 2. KEY-GATED ADAPTERS: Cada adaptador de proveedor se registra solo
 *    cuando su credencial de entorno existe.
 * 3. NOMINAL PURITY: Uso de 'Arc<T>' para inmutabilidad compartida.
 * =================================================================
 */

use std::sync::Arc;

use tracing::{debug, error, info};
use wopr_domain_billing::{BudgetChecker, CreditLedger};
use wopr_domain_fleet::{
    CommandBus, ConnectionRegistry, HeartbeatProcessor, NodeRegistrar, NodeWriteLattice,
};
use wopr_domain_gateway::{AdapterSocket, CircuitBreaker, RateLimitRule, RateLimiter};
use wopr_domain_lifecycle::DeletionExecutor;
use wopr_infra_db::repositories::{
    CircuitBreakerRepository, CreditLedgerRepository, InstanceRepository, MeterEventRepository,
    NodeRepository, PurgeRepository, RateLimitRepository, TenantRepository, UsageRepository,
};
use wopr_infra_db::TursoClient;
use wopr_infra_object_store::SnapshotObjectStore;
use wopr_infra_providers::{OpenAiRelayAdapter, SelfHostedInferenceAdapter};
use wopr_infra_stripe::StripeGateway;

use crate::config::PlatformConfig;

/// Identificador del cortacircuitos de esta superficie del gateway.
const GATEWAY_BREAKER_INSTANCE: &str = "gateway-main";

/// Ventana del limitador por capacidad: 1 minuto.
const CAPABILITY_WINDOW_MS: i64 = 60_000;
/// Ventana del limitador de login: 15 minutos.
const LOGIN_WINDOW_MS: i64 = 15 * 60 * 1000;
/// Techo de intentos de login por ventana.
const LOGIN_MAX_ATTEMPTS: u32 = 5;

/**
 * Contenedor de estado compartido (Thread-Safe) del plano de control.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente táctico para el Motor A (Turso Cloud / libSQL).
    pub database_client: TursoClient,
    /// Configuración tipada hidratada en el arranque.
    pub config: Arc<PlatformConfig>,

    // --- ESTRATO FINANCIERO ---
    pub credit_ledger: Arc<CreditLedger>,
    pub budget_checker: Arc<BudgetChecker>,
    pub usage_repository: Arc<UsageRepository>,
    pub stripe_gateway: Arc<StripeGateway>,

    // --- ESTRATO DE GATEWAY ---
    pub adapter_socket: Arc<AdapterSocket>,
    pub rate_limiter: Arc<RateLimiter>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub tenant_repository: Arc<TenantRepository>,

    // --- ESTRATO DE FLOTA ---
    pub connection_registry: Arc<ConnectionRegistry>,
    pub command_bus: Arc<CommandBus>,
    pub heartbeat_processor: Arc<HeartbeatProcessor>,
    pub node_registrar: Arc<NodeRegistrar>,
    pub node_repository: Arc<NodeRepository>,
    pub instance_repository: Arc<InstanceRepository>,
    pub write_lattice: Arc<NodeWriteLattice>,

    // --- ESTRATO DE CICLO DE VIDA ---
    pub deletion_executor: Arc<DeletionExecutor>,
}

impl AppState {
    /**
     * Forja una nueva instancia del Estado Maestro inyectando todas
     * las dependencias desde el cliente táctico y la configuración.
     */
    pub fn new(database_client: TursoClient, config: Arc<PlatformConfig>) -> Self {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V4.0...");

        // --- ESTRATO FINANCIERO ---
        let ledger_repository = Arc::new(CreditLedgerRepository::new(database_client.clone()));
        let credit_ledger = Arc::new(CreditLedger::new(ledger_repository));

        let meter_repository = Arc::new(MeterEventRepository::new(database_client.clone()));
        let budget_checker = Arc::new(BudgetChecker::new(meter_repository.clone()));

        let usage_repository = Arc::new(UsageRepository::new(database_client.clone()));
        let stripe_gateway = Arc::new(StripeGateway::new(config.stripe_secret_key.clone()));

        // --- ESTRATO DE GATEWAY ---
        let mut adapter_socket = AdapterSocket::new(meter_repository.clone())
            .with_budget_checker(budget_checker.clone());

        if let (Some(farm_url), Some(farm_token)) =
            (&config.inference_farm_url, &config.inference_farm_token)
        {
            adapter_socket.register(Arc::new(SelfHostedInferenceAdapter::new(
                farm_url.clone(),
                farm_token.clone(),
            )));
        } else {
            info!("💤 [APP_STATE]: Inference farm credentials absent. Self-hosted track dormant.");
        }

        if let Some(provider_key) = &config.openai_api_key {
            adapter_socket.register(Arc::new(OpenAiRelayAdapter::new(provider_key.clone())));
        } else {
            info!("💤 [APP_STATE]: Premium provider key absent. Relay track dormant.");
        }

        let rate_limiter = Arc::new(RateLimiter::new(
            Arc::new(RateLimitRepository::new(database_client.clone())),
            forge_rate_limit_rules(&config),
            RateLimitRule {
                scope: "default".into(),
                method: None,
                path_prefix: "/".into(),
                max_requests: config.rate_limit_default,
                window_ms: CAPABILITY_WINDOW_MS,
            },
        ));

        let circuit_breaker = Arc::new(
            CircuitBreaker::new(
                GATEWAY_BREAKER_INSTANCE,
                Arc::new(CircuitBreakerRepository::new(database_client.clone())),
                config.breaker.clone(),
            )
            .with_trip_observer(Arc::new(|instance_id, paused_until| {
                error!(
                    target: "breaker_monitor",
                    instance = %instance_id,
                    "🧯 [BREAKER_EVENT]: Gateway circuit tripped. Paused until {}.",
                    paused_until
                );
            })),
        );

        // --- ESTRATO DE FLOTA ---
        let connection_registry = Arc::new(ConnectionRegistry::new());
        let command_bus = Arc::new(CommandBus::new(connection_registry.clone()));
        let node_repository = Arc::new(NodeRepository::new(database_client.clone()));
        let instance_repository = Arc::new(InstanceRepository::new(database_client.clone()));
        let write_lattice = Arc::new(NodeWriteLattice::new());
        let heartbeat_processor =
            Arc::new(HeartbeatProcessor::new(node_repository.clone(), write_lattice.clone()));
        let node_registrar = Arc::new(NodeRegistrar::new(node_repository.clone()));

        // --- ESTRATO DE CICLO DE VIDA ---
        let purge_repository = Arc::new(PurgeRepository::new(database_client.clone()));
        let snapshot_object_store = Arc::new(SnapshotObjectStore::new(
            config
                .snapshot_bucket_url
                .clone()
                .unwrap_or_else(|| "https://snapshots.wopr.network".to_string()),
            config.snapshot_bucket_token.clone(),
        ));
        let deletion_executor = Arc::new(DeletionExecutor::new(
            purge_repository.clone(),
            snapshot_object_store,
            purge_repository,
            stripe_gateway.clone(),
        ));

        Self {
            database_client: database_client.clone(),
            config,
            credit_ledger,
            budget_checker,
            usage_repository,
            stripe_gateway,
            adapter_socket: Arc::new(adapter_socket),
            rate_limiter,
            circuit_breaker,
            tenant_repository: Arc::new(TenantRepository::new(database_client)),
            connection_registry,
            command_bus,
            heartbeat_processor,
            node_registrar,
            node_repository,
            instance_repository,
            write_lattice,
            deletion_executor,
        }
    }
}

/// Reglas de contención perimetral derivadas de los knobs del entorno.
fn forge_rate_limit_rules(config: &PlatformConfig) -> Vec<RateLimitRule> {
    vec![
        RateLimitRule {
            scope: "auth-login".into(),
            method: Some("POST".into()),
            path_prefix: "/api/auth/sign-in".into(),
            max_requests: LOGIN_MAX_ATTEMPTS,
            window_ms: LOGIN_WINDOW_MS,
        },
        RateLimitRule {
            scope: "gateway-llm".into(),
            method: Some("POST".into()),
            path_prefix: "/api/v1/gateway/text-generation".into(),
            max_requests: config.rate_limit_llm,
            window_ms: CAPABILITY_WINDOW_MS,
        },
        RateLimitRule {
            scope: "gateway-llm".into(),
            method: Some("POST".into()),
            path_prefix: "/api/v1/gateway/llm".into(),
            max_requests: config.rate_limit_llm,
            window_ms: CAPABILITY_WINDOW_MS,
        },
        RateLimitRule {
            scope: "gateway-image".into(),
            method: Some("POST".into()),
            path_prefix: "/api/v1/gateway/image-generation".into(),
            max_requests: config.rate_limit_image,
            window_ms: CAPABILITY_WINDOW_MS,
        },
        RateLimitRule {
            scope: "gateway-audio".into(),
            method: Some("POST".into()),
            path_prefix: "/api/v1/gateway/tts".into(),
            max_requests: config.rate_limit_audio,
            window_ms: CAPABILITY_WINDOW_MS,
        },
        RateLimitRule {
            scope: "gateway-audio".into(),
            method: Some("POST".into()),
            path_prefix: "/api/v1/gateway/transcription".into(),
            max_requests: config.rate_limit_audio,
            window_ms: CAPABILITY_WINDOW_MS,
        },
        RateLimitRule {
            scope: "gateway-telephony".into(),
            method: Some("POST".into()),
            path_prefix: "/api/v1/gateway/telephony".into(),
            max_requests: config.rate_limit_telephony,
            window_ms: CAPABILITY_WINDOW_MS,
        },
    ]
}
