// [libs/infra/stripe/src/lib.rs]
/*!
 * =================================================================
 * APARATO: STRIPE GATEWAY (V3.0 - IDEMPOTENT UPLINK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PUENTE HACIA EL PROCESADOR EXTERNO DE PAGOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT REPORTING: Cada reporte viaja con Idempotency-Key
 *    derivada de la tupla de periodo; un 409 del procesador se
 *    interpreta como prueba de paridad exitosa.
 * 2. GRACEFUL ABSENCE: Sin STRIPE_SECRET_KEY la integración queda
 *    desactivada; los reportes se vuelven no-op y el agregador solo
 *    marca contabilidad local.
 * 3. HARDENED UPLINK: Timeouts estratégicos y keep-alive para el
 *    enlace transatlántico.
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument, warn};
use wopr_domain_billing::errors::AggregationError;
use wopr_domain_billing::store::UsageReporter;
use wopr_domain_lifecycle::errors::LifecycleError;
use wopr_domain_lifecycle::store::CustomerRegistry;
use wopr_domain_models::BillingPeriodSummary;

/// Endpoint raíz del procesador externo.
const STRIPE_API_ROOT: &str = "https://api.stripe.com/v1";

/**
 * Cliente del procesador externo. Una clave ausente desactiva la
 * integración sin romper el resto del plano de control.
 */
pub struct StripeGateway {
    network_uplink_client: Client,
    secret_key: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: Option<String>) -> Self {
        if secret_key.is_none() {
            info!("💤 [STRIPE_GATEWAY]: Secret key absent. Billing integration dormant.");
        }

        let network_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .user_agent("WOPR-Billing-Uplink/V3.0")
            .build()
            .expect("FATAL: Failed to initialize Stripe uplink client.");

        Self { network_uplink_client: network_client, secret_key }
    }

    /// Verdadero cuando la integración está armada.
    pub fn is_armed(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Clave de idempotencia derivada de la tupla única del periodo.
    fn idempotency_key(summary: &BillingPeriodSummary) -> String {
        format!(
            "usage-{}-{}-{}-{}",
            summary.tenant_id,
            summary.capability.wire_name(),
            summary.provider,
            summary.period_start.timestamp_millis()
        )
    }
}

#[async_trait]
impl UsageReporter for StripeGateway {
    #[instrument(skip(self, summary), fields(tenant = %summary.tenant_id))]
    async fn report_usage(&self, summary: &BillingPeriodSummary) -> Result<(), AggregationError> {
        let Some(secret_key) = &self.secret_key else {
            debug!("💤 [STRIPE_GATEWAY]: Dormant integration. Usage report absorbed locally.");
            return Ok(());
        };

        let report_endpoint = format!("{}/billing/meter_events", STRIPE_API_ROOT);
        let form_payload = [
            ("event_name", format!("wopr_{}", summary.capability.wire_name())),
            ("identifier", Self::idempotency_key(summary)),
            ("payload[stripe_customer_id]", summary.tenant_id.clone()),
            ("payload[value]", format!("{:.6}", summary.total_charge_usd)),
            ("timestamp", summary.period_start.timestamp().to_string()),
        ];

        let network_response = self
            .network_uplink_client
            .post(&report_endpoint)
            .bearer_auth(secret_key)
            .header("Idempotency-Key", Self::idempotency_key(summary))
            .form(&form_payload)
            .send()
            .await
            .map_err(|network_fault| {
                error!("❌ [STRIPE_UPLINK_COLLAPSE]: Physical link failure: {}", network_fault);
                AggregationError::Reporting(network_fault.to_string())
            })?;

        let http_status = network_response.status();

        // 2xx o 409 (replay idempotente) sellan la paridad del rastro.
        if http_status.is_success() || http_status == StatusCode::CONFLICT {
            debug!("✅ [STRIPE_SYNC]: Period report crystallized upstream.");
            return Ok(());
        }

        let diagnostic_body = network_response.text().await.unwrap_or_default();
        warn!("⚠️ [STRIPE_REJECTION]: Status {}. Detail: {}", http_status, diagnostic_body);
        Err(AggregationError::Reporting(format!("HTTP_{}: {}", http_status, diagnostic_body)))
    }
}

#[async_trait]
impl CustomerRegistry for StripeGateway {
    #[instrument(skip(self), fields(customer = %customer_id))]
    async fn delete_customer(&self, customer_id: &str) -> Result<(), LifecycleError> {
        let Some(secret_key) = &self.secret_key else {
            debug!("💤 [STRIPE_GATEWAY]: Dormant integration. Customer deletion skipped.");
            return Ok(());
        };

        let deletion_endpoint = format!("{}/customers/{}", STRIPE_API_ROOT, customer_id);
        let network_response = self
            .network_uplink_client
            .delete(&deletion_endpoint)
            .bearer_auth(secret_key)
            .send()
            .await
            .map_err(|network_fault| LifecycleError::External(network_fault.to_string()))?;

        let http_status = network_response.status();

        // 404: el cliente ya no existe; el objetivo del paso está cumplido.
        if http_status.is_success() || http_status == StatusCode::NOT_FOUND {
            info!("🗑️ [STRIPE_PURGE]: Customer {} removed upstream.", customer_id);
            return Ok(());
        }

        let diagnostic_body = network_response.text().await.unwrap_or_default();
        Err(LifecycleError::External(format!("HTTP_{}: {}", http_status, diagnostic_body)))
    }
}
