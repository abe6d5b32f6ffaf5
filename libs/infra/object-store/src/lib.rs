// [libs/infra/object-store/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SNAPSHOT OBJECT STORE (V2.0 - BUCKET UPLINK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RETIRADA DE OBJETOS SNAPSHOT DEL BUCKET
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TOMBSTONE TOLERANCE: Un 404 del bucket certifica que el objeto
 *    ya no existe; el paso de purga lo cuenta como éxito.
 * 2. HARDENED UPLINK: Timeout estratégico por objeto; el abanico del
 *    ejecutor de borrado acota el impacto de un objeto resistente.
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use wopr_domain_lifecycle::errors::LifecycleError;
use wopr_domain_lifecycle::store::ObjectStore;

/// Cliente del bucket de snapshots (endpoint S3-compatible).
pub struct SnapshotObjectStore {
    network_uplink_client: Client,
    bucket_endpoint: String,
    access_token: Option<String>,
}

impl SnapshotObjectStore {
    pub fn new(bucket_endpoint: String, access_token: Option<String>) -> Self {
        let network_client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("WOPR-Snapshot-Reaper/V2.0")
            .build()
            .expect("FATAL: Failed to initialize object store client.");

        Self {
            network_uplink_client: network_client,
            bucket_endpoint: bucket_endpoint.trim_end_matches('/').to_string(),
            access_token,
        }
    }
}

#[async_trait]
impl ObjectStore for SnapshotObjectStore {
    #[instrument(skip(self), fields(object = %object_key))]
    async fn remove(&self, object_key: &str) -> Result<(), LifecycleError> {
        let object_endpoint = format!("{}/{}", self.bucket_endpoint, object_key);

        let mut deletion_request = self.network_uplink_client.delete(&object_endpoint);
        if let Some(token) = &self.access_token {
            deletion_request = deletion_request.bearer_auth(token);
        }

        let network_response = deletion_request
            .send()
            .await
            .map_err(|network_fault| LifecycleError::External(network_fault.to_string()))?;

        let http_status = network_response.status();

        // 404: lápida previa; el objeto ya había sido retirado.
        if http_status.is_success() || http_status == StatusCode::NOT_FOUND {
            debug!("🗑️ [OBJECT_REAPED]: '{}' removed from bucket.", object_key);
            return Ok(());
        }

        let diagnostic_body = network_response.text().await.unwrap_or_default();
        warn!("⚠️ [OBJECT_RESISTANCE]: '{}' -> HTTP {}.", object_key, http_status);
        Err(LifecycleError::External(format!("HTTP_{}: {}", http_status, diagnostic_body)))
    }
}
