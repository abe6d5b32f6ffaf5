// [libs/infra/db-turso/src/repositories/instances.rs]
/*!
 * =================================================================
 * APARATO: BOT INSTANCE REPOSITORY (V3.0 - PLACEMENT LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CARGAS DE TRABAJO DE TENANTS SOBRE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WEAK REFERENCE DISCIPLINE: La instancia apunta a su nodo; el
 *    nodo jamás apunta de vuelta. El desanclaje deja 'node_id' nulo
 *    a la espera de recolocación.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::params;
use tracing::{info, instrument};
use wopr_domain_models::{BotInstance, InstanceBillingState};

use crate::errors::DbError;
use crate::TursoClient;

fn billing_state_from_label(raw_label: &str) -> InstanceBillingState {
    match raw_label {
        "suspended" => InstanceBillingState::Suspended,
        "grace" => InstanceBillingState::Grace,
        "destroyed" => InstanceBillingState::Destroyed,
        _ => InstanceBillingState::Active,
    }
}

/// Registro de colocación de instancias de bot en el Motor A.
pub struct InstanceRepository {
    database_client: TursoClient,
}

impl InstanceRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    fn hydrate_instance(data_row: &libsql::Row) -> Result<BotInstance, DbError> {
        let parse_timestamp = |raw: Option<String>| -> Option<DateTime<Utc>> {
            raw.and_then(|ts| {
                DateTime::parse_from_rfc3339(&ts).ok().map(|parsed| parsed.with_timezone(&Utc))
            })
        };

        let billing_state_label = data_row.get::<String>(3)?;

        Ok(BotInstance {
            id: data_row.get::<String>(0)?,
            tenant_id: data_row.get::<String>(1)?,
            node_id: data_row.get::<Option<String>>(2).unwrap_or(None),
            billing_state: billing_state_from_label(&billing_state_label),
            resource_tier: data_row.get::<String>(4)?,
            storage_mb: data_row.get::<i64>(5)?,
            suspended_at: parse_timestamp(data_row.get::<Option<String>>(6).unwrap_or(None)),
            destroy_after: parse_timestamp(data_row.get::<Option<String>>(7).unwrap_or(None)),
        })
    }

    /// Cargas vivas colocadas en un nodo concreto.
    pub async fn list_for_node(&self, node_id: &str) -> Result<Vec<BotInstance>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT id, tenant_id, node_id, billing_state, resource_tier,
                        storage_mb, suspended_at, destroy_after
                 FROM bot_instances
                 WHERE node_id = ?1 AND billing_state != 'destroyed'
                 ORDER BY id ASC",
                params![node_id],
            )
            .await
            .map_err(DbError::classify)?;

        let mut placed_instances = Vec::new();
        while let Some(data_row) =
            query_results.next().await.map_err(|e| DbError::MappingError(e.to_string()))?
        {
            placed_instances.push(Self::hydrate_instance(&data_row)?);
        }
        Ok(placed_instances)
    }

    /**
     * Desancla todas las cargas de un nodo en cuarentena.
     * Las instancias quedan con 'node_id' nulo a la espera del
     * planificador de recolocación.
     *
     * @returns Cantidad de instancias desancladas.
     */
    #[instrument(skip(self), fields(node = %node_id))]
    pub async fn detach_for_reassignment(&self, node_id: &str) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let detached_count = database_connection
            .execute(
                "UPDATE bot_instances SET node_id = NULL
                 WHERE node_id = ?1 AND billing_state != 'destroyed'",
                params![node_id],
            )
            .await
            .map_err(DbError::classify)?;

        if detached_count > 0 {
            info!(
                "📦 [PLACEMENT_RELEASE]: {} instances detached from node '{}'.",
                detached_count, node_id
            );
        }
        Ok(detached_count)
    }
}
