// [libs/infra/db-turso/src/repositories/tenants.rs]
/*!
 * =================================================================
 * APARATO: TENANT STATUS REPOSITORY (V2.0 - GOVERNANCE READ)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERFIL COMERCIAL Y TECHOS DE GASTO POR TENANT
 * =================================================================
 */

use libsql::params;
use wopr_domain_models::{PricingPlan, SpendLimits};

use crate::errors::DbError;
use crate::TursoClient;

/// Perfil comercial vigente de un tenant.
#[derive(Debug, Clone)]
pub struct TenantProfile {
    pub spend_limits: SpendLimits,
    pub pricing_plan: Option<PricingPlan>,
}

/// Lector del perfil de gobernanza comercial.
pub struct TenantRepository {
    database_client: TursoClient,
}

impl TenantRepository {
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /// Perfil del tenant; un tenant sin fila no porta techos de gasto.
    pub async fn fetch_profile(&self, tenant_id: &str) -> Result<Option<TenantProfile>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT spend_limit_hourly_usd, spend_limit_monthly_usd, pricing_plan
                 FROM tenant_status WHERE tenant_id = ?1",
                params![tenant_id],
            )
            .await
            .map_err(DbError::classify)?;

        let Some(data_row) =
            query_results.next().await.map_err(|e| DbError::MappingError(e.to_string()))?
        else {
            return Ok(None);
        };

        let pricing_plan_label = data_row.get::<Option<String>>(2).unwrap_or(None);
        let pricing_plan = match pricing_plan_label.as_deref() {
            Some("premium") => Some(PricingPlan::Premium),
            Some("standard") => Some(PricingPlan::Standard),
            _ => None,
        };

        Ok(Some(TenantProfile {
            spend_limits: SpendLimits {
                max_per_hour_usd: data_row.get::<Option<f64>>(0).unwrap_or(None),
                max_per_month_usd: data_row.get::<Option<f64>>(1).unwrap_or(None),
            },
            pricing_plan,
        }))
    }

    /// Alta o actualización del perfil (superficies administrativas).
    pub async fn upsert_profile(
        &self,
        tenant_id: &str,
        profile: &TenantProfile,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let pricing_plan_label = match profile.pricing_plan {
            Some(PricingPlan::Premium) => "premium",
            _ => "standard",
        };

        database_connection
            .execute(
                "INSERT INTO tenant_status (
                    tenant_id, status, pricing_plan, spend_limit_hourly_usd, spend_limit_monthly_usd
                 ) VALUES (?1, 'active', ?2, ?3, ?4)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                    pricing_plan = excluded.pricing_plan,
                    spend_limit_hourly_usd = excluded.spend_limit_hourly_usd,
                    spend_limit_monthly_usd = excluded.spend_limit_monthly_usd,
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    tenant_id,
                    pricing_plan_label,
                    profile.spend_limits.max_per_hour_usd,
                    profile.spend_limits.max_per_month_usd
                ],
            )
            .await
            .map_err(DbError::classify)?;

        Ok(())
    }
}
