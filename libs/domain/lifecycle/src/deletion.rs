// [libs/domain/lifecycle/src/deletion.rs]
/*!
 * =================================================================
 * APARATO: TENANT DELETION EXECUTOR (V3.0 - BEST EFFORT MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PURGA ORDENADA Y TOLERANTE A FALLOS PARCIALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PER-STEP BOUNDARY: Cada paso vive en su propia frontera de error;
 *    un colapso de almacenamiento jamás contamina al paso siguiente.
 * 2. REGULATORY ANCHOR: El log de auditoría administrativo se anonimiza
 *    con el centinela y NUNCA se borra; las filas son evidencia.
 * 3. ALWAYS-SUCCEED SURFACE: La operación externa siempre concluye; los
 *    fallos por paso viajan en 'errors[]' del resumen.
 *
 * # Mathematical Proof (Failure Containment):
 * Sea S_i el paso i-ésimo. El resultado de S_i se captura en el
 * resumen y el control avanza a S_{i+1} incondicionalmente, por lo
 * que el conjunto de pasos ejecutados es invariante ante fallos.
 * =================================================================
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::errors::LifecycleError;
use crate::store::{CustomerRegistry, ObjectStore, PurgeStore, TenantCustomerStore};

/// Centinela de anonimización del log administrativo.
pub const ANONYMIZED_SENTINEL: &str = "[deleted]";

/// Resumen de la purga: conteos por paso y fallos capturados.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DeletionOutcome {
    pub deleted_counts: BTreeMap<String, u64>,
    pub errors: Vec<String>,
}

impl DeletionOutcome {
    fn record_count(&mut self, step_name: &str, rows_affected: u64) {
        self.deleted_counts.insert(step_name.to_string(), rows_affected);
    }

    fn record_fault(&mut self, step_name: &str, fault: &LifecycleError) {
        self.errors.push(format!("{}: {}", step_name, fault));
    }
}

/**
 * Ejecutor secuencial de la purga de un tenant a través de los tres
 * almacenes: Motor A, almacén de objetos y procesador externo.
 */
pub struct DeletionExecutor {
    purge_store: Arc<dyn PurgeStore>,
    object_store: Arc<dyn ObjectStore>,
    customer_store: Arc<dyn TenantCustomerStore>,
    customer_registry: Arc<dyn CustomerRegistry>,
}

impl DeletionExecutor {
    pub fn new(
        purge_store: Arc<dyn PurgeStore>,
        object_store: Arc<dyn ObjectStore>,
        customer_store: Arc<dyn TenantCustomerStore>,
        customer_registry: Arc<dyn CustomerRegistry>,
    ) -> Self {
        Self { purge_store, object_store, customer_store, customer_registry }
    }

    /**
     * Ejecuta el pipeline completo de purga en orden fijo.
     * La operación siempre retorna un resumen; los fallos por paso se
     * acumulan sin abortar.
     */
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn execute(&self, tenant_id: &str) -> DeletionOutcome {
        info!("🗑️ [DELETION_IGNITION]: Purge pipeline engaged for tenant {}.", tenant_id);
        let mut outcome = DeletionOutcome::default();

        // 1. CLIENTE DEL PROCESADOR EXTERNO
        self.step_external_customer(tenant_id, &mut outcome).await;

        // 2. INSTANCIAS DE BOT
        match self.purge_store.purge_bot_instances(tenant_id).await {
            Ok(rows) => outcome.record_count("bot_instances", rows),
            Err(fault) => outcome.record_fault("bot_instances", &fault),
        }

        // 3. LEDGER DE CRÉDITOS (transacciones + balances + ajustes)
        match self.purge_store.purge_credit_ledger(tenant_id).await {
            Ok(table_counts) => {
                for (table_name, rows) in table_counts {
                    outcome.record_count(table_name, rows);
                }
            }
            Err(fault) => outcome.record_fault("credit_ledger", &fault),
        }

        // 4. DATOS DE CONSUMO (eventos + agregados + reportes)
        match self.purge_store.purge_usage_data(tenant_id).await {
            Ok(table_counts) => {
                for (table_name, rows) in table_counts {
                    outcome.record_count(table_name, rows);
                }
            }
            Err(fault) => outcome.record_fault("usage_data", &fault),
        }

        // 5. DATOS DE NOTIFICACIÓN
        match self.purge_store.purge_notification_data(tenant_id).await {
            Ok(table_counts) => {
                for (table_name, rows) in table_counts {
                    outcome.record_count(table_name, rows);
                }
            }
            Err(fault) => outcome.record_fault("notification_data", &fault),
        }

        // 6. AUDITORÍA DE USUARIO (borrado físico)
        match self.purge_store.purge_user_audit_log(tenant_id).await {
            Ok(rows) => outcome.record_count("user_audit_log", rows),
            Err(fault) => outcome.record_fault("user_audit_log", &fault),
        }

        // 7. AUDITORÍA ADMINISTRATIVA: ANONIMIZAR, JAMÁS BORRAR.
        // Las filas permanecen por mandato regulatorio.
        match self.purge_store.anonymize_admin_audit_log(tenant_id, ANONYMIZED_SENTINEL).await {
            Ok(rows) => outcome.record_count("admin_audit_log_anonymized", rows),
            Err(fault) => outcome.record_fault("admin_audit_log_anonymized", &fault),
        }

        // 8. NOTAS ADMINISTRATIVAS
        match self.purge_store.purge_admin_notes(tenant_id).await {
            Ok(rows) => outcome.record_count("admin_notes", rows),
            Err(fault) => outcome.record_fault("admin_notes", &fault),
        }

        // 9. SNAPSHOTS: objetos primero, filas después.
        self.step_snapshots(tenant_id, &mut outcome).await;

        // 10. REGISTROS DE BACKUP
        match self.purge_store.purge_backup_status(tenant_id).await {
            Ok(rows) => outcome.record_count("backup_status", rows),
            Err(fault) => outcome.record_fault("backup_status", &fault),
        }

        // 11. CARGOS DEL PROCESADOR EXTERNO (espejo local)
        match self.purge_store.purge_external_charges(tenant_id).await {
            Ok(rows) => outcome.record_count("external_charges", rows),
            Err(fault) => outcome.record_fault("external_charges", &fault),
        }

        // 12. FILA DE ESTADO DEL TENANT
        match self.purge_store.purge_tenant_status(tenant_id).await {
            Ok(rows) => outcome.record_count("tenant_status", rows),
            Err(fault) => outcome.record_fault("tenant_status", &fault),
        }

        // 13. ROLES (ambas direcciones)
        match self.purge_store.purge_user_roles(tenant_id).await {
            Ok(rows) => outcome.record_count("user_roles", rows),
            Err(fault) => outcome.record_fault("user_roles", &fault),
        }

        // 14. MAPEO DE CLIENTE
        match self.purge_store.purge_customer_mapping(tenant_id).await {
            Ok(rows) => outcome.record_count("customer_mapping", rows),
            Err(fault) => outcome.record_fault("customer_mapping", &fault),
        }

        // 15. REGISTROS DE AUTENTICACIÓN (sesiones, cuentas, tokens, usuario)
        match self.purge_store.purge_auth_records(tenant_id).await {
            Ok(table_counts) => {
                for (table_name, rows) in table_counts {
                    outcome.record_count(table_name, rows);
                }
            }
            Err(fault) => outcome.record_fault("auth_records", &fault),
        }

        info!(
            "🗑️ [DELETION_SEALED]: Tenant {} purged. {} counters, {} captured faults.",
            tenant_id,
            outcome.deleted_counts.len(),
            outcome.errors.len()
        );
        outcome
    }

    /// Paso 1: borrado del cliente en el procesador externo.
    async fn step_external_customer(&self, tenant_id: &str, outcome: &mut DeletionOutcome) {
        let customer_lookup = self.customer_store.customer_id_for(tenant_id).await;

        match customer_lookup {
            Ok(Some(customer_id)) => {
                match self.customer_registry.delete_customer(&customer_id).await {
                    Ok(()) => outcome.record_count("stripe_customer", 1),
                    Err(fault) => {
                        warn!(
                            "⚠️ [DELETION_STEP_FAULT]: External customer removal failed for {}: {}",
                            tenant_id, fault
                        );
                        outcome.record_fault("stripe_customer", &fault);
                    }
                }
            }
            Ok(None) => outcome.record_count("stripe_customer", 0),
            Err(lookup_fault) => outcome.record_fault("stripe_customer", &lookup_fault),
        }
    }

    /**
     * Paso 9: abanico de retirada de objetos snapshot y purga de filas.
     * Cada objeto tiene su propia frontera: un fallo de retirada se
     * registra como 's3_snapshot(<id>)' y el abanico continúa.
     */
    async fn step_snapshots(&self, tenant_id: &str, outcome: &mut DeletionOutcome) {
        let snapshot_records = match self.purge_store.list_snapshots(tenant_id).await {
            Ok(records) => records,
            Err(listing_fault) => {
                outcome.record_fault("snapshots", &listing_fault);
                return;
            }
        };

        for snapshot in &snapshot_records {
            match self.object_store.remove(&snapshot.object_key).await {
                Ok(()) => {
                    outcome.record_count(&format!("s3_object:{}", snapshot.id), 1);
                }
                Err(removal_fault) => {
                    warn!(
                        "⚠️ [DELETION_STEP_FAULT]: Snapshot object {} resisted removal: {}",
                        snapshot.id, removal_fault
                    );
                    outcome.errors.push(format!("s3_snapshot({}): {}", snapshot.id, removal_fault));
                }
            }
        }

        match self.purge_store.purge_snapshot_rows(tenant_id).await {
            Ok(rows) => outcome.record_count("snapshots", rows),
            Err(fault) => outcome.record_fault("snapshots", &fault),
        }
    }
}
