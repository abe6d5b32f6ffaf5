// [libs/domain/lifecycle/src/store.rs]
/*!
 * =================================================================
 * APARATO: LIFECYCLE SEAM CONTRACTS (V2.0 - TRAIT SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN PORTS (ESTRATO L2)
 * RESPONSABILIDAD: COSTURAS DE PURGA MULTI-ALMACÉN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT STEP LIST: El borrado multi-tabla se modela como pasos
 *    explícitos, no cascadas de base de datos; el orden es semántico
 *    (la anonimización precede a la remoción de filas).
 * 2. MULTI-STORE SPAN: Los pasos cruzan base de datos, almacén de
 *    objetos y procesador externo bajo la misma disciplina.
 * =================================================================
 */

use async_trait::async_trait;

use crate::errors::LifecycleError;

/// Fila de snapshot pendiente de retirada del almacén de objetos.
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub id: String,
    pub object_key: String,
}

/// Conteo nominal por tabla devuelto por los pasos compuestos.
pub type TableCounts = Vec<(&'static str, u64)>;

/// Puerto de purga del Motor A, un método por paso del pipeline.
#[async_trait]
pub trait PurgeStore: Send + Sync {
    async fn purge_bot_instances(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    /// Transacciones + balances + ajustes del Ledger.
    async fn purge_credit_ledger(&self, tenant_id: &str) -> Result<TableCounts, LifecycleError>;

    /// Eventos de medición + agregados + reportes externos.
    async fn purge_usage_data(&self, tenant_id: &str) -> Result<TableCounts, LifecycleError>;

    /// Cola + preferencias + historial de notificaciones.
    async fn purge_notification_data(&self, tenant_id: &str)
        -> Result<TableCounts, LifecycleError>;

    /// Log de auditoría de cara al usuario (borrado físico).
    async fn purge_user_audit_log(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    /**
     * Anonimiza el log de auditoría administrativo: las filas permanecen
     * por mandato regulatorio; los campos identificadores reciben el
     * centinela. JAMÁS borra.
     */
    async fn anonymize_admin_audit_log(
        &self,
        tenant_id: &str,
        sentinel: &str,
    ) -> Result<u64, LifecycleError>;

    async fn purge_admin_notes(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    /// Snapshots con su 'object_key' para el abanico del almacén de objetos.
    async fn list_snapshots(&self, tenant_id: &str)
        -> Result<Vec<SnapshotRecord>, LifecycleError>;

    /// Filas de snapshot (tras la retirada de objetos).
    async fn purge_snapshot_rows(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    async fn purge_backup_status(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    /// Cargos espejados del procesador externo.
    async fn purge_external_charges(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    async fn purge_tenant_status(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    /// Filas de rol en ambas direcciones (usuario->rol y rol->usuario).
    async fn purge_user_roles(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    async fn purge_customer_mapping(&self, tenant_id: &str) -> Result<u64, LifecycleError>;

    /// Sesiones + cuentas + tokens de verificación + usuario.
    async fn purge_auth_records(&self, tenant_id: &str) -> Result<TableCounts, LifecycleError>;
}

/// Puerto del almacén de objetos (retirada de snapshots).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn remove(&self, object_key: &str) -> Result<(), LifecycleError>;
}

/// Resolución tenant -> identificador de cliente del procesador externo.
#[async_trait]
pub trait TenantCustomerStore: Send + Sync {
    async fn customer_id_for(&self, tenant_id: &str) -> Result<Option<String>, LifecycleError>;
}

/// Puerto de borrado de clientes en el procesador externo de pagos.
#[async_trait]
pub trait CustomerRegistry: Send + Sync {
    async fn delete_customer(&self, customer_id: &str) -> Result<(), LifecycleError>;
}
