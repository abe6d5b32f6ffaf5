// [libs/infra/db-turso/src/schema.rs]
/**
 * =================================================================
 * APARATO: CONTROL PLANE DATABASE SCHEMA (V8.0 - LEDGER STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. LEDGER STRATA: Tablas de doble asiento con ancla de idempotencia
 *    parcial (tenant_id, reference_id) para top-ups replicados.
 * 2. EXACTLY-ONCE AGGREGATION: Claves primarias compuestas en los
 *    agregados de periodo y reportes externos.
 * 3. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 4. PERFORMANCE: Índices de aceleración para el escaneo de ventanas.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del plano de control WOPR.
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    // --- LEDGER DE CRÉDITOS (doble asiento) ---
    ("TABLE_CREDIT_TRANSACTIONS", r#"
        CREATE TABLE IF NOT EXISTS credit_transactions (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            amount_credits INTEGER NOT NULL,
            balance_after_credits INTEGER NOT NULL,
            transaction_type TEXT NOT NULL,
            description TEXT,
            reference_id TEXT,
            funding_source TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_CREDIT_BALANCES", r#"
        CREATE TABLE IF NOT EXISTS credit_balances (
            tenant_id TEXT PRIMARY KEY,
            balance_credits INTEGER NOT NULL DEFAULT 0,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_CREDIT_ADJUSTMENTS", r#"
        CREATE TABLE IF NOT EXISTS credit_adjustments (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            amount_credits INTEGER NOT NULL,
            reason TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),

    // --- RASTRO DE MEDICIÓN Y AGREGADOS ---
    ("TABLE_METER_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS meter_events (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            capability TEXT NOT NULL,
            provider TEXT NOT NULL,
            cost_usd REAL NOT NULL DEFAULT 0,
            charge_usd REAL NOT NULL DEFAULT 0,
            duration_seconds REAL NOT NULL DEFAULT 0,
            timestamp_ms INTEGER NOT NULL,
            session_id TEXT,
            tier TEXT NOT NULL DEFAULT 'wopr'
        );
    "#),
    ("TABLE_USAGE_SUMMARIES", r#"
        CREATE TABLE IF NOT EXISTS usage_summaries (
            tenant_id TEXT NOT NULL,
            capability TEXT NOT NULL,
            provider TEXT NOT NULL,
            window_start_ms INTEGER NOT NULL,
            event_count INTEGER NOT NULL DEFAULT 0,
            total_cost_usd REAL NOT NULL DEFAULT 0,
            total_charge_usd REAL NOT NULL DEFAULT 0,
            total_duration_seconds REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (tenant_id, capability, provider, window_start_ms)
        );
    "#),
    ("TABLE_BILLING_PERIOD_SUMMARIES", r#"
        CREATE TABLE IF NOT EXISTS billing_period_summaries (
            tenant_id TEXT NOT NULL,
            capability TEXT NOT NULL,
            provider TEXT NOT NULL,
            period_start_ms INTEGER NOT NULL,
            event_count INTEGER NOT NULL DEFAULT 0,
            total_cost_usd REAL NOT NULL DEFAULT 0,
            total_charge_usd REAL NOT NULL DEFAULT 0,
            total_duration_seconds REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (tenant_id, capability, provider, period_start_ms)
        );
    "#),
    ("TABLE_EXTERNAL_USAGE_REPORTS", r#"
        CREATE TABLE IF NOT EXISTS external_usage_reports (
            tenant_id TEXT NOT NULL,
            capability TEXT NOT NULL,
            provider TEXT NOT NULL,
            period_start_ms INTEGER NOT NULL,
            reported_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (tenant_id, capability, provider, period_start_ms)
        );
    "#),

    // --- CONTADORES DE ADMISIÓN COMPARTIDOS ---
    ("TABLE_RATE_LIMIT_WINDOWS", r#"
        CREATE TABLE IF NOT EXISTS rate_limit_windows (
            key TEXT NOT NULL,
            scope TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            window_start_ms INTEGER NOT NULL,
            PRIMARY KEY (key, scope)
        );
    "#),
    ("TABLE_CIRCUIT_BREAKER_WINDOWS", r#"
        CREATE TABLE IF NOT EXISTS circuit_breaker_windows (
            instance_id TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0,
            window_start_ms INTEGER,
            paused_until_ms INTEGER
        );
    "#),

    // --- REGISTRO DE FLOTA ---
    ("TABLE_NODES", r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            host TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'provisioning',
            provision_stage TEXT,
            capacity_mb INTEGER NOT NULL DEFAULT 0,
            used_mb INTEGER NOT NULL DEFAULT 0,
            drain_status TEXT NOT NULL DEFAULT 'accepting',
            last_heartbeat_ms INTEGER,
            agent_version TEXT,
            secret TEXT,
            cpu_load_percentage REAL NOT NULL DEFAULT 0,
            memory_used_mb INTEGER NOT NULL DEFAULT 0,
            disk_used_mb INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_BOT_INSTANCES", r#"
        CREATE TABLE IF NOT EXISTS bot_instances (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            node_id TEXT,
            billing_state TEXT NOT NULL DEFAULT 'active',
            resource_tier TEXT NOT NULL DEFAULT 'standard',
            storage_mb INTEGER NOT NULL DEFAULT 512,
            suspended_at DATETIME,
            destroy_after DATETIME
        );
    "#),

    // --- NOTIFICACIONES ---
    ("TABLE_NOTIFICATION_QUEUE", r#"
        CREATE TABLE IF NOT EXISTS notification_queue (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            channel TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_NOTIFICATION_PREFERENCES", r#"
        CREATE TABLE IF NOT EXISTS notification_preferences (
            tenant_id TEXT PRIMARY KEY,
            preferences_json TEXT NOT NULL DEFAULT '{}'
        );
    "#),
    ("TABLE_NOTIFICATION_HISTORY", r#"
        CREATE TABLE IF NOT EXISTS notification_history (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            channel TEXT NOT NULL,
            delivered_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),

    // --- AUDITORÍA Y GOBERNANZA ---
    ("TABLE_USER_AUDIT_LOG", r#"
        CREATE TABLE IF NOT EXISTS user_audit_log (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            action TEXT NOT NULL,
            metadata_json TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_ADMIN_AUDIT_LOG", r#"
        CREATE TABLE IF NOT EXISTS admin_audit_log (
            id TEXT PRIMARY KEY,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            target_tenant TEXT,
            target_user TEXT,
            metadata_json TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_ADMIN_NOTES", r#"
        CREATE TABLE IF NOT EXISTS admin_notes (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            note TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),

    // --- SNAPSHOTS Y RESPALDOS ---
    ("TABLE_SNAPSHOTS", r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            object_key TEXT NOT NULL,
            size_mb INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_BACKUP_STATUS", r#"
        CREATE TABLE IF NOT EXISTS backup_status (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            last_backup_at DATETIME,
            status TEXT NOT NULL DEFAULT 'idle'
        );
    "#),

    // --- FACTURACIÓN EXTERNA Y ESTADO DE TENANT ---
    ("TABLE_EXTERNAL_CHARGES", r#"
        CREATE TABLE IF NOT EXISTS external_charges (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            amount_usd REAL NOT NULL,
            external_reference TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_TENANT_STATUS", r#"
        CREATE TABLE IF NOT EXISTS tenant_status (
            tenant_id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'active',
            pricing_plan TEXT NOT NULL DEFAULT 'standard',
            spend_limit_hourly_usd REAL,
            spend_limit_monthly_usd REAL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_CUSTOMER_MAPPINGS", r#"
        CREATE TABLE IF NOT EXISTS customer_mappings (
            tenant_id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),

    // --- AUTENTICACIÓN ---
    ("TABLE_USERS", r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT,
            display_name TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_SESSIONS", r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            expires_at DATETIME,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_ACCOUNTS", r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_account_id TEXT NOT NULL
        );
    "#),
    ("TABLE_VERIFICATION_TOKENS", r#"
        CREATE TABLE IF NOT EXISTS verification_tokens (
            identifier TEXT NOT NULL,
            token TEXT NOT NULL,
            expires_at DATETIME,
            PRIMARY KEY (identifier, token)
        );
    "#),
    ("TABLE_USER_ROLES", r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            user_id TEXT NOT NULL,
            role_id TEXT NOT NULL,
            PRIMARY KEY (user_id, role_id)
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas existentes se adapten a las nuevas capacidades.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- SOPORTE DE SECRETOS POR NODO Y DRENADO ---
    ("NODE_SECRET", "ALTER TABLE nodes ADD COLUMN secret TEXT"),
    ("NODE_DRAIN", "ALTER TABLE nodes ADD COLUMN drain_status TEXT DEFAULT 'accepting'"),
    // --- DURACIÓN FACTURABLE EN EVENTOS ---
    ("METER_DURATION", "ALTER TABLE meter_events ADD COLUMN duration_seconds REAL DEFAULT 0"),
    ("METER_TIER", "ALTER TABLE meter_events ADD COLUMN tier TEXT DEFAULT 'wopr'"),
    // --- TECHOS DE GASTO POR TENANT ---
    ("TENANT_HOURLY_CEILING", "ALTER TABLE tenant_status ADD COLUMN spend_limit_hourly_usd REAL"),
    ("TENANT_MONTHLY_CEILING", "ALTER TABLE tenant_status ADD COLUMN spend_limit_monthly_usd REAL"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 * Optimiza los escaneos de ventana y el despacho de flota.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    // Ancla de idempotencia del Ledger: única por tenant cuando existe.
    ("IDX_LEDGER_REFERENCE", "CREATE UNIQUE INDEX IF NOT EXISTS idx_credit_reference ON credit_transactions(tenant_id, reference_id) WHERE reference_id IS NOT NULL;"),
    ("IDX_LEDGER_TENANT", "CREATE INDEX IF NOT EXISTS idx_credit_tenant ON credit_transactions(tenant_id);"),
    ("IDX_METER_TENANT_TIME", "CREATE INDEX IF NOT EXISTS idx_meter_tenant_time ON meter_events(tenant_id, timestamp_ms);"),
    ("IDX_METER_TIME", "CREATE INDEX IF NOT EXISTS idx_meter_time ON meter_events(timestamp_ms);"),
    ("IDX_NODES_STATUS", "CREATE INDEX IF NOT EXISTS idx_nodes_status ON nodes(status);"),
    ("IDX_INSTANCES_TENANT", "CREATE INDEX IF NOT EXISTS idx_instances_tenant ON bot_instances(tenant_id);"),
    ("IDX_INSTANCES_NODE", "CREATE INDEX IF NOT EXISTS idx_instances_node ON bot_instances(node_id);"),
    ("IDX_AUDIT_ADMIN_TARGET", "CREATE INDEX IF NOT EXISTS idx_admin_audit_target ON admin_audit_log(target_tenant);"),
    ("IDX_SNAPSHOTS_TENANT", "CREATE INDEX IF NOT EXISTS idx_snapshots_tenant ON snapshots(tenant_id);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con Turso.
 */
#[instrument(skip(database_connection))]
pub async fn apply_control_plane_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V8.0...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Control Plane Ledger V8.0 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
