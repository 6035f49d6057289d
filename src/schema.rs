//! Idempotent schema bootstrap.
//!
//! Runs at every startup: creates the five tables when absent and patches
//! columns that older deployments may be missing. Best-effort by design; a
//! migration framework is deliberately not used here.

use crate::db::DbPool;
use sea_orm::{ConnectionTrait, DatabaseBackend, DbErr, Statement};
use tracing::{info, warn};

/// Ensures all tables exist and legacy tables carry the current column set.
pub async fn bootstrap_schema(db: &DbPool) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    for sql in create_table_statements(backend) {
        db.execute(Statement::from_string(backend, sql)).await?;
    }

    // Columns added after the first deployments shipped.
    ensure_column(db, "operations", "medicine_id", "medicine_id INTEGER REFERENCES medicines(id) ON DELETE SET NULL").await?;
    ensure_column(db, "operations", "location_id", "location_id INTEGER REFERENCES locations(id) ON DELETE SET NULL").await?;
    ensure_column(db, "medicines", "atc_code", "atc_code VARCHAR(20)").await?;

    // Early schemas declared GTIN and SKU unique; duplicates are legitimate
    // (same product on several markets), so the constraints must go.
    if backend == DatabaseBackend::Postgres {
        drop_legacy_unique_constraint(db, "medicines", "gtin").await;
        drop_legacy_unique_constraint(db, "medicines", "sku").await;
    }

    info!("schema bootstrap complete");
    Ok(())
}

fn identity_column(backend: DatabaseBackend) -> &'static str {
    match backend {
        DatabaseBackend::Postgres => "id SERIAL PRIMARY KEY",
        DatabaseBackend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        _ => "id INTEGER PRIMARY KEY",
    }
}

fn create_table_statements(backend: DatabaseBackend) -> Vec<String> {
    let id = identity_column(backend);
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS companies (
                {id},
                gln VARCHAR(20),
                name_short VARCHAR(50) NOT NULL,
                name_full VARCHAR(100) NOT NULL,
                gcp_compliant BOOLEAN NOT NULL DEFAULT FALSE,
                registration_country VARCHAR(50),
                address VARCHAR(200),
                type VARCHAR(50)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS medicines (
                {id},
                owned_by INTEGER,
                name VARCHAR(50) NOT NULL,
                gtin VARCHAR(20) NOT NULL,
                sku VARCHAR(20) NOT NULL,
                market VARCHAR(20) NOT NULL,
                shared BOOLEAN NOT NULL DEFAULT FALSE,
                batch_number VARCHAR(50) NOT NULL,
                expiration_date DATE NOT NULL,
                dosage_form VARCHAR(50) NOT NULL,
                active_ingredient VARCHAR(100) NOT NULL,
                package_size VARCHAR(50) NOT NULL,
                atc_code VARCHAR(20),
                created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (owned_by) REFERENCES companies(id) ON DELETE SET NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS locations (
                {id},
                owned_by INTEGER,
                gln VARCHAR(20),
                country VARCHAR(50),
                address VARCHAR(200) NOT NULL,
                role VARCHAR(50),
                name_short VARCHAR(50),
                name_full VARCHAR(100),
                created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (owned_by) REFERENCES companies(id) ON DELETE SET NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS operations (
                {id},
                medicine_id INTEGER,
                location_id INTEGER,
                operation_type VARCHAR(50) NOT NULL,
                operation_date TIMESTAMP NOT NULL,
                quantity INTEGER NOT NULL,
                created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (medicine_id) REFERENCES medicines(id) ON DELETE SET NULL,
                FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE SET NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS users (
                {id},
                login VARCHAR(20) NOT NULL UNIQUE,
                password_hash VARCHAR(200) NOT NULL,
                role VARCHAR(20) NOT NULL,
                first_name VARCHAR(50),
                last_name VARCHAR(50),
                email VARCHAR(100)
            )"
        ),
    ]
}

/// Adds a column when the table predates it.
///
/// Postgres is asked via `information_schema`; on SQLite the ALTER is simply
/// attempted and a duplicate-column failure ignored.
async fn ensure_column(
    db: &DbPool,
    table: &str,
    column: &str,
    column_ddl: &str,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let alter = format!("ALTER TABLE {table} ADD COLUMN {column_ddl}");

    match backend {
        DatabaseBackend::Postgres => {
            let probe = Statement::from_sql_and_values(
                backend,
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_name = $1 AND column_name = $2",
                [table.into(), column.into()],
            );
            if db.query_one(probe).await?.is_none() {
                info!(table, column, "adding missing column");
                db.execute(Statement::from_string(backend, alter)).await?;
            }
        }
        _ => {
            if let Err(e) = db.execute(Statement::from_string(backend, alter)).await {
                let msg = e.to_string().to_lowercase();
                if !msg.contains("duplicate column") {
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

/// Drops a leftover UNIQUE constraint whose name mentions `column`.
/// Failures are logged and ignored; the bootstrap must not block startup.
async fn drop_legacy_unique_constraint(db: &DbPool, table: &str, column: &str) {
    let backend = db.get_database_backend();
    let probe = Statement::from_sql_and_values(
        backend,
        "SELECT constraint_name FROM information_schema.table_constraints \
         WHERE table_name = $1 AND constraint_type = 'UNIQUE' AND constraint_name LIKE $2",
        [table.into(), format!("%{column}%").into()],
    );

    let row = match db.query_one(probe).await {
        Ok(row) => row,
        Err(e) => {
            warn!(table, column, error = %e, "constraint probe failed");
            return;
        }
    };

    if let Some(row) = row {
        if let Ok(name) = row.try_get::<String>("", "constraint_name") {
            let drop = format!("ALTER TABLE {table} DROP CONSTRAINT {name}");
            if let Err(e) = db.execute(Statement::from_string(backend, drop)).await {
                warn!(table, constraint = %name, error = %e, "failed to drop legacy constraint");
            }
        }
    }
}
