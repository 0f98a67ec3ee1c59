//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the [`Storage`] and
//! [`ServiceCatalog`] traits.

use crate::record::{Form, Service};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ServiceCatalog, Storage, StorageError, StorageResult};
use crate::storage::{RunCounts, RunRecord, RunStatus, ServiceFilter};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const SERVICE_COLUMNS: &str = "id, title, prerequisites, required_documents, fees, legal_basis, \
     is_digital_service, responsible_office, source_url";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, seed_url, status, \
     links_total, attempted, persisted, skipped, persist_failures";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_services(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<Vec<Service>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut services = stmt
            .query_map(params, service_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for service in &mut services {
            if let Some(id) = service.id {
                service.forms = load_forms(&self.conn, id)?;
            }
        }

        Ok(services)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, seed_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, seed_url, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, seed_url, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, links_total = ?3, attempted = ?4,
                persisted = ?5, skipped = ?6, persist_failures = ?7
             WHERE id = ?8",
            params![
                status.to_db_string(),
                now,
                counts.links_total as i64,
                counts.attempted as i64,
                counts.persisted as i64,
                counts.skipped as i64,
                counts.persist_failures as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn find_latest_run(
        &self,
        config_hash: &str,
        seed_url: &str,
    ) -> StorageResult<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM runs WHERE config_hash = ?1 AND seed_url = ?2 ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&sql, params![config_hash, seed_url], run_from_row)
            .optional()?;
        Ok(run)
    }

    fn reopen_run(&mut self, run_id: i64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = NULL WHERE id = ?2",
            params![RunStatus::Running.to_db_string(), run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn persisted_source_urls(&self, run_id: i64) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT source_url FROM services WHERE run_id = ?1")?;
        let urls = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    // ===== Records =====

    fn insert_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64> {
        insert_service_row(&self.conn, service, run_id)
    }

    fn insert_form(&mut self, form: &Form, service_id: i64) -> StorageResult<i64> {
        insert_form_row(&self.conn, form, service_id)
    }

    fn persist_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;

        let service_id = insert_service_row(&tx, service, run_id)?;
        for form in &service.forms {
            insert_form_row(&tx, form, service_id)?;
        }

        tx.commit()?;
        Ok(service_id)
    }
}

impl ServiceCatalog for SqliteStorage {
    // ===== Runs =====

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    // ===== Services =====

    fn get_service(&self, service_id: i64) -> StorageResult<Service> {
        let sql = format!("SELECT {} FROM services WHERE id = ?1", SERVICE_COLUMNS);
        let mut service = self
            .conn
            .query_row(&sql, params![service_id], service_from_row)
            .optional()?
            .ok_or(StorageError::ServiceNotFound(service_id))?;

        service.forms = load_forms(&self.conn, service_id)?;
        Ok(service)
    }

    fn get_forms(&self, service_id: i64) -> StorageResult<Vec<Form>> {
        load_forms(&self.conn, service_id)
    }

    fn list_services(&self, offset: u64, limit: u64) -> StorageResult<Vec<Service>> {
        let sql = format!(
            "SELECT {} FROM services ORDER BY id LIMIT ?1 OFFSET ?2",
            SERVICE_COLUMNS
        );
        self.load_services(&sql, params![limit as i64, offset as i64])
    }

    fn find_services(&self, filter: &ServiceFilter) -> StorageResult<Vec<Service>> {
        let sql = format!(
            "SELECT {} FROM services
             WHERE (?1 IS NULL OR is_digital_service = ?1)
               AND (?2 IS NULL OR responsible_office = ?2)
             ORDER BY id",
            SERVICE_COLUMNS
        );
        self.load_services(
            &sql,
            params![filter.is_digital_service, filter.responsible_office],
        )
    }

    fn set_service_attributes(
        &mut self,
        service_id: i64,
        is_digital_service: Option<bool>,
        responsible_office: Option<&str>,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE services SET is_digital_service = ?1, responsible_office = ?2 WHERE id = ?3",
            params![is_digital_service, responsible_office, service_id],
        )?;

        if updated == 0 {
            return Err(StorageError::ServiceNotFound(service_id));
        }
        Ok(())
    }

    fn delete_service(&mut self, service_id: i64) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM services WHERE id = ?1", params![service_id])?;
        Ok(deleted > 0)
    }

    // ===== Statistics =====

    fn count_services(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM services", [])
    }

    fn count_forms(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM forms", [])
    }

    fn count_services_without_forms(&self) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM services s
             WHERE NOT EXISTS (SELECT 1 FROM forms f WHERE f.service_id = s.id)",
            [],
        )
    }

    fn count_services_with_fees(&self, fees: &str) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM services WHERE fees = ?1",
            params![fees],
        )
    }
}

fn insert_service_row(
    conn: &Connection,
    service: &Service,
    run_id: Option<i64>,
) -> StorageResult<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO services (title, prerequisites, required_documents, fees, legal_basis,
            is_digital_service, responsible_office, source_url, run_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            service.title,
            service.prerequisites,
            service.required_documents,
            service.fees,
            service.legal_basis,
            service.is_digital_service,
            service.responsible_office,
            service.source_url,
            run_id,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_form_row(conn: &Connection, form: &Form, service_id: i64) -> StorageResult<i64> {
    conn.execute(
        "INSERT INTO forms (service_id, title, url) VALUES (?1, ?2, ?3)",
        params![service_id, form.title, form.url],
    )?;
    Ok(conn.last_insert_rowid())
}

fn load_forms(conn: &Connection, service_id: i64) -> StorageResult<Vec<Form>> {
    let mut stmt =
        conn.prepare("SELECT id, title, url FROM forms WHERE service_id = ?1 ORDER BY id")?;

    let forms = stmt
        .query_map(params![service_id], |row| {
            Ok(Form {
                id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(forms)
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> StorageResult<u64> {
    let count: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(count as u64)
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        title: row.get(1)?,
        prerequisites: row.get(2)?,
        required_documents: row.get(3)?,
        fees: row.get(4)?,
        legal_basis: row.get(5)?,
        is_digital_service: row.get(6)?,
        responsible_office: row.get(7)?,
        source_url: row.get(8)?,
        forms: Vec::new(),
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        seed_url: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        counts: RunCounts {
            links_total: row.get::<_, i64>(6)? as u64,
            attempted: row.get::<_, i64>(7)? as u64,
            persisted: row.get::<_, i64>(8)? as u64,
            skipped: row.get::<_, i64>(9)? as u64,
            persist_failures: row.get::<_, i64>(10)? as u64,
        },
    })
}
