//! SQLite storage implementation.
//!
//! This module provides the registry's storage backend using SQLite.
//! It follows the MutationContext pattern for transaction discipline and audit logging.
//!
//! Endpoint writes that take part in an import are free functions over a
//! [`Connection`] so the import coordinator can run them inside its own
//! transaction alongside the ledger write.

use crate::error::{Error, Result};
use crate::model::{
    new_id, ApiContract, ChangelogEntry, Endpoint, HttpMethod, Lifecycle, NormalizedOperation,
};
use crate::storage::events::{insert_event, Event, EventType};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures so they can record audit events that are
/// written in the same transaction as the change itself.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (user, service account, etc.).
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor).with_comment(&self.op_name),
        );
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value)
                .with_comment(&self.op_name),
        );
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        // Dropping `tx` on an early return rolls everything back
        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;

        Ok(result)
    }

    // ===================
    // Contract Operations
    // ===================

    /// Register a new API contract.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateContract` if (name, owner team) is taken, or a database error.
    pub fn create_contract(&mut self, contract: &ApiContract, actor: &str) -> Result<()> {
        self.mutate("create_contract", actor, |tx, ctx| {
            let result = tx.execute(
                "INSERT INTO contracts (id, name, base_url, version, owner_team, lifecycle, open_api_url, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    contract.id,
                    contract.name,
                    contract.base_url,
                    contract.version,
                    contract.owner_team,
                    contract.lifecycle.as_str(),
                    contract.open_api_url,
                    contract.description,
                    contract.created_at,
                    contract.updated_at,
                ],
            );

            match result {
                Ok(_) => {
                    ctx.record_event("contract", &contract.id, EventType::ContractCreated);
                    Ok(())
                }
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(Error::DuplicateContract {
                        name: contract.name.clone(),
                        owner_team: contract.owner_team.clone(),
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Get a contract by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_contract(&self, id: &str) -> Result<Option<ApiContract>> {
        let contract = self
            .conn
            .query_row(
                "SELECT id, name, base_url, version, owner_team, lifecycle, open_api_url, description, created_at, updated_at
                 FROM contracts WHERE id = ?1",
                [id],
                map_contract_row,
            )
            .optional()?;
        Ok(contract)
    }

    /// List all contracts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_contracts(&self) -> Result<Vec<ApiContract>> {
        self.search_contracts(&ContractFilter::default())
    }

    /// List contracts matching a filter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_contracts(&self, filter: &ContractFilter) -> Result<Vec<ApiContract>> {
        let pattern = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(&q.to_lowercase())));
        let team = filter
            .owner_team
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_url, version, owner_team, lifecycle, open_api_url, description, created_at, updated_at
             FROM contracts
             WHERE (?1 IS NULL
                    OR lower(name) LIKE ?1 ESCAPE '\\'
                    OR lower(base_url) LIKE ?1 ESCAPE '\\'
                    OR lower(owner_team) LIKE ?1 ESCAPE '\\'
                    OR lower(version) LIKE ?1 ESCAPE '\\'
                    OR lower(description) LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR lifecycle = ?2)
               AND (?3 IS NULL OR lower(owner_team) = lower(?3))
             ORDER BY created_at, rowid",
        )?;
        let contracts = stmt
            .query_map(
                rusqlite::params![pattern, filter.lifecycle.map(|l| l.as_str()), team],
                map_contract_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(contracts)
    }

    /// The OpenAPI URL configured for a contract, blank values read as absent.
    ///
    /// # Errors
    ///
    /// Returns `ContractNotFound` if no contract has this ID.
    pub fn get_spec_url(&self, contract_id: &str) -> Result<Option<String>> {
        let contract = self
            .get_contract(contract_id)?
            .ok_or_else(|| Error::ContractNotFound {
                id: contract_id.to_string(),
            })?;
        Ok(contract.spec_url().map(str::to_string))
    }

    /// Set or clear the OpenAPI URL of a contract.
    ///
    /// # Errors
    ///
    /// Returns `ContractNotFound` if no contract has this ID.
    pub fn set_spec_url(&mut self, contract_id: &str, url: Option<&str>, actor: &str) -> Result<()> {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("set_spec_url", actor, |tx, ctx| {
            let old: Option<Option<String>> = tx
                .query_row(
                    "SELECT open_api_url FROM contracts WHERE id = ?1",
                    [contract_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(old) = old else {
                return Err(Error::ContractNotFound {
                    id: contract_id.to_string(),
                });
            };

            tx.execute(
                "UPDATE contracts SET open_api_url = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![url, now, contract_id],
            )?;

            ctx.record_change(
                "contract",
                contract_id,
                EventType::ContractUpdated,
                old,
                url.map(str::to_string),
            );
            Ok(())
        })
    }

    /// Move a contract to another lifecycle stage.
    ///
    /// # Errors
    ///
    /// Returns `ContractNotFound` if no contract has this ID.
    pub fn set_lifecycle(&mut self, contract_id: &str, lifecycle: Lifecycle, actor: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("set_lifecycle", actor, |tx, ctx| {
            let old: Option<String> = tx
                .query_row(
                    "SELECT lifecycle FROM contracts WHERE id = ?1",
                    [contract_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(old) = old else {
                return Err(Error::ContractNotFound {
                    id: contract_id.to_string(),
                });
            };

            tx.execute(
                "UPDATE contracts SET lifecycle = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![lifecycle.as_str(), now, contract_id],
            )?;

            ctx.record_change(
                "contract",
                contract_id,
                EventType::ContractUpdated,
                Some(old),
                Some(lifecycle.as_str().to_string()),
            );
            Ok(())
        })
    }

    // ===================
    // Endpoint Operations
    // ===================

    /// List the endpoints of a contract in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_endpoints(&self, contract_id: &str) -> Result<Vec<Endpoint>> {
        list_endpoints(&self.conn, contract_id)
    }

    /// Manually add an endpoint to a contract.
    ///
    /// # Errors
    ///
    /// Returns `ContractNotFound`, `DuplicateEndpoint`, or a database error.
    pub fn add_endpoint(
        &mut self,
        contract_id: &str,
        operation: &NormalizedOperation,
        actor: &str,
    ) -> Result<Endpoint> {
        if self.get_contract(contract_id)?.is_none() {
            return Err(Error::ContractNotFound {
                id: contract_id.to_string(),
            });
        }
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("add_endpoint", actor, |tx, ctx| {
            match create_endpoint(tx, ctx, contract_id, operation, now) {
                Err(Error::Database(rusqlite::Error::SqliteFailure(err, _)))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(Error::DuplicateEndpoint {
                        method: operation.method.to_string(),
                        path: operation.path.clone(),
                    })
                }
                other => other,
            }
        })
    }

    /// Manually remove an endpoint from a contract.
    ///
    /// # Errors
    ///
    /// Returns `EndpointNotFound` if the endpoint does not belong to the contract.
    pub fn remove_endpoint(&mut self, contract_id: &str, endpoint_id: &str, actor: &str) -> Result<()> {
        self.mutate("remove_endpoint", actor, |tx, ctx| {
            delete_endpoint(tx, ctx, contract_id, endpoint_id)
        })
    }

    // ====================
    // Changelog Operations
    // ====================

    /// Add a changelog entry outside of an import.
    ///
    /// # Errors
    ///
    /// Returns `ContractNotFound` or a database error.
    pub fn add_changelog_entry(
        &mut self,
        contract_id: &str,
        entry: &ChangelogEntry,
        actor: &str,
    ) -> Result<()> {
        if self.get_contract(contract_id)?.is_none() {
            return Err(Error::ContractNotFound {
                id: contract_id.to_string(),
            });
        }
        self.mutate("add_changelog_entry", actor, |tx, ctx| {
            insert_changelog_entry(tx, ctx, contract_id, entry)
        })
    }

    /// List changelog entries of a contract, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_changelog(&self, contract_id: &str) -> Result<Vec<ChangelogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entry_type, breaking, summary, details, released_at
             FROM changelog_entries WHERE contract_id = ?1
             ORDER BY released_at DESC, rowid DESC",
        )?;
        let entries = stmt
            .query_map([contract_id], |row| {
                Ok(ChangelogEntry {
                    id: row.get(0)?,
                    entry_type: parse_column(row, 1)?,
                    breaking: row.get(2)?,
                    summary: row.get(3)?,
                    details: row.get(4)?,
                    released_at: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

// ==========================================
// Connection-scoped writes (import apply phase)
// ==========================================

/// List the endpoints of a contract in insertion order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_endpoints(conn: &Connection, contract_id: &str) -> Result<Vec<Endpoint>> {
    let mut stmt = conn.prepare(
        "SELECT id, method, path, description, deprecated, created_at
         FROM endpoints WHERE contract_id = ?1
         ORDER BY created_at, rowid",
    )?;
    let endpoints = stmt
        .query_map([contract_id], map_endpoint_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(endpoints)
}

/// Insert a new endpoint for a contract.
///
/// # Errors
///
/// Returns a database error, including a constraint violation when the
/// (method, path) pair already exists for the contract.
pub fn create_endpoint(
    conn: &Connection,
    ctx: &mut MutationContext,
    contract_id: &str,
    operation: &NormalizedOperation,
    created_at: i64,
) -> Result<Endpoint> {
    let endpoint = Endpoint {
        id: new_id("ep"),
        method: operation.method,
        path: operation.path.clone(),
        description: operation.description.clone(),
        deprecated: operation.deprecated,
        created_at,
    };

    conn.execute(
        "INSERT INTO endpoints (id, contract_id, method, path, description, deprecated, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            endpoint.id,
            contract_id,
            endpoint.method.as_str(),
            endpoint.path,
            endpoint.description,
            endpoint.deprecated,
            endpoint.created_at,
        ],
    )?;

    ctx.record_change(
        "endpoint",
        &endpoint.id,
        EventType::EndpointCreated,
        None,
        Some(format!("{} {}", endpoint.method, endpoint.path)),
    );
    Ok(endpoint)
}

/// Overwrite the mutable fields of an endpoint. Method and path never change.
///
/// # Errors
///
/// Returns `EndpointNotFound` if the endpoint does not belong to the contract.
pub fn update_endpoint(
    conn: &Connection,
    ctx: &mut MutationContext,
    contract_id: &str,
    endpoint_id: &str,
    description: Option<&str>,
    deprecated: bool,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE endpoints SET description = ?1, deprecated = ?2
         WHERE id = ?3 AND contract_id = ?4",
        rusqlite::params![description, deprecated, endpoint_id, contract_id],
    )?;
    if updated == 0 {
        return Err(Error::EndpointNotFound {
            id: endpoint_id.to_string(),
        });
    }

    ctx.record_event("endpoint", endpoint_id, EventType::EndpointUpdated);
    Ok(())
}

/// Delete an endpoint of a contract.
///
/// # Errors
///
/// Returns `EndpointNotFound` if the endpoint does not belong to the contract.
pub fn delete_endpoint(
    conn: &Connection,
    ctx: &mut MutationContext,
    contract_id: &str,
    endpoint_id: &str,
) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM endpoints WHERE id = ?1 AND contract_id = ?2",
        rusqlite::params![endpoint_id, contract_id],
    )?;
    if deleted == 0 {
        return Err(Error::EndpointNotFound {
            id: endpoint_id.to_string(),
        });
    }

    ctx.record_event("endpoint", endpoint_id, EventType::EndpointDeleted);
    Ok(())
}

/// Insert a changelog entry for a contract.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_changelog_entry(
    conn: &Connection,
    ctx: &mut MutationContext,
    contract_id: &str,
    entry: &ChangelogEntry,
) -> Result<()> {
    conn.execute(
        "INSERT INTO changelog_entries (id, contract_id, entry_type, breaking, summary, details, released_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            entry.id,
            contract_id,
            entry.entry_type.as_str(),
            entry.breaking,
            entry.summary,
            entry.details,
            entry.released_at,
        ],
    )?;

    ctx.record_event("changelog", &entry.id, EventType::ChangelogAdded);
    Ok(())
}

/// Criteria for [`SqliteStorage::search_contracts`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    /// Case-insensitive substring of name, base URL, owner team, version or description
    pub query: Option<String>,
    pub lifecycle: Option<Lifecycle>,
    /// Exact owner team, ignoring case
    pub owner_team: Option<String>,
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Read a text column and parse it into one of the model's enums.
pub(crate) fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

// Helper to map contract rows
fn map_contract_row(row: &rusqlite::Row) -> rusqlite::Result<ApiContract> {
    Ok(ApiContract {
        id: row.get(0)?,
        name: row.get(1)?,
        base_url: row.get(2)?,
        version: row.get(3)?,
        owner_team: row.get(4)?,
        lifecycle: parse_column(row, 5)?,
        open_api_url: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

// Helper to map endpoint rows
fn map_endpoint_row(row: &rusqlite::Row) -> rusqlite::Result<Endpoint> {
    Ok(Endpoint {
        id: row.get(0)?,
        method: parse_column::<HttpMethod>(row, 1)?,
        path: row.get(2)?,
        description: row.get(3)?,
        deprecated: row.get(4)?,
        created_at: row.get(5)?,
    })
}
