//! SQLite persistence for accounts, verifications, and the property portfolio.

use std::sync::{Mutex, MutexGuard};

use homestead::accounts::{
    EmailAddress, RepositoryError, User, UserId, UserRepository, Verification, VerificationKind,
    VerificationStore,
};
use homestead::properties::{
    MaintenancePriority, MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus,
    Organization, OrganizationId, OrganizationRepository, Property, PropertyId,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id             TEXT PRIMARY KEY,
        email          TEXT NOT NULL UNIQUE,
        name           TEXT,
        email_verified INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS verifications (
        kind        TEXT NOT NULL,
        target      TEXT NOT NULL,
        code_digest TEXT NOT NULL,
        expires_at  TEXT NOT NULL,
        attempts    INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (kind, target)
    );

    CREATE TABLE IF NOT EXISTS organizations (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        owner_id   TEXT NOT NULL REFERENCES users(id),
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS properties (
        id              TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL REFERENCES organizations(id),
        name            TEXT NOT NULL,
        address         TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS maintenance_requests (
        id          TEXT PRIMARY KEY,
        property_id TEXT NOT NULL REFERENCES properties(id),
        title       TEXT NOT NULL,
        description TEXT NOT NULL,
        priority    TEXT NOT NULL,
        status      TEXT NOT NULL,
        created_at  TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_organizations_owner ON organizations(owner_id);
    CREATE INDEX IF NOT EXISTS idx_properties_organization ON properties(organization_id);
    CREATE INDEX IF NOT EXISTS idx_maintenance_property ON maintenance_requests(property_id);
";

const USER_COLUMNS: &str = "id, email, name, email_verified, created_at";

/// SQLite-backed store implementing every repository the portal needs.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// `":memory:"` gives an ephemeral database.
    pub fn open(path: &str) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(storage_error)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(storage_error)?;
        conn.execute_batch(SCHEMA).map_err(storage_error)?;
        ensure_attempts_column(&conn).map_err(storage_error)?;

        tracing::debug!(path, "database schema ensured");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

/// Databases created before attempt counting lack the `attempts` column.
fn ensure_attempts_column(conn: &Connection) -> rusqlite::Result<()> {
    let present: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info('verifications') WHERE name = 'attempts'",
        [],
        |row| row.get(0),
    )?;
    if !present {
        conn.execute(
            "ALTER TABLE verifications ADD COLUMN attempts INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

fn verification_from_row(
    kind: VerificationKind,
    target: &str,
    row: &Row<'_>,
) -> rusqlite::Result<Verification> {
    Ok(Verification {
        kind,
        target: target.to_string(),
        code_digest: row.get(0)?,
        expires_at: row.get(1)?,
        attempts: row.get(2)?,
    })
}

fn storage_error(err: rusqlite::Error) -> RepositoryError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RepositoryError::Conflict
        }
        _ => RepositoryError::Unavailable(err.to_string()),
    }
}

fn conversion_error(index: usize, message: &'static str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let email: String = row.get(1)?;
    Ok(User {
        id: UserId(row.get(0)?),
        email: EmailAddress::parse(&email).map_err(|message| conversion_error(1, message))?,
        name: row.get(2)?,
        email_verified: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn load_user(conn: &Connection, id: &UserId) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.0],
        user_from_row,
    )
    .optional()
}

fn organization_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: OrganizationId(row.get(0)?),
        name: row.get(1)?,
        owner_id: UserId(row.get(2)?),
        created_at: row.get(3)?,
    })
}

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    Ok(Property {
        id: PropertyId(row.get(0)?),
        organization_id: OrganizationId(row.get(1)?),
        name: row.get(2)?,
        address: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn maintenance_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceRequest> {
    let priority: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(MaintenanceRequest {
        id: MaintenanceRequestId(row.get(0)?),
        property_id: PropertyId(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        priority: MaintenancePriority::parse(&priority)
            .ok_or_else(|| conversion_error(4, "unknown maintenance priority"))?,
        status: MaintenanceStatus::parse(&status)
            .ok_or_else(|| conversion_error(5, "unknown maintenance status"))?,
        created_at: row.get(6)?,
    })
}

impl UserRepository for Database {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, name, email_verified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.0,
                    user.email.as_str(),
                    user.name,
                    user.email_verified,
                    user.created_at,
                ],
            )
            .map_err(storage_error)?;
        Ok(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        load_user(&self.conn(), id).map_err(storage_error)
    }

    fn find_user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email.as_str()],
                user_from_row,
            )
            .optional()
            .map_err(storage_error)
    }

    fn update_email(&self, id: &UserId, email: &EmailAddress) -> Result<User, RepositoryError> {
        let conn = self.conn();
        let updated = conn
            .execute(
                "UPDATE users SET email = ?2, email_verified = 1 WHERE id = ?1",
                params![id.0, email.as_str()],
            )
            .map_err(storage_error)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        load_user(&conn, id)
            .map_err(storage_error)?
            .ok_or(RepositoryError::NotFound)
    }

    fn mark_email_verified(&self, id: &UserId) -> Result<(), RepositoryError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE users SET email_verified = 1 WHERE id = ?1",
                params![id.0],
            )
            .map_err(storage_error)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl VerificationStore for Database {
    fn upsert_verification(&self, verification: Verification) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO verifications (kind, target, code_digest, expires_at, attempts)
                 VALUES (?1, ?2, ?3, ?4, 0)
                 ON CONFLICT (kind, target)
                 DO UPDATE SET code_digest = excluded.code_digest,
                               expires_at = excluded.expires_at,
                               attempts = 0",
                params![
                    verification.kind.as_str(),
                    verification.target,
                    verification.code_digest,
                    verification.expires_at,
                ],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    fn fetch_verification(
        &self,
        kind: VerificationKind,
        target: &str,
    ) -> Result<Option<Verification>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT code_digest, expires_at, attempts FROM verifications
                 WHERE kind = ?1 AND target = ?2",
                params![kind.as_str(), target],
                |row| verification_from_row(kind, target, row),
            )
            .optional()
            .map_err(storage_error)
    }

    fn delete_verification(
        &self,
        kind: VerificationKind,
        target: &str,
    ) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "DELETE FROM verifications WHERE kind = ?1 AND target = ?2",
                params![kind.as_str(), target],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    fn consume_verification(
        &self,
        kind: VerificationKind,
        target: &str,
        code_digest: &str,
    ) -> Result<Option<Verification>, RepositoryError> {
        self.conn()
            .query_row(
                "DELETE FROM verifications
                 WHERE kind = ?1 AND target = ?2 AND code_digest = ?3
                 RETURNING code_digest, expires_at, attempts",
                params![kind.as_str(), target, code_digest],
                |row| verification_from_row(kind, target, row),
            )
            .optional()
            .map_err(storage_error)
    }

    fn record_failed_attempt(
        &self,
        kind: VerificationKind,
        target: &str,
        max_attempts: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(storage_error)?;
        let attempts: Option<u32> = tx
            .query_row(
                "UPDATE verifications SET attempts = attempts + 1
                 WHERE kind = ?1 AND target = ?2
                 RETURNING attempts",
                params![kind.as_str(), target],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)?;
        if matches!(attempts, Some(count) if count >= max_attempts) {
            tx.execute(
                "DELETE FROM verifications WHERE kind = ?1 AND target = ?2",
                params![kind.as_str(), target],
            )
            .map_err(storage_error)?;
        }
        tx.commit().map_err(storage_error)?;
        Ok(attempts)
    }
}

impl OrganizationRepository for Database {
    fn insert_organization(
        &self,
        organization: Organization,
    ) -> Result<Organization, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO organizations (id, name, owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    organization.id.0,
                    organization.name,
                    organization.owner_id.0,
                    organization.created_at,
                ],
            )
            .map_err(storage_error)?;
        Ok(organization)
    }

    fn fetch_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT id, name, owner_id, created_at FROM organizations WHERE id = ?1",
                params![id.0],
                organization_from_row,
            )
            .optional()
            .map_err(storage_error)
    }

    fn organizations_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<Organization>, RepositoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, owner_id, created_at FROM organizations
                 WHERE owner_id = ?1 ORDER BY created_at, rowid",
            )
            .map_err(storage_error)?;
        let rows = stmt
            .query_map(params![owner.0], organization_from_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;
        Ok(rows)
    }

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO properties (id, organization_id, name, address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    property.id.0,
                    property.organization_id.0,
                    property.name,
                    property.address,
                    property.created_at,
                ],
            )
            .map_err(storage_error)?;
        Ok(property)
    }

    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT id, organization_id, name, address, created_at
                 FROM properties WHERE id = ?1",
                params![id.0],
                property_from_row,
            )
            .optional()
            .map_err(storage_error)
    }

    fn properties_for_organization(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Property>, RepositoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, organization_id, name, address, created_at FROM properties
                 WHERE organization_id = ?1 ORDER BY created_at, rowid",
            )
            .map_err(storage_error)?;
        let rows = stmt
            .query_map(params![organization.0], property_from_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;
        Ok(rows)
    }

    fn insert_maintenance_request(
        &self,
        request: MaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO maintenance_requests
                    (id, property_id, title, description, priority, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request.id.0,
                    request.property_id.0,
                    request.title,
                    request.description,
                    request.priority.as_str(),
                    request.status.as_str(),
                    request.created_at,
                ],
            )
            .map_err(storage_error)?;
        Ok(request)
    }

    /// Newest first.
    fn maintenance_requests_for_property(
        &self,
        property: &PropertyId,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, property_id, title, description, priority, status, created_at
                 FROM maintenance_requests
                 WHERE property_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(storage_error)?;
        let rows = stmt
            .query_map(params![property.0], maintenance_from_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;
        Ok(rows)
    }

    fn fetch_maintenance_request(
        &self,
        id: &MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT id, property_id, title, description, priority, status, created_at
                 FROM maintenance_requests WHERE id = ?1",
                params![id.0],
                maintenance_from_row,
            )
            .optional()
            .map_err(storage_error)
    }

    fn update_maintenance_status(
        &self,
        id: &MaintenanceRequestId,
        status: MaintenanceStatus,
    ) -> Result<(), RepositoryError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE maintenance_requests SET status = ?2 WHERE id = ?1",
                params![id.0, status.as_str()],
            )
            .map_err(storage_error)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
