use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::data::{Client, Contact, NewClient, NewContact, NewProject, NewSubscription, Project, Subscription};
use crate::error::StoreError;

/// The Library manages the SQLite content catalog.
/// It stores projects, client testimonials, contact submissions and
/// newsletter subscriptions.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

/// Record counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Counts {
    pub projects: i64,
    pub clients: i64,
    pub contacts: i64,
    pub subscriptions: i64,
}

impl Library {
    /// Open (or create) the catalog at `db_path` and initialize the schema
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        info!("Database opened at {}", db_path.display());

        let mut library = Library { conn, db_path };
        library.init_schema()?;

        Ok(library)
    }

    /// A private catalog that disappears when dropped
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let mut library = Library {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL,
                image           TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS clients (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL,
                designation     TEXT NOT NULL,
                image           TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contacts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name       TEXT NOT NULL,
                email           TEXT NOT NULL,
                mobile          TEXT NOT NULL,
                city            TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS newsletter (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_created_at ON projects(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_clients_created_at ON clients(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_contacts_created_at ON contacts(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_newsletter_created_at ON newsletter(created_at DESC);",
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Count the records in every table
    pub fn counts(&self) -> Result<Counts, StoreError> {
        let count = |table: &str| -> Result<i64, StoreError> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
        };

        Ok(Counts {
            projects: count("projects")?,
            clients: count("clients")?,
            contacts: count("contacts")?,
            subscriptions: count("newsletter")?,
        })
    }

    // ========== Projects ==========

    /// All projects, newest first
    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.query_all(
            "SELECT id, name, description, image, created_at FROM projects
             ORDER BY created_at DESC, id DESC",
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    image: row.get(3)?,
                    created_at: timestamp(row.get(4)?),
                })
            },
        )
    }

    pub fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO projects (name, description, image, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![project.name, project.description, project.image, now.timestamp_millis()],
        )?;

        Ok(Project {
            id: self.conn.last_insert_rowid(),
            name: project.name,
            description: project.description,
            image: project.image,
            created_at: truncate_to_millis(now),
        })
    }

    /// Delete a project. Returns whether a row was removed; a missing id is not an error.
    pub fn delete_project(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.conn.execute("DELETE FROM projects WHERE id = ?1", params![id])? > 0)
    }

    // ========== Clients ==========

    /// All clients, newest first
    pub fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        self.query_all(
            "SELECT id, name, description, designation, image, created_at FROM clients
             ORDER BY created_at DESC, id DESC",
            |row| {
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    designation: row.get(3)?,
                    image: row.get(4)?,
                    created_at: timestamp(row.get(5)?),
                })
            },
        )
    }

    pub fn create_client(&self, client: NewClient) -> Result<Client, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO clients (name, description, designation, image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                client.name,
                client.description,
                client.designation,
                client.image,
                now.timestamp_millis()
            ],
        )?;

        Ok(Client {
            id: self.conn.last_insert_rowid(),
            name: client.name,
            description: client.description,
            designation: client.designation,
            image: client.image,
            created_at: truncate_to_millis(now),
        })
    }

    pub fn delete_client(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.conn.execute("DELETE FROM clients WHERE id = ?1", params![id])? > 0)
    }

    // ========== Contacts ==========

    pub fn list_contacts(&self) -> Result<Vec<Contact>, StoreError> {
        self.query_all(
            "SELECT id, full_name, email, mobile, city, created_at FROM contacts
             ORDER BY created_at DESC, id DESC",
            |row| {
                Ok(Contact {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    email: row.get(2)?,
                    mobile: row.get(3)?,
                    city: row.get(4)?,
                    created_at: timestamp(row.get(5)?),
                })
            },
        )
    }

    pub fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO contacts (full_name, email, mobile, city, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                contact.full_name,
                contact.email,
                contact.mobile,
                contact.city,
                now.timestamp_millis()
            ],
        )?;

        Ok(Contact {
            id: self.conn.last_insert_rowid(),
            full_name: contact.full_name,
            email: contact.email,
            mobile: contact.mobile,
            city: contact.city,
            created_at: truncate_to_millis(now),
        })
    }

    // ========== Newsletter ==========

    pub fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.query_all(
            "SELECT id, email, created_at FROM newsletter ORDER BY created_at DESC, id DESC",
            |row| {
                Ok(Subscription {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    created_at: timestamp(row.get(2)?),
                })
            },
        )
    }

    /// Add a subscriber. Fails with [`StoreError::AlreadySubscribed`] if the email exists.
    pub fn subscribe(&self, subscription: NewSubscription) -> Result<Subscription, StoreError> {
        let now = Utc::now();
        let result = self.conn.execute(
            "INSERT INTO newsletter (email, created_at) VALUES (?1, ?2)",
            params![subscription.email, now.timestamp_millis()],
        );

        match result {
            Ok(_) => Ok(Subscription {
                id: self.conn.last_insert_rowid(),
                email: subscription.email,
                created_at: truncate_to_millis(now),
            }),
            // UNIQUE constraint on email
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::AlreadySubscribed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn query_all<T>(
        &self,
        sql: &str,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        Ok(records)
    }
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Match what a later read returns
fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    timestamp(time.timestamp_millis())
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
