// Users repository for plaud-mirror
// Handles users and the Plaud account connection each one syncs from

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::models::{now_timestamp, PlaudConnection, User};
use super::DatabaseManager;

impl DatabaseManager {
    /// Get a user by email, creating it on first use
    pub fn get_or_create_user(&self, email: &str) -> Result<User> {
        self.with_connection(|conn| {
            if let Some(user) = get_user_by_email_impl(conn, email)? {
                return Ok(user);
            }
            create_user_impl(conn, email)
        })
    }

    /// Get a user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_connection(|conn| {
            get_user_by_email_impl(conn, email)
        })
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_connection(|conn| {
            get_user_impl(conn, id)
        })
    }

    /// Store (or replace) the Plaud credential for a user
    pub fn upsert_plaud_connection(
        &self,
        user_id: &str,
        bearer_token: &str,
        server: &str,
        device_sn: Option<&str>,
    ) -> Result<PlaudConnection> {
        self.with_connection(|conn| {
            upsert_plaud_connection_impl(conn, user_id, bearer_token, server, device_sn)?;
            get_plaud_connection_impl(conn, user_id)?
                .context("Plaud connection missing right after upsert")
        })
    }

    /// Get the Plaud credential for a user
    pub fn get_plaud_connection(&self, user_id: &str) -> Result<Option<PlaudConnection>> {
        self.with_connection(|conn| {
            get_plaud_connection_impl(conn, user_id)
        })
    }
}

fn create_user_impl(conn: &Connection, email: &str) -> Result<User> {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        created_at: now_timestamp(),
    };

    conn.execute(
        "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
        params![user.id, user.email, user.created_at],
    ).context("Failed to create user")?;

    log::info!("Created user {} ({})", user.id, user.email);
    Ok(user)
}

fn get_user_by_email_impl(conn: &Connection, email: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, email, created_at FROM users WHERE email = ?",
        params![email],
        |row| Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: row.get(2)?,
        }),
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get user by email"),
    }
}

fn get_user_impl(conn: &Connection, id: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, email, created_at FROM users WHERE id = ?",
        params![id],
        |row| Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: row.get(2)?,
        }),
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get user"),
    }
}

fn upsert_plaud_connection_impl(
    conn: &Connection,
    user_id: &str,
    bearer_token: &str,
    server: &str,
    device_sn: Option<&str>,
) -> Result<()> {
    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO plaud_connections (user_id, bearer_token, server, device_sn, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ON CONFLICT(user_id) DO UPDATE SET
            bearer_token = excluded.bearer_token,
            server = excluded.server,
            device_sn = excluded.device_sn,
            updated_at = excluded.updated_at
        "#,
        params![user_id, bearer_token, server, device_sn, now],
    ).context("Failed to upsert Plaud connection")?;

    Ok(())
}

fn get_plaud_connection_impl(conn: &Connection, user_id: &str) -> Result<Option<PlaudConnection>> {
    let result = conn.query_row(
        r#"
        SELECT user_id, bearer_token, server, device_sn, created_at, updated_at
        FROM plaud_connections WHERE user_id = ?
        "#,
        params![user_id],
        |row| Ok(PlaudConnection {
            user_id: row.get(0)?,
            bearer_token: row.get(1)?,
            server: row.get(2)?,
            device_sn: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        }),
    );

    match result {
        Ok(connection) => Ok(Some(connection)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get Plaud connection"),
    }
}
