// Provider configuration repository for plaud-mirror
// Handles CRUD for AI provider endpoints and the per-capability default flags

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{now_timestamp, ProviderCapability, ProviderConfig, UpsertProviderConfig};
use super::DatabaseManager;

const PROVIDER_COLUMNS: &str = r#"
    id, user_id, provider, base_url, api_key, default_model,
    is_default_transcription, is_default_enhancement, created_at, updated_at
"#;

impl DatabaseManager {
    /// Create or update a provider config.
    ///
    /// Setting a default flag clears the same flag on the user's other
    /// configs inside the same transaction.
    pub fn upsert_provider_config(&self, user_id: &str, config: &UpsertProviderConfig) -> Result<ProviderConfig> {
        self.with_connection(|conn| {
            upsert_provider_config_impl(conn, user_id, config)
        })
    }

    /// Make a config the sole default for a capability
    pub fn set_default_provider(&self, user_id: &str, id: &str, capability: ProviderCapability) -> Result<()> {
        self.with_connection(|conn| {
            set_default_provider_impl(conn, user_id, id, capability)
        })
    }

    /// Get a provider config by ID
    pub fn get_provider_config(&self, user_id: &str, id: &str) -> Result<Option<ProviderConfig>> {
        self.with_connection(|conn| {
            get_provider_config_impl(conn, user_id, id)
        })
    }

    /// All of a user's provider configs
    pub fn list_provider_configs(&self, user_id: &str) -> Result<Vec<ProviderConfig>> {
        self.with_connection(|conn| {
            let query = format!(
                "SELECT {} FROM provider_configs WHERE user_id = ? ORDER BY created_at, rowid",
                PROVIDER_COLUMNS
            );
            let mut stmt = conn.prepare(&query).context("Failed to prepare list_provider_configs query")?;
            let configs = stmt.query_map(params![user_id], row_to_provider_config)
                .context("Failed to query provider configs")?;

            configs.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect provider configs")
        })
    }

    /// Every config flagged default for a capability, most recently updated first
    pub fn default_provider_candidates(&self, user_id: &str, capability: ProviderCapability) -> Result<Vec<ProviderConfig>> {
        self.with_connection(|conn| {
            let query = format!(
                r#"
                SELECT {} FROM provider_configs
                WHERE user_id = ? AND {} = 1
                ORDER BY updated_at DESC, rowid DESC
                "#,
                PROVIDER_COLUMNS,
                capability.default_column()
            );
            let mut stmt = conn.prepare(&query).context("Failed to prepare default provider query")?;
            let configs = stmt.query_map(params![user_id], row_to_provider_config)
                .context("Failed to query default providers")?;

            configs.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect default providers")
        })
    }

    /// Delete a provider config
    pub fn delete_provider_config(&self, user_id: &str, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM provider_configs WHERE user_id = ? AND id = ?",
                params![user_id, id],
            ).context("Failed to delete provider config")?;
            Ok(())
        })
    }
}

fn row_to_provider_config(row: &Row<'_>) -> rusqlite::Result<ProviderConfig> {
    Ok(ProviderConfig {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider: row.get(2)?,
        base_url: row.get(3)?,
        api_key: row.get(4)?,
        default_model: row.get(5)?,
        is_default_transcription: row.get::<_, i32>(6)? != 0,
        is_default_enhancement: row.get::<_, i32>(7)? != 0,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn get_provider_config_impl(conn: &Connection, user_id: &str, id: &str) -> Result<Option<ProviderConfig>> {
    let query = format!(
        "SELECT {} FROM provider_configs WHERE user_id = ? AND id = ?",
        PROVIDER_COLUMNS
    );
    let result = conn.query_row(&query, params![user_id, id], row_to_provider_config);

    match result {
        Ok(config) => Ok(Some(config)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get provider config"),
    }
}

fn clear_default_flag(conn: &Connection, user_id: &str, keep_id: &str, capability: ProviderCapability) -> Result<()> {
    let sql = format!(
        "UPDATE provider_configs SET {col} = 0 WHERE user_id = ? AND id != ? AND {col} = 1",
        col = capability.default_column()
    );
    conn.execute(&sql, params![user_id, keep_id])
        .with_context(|| format!("Failed to clear {} default flags", capability))?;
    Ok(())
}

fn upsert_provider_config_impl(conn: &Connection, user_id: &str, config: &UpsertProviderConfig) -> Result<ProviderConfig> {
    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;
    let now = now_timestamp();

    let existing = match &config.id {
        Some(id) => get_provider_config_impl(&tx, user_id, id)?,
        None => None,
    };

    let id = match existing {
        Some(current) => {
            tx.execute(
                r#"
                UPDATE provider_configs SET
                    provider = ?1, base_url = ?2, api_key = ?3, default_model = ?4,
                    is_default_transcription = ?5, is_default_enhancement = ?6, updated_at = ?7
                WHERE id = ?8
                "#,
                params![
                    config.provider,
                    config.base_url,
                    config.api_key,
                    config.default_model,
                    config.is_default_transcription as i32,
                    config.is_default_enhancement as i32,
                    now,
                    current.id,
                ],
            ).context("Failed to update provider config")?;
            current.id
        }
        None => {
            let id = config.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            tx.execute(
                r#"
                INSERT INTO provider_configs (
                    id, user_id, provider, base_url, api_key, default_model,
                    is_default_transcription, is_default_enhancement, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                "#,
                params![
                    id,
                    user_id,
                    config.provider,
                    config.base_url,
                    config.api_key,
                    config.default_model,
                    config.is_default_transcription as i32,
                    config.is_default_enhancement as i32,
                    now,
                ],
            ).context("Failed to insert provider config")?;
            id
        }
    };

    if config.is_default_transcription {
        clear_default_flag(&tx, user_id, &id, ProviderCapability::Transcription)?;
    }
    if config.is_default_enhancement {
        clear_default_flag(&tx, user_id, &id, ProviderCapability::Enhancement)?;
    }

    let stored = get_provider_config_impl(&tx, user_id, &id)?
        .context("Provider config missing right after upsert")?;
    tx.commit().context("Failed to commit provider config")?;

    log::info!("Saved provider config {} ({})", stored.id, stored.provider);
    Ok(stored)
}

fn set_default_provider_impl(conn: &Connection, user_id: &str, id: &str, capability: ProviderCapability) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;

    let sql = format!(
        "UPDATE provider_configs SET {} = 1, updated_at = ? WHERE user_id = ? AND id = ?",
        capability.default_column()
    );
    let updated = tx.execute(&sql, params![now_timestamp(), user_id, id])
        .context("Failed to set default provider")?;
    if updated == 0 {
        bail!("Provider config not found: {}", id);
    }

    clear_default_flag(&tx, user_id, id, capability)?;
    tx.commit().context("Failed to commit default provider")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::create_test_db;

    fn openai(default: bool) -> UpsertProviderConfig {
        UpsertProviderConfig {
            provider: "OpenAI".to_string(),
            api_key: "sk-test".to_string(),
            default_model: Some("whisper-1".to_string()),
            is_default_transcription: default,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_default_demotes_previous() {
        let (db, user) = create_test_db();

        let first = db.upsert_provider_config(&user.id, &openai(true)).unwrap();
        let second = db.upsert_provider_config(&user.id, &UpsertProviderConfig {
            provider: "Groq".to_string(),
            ..openai(true)
        }).unwrap();

        let defaults = db.default_provider_candidates(&user.id, ProviderCapability::Transcription).unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.id);

        let first = db.get_provider_config(&user.id, &first.id).unwrap().unwrap();
        assert!(!first.is_default_transcription);
    }

    #[test]
    fn test_set_default_provider() {
        let (db, user) = create_test_db();
        let a = db.upsert_provider_config(&user.id, &openai(true)).unwrap();
        let b = db.upsert_provider_config(&user.id, &openai(false)).unwrap();

        db.set_default_provider(&user.id, &b.id, ProviderCapability::Transcription).unwrap();

        let defaults = db.default_provider_candidates(&user.id, ProviderCapability::Transcription).unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, b.id);
        assert!(!db.get_provider_config(&user.id, &a.id).unwrap().unwrap().is_default_transcription);

        assert!(db.set_default_provider(&user.id, "missing", ProviderCapability::Transcription).is_err());
    }

    #[test]
    fn test_defaults_are_per_capability() {
        let (db, user) = create_test_db();
        let transcriber = db.upsert_provider_config(&user.id, &openai(true)).unwrap();
        db.upsert_provider_config(&user.id, &UpsertProviderConfig {
            provider: "Anthropic".to_string(),
            is_default_enhancement: true,
            ..Default::default()
        }).unwrap();

        let defaults = db.default_provider_candidates(&user.id, ProviderCapability::Transcription).unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, transcriber.id);
    }

    #[test]
    fn test_update_existing_keeps_id() {
        let (db, user) = create_test_db();
        let created = db.upsert_provider_config(&user.id, &openai(false)).unwrap();

        let updated = db.upsert_provider_config(&user.id, &UpsertProviderConfig {
            id: Some(created.id.clone()),
            api_key: "sk-rotated".to_string(),
            ..openai(false)
        }).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.api_key, "sk-rotated");
        assert_eq!(db.list_provider_configs(&user.id).unwrap().len(), 1);

        db.delete_provider_config(&user.id, &created.id).unwrap();
        assert!(db.list_provider_configs(&user.id).unwrap().is_empty());
    }
}
