//! Global key/value settings store.
//!
//! Backs configuration values such as the address template. Values are
//! opaque strings; keys are restricted to `[A-Za-z0-9_.-]`.

use super::{ensure_table_ready, RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};

static SETTING_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid setting key regex"));

/// Repository interface for global settings.
pub trait SettingRepository {
    /// Returns the stored value, `None` when the key was never set.
    fn get_setting(&self, key: &str) -> RepoResult<Option<String>>;
    /// Inserts or replaces the value for `key`.
    fn set_setting(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed settings repository over `global_properties`.
pub struct SqliteSettingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "global_properties",
            &["property", "property_value", "updated_at"],
        )?;
        Ok(Self { conn })
    }
}

impl SettingRepository for SqliteSettingRepository<'_> {
    fn get_setting(&self, key: &str) -> RepoResult<Option<String>> {
        ensure_valid_key(key)?;
        let value: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT property_value
                 FROM global_properties
                 WHERE property = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    fn set_setting(&self, key: &str, value: &str) -> RepoResult<()> {
        ensure_valid_key(key)?;
        self.conn.execute(
            "INSERT INTO global_properties (property, property_value)
             VALUES (?1, ?2)
             ON CONFLICT(property) DO UPDATE SET
                property_value = excluded.property_value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

fn ensure_valid_key(key: &str) -> RepoResult<()> {
    if SETTING_KEY_RE.is_match(key) {
        Ok(())
    } else {
        Err(RepoError::InvalidSettingKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingRepository, SqliteSettingRepository};
    use crate::db::open_db_in_memory;
    use crate::repo::RepoError;

    #[test]
    fn missing_key_reads_as_none() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSettingRepository::try_new(&conn).unwrap();
        assert_eq!(repo.get_setting("layout.address.format").unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSettingRepository::try_new(&conn).unwrap();
        repo.set_setting("locale.default", "en").unwrap();
        repo.set_setting("locale.default", "fr").unwrap();
        assert_eq!(
            repo.get_setting("locale.default").unwrap().as_deref(),
            Some("fr")
        );
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSettingRepository::try_new(&conn).unwrap();
        let err = repo.set_setting("bad key", "x").unwrap_err();
        assert!(matches!(err, RepoError::InvalidSettingKey(ref key) if key == "bad key"));
        assert!(repo.get_setting("").is_err());
    }
}
