//! Core domain logic for the landmark registry.
//! This crate is the single source of truth for landmark invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod privilege;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::landmark::{Landmark, LandmarkId, LandmarkValidationError};
pub use privilege::{parse_privilege, LandmarkOperation, Privilege, PrivilegeError};
pub use repo::landmark_repo::{LandmarkRepository, LandmarkSearch, SqliteLandmarkRepository};
pub use repo::setting_repo::{SettingRepository, SqliteSettingRepository};
pub use repo::{RepoError, RepoResult};
pub use service::landmark_service::{
    LandmarkService, LandmarkServiceError, ServiceResult, ADDRESS_TEMPLATE_SETTING_KEY,
    DEFAULT_ADDRESS_TEMPLATE,
};

/// Service wired to SQLite stores sharing one connection.
pub type SqliteLandmarkService<'conn> =
    LandmarkService<SqliteLandmarkRepository<'conn>, SqliteSettingRepository<'conn>>;

/// Builds a SQLite-backed service over a migrated connection.
pub fn sqlite_service(conn: &rusqlite::Connection) -> RepoResult<SqliteLandmarkService<'_>> {
    Ok(LandmarkService::new(
        SqliteLandmarkRepository::try_new(conn)?,
        SqliteSettingRepository::try_new(conn)?,
    ))
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, sqlite_service};
    use crate::db::open_db_in_memory;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn sqlite_service_wires_over_migrated_connection() {
        let conn = open_db_in_memory().unwrap();
        let service = sqlite_service(&conn).unwrap();
        assert!(service.get_all_landmarks().unwrap().is_empty());
    }

    #[test]
    fn sqlite_service_rejects_unmigrated_connection() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        assert!(sqlite_service(&conn).is_err());
    }
}
