//! Landmark store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist landmarks and expose one named query per access pattern.
//! - Keep filtering, ordering and pagination rules inside the store.
//!
//! # Invariants
//! - Lists order by `name ASC, id ASC`; `list_landmarks(true)` puts active
//!   rows before retired ones.
//! - Prefix search folds case with Unicode rules on both sides and treats
//!   `%`/`_` literally.
//! - `save_landmark` returns the row as read back from storage.

use super::{bool_to_int, ensure_table_ready, RepoError, RepoResult};
use crate::db::{fold_case, register_sql_functions};
use crate::model::landmark::{Landmark, LandmarkId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const LANDMARK_SELECT_SQL: &str = "SELECT
    id,
    uuid,
    name,
    latitude,
    longitude,
    parent_id,
    retired,
    retire_reason,
    created_at,
    updated_at
FROM landmarks";

const LANDMARK_COLUMNS: &[&str] = &[
    "id",
    "uuid",
    "name",
    "latitude",
    "longitude",
    "parent_id",
    "retired",
    "retire_reason",
    "created_at",
    "updated_at",
];

/// Name-prefix search with optional pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandmarkSearch {
    /// Blank or `None` matches every name.
    pub name_prefix: Option<String>,
    pub include_retired: bool,
    /// Rows to skip; `None` starts at the first row.
    pub offset: Option<u32>,
    /// Maximum rows; `None` or `0` returns everything remaining.
    pub limit: Option<u32>,
}

impl LandmarkSearch {
    /// Unpaginated search over active landmarks.
    pub fn prefix(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: Some(name_prefix.into()),
            ..Self::default()
        }
    }
}

/// Repository interface for landmark persistence.
pub trait LandmarkRepository {
    /// Inserts when `id` is `None`, otherwise overwrites the mutable fields.
    fn save_landmark(&self, landmark: &Landmark) -> RepoResult<Landmark>;
    fn get_landmark(&self, id: LandmarkId) -> RepoResult<Option<Landmark>>;
    /// Exact match; the lowest id wins when names repeat.
    fn get_landmark_by_name(&self, name: &str) -> RepoResult<Option<Landmark>>;
    fn get_landmark_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<Landmark>>;
    fn list_landmarks(&self, include_retired: bool) -> RepoResult<Vec<Landmark>>;
    fn search_landmarks(&self, query: &LandmarkSearch) -> RepoResult<Vec<Landmark>>;
    fn count_landmarks(&self, name_prefix: Option<&str>, include_retired: bool)
        -> RepoResult<u64>;
    fn list_root_landmarks(&self, include_retired: bool) -> RepoResult<Vec<Landmark>>;
    fn list_child_landmarks(
        &self,
        parent_id: LandmarkId,
        include_retired: bool,
    ) -> RepoResult<Vec<Landmark>>;
    /// Returns whether a landmark other than `exclude_id` has exactly `name`.
    fn name_taken(&self, name: &str, exclude_id: Option<LandmarkId>) -> RepoResult<bool>;
    /// Permanently removes the row. Fails on foreign-key references.
    fn delete_landmark(&self, id: LandmarkId) -> RepoResult<()>;
}

/// SQLite-backed landmark repository.
pub struct SqliteLandmarkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLandmarkRepository<'conn> {
    /// Creates repository from a migrated connection.
    ///
    /// Registers the fold function so connections opened outside
    /// `open_db` can search too.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "landmarks", LANDMARK_COLUMNS)?;
        register_sql_functions(conn)?;
        Ok(Self { conn })
    }

    fn insert(&self, landmark: &Landmark) -> RepoResult<LandmarkId> {
        self.conn.execute(
            "INSERT INTO landmarks (
                uuid,
                name,
                latitude,
                longitude,
                parent_id,
                retired,
                retire_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                landmark.uuid.to_string(),
                landmark.name.as_str(),
                landmark.latitude.as_deref(),
                landmark.longitude.as_deref(),
                landmark.parent_id,
                bool_to_int(landmark.retired),
                landmark.retire_reason.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: LandmarkId, landmark: &Landmark) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE landmarks
             SET
                name = ?2,
                latitude = ?3,
                longitude = ?4,
                parent_id = ?5,
                retired = ?6,
                retire_reason = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                landmark.name.as_str(),
                landmark.latitude.as_deref(),
                landmark.longitude.as_deref(),
                landmark.parent_id,
                bool_to_int(landmark.retired),
                landmark.retire_reason.as_deref(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn query_one(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Option<Landmark>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_landmark_row(row)?));
        }
        Ok(None)
    }

    fn query_many(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Landmark>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut landmarks = Vec::new();
        while let Some(row) = rows.next()? {
            landmarks.push(parse_landmark_row(row)?);
        }
        Ok(landmarks)
    }
}

impl LandmarkRepository for SqliteLandmarkRepository<'_> {
    fn save_landmark(&self, landmark: &Landmark) -> RepoResult<Landmark> {
        landmark.validate()?;

        let id = match landmark.id {
            Some(id) => {
                self.update(id, landmark)?;
                id
            }
            None => self.insert(landmark)?,
        };

        self.get_landmark(id)?.ok_or(RepoError::NotFound(id))
    }

    fn get_landmark(&self, id: LandmarkId) -> RepoResult<Option<Landmark>> {
        self.query_one(
            &format!("{LANDMARK_SELECT_SQL} WHERE id = ?1;"),
            vec![Value::Integer(id)],
        )
    }

    fn get_landmark_by_name(&self, name: &str) -> RepoResult<Option<Landmark>> {
        self.query_one(
            &format!("{LANDMARK_SELECT_SQL} WHERE name = ?1 ORDER BY id ASC LIMIT 1;"),
            vec![Value::Text(name.to_string())],
        )
    }

    fn get_landmark_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<Landmark>> {
        self.query_one(
            &format!("{LANDMARK_SELECT_SQL} WHERE uuid = ?1;"),
            vec![Value::Text(uuid.to_string())],
        )
    }

    fn list_landmarks(&self, include_retired: bool) -> RepoResult<Vec<Landmark>> {
        let sql = if include_retired {
            format!("{LANDMARK_SELECT_SQL} ORDER BY retired ASC, name ASC, id ASC;")
        } else {
            format!("{LANDMARK_SELECT_SQL} WHERE retired = 0 ORDER BY name ASC, id ASC;")
        };
        self.query_many(&sql, Vec::new())
    }

    fn search_landmarks(&self, query: &LandmarkSearch) -> RepoResult<Vec<Landmark>> {
        let (filter, mut bind_values) =
            search_filter(query.name_prefix.as_deref(), query.include_retired);
        let mut sql = format!("{LANDMARK_SELECT_SQL}{filter} ORDER BY name ASC, id ASC");

        let offset = query.offset.unwrap_or(0);
        match query.limit.filter(|limit| *limit > 0) {
            Some(limit) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            None if offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            None => {}
        }

        self.query_many(&sql, bind_values)
    }

    fn count_landmarks(
        &self,
        name_prefix: Option<&str>,
        include_retired: bool,
    ) -> RepoResult<u64> {
        let (filter, bind_values) = search_filter(name_prefix, include_retired);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM landmarks{filter};"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative landmark count `{count}`")))
    }

    fn list_root_landmarks(&self, include_retired: bool) -> RepoResult<Vec<Landmark>> {
        let sql = if include_retired {
            format!("{LANDMARK_SELECT_SQL} WHERE parent_id IS NULL ORDER BY name ASC, id ASC;")
        } else {
            format!(
                "{LANDMARK_SELECT_SQL}
                 WHERE parent_id IS NULL
                   AND retired = 0
                 ORDER BY name ASC, id ASC;"
            )
        };
        self.query_many(&sql, Vec::new())
    }

    fn list_child_landmarks(
        &self,
        parent_id: LandmarkId,
        include_retired: bool,
    ) -> RepoResult<Vec<Landmark>> {
        self.query_many(
            &format!(
                "{LANDMARK_SELECT_SQL}
                 WHERE parent_id = ?1
                   AND (?2 = 1 OR retired = 0)
                 ORDER BY name ASC, id ASC;"
            ),
            vec![
                Value::Integer(parent_id),
                Value::Integer(bool_to_int(include_retired)),
            ],
        )
    }

    fn name_taken(&self, name: &str, exclude_id: Option<LandmarkId>) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM landmarks
                WHERE name = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![name, exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }

    fn delete_landmark(&self, id: LandmarkId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM landmarks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

/// Builds the shared `WHERE` clause for search and count.
fn search_filter(name_prefix: Option<&str>, include_retired: bool) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut bind_values = Vec::new();

    if let Some(prefix) = name_prefix.filter(|value| !value.trim().is_empty()) {
        clauses.push("landmark_fold(name) LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(format!("{}%", escape_like(&fold_case(prefix)))));
    }
    if !include_retired {
        clauses.push("retired = 0");
    }

    if clauses.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn parse_landmark_row(row: &Row<'_>) -> RepoResult<Landmark> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in landmarks.uuid"))
    })?;

    let retired = match row.get::<_, i64>("retired")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid retired value `{other}` in landmarks.retired"
            )));
        }
    };

    Ok(Landmark {
        id: Some(row.get("id")?),
        uuid,
        name: row.get("name")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        parent_id: row.get("parent_id")?,
        retired,
        retire_reason: row.get("retire_reason")?,
        created_at: Some(row.get("created_at")?),
        updated_at: Some(row.get("updated_at")?),
    })
}
