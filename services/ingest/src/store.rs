//! Session stores - injected persistence for audit sessions
//!
//! - `FsStore`: local key-value cache, one JSON document per session
//! - `PgStore`: hosted document store, JSONB column in Postgres
//!
//! Both treat the session as an opaque document.

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{StoreKind, StoreSettings};
use crate::error::StoreError;
use crate::session::AuditSession;

pub trait SessionStore {
    /// Insert or replace a session
    fn put(&self, session: &AuditSession) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(&self, id: Uuid) -> impl Future<Output = Result<AuditSession, StoreError>> + Send;

    /// All sessions, newest first
    fn list(&self) -> impl Future<Output = Result<Vec<AuditSession>, StoreError>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Most recent session created from identical CSV content
    fn find_by_hash(
        &self,
        content_hash: &str,
    ) -> impl Future<Output = Result<Option<AuditSession>, StoreError>> + Send;
}

// =============================================================================
// FILESYSTEM STORE
// =============================================================================

#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl SessionStore for FsStore {
    async fn put(&self, session: &AuditSession) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let bytes = serde_json::to_vec_pretty(session)?;
        let path = self.path_for(session.id);
        let tmp = path.with_extension("json.tmp");

        // Write-then-rename so readers never see a partial document
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;

        debug!(session_id = %session.id, path = %path.display(), "session saved");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<AuditSession, StoreError> {
        let bytes = match fs::read(self.path_for(id)).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list(&self) -> Result<Vec<AuditSession>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<AuditSession>(&bytes) {
                Ok(s) => sessions.push(s),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable session"),
            }
        }

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<AuditSession>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|s| s.content_hash == content_hash))
    }
}

// =============================================================================
// POSTGRES STORE
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the sessions table exists
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_sessions (
                session_id UUID PRIMARY KEY,
                content_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                document JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS audit_sessions_content_hash_idx ON audit_sessions (content_hash)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl SessionStore for PgStore {
    async fn put(&self, session: &AuditSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_sessions (session_id, content_hash, created_at, document)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id) DO UPDATE SET document = EXCLUDED.document
            "#,
        )
        .bind(session.id)
        .bind(&session.content_hash)
        .bind(session.created_at)
        .bind(Json(session))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<AuditSession, StoreError> {
        let row: Option<(Json<AuditSession>,)> =
            sqlx::query_as("SELECT document FROM audit_sessions WHERE session_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(doc,)| doc.0).ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<AuditSession>, StoreError> {
        let rows: Vec<(Json<AuditSession>,)> = sqlx::query_as(
            "SELECT document FROM audit_sessions ORDER BY created_at DESC, session_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM audit_sessions WHERE session_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<AuditSession>, StoreError> {
        let row: Option<(Json<AuditSession>,)> = sqlx::query_as(
            r#"
            SELECT document FROM audit_sessions
            WHERE content_hash = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(doc,)| doc.0))
    }
}

// =============================================================================
// CONFIGURED STORE
// =============================================================================

/// Store chosen at startup from `StoreSettings`
#[derive(Debug, Clone)]
pub enum AnyStore {
    Fs(FsStore),
    Pg(PgStore),
}

impl AnyStore {
    pub async fn open(settings: &StoreSettings) -> Result<Self, StoreError> {
        match settings.kind {
            StoreKind::Fs => Ok(AnyStore::Fs(FsStore::new(&settings.fs_dir))),
            StoreKind::Pg => {
                let db_url = settings.db_url.as_deref().ok_or_else(|| {
                    StoreError::Config("DB_URL env var missing (required for STORE_KIND=pg)".into())
                })?;
                Ok(AnyStore::Pg(PgStore::connect(db_url).await?))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AnyStore::Fs(s) => format!("fs ({})", s.dir().display()),
            AnyStore::Pg(_) => "pg".to_string(),
        }
    }
}

impl SessionStore for AnyStore {
    async fn put(&self, session: &AuditSession) -> Result<(), StoreError> {
        match self {
            AnyStore::Fs(s) => s.put(session).await,
            AnyStore::Pg(s) => s.put(session).await,
        }
    }

    async fn get(&self, id: Uuid) -> Result<AuditSession, StoreError> {
        match self {
            AnyStore::Fs(s) => s.get(id).await,
            AnyStore::Pg(s) => s.get(id).await,
        }
    }

    async fn list(&self) -> Result<Vec<AuditSession>, StoreError> {
        match self {
            AnyStore::Fs(s) => s.list().await,
            AnyStore::Pg(s) => s.list().await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        match self {
            AnyStore::Fs(s) => s.delete(id).await,
            AnyStore::Pg(s) => s.delete(id).await,
        }
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<AuditSession>, StoreError> {
        match self {
            AnyStore::Fs(s) => s.find_by_hash(content_hash).await,
            AnyStore::Pg(s) => s.find_by_hash(content_hash).await,
        }
    }
}
