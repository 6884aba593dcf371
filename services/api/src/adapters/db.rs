//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `StorageService` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use quran_tracker_core::domain::{
    AuthSession, AyahKey, BookmarkSet, CustomVerse, User, UserCredentials, UserProgress,
};
use quran_tracker_core::ports::{PortError, PortResult, StorageService};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StorageService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies any pending embedded migrations. Called once at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Decodes stored `"<surah>:<ayah>"` strings, dropping anything unparsable.
/// The domain only ever writes valid keys; a bad row is logged, not fatal.
fn decode_keys(raw: Vec<String>) -> std::collections::BTreeSet<AyahKey> {
    raw.into_iter()
        .filter_map(|s| match s.parse::<AyahKey>() {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Skipping malformed ayah key in storage: {e}");
                None
            }
        })
        .collect()
}

fn encode_keys<'a>(keys: impl IntoIterator<Item = &'a AyahKey>) -> Vec<String> {
    keys.into_iter().map(|k| k.to_string()).collect()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    username: String,
    email: String,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    username: String,
    email: String,
    streak: i32,
    read_ayahs: Vec<String>,
    last_read_date: Option<NaiveDate>,
    last_fatiha_date: Option<NaiveDate>,
}

impl ProgressRecord {
    fn to_domain(self) -> UserProgress {
        UserProgress {
            username: self.username,
            email: self.email,
            streak: self.streak.max(0) as u32,
            read_ayahs: decode_keys(self.read_ayahs),
            last_read_date: self.last_read_date,
            last_fatiha_date: self.last_fatiha_date,
        }
    }
}

#[derive(FromRow)]
struct CustomVerseRecord {
    surah: i32,
    ayah: i32,
    text: String,
}

impl CustomVerseRecord {
    fn to_domain(self) -> Option<CustomVerse> {
        let key = AyahKey::new(self.surah.max(0) as u32, self.ayah.max(0) as u32).ok()?;
        Some(CustomVerse {
            key,
            text: self.text,
        })
    }
}

//=========================================================================================
// `StorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StorageService for DbAdapter {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, username, email, hashed_password)
             VALUES ($1, $2, $3, $4)
             RETURNING user_id, username, email",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, username, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, username, email FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        let session = record.map(AuthSessionRecord::to_domain).ok_or(PortError::Unauthorized)?;
        if session.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(session.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_progress(&self, user_id: Uuid) -> PortResult<Option<UserProgress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT username, email, streak, read_ayahs, last_read_date, last_fatiha_date
             FROM progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(ProgressRecord::to_domain))
    }

    async fn put_progress(&self, user_id: Uuid, progress: &UserProgress) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO progress
                 (user_id, username, email, streak, read_ayahs, last_read_date, last_fatiha_date, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, now())
             ON CONFLICT (user_id) DO UPDATE SET
                 username = EXCLUDED.username,
                 email = EXCLUDED.email,
                 streak = EXCLUDED.streak,
                 read_ayahs = EXCLUDED.read_ayahs,
                 last_read_date = EXCLUDED.last_read_date,
                 last_fatiha_date = EXCLUDED.last_fatiha_date,
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(&progress.username)
        .bind(&progress.email)
        .bind(progress.streak as i32)
        .bind(encode_keys(&progress.read_ayahs))
        .bind(progress.last_read_date)
        .bind(progress.last_fatiha_date)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_bookmarks(&self, user_id: Uuid) -> PortResult<Option<BookmarkSet>> {
        let raw: Option<(Vec<String>,)> =
            sqlx::query_as("SELECT ayah_keys FROM bookmarks WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;

        Ok(raw.map(|(keys,)| decode_keys(keys)))
    }

    async fn put_bookmarks(&self, user_id: Uuid, bookmarks: &BookmarkSet) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO bookmarks (user_id, ayah_keys, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (user_id) DO UPDATE SET
                 ayah_keys = EXCLUDED.ayah_keys,
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(encode_keys(bookmarks))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn put_custom_verses(&self, user_id: Uuid, verses: &[CustomVerse]) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        for verse in verses {
            sqlx::query(
                "INSERT INTO custom_verses (user_id, surah, ayah, text)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (user_id, surah, ayah) DO UPDATE SET text = EXCLUDED.text",
            )
            .bind(user_id)
            .bind(verse.key.surah as i32)
            .bind(verse.key.ayah as i32)
            .bind(&verse.text)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn get_custom_surah(&self, user_id: Uuid, number: u32) -> PortResult<Vec<CustomVerse>> {
        let records = sqlx::query_as::<_, CustomVerseRecord>(
            "SELECT surah, ayah, text FROM custom_verses
             WHERE user_id = $1 AND surah = $2 ORDER BY ayah ASC",
        )
        .bind(user_id)
        .bind(number as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .filter_map(CustomVerseRecord::to_domain)
            .collect())
    }

    async fn custom_surah_numbers(&self, user_id: Uuid) -> PortResult<Vec<u32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            "SELECT DISTINCT surah FROM custom_verses WHERE user_id = $1 ORDER BY surah ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows.into_iter().map(|(n,)| n.max(0) as u32).collect())
    }
}
