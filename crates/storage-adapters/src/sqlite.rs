//! # SQLite Implementation
//!
//! Maps the profile, swipe, match and message ports onto four SQLite tables.
//! Ids are stored as hyphenated UUID text; photo lists as a JSON array.

use std::str::FromStr;

use async_trait::async_trait;
use domains::{
    CandidateProfile, DecisionMap, DomainError, MatchRecord, MatchStore, Message, MessageStore,
    ProfileStore, Result, SwipeStore, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS profiles (
        seq             INTEGER PRIMARY KEY AUTOINCREMENT,
        id              TEXT NOT NULL UNIQUE,
        name            TEXT NOT NULL,
        age             INTEGER,
        bio             TEXT NOT NULL,
        photo_urls      TEXT NOT NULL,
        min_seeking_age INTEGER,
        max_seeking_age INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS swipes (
        owner    TEXT NOT NULL,
        subject  TEXT NOT NULL,
        accepted BOOLEAN NOT NULL,
        PRIMARY KEY (owner, subject)
    )",
    "CREATE TABLE IF NOT EXISTS matches (
        owner      TEXT NOT NULL,
        peer       TEXT NOT NULL,
        name       TEXT NOT NULL,
        photo_url  TEXT,
        matched_at TEXT NOT NULL,
        PRIMARY KEY (owner, peer)
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        seq     INTEGER PRIMARY KEY AUTOINCREMENT,
        from_id TEXT NOT NULL,
        to_id   TEXT NOT NULL,
        text    TEXT NOT NULL,
        sent_at TEXT NOT NULL
    )",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    ///
    /// `sqlite::memory:` databases are private to one connection, so callers
    /// using one should pass `max_connections = 1`.
    pub async fn connect(url: &str, max_connections: u32) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!(url, "sqlite store ready");
        Ok(Self { pool })
    }
}

fn fetch_failed(e: sqlx::Error) -> DomainError {
    DomainError::FetchFailed(e.to_string())
}

fn write_failed(e: sqlx::Error) -> DomainError {
    DomainError::WriteFailed(e.to_string())
}

fn decode_err<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

fn parse_id(row: &SqliteRow, column: &str) -> std::result::Result<UserId, sqlx::Error> {
    row.try_get::<String, _>(column)?
        .parse()
        .map_err(decode_err)
}

fn optional_age(row: &SqliteRow, column: &str) -> std::result::Result<Option<u32>, sqlx::Error> {
    Ok(row
        .try_get::<Option<i64>, _>(column)?
        .and_then(|v| u32::try_from(v).ok()))
}

fn profile_from_row(row: &SqliteRow) -> std::result::Result<CandidateProfile, sqlx::Error> {
    let photos: String = row.try_get("photo_urls")?;
    Ok(CandidateProfile {
        id: parse_id(row, "id")?,
        name: row.try_get("name")?,
        age: optional_age(row, "age")?,
        bio: row.try_get("bio")?,
        photo_urls: serde_json::from_str(&photos).map_err(decode_err)?,
        min_seeking_age: optional_age(row, "min_seeking_age")?,
        max_seeking_age: optional_age(row, "max_seeking_age")?,
    })
}

fn match_from_row(row: &SqliteRow) -> std::result::Result<MatchRecord, sqlx::Error> {
    Ok(MatchRecord {
        peer: parse_id(row, "peer")?,
        name: row.try_get("name")?,
        photo_url: row.try_get("photo_url")?,
        matched_at: row.try_get("matched_at")?,
    })
}

fn message_from_row(row: &SqliteRow) -> std::result::Result<Message, sqlx::Error> {
    Ok(Message {
        from: parse_id(row, "from_id")?,
        to: parse_id(row, "to_id")?,
        text: row.try_get("text")?,
        sent_at: row.try_get("sent_at")?,
    })
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn query_candidates(&self, min_age: u32, max_age: u32) -> Result<Vec<CandidateProfile>> {
        let rows = sqlx::query(
            "SELECT * FROM profiles WHERE age IS NOT NULL AND age >= ? AND age <= ? ORDER BY seq",
        )
        .bind(i64::from(min_age))
        .bind(i64::from(max_age))
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_failed)?;

        debug!(min_age, max_age, hits = rows.len(), "candidate query");
        rows.iter()
            .map(profile_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(fetch_failed)
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<CandidateProfile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_failed)?;

        row.as_ref()
            .map(profile_from_row)
            .transpose()
            .map_err(fetch_failed)
    }

    async fn put_profile(&self, profile: CandidateProfile) -> Result<()> {
        let photos = serde_json::to_string(&profile.photo_urls)
            .map_err(|e| DomainError::WriteFailed(e.to_string()))?;

        sqlx::query(
            "INSERT INTO profiles (id, name, age, bio, photo_urls, min_seeking_age, max_seeking_age)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                bio = excluded.bio,
                photo_urls = excluded.photo_urls,
                min_seeking_age = excluded.min_seeking_age,
                max_seeking_age = excluded.max_seeking_age",
        )
        .bind(profile.id.to_string())
        .bind(profile.name)
        .bind(profile.age.map(i64::from))
        .bind(profile.bio)
        .bind(photos)
        .bind(profile.min_seeking_age.map(i64::from))
        .bind(profile.max_seeking_age.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;
        Ok(())
    }
}

#[async_trait]
impl SwipeStore for SqliteStore {
    async fn get_decisions(&self, user: UserId) -> Result<DecisionMap> {
        let rows = sqlx::query("SELECT subject, accepted FROM swipes WHERE owner = ?")
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(fetch_failed)?;

        rows.iter()
            .map(|row| Ok((parse_id(row, "subject")?, row.try_get::<bool, _>("accepted")?)))
            .collect::<std::result::Result<DecisionMap, sqlx::Error>>()
            .map_err(fetch_failed)
    }

    /// Row-per-decision upsert inside one transaction, which gives the
    /// field-merge semantics of the port.
    async fn put_decisions(&self, user: UserId, decisions: DecisionMap) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(write_failed)?;

        for (subject, accepted) in decisions.iter() {
            sqlx::query(
                "INSERT INTO swipes (owner, subject, accepted) VALUES (?, ?, ?)
                 ON CONFLICT(owner, subject) DO UPDATE SET accepted = excluded.accepted",
            )
            .bind(user.to_string())
            .bind(subject.to_string())
            .bind(*accepted)
            .execute(&mut *tx)
            .await
            .map_err(write_failed)?;
        }

        tx.commit().await.map_err(write_failed)?;
        Ok(())
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    async fn put_match(&self, owner: UserId, record: MatchRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO matches (owner, peer, name, photo_url, matched_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(owner, peer) DO UPDATE SET
                name = excluded.name,
                photo_url = excluded.photo_url,
                matched_at = excluded.matched_at",
        )
        .bind(owner.to_string())
        .bind(record.peer.to_string())
        .bind(record.name)
        .bind(record.photo_url)
        .bind(record.matched_at)
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;
        Ok(())
    }

    async fn list_matches(&self, owner: UserId) -> Result<Vec<MatchRecord>> {
        let rows = sqlx::query("SELECT * FROM matches WHERE owner = ? ORDER BY matched_at DESC")
            .bind(owner.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(fetch_failed)?;

        rows.iter()
            .map(match_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(fetch_failed)
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn send_message(&self, message: Message) -> Result<()> {
        sqlx::query("INSERT INTO messages (from_id, to_id, text, sent_at) VALUES (?, ?, ?, ?)")
            .bind(message.from.to_string())
            .bind(message.to.to_string())
            .bind(message.text)
            .bind(message.sent_at)
            .execute(&self.pool)
            .await
            .map_err(write_failed)?;
        Ok(())
    }

    async fn list_messages(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT * FROM messages
             WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
             ORDER BY sent_at, seq",
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_failed)?;

        rows.iter()
            .map(message_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(fetch_failed)
    }
}
