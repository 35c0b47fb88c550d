use crate::db::models::{DbFavorite, DbQueueEntry, DbQueueField, DbStory};
use crate::db::schema::SQLITE_INIT;
use crate::error::StorySyncError;
use crate::queue::{FieldValue, NewQueueEntry, QueueEntry, QueuedBody};
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::collections::{BTreeMap, HashMap};
use std::{str::FromStr, time::Duration};
use storysync_schema::Story;
use tracing::{debug, info};

#[derive(Debug)]
pub enum DbActorMessage {
    /// Persist a pending write and return its assigned id.
    Enqueue(NewQueueEntry, RpcReplyPort<Result<i64, StorySyncError>>),

    /// All pending writes in insertion order.
    ListQueue(RpcReplyPort<Result<Vec<QueueEntry>, StorySyncError>>),

    /// Delete one pending write; replies whether a row was removed.
    RemoveQueueEntry(i64, RpcReplyPort<Result<bool, StorySyncError>>),

    /// Number of pending writes.
    CountQueue(RpcReplyPort<Result<i64, StorySyncError>>),

    /// Clear the story mirror and write the given set in one transaction.
    ReplaceMirror(Vec<Story>, RpcReplyPort<Result<(), StorySyncError>>),

    /// Mirror contents in the order the server returned them.
    ListMirror(RpcReplyPort<Result<Vec<Story>, StorySyncError>>),

    /// Get a mirrored story by id.
    GetStory(String, RpcReplyPort<Result<Option<Story>, StorySyncError>>),

    /// Insert or overwrite a favorite.
    PutFavorite(Story, RpcReplyPort<Result<(), StorySyncError>>),

    /// Delete a favorite; replies whether a row was removed.
    RemoveFavorite(String, RpcReplyPort<Result<bool, StorySyncError>>),

    /// Favorites, most recently added first.
    ListFavorites(RpcReplyPort<Result<Vec<Story>, StorySyncError>>),

    IsFavorite(String, RpcReplyPort<Result<bool, StorySyncError>>),
}

/// Cloneable handle to the local store. Construct one per process with [`spawn`]
/// and pass it to the components that need it.
#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn enqueue(&self, entry: NewQueueEntry) -> Result<i64, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::Enqueue, entry)
            .map_err(|e| StorySyncError::RactorError(format!("DbActor Enqueue RPC failed: {e}")))?
    }

    pub async fn list_queue(&self) -> Result<Vec<QueueEntry>, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::ListQueue).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor ListQueue RPC failed: {e}"))
        })?
    }

    /// Idempotent: removing an absent id is `Ok(false)`.
    pub async fn remove_queue_entry(&self, id: i64) -> Result<bool, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::RemoveQueueEntry, id).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor RemoveQueueEntry RPC failed: {e}"))
        })?
    }

    pub async fn count_queue(&self) -> Result<i64, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::CountQueue).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor CountQueue RPC failed: {e}"))
        })?
    }

    pub async fn replace_mirror(&self, stories: Vec<Story>) -> Result<(), StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::ReplaceMirror, stories).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor ReplaceMirror RPC failed: {e}"))
        })?
    }

    pub async fn list_mirror(&self) -> Result<Vec<Story>, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::ListMirror).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor ListMirror RPC failed: {e}"))
        })?
    }

    pub async fn get_story(&self, id: &str) -> Result<Option<Story>, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::GetStory, id.to_string()).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor GetStory RPC failed: {e}"))
        })?
    }

    pub async fn put_favorite(&self, story: Story) -> Result<(), StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::PutFavorite, story).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor PutFavorite RPC failed: {e}"))
        })?
    }

    pub async fn remove_favorite(&self, id: &str) -> Result<bool, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::RemoveFavorite, id.to_string()).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor RemoveFavorite RPC failed: {e}"))
        })?
    }

    pub async fn list_favorites(&self) -> Result<Vec<Story>, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::ListFavorites).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor ListFavorites RPC failed: {e}"))
        })?
    }

    pub async fn is_favorite(&self, id: &str) -> Result<bool, StorySyncError> {
        ractor::call!(self.actor, DbActorMessage::IsFavorite, id.to_string()).map_err(|e| {
            StorySyncError::RactorError(format!("DbActor IsFavorite RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::Enqueue(entry, reply) => {
                let res = self.enqueue(&state.pool, entry).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListQueue(reply) => {
                let res = self.list_queue(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::RemoveQueueEntry(id, reply) => {
                let res = self.remove_queue_entry(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CountQueue(reply) => {
                let res = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sync_queue")
                    .fetch_one(&state.pool)
                    .await
                    .map_err(StorySyncError::from);
                let _ = reply.send(res);
            }
            DbActorMessage::ReplaceMirror(stories, reply) => {
                let res = self.replace_mirror(&state.pool, stories).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListMirror(reply) => {
                let res = self.list_mirror(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetStory(id, reply) => {
                let res = self.get_story(&state.pool, &id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::PutFavorite(story, reply) => {
                let res = self.put_favorite(&state.pool, story).await;
                let _ = reply.send(res);
            }
            DbActorMessage::RemoveFavorite(id, reply) => {
                let res = sqlx::query("DELETE FROM favorites WHERE id = ?")
                    .bind(id)
                    .execute(&state.pool)
                    .await
                    .map(|r| r.rows_affected() > 0)
                    .map_err(StorySyncError::from);
                let _ = reply.send(res);
            }
            DbActorMessage::ListFavorites(reply) => {
                let res = self.list_favorites(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::IsFavorite(id, reply) => {
                let res = sqlx::query_scalar::<_, i64>(
                    "SELECT EXISTS(SELECT 1 FROM favorites WHERE id = ?)",
                )
                .bind(id)
                .fetch_one(&state.pool)
                .await
                .map(|found| found != 0)
                .map_err(StorySyncError::from);
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn enqueue(&self, pool: &SqlitePool, entry: NewQueueEntry) -> Result<i64, StorySyncError> {
        let headers = serde_json::to_string(&entry.headers)?;
        let mut tx = pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO sync_queue (url, method, headers, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
        )
        .bind(&entry.url)
        .bind(&entry.method)
        .bind(headers)
        .bind(entry.created_at)
        .fetch_one(&mut *tx)
        .await?;

        for (position, field) in (0_i64..).zip(entry.body.fields) {
            let (text_value, bytes, filename, content_type) = match field.value {
                FieldValue::Text(text) => (Some(text), None, None, None),
                FieldValue::Binary(part) => (
                    None,
                    Some(part.bytes),
                    part.filename,
                    Some(part.content_type),
                ),
            };

            sqlx::query(
                r#"
            INSERT INTO sync_queue_fields (
                entry_id, position, name, text_value, bytes, filename, content_type
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            )
            .bind(id)
            .bind(position)
            .bind(field.name)
            .bind(text_value)
            .bind(bytes)
            .bind(filename)
            .bind(content_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(queue.id = id, url = %entry.url, "Queued pending write");
        Ok(id)
    }

    async fn list_queue(&self, pool: &SqlitePool) -> Result<Vec<QueueEntry>, StorySyncError> {
        let mut tx = pool.begin().await?;

        let rows = sqlx::query_as::<_, DbQueueEntry>(
            r#"
        SELECT id, url, method, headers, created_at
        FROM sync_queue
        ORDER BY id
        "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let field_rows = sqlx::query_as::<_, DbQueueField>(
            r#"
        SELECT entry_id, position, name, text_value, bytes, filename, content_type
        FROM sync_queue_fields
        ORDER BY entry_id, position
        "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut fields_by_entry: HashMap<i64, Vec<DbQueueField>> = HashMap::new();
        for field in field_rows {
            fields_by_entry.entry(field.entry_id).or_default().push(field);
        }

        rows.into_iter()
            .map(|row| -> Result<QueueEntry, StorySyncError> {
                let headers: BTreeMap<String, String> = serde_json::from_str(&row.headers)?;
                let fields = fields_by_entry
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect();

                Ok(QueueEntry {
                    id: row.id,
                    url: row.url,
                    method: row.method,
                    headers,
                    body: QueuedBody { fields },
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn remove_queue_entry(&self, pool: &SqlitePool, id: i64) -> Result<bool, StorySyncError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM sync_queue_fields WHERE entry_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn replace_mirror(
        &self,
        pool: &SqlitePool,
        stories: Vec<Story>,
    ) -> Result<(), StorySyncError> {
        let count = stories.len();
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM stories").execute(&mut *tx).await?;

        for (position, story) in (0_i64..).zip(stories) {
            sqlx::query(
                r#"
            INSERT INTO stories (id, position, name, description, photo_url, created_at, lat, lon)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                position = excluded.position,
                name = excluded.name,
                description = excluded.description,
                photo_url = excluded.photo_url,
                created_at = excluded.created_at,
                lat = excluded.lat,
                lon = excluded.lon
            "#,
            )
            .bind(story.id)
            .bind(position)
            .bind(story.name)
            .bind(story.description)
            .bind(story.photo_url)
            .bind(story.created_at)
            .bind(story.lat)
            .bind(story.lon)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count, "Story mirror replaced");
        Ok(())
    }

    async fn list_mirror(&self, pool: &SqlitePool) -> Result<Vec<Story>, StorySyncError> {
        let rows = sqlx::query_as::<_, DbStory>(
            r#"
        SELECT id, position, name, description, photo_url, created_at, lat, lon
        FROM stories
        ORDER BY position
        "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Story::from).collect())
    }

    async fn get_story(&self, pool: &SqlitePool, id: &str) -> Result<Option<Story>, StorySyncError> {
        let row = sqlx::query_as::<_, DbStory>(
            r#"
        SELECT id, position, name, description, photo_url, created_at, lat, lon
        FROM stories
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Story::from))
    }

    async fn put_favorite(&self, pool: &SqlitePool, story: Story) -> Result<(), StorySyncError> {
        let now = Utc::now();
        sqlx::query(
            r#"
        INSERT INTO favorites (id, name, description, photo_url, created_at, lat, lon, favorited_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            photo_url = excluded.photo_url,
            created_at = excluded.created_at,
            lat = excluded.lat,
            lon = excluded.lon
        "#,
        )
        .bind(story.id)
        .bind(story.name)
        .bind(story.description)
        .bind(story.photo_url)
        .bind(story.created_at)
        .bind(story.lat)
        .bind(story.lon)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn list_favorites(&self, pool: &SqlitePool) -> Result<Vec<Story>, StorySyncError> {
        let rows = sqlx::query_as::<_, DbFavorite>(
            r#"
        SELECT id, name, description, photo_url, created_at, lat, lon, favorited_at
        FROM favorites
        ORDER BY favorited_at DESC, rowid DESC
        "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Story::from).collect())
    }
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, StorySyncError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| StorySyncError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), StorySyncError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
