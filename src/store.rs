//! Storage contract the migrator writes through, plus the SQLite backend.
use crate::db;
use crate::model::{BotMode, MappingKind};
use anyhow::Result;
use sqlx::SqlitePool;

#[async_trait::async_trait]
pub trait BotStore: Send + Sync {
    async fn bot_exists(&self, bot_username: &str) -> Result<bool>;

    async fn insert_bot(
        &self,
        bot_username: &str,
        token: &str,
        owner: i64,
        welcome_msg: &str,
    ) -> Result<()>;

    async fn update_bot_mode(&self, bot_username: &str, mode: BotMode) -> Result<()>;

    async fn update_bot_forum_id(&self, bot_username: &str, forum_group_id: i64) -> Result<()>;

    async fn upsert_mapping(
        &self,
        bot_username: &str,
        kind: MappingKind,
        source_id: &str,
        target_id: &str,
    ) -> Result<()>;

    async fn is_verified(&self, bot_username: &str, user_id: i64) -> Result<bool>;

    async fn insert_verified_user(
        &self,
        bot_username: &str,
        user_id: i64,
        user_name: &str,
        user_username: &str,
    ) -> Result<()>;

    async fn is_blacklisted(&self, bot_username: &str, user_id: i64) -> Result<bool>;

    async fn insert_blacklist_entry(&self, bot_username: &str, user_id: i64) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and bring the schema up to date.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = db::init_pool(database_url).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl BotStore for SqliteStore {
    async fn bot_exists(&self, bot_username: &str) -> Result<bool> {
        db::bot_exists(&self.pool, bot_username).await
    }

    async fn insert_bot(
        &self,
        bot_username: &str,
        token: &str,
        owner: i64,
        welcome_msg: &str,
    ) -> Result<()> {
        db::insert_bot(&self.pool, bot_username, token, owner, welcome_msg).await
    }

    async fn update_bot_mode(&self, bot_username: &str, mode: BotMode) -> Result<()> {
        db::update_bot_mode(&self.pool, bot_username, mode).await
    }

    async fn update_bot_forum_id(&self, bot_username: &str, forum_group_id: i64) -> Result<()> {
        db::update_bot_forum_id(&self.pool, bot_username, forum_group_id).await
    }

    async fn upsert_mapping(
        &self,
        bot_username: &str,
        kind: MappingKind,
        source_id: &str,
        target_id: &str,
    ) -> Result<()> {
        db::upsert_mapping(&self.pool, bot_username, kind, source_id, target_id).await
    }

    async fn is_verified(&self, bot_username: &str, user_id: i64) -> Result<bool> {
        db::is_verified(&self.pool, bot_username, user_id).await
    }

    async fn insert_verified_user(
        &self,
        bot_username: &str,
        user_id: i64,
        user_name: &str,
        user_username: &str,
    ) -> Result<()> {
        db::insert_verified_user(&self.pool, bot_username, user_id, user_name, user_username).await
    }

    async fn is_blacklisted(&self, bot_username: &str, user_id: i64) -> Result<bool> {
        db::is_blacklisted(&self.pool, bot_username, user_id).await
    }

    async fn insert_blacklist_entry(&self, bot_username: &str, user_id: i64) -> Result<()> {
        db::insert_blacklist_entry(&self.pool, bot_username, user_id).await
    }
}
