use super::model::TableCounts;
use crate::model::{BlacklistEntry, BotConfig, BotMode, MappingKind, MessageMapping, VerifiedUser};
use anyhow::{anyhow, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        // Enable WAL and stricter durability.
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    // Every connection to `sqlite::memory:` is its own database, so pin the pool
    // to one connection to keep writes and later reads on the same data.
    let pool = if normalized.starts_with("sqlite::memory") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?
    } else {
        SqlitePool::connect_with(options).await?
    };
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
pub(crate) fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = crate::prompt::expand_home(path_part);
    if let Some(parent) = expanded_path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path.to_string_lossy());
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn bot_exists(pool: &Pool, bot_username: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM bots WHERE bot_username = ?")
        .bind(bot_username)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

#[instrument(skip_all)]
pub async fn insert_bot(
    pool: &Pool,
    bot_username: &str,
    token: &str,
    owner: i64,
    welcome_msg: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO bots (bot_username, token, owner, welcome_msg) VALUES (?, ?, ?, ?)")
        .bind(bot_username)
        .bind(token)
        .bind(owner)
        .bind(welcome_msg)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn update_bot_mode(pool: &Pool, bot_username: &str, mode: BotMode) -> Result<()> {
    let res = sqlx::query("UPDATE bots SET mode = ? WHERE bot_username = ?")
        .bind(mode.as_str())
        .bind(bot_username)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("bot @{bot_username} does not exist"));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn update_bot_forum_id(pool: &Pool, bot_username: &str, forum_group_id: i64) -> Result<()> {
    let res = sqlx::query("UPDATE bots SET forum_group_id = ? WHERE bot_username = ?")
        .bind(forum_group_id)
        .bind(bot_username)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("bot @{bot_username} does not exist"));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn upsert_mapping(
    pool: &Pool,
    bot_username: &str,
    kind: MappingKind,
    source_id: &str,
    target_id: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO message_mappings (bot_username, kind, source_id, target_id) VALUES (?, ?, ?, ?) \
         ON CONFLICT(bot_username, kind, source_id) DO UPDATE SET target_id = excluded.target_id",
    )
    .bind(bot_username)
    .bind(kind.as_str())
    .bind(source_id)
    .bind(target_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn is_verified(pool: &Pool, bot_username: &str, user_id: i64) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM verified_users WHERE bot_username = ? AND user_id = ?",
    )
    .bind(bot_username)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

#[instrument(skip_all)]
pub async fn insert_verified_user(
    pool: &Pool,
    bot_username: &str,
    user_id: i64,
    user_name: &str,
    user_username: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO verified_users (bot_username, user_id, user_name, user_username) VALUES (?, ?, ?, ?)",
    )
    .bind(bot_username)
    .bind(user_id)
    .bind(user_name)
    .bind(user_username)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn is_blacklisted(pool: &Pool, bot_username: &str, user_id: i64) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM blacklist WHERE bot_username = ? AND user_id = ?",
    )
    .bind(bot_username)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

#[instrument(skip_all)]
pub async fn insert_blacklist_entry(pool: &Pool, bot_username: &str, user_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO blacklist (bot_username, user_id) VALUES (?, ?)")
        .bind(bot_username)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn fetch_bot(pool: &Pool, bot_username: &str) -> Result<Option<BotConfig>> {
    let row = sqlx::query(
        "SELECT bot_username, token, owner, welcome_msg, mode, forum_group_id FROM bots WHERE bot_username = ?",
    )
    .bind(bot_username)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mode: String = row.get("mode");
    Ok(Some(BotConfig {
        bot_username: row.get("bot_username"),
        token: row.get("token"),
        owner: row.get("owner"),
        welcome_msg: row.get("welcome_msg"),
        mode: BotMode::parse_mode(&mode).ok_or_else(|| anyhow!("unknown bot mode {mode}"))?,
        forum_group_id: row.get("forum_group_id"),
    }))
}

#[instrument(skip_all)]
pub async fn list_mappings(pool: &Pool, bot_username: &str) -> Result<Vec<MessageMapping>> {
    let rows = sqlx::query(
        "SELECT kind, source_id, target_id FROM message_mappings WHERE bot_username = ? ORDER BY kind, source_id",
    )
    .bind(bot_username)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| -> Result<MessageMapping> {
            let kind: String = row.get("kind");
            Ok(MessageMapping {
                bot_username: bot_username.to_string(),
                kind: MappingKind::parse_kind(&kind)
                    .ok_or_else(|| anyhow!("unknown mapping kind {kind}"))?,
                source_id: row.get("source_id"),
                target_id: row.get("target_id"),
            })
        })
        .collect()
}

#[instrument(skip_all)]
pub async fn list_verified_users(pool: &Pool, bot_username: &str) -> Result<Vec<VerifiedUser>> {
    let rows = sqlx::query(
        "SELECT user_id, user_name, user_username FROM verified_users WHERE bot_username = ? ORDER BY user_id",
    )
    .bind(bot_username)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| VerifiedUser {
            bot_username: bot_username.to_string(),
            user_id: row.get("user_id"),
            user_name: row.get("user_name"),
            user_username: row.get("user_username"),
        })
        .collect())
}

#[instrument(skip_all)]
pub async fn list_blacklist(pool: &Pool, bot_username: &str) -> Result<Vec<BlacklistEntry>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM blacklist WHERE bot_username = ? ORDER BY user_id",
    )
    .bind(bot_username)
    .fetch_all(pool)
    .await?;
    Ok(ids
        .into_iter()
        .map(|user_id| BlacklistEntry {
            bot_username: bot_username.to_string(),
            user_id,
        })
        .collect())
}

#[instrument(skip_all)]
pub async fn table_counts(pool: &Pool) -> Result<TableCounts> {
    let row = sqlx::query(
        "SELECT \
           (SELECT COUNT(*) FROM bots) AS bots, \
           (SELECT COUNT(*) FROM message_mappings) AS message_mappings, \
           (SELECT COUNT(*) FROM verified_users) AS verified_users, \
           (SELECT COUNT(*) FROM blacklist) AS blacklist",
    )
    .fetch_one(pool)
    .await?;
    Ok(TableCounts {
        bots: row.get("bots"),
        message_mappings: row.get("message_mappings"),
        verified_users: row.get("verified_users"),
        blacklist: row.get("blacklist"),
    })
}
