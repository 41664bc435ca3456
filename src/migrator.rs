//! One-shot import of legacy JSON bot state into the store.
//!
//! The four passes run in a fixed order (bots, mappings, verified users,
//! blacklist) because every later pass checks that its bot already exists.
//! Only a missing source folder or a declined confirmation stops a run; every
//! other failure becomes an entry in [`MigrationSession::errors`].
use crate::error::RecordError;
use crate::legacy::{
    user_id_from_value, Document, LegacyBot, LegacyId, LegacyMappingGroup, LegacyOwner,
    VerifiedUserInput, VerifiedUsers,
};
use crate::model::{BotMode, MappingKind};
use crate::store::BotStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Bots,
    Mappings,
    VerifiedUsers,
    Blacklist,
}

impl Pass {
    pub const ALL: [Pass; 4] = [Pass::Bots, Pass::Mappings, Pass::VerifiedUsers, Pass::Blacklist];

    pub fn file_name(&self) -> &'static str {
        match self {
            Pass::Bots => "bots.json",
            Pass::Mappings => "msg_map.json",
            Pass::VerifiedUsers => "verified_users.json",
            Pass::Blacklist => "blacklist.json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pass::Bots => "bot configs",
            Pass::Mappings => "message mappings",
            Pass::VerifiedUsers => "verified users",
            Pass::Blacklist => "blacklist entries",
        }
    }
}

/// What happened to one legacy record.
#[derive(Debug)]
pub enum Outcome {
    Migrated,
    /// Already present in the store; nothing written.
    Skipped,
    Failed(RecordError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub bots: u64,
    pub mappings: u64,
    pub verified_users: u64,
    pub blacklist: u64,
}

impl MigrationStats {
    pub fn get(&self, pass: Pass) -> u64 {
        match pass {
            Pass::Bots => self.bots,
            Pass::Mappings => self.mappings,
            Pass::VerifiedUsers => self.verified_users,
            Pass::Blacklist => self.blacklist,
        }
    }

    fn bump(&mut self, pass: Pass) {
        match pass {
            Pass::Bots => self.bots += 1,
            Pass::Mappings => self.mappings += 1,
            Pass::VerifiedUsers => self.verified_users += 1,
            Pass::Blacklist => self.blacklist += 1,
        }
    }
}

/// Running counters and the ordered error log of one migration run.
#[derive(Debug, Default)]
pub struct MigrationSession {
    pub stats: MigrationStats,
    pub errors: Vec<String>,
}

impl MigrationSession {
    /// Fold one record outcome into the session. Returns true if it was migrated.
    pub fn record(&mut self, pass: Pass, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Migrated => {
                self.stats.bump(pass);
                true
            }
            Outcome::Skipped => false,
            Outcome::Failed(err) => {
                self.push_error(err.to_string());
                false
            }
        }
    }

    pub fn push_error(&mut self, message: String) {
        warn!(error = %message, "migration error");
        self.errors.push(message);
    }
}

/// Final summary of a completed run.
#[derive(Debug, Clone)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub stats: MigrationStats,
    pub errors: Vec<String>,
    pub max_displayed_errors: usize,
}

impl Report {
    pub fn displayed_errors(&self) -> &[String] {
        &self.errors[..self.errors.len().min(self.max_displayed_errors)]
    }

    pub fn hidden_errors(&self) -> usize {
        self.errors.len().saturating_sub(self.max_displayed_errors)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration finished (started {})", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        for pass in Pass::ALL {
            writeln!(f, "  {:<18} {}", format!("{}:", pass.label()), self.stats.get(pass))?;
        }
        writeln!(f, "  {:<18} {:.2}s", "elapsed:", self.elapsed.as_secs_f64())?;
        if !self.errors.is_empty() {
            writeln!(f, "{} errors:", self.errors.len())?;
            for err in self.displayed_errors() {
                writeln!(f, "  - {err}")?;
            }
            if self.hidden_errors() > 0 {
                writeln!(f, "  ... {} more errors not shown", self.hidden_errors())?;
            }
        }
        Ok(())
    }
}

/// How a run ended. A completed run hands the opened store back to the caller.
#[derive(Debug)]
pub enum RunStatus<S> {
    Completed(Report, S),
    MissingSource,
    Declined,
}

impl<S> RunStatus<S> {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Completed(..))
    }
}

#[derive(Debug, Clone)]
pub struct Migrator {
    source_dir: PathBuf,
    target: String,
    max_displayed_errors: usize,
}

impl Migrator {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target: String::new(),
            max_displayed_errors: 10,
        }
    }

    /// Describes the destination in the confirmation banner.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_max_displayed_errors(mut self, limit: usize) -> Self {
        self.max_displayed_errors = limit;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Check the folder, ask for confirmation, then open the store and run all
    /// passes. `open_store` is only called after the operator agreed.
    pub async fn run<S, C, F, Fut>(&self, confirm: C, open_store: F) -> Result<RunStatus<S>>
    where
        S: BotStore,
        C: FnOnce(&Path) -> Result<bool>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        if !self.source_dir.is_dir() {
            println!("Error: source folder does not exist: {}", self.source_dir.display());
            return Ok(RunStatus::MissingSource);
        }

        println!("Warning: this imports legacy JSON data into the database");
        println!("  source folder: {}", self.source_dir.display());
        if !self.target.is_empty() {
            println!("  database:      {}", self.target);
        }
        if !confirm(self.source_dir.as_path())? {
            println!("Cancelled.");
            return Ok(RunStatus::Declined);
        }

        let store = open_store().await?;
        let report = self.migrate_all(&store).await;
        println!();
        print!("{report}");
        Ok(RunStatus::Completed(report, store))
    }

    /// Run the four passes in order and summarise.
    pub async fn migrate_all<S: BotStore + ?Sized>(&self, store: &S) -> Report {
        let started_at = Utc::now();
        let timer = Instant::now();
        let mut session = MigrationSession::default();

        self.migrate_bots(store, &mut session).await;
        self.migrate_mappings(store, &mut session).await;
        self.migrate_verified_users(store, &mut session).await;
        self.migrate_blacklist(store, &mut session).await;

        let elapsed = timer.elapsed();
        info!(
            bots = session.stats.bots,
            mappings = session.stats.mappings,
            verified_users = session.stats.verified_users,
            blacklist = session.stats.blacklist,
            errors = session.errors.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "migration finished"
        );
        Report {
            started_at,
            elapsed,
            stats: session.stats,
            errors: session.errors,
            max_displayed_errors: self.max_displayed_errors,
        }
    }

    /// Read and parse `<source_dir>/<name>`. A missing file yields `None`
    /// silently; unreadable or malformed files are recorded and yield `None`.
    pub fn load_json_file<T: DeserializeOwned>(
        &self,
        name: &str,
        session: &mut MigrationSession,
    ) -> Option<T> {
        let path = self.source_dir.join(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                println!("{name} not found, skipping");
                return None;
            }
            Err(err) => {
                session.push_error(format!("failed to load {name}: {err}"));
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(doc) => {
                println!("Loaded {name}");
                Some(doc)
            }
            Err(err) => {
                session.push_error(format!("failed to load {name}: {err}"));
                None
            }
        }
    }

    fn load_document(&self, pass: Pass, session: &mut MigrationSession) -> Option<Document> {
        println!();
        println!("== Migrating {} ({})", pass.label(), pass.file_name());
        self.load_json_file::<Document>(pass.file_name(), session)
            .filter(|doc| !doc.is_empty())
    }

    pub async fn migrate_bots<S: BotStore + ?Sized>(&self, store: &S, session: &mut MigrationSession) {
        let Some(doc) = self.load_document(Pass::Bots, session) else {
            return;
        };
        for (owner, group) in doc {
            let owner_group: LegacyOwner = match serde_json::from_value(group) {
                Ok(g) => g,
                Err(err) => {
                    session.record(
                        Pass::Bots,
                        Outcome::Failed(RecordError::malformed(format!("owner {owner}"), err)),
                    );
                    continue;
                }
            };
            for record in owner_group.bots {
                let outcome = migrate_bot(store, &owner, record).await;
                session.record(Pass::Bots, outcome);
            }
        }
        println!("Bots migrated: {}", session.stats.bots);
    }

    pub async fn migrate_mappings<S: BotStore + ?Sized>(
        &self,
        store: &S,
        session: &mut MigrationSession,
    ) {
        let Some(doc) = self.load_document(Pass::Mappings, session) else {
            return;
        };
        for (bot, group) in doc {
            if let Err(err) = require_bot(store, &bot, Pass::Mappings).await {
                session.record(Pass::Mappings, Outcome::Failed(err));
                continue;
            }
            let group: LegacyMappingGroup = match serde_json::from_value(group) {
                Ok(g) => g,
                Err(err) => {
                    session.record(
                        Pass::Mappings,
                        Outcome::Failed(RecordError::malformed(format!("bot @{bot}: mappings"), err)),
                    );
                    continue;
                }
            };
            let mut count = 0;
            for (kind, entries) in group.into_kinds() {
                for (source_id, target) in entries {
                    let outcome = migrate_mapping(store, &bot, kind, &source_id, &target).await;
                    if session.record(Pass::Mappings, outcome) {
                        count += 1;
                    }
                }
            }
            println!("  @{bot}: {count} mappings");
        }
        println!("Mappings migrated: {}", session.stats.mappings);
    }

    pub async fn migrate_verified_users<S: BotStore + ?Sized>(
        &self,
        store: &S,
        session: &mut MigrationSession,
    ) {
        let Some(doc) = self.load_document(Pass::VerifiedUsers, session) else {
            return;
        };
        for (bot, group) in doc {
            if let Err(err) = require_bot(store, &bot, Pass::VerifiedUsers).await {
                session.record(Pass::VerifiedUsers, Outcome::Failed(err));
                continue;
            }
            let users: VerifiedUsers = match serde_json::from_value(group) {
                Ok(users) => users,
                Err(err) => {
                    session.record(
                        Pass::VerifiedUsers,
                        Outcome::Failed(RecordError::malformed(
                            format!("bot @{bot}: verified users"),
                            err,
                        )),
                    );
                    continue;
                }
            };
            let mut count = 0;
            for entry in users.into_entries(&bot) {
                let outcome = match entry {
                    Ok(user) => migrate_verified_user(store, &bot, &user).await,
                    Err(err) => Outcome::Failed(err),
                };
                if session.record(Pass::VerifiedUsers, outcome) {
                    count += 1;
                }
            }
            println!("  @{bot}: {count} verified users");
        }
        println!("Verified users migrated: {}", session.stats.verified_users);
    }

    pub async fn migrate_blacklist<S: BotStore + ?Sized>(
        &self,
        store: &S,
        session: &mut MigrationSession,
    ) {
        let Some(doc) = self.load_document(Pass::Blacklist, session) else {
            return;
        };
        for (bot, group) in doc {
            if let Err(err) = require_bot(store, &bot, Pass::Blacklist).await {
                session.record(Pass::Blacklist, Outcome::Failed(err));
                continue;
            }
            let Value::Array(ids) = group else {
                session.record(
                    Pass::Blacklist,
                    Outcome::Failed(RecordError::malformed(
                        format!("bot @{bot}: blacklist"),
                        "expected a list of user ids",
                    )),
                );
                continue;
            };
            let mut count = 0;
            for raw in &ids {
                let outcome = match user_id_from_value(&bot, raw) {
                    Ok(user_id) => migrate_blacklist_entry(store, &bot, user_id).await,
                    Err(err) => Outcome::Failed(err),
                };
                if session.record(Pass::Blacklist, outcome) {
                    count += 1;
                }
            }
            println!("  @{bot}: {count} blacklisted users");
        }
        println!("Blacklist entries migrated: {}", session.stats.blacklist);
    }
}

/// Gate for dependent passes: the owning bot must already be in the store.
async fn require_bot<S: BotStore + ?Sized>(store: &S, bot: &str, pass: Pass) -> Result<(), RecordError> {
    match store.bot_exists(bot).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(RecordError::BotNotFound {
            bot: bot.to_string(),
            what: pass.label(),
        }),
        Err(err) => Err(RecordError::store(format!("failed to look up bot @{bot}"), &err)),
    }
}

async fn migrate_bot<S: BotStore + ?Sized>(store: &S, owner: &str, record: Value) -> Outcome {
    let raw = record.to_string();
    let bot: LegacyBot = match serde_json::from_value(record) {
        Ok(bot) => bot,
        Err(err) => return Outcome::Failed(RecordError::malformed(format!("owner {owner}: bot"), err)),
    };
    let (Some(handle), Some(token)) = (bot.handle(), bot.token()) else {
        return Outcome::Failed(RecordError::MissingBotFields {
            owner: owner.to_string(),
            record: raw,
        });
    };

    match store.bot_exists(&handle).await {
        Ok(true) => {
            debug!(bot = %handle, "bot already exists; skipping");
            return Outcome::Skipped;
        }
        Ok(false) => {}
        Err(err) => {
            return Outcome::Failed(RecordError::store(format!("failed to add bot @{handle}"), &err))
        }
    }

    let Ok(owner_id) = owner.trim().parse::<i64>() else {
        return Outcome::Failed(RecordError::InvalidOwner {
            bot: handle,
            owner: owner.to_string(),
        });
    };
    if let Err(err) = store
        .insert_bot(&handle, &token, owner_id, &bot.welcome_msg())
        .await
    {
        return Outcome::Failed(RecordError::store(format!("failed to add bot @{handle}"), &err));
    }

    // Bot row exists from here on. Mode and forum id failures keep it.
    let mut follow_up: Option<RecordError> = None;
    let mode = match bot.mode() {
        None => BotMode::Direct,
        Some(raw_mode) => match BotMode::parse_mode(&raw_mode) {
            Some(mode) => mode,
            None => {
                follow_up.get_or_insert(RecordError::UnknownMode {
                    bot: handle.clone(),
                    mode: raw_mode,
                });
                BotMode::Direct
            }
        },
    };
    if mode != BotMode::Direct {
        if let Err(err) = store.update_bot_mode(&handle, mode).await {
            follow_up.get_or_insert(RecordError::store(
                format!("bot @{handle}: failed to set mode {}", mode.as_str()),
                &err,
            ));
        }
    }
    match bot.forum_group_id() {
        Ok(None) => {}
        Ok(Some(forum_id)) => {
            if let Err(err) = store.update_bot_forum_id(&handle, forum_id).await {
                follow_up.get_or_insert(RecordError::store(
                    format!("bot @{handle}: failed to set forum_group_id {forum_id}"),
                    &err,
                ));
            }
        }
        Err(value) => {
            follow_up.get_or_insert(RecordError::InvalidForumId {
                bot: handle.clone(),
                value,
            });
        }
    }

    match follow_up {
        None => {
            info!(bot = %handle, owner = owner_id, mode = mode.as_str(), "bot migrated");
            println!("  @{handle} (owner {owner_id}, mode {})", mode.as_str());
            Outcome::Migrated
        }
        Some(err) => Outcome::Failed(err),
    }
}

async fn migrate_mapping<S: BotStore + ?Sized>(
    store: &S,
    bot: &str,
    kind: MappingKind,
    source_id: &str,
    target: &Value,
) -> Outcome {
    let Some(target_id) = LegacyId::from_value(target).map(|id| id.to_message_id()) else {
        return Outcome::Failed(RecordError::InvalidMessageId {
            bot: bot.to_string(),
            kind: kind.as_str(),
            source_id: source_id.to_string(),
            value: target.to_string(),
        });
    };
    match store.upsert_mapping(bot, kind, source_id, &target_id).await {
        Ok(()) => Outcome::Migrated,
        Err(err) => Outcome::Failed(RecordError::store(
            format!("bot @{bot}: failed to set {} mapping {source_id}", kind.as_str()),
            &err,
        )),
    }
}

async fn migrate_verified_user<S: BotStore + ?Sized>(
    store: &S,
    bot: &str,
    user: &VerifiedUserInput,
) -> Outcome {
    let context = || format!("bot @{bot}: failed to add verified user {}", user.user_id);
    match store.is_verified(bot, user.user_id).await {
        Ok(true) => return Outcome::Skipped,
        Ok(false) => {}
        Err(err) => return Outcome::Failed(RecordError::store(context(), &err)),
    }
    match store
        .insert_verified_user(bot, user.user_id, &user.user_name, &user.user_username)
        .await
    {
        Ok(()) => Outcome::Migrated,
        Err(err) => Outcome::Failed(RecordError::store(context(), &err)),
    }
}

async fn migrate_blacklist_entry<S: BotStore + ?Sized>(store: &S, bot: &str, user_id: i64) -> Outcome {
    let context = || format!("bot @{bot}: failed to blacklist user {user_id}");
    match store.is_blacklisted(bot, user_id).await {
        Ok(true) => return Outcome::Skipped,
        Ok(false) => {}
        Err(err) => return Outcome::Failed(RecordError::store(context(), &err)),
    }
    match store.insert_blacklist_entry(bot, user_id).await {
        Ok(()) => Outcome::Migrated,
        Err(err) => Outcome::Failed(RecordError::store(context(), &err)),
    }
}
