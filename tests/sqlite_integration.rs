use bot_state_migrate::db;
use bot_state_migrate::migrator::{Migrator, RunStatus};
use bot_state_migrate::model::{BlacklistEntry, BotMode, MappingKind};
use bot_state_migrate::store::SqliteStore;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn setup_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    SqliteStore::new(pool)
}

fn legacy_folder() -> TempDir {
    let td = tempfile::tempdir().unwrap();
    let files = [
        (
            "bots.json",
            json!({
                "42": {"bots": [
                    {"bot_username": "alice_bot", "token": "T1"},
                    {"bot_username": "relay_bot", "token": "T2", "welcome_msg": "Hi!", "mode": "forum", "forum_group_id": -1009876}
                ]},
                "43": {"bots": [{"token": "orphan"}]}
            }),
        ),
        (
            "msg_map.json",
            json!({
                "alice_bot": {"direct": {"100": 200}, "owner_to_user": {"300": "301"}},
                "relay_bot": {"topics": {"555": 12}, "user_to_forward": {"1": 2}, "forward_to_user": {"2": 1}},
                "ghost_bot": {"direct": {"1": 1}}
            }),
        ),
        (
            "verified_users.json",
            json!({
                "alice_bot": [555, 556],
                "relay_bot": {"555": {"user_name": "Pat", "user_username": "pat"}}
            }),
        ),
        ("blacklist.json", json!({"alice_bot": [666], "ghost_bot": [1, 2, 3]})),
    ];
    for (name, doc) in files {
        std::fs::write(td.path().join(name), doc.to_string()).unwrap();
    }
    td
}

#[tokio::test]
async fn full_migration_into_sqlite() {
    let td = legacy_folder();
    let store = setup_store().await;
    let report = Migrator::new(td.path()).migrate_all(&store).await;

    assert_eq!(report.stats.bots, 2);
    assert_eq!(report.stats.mappings, 5);
    assert_eq!(report.stats.verified_users, 3);
    assert_eq!(report.stats.blacklist, 1);
    // orphan bot record, ghost_bot mappings, ghost_bot blacklist
    assert_eq!(report.errors.len(), 3, "{:?}", report.errors);

    let pool = store.pool();
    let alice = db::fetch_bot(pool, "alice_bot").await.unwrap().unwrap();
    assert_eq!(alice.owner, 42);
    assert_eq!(alice.mode, BotMode::Direct);
    assert_eq!(alice.forum_group_id, None);

    let relay = db::fetch_bot(pool, "relay_bot").await.unwrap().unwrap();
    assert_eq!(relay.mode, BotMode::Forum);
    assert_eq!(relay.forum_group_id, Some(-1009876));
    assert_eq!(relay.welcome_msg, "Hi!");

    let maps = db::list_mappings(pool, "alice_bot").await.unwrap();
    let direct = maps.iter().find(|m| m.kind == MappingKind::Direct).unwrap();
    assert_eq!(direct.source_id, "100");
    assert_eq!(direct.target_id, "200");

    let verified = db::list_verified_users(pool, "relay_bot").await.unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].user_name, "Pat");
    let verified = db::list_verified_users(pool, "alice_bot").await.unwrap();
    assert_eq!(verified.iter().map(|u| u.user_id).collect::<Vec<_>>(), vec![555, 556]);
    assert!(verified.iter().all(|u| u.user_name.is_empty() && u.user_username.is_empty()));

    assert_eq!(
        db::list_blacklist(pool, "alice_bot").await.unwrap(),
        vec![BlacklistEntry {
            bot_username: "alice_bot".into(),
            user_id: 666
        }]
    );
    assert!(db::list_blacklist(pool, "ghost_bot").await.unwrap().is_empty());
}

#[tokio::test]
async fn rerun_leaves_database_unchanged() {
    let td = legacy_folder();
    let store = setup_store().await;
    let migrator = Migrator::new(td.path());

    migrator.migrate_all(&store).await;
    let before = db::table_counts(store.pool()).await.unwrap();
    let maps_before = db::list_mappings(store.pool(), "relay_bot").await.unwrap();

    let second = migrator.migrate_all(&store).await;
    assert_eq!(second.stats.bots, 0);
    assert_eq!(second.stats.verified_users, 0);
    assert_eq!(second.stats.blacklist, 0);
    assert_eq!(db::table_counts(store.pool()).await.unwrap(), before);
    assert_eq!(db::list_mappings(store.pool(), "relay_bot").await.unwrap(), maps_before);
}

#[tokio::test]
async fn declined_run_does_not_touch_database_file() {
    let td = legacy_folder();
    let data = tempfile::tempdir().unwrap();
    let db_path = data.path().join("bot.db");
    let url = format!("sqlite://{}", db_path.display());

    // Existing database with one bot already in it.
    let existing = SqliteStore::open(&url).await.unwrap();
    db::insert_bot(existing.pool(), "alice_bot", "T1", 42, "").await.unwrap();
    existing.pool().close().await;
    let bytes_before = std::fs::read(&db_path).unwrap();

    let status = Migrator::new(td.path())
        .run(|_| Ok(false), || SqliteStore::open(&url))
        .await
        .unwrap();
    assert!(matches!(status, RunStatus::Declined));
    assert_eq!(std::fs::read(&db_path).unwrap(), bytes_before);
}

#[tokio::test]
async fn confirmed_run_creates_database() {
    let td = legacy_folder();
    let data = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/nested/bot.db", data.path().display());

    let status = Migrator::new(td.path())
        .run(|_| Ok(true), || SqliteStore::open(&url))
        .await
        .unwrap();
    let RunStatus::Completed(report, store) = status else {
        panic!("run did not complete");
    };
    assert_eq!(report.stats.bots, 2);
    let counts = db::table_counts(store.pool()).await.unwrap();
    assert_eq!(counts.bots, 2);
    assert_eq!(counts.blacklist, 1);
    store.pool().close().await;

    let reopened = db::init_pool(&url).await.unwrap();
    assert_eq!(db::table_counts(&reopened).await.unwrap(), counts);
}

#[tokio::test]
async fn in_memory_run_reports_what_it_wrote() {
    let td = legacy_folder();
    let status = Migrator::new(td.path())
        .run(|_| Ok(true), || SqliteStore::open("sqlite::memory:"))
        .await
        .unwrap();
    let RunStatus::Completed(report, store) = status else {
        panic!("run did not complete");
    };
    let counts = db::table_counts(store.pool()).await.unwrap();
    assert_eq!(counts.bots, 2);
    assert_eq!(report.stats.mappings, 5);
    assert_eq!(counts.message_mappings, 5);
    assert_eq!(counts.verified_users, 3);
    assert_eq!(counts.blacklist, 1);
}

#[tokio::test]
async fn unknown_mode_keeps_bot_and_its_children() {
    let td = tempfile::tempdir().unwrap();
    std::fs::write(
        td.path().join("bots.json"),
        json!({"42": {"bots": [{"bot_username": "topic_bot", "token": "T", "mode": "topic"}]}}).to_string(),
    )
    .unwrap();
    std::fs::write(td.path().join("blacklist.json"), json!({"topic_bot": [1, 2]}).to_string()).unwrap();

    let store = setup_store().await;
    let report = Migrator::new(td.path()).migrate_all(&store).await;

    assert_eq!(report.stats.bots, 0);
    assert_eq!(report.stats.blacklist, 2);
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].contains("unknown mode"));

    let bot = db::fetch_bot(store.pool(), "topic_bot").await.unwrap().unwrap();
    assert_eq!(bot.mode, BotMode::Direct);
    assert_eq!(bot.owner, 42);
    assert_eq!(db::list_blacklist(store.pool(), "topic_bot").await.unwrap().len(), 2);
}
