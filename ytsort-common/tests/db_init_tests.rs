//! Database initialization on first run and reopen

use ytsort_common::db::init::init_database;

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("ytsort.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_existing_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ytsort.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO memberships (item_id, collection_id, entry_id, position, updated_at) VALUES ('v', 'PL', 'e', 0, 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let reopened = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memberships")
        .fetch_one(&reopened)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
