use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let interaction_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'interaction'",
        )
        .fetch_one(&pool)
        .await
        .expect("check interaction table")
        .get::<i64, _>("count");

        let knowledge_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'knowledge_base'",
        )
        .fetch_one(&pool)
        .await
        .expect("check knowledge_base table")
        .get::<i64, _>("count");

        assert_eq!(interaction_count, 1);
        assert_eq!(knowledge_count, 1);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let interaction_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'interaction'",
        )
        .fetch_one(&pool)
        .await
        .expect("check interaction table removed")
        .get::<i64, _>("count");

        assert_eq!(interaction_count, 0);
    }

    #[tokio::test]
    async fn interaction_event_id_is_unique() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let insert = "INSERT INTO interaction \
                      (event_id, channel, status, created_at, updated_at) \
                      VALUES ('sms_SM1', 'sms', 'processing', '2026-03-16T12:00:00+00:00', '2026-03-16T12:00:00+00:00')";
        sqlx::query(insert).execute(&pool).await.expect("first insert");

        let duplicate = sqlx::query(insert).execute(&pool).await;
        let error = duplicate.expect_err("duplicate event_id must be rejected");
        match error {
            sqlx::Error::Database(db_error) => assert!(db_error.is_unique_violation()),
            other => panic!("expected database error, got {other:?}"),
        }
    }
}
