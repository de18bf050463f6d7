use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::error::RemoteError;
use crate::infrastructure::remote_store::{
    alias_of, document_path, RemoteChange, RemoteStore, CHANGE_CHANNEL_CAPACITY,
};

/// SQLite をリモート文書ストアとして使う実装。
/// 変更通知は同じプロセス内の書き込みについてのみ届く。
pub struct SqliteRemoteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<RemoteChange>,
}

// =====================
// DB読み込み用ヘルパー構造体
// =====================

#[derive(FromRow)]
struct RemoteDocumentRow {
    path: String,
    content: String,
}

impl SqliteRemoteStore {
    /// マイグレーション済みのプールから作る
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// 接続してマイグレーションを流す
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RemoteError> {
        // 1. 接続設定 (ファイルがなければ作る)
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // 2. 接続
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        // 3. テーブル
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        info!(url, "remote document store ready");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RemoteStore for SqliteRemoteStore {
    async fn read(&self, alias: &str) -> Result<Option<String>, RemoteError> {
        let content: Option<String> =
            sqlx::query_scalar("SELECT content FROM remote_documents WHERE path = ?1")
                .bind(document_path(alias))
                .fetch_optional(&self.pool)
                .await?;
        Ok(content)
    }

    async fn write(&self, alias: &str, content: &str) -> Result<(), RemoteError> {
        sqlx::query(
            "INSERT INTO remote_documents (path, content, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at",
        )
        .bind(document_path(alias))
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(alias, "remote document written");
        let _ = self.changes.send(RemoteChange {
            alias: alias.to_string(),
            content: Some(content.to_string()),
        });
        Ok(())
    }

    async fn delete(&self, alias: &str) -> Result<(), RemoteError> {
        let result = sqlx::query("DELETE FROM remote_documents WHERE path = ?1")
            .bind(document_path(alias))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            let _ = self.changes.send(RemoteChange {
                alias: alias.to_string(),
                content: None,
            });
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<(String, String)>, RemoteError> {
        let rows: Vec<RemoteDocumentRow> = sqlx::query_as::<sqlx::Sqlite, RemoteDocumentRow>(
            "SELECT path, content FROM remote_documents WHERE path LIKE 'files/%' ORDER BY path ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| alias_of(&row.path).map(|alias| (alias.to_string(), row.content)))
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteChange> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod sqlite_remote_tests {
    use super::*;

    // メモリ上のDBを使用（接続 1 本で共有する）
    async fn setup_test_store() -> SqliteRemoteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create memory pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        SqliteRemoteStore::new(pool)
    }

    #[tokio::test]
    async fn test_write_overwrite_and_read_all() {
        let store = setup_test_store().await;

        store.write("team_members_DOT_json", r#"{"members":[]}"#).await.unwrap();
        store.write("requests_DOT_json", "[]").await.unwrap();
        store.write("requests_DOT_json", r#"[{"id":"x"}]"#).await.unwrap();

        assert_eq!(
            store.read("requests_DOT_json").await.unwrap().as_deref(),
            Some(r#"[{"id":"x"}]"#)
        );
        assert_eq!(store.read("missing").await.unwrap(), None);

        let all = store.read_all().await.unwrap();
        let aliases: Vec<&str> = all.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(aliases, vec!["requests_DOT_json", "team_members_DOT_json"]);

        store.delete("requests_DOT_json").await.unwrap();
        assert_eq!(store.read_all().await.unwrap().len(), 1);
        assert!(store.ping().await.is_ok());
    }
}
