// =====================
// リモートバックエンド (非同期 / 端末間同期用)
// =====================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::domain::error::RemoteError;
use crate::infrastructure::naming::REMOTE_ROOT;

/// 通知チャネルの容量
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// リモート側で起きた変更 (content が None なら削除)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChange {
    pub alias: String,
    pub content: Option<String>,
}

/// リモート文書ストア。文書はエスケープ済みの別名で files/<別名> に置かれる
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read(&self, alias: &str) -> Result<Option<String>, RemoteError>;

    async fn write(&self, alias: &str, content: &str) -> Result<(), RemoteError>;

    async fn delete(&self, alias: &str) -> Result<(), RemoteError>;

    /// files 配下を 1 回の呼び出しですべて取得する。(別名, 内容)
    async fn read_all(&self) -> Result<Vec<(String, String)>, RemoteError>;

    /// 変更通知の購読
    fn subscribe(&self) -> broadcast::Receiver<RemoteChange>;

    /// 接続確認
    async fn ping(&self) -> Result<(), RemoteError> {
        self.read("__ping__").await.map(|_| ())
    }
}

pub(crate) fn document_path(alias: &str) -> String {
    format!("{REMOTE_ROOT}/{alias}")
}

pub(crate) fn alias_of(path: &str) -> Option<&str> {
    path.strip_prefix(REMOTE_ROOT)?.strip_prefix('/')
}

// =====================
// メモリ実装 (テスト / オフライン動作確認用)
// =====================

pub struct InMemoryRemoteStore {
    documents: Mutex<BTreeMap<String, String>>,
    offline: AtomicBool,
    changes: broadcast::Sender<RemoteChange>,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            documents: Mutex::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            changes,
        }
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// true の間はすべての呼び出しが Unavailable で失敗する
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// 保存されているパスの一覧 (files/<別名>)
    pub fn paths(&self) -> Vec<String> {
        self.documents.lock().keys().cloned().collect()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("remote store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn read(&self, alias: &str) -> Result<Option<String>, RemoteError> {
        self.check_online()?;
        Ok(self.documents.lock().get(&document_path(alias)).cloned())
    }

    async fn write(&self, alias: &str, content: &str) -> Result<(), RemoteError> {
        self.check_online()?;
        self.documents
            .lock()
            .insert(document_path(alias), content.to_string());
        // 購読者がいなくてもエラーにしない
        let _ = self.changes.send(RemoteChange {
            alias: alias.to_string(),
            content: Some(content.to_string()),
        });
        Ok(())
    }

    async fn delete(&self, alias: &str) -> Result<(), RemoteError> {
        self.check_online()?;
        let removed = self.documents.lock().remove(&document_path(alias));
        if removed.is_some() {
            let _ = self.changes.send(RemoteChange {
                alias: alias.to_string(),
                content: None,
            });
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<(String, String)>, RemoteError> {
        self.check_online()?;
        Ok(self
            .documents
            .lock()
            .iter()
            .filter_map(|(path, content)| alias_of(path).map(|a| (a.to_string(), content.clone())))
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteChange> {
        self.changes.subscribe()
    }
}
