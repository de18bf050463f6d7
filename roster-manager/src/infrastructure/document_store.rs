// =====================
// 二層ストア (Dual-Backend Key-Value Store)
// =====================
//
// 整合性ポリシー:
//   読み込み: リモートに値があればリモートが正 (ローカルのキャッシュを上書き)
//   書き込み: ローカルが記録の正本。リモートへの複製は失敗しても警告のみ
//   一覧   : ローカルの名前空間だけを列挙する
//
// 同じプロセス内のユーザー書き込みとリアルタイム同期の反映は、
// write_gate で相互排他にする。

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::error::StoreError;
use crate::infrastructure::local_store::LocalStore;
use crate::infrastructure::naming::{default_document, sanitize_name, unsanitize_name, REMOTE_ROOT};
use crate::infrastructure::remote_store::{RemoteChange, RemoteStore};

/// 空とみなすローカルの値
fn is_blank(content: &str) -> bool {
    matches!(content.trim(), "" | "{}" | "null")
}

#[derive(Clone)]
pub struct DualBackendStore {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    write_gate: Arc<Mutex<()>>,
}

impl DualBackendStore {
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            local,
            remote,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// ローカル (生の名前 / 別名) にあるか、なければリモートにあるか
    pub async fn exists(&self, name: &str) -> bool {
        if self.read_local(name).is_some() {
            return true;
        }
        match self.remote.read(&sanitize_name(name)).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(name, error = %e, "remote exists check failed");
                false
            }
        }
    }

    pub async fn read(&self, name: &str) -> Result<String, StoreError> {
        let alias = sanitize_name(name);

        // 1. リモートを優先
        match self.remote.read(&alias).await {
            Ok(Some(content)) => {
                let _guard = self.write_gate.lock().await;
                if let Err(e) = self.local.set(name, &content) {
                    warn!(name, error = %e, "failed to refresh local cache");
                }
                debug!(name, "read from remote");
                return Ok(content);
            }
            Ok(None) => {}
            Err(e) => warn!(name, error = %e, "remote read failed, falling back to local"),
        }

        // 2. ローカル (生の名前 -> 別名の順)。見つかればリモートへ移行する
        if let Some(content) = self.read_local(name) {
            if let Err(e) = self.remote.write(&alias, &content).await {
                warn!(name, error = %e, "migration to remote failed");
            } else {
                debug!(name, "migrated local document to remote");
            }
            return Ok(content);
        }

        // 3. 既知の文書なら空の既定値
        match default_document(name) {
            Some(default) => {
                debug!(name, "document missing, using default");
                Ok(default.to_string())
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    /// ローカルへ即座に書き込み、リモートへは可能なら複製する
    pub async fn write(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let _guard = self.write_gate.lock().await;

        self.local.set(name, content)?;

        if let Err(e) = self.remote.write(&sanitize_name(name), content).await {
            warn!(name, error = %e, "remote write failed, kept local copy only");
        }
        Ok(())
    }

    /// ローカルに存在する文書名 (昇順)
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = self.local.keys()?;
        names.sort();
        Ok(names)
    }

    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let _guard = self.write_gate.lock().await;
        let alias = sanitize_name(name);

        self.local.remove(name)?;
        if alias != name {
            self.local.remove(&alias)?;
        }

        if let Err(e) = self.remote.delete(&alias).await {
            warn!(name, error = %e, "remote delete failed");
        }
        Ok(())
    }

    /// リモートの全文書でローカルを作り直す。戻り値は同期した件数。
    /// リモートの取得に失敗した場合はローカルに手を付けない
    pub async fn force_sync_from_remote(&self) -> Result<usize, StoreError> {
        // 1. まとめて取得
        let documents = self.remote.read_all().await?;
        if documents.is_empty() {
            return Err(StoreError::NotFound(REMOTE_ROOT.to_string()));
        }

        // 2. ローカルを入れ替え
        let _guard = self.write_gate.lock().await;
        self.local.clear()?;
        for (alias, content) in &documents {
            self.local.set(&unsanitize_name(alias), content)?;
        }

        info!(count = documents.len(), "local store resynced from remote");
        Ok(documents.len())
    }

    /// リモートの変更をローカルへ反映し続ける購読を開始する。
    /// 反映のたびに文書名を on_change に渡す。tokio ランタイム内で呼ぶこと。
    pub fn start_realtime_sync<F>(&self, on_change: F) -> SyncSubscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut changes = self.remote.subscribe();
        let token = CancellationToken::new();
        let store = self.clone();
        let cancelled = token.clone();

        tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    received = changes.recv() => received,
                };

                match change {
                    Ok(change) => {
                        if cancelled.is_cancelled() {
                            break;
                        }
                        match store.apply_remote_change(&change).await {
                            Ok(name) => on_change(&name),
                            Err(e) => warn!(alias = %change.alias, error = %e, "failed to apply remote change"),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "realtime sync lagged behind remote changes");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("realtime sync stopped");
        });

        SyncSubscription { token }
    }

    /// 通知された変更をローカルへ書く。
    /// 通知の順序に依存しないよう、可能ならリモートの最新値を取り直す
    async fn apply_remote_change(&self, change: &RemoteChange) -> Result<String, StoreError> {
        let name = unsanitize_name(&change.alias);
        let latest = match self.remote.read(&change.alias).await {
            Ok(latest) => latest,
            Err(_) => change.content.clone(),
        };

        let _guard = self.write_gate.lock().await;
        match latest {
            Some(content) => self.local.set(&name, &content)?,
            None => self.local.remove(&name)?,
        }
        debug!(name = %name, "applied remote change");
        Ok(name)
    }

    /// ローカルの全文書 (名前 -> 内容)
    pub fn export_snapshot(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let mut snapshot = BTreeMap::new();
        for key in self.local.keys()? {
            if let Some(content) = self.local.get(&key)? {
                snapshot.insert(key, content);
            }
        }
        Ok(snapshot)
    }

    /// スナップショットの各文書を通常の書き込み経路で取り込む
    pub async fn import_snapshot(&self, snapshot: &BTreeMap<String, String>) -> Result<usize, StoreError> {
        for (name, content) in snapshot {
            self.write(name, content).await?;
        }
        info!(count = snapshot.len(), "snapshot imported");
        Ok(snapshot.len())
    }

    pub async fn test_connection(&self) -> bool {
        self.remote.ping().await.is_ok()
    }

    fn read_local(&self, name: &str) -> Option<String> {
        let alias = sanitize_name(name);
        let candidates = if alias == name { vec![name] } else { vec![name, alias.as_str()] };

        for key in candidates {
            match self.local.get(key) {
                Ok(Some(content)) if !is_blank(&content) => return Some(content),
                Ok(_) => {}
                Err(e) => warn!(key, error = %e, "local read failed"),
            }
        }
        None
    }
}

/// リアルタイム同期の購読。unsubscribe は何度呼んでもよい。
/// drop されたときも配信を止める
#[derive(Debug)]
pub struct SyncSubscription {
    token: CancellationToken,
}

impl SyncSubscription {
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
