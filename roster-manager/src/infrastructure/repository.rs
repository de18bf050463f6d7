// =====================
// 文書リポジトリ
// =====================
//
// 4 種類の文書 (ロスター / 名簿 / リクエストログ / アクティビティログ) と
// セッションを型付きで読み書きする。論理名 -> 文書名の対応はここだけが持つ。
//
// load_*  : 画面表示用。欠損・破損は空の既定値にして警告を出すだけ
// fetch_* : 更新処理用。ストア層のエラーをそのまま返す

use std::collections::BTreeSet;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::domain::error::StoreError;
use crate::domain::models::*;
use crate::infrastructure::document_store::DualBackendStore;
use crate::infrastructure::naming::{
    is_roster_document_name, unsanitize_name, CURRENT_USER, LEGACY_REQUESTS, REQUESTS,
    TEAM_ACTIVITIES, TEAM_MEMBERS,
};

pub struct DocumentRepository {
    store: DualBackendStore,
    activity_limit: usize,
}

impl DocumentRepository {
    pub fn new(store: DualBackendStore, activity_limit: usize) -> Self {
        Self {
            store,
            activity_limit,
        }
    }

    pub fn store(&self) -> &DualBackendStore {
        &self.store
    }

    // --- 共通 ---

    /// 無ければ None、壊れていれば Serialization エラー
    async fn fetch_document<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.store.read(name).await {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{name}: {e}"))),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match self.fetch_document(name).await {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(name, error = %e, "treating unreadable document as empty");
                T::default()
            }
        }
    }

    async fn save_document<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        self.store.write(name, &json).await
    }

    // --- Team Directory ---

    pub async fn load_team_directory(&self) -> TeamDirectory {
        self.load_or_default(TEAM_MEMBERS).await
    }

    pub async fn fetch_team_directory(&self) -> Result<TeamDirectory, StoreError> {
        Ok(self.fetch_document(TEAM_MEMBERS).await?.unwrap_or_default())
    }

    pub async fn save_team_directory(&self, directory: &TeamDirectory) -> Result<(), StoreError> {
        self.save_document(TEAM_MEMBERS, directory).await
    }

    // --- Request Log ---

    /// ローカルにある方の名前を使う (生の名前を優先)。どちらも無ければ生の名前。
    /// リモート上ではどちらも files/requests_DOT_json になる
    pub fn request_log_name(&self) -> &'static str {
        let names = match self.store.list() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "failed to list local documents");
                return REQUESTS;
            }
        };
        [REQUESTS, LEGACY_REQUESTS]
            .into_iter()
            .find(|candidate| names.iter().any(|n| n == candidate))
            .unwrap_or(REQUESTS)
    }

    /// 重複を除いたリクエスト一覧。重複があった場合はその場で書き戻す
    pub async fn fetch_requests(&self) -> Result<Vec<ChangeRequest>, StoreError> {
        let name = self.request_log_name();

        // 1. 読み込み
        let requests: Vec<ChangeRequest> = self.fetch_document(name).await?.unwrap_or_default();

        // 2. 重複除去
        let (unique, removed) = dedupe_requests(requests);

        // 3. 重複があれば保存し直す
        if removed > 0 {
            info!(removed, name, "removed duplicate change requests");
            self.save_document(name, &unique).await?;
        }
        Ok(unique)
    }

    pub async fn load_requests(&self) -> Vec<ChangeRequest> {
        match self.fetch_requests().await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(error = %e, "treating unreadable request log as empty");
                Vec::new()
            }
        }
    }

    pub async fn save_requests(&self, requests: &[ChangeRequest]) -> Result<(), StoreError> {
        let name = self.request_log_name();
        self.save_document(name, requests).await
    }

    // --- Activity Log ---

    pub async fn load_activities(&self) -> ActivityLog {
        self.load_or_default(TEAM_ACTIVITIES).await
    }

    /// 先頭に追加し、新しい順に activity_limit 件だけ残す
    pub async fn append_activity(&self, activity: Activity) -> Result<(), StoreError> {
        let mut log = self.load_activities().await;
        log.last_updated = Some(activity.timestamp);
        log.activities.insert(0, activity);
        log.activities.truncate(self.activity_limit);
        self.save_document(TEAM_ACTIVITIES, &log).await
    }

    pub async fn recent_activities(&self, limit: usize) -> Vec<Activity> {
        let mut log = self.load_activities().await;
        log.activities.truncate(limit);
        log.activities
    }

    // --- Rosters ---

    /// ローカルにあるロスター文書名 (別名で保存された旧データも生の名前に直す)
    pub fn roster_names(&self) -> Result<Vec<String>, StoreError> {
        let names: BTreeSet<String> = self
            .store
            .list()?
            .into_iter()
            .filter(|name| is_roster_document_name(name))
            .map(|name| unsanitize_name(&name))
            .collect();
        Ok(names.into_iter().collect())
    }

    /// 読めるロスターをすべて返す (壊れたものは飛ばす)
    pub async fn load_rosters(&self) -> Vec<StoredRoster> {
        let names = match self.roster_names() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "failed to list rosters");
                return Vec::new();
            }
        };

        let mut rosters = Vec::with_capacity(names.len());
        for name in names {
            match self.fetch_document::<Roster>(&name).await {
                Ok(Some(roster)) => rosters.push(StoredRoster { name, roster }),
                Ok(None) => {}
                Err(e) => warn!(name = %name, error = %e, "skipping unreadable roster"),
            }
        }
        rosters
    }

    pub async fn fetch_roster(&self, name: &str) -> Result<Option<Roster>, StoreError> {
        self.fetch_document(name).await
    }

    pub async fn save_roster(&self, name: &str, roster: &Roster) -> Result<(), StoreError> {
        self.save_document(name, roster).await
    }

    pub async fn delete_roster(&self, name: &str) -> Result<(), StoreError> {
        self.store.delete(name).await
    }

    // --- Session ---

    pub async fn load_session(&self) -> Option<CurrentUser> {
        match self.fetch_document::<CurrentUser>(CURRENT_USER).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session");
                None
            }
        }
    }

    pub async fn save_session(&self, user: &CurrentUser) -> Result<(), StoreError> {
        self.save_document(CURRENT_USER, user).await
    }

    pub async fn clear_session(&self) -> Result<(), StoreError> {
        self.store.delete(CURRENT_USER).await
    }
}
