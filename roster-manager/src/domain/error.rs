// =====================
// エラー定義
// =====================

use thiserror::Error;

use crate::domain::models::RequestStatus;

/// リモートバックエンドの失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote backend unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RemoteError {
    fn from(e: sqlx::Error) -> Self {
        RemoteError::Unavailable(e.to_string())
    }
}

/// ストア層 / リポジトリ層のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("invalid document name: {0}")]
    InvalidName(String),

    #[error("local storage failure: {0}")]
    Local(String),

    #[error("remote backend unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn local(e: impl std::fmt::Display) -> Self {
        StoreError::Local(e.to_string())
    }
}

impl From<RemoteError> for StoreError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Unavailable(msg) => StoreError::RemoteUnavailable(msg),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// 変更リクエストのライフサイクルで発生するエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("{field} is required")]
    Validation { field: &'static str },

    #[error("an identical request was already submitted ({existing_id})")]
    Duplicate { existing_id: String },

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("request {id} was already {status}")]
    AlreadyReviewed { id: String, status: RequestStatus },

    /// 承認対象のロスター / 日程 / 担当が見つからない
    #[error("member not found in schedule: {0}")]
    ReferentialMismatch(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// チームメンバー管理のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeamError {
    #[error("{field} is required")]
    Validation { field: &'static str },

    #[error("a team member with email {0} already exists")]
    EmailExists(String),

    #[error("team member not found: {0}")]
    MemberNotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// ロスター公開のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no occurrences for {event_type} in {month}")]
    NoOccurrences { month: String, event_type: String },

    #[error("unassigned slots: {}", .0.join(", "))]
    Incomplete(Vec<String>),

    #[error("unknown member code: {0}")]
    UnknownMember(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// ログイン / セッションのエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid member code: {0}")]
    InvalidMemberCode(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
