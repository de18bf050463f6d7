use std::sync::Arc;

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

use application::request_engine::RequestEngine;
use application::schedule::ScheduleService;
use application::session::SessionService;
use application::team::TeamService;
use application::time::{Clock, SystemClock};
use application::view_builder::ViewBuilder;
use config::AppConfig;
use domain::error::StoreError;
use infrastructure::document_store::DualBackendStore;
use infrastructure::local_store::{FileLocalStore, LocalStore};
use infrastructure::remote_store::RemoteStore;
use infrastructure::repository::DocumentRepository;
use infrastructure::sqlite_remote::SqliteRemoteStore;
use tracing::info;

// 全てのリポジトリとサービスを保持するコンテナ
pub struct AppServices {
    pub config: AppConfig,
    pub store: DualBackendStore,
    pub repository: Arc<DocumentRepository>,
    pub views: Arc<ViewBuilder>,
    pub requests: RequestEngine,
    pub team: TeamService,
    pub session: SessionService,
    pub schedule: ScheduleService,
}

impl AppServices {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        config: AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // store は内部で Arc を共有しているので clone しても低コスト
        let store = DualBackendStore::new(local, remote);
        let repository = Arc::new(DocumentRepository::new(store.clone(), config.activity_log_limit));
        let views = Arc::new(ViewBuilder::new(
            repository.clone(),
            clock.clone(),
            config.request_window_days,
        ));

        Self {
            requests: RequestEngine::new(repository.clone(), views.clone(), clock.clone()),
            team: TeamService::new(repository.clone(), clock.clone()),
            session: SessionService::new(repository.clone(), clock.clone()),
            schedule: ScheduleService::new(repository.clone(), clock),
            store,
            repository,
            views,
            config,
        }
    }

    /// 設定どおりにバックエンドを開く
    /// (ローカル: data_dir 以下のファイル / リモート: SQLite)
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        // --- ローカル ---
        let local = FileLocalStore::open(&config.data_dir)?;
        info!(dir = %config.data_dir.display(), "local store opened");

        // --- リモート (マイグレーション込み) ---
        let remote = SqliteRemoteStore::connect(&config.remote_url, config.remote_max_connections).await?;

        Ok(Self::new(
            Arc::new(local),
            Arc::new(remote),
            config.clone(),
            Arc::new(SystemClock),
        ))
    }
}
