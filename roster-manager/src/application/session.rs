// =====================
// セッション (current_user.json)
// =====================
//
// ログインで作られ、ログアウトで消える。
// 画面側はここで得た CurrentUser をビューやリクエスト処理へ明示的に渡す。

use std::sync::Arc;

use tracing::info;

use crate::application::time::Clock;
use crate::domain::error::SessionError;
use crate::domain::models::{CurrentUser, MemberStatus};
use crate::infrastructure::repository::DocumentRepository;

pub struct SessionService {
    repository: Arc<DocumentRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(repository: Arc<DocumentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// メンバーコードでログインする (パスワードなし)。有効なメンバーのみ
    pub async fn login(&self, member_code: &str) -> Result<CurrentUser, SessionError> {
        let code = member_code.trim().to_uppercase();
        let directory = self.repository.fetch_team_directory().await?;

        let member = directory
            .find_by_code(&code)
            .filter(|m| m.status == MemberStatus::Active)
            .ok_or_else(|| SessionError::InvalidMemberCode(code.clone()))?;

        let user = CurrentUser::from_member(member, self.clock.now());
        self.repository.save_session(&user).await?;

        info!(code = %user.member_code, "member signed in");
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.repository.clear_session().await?;
        info!("member signed out");
        Ok(())
    }

    /// 保存済みのセッション (起動時の復元用)
    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.repository.load_session().await
    }
}
