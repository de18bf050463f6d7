// =====================
// 派生ビューの組み立て (Derived-View Builder)
// =====================
//
// 毎回リポジトリから読み直して計算する (キャッシュしない)。
// 欠損・破損データは空として扱い、ここからエラーは返さない。

use std::sync::Arc;

use crate::application::time::Clock;
use crate::domain::models::*;
use crate::domain::views::{self, ActivityEntry, AssignmentView, DashboardCounts};
use crate::infrastructure::repository::DocumentRepository;

pub struct ViewBuilder {
    repository: Arc<DocumentRepository>,
    clock: Arc<dyn Clock>,
    request_window_days: i64,
}

impl ViewBuilder {
    pub fn new(repository: Arc<DocumentRepository>, clock: Arc<dyn Clock>, request_window_days: i64) -> Self {
        Self {
            repository,
            clock,
            request_window_days,
        }
    }

    /// 今日以降の本人の担当 (日付昇順)
    pub async fn upcoming_assignments(&self, user: &CurrentUser) -> Vec<AssignmentView> {
        let rosters = self.repository.load_rosters().await;
        views::upcoming_assignments(&rosters, &user.identity(), self.clock.today())
    }

    /// 変更申請の対象にできる日程
    pub async fn eligible_request_dates(&self, user: &CurrentUser) -> Vec<AssignmentView> {
        let rosters = self.repository.load_rosters().await;
        views::eligible_request_dates(
            &rosters,
            &user.identity(),
            self.clock.today(),
            self.request_window_days,
        )
    }

    pub async fn latest_request(&self, user: &CurrentUser) -> Option<ChangeRequest> {
        let requests = self.repository.load_requests().await;
        views::latest_request(&requests, &user.identity()).cloned()
    }

    /// 管理者ダッシュボード
    pub async fn dashboard_counts(&self) -> DashboardCounts {
        let directory = self.repository.load_team_directory().await;
        let requests = self.repository.load_requests().await;
        let rosters = self.repository.load_rosters().await;
        views::dashboard_counts(&directory, &requests, &rosters)
    }

    /// 管理者が見るメンバーの全担当 (過去分を含む)
    pub async fn member_schedule(&self, member: &TeamMember) -> Vec<AssignmentView> {
        let rosters = self.repository.load_rosters().await;
        let identity = MemberIdentity::new(Some(&member.member_code), &member.name);
        views::member_schedule(&rosters, &identity)
    }

    pub async fn rosters_for_month(&self, month: &str) -> Vec<StoredRoster> {
        let rosters = self.repository.load_rosters().await;
        views::rosters_for_month(&rosters, month)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn requests(&self, filter: Option<RequestStatus>) -> Vec<ChangeRequest> {
        let requests = self.repository.load_requests().await;
        views::requests_by_status(&requests, filter)
    }

    /// 最近の活動 (新しい順、経過時間つき)
    pub async fn recent_activities(&self, limit: usize) -> Vec<ActivityEntry> {
        let activities = self.repository.recent_activities(limit).await;
        views::activity_feed(activities, self.clock.now())
    }
}
