// =====================
// 画面から呼ばれるコマンド
// =====================
//
// 型付きのエラーはここで文字列に変換して画面へ返す。

use crate::application::dto::{NewMemberInput, PublishedRoster, SlotAssignment, SubmitRequestInput};
use crate::domain::models::*;
use crate::domain::views::{ActivityEntry, AssignmentView, DashboardCounts};
use crate::AppServices;

const NOT_SIGNED_IN: &str = "not signed in";

/// セッションから本人を取り出す
async fn signed_in(services: &AppServices) -> Result<CurrentUser, String> {
    services
        .session
        .current_user()
        .await
        .ok_or_else(|| NOT_SIGNED_IN.to_string())
}

// --- Session ---
pub async fn login(services: &AppServices, member_code: String) -> Result<CurrentUser, String> {
    services
        .session
        .login(&member_code)
        .await
        .map_err(|e| e.to_string())
}

pub async fn logout(services: &AppServices) -> Result<(), String> {
    services.session.logout().await.map_err(|e| e.to_string())
}

pub async fn current_user(services: &AppServices) -> Result<Option<CurrentUser>, String> {
    Ok(services.session.current_user().await)
}

// --- Schedule ---
pub async fn publish_roster(
    services: &AppServices,
    month: String,
    event_type: String,
    slots: Vec<SlotAssignment>,
) -> Result<PublishedRoster, String> {
    services
        .schedule
        .publish_roster(&month, &event_type, &slots)
        .await
        .map_err(|e| e.to_string())
}

pub async fn list_rosters_for_month(services: &AppServices, month: String) -> Result<Vec<Roster>, String> {
    let rosters = services.views.rosters_for_month(&month).await;
    Ok(rosters.into_iter().map(|stored| stored.roster).collect())
}

// --- Member dashboard ---
pub async fn my_upcoming_assignments(services: &AppServices) -> Result<Vec<AssignmentView>, String> {
    let user = signed_in(services).await?;
    Ok(services.views.upcoming_assignments(&user).await)
}

pub async fn my_latest_request(services: &AppServices) -> Result<Option<ChangeRequest>, String> {
    let user = signed_in(services).await?;
    Ok(services.views.latest_request(&user).await)
}

pub async fn my_eligible_request_dates(services: &AppServices) -> Result<Vec<AssignmentView>, String> {
    let user = signed_in(services).await?;
    Ok(services.views.eligible_request_dates(&user).await)
}

pub async fn submit_change_request(
    services: &AppServices,
    input: SubmitRequestInput,
) -> Result<ChangeRequest, String> {
    let user = signed_in(services).await?;
    services
        .requests
        .submit(&user, input)
        .await
        .map_err(|e| e.to_string())
}

// --- Admin ---
pub async fn list_requests(
    services: &AppServices,
    status: Option<RequestStatus>,
) -> Result<Vec<ChangeRequest>, String> {
    Ok(services.views.requests(status).await)
}

pub async fn approve_request(services: &AppServices, request_id: String) -> Result<ChangeRequest, String> {
    services
        .requests
        .approve(&request_id, &services.config.reviewer_name)
        .await
        .map_err(|e| e.to_string())
}

pub async fn deny_request(
    services: &AppServices,
    request_id: String,
    admin_notes: Option<String>,
) -> Result<ChangeRequest, String> {
    services
        .requests
        .deny(&request_id, &services.config.reviewer_name, admin_notes)
        .await
        .map_err(|e| e.to_string())
}

pub async fn admin_dashboard(services: &AppServices) -> Result<DashboardCounts, String> {
    Ok(services.views.dashboard_counts().await)
}

pub async fn recent_activity(services: &AppServices) -> Result<Vec<ActivityEntry>, String> {
    Ok(services
        .views
        .recent_activities(services.config.activity_log_limit)
        .await)
}

pub async fn add_team_member(services: &AppServices, input: NewMemberInput) -> Result<TeamMember, String> {
    services.team.add_member(input).await.map_err(|e| e.to_string())
}

pub async fn remove_team_member(services: &AppServices, member_id: String) -> Result<TeamMember, String> {
    services
        .team
        .remove_member(&member_id)
        .await
        .map_err(|e| e.to_string())
}

/// リモートの内容でローカルを作り直す。同期した文書数を返す
pub async fn force_sync_from_remote(services: &AppServices) -> Result<usize, String> {
    services
        .store
        .force_sync_from_remote()
        .await
        .map_err(|e| e.to_string())
}
