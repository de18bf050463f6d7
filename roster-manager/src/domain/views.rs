// =====================
// 派生ビューの計算 (純粋関数)
// =====================
//
// ロスター / メンバー名簿 / リクエストログを走査して、画面表示用の値を作る。
// I/O は行わない。読み込みは application::view_builder 側の責務。

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::models::*;
use crate::domain::recurrence::{event_time, occurrence_description};

/// 1 件の担当 (メンバー視点)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub roster_name: String,
    pub month: String,
    pub event_type: String,
    pub occurrence_index: usize,
    pub date: NaiveDate,
    pub date_label: String,
    pub time: String,
    pub role: String,
    pub status: String,
}

impl AssignmentView {
    /// 申請対象の説明文 ("Sunday, October 5 - 9:30 AM")
    pub fn description(&self) -> String {
        occurrence_description(self.date, &self.event_type)
    }

    /// 承認時に使う正確な参照
    pub fn target(&self) -> OccurrenceRef {
        OccurrenceRef {
            roster_name: self.roster_name.clone(),
            occurrence_index: self.occurrence_index,
            role: self.role.clone(),
        }
    }
}

/// 管理者ダッシュボードの集計値
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_members: usize,
    pub active_members: usize,
    pub roster_count: usize,
    pub pending_requests: usize,
    pub approved_requests: usize,
    pub denied_requests: usize,
    pub filled_slots: usize,
    pub total_slots: usize,
}

/// 本人の担当をすべて列挙する (日付昇順、同日はロスター名順)
pub fn member_schedule(rosters: &[StoredRoster], who: &MemberIdentity) -> Vec<AssignmentView> {
    let mut views: Vec<AssignmentView> = rosters
        .iter()
        .flat_map(|stored| {
            stored
                .roster
                .dates
                .iter()
                .enumerate()
                .flat_map(move |(index, occurrence)| {
                    occurrence
                        .assignments
                        .iter()
                        .filter(|a| who.matches(a))
                        .map(move |a| AssignmentView {
                            roster_name: stored.name.clone(),
                            month: stored.roster.month.clone(),
                            event_type: stored.roster.event_type.clone(),
                            occurrence_index: index,
                            date: occurrence.full_date,
                            date_label: occurrence.date.clone(),
                            time: event_time(&stored.roster.event_type),
                            role: a.role.clone(),
                            status: a.status.clone(),
                        })
                })
        })
        .collect();

    views.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.roster_name.cmp(&b.roster_name))
            .then_with(|| a.occurrence_index.cmp(&b.occurrence_index))
    });
    views
}

/// 今日以降の担当 (日単位で比較)
pub fn upcoming_assignments(
    rosters: &[StoredRoster],
    who: &MemberIdentity,
    today: NaiveDate,
) -> Vec<AssignmentView> {
    member_schedule(rosters, who)
        .into_iter()
        .filter(|v| v.date >= today)
        .collect()
}

/// 変更申請できる日程: 本人の担当のうち今日から window_days 日以内のもの
pub fn eligible_request_dates(
    rosters: &[StoredRoster],
    who: &MemberIdentity,
    today: NaiveDate,
    window_days: i64,
) -> Vec<AssignmentView> {
    let until = today + Duration::days(window_days);
    upcoming_assignments(rosters, who, today)
        .into_iter()
        .filter(|v| v.date <= until)
        .collect()
}

pub fn dashboard_counts(
    directory: &TeamDirectory,
    requests: &[ChangeRequest],
    rosters: &[StoredRoster],
) -> DashboardCounts {
    let mut counts = DashboardCounts {
        total_members: directory.members.len(),
        active_members: directory
            .members
            .iter()
            .filter(|m| m.status == MemberStatus::Active)
            .count(),
        roster_count: rosters.len(),
        ..Default::default()
    };

    for request in requests {
        match request.status {
            RequestStatus::Pending => counts.pending_requests += 1,
            RequestStatus::Approved => counts.approved_requests += 1,
            RequestStatus::Denied => counts.denied_requests += 1,
        }
    }

    for assignment in rosters
        .iter()
        .flat_map(|r| r.roster.dates.iter())
        .flat_map(|o| o.assignments.iter())
    {
        counts.total_slots += 1;
        if assignment.is_filled() {
            counts.filled_slots += 1;
        }
    }

    counts
}

/// 本人 (コードまたは名前) の最新リクエスト
pub fn latest_request<'a>(
    requests: &'a [ChangeRequest],
    who: &MemberIdentity,
) -> Option<&'a ChangeRequest> {
    requests
        .iter()
        .filter(|r| {
            let by_code = who
                .member_code
                .as_deref()
                .is_some_and(|code| !r.member_code.is_empty() && r.member_code.eq_ignore_ascii_case(code));
            by_code || r.member_name == who.name
        })
        .max_by_key(|r| r.submitted_at)
}

/// 管理者のリクエスト一覧 (新しい順、None は全件)
pub fn requests_by_status(
    requests: &[ChangeRequest],
    filter: Option<RequestStatus>,
) -> Vec<ChangeRequest> {
    let mut list: Vec<ChangeRequest> = requests
        .iter()
        .filter(|r| filter.is_none_or(|status| r.status == status))
        .cloned()
        .collect();
    list.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    list
}

/// 月でロスターを絞り込む
pub fn rosters_for_month<'a>(rosters: &'a [StoredRoster], month: &str) -> Vec<&'a StoredRoster> {
    rosters
        .iter()
        .filter(|r| r.roster.month.eq_ignore_ascii_case(month.trim()))
        .collect()
}

/// 最終更新からの経過を "Just now" / "5m ago" の形で返す
pub fn time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();
    match minutes {
        m if m < 1 => "Just now".to_string(),
        m if m < 60 => format!("{m}m ago"),
        m if m < 60 * 24 => format!("{}h ago", m / 60),
        m => format!("{}d ago", m / (60 * 24)),
    }
}

/// 最近の活動 1 件 (経過時間つき)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub activity: Activity,
    pub time_ago: String,
}

/// 活動ログ (新しい順) に表示用の経過時間を付ける
pub fn activity_feed(activities: Vec<Activity>, now: DateTime<Utc>) -> Vec<ActivityEntry> {
    activities
        .into_iter()
        .map(|activity| ActivityEntry {
            time_ago: time_ago(activity.timestamp, now),
            activity,
        })
        .collect()
}
