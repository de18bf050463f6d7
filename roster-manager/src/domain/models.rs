// =====================
// ドメインモデル定義
// =====================
//
// すべての文書は camelCase の JSON として保存される。
// 読み込み時は旧フィールド名 (ministry / sundays / teamMemberId など) も受け付け、
// 書き込み時は常に現行のフィールド名で出力する。

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 未割り当てスロットを表すプレースホルダ
pub const UNASSIGNED: &str = "Unassigned";

/// 旧形式 (名前だけの担当) で役割が分からない場合の値
pub const UNKNOWN_ROLE: &str = "Unknown Role";

// =====================
// ロスター
// =====================

/// 月 x イベント種別ごとに 1 文書
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    #[serde(default)]
    pub id: String,
    pub month: String,
    #[serde(alias = "ministry")]
    pub event_type: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default = "default_roster_status")]
    pub status: String,
    /// 旧形式では "sundays"
    #[serde(alias = "sundays", default)]
    pub dates: Vec<Occurrence>,
}

fn default_roster_status() -> String {
    "published".to_string()
}

/// ロスター内の 1 開催日
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// 表示用ラベル (例: "Sunday, October 5")
    pub date: String,
    pub day: u32,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub full_date: NaiveDate,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// "2025-10-05" と "2025-10-04T23:00:00.000Z" の両方を受け付ける。
/// タイムスタンプの場合はローカル時刻に直してから日付部分を取る。
fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid calendar date: {raw}")))
}

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Local).date_naive())
}

/// 開催日の 1 役割
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "AssignmentRepr")]
pub struct Assignment {
    pub role: String,
    pub assigned_to: String,
    /// 新しい文書ではメンバーコードも保存する。旧文書には無い
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_code: Option<String>,
    pub status: String,
}

impl Assignment {
    pub fn confirmed(role: &str, member: &TeamMember) -> Self {
        Self {
            role: role.to_string(),
            assigned_to: member.name.clone(),
            member_code: Some(member.member_code.clone()),
            status: "confirmed".to_string(),
        }
    }

    /// 空でも "Unassigned" でもなければ埋まっている
    pub fn is_filled(&self) -> bool {
        let name = self.assigned_to.trim();
        !name.is_empty() && name != UNASSIGNED
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AssignmentRepr {
    Detailed(DetailedAssignment),
    NameOnly(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailedAssignment {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    member_code: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<AssignmentRepr> for Assignment {
    fn from(repr: AssignmentRepr) -> Self {
        match repr {
            AssignmentRepr::Detailed(d) => Assignment {
                role: d.role.unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
                assigned_to: d.assigned_to.unwrap_or_default(),
                member_code: d.member_code.filter(|c| !c.trim().is_empty()),
                status: d.status.unwrap_or_else(|| "confirmed".to_string()),
            },
            AssignmentRepr::NameOnly(name) => Assignment {
                role: UNKNOWN_ROLE.to_string(),
                assigned_to: name,
                member_code: None,
                status: "confirmed".to_string(),
            },
        }
    }
}

/// 文書名つきのロスター (リポジトリから返る形)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRoster {
    pub name: String,
    pub roster: Roster,
}

/// 承認時に対象を一意に特定するための参照 (提出時に保存する)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRef {
    pub roster_name: String,
    pub occurrence_index: usize,
    pub role: String,
}

// =====================
// チームメンバー
// =====================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    #[serde(alias = "teamMemberId", default)]
    pub member_code: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub status: MemberStatus,
    /// 表示用 (例: "Oct 2025")
    #[serde(default)]
    pub join_date: String,
    #[serde(default)]
    pub total_services: u32,
}

/// 旧データの id は数値
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// team_members.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeamDirectory {
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// 次に払い出すメンバーコードの連番。旧データには無いので 0 は「未設定」
    #[serde(default)]
    pub next_member_seq: u32,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl TeamDirectory {
    pub fn find_by_code(&self, code: &str) -> Option<&TeamMember> {
        self.members
            .iter()
            .find(|m| m.member_code.eq_ignore_ascii_case(code))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.id == id)
    }
}

// =====================
// 変更リクエスト
// =====================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestType {
    #[serde(rename = "Schedule Change")]
    ScheduleChange,
    #[serde(rename = "Role Swap")]
    RoleSwap,
    #[serde(rename = "Mark Unavailable")]
    MarkUnavailable,
    #[serde(rename = "Time Change")]
    TimeChange,
    #[serde(rename = "Other")]
    Other,
}

impl RequestType {
    pub fn label(&self) -> &'static str {
        match self {
            RequestType::ScheduleChange => "Schedule Change",
            RequestType::RoleSwap => "Role Swap",
            RequestType::MarkUnavailable => "Mark Unavailable",
            RequestType::TimeChange => "Time Change",
            RequestType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: String,
    #[serde(alias = "teamMemberId", default)]
    pub member_code: String,
    #[serde(alias = "teamMemberName", default)]
    pub member_name: String,
    pub request_type: RequestType,
    /// 例: "Sunday, October 5 - 9:30 AM"
    #[serde(alias = "selectedDate", default)]
    pub target_occurrence_description: String,
    /// 旧データには無い
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<OccurrenceRef>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub additional_notes: String,
    #[serde(default)]
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// 重複判定キー: (memberCode, targetOccurrenceDescription, requestType)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub member_code: String,
    pub target_occurrence_description: String,
    pub request_type: RequestType,
}

impl ChangeRequest {
    pub fn key(&self) -> RequestKey {
        RequestKey {
            member_code: self.member_code.clone(),
            target_occurrence_description: self.target_occurrence_description.clone(),
            request_type: self.request_type,
        }
    }
}

/// 重複キーが同じものは最初の 1 件だけ残す。戻り値の 2 つ目は取り除いた件数
pub fn dedupe_requests(requests: Vec<ChangeRequest>) -> (Vec<ChangeRequest>, usize) {
    let mut seen = std::collections::HashSet::new();
    let before = requests.len();
    let unique: Vec<ChangeRequest> = requests
        .into_iter()
        .filter(|r| seen.insert(r.key()))
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}

// =====================
// アクティビティログ
// =====================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Added,
    Edited,
    Removed,
    RoleUpdated,
    RequestSubmitted,
    RequestApproved,
    RequestDenied,
    SchedulePublished,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    #[serde(default)]
    pub member_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// team_activities.json (新しい順)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

// =====================
// セッション
// =====================

/// current_user.json: ログイン時に書き込まれるメンバーのスナップショット
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    #[serde(alias = "teamMemberId", default)]
    pub member_code: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub login_time: DateTime<Utc>,
}

impl CurrentUser {
    pub fn from_member(member: &TeamMember, login_time: DateTime<Utc>) -> Self {
        Self {
            id: member.id.clone(),
            member_code: member.member_code.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
            roles: member.roles.clone(),
            login_time,
        }
    }

    pub fn identity(&self) -> MemberIdentity {
        MemberIdentity {
            member_code: Some(self.member_code.clone()).filter(|c| !c.is_empty()),
            name: self.name.clone(),
        }
    }
}

/// 担当との突き合わせに使う本人情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentity {
    pub member_code: Option<String>,
    pub name: String,
}

impl MemberIdentity {
    pub fn new(member_code: Option<&str>, name: &str) -> Self {
        Self {
            member_code: member_code.map(str::to_string).filter(|c| !c.is_empty()),
            name: name.to_string(),
        }
    }

    /// メンバーコードが両方にあればコードで比較する。
    /// どちらかに無い (旧データ) 場合だけ名前の完全一致にフォールバックする。
    pub fn matches(&self, assignment: &Assignment) -> bool {
        match (&self.member_code, &assignment.member_code) {
            (Some(mine), Some(theirs)) => mine.eq_ignore_ascii_case(theirs),
            _ => assignment.assigned_to == self.name,
        }
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_legacy_roster_fields_are_accepted() {
        let json = r#"{
            "id": "1",
            "month": "October 2025",
            "ministry": "Sunday Service - 9:30 AM",
            "createdAt": "2025-09-20T10:00:00.000Z",
            "status": "published",
            "sundays": [
                { "date": "Sunday, October 5", "day": 5, "fullDate": "2025-10-05",
                  "assignments": ["Alex", { "role": "Security", "assignedTo": "Sam", "status": "confirmed" }] }
            ]
        }"#;

        let roster: Roster = serde_json::from_str(json).unwrap();

        assert_eq!(roster.event_type, "Sunday Service - 9:30 AM");
        assert_eq!(roster.dates.len(), 1);
        let assignments = &roster.dates[0].assignments;
        assert_eq!(assignments[0].role, UNKNOWN_ROLE);
        assert_eq!(assignments[0].assigned_to, "Alex");
        assert_eq!(assignments[1].role, "Security");
        assert_eq!(assignments[1].member_code, None);

        // 書き出しは現行のフィールド名
        let out = serde_json::to_value(&roster).unwrap();
        assert!(out.get("dates").is_some());
        assert!(out.get("eventType").is_some());
        assert!(out.get("sundays").is_none());
    }

    #[test]
    fn test_legacy_request_and_member_fields() {
        let json = r#"{
            "id": "REQ_1",
            "teamMemberId": "TM001",
            "teamMemberName": "Alex",
            "requestType": "Mark Unavailable",
            "selectedDate": "Sunday, October 5 - 9:30 AM",
            "reason": "Travel",
            "status": "pending",
            "submittedAt": "2025-10-01T09:00:00.000Z"
        }"#;
        let request: ChangeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.member_code, "TM001");
        assert_eq!(request.request_type, RequestType::MarkUnavailable);
        assert_eq!(request.target, None);

        let member: TeamMember = serde_json::from_str(
            r#"{ "id": 3, "teamMemberId": "TM003", "name": "Sam", "email": "sam@example.com" }"#,
        )
        .unwrap();
        assert_eq!(member.id, "3");
        assert_eq!(member.member_code, "TM003");
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[test]
    fn test_identity_prefers_member_code() {
        let alex = MemberIdentity::new(Some("TM001"), "Alex");

        let coded = Assignment {
            role: "Security".into(),
            assigned_to: "Alexander".into(),
            member_code: Some("TM001".into()),
            status: "confirmed".into(),
        };
        let legacy = Assignment {
            member_code: None,
            assigned_to: "Alex".into(),
            ..coded.clone()
        };
        let someone_else = Assignment {
            member_code: Some("TM002".into()),
            assigned_to: "Alex".into(),
            ..coded.clone()
        };

        assert!(alex.matches(&coded));
        assert!(alex.matches(&legacy));
        assert!(!alex.matches(&someone_else));
    }
}
