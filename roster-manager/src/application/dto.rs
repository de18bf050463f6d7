use serde::{Deserialize, Serialize};

use crate::domain::models::{MemberStatus, OccurrenceRef, RequestType};

/// 変更申請の入力 (申請画面から)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestInput {
    pub request_type: Option<RequestType>,
    /// 選択した日程の説明文 ("Sunday, October 5 - 9:30 AM")
    pub target_occurrence_description: String,
    /// 選択した日程の正確な参照 (eligible dates から渡される)
    pub target: Option<OccurrenceRef>,
    pub reason: String,
    #[serde(default)]
    pub additional_notes: String,
}

/// メンバー追加の入力
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemberInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub status: MemberStatus,
}

/// メンバー編集の入力 (None の項目は変更しない)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<MemberStatus>,
}

/// ロスター公開時の 1 スロット
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub occurrence_index: usize,
    pub role: String,
    pub member_code: String,
}

/// 公開結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRoster {
    pub roster_name: String,
    pub occurrence_count: usize,
    pub assignment_count: usize,
}
