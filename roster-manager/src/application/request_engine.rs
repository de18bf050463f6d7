// =====================
// 変更リクエストのライフサイクル (Request Lifecycle Engine)
// =====================
//
// 状態遷移: pending -> approved / pending -> denied (どちらも終端)
//
// 承認時の対象特定は、提出時に保存した OccurrenceRef を使う。
// target を持たない旧データだけ、説明文から一意に決まる場合に限って
// ロスターを探す (候補が 0 件または複数なら ReferentialMismatch)。

use std::sync::{Arc, LazyLock};

use chrono::Datelike;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::dto::SubmitRequestInput;
use crate::application::time::Clock;
use crate::application::view_builder::ViewBuilder;
use crate::domain::error::RequestError;
use crate::domain::models::*;
use crate::domain::recurrence::{event_time, month_name};
use crate::infrastructure::repository::DocumentRepository;

/// 却下時に管理者メモが無い場合の既定文
pub const DEFAULT_DENIAL_NOTE: &str = "Request rejected by admin";

/// "Sunday, October 5 - 9:30 AM"
static TARGET_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+), (\w+) (\d+) - (\d+:\d+ [AP]M)$").expect("target description regex is valid")
});

/// 説明文を分解した結果
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTarget {
    month_name: String,
    day: u32,
    time: String,
}

fn parse_target_description(description: &str) -> Option<ParsedTarget> {
    let caps = TARGET_DESCRIPTION.captures(description.trim())?;
    Some(ParsedTarget {
        month_name: caps[2].to_string(),
        day: caps[3].parse().ok()?,
        time: caps[4].to_string(),
    })
}

/// 削除対象の担当の位置
#[derive(Debug, Clone)]
struct LocatedAssignment {
    roster_name: String,
    roster: Roster,
    occurrence_index: usize,
    assignment_index: usize,
}

pub struct RequestEngine {
    repository: Arc<DocumentRepository>,
    views: Arc<ViewBuilder>,
    clock: Arc<dyn Clock>,
}

impl RequestEngine {
    pub fn new(repository: Arc<DocumentRepository>, views: Arc<ViewBuilder>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            views,
            clock,
        }
    }

    /// 変更リクエストを提出する。対象は本人の直近の担当に限る
    pub async fn submit(
        &self,
        user: &CurrentUser,
        input: SubmitRequestInput,
    ) -> Result<ChangeRequest, RequestError> {
        // 1. 必須項目
        let request_type = input
            .request_type
            .ok_or(RequestError::Validation { field: "requestType" })?;
        if input.target.is_none() && input.target_occurrence_description.trim().is_empty() {
            return Err(RequestError::Validation { field: "targetOccurrence" });
        }
        if input.reason.trim().is_empty() {
            return Err(RequestError::Validation { field: "reason" });
        }

        // 2. 対象が本人の申請可能な日程に含まれるか
        let eligible = self.views.eligible_request_dates(user).await;
        let chosen = eligible
            .iter()
            .find(|view| match &input.target {
                Some(target) => view.target() == *target,
                None => view.description() == input.target_occurrence_description.trim(),
            })
            .ok_or(RequestError::Validation { field: "targetOccurrence" })?;

        let request = ChangeRequest {
            id: format!("REQ_{}", Uuid::new_v4().simple()),
            member_code: user.member_code.clone(),
            member_name: user.name.clone(),
            request_type,
            target_occurrence_description: chosen.description(),
            target: Some(chosen.target()),
            reason: input.reason.trim().to_string(),
            additional_notes: input.additional_notes.trim().to_string(),
            status: RequestStatus::Pending,
            submitted_at: self.clock.now(),
            reviewed_at: None,
            reviewed_by: None,
            admin_notes: None,
        };

        // 3. 重複チェック (読み込み時の重複除去と同じキー)
        let mut requests = self.repository.fetch_requests().await?;
        if let Some(existing) = requests.iter().find(|r| r.key() == request.key()) {
            return Err(RequestError::Duplicate {
                existing_id: existing.id.clone(),
            });
        }

        // 4. 追加して保存
        requests.push(request.clone());
        self.repository.save_requests(&requests).await?;
        info!(id = %request.id, member = %request.member_code, "change request submitted");

        self.record_activity(
            ActivityType::RequestSubmitted,
            format!(
                "{} request for {}",
                request.request_type.label(),
                request.target_occurrence_description
            ),
            &request.member_name,
        )
        .await;

        Ok(request)
    }

    /// 承認: 対象の担当をロスターから 1 件取り除き、状態を approved にする。
    /// リクエストログの保存に失敗した場合はロスターを元に戻す
    pub async fn approve(&self, request_id: &str, reviewer: &str) -> Result<ChangeRequest, RequestError> {
        // 1. リクエストを探す
        let mut requests = self.repository.fetch_requests().await?;
        let index = Self::pending_index(&requests, request_id)?;

        // 2. 対象の担当を特定
        let located = self.locate_assignment(&requests[index]).await?;
        let original = located.roster.clone();
        let mut roster = located.roster;
        roster.dates[located.occurrence_index]
            .assignments
            .remove(located.assignment_index);

        // 3. ロスターを保存
        self.repository.save_roster(&located.roster_name, &roster).await?;

        // 4. 状態を更新して保存。失敗したらロスターを戻す
        {
            let request = &mut requests[index];
            request.status = RequestStatus::Approved;
            request.reviewed_at = Some(self.clock.now());
            request.reviewed_by = Some(reviewer.to_string());
        }
        if let Err(e) = self.repository.save_requests(&requests).await {
            if let Err(rollback) = self.repository.save_roster(&located.roster_name, &original).await {
                error!(roster = %located.roster_name, error = %rollback, "failed to roll back roster");
            }
            return Err(e.into());
        }

        let approved = requests[index].clone();
        info!(id = %approved.id, roster = %located.roster_name, "change request approved");
        self.record_activity(
            ActivityType::RequestApproved,
            format!(
                "{} request approved for {}",
                approved.request_type.label(),
                approved.target_occurrence_description
            ),
            &approved.member_name,
        )
        .await;

        Ok(approved)
    }

    /// 却下: ロスターには触れない
    pub async fn deny(
        &self,
        request_id: &str,
        reviewer: &str,
        admin_notes: Option<String>,
    ) -> Result<ChangeRequest, RequestError> {
        let mut requests = self.repository.fetch_requests().await?;
        let index = Self::pending_index(&requests, request_id)?;

        {
            let request = &mut requests[index];
            request.status = RequestStatus::Denied;
            request.reviewed_at = Some(self.clock.now());
            request.reviewed_by = Some(reviewer.to_string());
            request.admin_notes = Some(
                admin_notes
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| DEFAULT_DENIAL_NOTE.to_string()),
            );
        }
        self.repository.save_requests(&requests).await?;

        let denied = requests[index].clone();
        info!(id = %denied.id, "change request denied");
        self.record_activity(
            ActivityType::RequestDenied,
            format!(
                "{} request denied for {}",
                denied.request_type.label(),
                denied.target_occurrence_description
            ),
            &denied.member_name,
        )
        .await;

        Ok(denied)
    }

    fn pending_index(requests: &[ChangeRequest], request_id: &str) -> Result<usize, RequestError> {
        let index = requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| RequestError::RequestNotFound(request_id.to_string()))?;

        let status = requests[index].status;
        if status != RequestStatus::Pending {
            return Err(RequestError::AlreadyReviewed {
                id: request_id.to_string(),
                status,
            });
        }
        Ok(index)
    }

    async fn locate_assignment(&self, request: &ChangeRequest) -> Result<LocatedAssignment, RequestError> {
        let identity = MemberIdentity::new(Some(&request.member_code), &request.member_name);
        match &request.target {
            Some(target) => self.locate_by_reference(target, &identity).await,
            None => self.locate_by_description(request, &identity).await,
        }
    }

    async fn locate_by_reference(
        &self,
        target: &OccurrenceRef,
        identity: &MemberIdentity,
    ) -> Result<LocatedAssignment, RequestError> {
        let roster = self
            .repository
            .fetch_roster(&target.roster_name)
            .await?
            .ok_or_else(|| RequestError::ReferentialMismatch(format!("roster {} not found", target.roster_name)))?;

        let occurrence = roster.dates.get(target.occurrence_index).ok_or_else(|| {
            RequestError::ReferentialMismatch(format!(
                "occurrence #{} not found in {}",
                target.occurrence_index, target.roster_name
            ))
        })?;

        let assignment_index = occurrence
            .assignments
            .iter()
            .position(|a| a.role == target.role && identity.matches(a))
            .ok_or_else(|| {
                RequestError::ReferentialMismatch(format!(
                    "{} is not assigned as {} on {}",
                    identity.name, target.role, occurrence.date
                ))
            })?;

        Ok(LocatedAssignment {
            roster_name: target.roster_name.clone(),
            occurrence_index: target.occurrence_index,
            assignment_index,
            roster,
        })
    }

    /// 旧データ用: 説明文 (月名 / 日 / 時刻) と本人で候補を絞り、一意なときだけ採用する
    async fn locate_by_description(
        &self,
        request: &ChangeRequest,
        identity: &MemberIdentity,
    ) -> Result<LocatedAssignment, RequestError> {
        let description = &request.target_occurrence_description;
        let parsed = parse_target_description(description).ok_or_else(|| {
            RequestError::ReferentialMismatch(format!("cannot interpret target \"{description}\""))
        })?;

        let mut candidates = Vec::new();
        for stored in self.repository.load_rosters().await {
            if event_time(&stored.roster.event_type) != parsed.time {
                continue;
            }
            for (occurrence_index, occurrence) in stored.roster.dates.iter().enumerate() {
                let same_day = occurrence.day == parsed.day
                    && month_name(occurrence.full_date.month())
                        .eq_ignore_ascii_case(&parsed.month_name);
                if !same_day {
                    continue;
                }
                for (assignment_index, assignment) in occurrence.assignments.iter().enumerate() {
                    if identity.matches(assignment) {
                        candidates.push(LocatedAssignment {
                            roster_name: stored.name.clone(),
                            roster: stored.roster.clone(),
                            occurrence_index,
                            assignment_index,
                        });
                    }
                }
            }
        }

        match candidates.len() {
            1 => Ok(candidates.remove(0)),
            0 => Err(RequestError::ReferentialMismatch(format!(
                "{} has no assignment on {description}",
                identity.name
            ))),
            n => {
                warn!(id = %request.id, candidates = n, "ambiguous legacy request target");
                Err(RequestError::ReferentialMismatch(format!(
                    "{description} matches {n} assignments; cannot decide which to remove"
                )))
            }
        }
    }

    /// アクティビティの記録は失敗しても本処理を失敗にしない
    async fn record_activity(&self, activity_type: ActivityType, description: String, member_name: &str) {
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            activity_type,
            description,
            member_name: Some(member_name.to_string()),
            timestamp: self.clock.now(),
        };
        if let Err(e) = self.repository.append_activity(activity).await {
            warn!(error = %e, "failed to record activity");
        }
    }
}
