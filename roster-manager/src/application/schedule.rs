// =====================
// ロスターの公開
// =====================

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::dto::{PublishedRoster, SlotAssignment};
use crate::application::time::Clock;
use crate::domain::error::ScheduleError;
use crate::domain::models::*;
use crate::domain::recurrence::{occurrences_for_month, roles_for_event};
use crate::infrastructure::naming::roster_document_name;
use crate::infrastructure::repository::DocumentRepository;

pub struct ScheduleService {
    repository: Arc<DocumentRepository>,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    pub fn new(repository: Arc<DocumentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 開催日 x 役割のすべてのスロットが埋まっている場合だけ公開する
    pub async fn publish_roster(
        &self,
        month: &str,
        event_type: &str,
        slots: &[SlotAssignment],
    ) -> Result<PublishedRoster, ScheduleError> {
        let month = month.trim();
        let event_type = event_type.trim();

        // 1. 開催日と役割
        let occurrences = occurrences_for_month(month, event_type);
        if occurrences.is_empty() {
            return Err(ScheduleError::NoOccurrences {
                month: month.to_string(),
                event_type: event_type.to_string(),
            });
        }
        let roles = roles_for_event(event_type);

        // 2. (開催日, 役割) -> メンバーコード
        let mut grid: HashMap<(usize, &str), &str> = HashMap::new();
        for slot in slots {
            let known_role = roles.iter().any(|r| *r == slot.role);
            if slot.occurrence_index >= occurrences.len() || !known_role {
                warn!(index = slot.occurrence_index, role = %slot.role, "ignoring slot outside the roster");
                continue;
            }
            grid.insert((slot.occurrence_index, slot.role.as_str()), slot.member_code.as_str());
        }

        // 3. 名簿と突き合わせて担当を作る
        let directory = self.repository.fetch_team_directory().await?;
        let mut missing = Vec::new();
        let mut dates = Vec::with_capacity(occurrences.len());
        for (index, occurrence) in occurrences.iter().enumerate() {
            let mut assignments = Vec::with_capacity(roles.len());
            for role in &roles {
                let code = grid
                    .get(&(index, *role))
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty());
                match code {
                    Some(code) => {
                        let member = directory
                            .find_by_code(code)
                            .ok_or_else(|| ScheduleError::UnknownMember(code.to_string()))?;
                        assignments.push(Assignment::confirmed(role, member));
                    }
                    None => missing.push(format!("{} - {}", occurrence.label(), role)),
                }
            }
            dates.push(Occurrence {
                date: occurrence.label(),
                day: occurrence.day_of_month,
                full_date: occurrence.date,
                assignments,
            });
        }
        if !missing.is_empty() {
            return Err(ScheduleError::Incomplete(missing));
        }

        // 4. 保存 (同じ月とイベントの文書があれば上書きし、重複は消す)
        let (roster_name, duplicates) = self.target_document(month, event_type).await;
        let roster = Roster {
            id: Uuid::new_v4().to_string(),
            month: month.to_string(),
            event_type: event_type.to_string(),
            created_at: Some(self.clock.now()),
            status: "published".to_string(),
            dates,
        };
        self.repository.save_roster(&roster_name, &roster).await?;
        for name in duplicates {
            match self.repository.delete_roster(&name).await {
                Ok(()) => info!(roster = %name, "removed duplicate roster"),
                Err(e) => warn!(roster = %name, error = %e, "failed to remove duplicate roster"),
            }
        }

        let published = PublishedRoster {
            roster_name,
            occurrence_count: roster.dates.len(),
            assignment_count: roster.dates.iter().map(|d| d.assignments.len()).sum(),
        };
        info!(roster = %published.roster_name, "roster published");

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            activity_type: ActivityType::SchedulePublished,
            description: format!("Published {event_type} roster for {month}"),
            member_name: None,
            timestamp: self.clock.now(),
        };
        if let Err(e) = self.repository.append_activity(activity).await {
            warn!(error = %e, "failed to record activity");
        }

        Ok(published)
    }

    /// 保存先の文書名と、消すべき重複文書名を返す
    /// 旧形式の名前 (最初の空白だけを '_' にしたもの) で保存されたロスターも同じ月とイベントなら上書きする
    async fn target_document(&self, month: &str, event_type: &str) -> (String, Vec<String>) {
        let canonical = roster_document_name(month, event_type);
        let mut existing: Vec<String> = self
            .repository
            .load_rosters()
            .await
            .into_iter()
            .filter(|stored| {
                stored.roster.month.trim().eq_ignore_ascii_case(month)
                    && stored.roster.event_type.trim().eq_ignore_ascii_case(event_type)
            })
            .map(|stored| stored.name)
            .collect();

        let target = match existing.iter().position(|name| *name == canonical) {
            Some(index) => existing.remove(index),
            None if !existing.is_empty() => existing.remove(0),
            None => canonical,
        };
        (target, existing)
    }

    pub async fn all_rosters(&self) -> Vec<StoredRoster> {
        self.repository.load_rosters().await
    }
}
