// =====================
// チームメンバー管理
// =====================
//
// メンバーコード (TM001 ...) は名簿に保存した連番から払い出す。
// 一覧の件数からは作らない (削除後の追加でコードが重複するため)。

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::dto::{MemberPatch, NewMemberInput};
use crate::application::time::{join_date_label, Clock};
use crate::domain::error::TeamError;
use crate::domain::models::*;
use crate::infrastructure::repository::DocumentRepository;

pub const MEMBER_CODE_PREFIX: &str = "TM";

pub fn format_member_code(seq: u32) -> String {
    format!("{MEMBER_CODE_PREFIX}{seq:03}")
}

fn parse_member_code(code: &str) -> Option<u32> {
    let (prefix, digits) = code.trim().split_at_checked(MEMBER_CODE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(MEMBER_CODE_PREFIX) {
        return None;
    }
    digits.parse().ok()
}

/// 旧名簿の補正: 連番が無ければ既存コードの最大値から始め、
/// コードの無いメンバーには新しいコードを振る。変更があれば true
pub fn normalize_directory(directory: &mut TeamDirectory) -> bool {
    let highest = directory
        .members
        .iter()
        .filter_map(|m| parse_member_code(&m.member_code))
        .max()
        .unwrap_or(0);

    let mut changed = false;
    if directory.next_member_seq <= highest {
        directory.next_member_seq = highest + 1;
        changed = true;
    }

    for member in directory.members.iter_mut() {
        if member.member_code.trim().is_empty() {
            member.member_code = format_member_code(directory.next_member_seq);
            directory.next_member_seq += 1;
            changed = true;
        }
    }
    changed
}

pub struct TeamService {
    repository: Arc<DocumentRepository>,
    clock: Arc<dyn Clock>,
}

impl TeamService {
    pub fn new(repository: Arc<DocumentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn list_members(&self) -> Vec<TeamMember> {
        self.repository.load_team_directory().await.members
    }

    /// 名前 / メール / 役割の部分一致 (大文字小文字を区別しない)
    pub async fn search_members(&self, query: &str) -> Vec<TeamMember> {
        let query = query.trim().to_lowercase();
        self.list_members()
            .await
            .into_iter()
            .filter(|m| {
                query.is_empty()
                    || m.name.to_lowercase().contains(&query)
                    || m.email.to_lowercase().contains(&query)
                    || m.roles.iter().any(|r| r.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub async fn add_member(&self, input: NewMemberInput) -> Result<TeamMember, TeamError> {
        // 1. 必須項目
        let name = input.name.trim();
        let email = input.email.trim();
        if name.is_empty() {
            return Err(TeamError::Validation { field: "name" });
        }
        if email.is_empty() {
            return Err(TeamError::Validation { field: "email" });
        }

        // 2. メールの重複
        let mut directory = self.repository.fetch_team_directory().await?;
        normalize_directory(&mut directory);
        if directory.members.iter().any(|m| m.email.eq_ignore_ascii_case(email)) {
            return Err(TeamError::EmailExists(email.to_string()));
        }

        // 3. コードを払い出して追加
        let now = self.clock.now();
        let member = TeamMember {
            id: Uuid::new_v4().to_string(),
            member_code: format_member_code(directory.next_member_seq),
            name: name.to_string(),
            email: email.to_string(),
            phone: input.phone.trim().to_string(),
            roles: input.roles,
            status: input.status,
            join_date: join_date_label(self.clock.today()),
            total_services: 0,
        };
        directory.next_member_seq += 1;
        directory.members.push(member.clone());
        directory.last_updated = Some(now);
        self.repository.save_team_directory(&directory).await?;

        info!(code = %member.member_code, "team member added");
        self.record_activity(
            ActivityType::Added,
            format!("Added new team member with roles: {}", member.roles.join(", ")),
            &member.name,
        )
        .await;
        Ok(member)
    }

    pub async fn update_member(&self, id: &str, patch: MemberPatch) -> Result<TeamMember, TeamError> {
        let mut directory = self.repository.fetch_team_directory().await?;
        normalize_directory(&mut directory);

        if let Some(email) = patch.email.as_deref().map(str::trim) {
            if email.is_empty() {
                return Err(TeamError::Validation { field: "email" });
            }
            if directory
                .members
                .iter()
                .any(|m| m.id != id && m.email.eq_ignore_ascii_case(email))
            {
                return Err(TeamError::EmailExists(email.to_string()));
            }
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(TeamError::Validation { field: "name" });
        }

        let member = directory
            .members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| TeamError::MemberNotFound(id.to_string()))?;

        let mut changed = Vec::new();
        if let Some(name) = patch.name.map(|n| n.trim().to_string()) {
            if name != member.name {
                member.name = name;
                changed.push("name");
            }
        }
        if let Some(email) = patch.email.map(|e| e.trim().to_string()) {
            if email != member.email {
                member.email = email;
                changed.push("email");
            }
        }
        if let Some(phone) = patch.phone.map(|p| p.trim().to_string()) {
            if phone != member.phone {
                member.phone = phone;
                changed.push("phone");
            }
        }
        if let Some(status) = patch.status {
            if status != member.status {
                member.status = status;
                changed.push("status");
            }
        }
        let updated = member.clone();

        if changed.is_empty() {
            return Ok(updated);
        }

        directory.last_updated = Some(self.clock.now());
        self.repository.save_team_directory(&directory).await?;
        self.record_activity(
            ActivityType::Edited,
            format!("Updated {}", changed.join(", ")),
            &updated.name,
        )
        .await;
        Ok(updated)
    }

    pub async fn set_member_roles(&self, id: &str, roles: Vec<String>) -> Result<TeamMember, TeamError> {
        let mut directory = self.repository.fetch_team_directory().await?;
        normalize_directory(&mut directory);

        let member = directory
            .members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| TeamError::MemberNotFound(id.to_string()))?;

        let added: Vec<&String> = roles.iter().filter(|r| !member.roles.contains(r)).collect();
        let removed: Vec<&String> = member.roles.iter().filter(|r| !roles.contains(r)).collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(member.clone());
        }

        let mut parts = Vec::new();
        if !added.is_empty() {
            parts.push(format!("Added role: {}", join(&added)));
        }
        if !removed.is_empty() {
            parts.push(format!("Removed role: {}", join(&removed)));
        }
        let description = parts.join("; ");

        member.roles = roles;
        let updated = member.clone();
        directory.last_updated = Some(self.clock.now());
        self.repository.save_team_directory(&directory).await?;

        self.record_activity(ActivityType::RoleUpdated, description, &updated.name)
            .await;
        Ok(updated)
    }

    pub async fn remove_member(&self, id: &str) -> Result<TeamMember, TeamError> {
        let mut directory = self.repository.fetch_team_directory().await?;
        normalize_directory(&mut directory);

        let index = directory
            .members
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| TeamError::MemberNotFound(id.to_string()))?;
        let removed = directory.members.remove(index);

        directory.last_updated = Some(self.clock.now());
        self.repository.save_team_directory(&directory).await?;

        info!(code = %removed.member_code, "team member removed");
        self.record_activity(ActivityType::Removed, "Removed from team".to_string(), &removed.name)
            .await;
        Ok(removed)
    }

    pub async fn recent_activities(&self, limit: usize) -> Vec<Activity> {
        self.repository.recent_activities(limit).await
    }

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

fn join(items: &[&String]) -> String {
    items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod team_tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::application::time::FixedClock;
    use crate::infrastructure::document_store::DualBackendStore;
    use crate::infrastructure::local_store::MemoryLocalStore;
    use crate::infrastructure::remote_store::InMemoryRemoteStore;

    fn setup_service() -> (TeamService, Arc<DocumentRepository>) {
        let store = DualBackendStore::new(Arc::new(MemoryLocalStore::new()), Arc::new(InMemoryRemoteStore::new()));
        let repository = Arc::new(DocumentRepository::new(store, 10));
        let clock = Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()));
        (TeamService::new(repository.clone(), clock), repository)
    }

    fn input(name: &str, email: &str, roles: &[&str]) -> NewMemberInput {
        NewMemberInput {
            name: name.to_string(),
            email: email.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    fn member(id: &str, code: &str) -> TeamMember {
        TeamMember {
            id: id.to_string(),
            member_code: code.to_string(),
            name: format!("Member {id}"),
            email: format!("{id}@example.com"),
            phone: String::new(),
            roles: Vec::new(),
            status: MemberStatus::Active,
            join_date: String::new(),
            total_services: 0,
        }
    }

    #[test]
    fn test_normalize_seeds_sequence_from_existing_codes() {
        let mut directory = TeamDirectory {
            members: vec![member("1", "TM001"), member("2", "TM007"), member("3", "")],
            ..Default::default()
        };

        assert!(normalize_directory(&mut directory));

        assert_eq!(directory.members[2].member_code, "TM008");
        assert_eq!(directory.next_member_seq, 9);
        // 2 回目は変化なし
        assert!(!normalize_directory(&mut directory));
    }

    #[test]
    fn test_member_code_format() {
        assert_eq!(format_member_code(1), "TM001");
        assert_eq!(format_member_code(1234), "TM1234");
        assert_eq!(parse_member_code("tm042"), Some(42));
        assert_eq!(parse_member_code("X001"), None);
    }

    #[tokio::test]
    async fn test_add_member_rejects_duplicate_email_ignoring_case() {
        // 1. 準備 (Arrange)
        let (service, _) = setup_service();
        service
            .add_member(input("Alex", "alex@example.org", &["Security"]))
            .await
            .unwrap();

        // 2. 実行 (Act)
        let err = service
            .add_member(input("Alex Two", "  ALEX@Example.org ", &[]))
            .await
            .unwrap_err();

        // 3. 検証 (Assert)
        assert_eq!(err, TeamError::EmailExists("ALEX@Example.org".to_string()));
        assert_eq!(service.list_members().await.len(), 1);
    }

    #[tokio::test]
    async fn test_member_code_is_not_reused_after_removal() {
        let (service, _) = setup_service();
        let alex = service.add_member(input("Alex", "alex@example.org", &[])).await.unwrap();
        let jordan = service.add_member(input("Jordan", "jordan@example.org", &[])).await.unwrap();
        assert_eq!(jordan.member_code, "TM002");

        service.remove_member(&jordan.id).await.unwrap();
        let sam = service.add_member(input("Sam", "sam@example.org", &[])).await.unwrap();

        assert_eq!(alex.member_code, "TM001");
        assert_eq!(sam.member_code, "TM003");
    }

    #[tokio::test]
    async fn test_update_member_checks_email_against_others_only() {
        // 1. 準備 (Arrange)
        let (service, repository) = setup_service();
        let alex = service.add_member(input("Alex", "alex@example.org", &[])).await.unwrap();
        service.add_member(input("Jordan", "jordan@example.org", &[])).await.unwrap();

        // 2. 実行 (Act): 他人のメールは拒否、自分のメールは大文字小文字が違っても通る
        let taken = MemberPatch {
            email: Some("Jordan@example.org".to_string()),
            ..Default::default()
        };
        let err = service.update_member(&alex.id, taken).await.unwrap_err();

        let own = MemberPatch {
            name: Some("Alex Kim".to_string()),
            email: Some("ALEX@example.org".to_string()),
            ..Default::default()
        };
        let updated = service.update_member(&alex.id, own).await.unwrap();

        // 3. 検証 (Assert)
        assert_eq!(err, TeamError::EmailExists("Jordan@example.org".to_string()));
        assert_eq!(updated.name, "Alex Kim");
        assert_eq!(updated.email, "ALEX@example.org");

        let latest = &repository.recent_activities(1).await[0];
        assert_eq!(latest.activity_type, ActivityType::Edited);
        assert_eq!(latest.description, "Updated name, email");
        assert_eq!(latest.member_name.as_deref(), Some("Alex Kim"));
    }

    #[tokio::test]
    async fn test_set_member_roles_describes_changes() {
        // 1. 準備 (Arrange)
        let (service, repository) = setup_service();
        let alex = service
            .add_member(input("Alex", "alex@example.org", &["Security", "Support 1"]))
            .await
            .unwrap();
        let before = repository.recent_activities(10).await.len();

        // 2. 実行 (Act): 同じ役割では何も記録しない
        service
            .set_member_roles(&alex.id, vec!["Security".to_string(), "Support 1".to_string()])
            .await
            .unwrap();
        assert_eq!(repository.recent_activities(10).await.len(), before);

        let updated = service
            .set_member_roles(&alex.id, vec!["Security".to_string(), "Evening".to_string()])
            .await
            .unwrap();

        // 3. 検証 (Assert)
        assert_eq!(updated.roles, vec!["Security", "Evening"]);
        let activities = repository.recent_activities(10).await;
        assert_eq!(activities.len(), before + 1);
        assert_eq!(activities[0].activity_type, ActivityType::RoleUpdated);
        assert_eq!(activities[0].description, "Added role: Evening; Removed role: Support 1");
    }

    #[tokio::test]
    async fn test_search_members_matches_name_email_or_role() {
        let (service, _) = setup_service();
        service
            .add_member(input("Alex", "alex@example.org", &["Security"]))
            .await
            .unwrap();
        service
            .add_member(input("Jordan", "jp@church.example", &["Main Lead A"]))
            .await
            .unwrap();

        let names = |members: Vec<TeamMember>| members.into_iter().map(|m| m.name).collect::<Vec<_>>();

        assert_eq!(names(service.search_members("ALEX").await), vec!["Alex"]);
        assert_eq!(names(service.search_members("Church.EXAMPLE").await), vec!["Jordan"]);
        assert_eq!(names(service.search_members("security").await), vec!["Alex"]);
        assert_eq!(service.search_members("  ").await.len(), 2);
        assert!(service.search_members("nobody").await.is_empty());
    }
}
