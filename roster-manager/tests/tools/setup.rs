use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use roster_manager_lib::{
    application::{
        commands::{add_team_member, publish_roster},
        dto::{NewMemberInput, SlotAssignment},
        time::FixedClock,
    },
    config::AppConfig,
    domain::{
        error::StoreError,
        recurrence::{occurrences_for_month, roles_for_event},
    },
    infrastructure::{
        local_store::{LocalStore, MemoryLocalStore},
        remote_store::InMemoryRemoteStore,
    },
    AppServices,
};

pub const MONTH: &str = "October 2025";
pub const EVENT: &str = "Sunday Service - 9:30 AM";

pub fn october_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
}

// =====================
// 書き込み失敗を仕込めるローカルストア
// =====================

#[derive(Default)]
pub struct FlakyLocalStore {
    inner: MemoryLocalStore,
    failing_key: Mutex<Option<String>>,
}

impl FlakyLocalStore {
    /// 指定したキーへの set を失敗させる (None で解除)
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.failing_key.lock() = key.map(str::to_string);
    }
}

impl LocalStore for FlakyLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.failing_key.lock().as_deref() == Some(key) {
            return Err(StoreError::Local(format!("disk full while writing {key}")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear()
    }
}

// =====================
// サービスの組み立て
// =====================

pub struct TestApp {
    pub services: AppServices,
    pub local: Arc<FlakyLocalStore>,
    pub remote: Arc<InMemoryRemoteStore>,
}

/// 2025-10-01 時点のアプリ (ローカル / リモートともメモリ)
pub fn setup_test_app() -> TestApp {
    let local = Arc::new(FlakyLocalStore::default());
    let remote = Arc::new(InMemoryRemoteStore::new());
    let services = AppServices::new(
        local.clone(),
        remote.clone(),
        AppConfig::default(),
        Arc::new(FixedClock::at_date(october_first())),
    );
    TestApp {
        services,
        local,
        remote,
    }
}

pub fn member_input(name: &str, roles: &[&str]) -> NewMemberInput {
    NewMemberInput {
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    }
}

/// Alex (TM001) と Jordan (TM002) を登録し、
/// 10 月 5 日の Security だけ Alex、残りはすべて Jordan のロスターを公開する
pub async fn seed_october_roster(services: &AppServices) -> String {
    let alex = add_team_member(services, member_input("Alex", &["Security"])).await.unwrap();
    let jordan = add_team_member(services, member_input("Jordan", &["Support 1"])).await.unwrap();
    assert_eq!(alex.member_code, "TM001");
    assert_eq!(jordan.member_code, "TM002");

    let slots = full_slots(|index, role| {
        if index == 0 && role == "Security" {
            "TM001"
        } else {
            "TM002"
        }
    });

    let published = publish_roster(services, MONTH.to_string(), EVENT.to_string(), slots)
        .await
        .unwrap();
    published.roster_name
}

/// 全スロットを埋めた入力 (担当は pick で決める)
pub fn full_slots(pick: impl Fn(usize, &str) -> &'static str) -> Vec<SlotAssignment> {
    let mut slots = Vec::new();
    for index in 0..occurrences_for_month(MONTH, EVENT).len() {
        for role in roles_for_event(EVENT) {
            slots.push(SlotAssignment {
                occurrence_index: index,
                role: role.to_string(),
                member_code: pick(index, role).to_string(),
            });
        }
    }
    slots
}
