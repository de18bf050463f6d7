use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};

/// 現在時刻の取得元。日付に依存するビューをテストで固定するために差し替える
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 「今日」(端末のローカル日付)
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻 (テスト用)。today は now の UTC 日付
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// 指定日の正午 (UTC)
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date.and_time(NaiveTime::MIN) + Duration::hours(12);
        Self::new(noon.and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// 参加月の表示 ("Oct 2025")
pub fn join_date_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

#[cfg(test)]
mod time_tests {
    use super::*;

    #[test]
    fn test_fixed_clock_and_labels() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let clock = FixedClock::at_date(date);

        assert_eq!(clock.today(), date);
        assert_eq!(join_date_label(date), "Oct 2025");
    }
}
