// =====================
// 開催日の計算 (Recurrence Calculator)
// =====================
//
// (月ラベル, イベント種別) から、その月の具体的な開催日を求める純粋関数群。
// ルールは 4 種類で固定:
//   Sunday Service 系 / 独自イベント -> 毎週日曜
//   Thursday Service              -> 毎週木曜
//   Friday Night Prayer           -> 月末の金曜 (1 回だけ)
//   Hour Of Meditation            -> 毎週土曜

use chrono::{Datelike, Duration, NaiveDate, Weekday};

const SUNDAY_SERVICE_PREFIX: &str = "Sunday Service";

pub const SUNDAY_SERVICE_0930: &str = "Sunday Service - 9:30 AM";
pub const SUNDAY_SERVICE_1130: &str = "Sunday Service - 11:30 AM";
pub const SUNDAY_SERVICE_1330: &str = "Sunday Service - 1:30 PM";
pub const THURSDAY_SERVICE: &str = "Thursday Service";
pub const FRIDAY_NIGHT_PRAYER: &str = "Friday Night Prayer";
pub const HOUR_OF_MEDITATION: &str = "Hour Of Meditation";

/// 組み込みのイベント種別
pub const BUILTIN_EVENT_TYPES: [&str; 6] = [
    SUNDAY_SERVICE_0930,
    SUNDAY_SERVICE_1130,
    SUNDAY_SERVICE_1330,
    THURSDAY_SERVICE,
    FRIDAY_NIGHT_PRAYER,
    HOUR_OF_MEDITATION,
];

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// 繰り返しルール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// 毎週その曜日
    Weekly(Weekday),
    /// 月末のその曜日 (1 回)
    LastOfMonth(Weekday),
}

/// 生成された開催日 1 件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedOccurrence {
    pub date: NaiveDate,
    pub day_of_month: u32,
}

impl GeneratedOccurrence {
    /// "Sunday, October 5"
    pub fn label(&self) -> String {
        occurrence_label(self.date)
    }
}

pub fn rule_for_event(event_type: &str) -> RecurrenceRule {
    let name = event_type.trim();
    if name
        .get(..SUNDAY_SERVICE_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(SUNDAY_SERVICE_PREFIX))
    {
        RecurrenceRule::Weekly(Weekday::Sun)
    } else if name.eq_ignore_ascii_case(THURSDAY_SERVICE) {
        RecurrenceRule::Weekly(Weekday::Thu)
    } else if name.eq_ignore_ascii_case(FRIDAY_NIGHT_PRAYER) {
        RecurrenceRule::LastOfMonth(Weekday::Fri)
    } else if name.eq_ignore_ascii_case(HOUR_OF_MEDITATION) {
        RecurrenceRule::Weekly(Weekday::Sat)
    } else {
        // 独自イベントは日曜扱い
        RecurrenceRule::Weekly(Weekday::Sun)
    }
}

/// 月ラベル ("October 2025") を (年, 月) に分解する。解釈できなければ None
pub fn parse_month_label(label: &str) -> Option<(i32, u32)> {
    let mut parts = label.split_whitespace();
    let month_name = parts.next()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month_name))? as u32
        + 1;
    // chrono が扱える範囲かを確認
    NaiveDate::from_ymd_opt(year, month, 1)?;
    Some((year, month))
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[((month.clamp(1, 12)) - 1) as usize]
}

/// 日付から月ラベルを作る ("October 2025")
pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", month_name(date.month()), date.year())
}

/// 指定日の月から 12 か月分の月ラベル (公開画面の月選択用)
pub fn upcoming_month_labels(today: NaiveDate) -> Vec<String> {
    let mut labels = Vec::with_capacity(12);
    let (mut year, mut month) = (today.year(), today.month());
    for _ in 0..12 {
        labels.push(format!("{} {}", month_name(month), year));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    labels
}

/// "Sunday, October 5"
pub fn occurrence_label(date: NaiveDate) -> String {
    format!("{}, {} {}", weekday_name(date.weekday()), month_name(date.month()), date.day())
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// イベントの開始時刻の表示文字列。
/// ラベル末尾に " - 9:30 AM" のような時刻があればそれを優先する。
pub fn event_time(event_type: &str) -> String {
    if let Some((_, suffix)) = event_type.rsplit_once(" - ") {
        let suffix = suffix.trim();
        if is_clock_time(suffix) {
            return suffix.to_string();
        }
    }

    let name = event_type.trim();
    let time = if name.eq_ignore_ascii_case(THURSDAY_SERVICE) {
        "7:00 PM"
    } else if name.eq_ignore_ascii_case(FRIDAY_NIGHT_PRAYER) {
        "7:30 PM"
    } else if name.eq_ignore_ascii_case(HOUR_OF_MEDITATION) {
        "10:00 AM"
    } else {
        "9:30 AM"
    };
    time.to_string()
}

/// "H:MM AM" / "HH:MM PM"
fn is_clock_time(s: &str) -> bool {
    let Some((clock, meridiem)) = s.split_once(' ') else {
        return false;
    };
    let Some((hour, minute)) = clock.split_once(':') else {
        return false;
    };
    matches!(meridiem, "AM" | "PM")
        && (1..=2).contains(&hour.len())
        && minute.len() == 2
        && hour.chars().chain(minute.chars()).all(|c| c.is_ascii_digit())
}

/// 申請対象の説明文 "Sunday, October 5 - 9:30 AM"
pub fn occurrence_description(date: NaiveDate, event_type: &str) -> String {
    format!("{} - {}", occurrence_label(date), event_time(event_type))
}

/// イベント種別ごとの役割一覧
pub fn roles_for_event(event_type: &str) -> Vec<&'static str> {
    if event_type.trim().eq_ignore_ascii_case(HOUR_OF_MEDITATION) {
        vec![
            "Leading Prayers",
            "Self-care",
            "Car pickup/ironing",
            "Assistant A",
            "Assistant B",
            "Support",
        ]
    } else {
        vec![
            "Main Lead A",
            "Main Lead B",
            "Security",
            "Support 1",
            "Support 2",
            "Evening",
        ]
    }
}

/// 指定月のイベント開催日を昇順で返す。
/// 月ラベルが解釈できない場合は空 (「予定なし」として扱う)
pub fn occurrences_for_month(month_label: &str, event_type: &str) -> Vec<GeneratedOccurrence> {
    let Some((year, month)) = parse_month_label(month_label) else {
        return Vec::new();
    };
    occurrences_in(year, month, rule_for_event(event_type))
}

pub fn occurrences_in(year: i32, month: u32, rule: RecurrenceRule) -> Vec<GeneratedOccurrence> {
    let Some(first_day) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let Some(last_day) = last_day_of_month(first_day) else {
        return Vec::new();
    };

    match rule {
        RecurrenceRule::Weekly(weekday) => {
            // 1. 1日以降で最初の該当曜日
            let offset = (7 + weekday.num_days_from_sunday() - first_day.weekday().num_days_from_sunday()) % 7;
            let mut current = first_day + Duration::days(offset as i64);

            // 2. 月が変わるまで 7 日ずつ進める
            let mut result = Vec::new();
            while current.month() == month {
                result.push(GeneratedOccurrence {
                    date: current,
                    day_of_month: current.day(),
                });
                current += Duration::days(7);
            }
            result
        }
        RecurrenceRule::LastOfMonth(weekday) => {
            // 月末日から遡って最初の該当曜日
            let back = (7 + last_day.weekday().num_days_from_sunday() - weekday.num_days_from_sunday()) % 7;
            let date = last_day - Duration::days(back as i64);
            if date.month() != month {
                // 7 日以内に必ず見つかるので起こらない
                return Vec::new();
            }
            vec![GeneratedOccurrence {
                date,
                day_of_month: date.day(),
            }]
        }
    }
}

fn last_day_of_month(first_day: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first_day.month() == 12 {
        (first_day.year() + 1, 1)
    } else {
        (first_day.year(), first_day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

#[cfg(test)]
mod recurrence_tests {
    use super::*;

    #[test]
    fn test_sunday_rule_for_every_month_of_several_years() {
        for year in 2023..=2027 {
            for month in 1..=12 {
                let label = format!("{} {}", month_name(month), year);
                let dates = occurrences_for_month(&label, SUNDAY_SERVICE_0930);

                assert!(dates.len() == 4 || dates.len() == 5, "{label}: {}", dates.len());
                for occ in &dates {
                    assert_eq!(occ.date.weekday(), Weekday::Sun);
                    assert_eq!(occ.date.month(), month);
                    assert_eq!(occ.day_of_month, occ.date.day());
                }
                // 昇順
                assert!(dates.windows(2).all(|w| w[0].date < w[1].date));
            }
        }
    }

    #[test]
    fn test_last_friday_is_single_and_latest() {
        for year in 2024..=2026 {
            for month in 1..=12 {
                let label = format!("{} {}", month_name(month), year);
                let dates = occurrences_for_month(&label, FRIDAY_NIGHT_PRAYER);

                assert_eq!(dates.len(), 1, "{label}");
                let friday = dates[0].date;
                assert_eq!(friday.weekday(), Weekday::Fri);
                assert_eq!(friday.month(), month);
                // 7 日後はもう翌月
                assert_ne!((friday + Duration::days(7)).month(), month);
            }
        }
    }

    #[test]
    fn test_october_2025_dates() {
        let sundays: Vec<u32> = occurrences_for_month("October 2025", SUNDAY_SERVICE_1130)
            .iter()
            .map(|o| o.day_of_month)
            .collect();
        assert_eq!(sundays, vec![5, 12, 19, 26]);

        let thursdays: Vec<u32> = occurrences_for_month("October 2025", THURSDAY_SERVICE)
            .iter()
            .map(|o| o.day_of_month)
            .collect();
        assert_eq!(thursdays, vec![2, 9, 16, 23, 30]);

        let saturdays: Vec<u32> = occurrences_for_month("October 2025", HOUR_OF_MEDITATION)
            .iter()
            .map(|o| o.day_of_month)
            .collect();
        assert_eq!(saturdays, vec![4, 11, 18, 25]);

        // 10/31 が金曜
        let friday = occurrences_for_month("October 2025", FRIDAY_NIGHT_PRAYER);
        assert_eq!(friday[0].day_of_month, 31);
        assert_eq!(friday[0].label(), "Friday, October 31");
    }

    #[test]
    fn test_custom_event_defaults_to_sunday() {
        let custom = occurrences_for_month("November 2025", "Youth Night");
        let sunday = occurrences_for_month("November 2025", SUNDAY_SERVICE_0930);
        assert_eq!(custom, sunday);
    }

    #[test]
    fn test_rule_lookup_ignores_case() {
        assert_eq!(rule_for_event("sunday service - 11:30 am"), RecurrenceRule::Weekly(Weekday::Sun));
        assert_eq!(rule_for_event("SUNDAY SERVICE"), RecurrenceRule::Weekly(Weekday::Sun));
        assert_eq!(rule_for_event(" thursday service "), RecurrenceRule::Weekly(Weekday::Thu));
        assert_eq!(rule_for_event("friday night prayer"), RecurrenceRule::LastOfMonth(Weekday::Fri));
        assert_eq!(rule_for_event("hour of meditation"), RecurrenceRule::Weekly(Weekday::Sat));
        // 組み込みの種別はすべて解釈できる
        for event_type in BUILTIN_EVENT_TYPES {
            assert!(!occurrences_for_month("October 2025", event_type).is_empty(), "{event_type}");
        }
    }

    #[test]
    fn test_invalid_month_label_yields_empty() {
        assert!(occurrences_for_month("Smarch 2025", SUNDAY_SERVICE_0930).is_empty());
        assert!(occurrences_for_month("October", SUNDAY_SERVICE_0930).is_empty());
        assert!(occurrences_for_month("October twenty", THURSDAY_SERVICE).is_empty());
        assert!(occurrences_for_month("", FRIDAY_NIGHT_PRAYER).is_empty());
    }

    #[test]
    fn test_event_time_and_description() {
        assert_eq!(event_time(SUNDAY_SERVICE_1330), "1:30 PM");
        assert_eq!(event_time(THURSDAY_SERVICE), "7:00 PM");
        assert_eq!(event_time(FRIDAY_NIGHT_PRAYER), "7:30 PM");
        assert_eq!(event_time(HOUR_OF_MEDITATION), "10:00 AM");
        assert_eq!(event_time("Youth Night"), "9:30 AM");
        assert_eq!(event_time("Choir - 6:15 PM"), "6:15 PM");

        let date = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();
        assert_eq!(
            occurrence_description(date, SUNDAY_SERVICE_0930),
            "Sunday, October 5 - 9:30 AM"
        );
    }

    #[test]
    fn test_month_labels() {
        assert_eq!(parse_month_label("october 2025"), Some((2025, 10)));
        let today = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        let labels = upcoming_month_labels(today);
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0], "November 2025");
        assert_eq!(labels[2], "January 2026");
        assert_eq!(month_label(today), "November 2025");
    }
}
