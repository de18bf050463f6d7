// =====================
// 文書名とリモート別名の対応
// =====================
//
// リモートのパス構文で使えない 7 文字を、決まったトークンに置き換える。
//   .  -> _DOT_            #  -> _HASH_
//   $  -> _DOLLAR_         [  -> _OPEN_BRACKET_
//   ]  -> _CLOSE_BRACKET_  空白 -> _SPACE_
//   :  -> _COLON_
// 英数字と上記 7 文字からなる名前については sanitize -> unsanitize が恒等写像になる。

pub const TEAM_MEMBERS: &str = "team_members.json";
pub const REQUESTS: &str = "requests.json";
/// 過去にエスケープ済みの名前で保存されていたリクエストログ
pub const LEGACY_REQUESTS: &str = "requests_DOT_json";
pub const TEAM_ACTIVITIES: &str = "team_activities.json";
pub const CURRENT_USER: &str = "current_user.json";

pub const ROSTER_PREFIX: &str = "schedule_";
pub const DOCUMENT_SUFFIX: &str = ".json";

/// リモート上のルート
pub const REMOTE_ROOT: &str = "files";

const ESCAPES: [(char, &str); 7] = [
    ('.', "_DOT_"),
    ('#', "_HASH_"),
    ('$', "_DOLLAR_"),
    ('[', "_OPEN_BRACKET_"),
    (']', "_CLOSE_BRACKET_"),
    (' ', "_SPACE_"),
    (':', "_COLON_"),
];

/// 文書名 -> リモート別名
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    for c in name.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, token)) => out.push_str(token),
            None => out.push(c),
        }
    }
    out
}

/// リモート別名 -> 文書名
///
/// 先頭から 1 回だけ走査する。置換を順に適用すると、
/// あるトークンの置換結果が別のトークンの一部に見えてしまうことがあるため。
pub fn unsanitize_name(alias: &str) -> String {
    let mut out = String::with_capacity(alias.len());
    let mut rest = alias;
    'scan: while let Some(c) = rest.chars().next() {
        if c == '_' {
            for (raw, token) in ESCAPES.iter() {
                if let Some(after) = rest.strip_prefix(token) {
                    out.push(*raw);
                    rest = after;
                    continue 'scan;
                }
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// ロスター文書名: schedule_<月>_<イベント種別>.json
pub fn roster_document_name(month: &str, event_type: &str) -> String {
    format!(
        "{}{}_{}{}",
        ROSTER_PREFIX,
        roster_name_part(month),
        roster_name_part(event_type),
        DOCUMENT_SUFFIX
    )
}

/// 空白は '_'、パス区切りとドットは '-' にする (ローカルのキーとして常に有効になる)
fn roster_name_part(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | '.' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

/// エスケープ済みの名前でもロスターとして認識する
pub fn is_roster_document_name(name: &str) -> bool {
    let raw = unsanitize_name(name);
    raw.starts_with(ROSTER_PREFIX) && raw.ends_with(DOCUMENT_SUFFIX)
}

/// 既知の文書の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    TeamDirectory,
    RequestLog,
    ActivityLog,
    Session,
    Roster,
}

impl DocumentKind {
    pub fn of(name: &str) -> Option<Self> {
        let raw = unsanitize_name(name);
        match raw.as_str() {
            TEAM_MEMBERS => Some(DocumentKind::TeamDirectory),
            REQUESTS => Some(DocumentKind::RequestLog),
            TEAM_ACTIVITIES => Some(DocumentKind::ActivityLog),
            CURRENT_USER => Some(DocumentKind::Session),
            _ if is_roster_document_name(&raw) => Some(DocumentKind::Roster),
            _ => None,
        }
    }

    /// 両方のバックエンドに無いときに返す空の既定値。
    /// セッションとロスターには既定値が無い (NotFound になる)
    pub fn default_content(&self) -> Option<&'static str> {
        match self {
            DocumentKind::TeamDirectory => Some(r#"{"members":[]}"#),
            DocumentKind::RequestLog => Some("[]"),
            DocumentKind::ActivityLog => Some(r#"{"activities":[]}"#),
            DocumentKind::Session | DocumentKind::Roster => None,
        }
    }
}

/// 名前に対応する既定値
pub fn default_document(name: &str) -> Option<&'static str> {
    DocumentKind::of(name).and_then(|kind| kind.default_content())
}

#[cfg(test)]
mod naming_tests {
    use super::*;

    #[test]
    fn test_sanitize_known_names() {
        assert_eq!(sanitize_name("team_members.json"), "team_members_DOT_json");
        assert_eq!(
            sanitize_name("schedule_October_2025_Sunday_Service_-_9:30_AM.json"),
            "schedule_October_2025_Sunday_Service_-_9_COLON_30_AM_DOT_json"
        );
        assert_eq!(sanitize_name("a b#c$[d]"), "a_SPACE_b_HASH_c_DOLLAR__OPEN_BRACKET_d_CLOSE_BRACKET_");
    }

    #[test]
    fn test_round_trip_over_reserved_and_alphanumeric() {
        let alphabet: Vec<char> = "aZ09.#$[] :".chars().collect();
        // 長さ 3 までの全組み合わせ
        let mut names = vec![String::new()];
        for _ in 0..3 {
            let mut next = Vec::new();
            for prefix in &names {
                for c in &alphabet {
                    next.push(format!("{prefix}{c}"));
                }
            }
            names.extend(next.clone());
            names = names.into_iter().collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        }

        for name in names {
            assert_eq!(unsanitize_name(&sanitize_name(&name)), name, "round trip of {name:?}");
        }
    }

    #[test]
    fn test_unsanitize_adjacent_tokens() {
        assert_eq!(unsanitize_name("_DOT__SPACE__COLON_"), ". :");
        assert_eq!(unsanitize_name("HASH_HASH_DOT"), "HASH#DOT");
        assert_eq!(unsanitize_name("requests_DOT_json"), "requests.json");
        assert_eq!(unsanitize_name("plain_name"), "plain_name");
    }

    #[test]
    fn test_roster_names_and_kinds() {
        let name = roster_document_name("October 2025", "Sunday Service - 9:30 AM");
        assert_eq!(name, "schedule_October_2025_Sunday_Service_-_9:30_AM.json");
        assert!(is_roster_document_name(&name));
        assert!(is_roster_document_name(&sanitize_name(&name)));
        assert!(!is_roster_document_name("team_members.json"));

        // 自由入力のイベント名でもキーとして使える名前になる
        assert_eq!(
            roster_document_name("October 2025", "Youth/Teens Night"),
            "schedule_October_2025_Youth-Teens_Night.json"
        );
        assert_eq!(
            roster_document_name(" March 2026 ", "Prayer \\ Praise..."),
            "schedule_March_2026_Prayer_-_Praise---.json"
        );

        assert_eq!(DocumentKind::of(&name), Some(DocumentKind::Roster));
        assert_eq!(DocumentKind::of(LEGACY_REQUESTS), Some(DocumentKind::RequestLog));
        assert_eq!(default_document(TEAM_MEMBERS), Some(r#"{"members":[]}"#));
        assert_eq!(default_document(CURRENT_USER), None);
        assert_eq!(default_document("notes.txt"), None);
    }
}
