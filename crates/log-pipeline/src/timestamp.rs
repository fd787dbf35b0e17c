//! 타임스탬프 문자열에서 날짜 추출
//!
//! 집계와 날짜 탐색은 날짜 단위로만 비교하므로 시각과 시간대는 무시합니다.
//! 다음 형태를 문자열 어디에서든 찾아냅니다:
//! - `2018/06/25`, `2018-06-25`, `2018.06.25` (ISO 8601 포함)
//! - `25/Jun/2018`, `25 Jun 2018`, `25-June-2018` (nginx `$time_local`, Apache `%t`)

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

fn year_first() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})").expect("valid year-first date regex")
    })
}

fn day_first() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})[/ -]([a-z]{3})[a-z]*[/ -](\d{4})")
            .expect("valid day-first date regex")
    })
}

/// 타임스탬프에서 날짜를 추출합니다. 찾을 수 없으면 `None`을 반환합니다.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim().trim_start_matches('[').trim_end_matches(']');

    if let Some(caps) = year_first().captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    let caps = day_first().captures(text)?;
    let day = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let name = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name)
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn nginx_time_local() {
        assert_eq!(parse_date("25/Jun/2018:14:06:24 +0000"), Some(date(2018, 6, 25)));
    }

    #[test]
    fn apache_bracketed() {
        assert_eq!(parse_date("[26/jun/2018:01:02:03 +0200]"), Some(date(2018, 6, 26)));
    }

    #[test]
    fn year_first_separators() {
        assert_eq!(parse_date("2018/09/01 12:09:09"), Some(date(2018, 9, 1)));
        assert_eq!(parse_date("2018-03-21"), Some(date(2018, 3, 21)));
        assert_eq!(parse_date("2018.3.2"), Some(date(2018, 3, 2)));
    }

    #[test]
    fn iso8601() {
        assert_eq!(
            parse_date("2018-06-27T23:59:59+03:00"),
            Some(date(2018, 6, 27))
        );
    }

    #[test]
    fn full_month_name() {
        assert_eq!(parse_date("21 March 2018"), Some(date(2018, 3, 21)));
    }

    #[test]
    fn invalid_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2018/13/40"), None);
        assert_eq!(parse_date("31/Feb/2018"), None);
        assert_eq!(parse_date("01/Foo/2018"), None);
    }
}
