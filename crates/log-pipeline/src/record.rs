//! 캡처된 필드를 정규화된 [`AccessRecord`]로 변환
//!
//! 서버 종류마다 같은 의미의 값이 다른 이름으로 캡처됩니다
//! (nginx `http_user_agent`, Apache `request_header_user_agent` 등).
//! 이 모듈은 별칭 목록을 순서대로 조회해 첫 번째로 존재하는 값을 사용합니다.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use botstat_core::error::ParseError;
use botstat_core::types::AccessRecord;

/// 이름으로 캡처 값을 조회할 수 있는 필드 집합
pub trait FieldLookup {
    /// 필드 값을 반환합니다. 없으면 `None`입니다.
    fn field(&self, name: &str) -> Option<&str>;
}

impl FieldLookup for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldLookup for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldLookup for [(&str, &str)] {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

/// 정규화 대상 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Timestamp,
    UserAgent,
    Status,
    Bytes,
    RequestTime,
    Host,
}

/// 포맷에 반드시 있어야 하는 필드 (검증 순서)
pub const REQUIRED_FIELDS: [RecordField; 3] = [
    RecordField::Status,
    RecordField::UserAgent,
    RecordField::Timestamp,
];

impl RecordField {
    /// 조회 순서대로 나열한 별칭
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Timestamp => &["time_local", "time_received", "time_iso8601"],
            Self::UserAgent => &["http_user_agent", "request_header_user_agent"],
            Self::Status => &["status"],
            Self::Bytes => &[
                "body_bytes_sent",
                "response_bytes",
                "response_bytes_clf",
                "bytes_tx",
            ],
            Self::RequestTime => &["request_time", "time_s", "time_us"],
            Self::Host => &["host", "server_name"],
        }
    }

    /// 에러 메시지에 사용하는 nginx 필드 이름
    pub fn canonical_name(self) -> &'static str {
        self.aliases()[0]
    }

    /// 첫 번째로 존재하는 별칭과 값을 반환합니다.
    fn lookup<'a, F>(self, fields: &'a F) -> Option<(&'static str, &'a str)>
    where
        F: FieldLookup + ?Sized,
    {
        self.aliases()
            .iter()
            .find_map(|alias| fields.field(alias).map(|v| (*alias, v)))
    }
}

/// 캡처된 필드를 레코드로 정규화합니다.
///
/// 타임스탬프와 User-Agent는 필수입니다. 나머지 값은 해석할 수 없으면
/// 비어 있는 것으로 취급합니다:
/// - 상태 코드가 숫자가 아니면 `None` (분류되지 않은 클래스)
/// - 응답 바이트 `-`는 0, 그 외 숫자가 아니면 `None`
/// - 요청 시간은 초 단위로 환산 (`time_us`는 마이크로초)
pub fn normalize<F>(fields: &F) -> Result<AccessRecord, ParseError>
where
    F: FieldLookup + ?Sized,
{
    let (_, timestamp) = RecordField::Timestamp
        .lookup(fields)
        .ok_or_else(|| missing(RecordField::Timestamp))?;
    let (_, user_agent) = RecordField::UserAgent
        .lookup(fields)
        .ok_or_else(|| missing(RecordField::UserAgent))?;

    let mut record = AccessRecord::new(timestamp, user_agent);

    if let Some((_, raw)) = RecordField::Status.lookup(fields) {
        match raw.trim().parse::<u16>() {
            Ok(status) => record = record.with_status(status),
            Err(_) => debug!(value = raw, "non-numeric status, record left unclassified"),
        }
    }

    if let Some((_, raw)) = RecordField::Bytes.lookup(fields) {
        if let Some(bytes) = parse_bytes(raw) {
            record = record.with_body_bytes(bytes);
        }
    }

    if let Some((alias, raw)) = RecordField::RequestTime.lookup(fields) {
        if let Ok(value) = raw.trim().parse::<f64>() {
            let seconds = if alias == "time_us" {
                value / 1_000_000.0
            } else {
                value
            };
            record = record.with_request_time(seconds);
        }
    }

    if let Some((_, host)) = RecordField::Host.lookup(fields) {
        if !host.is_empty() {
            record = record.with_host(host);
        }
    }

    Ok(record)
}

fn parse_bytes(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw == "-" {
        return Some(0);
    }
    raw.parse().ok()
}

fn missing(field: RecordField) -> ParseError {
    ParseError::InvalidField {
        field: field.canonical_name().to_owned(),
        reason: "field is not captured by log format".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&'static str, &'static str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn nginx_fields_normalize() {
        let f = fields(&[
            ("time_local", "25/Jun/2018:14:06:24 +0000"),
            ("http_user_agent", "Googlebot/2.1"),
            ("status", "200"),
            ("body_bytes_sent", "512"),
            ("request_time", "0.25"),
            ("host", "example.com"),
        ]);
        let record = normalize(&f).unwrap();
        assert_eq!(record.timestamp, "25/Jun/2018:14:06:24 +0000");
        assert_eq!(record.user_agent, "Googlebot/2.1");
        assert_eq!(record.status, Some(200));
        assert_eq!(record.body_bytes, Some(512));
        assert_eq!(record.request_time, Some(0.25));
        assert_eq!(record.host.as_deref(), Some("example.com"));
    }

    #[test]
    fn apache_aliases_normalize() {
        let f: &[(&str, &str)] = &[
            ("time_received", "26/Jun/2018:01:02:03 +0200"),
            ("request_header_user_agent", "bingbot/2.0"),
            ("status", "404"),
            ("response_bytes_clf", "-"),
            ("time_us", "1500000"),
            ("server_name", "vhost.example"),
        ];
        let record = normalize(f).unwrap();
        assert_eq!(record.user_agent, "bingbot/2.0");
        assert_eq!(record.status, Some(404));
        assert_eq!(record.body_bytes, Some(0));
        assert_eq!(record.request_time, Some(1.5));
        assert_eq!(record.host.as_deref(), Some("vhost.example"));
    }

    #[test]
    fn first_alias_wins() {
        let f: &[(&str, &str)] = &[
            ("time_received", "later"),
            ("time_local", "first"),
            ("http_user_agent", "ua"),
        ];
        assert_eq!(normalize(f).unwrap().timestamp, "first");
    }

    #[test]
    fn apache_bytes_tx_counts_as_bytes() {
        let f: &[(&str, &str)] = &[
            ("time_received", "25/Jun/2018:14:06:24 +0000"),
            ("request_header_user_agent", "Googlebot/2.1"),
            ("status", "200"),
            ("bytes_tx", "512"),
        ];
        assert_eq!(normalize(f).unwrap().body_bytes, Some(512));
    }

    #[test]
    fn non_numeric_values_become_absent() {
        let f: &[(&str, &str)] = &[
            ("time_local", "t"),
            ("http_user_agent", "ua"),
            ("status", "-"),
            ("body_bytes_sent", "lots"),
            ("request_time", "-"),
        ];
        let record = normalize(f).unwrap();
        assert_eq!(record.status, None);
        assert_eq!(record.body_bytes, None);
        assert_eq!(record.request_time, None);
        assert_eq!(record.host, None);
    }

    #[test]
    fn missing_user_agent_is_error() {
        let f: &[(&str, &str)] = &[("time_local", "t"), ("status", "200")];
        let err = normalize(f).unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { ref field, .. } if field == "http_user_agent"));
    }

    #[test]
    fn missing_timestamp_is_error() {
        let f: &[(&str, &str)] = &[("http_user_agent", "ua")];
        let err = normalize(f).unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { ref field, .. } if field == "time_local"));
    }

    #[test]
    fn required_fields_order() {
        let names: Vec<_> = REQUIRED_FIELDS.iter().map(|f| f.canonical_name()).collect();
        assert_eq!(names, vec!["status", "http_user_agent", "time_local"]);
    }
}
