//! 로그 포맷 컴파일러 -- 템플릿 문자열을 라인 매처로 변환
//!
//! 웹 서버의 로그 포맷 선언(nginx `log_format`, Apache `LogFormat`)을
//! 리터럴 텍스트와 이름 있는 플레이스홀더의 순서열([`FormatTemplate`])로 해석한 뒤,
//! 하나의 정규식([`LineMatcher`])으로 컴파일합니다.
//!
//! # 컴파일 규칙
//! - 리터럴 구간의 정규식 특수 문자는 모두 이스케이프합니다.
//! - 플레이스홀더는 `(?P<name>.*)` 그룹이 됩니다 (탐욕적, 다음 리터럴 구분자까지).
//! - 패턴은 라인 시작에만 고정되어 템플릿 뒤에 붙은 추가 필드를 허용합니다. 빈 템플릿은 빈 라인만 매칭합니다.
//! - 구분 리터럴 없이 붙은 두 플레이스홀더는 경계가 모호하므로 컴파일 에러입니다.
//! - 같은 플레이스홀더를 두 번 쓰는 것도 컴파일 에러입니다.
//!
//! # 사용 예시
//! ```ignore
//! use botstat_log_pipeline::format::FormatTemplate;
//!
//! let matcher = FormatTemplate::nginx("combined")?.compile()?;
//! matcher.ensure_record_fields()?;
//! let fields = matcher.match_line(line).unwrap();
//! assert_eq!(fields.get("status"), Some("200"));
//! ```

pub mod apache;
pub mod nginx;

pub use apache::{APACHE_COMBINED, APACHE_COMMON, APACHE_VHOST_COMBINED};
pub use nginx::{NGINX_COMBINED, NGINX_COMMON};

use std::collections::HashSet;

use regex::{Captures, Regex};
use tracing::debug;

use botstat_core::error::{BotstatError, ParseError};
use botstat_core::pipeline::LineParser;
use botstat_core::types::{AccessRecord, ServerType};

use crate::error::LogPipelineError;
use crate::record::{self, FieldLookup, RecordField};

/// 템플릿 구성 요소
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 그대로 매칭되는 텍스트
    Literal(String),
    /// 이름 있는 필드
    Field(String),
}

/// 리터럴과 플레이스홀더가 섞인 로그 라인 레이아웃
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    /// 포맷 이름 (프리셋 이름 또는 `custom`)
    name: String,
    segments: Vec<Segment>,
}

impl FormatTemplate {
    /// 빈 템플릿을 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
        }
    }

    /// nginx `log_format` 문자열 또는 프리셋 이름(`combined`, `common`)을 해석합니다.
    pub fn nginx(format: &str) -> Result<Self, LogPipelineError> {
        nginx::parse(format)
    }

    /// Apache `LogFormat` 문자열 또는 프리셋 이름을 해석합니다.
    pub fn apache(format: &str) -> Result<Self, LogPipelineError> {
        apache::parse(format)
    }

    /// 서버 종류에 맞는 문법으로 포맷을 해석합니다.
    pub fn for_server(server: ServerType, format: &str) -> Result<Self, LogPipelineError> {
        match server {
            ServerType::Nginx => Self::nginx(format),
            ServerType::Apache => Self::apache(format),
        }
    }

    /// 포맷 이름을 바꿉니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 리터럴을 추가합니다. 직전 세그먼트도 리터럴이면 이어 붙입니다.
    pub fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_owned()));
        }
    }

    /// 필드를 추가합니다.
    pub fn push_field(&mut self, name: impl Into<String>) {
        self.segments.push(Segment::Field(name.into()));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 템플릿에 선언된 필드 이름 (등장 순서)
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// 템플릿을 라인 매처로 컴파일합니다.
    ///
    /// # Errors
    /// - 같은 필드가 두 번 선언된 경우 (`DuplicateField`)
    /// - 두 필드 사이에 리터럴 구분자가 없는 경우 (`AdjacentFields`)
    /// - 필드 이름이 숫자로 시작하는 경우 (`Format`)
    pub fn compile(&self) -> Result<LineMatcher, LogPipelineError> {
        let mut seen = HashSet::new();
        let mut pattern = String::from("^");
        let mut previous_field: Option<&str> = None;
        let mut offset = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    pattern.push_str(&regex::escape(text));
                    previous_field = None;
                    offset += text.len();
                }
                Segment::Field(name) => {
                    if let Some(first) = previous_field {
                        return Err(LogPipelineError::AdjacentFields {
                            first: first.to_owned(),
                            second: name.clone(),
                        });
                    }
                    if !is_valid_group_name(name) {
                        return Err(LogPipelineError::Format {
                            offset,
                            reason: format!(
                                "field name '{name}' must start with a letter or underscore"
                            ),
                        });
                    }
                    if !seen.insert(name.as_str()) {
                        return Err(LogPipelineError::DuplicateField(name.clone()));
                    }
                    pattern.push_str("(?P<");
                    pattern.push_str(name);
                    pattern.push_str(">.*)");
                    previous_field = Some(name);
                    offset += name.len();
                }
            }
        }
        // 라인 시작만 고정; 선언된 템플릿 뒤의 추가 필드는 허용
        if self.segments.is_empty() {
            pattern.push('$');
        }

        debug!(format = %self.name, pattern = %pattern, "compiled log format");

        Ok(LineMatcher {
            name: self.name.clone(),
            regex: Regex::new(&pattern)?,
        })
    }
}

fn is_valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 컴파일된 라인 매처
///
/// 실행당 한 번 생성되어 모든 라인에 재사용되는 불변 객체입니다.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    name: String,
    regex: Regex,
}

impl LineMatcher {
    /// 포맷 이름
    pub fn format_name(&self) -> &str {
        &self.name
    }

    /// 컴파일된 정규식 패턴
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// 패턴에 선언된 캡처 이름 목록
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    /// 캡처 이름이 패턴에 존재하는지 확인합니다.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_names().any(|n| n == name)
    }

    /// 주어진 이름이 모두 캡처로 선언되어 있는지 검증합니다.
    ///
    /// 템플릿을 다시 해석하지 않고 컴파일된 패턴의 캡처 이름만 검사합니다.
    /// 첫 번째로 누락된 이름으로 `MissingField`를 반환합니다.
    pub fn ensure_captures(&self, names: &[&str]) -> Result<(), LogPipelineError> {
        match names.iter().find(|name| !self.has_field(name)) {
            Some(missing) => Err(LogPipelineError::MissingField((*missing).to_owned())),
            None => Ok(()),
        }
    }

    /// 집계에 필요한 필드(상태, User-Agent, 타임스탬프)가 있는지 검증합니다.
    ///
    /// 각 필드는 별칭 중 하나만 있으면 충족됩니다 (예: Apache의
    /// `request_header_user_agent`는 `http_user_agent`를 대신합니다).
    pub fn ensure_record_fields(&self) -> Result<(), LogPipelineError> {
        for field in record::REQUIRED_FIELDS {
            if !field.aliases().iter().any(|alias| self.has_field(alias)) {
                return Err(LogPipelineError::MissingField(
                    field.canonical_name().to_owned(),
                ));
            }
        }
        Ok(())
    }

    /// 라인 하나를 매칭합니다. 일치하지 않으면 `None`을 반환합니다.
    pub fn match_line<'h>(&self, line: &'h str) -> Option<LineFields<'h>> {
        self.regex.captures(line).map(|caps| LineFields { caps })
    }
}

impl LineParser for LineMatcher {
    fn format_name(&self) -> &str {
        &self.name
    }

    fn parse(&self, line: &str) -> Result<AccessRecord, BotstatError> {
        let fields = self.match_line(line).ok_or_else(|| ParseError::NoMatch {
            format: self.name.clone(),
        })?;
        Ok(record::normalize(&fields)?)
    }

    fn timestamp<'a>(&self, line: &'a str) -> Option<&'a str> {
        let fields = self.match_line(line)?;
        RecordField::Timestamp
            .aliases()
            .iter()
            .find_map(|alias| fields.get(alias))
    }
}

/// 매칭된 라인의 필드 값
#[derive(Debug)]
pub struct LineFields<'h> {
    caps: Captures<'h>,
}

impl<'h> LineFields<'h> {
    /// 필드 값을 반환합니다. 포맷에 없는 필드면 `None`입니다.
    pub fn get(&self, name: &str) -> Option<&'h str> {
        self.caps.name(name).map(|m| m.as_str())
    }
}

impl FieldLookup for LineFields<'_> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}
