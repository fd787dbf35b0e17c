//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 로그 파이프라인과 CLI가 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 웹 서버 종류
///
/// 로그 포맷 문법(nginx `$var` 또는 Apache `%x` 토큰)을 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// nginx (`log_format` 문법, 설정 파일 자동 탐지 지원)
    #[default]
    Nginx,
    /// Apache httpd (`LogFormat` 토큰 문법)
    Apache,
}

impl ServerType {
    /// 설정 파일/CLI에서 사용하는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nginx => "nginx",
            Self::Apache => "apache",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nginx" => Ok(Self::Nginx),
            "apache" => Ok(Self::Apache),
            other => Err(format!("unknown server type '{other}' (expected: nginx, apache)")),
        }
    }
}

/// HTTP 상태 코드 클래스
///
/// 상태 코드의 백의 자리를 다시 100 단위로 환산한 값입니다 (404 -> 400).
/// 상태 필드가 없거나 숫자가 아닌 레코드는 [`StatusClass::UNCLASSIFIED`]로 분류됩니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StatusClass(u16);

impl StatusClass {
    /// 상태 코드 미확인
    pub const UNCLASSIFIED: Self = Self(0);
    /// 2xx
    pub const SUCCESS: Self = Self(200);
    /// 3xx
    pub const REDIRECTION: Self = Self(300);
    /// 4xx
    pub const CLIENT_ERROR: Self = Self(400);
    /// 5xx
    pub const SERVER_ERROR: Self = Self(500);

    /// 리포트 컬럼으로 출력되는 클래스 (순서 고정)
    pub const REPORTED: [Self; 4] = [
        Self::SUCCESS,
        Self::REDIRECTION,
        Self::CLIENT_ERROR,
        Self::SERVER_ERROR,
    ];

    /// 상태 코드에서 클래스를 계산합니다: `(code / 100) * 100`
    pub fn from_status(code: u16) -> Self {
        Self(code / 100 * 100)
    }

    /// 선택적 상태 코드에서 클래스를 계산합니다.
    pub fn from_optional(code: Option<u16>) -> Self {
        code.map_or(Self::UNCLASSIFIED, Self::from_status)
    }

    /// 클래스 대표 값 (200, 300, ...)
    pub fn code(self) -> u16 {
        self.0
    }

    pub fn is_classified(self) -> bool {
        self != Self::UNCLASSIFIED
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_classified() {
            write!(f, "{}xx", self.0 / 100)
        } else {
            f.write_str("unclassified")
        }
    }
}

/// 접근 로그 레코드
///
/// 한 라인을 컴파일된 포맷으로 매칭한 뒤 표준 필드 이름으로 정규화한 결과입니다.
/// 타임스탬프와 User-Agent는 항상 존재하며, 나머지 필드는 포맷에 따라
/// 없을 수 있으므로 `Option`으로 명시합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    /// 원본 타임스탬프 문자열 (예: `25/Jun/2018:14:06:24 +0000`)
    pub timestamp: String,
    /// User-Agent 헤더 값
    pub user_agent: String,
    /// HTTP 상태 코드
    pub status: Option<u16>,
    /// 응답 본문 바이트 수 (`-`는 0으로 정규화)
    pub body_bytes: Option<u64>,
    /// 요청 처리 시간 (초)
    pub request_time: Option<f64>,
    /// 가상 호스트
    pub host: Option<String>,
}

impl AccessRecord {
    /// 필수 필드만으로 레코드를 생성합니다.
    pub fn new(timestamp: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            user_agent: user_agent.into(),
            status: None,
            body_bytes: None,
            request_time: None,
            host: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body_bytes(mut self, bytes: u64) -> Self {
        self.body_bytes = Some(bytes);
        self
    }

    pub fn with_request_time(mut self, seconds: f64) -> Self {
        self.request_time = Some(seconds);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// 레코드의 상태 코드 클래스
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_optional(self.status)
    }
}

/// 봇 카탈로그 항목
///
/// User-Agent에 포함된 시그니처 문자열과 리포트에 표시할 이름의 쌍입니다.
/// 여러 시그니처가 같은 이름을 가질 수 있으며, 집계는 이름 기준으로 이루어집니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotEntry {
    /// User-Agent 시그니처 (대소문자 무시 부분 문자열)
    pub signature: String,
    /// 리포트 표시 이름
    pub name: String,
}

impl BotEntry {
    pub fn new(signature: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            name: name.into(),
        }
    }
}
