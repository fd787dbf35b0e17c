//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for BotstatError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 라인 단위 매칭 실패는 에러가 아니라 건너뛰기로 처리되므로 여기에 없습니다.

use botstat_core::error::{BotstatError, ConfigError, PipelineError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 포맷 템플릿 해석 실패
    #[error("invalid log format at offset {offset}: {reason}")]
    Format {
        /// 템플릿 내 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 구분 문자 없이 붙어 있는 두 플레이스홀더
    #[error(
        "fields '{first}' and '{second}' are adjacent with no literal separator; \
         capture boundary is ambiguous"
    )]
    AdjacentFields {
        /// 앞 필드
        first: String,
        /// 뒤 필드
        second: String,
    },

    /// 같은 플레이스홀더가 두 번 사용됨
    #[error("field '{0}' appears more than once in log format")]
    DuplicateField(String),

    /// 필수 필드 누락
    #[error("\"{0}\" is a required field in log format, but it isn't present")]
    MissingField(String),

    /// 웹 서버 설정 파일을 찾을 수 없음
    #[error("nginx config file not found: {0}")]
    ConfigNotFound(String),

    /// 설정 파일에 접근 로그 선언이 없음
    #[error("access log file is not provided and cannot be detected from config file ({0})")]
    NoAccessLog(String),

    /// 접근 로그가 참조하는 포맷 이름이 정의되지 않음
    #[error("incorrect format name '{format}' set in config for access log file \"{path}\"")]
    UnknownFormat {
        /// 접근 로그 경로
        path: String,
        /// 정의되지 않은 포맷 이름
        format: String,
    },

    /// 여러 접근 로그 중 선택이 필요함
    #[error("multiple access logs declared in config: {}", candidates.join(", "))]
    AmbiguousAccessLog {
        /// 후보 경로 목록 (선언 순서)
        candidates: Vec<String>,
    },

    /// 외부에서 전달된 선택이 후보와 맞지 않음
    #[error("invalid access log choice '{choice}': {reason}")]
    InvalidChoice {
        /// 전달된 선택 값
        choice: String,
        /// 실패 사유
        reason: String,
    },

    /// 웹 서버 바이너리를 실행할 수 없음
    #[error(
        "access log file or format was not set and nginx config file cannot be detected: \
         '{0}' could not be executed (perhaps nginx is not in your PATH?)"
    )]
    BinaryNotFound(String),

    /// 웹 서버 바이너리가 제한 시간 안에 응답하지 않음
    #[error("'{binary} -V' did not finish within {timeout_secs}s")]
    DiscoveryTimeout {
        /// 실행한 바이너리
        binary: String,
        /// 대기 한도 (초)
        timeout_secs: u64,
    },

    /// nginx 로그 포맷을 결정할 수 없음
    #[error("nginx log_format is not set and can't be detected automatically")]
    NginxFormatNotSet,

    /// Apache 로그 포맷이 지정되지 않음
    #[error("apache log format is not set and can't be detected automatically (try 'combined')")]
    ApacheFormatNotSet,

    /// 접근 로그 경로가 지정되지 않음
    #[error("access log file is not set for {0} and cannot be detected")]
    AccessLogNotSet(String),

    /// 접근 로그 파일이 존재하지 않음
    #[error("access log file \"{0}\" does not exist")]
    AccessLogNotFound(String),

    /// 시작 날짜 해석 실패
    #[error("invalid start date '{0}'")]
    InvalidStartDate(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl LogPipelineError {
    /// 설정/검증 단계의 치명적 에러인지 여부
    pub fn is_config(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

impl From<LogPipelineError> for BotstatError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Io(e) => BotstatError::Io(e),
            LogPipelineError::InvalidStartDate(value) => {
                BotstatError::Config(ConfigError::InvalidValue {
                    field: "filter.date_start".to_owned(),
                    reason: format!("cannot parse '{value}' as a date"),
                })
            }
            other => BotstatError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
