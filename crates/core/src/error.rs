//! 에러 타입 -- 도메인별 에러 정의

/// botstat 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum BotstatError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
///
/// 실행 전체를 중단시키는 치명적 상황을 나타냅니다.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패 (포맷 컴파일, 접근 로그 탐지 등)
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 로그 스트림 처리 실패
    #[error("ingest failed: {0}")]
    Ingest(String),
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 라인이 포맷과 일치하지 않음
    #[error("line does not match format '{format}'")]
    NoMatch { format: String },

    /// 필드 값 파싱 실패
    #[error("invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: BotstatError = ConfigError::FileNotFound {
            path: "/etc/botstat.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, BotstatError::Config(_)));
        assert!(err.to_string().contains("/etc/botstat.toml"));
    }

    #[test]
    fn parse_error_display_names_field() {
        let err = ParseError::InvalidField {
            field: "status".to_owned(),
            reason: "not a number".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status"));
        assert!(msg.contains("not a number"));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BotstatError = io.into();
        assert!(matches!(err, BotstatError::Io(_)));
    }
}
