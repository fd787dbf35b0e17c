//! 처리할 접근 로그와 포맷 결정
//!
//! 우선순위:
//! - 접근 로그: 명시된 경로(`-`는 표준 입력) > 파이프로 들어온 표준 입력 > nginx 설정 탐지
//! - 포맷: 명시된 포맷 > nginx 설정에서 탐지된 포맷
//!
//! Apache는 설정 탐지를 지원하지 않으므로 경로와 포맷이 모두 필요합니다.

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use botstat_core::types::ServerType;

use crate::config::PipelineConfig;
use crate::discover::locate_config;
use crate::error::LogPipelineError;
use crate::format::FormatTemplate;
use crate::nginx_conf::Resolution;

/// 표준 입력을 뜻하는 접근 로그 경로
pub const STDIN_PATH: &str = "-";

/// 로그 입력
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogInput {
    Stdin,
    File(PathBuf),
}

impl LogInput {
    fn from_arg(path: &str) -> Self {
        if path == STDIN_PATH {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(path))
        }
    }
}

impl fmt::Display for LogInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("stdin"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 결정된 입력과 포맷
#[derive(Debug, Clone)]
pub struct LogSource {
    pub input: LogInput,
    pub format: FormatTemplate,
}

/// 설정에서 입력과 포맷을 결정합니다.
///
/// `stdin_piped`는 표준 입력이 터미널이 아닌지 여부입니다. 접근 로그가 설정되지 않았고
/// 표준 입력이 파이프라면 표준 입력을 읽습니다.
///
/// # Errors
/// 탐지 실패, 포맷 누락, 존재하지 않는 접근 로그 파일 등 설정 에러
pub async fn resolve_source(
    config: &PipelineConfig,
    stdin_piped: bool,
) -> Result<LogSource, LogPipelineError> {
    let input = match config.access_log.as_deref() {
        Some(path) => Some(LogInput::from_arg(path)),
        None if stdin_piped => Some(LogInput::Stdin),
        None => None,
    };

    let source = match config.server_type {
        ServerType::Nginx => resolve_nginx(config, input).await?,
        ServerType::Apache => {
            let format = config
                .log_format
                .as_deref()
                .ok_or(LogPipelineError::ApacheFormatNotSet)?;
            let input = input.ok_or_else(|| {
                LogPipelineError::AccessLogNotSet(ServerType::Apache.to_string())
            })?;
            LogSource {
                input,
                format: FormatTemplate::apache(format)?,
            }
        }
    };

    if let LogInput::File(path) = &source.input {
        match tokio::fs::metadata(path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LogPipelineError::AccessLogNotFound(
                    path.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(access_log = %source.input, log_format = %source.format.name(), "resolved log source");
    Ok(source)
}

async fn resolve_nginx(
    config: &PipelineConfig,
    input: Option<LogInput>,
) -> Result<LogSource, LogPipelineError> {
    let (input, detected) = match input {
        Some(input) => (input, None),
        None => {
            let nginx = locate_config(config.nginx_config.as_deref(), &config.locator()).await?;
            match nginx.resolve(config.access_log_choice.as_ref())? {
                Resolution::Resolved(log) => {
                    info!(path = %log.path, format = %log.format_name, "detected access log");
                    (LogInput::File(PathBuf::from(&log.path)), Some(log))
                }
                Resolution::Ambiguous(candidates) => {
                    return Err(LogPipelineError::AmbiguousAccessLog {
                        candidates: candidates.into_iter().map(|c| c.path).collect(),
                    });
                }
            }
        }
    };

    let format = match (config.log_format.as_deref(), detected) {
        (Some(format), _) => FormatTemplate::nginx(format)?,
        (None, Some(log)) => FormatTemplate::nginx(&log.template)?.with_name(log.format_name),
        (None, None) => return Err(LogPipelineError::NginxFormatNotSet),
    };

    Ok(LogSource { input, format })
}
