//! 설정 관리 -- botstat.toml 파싱 및 런타임 설정
//!
//! [`BotstatConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`BOTSTAT_SOURCE_ACCESS_LOG=/var/log/nginx/access.log` 형식)
//! 3. 설정 파일 (`botstat.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), botstat_core::error::BotstatError> {
//! use botstat_core::config::BotstatConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = BotstatConfig::load("botstat.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = BotstatConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BotstatError, ConfigError};
use crate::types::{BotEntry, ServerType};

/// 설정 파일을 명시하지 않았을 때 찾는 경로
pub const DEFAULT_CONFIG_PATH: &str = "/etc/botstat.toml";

/// botstat 통합 설정
///
/// `botstat.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotstatConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
    /// 날짜 필터 설정
    #[serde(default)]
    pub filter: FilterConfig,
    /// 봇 카탈로그 (비어 있으면 내장 카탈로그 사용, 선언 순서대로 매칭)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bots: Vec<BotEntry>,
}

impl BotstatConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BotstatError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에서 시작합니다.
    ///
    /// 기본 경로([`DEFAULT_CONFIG_PATH`])처럼 선택적인 설정 파일에 사용합니다.
    /// 파일이 존재하지만 읽을 수 없거나 형식이 잘못된 경우는 에러입니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, BotstatError> {
        let path = path.as_ref();
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(BotstatError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BotstatError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BotstatError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                BotstatError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, BotstatError> {
        toml::from_str(toml_str).map_err(|e| {
            BotstatError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `BOTSTAT_{SECTION}_{FIELD}`
    /// 예: `BOTSTAT_FILTER_DAY_START=7`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "BOTSTAT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "BOTSTAT_GENERAL_LOG_FORMAT");

        // Source
        override_server_type(&mut self.source.server_type, "BOTSTAT_SOURCE_SERVER_TYPE");
        override_opt_string(&mut self.source.access_log, "BOTSTAT_SOURCE_ACCESS_LOG");
        override_opt_string(&mut self.source.log_format, "BOTSTAT_SOURCE_LOG_FORMAT");
        override_opt_string(&mut self.source.nginx_config, "BOTSTAT_SOURCE_NGINX_CONFIG");
        override_string(&mut self.source.nginx_binary, "BOTSTAT_SOURCE_NGINX_BINARY");
        override_u64(
            &mut self.source.discovery_timeout_secs,
            "BOTSTAT_SOURCE_DISCOVERY_TIMEOUT_SECS",
        );
        override_opt_string(
            &mut self.source.access_log_choice,
            "BOTSTAT_SOURCE_ACCESS_LOG_CHOICE",
        );

        // Filter
        override_opt_string(&mut self.filter.date_start, "BOTSTAT_FILTER_DATE_START");
        override_opt_u32(&mut self.filter.day_start, "BOTSTAT_FILTER_DAY_START");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), BotstatError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.source.nginx_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.nginx_binary".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.source.discovery_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "source.discovery_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        // 빈 시그니처는 모든 User-Agent에 매칭되므로 허용하지 않음
        for (idx, bot) in self.bots.iter().enumerate() {
            if bot.signature.trim().is_empty() || bot.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("bots[{idx}]"),
                    reason: "signature and name must not be empty".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (pretty, json, compact)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 로그 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 웹 서버 종류 (nginx, apache)
    pub server_type: ServerType,
    /// 접근 로그 경로 (`-`는 표준 입력)
    pub access_log: Option<String>,
    /// 로그 포맷 (프리셋 이름 또는 템플릿 문자열)
    pub log_format: Option<String>,
    /// nginx 설정 파일 경로 (없으면 nginx 바이너리에 질의)
    pub nginx_config: Option<String>,
    /// nginx 바이너리 이름 또는 경로
    pub nginx_binary: String,
    /// `nginx -V` 실행 대기 한도 (초)
    pub discovery_timeout_secs: u64,
    /// 접근 로그가 여러 개일 때 선택 (1부터 시작하는 번호 또는 경로)
    pub access_log_choice: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            server_type: ServerType::Nginx,
            access_log: None,
            log_format: None,
            nginx_config: None,
            nginx_binary: "nginx".to_owned(),
            discovery_timeout_secs: 5,
            access_log_choice: None,
        }
    }
}

/// 날짜 필터 설정
///
/// 둘 다 지정되면 `date_start`가 우선합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 집계 시작 날짜 (예: `2018/03/21`)
    pub date_start: Option<String>,
    /// 오늘로부터 며칠 전부터 집계할지
    pub day_start: Option<u32>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_opt_u32(target: &mut Option<u32>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_server_type(target: &mut ServerType, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<ServerType>() {
            Ok(parsed) => *target = parsed,
            Err(reason) => warn!(
                env_key,
                value = val.as_str(),
                reason = reason.as_str(),
                "failed to parse server type from env var, ignoring"
            ),
        }
    }
}
