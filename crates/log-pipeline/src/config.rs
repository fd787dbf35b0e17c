//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`BotstatConfig`]를 파이프라인이 바로 쓸 수 있는
//! 형태로 해석한 결과입니다 (시작 날짜 계산, 접근 로그 선택 파싱, 봇 카탈로그 구성).
//!
//! # 사용 예시
//! ```ignore
//! use botstat_core::config::BotstatConfig;
//! use botstat_log_pipeline::config::PipelineConfig;
//!
//! let core_config = BotstatConfig::default();
//! let today = chrono::Local::now().date_naive();
//! let config = PipelineConfig::from_core(&core_config, today)?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Days, NaiveDate};

use botstat_core::config::BotstatConfig;
use botstat_core::types::{BotEntry, ServerType};

use crate::aggregate::BotCatalog;
use crate::discover::NginxLocator;
use crate::error::LogPipelineError;
use crate::nginx_conf::AccessLogChoice;
use crate::timestamp::parse_date;

/// 집계 시작 날짜
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDate {
    /// 고정 날짜
    Absolute(NaiveDate),
    /// 오늘로부터 며칠 전
    DaysAgo(u32),
}

impl StartDate {
    /// `date_start`가 있으면 그것을, 없으면 `day_start`를 사용합니다.
    pub fn from_filter(
        date_start: Option<&str>,
        day_start: Option<u32>,
    ) -> Result<Option<Self>, LogPipelineError> {
        if let Some(text) = date_start {
            let date =
                parse_date(text).ok_or_else(|| LogPipelineError::InvalidStartDate(text.to_owned()))?;
            return Ok(Some(Self::Absolute(date)));
        }
        Ok(day_start.map(Self::DaysAgo))
    }

    /// 기준일에 대한 실제 날짜
    pub fn on(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Absolute(date) => date,
            Self::DaysAgo(days) => today
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
        }
    }

    /// 필터 설정을 날짜 하나로 해석합니다. 둘 다 없으면 `None`입니다.
    pub fn resolve(
        date_start: Option<&str>,
        day_start: Option<u32>,
        today: NaiveDate,
    ) -> Result<Option<NaiveDate>, LogPipelineError> {
        Ok(Self::from_filter(date_start, day_start)?.map(|start| start.on(today)))
    }
}

/// 로그 파이프라인 설정
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 웹 서버 종류
    pub server_type: ServerType,
    /// 접근 로그 경로 (`-`는 표준 입력)
    pub access_log: Option<String>,
    /// 로그 포맷 (프리셋 이름 또는 템플릿)
    pub log_format: Option<String>,
    /// nginx 설정 파일 경로
    pub nginx_config: Option<PathBuf>,
    /// nginx 바이너리
    pub nginx_binary: String,
    /// `nginx -V` 대기 한도
    pub discovery_timeout: Duration,
    /// 접근 로그가 여러 개일 때의 선택
    pub access_log_choice: Option<AccessLogChoice>,
    /// 집계 시작 날짜 (포함)
    pub start_date: Option<NaiveDate>,
    /// 봇 카탈로그 항목 (비어 있으면 내장 카탈로그)
    pub bots: Vec<BotEntry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_parts(&BotstatConfig::default(), None)
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    ///
    /// `today`는 `day_start` 계산 기준일입니다.
    pub fn from_core(core: &BotstatConfig, today: NaiveDate) -> Result<Self, LogPipelineError> {
        let start_date = StartDate::resolve(
            core.filter.date_start.as_deref(),
            core.filter.day_start,
            today,
        )?;
        Ok(Self::from_parts(core, start_date))
    }

    fn from_parts(core: &BotstatConfig, start_date: Option<NaiveDate>) -> Self {
        let source = &core.source;
        Self {
            server_type: source.server_type,
            access_log: source.access_log.clone(),
            log_format: source.log_format.clone(),
            nginx_config: source.nginx_config.as_ref().map(PathBuf::from),
            nginx_binary: source.nginx_binary.clone(),
            discovery_timeout: Duration::from_secs(source.discovery_timeout_secs),
            access_log_choice: source
                .access_log_choice
                .as_deref()
                .and_then(|choice| choice.parse().ok()),
            start_date,
            bots: core.bots.clone(),
        }
    }

    /// 봇 카탈로그를 구성합니다.
    pub fn catalog(&self) -> BotCatalog {
        BotCatalog::from_entries(&self.bots)
    }

    /// nginx 설정 탐색기를 구성합니다.
    pub fn locator(&self) -> NginxLocator {
        NginxLocator::new(self.nginx_binary.clone(), self.discovery_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn start_date_by_days() {
        let today = date(2018, 3, 23);
        assert_eq!(
            StartDate::resolve(None, Some(2), today).unwrap(),
            Some(date(2018, 3, 21))
        );
    }

    #[test]
    fn start_date_by_date() {
        let today = date(2020, 1, 1);
        assert_eq!(
            StartDate::resolve(Some("2018/03/21"), None, today).unwrap(),
            Some(date(2018, 3, 21))
        );
        assert_eq!(
            StartDate::resolve(Some("21/Mar/2018"), None, today).unwrap(),
            Some(date(2018, 3, 21))
        );
    }

    #[test]
    fn start_date_blank() {
        assert_eq!(StartDate::resolve(None, None, date(2020, 1, 1)).unwrap(), None);
    }

    #[test]
    fn date_start_wins_over_day_start() {
        assert_eq!(
            StartDate::resolve(Some("2018-03-21"), Some(2), date(2020, 1, 1)).unwrap(),
            Some(date(2018, 3, 21))
        );
    }

    #[test]
    fn invalid_date_start_is_error() {
        let err = StartDate::resolve(Some("last week"), None, date(2020, 1, 1)).unwrap_err();
        assert!(matches!(err, LogPipelineError::InvalidStartDate(_)));
    }

    #[test]
    fn days_ago_saturates() {
        assert_eq!(StartDate::DaysAgo(u32::MAX).on(date(2020, 1, 1)), NaiveDate::MIN);
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = BotstatConfig::default();
        core.source.server_type = ServerType::Apache;
        core.source.access_log = Some("/var/log/apache2/access.log".to_owned());
        core.source.log_format = Some("combined".to_owned());
        core.source.access_log_choice = Some("2".to_owned());
        core.source.discovery_timeout_secs = 9;
        core.filter.day_start = Some(1);
        core.bots = vec![BotEntry::new("MyBot", "Mine")];

        let config = PipelineConfig::from_core(&core, date(2018, 6, 26)).unwrap();
        assert_eq!(config.server_type, ServerType::Apache);
        assert_eq!(config.access_log.as_deref(), Some("/var/log/apache2/access.log"));
        assert_eq!(config.access_log_choice, Some(AccessLogChoice::Index(2)));
        assert_eq!(config.discovery_timeout, Duration::from_secs(9));
        assert_eq!(config.start_date, Some(date(2018, 6, 25)));
        assert_eq!(config.catalog().identify("mybot/1.0"), Some("Mine"));
        assert_eq!(config.locator().binary(), "nginx");
    }

    #[test]
    fn default_uses_builtin_catalog() {
        let config = PipelineConfig::default();
        assert_eq!(config.start_date, None);
        assert_eq!(config.catalog().identify("Googlebot"), Some("Google"));
    }
}
