//! 파이프라인 오케스트레이션 -- 읽기/매칭/정규화/집계의 전체 흐름을 관리합니다.
//!
//! # 처리 흐름
//! ```text
//! file --seek_to_date--> lines -> LineMatcher -> normalize -> Aggregator -> AggregationTable
//! stdin ----------------/
//! ```
//!
//! 한 번의 실행은 단일 스레드에서 입력 끝까지 한 번 읽고 끝납니다.
//! 포맷과 맞지 않는 라인은 건너뛰고 개수만 셉니다.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{AggregationTable, Aggregator, BotCatalog, Ingested};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::format::{FormatTemplate, LineMatcher};
use crate::record;
use crate::seek::seek_to_date;
use crate::source::LogInput;

/// 실행 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// 읽은 라인 수
    pub lines: u64,
    /// 포맷과 맞지 않아 건너뛴 라인 수
    pub unmatched: u64,
    /// 시작 날짜 이전 레코드 수
    pub before_start: u64,
    /// 봇이 아닌 레코드 수
    pub not_bot: u64,
    /// 날짜를 알 수 없는 레코드 수
    pub bad_timestamp: u64,
    /// 집계된 레코드 수
    pub counted: u64,
}

/// 실행 결과
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub table: AggregationTable,
    pub stats: IngestStats,
    /// 날짜 탐색으로 건너뛴 위치 (탐색한 경우)
    pub start_offset: Option<u64>,
}

/// 접근 로그 파이프라인
///
/// 실행마다 컴파일된 매처 하나와 봇 카탈로그를 재사용합니다.
///
/// # 사용 예시
/// ```ignore
/// use botstat_log_pipeline::{AccessLogPipelineBuilder, FormatTemplate};
///
/// let pipeline = AccessLogPipelineBuilder::new(FormatTemplate::nginx("combined")?)
///     .start_date(Some(start))
///     .fallback_host("web01")
///     .build()?;
/// let report = pipeline.run_path(Path::new("/var/log/nginx/access.log"))?;
/// ```
#[derive(Debug)]
pub struct AccessLogPipeline {
    matcher: LineMatcher,
    catalog: BotCatalog,
    start_date: Option<NaiveDate>,
    fallback_host: String,
}

impl AccessLogPipeline {
    pub fn matcher(&self) -> &LineMatcher {
        &self.matcher
    }

    pub fn catalog(&self) -> &BotCatalog {
        &self.catalog
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// 입력 종류에 맞게 실행합니다. 표준 입력은 날짜 탐색 없이 읽습니다.
    pub fn run_input(&self, input: &LogInput) -> Result<PipelineReport, LogPipelineError> {
        match input {
            LogInput::Stdin => self.run_reader(io::stdin().lock()),
            LogInput::File(path) => self.run_path(path),
        }
    }

    /// 파일을 읽습니다. 시작 날짜가 있으면 먼저 날짜 탐색으로 건너뜁니다.
    pub fn run_path(&self, path: &Path) -> Result<PipelineReport, LogPipelineError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                LogPipelineError::AccessLogNotFound(path.display().to_string())
            } else {
                LogPipelineError::Io(e)
            }
        })?;
        let mut reader = BufReader::new(file);

        let start_offset = match self.start_date {
            Some(start) => Some(seek_to_date(&mut reader, start, &self.matcher)?),
            None => None,
        };

        let mut report = self.run_reader(reader)?;
        report.start_offset = start_offset;
        Ok(report)
    }

    /// 리더의 현재 위치부터 끝까지 읽습니다.
    ///
    /// # Errors
    /// 읽기 실패 또는 UTF-8이 아닌 데이터
    pub fn run_reader<R: BufRead>(&self, reader: R) -> Result<PipelineReport, LogPipelineError> {
        let mut aggregator = Aggregator::new(&self.catalog, self.start_date, &*self.fallback_host);
        let mut stats = IngestStats::default();

        for line in reader.lines() {
            let line = line?;
            stats.lines += 1;

            let Some(fields) = self.matcher.match_line(&line) else {
                stats.unmatched += 1;
                debug!(line_no = stats.lines, "line does not match log format, skipped");
                continue;
            };
            let record = match record::normalize(&fields) {
                Ok(record) => record,
                Err(e) => {
                    stats.unmatched += 1;
                    debug!(line_no = stats.lines, error = %e, "record skipped");
                    continue;
                }
            };

            match aggregator.ingest(&record) {
                Ingested::Counted => stats.counted += 1,
                Ingested::BeforeStart => stats.before_start += 1,
                Ingested::NotBot => stats.not_bot += 1,
                Ingested::BadTimestamp => stats.bad_timestamp += 1,
            }
        }

        let table = aggregator.finish();
        info!(
            lines = stats.lines,
            unmatched = stats.unmatched,
            counted = stats.counted,
            not_bot = stats.not_bot,
            before_start = stats.before_start,
            bad_timestamp = stats.bad_timestamp,
            rows = table.len(),
            "access log processed"
        );

        Ok(PipelineReport {
            table,
            stats,
            start_offset: None,
        })
    }
}

/// 접근 로그 파이프라인 빌더
pub struct AccessLogPipelineBuilder {
    format: FormatTemplate,
    catalog: BotCatalog,
    start_date: Option<NaiveDate>,
    fallback_host: String,
}

impl AccessLogPipelineBuilder {
    /// 로그 포맷으로 새 빌더를 생성합니다.
    pub fn new(format: FormatTemplate) -> Self {
        Self {
            format,
            catalog: BotCatalog::builtin(),
            start_date: None,
            fallback_host: "localhost".to_owned(),
        }
    }

    /// 파이프라인 설정의 카탈로그와 시작 날짜를 적용합니다.
    pub fn config(mut self, config: &PipelineConfig) -> Self {
        self.catalog = config.catalog();
        self.start_date = config.start_date;
        self
    }

    pub fn catalog(mut self, catalog: BotCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// 집계 시작 날짜 (포함)
    pub fn start_date(mut self, start_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self
    }

    /// 호스트 필드가 없는 레코드에 사용할 호스트 이름
    pub fn fallback_host(mut self, host: impl Into<String>) -> Self {
        self.fallback_host = host.into();
        self
    }

    /// 포맷을 컴파일하고 필수 필드를 검증합니다.
    ///
    /// 라인을 하나도 읽기 전에 실패합니다.
    pub fn build(self) -> Result<AccessLogPipeline, LogPipelineError> {
        let matcher = self.format.compile()?;
        matcher.ensure_record_fields()?;
        info!(format = %matcher.format_name(), "log format compiled");

        Ok(AccessLogPipeline {
            matcher,
            catalog: self.catalog,
            start_date: self.start_date,
            fallback_host: self.fallback_host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botstat_core::types::StatusClass;
    use std::io::{Cursor, Write};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 6, d).unwrap()
    }

    fn combined() -> FormatTemplate {
        FormatTemplate::nginx("combined").unwrap()
    }

    const LOG: &str = concat!(
        "66.249.66.1 - - [25/Jun/2018:14:06:24 +0000] \"GET / HTTP/1.1\" 200 100 \"-\" \"Googlebot/2.1\"\n",
        "157.55.39.1 - - [25/Jun/2018:14:07:00 +0000] \"GET / HTTP/1.1\" 301 - \"-\" \"bingbot/2.0\"\n",
        "this line is garbage\n",
        "10.0.0.1 - - [26/Jun/2018:09:00:00 +0000] \"GET / HTTP/1.1\" 200 512 \"-\" \"curl/7.58\"\n",
        "66.249.66.1 - - [26/Jun/2018:09:00:01 +0000] \"GET /a HTTP/1.1\" 404 20 \"-\" \"Googlebot/2.1\"\r\n",
        "66.249.66.1 - - [27/Jun/2018:10:00:00 +0000] \"GET /b HTTP/1.1\" 200 30 \"-\" \"Googlebot/2.1\"\n",
    );

    #[test]
    fn build_rejects_format_without_required_fields() {
        let err = AccessLogPipelineBuilder::new(FormatTemplate::nginx("common").unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, LogPipelineError::MissingField(ref f) if f == "http_user_agent"));
    }

    #[test]
    fn build_rejects_adjacent_fields() {
        let err = AccessLogPipelineBuilder::new(FormatTemplate::nginx("$status$time_local").unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, LogPipelineError::AdjacentFields { .. }));
    }

    #[test]
    fn run_reader_counts_and_skips() {
        let pipeline = AccessLogPipelineBuilder::new(combined())
            .fallback_host("web01")
            .build()
            .unwrap();
        let report = pipeline.run_reader(Cursor::new(LOG)).unwrap();

        assert_eq!(
            report.stats,
            IngestStats {
                lines: 6,
                unmatched: 1,
                before_start: 0,
                not_bot: 1,
                bad_timestamp: 0,
                counted: 4,
            }
        );
        let table = &report.table;
        assert_eq!(table.dates(), vec![day(25), day(26), day(27)]);
        let bing = table.get(day(25), "Bing", "web01", StatusClass::REDIRECTION).unwrap();
        assert_eq!(bing.bytes, Some(0));
        assert_eq!(bing.time, None);
        let not_found = table.get(day(26), "Google", "web01", StatusClass::CLIENT_ERROR).unwrap();
        assert_eq!(not_found.bytes, Some(20));
    }

    #[test]
    fn run_reader_applies_start_date_without_seeking() {
        let pipeline = AccessLogPipelineBuilder::new(combined())
            .start_date(Some(day(26)))
            .build()
            .unwrap();
        let report = pipeline.run_reader(Cursor::new(LOG)).unwrap();
        assert_eq!(report.stats.before_start, 2);
        assert_eq!(report.stats.counted, 2);
        assert_eq!(report.start_offset, None);
    }

    #[test]
    fn run_path_seeks_to_start_date() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LOG.as_bytes()).unwrap();

        let pipeline = AccessLogPipelineBuilder::new(combined())
            .start_date(Some(day(26)))
            .build()
            .unwrap();
        let report = pipeline.run_path(file.path()).unwrap();

        assert!(report.start_offset.unwrap() > 0);
        // 탐색으로 25일 라인은 읽지도 않음
        assert_eq!(report.stats.before_start, 0);
        assert_eq!(report.stats.counted, 2);
        assert_eq!(report.table.dates(), vec![day(26), day(27)]);
    }

    #[test]
    fn run_path_with_corrupt_lines_matches_streaming_table() {
        let log = concat!(
            "66.249.66.1 - - [25/Jun/2018:14:06:24 +0000] \"GET / HTTP/1.1\" 200 100 \"-\" \"Googlebot/2.1\"\n",
            "66.249.66.1 - - [26/Jun/2018:08:00:00 +0000] \"GET /a HTTP/1.1\" 200 10 \"-\" \"Googlebot/2.1\"\n",
            "corrupt\n",
            "66.249.66.1 - - [26/Jun/2018:09:00:00 +0000] \"GET /b HTTP/1.1\" 200 20 \"-\" \"Googlebot/2.1\"\n",
            "66.249.66.1 - - [27/Jun/2018:10:00:00 +0000] \"GET /c HTTP/1.1\" 200 30 \"-\" \"Googlebot/2.1\"\n",
        );
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(log.as_bytes()).unwrap();

        let pipeline = AccessLogPipelineBuilder::new(combined())
            .start_date(Some(day(26)))
            .fallback_host("web01")
            .build()
            .unwrap();
        let seeked = pipeline.run_path(file.path()).unwrap();
        let streamed = pipeline.run_reader(Cursor::new(log)).unwrap();

        assert_eq!(seeked.table, streamed.table);
        let cell = seeked
            .table
            .get(day(26), "Google", "web01", StatusClass::SUCCESS)
            .unwrap();
        assert_eq!(cell.count, 2);
        assert_eq!(cell.bytes, Some(30));
    }

    #[test]
    fn run_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = AccessLogPipelineBuilder::new(combined()).build().unwrap();
        let err = pipeline.run_path(&dir.path().join("missing.log")).unwrap_err();
        assert!(matches!(err, LogPipelineError::AccessLogNotFound(_)));
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let pipeline = AccessLogPipelineBuilder::new(combined()).build().unwrap();
        let err = pipeline
            .run_reader(Cursor::new(b"\xff\xfe\n".to_vec()))
            .unwrap_err();
        assert!(matches!(err, LogPipelineError::Io(_)));
    }

    #[test]
    fn config_applies_catalog_and_start_date() {
        let config = PipelineConfig {
            start_date: Some(day(27)),
            bots: vec![botstat_core::types::BotEntry::new("curl", "Curl")],
            ..PipelineConfig::default()
        };
        let pipeline = AccessLogPipelineBuilder::new(combined())
            .config(&config)
            .build()
            .unwrap();
        assert_eq!(pipeline.start_date(), Some(day(27)));
        assert_eq!(pipeline.catalog().identify("curl/7.58"), Some("Curl"));
    }
}
