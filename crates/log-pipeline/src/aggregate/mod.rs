//! 봇 트래픽 집계
//!
//! 레코드마다:
//! 1. 타임스탬프에서 날짜를 추출하고 시작 날짜 이전이면 버립니다 (시작 날짜 당일은 포함).
//! 2. [`BotCatalog`]에서 User-Agent에 맞는 첫 번째 봇을 찾고, 없으면 버립니다.
//! 3. (날짜, 봇, 호스트, 상태 클래스) 셀에 요청 수, 바이트, 처리 시간을 더합니다.
//!
//! 호스트 필드가 없는 레코드는 생성 시 지정한 대체 호스트 이름(보통 시스템 호스트명)을 사용합니다.
//! 합계와 개수만 누적하므로 결과는 입력 순서와 무관합니다.

pub mod catalog;
pub mod table;

pub use catalog::BotCatalog;
pub use table::{AggregationTable, CellStats, HostRow, RowKey, RowSummary};

use chrono::NaiveDate;
use tracing::trace;

use botstat_core::types::AccessRecord;

use crate::timestamp::parse_date;

/// 레코드 하나의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// 집계됨
    Counted,
    /// 시작 날짜 이전
    BeforeStart,
    /// 카탈로그에 없는 User-Agent
    NotBot,
    /// 타임스탬프에서 날짜를 찾을 수 없음
    BadTimestamp,
}

/// 레코드를 받아 [`AggregationTable`]에 누적하는 집계기
#[derive(Debug)]
pub struct Aggregator<'c> {
    catalog: &'c BotCatalog,
    start_date: Option<NaiveDate>,
    fallback_host: String,
    table: AggregationTable,
}

impl<'c> Aggregator<'c> {
    pub fn new(
        catalog: &'c BotCatalog,
        start_date: Option<NaiveDate>,
        fallback_host: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            start_date,
            fallback_host: fallback_host.into(),
            table: AggregationTable::new(),
        }
    }

    /// 레코드 하나를 집계합니다.
    pub fn ingest(&mut self, record: &AccessRecord) -> Ingested {
        let Some(date) = parse_date(&record.timestamp) else {
            trace!(timestamp = %record.timestamp, "unparseable timestamp");
            return Ingested::BadTimestamp;
        };
        if self.start_date.is_some_and(|start| date < start) {
            return Ingested::BeforeStart;
        }
        let Some(bot) = self.catalog.identify(&record.user_agent) else {
            return Ingested::NotBot;
        };

        let key = RowKey {
            date,
            bot: bot.to_owned(),
            host: record
                .host
                .clone()
                .unwrap_or_else(|| self.fallback_host.clone()),
        };
        self.table
            .record(key, record.status_class(), record.body_bytes, record.request_time);
        Ingested::Counted
    }

    /// 지금까지의 결과
    pub fn table(&self) -> &AggregationTable {
        &self.table
    }

    /// 집계를 끝내고 결과를 반환합니다.
    pub fn finish(self) -> AggregationTable {
        self.table
    }
}

/// 레코드 시퀀스 전체를 집계합니다.
pub fn aggregate<I>(
    records: I,
    catalog: &BotCatalog,
    start_date: Option<NaiveDate>,
    fallback_host: &str,
) -> AggregationTable
where
    I: IntoIterator<Item = AccessRecord>,
{
    let mut aggregator = Aggregator::new(catalog, start_date, fallback_host);
    for record in records {
        aggregator.ingest(&record);
    }
    aggregator.finish()
}
