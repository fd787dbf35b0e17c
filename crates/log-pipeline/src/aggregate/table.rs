//! 집계 테이블 -- (날짜, 봇, 호스트, 상태 클래스)별 카운터

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use botstat_core::types::StatusClass;

/// 한 셀의 카운터
///
/// 바이트와 처리 시간은 해당 필드가 한 번이라도 기록되었을 때만 `Some`입니다.
/// 필드가 없는 포맷의 합계 0과 실제 합계 0을 구분하기 위함입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CellStats {
    /// 요청 수
    pub count: u64,
    /// 응답 바이트 합계
    pub bytes: Option<u64>,
    /// 처리 시간 합계 (초)
    pub time: Option<f64>,
}

impl CellStats {
    fn add(&mut self, bytes: Option<u64>, time: Option<f64>) {
        self.count += 1;
        if let Some(bytes) = bytes {
            self.bytes = Some(self.bytes.unwrap_or(0).saturating_add(bytes));
        }
        if let Some(time) = time {
            self.time = Some(self.time.unwrap_or(0.0) + time);
        }
    }

    pub fn bytes_or_zero(&self) -> u64 {
        self.bytes.unwrap_or(0)
    }

    pub fn time_or_zero(&self) -> f64 {
        self.time.unwrap_or(0.0)
    }
}

/// 테이블 행 키. 정렬 순서가 리포트 행 순서입니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    pub date: NaiveDate,
    pub bot: String,
    pub host: String,
}

/// 한 행(날짜, 봇, 호스트)의 상태 클래스별 셀
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostRow {
    classes: BTreeMap<StatusClass, CellStats>,
}

impl HostRow {
    pub fn cell(&self, class: StatusClass) -> Option<&CellStats> {
        self.classes.get(&class)
    }

    /// 기록된 상태 클래스와 셀 (클래스 오름차순)
    pub fn cells(&self) -> impl Iterator<Item = (StatusClass, &CellStats)> {
        self.classes.iter().map(|(class, cell)| (*class, cell))
    }

    fn count(&self, class: StatusClass) -> u64 {
        self.cell(class).map_or(0, |c| c.count)
    }

    fn time(&self, class: StatusClass) -> f64 {
        self.cell(class).map_or(0.0, CellStats::time_or_zero)
    }

    fn bytes(&self, class: StatusClass) -> u64 {
        self.cell(class).map_or(0, CellStats::bytes_or_zero)
    }

    /// 리포트 컬럼을 계산합니다.
    ///
    /// 평균의 분모가 0이면 1로 대체합니다.
    pub fn summary(&self, key: &RowKey) -> RowSummary {
        let hits_total: u64 = self.classes.values().map(|c| c.count).sum();
        let total_time: f64 = self.classes.values().map(CellStats::time_or_zero).sum();
        let bytes_total: u64 = self.classes.values().map(CellStats::bytes_or_zero).sum();

        let hits_2xx = self.count(StatusClass::SUCCESS);
        let total_time_2xx = self.time(StatusClass::SUCCESS);
        let bytes_2xx = self.bytes(StatusClass::SUCCESS);

        RowSummary {
            date: key.date.format("%Y/%m/%d").to_string(),
            bot: key.bot.clone(),
            host: key.host.clone(),
            hits_2xx,
            hits_3xx: self.count(StatusClass::REDIRECTION),
            hits_4xx: self.count(StatusClass::CLIENT_ERROR),
            hits_5xx: self.count(StatusClass::SERVER_ERROR),
            hits_total,
            avg_time_ms: millis_per_hit(total_time, hits_total),
            avg_time_2xx_ms: millis_per_hit(total_time_2xx, hits_2xx),
            total_time,
            total_time_2xx,
            total_time_5xx: self.time(StatusClass::SERVER_ERROR),
            bytes_total,
            avg_bytes: bytes_total as f64 / self.classes.len().max(1) as f64,
            avg_bytes_2xx: bytes_2xx as f64 / hits_2xx.max(1) as f64,
        }
    }
}

fn millis_per_hit(seconds: f64, hits: u64) -> u64 {
    (1000.0 * seconds / hits.max(1) as f64) as u64
}

/// 리포트 한 행
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    /// `YYYY/MM/DD`
    pub date: String,
    pub bot: String,
    pub host: String,
    pub hits_2xx: u64,
    pub hits_3xx: u64,
    pub hits_4xx: u64,
    pub hits_5xx: u64,
    /// 분류되지 않은 요청을 포함한 전체 요청 수
    pub hits_total: u64,
    pub avg_time_ms: u64,
    pub avg_time_2xx_ms: u64,
    /// 초
    pub total_time: f64,
    pub total_time_2xx: f64,
    pub total_time_5xx: f64,
    pub bytes_total: u64,
    /// 전체 바이트 / 상태 클래스 수
    pub avg_bytes: f64,
    /// 2xx 바이트 / 2xx 요청 수
    pub avg_bytes_2xx: f64,
}

/// 집계 결과
///
/// 행은 날짜, 봇 이름, 호스트 순으로 정렬되어 순회됩니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationTable {
    rows: BTreeMap<RowKey, HostRow>,
}

impl AggregationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 요청 하나를 셀에 더합니다.
    pub fn record(&mut self, key: RowKey, class: StatusClass, bytes: Option<u64>, time: Option<f64>) {
        self.rows
            .entry(key)
            .or_default()
            .classes
            .entry(class)
            .or_default()
            .add(bytes, time);
    }

    pub fn get(&self, date: NaiveDate, bot: &str, host: &str, class: StatusClass) -> Option<&CellStats> {
        let key = RowKey {
            date,
            bot: bot.to_owned(),
            host: host.to_owned(),
        };
        self.rows.get(&key)?.cell(class)
    }

    /// 정렬된 행
    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &HostRow)> {
        self.rows.iter()
    }

    /// 리포트 행 목록
    pub fn summaries(&self) -> Vec<RowSummary> {
        self.rows.iter().map(|(key, row)| row.summary(key)).collect()
    }

    /// 기록된 날짜 (오름차순, 중복 없음)
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = self.rows.keys().map(|k| k.date).collect();
        dates.dedup();
        dates
    }

    /// 행 수
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
