//! botstat 로그 파이프라인
//!
//! 웹 서버 접근 로그를 읽어 검색 봇 트래픽을 날짜/봇/호스트/상태 클래스별로 집계합니다.
//!
//! # 모듈 구성
//!
//! - [`format`]: 로그 포맷 템플릿(nginx `log_format`, Apache `LogFormat`) 해석 및 라인 매처 컴파일
//! - [`record`]: 캡처된 필드를 정규화된 레코드로 변환
//! - [`timestamp`]: 타임스탬프에서 날짜 추출
//! - [`nginx_conf`]: nginx 설정에서 접근 로그/로그 포맷 선언 추출
//! - [`discover`]: `nginx -V`로 설정 파일 위치 탐색
//! - [`source`]: 처리할 입력과 포맷 결정
//! - [`seek`]: 이진 탐색으로 시작 날짜 위치로 이동
//! - [`aggregate`]: 봇 식별 및 집계 테이블
//! - [`pipeline`]: 전체 흐름 오케스트레이션
//! - [`config`]: 파이프라인 설정 (core 설정 해석)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! nginx.conf -> NginxConfig -> (path, template) -> FormatTemplate -> LineMatcher
//!                                                                      |
//! access log -> seek_to_date -> lines ------------------------------> match -> normalize
//!                                                                                 |
//!                                            AggregationTable <- Aggregator <- BotCatalog
//! ```

pub mod aggregate;
pub mod config;
pub mod discover;
pub mod error;
pub mod format;
pub mod nginx_conf;
pub mod pipeline;
pub mod record;
pub mod seek;
pub mod source;
pub mod timestamp;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{AccessLogPipeline, AccessLogPipelineBuilder, IngestStats, PipelineReport};

// 설정
pub use config::{PipelineConfig, StartDate};

// 에러
pub use error::LogPipelineError;

// 포맷
pub use format::{FormatTemplate, LineMatcher, Segment};

// 설정 추출
pub use discover::NginxLocator;
pub use nginx_conf::{AccessLogChoice, NginxConfig, Resolution};
pub use source::{LogInput, LogSource, resolve_source};

// 집계
pub use aggregate::{AggregationTable, Aggregator, BotCatalog, CellStats, RowSummary};
