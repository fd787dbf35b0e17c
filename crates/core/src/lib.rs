//! botstat 공통 크레이트
//!
//! 로그 파이프라인과 CLI가 공유하는 에러, 설정, 도메인 타입, trait을 정의합니다.
//!
//! # 모듈 구성
//!
//! - [`config`]: `botstat.toml` 로딩, 환경변수 오버라이드, 유효성 검증
//! - [`error`]: 도메인별 에러 타입
//! - [`pipeline`]: 라인 파서 확장 포인트
//! - [`types`]: 접근 로그 레코드, 상태 코드 클래스, 봇 카탈로그 항목

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{BotstatError, ConfigError, ParseError, PipelineError};

// 설정
pub use config::BotstatConfig;

// 파이프라인 trait
pub use pipeline::LineParser;

// 도메인 타입
pub use types::{AccessRecord, BotEntry, ServerType, StatusClass};
