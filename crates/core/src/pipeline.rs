//! 파이프라인 trait -- 모듈 확장 포인트 정의

use crate::error::BotstatError;
use crate::types::AccessRecord;

/// 접근 로그 라인 파서 trait
///
/// 새로운 로그 라인 형식을 지원하려면 이 trait을 구현합니다.
/// 구현체는 한 번 생성된 뒤 모든 라인에 재사용되므로 불변이어야 합니다.
pub trait LineParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 라인 하나를 정규화된 레코드로 파싱
    ///
    /// 라인이 형식과 일치하지 않거나 필수 필드가 비어 있으면 에러를 반환합니다.
    fn parse(&self, line: &str) -> Result<AccessRecord, BotstatError>;

    /// 라인에서 타임스탬프 필드만 추출
    ///
    /// 날짜 기준 탐색처럼 전체 레코드가 필요 없는 경로에서 사용합니다.
    fn timestamp<'a>(&self, line: &'a str) -> Option<&'a str>;
}
