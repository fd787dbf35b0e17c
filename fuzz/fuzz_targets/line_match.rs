#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use botstat_core::pipeline::LineParser;
use botstat_log_pipeline::FormatTemplate;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 프리셋 선택
    preset: FuzzPreset,
    /// 매칭 대상 라인
    line: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzPreset {
    NginxCombined,
    NginxCommon,
    ApacheCombined,
    ApacheVhost,
}

fuzz_target!(|input: FuzzInput| {
    let template = match input.preset {
        FuzzPreset::NginxCombined => FormatTemplate::nginx("combined"),
        FuzzPreset::NginxCommon => FormatTemplate::nginx("common"),
        FuzzPreset::ApacheCombined => FormatTemplate::apache("combined"),
        FuzzPreset::ApacheVhost => FormatTemplate::apache("vhost_combined"),
    };
    let Ok(matcher) = template.and_then(|t| t.compile()) else {
        return;
    };

    // 매칭, 정규화 모두 크래시 없이 Ok/Err 반환해야 함
    if let Some(fields) = matcher.match_line(&input.line) {
        for name in matcher.field_names() {
            assert!(fields.get(name).is_some());
        }
    }
    let _ = matcher.parse(&input.line);
    let _ = matcher.timestamp(&input.line);
});
