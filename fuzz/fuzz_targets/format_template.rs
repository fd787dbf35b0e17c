#![no_main]

use libfuzzer_sys::fuzz_target;

use botstat_core::types::ServerType;
use botstat_log_pipeline::FormatTemplate;

fuzz_target!(|data: &[u8]| {
    let Ok(format) = std::str::from_utf8(data) else {
        return;
    };
    for server in [ServerType::Nginx, ServerType::Apache] {
        let Ok(template) = FormatTemplate::for_server(server, format) else {
            continue;
        };
        // 컴파일된 패턴은 템플릿의 필드 이름을 그대로 캡처해야 함
        if let Ok(matcher) = template.compile() {
            for name in template.field_names() {
                assert!(matcher.has_field(name));
            }
        }
    }
});
