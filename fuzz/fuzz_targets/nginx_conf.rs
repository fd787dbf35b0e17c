#![no_main]

use libfuzzer_sys::fuzz_target;

use botstat_log_pipeline::nginx_conf::{AccessLogChoice, Resolution};
use botstat_log_pipeline::NginxConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let config = NginxConfig::parse("fuzz.conf", text);

    // 중복 경로는 한 번만 보고되어야 함
    let logs = config.access_logs();
    for (i, a) in logs.iter().enumerate() {
        assert!(logs[i + 1..].iter().all(|b| b.path != a.path));
    }

    match config.resolve(None) {
        Ok(Resolution::Ambiguous(candidates)) => {
            assert!(candidates.len() > 1);
            let _ = config.resolve(Some(&AccessLogChoice::Index(candidates.len())));
        }
        Ok(Resolution::Resolved(_)) => assert_eq!(logs.len(), 1),
        Err(_) => {}
    }
});
