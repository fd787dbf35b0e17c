//! 통합 테스트 -- 파이프라인 전체 흐름 검증
//!
//! nginx 설정 해석부터 포맷 컴파일, 날짜 탐색, 집계까지의 전체 흐름과
//! 집계의 순서 무관성 같은 성질을 검증합니다.

use std::io::{Cursor, Write};

use chrono::NaiveDate;
use proptest::prelude::*;

use botstat_core::types::{AccessRecord, StatusClass};
use botstat_log_pipeline::aggregate::aggregate;
use botstat_log_pipeline::source::resolve_source;
use botstat_log_pipeline::{
    AccessLogPipelineBuilder, BotCatalog, CellStats, FormatTemplate, LogInput, NginxConfig,
    PipelineConfig, Resolution,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 6, d).unwrap()
}

/// 네 날짜에 걸친 일곱 줄: Googlebot, Bingbot, 일반 사용자
const SEVEN_LINES: &str = concat!(
    "example.com [25/Jun/2018:10:00:00 +0000] 200 100 0.5 \"Mozilla/5.0 (compatible; Googlebot/2.1)\"\n",
    "example.com [25/Jun/2018:11:00:00 +0000] 200 300 1.5 \"Mozilla/5.0 (compatible; Googlebot/2.1)\"\n",
    "example.com [26/Jun/2018:10:00:00 +0000] 404 50 0.25 \"Mozilla/5.0 (compatible; bingbot/2.0)\"\n",
    "example.com [26/Jun/2018:12:00:00 +0000] 200 999 9.0 \"Mozilla/5.0 (X11; Linux x86_64) Firefox/60.0\"\n",
    "other.org [27/Jun/2018:10:00:00 +0000] 503 - 2.0 \"Mozilla/5.0 (compatible; Googlebot/2.1)\"\n",
    "other.org [27/Jun/2018:10:30:00 +0000] 301 0 0.75 \"Mozilla/5.0 (compatible; bingbot/2.0)\"\n",
    "example.com [28/Jun/2018:10:00:00 +0000] 200 700 3.0 \"Mozilla/5.0 (compatible; Googlebot/2.1)\"\n",
);

const SEVEN_FORMAT: &str =
    "$host [$time_local] $status $body_bytes_sent $request_time \"$http_user_agent\"";

fn cell(count: u64, bytes: u64, time: f64) -> CellStats {
    CellStats {
        count,
        bytes: Some(bytes),
        time: Some(time),
    }
}

#[test]
fn test_seven_records_four_dates() {
    let pipeline = AccessLogPipelineBuilder::new(FormatTemplate::nginx(SEVEN_FORMAT).unwrap())
        .build()
        .unwrap();
    let report = pipeline.run_reader(Cursor::new(SEVEN_LINES)).unwrap();
    let table = &report.table;

    assert_eq!(table.dates(), vec![day(25), day(26), day(27), day(28)]);
    assert_eq!(report.stats.not_bot, 1);
    assert_eq!(report.stats.counted, 6);

    assert_eq!(
        table.get(day(25), "Google", "example.com", StatusClass::SUCCESS),
        Some(&cell(2, 400, 2.0))
    );
    assert_eq!(
        table.get(day(26), "Bing", "example.com", StatusClass::CLIENT_ERROR),
        Some(&cell(1, 50, 0.25))
    );
    // 일반 사용자의 26일 200 요청은 집계되지 않음
    assert_eq!(
        table.get(day(26), "Google", "example.com", StatusClass::SUCCESS),
        None
    );
    assert_eq!(
        table.get(day(27), "Google", "other.org", StatusClass::SERVER_ERROR),
        Some(&cell(1, 0, 2.0))
    );
    assert_eq!(
        table.get(day(27), "Bing", "other.org", StatusClass::REDIRECTION),
        Some(&cell(1, 0, 0.75))
    );
    assert_eq!(
        table.get(day(28), "Google", "example.com", StatusClass::SUCCESS),
        Some(&cell(1, 700, 3.0))
    );
    assert_eq!(table.len(), 5);

    let rows = table.summaries();
    assert_eq!(rows[0].date, "2018/06/25");
    assert_eq!(rows[0].hits_2xx, 2);
    assert_eq!(rows[0].avg_time_ms, 1000);
    assert_eq!(rows[0].avg_bytes_2xx, 200.0);
}

#[test]
fn test_combined_preset_capture_names() {
    let matcher = FormatTemplate::nginx("combined").unwrap().compile().unwrap();
    let mut names: Vec<_> = matcher.field_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "body_bytes_sent",
            "http_referer",
            "http_user_agent",
            "remote_addr",
            "remote_user",
            "request",
            "status",
            "time_local",
        ]
    );
}

#[test]
fn test_nginx_config_to_pipeline() {
    let mut log = tempfile::NamedTempFile::new().unwrap();
    for (d, agent) in [(24, "Googlebot"), (25, "Googlebot"), (26, "YandexBot"), (27, "Googlebot")] {
        writeln!(
            log,
            "1.2.3.4 - - [{d}/Jun/2018:00:00:00 +0000] \"GET / HTTP/1.1\" 200 10 \"-\" \"{agent}\" 0.100"
        )
        .unwrap();
    }

    let config_text = format!(
        r#"
http {{
    log_format timed '$remote_addr - $remote_user [$time_local] "$request" '
                     '$status $body_bytes_sent "$http_referer" "$http_user_agent" $request_time';
    server {{
        access_log {} timed;
    }}
}}
"#,
        log.path().display()
    );

    let nginx = NginxConfig::parse("nginx.conf", &config_text);
    let Resolution::Resolved(resolved) = nginx.resolve(None).unwrap() else {
        panic!("expected a single access log");
    };
    assert_eq!(resolved.format_name, "timed");

    let pipeline = AccessLogPipelineBuilder::new(FormatTemplate::nginx(&resolved.template).unwrap())
        .start_date(Some(day(25)))
        .fallback_host("web01")
        .build()
        .unwrap();
    let report = pipeline.run_path(std::path::Path::new(&resolved.path)).unwrap();

    assert!(report.start_offset.unwrap() > 0);
    assert_eq!(report.table.dates(), vec![day(25), day(26), day(27)]);
    let yandex = report
        .table
        .get(day(26), "Yandex", "web01", StatusClass::SUCCESS)
        .unwrap();
    assert_eq!(yandex.count, 1);
    assert!((yandex.time.unwrap() - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_resolve_source_then_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("access.log");
    std::fs::write(
        &log,
        "10.0.0.1 - - [26/Jun/2018:01:02:03 +0200] \"GET / HTTP/1.1\" 200 1234 \"-\" \"Mozilla/5.0 (compatible; bingbot/2.0)\"\n",
    )
    .unwrap();

    let config = PipelineConfig {
        server_type: botstat_core::types::ServerType::Apache,
        access_log: Some(log.display().to_string()),
        log_format: Some("combined".to_owned()),
        ..PipelineConfig::default()
    };
    let source = resolve_source(&config, false).await.unwrap();
    assert_eq!(source.input, LogInput::File(log));

    let pipeline = AccessLogPipelineBuilder::new(source.format)
        .config(&config)
        .build()
        .unwrap();
    let report = pipeline.run_input(&source.input).unwrap();
    let bing = report
        .table
        .get(day(26), "Bing", "localhost", StatusClass::SUCCESS)
        .unwrap();
    assert_eq!(bing.bytes, Some(1234));
}

#[test]
fn test_apache_vhost_and_microseconds() {
    let format = FormatTemplate::apache(r#"%v %h %t "%r" %>s %B %D "%{User-Agent}i""#).unwrap();
    let pipeline = AccessLogPipelineBuilder::new(format).build().unwrap();
    let line = "shop.example 1.2.3.4 [27/Jun/2018:10:00:00 +0000] \"GET / HTTP/1.1\" 200 2048 250000 \"DuckDuckBot/1.0\"\n";
    let report = pipeline.run_reader(Cursor::new(line)).unwrap();

    let cell = report
        .table
        .get(day(27), "DuckDuckGo", "shop.example", StatusClass::SUCCESS)
        .unwrap();
    assert_eq!(cell.bytes, Some(2048));
    assert!((cell.time.unwrap() - 0.25).abs() < 1e-9);
}

fn record_strategy() -> impl Strategy<Value = AccessRecord> {
    (
        1u32..=4,
        prop::sample::select(vec!["Googlebot", "bingbot", "Slurp", "curl/7.0"]),
        prop::option::of(100u16..600),
        prop::option::of(0u64..10_000),
        prop::option::of(0u32..5_000),
        prop::sample::select(vec!["a.example", "b.example"]),
    )
        .prop_map(|(d, agent, status, bytes, millis, host)| {
            let mut record = AccessRecord::new(format!("{d:02}/Jun/2018:12:00:00"), agent).with_host(host);
            if let Some(status) = status {
                record = record.with_status(status);
            }
            if let Some(bytes) = bytes {
                record = record.with_body_bytes(bytes);
            }
            if let Some(millis) = millis {
                // 밀리초 단위 정수값이라 합산 순서와 무관하게 같은 결과
                record = record.with_request_time(f64::from(millis) / 1024.0);
            }
            record
        })
}

proptest! {
    #[test]
    fn prop_aggregation_is_order_independent(
        (records, shuffled) in prop::collection::vec(record_strategy(), 0..60)
            .prop_flat_map(|records| {
                let shuffled = Just(records.clone()).prop_shuffle();
                (Just(records), shuffled)
            })
    ) {
        let catalog = BotCatalog::builtin();
        let forward = aggregate(records, &catalog, None, "h");
        let permuted = aggregate(shuffled, &catalog, None, "h");
        prop_assert_eq!(forward, permuted);
    }

    #[test]
    fn prop_status_class_is_hundreds(code in 0u16..1000) {
        let class = StatusClass::from_status(code);
        prop_assert_eq!(class.code(), code / 100 * 100);
        prop_assert_eq!(StatusClass::from_status(class.code()), class);
    }

    #[test]
    fn prop_cells_sum_routed_records(records in prop::collection::vec(record_strategy(), 1..60)) {
        let catalog = BotCatalog::builtin();
        let table = aggregate(records.clone(), &catalog, None, "h");
        let mut total = 0;
        for (_, row) in table.rows() {
            for (_, cell) in row.cells() {
                prop_assert!(cell.count >= 1);
                total += cell.count;
            }
        }
        let bots = records
            .iter()
            .filter(|r| catalog.identify(&r.user_agent).is_some())
            .count() as u64;
        prop_assert_eq!(total, bots);
    }
}
