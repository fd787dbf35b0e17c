//! 날짜 기준 로그 탐색
//!
//! 접근 로그는 시간 순서로 추가되므로, 시작 날짜 이전 기록을 선형으로 읽는 대신
//! 바이트 오프셋에 대한 이진 탐색으로 시작 지점을 찾습니다.
//! 각 탐침(probe)은 중간 오프셋에서 다음 완전한 라인으로 재동기화한 뒤
//! 그 라인의 타임스탬프를 비교합니다. 파일 전체를 버퍼링하지 않습니다.
//!
//! 라인의 타임스탬프가 단조 증가한다는 전제가 깨지면 결과는 가장 왼쪽의
//! 조건 충족 라인이라는 보장만 남습니다.

use std::io::{self, BufRead, Seek, SeekFrom};

use chrono::NaiveDate;
use tracing::debug;

use botstat_core::pipeline::LineParser;

use crate::error::LogPipelineError;
use crate::timestamp::parse_date;

/// 탐침으로 읽은 라인
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeLine {
    /// 라인 시작 오프셋
    start: u64,
    /// 줄바꿈을 포함한 바이트 길이
    len: u64,
    /// 줄바꿈을 제거한 내용
    text: String,
}

/// `offset` 이상에서 시작하는 첫 번째 완전한 라인을 반환합니다.
///
/// `offset`이 라인 중간이면 그 라인의 나머지는 버리고 다음 라인을 반환합니다.
/// 줄바꿈으로 끝나는 라인이 더 없으면 `None`입니다.
/// 호출 후 스트림 커서 위치는 정해져 있지 않습니다.
///
/// # Errors
/// 읽기 실패 또는 UTF-8이 아닌 데이터
pub fn nearest_line<R: BufRead + Seek>(reader: &mut R, offset: u64) -> io::Result<Option<String>> {
    Ok(probe(reader, offset, false)?.map(|line| line.text))
}

/// `with_tail`이면 줄바꿈 없이 스트림 끝에서 끝나는 마지막 라인도 반환합니다.
fn probe<R: BufRead + Seek>(
    reader: &mut R,
    offset: u64,
    with_tail: bool,
) -> io::Result<Option<ProbeLine>> {
    let mut buf = Vec::new();

    let start = if offset == 0 {
        reader.seek(SeekFrom::Start(0))?;
        0
    } else {
        // 직전 바이트부터 읽어야 offset이 정확히 라인 시작인 경우를 놓치지 않음
        reader.seek(SeekFrom::Start(offset - 1))?;
        let skipped = reader.read_until(b'\n', &mut buf)?;
        if buf.last() != Some(&b'\n') {
            return Ok(None);
        }
        buf.clear();
        offset - 1 + skipped as u64
    };

    let len = reader.read_until(b'\n', &mut buf)?;
    let terminated = buf.last() == Some(&b'\n');
    if len == 0 || !(terminated || with_tail) {
        return Ok(None);
    }

    let mut text =
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    trim_line_end(&mut text);

    Ok(Some(ProbeLine {
        start,
        len: len as u64,
        text,
    }))
}

/// 라인 끝의 `\n` 또는 `\r\n`을 제거합니다.
pub(crate) fn trim_line_end(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

/// 스트림 커서를 `target` 날짜 이상인 첫 라인의 시작으로 옮깁니다.
///
/// - 모든 라인이 `target` 이후면 오프셋 0
/// - 모든 라인이 `target` 이전이면 스트림 끝 (이후 읽기는 데이터 없음)
/// - 빈 스트림이면 0에 머무름
///
/// 탐침 라인의 타임스탬프를 읽을 수 없으면 `hi` 전까지 이어지는 라인 중
/// 날짜가 있는 첫 라인으로 비교하고, 그런 라인이 없으면 상한을 탐침 라인
/// 시작으로 내립니다. 날짜 없는 라인은 앞쪽의 조건 충족 라인을 가리지 않으며,
/// `target` 바로 앞의 날짜 없는 라인은 결과 위치에 포함될 수 있습니다.
/// 줄바꿈 없이 끝나는 마지막 라인도 비교 대상입니다.
/// 최종 위치를 반환합니다.
///
/// # Errors
/// 읽기 실패 또는 UTF-8이 아닌 데이터
pub fn seek_to_date<R: BufRead + Seek>(
    reader: &mut R,
    target: NaiveDate,
    parser: &dyn LineParser,
) -> Result<u64, LogPipelineError> {
    let len = reader.seek(SeekFrom::End(0))?;
    // lo는 항상 라인 경계(0 또는 완전한 라인 바로 뒤)
    let mut lo = 0;
    let mut hi = len;
    let mut probes = 0u32;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        probes += 1;
        match probe(reader, mid, true)? {
            None => hi = mid,
            Some(line) if line.start >= hi => hi = mid,
            Some(line) => {
                let start = line.start;
                match next_dated_line(reader, line, hi, parser)? {
                    Some((line, date)) if date >= target => hi = line.start,
                    Some((line, _)) => lo = line.start + line.len,
                    // start..hi 구간에 날짜 있는 라인이 없음
                    None => hi = start,
                }
            }
        }
    }

    reader.seek(SeekFrom::Start(lo))?;
    debug!(%target, offset = lo, length = len, probes, "seeked to start date");
    Ok(lo)
}

/// `line`부터 `hi` 전까지 읽어 날짜를 추출할 수 있는 첫 라인을 찾습니다.
fn next_dated_line<R: BufRead + Seek>(
    reader: &mut R,
    mut line: ProbeLine,
    hi: u64,
    parser: &dyn LineParser,
) -> io::Result<Option<(ProbeLine, NaiveDate)>> {
    loop {
        if let Some(date) = parser.timestamp(&line.text).and_then(parse_date) {
            return Ok(Some((line, date)));
        }
        let next = line.start + line.len;
        if next >= hi {
            return Ok(None);
        }
        match probe(reader, next, true)? {
            Some(following) if following.start < hi => line = following,
            _ => return Ok(None),
        }
    }
}
