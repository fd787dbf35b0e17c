//! nginx `log_format` 템플릿 해석
//!
//! `$name` 형태의 변수(소문자, 숫자, 밑줄)를 필드로, 나머지 텍스트를
//! 리터럴로 취급합니다. `$` 뒤에 변수 이름 문자가 없으면 리터럴 `$`입니다.

use super::FormatTemplate;
use crate::error::LogPipelineError;

/// nginx 기본 `combined` 포맷
pub const NGINX_COMBINED: &str = "$remote_addr - $remote_user [$time_local] \
     \"$request\" $status $body_bytes_sent \
     \"$http_referer\" \"$http_user_agent\"";

/// `common` 프리셋
pub const NGINX_COMMON: &str = "$remote_addr - $remote_user [$time_local] \
     \"$request\" $status $body_bytes_sent \
     \"$http_x_forwarded_for\"";

/// 프리셋 이름에 해당하는 템플릿 문자열을 반환합니다.
pub fn preset(name: &str) -> Option<&'static str> {
    match name {
        "combined" => Some(NGINX_COMBINED),
        "common" => Some(NGINX_COMMON),
        _ => None,
    }
}

/// 프리셋 이름 또는 템플릿 문자열을 해석합니다.
pub fn parse(format: &str) -> Result<FormatTemplate, LogPipelineError> {
    match preset(format) {
        Some(template) => Ok(parse_template(format, template)),
        None => Ok(parse_template("custom", format)),
    }
}

fn is_variable_char(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'
}

fn parse_template(name: &str, template: &str) -> FormatTemplate {
    let mut result = FormatTemplate::new(name);
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let var_start = i + 1;
        let mut var_end = var_start;
        while var_end < bytes.len() && is_variable_char(bytes[var_end]) {
            var_end += 1;
        }
        if var_end == var_start {
            // 변수 이름이 없는 '$'는 리터럴
            i += 1;
            continue;
        }
        result.push_literal(&template[literal_start..i]);
        result.push_field(&template[var_start..var_end]);
        literal_start = var_end;
        i = var_end;
    }
    result.push_literal(&template[literal_start..]);
    result
}
