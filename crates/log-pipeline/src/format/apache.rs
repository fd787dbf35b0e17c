//! Apache `LogFormat` 템플릿 해석
//!
//! `%` 지시자를 필드 이름으로 변환해 nginx와 같은 [`FormatTemplate`] 표현을 만듭니다.
//! 지시자 문법: `%[조건][<|>][{인자}]문자`. 상태 코드 조건(`!200,304`)과
//! `<`/`>` 수식자는 필드 이름에 영향을 주지 않습니다.
//!
//! 헤더 인자(`%{User-Agent}i`)는 소문자로 바꾸고 `-`를 `_`로 치환합니다.

use super::FormatTemplate;
use crate::error::LogPipelineError;

/// Apache 기본 `combined` 포맷
pub const APACHE_COMBINED: &str = r#"%h %l %u %t "%r" %s %b "%{Referer}i" "%{User-agent}i""#;

/// Apache `common` 포맷
pub const APACHE_COMMON: &str = r#"%h %l %u %t "%r" %s %b"#;

/// Apache `vhost_combined` 포맷
pub const APACHE_VHOST_COMBINED: &str =
    r#"%v:%p %h %l %u %t "%r" %>s %O "%{Referer}i" "%{User-Agent}i""#;

/// 프리셋 이름에 해당하는 템플릿 문자열을 반환합니다.
pub fn preset(name: &str) -> Option<&'static str> {
    match name {
        "combined" => Some(APACHE_COMBINED),
        "common" => Some(APACHE_COMMON),
        "vhost_combined" => Some(APACHE_VHOST_COMBINED),
        _ => None,
    }
}

/// 프리셋 이름 또는 `LogFormat` 문자열을 해석합니다.
pub fn parse(format: &str) -> Result<FormatTemplate, LogPipelineError> {
    match preset(format) {
        Some(template) => parse_template(format, template),
        None => parse_template("custom", format),
    }
}

fn parse_template(name: &str, template: &str) -> Result<FormatTemplate, LogPipelineError> {
    let mut result = FormatTemplate::new(name);
    let mut chars = template.char_indices().peekable();
    let mut literal = String::new();

    while let Some((offset, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        if matches!(chars.peek(), Some((_, '%'))) {
            chars.next();
            literal.push('%');
            continue;
        }

        // 조건과 수식자는 건너뜀
        while matches!(
            chars.peek(),
            Some((_, '<' | '>' | '!' | ',' | '0'..='9'))
        ) {
            chars.next();
        }

        let mut argument = None;
        if matches!(chars.peek(), Some((_, '{'))) {
            chars.next();
            let mut arg = String::new();
            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((_, ch)) => arg.push(ch),
                    None => {
                        return Err(LogPipelineError::Format {
                            offset,
                            reason: "unterminated '{' in directive".to_owned(),
                        });
                    }
                }
            }
            argument = Some(arg);
        }

        let Some((_, directive)) = chars.next() else {
            return Err(LogPipelineError::Format {
                offset,
                reason: "directive is missing its format letter".to_owned(),
            });
        };

        if directive == 't' && argument.is_none() {
            literal.push('[');
            result.push_literal(&literal);
            literal.clear();
            result.push_field("time_received");
            literal.push(']');
            continue;
        }

        let field = field_name(directive, argument.as_deref()).ok_or_else(|| {
            LogPipelineError::Format {
                offset,
                reason: format!("unsupported directive '%{directive}'"),
            }
        })?;
        result.push_literal(&literal);
        literal.clear();
        result.push_field(field);
    }
    result.push_literal(&literal);
    Ok(result)
}

fn field_name(directive: char, argument: Option<&str>) -> Option<String> {
    if let Some(arg) = argument {
        let prefix = match directive {
            't' => return Some("time_received".to_owned()),
            'i' => "request_header_",
            'o' => "response_header_",
            'e' => "env_",
            'C' => "cookie_",
            _ => return None,
        };
        return Some(format!("{prefix}{}", normalize_argument(arg)));
    }

    let name = match directive {
        'h' => "remote_host",
        'a' => "remote_ip",
        'A' => "local_ip",
        'l' => "remote_logname",
        'u' => "remote_user",
        'r' => "request_first_line",
        'm' => "request_method",
        'U' => "url_path",
        'q' => "query_string",
        'H' => "protocol",
        's' => "status",
        'b' => "response_bytes_clf",
        'B' => "response_bytes",
        'D' => "time_us",
        'T' => "time_s",
        'v' => "server_name",
        'V' => "server_name_used",
        'p' => "server_port",
        'P' => "pid",
        'I' => "bytes_rx",
        'O' => "bytes_tx",
        'X' => "connection_status",
        'k' => "keepalive",
        'L' => "log_id",
        _ => return None,
    };
    Some(name.to_owned())
}

fn normalize_argument(arg: &str) -> String {
    arg.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
