//! nginx 설정 파일에서 접근 로그 선언과 로그 포맷 정의 추출
//!
//! 설정 텍스트를 토큰(단어, 따옴표 문자열, `{`, `}`, `;`)으로 나눈 뒤
//! `;`로 끝나는 문장을 지시자로 해석합니다. 블록 중첩은 추적하지 않으며,
//! 어느 블록에 있든 `access_log`와 `log_format` 지시자를 모두 수집합니다.
//!
//! `#`부터 줄 끝까지는 주석입니다 (따옴표 안은 제외).
//!
//! 접근 로그가 여러 개면 [`NginxConfig::resolve`]는 선택을 강제하지 않고
//! [`Resolution::Ambiguous`]로 후보 목록을 돌려줍니다. 선택 방법은 호출자가 정합니다.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::LogPipelineError;
use crate::format::nginx;

/// 포맷 이름이 없는 `access_log`가 사용하는 포맷
pub const DEFAULT_FORMAT_NAME: &str = "combined";

/// `access_log` 선언
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogDecl {
    /// 로그 파일 경로
    pub path: String,
    /// 참조하는 포맷 이름
    pub format_name: String,
}

/// `log_format` 정의
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFormatDecl {
    /// 포맷 이름
    pub name: String,
    /// 이어 붙인 템플릿 문자열
    pub template: String,
}

/// 여러 접근 로그 중 하나를 고르는 외부 선택
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogChoice {
    /// 1부터 시작하는 후보 번호
    Index(usize),
    /// 후보 경로
    Path(String),
}

impl FromStr for AccessLogChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(idx) => Self::Index(idx),
            Err(_) => Self::Path(s.to_owned()),
        })
    }
}

impl fmt::Display for AccessLogChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "{idx}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

/// 해석이 끝난 접근 로그
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLog {
    pub path: String,
    pub format_name: String,
    /// 포맷 템플릿 문자열 (프리셋이면 프리셋 본문)
    pub template: String,
}

/// 접근 로그 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 하나로 결정됨
    Resolved(ResolvedLog),
    /// 선택이 필요함 (선언 순서의 후보 목록)
    Ambiguous(Vec<AccessLogDecl>),
}

/// 추출된 nginx 설정
#[derive(Debug, Clone, Default)]
pub struct NginxConfig {
    /// 설정 출처 (파일 경로 등, 에러 메시지용)
    source: String,
    access_logs: Vec<AccessLogDecl>,
    log_formats: Vec<LogFormatDecl>,
}

impl NginxConfig {
    /// 설정 텍스트를 해석합니다.
    pub fn parse(source: impl Into<String>, text: &str) -> Self {
        let mut config = Self {
            source: source.into(),
            ..Self::default()
        };

        for directive in directives(text) {
            match directive.first().map(String::as_str) {
                Some("access_log") => {
                    if let Some(decl) = access_log(&directive) {
                        if config.access_logs.iter().any(|d| d.path == decl.path) {
                            debug!(path = %decl.path, "duplicate access_log ignored");
                        } else {
                            config.access_logs.push(decl);
                        }
                    }
                }
                Some("log_format") => {
                    if let Some(decl) = log_format(&directive) {
                        config.log_formats.push(decl);
                    }
                }
                _ => {}
            }
        }

        debug!(
            source = %config.source,
            access_logs = config.access_logs.len(),
            log_formats = config.log_formats.len(),
            "parsed nginx config"
        );
        config
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 선언 순서의 접근 로그 목록 (`off`, `syslog:` 제외, 중복 경로 제외)
    pub fn access_logs(&self) -> &[AccessLogDecl] {
        &self.access_logs
    }

    /// 선언 순서의 로그 포맷 정의
    pub fn log_formats(&self) -> &[LogFormatDecl] {
        &self.log_formats
    }

    /// 포맷 이름을 템플릿 문자열로 해석합니다.
    ///
    /// 설정에 정의된 포맷을 먼저 찾습니다. 선언되지 않은 이름 중에서는
    /// nginx 내장 포맷인 [`DEFAULT_FORMAT_NAME`]만 프리셋으로 해석합니다.
    pub fn format_template(&self, name: &str) -> Option<&str> {
        self.log_formats
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.template.as_str())
            .or_else(|| {
                (name == DEFAULT_FORMAT_NAME)
                    .then(|| nginx::preset(name))
                    .flatten()
            })
    }

    /// 처리할 접근 로그와 포맷을 결정합니다.
    ///
    /// # Errors
    /// - 접근 로그 선언이 없으면 `NoAccessLog`
    /// - 선택 값이 후보와 맞지 않으면 `InvalidChoice`
    /// - 포맷 이름을 찾을 수 없으면 `UnknownFormat`
    pub fn resolve(
        &self,
        choice: Option<&AccessLogChoice>,
    ) -> Result<Resolution, LogPipelineError> {
        let decl = match (self.access_logs.as_slice(), choice) {
            ([], _) => return Err(LogPipelineError::NoAccessLog(self.source.clone())),
            (candidates, Some(choice)) => self.choose(candidates, choice)?,
            ([only], None) => only,
            (candidates, None) => return Ok(Resolution::Ambiguous(candidates.to_vec())),
        };

        let template =
            self.format_template(&decl.format_name)
                .ok_or_else(|| LogPipelineError::UnknownFormat {
                    path: decl.path.clone(),
                    format: decl.format_name.clone(),
                })?;

        Ok(Resolution::Resolved(ResolvedLog {
            path: decl.path.clone(),
            format_name: decl.format_name.clone(),
            template: template.to_owned(),
        }))
    }

    fn choose<'a>(
        &self,
        candidates: &'a [AccessLogDecl],
        choice: &AccessLogChoice,
    ) -> Result<&'a AccessLogDecl, LogPipelineError> {
        match choice {
            AccessLogChoice::Index(idx) => idx
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .ok_or_else(|| LogPipelineError::InvalidChoice {
                    choice: choice.to_string(),
                    reason: format!("expected a number between 1 and {}", candidates.len()),
                }),
            AccessLogChoice::Path(path) => candidates
                .iter()
                .find(|d| &d.path == path)
                .ok_or_else(|| LogPipelineError::InvalidChoice {
                    choice: choice.to_string(),
                    reason: format!("not an access log declared in {}", self.source),
                }),
        }
    }
}

/// 설정 텍스트의 접근 로그 선언을 추출합니다.
pub fn extract_access_logs(text: &str) -> Vec<AccessLogDecl> {
    NginxConfig::parse("<text>", text).access_logs
}

/// 설정 텍스트의 로그 포맷 정의를 추출합니다.
pub fn extract_log_formats(text: &str) -> Vec<LogFormatDecl> {
    NginxConfig::parse("<text>", text).log_formats
}

fn access_log(directive: &[String]) -> Option<AccessLogDecl> {
    let path = directive.get(1)?;
    if path == "off" || path.starts_with("syslog:") {
        return None;
    }
    let format_name = match directive.get(2) {
        Some(name) if !name.contains('=') => name.clone(),
        _ => DEFAULT_FORMAT_NAME.to_owned(),
    };
    Some(AccessLogDecl {
        path: path.clone(),
        format_name,
    })
}

fn log_format(directive: &[String]) -> Option<LogFormatDecl> {
    let name = directive.get(1)?;
    let mut rest = directive.get(2..)?;
    if rest.first().is_some_and(|t| t.starts_with("escape=")) {
        rest = &rest[1..];
    }
    if rest.is_empty() {
        return None;
    }
    Some(LogFormatDecl {
        name: name.clone(),
        template: rest.concat(),
    })
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
    Semicolon,
}

/// `;`로 끝나는 문장들을 토큰 목록으로 반환합니다.
fn directives(text: &str) -> Vec<Vec<String>> {
    let mut result = Vec::new();
    let mut current = Vec::new();
    for token in tokenize(text) {
        match token {
            Token::Word(word) => current.push(word),
            Token::Semicolon => {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
            }
            // 블록 시작 문장(`http {`)이나 닫는 괄호 앞 미완성 문장은 버림
            Token::Open | Token::Close => current.clear(),
        }
    }
    result
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                flush(&mut word, &mut tokens);
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '"' | '\'' => {
                flush(&mut word, &mut tokens);
                let mut quoted = String::new();
                while let Some(q) = chars.next() {
                    if q == c {
                        break;
                    }
                    if q == '\\' {
                        match chars.peek() {
                            Some(&next) if next == c || next == '\\' => {
                                quoted.push(next);
                                chars.next();
                                continue;
                            }
                            _ => {}
                        }
                    }
                    quoted.push(q);
                }
                tokens.push(Token::Word(quoted));
            }
            '{' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Open);
            }
            '}' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Close);
            }
            ';' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Semicolon);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}
