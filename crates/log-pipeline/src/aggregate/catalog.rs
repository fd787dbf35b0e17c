//! 봇 카탈로그 -- User-Agent 시그니처로 크롤러 식별

use botstat_core::types::BotEntry;

/// 내장 카탈로그 (매칭 순서대로)
const BUILTIN: [(&str, &str); 8] = [
    ("Googlebot", "Google"),
    ("Bingbot", "Bing"),
    ("Slurp", "Yahoo"),
    ("DuckDuckBot", "DuckDuckGo"),
    ("Baiduspider", "Baidu"),
    ("YandexBot", "Yandex"),
    ("Sogou", "Sogou"),
    ("ia_archiver", "Alexa"),
];

/// 시그니처 → 봇 이름 목록
///
/// 선언 순서대로 검사하며, User-Agent에 대소문자 구분 없이 포함된
/// 첫 번째 시그니처의 이름을 반환합니다. 여러 시그니처가 같은 이름을 가질 수 있습니다.
#[derive(Debug, Clone)]
pub struct BotCatalog {
    /// (소문자 시그니처, 표시 이름)
    entries: Vec<(String, String)>,
}

impl BotCatalog {
    /// (시그니처, 이름) 쌍으로 카탈로그를 만듭니다.
    pub fn new<I, S, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: AsRef<str>,
        N: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(sig, name)| (sig.as_ref().to_lowercase(), name.into()))
                .collect(),
        }
    }

    /// 내장 카탈로그
    pub fn builtin() -> Self {
        Self::new(BUILTIN)
    }

    /// 설정의 `[[bots]]` 목록으로 카탈로그를 만듭니다. 비어 있으면 내장 카탈로그입니다.
    pub fn from_entries(entries: &[BotEntry]) -> Self {
        if entries.is_empty() {
            return Self::builtin();
        }
        Self::new(entries.iter().map(|e| (e.signature.as_str(), e.name.clone())))
    }

    /// User-Agent에 해당하는 봇 이름을 반환합니다.
    pub fn identify(&self, user_agent: &str) -> Option<&str> {
        let user_agent = user_agent.to_lowercase();
        self.entries
            .iter()
            .find(|(sig, _)| user_agent.contains(sig.as_str()))
            .map(|(_, name)| name.as_str())
    }

    /// 매칭 순서의 (시그니처, 이름) 목록
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, n)| (s.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BotCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
