//! 从模型输出中提取 JSON

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// 宽松解析模型返回的 JSON
///
/// 依次尝试：原文、markdown 代码块、第一个 `{` 到最后一个 `}` 之间的内容。
/// 全部失败返回 None
pub fn safe_json_loads<T: DeserializeOwned>(text: &str) -> Option<T> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(inner) = fenced_block()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
    {
        if let Ok(value) = serde_json::from_str(inner.as_str()) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_plain_and_fenced() {
        let plain: Value = safe_json_loads(r#"{"topic": "Cold War"}"#).unwrap();
        assert_eq!(plain["topic"], "Cold War");

        let fenced: Value =
            safe_json_loads("Here you go:\n```json\n{\"lesson_count\": 3}\n```\nDone.").unwrap();
        assert_eq!(fenced["lesson_count"], 3);
    }

    #[test]
    fn test_embedded_braces() {
        let value: Value = safe_json_loads("Sure! {\"age\": 15} hope that helps").unwrap();
        assert_eq!(value["age"], 15);
        assert!(safe_json_loads::<Value>("no json here").is_none());
        assert!(safe_json_loads::<Value>("").is_none());
    }
}
