//! 相关性判定 - 业务能力层
//!
//! 判断资料源返回的条目是否真的在讲请求的主题（而不是同名的其他事物）

use std::collections::HashSet;

use crate::clients::LookupResult;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "that", "this", "their", "there", "which",
    "were", "was", "are", "its", "his", "her", "they", "them", "about", "after", "before",
    "during", "between", "under", "over", "lesson", "lessons", "history", "historical",
    "introduction", "overview", "unit", "part",
];

/// 文本中的有效关键词（小写，去标点，去停用词，长度 ≥ min_len）
pub fn significant_words(text: &str, min_len: usize) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| w.chars().count() >= min_len)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// 主题关键词（长度 ≥ 3，纯数字年份也保留）
pub fn topic_keywords(topic: &str) -> HashSet<String> {
    significant_words(topic, 3)
}

/// 同词或共享 5 个字符的前缀（revolution / revolutionary）
fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let prefix_a: String = a.chars().take(5).collect();
    let prefix_b: String = b.chars().take(5).collect();
    prefix_a.chars().count() == 5 && prefix_a == prefix_b
}

/// 相关性判定能力
///
/// 可替换实现；检索器只关心"相关 / 不相关"
pub trait RelevancePredicate: Send + Sync {
    /// 相关返回 Some(得分)，不相关返回 None
    fn judge(&self, topic: &str, result: &LookupResult) -> Option<f64>;
}

/// 默认实现：主题关键词在标题 + 摘要中的命中比例
///
/// 资料源自带相关性信号时取两者较大值
#[derive(Debug, Clone)]
pub struct KeywordRelevance {
    threshold: f64,
}

impl KeywordRelevance {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn score(&self, topic: &str, result: &LookupResult) -> f64 {
        let keywords = topic_keywords(topic);
        let keyword_score = if keywords.is_empty() {
            0.0
        } else {
            let haystack =
                significant_words(&format!("{} {}", result.title, result.summary), 3);
            let hits = keywords
                .iter()
                .filter(|k| haystack.iter().any(|h| words_match(k, h)))
                .count();
            hits as f64 / keywords.len() as f64
        };

        match result.relevance_signal {
            Some(signal) => keyword_score.max(signal),
            None => keyword_score,
        }
    }
}

impl Default for KeywordRelevance {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl RelevancePredicate for KeywordRelevance {
    fn judge(&self, topic: &str, result: &LookupResult) -> Option<f64> {
        let score = self.score(topic, result);
        (score >= self.threshold).then_some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(title: &str, summary: &str) -> LookupResult {
        LookupResult {
            title: title.to_string(),
            summary: summary.to_string(),
            url: String::new(),
            relevance_signal: None,
        }
    }

    #[test]
    fn test_matching_article_is_relevant() {
        let predicate = KeywordRelevance::default();
        let result = lookup(
            "French Revolution",
            "The French Revolution was a period of political change in France.",
        );
        let score = predicate.judge("French Revolution", &result).unwrap();
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_homonym_is_irrelevant() {
        let predicate = KeywordRelevance::default();
        // 同名但无关的条目
        let result = lookup(
            "Marathon (sport)",
            "A marathon is a long-distance foot race with a distance of 42.195 km.",
        );
        assert!(predicate.judge("Battle of Marathon 490 BC", &result).is_none());
    }

    #[test]
    fn test_prefix_match_and_signal() {
        let predicate = KeywordRelevance::new(0.5);
        let result = lookup("Napoleonic Wars", "A series of major conflicts.");
        assert!(predicate.judge("Napoleon campaigns", &result).is_some());

        let mut weak = lookup("Unrelated", "Nothing in common.");
        weak.relevance_signal = Some(0.9);
        assert_eq!(predicate.judge("Congress of Vienna", &weak), Some(0.9));
    }

    #[test]
    fn test_significant_words() {
        let words = significant_words("The Treaty of Versailles (1919), signed!", 5);
        assert!(words.contains("treaty"));
        assert!(words.contains("versailles"));
        assert!(words.contains("signed"));
        assert!(!words.contains("the"));
        assert!(!words.contains("1919"));
    }
}
