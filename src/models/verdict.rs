use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// GO / NO-GO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Go,
    NoGo,
}

/// 置信度（仅作参考，不决定是否通过）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// 一次事实核查的结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckVerdict {
    pub verdict: Verdict,
    pub confidence: Confidence,
    pub reason: String,
    /// 每个独立问题一条
    pub warnings: Vec<String>,
}

impl FactCheckVerdict {
    /// GO 必须没有任何警告
    pub fn go(confidence: Confidence, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Go,
            confidence,
            reason: reason.into(),
            warnings: Vec::new(),
        }
    }

    /// NO-GO 至少带一条警告；警告为空时用原因代替
    pub fn no_go(confidence: Confidence, reason: impl Into<String>, warnings: Vec<String>) -> Self {
        let reason = reason.into();
        let warnings = if warnings.is_empty() {
            vec![reason.clone()]
        } else {
            warnings
        };
        Self {
            verdict: Verdict::NoGo,
            confidence,
            reason,
            warnings,
        }
    }

    pub fn is_go(&self) -> bool {
        self.verdict == Verdict::Go
    }
}

impl Display for FactCheckVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = match self.verdict {
            Verdict::Go => "GO",
            Verdict::NoGo => "NO-GO",
        };
        write!(
            f,
            "{} ({:?}): {} [{} 条警告]",
            verdict,
            self.confidence,
            self.reason,
            self.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_go_always_has_warning() {
        let verdict = FactCheckVerdict::no_go(Confidence::Low, "unsupported date", vec![]);
        assert_eq!(verdict.warnings, vec!["unsupported date".to_string()]);
        assert!(!verdict.is_go());
    }

    #[test]
    fn test_confidence_parse() {
        assert_eq!(Confidence::parse(" High "), Some(Confidence::High));
        assert_eq!(Confidence::parse("LOW"), Some(Confidence::Low));
        assert_eq!(Confidence::parse("certain"), None);
    }
}
