//! 事实核查服务 - 业务能力层
//!
//! 只负责"判断草稿是否被资料支持"，不决定是否重试

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::clients::TextModel;
use crate::models::{Confidence, ContentDraft, EvidenceItem, FactCheckVerdict};
use crate::services::content_generator::evidence_block;

/// 事实核查服务
///
/// 职责：
/// - 组装核查提示词
/// - 把模型输出解析并规范化为 `FactCheckVerdict`
/// - 模型调用失败也返回 NO-GO，不向上抛错
pub struct FactChecker {
    model: Arc<dyn TextModel>,
}

impl FactChecker {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub async fn check(&self, draft: &ContentDraft, evidence: &[EvidenceItem]) -> FactCheckVerdict {
        if evidence.is_empty() {
            warn!("⚠️ 没有资料，无法核查");
            return FactCheckVerdict::no_go(
                Confidence::Low,
                "No evidence available; the content cannot be verified",
                Vec::new(),
            );
        }

        let prompt = build_prompt(draft, evidence);
        let verdict = match self.model.complete(&prompt).await {
            Ok(raw) => parse_verdict(&raw),
            Err(e) => {
                warn!("⚠️ 核查模型调用失败: {}", e);
                FactCheckVerdict::no_go(
                    Confidence::Low,
                    "Fact-check could not be completed",
                    vec![format!("Fact-check model call failed: {}", e)],
                )
            }
        };

        info!("🛡️ 核查结果: {}", verdict);
        verdict
    }
}

fn build_prompt(draft: &ContentDraft, evidence: &[EvidenceItem]) -> String {
    format!(
        "You are a strict fact-checking agent.\n\n\
         Evaluate whether the TEXT TO CHECK is supported by the EVIDENCE.\n\
         - Use ONLY the evidence. Anything not in the evidence is unsupported.\n\
         - List every distinct issue as its own warning.\n\
         - If a source article is unrelated to the lesson, say so and name its title.\n\n\
         Output format EXACTLY:\n\
         GO/NO-GO: <GO|NO-GO>\n\
         Confidence: <High|Medium|Low>\n\
         Reason: <one sentence>\n\
         Warnings:\n\
         - <issue>\n\
         (write \"Warnings: None\" when there are no issues)\n\n\
         EVIDENCE:\n{}\n\n\
         TEXT TO CHECK:\n{}",
        evidence_block(evidence),
        draft.full_text()
    )
}

fn verdict_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)GO\s*/\s*NO[-_ ]?GO\s*:\s*\**\s*(NO[-_ ]?GO|GO)\b").ok())
        .as_ref()
}

fn field_re(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?im)^\W*{}\W*:\s*(.*)$", name)).ok()
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    match line.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) if pos > 0 && line[pos..].starts_with(['.', ')']) => line[pos + 1..].trim(),
        _ => line,
    }
}

fn is_none_marker(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_ascii_lowercase();
    t.is_empty() || t == "none" || t == "n/a" || t == "no issues"
}

/// 解析并规范化核查输出
///
/// - GO 但带警告 → NO-GO
/// - NO-GO 无警告 → 原因作为唯一警告
/// - 无法解析 → NO-GO / Low
pub fn parse_verdict(raw: &str) -> FactCheckVerdict {
    let Some(is_go) = verdict_re()
        .and_then(|re| re.captures(raw))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().eq_ignore_ascii_case("GO"))
    else {
        return FactCheckVerdict::no_go(
            Confidence::Low,
            "Fact-check output could not be parsed",
            Vec::new(),
        );
    };

    let confidence = field_re("Confidence")
        .and_then(|re| re.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))
        .and_then(|s| Confidence::parse(s.trim_matches(|c: char| !c.is_alphabetic())))
        .unwrap_or(Confidence::Low);

    let reason = field_re("Reason")
        .and_then(|re| re.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string()))
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reason given".to_string());

    let warnings = parse_warnings(raw);

    if is_go && warnings.is_empty() {
        FactCheckVerdict::go(confidence, reason)
    } else {
        FactCheckVerdict::no_go(confidence, reason, warnings)
    }
}

fn parse_warnings(raw: &str) -> Vec<String> {
    let lower = raw.to_ascii_lowercase();
    let Some(start) = lower.find("warnings:") else {
        return Vec::new();
    };
    let section = &raw[start + "warnings:".len()..];

    let mut warnings = Vec::new();
    for line in section.lines() {
        let lower_line = line.trim().to_ascii_lowercase();
        if lower_line.starts_with("corrected version") {
            break;
        }
        let item = strip_bullet(line);
        if is_none_marker(item) {
            continue;
        }
        warnings.push(item.to_string());
    }
    warnings
}
