//! 资料过滤服务 - 业务能力层
//!
//! 只负责"哪些资料真正被最终稿用到了"

use tracing::{debug, info};

use crate::models::{ContentDraft, EvidenceItem};
use crate::services::relevance::significant_words;

const UNRELATED_MARKERS: &[&str] = &["unrelated", "irrelevant", "not relevant", "off-topic"];

/// 资料过滤服务
///
/// 一条资料被标记为已使用，当且仅当：
/// - 与最终稿至少共享 `min_overlap` 个有效关键词（≥ 5 个字符）
/// - 最终核查的警告没有把它点名为无关资料
pub struct EvidenceFilter {
    min_overlap: usize,
}

impl EvidenceFilter {
    pub fn new(min_overlap: usize) -> Self {
        Self { min_overlap }
    }

    /// 返回已使用的资料（used = true），每次重新计算
    pub fn filter(
        &self,
        draft: &ContentDraft,
        evidence: &[EvidenceItem],
        final_warnings: &[String],
    ) -> Vec<EvidenceItem> {
        let draft_words = significant_words(&draft.full_text(), 5);

        let used: Vec<EvidenceItem> = evidence
            .iter()
            .filter(|item| {
                let overlap = significant_words(&item.text, 5)
                    .intersection(&draft_words)
                    .count();
                let named_unrelated = is_named_unrelated(item, final_warnings);
                debug!(
                    "资料 {} - 共同关键词 {} 个, 被点名无关: {}",
                    item.title, overlap, named_unrelated
                );
                overlap >= self.min_overlap && !named_unrelated
            })
            .map(|item| EvidenceItem {
                used: true,
                ..item.clone()
            })
            .collect();

        info!("📎 资料过滤: 采用 {}/{} 条", used.len(), evidence.len());
        used
    }
}

impl Default for EvidenceFilter {
    fn default() -> Self {
        Self::new(3)
    }
}

/// 警告中是否把这条资料点名为无关
///
/// 警告需同时包含"无关"类措辞和资料标题（或标题中所有长词）
fn is_named_unrelated(item: &EvidenceItem, warnings: &[String]) -> bool {
    let identifier = item
        .title
        .split('|')
        .next()
        .unwrap_or(&item.title)
        .trim()
        .to_lowercase();
    if identifier.is_empty() {
        return false;
    }
    let long_words: Vec<String> = identifier
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 4)
        .map(str::to_string)
        .collect();

    warnings.iter().any(|warning| {
        let warning = warning.to_lowercase();
        if !UNRELATED_MARKERS.iter().any(|m| warning.contains(m)) {
            return false;
        }
        warning.contains(&identifier)
            || (!long_words.is_empty() && long_words.iter().all(|w| warning.contains(w.as_str())))
    })
}
