//! 内容生成服务 - 业务能力层
//!
//! 只负责"根据资料写教师指南正文"，不关心核查和重试流程

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::clients::TextModel;
use crate::error::{AppError, AppResult};
use crate::models::{ContentDraft, EvidenceItem, LessonSpec, Section};

/// 没有任何资料时写入提示词的标记
pub const NO_EVIDENCE_MARKER: &str = "NO EVIDENCE AVAILABLE";

/// 上一轮核查的反馈
#[derive(Debug, Clone, Copy)]
pub struct RevisionFeedback<'a> {
    pub warnings: &'a [String],
    pub previous: &'a ContentDraft,
}

/// 内容生成服务
///
/// 职责：
/// - 组装生成 / 修订提示词
/// - 把模型输出解析为固定数量的段落
/// - 不判断内容是否正确
pub struct ContentGenerator {
    model: Arc<dyn TextModel>,
    section_target: usize,
}

impl ContentGenerator {
    pub fn new(model: Arc<dyn TextModel>, section_target: usize) -> Self {
        Self {
            model,
            section_target: section_target.max(1),
        }
    }

    /// 生成一版草稿
    ///
    /// # 参数
    /// - `prior_context`: 前几课的摘要（可为空）
    /// - `feedback`: 修订时传入上一轮的警告和草稿
    /// - `revision_number`: 第几次生成（从 1 开始）
    pub async fn generate(
        &self,
        lesson: &LessonSpec,
        evidence: &[EvidenceItem],
        prior_context: &str,
        feedback: Option<RevisionFeedback<'_>>,
        revision_number: usize,
    ) -> AppResult<ContentDraft> {
        let prompt = match feedback {
            Some(feedback) => self.revision_prompt(lesson, evidence, prior_context, feedback),
            None => self.initial_prompt(lesson, evidence, prior_context),
        };
        debug!("生成提示词长度: {} 字符", prompt.len());

        let raw = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| AppError::generation_failed(lesson.full_name(), e.to_string()))?;

        let sections = parse_sections(&raw, self.section_target);
        if sections.is_empty() {
            return Err(AppError::generation_failed(
                lesson.full_name(),
                "模型返回内容无法解析为段落",
            ));
        }

        info!(
            "✓ 第 {} 版草稿: {} 个段落 (目标 {})",
            revision_number,
            sections.len(),
            self.section_target
        );
        Ok(ContentDraft::new(sections, revision_number))
    }

    fn initial_prompt(
        &self,
        lesson: &LessonSpec,
        evidence: &[EvidenceItem],
        prior_context: &str,
    ) -> String {
        let previous = if prior_context.trim().is_empty() {
            String::new()
        } else {
            format!(
                "CONTEXT FROM PREVIOUS LESSONS:\n{}\n\n\
                 The content above was already covered. Do NOT repeat these topics or facts; \
                 build on them and introduce NEW information.\n\n",
                prior_context.trim()
            )
        };

        format!(
            "You are an expert HISTORY teacher writing a Teacher's Guide for: \"{title}\".\n\
             Lesson focus: {focus}\n\n\
             {previous}\
             STRUCTURE:\n\
             1. Write EXACTLY {n} sections, one per slide, separated by a blank line\n\
             2. Each section starts with a topic sentence on its own line that can serve as a slide title\n\
             3. Follow it with 3-5 sentences of continuous prose (no bullet points)\n\
             4. Use clear academic language with specific dates, figures and places\n\
             5. Base every claim ONLY on the evidence below\n\n\
             EVIDENCE:\n{evidence}",
            title = lesson.full_name(),
            focus = lesson.focus_description,
            previous = previous,
            n = self.section_target,
            evidence = evidence_block(evidence),
        )
    }

    fn revision_prompt(
        &self,
        lesson: &LessonSpec,
        evidence: &[EvidenceItem],
        prior_context: &str,
        feedback: RevisionFeedback<'_>,
    ) -> String {
        let constraints = feedback
            .warnings
            .iter()
            .enumerate()
            .map(|(i, w)| format!("{}. {}", i + 1, w))
            .collect::<Vec<_>>()
            .join("\n");

        let previous_lessons = if prior_context.trim().is_empty() {
            String::new()
        } else {
            format!("PREVIOUS LESSONS (do not repeat):\n{}\n\n", prior_context.trim())
        };

        format!(
            "You are an expert history teacher revising a Teacher's Guide after fact-checking.\n\n\
             LESSON: {title}\n\n\
             EVERY ONE OF THESE ISSUES MUST BE FIXED:\n{constraints}\n\n\
             {previous_lessons}\
             RULES:\n\
             - Use ONLY information from the evidence\n\
             - Remove or correct every unsupported claim listed above\n\
             - Do not include content about unrelated topics\n\
             - Keep EXACTLY {n} sections separated by blank lines, topic sentence first, 3-5 sentences each\n\n\
             PREVIOUS DRAFT:\n{draft}\n\n\
             EVIDENCE:\n{evidence}",
            title = lesson.full_name(),
            constraints = constraints,
            previous_lessons = previous_lessons,
            n = self.section_target,
            draft = feedback.previous.full_text(),
            evidence = evidence_block(evidence),
        )
    }
}

/// 提示词中的资料部分
pub fn evidence_block(evidence: &[EvidenceItem]) -> String {
    if evidence.is_empty() {
        return format!(
            "{}. Write only widely established facts and keep claims general.",
            NO_EVIDENCE_MARKER
        );
    }
    evidence
        .iter()
        .map(EvidenceItem::as_prompt_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn heading_prefix_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:#+\s*|[-*]\s+|\d+[.)]\s*|section\s*\d+\s*[:.)-]?\s*)+").ok()
    })
    .as_ref()
}

/// 去掉 markdown 标记和 "Section 3:" 一类前缀
fn clean_line(line: &str) -> String {
    let line = line.trim().replace("**", "").replace("__", "");
    let line = match heading_prefix_re() {
        Some(re) => re.replace(&line, "").to_string(),
        None => line,
    };
    line.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .to_string()
}

/// 单独一行、较短、不以句号结尾：视为标题
fn looks_like_heading(block: &[String]) -> bool {
    block.len() == 1
        && block[0].split_whitespace().count() <= 12
        && !block[0].ends_with('.')
}

/// 把模型输出解析为段落
///
/// 空行分隔；单独成块的标题与下一块合并；超过目标数量的段落并入最后一段
pub fn parse_sections(raw: &str, section_target: usize) -> Vec<Section> {
    let mut blocks: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in raw.lines() {
        let cleaned = clean_line(line);
        if cleaned.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        if cleaned.chars().all(|c| c == '-' || c == '=' || c == '*') {
            continue;
        }
        current.push(cleaned);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut pending_title: Option<String> = None;
    for block in blocks {
        if looks_like_heading(&block) {
            if let Some(title) = pending_title.take() {
                sections.push(Section::new(title, ""));
            }
            pending_title = block.into_iter().next();
            continue;
        }

        let section = match pending_title.take() {
            Some(title) => Section::new(title, block.join(" ")),
            None if block.len() > 1 => Section::new(block[0].clone(), block[1..].join(" ")),
            None => split_first_sentence(&block[0]),
        };
        sections.push(section);
    }
    if let Some(title) = pending_title {
        sections.push(Section::new(title, ""));
    }

    fold_extra_sections(sections, section_target)
}

fn split_first_sentence(text: &str) -> Section {
    match text.find(". ") {
        Some(pos) => Section::new(&text[..=pos], text[pos + 1..].trim()),
        None => Section::new(text, ""),
    }
}

fn fold_extra_sections(mut sections: Vec<Section>, section_target: usize) -> Vec<Section> {
    if section_target == 0 || sections.len() <= section_target {
        return sections;
    }
    let extra = sections.split_off(section_target);
    if let Some(last) = sections.last_mut() {
        for section in extra {
            if !last.body.is_empty() {
                last.body.push(' ');
            }
            last.body.push_str(&section.full_text().replace('\n', " "));
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Relevance, SourceKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录提示词并返回固定文本
    struct RecordingModel {
        reply: AppResult<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextModel for RecordingModel {
        async fn complete(&self, prompt: &str) -> AppResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(AppError::Other("model offline".to_string())),
            }
        }
    }

    fn lesson() -> LessonSpec {
        LessonSpec::new(
            1,
            "Causes of the Revolution",
            "Fiscal crisis and Enlightenment ideas",
            vec!["Estates-General".to_string()],
        )
    }

    fn evidence() -> Vec<EvidenceItem> {
        vec![EvidenceItem {
            query: "Estates-General".to_string(),
            source_kind: SourceKind::Primary,
            source_name: "Encyclopaedia Britannica".to_string(),
            title: "Estates-General".to_string(),
            url: "https://www.britannica.com/topic/Estates-General".to_string(),
            text: "The Estates-General met at Versailles in May 1789.".to_string(),
            relevance: Relevance::Matched(1.0),
            used: false,
        }]
    }

    #[test]
    fn test_parse_sections_variants() {
        let raw = "**Section 1: The Fiscal Crisis**\nFrance was deeply in debt. Taxes fell on the Third Estate.\n\n\
                   ## The Estates-General\n\nDelegates met at Versailles in May 1789. Voting by order caused disputes.\n\n\
                   The Tennis Court Oath bound the deputies. They swore not to separate.";
        let sections = parse_sections(raw, 30);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "The Fiscal Crisis");
        assert!(sections[0].body.starts_with("France was deeply in debt."));
        assert_eq!(sections[1].title, "The Estates-General");
        assert!(sections[1].body.contains("Versailles"));
        assert_eq!(sections[2].title, "The Tennis Court Oath bound the deputies.");
        assert_eq!(sections[2].body, "They swore not to separate.");
    }

    #[test]
    fn test_extra_sections_are_folded() {
        let raw = "A\nOne.\n\nB\nTwo.\n\nC\nThree.";
        let sections = parse_sections(raw, 2);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].title, "B");
        assert_eq!(sections[1].body, "Two. C Three.");
    }

    #[tokio::test]
    async fn test_revision_prompt_lists_numbered_warnings() {
        let model = Arc::new(RecordingModel::replying("Title\nBody sentence."));
        let generator = ContentGenerator::new(model.clone(), 30);
        let previous = ContentDraft::new(vec![Section::new("Old", "Old body.")], 1);
        let warnings = vec![
            "Date of the Tennis Court Oath is unsupported".to_string(),
            "Mentions Napoleon without evidence".to_string(),
        ];

        let draft = generator
            .generate(
                &lesson(),
                &evidence(),
                "",
                Some(RevisionFeedback {
                    warnings: &warnings,
                    previous: &previous,
                }),
                2,
            )
            .await
            .unwrap();

        assert_eq!(draft.revision_number, 2);
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("1. Date of the Tennis Court Oath is unsupported"));
        assert!(prompts[0].contains("2. Mentions Napoleon without evidence"));
        assert!(prompts[0].contains("Old body."));
    }

    #[tokio::test]
    async fn test_no_evidence_marker_and_prior_context() {
        let model = Arc::new(RecordingModel::replying("Title\nBody."));
        let generator = ContentGenerator::new(model.clone(), 30);

        generator
            .generate(&lesson(), &[], "Lesson 1 covered the Bastille.", None, 1)
            .await
            .unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains(NO_EVIDENCE_MARKER));
        assert!(prompts[0].contains("Lesson 1 covered the Bastille."));
        assert!(prompts[0].contains("EXACTLY 30 sections"));
    }

    #[tokio::test]
    async fn test_empty_output_is_generation_failure() {
        let generator = ContentGenerator::new(Arc::new(RecordingModel::replying("  \n\n ")), 30);
        let result = generator.generate(&lesson(), &evidence(), "", None, 1).await;
        assert!(matches!(result, Err(AppError::Generation(_))));

        let offline = RecordingModel {
            reply: Err(AppError::Other(String::new())),
            prompts: Mutex::new(Vec::new()),
        };
        let generator = ContentGenerator::new(Arc::new(offline), 30);
        let result = generator.generate(&lesson(), &evidence(), "", None, 1).await;
        assert!(matches!(result, Err(AppError::Generation(_))));
    }
}
