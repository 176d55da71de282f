//! 生成-核查修订循环 - 流程层
//!
//! 状态：Drafting → Checking → {Accepted, Revising → Drafting, Exhausted}
//!
//! - 尝试次数 = 完成的 Drafting→Checking 周期数
//! - 达到上限仍是 NO-GO 时保留最后一版草稿
//! - 严格串行，不并发生成候选稿

use tracing::{info, warn};

use crate::models::{ContentDraft, EvidenceItem, FactCheckVerdict, LessonSpec, RevisionOutcome, RevisionStatus};
use crate::services::{ContentGenerator, FactChecker, RevisionFeedback};
use crate::workflow::lesson_ctx::LessonCtx;

/// 修订循环状态
#[derive(Debug)]
pub enum RevisionState {
    Drafting,
    Checking(ContentDraft),
    /// 携带上一轮的警告，作为下一版的修订要求
    Revising(Vec<String>),
    Accepted,
    Exhausted,
}

/// 修订控制器
pub struct RevisionController<'a> {
    generator: &'a ContentGenerator,
    checker: &'a FactChecker,
    max_attempts: usize,
}

impl<'a> RevisionController<'a> {
    pub fn new(generator: &'a ContentGenerator, checker: &'a FactChecker, max_attempts: usize) -> Self {
        Self {
            generator,
            checker,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run(
        &self,
        lesson: &LessonSpec,
        evidence: &[EvidenceItem],
        prior_context: &str,
        ctx: &LessonCtx,
    ) -> RevisionOutcome {
        let mut history: Vec<FactCheckVerdict> = Vec::new();
        let mut last_draft: Option<ContentDraft> = None;
        let mut pending_warnings: Vec<String> = Vec::new();
        let mut generation_failed = false;
        let mut state = RevisionState::Drafting;

        let status = loop {
            state = match state {
                RevisionState::Drafting => {
                    let attempt = history.len() + 1;
                    info!("{} ✍️ 生成第 {}/{} 版草稿", ctx, attempt, self.max_attempts);

                    let feedback = last_draft.as_ref().map(|previous| RevisionFeedback {
                        warnings: &pending_warnings,
                        previous,
                    });
                    match self
                        .generator
                        .generate(lesson, evidence, prior_context, feedback, attempt)
                        .await
                    {
                        Ok(draft) => RevisionState::Checking(draft),
                        Err(e) => {
                            warn!("{} ⚠️ 草稿生成失败，停止修订: {}", ctx, e);
                            generation_failed = true;
                            RevisionState::Exhausted
                        }
                    }
                }
                RevisionState::Checking(draft) => {
                    let verdict = self.checker.check(&draft, evidence).await;
                    let is_go = verdict.is_go();
                    let warnings = verdict.warnings.clone();
                    history.push(verdict);
                    last_draft = Some(draft);

                    if is_go {
                        RevisionState::Accepted
                    } else if history.len() >= self.max_attempts {
                        RevisionState::Exhausted
                    } else {
                        RevisionState::Revising(warnings)
                    }
                }
                RevisionState::Revising(warnings) => {
                    info!("{} 🔁 根据 {} 条警告修订", ctx, warnings.len());
                    pending_warnings = warnings;
                    RevisionState::Drafting
                }
                RevisionState::Accepted => break RevisionStatus::Accepted,
                RevisionState::Exhausted => break RevisionStatus::Exhausted,
            };
        };

        match status {
            RevisionStatus::Accepted => {
                info!("{} ✅ 第 {} 次尝试通过核查", ctx, history.len())
            }
            RevisionStatus::Exhausted => warn!(
                "{} ⚠️ {} 次尝试后仍未通过核查，标记为未核实",
                ctx,
                history.len()
            ),
        }

        RevisionOutcome {
            status,
            final_draft: last_draft.unwrap_or_else(ContentDraft::unavailable),
            attempts: history.len(),
            history,
            generation_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TextModel;
    use crate::error::{AppError, AppResult};
    use crate::models::{Relevance, SourceKind};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const NO_GO: &str = "GO/NO-GO: NO-GO\nConfidence: Medium\nReason: Unsupported date.\n\
                         Warnings:\n- The date 1788 is not supported by the evidence";
    const GO: &str = "GO/NO-GO: GO\nConfidence: High\nReason: Consistent.\nWarnings: None";

    /// 按顺序返回预设回复；用完后返回错误
    struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> AppResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::Other("script exhausted".to_string()))
        }
    }

    fn draft_text() -> &'static str {
        "The Financial Crisis\nFrance was bankrupt by 1788. The crown could not borrow.\n\n\
         The Estates-General\nDeputies gathered at Versailles in May 1789."
    }

    fn evidence() -> Vec<EvidenceItem> {
        vec![EvidenceItem {
            query: "estates-general".to_string(),
            source_kind: SourceKind::Primary,
            source_name: "Encyclopaedia Britannica".to_string(),
            title: "Estates-General".to_string(),
            url: "https://www.britannica.com/topic/Estates-General".to_string(),
            text: "The Estates-General met at Versailles in May 1789.".to_string(),
            relevance: Relevance::Matched(1.0),
            used: false,
        }]
    }

    async fn run(generator_replies: &[&str], checker_replies: &[&str], evidence: &[EvidenceItem]) -> (RevisionOutcome, Arc<ScriptedModel>) {
        let gen_model = ScriptedModel::new(generator_replies);
        let generator = ContentGenerator::new(gen_model.clone(), 30);
        let checker = FactChecker::new(ScriptedModel::new(checker_replies));
        let controller = RevisionController::new(&generator, &checker, 4);
        let lesson = LessonSpec::new(1, "Origins", "Causes of the crisis", vec![]);
        let ctx = LessonCtx::new(1, 1, "French Revolution");
        let outcome = controller.run(&lesson, evidence, "", &ctx).await;
        (outcome, gen_model)
    }

    #[tokio::test]
    async fn test_accepted_after_three_revisions() {
        let text = draft_text();
        let (outcome, gen_model) = run(
            &[text, text, text, text],
            &[NO_GO, NO_GO, NO_GO, GO],
            &evidence(),
        )
        .await;

        assert_eq!(outcome.status, RevisionStatus::Accepted);
        assert_eq!(outcome.history.len(), 4);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.final_draft.revision_number, 4);
        assert!(!outcome.generation_failed);

        // 修订提示词带上了上一轮的警告
        let prompts = gen_model.prompts.lock().unwrap();
        assert!(!prompts[0].contains("The date 1788 is not supported"));
        assert!(prompts[1].contains("The date 1788 is not supported"));
    }

    #[tokio::test]
    async fn test_exhausted_keeps_last_draft() {
        let text = draft_text();
        let (outcome, _) = run(
            &[text, text, text, text, text],
            &[NO_GO, NO_GO, NO_GO, NO_GO, GO],
            &evidence(),
        )
        .await;

        assert_eq!(outcome.status, RevisionStatus::Exhausted);
        assert_eq!(outcome.history.len(), 4);
        assert_eq!(outcome.final_draft.revision_number, 4);
        assert_eq!(outcome.final_warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_without_draft() {
        let (outcome, _) = run(&[], &[GO], &evidence()).await;

        assert_eq!(outcome.status, RevisionStatus::Exhausted);
        assert!(outcome.generation_failed);
        assert!(outcome.history.is_empty());
        assert!(outcome.final_draft.is_unavailable());
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_previous_draft() {
        let (outcome, _) = run(&[draft_text()], &[NO_GO], &evidence()).await;

        assert_eq!(outcome.status, RevisionStatus::Exhausted);
        assert!(outcome.generation_failed);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.final_draft.revision_number, 1);
    }
}
