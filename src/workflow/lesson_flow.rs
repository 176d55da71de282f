//! 课时处理流程 - 流程层
//!
//! 核心职责：定义"一节课"的完整处理流程
//!
//! 流程顺序：
//! 1. 逐个主题检索资料（主资料源 → 换说法重试 → 后备资料源）
//! 2. 生成-核查修订循环
//! 3. 过滤出最终稿实际用到的资料
//! 4. 生成幻灯片和教师指南结构，交给渲染通道并等待确认
//! 5. 追加到跨课时状态

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::TextModel;
use crate::config::PipelineConfig;
use crate::infrastructure::{RenderDispatcher, RenderJob};
use crate::models::{EvidenceItem, LessonResult, LessonSpec, QualityFlags, RetrievalAttempt, RevisionStatus};
use crate::services::document_builder;
use crate::services::{ContentGenerator, EvidenceFilter, EvidenceRetriever, FactChecker, SlideBuilder};
use crate::utils::logging;
use crate::workflow::lesson_ctx::{LessonCtx, UnitState};
use crate::workflow::revision::RevisionController;

/// 课时处理流程
///
/// - 编排完整的课时处理流程
/// - 决定何时检索、何时修订、何时交给渲染器
/// - 持有检索缓存（单一写者）
/// - 只依赖业务能力（services）和渲染通道
pub struct LessonFlow {
    retriever: EvidenceRetriever,
    generator: ContentGenerator,
    checker: FactChecker,
    filter: EvidenceFilter,
    slide_builder: SlideBuilder,
    dispatcher: RenderDispatcher,
    max_fact_check_attempts: usize,
}

impl LessonFlow {
    pub fn new(
        retriever: EvidenceRetriever,
        model: Arc<dyn TextModel>,
        dispatcher: RenderDispatcher,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            generator: ContentGenerator::new(model.clone(), pipeline.section_target),
            checker: FactChecker::new(model),
            filter: EvidenceFilter::new(pipeline.evidence_min_overlap),
            slide_builder: SlideBuilder::new(pipeline.question_slide_positions.clone()),
            dispatcher,
            max_fact_check_attempts: pipeline.max_fact_check_attempts,
        }
    }

    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    pub fn retriever(&self) -> &EvidenceRetriever {
        &self.retriever
    }

    pub fn retriever_mut(&mut self) -> &mut EvidenceRetriever {
        &mut self.retriever
    }

    /// 处理一节课；任何阶段的失败都只降低质量标记，不向上抛错
    pub async fn run(&mut self, lesson: &LessonSpec, ctx: &LessonCtx, state: &mut UnitState) -> LessonResult {
        logging::log_lesson_start(ctx.lesson_index, ctx.lesson_total, &lesson.title);

        // ========== 1. 检索资料 ==========
        let (evidence, retrieval_log, missing_topics) = self.gather_evidence(lesson, ctx).await;

        // 没有资料就无从核查，只生成一次
        let max_attempts = if evidence.is_empty() {
            warn!("{} ⚠️ 没有任何资料，内容将无法核实", ctx);
            1
        } else {
            self.max_fact_check_attempts
        };

        // ========== 2. 生成-核查修订 ==========
        let prior_context = state.prior_context();
        let outcome = RevisionController::new(&self.generator, &self.checker, max_attempts)
            .run(lesson, &evidence, &prior_context, ctx)
            .await;

        // ========== 3. 过滤资料 ==========
        let used = self
            .filter
            .filter(&outcome.final_draft, &evidence, outcome.final_warnings());
        info!("{} 📚 使用资料 {}/{} 条", ctx, used.len(), evidence.len());

        // ========== 4. 渲染 ==========
        let slides = self
            .slide_builder
            .build(lesson, &ctx.unit_title, &outcome.final_draft);
        let guide = document_builder::teacher_guide(
            lesson,
            &outcome.final_draft,
            outcome.status,
            &outcome.history,
        );

        info!("{} 🖨️ 提交幻灯片和教师指南到渲染队列", ctx);
        let slide_render = self.dispatcher.dispatch(RenderJob::Slides(slides.clone())).await;
        let guide_render = self.dispatcher.dispatch(RenderJob::Document(guide)).await;
        for (what, status) in [("幻灯片", &slide_render), ("教师指南", &guide_render)] {
            if status.is_failure() {
                warn!("{} ⚠️ {}渲染未完成: {:?}", ctx, what, status);
            }
        }

        let flags = QualityFlags {
            low_grounding: !missing_topics.is_empty(),
            generation_failed: outcome.generation_failed,
            unverified: outcome.status == RevisionStatus::Exhausted,
            render_failed: slide_render.is_failure() || guide_render.is_failure(),
        };

        // ========== 5. 跨课时状态 ==========
        let slide_titles: Vec<String> = slides.content_slides().map(|s| s.title.clone()).collect();
        state.record_lesson(
            &lesson.full_name(),
            &outcome.final_draft.full_text(),
            &slide_titles,
        );

        let status_text = match outcome.status {
            RevisionStatus::Accepted => "✅ 已核实",
            RevisionStatus::Exhausted => "⚠️ 未核实",
        };
        logging::log_lesson_complete(ctx.lesson_index, status_text, used.len());

        LessonResult {
            spec: lesson.clone(),
            draft: outcome.final_draft,
            evidence: used,
            verdict_history: outcome.history,
            status: outcome.status,
            slides,
            slide_render,
            guide_render,
            retrieval_log,
            missing_topics,
            flags,
        }
    }

    /// 逐个主题检索；同一条资料只保留一次
    async fn gather_evidence(
        &mut self,
        lesson: &LessonSpec,
        ctx: &LessonCtx,
    ) -> (Vec<EvidenceItem>, Vec<RetrievalAttempt>, Vec<String>) {
        let mut evidence: Vec<EvidenceItem> = Vec::new();
        let mut log = Vec::new();
        let mut missing = Vec::new();

        for topic in &lesson.research_topics {
            info!("{} 🔍 检索主题: {}", ctx, topic);
            match self.retriever.retrieve(topic, &mut log).await {
                Ok(item) => {
                    let key = item.bibliography_key();
                    if !evidence.iter().any(|e| e.bibliography_key() == key) {
                        evidence.push(item);
                    }
                }
                Err(e) => {
                    warn!("{} ⚠️ 主题无资料: {} ({})", ctx, topic, e);
                    missing.push(topic.clone());
                }
            }
        }

        info!(
            "{} ✓ 检索完成: {} 条资料, {} 个主题缺失",
            ctx,
            evidence.len(),
            missing.len()
        );
        (evidence, log, missing)
    }
}
