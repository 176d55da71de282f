//! 单元处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理一个请求对应的整个单元，是单元级别的编排器。
//!
//! ## 核心功能
//!
//! 0. **重置缓存**：上一个单元的资料不会带入本单元
//! 1. **课程规划**：校验错误在任何检索之前直接返回
//! 2. **遍历课时**：严格按顺序把每节课交给 `LessonFlow`
//! 3. **测验**：根据全部课时摘要生成
//! 4. **资料清单**：汇总各课时实际使用的资料
//! 5. **渲染**：测验和资料清单交给渲染通道
//!
//! 课时未通过核查、渲染失败、生成失败都不会中断单元

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{build_sources, OpenAiTextModel, TextModel};
use crate::config::{Config, PipelineConfig};
use crate::error::AppResult;
use crate::infrastructure::{RenderDispatcher, RenderJob};
use crate::models::{LessonResult, Request, UnitResult};
use crate::services::document_builder;
use crate::services::{EvidenceRetriever, KeywordRelevance, QuizService, UnitPlanner};
use crate::workflow::{LessonCtx, LessonFlow, UnitState};

/// 单元处理器
pub struct UnitProcessor {
    pipeline: PipelineConfig,
    planner: UnitPlanner,
    lesson_flow: LessonFlow,
    quiz_service: QuizService,
}

impl UnitProcessor {
    /// 用给定的模型、检索服务和渲染通道组装
    pub fn new(
        pipeline: PipelineConfig,
        model: Arc<dyn TextModel>,
        retriever: EvidenceRetriever,
        dispatcher: RenderDispatcher,
    ) -> Self {
        Self {
            planner: UnitPlanner::new(model.clone(), &pipeline),
            lesson_flow: LessonFlow::new(retriever, model.clone(), dispatcher, &pipeline),
            quiz_service: QuizService::new(model, pipeline.quiz_question_count),
            pipeline,
        }
    }

    /// 按配置创建真实的模型和资料源
    pub fn from_config(config: &Config, dispatcher: RenderDispatcher) -> AppResult<Self> {
        let model: Arc<dyn TextModel> = Arc::new(OpenAiTextModel::new(config));
        let (primary, secondary) = build_sources(config)?;
        let retriever = EvidenceRetriever::new(
            primary,
            secondary,
            Box::new(KeywordRelevance::new(config.pipeline.relevance_threshold)),
            config.pipeline.max_primary_retries,
        );
        Ok(Self::new(config.pipeline.clone(), model, retriever, dispatcher))
    }

    /// 本单元已缓存的资料数
    pub fn cached_evidence(&self) -> usize {
        self.lesson_flow.retriever().cache_len()
    }

    /// 处理一个请求
    ///
    /// 只有规划阶段的错误会返回 Err
    pub async fn run(&mut self, request: &Request) -> AppResult<UnitResult> {
        info!("📝 请求: {}", request);
        // 资料缓存只在一个单元内有效
        self.lesson_flow.retriever_mut().clear_cache();

        let plan = self.planner.plan(request).await?;
        info!(
            "✓ 课程计划: {} ({} 课, {} 岁)\n{}",
            plan.unit_title, plan.lesson_count, plan.age, plan.summary()
        );

        let mut state = UnitState::new(
            self.pipeline.prior_context_lessons,
            self.pipeline.prior_summary_chars,
        );
        let mut lessons: Vec<LessonResult> = Vec::with_capacity(plan.lessons.len());

        // ========== 逐课处理（严格串行） ==========
        for lesson in &plan.lessons {
            let ctx = LessonCtx::new(lesson.index, plan.lesson_count, plan.unit_title.clone());
            let result = self.lesson_flow.run(lesson, &ctx, &mut state).await;
            if !result.flags.is_clean() {
                warn!("{} ⚠️ 质量标记: {:?}", ctx, result.flags);
            }
            lessons.push(result);
        }

        // ========== 测验 ==========
        let quiz = self
            .quiz_service
            .generate(&plan.unit_title, state.full_summaries(), plan.age)
            .await;

        // ========== 资料清单 ==========
        let bibliography = UnitResult::build_bibliography(&lessons);
        info!("📚 资料清单: {} 条", bibliography.len());

        let dispatcher = self.lesson_flow.dispatcher();
        let quiz_render = dispatcher
            .dispatch(RenderJob::Document(document_builder::quiz_document(
                &plan.unit_title,
                &quiz,
            )))
            .await;
        let sources_render = dispatcher
            .dispatch(RenderJob::Document(document_builder::sources_document(
                &plan.unit_title,
                &bibliography,
            )))
            .await;

        info!("✅ 单元完成: {}", plan.unit_title);

        Ok(UnitResult {
            request: request.clone(),
            plan,
            lessons,
            quiz,
            bibliography,
            quiz_render,
            sources_render,
        })
    }
}
