//! # Lesson Pipeline
//!
//! 把自然语言的教学请求（如 "3 lessons on the French Revolution"）转换为
//! 经过核查的历史课程包：幻灯片、教师指南、测验和资料清单
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 渲染分发通道和文件渲染器，只暴露"写文件"能力
//! - `RenderDispatcher` - 有界队列 + 确认回执，超时不阻塞流程
//!
//! ### ② 业务能力层（Clients / Services）
//! - `clients/` - 文本模型、资料源（Britannica / Wikipedia）
//! - `services/` - 描述"我能做什么"，只处理单节课
//! - `EvidenceRetriever` - 检索、相关性判定、换说法重试、后备资料源
//! - `ContentGenerator` / `FactChecker` - 生成草稿、核查草稿
//! - `EvidenceFilter` - 只保留最终稿实际用到的资料
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一节课"的完整处理流程
//! - `RevisionController` - 生成-核查修订状态机
//! - `LessonFlow` - 检索 → 修订 → 过滤 → 渲染
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用生命周期，逐个处理请求
//! - `orchestrator/unit_processor` - 单元处理器，遍历课时列表
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, PipelineConfig};
pub use error::{AppError, AppResult};
pub use infrastructure::{spawn_render_worker, FileRenderer, RenderDispatcher, RenderJob, Renderer};
pub use models::{LessonResult, LessonSpec, Request, UnitPlan, UnitResult};
pub use orchestrator::{build_report, App, UnitProcessor};
pub use workflow::{LessonCtx, LessonFlow, RevisionController};
