//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责请求级和单元级的流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 初始化日志文件、渲染任务、单元处理器
//! - 逐个处理请求（一次只运行一个单元）
//! - 保存单元结果，输出全局统计信息
//!
//! ### `unit_processor` - 单元处理器
//! - 课程规划（校验失败直接返回）
//! - 按顺序把每节课交给 LessonFlow
//! - 测验、资料清单、渲染
//!
//! ### `report` - 最终报告
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Vec<Request>)
//!     ↓
//! unit_processor (处理 Vec<LessonSpec>)
//!     ↓
//! workflow::LessonFlow (处理单个 LessonSpec)
//!     ↓
//! services (能力层：检索 / 生成 / 核查 / 过滤 / 幻灯片 / 测验)
//!     ↓
//! infrastructure (基础设施：渲染通道、文件渲染器)
//! ```

pub mod app;
pub mod report;
pub mod unit_processor;

pub use app::App;
pub use report::build_report;
pub use unit_processor::UnitProcessor;
