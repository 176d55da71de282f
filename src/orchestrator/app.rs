//! 应用生命周期 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、渲染任务、单元处理器
//! 2. **顺序处理**：请求逐个交给 `UnitProcessor`（一次只运行一个单元）
//! 3. **结果输出**：每个单元的结果 JSON 和报告写入输出目录
//! 4. **资源管理**：唯一持有渲染任务句柄，结束时等待其退出
//! 5. **全局统计**：汇总所有请求的处理结果

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::file_renderer::slugify;
use crate::infrastructure::{spawn_render_worker, FileRenderer};
use crate::models::{Request, UnitResult};
use crate::orchestrator::report::build_report;
use crate::orchestrator::unit_processor::UnitProcessor;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    processor: UnitProcessor,
    render_worker: JoinHandle<usize>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(
            &config.llm_model_name,
            &config.primary_source,
            &config.output_dir,
        );

        let renderer = Arc::new(FileRenderer::new(&config.output_dir));
        let (dispatcher, render_worker) = spawn_render_worker(
            renderer,
            config.pipeline.render_queue_capacity,
            Duration::from_secs(config.pipeline.render_ack_timeout_secs),
        );

        let processor = UnitProcessor::from_config(&config, dispatcher)
            .context("无法创建单元处理器")?;

        Ok(Self {
            config,
            processor,
            render_worker,
        })
    }

    /// 依次处理所有请求，返回成功的单元结果
    pub async fn run(self, requests: Vec<Request>) -> Result<Vec<UnitResult>> {
        let Self {
            config,
            mut processor,
            render_worker,
        } = self;

        if requests.is_empty() {
            warn!("⚠️ 没有待处理的请求，程序结束");
            return Ok(Vec::new());
        }

        let total = requests.len();
        logging::log_requests_loaded(total);

        let mut results = Vec::with_capacity(total);
        let mut failed = 0;

        for (index, request) in requests.iter().enumerate() {
            info!("\n📦 处理第 {}/{} 个请求", index + 1, total);
            match processor.run(request).await {
                Ok(result) => {
                    let report = build_report(&result);
                    println!("{}", report);
                    if let Err(e) = logging::append_log_file(&config.output_log_file, &report) {
                        warn!("⚠️ 报告写入日志失败: {}", e);
                    }
                    match write_unit_result(Path::new(&config.output_dir), &result) {
                        Ok(path) => info!("💾 单元结果已保存: {}", path.display()),
                        Err(e) => warn!("⚠️ 单元结果保存失败: {}", e),
                    }
                    results.push(result);
                }
                Err(e) => {
                    error!("❌ 请求处理失败: {} ({})", request, e);
                    failed += 1;
                }
            }
        }

        info!("📦 资料缓存: {} 条", processor.cached_evidence());

        // 丢弃发送端后渲染任务退出
        drop(processor);
        match render_worker.await {
            Ok(rendered) => info!("🖨️ 渲染任务结束，共写入 {} 个文件", rendered),
            Err(e) => error!("渲染任务异常退出: {}", e),
        }

        logging::print_final_stats(results.len(), failed, total, &config.output_log_file);
        Ok(results)
    }
}

/// 把单元结果写成 JSON，放在产物旁边
fn write_unit_result(output_dir: &Path, result: &UnitResult) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("无法创建目录: {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}_unit_result.json", slugify(&result.plan.unit_title)));
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(&path, json).with_context(|| format!("无法写入文件: {}", path.display()))?;
    Ok(path)
}
