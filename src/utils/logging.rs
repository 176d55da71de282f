/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`；未设置时 verbose 为 debug，否则 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lesson_pipeline={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n课程包生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 追加一段文本到日志文件
pub fn append_log_file(log_file_path: &str, text: &str) -> AppResult<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(model_name: &str, primary_source: &str, output_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 课程包生成模式");
    info!("🤖 模型: {}", model_name);
    info!("📚 主资料源: {}", primary_source);
    info!("📁 输出目录: {}", output_dir);
    info!("{}", "=".repeat(60));
}

/// 记录请求加载信息
pub fn log_requests_loaded(total: usize) {
    info!("✓ 找到 {} 个待处理的请求", total);
    info!("💡 请求按顺序逐个处理\n");
}

/// 记录课时开始信息
///
/// # 参数
/// - `lesson_index`: 课时编号
/// - `total`: 课时总数
/// - `title`: 课时标题
pub fn log_lesson_start(lesson_index: usize, total: usize, title: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📖 开始处理第 {}/{} 课: {}", lesson_index, total, title);
    info!("{}", "=".repeat(60));
}

/// 记录课时完成信息
pub fn log_lesson_complete(lesson_index: usize, status: &str, evidence_used: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 课完成: {} | 采用资料 {} 条",
        lesson_index, status, evidence_used
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功的请求数
/// - `failed`: 失败的请求数
/// - `total`: 总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Napoleon", 3), "Nap...");
        assert_eq!(truncate_text("Napoleon", 20), "Napoleon");
        assert_eq!(truncate_text("法国大革命", 2), "法国...");
    }

    #[test]
    fn test_log_file_header_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log_file(path, "report body\n").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("课程包生成日志"));
        assert!(content.ends_with("report body\n"));
    }
}
