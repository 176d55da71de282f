use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use lesson_pipeline::models::{load_all_request_files, load_request_file};
use lesson_pipeline::utils::logging;
use lesson_pipeline::{App, Config, Request};

const USAGE: &str = "用法: lesson_pipeline [--config <config.toml>] <请求文本 | request.toml | 请求目录>";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut input: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => bail!("{}", USAGE),
            },
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => input.push(arg),
        }
    }
    if input.is_empty() {
        bail!("{}", USAGE);
    }

    // 加载配置
    let config = match &config_path {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    let requests = load_requests(&input.join(" ")).await?;

    // 初始化并运行应用
    App::initialize(config).await?.run(requests).await?;

    Ok(())
}

/// 参数可以是目录、TOML 文件或自由文本
async fn load_requests(input: &str) -> Result<Vec<Request>> {
    let path = Path::new(input);
    if path.is_dir() {
        return Ok(load_all_request_files(input).await?);
    }
    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("toml") {
        return Ok(vec![load_request_file(path).await?]);
    }
    Ok(vec![Request::new(input)])
}
