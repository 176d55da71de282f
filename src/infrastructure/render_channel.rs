//! 渲染分发通道 - 基础设施层
//!
//! 有界 mpsc 队列 + oneshot 确认，只负责"把结构交给渲染器并等回执"，
//! 不认识课时 / 单元

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, RenderError};
use crate::models::{DocumentStructure, RenderStatus, SlideStructure};

/// 渲染任务，入队后不再修改
#[derive(Debug, Clone)]
pub enum RenderJob {
    Slides(SlideStructure),
    Document(DocumentStructure),
}

impl RenderJob {
    pub fn title(&self) -> &str {
        match self {
            RenderJob::Slides(deck) => &deck.deck_title,
            RenderJob::Document(doc) => &doc.title,
        }
    }
}

/// 队列中的一条请求
pub struct RenderRequest {
    pub job: RenderJob,
    pub ack: oneshot::Sender<AppResult<PathBuf>>,
}

/// 渲染器：把结构写成文件，返回文件路径
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn write(&self, job: &RenderJob) -> AppResult<PathBuf>;
}

/// 渲染队列的发送端
///
/// 职责：
/// - 把任务移入队列
/// - 在限定时间内等待确认
/// - 不重试、不写文件
#[derive(Clone)]
pub struct RenderDispatcher {
    sender: mpsc::Sender<RenderRequest>,
    ack_timeout: Duration,
}

/// 创建通道，返回发送端和接收端（接收端交给 `run_render_worker`）
pub fn channel(
    capacity: usize,
    ack_timeout: Duration,
) -> (RenderDispatcher, mpsc::Receiver<RenderRequest>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        RenderDispatcher {
            sender,
            ack_timeout,
        },
        receiver,
    )
}

/// 创建通道并启动渲染任务
///
/// 所有发送端被丢弃后渲染任务退出，JoinHandle 返回成功渲染的数量
pub fn spawn_render_worker(
    renderer: Arc<dyn Renderer>,
    capacity: usize,
    ack_timeout: Duration,
) -> (RenderDispatcher, JoinHandle<usize>) {
    let (dispatcher, receiver) = channel(capacity, ack_timeout);
    let handle = tokio::spawn(run_render_worker(renderer, receiver));
    (dispatcher, handle)
}

/// 渲染任务主循环
pub async fn run_render_worker(
    renderer: Arc<dyn Renderer>,
    mut receiver: mpsc::Receiver<RenderRequest>,
) -> usize {
    let mut rendered = 0;

    while let Some(RenderRequest { job, ack }) = receiver.recv().await {
        let result = renderer.write(&job).await;
        match &result {
            Ok(path) => {
                rendered += 1;
                debug!("🖨️ 已渲染: {} -> {}", job.title(), path.display());
            }
            Err(e) => warn!("⚠️ 渲染失败: {} ({})", job.title(), e),
        }

        if ack.send(result).is_err() {
            debug!("确认已无人等待（可能已超时）: {}", job.title());
        }
    }

    debug!("渲染任务退出，共渲染 {} 个文件", rendered);
    rendered
}

impl RenderDispatcher {
    /// 入队并等待确认；入队和确认共用一个超时
    pub async fn dispatch(&self, job: RenderJob) -> RenderStatus {
        let title = job.title().to_string();
        let (ack, ack_rx) = oneshot::channel();

        let waited = tokio::time::timeout(self.ack_timeout, async {
            self.sender
                .send(RenderRequest { job, ack })
                .await
                .map_err(|_| AppError::from(RenderError::ChannelClosed))?;
            ack_rx
                .await
                .map_err(|_| AppError::from(RenderError::ChannelClosed))?
        })
        .await;

        match waited {
            Ok(Ok(path)) => RenderStatus::Rendered(path),
            Ok(Err(e)) => RenderStatus::Failed(e.to_string()),
            Err(_) => {
                warn!(
                    "⏱️ 渲染确认超时 ({}s): {}",
                    self.ack_timeout.as_secs_f64(),
                    title
                );
                RenderStatus::TimedOut
            }
        }
    }
}
