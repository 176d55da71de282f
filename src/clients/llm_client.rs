//! LLM 客户端 - 能力层
//!
//! 只负责"把提示词发给模型并拿回文本"，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 HuggingFace Router, Azure, DeepSeek 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 文本模型能力
///
/// 内容生成、事实核查、课程规划、测验生成都只依赖这一个方法
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

/// OpenAI 兼容的文本模型
///
/// 职责：
/// - 调用 chat completion 接口
/// - 自带有限次数的重试（网络错误、空内容）
/// - 不认识 Lesson / Evidence
pub struct OpenAiTextModel {
    client: Client<OpenAIConfig>,
    model_name: String,
    system_message: Option<String>,
    max_retries: usize,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiTextModel {
    /// 创建新的文本模型客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            system_message: Some(
                "You are an expert history teacher and instructional designer. \
                 Follow output formats exactly."
                    .to_string(),
            ),
            max_retries: config.llm_max_retries.max(1),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// 单次调用，不重试
    async fn send_once(&self, user_message: &str) -> AppResult<String> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = &self.system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg.as_str())
                .build()
                .map_err(|e| LlmError::RequestBuildFailed { source: Box::new(e) })?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| LlmError::RequestBuildFailed { source: Box::new(e) })?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::RequestBuildFailed { source: Box::new(e) })?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::llm_api_failed(&self.model_name, 1, e))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::EmptyContent {
                model: self.model_name.clone(),
            }
            .into());
        }

        Ok(content)
    }
}

#[async_trait]
impl TextModel for OpenAiTextModel {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", prompt.len());

        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            match self.send_once(prompt).await {
                Ok(content) => {
                    debug!("LLM API 调用成功 (第 {} 次)", attempt);
                    return Ok(content);
                }
                Err(e) => {
                    warn!(
                        "LLM 调用失败 (尝试 {}/{}): {}",
                        attempt, self.max_retries, e
                    );
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        sleep(Duration::from_millis(500 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(match last_error {
            Some(AppError::Llm(LlmError::ApiCallFailed { model, source, .. })) => {
                LlmError::ApiCallFailed {
                    model,
                    attempts: self.max_retries,
                    source,
                }
                .into()
            }
            Some(other) => other,
            None => LlmError::EmptyContent {
                model: self.model_name.clone(),
            }
            .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试 LLM API 连接性
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_complete_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_complete_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let model = OpenAiTextModel::new(&Config::from_env());
        let result = model
            .complete("In one sentence: when was the Bastille stormed?")
            .await;

        match result {
            Ok(response) => {
                println!("LLM 响应: {}", response);
                assert!(!response.is_empty());
            }
            Err(e) => panic!("LLM 调用失败: {}", e),
        }
    }

    #[test]
    fn test_retries_at_least_once() {
        let config = Config {
            llm_max_retries: 0,
            ..Config::default()
        };
        let model = OpenAiTextModel::new(&config);
        assert_eq!(model.max_retries, 1);
    }
}
