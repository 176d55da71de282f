use serde::Deserialize;
use std::path::Path;

use crate::error::{AppResult, FileError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 输出目录（幻灯片、教师指南、测验、资料清单）
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// LLM 客户端内部重试次数
    pub llm_max_retries: usize,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 资料源配置 ---
    /// 主资料源：britannica / wikipedia，另一个作为后备
    pub primary_source: String,
    pub research_timeout_secs: u64,
    pub research_user_agent: String,
    /// 流水线参数（重试上限、幻灯片目标等）
    pub pipeline: PipelineConfig,
}

/// 流水线参数
///
/// 构造 `UnitProcessor` 时显式传入，不作为全局状态引用。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 每课正文段落数（= 内容幻灯片数）
    pub section_target: usize,
    /// 思考题幻灯片插入位置（在第 n 张内容幻灯片之后）
    pub question_slide_positions: Vec<usize>,
    /// 主资料源相关性不足时的最大重试次数
    pub max_primary_retries: usize,
    /// 生成-核查循环最大尝试次数（含首次生成）
    pub max_fact_check_attempts: usize,
    /// 每课最多检索的主题数
    pub max_research_topics: usize,
    /// 相关性判定阈值（关键词命中比例）
    pub relevance_threshold: f64,
    /// 资料被判定为"已使用"所需的最少共同关键词数
    pub evidence_min_overlap: usize,
    /// 等待渲染确认的最长时间（秒）
    pub render_ack_timeout_secs: u64,
    /// 渲染队列容量
    pub render_queue_capacity: usize,
    pub default_lesson_count: usize,
    pub max_lesson_count: usize,
    pub default_age: u8,
    pub quiz_question_count: usize,
    /// 作为上下文传给下一课的历史课时数
    pub prior_context_lessons: usize,
    /// 每条历史课时摘要的最大字符数
    pub prior_summary_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            section_target: 30,
            question_slide_positions: vec![10, 20],
            max_primary_retries: 2,
            max_fact_check_attempts: 4,
            max_research_topics: 5,
            relevance_threshold: 0.5,
            evidence_min_overlap: 3,
            render_ack_timeout_secs: 30,
            render_queue_capacity: 8,
            default_lesson_count: 1,
            max_lesson_count: 10,
            default_age: 16,
            quiz_question_count: 10,
            prior_context_lessons: 2,
            prior_summary_chars: 1000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: "outputs".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://router.huggingface.co/v1".to_string(),
            llm_model_name: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            llm_max_retries: 3,
            llm_temperature: 0.7,
            llm_max_tokens: 2000,
            primary_source: "britannica".to_string(),
            research_timeout_secs: 10,
            research_user_agent: "lesson-pipeline/0.1 (history lesson builder)".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值，环境变量仍可覆盖
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FileError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        let default = self;
        let pipeline = default.pipeline.clone();
        Self {
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_max_retries: env_parse("LLM_MAX_RETRIES").unwrap_or(default.llm_max_retries),
            llm_temperature: env_parse("LLM_TEMPERATURE").unwrap_or(default.llm_temperature),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(default.llm_max_tokens),
            primary_source: std::env::var("PRIMARY_SOURCE").unwrap_or(default.primary_source),
            research_timeout_secs: env_parse("RESEARCH_TIMEOUT_SECS").unwrap_or(default.research_timeout_secs),
            research_user_agent: std::env::var("RESEARCH_USER_AGENT").unwrap_or(default.research_user_agent),
            pipeline: PipelineConfig {
                section_target: env_parse("SECTION_TARGET").unwrap_or(pipeline.section_target),
                max_primary_retries: env_parse("MAX_PRIMARY_RETRIES").unwrap_or(pipeline.max_primary_retries),
                max_fact_check_attempts: env_parse("MAX_FACT_CHECK_ATTEMPTS").unwrap_or(pipeline.max_fact_check_attempts),
                render_ack_timeout_secs: env_parse("RENDER_ACK_TIMEOUT_SECS").unwrap_or(pipeline.render_ack_timeout_secs),
                max_lesson_count: env_parse("MAX_LESSON_COUNT").unwrap_or(pipeline.max_lesson_count),
                ..pipeline
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.max_primary_retries, 2);
        assert_eq!(pipeline.max_fact_check_attempts, 4);
        assert_eq!(pipeline.question_slide_positions, vec![10, 20]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            output_dir = "lessons"
            primary_source = "wikipedia"

            [pipeline]
            section_target = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, "lessons");
        assert_eq!(config.primary_source, "wikipedia");
        assert_eq!(config.pipeline.section_target, 12);
        assert_eq!(config.pipeline.max_fact_check_attempts, 4);
        assert_eq!(config.llm_max_retries, 3);
    }
}
