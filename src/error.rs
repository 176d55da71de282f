use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求或课程计划校验错误（整个请求失败）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 资料检索错误
    #[error("检索错误: {0}")]
    Retrieval(#[from] RetrievalError),
    /// 内容生成错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 渲染通道错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 请求校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 请求文本为空
    #[error("请求内容不能为空")]
    EmptyRequest,
    /// 课时数不合法
    #[error("课时数 {count} 不合法，必须在 [1, {max}] 范围内")]
    InvalidLessonCount { count: i64, max: usize },
    /// 课程计划中没有任何课时
    #[error("课程计划为空: {topic}")]
    EmptyPlan { topic: String },
}

/// 资料检索错误
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// 主资料源、重试和后备资料源全部失败
    #[error("未找到资料: {topic} (共尝试 {attempts} 次)")]
    NoEvidenceFound { topic: String, attempts: usize },
    /// 资料源调用失败
    #[error("资料源 {source_name} 查询失败 ({query}): {source}")]
    SourceFailed {
        source_name: String,
        query: String,
        #[source]
        source: BoxedSource,
    },
    /// 资料源返回空结果
    #[error("资料源 {source_name} 未返回结果: {query}")]
    EmptyResult { source_name: String, query: String },
}

/// 内容生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 模型返回空内容或无法解析（已经过客户端内部重试）
    #[error("内容生成失败 ({lesson}): {reason}")]
    GenerationFailed { lesson: String, reason: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}, 已重试 {attempts} 次): {source}")]
    ApiCallFailed {
        model: String,
        attempts: usize,
        #[source]
        source: BoxedSource,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 请求构建失败
    #[error("LLM请求构建失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: BoxedSource,
    },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: BoxedSource,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}")]
    BadResponse { endpoint: String, status: u16 },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: BoxedSource,
    },
}

/// 渲染通道错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 渲染任务已退出，通道关闭
    #[error("渲染通道已关闭")]
    ChannelClosed,
    /// 渲染器写文件失败
    #[error("渲染失败 ({title}): {reason}")]
    WriteFailed { title: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 未知的资料源名称
    #[error("未知的资料源: {name}")]
    UnknownSource { name: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建资料源查询失败错误
    pub fn source_failed(
        source_name: impl Into<String>,
        query: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Retrieval(RetrievalError::SourceFailed {
            source_name: source_name.into(),
            query: query.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        attempts: usize,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            attempts,
            source: Box::new(source),
        })
    }

    /// 创建内容生成失败错误
    pub fn generation_failed(lesson: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Generation(GenerationError::GenerationFailed {
            lesson: lesson.into(),
            reason: reason.into(),
        })
    }

    /// 是否属于"整个请求失败"的校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
