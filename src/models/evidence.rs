use serde::{Deserialize, Serialize};

/// 资料来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// 主资料源（经过相关性校验）
    Primary,
    /// 后备资料源（无条件接受）
    Secondary,
}

/// 相关性标记
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Relevance {
    /// 通过相关性判定，附带得分
    Matched(f64),
    /// 未经判定（后备资料源）
    Unchecked,
}

/// 一条检索到的参考资料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// 实际命中的查询词
    pub query: String,
    pub source_kind: SourceKind,
    /// 资料源名称，如 "Encyclopaedia Britannica"
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub text: String,
    pub relevance: Relevance,
    /// 仅由资料过滤步骤置为 true
    pub used: bool,
}

impl EvidenceItem {
    /// 书目去重键
    pub fn bibliography_key(&self) -> (SourceKind, String, String) {
        (
            self.source_kind,
            self.title.trim().to_lowercase(),
            self.url.trim().to_string(),
        )
    }

    /// 用于提示词的资料块
    pub fn as_prompt_block(&self) -> String {
        format!(
            "--- article: {} ({}) ---\n{}\n",
            self.title, self.source_name, self.text
        )
    }
}

/// 单次检索尝试的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RetrievalOutcome {
    Relevant,
    Irrelevant,
    Failed(String),
    AcceptedFallback,
}

/// 检索尝试记录（无论成功与否都会记录）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalAttempt {
    pub query: String,
    pub source_kind: SourceKind,
    pub outcome: RetrievalOutcome,
}
