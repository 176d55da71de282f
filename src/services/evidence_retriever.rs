//! 资料检索服务 - 业务能力层
//!
//! 只负责"给一个主题，拿回一条可用的参考资料"，不关心流程
//!
//! 检索顺序：
//! 1. 缓存命中直接返回
//! 2. 主资料源 + 相关性判定（不相关时换个说法重试，最多 `max_primary_retries` 次）
//! 3. 后备资料源（无条件接受）

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::clients::{clean_query, LookupResult, ResearchSource};
use crate::error::{AppResult, RetrievalError};
use crate::models::{EvidenceItem, Relevance, RetrievalAttempt, RetrievalOutcome, SourceKind};
use crate::services::relevance::{topic_keywords, RelevancePredicate};

/// 资料检索服务
///
/// 职责：
/// - 持有主/后备两个资料源和相关性判定
/// - 持有本次单元运行的资料缓存（唯一写入者）
/// - 不认识 Lesson / Draft
pub struct EvidenceRetriever {
    primary: Box<dyn ResearchSource>,
    secondary: Box<dyn ResearchSource>,
    relevance: Box<dyn RelevancePredicate>,
    max_primary_retries: usize,
    cache: HashMap<String, EvidenceItem>,
}

/// 缓存键：清理、小写、合并空白
pub fn normalize_topic(topic: &str) -> String {
    clean_query(topic)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn year_or_parenthetical_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]*\)|\b\d{1,4}\s*(?:BC|BCE|AD|CE)?\b").ok())
        .as_ref()
}

/// 主资料源的查询序列：原主题 + 最多 `max_retries` 个不同说法（去重）
pub fn reformulations(topic: &str, max_retries: usize) -> Vec<String> {
    let base = clean_query(topic);
    let mut candidates = vec![base.clone()];

    if !base.to_lowercase().contains("history") {
        candidates.push(format!("{} history", base));
    }

    let stripped = match year_or_parenthetical_re() {
        Some(re) => re.replace_all(&base, " ").to_string(),
        None => base.clone(),
    };
    let keywords: Vec<&str> = stripped
        .split_whitespace()
        .filter(|w| {
            let lower = w.to_lowercase();
            topic_keywords(&lower).contains(&lower)
        })
        .collect();
    if !keywords.is_empty() {
        candidates.push(keywords.join(" "));
    }

    let mut seen = Vec::new();
    let mut queries = Vec::new();
    for candidate in candidates {
        let key = normalize_topic(&candidate);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        queries.push(candidate);
    }
    queries.truncate(max_retries + 1);
    queries
}

impl EvidenceRetriever {
    /// 创建新的检索服务
    pub fn new(
        primary: Box<dyn ResearchSource>,
        secondary: Box<dyn ResearchSource>,
        relevance: Box<dyn RelevancePredicate>,
        max_primary_retries: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            relevance,
            max_primary_retries,
            cache: HashMap::new(),
        }
    }

    /// 已缓存的资料
    pub fn cached(&self, topic: &str) -> Option<&EvidenceItem> {
        self.cache.get(&normalize_topic(topic))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// 清空缓存，每个单元开始时调用
    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            debug!("🧹 清空资料缓存: {} 条", self.cache.len());
        }
        self.cache.clear();
    }

    /// 检索一个主题
    ///
    /// 每次对资料源的调用都会追加到 `log`；缓存命中不产生记录。
    /// 失败结果不缓存
    pub async fn retrieve(
        &mut self,
        topic: &str,
        log: &mut Vec<RetrievalAttempt>,
    ) -> AppResult<EvidenceItem> {
        let key = normalize_topic(topic);
        if key.is_empty() {
            return Err(RetrievalError::NoEvidenceFound {
                topic: topic.to_string(),
                attempts: 0,
            }
            .into());
        }

        if let Some(item) = self.cache.get(&key) {
            debug!("📦 缓存命中: {}", key);
            return Ok(item.clone());
        }

        let clean_topic = clean_query(topic);
        let mut attempts = 0;

        // ========== 主资料源（含重试） ==========
        let queries = reformulations(&clean_topic, self.max_primary_retries);
        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                info!(
                    "🔁 换个说法重试 ({}/{}): {}",
                    i, self.max_primary_retries, query
                );
            }
            attempts += 1;

            match self.primary.lookup(query).await {
                Ok(result) if !result.summary.trim().is_empty() => {
                    match self.relevance.judge(&clean_topic, &result) {
                        Some(score) => {
                            info!(
                                "✓ {} 命中: {} (相关性 {:.2})",
                                self.primary.name(),
                                result.title,
                                score
                            );
                            log.push(RetrievalAttempt {
                                query: query.clone(),
                                source_kind: SourceKind::Primary,
                                outcome: RetrievalOutcome::Relevant,
                            });
                            let item = self.to_item(
                                query,
                                SourceKind::Primary,
                                result,
                                Relevance::Matched(score),
                            );
                            self.cache.insert(key, item.clone());
                            return Ok(item);
                        }
                        None => {
                            warn!(
                                "⚠️ {} 返回不相关条目: {} (查询: {})",
                                self.primary.name(),
                                result.title,
                                query
                            );
                            log.push(RetrievalAttempt {
                                query: query.clone(),
                                source_kind: SourceKind::Primary,
                                outcome: RetrievalOutcome::Irrelevant,
                            });
                        }
                    }
                }
                Ok(_) => {
                    log.push(RetrievalAttempt {
                        query: query.clone(),
                        source_kind: SourceKind::Primary,
                        outcome: RetrievalOutcome::Irrelevant,
                    });
                }
                Err(e) => {
                    // 资料源本身出错，直接转后备
                    warn!("⚠️ {} 查询失败: {}", self.primary.name(), e);
                    log.push(RetrievalAttempt {
                        query: query.clone(),
                        source_kind: SourceKind::Primary,
                        outcome: RetrievalOutcome::Failed(e.to_string()),
                    });
                    break;
                }
            }
        }

        // ========== 后备资料源（无条件接受） ==========
        info!("🔍 转用后备资料源 {}: {}", self.secondary.name(), clean_topic);
        attempts += 1;

        match self.secondary.lookup(&clean_topic).await {
            Ok(result) if !result.summary.trim().is_empty() => {
                info!("✓ {} 命中: {}", self.secondary.name(), result.title);
                log.push(RetrievalAttempt {
                    query: clean_topic.clone(),
                    source_kind: SourceKind::Secondary,
                    outcome: RetrievalOutcome::AcceptedFallback,
                });
                let item = self.to_item(
                    &clean_topic,
                    SourceKind::Secondary,
                    result,
                    Relevance::Unchecked,
                );
                self.cache.insert(key, item.clone());
                Ok(item)
            }
            Ok(_) => {
                log.push(RetrievalAttempt {
                    query: clean_topic.clone(),
                    source_kind: SourceKind::Secondary,
                    outcome: RetrievalOutcome::Failed("empty result".to_string()),
                });
                Err(RetrievalError::NoEvidenceFound {
                    topic: clean_topic,
                    attempts,
                }
                .into())
            }
            Err(e) => {
                warn!("⚠️ {} 查询失败: {}", self.secondary.name(), e);
                log.push(RetrievalAttempt {
                    query: clean_topic.clone(),
                    source_kind: SourceKind::Secondary,
                    outcome: RetrievalOutcome::Failed(e.to_string()),
                });
                Err(RetrievalError::NoEvidenceFound {
                    topic: clean_topic,
                    attempts,
                }
                .into())
            }
        }
    }

    fn to_item(
        &self,
        query: &str,
        source_kind: SourceKind,
        result: LookupResult,
        relevance: Relevance,
    ) -> EvidenceItem {
        let source_name = match source_kind {
            SourceKind::Primary => self.primary.name(),
            SourceKind::Secondary => self.secondary.name(),
        };
        EvidenceItem {
            query: query.to_string(),
            source_kind,
            source_name: source_name.to_string(),
            title: result.title,
            url: result.url,
            text: result.summary,
            relevance,
            used: false,
        }
    }
}
