//! 资料源客户端 - 能力层
//!
//! 只负责"按查询词取回一段参考资料"，不做相关性判断、不做重试
//!
//! - `BritannicaClient`：搜索页 HTML → 第一个 /topic 链接 → 文章 meta description
//! - `WikipediaClient`：REST summary 接口，找不到时用 opensearch 解析标题

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, ConfigError, RetrievalError};

/// 单次查询的返回
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub title: String,
    pub summary: String,
    pub url: String,
    /// 资料源自带的相关性信号（0.0 - 1.0），没有则为 None
    pub relevance_signal: Option<f64>,
}

/// 资料源能力
///
/// 主资料源和后备资料源是同一能力的两个独立实现
#[async_trait]
pub trait ResearchSource: Send + Sync {
    /// 展示用名称，如 "Encyclopaedia Britannica"
    fn name(&self) -> &str;

    async fn lookup(&self, query: &str) -> AppResult<LookupResult>;
}

/// 清理查询词中的杂质（尖括号、首尾标点）
pub fn clean_query(query: &str) -> String {
    let without_brackets: String = query.trim().chars().filter(|c| *c != '<' && *c != '>').collect();
    without_brackets
        .trim()
        .trim_matches(|c: char| " ?!./\\\"'".contains(c))
        .to_string()
}

fn build_http_client(config: &Config) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.research_timeout_secs))
        .user_agent(config.research_user_agent.clone())
        .build()
        .map_err(|e| AppError::api_request_failed("http client", e))
}

/// 按配置组装 (主资料源, 后备资料源)
pub fn build_sources(
    config: &Config,
) -> AppResult<(Box<dyn ResearchSource>, Box<dyn ResearchSource>)> {
    let britannica: Box<dyn ResearchSource> = Box::new(BritannicaClient::new(config)?);
    let wikipedia: Box<dyn ResearchSource> = Box::new(WikipediaClient::new(config)?);

    match config.primary_source.trim().to_ascii_lowercase().as_str() {
        "britannica" => Ok((britannica, wikipedia)),
        "wikipedia" => Ok((wikipedia, britannica)),
        other => Err(ConfigError::UnknownSource {
            name: other.to_string(),
        }
        .into()),
    }
}

// ========== Wikipedia ==========

/// Wikipedia REST summary 客户端
pub struct WikipediaClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WikiSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(rename = "type", default)]
    page_type: String,
    #[serde(default)]
    content_urls: Option<WikiContentUrls>,
}

#[derive(Debug, Deserialize)]
struct WikiContentUrls {
    desktop: Option<WikiPageUrl>,
}

#[derive(Debug, Deserialize)]
struct WikiPageUrl {
    page: String,
}

impl WikipediaClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: "https://en.wikipedia.org".to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::api_request_failed(&self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Other(format!("无法构建 URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 直接按标题取摘要；404 / 消歧义页返回 None
    async fn fetch_summary(&self, title: &str) -> AppResult<Option<LookupResult>> {
        let page_title = title.replace(' ', "_");
        let url = self.endpoint(&["api", "rest_v1", "page", "summary", &page_title])?;
        let endpoint = url.to_string();
        debug!("Wikipedia summary: {}", endpoint);

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ApiError::BadResponse {
                endpoint,
                status: response.status().as_u16(),
            }
            .into());
        }

        let summary: WikiSummary = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        if summary.extract.trim().is_empty() || summary.page_type == "disambiguation" {
            return Ok(None);
        }

        let url = summary
            .content_urls
            .and_then(|c| c.desktop)
            .map(|d| d.page)
            .unwrap_or_else(|| format!("{}/wiki/{}", self.base_url, page_title));

        Ok(Some(LookupResult {
            title: summary.title,
            summary: summary.extract.trim().to_string(),
            url,
            relevance_signal: None,
        }))
    }

    /// opensearch 取最匹配的条目标题
    async fn resolve_title(&self, query: &str) -> AppResult<Option<String>> {
        let mut url = self.endpoint(&["w", "api.php"])?;
        url.query_pairs_mut()
            .append_pair("action", "opensearch")
            .append_pair("search", query)
            .append_pair("limit", "1")
            .append_pair("namespace", "0")
            .append_pair("format", "json");
        let endpoint = url.to_string();

        let data: JsonValue = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        Ok(data
            .get(1)
            .and_then(|titles| titles.get(0))
            .and_then(|t| t.as_str())
            .map(str::to_string))
    }
}

#[async_trait]
impl ResearchSource for WikipediaClient {
    fn name(&self) -> &str {
        "Wikipedia"
    }

    async fn lookup(&self, query: &str) -> AppResult<LookupResult> {
        let query = clean_query(query);
        let empty = || -> AppError {
            RetrievalError::EmptyResult {
                source_name: "Wikipedia".to_string(),
                query: query.clone(),
            }
            .into()
        };
        if query.is_empty() {
            return Err(empty());
        }

        if let Some(result) = self.fetch_summary(&query).await? {
            return Ok(result);
        }

        let title = self.resolve_title(&query).await?.ok_or_else(empty)?;
        self.fetch_summary(&title).await?.ok_or_else(empty)
    }
}

// ========== Britannica ==========

/// Britannica 客户端（解析搜索页和文章页 HTML）
pub struct BritannicaClient {
    http: Client,
    base_url: String,
}

fn topic_link_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r##"href="(/(?:topic|event|biography|place)/[^"#?]+)""##).ok())
        .as_ref()
}

fn meta_description_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<meta\s+(?:name|property)="(?:og:)?description"\s+content="([^"]*)""#).ok()
    })
    .as_ref()
}

fn title_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title>(.*?)</title>").ok())
        .as_ref()
}

/// 搜索结果页中第一个文章链接
fn extract_first_article_path(html: &str) -> Option<String> {
    topic_link_re()?
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_meta_description(html: &str) -> Option<String> {
    meta_description_re()?
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
}

/// 文章标题（去掉 " | Britannica" 后缀）
fn extract_title(html: &str) -> Option<String> {
    let raw = title_re()?.captures(html)?.get(1)?.as_str();
    let title = raw.split('|').next().unwrap_or(raw).trim();
    let title = title.split(" - ").next().unwrap_or(title).trim();
    (!title.is_empty()).then(|| decode_entities(title))
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
}

impl BritannicaClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: "https://www.britannica.com".to_string(),
        })
    }

    async fn get_html(&self, url: Url) -> AppResult<String> {
        let endpoint = url.to_string();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        if !response.status().is_success() {
            return Err(ApiError::BadResponse {
                endpoint,
                status: response.status().as_u16(),
            }
            .into());
        }

        response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))
    }
}

#[async_trait]
impl ResearchSource for BritannicaClient {
    fn name(&self) -> &str {
        "Encyclopaedia Britannica"
    }

    async fn lookup(&self, query: &str) -> AppResult<LookupResult> {
        let query = clean_query(query);
        let empty = || -> AppError {
            RetrievalError::EmptyResult {
                source_name: "Encyclopaedia Britannica".to_string(),
                query: query.clone(),
            }
            .into()
        };
        if query.is_empty() {
            return Err(empty());
        }

        let mut search_url = Url::parse(&self.base_url)
            .map_err(|e| AppError::api_request_failed(&self.base_url, e))?
            .join("/search")
            .map_err(|e| AppError::api_request_failed(&self.base_url, e))?;
        search_url.query_pairs_mut().append_pair("query", &query);
        debug!("Britannica search: {}", search_url);

        let search_html = self.get_html(search_url).await?;
        let article_path = extract_first_article_path(&search_html).ok_or_else(empty)?;

        let article_url = Url::parse(&self.base_url)
            .and_then(|base| base.join(&article_path))
            .map_err(|e| AppError::api_request_failed(&article_path, e))?;
        let article_html = self.get_html(article_url.clone()).await?;

        let summary = extract_meta_description(&article_html).ok_or_else(empty)?;
        let title = extract_title(&article_html).unwrap_or_else(|| query.clone());

        Ok(LookupResult {
            title,
            summary,
            url: article_url.to_string(),
            relevance_signal: None,
        })
    }
}
