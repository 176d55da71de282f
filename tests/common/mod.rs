#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use lesson_pipeline::clients::{LookupResult, ResearchSource, TextModel};
use lesson_pipeline::error::{AppError, AppResult, RetrievalError};
use lesson_pipeline::services::{EvidenceRetriever, KeywordRelevance};
use lesson_pipeline::{spawn_render_worker, PipelineConfig, RenderJob, Renderer, UnitProcessor};

pub const GO: &str = "GO/NO-GO: GO\nConfidence: High\nReason: All claims are supported.\nWarnings: None";
pub const NO_GO: &str = "GO/NO-GO: NO-GO\nConfidence: Medium\nReason: One claim is unsupported.\n\
                         Warnings:\n- The number of deputies is not stated in the evidence";

pub const EVIDENCE_TEXT: &str = "The Estates-General assembled at Versailles in May 1789. \
                                 Revolutionaries stormed the Bastille prison in July.";

const DRAFT: &str = "The Estates-General\n\
                     The Estates-General assembled at Versailles in May 1789. Deputies argued over voting.\n\n\
                     The Bastille\n\
                     Revolutionaries stormed the Bastille prison in July. The fortress fell within hours.";

/// 按提示词内容路由的脚本化文本模型
pub struct PipelineModel {
    lessons: Vec<(String, Vec<String>)>,
    verdicts: Mutex<VecDeque<String>>,
    pub calls: AtomicUsize,
    pub draft_prompts: Mutex<Vec<String>>,
}

impl PipelineModel {
    /// `lessons`: (课时标题, 检索主题)；`verdicts`: 按顺序返回的核查结果，用完后一律 GO
    pub fn new(lessons: &[(&str, &[&str])], verdicts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            lessons: lessons
                .iter()
                .map(|(title, topics)| {
                    (title.to_string(), topics.iter().map(|t| t.to_string()).collect())
                })
                .collect(),
            verdicts: Mutex::new(verdicts.iter().map(|v| v.to_string()).collect()),
            calls: AtomicUsize::new(0),
            draft_prompts: Mutex::new(Vec::new()),
        })
    }

    fn plan_json(&self) -> String {
        let lessons: Vec<serde_json::Value> = self
            .lessons
            .iter()
            .enumerate()
            .map(|(i, (title, topics))| {
                serde_json::json!({
                    "lesson_number": i + 1,
                    "title": title,
                    "focus": format!("Key facts about {}", title),
                    "research_topics": topics,
                })
            })
            .collect();
        serde_json::json!({ "unit_title": "The French Revolution", "lessons": lessons }).to_string()
    }
}

#[async_trait]
impl TextModel for PipelineModel {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if prompt.starts_with("Extract topic") {
            return Ok(r#"{"topic": "French Revolution", "num_lessons": null, "age": 16}"#.to_string());
        }
        if prompt.contains("unit plan on") {
            return Ok(self.plan_json());
        }
        if prompt.contains("fact-checking agent") {
            let next = self.verdicts.lock().unwrap().pop_front();
            return Ok(next.unwrap_or_else(|| GO.to_string()));
        }
        if prompt.contains("creating a quiz") {
            return Ok(r#"{"questions": ["When did the Estates-General meet?", "Why was the Bastille stormed?"]}"#.to_string());
        }

        self.draft_prompts.lock().unwrap().push(prompt.to_string());
        Ok(DRAFT.to_string())
    }
}

pub type LookupFn = fn(&str) -> AppResult<LookupResult>;

/// 脚本化资料源，记录调用次数
pub struct ScriptedSource {
    name: &'static str,
    lookup_fn: LookupFn,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(name: &'static str, lookup_fn: LookupFn) -> (Box<dyn ResearchSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source: Box<dyn ResearchSource> = Box::new(Self {
            name,
            lookup_fn,
            calls: calls.clone(),
        });
        (source, calls)
    }
}

#[async_trait]
impl ResearchSource for ScriptedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn lookup(&self, query: &str) -> AppResult<LookupResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.lookup_fn)(query)
    }
}

/// 返回与查询同名、内容固定的条目
pub fn relevant_lookup(query: &str) -> AppResult<LookupResult> {
    let title = query.trim_end_matches(" history").to_string();
    Ok(LookupResult {
        url: format!("https://example.org/{}", title.replace(' ', "_")),
        summary: format!("{}. {}", title, EVIDENCE_TEXT),
        title,
        relevance_signal: None,
    })
}

/// 同名但无关的条目
pub fn irrelevant_lookup(_query: &str) -> AppResult<LookupResult> {
    Ok(LookupResult {
        title: "Marathon".to_string(),
        summary: "A long-distance running race held on roads.".to_string(),
        url: "https://example.org/Marathon".to_string(),
        relevance_signal: None,
    })
}

pub fn failing_lookup(query: &str) -> AppResult<LookupResult> {
    Err(RetrievalError::EmptyResult {
        source_name: "offline".to_string(),
        query: query.to_string(),
    }
    .into())
}

/// 记录渲染任务；幻灯片可设置延迟
pub struct RecordingRenderer {
    pub titles: Mutex<Vec<String>>,
    slide_delay: Duration,
}

impl RecordingRenderer {
    pub fn new(slide_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            titles: Mutex::new(Vec::new()),
            slide_delay,
        })
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn write(&self, job: &RenderJob) -> AppResult<PathBuf> {
        if matches!(job, RenderJob::Slides(_)) && !self.slide_delay.is_zero() {
            tokio::time::sleep(self.slide_delay).await;
        }
        self.titles.lock().unwrap().push(job.title().to_string());
        if job.title().is_empty() {
            return Err(AppError::Other("empty title".to_string()));
        }
        Ok(PathBuf::from(format!("/rendered/{}", job.title())))
    }
}

pub fn test_pipeline() -> PipelineConfig {
    PipelineConfig {
        section_target: 2,
        render_ack_timeout_secs: 5,
        ..PipelineConfig::default()
    }
}

pub struct Harness {
    pub processor: UnitProcessor,
    pub worker: JoinHandle<usize>,
}

pub fn build(
    model: Arc<PipelineModel>,
    primary: Box<dyn ResearchSource>,
    secondary: Box<dyn ResearchSource>,
    renderer: Arc<RecordingRenderer>,
    pipeline: PipelineConfig,
    ack_timeout: Duration,
) -> Harness {
    let retriever = EvidenceRetriever::new(
        primary,
        secondary,
        Box::new(KeywordRelevance::new(pipeline.relevance_threshold)),
        pipeline.max_primary_retries,
    );
    let (dispatcher, worker) =
        spawn_render_worker(renderer, pipeline.render_queue_capacity, ack_timeout);
    Harness {
        processor: UnitProcessor::new(pipeline, model, retriever, dispatcher),
        worker,
    }
}
