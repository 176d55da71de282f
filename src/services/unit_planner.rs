//! 单元规划服务 - 业务能力层
//!
//! 只负责"把请求变成课程计划"：课时数、主题、年龄、每课的检索主题

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::clients::{clean_query, TextModel};
use crate::config::PipelineConfig;
use crate::error::{AppResult, ValidationError};
use crate::models::{LessonSpec, Request, UnitPlan};
use crate::utils::safe_json_loads;

const MIN_AGE: u8 = 14;
const MAX_AGE: u8 = 18;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Intent {
    topic: Option<String>,
    num_lessons: Option<JsonValue>,
    age: Option<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlan {
    unit_title: Option<String>,
    lessons: Vec<RawLesson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLesson {
    title: Option<String>,
    focus: Option<String>,
    #[serde(alias = "topics_to_research_on_britannica", alias = "topics_to_research_on_wikipedia")]
    research_topics: Vec<String>,
}

/// JSON 中的数字可能是 3、"3" 或 3.0
fn json_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lesson_count_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:^|[\s(])(-?\d+|one|two|three|four|five|six|seven|eight|nine|ten)[\s-]*(?:lessons?|classes|sessions|periods)\b",
        )
        .ok()
    })
    .as_ref()
}

/// 从请求文本中解析 "N lessons"
pub fn extract_lesson_count(text: &str) -> Option<i64> {
    let raw = lesson_count_re()?.captures(text)?.get(1)?.as_str().to_ascii_lowercase();
    let words = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    match words.iter().position(|w| *w == raw) {
        Some(pos) => Some(pos as i64 + 1),
        None => raw.parse().ok(),
    }
}

/// 单元规划服务
pub struct UnitPlanner {
    model: Arc<dyn TextModel>,
    default_lesson_count: usize,
    max_lesson_count: usize,
    default_age: u8,
    max_research_topics: usize,
}

impl UnitPlanner {
    pub fn new(model: Arc<dyn TextModel>, pipeline: &PipelineConfig) -> Self {
        Self {
            model,
            default_lesson_count: pipeline.default_lesson_count.max(1),
            max_lesson_count: pipeline.max_lesson_count,
            default_age: pipeline.default_age,
            max_research_topics: pipeline.max_research_topics.max(1),
        }
    }

    fn validate_count(&self, count: i64) -> AppResult<usize> {
        if count <= 0 || count as u64 > self.max_lesson_count as u64 {
            return Err(ValidationError::InvalidLessonCount {
                count,
                max: self.max_lesson_count,
            }
            .into());
        }
        Ok(count as usize)
    }

    /// 生成课程计划
    ///
    /// 课时数优先级：请求字段 → 文本中的 "N lessons" → 模型解析 → 默认值。
    /// 课时数不合法时在任何模型调用之前返回校验错误（显式给出的情况下）
    pub async fn plan(&self, request: &Request) -> AppResult<UnitPlan> {
        if request.text.trim().is_empty() {
            return Err(ValidationError::EmptyRequest.into());
        }

        let mut lesson_count = match request.lesson_count {
            Some(count) => Some(self.validate_count(count)?),
            None => match extract_lesson_count(&request.text) {
                Some(count) => Some(self.validate_count(count)?),
                None => None,
            },
        };

        // ========== 模型解析主题 / 年龄 ==========
        let intent = self.extract_intent(&request.text).await;

        let topic = intent
            .topic
            .as_deref()
            .map(clean_query)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| clean_query(&request.text));
        if topic.is_empty() {
            return Err(ValidationError::EmptyPlan {
                topic: request.text.clone(),
            }
            .into());
        }

        if lesson_count.is_none() {
            lesson_count = match intent.num_lessons.as_ref().and_then(json_to_i64) {
                Some(count) => Some(self.validate_count(count)?),
                None => None,
            };
        }
        let lesson_count = lesson_count.unwrap_or(self.default_lesson_count);

        let age = request
            .age
            .map(i64::from)
            .or_else(|| intent.age.as_ref().and_then(json_to_i64))
            .map(|a| a.clamp(MIN_AGE as i64, MAX_AGE as i64) as u8)
            .unwrap_or(self.default_age);

        info!("📋 计划: {} 课时, 主题 '{}', 年龄 {}", lesson_count, topic, age);

        // ========== 模型生成课程计划 ==========
        let raw_plan = self.request_plan(&topic, lesson_count).await;
        let unit_title = raw_plan
            .unit_title
            .clone()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| topic.clone());

        let lessons = self.complete_lessons(&topic, lesson_count, raw_plan.lessons);

        Ok(UnitPlan {
            topic,
            unit_title,
            lesson_count,
            age,
            lessons,
        })
    }

    async fn extract_intent(&self, text: &str) -> Intent {
        let prompt = format!(
            "Extract topic, number of lessons, and student age from: \"{}\".\n\
             Return JSON: {{\"topic\": \"...\", \"num_lessons\": 3, \"age\": 16}}\n\
             Use null for num_lessons if not specified.\n\
             Use null for age if not specified. Age should be between 14 and 18.",
            text
        );
        match self.model.complete(&prompt).await {
            Ok(raw) => safe_json_loads(&raw).unwrap_or_else(|| {
                warn!("⚠️ 无法解析请求意图，使用默认值");
                Intent::default()
            }),
            Err(e) => {
                warn!("⚠️ 请求意图解析失败: {}，使用默认值", e);
                Intent::default()
            }
        }
    }

    async fn request_plan(&self, topic: &str, lesson_count: usize) -> RawPlan {
        let prompt = format!(
            "You are an expert history teacher. Create a {n}-lesson unit plan on: \"{topic}\".\n\n\
             Return STRICT JSON:\n\
             {{\n  \"unit_title\": \"Title of the whole unit\",\n  \"lessons\": [\n    \
             {{\"lesson_number\": 1, \"title\": \"Concrete Topic Name\", \"focus\": \"One sentence\", \
             \"research_topics\": [\"Topic 1\", \"Topic 2\"]}}\n  ]\n}}\n\n\
             Requirements:\n\
             - EXACTLY {n} lessons, numbered sequentially\n\
             - Concrete, factual lesson titles (e.g. \"The Storming of the Bastille\")\n\
             - At most {max_topics} research topics per lesson\n\
             - Research topics must be specific and searchable in an encyclopedia: include dates, \
             event names or full names (e.g. \"Treaty of Versailles 1919\", not \"Peace\")",
            n = lesson_count,
            topic = topic,
            max_topics = self.max_research_topics,
        );
        match self.model.complete(&prompt).await {
            Ok(raw) => safe_json_loads(&raw).unwrap_or_else(|| {
                warn!("⚠️ 课程计划 JSON 无法解析，使用默认课时");
                RawPlan::default()
            }),
            Err(e) => {
                warn!("⚠️ 课程计划生成失败: {}，使用默认课时", e);
                RawPlan::default()
            }
        }
    }

    /// 补齐 / 截断为恰好 `lesson_count` 个课时
    fn complete_lessons(&self, topic: &str, lesson_count: usize, raw: Vec<RawLesson>) -> Vec<LessonSpec> {
        let mut raw = raw.into_iter();
        (1..=lesson_count)
            .map(|index| {
                let candidate = raw.next().filter(|l| {
                    l.title.as_deref().map(str::trim).is_some_and(|t| !t.is_empty())
                });
                match candidate {
                    Some(lesson) => {
                        let title = lesson.title.unwrap_or_default().trim().to_string();
                        let topics = self.research_topics(&title, lesson.research_topics);
                        LessonSpec::new(index, title, lesson.focus.unwrap_or_default(), topics)
                    }
                    None => {
                        warn!("⚠️ 第 {} 课缺少计划，使用默认课时", index);
                        self.fallback_lesson(topic, index, lesson_count)
                    }
                }
            })
            .collect()
    }

    /// 默认课时按阶段区分：起因、经过、影响
    fn fallback_lesson(&self, topic: &str, index: usize, lesson_count: usize) -> LessonSpec {
        if lesson_count == 1 {
            return LessonSpec::new(
                index,
                topic.to_string(),
                format!("Key events and figures of {}", topic),
                vec![topic.to_string()],
            );
        }

        let (phase, research_topic) = if index == 1 {
            ("origins and causes", format!("Causes of {}", topic))
        } else if index == lesson_count {
            ("consequences and legacy", format!("Legacy of {}", topic))
        } else {
            ("key events", format!("{} events part {}", topic, index))
        };
        LessonSpec::new(
            index,
            format!("{} - Part {}", topic, index),
            format!("Part {} of {}: the {} of {}", index, lesson_count, phase, topic),
            vec![research_topic],
        )
    }

    /// 清理、去重（忽略大小写）、截断；为空时用课时标题
    fn research_topics(&self, title: &str, topics: Vec<String>) -> Vec<String> {
        let mut seen = Vec::new();
        let mut result = Vec::new();
        for topic in topics {
            let cleaned = clean_query(&topic);
            let key = cleaned.to_lowercase();
            if cleaned.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            result.push(cleaned);
            if result.len() == self.max_research_topics {
                break;
            }
        }
        if result.is_empty() {
            result.push(title.to_string());
        }
        result
    }
}
