//! 测验生成服务 - 业务能力层
//!
//! 按学生年龄分级出题；失败只标记，不影响整个单元

use phf::phf_map;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::TextModel;
use crate::models::{QuizRecord, QuizTier};
use crate::utils::{safe_json_loads, truncate_text};

/// 合并后的课时摘要最大字符数
const SUMMARY_CHAR_LIMIT: usize = 4000;

/// 各难度的出题要求
static TIER_GUIDANCE: phf::Map<&'static str, &'static str> = phf_map! {
    "recall" => "basic factual recall: simple questions about names, dates, places and events \
                 with short, concrete answers (e.g. \"In what year was the treaty signed?\")",
    "comprehension" => "moderate comprehension and basic analysis: a mix of factual recall and \
                        questions about why key events were significant \
                        (e.g. \"Why was this treaty significant?\")",
    "analytical" => "analytical and critical thinking: questions about causes, effects, \
                     comparisons and connections (e.g. \"Analyze how event A influenced event B.\")",
};

impl QuizTier {
    /// ≤14 事实记忆，≤16 理解，其余分析
    pub fn for_age(age: u8) -> Self {
        match age {
            0..=14 => QuizTier::Recall,
            15..=16 => QuizTier::Comprehension,
            _ => QuizTier::Analytical,
        }
    }

    fn key(self) -> &'static str {
        match self {
            QuizTier::Recall => "recall",
            QuizTier::Comprehension => "comprehension",
            QuizTier::Analytical => "analytical",
        }
    }

    pub fn guidance(self) -> &'static str {
        TIER_GUIDANCE.get(self.key()).copied().unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuizPayload {
    questions: Vec<String>,
}

/// 测验生成服务
pub struct QuizService {
    model: Arc<dyn TextModel>,
    question_count: usize,
}

impl QuizService {
    pub fn new(model: Arc<dyn TextModel>, question_count: usize) -> Self {
        Self {
            model,
            question_count: question_count.max(1),
        }
    }

    pub async fn generate(&self, unit_title: &str, summaries: &[String], age: u8) -> QuizRecord {
        let tier = QuizTier::for_age(age);
        let failed = |reason: &str| {
            warn!("⚠️ 测验生成失败: {}", reason);
            QuizRecord {
                age,
                tier,
                questions: Vec::new(),
                requested: self.question_count,
                failed: true,
            }
        };

        let combined = summaries.join("\n\n=== LESSON ===\n\n");
        if combined.trim().is_empty() {
            return failed("没有课时内容");
        }
        let combined = truncate_text(&combined, SUMMARY_CHAR_LIMIT);

        info!("📝 正在为 {} 岁学生生成测验 ({:?})", age, tier);
        let prompt = format!(
            "You are an expert history teacher creating a quiz for {age}-year-old students.\n\n\
             Unit: {unit}\n\n\
             LESSON CONTENT:\n{content}\n\n\
             Generate EXACTLY {n} questions, level: {guidance}.\n\
             Every question MUST be answerable from the lesson content above.\n\n\
             Return STRICT JSON: {{\"questions\": [\"Question 1?\", \"Question 2?\"]}}",
            age = age,
            unit = unit_title,
            content = combined,
            n = self.question_count,
            guidance = tier.guidance(),
        );

        let raw = match self.model.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return failed(&e.to_string()),
        };

        let questions: Vec<String> = safe_json_loads::<QuizPayload>(&raw)
            .map(|p| p.questions)
            .unwrap_or_default()
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(self.question_count)
            .collect();

        if questions.is_empty() {
            return failed("模型没有返回题目");
        }

        if questions.len() < self.question_count {
            warn!(
                "⚠️ 测验题目不足: {}/{} 道",
                questions.len(),
                self.question_count
            );
        } else {
            info!("✓ 测验生成完成: {} 道题", questions.len());
        }
        QuizRecord {
            age,
            tier,
            questions,
            requested: self.question_count,
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct QuizModel {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextModel for QuizModel {
        async fn complete(&self, prompt: &str) -> AppResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| AppError::Other("timeout".to_string()))
        }
    }

    fn model(reply: Option<&str>) -> Arc<QuizModel> {
        Arc::new(QuizModel {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_age_tiers() {
        assert_eq!(QuizTier::for_age(14), QuizTier::Recall);
        assert_eq!(QuizTier::for_age(15), QuizTier::Comprehension);
        assert_eq!(QuizTier::for_age(16), QuizTier::Comprehension);
        assert_eq!(QuizTier::for_age(17), QuizTier::Analytical);
        assert!(QuizTier::Analytical.guidance().contains("critical thinking"));
    }

    #[tokio::test]
    async fn test_questions_are_capped_and_summary_truncated() {
        let reply = format!(
            "```json\n{{\"questions\": [{}]}}\n```",
            (1..=12)
                .map(|i| format!("\"Question {}?\"", i))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let model = model(Some(&reply));
        let service = QuizService::new(model.clone(), 10);
        let long_summary = "x".repeat(6000);

        let quiz = service.generate("Cold War", &[long_summary], 18).await;

        assert!(!quiz.failed);
        assert!(!quiz.is_short());
        assert_eq!(quiz.questions.len(), 10);
        assert_eq!(quiz.tier, QuizTier::Analytical);
        let prompt = &model.prompts.lock().unwrap()[0];
        assert!(!prompt.contains(&"x".repeat(4001)));
    }

    #[tokio::test]
    async fn test_short_reply_is_recorded() {
        let model = model(Some(r#"{"questions": ["Who built the Berlin Wall?", "  ", "When did it fall?"]}"#));
        let service = QuizService::new(model, 5);

        let quiz = service
            .generate("Cold War", &["Summary of lesson 1".to_string()], 15)
            .await;

        assert!(!quiz.failed);
        assert!(quiz.is_short());
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.requested, 5);
    }

    #[tokio::test]
    async fn test_failure_is_flagged() {
        let service = QuizService::new(model(None), 10);
        let quiz = service
            .generate("Cold War", &["Summary of lesson 1".to_string()], 14)
            .await;
        assert!(quiz.failed);
        assert!(quiz.questions.is_empty());

        let service = QuizService::new(model(Some("I cannot help with that")), 10);
        let quiz = service
            .generate("Cold War", &["Summary of lesson 1".to_string()], 14)
            .await;
        assert!(quiz.failed);
    }
}
