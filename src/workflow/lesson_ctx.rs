//! 课时处理上下文
//!
//! 封装"我正在处理哪个单元的第几课"这一信息，以及跨课时累积的状态

use std::fmt::Display;

use crate::utils::truncate_text;

/// 课时处理上下文
#[derive(Debug, Clone)]
pub struct LessonCtx {
    /// 课时序号（从1开始）
    pub lesson_index: usize,
    /// 本单元课时总数（仅用于日志显示）
    pub lesson_total: usize,
    pub unit_title: String,
}

impl LessonCtx {
    pub fn new(lesson_index: usize, lesson_total: usize, unit_title: impl Into<String>) -> Self {
        Self {
            lesson_index,
            lesson_total,
            unit_title: unit_title.into(),
        }
    }
}

impl Display for LessonCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[课时 {}/{}]", self.lesson_index, self.lesson_total)
    }
}

/// 跨课时状态
///
/// 只追加，作用域为一次单元运行
#[derive(Debug, Clone, Default)]
pub struct UnitState {
    prior_summaries: Vec<String>,
    slide_titles: Vec<String>,
    full_summaries: Vec<String>,
    context_lessons: usize,
    summary_chars: usize,
}

impl UnitState {
    /// # 参数
    /// - `context_lessons`: 作为上下文传给下一课的历史课时数
    /// - `summary_chars`: 每条历史摘要的最大字符数
    pub fn new(context_lessons: usize, summary_chars: usize) -> Self {
        Self {
            context_lessons,
            summary_chars,
            ..Default::default()
        }
    }

    pub fn record_lesson(&mut self, lesson_name: &str, summary: &str, slide_titles: &[String]) {
        self.prior_summaries.push(format!(
            "{}: {}",
            lesson_name,
            truncate_text(summary, self.summary_chars)
        ));
        self.slide_titles.extend(slide_titles.iter().cloned());
        self.full_summaries.push(summary.to_string());
    }

    /// 最近几课的摘要，用作生成提示词的上下文
    pub fn prior_context(&self) -> String {
        let skip = self.prior_summaries.len().saturating_sub(self.context_lessons);
        let mut context = self.prior_summaries[skip..].join("\n\n");
        if !self.slide_titles.is_empty() {
            context.push_str("\n\nSlide titles already used: ");
            context.push_str(&self.slide_titles.join("; "));
        }
        context
    }

    /// 全部课时的完整摘要（用于测验）
    pub fn full_summaries(&self) -> &[String] {
        &self.full_summaries
    }

    pub fn slide_titles(&self) -> &[String] {
        &self.slide_titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctx_display() {
        let ctx = LessonCtx::new(2, 3, "French Revolution");
        assert_eq!(ctx.to_string(), "[课时 2/3]");
    }

    #[test]
    fn test_prior_context_keeps_last_lessons() {
        let mut state = UnitState::new(2, 10);
        assert!(state.prior_context().is_empty());

        state.record_lesson("Lesson 1", "First lesson summary text", &["Origins".to_string()]);
        state.record_lesson("Lesson 2", "Second", &["Estates".to_string()]);
        state.record_lesson("Lesson 3", "Third", &[]);

        let context = state.prior_context();
        assert!(!context.contains("Lesson 1:"));
        assert!(context.starts_with("Lesson 2: Second"));
        assert!(context.contains("Origins; Estates"));
        assert_eq!(state.full_summaries().len(), 3);
        assert_eq!(state.full_summaries()[0], "First lesson summary text");
    }
}
