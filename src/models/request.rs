use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 用户请求
///
/// 一旦被接受即不可变
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// 自然语言描述，如 "3 lessons on the French Revolution"
    pub text: String,
    /// 显式指定的课时数（优先于文本中解析出的数字）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_count: Option<i64>,
    /// 学生年龄（用于测验难度分级）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(skip)]
    pub file_path: Option<String>,
}

impl Request {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lesson_count: None,
            age: None,
            file_path: None,
        }
    }

    pub fn with_lesson_count(mut self, count: i64) -> Self {
        self.lesson_count = Some(count);
        self
    }

    pub fn with_age(mut self, age: u8) -> Self {
        self.age = Some(age);
        self
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)?;
        if let Some(count) = self.lesson_count {
            write!(f, " [课时数: {}]", count)?;
        }
        Ok(())
    }
}

/// 单个课时的规格
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonSpec {
    /// 课时序号（从 1 开始）
    pub index: usize,
    pub title: String,
    pub focus_description: String,
    /// 需要检索的具体主题（已去重）
    pub research_topics: Vec<String>,
}

impl LessonSpec {
    pub fn new(
        index: usize,
        title: impl Into<String>,
        focus_description: impl Into<String>,
        research_topics: Vec<String>,
    ) -> Self {
        Self {
            index,
            title: title.into(),
            focus_description: focus_description.into(),
            research_topics,
        }
    }

    /// "Lesson 1 - The Storming of the Bastille"
    pub fn full_name(&self) -> String {
        format!("Lesson {} - {}", self.index, self.title)
    }
}

/// 单元计划
///
/// 每个请求创建一次，之后只读
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitPlan {
    pub topic: String,
    pub unit_title: String,
    pub lesson_count: usize,
    pub age: u8,
    pub lessons: Vec<LessonSpec>,
}

impl UnitPlan {
    /// 可读的课程计划摘要
    pub fn summary(&self) -> String {
        let mut out = format!("Unit: {}\nLessons:\n", self.unit_title);
        for lesson in &self.lessons {
            out.push_str(&format!("  {}. {}\n", lesson.index, lesson.title));
        }
        out
    }
}
