//! 幻灯片结构生成 - 业务能力层
//!
//! 只负责把最终稿映射为幻灯片结构，不写文件

use tracing::debug;

use crate::models::{ContentDraft, LessonSpec, Section, Slide, SlideKind, SlideStructure, TitleSlide};

const MAX_BULLETS: usize = 3;
const MAX_BULLET_WORDS: usize = 6;

const QUESTION_TITLES: &[&str] = &["🤔 Think About It", "💭 Critical Thinking Question"];

/// 思考题模板，按插入顺序轮换；{} 为前一张幻灯片的标题
const QUESTION_TEMPLATES: &[&str] = &[
    "Why do you think \"{}\" mattered so much to the people living through it?",
    "What might have happened if \"{}\" had turned out differently?",
    "Which long-term consequence of \"{}\" do you consider most significant, and why?",
    "Whose perspective is missing from the story of \"{}\"?",
];

/// 幻灯片结构生成器
pub struct SlideBuilder {
    question_positions: Vec<usize>,
}

impl SlideBuilder {
    /// # 参数
    /// - `question_positions`: 在第 n 张内容幻灯片之后插入思考题
    pub fn new(question_positions: Vec<usize>) -> Self {
        let mut question_positions = question_positions;
        question_positions.sort_unstable();
        question_positions.dedup();
        Self { question_positions }
    }

    pub fn build(&self, lesson: &LessonSpec, unit_title: &str, draft: &ContentDraft) -> SlideStructure {
        let content_count = draft.sections.len();
        let mut slides = Vec::with_capacity(content_count + self.question_positions.len());
        let mut question_counter = 0;

        for (i, section) in draft.sections.iter().enumerate() {
            slides.push(content_slide(section));

            let position = i + 1;
            if self.question_positions.contains(&position) {
                slides.push(question_slide(&section.title, question_counter));
                question_counter += 1;
            }
        }

        let skipped = self
            .question_positions
            .iter()
            .filter(|p| **p == 0 || **p > content_count)
            .count();
        if skipped > 0 {
            debug!(
                "内容幻灯片只有 {} 张，跳过 {} 个思考题位置",
                content_count, skipped
            );
        }

        SlideStructure {
            deck_title: lesson.full_name(),
            title_slide: TitleSlide {
                title: lesson.full_name(),
                subtitle: unit_title.to_string(),
            },
            slides,
        }
    }
}

fn content_slide(section: &Section) -> Slide {
    Slide {
        kind: SlideKind::Content,
        title: section.title.trim_end_matches('.').to_string(),
        bullets: bullet_phrases(section),
        notes: section.full_text(),
    }
}

fn question_slide(previous_title: &str, counter: usize) -> Slide {
    let subject = previous_title.trim_end_matches('.');
    let template = QUESTION_TEMPLATES[counter % QUESTION_TEMPLATES.len()];
    Slide {
        kind: SlideKind::Question,
        title: QUESTION_TITLES[counter % QUESTION_TITLES.len()].to_string(),
        bullets: vec![template.replace("{}", subject)],
        notes: "Give students a few minutes to discuss in pairs before sharing answers.".to_string(),
    }
}

/// 从段落句子中提取不超过 3 条、每条不超过 6 个词的短语
pub fn bullet_phrases(section: &Section) -> Vec<String> {
    let source = if section.body.trim().is_empty() {
        section.title.as_str()
    } else {
        section.body.as_str()
    };

    source
        .split_inclusive(['.', '!', '?', ';'])
        .map(|sentence| {
            sentence
                .split_whitespace()
                .take(MAX_BULLET_WORDS)
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end_matches(['.', '!', '?', ';', ','])
                .to_string()
        })
        .filter(|phrase| !phrase.is_empty())
        .take(MAX_BULLETS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(sections: usize) -> ContentDraft {
        ContentDraft::new(
            (1..=sections)
                .map(|i| {
                    Section::new(
                        format!("Topic {}", i),
                        "The National Assembly abolished feudal privileges in August 1789. \
                         Nobles lost their exemptions. Church lands were nationalised. \
                         A fourth sentence follows.",
                    )
                })
                .collect(),
            1,
        )
    }

    fn lesson() -> LessonSpec {
        LessonSpec::new(2, "The National Assembly", "", vec![])
    }

    #[test]
    fn test_questions_at_fixed_positions() {
        let structure = SlideBuilder::new(vec![10, 20]).build(&lesson(), "French Revolution", &draft(30));

        assert_eq!(structure.slides.len(), 32);
        assert_eq!(structure.slides[10].kind, SlideKind::Question);
        assert_eq!(structure.slides[21].kind, SlideKind::Question);
        assert_eq!(structure.content_slides().count(), 30);
        assert_eq!(structure.title_slide.subtitle, "French Revolution");
        assert_eq!(structure.deck_title, "Lesson 2 - The National Assembly");

        // 两个思考题使用不同模板
        let questions: Vec<&Slide> = structure.question_slides().collect();
        assert_eq!(questions.len(), 2);
        assert!(questions[0].bullets[0].contains("Topic 10"));
        assert_ne!(questions[0].title, questions[1].title);
        assert_eq!(questions[0].bullets.len(), 1);
    }

    #[test]
    fn test_positions_beyond_content_are_skipped() {
        let structure = SlideBuilder::new(vec![10, 20]).build(&lesson(), "Unit", &draft(12));
        assert_eq!(structure.question_slides().count(), 1);
        assert_eq!(structure.slides.len(), 13);
    }

    #[test]
    fn test_content_slide_bullets_and_notes() {
        let section = Section::new(
            "Abolition of Feudalism.",
            "The National Assembly abolished feudal privileges in August 1789. \
             Nobles lost their exemptions. Church lands were nationalised. A fourth sentence follows.",
        );
        let slide = content_slide(&section);

        assert_eq!(slide.title, "Abolition of Feudalism");
        assert_eq!(slide.bullets.len(), 3);
        assert_eq!(slide.bullets[0], "The National Assembly abolished feudal privileges");
        assert_eq!(slide.bullets[1], "Nobles lost their exemptions");
        assert!(slide.bullets.iter().all(|b| b.split_whitespace().count() <= 6));
        assert_eq!(slide.notes, section.full_text());
    }
}
