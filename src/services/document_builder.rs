//! 文档结构生成 - 业务能力层
//!
//! 教师指南、测验、资料清单三种文档的结构，交给渲染器写文件

use crate::models::{
    BibliographyEntry, ContentDraft, DocumentBlock, DocumentKind, DocumentStructure,
    FactCheckVerdict, LessonSpec, QuizRecord, RevisionStatus,
};

fn block(heading: Option<&str>, paragraphs: Vec<String>) -> DocumentBlock {
    DocumentBlock {
        heading: heading.map(str::to_string),
        paragraphs,
    }
}

/// 教师指南：每个段落一块；未通过核查时在开头列出最后一次的警告
pub fn teacher_guide(
    lesson: &LessonSpec,
    draft: &ContentDraft,
    status: RevisionStatus,
    history: &[FactCheckVerdict],
) -> DocumentStructure {
    let mut blocks = Vec::with_capacity(draft.sections.len() + 1);

    if status == RevisionStatus::Exhausted {
        let mut paragraphs =
            vec!["This guide could not be fully verified against the retrieved sources.".to_string()];
        if let Some(last) = history.last() {
            paragraphs.extend(last.warnings.iter().map(|w| format!("- {}", w)));
        }
        blocks.push(block(Some("⚠️ Unverified content"), paragraphs));
    }

    if !lesson.focus_description.is_empty() {
        blocks.push(block(Some("Lesson focus"), vec![lesson.focus_description.clone()]));
    }

    blocks.extend(
        draft
            .sections
            .iter()
            .map(|s| block(Some(s.title.as_str()), vec![s.body.clone()])),
    );

    DocumentStructure {
        kind: DocumentKind::TeacherGuide,
        title: format!("{} - Teacher's Guide", lesson.full_name()),
        blocks,
    }
}

/// 测验文档；生成失败时只写一段说明
pub fn quiz_document(unit_title: &str, quiz: &QuizRecord) -> DocumentStructure {
    let blocks = if quiz.failed || quiz.questions.is_empty() {
        vec![block(
            None,
            vec!["The quiz could not be generated for this unit.".to_string()],
        )]
    } else {
        vec![
            block(
                Some("Instructions"),
                vec![format!(
                    "Answer all {} questions. Level: {:?} (age {}).",
                    quiz.questions.len(),
                    quiz.tier,
                    quiz.age
                )],
            ),
            block(
                Some("Questions"),
                quiz.questions
                    .iter()
                    .enumerate()
                    .map(|(i, q)| format!("{}. {}", i + 1, q))
                    .collect(),
            ),
        ]
    };

    DocumentStructure {
        kind: DocumentKind::Quiz,
        title: format!("{} - Quiz", unit_title),
        blocks,
    }
}

/// 资料清单：每条书目一块
pub fn sources_document(unit_title: &str, bibliography: &[BibliographyEntry]) -> DocumentStructure {
    let blocks = if bibliography.is_empty() {
        vec![block(
            None,
            vec!["No sources were used in the final lesson content.".to_string()],
        )]
    } else {
        bibliography
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                block(
                    Some(format!("{}. {}", i + 1, entry.title).as_str()),
                    vec![
                        format!("Source: {} ({:?})", entry.source_name, entry.source_kind),
                        format!("URL: {}", entry.url),
                        format!("Used in: {}", entry.lessons.join(", ")),
                    ],
                )
            })
            .collect()
    };

    DocumentStructure {
        kind: DocumentKind::Sources,
        title: format!("{} - Sources", unit_title),
        blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, QuizTier, Section, SourceKind};

    #[test]
    fn test_unverified_guide_lists_warnings() {
        let lesson = LessonSpec::new(1, "The Estates-General", "Why the Estates met", vec![]);
        let draft = ContentDraft::new(vec![Section::new("Summons of 1788", "Louis XVI agreed.")], 4);
        let history = vec![FactCheckVerdict::no_go(
            Confidence::Medium,
            "Unsupported",
            vec!["Date of the summons is unsupported".to_string()],
        )];

        let guide = teacher_guide(&lesson, &draft, RevisionStatus::Exhausted, &history);

        assert_eq!(guide.kind, DocumentKind::TeacherGuide);
        assert_eq!(guide.blocks[0].heading.as_deref(), Some("⚠️ Unverified content"));
        assert!(guide.blocks[0].paragraphs[1].contains("Date of the summons"));
        assert_eq!(guide.blocks.len(), 3);
    }

    #[test]
    fn test_sources_and_quiz_documents() {
        let entries = vec![BibliographyEntry {
            source_kind: SourceKind::Primary,
            source_name: "Encyclopaedia Britannica".to_string(),
            title: "Reign of Terror".to_string(),
            url: "https://www.britannica.com/event/Reign-of-Terror".to_string(),
            lessons: vec!["Lesson 2 - The Terror".to_string()],
        }];
        let sources = sources_document("French Revolution", &entries);
        assert_eq!(sources.blocks.len(), 1);
        assert!(sources.blocks[0].paragraphs[2].contains("Lesson 2 - The Terror"));

        let failed = QuizRecord {
            age: 16,
            tier: QuizTier::Comprehension,
            questions: vec![],
            requested: 10,
            failed: true,
        };
        let quiz = quiz_document("French Revolution", &failed);
        assert_eq!(quiz.blocks.len(), 1);
        assert_eq!(quiz.title, "French Revolution - Quiz");
    }
}
