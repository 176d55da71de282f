//! 最终报告
//!
//! 把单元结果整理成可读文本；所有降级都会列出，不会被静默丢弃

use crate::models::{LessonResult, RenderStatus, RevisionStatus, UnitResult};

fn describe_render(status: &RenderStatus) -> String {
    match status {
        RenderStatus::Rendered(path) => path.display().to_string(),
        RenderStatus::Failed(reason) => format!("FAILED ({})", reason),
        RenderStatus::TimedOut => "TIMED OUT".to_string(),
    }
}

fn lesson_flags(lesson: &LessonResult) -> Vec<String> {
    let mut flags = Vec::new();
    if lesson.flags.low_grounding {
        flags.push(format!(
            "low grounding (no evidence for: {})",
            lesson.missing_topics.join(", ")
        ));
    }
    if lesson.flags.generation_failed {
        flags.push("content generation failed".to_string());
    }
    if lesson.flags.unverified {
        flags.push("unverified".to_string());
    }
    if lesson.flags.render_failed {
        flags.push("render failed".to_string());
    }
    flags
}

/// 生成最终报告文本
pub fn build_report(result: &UnitResult) -> String {
    let line = "=".repeat(60);
    let mut out = Vec::new();

    out.push(line.clone());
    out.push("LESSON PACKAGE REPORT".to_string());
    out.push(line.clone());
    out.push(format!("Request: {}", result.request.text));
    out.push(format!(
        "Unit: {} (topic: {}, {} lesson(s), age {})",
        result.plan.unit_title, result.plan.topic, result.plan.lesson_count, result.plan.age
    ));

    out.push(String::new());
    out.push("Files:".to_string());
    for lesson in &result.lessons {
        out.push(format!("  {}", lesson.spec.full_name()));
        out.push(format!("    slides: {}", describe_render(&lesson.slide_render)));
        out.push(format!("    guide:  {}", describe_render(&lesson.guide_render)));
    }
    out.push(format!("  Quiz:    {}", describe_render(&result.quiz_render)));
    out.push(format!("  Sources: {}", describe_render(&result.sources_render)));

    // ========== 核查汇总 ==========
    let first_try: Vec<String> = result
        .lessons
        .iter()
        .filter(|l| l.accepted_after() == Some(1))
        .map(|l| l.spec.full_name())
        .collect();
    let revised: Vec<String> = result
        .lessons
        .iter()
        .filter_map(|l| match l.accepted_after() {
            Some(n) if n > 1 => Some(format!("{} (after {} attempts)", l.spec.full_name(), n)),
            _ => None,
        })
        .collect();

    out.push(String::new());
    out.push("Fact check summary:".to_string());
    out.push(format!("  ✅ Verified on first attempt: {}", first_try.len()));
    for name in &first_try {
        out.push(format!("     - {}", name));
    }
    out.push(format!("  🔁 Revised and approved: {}", revised.len()));
    for name in &revised {
        out.push(format!("     - {}", name));
    }
    let unverified: Vec<&LessonResult> = result
        .lessons
        .iter()
        .filter(|l| l.status == RevisionStatus::Exhausted)
        .collect();
    out.push(format!("  ⚠️ Unverified: {}", unverified.len()));
    for lesson in unverified {
        out.push(format!(
            "     - {} ({} attempts)",
            lesson.spec.full_name(),
            lesson.verdict_history.len()
        ));
        if let Some(last) = lesson.verdict_history.last() {
            for warning in &last.warnings {
                out.push(format!("         * {}", warning));
            }
        }
    }

    // ========== 质量标记 ==========
    let flagged: Vec<(String, Vec<String>)> = result
        .lessons
        .iter()
        .map(|l| (l.spec.full_name(), lesson_flags(l)))
        .filter(|(_, flags)| !flags.is_empty())
        .collect();
    out.push(String::new());
    if flagged.is_empty() {
        out.push("Quality flags: none".to_string());
    } else {
        out.push("Quality flags:".to_string());
        for (name, flags) in flagged {
            out.push(format!("  {}: {}", name, flags.join("; ")));
        }
    }

    out.push(String::new());
    if result.quiz.failed {
        out.push("Quiz: generation failed".to_string());
    } else if result.quiz.is_short() {
        out.push(format!(
            "Quiz: {} of {} requested questions ({:?}, age {})",
            result.quiz.questions.len(),
            result.quiz.requested,
            result.quiz.tier,
            result.quiz.age
        ));
    } else {
        out.push(format!(
            "Quiz: {} questions ({:?}, age {})",
            result.quiz.questions.len(),
            result.quiz.tier,
            result.quiz.age
        ));
    }
    out.push(format!("Bibliography: {} source(s)", result.bibliography.len()));
    out.push(line);

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_render() {
        assert_eq!(describe_render(&RenderStatus::TimedOut), "TIMED OUT");
        assert_eq!(
            describe_render(&RenderStatus::Failed("disk full".to_string())),
            "FAILED (disk full)"
        );
    }
}
