use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::content::ContentDraft;
use crate::models::evidence::{EvidenceItem, RetrievalAttempt, SourceKind};
use crate::models::request::{LessonSpec, Request, UnitPlan};
use crate::models::slides::SlideStructure;
use crate::models::verdict::FactCheckVerdict;

/// 修订循环的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RevisionStatus {
    /// 核查通过
    Accepted,
    /// 达到尝试上限仍未通过（或生成失败），内容标记为未核实
    Exhausted,
}

/// 修订循环的输出
#[derive(Debug, Clone, Serialize)]
pub struct RevisionOutcome {
    pub status: RevisionStatus,
    /// 最后一次生成的草稿（不是第一次）
    pub final_draft: ContentDraft,
    /// 每次完成的生成-核查周期一条
    pub history: Vec<FactCheckVerdict>,
    pub attempts: usize,
    pub generation_failed: bool,
}

impl RevisionOutcome {
    pub fn is_accepted(&self) -> bool {
        self.status == RevisionStatus::Accepted
    }

    /// 最后一次核查的警告
    pub fn final_warnings(&self) -> &[String] {
        self.history
            .last()
            .map(|v| v.warnings.as_slice())
            .unwrap_or(&[])
    }
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderStatus {
    Rendered(PathBuf),
    Failed(String),
    /// 在限定时间内没有收到确认
    TimedOut,
}

impl RenderStatus {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            RenderStatus::Rendered(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, RenderStatus::Rendered(_))
    }
}

/// 课时质量标记，全部展示在最终报告中
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityFlags {
    /// 部分或全部主题没有检索到资料
    pub low_grounding: bool,
    pub generation_failed: bool,
    /// 核查未通过
    pub unverified: bool,
    pub render_failed: bool,
}

impl QualityFlags {
    pub fn is_clean(&self) -> bool {
        *self == QualityFlags::default()
    }
}

/// 单个课时的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct LessonResult {
    pub spec: LessonSpec,
    pub draft: ContentDraft,
    /// 过滤后的资料（全部 used = true）
    pub evidence: Vec<EvidenceItem>,
    pub verdict_history: Vec<FactCheckVerdict>,
    pub status: RevisionStatus,
    pub slides: SlideStructure,
    pub slide_render: RenderStatus,
    pub guide_render: RenderStatus,
    pub retrieval_log: Vec<RetrievalAttempt>,
    /// 检索失败的主题
    pub missing_topics: Vec<String>,
    pub flags: QualityFlags,
}

impl LessonResult {
    /// 第几次尝试后通过（未通过时为 None）
    pub fn accepted_after(&self) -> Option<usize> {
        match self.status {
            RevisionStatus::Accepted => Some(self.verdict_history.len()),
            RevisionStatus::Exhausted => None,
        }
    }
}

/// 测验难度分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuizTier {
    /// 事实记忆（≤14 岁）
    Recall,
    /// 理解 + 基础分析（15-16 岁）
    Comprehension,
    /// 分析与批判性思考（17-18 岁）
    Analytical,
}

/// 测验
#[derive(Debug, Clone, Serialize)]
pub struct QuizRecord {
    pub age: u8,
    pub tier: QuizTier,
    pub questions: Vec<String>,
    /// 要求的题目数
    pub requested: usize,
    pub failed: bool,
}

impl QuizRecord {
    /// 题目数不足要求
    pub fn is_short(&self) -> bool {
        !self.failed && self.questions.len() < self.requested
    }
}

/// 合并后的书目条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BibliographyEntry {
    pub source_kind: SourceKind,
    pub source_name: String,
    pub title: String,
    pub url: String,
    /// 引用了该资料的课时
    pub lessons: Vec<String>,
}

/// 整个单元的结果
#[derive(Debug, Clone, Serialize)]
pub struct UnitResult {
    pub request: Request,
    pub plan: UnitPlan,
    pub lessons: Vec<LessonResult>,
    pub quiz: QuizRecord,
    pub bibliography: Vec<BibliographyEntry>,
    pub quiz_render: RenderStatus,
    pub sources_render: RenderStatus,
}

impl UnitResult {
    /// 各课时已使用资料的并集（去重）
    ///
    /// 未使用的资料不会出现，已使用的资料不会丢失
    pub fn build_bibliography(lessons: &[LessonResult]) -> Vec<BibliographyEntry> {
        let mut entries: Vec<BibliographyEntry> = Vec::new();
        let mut index: HashMap<(SourceKind, String, String), usize> = HashMap::new();

        for lesson in lessons {
            let lesson_name = lesson.spec.full_name();
            for item in lesson.evidence.iter().filter(|item| item.used) {
                let key = item.bibliography_key();
                match index.get(&key) {
                    Some(&pos) => {
                        let entry = &mut entries[pos];
                        if !entry.lessons.contains(&lesson_name) {
                            entry.lessons.push(lesson_name.clone());
                        }
                    }
                    None => {
                        index.insert(key, entries.len());
                        entries.push(BibliographyEntry {
                            source_kind: item.source_kind,
                            source_name: item.source_name.clone(),
                            title: item.title.clone(),
                            url: item.url.clone(),
                            lessons: vec![lesson_name.clone()],
                        });
                    }
                }
            }
        }

        entries
    }

    pub fn unverified_lessons(&self) -> impl Iterator<Item = &LessonResult> {
        self.lessons.iter().filter(|l| l.flags.unverified)
    }
}
