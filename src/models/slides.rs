use serde::Serialize;

/// 幻灯片类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlideKind {
    Content,
    /// 思考题（固定位置插入）
    Question,
}

/// 标题页
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleSlide {
    pub title: String,
    pub subtitle: String,
}

/// 一张幻灯片
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub kind: SlideKind,
    pub title: String,
    /// 关键词或短语；思考题只有一条完整问句
    pub bullets: Vec<String>,
    /// 讲者备注（来自对应段落全文）
    pub notes: String,
}

/// 交给渲染器的幻灯片结构
///
/// 入队后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideStructure {
    pub deck_title: String,
    pub title_slide: TitleSlide,
    pub slides: Vec<Slide>,
}

impl SlideStructure {
    pub fn content_slides(&self) -> impl Iterator<Item = &Slide> {
        self.slides.iter().filter(|s| s.kind == SlideKind::Content)
    }

    pub fn question_slides(&self) -> impl Iterator<Item = &Slide> {
        self.slides.iter().filter(|s| s.kind == SlideKind::Question)
    }
}

/// 文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentKind {
    TeacherGuide,
    Quiz,
    Sources,
}

/// 文档中的一个块
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentBlock {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
}

/// 交给渲染器的文档结构（教师指南 / 测验 / 资料清单）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStructure {
    pub kind: DocumentKind,
    pub title: String,
    pub blocks: Vec<DocumentBlock>,
}
