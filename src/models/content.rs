use serde::{Deserialize, Serialize};

/// 正文中的一个段落（对应一张内容幻灯片）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// 主题句，可作为幻灯片标题
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// 标题 + 正文
    pub fn full_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.body)
        }
    }
}

/// 教师指南草稿
///
/// 每次修订整体替换，不做合并
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub sections: Vec<Section>,
    /// 第几次生成（从 1 开始）
    pub revision_number: usize,
}

impl ContentDraft {
    pub const UNAVAILABLE_MARKER: &'static str = "[content unavailable]";

    pub fn new(sections: Vec<Section>, revision_number: usize) -> Self {
        Self {
            sections,
            revision_number,
        }
    }

    /// 生成彻底失败时的显式占位内容
    pub fn unavailable() -> Self {
        Self {
            sections: vec![Section::new(
                Self::UNAVAILABLE_MARKER,
                "Content generation failed for this lesson; see the fact-check report.",
            )],
            revision_number: 0,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.sections
            .first()
            .is_some_and(|s| s.title == Self::UNAVAILABLE_MARKER)
    }

    /// 段落之间以空行分隔的全文
    pub fn full_text(&self) -> String {
        self.sections
            .iter()
            .map(Section::full_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
