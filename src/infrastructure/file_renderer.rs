//! 文件渲染器 - 基础设施层
//!
//! 幻灯片写成 JSON，文档写成 Markdown；只负责写文件，不关心流程

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{AppError, AppResult, RenderError};
use crate::infrastructure::render_channel::{RenderJob, Renderer};
use crate::models::{DocumentKind, DocumentStructure};

const MAX_SLUG_LEN: usize = 60;

/// 文件渲染器
///
/// 同一次运行中文件名不重复，重名时追加序号
pub struct FileRenderer {
    output_dir: PathBuf,
    used_names: Mutex<HashSet<String>>,
}

impl FileRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            used_names: Mutex::new(HashSet::new()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn reserve_name(&self, stem: &str, extension: &str) -> AppResult<PathBuf> {
        let mut used = self
            .used_names
            .lock()
            .map_err(|e| AppError::Other(format!("文件名表锁失效: {}", e)))?;

        let mut name = format!("{}.{}", stem, extension);
        let mut counter = 2;
        while used.contains(&name) || self.output_dir.join(&name).exists() {
            name = format!("{}_{}.{}", stem, counter, extension);
            counter += 1;
        }
        used.insert(name.clone());

        Ok(self.output_dir.join(name))
    }
}

#[async_trait]
impl Renderer for FileRenderer {
    async fn write(&self, job: &RenderJob) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        let (path, content) = match job {
            RenderJob::Slides(deck) => {
                let path = self.reserve_name(&format!("{}_slides", slugify(&deck.deck_title)), "json")?;
                let content = serde_json::to_string_pretty(deck).map_err(|e| {
                    RenderError::WriteFailed {
                        title: deck.deck_title.clone(),
                        reason: e.to_string(),
                    }
                })?;
                (path, content)
            }
            RenderJob::Document(doc) => {
                let suffix = match doc.kind {
                    DocumentKind::TeacherGuide => "guide",
                    DocumentKind::Quiz => "quiz",
                    DocumentKind::Sources => "sources",
                };
                let stem = format!("{}_{}", slugify(&doc.title), suffix);
                (self.reserve_name(&stem, "md")?, to_markdown(doc))
            }
        };

        debug!("写入文件: {} ({} 字节)", path.display(), content.len());
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        Ok(path)
    }
}

/// 文档转 Markdown
pub fn to_markdown(doc: &DocumentStructure) -> String {
    let mut out = format!("# {}\n", doc.title);
    for block in &doc.blocks {
        out.push('\n');
        if let Some(heading) = &block.heading {
            out.push_str(&format!("## {}\n\n", heading));
        }
        out.push_str(&block.paragraphs.join("\n\n"));
        out.push('\n');
    }
    out
}

/// 标题转文件名：小写字母数字，其余替换为下划线
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug: String = slug.trim_matches('_').chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentBlock, SlideStructure, TitleSlide};

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Lesson 1 - The Estates-General"), "lesson_1_the_estates_general");
        assert_eq!(slugify("  ?? "), "untitled");
        assert!(slugify(&"a".repeat(200)).len() <= MAX_SLUG_LEN);
    }

    #[tokio::test]
    async fn test_writes_json_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(dir.path().join("out"));

        let deck = RenderJob::Slides(SlideStructure {
            deck_title: "Lesson 1 - Origins".to_string(),
            title_slide: TitleSlide {
                title: "Lesson 1 - Origins".to_string(),
                subtitle: "French Revolution".to_string(),
            },
            slides: vec![],
        });
        let deck_path = renderer.write(&deck).await.unwrap();
        assert!(deck_path.ends_with("lesson_1_origins_slides.json"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&deck_path).unwrap()).unwrap();
        assert_eq!(json["title_slide"]["subtitle"], "French Revolution");

        let guide = RenderJob::Document(DocumentStructure {
            kind: DocumentKind::TeacherGuide,
            title: "Lesson 1 - Origins - Teacher's Guide".to_string(),
            blocks: vec![DocumentBlock {
                heading: Some("Lesson focus".to_string()),
                paragraphs: vec!["Causes of the crisis.".to_string()],
            }],
        });
        let guide_path = renderer.write(&guide).await.unwrap();
        let text = std::fs::read_to_string(&guide_path).unwrap();
        assert!(text.starts_with("# Lesson 1 - Origins - Teacher's Guide"));
        assert!(text.contains("## Lesson focus\n\nCauses of the crisis."));
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FileRenderer::new(dir.path());
        let doc = RenderJob::Document(DocumentStructure {
            kind: DocumentKind::Quiz,
            title: "Unit".to_string(),
            blocks: vec![],
        });

        let first = renderer.write(&doc).await.unwrap();
        let second = renderer.write(&doc).await.unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("unit_quiz_2.md"));
    }
}
