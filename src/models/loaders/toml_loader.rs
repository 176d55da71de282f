use crate::error::{AppResult, FileError};
use crate::models::request::Request;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载请求
///
/// ```toml
/// text = "3 lessons on the French Revolution"
/// lesson_count = 3
/// age = 16
/// ```
pub async fn load_request_file(toml_file_path: &Path) -> AppResult<Request> {
    let path_str = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| FileError::ReadFailed {
            path: path_str.clone(),
            source: Box::new(e),
        })?;

    let mut request: Request = toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
        path: path_str.clone(),
        source: Box::new(e),
    })?;

    // 设置文件路径
    request.file_path = Some(path_str);

    Ok(request)
}

/// 从文件夹中加载所有请求文件（按文件名排序，单个文件失败只记录警告）
pub async fn load_all_request_files(folder_path: &str) -> AppResult<Vec<Request>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| FileError::ReadFailed {
            path: folder_path.to_string(),
            source: Box::new(e),
        })?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut requests = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_request_file(&path).await {
            Ok(request) => requests.push(request),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(requests)
}
