//! 项目目录（资源目录）
//!
//! 每次规划都重新调用 list()，因此目录必须反映当前配置而不是缓存快照。

use std::path::PathBuf;

use async_trait::async_trait;
use walkdir::WalkDir;

#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// 当前可用的项目名（有序、去重）
    async fn list(&self) -> Vec<String>;
}

/// 配置文件中的静态项目列表
pub struct StaticCatalog {
    projects: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projects: Vec<String> = projects
            .into_iter()
            .map(Into::into)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        projects.sort();
        projects.dedup();
        Self { projects }
    }
}

#[async_trait]
impl ResourceCatalog for StaticCatalog {
    async fn list(&self) -> Vec<String> {
        self.projects.clone()
    }
}

/// 项目目录：根目录下每个（非隐藏）子目录即一个项目
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan(&self) -> Vec<String> {
        let mut projects: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(String::from))
            .filter(|name| !name.starts_with('.'))
            .collect();
        projects.sort();
        projects
    }
}

#[async_trait]
impl ResourceCatalog for DirectoryCatalog {
    async fn list(&self) -> Vec<String> {
        if !self.root.is_dir() {
            tracing::warn!(path = %self.root.display(), "projects directory not found");
            return Vec::new();
        }
        self.scan()
    }
}

/// 合并多个目录的结果
pub struct CombinedCatalog {
    sources: Vec<Box<dyn ResourceCatalog>>,
}

impl CombinedCatalog {
    pub fn new(sources: Vec<Box<dyn ResourceCatalog>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ResourceCatalog for CombinedCatalog {
    async fn list(&self) -> Vec<String> {
        let mut all = Vec::new();
        for source in &self.sources {
            all.extend(source.list().await);
        }
        all.sort();
        all.dedup();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_catalog_sorts_and_dedups() {
        let catalog = StaticCatalog::new(["beta", "acme", " ", "beta"]);
        assert_eq!(catalog.list().await, vec!["acme", "beta"]);
    }

    #[tokio::test]
    async fn test_directory_catalog_reflects_live_changes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("acme")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let catalog = DirectoryCatalog::new(dir.path());
        assert_eq!(catalog.list().await, vec!["acme"]);

        std::fs::create_dir(dir.path().join("beta")).unwrap();
        assert_eq!(catalog.list().await, vec!["acme", "beta"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let catalog = DirectoryCatalog::new("/definitely/not/here");
        assert!(catalog.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_combined_catalog() {
        let combined = CombinedCatalog::new(vec![
            Box::new(StaticCatalog::new(["beta"])),
            Box::new(StaticCatalog::new(["acme", "beta"])),
        ]);
        assert_eq!(combined.list().await, vec!["acme", "beta"]);
    }
}
