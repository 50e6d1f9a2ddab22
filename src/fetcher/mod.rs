pub mod arxiv;
pub mod aps;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FetcherConfig;

pub use arxiv::ArxivFetcher;
pub use aps::ApsFetcher;

/// 论文记录。翻译核心只依赖 title / abstract_text / url，
/// 摘要缺失一律按空字符串处理，不视为错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub published: String,
    pub url: String,
    #[serde(default)]
    pub pdf_url: String,
    #[serde(default)]
    pub category: String,
}

/// 聚合多个论文源，合并结果并按标题去重
pub struct UnifiedFetcher {
    arxiv: Option<ArxivFetcher>,
    aps: Option<ApsFetcher>,
}

impl UnifiedFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            arxiv: config.arxiv_enabled.then(|| ArxivFetcher::new(config)),
            aps: config.aps_enabled.then(|| ApsFetcher::new(config)),
        }
    }

    /// 抓取所有启用的源。单个源失败只记日志，不影响其他源
    pub async fn fetch_all(&self, days_back: u32) -> Vec<Paper> {
        let mut papers = Vec::new();

        if let Some(ref arxiv) = self.arxiv {
            match arxiv.fetch_recent_papers(days_back).await {
                Ok(found) => papers.extend(found),
                Err(e) => warn!("arXiv 获取失败: {}", e),
            }
        }

        if let Some(ref aps) = self.aps {
            match aps.fetch_recent_papers(days_back).await {
                Ok(found) => papers.extend(found),
                Err(e) => warn!("PRL 获取失败: {}", e),
            }
        }

        let merged = dedup_by_title(papers);
        info!("合并去重后共 {} 篇论文", merged.len());
        merged
    }
}

/// 基于标题去重，保留首次出现的顺序
pub fn dedup_by_title(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(papers.len());

    for paper in papers {
        let key = paper.title.trim().to_lowercase();
        if seen.insert(key) {
            unique.push(paper);
        }
    }

    unique
}
