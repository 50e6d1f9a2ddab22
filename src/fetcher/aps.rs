use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};
use std::time::Duration;

use crate::config::FetcherConfig;
use super::Paper;

const PRL_FEED_URL: &str = "https://journals.aps.org/feeds/rss.xml";

/// PRL (Physical Review Letters) RSS 源
pub struct ApsFetcher {
    client: Client,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(rename = "dc:creator", default)]
    creators: Vec<String>,
}

impl ApsFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            keywords: config.keywords.clone(),
        }
    }

    pub async fn fetch_recent_papers(&self, days_back: u32) -> Result<Vec<Paper>> {
        let start_date = Utc::now() - ChronoDuration::days(days_back as i64);
        let search = self.keywords.join(" OR ");

        let response = self
            .client
            .get(PRL_FEED_URL)
            .query(&[("journal", "PRL"), ("search", search.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let xml = response.text().await?;
        let papers = self.parse_rss(&xml, start_date);
        info!("PRL 找到 {} 篇论文", papers.len());
        Ok(papers)
    }

    fn parse_rss(&self, xml: &str, start_date: DateTime<Utc>) -> Vec<Paper> {
        let rss: Rss = match quick_xml::de::from_str(xml) {
            Ok(rss) => rss,
            Err(e) => {
                warn!("PRL RSS 解析失败: {}", e);
                return vec![];
            }
        };

        rss.channel
            .items
            .into_iter()
            .filter(|item| self.within_window(item, start_date))
            .filter(|item| self.matches_keywords(item))
            .map(|item| Paper {
                id: item.link.clone(),
                title: item.title.trim().to_string(),
                authors: item.creators,
                abstract_text: item.description.trim().to_string(),
                published: item.pub_date,
                url: item.link.clone(),
                pdf_url: item.link.replace("abstract", "pdf"),
                category: "PRL".to_string(),
            })
            .collect()
    }

    /// 发布时间无法解析的条目保守地保留
    fn within_window(&self, item: &Item, start_date: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc2822(&item.pub_date) {
            Ok(published) => published.with_timezone(&Utc) >= start_date,
            Err(_) => true,
        }
    }

    fn matches_keywords(&self, item: &Item) -> bool {
        if self.keywords.is_empty() {
            return true;
        }

        let haystack = format!("{} {}", item.title, item.description).to_lowercase();
        self.keywords
            .iter()
            .any(|kw| haystack.contains(&kw.trim().to_lowercase()))
    }
}
