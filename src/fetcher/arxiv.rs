use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use tracing::{info, warn};
use std::time::Duration;

use crate::config::FetcherConfig;
use super::Paper;

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivFetcher {
    client: Client,
    keywords: Vec<String>,
    max_results: usize,
    max_retries: u32,
}

impl ArxivFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            keywords: config.keywords.clone(),
            max_results: config.max_results,
            max_retries: 3,
        }
    }

    /// 获取最近几天匹配关键词的论文，按提交时间降序
    pub async fn fetch_recent_papers(&self, days_back: u32) -> Result<Vec<Paper>> {
        let end_date = Utc::now();
        let start_date = end_date - ChronoDuration::days(days_back as i64);

        let keyword_query = self
            .keywords
            .iter()
            .map(|kw| format!("abs:\"{}\"", kw.trim()))
            .collect::<Vec<_>>()
            .join(" OR ");
        let date_range = format!(
            "[{} TO {}]",
            start_date.format("%Y%m%d0000"),
            end_date.format("%Y%m%d2359")
        );
        let query = format!("({}) AND submittedDate:{}", keyword_query, date_range);

        info!("搜索查询: {}", query);

        for attempt in 1..=self.max_retries {
            // 请求前延迟，arXiv 要求至少3秒间隔
            tokio::time::sleep(Duration::from_secs(3 * attempt as u64)).await;

            let response = match self
                .client
                .get(ARXIV_API_URL)
                .query(&[
                    ("search_query", query.as_str()),
                    ("start", "0"),
                    ("max_results", &self.max_results.to_string()),
                    ("sortBy", "submittedDate"),
                    ("sortOrder", "descending"),
                ])
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("请求失败 (第 {}/{} 次): {}", attempt, self.max_retries, e);
                    continue;
                }
            };

            let status = response.status();
            let text = response.text().await?;

            // 429/502/503 或响应体含 "Rate exceeded" 都视为限流/服务不可用
            if status.as_u16() == 429 || status.as_u16() == 502 || status.as_u16() == 503
                || text.contains("Rate exceeded")
            {
                warn!("arXiv 返回 {} (第 {}/{} 次尝试)", status, attempt, self.max_retries);
                if attempt < self.max_retries {
                    let backoff = Duration::from_secs(30 * attempt as u64);
                    info!("等待 {}s 后重试...", backoff.as_secs());
                    tokio::time::sleep(backoff).await;
                }
                continue;
            }

            let papers = parse_arxiv_response(&text);
            info!("arXiv 找到 {} 篇论文", papers.len());
            return Ok(papers);
        }

        warn!("arXiv API 请求在 {} 次重试后仍然失败", self.max_retries);
        Ok(vec![])
    }
}

fn parse_arxiv_response(xml: &str) -> Vec<Paper> {
    let mut papers = Vec::new();

    if !xml.contains("<entry>") {
        warn!("XML中没有找到<entry>标签");
        return papers;
    }

    for entry_text in xml.split("<entry>").skip(1) {
        if let Some(paper) = parse_entry(entry_text) {
            papers.push(paper);
        }
    }

    if papers.is_empty() {
        warn!("未能解析到论文，可能是XML格式问题");
    }

    papers
}

fn parse_entry(entry_text: &str) -> Option<Paper> {
    let id = extract_tag(entry_text, "id")?;

    let title = unescape_xml(&extract_tag(entry_text, "title")?)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let abstract_text = extract_tag(entry_text, "summary")
        .map(|s| {
            unescape_xml(&s)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let published = extract_tag(entry_text, "published").unwrap_or_default();

    let mut authors = Vec::new();
    for author_block in entry_text.split("<author>").skip(1) {
        if let Some(name) = extract_tag(author_block, "name") {
            authors.push(unescape_xml(name.trim()));
        }
    }

    // 提取PDF链接
    let pdf_url = if let Some(pdf_id) = id.strip_prefix("http://arxiv.org/abs/") {
        format!("http://arxiv.org/pdf/{}.pdf", pdf_id)
    } else {
        format!("{}.pdf", id.replace("/abs/", "/pdf/"))
    };

    let category = entry_text
        .split("<arxiv:primary_category term=\"")
        .nth(1)
        .and_then(|block| block.find('"').map(|end| block[..end].to_string()))
        .unwrap_or_default();

    Some(Paper {
        id: id.clone(),
        title,
        authors,
        abstract_text,
        published,
        url: id,
        pdf_url,
        category,
    })
}

fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);

    let start = text.find(&start_tag)? + start_tag.len();
    let end = text.find(&end_tag)?;

    Some(text[start..end].to_string())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ENTRY: &str = r#"
  <id>http://arxiv.org/abs/2401.01234v1</id>
  <title>Quantum Imaging
  Beyond the Diffraction Limit</title>
  <summary>We propose a protocol using entangled photon pairs &amp; spatial modes.</summary>
  <published>2026-08-20T12:00:00Z</published>
  <author><name>A. Einstein</name></author>
  <author><name>N. Bohr</name></author>
  <arxiv:primary_category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
</entry>"#;

    #[test]
    fn test_parse_entry() {
        let paper = parse_entry(SAMPLE_ENTRY).unwrap();

        assert_eq!(paper.title, "Quantum Imaging Beyond the Diffraction Limit");
        assert_eq!(
            paper.abstract_text,
            "We propose a protocol using entangled photon pairs & spatial modes."
        );
        assert_eq!(paper.authors, vec!["A. Einstein", "N. Bohr"]);
        assert_eq!(paper.url, "http://arxiv.org/abs/2401.01234v1");
        assert_eq!(paper.pdf_url, "http://arxiv.org/pdf/2401.01234v1.pdf");
        assert_eq!(paper.category, "quant-ph");
    }

    #[test]
    fn test_parse_response_without_entries() {
        let papers = parse_arxiv_response("<feed></feed>");
        assert!(papers.is_empty());
    }

    #[test]
    fn test_parse_entry_missing_summary() {
        let entry = r#"
  <id>http://arxiv.org/abs/2401.09999v1</id>
  <title>No Abstract Here</title>
  <published>2026-08-20T12:00:00Z</published>
</entry>"#;
        let paper = parse_entry(entry).unwrap();
        assert_eq!(paper.abstract_text, "");
    }
}
