use anyhow::Result;
use chrono::Local;
use tracing::info;
use std::path::PathBuf;

use crate::fetcher::Paper;
use crate::translator::TranslatedPaper;

/// 日报输出端。邮件投递属于外部系统，这里只负责把主题和正文交出去
pub trait DigestSink {
    fn deliver(&self, subject: &str, body: &str) -> Result<()>;
}

/// 把日报写入报告目录的输出端。
/// 文件名形如 {stem}_{日期}.txt，不同报告用不同前缀避免互相覆盖
pub struct FileSink {
    output_dir: PathBuf,
    stem: String,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_stem(output_dir, "digest")
    }

    pub fn with_stem(output_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: stem.into(),
        }
    }
}

impl DigestSink for FileSink {
    fn deliver(&self, subject: &str, body: &str) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        let date_str = Local::now().format("%Y-%m-%d");
        let path = self.output_dir.join(format!("{}_{}.txt", self.stem, date_str));
        std::fs::write(&path, format!("{}\n\n{}", subject, body))?;

        info!("日报已写入: {}", path.display());
        Ok(())
    }
}

/// 构建中文翻译版日报正文
pub fn build_translated_digest(papers: &[TranslatedPaper]) -> String {
    let date_str = Local::now().format("%Y-%m-%d");

    let mut lines = Vec::new();
    lines.push(format!("📌 arXiv Daily Digest — 中文翻译版 ({})\n", date_str));
    lines.push(format!("{}\n", "=".repeat(80)));

    for (i, p) in papers.iter().enumerate() {
        lines.push(format!("【{}】论文标题\n", i + 1));
        lines.push(format!("英文：{}\n", p.title_en));
        lines.push(format!("中文：{}\n\n", p.title_zh));

        lines.push("Abstract (English):\n".to_string());
        lines.push(format!("{}\n\n", p.abstract_en));

        lines.push("摘要（中文翻译）：\n".to_string());
        lines.push(format!("{}\n\n", p.abstract_zh));

        if !p.url.is_empty() {
            lines.push(format!("arXiv链接：{}\n", p.url));
        }

        lines.push(format!("{}\n", "-".repeat(80)));
    }

    lines.join("\n")
}

/// 构建单篇论文的摘要块（英文原文版日报用）
pub fn build_summary(paper: &Paper) -> String {
    let abstract_preview = truncate_at_word(&paper.abstract_text, 800);
    let ellipsis = if paper.abstract_text.len() > 800 { "..." } else { "" };

    let authors = if paper.authors.len() > 3 {
        format!("{}等", paper.authors[..3].join(", "))
    } else {
        paper.authors.join(", ")
    };

    [
        "=".repeat(60),
        format!("📄 标题: {}", paper.title),
        String::new(),
        format!("👥 作者: {}", authors),
        format!("📅 发布时间: {}", paper.published),
        format!("📚 分类: {}", paper.category),
        String::new(),
        "📝 摘要:".to_string(),
        format!("{}{}", abstract_preview, ellipsis),
        String::new(),
        "🔗 链接:".to_string(),
        format!("PDF: {}", paper.pdf_url),
        format!("页面: {}", paper.url),
        "=".repeat(60),
        String::new(),
    ]
    .join("\n")
}

/// 构建"今日无新论文"通知正文
pub fn build_no_papers_notice(keywords: &[String], days_back: u32) -> String {
    let date_str = Local::now().format("%Y-%m-%d");

    format!(
        "📭 今日无新论文 ({date})\n\
         {sep}\n\
         搜索关键词: {keywords}\n\
         时间范围: 最近 {days} 天\n\
         数据源: arXiv.org / PRL\n\n\
         监控系统运行正常，但该时间段内未发现符合条件的新论文。\n\
         如需调整搜索条件，请修改配置文件中的关键词设置。\n",
        date = date_str,
        sep = "=".repeat(60),
        keywords = keywords.join(", "),
        days = days_back,
    )
}

/// 截断到最多 max_bytes 字节，在最后一个空格处断开，
/// 绝不切开 UTF-8 字符
fn truncate_at_word(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    match text[..end].rfind(' ') {
        Some(space) => &text[..space],
        None => &text[..end],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(title: &str, abstract_zh: &str, url: &str) -> TranslatedPaper {
        TranslatedPaper {
            title_en: title.to_string(),
            title_zh: format!("译{}", title),
            abstract_en: "original".to_string(),
            abstract_zh: abstract_zh.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_digest_body_lists_papers_in_order() {
        let papers = vec![
            translated("First", "第一", "u1"),
            translated("Second", "第二", "u2"),
        ];

        let body = build_translated_digest(&papers);

        let first = body.find("First").unwrap();
        let second = body.find("Second").unwrap();
        assert!(first < second);
        assert!(body.contains("【1】"));
        assert!(body.contains("【2】"));
        assert!(body.contains("arXiv链接：u2"));
    }

    #[test]
    fn test_truncate_at_word_boundary() {
        let text = "hello world again";
        assert_eq!(truncate_at_word(text, 13), "hello world");
        assert_eq!(truncate_at_word(text, 100), text);
    }

    #[test]
    fn test_truncate_never_splits_utf8() {
        // 每个汉字占3字节
        let text = "量子计算与量子通信".repeat(50);
        let truncated = truncate_at_word(&text, 800);
        assert!(truncated.len() <= 800);
        // 切片本身合法即证明未切开字符，再次遍历确认
        assert!(truncated.chars().all(|c| c != char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn test_summary_caps_author_list() {
        let paper = Paper {
            id: "x".to_string(),
            title: "T".to_string(),
            authors: vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "Zed".to_string(),
            ],
            abstract_text: "abs".to_string(),
            published: "2026-08-20".to_string(),
            url: "u".to_string(),
            pdf_url: "p".to_string(),
            category: "quant-ph".to_string(),
        };

        let summary = build_summary(&paper);
        assert!(summary.contains("A, B, C等"));
        assert!(!summary.contains("Zed"));
    }

    #[test]
    fn test_file_sinks_with_different_stems_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();

        let summary_sink = FileSink::with_stem(dir.path(), "summary");
        let digest_sink = FileSink::new(dir.path());

        summary_sink.deliver("原文版", "english body").unwrap();
        digest_sink.deliver("翻译版", "translated body").unwrap();

        let date_str = Local::now().format("%Y-%m-%d");
        let summary = std::fs::read_to_string(dir.path().join(format!("summary_{}.txt", date_str))).unwrap();
        let digest = std::fs::read_to_string(dir.path().join(format!("digest_{}.txt", date_str))).unwrap();

        assert!(summary.contains("english body"));
        assert!(digest.contains("translated body"));
        assert!(digest.starts_with("翻译版"));
    }

    #[test]
    fn test_no_papers_notice_mentions_keywords() {
        let notice = build_no_papers_notice(&["quantum".to_string(), "photonics".to_string()], 3);
        assert!(notice.contains("quantum, photonics"));
        assert!(notice.contains("最近 3 天"));
    }
}
