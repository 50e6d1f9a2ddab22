//! arxiv-digest - arXiv 每日论文摘要与翻译推送系统
//!
//! 抓取最近发表的论文，翻译标题与摘要，生成中文日报。

pub mod config;
pub mod digest;
pub mod fetcher;
pub mod translator;
pub mod utils;
