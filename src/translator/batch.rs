use serde::{Deserialize, Serialize};
use tracing::warn;
use std::collections::HashMap;

use crate::fetcher::Paper;
use super::retry::TRANSLATION_FAILED;

/// 标题译文标记行
pub const TITLE_MARKER: &str = "[标题翻译]";
/// 摘要译文标记行
pub const ABSTRACT_MARKER: &str = "[摘要翻译]";

/// 请求粒度策略。三种粒度解析方式不同，必须与配置匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStrategy {
    /// 每篇论文的标题、摘要各一个请求。请求最多，解析最稳
    PerField,
    /// 每篇论文标题+摘要合并成一个请求，靠标记行拆分
    PerPaper,
    /// 整批论文合并成一个请求，靠 <<PAPER_n>> 分隔行拆分。
    /// 最脆弱的策略，结果只保证尽力对齐
    WholeBatch,
}

impl Default for BatchStrategy {
    fn default() -> Self {
        BatchStrategy::PerField
    }
}

/// 单元在论文中的来源字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Title,
    Abstract,
    Combined,
    Batch,
}

/// 一次翻译请求的文本单元，带来源标记以便结果回填
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub paper_index: usize,
    pub kind: UnitKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Success,
    Failed,
}

/// 每个提交的单元必定产出恰好一条结果，失败也不例外
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub paper_index: usize,
    pub kind: UnitKind,
    pub text: String,
    pub status: UnitStatus,
}

/// 输出记录，与输入论文一一对应且顺序一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedPaper {
    pub title_en: String,
    pub title_zh: String,
    pub abstract_en: String,
    pub abstract_zh: String,
    pub url: String,
}

/// 按策略把论文列表拆分成翻译单元
pub fn plan(papers: &[Paper], strategy: BatchStrategy) -> Vec<TranslationUnit> {
    match strategy {
        BatchStrategy::PerField => papers
            .iter()
            .enumerate()
            .flat_map(|(i, p)| {
                [
                    TranslationUnit {
                        paper_index: i,
                        kind: UnitKind::Title,
                        text: p.title.clone(),
                    },
                    TranslationUnit {
                        paper_index: i,
                        kind: UnitKind::Abstract,
                        text: p.abstract_text.clone(),
                    },
                ]
            })
            .collect(),
        BatchStrategy::PerPaper => papers
            .iter()
            .enumerate()
            .map(|(i, p)| TranslationUnit {
                paper_index: i,
                kind: UnitKind::Combined,
                text: combined_source(p),
            })
            .collect(),
        BatchStrategy::WholeBatch => {
            if papers.is_empty() {
                return vec![];
            }
            let text = papers
                .iter()
                .enumerate()
                .map(|(i, p)| format!("<<PAPER_{}>>\n{}", i, combined_source(p)))
                .collect::<Vec<_>>()
                .join("\n\n");
            vec![TranslationUnit {
                paper_index: 0,
                kind: UnitKind::Batch,
                text,
            }]
        }
    }
}

/// 把翻译结果按输入顺序组装回论文记录。
/// 严格保序：第 i 条输出对应第 i 篇输入
pub fn assemble(
    papers: &[Paper],
    results: &[TranslationResult],
    strategy: BatchStrategy,
) -> Vec<TranslatedPaper> {
    match strategy {
        BatchStrategy::PerField => assemble_per_field(papers, results),
        BatchStrategy::PerPaper => assemble_per_paper(papers, results),
        BatchStrategy::WholeBatch => assemble_whole_batch(papers, results),
    }
}

fn combined_source(paper: &Paper) -> String {
    format!(
        "{}\n{}\n\n{}\n{}",
        TITLE_MARKER, paper.title, ABSTRACT_MARKER, paper.abstract_text
    )
}

fn base_record(paper: &Paper) -> TranslatedPaper {
    TranslatedPaper {
        title_en: paper.title.clone(),
        title_zh: String::new(),
        abstract_en: paper.abstract_text.clone(),
        abstract_zh: String::new(),
        url: paper.url.clone(),
    }
}

fn assemble_per_field(papers: &[Paper], results: &[TranslationResult]) -> Vec<TranslatedPaper> {
    let lookup: HashMap<(usize, UnitKind), &str> = results
        .iter()
        .map(|r| ((r.paper_index, r.kind), r.text.as_str()))
        .collect();

    papers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut record = base_record(p);
            record.title_zh = field_or_empty(&lookup, i, UnitKind::Title);
            record.abstract_zh = field_or_empty(&lookup, i, UnitKind::Abstract);
            record
        })
        .collect()
}

fn field_or_empty(
    lookup: &HashMap<(usize, UnitKind), &str>,
    index: usize,
    kind: UnitKind,
) -> String {
    match lookup.get(&(index, kind)) {
        Some(text) => text.to_string(),
        None => {
            warn!("论文 {} 缺少 {:?} 字段的翻译结果", index, kind);
            String::new()
        }
    }
}

fn assemble_per_paper(papers: &[Paper], results: &[TranslationResult]) -> Vec<TranslatedPaper> {
    let lookup: HashMap<usize, &TranslationResult> = results
        .iter()
        .filter(|r| r.kind == UnitKind::Combined)
        .map(|r| (r.paper_index, r))
        .collect();

    papers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut record = base_record(p);
            match lookup.get(&i) {
                Some(result) if result.status == UnitStatus::Failed => {
                    record.title_zh = TRANSLATION_FAILED.to_string();
                    record.abstract_zh = TRANSLATION_FAILED.to_string();
                }
                Some(result) => {
                    let (title_zh, abstract_zh) = split_combined(&result.text);
                    record.title_zh = title_zh;
                    record.abstract_zh = abstract_zh;
                }
                None => {
                    warn!("论文 {} 缺少合并翻译结果", i);
                }
            }
            record
        })
        .collect()
}

fn assemble_whole_batch(papers: &[Paper], results: &[TranslationResult]) -> Vec<TranslatedPaper> {
    let batch = results.iter().find(|r| r.kind == UnitKind::Batch);

    let segments: Vec<String> = match batch {
        Some(result) if result.status == UnitStatus::Failed => {
            return papers
                .iter()
                .map(|p| {
                    let mut record = base_record(p);
                    record.title_zh = TRANSLATION_FAILED.to_string();
                    record.abstract_zh = TRANSLATION_FAILED.to_string();
                    record
                })
                .collect();
        }
        Some(result) => split_batch_response(&result.text),
        None => {
            warn!("缺少整批翻译结果");
            vec![]
        }
    };

    if segments.len() != papers.len() {
        // 分隔符数量与输入不符，按位置尽力对齐，缺失的论文留空
        warn!(
            "整批响应分段数 {} 与论文数 {} 不符，按位置尽力对齐",
            segments.len(),
            papers.len()
        );
    }

    papers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut record = base_record(p);
            if let Some(segment) = segments.get(i) {
                let (title_zh, abstract_zh) = split_combined(segment);
                record.title_zh = title_zh;
                record.abstract_zh = abstract_zh;
            }
            record
        })
        .collect()
}

/// 沿 <<PAPER_n>> 分隔行切分整批响应，分段按出现顺序返回。
/// 响应完全不含分隔行时整体当作第一段，尽力保留已返回的译文
fn split_batch_response(text: &str) -> Vec<String> {
    let has_delimiter = text.lines().any(|line| {
        let trimmed = line.trim();
        trimmed.starts_with("<<PAPER_") && trimmed.ends_with(">>")
    });
    if !has_delimiter {
        if text.trim().is_empty() {
            return vec![];
        }
        warn!("整批响应不含分隔行，整体作为第一段处理");
        return vec![text.to_string()];
    }

    let mut segments: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("<<PAPER_") && trimmed.ends_with(">>") {
            if let Some(segment) = current.take() {
                segments.push(segment);
            }
            current = Some(String::new());
            continue;
        }
        // 首个分隔行之前的内容不属于任何论文，丢弃
        if let Some(ref mut segment) = current {
            segment.push_str(line);
            segment.push('\n');
        }
    }

    if let Some(segment) = current {
        segments.push(segment);
    }

    segments
}

/// 把合并译文按标记行拆回（标题, 摘要）。
/// 标记缺失时按位置降级：首行作标题，其余作摘要
fn split_combined(text: &str) -> (String, String) {
    let text = text.trim();
    if text.is_empty() {
        return (String::new(), String::new());
    }

    if let (Some(t), Some(a)) = (text.find(TITLE_MARKER), text.find(ABSTRACT_MARKER)) {
        if t < a {
            let title = text[t + TITLE_MARKER.len()..a].trim().to_string();
            let abstract_text = text[a + ABSTRACT_MARKER.len()..].trim().to_string();
            return (title, abstract_text);
        }
    }

    warn!("合并译文缺少标记行，按位置降级拆分");
    let mut lines = text.lines();
    let title = lines.next().unwrap_or("").trim().to_string();
    let rest = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (title, rest)
}
