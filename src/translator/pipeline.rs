use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::config::TranslatorConfig;
use crate::fetcher::Paper;

use super::batch::{self, BatchStrategy, TranslatedPaper, TranslationResult, TranslationUnit, UnitStatus};
use super::retry::{RetryPolicy, TRANSLATION_FAILED};
use super::{LlmTranslator, Translate};

/// 翻译管线：拆分 -> 带重试翻译 -> 保序组装。
/// 管线自身无状态，每次 process 调用独立
pub struct TranslationPipeline<T: Translate> {
    translator: T,
    retry: RetryPolicy,
    strategy: BatchStrategy,
    concurrency: usize,
}

impl TranslationPipeline<LlmTranslator> {
    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(
            LlmTranslator::new(config.clone()),
            RetryPolicy::from_config(config),
            config.batch_strategy,
            config.concurrency,
        )
    }
}

impl<T: Translate> TranslationPipeline<T> {
    pub fn new(translator: T, retry: RetryPolicy, strategy: BatchStrategy, concurrency: usize) -> Self {
        Self {
            translator,
            retry,
            strategy,
            concurrency: concurrency.max(1),
        }
    }

    /// 翻译一批论文。输出与输入一一对应、顺序一致；
    /// 单个单元失败以哨兵值出现在结果里，不中断其余单元
    pub async fn process(&self, papers: &[Paper]) -> Vec<TranslatedPaper> {
        if papers.is_empty() {
            return Vec::new();
        }

        let units = batch::plan(papers, self.strategy);
        info!(
            "翻译 {} 篇论文，策略 {:?}，共 {} 个单元",
            papers.len(),
            self.strategy,
            units.len()
        );

        let results = if self.concurrency <= 1 {
            self.run_sequential(units).await
        } else {
            self.run_concurrent(units).await
        };

        batch::assemble(papers, &results, self.strategy)
    }

    async fn run_sequential(&self, units: Vec<TranslationUnit>) -> Vec<TranslationResult> {
        let mut results = Vec::with_capacity(units.len());
        for unit in units {
            results.push(self.run_unit(unit).await);
        }
        results
    }

    /// 有界并发执行。结果按单元序号回排，与完成顺序无关
    async fn run_concurrent(&self, units: Vec<TranslationUnit>) -> Vec<TranslationResult> {
        let this = &*self;
        let mut indexed: Vec<(usize, TranslationResult)> = stream::iter(units.into_iter().enumerate())
            .map(move |(index, unit)| async move { (index, this.run_unit(unit).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    async fn run_unit(&self, unit: TranslationUnit) -> TranslationResult {
        // 空白单元不经过远程调用
        if unit.text.trim().is_empty() {
            debug!("单元 ({}, {:?}) 为空，跳过远程调用", unit.paper_index, unit.kind);
            return TranslationResult {
                paper_index: unit.paper_index,
                kind: unit.kind,
                text: String::new(),
                status: UnitStatus::Success,
            };
        }

        let text = self.retry.run(&self.translator, &unit.text).await;
        let status = if text == TRANSLATION_FAILED {
            UnitStatus::Failed
        } else {
            UnitStatus::Success
        };

        TranslationResult {
            paper_index: unit.paper_index,
            kind: unit.kind,
            text,
            status,
        }
    }
}
