//! 翻译管线端到端测试，使用桩翻译器替代远程调用

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arxiv_digest::fetcher::Paper;
use arxiv_digest::translator::{
    BatchStrategy, RetryPolicy, Translate, TranslateError, TranslationPipeline,
    TRANSLATION_FAILED,
};

fn paper(title: &str, abstract_text: &str, url: &str) -> Paper {
    Paper {
        id: url.to_string(),
        title: title.to_string(),
        authors: vec![],
        abstract_text: abstract_text.to_string(),
        published: String::new(),
        url: url.to_string(),
        pdf_url: String::new(),
        category: String::new(),
    }
}

/// 把输入转大写的确定性桩翻译器，统计被调用次数
struct Uppercase {
    calls: Arc<AtomicUsize>,
}

impl Uppercase {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 返回桩和与之共享的调用计数器
    fn counted() -> (Self, Arc<AtomicUsize>) {
        let stub = Self::new();
        let calls = Arc::clone(&stub.calls);
        (stub, calls)
    }
}

#[async_trait]
impl Translate for Uppercase {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

/// 命中指定子串时报不可重试错误，其余转大写
struct FailsOn {
    needle: &'static str,
}

#[async_trait]
impl Translate for FailsOn {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        if text.contains(self.needle) {
            return Err(TranslateError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(text.to_uppercase())
    }
}

/// 按文本长度延迟后转大写，用于打乱并发完成顺序
struct SlowUppercase;

#[async_trait]
impl Translate for SlowUppercase {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        tokio::time::sleep(Duration::from_millis(200u64.saturating_sub(text.len() as u64))).await;
        Ok(text.to_uppercase())
    }
}

fn pipeline_with(
    translator: Uppercase,
    strategy: BatchStrategy,
) -> TranslationPipeline<Uppercase> {
    TranslationPipeline::new(translator, RetryPolicy::default(), strategy, 1)
}

#[tokio::test]
async fn test_empty_input_returns_empty_without_calls() {
    for strategy in [
        BatchStrategy::PerField,
        BatchStrategy::PerPaper,
        BatchStrategy::WholeBatch,
    ] {
        let (stub, calls) = Uppercase::counted();
        let pipeline = pipeline_with(stub, strategy);
        let output = pipeline.process(&[]).await;
        assert!(output.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_order_preserved_for_every_strategy() {
    let papers = vec![
        paper("alpha one", "first abstract", "u1"),
        paper("beta two", "second abstract", "u2"),
        paper("gamma three", "third abstract", "u3"),
    ];

    for strategy in [
        BatchStrategy::PerField,
        BatchStrategy::PerPaper,
        BatchStrategy::WholeBatch,
    ] {
        let pipeline = pipeline_with(Uppercase::new(), strategy);
        let output = pipeline.process(&papers).await;

        assert_eq!(output.len(), papers.len(), "策略 {:?}", strategy);
        for (record, input) in output.iter().zip(&papers) {
            assert_eq!(record.title_en, input.title);
            assert_eq!(record.title_zh, input.title.to_uppercase());
            assert_eq!(record.abstract_zh, input.abstract_text.to_uppercase());
            assert_eq!(record.url, input.url);
        }
    }
}

#[tokio::test]
async fn test_end_to_end_with_empty_abstract() {
    let papers = vec![paper("A", "B", "u1"), paper("C", "", "u2")];
    let (stub, calls) = Uppercase::counted();
    let pipeline = pipeline_with(stub, BatchStrategy::PerField);

    let output = pipeline.process(&papers).await;

    assert_eq!(output.len(), 2);
    assert_eq!(output[0].title_en, "A");
    assert_eq!(output[0].title_zh, "A");
    assert_eq!(output[0].abstract_en, "B");
    assert_eq!(output[0].abstract_zh, "B");
    assert_eq!(output[0].url, "u1");
    assert_eq!(output[1].title_zh, "C");
    assert_eq!(output[1].abstract_en, "");
    assert_eq!(output[1].abstract_zh, "");
    assert_eq!(output[1].url, "u2");

    // 空摘要不经过翻译器：4个单元里只有3个发起调用
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_idempotent_with_deterministic_stub() {
    let papers = vec![paper("alpha", "one", "u1"), paper("beta", "two", "u2")];
    let pipeline = pipeline_with(Uppercase::new(), BatchStrategy::PerPaper);

    let first = pipeline.process(&papers).await;
    let second = pipeline.process(&papers).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_single_failure_never_blocks_siblings() {
    let papers = vec![
        paper("good paper", "fine", "u1"),
        paper("poison paper", "fine too", "u2"),
        paper("another good", "also fine", "u3"),
    ];
    let pipeline = TranslationPipeline::new(
        FailsOn { needle: "poison" },
        RetryPolicy::default(),
        BatchStrategy::PerField,
        1,
    );

    let output = pipeline.process(&papers).await;

    assert_eq!(output.len(), 3);
    assert_eq!(output[0].title_zh, "GOOD PAPER");
    assert_eq!(output[1].title_zh, TRANSLATION_FAILED);
    // 同一篇论文的另一个字段独立成功
    assert_eq!(output[1].abstract_zh, "FINE TOO");
    assert_eq!(output[2].title_zh, "ANOTHER GOOD");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_output_matches_sequential() {
    let papers = vec![
        paper("a very long title to slow down", "x", "u1"),
        paper("short", "yyyyyyyyyyyyyyyyyyyy", "u2"),
        paper("mid size title", "zzz", "u3"),
    ];

    let sequential = TranslationPipeline::new(
        SlowUppercase,
        RetryPolicy::default(),
        BatchStrategy::PerField,
        1,
    )
    .process(&papers)
    .await;

    let concurrent = TranslationPipeline::new(
        SlowUppercase,
        RetryPolicy::default(),
        BatchStrategy::PerField,
        4,
    )
    .process(&papers)
    .await;

    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent[0].title_zh, "A VERY LONG TITLE TO SLOW DOWN");
    assert_eq!(concurrent[1].title_zh, "SHORT");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_unit_degrades_to_sentinel() {
    /// 永远限流的桩
    struct AlwaysLimited;

    #[async_trait]
    impl Translate for AlwaysLimited {
        async fn translate(&self, _text: &str) -> Result<String, TranslateError> {
            Err(TranslateError::RateLimited("429".to_string()))
        }
    }

    let papers = vec![paper("A", "B", "u1")];
    let retry = RetryPolicy {
        max_retries: 2,
        base_wait: Duration::from_millis(10),
        ..Default::default()
    };
    let pipeline = TranslationPipeline::new(AlwaysLimited, retry, BatchStrategy::PerField, 1);

    let output = pipeline.process(&papers).await;

    assert_eq!(output.len(), 1);
    assert_eq!(output[0].title_zh, TRANSLATION_FAILED);
    assert_eq!(output[0].abstract_zh, TRANSLATION_FAILED);
    // 英文原文与链接仍然完整，日报照常可发
    assert_eq!(output[0].title_en, "A");
    assert_eq!(output[0].url, "u1");
}
