use agent_kernel::dialect::{self, Capability};
use agent_kernel::{
    estimate_tokens, is_approaching_limit, observe, truncate_messages, ContentBlock, HookPipeline, Msg,
    TextBlock, ToolResultBlock, ToolUseBlock,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn create_messages(count: usize, text_size: usize) -> Vec<Msg> {
    let text = "a".repeat(text_size);
    (0..count)
        .map(|i| {
            if i == 0 {
                Msg::system(&text)
            } else if i % 2 == 0 {
                Msg::user(&text)
            } else {
                Msg::assistant(vec![ContentBlock::Text(TextBlock::new(text.clone()))])
            }
        })
        .collect()
}

fn create_messages_with_tools(count: usize) -> Vec<Msg> {
    let mut messages = vec![Msg::system("You are a helpful assistant")];

    for i in 0..count {
        if i % 3 == 0 {
            messages.push(Msg::user("Calculate 2 + 2"));
        } else if i % 3 == 1 {
            let tool_use = ToolUseBlock::new(format!("tool_{i}"), "calculator", json!({"operation": "add", "a": 2, "b": 2}));
            messages.push(Msg::assistant(vec![ContentBlock::ToolUse(tool_use)]));
        } else {
            let tool_result = ToolResultBlock::text(format!("tool_{}", i - 1), "calculator", "4");
            messages.push(Msg::tool(vec![ContentBlock::ToolResult(tool_result)]));
        }
    }

    messages
}

fn bench_estimate_tokens_by_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_tokens_by_count");

    for count in [0, 1, 5, 10, 20, 50, 100].iter() {
        let messages = create_messages(*count, 100);
        group.bench_with_input(BenchmarkId::from_parameter(count), &messages, |b, msgs| {
            b.iter(|| estimate_tokens(black_box(msgs)));
        });
    }

    group.finish();
}

fn bench_estimate_tokens_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_tokens_by_size");

    for size in [10, 100, 1000, 10000].iter() {
        let messages = create_messages(10, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &messages, |b, msgs| {
            b.iter(|| estimate_tokens(black_box(msgs)));
        });
    }

    group.finish();
}

fn bench_estimate_tokens_with_tools(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_tokens_with_tools");

    for count in [3, 9, 30, 90].iter() {
        let messages = create_messages_with_tools(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &messages, |b, msgs| {
            b.iter(|| estimate_tokens(black_box(msgs)));
        });
    }

    group.finish();
}

fn bench_truncate_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncate_messages");

    let test_cases = vec![
        ("small_keep_5", create_messages(20, 100), 5, true),
        ("medium_keep_10", create_messages(50, 100), 10, true),
        ("large_keep_20", create_messages(100, 100), 20, true),
        ("no_preserve_system", create_messages(50, 100), 10, false),
    ];

    for (name, messages, keep, preserve) in test_cases {
        group.bench_with_input(
            BenchmarkId::new(name, format!("{}/{}", messages.len(), keep)),
            &(messages, keep, preserve),
            |b, (msgs, k, p)| {
                b.iter(|| truncate_messages(black_box(msgs), black_box(*k), black_box(*p)));
            },
        );
    }

    group.finish();
}

fn bench_truncate_messages_with_tools(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncate_messages_with_tools");

    for count in [30, 90].iter() {
        let messages = create_messages_with_tools(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &messages, |b, msgs| {
            b.iter(|| truncate_messages(black_box(msgs), black_box(10), black_box(true)));
        });
    }

    group.finish();
}

fn bench_is_approaching_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_approaching_limit");

    for count in [10, 50, 100].iter() {
        let messages = create_messages(*count, 500);
        group.bench_with_input(BenchmarkId::from_parameter(count), &messages, |b, msgs| {
            b.iter(|| is_approaching_limit(black_box(msgs), black_box(32000), black_box(0.9)));
        });
    }

    group.finish();
}

fn bench_realistic_workflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("realistic_workflow");

    let messages = create_messages(50, 200);

    group.bench_function("check_and_truncate", |b| {
        b.iter(|| {
            let msgs = black_box(&messages);
            let tokens = estimate_tokens(msgs);
            if tokens > black_box(10000) {
                truncate_messages(msgs, black_box(10), black_box(true))
            } else {
                msgs.to_vec()
            }
        });
    });

    group.finish();
}

/// How much a growing hook pipeline costs per dispatch — every hook runs on
/// every event, so this is O(hook count) by design, not O(1) with early exit.
fn bench_hook_pipeline_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("hook_pipeline_dispatch");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for hook_count in [1, 5, 20, 50].iter() {
        let mut pipeline = HookPipeline::new();
        for i in 0..*hook_count {
            pipeline.add_hook(i as i64, observe(|_event, _ctx| {}));
        }
        let chain = pipeline.snapshot();

        group.bench_with_input(BenchmarkId::from_parameter(hook_count), &chain, |b, chain| {
            b.iter(|| {
                rt.block_on(async {
                    let ctx = agent_kernel::HookDispatchContext::new();
                    chain.dispatch(agent_kernel::HookEvent::PreCall, &ctx).await
                })
            });
        });
    }

    group.finish();
}

/// Cost of collapsing a multi-speaker conversation into wire messages, the
/// per-model-call step every `Agent::call` with `multi_agent = true` pays.
fn bench_format_multi_agent(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_multi_agent");

    for count in [5, 20, 50, 200].iter() {
        let messages = create_messages(*count, 80);
        group.bench_with_input(BenchmarkId::from_parameter(count), &messages, |b, msgs| {
            b.iter(|| dialect::format_multi_agent(black_box(msgs)));
        });
    }

    group.finish();
}

/// Cost of applying a capability's quirks after formatting — run for the
/// capability with the most post-processing (DeepSeek: name-stripping,
/// system rewrite, reasoning-content pruning, trailing-turn synthesis).
fn bench_apply_deepseek_quirks(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_deepseek_quirks");

    for count in [5, 20, 50, 200].iter() {
        let messages = create_messages(*count, 80);
        group.bench_with_input(BenchmarkId::from_parameter(count), &messages, |b, msgs| {
            b.iter_batched(
                || dialect::format_single_agent(msgs),
                |mut wire| dialect::apply_quirks(Capability::Deepseek, black_box(&mut wire), false),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_estimate_tokens_by_count,
    bench_estimate_tokens_by_size,
    bench_estimate_tokens_with_tools,
    bench_truncate_messages,
    bench_truncate_messages_with_tools,
    bench_is_approaching_limit,
    bench_realistic_workflow,
    bench_hook_pipeline_dispatch,
    bench_format_multi_agent,
    bench_apply_deepseek_quirks,
);
criterion_main!(benches);
