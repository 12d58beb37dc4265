//! Cross-node integration tests for the DAG scheduler: result passing
//! between nodes, fan-in over multiple dependencies, and the time-budget
//! skip path. No external services involved, so none of these are
//! `#[ignore]`d.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sentineldesk_common::config::RunMode;
use sentineldesk_engine::context::RunContext;
use sentineldesk_engine::dag::Dag;

#[tokio::test]
async fn downstream_node_reads_upstream_result_through_run_context() {
    let mut dag = Dag::new();

    dag.add_node("produce", &[], |ctx| {
        Box::pin(async move {
            ctx.set_result("produce", &vec![1, 2, 3]);
            Ok(())
        })
    })
    .unwrap();

    dag.add_node("consume", &["produce"], |ctx| {
        Box::pin(async move {
            let values: Vec<i32> = ctx.get_result("produce").unwrap_or_default();
            ctx.increment("consumed_sum", values.iter().sum::<i32>() as u64);
            Ok(())
        })
    })
    .unwrap();

    let ctx = RunContext::new(RunMode::Incremental, None, None);
    let summary = dag.execute(&ctx, false).await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(ctx.get_stat("consumed_sum"), 6);
}

#[tokio::test]
async fn a_fan_in_node_only_runs_after_every_dependency_completes() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut dag = Dag::new();

    for name in ["left", "right"] {
        let order = Arc::clone(&order);
        dag.add_node(name, &[], move |_ctx| {
            let order = Arc::clone(&order);
            let name = name.to_string();
            Box::pin(async move {
                order.lock().unwrap().push(name);
                Ok(())
            })
        })
        .unwrap();
    }

    let join_order = Arc::clone(&order);
    dag.add_node("join", &["left", "right"], move |_ctx| {
        let order = Arc::clone(&join_order);
        Box::pin(async move {
            order.lock().unwrap().push("join".to_string());
            Ok(())
        })
    })
    .unwrap();

    let ctx = RunContext::new(RunMode::Incremental, None, None);
    let summary = dag.execute(&ctx, false).await.unwrap();

    assert_eq!(summary.completed, 3);
    let recorded = order.lock().unwrap().clone();
    assert_eq!(recorded.last(), Some(&"join".to_string()));
}

#[tokio::test]
async fn nodes_are_skipped_once_the_time_budget_is_exhausted() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut dag = Dag::new();

    dag.add_node("a", &[], |_ctx| Box::pin(async { Ok(()) })).unwrap();

    let c = Arc::clone(&calls);
    dag.add_node("b", &["a"], move |_ctx| {
        let c = Arc::clone(&c);
        Box::pin(async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .unwrap();

    // A budget of zero minutes has already elapsed by the time the DAG
    // runs its first node.
    let ctx = RunContext::new(RunMode::Incremental, None, None).with_time_budget(0);
    let summary = dag.execute(&ctx, false).await.unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(ctx.error_count() >= 1);
}

#[tokio::test]
async fn a_failed_node_does_not_block_an_independent_branch() {
    let independent_ran = Arc::new(AtomicUsize::new(0));
    let mut dag = Dag::new();

    dag.add_node("flaky", &[], |_ctx| Box::pin(async { Err("boom".to_string()) }))
        .unwrap();

    let ran = Arc::clone(&independent_ran);
    dag.add_node("independent", &[], move |_ctx| {
        let ran = Arc::clone(&ran);
        Box::pin(async move {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .unwrap();

    dag.add_node("depends_on_flaky", &["flaky"], |_ctx| Box::pin(async { Ok(()) }))
        .unwrap();

    let ctx = RunContext::new(RunMode::Incremental, None, None);
    let summary = dag.execute(&ctx, false).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(independent_ran.load(Ordering::SeqCst), 1);
}
