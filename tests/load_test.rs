//! Concurrent dispatch load test.

use axum::{extract::Path, routing::get, Router};
use inproc_dispatcher::{Dispatcher, RequestDescriptor};
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_are_independent() {
    // 1. Setup handlers, one per host
    let dispatcher = Dispatcher::new();
    for host in 0..4 {
        let app = Router::new().route(
            "/item/{id}",
            get(move |Path(id): Path<u32>| async move {
                // Stagger completion so responses interleave.
                tokio::time::sleep(Duration::from_millis(u64::from(id % 5))).await;
                format!("host{host}:item{id}")
            }),
        );
        dispatcher.route(format!("host{host}.local"), app);
    }

    // 2. Run Load Test
    let concurrency = 20;
    let requests_per_task = 50;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task_id in 0..concurrency {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let mut mismatches = 0;
            for i in 0..requests_per_task {
                let host = (task_id + i) % 4;
                let id = task_id * requests_per_task + i;
                let url = format!("http://host{host}.local/item/{id}");
                let res = dispatcher.request(RequestDescriptor::get(&url).unwrap()).await.unwrap();
                if res.body.text().await.unwrap() != format!("host{host}:item{id}") {
                    mismatches += 1;
                }
            }
            mismatches
        }));
    }

    let mut mismatches = 0;
    for task in tasks {
        mismatches += task.await.unwrap();
    }

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", concurrency * requests_per_task);
    println!("Total Duration: {:?}", start.elapsed());

    assert_eq!(mismatches, 0, "every response must belong to its own request");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registration_during_traffic() {
    let dispatcher = Dispatcher::new();
    dispatcher.route("stable.local", Router::new().route("/", get(|| async { "stable" })));

    let writer = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            for i in 0..100 {
                dispatcher.route(format!("extra{i}.local"), Router::new().route("/", get(|| async { "extra" })));
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..100 {
        let res = dispatcher
            .request(RequestDescriptor::get("http://stable.local/").unwrap())
            .await
            .unwrap();
        assert_eq!(res.body.text().await.unwrap(), "stable");
    }

    writer.await.unwrap();
    assert_eq!(dispatcher.routes().len(), 101);
}
