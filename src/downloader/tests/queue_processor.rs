use super::*;

#[tokio::test]
async fn dispatch_moves_pending_to_active_without_queue_size() {
    let h = create_test_downloader(1).await;
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    h.source
        .add("first", MockMedia::new("First", 10).gated(gate.clone()));
    h.source
        .add("second", MockMedia::new("Second", 10).gated(gate.clone()));
    let mut rx = h.downloader.subscribe();

    let first = h.downloader.submit_raw_task("first", None).await.unwrap();
    h.downloader.submit_raw_task("second", None).await.unwrap();

    // Wait until the first task holds the only slot
    loop {
        if let Event::Started { id, .. } = next_event(&mut rx).await {
            assert_eq!(id, first);
            break;
        }
    }
    let stats = h.downloader.stats().await;
    assert_eq!(stats.active, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.capacity, 1);
    assert_eq!(stats.total(), 2);

    gate.add_permits(2);
    idle(&h.downloader).await;

    let stats = h.downloader.stats().await;
    assert_eq!((stats.active, stats.pending), (0, 0));
}

#[tokio::test]
async fn queue_size_totals_ignore_dispatch() {
    let h = create_test_downloader(1).await;
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    h.source.add("a", MockMedia::new("A", 10).gated(gate.clone()));
    h.source.add("b", MockMedia::new("B", 10).gated(gate.clone()));
    let mut rx = h.downloader.subscribe();

    h.downloader.submit_raw_task("a", None).await.unwrap();
    h.downloader.submit_raw_task("b", None).await.unwrap();
    gate.add_permits(2);

    let events = collect_until_terminal(&mut rx, 2).await;
    assert_eq!(queue_sizes(&events), vec![1, 2, 1, 0]);
}

#[tokio::test]
async fn slot_is_reused_after_each_completion() {
    let h = create_test_downloader(1).await;
    let mut receivers = Vec::new();
    for i in 0..4 {
        let name = format!("src-{}", i);
        h.source.add(&name, MockMedia::new(&name, 20));
        let (_, rx) = h
            .downloader
            .submit(TaskDescriptor::raw(name, None))
            .await
            .unwrap();
        receivers.push(rx);
    }

    for rx in receivers {
        assert!(outcome(rx).await.is_ok());
    }
    assert_eq!(h.source.probe.max(), 1);
}
