use super::*;

#[tokio::test]
async fn shutdown_cancels_pending_and_running_tasks() {
    let h = create_test_downloader(1).await;
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    h.source.add("running", MockMedia::new("Running", 10).gated(gate));
    h.source.add("pending", MockMedia::new("Pending", 10));
    let mut rx = h.downloader.subscribe();

    let (running_id, running) = h
        .downloader
        .submit(TaskDescriptor::raw("running", None))
        .await
        .unwrap();
    let (_, pending) = h
        .downloader
        .submit(TaskDescriptor::raw("pending", None))
        .await
        .unwrap();
    loop {
        if let Event::Started { id, .. } = next_event(&mut rx).await {
            assert_eq!(id, running_id);
            break;
        }
    }

    tokio::time::timeout(Duration::from_secs(5), h.downloader.shutdown())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome(running).await.unwrap_err().kind, ErrorKind::Cancelled);
    assert_eq!(outcome(pending).await.unwrap_err().kind, ErrorKind::Cancelled);
    assert_eq!(h.downloader.queue_size().await, 0);

    // Shutdown may be broadcast before the running task's terminal event
    let mut events = Vec::new();
    while events.iter().filter(|e: &&Event| e.is_terminal()).count() < 2
        || !events.iter().any(|e| matches!(e, Event::Shutdown))
    {
        events.push(next_event(&mut rx).await);
    }
    assert_eq!(queue_sizes(&events).last(), Some(&0));
}

#[tokio::test]
async fn enqueue_after_shutdown_is_refused() {
    let h = create_test_downloader(1).await;
    h.downloader.shutdown().await.unwrap();

    let err = h.downloader.submit_audio_task("src", None).await.unwrap_err();
    assert!(matches!(err, Error::ShuttingDown), "got {:?}", err);
    assert_eq!(h.downloader.queue_size().await, 0);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let h = create_test_downloader(1).await;
    h.downloader.shutdown().await.unwrap();

    let mut rx = h.downloader.subscribe();
    h.downloader.shutdown().await.unwrap();
    assert!(rx.try_recv().is_err(), "second shutdown should emit nothing");
}

#[tokio::test]
async fn wait_until_idle_returns_immediately_when_empty() {
    let h = create_test_downloader(1).await;
    idle(&h.downloader).await;
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(temp_dir.path(), 0);
    let collaborators = Collaborators::with_source(
        MockSource::default(),
        Arc::new(MockTranscoder::default()),
        Arc::new(crate::storage::FileStorage),
    );

    let result = MediaDownloader::with_collaborators(config, collaborators).await;
    match result {
        Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("queue_parallelism")),
        Err(other) => panic!("expected config error, got {:?}", other),
        Ok(_) => panic!("expected config error"),
    }
}

#[tokio::test]
async fn new_creates_output_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(temp_dir.path(), 1);
    let output_dir = config.download.output_dir.clone();
    assert!(!output_dir.exists());

    let downloader = MediaDownloader::new(config).await.unwrap();
    assert!(output_dir.is_dir());
    assert_eq!(downloader.get_config().download.queue_parallelism, 1);
}

#[tokio::test]
async fn event_stream_yields_queue_events() {
    use tokio_stream::StreamExt;

    let h = create_test_downloader(1).await;
    h.source.add("src", MockMedia::new("Song", 10));
    let mut stream = h.downloader.events();

    let id = h.downloader.submit_raw_task("src", None).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, Event::Queued { id: queued, .. } if queued == id));
}

#[tokio::test]
async fn shutdown_completes_when_drained_callback_panics() {
    let h = create_test_downloader(1).await;
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    h.source
        .add("blocker", MockMedia::new("Blocker", 10).gated(gate.clone()));
    h.source.add("waiting", MockMedia::new("Waiting", 10));

    h.downloader.submit_raw_task("blocker", None).await.unwrap();
    h.downloader
        .enqueue(TaskDescriptor::raw("waiting", None), |_| {
            panic!("callback failure");
        })
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), h.downloader.shutdown())
        .await
        .expect("shutdown should not wait on a panicked callback")
        .unwrap();
    assert_eq!(h.downloader.queue_size().await, 0);
}
