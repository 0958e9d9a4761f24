//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Batch lifecycle over a manually driven gateway
//! - Deadline, late-reply and rejection behavior end to end
//! - Stress run over the in-process gateway

#[cfg(test)]
mod batch_lifecycle_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{BatchStatus, Completion};
    use fanout::{BatchSpec, FanOutCoordinator};
    use gateway::ManualGateway;

    fn spec(count: usize, timeout: Duration) -> BatchSpec {
        BatchSpec {
            destination: "simple.echo".into(),
            count,
            timeout,
        }
    }

    /// Every request answered: batch completes with one entry per index,
    /// sorted, each carrying the reply for that index.
    #[tokio::test]
    async fn test_all_replies_complete_batch() {
        let gateway = Arc::new(ManualGateway::new());
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));

        let handle = coordinator.start(&spec(8, Duration::from_secs(5)), |i| {
            Bytes::from(format!("req-{i}"))
        });
        assert_eq!(gateway.inflight_len(), 8);
        assert!(!handle.is_done());

        // Answer in reverse dispatch order
        let tokens = gateway.inflight_tokens();
        for token in tokens.into_iter().rev() {
            let payload = gateway.payload(token).unwrap();
            gateway.complete(token, Completion::Reply(payload));
        }

        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
        assert_eq!(result.entries.len(), 8);
        for (i, entry) in result.entries.iter().enumerate() {
            assert_eq!(entry.index, i);
            match &entry.outcome {
                contracts::Outcome::Success { reply, .. } => {
                    assert_eq!(&reply[..], format!("req-{i}").as_bytes());
                }
                other => panic!("expected success at index {i}, got {other:?}"),
            }
        }
    }

    /// An empty batch finalizes before the handle is returned.
    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let coordinator = FanOutCoordinator::new(Arc::new(ManualGateway::new()));
        let handle = coordinator.start(&spec(0, Duration::from_secs(5)), |_| Bytes::new());

        assert!(handle.is_done());
        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
        assert!(result.entries.is_empty());
    }

    /// Mixed replies and failures still count down to a Completed batch.
    #[tokio::test]
    async fn test_remote_failures_count_toward_completion() {
        let gateway = Arc::new(ManualGateway::new());
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));

        let handle = coordinator.start(&spec(4, Duration::from_secs(5)), |i| {
            Bytes::from(format!("req-{i}"))
        });

        let tokens = gateway.inflight_tokens();
        for (i, token) in tokens.into_iter().enumerate() {
            if i % 2 == 0 {
                gateway.complete(token, Completion::Reply(Bytes::from_static(b"ok")));
            } else {
                gateway.complete(token, Completion::Failure("remote blew up".into()));
            }
        }

        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 2);
        assert_eq!(result.timed_out_count(), 0);
    }

    /// Scripted synchronous rejections are folded in as failures without
    /// stalling the batch.
    #[tokio::test]
    async fn test_rejections_fold_into_result() {
        let gateway = Arc::new(ManualGateway::new());
        gateway.reject_dispatches([1, 3]);
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));

        let handle = coordinator.start(&spec(5, Duration::from_secs(5)), |i| {
            Bytes::from(format!("req-{i}"))
        });

        // Only the accepted dispatches are held
        assert_eq!(gateway.inflight_len(), 3);
        gateway.complete_all_with_echo();

        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
        assert_eq!(result.success_count(), 3);
        assert_eq!(result.failure_count(), 2);
        assert_eq!(coordinator.metrics().rejections_recorded(), 2);

        // Rejected indexes carry the rejection text
        for entry in &result.entries {
            if let contracts::Outcome::Failure { error } = &entry.outcome {
                assert!(error.contains("scripted rejection"), "got: {error}");
                assert!(entry.index == 1 || entry.index == 3);
            }
        }
    }

    /// Callbacks registered before and after finalization both run.
    #[tokio::test]
    async fn test_on_done_runs_for_every_registration() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let gateway = Arc::new(ManualGateway::new());
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));
        let handle = coordinator.start(&spec(1, Duration::from_secs(5)), |_| Bytes::new());

        let fired = Arc::new(AtomicUsize::new(0));
        let early = Arc::clone(&fired);
        handle.on_done(move |result| {
            assert_eq!(result.status, BatchStatus::Completed);
            early.fetch_add(1, Ordering::SeqCst);
        });

        gateway.complete_all_with_echo();
        handle.wait().await.unwrap();

        let late = Arc::clone(&fired);
        handle.on_done(move |_| {
            late.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}

#[cfg(test)]
mod deadline_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{BatchStatus, Completion};
    use fanout::{BatchSpec, FanOutCoordinator};
    use gateway::ManualGateway;

    fn spec(count: usize, timeout: Duration) -> BatchSpec {
        BatchSpec {
            destination: "simple.echo".into(),
            count,
            timeout,
        }
    }

    /// Seven of ten answer in time; the deadline retires the rest as
    /// TimedOut without touching the recorded outcomes.
    #[tokio::test(start_paused = true)]
    async fn test_deadline_retires_unanswered_requests() {
        let gateway = Arc::new(ManualGateway::new());
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));

        let handle = coordinator.start(&spec(10, Duration::from_millis(100)), |i| {
            Bytes::from(format!("req-{i}"))
        });

        let tokens = gateway.inflight_tokens();
        for token in tokens.iter().take(7) {
            gateway.complete(*token, Completion::Reply(Bytes::from_static(b"ok")));
        }

        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::TimedOut);
        assert_eq!(result.success_count(), 7);
        assert_eq!(result.timed_out_count(), 3);
        assert_eq!(result.entries.len(), 10);
        // Paused clock: elapsed is the deadline, give or take timer granularity
        assert!(result.elapsed >= Duration::from_millis(100));
        assert!(result.elapsed <= Duration::from_millis(110), "elapsed: {:?}", result.elapsed);
    }

    /// A reply that arrives after the deadline is discarded; the published
    /// result does not change.
    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_discarded() {
        let gateway = Arc::new(ManualGateway::new());
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));

        let handle = coordinator.start(&spec(2, Duration::from_millis(50)), |i| {
            Bytes::from(format!("req-{i}"))
        });

        let tokens = gateway.inflight_tokens();
        gateway.complete(tokens[0], Completion::Reply(Bytes::from_static(b"in time")));

        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::TimedOut);
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.timed_out_count(), 1);

        // The straggler answers after the terminal point
        assert!(gateway.complete(tokens[1], Completion::Reply(Bytes::from_static(b"late"))));

        let again = handle.wait().await.unwrap();
        assert_eq!(again.success_count(), 1);
        assert_eq!(again.timed_out_count(), 1);
        assert_eq!(coordinator.metrics().late_completions_discarded(), 1);
        assert_eq!(coordinator.metrics().batches_poisoned(), 0);
    }

    /// The last reply and the deadline racing each other still produce
    /// exactly one published result.
    #[tokio::test(start_paused = true)]
    async fn test_wait_for_limit_is_independent_of_deadline() {
        let gateway = Arc::new(ManualGateway::new());
        let coordinator = FanOutCoordinator::new(Arc::clone(&gateway));

        let handle = coordinator.start(&spec(1, Duration::from_secs(60)), |_| Bytes::new());

        // The caller gives up long before the batch deadline
        let err = handle
            .wait_for(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, fanout::FanoutError::WaitDeadline));
        assert!(!handle.is_done());

        // The batch is still live and can complete normally
        gateway.complete_all_with_echo();
        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{BatchResult, BatchStatus, Outcome};
    use fanout::{BatchSpec, FanOutCoordinator};
    use gateway::{FaultProfile, InProcessGateway};
    use observability::BatchStatsAggregator;

    fn echo_gateway() -> InProcessGateway {
        let mut gw = InProcessGateway::new();
        gw.register_fn("simple.echo", |payload: &Bytes| Ok(payload.clone()));
        gw
    }

    /// End-to-end run over the in-process gateway with latency straddling
    /// the deadline: every batch finalizes exactly once, every entry is
    /// accounted for, and nothing is poisoned.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_stress_latency_straddles_deadline() {
        let gateway = Arc::new(
            echo_gateway()
                .with_latency(Duration::from_millis(1), Duration::from_millis(20))
                .with_faults(FaultProfile {
                    reject_rate: 0.02,
                    failure_rate: 0.05,
                    drop_rate: 0.03,
                }),
        );
        let coordinator = Arc::new(FanOutCoordinator::new(gateway));

        let batches = 1_000;
        let fan_out = 50;
        let spec = BatchSpec {
            destination: "simple.echo".into(),
            count: fan_out,
            // Mid-window deadline: some batches complete, some time out
            timeout: Duration::from_millis(10),
        };

        let mut aggregator = BatchStatsAggregator::new();
        let mut join_set: tokio::task::JoinSet<Arc<BatchResult>> = tokio::task::JoinSet::new();
        for _ in 0..batches {
            while join_set.len() >= 32 {
                let result = join_set.join_next().await.unwrap().unwrap();
                aggregator.update(&result);
            }
            let coordinator = Arc::clone(&coordinator);
            let spec = spec.clone();
            join_set.spawn(async move {
                let handle = coordinator.start(&spec, |i| Bytes::from(format!("req-{i}")));
                handle.wait().await.unwrap()
            });
        }
        while let Some(joined) = join_set.join_next().await {
            aggregator.update(&joined.unwrap());
        }

        assert_eq!(aggregator.total_batches, batches);
        assert_eq!(aggregator.total_requests, batches * fan_out as u64);
        assert_eq!(
            aggregator.total_successes + aggregator.total_failures + aggregator.total_timed_out,
            aggregator.total_requests
        );
        assert_eq!(coordinator.metrics().batches_poisoned(), 0);
        assert_eq!(
            coordinator.metrics().batches_completed() + coordinator.metrics().batches_timed_out(),
            batches
        );
    }

    /// Wire-level round trip: the reply carries the request payload.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_replies_match_requests() {
        let gateway = Arc::new(
            echo_gateway().with_latency(Duration::from_millis(1), Duration::from_millis(5)),
        );
        let coordinator = FanOutCoordinator::new(gateway);

        let spec = BatchSpec {
            destination: "simple.echo".into(),
            count: 20,
            timeout: Duration::from_secs(5),
        };
        let handle = coordinator.start(&spec, |i| Bytes::from(format!("payload-{i}")));

        let result = handle.wait().await.unwrap();
        assert_eq!(result.status, BatchStatus::Completed);
        for entry in &result.entries {
            match &entry.outcome {
                Outcome::Success { reply, latency } => {
                    assert_eq!(&reply[..], format!("payload-{}", entry.index).as_bytes());
                    assert!(*latency >= Duration::from_millis(1));
                }
                other => panic!("expected success, got {other:?}"),
            }
        }
    }

    /// Full drop: the batch times out at the deadline with every request
    /// retired as TimedOut.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_all_drops_time_out_at_deadline() {
        let mut gw = InProcessGateway::new().with_faults(FaultProfile {
            drop_rate: 1.0,
            ..Default::default()
        });
        gw.register_fn("simple.echo", |payload: &Bytes| Ok(payload.clone()));
        let coordinator = FanOutCoordinator::new(Arc::new(gw));

        let spec = BatchSpec {
            destination: "simple.echo".into(),
            count: 10,
            timeout: Duration::from_millis(80),
        };
        let started = std::time::Instant::now();
        let handle = coordinator.start(&spec, |_| Bytes::from_static(b"x"));

        let result = handle.wait().await.unwrap();
        let waited = started.elapsed();

        assert_eq!(result.status, BatchStatus::TimedOut);
        assert_eq!(result.timed_out_count(), 10);
        assert!(waited >= Duration::from_millis(80));
        assert!(waited < Duration::from_secs(2), "deadline overshot: {waited:?}");
    }
}

#[cfg(test)]
mod config_tests {
    /// A loaded plan drives the same shapes the coordinator consumes.
    #[test]
    fn test_plan_feeds_batch_spec() {
        let plan = config_loader::ConfigLoader::load_from_str(
            r#"
[batch]
destination = "simple.echo"
fan_out = 25
timeout_ms = 750

[[gateway.endpoints]]
id = "simple.echo"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let spec = fanout::BatchSpec {
            destination: plan.batch.destination.clone(),
            count: plan.batch.fan_out,
            timeout: std::time::Duration::from_millis(plan.batch.timeout_ms),
        };
        assert_eq!(spec.destination, "simple.echo");
        assert_eq!(spec.count, 25);
        assert_eq!(spec.timeout, std::time::Duration::from_millis(750));
    }
}
