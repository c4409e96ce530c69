use super::*;
use crate::credentials::{Credential, CredentialPool};
use relaygate_types::{ClassifierConfig, PoolError, RetryPolicy};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

fn executor(max_attempts: u32) -> RetryExecutor {
    RetryExecutor::new(
        RetryPolicy {
            max_attempts,
            fixed_delay_ms: 200,
            base_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 8000,
        },
        &ClassifierConfig::default(),
    )
}

fn pool(ids: &[&str]) -> CredentialPool {
    CredentialPool::new(ids.iter().map(|id| Credential::new(*id, format!("sk-{id}"))).collect(), 0)
        .expect("pool")
}

fn http(status: u16, body: &str) -> AttemptFailure {
    AttemptFailure::Http { status, body: Some(body.to_string()) }
}

/// Replays scripted results and records which credential served each attempt.
#[derive(Clone)]
struct Script {
    results: Arc<Mutex<VecDeque<AttemptResult<&'static str>>>>,
    seen: Arc<Mutex<Vec<(String, u32)>>>,
}

impl Script {
    fn new(results: Vec<AttemptResult<&'static str>>) -> Self {
        Self {
            results: Arc::new(Mutex::new(results.into())),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn next(&self, credential: Arc<Credential>, attempt: u32) -> AttemptResult<&'static str> {
        self.seen.lock().await.push((credential.id().to_string(), attempt));
        self.results.lock().await.pop_front().unwrap_or(Ok("default"))
    }

    async fn seen(&self) -> Vec<(String, u32)> {
        self.seen.lock().await.clone()
    }
}

#[tokio::test(start_paused = true)]
async fn overload_retries_on_same_credential_with_exponential_delays() {
    let script = Script::new(vec![Err(http(529, "Overloaded")), Err(http(529, "Overloaded")), Ok("done")]);
    let p = pool(&["a", "b"]);
    let started = Instant::now();

    let s = script.clone();
    let result = executor(3)
        .run("t1", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect("third attempt succeeds");

    assert_eq!(result.value, "done");
    assert_eq!(result.attempts, 3);
    assert_eq!(result.credential_id, "a");
    assert_eq!(
        script.seen().await,
        vec![("a".to_string(), 1), ("a".to_string(), 2), ("a".to_string(), 3)]
    );
    // 1000ms after attempt 1, 2000ms after attempt 2.
    assert_eq!(started.elapsed(), Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn other_retryable_rotates_credentials() {
    let script = Script::new(vec![Err(http(503, "unavailable")), Err(http(429, "slow down")), Ok("ok")]);
    let p = pool(&["a", "b", "c"]);

    let s = script.clone();
    let result = executor(5)
        .run("t2", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect("success");

    let ids: Vec<String> = script.seen().await.into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(result.credential_id, "c");

    let stats = p.stats();
    assert_eq!(stats[0].total_failures, 1);
    assert_eq!(stats[1].total_failures, 1);
    assert_eq!(stats[2].total_successes, 1);
}

#[tokio::test(start_paused = true)]
async fn signature_failure_uses_fixed_delay_and_keeps_credential() {
    let body = r#"{"error":{"message":"messages.1.content.0.thinking.signature: Field required"}}"#;
    let script = Script::new(vec![Err(http(400, body)), Ok("fixed")]);
    let p = pool(&["a", "b"]);
    let started = Instant::now();

    let s = script.clone();
    let result = executor(3)
        .run("t3", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect("success");

    assert_eq!(result.credential_id, "a");
    assert_eq!(started.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn non_retryable_fails_fast() {
    let script = Script::new(vec![Err(http(404, "model not found"))]);
    let p = pool(&["a"]);

    let s = script.clone();
    let err = executor(3)
        .run("t4", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect_err("404 is terminal");

    assert!(matches!(err, ExecutionError::NonRetryable { status: 404, .. }));
    assert_eq!(script.seen().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_reports_retries_exhausted() {
    let script = Script::new(vec![
        Err(http(529, "Overloaded")),
        Err(http(529, "Overloaded")),
        Err(http(529, "Overloaded")),
    ]);
    let p = pool(&["a"]);

    let s = script.clone();
    let err = executor(3)
        .run("t5", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect_err("exhausted");

    match err {
        ExecutionError::RetriesExhausted { attempts, last_status, last_error } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_status, 529);
            assert_eq!(last_error, "Overloaded");
        },
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(p.in_flight_of("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_is_retried_with_rotation() {
    let script = Script::new(vec![
        Err(AttemptFailure::Transport { message: "connect refused".into(), timed_out: false }),
        Ok("recovered"),
    ]);
    let p = pool(&["a", "b"]);

    let s = script.clone();
    let result = executor(3)
        .run("t6", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect("recovers");

    assert_eq!(result.credential_id, "b");
}

#[tokio::test(start_paused = true)]
async fn single_credential_is_reused_after_rotation() {
    let script = Script::new(vec![Err(http(500, "boom")), Ok("same")]);
    let p = pool(&["only"]);

    let s = script.clone();
    let result = executor(3)
        .run("t7", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect("exclusions reset");

    assert_eq!(result.credential_id, "only");
    assert_eq!(result.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_first_attempt() {
    let (handle, signal) = cancellation();
    handle.cancel();
    let p = pool(&["a"]);

    let err = executor(3)
        .run("t8", &p, &signal, |_c, _n| async { Ok::<_, AttemptFailure>("never") })
        .await
        .expect_err("cancelled");

    assert!(matches!(err, ExecutionError::Cancelled { attempts: 0 }));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff_sleep() {
    let (handle, signal) = cancellation();
    let script = Script::new(vec![Err(http(529, "Overloaded")), Ok("too late")]);
    let p = Arc::new(pool(&["a"]));

    let s = script.clone();
    let pool_for_task = Arc::clone(&p);
    let task = tokio::spawn(async move {
        executor(3)
            .run("t9", &pool_for_task, &signal, move |c, n| {
                let s = s.clone();
                async move { s.next(c, n).await }
            })
            .await
    });

    // First backoff is 1000ms; cancel halfway through.
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();

    let err = task.await.expect("join").expect_err("cancelled");
    assert!(matches!(err, ExecutionError::Cancelled { attempts: 1 }));
    assert_eq!(script.seen().await.len(), 1);
    assert_eq!(p.in_flight_of("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_back_off_independently() {
    let p = Arc::new(pool(&["a", "b"]));
    let exec = executor(3);
    let started = Instant::now();

    let slow = {
        let p = Arc::clone(&p);
        let exec = exec.clone();
        let script = Script::new(vec![Err(http(529, "Overloaded")), Ok("slow")]);
        tokio::spawn(async move {
            exec.run("slow", &p, &CancelSignal::never(), move |c, n| {
                let s = script.clone();
                async move { s.next(c, n).await }
            })
            .await
            .map(|e| (e.value, Instant::now()))
        })
    };
    let fast = {
        let p = Arc::clone(&p);
        let exec = exec.clone();
        tokio::spawn(async move {
            exec.run("fast", &p, &CancelSignal::never(), |_c, _n| async {
                Ok::<_, AttemptFailure>("fast")
            })
            .await
            .map(|e| (e.value, Instant::now()))
        })
    };

    let (fast_value, fast_done) = fast.await.expect("join").expect("fast ok");
    let (slow_value, slow_done) = slow.await.expect("join").expect("slow ok");
    assert_eq!(fast_value, "fast");
    assert_eq!(slow_value, "slow");
    assert_eq!(fast_done - started, Duration::ZERO);
    assert_eq!(slow_done - started, Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn rotation_into_busy_pool_falls_back_to_released_credential() {
    let p = CredentialPool::new(
        vec![Credential::new("a", "sk-a"), Credential::new("b", "sk-b")],
        1,
    )
    .expect("pool");
    // Another request holds "b" for the whole run.
    let only_a: std::collections::HashSet<String> = ["a".to_string()].into_iter().collect();
    let other = p.checkout(&only_a).expect("lease b");
    assert_eq!(other.id(), "b");

    let script = Script::new(vec![Err(http(503, "unavailable")), Ok("retried")]);
    let s = script.clone();
    let result = executor(3)
        .run("t11", &p, &CancelSignal::never(), move |c, n| {
            let s = s.clone();
            async move { s.next(c, n).await }
        })
        .await
        .expect("retry continues on the released credential");

    assert_eq!(result.value, "retried");
    assert_eq!(result.attempts, 2);
    assert_eq!(script.seen().await, vec![("a".to_string(), 1), ("a".to_string(), 2)]);
    assert_eq!(p.in_flight_of("b"), 1);
    drop(other);
}

#[tokio::test(start_paused = true)]
async fn busy_pool_without_exclusions_still_reports_no_credential() {
    let p = CredentialPool::new(vec![Credential::new("a", "sk-a")], 1).expect("pool");
    let _held = p.checkout(&std::collections::HashSet::new()).expect("lease a");

    let err = executor(3)
        .run("t12", &p, &CancelSignal::never(), |_c, _n| async { Ok::<_, AttemptFailure>(()) })
        .await
        .expect_err("nothing free");
    assert!(matches!(err, ExecutionError::NoCredential(PoolError::AllBusy { total: 1 })));
}

#[tokio::test]
async fn empty_pool_reports_no_credential() {
    let p = pool(&[]);
    let err = executor(3)
        .run("t10", &p, &CancelSignal::never(), |_c, _n| async { Ok::<_, AttemptFailure>(()) })
        .await
        .expect_err("no credentials");
    assert!(matches!(err, ExecutionError::NoCredential(PoolError::Empty)));
}

#[test]
fn trace_id_is_six_lowercase_alphanumerics() {
    let id = generate_trace_id();
    assert_eq!(id.len(), 6);
    assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
}
