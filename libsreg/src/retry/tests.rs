use super::*;
use std::cell::Cell;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff_ms: 100,
        max_backoff_ms: 1000,
    }
}

#[test]
fn test_success_on_first_attempt() {
    let calls = Cell::new(0);
    let mut slept = Vec::new();

    let result = with_retry_and_sleep(
        &policy(3),
        "upload",
        || {
            calls.set(calls.get() + 1);
            Ok(42)
        },
        |d| slept.push(d),
    );

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.get(), 1);
    assert!(slept.is_empty());
}

#[test]
fn test_retries_transient_errors_then_succeeds() {
    let calls = Cell::new(0);
    let mut slept = Vec::new();

    let result = with_retry_and_sleep(
        &policy(3),
        "upload",
        || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(SregError::server("unavailable", 503))
            } else {
                Ok("done")
            }
        },
        |d| slept.push(d),
    );

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.get(), 3);
    assert_eq!(
        slept,
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[test]
fn test_gives_up_after_max_attempts() {
    let calls = Cell::new(0);

    let result: Result<()> = with_retry_and_sleep(
        &policy(2),
        "download",
        || {
            calls.set(calls.get() + 1);
            Err(SregError::network("connection reset"))
        },
        |_| {},
    );

    assert!(matches!(result, Err(SregError::Network { .. })));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_permanent_errors_are_not_retried() {
    let calls = Cell::new(0);

    let result: Result<()> = with_retry_and_sleep(
        &policy(5),
        "lookup",
        || {
            calls.set(calls.get() + 1);
            Err(SregError::authentication("bad token", Some(401)))
        },
        |_| {},
    );

    assert!(matches!(result, Err(SregError::Authentication { .. })));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_retry_after_is_honored_and_capped() {
    let calls = Cell::new(0);
    let mut slept = Vec::new();

    let _: Result<()> = with_retry_and_sleep(
        &policy(3),
        "upload",
        || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(SregError::rate_limit("slow down", Some(0)))
            } else {
                Err(SregError::rate_limit("slow down", Some(60)))
            }
        },
        |d| slept.push(d),
    );

    assert_eq!(slept, vec![Duration::ZERO, Duration::from_millis(1000)]);
}

#[test]
fn test_zero_attempts_still_runs_once() {
    let calls = Cell::new(0);

    let _: Result<()> = with_retry_and_sleep(
        &policy(0),
        "upload",
        || {
            calls.set(calls.get() + 1);
            Err(SregError::network("down"))
        },
        |_| {},
    );

    assert_eq!(calls.get(), 1);
}
