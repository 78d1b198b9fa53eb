// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Contract tests against the recording mock provider.

use cacheplex_provider::testing::{MockProvider, ProviderOp};
use cacheplex_provider::{CacheProvider, DEFAULT_LOCK_WAIT, Error, ErrorKind, Expiration, LockingProvider};
use serde::{Deserialize, Serialize};

type TestResult = Result<(), Error>;

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u32,
    lines: Vec<String>,
}

#[test]
fn blank_keys_never_reach_the_backend() {
    block_on(async {
        let provider = MockProvider::new();

        for key in ["", "   "] {
            let get = provider.get::<i32>(key).await.unwrap_err();
            let set = provider.set(key, &1, Expiration::never()).await.unwrap_err();
            let remove = provider.remove(key).await.unwrap_err();
            let contains = provider.contains_key(key).await.unwrap_err();
            let lock = provider.acquire_lock(key, None).await.unwrap_err();
            let counter = provider.increment(key, 0, 1).await.unwrap_err();

            for error in [get, set, remove, contains, lock, counter] {
                assert_eq!(error.kind(), &ErrorKind::InvalidKey { parameter: "key" });
            }
        }

        assert!(provider.operations().is_empty());
    });
}

#[test]
fn round_trips_primitive_and_composite_values() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();
        let order = Order {
            id: 7,
            lines: vec!["widget".to_string()],
        };

        provider.set("n", &42_u64, Expiration::never()).await?;
        provider.set("order", &order, Expiration::never()).await?;

        assert_eq!(provider.get::<u64>("n").await?, Some(42));
        assert_eq!(provider.get::<Order>("order").await?, Some(order));
        Ok(())
    })
}

#[test]
fn misses_are_not_errors() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();

        assert_eq!(provider.get::<String>("missing").await?, None);
        assert!(!provider.remove("missing").await?);
        assert!(!provider.contains_key("missing").await?);
        Ok(())
    })
}

#[test]
fn null_values_are_rejected_before_recording() {
    block_on(async {
        let provider = MockProvider::new();

        let err = provider.set("k", &None::<i32>, Expiration::never()).await.unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "value" });
        assert!(provider.operations().is_empty());
    });
}

#[test]
fn injected_failures_surface_as_backend_errors() {
    block_on(async {
        let provider = MockProvider::new();
        provider.fail_when(|op| matches!(op, ProviderOp::Remove(_)));

        let err = provider.remove("k").await.unwrap_err();

        assert!(err.is_backend());
        assert!(err.to_string().contains("removing key 'k'"));
        assert_eq!(provider.operations(), vec![ProviderOp::Remove("k".to_string())]);
    });
}

#[test]
fn with_lock_releases_after_success() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();

        let value = provider
            .with_lock("k", None, || async {
                assert!(provider.is_locked("k"));
                Ok(5)
            })
            .await?;

        assert_eq!(value, 5);
        assert!(!provider.is_locked("k"));
        Ok(())
    })
}

#[test]
fn with_lock_releases_after_failure_and_returns_work_error() {
    block_on(async {
        let provider = MockProvider::new();

        let err = provider
            .with_lock("k", None, || async { Err::<(), _>(Error::invalid_value("work")) })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "work" });
        assert!(!provider.is_locked("k"));
    });
}

#[test]
fn with_lock_reports_release_failure_after_successful_work() {
    block_on(async {
        let provider = MockProvider::new();
        provider.fail_when(|op| matches!(op, ProviderOp::Unlock(_)));

        let err = provider.with_lock("k", None, || async { Ok(1) }).await.unwrap_err();

        assert!(err.is_backend());
    });
}

#[test]
fn second_lock_on_same_key_times_out() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();

        let handle = provider.acquire_lock("k", None).await?;
        let err = provider.acquire_lock("k", None).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LockTimeout { key, .. } if key == "k"));

        handle.release().await?;
        provider.acquire_lock("k", None).await?.release().await
    })
}

#[test]
fn contended_lock_reports_the_default_wait() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();
        let handle = provider.acquire_lock("k", None).await?;

        let err = provider.acquire_lock("k", None).await.unwrap_err();

        assert_eq!(
            err.kind(),
            &ErrorKind::LockTimeout {
                key: "k".to_string(),
                waited: DEFAULT_LOCK_WAIT,
            }
        );
        handle.release().await
    })
}

#[test]
fn stale_handle_cannot_release_a_newer_holder() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();
        let stale = provider.acquire_lock("k", None).await?;
        provider.release_lock("k").await?;
        let current = provider.acquire_lock("k", None).await?;

        let err = stale.release().await.unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::LockNotHeld { key: "k".to_string() });
        assert!(provider.is_locked("k"));
        current.release().await?;
        assert!(!provider.is_locked("k"));
        Ok(())
    })
}

#[test]
fn double_force_release_is_reported() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();
        let handle = provider.acquire_lock("k", None).await?;

        provider.release_lock("k").await?;
        let err = provider.release_lock("k").await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::LockNotHeld { key: "k".to_string() });

        let err = handle.release().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::LockNotHeld { key: "k".to_string() });
        Ok(())
    })
}

#[test]
fn get_and_lock_does_not_read_when_lock_fails() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();
        let _held = provider.acquire_lock("k", None).await?;
        provider.clear_operations();

        assert!(provider.get_and_lock::<i32>("k", None).await.is_err());
        assert_eq!(provider.operations(), vec![ProviderOp::Lock("k".to_string())]);
        Ok(())
    })
}

#[test]
fn get_and_lock_releases_when_read_fails() {
    block_on(async {
        let provider = MockProvider::new();
        provider.fail_when(|op| matches!(op, ProviderOp::Get(_)));

        assert!(provider.get_and_lock::<i32>("k", None).await.is_err());
        assert!(!provider.is_locked("k"));
    });
}

#[test]
fn decrement_seeds_missing_counter() -> TestResult {
    block_on(async {
        let provider = MockProvider::new();

        assert_eq!(provider.decrement("c", 10, 3).await?, 7);
        assert_eq!(provider.decrement("c", 10, 3).await?, 4);
        assert_eq!(provider.increment("c", 10, 6).await?, 10);

        let err = provider.decrement("c", 0, i64::MIN).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "delta" });
        Ok(())
    })
}
