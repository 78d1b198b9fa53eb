// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `RedisCacheProvider` over the in-process store.

use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use cacheplex_provider::{CacheProvider, ErrorKind, Expiration, ProviderFactory};
use cacheplex_redis::testing::{FakeKeyValueStore, KvCall};
use cacheplex_redis::{RedisCacheProvider, RedisProviderFactory, RedisProviderOptions};
use serde::{Deserialize, Serialize};
use tick::{Clock, ClockControl};

const ENDPOINT: &str = "cache-01:6379";

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn setup() -> (Arc<FakeKeyValueStore>, RedisCacheProvider<FakeKeyValueStore>) {
    let store = FakeKeyValueStore::shared(ENDPOINT, Clock::new_frozen());
    let provider = RedisProviderFactory::new(Arc::clone(&store), Clock::new_frozen())
        .create(RedisProviderOptions::new(ENDPOINT))
        .expect("matching endpoint");
    (store, provider)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    lines: Vec<String>,
}

#[test]
fn round_trips_json_values() {
    block_on(async {
        let (store, provider) = setup();
        let order = Order {
            id: 7,
            lines: vec!["apple".to_string()],
        };

        provider.set("o", &order, Expiration::never()).await.expect("set failed");

        assert_eq!(store.raw("o").as_deref(), Some(r#"{"id":7,"lines":["apple"]}"#));
        assert_eq!(provider.get::<Order>("o").await.expect("get failed"), Some(order));
    });
}

#[test]
fn miss_and_remove_report_absence() {
    block_on(async {
        let (_store, provider) = setup();

        assert_eq!(provider.get::<i32>("missing").await.expect("get failed"), None);
        assert!(!provider.contains_key("missing").await.expect("contains failed"));
        assert!(!provider.remove("missing").await.expect("remove failed"));
    });
}

#[test]
fn remove_deletes_existing_value() {
    block_on(async {
        let (_store, provider) = setup();
        provider.set("k", &1, Expiration::never()).await.expect("set failed");

        assert!(provider.remove("k").await.expect("remove failed"));
        assert!(!provider.contains_key("k").await.expect("contains failed"));
    });
}

#[test]
fn blank_keys_never_reach_the_server() {
    block_on(async {
        let (store, provider) = setup();

        let errors = [
            provider.get::<i32>(" ").await.unwrap_err(),
            provider.set("", &1, Expiration::never()).await.unwrap_err(),
            provider.remove("").await.unwrap_err(),
            provider.contains_key("\t").await.unwrap_err(),
            provider.increment("", 1).await.unwrap_err(),
        ];

        for error in errors {
            assert_eq!(error.kind(), &ErrorKind::InvalidKey { parameter: "key" });
        }
        assert!(store.calls().is_empty());
    });
}

#[test]
fn null_values_never_reach_the_server() {
    block_on(async {
        let (store, provider) = setup();

        let err = provider.set("k", &None::<u32>, Expiration::never()).await.unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "value" });
        assert!(store.calls().is_empty());
    });
}

#[test]
fn relative_expiration_is_passed_to_the_server() {
    block_on(async {
        let (store, provider) = setup();

        provider
            .set("k", &1, Expiration::after(Duration::from_secs(30)))
            .await
            .expect("set failed");

        assert_eq!(
            store.calls(),
            vec![KvCall::Set {
                key: "k".to_string(),
                value: "1".to_string(),
                ttl: Some(Duration::from_secs(30)),
            }]
        );
    });
}

#[test]
fn absolute_expiration_is_converted_with_the_clock() {
    block_on(async {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let store = FakeKeyValueStore::shared(ENDPOINT, clock.clone());
        let provider = RedisCacheProvider::new(Arc::clone(&store), clock);

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
        provider.set("k", &1, Expiration::at(at)).await.expect("set failed");

        assert_eq!(
            store.calls(),
            vec![KvCall::Set {
                key: "k".to_string(),
                value: "1".to_string(),
                ttl: Some(Duration::from_secs(60)),
            }]
        );
    });
}

#[test]
fn past_expiration_is_rejected_before_the_call() {
    block_on(async {
        let control = ClockControl::new();
        control.advance(Duration::from_secs(120));
        let clock = control.to_clock();
        let store = FakeKeyValueStore::shared(ENDPOINT, clock.clone());
        let provider = RedisCacheProvider::new(Arc::clone(&store), clock);

        let err = provider
            .set("k", &1, Expiration::at(SystemTime::UNIX_EPOCH + Duration::from_secs(60)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "expiration" });
        assert!(store.calls().is_empty());
    });
}

#[test]
fn entries_expire_on_the_server_clock() {
    block_on(async {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let store = FakeKeyValueStore::shared(ENDPOINT, clock.clone());
        let provider = RedisCacheProvider::new(store, clock);

        provider
            .set("k", &1, Expiration::after(Duration::from_secs(10)))
            .await
            .expect("set failed");
        assert_eq!(
            provider.time_to_live("k").await.expect("ttl failed"),
            Some(Duration::from_secs(10))
        );

        control.advance(Duration::from_secs(11));

        assert_eq!(provider.get::<i32>("k").await.expect("get failed"), None);
    });
}

#[test]
fn key_prefix_namespaces_server_keys() {
    block_on(async {
        let store = FakeKeyValueStore::shared(ENDPOINT, Clock::new_frozen());
        let provider = RedisProviderFactory::new(Arc::clone(&store), Clock::new_frozen())
            .create(RedisProviderOptions::new(ENDPOINT).key_prefix("orders:"))
            .expect("valid options");

        provider.set("42", &"open".to_string(), Expiration::never()).await.expect("set failed");

        assert_eq!(provider.key_prefix(), Some("orders:"));
        assert_eq!(store.raw("orders:42").as_deref(), Some(r#""open""#));
        assert_eq!(store.raw("42"), None);
        assert_eq!(
            provider.get::<String>("42").await.expect("get failed").as_deref(),
            Some("open")
        );
    });
}

#[test]
fn set_if_absent_keeps_the_first_value() {
    block_on(async {
        let (_store, provider) = setup();

        assert!(provider.set_if_absent("k", &1, Expiration::never()).await.expect("add failed"));
        assert!(!provider.set_if_absent("k", &2, Expiration::never()).await.expect("add failed"));

        assert_eq!(provider.get::<i32>("k").await.expect("get failed"), Some(1));
    });
}

#[test]
fn counters_start_at_zero() {
    block_on(async {
        let (_store, provider) = setup();

        assert_eq!(provider.increment("hits", 5).await.expect("incr failed"), 5);
        assert_eq!(provider.increment("hits", 2).await.expect("incr failed"), 7);
        assert_eq!(provider.decrement("hits", 10).await.expect("decr failed"), -3);
        assert_eq!(provider.get::<i64>("hits").await.expect("get failed"), Some(-3));
    });
}

#[test]
fn decrement_rejects_unrepresentable_delta() {
    block_on(async {
        let (store, provider) = setup();

        let err = provider.decrement("hits", i64::MIN).await.unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "delta" });
        assert!(store.calls().is_empty());
    });
}

#[test]
fn increment_on_text_value_is_a_backend_error() {
    block_on(async {
        let (_store, provider) = setup();
        provider.set("name", &"ada".to_string(), Expiration::never()).await.expect("set failed");

        let err = provider.increment("name", 1).await.unwrap_err();

        assert!(err.is_backend());
    });
}

#[test]
fn expire_updates_and_clears_time_to_live() {
    block_on(async {
        let (_store, provider) = setup();
        provider.set("k", &1, Expiration::never()).await.expect("set failed");
        assert_eq!(provider.time_to_live("k").await.expect("ttl failed"), None);

        assert!(
            provider
                .expire("k", Expiration::after(Duration::from_secs(5)))
                .await
                .expect("expire failed")
        );
        assert_eq!(
            provider.time_to_live("k").await.expect("ttl failed"),
            Some(Duration::from_secs(5))
        );

        assert!(provider.expire("k", Expiration::never()).await.expect("persist failed"));
        assert_eq!(provider.time_to_live("k").await.expect("ttl failed"), None);

        assert!(
            !provider
                .expire("missing", Expiration::after(Duration::from_secs(5)))
                .await
                .expect("expire failed")
        );
    });
}

#[test]
fn server_failures_become_backend_errors_with_cause() {
    block_on(async {
        let (store, provider) = setup();
        store.fail_when(|call| matches!(call, KvCall::Get(_)));

        let err = provider.get::<i32>("k").await.unwrap_err();

        assert_eq!(
            err.kind(),
            &ErrorKind::Backend {
                action: "getting value for key 'k'".to_string()
            }
        );
        let source = err.source().expect("cause is kept");
        assert!(source.to_string().contains("connection refused"));

        store.clear_failures();
        assert_eq!(provider.get::<i32>("k").await.expect("get failed"), None);
    });
}

#[test]
fn corrupt_text_is_a_backend_error() {
    block_on(async {
        let (store, provider) = setup();
        provider.set("k", &"text".to_string(), Expiration::never()).await.expect("set failed");
        store.clear_calls();

        let err = provider.get::<u32>("k").await.unwrap_err();

        assert!(err.is_backend());
        assert_eq!(store.calls(), vec![KvCall::Get("k".to_string())]);
    });
}

#[test]
fn lists_push_and_pop_from_both_ends() {
    block_on(async {
        let (store, provider) = setup();

        assert_eq!(provider.list_right_push("queue", &"b".to_string()).await.expect("push failed"), 1);
        assert_eq!(provider.list_right_push("queue", &"c".to_string()).await.expect("push failed"), 2);
        assert_eq!(provider.list_left_push("queue", &"a".to_string()).await.expect("push failed"), 3);
        assert_eq!(
            store.raw_list("queue"),
            Some(vec!["\"a\"".to_string(), "\"b\"".to_string(), "\"c\"".to_string()])
        );

        assert_eq!(provider.list_left_pop::<String>("queue").await.expect("pop failed").as_deref(), Some("a"));
        assert_eq!(provider.list_right_pop::<String>("queue").await.expect("pop failed").as_deref(), Some("c"));
        assert_eq!(provider.list_length("queue").await.expect("length failed"), 1);
    });
}

#[test]
fn emptied_list_disappears() {
    block_on(async {
        let (store, provider) = setup();
        let order = Order {
            id: 1,
            lines: vec!["widget".to_string()],
        };

        provider.list_left_push("orders", &order).await.expect("push failed");

        assert_eq!(provider.list_right_pop::<Order>("orders").await.expect("pop failed"), Some(order));
        assert_eq!(provider.list_right_pop::<Order>("orders").await.expect("pop failed"), None);
        assert_eq!(provider.list_length("orders").await.expect("length failed"), 0);
        assert!(!provider.contains_key("orders").await.expect("exists failed"));
        assert_eq!(store.raw_list("orders"), None);
    });
}

#[test]
fn hashes_track_fields() {
    block_on(async {
        let (store, provider) = setup();

        assert!(provider.hash_set("user:1", "name", &"ada".to_string()).await.expect("hset failed"));
        assert!(provider.hash_set("user:1", "age", &36).await.expect("hset failed"));
        assert!(!provider.hash_set("user:1", "age", &37).await.expect("hset failed"));

        assert_eq!(store.raw_hash_field("user:1", "age").as_deref(), Some("37"));
        assert_eq!(provider.hash_get::<u32>("user:1", "age").await.expect("hget failed"), Some(37));
        assert_eq!(provider.hash_get::<u32>("user:1", "missing").await.expect("hget failed"), None);
        assert!(provider.hash_exists("user:1", "name").await.expect("hexists failed"));
        assert_eq!(provider.hash_length("user:1").await.expect("hlen failed"), 2);

        assert!(provider.hash_delete("user:1", "name").await.expect("hdel failed"));
        assert!(!provider.hash_delete("user:1", "name").await.expect("hdel failed"));
        assert!(!provider.hash_exists("user:1", "name").await.expect("hexists failed"));
        assert_eq!(provider.hash_length("user:2").await.expect("hlen failed"), 0);
    });
}

#[test]
fn blank_hash_fields_never_reach_the_server() {
    block_on(async {
        let (store, provider) = setup();

        let set = provider.hash_set("user:1", " ", &1).await.unwrap_err();
        let get = provider.hash_get::<i32>("user:1", "").await.unwrap_err();
        let delete = provider.hash_delete("user:1", "").await.unwrap_err();
        let exists = provider.hash_exists("user:1", "\t").await.unwrap_err();
        let push = provider.list_left_push(" ", &1).await.unwrap_err();

        for error in [set, get, delete, exists] {
            assert_eq!(error.kind(), &ErrorKind::InvalidKey { parameter: "field" });
        }
        assert_eq!(push.kind(), &ErrorKind::InvalidKey { parameter: "key" });
        assert!(store.calls().is_empty());
    });
}

#[test]
fn collection_commands_use_the_key_prefix() {
    block_on(async {
        let (store, provider) = setup();
        let provider = provider.with_key_prefix("app:");

        provider.list_right_push("jobs", &1).await.expect("push failed");
        provider.hash_set("user", "id", &7).await.expect("hset failed");

        assert_eq!(store.raw_list("app:jobs"), Some(vec!["1".to_string()]));
        assert_eq!(store.raw_hash_field("app:user", "id").as_deref(), Some("7"));
        assert_eq!(
            store.calls(),
            vec![
                KvCall::RPush {
                    key: "app:jobs".to_string(),
                    value: "1".to_string(),
                },
                KvCall::HSet {
                    key: "app:user".to_string(),
                    field: "id".to_string(),
                    value: "7".to_string(),
                },
            ]
        );
    });
}

#[test]
fn commands_against_the_wrong_kind_of_value_are_backend_errors() {
    block_on(async {
        let (_store, provider) = setup();
        provider.set("plain", &1, Expiration::never()).await.expect("set failed");
        provider.list_right_push("queue", &1).await.expect("push failed");

        let push = provider.list_left_push("plain", &2).await.unwrap_err();
        let hset = provider.hash_set("queue", "f", &2).await.unwrap_err();
        let get = provider.get::<i32>("queue").await.unwrap_err();

        assert_eq!(
            push.kind(),
            &ErrorKind::Backend {
                action: "pushing value to list 'plain'".to_string()
            }
        );
        assert_eq!(
            hset.kind(),
            &ErrorKind::Backend {
                action: "setting field 'f' of hash 'queue'".to_string()
            }
        );
        assert!(get.source().expect("engine cause").to_string().starts_with("WRONGTYPE"));
    });
}

#[test]
fn collection_failures_describe_the_action() {
    block_on(async {
        let (store, provider) = setup();
        store.fail_when(|call| matches!(call, KvCall::LPop(_) | KvCall::HLen(_)));

        let pop = provider.list_left_pop::<i32>("queue").await.unwrap_err();
        let length = provider.hash_length("user:1").await.unwrap_err();

        assert_eq!(
            pop.kind(),
            &ErrorKind::Backend {
                action: "popping value from list 'queue'".to_string()
            }
        );
        assert_eq!(
            length.kind(),
            &ErrorKind::Backend {
                action: "reading length of hash 'user:1'".to_string()
            }
        );
        assert!(pop.source().is_some());
    });
}

#[test]
fn factory_rejects_missing_endpoint() {
    let store = FakeKeyValueStore::shared(ENDPOINT, Clock::new_frozen());
    let factory = RedisProviderFactory::new(store, Clock::new_frozen());

    for options in [RedisProviderOptions::default(), RedisProviderOptions::new("  ")] {
        let err = factory.create(options).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration { .. }));
    }
}

#[test]
fn factory_rejects_a_different_endpoint() {
    let store = FakeKeyValueStore::shared(ENDPOINT, Clock::new_frozen());
    let factory = RedisProviderFactory::new(store, Clock::new_frozen());

    let err = factory.create(RedisProviderOptions::new("cache-02:6379")).unwrap_err();

    assert_eq!(
        err.kind(),
        &ErrorKind::ConfigurationMismatch {
            expected: ENDPOINT.to_string(),
            actual: "cache-02:6379".to_string(),
        }
    );
}

#[test]
fn options_deserialize_from_json() {
    let options: RedisProviderOptions =
        serde_json::from_str(r#"{"endpoint":"cache-01:6379","key_prefix":"p:"}"#).expect("valid json");

    assert_eq!(options, RedisProviderOptions::new(ENDPOINT).key_prefix("p:"));
}
