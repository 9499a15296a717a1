use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use geotalk::cache::{BucketStore, MemoryBucketStore, keys};
use geotalk::geo::GeoHasher;
use geotalk::index::{IndexError, IndexSettings, ProximityIndex, codec};
use geotalk::models::{Message, NewMessage};

const LAT: f64 = 12.9753;
const LON: f64 = 77.5910;

fn setup() -> (Arc<MemoryBucketStore>, ProximityIndex) {
    let store = Arc::new(MemoryBucketStore::new());
    let index = ProximityIndex::new(store.clone(), IndexSettings::default());
    (store, index)
}

fn new_message(text: &str) -> NewMessage {
    NewMessage {
        latitude: LAT,
        longitude: LON,
        message: text.into(),
    }
}

fn hasher() -> GeoHasher {
    let settings = IndexSettings::default();
    GeoHasher::new(settings.precision, settings.decimals)
}

fn center_key() -> String {
    let hash = hasher().bucket_key_for(LAT, LON).unwrap();
    keys::bucket_key(keys::DEFAULT_KEY_PREFIX, &hash)
}

// 绕过索引直接写入某个桶
async fn push_raw(store: &MemoryBucketStore, hash: &str, text: &str, expires_at: DateTime<Utc>) {
    let msg = Message {
        latitude: LAT,
        longitude: LON,
        message: text.into(),
        inserted_at: expires_at - Duration::minutes(5),
        expires_at,
    };
    store
        .push(
            &keys::bucket_key(keys::DEFAULT_KEY_PREFIX, hash),
            codec::encode(&msg).unwrap(),
            expires_at,
        )
        .await
        .unwrap();
}

// 后台压缩是异步的，轮询直到条件满足
async fn eventually(cond: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    cond()
}

#[tokio::test]
async fn message_is_visible_right_after_posting() {
    let (_store, index) = setup();

    let stored = index.insert(new_message("HI")).await.unwrap();
    assert_eq!(stored.expires_at - stored.inserted_at, Duration::minutes(5));

    let found = index.nearby(LAT, LON).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "HI");
}

#[tokio::test]
async fn newer_message_comes_first() {
    let (_store, index) = setup();
    let t0 = Utc::now();

    index.insert_at(new_message("first"), t0).await.unwrap();
    index
        .insert_at(new_message("second"), t0 + Duration::seconds(1))
        .await
        .unwrap();

    let found = index
        .nearby_at(LAT, LON, t0 + Duration::seconds(2))
        .await
        .unwrap();
    let texts: Vec<&str> = found.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(texts, vec!["second", "first"]);
    assert!(found[0].inserted_at > found[1].inserted_at);
}

#[tokio::test]
async fn expired_messages_are_hidden_and_bucket_reclaimed() {
    let (store, index) = setup();
    let t0 = Utc::now();
    index.insert_at(new_message("old"), t0).await.unwrap();

    // 存储中仍然存在，但已过期
    assert!(store.snapshot(&center_key()).is_some());
    let found = index
        .nearby_at(LAT, LON, t0 + Duration::minutes(6))
        .await
        .unwrap();
    assert!(found.is_empty());

    assert!(eventually(|| store.snapshot(&center_key()).is_none()).await);
}

#[tokio::test]
async fn per_bucket_limit_bounds_results_and_storage() {
    let (store, index) = setup();
    let t0 = Utc::now();
    for i in 0..15 {
        index
            .insert_at(new_message(&i.to_string()), t0 + Duration::seconds(i))
            .await
            .unwrap();
    }

    let found = index
        .nearby_at(LAT, LON, t0 + Duration::seconds(20))
        .await
        .unwrap();
    assert_eq!(found.len(), 10);
    assert_eq!(found[0].message, "14");
    assert_eq!(found[9].message, "5");

    let expected_horizon = t0 + Duration::seconds(14) + Duration::minutes(5);
    assert!(
        eventually(|| store
            .snapshot(&center_key())
            .is_some_and(|s| s.items.len() == 10 && s.expires_at == Some(expected_horizon)))
        .await
    );
}

#[tokio::test]
async fn compaction_is_idempotent() {
    let (store, index) = setup();
    let t0 = Utc::now();
    for i in 0..3 {
        index
            .insert_at(new_message(&i.to_string()), t0 + Duration::seconds(i * 60))
            .await
            .unwrap();
    }

    // 只有最新一条仍然存活
    let at = t0 + Duration::seconds(5 * 60 + 90);
    let first = index.nearby_at(LAT, LON, at).await.unwrap();
    assert_eq!(first.len(), 1);
    assert!(eventually(|| store.snapshot(&center_key()).is_some_and(|s| s.items.len() == 1)).await);
    let after_first = store.snapshot(&center_key()).unwrap();
    let writes = store.write_batches();

    let second = index.nearby_at(LAT, LON, at).await.unwrap();
    assert_eq!(second, first);
    tokio::time::sleep(StdDuration::from_millis(20)).await;
    assert_eq!(store.snapshot(&center_key()), Some(after_first));
    assert_eq!(store.write_batches(), writes);
}

#[tokio::test]
async fn neighbors_are_merged_and_far_buckets_ignored() {
    let (store, index) = setup();
    let now = Utc::now();
    let hood = hasher().neighborhood(LAT, LON).unwrap();

    push_raw(&store, &hood.keys()[0], "center", now + Duration::seconds(100)).await;
    push_raw(&store, &hood.keys()[1], "north", now + Duration::seconds(200)).await;
    push_raw(&store, &hood.keys()[8], "north-west", now + Duration::seconds(150)).await;
    let sydney = hasher().bucket_key_for(-33.8688, 151.2093).unwrap();
    push_raw(&store, &sydney, "sydney", now + Duration::seconds(300)).await;

    let found = index.nearby_at(LAT, LON, now).await.unwrap();
    let texts: Vec<&str> = found.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(texts, vec!["north", "north-west", "center"]);
    assert_eq!(store.fetch_batches(), 1);
}

#[tokio::test]
async fn out_of_order_bucket_is_merged_sorted() {
    let (store, index) = setup();
    let now = Utc::now();
    let hood = hasher().neighborhood(LAT, LON).unwrap();

    // 头部的消息反而先过期
    push_raw(&store, &hood.keys()[0], "late", now + Duration::seconds(300)).await;
    push_raw(&store, &hood.keys()[0], "early", now + Duration::seconds(100)).await;
    push_raw(&store, &hood.keys()[2], "middle", now + Duration::seconds(200)).await;

    let found = index.nearby_at(LAT, LON, now).await.unwrap();
    let texts: Vec<&str> = found.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(texts, vec!["late", "middle", "early"]);
    assert!(found.windows(2).all(|w| w[0].expires_at >= w[1].expires_at));
}

#[tokio::test]
async fn failing_bucket_degrades_instead_of_failing() {
    let (store, index) = setup();
    index.insert(new_message("still here")).await.unwrap();

    let hood = hasher().neighborhood(LAT, LON).unwrap();
    store.fail_key(keys::bucket_key(keys::DEFAULT_KEY_PREFIX, &hood.keys()[3]));

    let found = index.nearby(LAT, LON).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn unavailable_store_fails_the_request() {
    let (store, index) = setup();
    store.set_unavailable(true);

    let read = index.nearby(LAT, LON).await.unwrap_err();
    assert!(matches!(read, IndexError::Store(e) if e.is_transient()));

    let write = index.insert(new_message("HI")).await.unwrap_err();
    assert!(matches!(write, IndexError::Store(_)));
}

#[tokio::test]
async fn malformed_payload_is_skipped() {
    let (store, index) = setup();
    index.insert(new_message("good")).await.unwrap();
    store
        .push(
            &center_key(),
            "{not json".into(),
            Utc::now() + Duration::minutes(5),
        )
        .await
        .unwrap();

    let found = index.nearby(LAT, LON).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "good");
}

#[tokio::test]
async fn invalid_input_never_touches_the_store() {
    let (store, index) = setup();

    let err = index.insert(new_message("   ")).await.unwrap_err();
    assert!(matches!(err, IndexError::Validation(_)));

    let err = index
        .insert(NewMessage {
            latitude: 95.0,
            longitude: LON,
            message: "HI".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Validation(_)));

    let err = index.nearby(LAT, 181.0).await.unwrap_err();
    assert!(matches!(err, IndexError::Validation(_)));

    assert!(store.snapshot(&center_key()).is_none());
    assert_eq!(store.fetch_batches(), 0);
}
