use std::time::Duration;

use snip_core::{CollisionStrategy, ExternalStore, ShortCode, StoreError, UrlRecord};
use snip_storage::MySqlStore;
use snip_test_infra::mysql::{MySqlServer, MysqlConfig};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    store: MySqlStore,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::start(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let url = mysql.database_url().await.expect("mysql url");
        let pool = connect_with_retry(&url).await;

        let store = MySqlStore::new(pool);
        store.ensure_schema().await.expect("create schema");

        Self {
            _mysql: mysql,
            store,
        }
    }

    async fn shorten(&self, url: &str) -> UrlRecord {
        let id = self.store.allocate_identifier(url).await.unwrap();
        let record = UrlRecord::new(id, url, ShortCode::from_id(id).unwrap());
        self.store.persist_record(&record).await.unwrap();
        record
    }
}

async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
        {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn identifiers_are_monotonic() {
    let fixture = Fixture::start().await;

    let first = fixture.store.allocate_identifier("https://a.com").await.unwrap();
    let second = fixture.store.allocate_identifier("https://b.com").await.unwrap();
    assert!(second > first);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn persist_and_fetch_round_trip() {
    let fixture = Fixture::start().await;
    let record = fixture.shorten("https://example.com").await;

    let fetched = fixture
        .store
        .fetch_record(&record.short_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.id, record.id);
    assert_eq!(fetched.original_url, record.original_url);
    assert_eq!(fetched.click_count, 0);
    assert!(!fetched.collision_detected);
    // Creation time is stored with microsecond precision.
    assert_eq!(
        fetched.created_at.as_microsecond(),
        record.created_at.as_microsecond()
    );

    let by_url = fixture
        .store
        .find_by_original_url("https://example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_url.short_code, record.short_code);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn collision_metadata_is_stored() {
    let fixture = Fixture::start().await;
    let id = fixture.store.allocate_identifier("https://a.com").await.unwrap();
    let record = UrlRecord::new(id, "https://a.com", ShortCode::new("abc1").unwrap())
        .with_resolution(Some(CollisionStrategy::Append));
    fixture.store.persist_record(&record).await.unwrap();

    let fetched = fixture
        .store
        .fetch_record(&record.short_code)
        .await
        .unwrap()
        .unwrap();
    assert!(fetched.collision_detected);
    assert_eq!(fetched.resolution_strategy, Some(CollisionStrategy::Append));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_short_code_conflicts() {
    let fixture = Fixture::start().await;
    let existing = fixture.shorten("https://a.com").await;

    let id = fixture.store.allocate_identifier("https://b.com").await.unwrap();
    let clash = UrlRecord::new(id, "https://b.com", existing.short_code.clone());
    let result = fixture.store.persist_record(&clash).await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn short_codes_are_case_sensitive() {
    let fixture = Fixture::start().await;
    let lower_id = fixture.store.allocate_identifier("https://a.com").await.unwrap();
    let upper_id = fixture.store.allocate_identifier("https://b.com").await.unwrap();

    let lower = UrlRecord::new(lower_id, "https://a.com", ShortCode::new("abc").unwrap());
    let upper = UrlRecord::new(upper_id, "https://b.com", ShortCode::new("ABC").unwrap());
    fixture.store.persist_record(&lower).await.unwrap();
    fixture.store.persist_record(&upper).await.unwrap();

    let fetched = fixture
        .store
        .fetch_record(&ShortCode::new("ABC").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.original_url, "https://b.com");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn click_increments_accumulate() {
    let fixture = Fixture::start().await;
    let record = fixture.shorten("https://example.com").await;

    assert_eq!(
        fixture
            .store
            .persist_click_increment(&record.short_code)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        fixture
            .store
            .persist_click_increment(&record.short_code)
            .await
            .unwrap(),
        2
    );

    let missing = ShortCode::new("zzzz").unwrap();
    assert!(fixture.store.persist_click_increment(&missing).await.is_err());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn list_skips_unfinished_allocations() {
    let fixture = Fixture::start().await;
    fixture.shorten("https://a.com").await;
    fixture.store.allocate_identifier("https://pending.com").await.unwrap();
    fixture.shorten("https://b.com").await;

    let urls: Vec<String> = fixture
        .store
        .list_records()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.original_url)
        .collect();
    assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
}
