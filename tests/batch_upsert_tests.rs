//! Batch upsert engine tests against an in-memory SQLite store

use catalog_crawler::domain::product::ProductRecord;
use catalog_crawler::infrastructure::batch::BatchUpsertEngine;
use catalog_crawler::infrastructure::database_connection::DatabaseConnection;
use catalog_crawler::infrastructure::repository::ProductRepository;

async fn setup() -> (DatabaseConnection, ProductRepository) {
    let db = DatabaseConnection::new("sqlite::memory:").await.expect("connect");
    db.migrate().await.expect("migrate");
    let repository = ProductRepository::new(db.pool().clone());
    (db, repository)
}

fn record(article_number: &str, color_id: Option<&str>) -> ProductRecord {
    ProductRecord {
        article_number: article_number.to_string(),
        color_id: color_id.map(str::to_string),
        name: Some("Necessär i läder".to_string()),
        price: Some(1299.0),
        image_urls: vec![
            "https://images.example.se/9970239-005_front.jpg".to_string(),
            "https://images.example.se/9970239-005_back.jpg".to_string(),
        ],
        source_url: "https://shop.example.se/p/9970239.html".to_string(),
        ..ProductRecord::default()
    }
}

#[tokio::test]
async fn insert_then_update_replaces_fields_and_image_set() {
    let (_db, repository) = setup().await;
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);

    engine.add(record("9970239", Some("5"))).await.expect("add");
    let stats = engine.flush().await.expect("first flush");
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.images, 2);

    let stored = repository
        .get_by_key("9970239", Some("5"))
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(stored.name.as_deref(), Some("Necessär i läder"));
    assert_eq!(stored.images.len(), 2);
    assert!(stored.images[0].is_primary);
    assert!(!stored.images[1].is_primary);

    // Second sighting of the same key: full replacement, not a new row
    let mut updated = record("9970239", Some("5"));
    updated.name = Some("Necessär i läder, stor".to_string());
    updated.price = Some(1499.0);
    updated.image_urls = vec!["https://images.example.se/9970239-005_new.jpg".to_string()];
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);
    engine.add(updated).await.expect("add");
    let stats = engine.flush().await.expect("second flush");
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.updated, 1);

    assert_eq!(repository.count_products().await.expect("count"), 1);
    let stored = repository
        .get_by_key("9970239", Some("5"))
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(stored.name.as_deref(), Some("Necessär i läder, stor"));
    assert_eq!(stored.price, Some(1499.0));
    assert_eq!(stored.images.len(), 1);
    assert_eq!(
        stored.images[0].url,
        "https://images.example.se/9970239-005_new.jpg"
    );
    assert!(stored.images[0].is_primary);
}

#[tokio::test]
async fn same_article_number_different_color_is_a_distinct_product() {
    let (_db, repository) = setup().await;
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);

    engine.add(record("9970239", Some("5"))).await.expect("add");
    engine.add(record("9970239", Some("13"))).await.expect("add");
    let stats = engine.flush().await.expect("flush");
    assert_eq!(stats.inserted, 2);

    assert_eq!(repository.count_products().await.expect("count"), 2);
    assert!(repository
        .get_by_key("9970239", Some("5"))
        .await
        .expect("query")
        .is_some());
    assert!(repository
        .get_by_key("9970239", Some("13"))
        .await
        .expect("query")
        .is_some());
}

#[tokio::test]
async fn absent_color_is_its_own_key_value() {
    let (_db, repository) = setup().await;
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);

    engine.add(record("9970239", None)).await.expect("add");
    engine.add(record("9970239", Some("5"))).await.expect("add");
    engine.flush().await.expect("flush");

    assert_eq!(repository.count_products().await.expect("count"), 2);

    // A second colorless sighting updates the colorless row only
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);
    engine.add(record("9970239", None)).await.expect("add");
    let stats = engine.flush().await.expect("flush");
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.inserted, 0);
    assert_eq!(repository.count_products().await.expect("count"), 2);
}

#[tokio::test]
async fn repeat_key_within_one_batch_updates_the_first_insert() {
    let (_db, repository) = setup().await;
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);

    engine.add(record("9970239", Some("5"))).await.expect("add");
    let mut second = record("9970239", Some("5"));
    second.name = Some("Necessär i läder, stor".to_string());
    second.image_urls = vec!["https://images.example.se/9970239-005_new.jpg".to_string()];
    engine.add(second).await.expect("add");

    let stats = engine.flush().await.expect("flush");
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.updated, 1);

    // One row per key: the later sighting replaced the earlier insert
    assert_eq!(repository.count_products().await.expect("count"), 1);
    let stored = repository
        .get_by_key("9970239", Some("5"))
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(stored.name.as_deref(), Some("Necessär i läder, stor"));
    assert_eq!(stored.images.len(), 1);
    assert_eq!(
        stored.images[0].url,
        "https://images.example.se/9970239-005_new.jpg"
    );
}

#[tokio::test]
async fn auto_flush_at_threshold() {
    let (_db, repository) = setup().await;
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 3);

    assert!(engine.add(record("1000001", None)).await.expect("add").is_none());
    assert!(engine.add(record("1000002", None)).await.expect("add").is_none());
    let stats = engine
        .add(record("1000003", None))
        .await
        .expect("add")
        .expect("threshold flush");
    assert_eq!(stats.inserted, 3);
    assert_eq!(engine.pending_count(), 0);
}

#[tokio::test]
async fn failed_flush_discards_the_batch_and_reports_a_sample() {
    let (db, repository) = setup().await;
    let mut engine = BatchUpsertEngine::with_batch_size(repository.clone(), 50);

    for i in 0..8 {
        engine
            .add(record(&format!("997023{i}"), None))
            .await
            .expect("add");
    }

    // Break the store underneath the engine
    sqlx::query("DROP TABLE product_images")
        .execute(db.pool())
        .await
        .expect("drop");

    let error = engine.flush().await.expect_err("flush must fail");
    assert_eq!(error.count, 8);
    assert_eq!(error.sample.len(), 5);
    assert_eq!(error.sample[0], "9970230");

    // The batch is gone, not retried: the next flush is a no-op
    assert_eq!(engine.pending_count(), 0);
    let stats = engine.flush().await.expect("empty flush is a no-op");
    assert_eq!(stats, Default::default());
}
