use super::*;
use anyhow::Result;

async fn initialized_store(dimension: usize, metric: DistanceMetric) -> Result<MemoryVectorStore> {
    let store = MemoryVectorStore::new(dimension, metric);
    store.initialize(false).await?;
    Ok(store)
}

#[tokio::test]
async fn uninitialized_store_rejects_operations() {
    let store = MemoryVectorStore::new(2, DistanceMetric::Cosine);

    assert!(matches!(
        store.put("text", &[1.0, 0.0]).await,
        Err(RagError::Storage(_))
    ));
    assert!(matches!(
        store.query(&[1.0, 0.0], 1).await,
        Err(RagError::Storage(_))
    ));
    assert!(matches!(store.count().await, Err(RagError::Storage(_))));
}

#[tokio::test]
async fn euclidean_scenario_matches_sqlite_backend() -> Result<()> {
    let store = initialized_store(4, DistanceMetric::Euclidean).await?;
    for i in 1..=5_u8 {
        store
            .put(&format!("record {}", i), &[f32::from(i) / 10.0; 4])
            .await?;
    }

    let ids: Vec<i64> = store
        .query(&[0.3; 4], 3)
        .await?
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![3, 2, 4]);

    Ok(())
}

#[tokio::test]
async fn round_trip_distance_is_zero() -> Result<()> {
    let store = initialized_store(3, DistanceMetric::Cosine).await?;
    store.put("other", &[0.0, 1.0, 0.0]).await?;
    let id = store.put("target", &[0.2, 0.4, 0.9]).await?;

    let results = store.query(&[0.2, 0.4, 0.9], 1).await?;
    assert_eq!(results[0].id, id);
    assert!(results[0].distance.abs() < 1e-6);

    Ok(())
}

#[tokio::test]
async fn initialize_respects_overwrite() -> Result<()> {
    let store = initialized_store(2, DistanceMetric::Cosine).await?;
    store.put("a", &[1.0, 0.0]).await?;

    store.initialize(false).await?;
    assert_eq!(store.count().await?, 1);

    store.reset().await?;
    assert_eq!(store.count().await?, 0);
    assert_eq!(store.put("b", &[1.0, 0.0]).await?, 1);

    Ok(())
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() -> Result<()> {
    let store = initialized_store(3, DistanceMetric::Cosine).await?;

    assert!(matches!(
        store.put("bad", &[1.0]).await,
        Err(RagError::DimensionMismatch {
            expected: 3,
            actual: 1
        })
    ));

    Ok(())
}

#[tokio::test]
async fn list_all_preserves_insertion_order() -> Result<()> {
    let store = initialized_store(1, DistanceMetric::Euclidean).await?;
    for text in ["one", "two", "three"] {
        store.put(text, &[0.0]).await?;
    }

    let records = store.list_all().await?;
    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert_eq!(records[2].id, 3);

    Ok(())
}
