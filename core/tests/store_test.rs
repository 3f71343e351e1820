use murmur_core::{ChatMessage, HistoryStore, InMemoryStore, Result, StoreConfig, VoiceCache};
use std::time::Duration;

#[tokio::test]
async fn history_is_capped_and_chronological() -> Result<()> {
    let store = InMemoryStore::new(StoreConfig {
        history_size: 3,
        ..StoreConfig::default()
    });
    for i in 0..5 {
        store.add_message("u1", "user", &format!("m{i}")).await?;
    }
    let history = store.get_history("u1").await?;
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m2", "m3", "m4"]);
    assert!(store.get_history("nobody").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn history_expires_after_ttl() -> Result<()> {
    let store = InMemoryStore::new(StoreConfig {
        history_ttl: Duration::from_millis(20),
        ..StoreConfig::default()
    });
    store.add_message("u1", "assistant", "hi").await?;
    assert_eq!(store.get_history("u1").await?, vec![ChatMessage::assistant("hi")]);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(store.get_history("u1").await?.is_empty());
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test]
async fn voice_cache_round_trip_and_ttl() -> Result<()> {
    let store = InMemoryStore::new(StoreConfig {
        voice_cache_ttl: Duration::from_millis(20),
        ..StoreConfig::default()
    });
    store.cache_voice("你好", vec![1, 2, 3]).await?;
    assert_eq!(store.get_cached_voice("你好").await?, Some(vec![1, 2, 3]));
    assert_eq!(store.get_cached_voice("再见").await?, None);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(store.get_cached_voice("你好").await?, None);
    Ok(())
}

#[tokio::test]
async fn history_and_voice_keys_do_not_collide() -> Result<()> {
    let store = InMemoryStore::new(StoreConfig::default());
    store.cache_voice("u1", vec![9]).await?;
    store.add_message("u1", "user", "hello").await?;
    assert_eq!(store.get_history("u1").await?.len(), 1);
    assert_eq!(store.get_cached_voice("u1").await?, Some(vec![9]));
    assert_eq!(store.len(), 2);
    Ok(())
}
