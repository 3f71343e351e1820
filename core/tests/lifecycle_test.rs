use murmur_core::{
    HistoryStore, LlmClientConfig, Murmur, PersonaConfig, RateLimiterConfig, Result, StoreConfig,
};

async fn murmur() -> Result<Murmur> {
    Murmur::new(
        PersonaConfig::default(),
        LlmClientConfig::default(),
        StoreConfig::default(),
        RateLimiterConfig::default(),
    )
    .await
}

#[tokio::test]
async fn start_then_shutdown_clears_the_store() -> Result<()> {
    let mut m = murmur().await?;
    assert!(!m.is_running());

    m.start().await?;
    assert!(m.is_running());
    m.store.add_message("42", "user", "你好").await?;
    assert_eq!(m.store.get_history("42").await?.len(), 1);

    m.shutdown().await?;
    assert!(!m.is_running());
    assert!(m.store.is_empty());
    assert!(m.store.get_history("42").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_without_start_is_a_no_op() -> Result<()> {
    let mut m = murmur().await?;
    m.store.add_message("42", "user", "你好").await?;

    m.shutdown().await?;
    assert!(!m.is_running());
    assert_eq!(m.store.len(), 1);

    m.start().await?;
    m.shutdown().await?;
    m.shutdown().await?;
    assert!(m.store.is_empty());
    Ok(())
}
