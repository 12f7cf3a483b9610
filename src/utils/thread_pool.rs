/// 🔐 Dedicated thread pool for bcrypt hashing.
///
/// Bcrypt at DEFAULT_COST takes tens of milliseconds per call. Running it
/// on a separate pool keeps the main Tokio runtime free to serve requests
/// during registration and login bursts.
use lazy_static::lazy_static;
use std::sync::Arc;
use tokio::runtime::Runtime;

lazy_static! {
    /// Pool reserved for password hash operations (CPU-bound)
    pub static ref HASH_POOL: Arc<Runtime> = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)  // hashing is CPU-bound, 2 threads is plenty
            .thread_name("hash-worker")
            .enable_all()
            .build()
            .expect("Failed to create hashing thread pool")
    );
}

/// Runs a blocking hash operation on the dedicated pool.
///
/// # Example
/// ```rust
/// let hash = spawn_hash_blocking(move || {
///     bcrypt::hash(&pin, bcrypt::DEFAULT_COST)
/// }).await?;
/// ```
pub async fn spawn_hash_blocking<F, R>(f: F) -> Result<R, tokio::task::JoinError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    HASH_POOL.spawn_blocking(f).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_pool_works() {
        let result = spawn_hash_blocking(|| {
            std::thread::sleep(std::time::Duration::from_millis(10));
            42
        }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_hash_pool_runs_bcrypt() {
        let result = spawn_hash_blocking(|| bcrypt::hash("1234", 4)).await;
        let hash = result.unwrap().unwrap();
        assert!(bcrypt::verify("1234", &hash).unwrap());
    }
}
