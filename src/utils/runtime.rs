use anyhow::Result;

/// Everything in clarity is cooperative and event driven, so a single thread is all the daemon
/// needs.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
