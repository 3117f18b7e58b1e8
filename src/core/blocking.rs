//! Runs the async call path for the synchronous API

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::core::errors::{Result, TranslationError};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> Result<&'static Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("polytl-blocking")
        .enable_all()
        .build()?;
    Ok(RUNTIME.get_or_init(|| rt))
}

/// Block the current thread on `future`.
///
/// The runtime is process-wide and never dropped, so pooled connections of
/// the shared HTTP client stay usable between calls.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(TranslationError::ConfigError {
            message: "blocking translator methods cannot be called from within an async runtime; \
                      use the *_async variants instead"
                .to_string(),
        });
    }
    Ok(runtime()?.block_on(future))
}
