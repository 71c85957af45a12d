//! Every user action ends as a status string, whatever happens inside it.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

/// Await `action`, turning errors and panics into `❌ {label}: {reason}`.
pub async fn run_action<F>(label: &str, action: F) -> String
where
    F: Future<Output = anyhow::Result<String>>,
{
    match AssertUnwindSafe(action).catch_unwind().await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            error!(action = label, error = %format!("{err:#}"), "action failed");
            format!("❌ {label}: {err:#}")
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(action = label, reason = %reason, "action panicked");
            format!("❌ {label}: {reason}")
        }
    }
}

/// Run `action` to completion on a fresh current-thread runtime that is
/// dropped afterwards.
pub fn block_on_action<F>(label: &str, action: F) -> String
where
    F: Future<Output = anyhow::Result<String>>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => return format!("❌ {label}: {err}"),
    };
    runtime.block_on(run_action(label, action))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
