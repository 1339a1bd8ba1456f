use crate::plugin::lock;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Cancel-and-reschedule timer: only the last call within a quiet period
/// of `delay` fires.
#[derive(Default)]
pub(crate) struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub(crate) fn schedule(&self, delay: Duration, f: impl FnOnce() + Send + 'static) {
        let Ok(runtime) = Handle::try_current() else {
            f();
            return;
        };

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });

        if let Some(previous) = lock(&self.pending).replace(task) {
            previous.abort();
        }
    }

    pub(crate) fn cancel(&self) {
        if let Some(pending) = lock(&self.pending).take() {
            pending.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
