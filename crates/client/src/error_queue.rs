//! User-facing error queue shared by the realtime and request layers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use livechat_shared::WidgetError;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const NOTIFY_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<WidgetError>,
    last_message: Option<String>,
}

/// Append-only list of classified errors. Cloning shares the same queue.
#[derive(Debug, Clone)]
pub struct ErrorQueue {
    state: Arc<Mutex<QueueState>>,
    notify: broadcast::Sender<WidgetError>,
    dismiss_after: Duration,
}

impl ErrorQueue {
    pub fn new(dismiss_after: Duration) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            notify,
            dismiss_after,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an error and return its id. Identical errors are not merged.
    pub fn add(&self, error: WidgetError) -> String {
        let id = error.id.clone();
        tracing::debug!(
            id = %id,
            kind = %error.kind,
            code = error.code,
            severity = ?error.severity,
            "error queued"
        );
        {
            let mut state = self.lock();
            state.last_message = Some(error.message.clone());
            state.entries.push(error.clone());
        }
        // No subscribers is fine.
        let _ = self.notify.send(error);
        id
    }

    /// Mark an error dismissed. Returns whether anything changed; unknown or
    /// already-dismissed ids are a no-op.
    pub fn dismiss(&self, id: &str) -> bool {
        let mut state = self.lock();
        match state.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if !entry.dismissed => {
                entry.dismissed = true;
                true
            }
            _ => false,
        }
    }

    /// Dismiss everything and clear the last-message slot.
    pub fn clear(&self) {
        let mut state = self.lock();
        for entry in &mut state.entries {
            entry.dismissed = true;
        }
        state.last_message = None;
    }

    /// Errors still on screen, oldest first.
    pub fn active(&self) -> Vec<WidgetError> {
        self.lock()
            .entries
            .iter()
            .filter(|e| !e.dismissed)
            .cloned()
            .collect()
    }

    /// Every error ever queued, dismissed or not.
    pub fn entries(&self) -> Vec<WidgetError> {
        self.lock().entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<WidgetError> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn last_message(&self) -> Option<String> {
        self.lock().last_message.clone()
    }

    /// Label of the action a retry button should replay, if the error is
    /// retryable.
    pub fn retry_action(&self, id: &str) -> Option<String> {
        let state = self.lock();
        let entry = state.entries.iter().find(|e| e.id == id)?;
        if !entry.retryable {
            return None;
        }
        Some(entry.action_label().to_string())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetError> {
        self.notify.subscribe()
    }

    pub fn dismiss_after(&self) -> Duration {
        self.dismiss_after
    }

    /// Start the countdown for a rendered error using the queue's window.
    /// Must be called inside a tokio runtime.
    pub fn auto_dismiss(&self, id: impl Into<String>) -> AutoDismiss {
        AutoDismiss::start(self.clone(), id.into(), self.dismiss_after)
    }
}

/// Countdown that dismisses one error when it expires.
///
/// Pausing keeps the remaining time; dropping the handle cancels the
/// countdown without dismissing.
#[derive(Debug)]
pub struct AutoDismiss {
    queue: ErrorQueue,
    id: String,
    remaining: Duration,
    /// Set while the countdown is running.
    deadline: Option<Instant>,
    task: Option<JoinHandle<()>>,
}

impl AutoDismiss {
    pub fn start(queue: ErrorQueue, id: String, window: Duration) -> Self {
        let mut countdown = Self {
            queue,
            id,
            remaining: window,
            deadline: None,
            task: None,
        };
        countdown.run();
        countdown
    }

    fn run(&mut self) {
        let deadline = Instant::now() + self.remaining;
        let queue = self.queue.clone();
        let id = self.id.clone();
        self.deadline = Some(deadline);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if queue.dismiss(&id) {
                tracing::trace!(id = %id, "error auto-dismissed");
            }
        }));
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_paused(&self) -> bool {
        self.deadline.is_none()
    }

    pub fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.remaining,
        }
    }

    /// Stop the countdown, e.g. while the pointer hovers the error.
    pub fn pause(&mut self) {
        let Some(deadline) = self.deadline.take() else {
            return;
        };
        self.remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Continue from the time left when paused.
    pub fn resume(&mut self) {
        if self.deadline.is_none() {
            self.run();
        }
    }
}

impl Drop for AutoDismiss {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livechat_shared::{ErrorContext, ErrorKind};

    fn queue() -> ErrorQueue {
        ErrorQueue::new(Duration::from_secs(8))
    }

    #[test]
    fn dismissing_twice_is_harmless() {
        let queue = queue();
        let id = queue.add(WidgetError::classify(503, None, ErrorContext::new()));

        assert!(queue.dismiss(&id));
        assert!(!queue.dismiss(&id));
        assert!(!queue.dismiss("no-such-id"));

        let entries = queue.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].dismissed);
        assert!(queue.active().is_empty());
    }

    #[test]
    #[tracing_test::traced_test]
    fn queued_errors_are_logged() {
        let queue = queue();
        queue.add(WidgetError::classify(0, None, ErrorContext::new()));
        assert!(logs_contain("error queued"));
        assert!(logs_contain("kind=network"));
    }

    #[test]
    fn identical_errors_are_not_merged() {
        let queue = queue();
        queue.add(WidgetError::classify(0, None, ErrorContext::new()));
        queue.add(WidgetError::classify(0, None, ErrorContext::new()));
        assert_eq!(queue.active().len(), 2);
    }

    #[test]
    fn clear_dismisses_all_and_forgets_last_message() {
        let queue = queue();
        queue.add(WidgetError::classify(429, None, ErrorContext::new()));
        queue.add(WidgetError::classify(401, None, ErrorContext::new()));
        assert!(queue.last_message().is_some());

        queue.clear();
        assert!(queue.active().is_empty());
        assert_eq!(queue.entries().len(), 2);
        assert_eq!(queue.last_message(), None);
    }

    #[test]
    fn retry_action_only_for_retryable_errors() {
        let queue = queue();
        let network = queue.add(WidgetError::new(
            ErrorKind::Network,
            0,
            ErrorContext::new().with_retry_action("Reconnect"),
        ));
        let validation = queue.add(WidgetError::classify(422, None, ErrorContext::new()));

        assert_eq!(queue.retry_action(&network).as_deref(), Some("Reconnect"));
        assert_eq!(queue.retry_action(&validation), None);
    }

    #[tokio::test]
    async fn subscribers_see_new_errors() {
        let queue = queue();
        let mut rx = queue.subscribe();
        let id = queue.add(WidgetError::classify(500, None, ErrorContext::new()));
        assert_eq!(rx.recv().await.unwrap().id, id);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_dismisses_on_expiry() {
        let queue = queue();
        let id = queue.add(WidgetError::classify(0, None, ErrorContext::new()));
        let _countdown = queue.auto_dismiss(id.clone());

        tokio::time::sleep(Duration::from_millis(7_900)).await;
        assert!(!queue.get(&id).unwrap().dismissed);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(queue.get(&id).unwrap().dismissed);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_keep_remaining_time() {
        let queue = queue();
        let id = queue.add(WidgetError::classify(0, None, ErrorContext::new()));
        let mut countdown = queue.auto_dismiss(id.clone());

        tokio::time::sleep(Duration::from_secs(5)).await;
        countdown.pause();
        assert!(countdown.is_paused());
        assert_eq!(countdown.remaining(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!queue.get(&id).unwrap().dismissed);

        countdown.resume();
        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert!(!queue.get(&id).unwrap().dismissed);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(queue.get(&id).unwrap().dismissed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_countdown_never_fires() {
        let queue = queue();
        let id = queue.add(WidgetError::classify(0, None, ErrorContext::new()));
        drop(queue.auto_dismiss(id.clone()));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!queue.get(&id).unwrap().dismissed);
    }
}
