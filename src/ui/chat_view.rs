use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::error::{ApiError, Result};
use crate::api::events::ChatEvent;
use crate::api::models::Message;
use crate::api::ChatBackend;

/// Handle to a running poll. Dropping it stops the poll.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Conversation between the signed-in user and one counterpart. While open,
/// the full message list is re-fetched every `interval` and replaces local
/// state.
pub struct ChatPanel<B> {
    backend: Arc<B>,
    user_id: String,
    counterpart_id: String,
    interval: Duration,
    messages: Arc<Mutex<Vec<Message>>>,
    events: broadcast::Sender<ChatEvent>,
    subscription: Option<Subscription>,
    sent: u64,
}

impl<B: ChatBackend> ChatPanel<B> {
    pub fn new(backend: Arc<B>, user_id: &str, counterpart_id: &str, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            backend,
            user_id: user_id.to_string(),
            counterpart_id: counterpart_id.to_string(),
            interval,
            messages: Arc::new(Mutex::new(Vec::new())),
            events,
            subscription: None,
            sent: 0,
        }
    }

    pub fn counterpart_id(&self) -> &str {
        &self.counterpart_id
    }

    pub fn events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.recipient_id == self.user_id && !m.is_read)
            .count()
    }

    pub fn is_open(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Start polling. The first fetch happens immediately. Opening an
    /// already open panel keeps the existing poll.
    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        let backend = self.backend.clone();
        let messages = self.messages.clone();
        let events = self.events.clone();
        let user = self.user_id.clone();
        let counterpart = self.counterpart_id.clone();
        let interval = self.interval;

        log::info!("[chat] polling {user} <-> {counterpart} every {interval:?}");
        let task = crate::utils::spawn_async(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match backend.messages(&user, &counterpart).await {
                    Ok(list) => {
                        *messages.lock() = list.clone();
                        let _ = events.send(ChatEvent::Refreshed(list));
                    }
                    Err(e) => {
                        log::warn!("[chat] poll failed: {e}");
                        let _ = events.send(ChatEvent::FetchFailed(e.to_string()));
                    }
                }
            }
        });
        self.subscription = Some(Subscription { task });
    }

    pub fn close(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.cancel();
            log::info!("[chat] closed {} <-> {}", self.user_id, self.counterpart_id);
            let _ = self.events.send(ChatEvent::Closed);
        }
    }

    /// POST the message and, once accepted, show it locally with placeholder
    /// fields until the next poll brings the server copy.
    pub async fn send(&mut self, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::invalid("content", "message cannot be empty"));
        }
        self.backend.send_message(&self.counterpart_id, content).await?;

        self.sent += 1;
        let placeholder = Message {
            id: format!("local-{}", self.sent),
            sender_id: self.user_id.clone(),
            recipient_id: self.counterpart_id.clone(),
            content: content.to_string(),
            is_read: false,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.messages.lock().push(placeholder);
        Ok(())
    }

    /// Only flips the local flag after the backend accepted it.
    pub async fn mark_read(&self, message_id: &str) -> Result<()> {
        if let Err(e) = self.backend.mark_read(message_id).await {
            log::warn!("[chat] mark read {message_id} failed: {e}");
            return Err(e);
        }
        if let Some(msg) = self.messages.lock().iter_mut().find(|m| m.id == message_id) {
            msg.is_read = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::api::models::Conversation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeChat {
        fetches: AtomicUsize,
        sends: AtomicUsize,
        stored: Mutex<Vec<Message>>,
        reject_reads: bool,
    }

    fn msg(id: &str, from: &str, to: &str) -> Message {
        Message {
            id: id.into(),
            sender_id: from.into(),
            recipient_id: to.into(),
            content: format!("hello from {from}"),
            ..Default::default()
        }
    }

    impl FakeChat {
        fn with_messages(messages: Vec<Message>) -> Self {
            Self { stored: Mutex::new(messages), ..Default::default() }
        }
    }

    #[async_trait]
    impl ChatBackend for FakeChat {
        async fn conversations(&self) -> Result<Vec<Conversation>> {
            Ok(Vec::new())
        }

        async fn messages(&self, _user_id: &str, _counterpart_id: &str) -> Result<Vec<Message>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.stored.lock().clone())
        }

        async fn send_message(&self, _recipient_id: &str, _content: &str) -> Result<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn mark_read(&self, _message_id: &str) -> Result<()> {
            if self.reject_reads {
                return Err(ApiError::Status { status: 500, body: "boom".into() });
            }
            Ok(())
        }
    }

    const FIVE: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn polls_while_open_and_stops_after_close() {
        let backend = Arc::new(FakeChat::with_messages(vec![msg("m1", "s1", "u1")]));
        let mut panel = ChatPanel::new(backend.clone(), "u1", "s1", FIVE);
        panel.open();
        assert!(panel.is_open());

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(panel.messages().len(), 1);

        panel.close();
        assert!(!panel.is_open());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_panel_stops_the_poll() {
        let backend = Arc::new(FakeChat::default());
        let mut panel = ChatPanel::new(backend.clone(), "u1", "s1", FIVE);
        panel.open();
        panel.open();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);

        drop(panel);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_see_refresh_and_close() {
        let backend = Arc::new(FakeChat::with_messages(vec![msg("m1", "s1", "u1")]));
        let mut panel = ChatPanel::new(backend, "u1", "s1", FIVE);
        let mut events = panel.events();
        panel.open();

        match events.recv().await.unwrap() {
            ChatEvent::Refreshed(list) => assert_eq!(list[0].id, "m1"),
            other => panic!("unexpected {other:?}"),
        }
        panel.close();
        assert_eq!(events.recv().await.unwrap(), ChatEvent::Closed);
    }

    #[tokio::test]
    async fn send_appends_placeholder() {
        let backend = Arc::new(FakeChat::default());
        let mut panel = ChatPanel::new(backend.clone(), "u1", "s1", FIVE);
        panel.send("  Is this still available? ").await.unwrap();

        let messages = panel.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "local-1");
        assert_eq!(messages[0].sender_id, "u1");
        assert_eq!(messages[0].recipient_id, "s1");
        assert_eq!(messages[0].content, "Is this still available?");
        assert!(!messages[0].timestamp.is_empty());
        assert_eq!(backend.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_message_never_leaves_the_client() {
        let backend = Arc::new(FakeChat::default());
        let mut panel = ChatPanel::new(backend.clone(), "u1", "s1", FIVE);
        let err = panel.send("   ").await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "content");
        assert_eq!(backend.sends.load(Ordering::SeqCst), 0);
        assert!(panel.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mark_read_flips_only_that_message() {
        let backend = Arc::new(FakeChat::with_messages(vec![
            msg("m1", "s1", "u1"),
            msg("m2", "s1", "u1"),
            msg("m3", "u1", "s1"),
        ]));
        let mut panel = ChatPanel::new(backend, "u1", "s1", FIVE);
        panel.open();
        tokio::time::sleep(Duration::from_millis(10)).await;
        panel.close();
        assert_eq!(panel.unread_count(), 2);

        panel.mark_read("m1").await.unwrap();
        let flags: Vec<bool> = panel.messages().iter().map(|m| m.is_read).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(panel.unread_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_mark_read_leaves_message_unread() {
        let backend = Arc::new(FakeChat {
            stored: Mutex::new(vec![msg("m1", "s1", "u1")]),
            reject_reads: true,
            ..Default::default()
        });
        let mut panel = ChatPanel::new(backend, "u1", "s1", FIVE);
        panel.open();
        tokio::time::sleep(Duration::from_millis(10)).await;
        panel.close();

        assert!(panel.mark_read("m1").await.is_err());
        assert!(!panel.messages()[0].is_read);
    }
}
