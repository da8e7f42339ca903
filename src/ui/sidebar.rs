use std::sync::Arc;

use crate::api::error::Result;
use crate::api::models::Conversation;
use crate::api::ChatBackend;
use crate::ui::browse::matches;

/// Conversation list shown next to the chat panel.
pub struct Inbox<B> {
    backend: Arc<B>,
    items: Vec<Conversation>,
}

impl<B: ChatBackend> Inbox<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend, items: Vec::new() }
    }

    /// Replace the list with the backend's. On failure the previous list is
    /// kept.
    pub async fn refresh(&mut self) -> Result<()> {
        let items = self.backend.conversations().await?;
        log::debug!("[inbox] {} conversations", items.len());
        self.items = items;
        Ok(())
    }

    pub fn items(&self) -> &[Conversation] {
        &self.items
    }

    pub fn filter(&self, term: &str) -> Vec<Conversation> {
        self.items.iter().filter(|c| matches(&c.counterpart_name, term)).cloned().collect()
    }

    pub fn total_unread(&self) -> u32 {
        self.items.iter().map(|c| c.unread_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Message;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeInbox {
        fail: AtomicBool,
    }

    #[async_trait]
    impl ChatBackend for FakeInbox {
        async fn conversations(&self) -> Result<Vec<Conversation>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Unauthorized("jwt expired".into()));
            }
            Ok(vec![
                Conversation { id: "c1".into(), counterpart_name: "Grace Collections".into(), unread_count: 2, ..Default::default() },
                Conversation { id: "c2".into(), counterpart_name: "Elite Wears".into(), unread_count: 1, ..Default::default() },
            ])
        }

        async fn messages(&self, _: &str, _: &str) -> Result<Vec<Message>> {
            Ok(Vec::new())
        }

        async fn send_message(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn mark_read(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn refresh_filter_and_count() {
        let backend = Arc::new(FakeInbox { fail: AtomicBool::new(false) });
        let mut inbox = Inbox::new(backend.clone());
        inbox.refresh().await.unwrap();
        assert_eq!(inbox.total_unread(), 3);
        assert_eq!(inbox.filter("elite")[0].id, "c2");

        backend.fail.store(true, Ordering::SeqCst);
        assert!(matches!(inbox.refresh().await, Err(ApiError::Unauthorized(_))));
        assert_eq!(inbox.items().len(), 2);
    }
}
