//! Conversation operations
//!
//! Every call is stamped with the active context at dispatch and applied to
//! the cached message list only if that context is still active when the
//! response arrives.

use uuid::Uuid;

use super::GatewayClient;
use crate::context::{ContextToken, Guarded};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};
use crate::types::identifiers::ContextId;
use crate::types::messages::{
    CompletionOptions, CompletionRequest, CompletionResponse, Message, MessageInput, Role,
};

fn messages_path(id: ContextId) -> String {
    format!("/chats/{id}/messages")
}

fn completion_path(id: ContextId) -> String {
    format!("/chats/{id}/completion")
}

impl<T: Transport + 'static> GatewayClient<T> {
    /// Make `id` the active conversation and drop the cached messages
    pub fn switch_context(&self, id: ContextId) -> ContextToken {
        self.context.switch_to(id)
    }

    /// Leave no conversation active
    pub fn clear_context(&self) {
        self.context.clear();
    }

    /// Active conversation
    #[must_use]
    pub fn active_context(&self) -> Option<ContextId> {
        self.context.active()
    }

    /// Cached messages of the active conversation
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.context.messages()
    }

    /// Load the message history of `id`, replacing the cache if still current
    ///
    /// # Errors
    /// Returns the request error if `id` is still the active conversation
    pub async fn load_messages(&self, id: ContextId) -> Result<Guarded<Vec<Message>>> {
        let fetch = self
            .coordinator
            .execute_json::<Vec<Message>>(ApiRequest::get(messages_path(id)));

        self.context
            .with_context_apply(id, fetch, |messages, loaded| {
                messages.clone_from(&loaded);
                loaded
            })
            .await
    }

    /// Post a user message with an optimistic local insert
    ///
    /// The pending entry shows up in [`messages`](Self::messages) right away
    /// and is swapped for the stored message once the backend confirms it,
    /// or removed if the call fails.
    ///
    /// # Errors
    /// Returns the request error if `id` is still the active conversation
    pub async fn send_message(
        &self,
        id: ContextId,
        content: impl Into<String>,
    ) -> Result<Guarded<Message>> {
        let content = content.into();
        let request = ApiRequest::post(messages_path(id)).json(&MessageInput {
            role: Role::User,
            content: content.clone(),
        })?;

        let token = self.context.capture(id);
        let pending = Message::pending_user(id, content);
        let key = pending.pending;
        let _ = self.context.apply(token, |messages| messages.push(pending));

        match self.coordinator.execute_json::<Message>(request).await {
            Ok(stored) => Ok(self
                .context
                .apply(token, |messages| reconcile(messages, key, stored))),
            Err(e) => match self
                .context
                .apply(token, |messages| messages.retain(|m| m.pending != key))
            {
                Guarded::Applied(()) => Err(e),
                Guarded::Stale => {
                    log::debug!("Suppressing send error for stale context {id}: {e}");
                    Ok(Guarded::Stale)
                }
            },
        }
    }

    /// Ask the model for a reply to the confirmed history of `id`
    ///
    /// Returns `Stale` without calling the backend if `id` is not the
    /// active conversation, since the cache holds another conversation's
    /// history.
    ///
    /// # Errors
    /// Returns the request error if `id` is still the active conversation
    pub async fn complete(
        &self,
        id: ContextId,
        options: CompletionOptions,
    ) -> Result<Guarded<Message>> {
        let token = self.context.capture(id);
        let history = match self.context.apply(token, |messages| {
            messages
                .iter()
                .filter(|m| !m.is_pending())
                .map(Message::as_input)
                .collect::<Vec<_>>()
        }) {
            Guarded::Applied(history) => history,
            Guarded::Stale => return Ok(Guarded::Stale),
        };

        let request = ApiRequest::post(completion_path(id)).json(&CompletionRequest {
            messages: history,
            options,
        })?;
        let call = self
            .coordinator
            .execute_json::<CompletionResponse>(request);

        self.context
            .run(token, call, |messages, response| {
                messages.push(response.message.clone());
                response.message
            })
            .await
    }
}

/// Swap the pending entry `key` for the stored message
///
/// Appends if the entry is gone (the list was reloaded meanwhile) and the
/// stored message is not already present.
fn reconcile(messages: &mut Vec<Message>, key: Option<Uuid>, stored: Message) -> Message {
    if let Some(slot) = messages
        .iter_mut()
        .find(|m| m.pending.is_some() && m.pending == key)
    {
        *slot = stored.clone();
    } else if !messages.iter().any(|m| !m.is_pending() && m.id == stored.id) {
        messages.push(stored.clone());
    }
    stored
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::identifiers::MessageId;

    fn stored(id: u64) -> Message {
        Message {
            id: MessageId::new(id),
            context_id: ContextId::new(1),
            role: Role::User,
            content: "hello".into(),
            meta_json: None,
            created_at: Utc::now(),
            pending: None,
        }
    }

    #[test]
    fn test_reconcile_replaces_pending_in_place() {
        let pending = Message::pending_user(ContextId::new(1), "hello");
        let key = pending.pending;
        let mut messages = vec![stored(1), pending, stored(2)];

        reconcile(&mut messages, key, stored(3));

        let ids: Vec<u64> = messages.iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert!(messages.iter().all(|m| !m.is_pending()));
    }

    #[test]
    fn test_reconcile_does_not_duplicate_reloaded_message() {
        let mut messages = vec![stored(3)];
        reconcile(&mut messages, Some(Uuid::new_v4()), stored(3));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_paths() {
        assert_eq!(messages_path(ContextId::new(5)), "/chats/5/messages");
        assert_eq!(completion_path(ContextId::new(5)), "/chats/5/completion");
    }
}
