//! Inquiries, replies and the inbox.

use tracing::{info, warn};

use pulse_core::{
    require, Error, Identity, InquiryForm, Message, MessageId, NewMessage, Result,
};

use crate::Service;

const NOT_FOUND: &str = "Message not found";

impl Service {
    pub async fn send_message(
        &self,
        identity: Option<&Identity>,
        form: InquiryForm,
    ) -> Result<Message> {
        let identity = require(identity, "You must be logged in to send a message")?;
        let new = form.validate(&identity.user_id)?;
        self.existing_property(&new.property).await?;
        let message = self.store.insert_message(&new).await?;
        info!(id = %message.id, recipient = %message.recipient, "Message sent");
        Ok(message)
    }

    /// Unread first, then newest first.
    pub async fn inbox(&self, identity: Option<&Identity>) -> Result<Vec<Message>> {
        let identity = require(identity, "User ID is required")?;
        self.store.inbox(&identity.user_id).await
    }

    pub async fn unread_count(&self, identity: Option<&Identity>) -> Result<u64> {
        let identity = require(identity, "User ID is required")?;
        self.store.unread_count(&identity.user_id).await
    }

    /// Recipient-only. Returns the new `read` flag.
    pub async fn toggle_read(&self, identity: Option<&Identity>, id: &str) -> Result<bool> {
        let identity = require(identity, "User ID is required")?;
        let id = MessageId::parse(id)?;
        self.received_message(identity, &id).await?;
        self.store
            .toggle_read(&id)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))
    }

    pub async fn delete_message(&self, identity: Option<&Identity>, id: &str) -> Result<()> {
        let identity = require(identity, "User ID is required")?;
        let id = MessageId::parse(id)?;
        self.received_message(identity, &id).await?;
        if !self.store.delete_message(&id).await? {
            return Err(Error::not_found(NOT_FOUND));
        }
        info!(%id, "Message deleted");
        Ok(())
    }

    /// Store a reply to `original_id`, then flag the original as replied
    /// and read. The two writes are separate; a crash between them leaves
    /// the reply saved and the original unflagged.
    pub async fn reply(
        &self,
        identity: Option<&Identity>,
        original_id: &str,
        body: String,
    ) -> Result<Message> {
        let identity = require(identity, "User ID is required")?;
        if original_id.trim().is_empty() {
            return Err(Error::invalid("Original message ID is required"));
        }
        let original_id = MessageId::parse(original_id)?;
        let original = self
            .store
            .find_message(&original_id)
            .await?
            .ok_or_else(|| Error::not_found("Original message not found"))?;

        let new = match NewMessage::reply(identity, &original, body) {
            Ok(new) => new,
            Err(err) => {
                warn!(user = %identity.user_id, original = %original_id, %err, "Reply rejected");
                return Err(err);
            }
        };

        let reply = self.store.insert_message(&new).await?;
        if !self.store.mark_replied(&original_id).await? {
            warn!(original = %original_id, "Original message vanished before it could be flagged");
        }
        info!(id = %reply.id, original = %original_id, "Reply sent");
        Ok(reply)
    }

    async fn received_message(&self, identity: &Identity, id: &MessageId) -> Result<Message> {
        let message = self
            .store
            .find_message(id)
            .await?
            .ok_or_else(|| Error::not_found(NOT_FOUND))?;
        if !identity.is(&message.recipient) {
            return Err(Error::Unauthorized("Unauthorized".into()));
        }
        Ok(message)
    }
}
