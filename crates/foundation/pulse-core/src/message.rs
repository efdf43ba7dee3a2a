//! Owner-to-renter messages and their replies.
//!
//! A reply is a message row of its own with `isReply = true` and `replyTo`
//! pointing at the original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{non_blank, Error, Identity, MessageId, PropertyId, Result, UserId};

const FALLBACK_NAME: &str = "Property Owner";
const FALLBACK_EMAIL: &str = "No email provided";
const FALLBACK_PHONE: &str = "No phone provided";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: MessageId,
    pub sender: UserId,
    pub recipient: UserId,
    pub property: PropertyId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub has_reply: bool,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated message ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender: UserId,
    pub recipient: UserId,
    pub property: PropertyId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub body: String,
    pub is_reply: bool,
    pub reply_to: Option<MessageId>,
}

impl NewMessage {
    /// Build the reply row for `original`, sent by `replier`.
    ///
    /// The contact snapshot comes from the replier's session.
    pub fn reply(replier: &Identity, original: &Message, body: String) -> Result<Self> {
        if replier.is(&original.sender) {
            return Err(Error::invalid("You cannot reply to yourself"));
        }
        let body = non_blank(Some(body)).ok_or_else(|| Error::invalid("Reply body is required"))?;
        Ok(Self {
            sender: replier.user_id.clone(),
            recipient: original.sender.clone(),
            property: original.property.clone(),
            name: non_blank(replier.name.clone()).unwrap_or_else(|| FALLBACK_NAME.into()),
            email: non_blank(replier.email.clone()).unwrap_or_else(|| FALLBACK_EMAIL.into()),
            phone: Some(non_blank(replier.phone.clone()).unwrap_or_else(|| FALLBACK_PHONE.into())),
            body,
            is_reply: true,
            reply_to: Some(original.id.clone()),
        })
    }
}

/// Contact form posted from a property page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryForm {
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl InquiryForm {
    pub fn validate(self, sender: &UserId) -> Result<NewMessage> {
        let recipient = non_blank(self.recipient)
            .ok_or_else(|| Error::invalid("Recipient is required"))
            .and_then(|r| UserId::parse(&r))?;
        let property = non_blank(self.property)
            .ok_or_else(|| Error::invalid("Property is required"))
            .and_then(|p| PropertyId::parse(&p))?;

        if &recipient == sender {
            return Err(Error::invalid("You can not send a message to yourself"));
        }

        let name = non_blank(self.name).ok_or_else(|| Error::invalid("Name is required"))?;
        let email = non_blank(self.email).ok_or_else(|| Error::invalid("Email is required"))?;
        if !email.contains('@') {
            return Err(Error::invalid("Email is not valid"));
        }
        let body = non_blank(self.body).ok_or_else(|| Error::invalid("Message is required"))?;

        Ok(NewMessage {
            sender: sender.clone(),
            recipient,
            property,
            name,
            email,
            phone: non_blank(self.phone),
            body,
            is_reply: false,
            reply_to: None,
        })
    }
}
