//! SMS delivery through Text Message Forwarding.
//!
//! Paths, first success wins:
//! 1. existing SMS chat with the recipient
//! 2. new SMS chat
//! 3. direct SMS participant
//!
//! CHANGELOG:
//! - 10/19/2026 - Prefer a 1:1 chat over a group that includes the recipient
//! - 10/19/2026 - Initial implementation

use tracing::{debug, warn};

use super::{Channel, ChannelInvoker, DeliveryError, DeliveryOutcome, SendStatus};
use crate::applescript::{find_thread, HostError, MessagesHost};

/// Delivers over SMS. Requires an enabled SMS account bridged by an iPhone.
pub struct SmsInvoker<H> {
    host: H,
}

impl<H: MessagesHost> SmsInvoker<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    fn send_existing(&self, recipient: &str, text: &str) -> Result<bool, HostError> {
        let chats = self.host.list_chats(Channel::Sms)?;
        let Some(chat) = find_thread(&chats, Channel::Sms, recipient) else {
            return Ok(false);
        };

        match self.host.send_to_chat(&chat.id, text) {
            Ok(()) => Ok(true),
            Err(HostError::Script(e)) => {
                warn!(chat = %chat.id, error = %e, "send into existing SMS chat failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn send_new_chat(&self, recipient: &str, text: &str) -> Result<(), HostError> {
        let chat_id = self.host.create_chat(Channel::Sms, recipient)?;
        debug!(chat = %chat_id, "created SMS chat");
        self.host.send_to_chat(&chat_id, text)
    }

    fn send_participant(&self, recipient: &str, text: &str) -> Result<(), HostError> {
        let handle = self
            .host
            .resolve_participant(Channel::Sms, recipient)?
            .ok_or_else(|| HostError::Script(format!("no SMS participant for {}", recipient)))?;
        self.host.send_to_participant(Channel::Sms, &handle, text)
    }

    fn try_deliver(&self, recipient: &str, text: &str) -> Result<DeliveryOutcome, HostError> {
        if !self.host.has_service(Channel::Sms)? {
            return Ok(DeliveryOutcome::Failed(DeliveryError::ServiceUnavailable(
                Channel::Sms,
            )));
        }

        // Listing chats is best effort; a failure here still leaves two paths.
        match self.send_existing(recipient, text) {
            Ok(true) => return Ok(DeliveryOutcome::Delivered(SendStatus::SmsExisting)),
            Ok(false) => {}
            Err(HostError::Script(e)) => warn!(error = %e, "listing SMS chats failed"),
            Err(e) => return Err(e),
        }

        let chat_err = match self.send_new_chat(recipient, text) {
            Ok(()) => return Ok(DeliveryOutcome::Delivered(SendStatus::SmsChat)),
            Err(HostError::Script(e)) => e,
            Err(e) => return Err(e),
        };

        let buddy_err = match self.send_participant(recipient, text) {
            Ok(()) => return Ok(DeliveryOutcome::Delivered(SendStatus::SmsBuddy)),
            Err(HostError::Script(e)) => e,
            Err(e) => return Err(e),
        };

        Ok(DeliveryOutcome::Failed(DeliveryError::SendFailed {
            detail: format!("chat: {} | buddy: {}", chat_err, buddy_err),
        }))
    }
}

impl<H: MessagesHost> ChannelInvoker for SmsInvoker<H> {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn deliver(&self, recipient: &str, text: &str) -> DeliveryOutcome {
        self.try_deliver(recipient, text).unwrap_or_else(|e| {
            DeliveryOutcome::Failed(DeliveryError::SendFailed {
                detail: e.to_string(),
            })
        })
    }
}
