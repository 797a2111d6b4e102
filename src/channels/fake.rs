//! In-memory Messages host for invoker and dispatcher tests.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::applescript::{ChatThread, HostError, MessagesHost};
use crate::channels::Channel;

/// In-memory Messages.app: records every call it receives.
#[derive(Default)]
pub struct FakeHost {
    pub services: HashSet<&'static str>,
    pub participants: Vec<(Channel, String)>,
    pub chats: Vec<ChatThread>,
    pub fail_create: Option<String>,
    pub fail_participant_send: Option<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn with_services(services: &[Channel]) -> Self {
        Self {
            services: services.iter().map(|s| s.label()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl MessagesHost for FakeHost {
    fn has_service(&self, service: Channel) -> Result<bool, HostError> {
        self.record(format!("has_service {}", service.label()));
        Ok(self.services.contains(service.label()))
    }

    fn resolve_participant(&self, service: Channel, handle: &str) -> Result<Option<String>, HostError> {
        self.record(format!("resolve {} {}", service.label(), handle));
        Ok(self
            .participants
            .iter()
            .find(|(s, h)| *s == service && h == handle)
            .map(|(_, h)| h.clone()))
    }

    fn send_to_participant(&self, service: Channel, handle: &str, _text: &str) -> Result<(), HostError> {
        self.record(format!("send_participant {} {}", service.label(), handle));
        match &self.fail_participant_send {
            Some(e) => Err(HostError::Script(e.clone())),
            None => Ok(()),
        }
    }

    fn list_chats(&self, service: Channel) -> Result<Vec<ChatThread>, HostError> {
        self.record(format!("list_chats {}", service.label()));
        Ok(self
            .chats
            .iter()
            .filter(|c| c.service == service)
            .cloned()
            .collect())
    }

    fn create_chat(&self, service: Channel, handle: &str) -> Result<String, HostError> {
        self.record(format!("create_chat {} {}", service.label(), handle));
        match &self.fail_create {
            Some(e) => Err(HostError::Script(e.clone())),
            None => Ok(format!("{};-;{}", service.service_type(), handle)),
        }
    }

    fn send_to_chat(&self, chat_id: &str, _text: &str) -> Result<(), HostError> {
        self.record(format!("send_chat {}", chat_id));
        Ok(())
    }
}

pub fn thread(id: &str, service: Channel, handles: &[&str]) -> ChatThread {
    ChatThread {
        id: id.to_string(),
        service,
        participants: handles.iter().map(|h| h.to_string()).collect(),
    }
}
