//! AppleScript execution against Messages.app.
//!
//! [`MessagesHost`] is the set of primitive automation calls the channel
//! invokers are built from. [`OsascriptHost`] implements it by running one
//! small script per call through `osascript`.
//!
//! CHANGELOG:
//! - 10/19/2026 - Split sending into host primitives (service, participant, chat)
//! - 10/19/2026 - Added script-file runner for operator-supplied senders
//! - 01/10/2026 - Initial implementation

use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::channels::Channel;
use crate::contacts::phone;

/// Errors from a single automation call.
#[derive(Debug, Error)]
pub enum HostError {
    /// osascript could not be started at all.
    #[error("failed to run osascript: {0}")]
    Spawn(#[from] std::io::Error),

    /// The script ran and raised an AppleScript error.
    #[error("AppleScript failed: {0}")]
    Script(String),
}

/// An existing conversation in Messages.app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatThread {
    pub id: String,
    pub service: Channel,
    pub participants: Vec<String>,
}

impl ChatThread {
    /// Whether `recipient` is one of this chat's participants.
    pub fn includes(&self, recipient: &str) -> bool {
        self.participants
            .iter()
            .any(|p| phone::same_recipient(p, recipient))
    }

    /// A 1:1 conversation with exactly `recipient`.
    pub fn is_direct_with(&self, recipient: &str) -> bool {
        self.participants.len() == 1 && self.includes(recipient)
    }
}

/// Pick the `service` thread to send `recipient` a personal message in.
///
/// A 1:1 thread always wins over a group that happens to include them; a
/// group is only used when no direct thread exists.
pub fn find_thread<'a>(
    chats: &'a [ChatThread],
    service: Channel,
    recipient: &str,
) -> Option<&'a ChatThread> {
    let on_service = move || chats.iter().filter(move |c| c.service == service);
    on_service()
        .find(|c| c.is_direct_with(recipient))
        .or_else(|| on_service().find(|c| c.includes(recipient)))
}

/// Primitive automation calls against the Messages host.
///
/// Calls are made one at a time; Messages.app is not safe for concurrent
/// automation.
pub trait MessagesHost {
    /// Whether an enabled account for `service` exists.
    fn has_service(&self, service: Channel) -> Result<bool, HostError>;

    /// Resolve a participant handle on `service`. `Ok(None)` when Messages
    /// does not know the handle on that service.
    fn resolve_participant(&self, service: Channel, handle: &str) -> Result<Option<String>, HostError>;

    fn send_to_participant(&self, service: Channel, handle: &str, text: &str) -> Result<(), HostError>;

    /// Conversations whose account is on `service`.
    fn list_chats(&self, service: Channel) -> Result<Vec<ChatThread>, HostError>;

    /// Start a new conversation with `handle` on `service`, returning its id.
    fn create_chat(&self, service: Channel, handle: &str) -> Result<String, HostError>;

    fn send_to_chat(&self, chat_id: &str, text: &str) -> Result<(), HostError>;
}

impl<H: MessagesHost + ?Sized> MessagesHost for &H {
    fn has_service(&self, service: Channel) -> Result<bool, HostError> {
        (**self).has_service(service)
    }

    fn resolve_participant(&self, service: Channel, handle: &str) -> Result<Option<String>, HostError> {
        (**self).resolve_participant(service, handle)
    }

    fn send_to_participant(&self, service: Channel, handle: &str, text: &str) -> Result<(), HostError> {
        (**self).send_to_participant(service, handle, text)
    }

    fn list_chats(&self, service: Channel) -> Result<Vec<ChatThread>, HostError> {
        (**self).list_chats(service)
    }

    fn create_chat(&self, service: Channel, handle: &str) -> Result<String, HostError> {
        (**self).create_chat(service, handle)
    }

    fn send_to_chat(&self, chat_id: &str, text: &str) -> Result<(), HostError> {
        (**self).send_to_chat(chat_id, text)
    }
}

/// Escape a string for safe inclusion in AppleScript.
///
/// CRITICAL: Order matters!
/// 1. Escape backslashes FIRST
/// 2. Then escape quotes
///
/// This prevents injection attacks where user data breaks the string context.
pub fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', "\\\\") // Backslashes FIRST
        .replace('"', "\\\"") // Then quotes
}

/// Run an inline script and return its trimmed stdout.
fn run_osascript(script: &str) -> Result<String, HostError> {
    let output = Command::new("osascript").arg("-e").arg(script).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(HostError::Script(stderr.trim().to_string()))
    }
}

/// Messages.app driven through `osascript -e`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsascriptHost;

impl MessagesHost for OsascriptHost {
    fn has_service(&self, service: Channel) -> Result<bool, HostError> {
        let script = format!(
            r#"
tell application "Messages"
    set matches to (every account whose service type = {})
    if (count of matches) is 0 then return "NO"
    if enabled of (item 1 of matches) then return "YES"
    return "NO"
end tell
"#,
            service.service_type()
        );
        Ok(run_osascript(&script)? == "YES")
    }

    fn resolve_participant(&self, service: Channel, handle: &str) -> Result<Option<String>, HostError> {
        let script = format!(
            r#"
tell application "Messages"
    set targetService to 1st account whose service type = {}
    try
        set targetBuddy to participant "{}" of targetService
        return handle of targetBuddy
    on error
        return ""
    end try
end tell
"#,
            service.service_type(),
            escape_applescript_string(handle)
        );

        let resolved = run_osascript(&script)?;
        debug!(%service, handle, resolved = %resolved, "resolved participant");
        Ok(if resolved.is_empty() { None } else { Some(resolved) })
    }

    fn send_to_participant(&self, service: Channel, handle: &str, text: &str) -> Result<(), HostError> {
        let script = format!(
            r#"
tell application "Messages"
    set targetService to 1st account whose service type = {}
    set targetBuddy to participant "{}" of targetService
    send "{}" to targetBuddy
end tell
"#,
            service.service_type(),
            escape_applescript_string(handle),
            escape_applescript_string(text)
        );
        run_osascript(&script).map(|_| ())
    }

    fn list_chats(&self, service: Channel) -> Result<Vec<ChatThread>, HostError> {
        // One line per chat: <id>\t<handle>,<handle>,...
        let script = format!(
            r#"
tell application "Messages"
    set output to ""
    repeat with c in (every chat)
        try
            if service type of (account of c) is {} then
                set handleList to {{}}
                repeat with p in (participants of c)
                    set end of handleList to (handle of p)
                end repeat
                set AppleScript's text item delimiters to ","
                set output to output & (id of c) & tab & (handleList as text) & linefeed
                set AppleScript's text item delimiters to ""
            end if
        end try
    end repeat
    return output
end tell
"#,
            service.service_type()
        );
        Ok(parse_chat_listing(service, &run_osascript(&script)?))
    }

    fn create_chat(&self, service: Channel, handle: &str) -> Result<String, HostError> {
        let script = format!(
            r#"
tell application "Messages"
    set targetService to 1st account whose service type = {}
    set targetBuddy to participant "{}" of targetService
    set newChat to make new text chat with properties {{participants:{{targetBuddy}}}}
    return id of newChat
end tell
"#,
            service.service_type(),
            escape_applescript_string(handle)
        );
        let id = run_osascript(&script)?;
        if id.is_empty() {
            return Err(HostError::Script("new chat has no id".to_string()));
        }
        Ok(id)
    }

    fn send_to_chat(&self, chat_id: &str, text: &str) -> Result<(), HostError> {
        let script = format!(
            r#"
tell application "Messages"
    send "{}" to chat id "{}"
end tell
"#,
            escape_applescript_string(text),
            escape_applescript_string(chat_id)
        );
        run_osascript(&script).map(|_| ())
    }
}

/// Parse the tab/comma listing printed by the chat enumeration script.
pub fn parse_chat_listing(service: Channel, listing: &str) -> Vec<ChatThread> {
    listing
        .lines()
        .filter_map(|line| {
            let (id, handles) = line.split_once('\t')?;
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some(ChatThread {
                id: id.to_string(),
                service,
                participants: handles
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Captured result of running a script file.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run `osascript <script> <args...>`.
pub fn run_script_file(script: &Path, args: &[&str]) -> Result<ScriptOutput, HostError> {
    let output = Command::new("osascript").arg(script).args(args).output()?;

    Ok(ScriptOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
