use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::frame::ComponentId;

/// Value reported by change/input events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseEventArgs {
    pub detail: i64,
    pub client_x: f64,
    pub client_y: f64,
    pub button: i64,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardEventArgs {
    pub key: String,
    pub code: String,
    pub repeat: bool,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
}

/// Arguments passed with a simulated DOM event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum EventArgs {
    #[default]
    Empty,
    Mouse(MouseEventArgs),
    Keyboard(KeyboardEventArgs),
    Change { value: FieldValue },
    Custom(serde_json::Value),
}

impl EventArgs {
    pub fn click() -> Self {
        EventArgs::Mouse(MouseEventArgs { detail: 1, ..Default::default() })
    }

    pub fn change(value: impl Into<FieldValue>) -> Self {
        EventArgs::Change { value: value.into() }
    }

    pub fn key(key: impl Into<String>) -> Self {
        EventArgs::Keyboard(KeyboardEventArgs { key: key.into(), ..Default::default() })
    }
}

/// Identifies the bound field a change event writes to, so the host can
/// update its frames without a full re-render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFieldInfo {
    pub component_id: ComponentId,
    pub field_value: FieldValue,
}

/// Completion signal for one dispatched event.
///
/// Synchronous handlers complete immediately. Handlers with asynchronous
/// continuations complete when the paired [`CompletionSender`] fires or is
/// dropped.
#[derive(Debug)]
pub struct EventCompletion {
    receiver: Option<oneshot::Receiver<()>>,
}

/// Sending half of a pending [`EventCompletion`].
#[derive(Debug)]
pub struct CompletionSender {
    sender: oneshot::Sender<()>,
}

impl EventCompletion {
    pub fn completed() -> Self {
        EventCompletion { receiver: None }
    }

    pub fn pending() -> (EventCompletion, CompletionSender) {
        let (sender, receiver) = oneshot::channel();
        (EventCompletion { receiver: Some(receiver) }, CompletionSender { sender })
    }

    /// Poll without blocking. A dropped sender counts as complete: failures
    /// travel through the exception channel instead.
    pub fn is_complete(&mut self) -> bool {
        match self.receiver.as_mut() {
            None => true,
            Some(rx) => match rx.try_recv() {
                Ok(Some(())) | Err(_) => {
                    self.receiver = None;
                    true
                }
                Ok(None) => false,
            },
        }
    }
}

impl CompletionSender {
    pub fn complete(self) {
        let _ = self.sender.send(());
    }
}
