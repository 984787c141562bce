use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub type BoxedFuture<T, E = String> = Pin<Box<dyn Future<Output = Result<T, E>>>>;

pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Called by the host each time a bound element fires.
pub type Listener = Box<dyn Fn(&dyn TriggerEvent)>;

/// Removes a listener previously attached through [`Page::attach`].
pub type Detach = Box<dyn FnOnce()>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Checked(bool),
    Text(String),
}

impl FieldValue {
    pub fn text(&self) -> &str {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Checked(_) => "",
        }
    }

    pub fn is_checked(&self) -> bool {
        matches!(self, FieldValue::Checked(true))
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(checked: bool) -> Self {
        FieldValue::Checked(checked)
    }
}

pub type Fields = HashMap<String, FieldValue>;

/// Everything serialized from the triggering element at dispatch time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormInput {
    pub fields: Fields,
    /// `data-*` attributes, keyed without the `data-` prefix.
    pub data: HashMap<String, String>,
    pub href: Option<String>,
}

impl FormInput {
    /// Text of a field; empty when the field is absent or a checkbox.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(FieldValue::text).unwrap_or("")
    }

    pub fn checked(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FieldValue::is_checked)
    }

    /// Resolves a placeholder name, data attributes first.
    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.data.get(key) {
            return Some(value.clone());
        }
        match self.fields.get(key) {
            Some(FieldValue::Text(text)) => Some(text.clone()),
            Some(FieldValue::Checked(checked)) => Some(checked.to_string()),
            None => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Submit,
    Click,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Submit => "submit",
            EventKind::Click => "click",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    pub selector: String,
    pub event: EventKind,
}

impl Trigger {
    pub fn submit(selector: &str) -> Self {
        Trigger {
            selector: selector.to_string(),
            event: EventKind::Submit,
        }
    }

    pub fn click(selector: &str) -> Self {
        Trigger {
            selector: selector.to_string(),
            event: EventKind::Click,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.event.as_str(), self.selector)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingHandle(u64);

impl BindingHandle {
    pub fn from_id(id: u64) -> Self {
        BindingHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// One fully resolved network call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Vec<(String, String)>,
}

impl ResolvedRequest {
    pub const FORM_CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    /// `application/x-www-form-urlencoded` rendering of the body pairs.
    pub fn encoded_body(&self) -> String {
        self.body
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn body_value(&self, name: &str) -> Option<&str> {
        self.body
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Terminal UI effect performed by an outcome handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Effect {
    Navigate { url: String },
    PatchText {
        selector: String,
        text: String,
        applied: bool,
    },
    Reload,
    OpenInNewTab { url: String },
    Message { text: String },
    ToggleClass {
        selector: String,
        class: String,
        applied: bool,
    },
    Skipped { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum DispatchResult {
    ValidationFailed { message: String },
    Declined,
    Busy,
    Succeeded { effect: Effect },
    Failed { message: String, effect: Effect },
}

/// Issues one network call per request. Errors are network-level failures.
pub trait Transport {
    fn send(&self, request: ResolvedRequest) -> BoxedFuture<HttpResponse, String>;
}

/// The raw event as seen by a listener.
pub trait TriggerEvent {
    fn prevent_default(&self);
    /// Named inputs of the form the trigger belongs to.
    fn fields(&self) -> Fields;
    fn data(&self) -> HashMap<String, String>;
    fn href(&self) -> Option<String>;
    /// Identifier of the enclosing form, if any.
    fn form(&self) -> Option<String>;
    /// Value of the trigger element itself (submit controls).
    fn value(&self) -> Option<String>;
}

/// The page the dispatcher binds to. Element-targeted effects return whether the
/// element still exists.
pub trait Page {
    fn attach(&self, trigger: &Trigger, listener: Listener) -> Result<Detach, String>;
    fn navigate(&self, url: &str);
    fn reload(&self);
    fn open_in_new_tab(&self, url: &str);
    fn set_text(&self, selector: &str, text: &str) -> bool;
    fn toggle_class(&self, selector: &str, class: &str) -> bool;
}

/// Error surface and confirmation prompts.
pub trait Dialogs {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
}

pub trait Executor {
    fn spawn(&self, fut: BoxedFuture<()>);
}
