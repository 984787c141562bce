//! Named outcome handlers: the terminal UI effect of a dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::request::{fill_template, FALLBACK_MESSAGE};
use crate::types::{Dialogs, Effect, FormInput, Page};

/// What an outcome handler gets to look at.
pub struct OutcomeContext<'a> {
    pub input: &'a FormInput,
    /// Parsed reply body; `Null` for failures and client-side-only bindings.
    pub reply: &'a Value,
    /// Failure message, set only when running an error handler.
    pub message: Option<&'a str>,
}

impl OutcomeContext<'_> {
    /// Reply fields first, then trimmed input values.
    fn lookup(&self, key: &str) -> Option<String> {
        match self.reply.get(key) {
            Some(value) => Some(value_text(value)),
            None => self.input.lookup(key).map(|value| value.trim().to_string()),
        }
    }
}

pub trait OutcomeHandler {
    fn run(&self, ctx: &OutcomeContext<'_>, page: &dyn Page, dialogs: &dyn Dialogs) -> Effect;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outcome {
    /// `path` may hold `{placeholders}` filled from the reply, then the input.
    RedirectTo { path: String },
    PatchText { selector: String, field: String },
    ReloadPage,
    OpenInNewTab,
    ShowMessage {
        #[serde(default)]
        text: Option<String>,
    },
    ToggleClass { selector: String, class: String },
}

impl OutcomeHandler for Outcome {
    fn run(&self, ctx: &OutcomeContext<'_>, page: &dyn Page, dialogs: &dyn Dialogs) -> Effect {
        match self {
            Outcome::RedirectTo { path } => match fill_template(path, |key| ctx.lookup(key)) {
                Ok(url) => {
                    page.navigate(&url);
                    Effect::Navigate { url }
                }
                Err(err) => {
                    warn!(%path, %err, "redirect target could not be resolved");
                    Effect::Skipped {
                        reason: err.to_string(),
                    }
                }
            },
            Outcome::PatchText { selector, field } => {
                let Some(value) = ctx.reply.get(field) else {
                    warn!(%selector, %field, "reply has no field to patch with");
                    return Effect::Skipped {
                        reason: format!("reply has no `{field}`"),
                    };
                };
                let text = value_text(value);
                let applied = page.set_text(selector, &text);
                Effect::PatchText {
                    selector: selector.clone(),
                    text,
                    applied,
                }
            }
            Outcome::ReloadPage => {
                page.reload();
                Effect::Reload
            }
            Outcome::OpenInNewTab => match &ctx.input.href {
                Some(url) => {
                    page.open_in_new_tab(url);
                    Effect::OpenInNewTab { url: url.clone() }
                }
                None => Effect::Skipped {
                    reason: "trigger has no href".to_string(),
                },
            },
            Outcome::ShowMessage { text } => {
                let text = text
                    .as_deref()
                    .or(ctx.message)
                    .unwrap_or(FALLBACK_MESSAGE)
                    .to_string();
                dialogs.alert(&text);
                Effect::Message { text }
            }
            Outcome::ToggleClass { selector, class } => {
                let applied = page.toggle_class(selector, class);
                Effect::ToggleClass {
                    selector: selector.clone(),
                    class: class.clone(),
                    applied,
                }
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct OutcomeRegistry {
    handlers: HashMap<String, Arc<dyn OutcomeHandler>>,
}

impl OutcomeRegistry {
    pub fn empty() -> Self {
        OutcomeRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, handler: Arc<dyn OutcomeHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OutcomeHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for OutcomeRegistry {
    fn default() -> Self {
        let mut registry = OutcomeRegistry::empty();
        registry.insert("reloadPage", Arc::new(Outcome::ReloadPage));
        registry.insert("openInNewTab", Arc::new(Outcome::OpenInNewTab));
        registry.insert("showMessage", Arc::new(Outcome::ShowMessage { text: None }));
        registry
    }
}
