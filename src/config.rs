use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatcher::{ActionBinding, FormDispatcher};
use crate::error::DispatchError;
use crate::outcome::Outcome;
use crate::types::BindingHandle;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatcherOptions {
    /// Record which submit control was clicked in each form.
    pub track_submitters: bool,
    pub submit_control_selector: String,
    /// `tracing` filter directive, e.g. `info` or `form_actions=debug`.
    pub log_filter: String,
}

// defaults
impl Default for DispatcherOptions {
    fn default() -> Self {
        DispatcherOptions {
            track_submitters: true,
            submit_control_selector: r#"form input[type="submit"]"#.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

/// Everything a page needs: options, named outcomes and the bindings using them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageConfig {
    pub options: DispatcherOptions,
    pub outcomes: BTreeMap<String, Outcome>,
    pub bindings: Vec<ActionBinding>,
}

impl PageConfig {
    pub fn from_json(text: &str) -> Result<PageConfig, DispatchError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Registers outcomes and bindings. Either every binding is registered or none.
    pub fn install(
        &self,
        dispatcher: &FormDispatcher,
    ) -> Result<Vec<BindingHandle>, DispatchError> {
        for (name, outcome) in &self.outcomes {
            dispatcher.register_outcome(name, Arc::new(outcome.clone()));
        }

        let mut handles = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            match dispatcher.register(binding.clone()) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    for handle in handles {
                        dispatcher.unregister(handle);
                    }
                    return Err(err);
                }
            }
        }

        if self.options.track_submitters {
            if let Err(err) = dispatcher.track_submitters() {
                for handle in handles {
                    dispatcher.unregister(handle);
                }
                return Err(err);
            }
        }
        info!(bindings = handles.len(), "page configuration installed");
        Ok(handles)
    }
}
