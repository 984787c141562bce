use std::collections::HashMap;

/// Which submit control of a form was clicked last.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmitMark {
    #[default]
    Unmarked,
    Marked(String),
}

impl SubmitMark {
    /// Marking replaces any previous mark; a form never has two.
    pub fn mark(&mut self, value: String) {
        *self = SubmitMark::Marked(value);
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            SubmitMark::Unmarked => None,
            SubmitMark::Marked(value) => Some(value),
        }
    }
}

/// Submit marks, one per form.
#[derive(Debug, Default)]
pub struct SubmitMarkers {
    forms: HashMap<String, SubmitMark>,
}

impl SubmitMarkers {
    pub fn record(&mut self, form: &str, value: String) {
        self.forms.entry(form.to_string()).or_default().mark(value);
    }

    pub fn current(&self, form: &str) -> Option<&str> {
        self.forms.get(form).and_then(SubmitMark::value)
    }
}
