use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;
use crate::types::{FieldValue, FormInput, HttpMethod, HttpResponse, ResolvedRequest};

/// Shown whenever a failed request carries no `{ "message": ... }` body.
pub const FALLBACK_MESSAGE: &str = "An error occurred. Please try again later.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
    #[default]
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTemplate {
    #[serde(default)]
    pub method: HttpMethod,
    pub url_template: String,
    #[serde(default)]
    pub body_fields: Vec<String>,
    #[serde(default)]
    pub trim: bool,
    #[serde(default)]
    pub response: ResponseFormat,
}

impl RequestTemplate {
    pub fn post(url_template: &str, body_fields: &[&str]) -> Self {
        RequestTemplate {
            method: HttpMethod::Post,
            url_template: url_template.to_string(),
            body_fields: body_fields.iter().map(|name| name.to_string()).collect(),
            trim: false,
            response: ResponseFormat::Text,
        }
    }

    /// Builds the request for one dispatch. `action` is the marked submit control.
    pub fn resolve(
        &self,
        input: &FormInput,
        action: Option<&str>,
    ) -> Result<ResolvedRequest, DispatchError> {
        let mut url = fill_template(&self.url_template, |key| input.lookup(key))?;

        let mut body = Vec::with_capacity(self.body_fields.len() + 1);
        for name in &self.body_fields {
            let value = match input.fields.get(name) {
                Some(FieldValue::Text(text)) if self.trim => text.trim().to_string(),
                Some(FieldValue::Text(text)) => text.clone(),
                Some(FieldValue::Checked(true)) => "on".to_string(),
                Some(FieldValue::Checked(false)) | None => continue,
            };
            body.push((name.clone(), value));
        }
        if let Some(action) = action {
            body.retain(|(name, _)| name != "action");
            body.push(("action".to_string(), action.to_string()));
        }

        if self.method == HttpMethod::Get && !body.is_empty() {
            let query = ResolvedRequest {
                method: self.method,
                url: String::new(),
                body,
            }
            .encoded_body();
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
            body = Vec::new();
        }

        Ok(ResolvedRequest {
            method: self.method,
            url,
            body,
        })
    }
}

/// Replaces `{name}` with the percent-encoded value and `{*name}` with the raw value.
/// An unterminated `{` is kept literally.
pub fn fill_template(
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, DispatchError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = &rest[open + 1..close];
        let (raw, name) = match key.strip_prefix('*') {
            Some(name) => (true, name),
            None => (false, key),
        };
        let value =
            lookup(name).ok_or_else(|| DispatchError::MissingPlaceholder(name.to_string()))?;
        if raw {
            out.push_str(&value);
        } else {
            out.push_str(&urlencoding::encode(&value));
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// How a request ended, from the outcome handlers' point of view.
#[derive(Clone, Debug, PartialEq)]
pub enum Settled {
    Success(Value),
    Failure(String),
}

pub fn settle(result: Result<HttpResponse, String>, format: ResponseFormat) -> Settled {
    let response = match result {
        Ok(response) => response,
        Err(_) => return Settled::Failure(FALLBACK_MESSAGE.to_string()),
    };
    if !response.is_success() {
        let message = error_message(&response.body);
        return Settled::Failure(message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()));
    }
    let body = serde_json::from_slice::<Value>(&response.body);
    match format {
        ResponseFormat::Json => match body {
            Ok(value) => Settled::Success(value),
            Err(_) => Settled::Failure(FALLBACK_MESSAGE.to_string()),
        },
        ResponseFormat::Text => Settled::Success(body.unwrap_or(Value::Null)),
    }
}

/// Extracts `message` from a JSON error body.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}
