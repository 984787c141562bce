//! Declarative form-action dispatcher.
//!
//! Interactive elements are described as [`ActionBinding`]s: a trigger, an
//! optional named validator, an optional request template and named outcome
//! handlers. The [`FormDispatcher`] attaches a listener per binding and runs
//! validate, request, outcome once per event. Browser glue lives in `wasm`.

pub mod blog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod marker;
pub mod outcome;
pub mod request;
pub mod types;
pub mod validate;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

#[cfg(test)]
mod testing;

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

pub use config::{DispatcherOptions, PageConfig};
pub use dispatcher::{ActionBinding, FormDispatcher};
pub use error::DispatchError;
pub use outcome::{Outcome, OutcomeHandler};
pub use request::{RequestTemplate, FALLBACK_MESSAGE};
pub use types::{BindingHandle, DispatchResult, Effect, Trigger};
pub use validate::Validation;
