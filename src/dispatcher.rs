use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_std::task;
use futures::future::{self, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::DispatcherOptions;
use crate::error::DispatchError;
use crate::marker::SubmitMarkers;
use crate::outcome::{OutcomeContext, OutcomeHandler, OutcomeRegistry};
use crate::request::{settle, RequestTemplate, Settled, FALLBACK_MESSAGE};
use crate::types::{
    BindingHandle, BoxedFuture, Detach, Dialogs, DispatchResult, Effect, Executor, FormInput,
    LocalFuture, Page, Transport, Trigger, TriggerEvent,
};
use crate::validate::{Validation, Validator, ValidatorRegistry};

fn default_on_error() -> String {
    "showMessage".to_string()
}

/// Declarative description of one interactive element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBinding {
    pub trigger: Trigger,
    #[serde(default)]
    pub validator_name: Option<String>,
    /// Prompt shown before the request; declining ends the dispatch.
    #[serde(default)]
    pub confirm: Option<String>,
    /// Absent for bindings that never touch the network.
    #[serde(default)]
    pub request_spec: Option<RequestTemplate>,
    pub on_success: String,
    #[serde(default = "default_on_error")]
    pub on_error: String,
    /// Send the form's last clicked submit control as `action`.
    #[serde(default)]
    pub track_submitter: bool,
    /// At most one request in flight for this binding.
    #[serde(default)]
    pub single_flight: bool,
}

impl ActionBinding {
    pub fn new(trigger: Trigger, on_success: &str) -> Self {
        ActionBinding {
            trigger,
            validator_name: None,
            confirm: None,
            request_spec: None,
            on_success: on_success.to_string(),
            on_error: default_on_error(),
            track_submitter: false,
            single_flight: false,
        }
    }

    pub fn validated_by(mut self, name: &str) -> Self {
        self.validator_name = Some(name.to_string());
        self
    }

    pub fn requesting(mut self, request: RequestTemplate) -> Self {
        self.request_spec = Some(request);
        self
    }

    pub fn confirming(mut self, prompt: &str) -> Self {
        self.confirm = Some(prompt.to_string());
        self
    }
}

struct Registered {
    binding: Arc<ActionBinding>,
    detach: Option<Detach>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a binding from the in-flight set when its request settles or is dropped.
struct InFlight {
    handle: BindingHandle,
    set: Arc<Mutex<HashSet<BindingHandle>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.handle);
    }
}

#[derive(Clone)]
pub struct FormDispatcher {
    executor: Arc<dyn Executor>,
    options: DispatcherOptions,
    transport: Arc<dyn Transport>,
    page: Arc<dyn Page>,
    dialogs: Arc<dyn Dialogs>,
    validators: Arc<Mutex<ValidatorRegistry>>,
    outcomes: Arc<Mutex<OutcomeRegistry>>,
    bindings: Arc<Mutex<HashMap<BindingHandle, Registered>>>,
    in_flight: Arc<Mutex<HashSet<BindingHandle>>>,
    markers: Arc<Mutex<SubmitMarkers>>,
    submitter_listener: Arc<Mutex<Option<Detach>>>,
    next_handle: Arc<Mutex<u64>>,
}

impl FormDispatcher {
    pub fn new(
        executor: Arc<dyn Executor>,
        transport: Arc<dyn Transport>,
        page: Arc<dyn Page>,
        dialogs: Arc<dyn Dialogs>,
        options: DispatcherOptions,
    ) -> FormDispatcher {
        FormDispatcher {
            executor,
            options,
            transport,
            page,
            dialogs,
            validators: Arc::new(Mutex::new(ValidatorRegistry::default())),
            outcomes: Arc::new(Mutex::new(OutcomeRegistry::default())),
            bindings: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            markers: Arc::new(Mutex::new(SubmitMarkers::default())),
            submitter_listener: Arc::new(Mutex::new(None)),
            next_handle: Arc::new(Mutex::new(0)),
        }
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    pub fn register_validator(&self, name: &str, validator: Validator) {
        lock(&self.validators).insert(name, validator);
    }

    pub fn register_outcome(&self, name: &str, handler: Arc<dyn OutcomeHandler>) {
        lock(&self.outcomes).insert(name, handler);
    }

    pub fn register(&self, binding: ActionBinding) -> Result<BindingHandle, DispatchError> {
        if let Some(name) = &binding.validator_name {
            if !lock(&self.validators).contains(name) {
                return Err(DispatchError::UnknownValidator(name.clone()));
            }
        }
        {
            let outcomes = lock(&self.outcomes);
            for name in [&binding.on_success, &binding.on_error] {
                if !outcomes.contains(name) {
                    return Err(DispatchError::UnknownOutcome(name.clone()));
                }
            }
        }

        let trigger = binding.trigger.clone();
        let handle = {
            let mut bindings = lock(&self.bindings);
            if bindings
                .values()
                .any(|registered| registered.binding.trigger == trigger)
            {
                return Err(DispatchError::DuplicateTrigger {
                    selector: trigger.selector,
                    event: trigger.event,
                });
            }
            let mut id_generator = lock(&self.next_handle);
            let handle = BindingHandle::from_id(*id_generator);
            *id_generator += 1;
            bindings.insert(
                handle,
                Registered {
                    binding: Arc::new(binding),
                    detach: None,
                },
            );
            handle
        };

        let this = self.clone();
        let attached = self.page.attach(
            &trigger,
            Box::new(move |event: &dyn TriggerEvent| this.handle_event(handle, event)),
        );
        match attached {
            Ok(detach) => {
                if let Some(registered) = lock(&self.bindings).get_mut(&handle) {
                    registered.detach = Some(detach);
                }
                info!(%handle, %trigger, "binding registered");
                Ok(handle)
            }
            Err(reason) => {
                lock(&self.bindings).remove(&handle);
                Err(DispatchError::Attach {
                    trigger: trigger.to_string(),
                    reason,
                })
            }
        }
    }

    /// Removes a binding and detaches its listener. Unknown handles are ignored.
    pub fn unregister(&self, handle: BindingHandle) {
        let removed = lock(&self.bindings).remove(&handle);
        if let Some(registered) = removed {
            if let Some(detach) = registered.detach {
                detach();
            }
            debug!(%handle, trigger = %registered.binding.trigger, "binding unregistered");
        }
    }

    pub fn binding(&self, handle: BindingHandle) -> Option<Arc<ActionBinding>> {
        lock(&self.bindings)
            .get(&handle)
            .map(|registered| Arc::clone(&registered.binding))
    }

    pub fn handle_for(&self, trigger: &Trigger) -> Option<BindingHandle> {
        lock(&self.bindings)
            .iter()
            .find(|(_, registered)| registered.binding.trigger == *trigger)
            .map(|(handle, _)| *handle)
    }

    /// Unregisters every binding and the submit-control listener.
    pub fn teardown(&self) {
        let handles: Vec<BindingHandle> = lock(&self.bindings).keys().copied().collect();
        for handle in handles {
            self.unregister(handle);
        }
        if let Some(detach) = lock(&self.submitter_listener).take() {
            detach();
        }
    }

    pub fn record_submitter(&self, form: &str, value: &str) {
        lock(&self.markers).record(form, value.to_string());
    }

    pub fn marked_submitter(&self, form: &str) -> Option<String> {
        lock(&self.markers).current(form).map(str::to_string)
    }

    /// Listens for clicks on submit controls and marks the clicked one in its form.
    /// The click itself is left alone so the form still submits.
    pub fn track_submitters(&self) -> Result<(), DispatchError> {
        let mut slot = lock(&self.submitter_listener);
        if slot.is_some() {
            return Ok(());
        }
        let trigger = Trigger::click(&self.options.submit_control_selector);
        let this = self.clone();
        let detach = self
            .page
            .attach(
                &trigger,
                Box::new(move |event: &dyn TriggerEvent| {
                    if let (Some(form), Some(value)) = (event.form(), event.value()) {
                        this.record_submitter(&form, &value);
                    }
                }),
            )
            .map_err(|reason| DispatchError::Attach {
                trigger: trigger.to_string(),
                reason,
            })?;
        *slot = Some(detach);
        Ok(())
    }

    /// Entry point for attached listeners: dispatch and run the rest on the executor.
    pub fn handle_event(&self, handle: BindingHandle, event: &dyn TriggerEvent) {
        match self.dispatch(handle, event) {
            Ok(pending) => self.executor.spawn(
                pending
                    .map(move |result| {
                        debug!(%handle, ?result, "dispatch finished");
                        Ok(())
                    })
                    .boxed_local(),
            ),
            Err(err) => warn!(%handle, %err, "event dropped"),
        }
    }

    /// Runs the validate, request, outcome pipeline for one event.
    ///
    /// The default action is suppressed and validation, confirmation and request
    /// resolution happen before this returns; only the network wait is deferred to
    /// the returned future.
    pub fn dispatch(
        &self,
        handle: BindingHandle,
        event: &dyn TriggerEvent,
    ) -> Result<LocalFuture<DispatchResult>, DispatchError> {
        event.prevent_default();

        let binding = self
            .binding(handle)
            .ok_or(DispatchError::UnknownBinding(handle))?;

        let input = FormInput {
            fields: event.fields(),
            data: event.data(),
            href: event.href(),
        };

        if let Some(name) = &binding.validator_name {
            let validator = lock(&self.validators)
                .get(name)
                .ok_or_else(|| DispatchError::UnknownValidator(name.clone()))?;
            if let Validation::Rejected(message) = validator(&input) {
                debug!(%handle, validator = %name, %message, "validation failed");
                self.dialogs.alert(&message);
                let result = DispatchResult::ValidationFailed { message };
                return Ok(future::ready(result).boxed_local());
            }
        }

        if let Some(prompt) = &binding.confirm {
            if !self.dialogs.confirm(prompt) {
                debug!(%handle, "dispatch declined");
                return Ok(future::ready(DispatchResult::Declined).boxed_local());
            }
        }

        let guard = if binding.single_flight {
            if !lock(&self.in_flight).insert(handle) {
                debug!(%handle, "request already in flight");
                return Ok(future::ready(DispatchResult::Busy).boxed_local());
            }
            Some(InFlight {
                handle,
                set: Arc::clone(&self.in_flight),
            })
        } else {
            None
        };

        let action = if binding.track_submitter {
            let form = event
                .form()
                .unwrap_or_else(|| binding.trigger.selector.clone());
            self.marked_submitter(&form)
        } else {
            None
        };

        let this = self.clone();
        let Some(template) = binding.request_spec.clone() else {
            drop(guard);
            let result = this.finish(&binding, &input, Settled::Success(Value::Null));
            return Ok(future::ready(result).boxed_local());
        };

        let request = match template.resolve(&input, action.as_deref()) {
            Ok(request) => request,
            Err(err) => {
                warn!(%handle, %err, "request could not be built");
                drop(guard);
                let settled = Settled::Failure(FALLBACK_MESSAGE.to_string());
                let result = this.finish(&binding, &input, settled);
                return Ok(future::ready(result).boxed_local());
            }
        };

        debug!(%handle, method = request.method.as_str(), url = %request.url, "sending request");
        let sent = self.transport.send(request);
        Ok(async move {
            let _guard = guard;
            let result = sent.await;
            if let Err(err) = &result {
                warn!(%handle, %err, "request failed");
            }
            let settled = settle(result, template.response);
            this.finish(&binding, &input, settled)
        }
        .boxed_local())
    }

    /// Runs exactly one of the binding's outcome handlers.
    fn finish(
        &self,
        binding: &ActionBinding,
        input: &FormInput,
        settled: Settled,
    ) -> DispatchResult {
        match settled {
            Settled::Success(reply) => {
                let ctx = OutcomeContext {
                    input,
                    reply: &reply,
                    message: None,
                };
                let effect = self.run_outcome(&binding.on_success, &ctx);
                DispatchResult::Succeeded { effect }
            }
            Settled::Failure(message) => {
                let ctx = OutcomeContext {
                    input,
                    reply: &Value::Null,
                    message: Some(&message),
                };
                let effect = self.run_outcome(&binding.on_error, &ctx);
                DispatchResult::Failed { message, effect }
            }
        }
    }

    fn run_outcome(&self, name: &str, ctx: &OutcomeContext<'_>) -> Effect {
        let handler = lock(&self.outcomes).get(name);
        match handler {
            Some(handler) => handler.run(ctx, self.page.as_ref(), self.dialogs.as_ref()),
            None => Effect::Skipped {
                reason: format!("unknown outcome handler `{name}`"),
            },
        }
    }
}

pub struct SingleThreadedAsyncStdExecutor;

impl Executor for SingleThreadedAsyncStdExecutor {
    fn spawn(&self, fut: BoxedFuture<()>) {
        task::spawn_local(fut.map(|_| ()));
    }
}
