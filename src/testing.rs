//! In-memory hosts for exercising the dispatcher without a browser.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::FutureExt;

use crate::config::DispatcherOptions;
use crate::dispatcher::FormDispatcher;
use crate::types::{
    BoxedFuture, Detach, Dialogs, Executor, FieldValue, Fields, HttpResponse, Listener, Page,
    ResolvedRequest, Transport, Trigger, TriggerEvent,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageCall {
    Navigate(String),
    Reload,
    OpenInNewTab(String),
    SetText(String, String),
    ToggleClass(String, String),
}

type SharedListener = Rc<dyn Fn(&dyn TriggerEvent)>;

#[derive(Default)]
pub struct FakePage {
    calls: RefCell<Vec<PageCall>>,
    elements: RefCell<HashSet<String>>,
    listeners: Rc<RefCell<Vec<(u64, Trigger, SharedListener)>>>,
    next_listener: Cell<u64>,
}

impl FakePage {
    pub fn with_elements(selectors: &[&str]) -> Self {
        let page = FakePage::default();
        page.elements
            .borrow_mut()
            .extend(selectors.iter().map(|s| s.to_string()));
        page
    }

    pub fn remove_element(&self, selector: &str) {
        self.elements.borrow_mut().remove(selector);
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.calls.borrow().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Delivers `event` to every listener attached for `trigger`.
    pub fn fire(&self, trigger: &Trigger, event: &dyn TriggerEvent) -> usize {
        let matching: Vec<SharedListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, attached, _)| attached == trigger)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in &matching {
            listener(event);
        }
        matching.len()
    }
}

impl Page for FakePage {
    fn attach(&self, trigger: &Trigger, listener: Listener) -> Result<Detach, String> {
        if trigger.selector.is_empty() {
            return Err("empty selector".to_string());
        }
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners
            .borrow_mut()
            .push((id, trigger.clone(), Rc::from(listener)));
        let listeners = Rc::clone(&self.listeners);
        Ok(Box::new(move || {
            listeners
                .borrow_mut()
                .retain(|(attached, _, _)| *attached != id);
        }))
    }

    fn navigate(&self, url: &str) {
        self.calls
            .borrow_mut()
            .push(PageCall::Navigate(url.to_string()));
    }

    fn reload(&self) {
        self.calls.borrow_mut().push(PageCall::Reload);
    }

    fn open_in_new_tab(&self, url: &str) {
        self.calls
            .borrow_mut()
            .push(PageCall::OpenInNewTab(url.to_string()));
    }

    fn set_text(&self, selector: &str, text: &str) -> bool {
        if !self.elements.borrow().contains(selector) {
            return false;
        }
        let call = PageCall::SetText(selector.to_string(), text.to_string());
        self.calls.borrow_mut().push(call);
        true
    }

    fn toggle_class(&self, selector: &str, class: &str) -> bool {
        if !self.elements.borrow().contains(selector) {
            return false;
        }
        let call = PageCall::ToggleClass(selector.to_string(), class.to_string());
        self.calls.borrow_mut().push(call);
        true
    }
}

pub struct FakeDialogs {
    answer: bool,
    alerts: RefCell<Vec<String>>,
    confirms: RefCell<Vec<String>>,
}

impl FakeDialogs {
    pub fn accepting() -> Self {
        FakeDialogs {
            answer: true,
            alerts: RefCell::new(Vec::new()),
            confirms: RefCell::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        FakeDialogs {
            answer: false,
            ..FakeDialogs::accepting()
        }
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    pub fn confirms(&self) -> Vec<String> {
        self.confirms.borrow().clone()
    }
}

impl Dialogs for FakeDialogs {
    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }

    fn confirm(&self, message: &str) -> bool {
        self.confirms.borrow_mut().push(message.to_string());
        self.answer
    }
}

type Reply = Result<HttpResponse, String>;

enum Mode {
    Replying(Reply),
    Gated(RefCell<Vec<oneshot::Sender<Reply>>>),
}

/// Records every request; answers with a fixed reply or holds until released.
pub struct FakeTransport {
    mode: Mode,
    requests: RefCell<Vec<ResolvedRequest>>,
}

impl FakeTransport {
    pub fn replying(reply: Reply) -> Self {
        FakeTransport {
            mode: Mode::Replying(reply),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn ok(status: u16, body: &'static str) -> Self {
        FakeTransport::replying(Ok(HttpResponse::new(status, body)))
    }

    pub fn gated() -> Self {
        FakeTransport {
            mode: Mode::Gated(RefCell::new(Vec::new())),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ResolvedRequest> {
        self.requests.borrow().clone()
    }

    /// Answers every held request with `reply`.
    pub fn release_all(&self, reply: Reply) {
        if let Mode::Gated(gates) = &self.mode {
            for gate in gates.borrow_mut().drain(..) {
                let _ = gate.send(reply.clone());
            }
        }
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: ResolvedRequest) -> BoxedFuture<HttpResponse, String> {
        self.requests.borrow_mut().push(request);
        match &self.mode {
            Mode::Replying(reply) => {
                let reply = reply.clone();
                async move { reply }.boxed_local()
            }
            Mode::Gated(gates) => {
                let (tx, rx) = oneshot::channel();
                gates.borrow_mut().push(tx);
                async move {
                    rx.await
                        .unwrap_or_else(|_| Err("request abandoned".to_string()))
                }
                .boxed_local()
            }
        }
    }
}

/// Runs spawned work to completion on the spot.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn spawn(&self, fut: BoxedFuture<()>) {
        let _ = futures::executor::block_on(fut);
    }
}

#[derive(Default)]
pub struct FakeEvent {
    pub fields: Fields,
    pub data: HashMap<String, String>,
    pub href: Option<String>,
    pub form: Option<String>,
    pub value: Option<String>,
    prevented: Cell<bool>,
}

impl FakeEvent {
    pub fn in_form(form: &str) -> Self {
        FakeEvent {
            form: Some(form.to_string()),
            ..Default::default()
        }
    }

    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn data(mut self, name: &str, value: &str) -> Self {
        self.data.insert(name.to_string(), value.to_string());
        self
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn was_prevented(&self) -> bool {
        self.prevented.get()
    }
}

impl TriggerEvent for FakeEvent {
    fn prevent_default(&self) {
        self.prevented.set(true);
    }

    fn fields(&self) -> Fields {
        self.fields.clone()
    }

    fn data(&self) -> HashMap<String, String> {
        self.data.clone()
    }

    fn href(&self) -> Option<String> {
        self.href.clone()
    }

    fn form(&self) -> Option<String> {
        self.form.clone()
    }

    fn value(&self) -> Option<String> {
        self.value.clone()
    }
}

/// A dispatcher wired to fakes, with handles kept for inspection.
pub struct Harness {
    pub dispatcher: FormDispatcher,
    pub page: Arc<FakePage>,
    pub dialogs: Arc<FakeDialogs>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new(transport: FakeTransport) -> Self {
        Harness::build(transport, FakeDialogs::accepting())
    }

    pub fn build(transport: FakeTransport, dialogs: FakeDialogs) -> Self {
        let page = Arc::new(FakePage::with_elements(&[
            "#like-count",
            "#dropdown-menu",
            "#edit-profile-panel",
        ]));
        let dialogs = Arc::new(dialogs);
        let transport = Arc::new(transport);
        let dispatcher = FormDispatcher::new(
            Arc::new(InlineExecutor),
            transport.clone(),
            page.clone(),
            dialogs.clone(),
            DispatcherOptions::default(),
        );
        Harness {
            dispatcher,
            page,
            dialogs,
            transport,
        }
    }
}
