use std::collections::HashMap;
use std::sync::Arc;

use futures::future::FutureExt;
use js_sys::{Array, Function, Promise, Reflect};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::{
    blog,
    config::PageConfig,
    dispatcher::{ActionBinding, FormDispatcher},
    error::DispatchError,
    logging,
    types::{
        BindingHandle, BoxedFuture, Detach, Dialogs, Executor, Fields, HttpResponse, Listener,
        Page, ResolvedRequest, Transport, Trigger, TriggerEvent,
    },
};

fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn to_js(err: DispatchError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// The page object handed in from JS: `listen`, `navigate`, `reload`,
/// `openInNewTab`, `setText`, `toggleClass`, `alert`, `confirm`.
struct JsHost {
    host: JsValue,
}

impl JsHost {
    fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        let function = Reflect::get(&self.host, &JsValue::from_str(method))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str(&format!("host.{method} is not a function")))?;
        let args: Array = args.iter().collect();
        function.apply(&self.host, &args)
    }

    fn call_void(&self, method: &str, args: &[JsValue]) {
        if let Err(err) = self.call(method, args) {
            warn!(method, err = %js_error(err), "host call failed");
        }
    }

    fn call_flag(&self, method: &str, args: &[JsValue]) -> bool {
        match self.call(method, args) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(err) => {
                warn!(method, err = %js_error(err), "host call failed");
                false
            }
        }
    }
}

impl Page for JsHost {
    fn attach(&self, trigger: &Trigger, listener: Listener) -> Result<Detach, String> {
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |descriptor: JsValue| {
            listener(&JsTriggerEvent { descriptor });
        });
        let detach = self
            .call(
                "listen",
                &[
                    JsValue::from_str(&trigger.selector),
                    JsValue::from_str(trigger.event.as_str()),
                    closure.as_ref().clone(),
                ],
            )
            .map_err(js_error)?
            .dyn_into::<Function>()
            .ok();
        Ok(Box::new(move || {
            if let Some(detach) = detach {
                let _ = detach.call0(&JsValue::NULL);
            }
            drop(closure);
        }))
    }

    fn navigate(&self, url: &str) {
        self.call_void("navigate", &[JsValue::from_str(url)]);
    }

    fn reload(&self) {
        self.call_void("reload", &[]);
    }

    fn open_in_new_tab(&self, url: &str) {
        self.call_void("openInNewTab", &[JsValue::from_str(url)]);
    }

    fn set_text(&self, selector: &str, text: &str) -> bool {
        self.call_flag(
            "setText",
            &[JsValue::from_str(selector), JsValue::from_str(text)],
        )
    }

    fn toggle_class(&self, selector: &str, class: &str) -> bool {
        self.call_flag(
            "toggleClass",
            &[JsValue::from_str(selector), JsValue::from_str(class)],
        )
    }
}

impl Dialogs for JsHost {
    fn alert(&self, message: &str) {
        self.call_void("alert", &[JsValue::from_str(message)]);
    }

    fn confirm(&self, message: &str) -> bool {
        self.call_flag("confirm", &[JsValue::from_str(message)])
    }
}

/// `{ event, fields, data, href, form, value }` as built by the host's listener.
struct JsTriggerEvent {
    descriptor: JsValue,
}

impl JsTriggerEvent {
    fn get(&self, key: &str) -> JsValue {
        Reflect::get(&self.descriptor, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
    }
}

impl TriggerEvent for JsTriggerEvent {
    fn prevent_default(&self) {
        let event = self.get("event");
        let prevent = Reflect::get(&event, &JsValue::from_str("preventDefault"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok());
        if let Some(prevent) = prevent {
            let _ = prevent.call0(&event);
        }
    }

    fn fields(&self) -> Fields {
        from_value(self.get("fields")).unwrap_or_default()
    }

    fn data(&self) -> HashMap<String, String> {
        from_value(self.get("data")).unwrap_or_default()
    }

    fn href(&self) -> Option<String> {
        self.get("href").as_string()
    }

    fn form(&self) -> Option<String> {
        self.get("form").as_string()
    }

    fn value(&self) -> Option<String> {
        self.get("value").as_string()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    method: &'a str,
    url: &'a str,
    body: String,
    content_type: &'static str,
}

#[derive(Deserialize)]
struct WireResponse {
    status: u16,
    #[serde(default)]
    body: String,
}

/// Wraps a JS `fetch`-like function returning a promise of `{ status, body }`.
struct JsTransport {
    fetch: Function,
}

impl Transport for JsTransport {
    fn send(&self, request: ResolvedRequest) -> BoxedFuture<HttpResponse, String> {
        let fetch = self.fetch.clone();

        async move {
            let wire = WireRequest {
                method: request.method.as_str(),
                url: &request.url,
                body: request.encoded_body(),
                content_type: ResolvedRequest::FORM_CONTENT_TYPE,
            };
            let js_request = to_value(&wire).map_err(|e| e.to_string())?;
            let promise = fetch
                .call1(&JsValue::NULL, &js_request)
                .map_err(js_error)?
                .dyn_into::<Promise>()
                .map_err(|_| "fetch did not return a promise".to_string())?;
            let js_value = JsFuture::from(promise).await.map_err(js_error)?;
            let wire: WireResponse = from_value(js_value).map_err(|e| e.to_string())?;
            Ok::<_, String>(HttpResponse::new(wire.status, wire.body))
        }
        .boxed_local()
    }
}

pub struct WasmExecutor;

impl Executor for WasmExecutor {
    fn spawn(&self, fut: BoxedFuture<()>) {
        wasm_bindgen_futures::spawn_local(fut.map(|_| ()));
    }
}

#[wasm_bindgen]
pub struct JsDispatcher {
    dispatcher: FormDispatcher,
}

#[wasm_bindgen]
impl JsDispatcher {
    /// Builds a dispatcher from a page configuration object and installs it.
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsValue, fetch: JsValue, config: JsValue) -> Result<JsDispatcher, JsValue> {
        let config: PageConfig = from_value(config)?;
        JsDispatcher::install(host, fetch, config)
    }

    /// The blog's bindings.
    pub fn blog(host: JsValue, fetch: JsValue) -> Result<JsDispatcher, JsValue> {
        let config = blog::blog_config().map_err(to_js)?;
        JsDispatcher::install(host, fetch, config)
    }

    pub fn register(&self, binding: JsValue) -> Result<f64, JsValue> {
        let binding: ActionBinding = from_value(binding)?;
        self.dispatcher
            .register(binding)
            .map(|handle| handle.id() as f64)
            .map_err(to_js)
    }

    pub fn unregister(&self, handle: f64) {
        self.dispatcher
            .unregister(BindingHandle::from_id(handle as u64));
    }

    #[wasm_bindgen(js_name = recordSubmitter)]
    pub fn record_submitter(&self, form: &str, value: &str) {
        self.dispatcher.record_submitter(form, value);
    }

    pub fn teardown(&self) {
        self.dispatcher.teardown();
    }
}

impl JsDispatcher {
    fn install(host: JsValue, fetch: JsValue, config: PageConfig) -> Result<JsDispatcher, JsValue> {
        logging::init_or_keep(&config.options.log_filter).map_err(to_js)?;

        let fetch = fetch
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str("fetch must be a function"))?;
        let host = Arc::new(JsHost { host });
        let dispatcher = FormDispatcher::new(
            Arc::new(WasmExecutor),
            Arc::new(JsTransport { fetch }),
            host.clone(),
            host,
            config.options.clone(),
        );
        config.install(&dispatcher).map_err(to_js)?;
        Ok(JsDispatcher { dispatcher })
    }
}
