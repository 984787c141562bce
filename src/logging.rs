use std::io::{self, Write};

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::DispatchError;

/// Installs the global `tracing` subscriber. In the browser lines go to
/// `console.log`, natively to stderr.
pub fn init(filter: &str) -> Result<(), DispatchError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| DispatchError::LogFilter(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_ansi(false)
        .with_writer(ConsoleWriter::default)
        .try_init()
        .map_err(|e| DispatchError::Logging(e.to_string()))
}

/// Like [`init`], but keeps a subscriber that is already installed. A bad filter
/// is still an error.
pub fn init_or_keep(filter: &str) -> Result<(), DispatchError> {
    match init(filter) {
        Err(DispatchError::Logging(reason)) => {
            debug!(%reason, "keeping the installed subscriber");
            Ok(())
        }
        other => other,
    }
}

/// Collects one formatted event and emits it as a single console line.
#[derive(Default)]
pub struct ConsoleWriter {
    buf: Vec<u8>,
}

impl ConsoleWriter {
    fn emit(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        console_log(line.trim_end());
        self.buf.clear();
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        self.emit();
    }
}

#[cfg(target_arch = "wasm32")]
fn console_log(line: &str) {
    use js_sys::{Function, Reflect};
    use wasm_bindgen::{JsCast, JsValue};

    let Ok(console) = Reflect::get(&js_sys::global(), &JsValue::from_str("console")) else {
        return;
    };
    let Ok(log) = Reflect::get(&console, &JsValue::from_str("log")) else {
        return;
    };
    if let Ok(log) = log.dyn_into::<Function>() {
        let _ = log.call1(&console, &JsValue::from_str(line));
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn console_log(line: &str) {
    eprintln!("{line}");
}
