//! Document-level side effects: drag styling, file download, console
//! logging and the panic hook.

use tc_core::export::ExportFile;
use tc_editor::DragEffects;
use wasm_bindgen::{JsCast, JsValue};

// ─── Drag styling ────────────────────────────────────────────────────────

/// Disables text selection and shows a grabbing cursor on `<body>` while a
/// drag session is open.
#[derive(Default)]
pub struct BodyDragEffects;

const DRAG_STYLES: [(&str, &str); 2] = [("user-select", "none"), ("cursor", "grabbing")];

fn body() -> Option<web_sys::HtmlElement> {
    web_sys::window()?.document()?.body()
}

impl DragEffects for BodyDragEffects {
    fn begin(&mut self) {
        let Some(body) = body() else { return };
        let style = body.style();
        for (prop, value) in DRAG_STYLES {
            let _ = style.set_property(prop, value);
        }
    }

    fn end(&mut self) {
        let Some(body) = body() else { return };
        let style = body.style();
        for (prop, _) in DRAG_STYLES {
            let _ = style.remove_property(prop);
        }
    }
}

// ─── Download ────────────────────────────────────────────────────────────

/// Save `file` through a temporary object URL and a hidden anchor.
pub fn download(file: &ExportFile) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let body = document.body().ok_or("no body")?;

    let bag = web_sys::BlobPropertyBag::new();
    bag.set_type(&file.mime);
    let parts = js_sys::Array::of1(&JsValue::from_str(&file.contents));
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &bag)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor: web_sys::HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(&file.filename);
    anchor.style().set_property("display", "none")?;
    body.append_child(&anchor)?;
    anchor.click();
    anchor.remove();
    web_sys::Url::revoke_object_url(&url)?;

    log::info!("downloaded {}", file.filename);
    Ok(())
}

// ─── Console logging ─────────────────────────────────────────────────────

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

/// Route `log` records to the browser console. Later calls only change
/// the level.
pub fn init_logging(level: log::LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

pub fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Tool Canvas WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
