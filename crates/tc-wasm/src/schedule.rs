//! Browser timers and listeners driving the canvas.
//!
//! The canvas only reports deadlines; this module turns them into
//! `setTimeout` / `requestIdleCallback` calls and keeps the JS closures
//! alive until they fire or are cancelled. Browsers without
//! `requestIdleCallback` fall back to `setTimeout`. While a drag session
//! is open, pointer listeners on `document` feed it.

use crate::storage::LocalStorage;
use std::cell::RefCell;
use std::rc::Rc;
use tc_editor::ToolCanvas;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

pub(crate) type SharedCanvas = Rc<RefCell<ToolCanvas<LocalStorage>>>;

enum Handle {
    Idle(u32),
    Timeout(i32),
}

struct Pending {
    handle: Handle,
    _callback: Closure<dyn FnMut()>,
}

type PointerCallback = Closure<dyn FnMut(web_sys::PointerEvent)>;

struct DragListeners {
    document: web_sys::Document,
    on_move: PointerCallback,
    on_up: PointerCallback,
    on_cancel: PointerCallback,
}

impl DragListeners {
    fn events(&self) -> [(&'static str, &PointerCallback); 3] {
        [
            ("pointermove", &self.on_move),
            ("pointerup", &self.on_up),
            ("pointercancel", &self.on_cancel),
        ]
    }

    fn attach(&self) {
        for (event, callback) in self.events() {
            if let Err(e) = self
                .document
                .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            {
                log::warn!("could not listen for {event}: {e:?}");
            }
        }
    }

    fn detach(&self) {
        for (event, callback) in self.events() {
            let _ = self
                .document
                .remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
        }
    }
}

#[derive(Default)]
struct Timers {
    save: Option<Pending>,
    write: Option<Pending>,
    load: Option<Pending>,
    unload: Option<Closure<dyn FnMut()>>,
    drag: Option<DragListeners>,
    // Detached listeners; one of them may still be on the call stack.
    retired: Option<DragListeners>,
}

#[derive(Clone)]
pub(crate) struct Scheduler {
    canvas: SharedCanvas,
    timers: Rc<RefCell<Timers>>,
}

fn cancel(window: &web_sys::Window, pending: Option<Pending>) {
    match pending.map(|p| p.handle) {
        Some(Handle::Idle(h)) => window.cancel_idle_callback(h),
        Some(Handle::Timeout(h)) => window.clear_timeout_with_handle(h),
        None => {}
    }
}

fn set_timeout(window: &web_sys::Window, callback: Closure<dyn FnMut()>, delay_ms: f64) -> Option<Pending> {
    match window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        delay_ms.max(0.0).ceil() as i32,
    ) {
        Ok(h) => Some(Pending {
            handle: Handle::Timeout(h),
            _callback: callback,
        }),
        Err(e) => {
            log::warn!("setTimeout failed: {e:?}");
            None
        }
    }
}

fn request_idle(
    window: &web_sys::Window,
    callback: Closure<dyn FnMut()>,
    timeout_ms: f64,
    fallback_ms: f64,
) -> Option<Pending> {
    let options = web_sys::IdleRequestOptions::new();
    options.set_timeout(timeout_ms as u32);
    match window.request_idle_callback_with_options(callback.as_ref().unchecked_ref(), &options) {
        Ok(h) => Some(Pending {
            handle: Handle::Idle(h),
            _callback: callback,
        }),
        Err(_) => set_timeout(window, callback, fallback_ms),
    }
}

impl Scheduler {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self {
            canvas,
            timers: Rc::new(RefCell::new(Timers::default())),
        }
    }

    /// Schedule the initial load, then `on_loaded` once the canvas is
    /// hydrated. Also flushes on `beforeunload`.
    pub fn mount(&self, on_loaded: Option<js_sys::Function>) {
        let Some(window) = web_sys::window() else { return };
        let persist = self.canvas.borrow().config().persist.clone();

        let this = self.clone();
        let load = Closure::<dyn FnMut()>::new(move || {
            let restored = this.canvas.borrow_mut().hydrate(js_sys::Date::now());
            log::info!("restored {restored} tools");
            this.sync();
            if let Some(f) = &on_loaded {
                let _ = f.call0(&wasm_bindgen::JsValue::NULL);
            }
        });
        let pending = request_idle(&window, load, persist.load_idle_timeout_ms, persist.load_fallback_ms);

        let canvas = self.canvas.clone();
        let unload = Closure::<dyn FnMut()>::new(move || {
            if let Ok(mut canvas) = canvas.try_borrow_mut() {
                canvas.flush();
            }
        });
        let _ = window
            .add_event_listener_with_callback("beforeunload", unload.as_ref().unchecked_ref());

        let mut timers = self.timers.borrow_mut();
        cancel(&window, std::mem::replace(&mut timers.load, pending));
        timers.unload = Some(unload);
    }

    /// Re-arm the save timer to the canvas's current debounce deadline,
    /// and drop the drag listeners once the session is over. Call after
    /// every intent.
    pub fn sync(&self) {
        if !self.canvas.borrow().is_dragging() {
            self.release_drag();
        }
        let Some(window) = web_sys::window() else { return };
        let deadline = self.canvas.borrow().next_deadline();
        let mut timers = self.timers.borrow_mut();
        cancel(&window, timers.save.take());
        let Some(at_ms) = deadline else { return };

        let this = self.clone();
        let callback = Closure::<dyn FnMut()>::new(move || this.on_save_timer(at_ms));
        timers.save = set_timeout(&window, callback, at_ms - js_sys::Date::now());
    }

    fn on_save_timer(&self, at_ms: f64) {
        // Timers may fire a hair early by the wall clock; this one is due.
        let now = js_sys::Date::now().max(at_ms);
        if !self.canvas.borrow_mut().tick(now) {
            return;
        }
        let Some(window) = web_sys::window() else { return };
        let timeout = self.canvas.borrow().config().persist.idle_timeout_ms;

        let canvas = self.canvas.clone();
        let write = Closure::<dyn FnMut()>::new(move || {
            canvas.borrow_mut().run_idle();
        });
        let pending = request_idle(&window, write, timeout, 0.0);
        let mut timers = self.timers.borrow_mut();
        cancel(&window, std::mem::replace(&mut timers.write, pending));
    }

    /// Follow the pointer on `document` until the open drag session ends.
    /// `on_update` is called after every move that changed something.
    pub fn track_drag(&self, on_update: Option<js_sys::Function>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        self.release_drag();
        self.timers.borrow_mut().retired = None;

        let listeners = DragListeners {
            document,
            on_move: self.pointer_callback(on_update.clone(), |canvas, x, y, now| {
                canvas.pointer_move(x, y, now).is_some()
            }),
            on_up: self.pointer_callback(on_update.clone(), |canvas, x, y, now| {
                canvas.pointer_up(x, y, now).is_some()
            }),
            on_cancel: self.pointer_callback(on_update, |canvas, _, _, now| {
                canvas.cancel_drag(now).is_some()
            }),
        };
        listeners.attach();
        self.timers.borrow_mut().drag = Some(listeners);
    }

    fn pointer_callback(
        &self,
        on_update: Option<js_sys::Function>,
        step: fn(&mut ToolCanvas<LocalStorage>, f64, f64, f64) -> bool,
    ) -> PointerCallback {
        let this = self.clone();
        Closure::new(move |event: web_sys::PointerEvent| {
            let x = f64::from(event.client_x());
            let y = f64::from(event.client_y());
            let changed = match this.canvas.try_borrow_mut() {
                Ok(mut canvas) => step(&mut canvas, x, y, js_sys::Date::now()),
                Err(_) => return,
            };
            this.sync();
            if let (true, Some(f)) = (changed, &on_update) {
                let _ = f.call0(&JsValue::NULL);
            }
        })
    }

    fn release_drag(&self) {
        let mut timers = self.timers.borrow_mut();
        if let Some(listeners) = timers.drag.take() {
            listeners.detach();
            timers.retired = Some(listeners);
        }
    }

    /// Cancel everything and release the closures.
    pub fn unmount(&self) {
        self.release_drag();
        self.timers.borrow_mut().retired = None;
        let Some(window) = web_sys::window() else { return };
        let mut timers = self.timers.borrow_mut();
        cancel(&window, timers.save.take());
        cancel(&window, timers.write.take());
        cancel(&window, timers.load.take());
        if let Some(unload) = timers.unload.take() {
            let _ = window.remove_event_listener_with_callback(
                "beforeunload",
                unload.as_ref().unchecked_ref(),
            );
        }
    }
}
