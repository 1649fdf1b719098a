//! Script engine for the isolated context
//!
//! Each page gets its own boa [`Context`], which gives it a global scope that
//! shares nothing with the host. The context is populated with the small
//! browser surface playground scripts expect (`window`, `console`, timers and
//! a read-only `document`), and the only route back to the host is
//! `window.parent.postMessage`, backed by a [`HostPort`].
//!
//! Native functions reach per-page state through thread-locals. Every page
//! runs on its own worker thread, so those thread-locals are private to one
//! page for its whole lifetime.

use crate::abi::{RuntimeError, RuntimeLimits, RuntimeResult};
use crate::host::HostPort;
use crate::page::{Page, RenderedPage};
use crate::timers::TimerQueue;
use anyhow::{anyhow, Result};
use boa_engine::error::JsNativeErrorKind;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, Source,
};
use playpen_types::{DiagnosticKind, RunId};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Level};

/// How often a waiting worker checks for cancellation
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Target used for the real console sinks
const CONSOLE_TARGET: &str = "playpen::console";

thread_local! {
    static PORT: RefCell<Option<HostPort>> = const { RefCell::new(None) };
    static TIMERS: RefCell<TimerQueue> = RefCell::new(TimerQueue::new());
    static CALLBACKS: RefCell<HashMap<u32, TimerCallback>> = RefCell::new(HashMap::new());
}

/// A function passed to `setTimeout` / `setInterval`, with its extra arguments
#[derive(Clone)]
struct TimerCallback {
    function: JsObject,
    args: Vec<JsValue>,
}

fn current_origin() -> u64 {
    PORT.with(|port| port.borrow().as_ref().map(|p| p.origin().as_u64()).unwrap_or(0))
}

/// A loaded page's script engine
pub struct ScriptEngine {
    context: Context,
    port: HostPort,
    limits: RuntimeLimits,
}

impl ScriptEngine {
    /// Create a fresh context for one page
    pub fn new(port: HostPort, limits: RuntimeLimits, page: &RenderedPage) -> Result<Self> {
        PORT.with(|p| *p.borrow_mut() = Some(port.clone()));
        TIMERS.with(|t| *t.borrow_mut() = TimerQueue::new());
        CALLBACKS.with(|c| c.borrow_mut().clear());

        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(limits.loop_iteration_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(limits.recursion_limit);

        register_console(&mut context).map_err(|e| anyhow!("failed to register console: {e}"))?;
        register_window(&mut context).map_err(|e| anyhow!("failed to register window: {e}"))?;
        register_timer_globals(&mut context)
            .map_err(|e| anyhow!("failed to register timers: {e}"))?;
        register_document(&mut context, page)
            .map_err(|e| anyhow!("failed to register document: {e}"))?;

        Ok(Self {
            context,
            port,
            limits,
        })
    }

    pub fn origin(&self) -> RunId {
        self.port.origin()
    }

    /// Evaluate script blocks in document order
    ///
    /// Block boundaries are cancellation points.
    pub fn run_scripts(&mut self, scripts: &[String]) {
        for (index, source) in scripts.iter().enumerate() {
            if self.port.is_cancelled() {
                debug!(origin = %self.origin(), block = index, "run cancelled between script blocks");
                return;
            }

            if let Err(err) = self.admit(source) {
                warn!(origin = %self.origin(), block = index, "{err}");
                self.post_error(err.to_string());
                continue;
            }

            self.eval(source);
        }
    }

    /// Reject source the engine must not be handed
    fn admit(&self, source: &str) -> RuntimeResult<()> {
        if source.len() > self.limits.max_script_bytes {
            return Err(RuntimeError::ScriptTooLarge {
                size: source.len(),
                limit: self.limits.max_script_bytes,
            });
        }

        let depth = nesting_depth(source);
        if depth > self.limits.max_nesting_depth {
            return Err(RuntimeError::NestingTooDeep {
                depth,
                limit: self.limits.max_nesting_depth,
            });
        }
        Ok(())
    }

    /// Fire pending timers until none are left
    ///
    /// Waiting for a timer is a cancellation point.
    pub fn run_timers(&mut self) {
        let mut fired = 0usize;

        while let Some(timer) = TIMERS.with(|t| t.borrow_mut().pop_next()) {
            if timer.delay_ms > self.limits.max_timer_delay_ms {
                warn!(
                    origin = %self.origin(),
                    timer = timer.id,
                    delay_ms = timer.delay_ms,
                    "timer delay exceeds limit, discarded"
                );
                CALLBACKS.with(|c| c.borrow_mut().remove(&timer.id));
                continue;
            }

            if fired >= self.limits.max_timer_callbacks {
                warn!(origin = %self.origin(), fired, "timer callback limit reached");
                break;
            }

            let deadline = TIMERS.with(|t| t.borrow().deadline(&timer));
            if !self.sleep_until(deadline) {
                debug!(origin = %self.origin(), "run cancelled while waiting on a timer");
                return;
            }

            let callback = CALLBACKS.with(|c| {
                let mut callbacks = c.borrow_mut();
                if timer.interval {
                    callbacks.get(&timer.id).cloned()
                } else {
                    callbacks.remove(&timer.id)
                }
            });
            match callback {
                Some(callback) => self.call(callback),
                None => match self.admit(&timer.callback) {
                    Ok(()) => self.eval(&timer.callback),
                    Err(err) => {
                        warn!(origin = %self.origin(), timer = timer.id, "{err}");
                        self.post_error(err.to_string());
                    }
                },
            }
            fired += 1;

            if timer.interval {
                TIMERS.with(|t| t.borrow_mut().reschedule(timer));
            }
        }

        debug!(origin = %self.origin(), fired, "timers drained");
    }

    /// Evaluate one block, reporting anything it throws
    fn eval(&mut self, source: &str) {
        if let Err(err) = self.context.eval(Source::from_bytes(source.as_bytes())) {
            self.report_uncaught(err);
        }
        self.context.run_jobs();
    }

    /// Call a timer function with its extra arguments
    fn call(&mut self, callback: TimerCallback) {
        let result = callback
            .function
            .call(&JsValue::undefined(), &callback.args, &mut self.context);
        if let Err(err) = result {
            self.report_uncaught(err);
        }
        self.context.run_jobs();
    }

    /// Route an uncaught error through the page's own `console.error`
    ///
    /// Runtime limit errors have no script value and are posted directly,
    /// as is anything the page's `console.error` fails to report.
    fn report_uncaught(&mut self, err: JsError) {
        debug!(origin = %self.origin(), "uncaught error: {err}");
        if is_runtime_limit(&err) {
            warn!(origin = %self.origin(), "runtime limit exceeded: {err}");
            self.post_error(err.to_string());
            return;
        }

        let value = err.to_opaque(&mut self.context);
        if let Err(secondary) = self.call_console_error(value) {
            debug!(origin = %self.origin(), "console.error unusable: {secondary}");
            self.post_error(err.to_string());
        }
    }

    fn call_console_error(&mut self, value: JsValue) -> JsResult<()> {
        let console = self
            .context
            .global_object()
            .get(js_string!("console"), &mut self.context)?;
        let error_fn = match console.as_object() {
            Some(obj) => obj.get(js_string!("error"), &mut self.context)?,
            None => JsValue::undefined(),
        };

        match error_fn.as_callable() {
            Some(f) => {
                f.call(&console, &[value], &mut self.context)?;
                Ok(())
            }
            None => Err(JsNativeError::typ()
                .with_message("console.error is not callable")
                .into()),
        }
    }

    fn post_error(&self, message: String) {
        self.port.post_message(json!({
            "type": DiagnosticKind::Error.wire_type(),
            "data": [message],
        }));
    }

    /// Sleep until `deadline`; returns `false` if the run was cancelled first
    fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.port.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}

/// Deepest nesting of brackets and `!`/`~` prefix runs in `source`
///
/// Brackets are counted wherever they appear, string literals included, so
/// source that reaches the engine through `eval` is measured as well.
fn nesting_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut prefix_run = 0usize;
    let mut deepest = 0usize;

    for byte in source.bytes() {
        match byte {
            b'(' | b'[' | b'{' => {
                depth += 1;
                prefix_run = 0;
                deepest = deepest.max(depth);
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                prefix_run = 0;
            }
            b'!' | b'~' => {
                prefix_run += 1;
                deepest = deepest.max(depth + prefix_run);
            }
            b' ' | b'\t' | b'\n' | b'\r' => {}
            _ => prefix_run = 0,
        }
    }
    deepest
}

fn is_runtime_limit(err: &JsError) -> bool {
    err.as_native()
        .is_some_and(|native| matches!(native.kind, JsNativeErrorKind::RuntimeLimit))
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        PORT.with(|p| p.borrow_mut().take());
        TIMERS.with(|t| *t.borrow_mut() = TimerQueue::new());
        CALLBACKS.with(|c| c.borrow_mut().clear());
    }
}

/// Run a whole page: scripts during load, then timers
///
/// This is the body of a sandbox worker thread.
pub fn run_page(page: Page, port: HostPort, limits: RuntimeLimits) {
    let origin = port.origin();
    let mut engine = match ScriptEngine::new(port.clone(), limits, page.rendered()) {
        Ok(engine) => engine,
        Err(err) => {
            error!(%origin, "failed to start script engine: {err:#}");
            port.post_message(json!({
                "type": DiagnosticKind::Error.wire_type(),
                "data": [format!("{err:#}")],
            }));
            return;
        }
    };

    debug!(%origin, scripts = page.scripts.len(), "running page");
    engine.run_scripts(&page.scripts);
    engine.run_timers();
    debug!(%origin, "page finished");
}

// ===== Globals =====

/// Real console output, written to tracing
fn console_sink(level: Level) -> NativeFunction {
    NativeFunction::from_copy_closure(move |_this, args, _ctx| {
        let line = args
            .iter()
            .map(|v| v.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let origin = current_origin();

        if level == Level::ERROR {
            error!(target: CONSOLE_TARGET, origin, "{line}");
        } else if level == Level::WARN {
            warn!(target: CONSOLE_TARGET, origin, "{line}");
        } else if level == Level::INFO {
            info!(target: CONSOLE_TARGET, origin, "{line}");
        } else {
            debug!(target: CONSOLE_TARGET, origin, "{line}");
        }
        Ok(JsValue::undefined())
    })
}

fn register_console(context: &mut Context) -> JsResult<()> {
    let console = ObjectInitializer::new(context)
        .function(console_sink(Level::INFO), js_string!("log"), 0)
        .function(console_sink(Level::INFO), js_string!("info"), 0)
        .function(console_sink(Level::WARN), js_string!("warn"), 0)
        .function(console_sink(Level::ERROR), js_string!("error"), 0)
        .function(console_sink(Level::DEBUG), js_string!("debug"), 0)
        .build();

    context.register_global_property(js_string!("console"), console, Attribute::all())
}

fn register_window(context: &mut Context) -> JsResult<()> {
    // window.parent.postMessage(message, targetOrigin)
    let post_message = NativeFunction::from_copy_closure(|_this, args, ctx| {
        let message = args.first().cloned().unwrap_or_else(JsValue::undefined);
        let data = if message.is_undefined() {
            Value::Null
        } else {
            message.to_json(ctx)?
        };

        PORT.with(|port| {
            if let Some(port) = port.borrow().as_ref() {
                port.post_message(data);
            }
        });
        Ok(JsValue::undefined())
    });

    let parent = ObjectInitializer::new(context)
        .function(post_message, js_string!("postMessage"), 2)
        .build();
    context.register_global_property(js_string!("parent"), parent, Attribute::all())?;

    // `window` and `self` are the global object itself
    let global = context.global_object();
    context.register_global_property(js_string!("window"), global.clone(), Attribute::all())?;
    context.register_global_property(js_string!("self"), global, Attribute::all())
}

fn register_timer_globals(context: &mut Context) -> JsResult<()> {
    let timers = [
        (js_string!("setTimeout"), schedule_timer(false)),
        (js_string!("setInterval"), schedule_timer(true)),
        (js_string!("clearTimeout"), clear_timer()),
        (js_string!("clearInterval"), clear_timer()),
    ];

    for (name, function) in timers {
        let function = function.to_js_function(context.realm());
        context.register_global_property(name, function, Attribute::all())?;
    }
    Ok(())
}

fn register_document(context: &mut Context, page: &RenderedPage) -> JsResult<()> {
    let read_only = Attribute::READONLY | Attribute::ENUMERABLE;

    let body = ObjectInitializer::new(context)
        .property(
            js_string!("innerHTML"),
            JsString::from(page.body.as_str()),
            read_only,
        )
        .build();

    let document = ObjectInitializer::new(context)
        .property(js_string!("title"), JsString::from(page.title.as_str()), read_only)
        .property(js_string!("body"), body, read_only)
        .build();

    context.register_global_property(js_string!("document"), document, Attribute::all())
}

// ===== Timers =====

/// `setTimeout` / `setInterval`
///
/// Function callbacks stay on the engine side, keyed by timer id; string
/// callbacks are kept as source and evaluated when the timer fires.
fn schedule_timer(interval: bool) -> NativeFunction {
    NativeFunction::from_copy_closure(move |_this, args, ctx| {
        let Some(callback) = args.first() else {
            return Ok(JsValue::undefined());
        };
        let delay_ms = args
            .get(1)
            .map(|v| v.to_number(ctx))
            .transpose()?
            .filter(|n| n.is_finite())
            .map(|n| n.max(0.0) as u64)
            .unwrap_or(0);

        let id = match callback.as_callable() {
            Some(function) => {
                let callback = TimerCallback {
                    function: function.clone(),
                    args: args.get(2..).unwrap_or_default().to_vec(),
                };
                let id = TIMERS.with(|t| t.borrow_mut().schedule(String::new(), delay_ms, interval));
                CALLBACKS.with(|c| c.borrow_mut().insert(id, callback));
                id
            }
            None => {
                let source = callback.to_string(ctx)?.to_std_string_escaped();
                TIMERS.with(|t| t.borrow_mut().schedule(source, delay_ms, interval))
            }
        };
        Ok(JsValue::from(id))
    })
}

/// `clearTimeout` / `clearInterval`
fn clear_timer() -> NativeFunction {
    NativeFunction::from_copy_closure(|_this, args, ctx| {
        let id = args
            .first()
            .map(|v| v.to_number(ctx))
            .transpose()?
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u32);

        if let Some(id) = id {
            TIMERS.with(|t| t.borrow_mut().clear(id));
            CALLBACKS.with(|c| c.borrow_mut().remove(&id));
        }
        Ok(JsValue::undefined())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CancelToken, MessageTarget, Subscription};
    use playpen_types::InboundMessage;

    fn engine(target: &MessageTarget) -> ScriptEngine {
        let port = target.port(RunId::new(1), CancelToken::new());
        ScriptEngine::new(port, RuntimeLimits::default(), &RenderedPage::default()).unwrap()
    }

    fn drain(sub: &mut Subscription) -> Vec<InboundMessage> {
        std::iter::from_fn(|| sub.try_recv())
            .map(|e| InboundMessage::decode(&e.data))
            .collect()
    }

    #[test]
    fn test_post_message_reaches_host() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&[
            "window.parent.postMessage({ type: 'console', data: ['1', 'two'] }, '*')".to_string(),
        ]);

        assert_eq!(
            drain(&mut sub),
            vec![InboundMessage::Log(vec!["1".into(), "two".into()])]
        );
    }

    #[test]
    fn test_real_console_posts_nothing() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&["console.log('quiet'); console.error('quiet')".to_string()]);
        assert!(drain(&mut sub).is_empty());
    }

    #[test]
    fn test_uncaught_error_goes_through_console_error() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&[
            "console.error = function (e) { window.parent.postMessage({ type: 'console_error', data: [String(e)] }, '*') }".to_string(),
            "throw new TypeError('bad')".to_string(),
            "window.parent.postMessage({ type: 'console', data: ['after'] }, '*')".to_string(),
        ]);

        assert_eq!(
            drain(&mut sub),
            vec![
                InboundMessage::Error(vec!["TypeError: bad".into()]),
                InboundMessage::Log(vec!["after".into()]),
            ]
        );
    }

    #[test]
    fn test_uncaught_error_without_console_is_posted_directly() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&["console = undefined; throw 1".to_string()]);

        let messages = drain(&mut sub);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], InboundMessage::Error(_)));
    }

    #[test]
    fn test_runaway_loop_is_posted_directly() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let port = target.port(RunId::new(1), CancelToken::new());
        let limits = RuntimeLimits {
            loop_iteration_limit: 100,
            ..RuntimeLimits::default()
        };
        let mut engine = ScriptEngine::new(port, limits, &RenderedPage::default()).unwrap();

        engine.run_scripts(&["while (true) {}".to_string()]);

        let messages = drain(&mut sub);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], InboundMessage::Error(_)));
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(nesting_depth(""), 0);
        assert_eq!(nesting_depth("f(a[0], { b: 1 })"), 2);
        assert_eq!(nesting_depth("if (a) { b() } else { c() }"), 2);
        assert_eq!(nesting_depth("!! ~x"), 3);
        assert_eq!(nesting_depth("a != b"), 1);
        assert_eq!(nesting_depth("eval(\"[[[1]]]\")"), 4);
        assert_eq!(nesting_depth("))) ((x))"), 2);
    }

    #[test]
    fn test_deeply_nested_block_is_rejected() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);
        let nested = format!("var deep = {}1{};", "[".repeat(5_000), "]".repeat(5_000));

        engine.run_scripts(&[nested, "window.parent.postMessage({ type: 'console', data: [typeof deep] }, '*')".to_string()]);

        assert_eq!(
            drain(&mut sub),
            vec![
                InboundMessage::Error(vec!["Script block nested too deeply: 5000 > 128 levels".into()]),
                InboundMessage::Log(vec!["undefined".into()]),
            ]
        );
    }

    #[test]
    fn test_window_is_the_global_object() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&[
            "var g = 1; parent.postMessage({ type: 'console', data: [typeof window.g, String(window === globalThis), String(self === window), typeof window.setTimeout] }, '*')".to_string(),
        ]);

        assert_eq!(
            drain(&mut sub),
            vec![InboundMessage::Log(vec![
                "number".into(),
                "true".into(),
                "true".into(),
                "function".into(),
            ])]
        );
    }

    #[test]
    fn test_timer_callbacks_leave_no_globals() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&[
            "var before = Object.getOwnPropertyNames(globalThis).length; \
             setTimeout(function (a, b) { window.parent.postMessage({ type: 'console', data: [a + b] }, '*') }, 0, 'x', 'y'); \
             var cleared = setTimeout(function () {}, 0); clearTimeout(cleared); \
             setTimeout(function () { window.parent.postMessage({ type: 'console', data: [String(Object.getOwnPropertyNames(globalThis).length - before)] }, '*') }, 1)".to_string(),
        ]);
        assert_eq!(CALLBACKS.with(|c| c.borrow().len()), 2);

        engine.run_timers();

        assert_eq!(
            drain(&mut sub),
            vec![
                InboundMessage::Log(vec!["xy".into()]),
                InboundMessage::Log(vec!["0".into()]),
            ]
        );
        assert!(CALLBACKS.with(|c| c.borrow().is_empty()));
    }

    #[test]
    fn test_interval_callback_released_when_cleared() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&[
            "var n = 0; var id = setInterval(function () { n += 1; if (n === 2) { clearInterval(id); window.parent.postMessage({ type: 'console', data: [String(n)] }, '*') } }, 1)".to_string(),
        ]);
        engine.run_timers();

        assert_eq!(drain(&mut sub), vec![InboundMessage::Log(vec!["2".into()])]);
        assert!(CALLBACKS.with(|c| c.borrow().is_empty()));
    }

    #[test]
    fn test_blocks_share_global_scope() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);

        engine.run_scripts(&[
            "var shared = 41;".to_string(),
            "window.parent.postMessage({ type: 'console', data: [String(shared + 1)] }, '*')".to_string(),
        ]);

        assert_eq!(drain(&mut sub), vec![InboundMessage::Log(vec!["42".into()])]);
    }

    #[test]
    fn test_oversized_block_is_reported() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let port = target.port(RunId::new(1), CancelToken::new());
        let limits = RuntimeLimits {
            max_script_bytes: 8,
            ..RuntimeLimits::default()
        };
        let mut engine = ScriptEngine::new(port, limits, &RenderedPage::default()).unwrap();

        engine.run_scripts(&["var far_too_long = 1;".to_string()]);

        assert_eq!(
            drain(&mut sub),
            vec![InboundMessage::Error(vec!["Script block too large: 21 > 8 bytes".into()])]
        );
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let mut engine = engine(&target);
        let post = |label: &str| {
            format!("function () {{ window.parent.postMessage({{ type: 'console', data: ['{label}'] }}, '*') }}")
        };

        engine.run_scripts(&[format!(
            "setTimeout({}, 20); window.setTimeout({}, 0); setTimeout({}, 5)",
            post("late"),
            post("first"),
            post("middle")
        )]);
        assert!(drain(&mut sub).is_empty());

        engine.run_timers();
        assert_eq!(
            drain(&mut sub),
            vec![
                InboundMessage::Log(vec!["first".into()]),
                InboundMessage::Log(vec!["middle".into()]),
                InboundMessage::Log(vec!["late".into()]),
            ]
        );
    }

    #[test]
    fn test_interval_stops_at_callback_limit() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let port = target.port(RunId::new(1), CancelToken::new());
        let limits = RuntimeLimits {
            max_timer_callbacks: 3,
            ..RuntimeLimits::default()
        };
        let mut engine = ScriptEngine::new(port, limits, &RenderedPage::default()).unwrap();

        engine.run_scripts(&[
            "setInterval(function () { window.parent.postMessage({ type: 'console', data: ['tick'] }, '*') }, 1)".to_string(),
        ]);
        engine.run_timers();

        assert_eq!(drain(&mut sub).len(), 3);
    }

    #[test]
    fn test_cancelled_run_skips_timers() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let cancel = CancelToken::new();
        let port = target.port(RunId::new(1), cancel.clone());
        let mut engine = ScriptEngine::new(port, RuntimeLimits::default(), &RenderedPage::default()).unwrap();

        engine.run_scripts(&[
            "setTimeout(function () { window.parent.postMessage({ type: 'console', data: ['late'] }, '*') }, 0)".to_string(),
        ]);
        cancel.cancel();
        engine.run_timers();

        assert!(drain(&mut sub).is_empty());
    }

    #[test]
    fn test_document_is_visible() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let port = target.port(RunId::new(1), CancelToken::new());
        let page = RenderedPage {
            title: "Document".into(),
            style: String::new(),
            body: "<p>hi</p>".into(),
        };
        let mut engine = ScriptEngine::new(port, RuntimeLimits::default(), &page).unwrap();

        engine.run_scripts(&[
            "window.parent.postMessage({ type: 'console', data: [document.title, document.body.innerHTML] }, '*')".to_string(),
        ]);

        assert_eq!(
            drain(&mut sub),
            vec![InboundMessage::Log(vec!["Document".into(), "<p>hi</p>".into()])]
        );
    }
}
