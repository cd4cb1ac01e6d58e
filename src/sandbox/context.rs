// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use base64::{engine::general_purpose::STANDARD, Engine as _};
use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::property::Attribute;
use boa_engine::{Context, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction, Source};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::bundle::{TaskBindings, UnitBindings};
use crate::dispatch::SandboxHost;
use crate::errors::{SandboxError, ThrownValue};
use crate::observability::messages::sandbox::{SandboxBuilt, TimerWait};
use crate::observability::messages::StructuredLog;
use crate::sandbox::capabilities::CapabilityTable;
use crate::sandbox::report::UnitReport;
use crate::sandbox::resolver::{ModuleResolver, ResolveError};

const HARNESS: &str = include_str!("js/harness.js");
const MODULE_LOADER: &str = include_str!("js/module_loader.js");
const CONSOLE: &str = include_str!("js/console.js");
const RPC: &str = include_str!("js/rpc.js");
const EXPRESSION: &str = include_str!("js/expression.js");
const CLEANUP: &str = include_str!("js/cleanup.js");

/// Longest single wait of the event loop; matches the largest timer delay.
const MAX_TIMER_WAIT_MS: f64 = 2_147_483_647.0;

/// Builds one fresh [`SandboxContext`] per execution unit.
///
/// Holds only immutable, shareable parts; no script engine state survives
/// between units.
#[derive(Debug, Clone)]
pub struct SandboxFactory {
    capabilities: Arc<CapabilityTable>,
    resolver: Arc<ModuleResolver>,
}

impl SandboxFactory {
    pub fn new(capabilities: Arc<CapabilityTable>, resolver: Arc<ModuleResolver>) -> Self {
        Self {
            capabilities,
            resolver,
        }
    }

    /// Assemble a sandbox bound to one unit's inputs.
    ///
    /// Installation order: host natives, harness, capability table, module
    /// loader, console, `helpers`, expression globals, then removal of the host
    /// internals from the global scope.
    pub fn build(&self, bindings: &UnitBindings, host: &SandboxHost) -> Result<SandboxContext, SandboxError> {
        let mut context = Context::default();

        self.register_natives(&mut context, host)?;
        register_task_inputs(&mut context, &bindings.task)?;
        register_property(&mut context, "__sandbox_item", JsString::from(bindings.item_json.as_str()))?;
        register_property(&mut context, "__sandbox_item_index", bindings.item_index as f64)?;
        register_property(&mut context, "__sandbox_mode", JsString::from(bindings.mode().as_str()))?;
        let methods: Vec<&str> = host.rpc.methods().collect();
        let methods_json = serde_json::to_string(&methods)?;
        register_property(&mut context, "__sandbox_rpc_methods", JsString::from(methods_json.as_str()))?;

        run_prelude(&mut context, "harness", HARNESS)?;
        let harness = global_object(&mut context, "__sandbox_harness")?;
        for capability in self.capabilities.capabilities() {
            run_prelude(&mut context, capability.name(), capability.prelude())?;
        }
        let timers = global_object(&mut context, "__sandbox_timers").ok();
        run_prelude(&mut context, "module-loader", MODULE_LOADER)?;
        run_prelude(&mut context, "console", CONSOLE)?;
        run_prelude(&mut context, "helpers", RPC)?;
        run_prelude(&mut context, "expression", EXPRESSION)?;
        run_prelude(&mut context, "cleanup", CLEANUP)?;

        SandboxBuilt {
            task_id: host.side_channel.task_id(),
            mode: bindings.mode(),
            item_index: bindings.item_index,
            capability_version: self.capabilities.version(),
        }
        .log();

        Ok(SandboxContext {
            context,
            harness,
            timers,
        })
    }

    fn register_natives(&self, context: &mut Context, host: &SandboxHost) -> Result<(), SandboxError> {
        let resolver = Arc::clone(&self.resolver);
        // SAFETY: the closure captures no garbage-collected values.
        let load_module = unsafe {
            NativeFunction::from_closure(move |_this, args, ctx| {
                let module_id = string_arg(args, 0, ctx)?;
                let reply = match resolver.resolve(&module_id) {
                    Ok(module) => json!({"status": "ok", "key": module.key, "source": &*module.source}),
                    Err(ResolveError::Denied(_)) => json!({"status": "denied"}),
                    Err(ResolveError::NotFound(_)) => json!({"status": "missing"}),
                };
                Ok(JsValue::from(JsString::from(reply.to_string().as_str())))
            })
        };
        register_native(context, "__sandbox_load_module", 1, load_module)?;

        let side_channel = host.side_channel.clone();
        // SAFETY: the closure captures no garbage-collected values.
        let log = unsafe {
            NativeFunction::from_closure(move |_this, args, ctx| {
                side_channel.log_line(string_arg(args, 0, ctx)?);
                Ok(JsValue::undefined())
            })
        };
        register_native(context, "__sandbox_log", 1, log)?;

        let rpc = host.rpc.clone();
        // SAFETY: the closure captures no garbage-collected values.
        let call = unsafe {
            NativeFunction::from_closure(move |_this, args, ctx| {
                let method = string_arg(args, 0, ctx)?;
                let args_json = string_arg(args, 1, ctx)?;
                let reply = rpc.call_json(&method, &args_json);
                Ok(JsValue::from(JsString::from(reply.as_str())))
            })
        };
        register_native(context, "__sandbox_rpc", 2, call)?;

        let encode = NativeFunction::from_fn_ptr(|_this, args, ctx| {
            let binary = string_arg(args, 0, ctx)?;
            let bytes: Vec<u8> = binary.chars().map(|c| (c as u32 & 0xff) as u8).collect();
            Ok(JsValue::from(JsString::from(STANDARD.encode(bytes).as_str())))
        });
        register_native(context, "__sandbox_base64_encode", 1, encode)?;

        let decode = NativeFunction::from_fn_ptr(|_this, args, ctx| {
            let encoded = string_arg(args, 0, ctx)?;
            match STANDARD.decode(encoded.as_bytes()) {
                Ok(bytes) => {
                    let binary: String = bytes.into_iter().map(char::from).collect();
                    Ok(JsValue::from(JsString::from(binary.as_str())))
                }
                Err(_) => Ok(JsValue::undefined()),
            }
        });
        register_native(context, "__sandbox_base64_decode", 1, decode)?;

        Ok(())
    }
}

/// Expose the task-wide inputs as readers, so a unit only copies them into the
/// engine when its code asks for them.
fn register_task_inputs(context: &mut Context, task: &Arc<TaskBindings>) -> Result<(), SandboxError> {
    let items = Arc::clone(task);
    // SAFETY: the closure captures no garbage-collected values.
    let read_items = unsafe {
        NativeFunction::from_closure(move |_this, _args, _ctx| {
            Ok(JsValue::from(JsString::from(items.items_json.as_str())))
        })
    };
    register_native(context, "__sandbox_items", 0, read_items)?;

    let outputs = Arc::clone(task);
    // SAFETY: the closure captures no garbage-collected values.
    let read_outputs = unsafe {
        NativeFunction::from_closure(move |_this, _args, _ctx| {
            Ok(JsValue::from(JsString::from(outputs.node_outputs_json.as_str())))
        })
    };
    register_native(context, "__sandbox_node_outputs", 0, read_outputs)?;

    register_property(context, "__sandbox_context", JsString::from(task.context_json.as_str()))
}

fn string_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<String> {
    let value = args.get(index).cloned().unwrap_or_else(JsValue::undefined);
    Ok(value.to_string(ctx)?.to_std_string_escaped())
}

fn register_native(
    context: &mut Context,
    name: &str,
    length: usize,
    function: NativeFunction,
) -> Result<(), SandboxError> {
    context
        .register_global_callable(JsString::from(name), length, function)
        .map_err(|err| SandboxError::Binding {
            binding: name.to_string(),
            reason: err.to_string(),
        })
}

fn register_property(context: &mut Context, name: &str, value: impl Into<JsValue>) -> Result<(), SandboxError> {
    context
        .register_global_property(JsString::from(name), value, Attribute::CONFIGURABLE)
        .map_err(|err| SandboxError::Binding {
            binding: name.to_string(),
            reason: err.to_string(),
        })
}

fn run_prelude(context: &mut Context, name: &str, source: &str) -> Result<(), SandboxError> {
    context
        .eval(Source::from_bytes(source))
        .map(|_| ())
        .map_err(|err| SandboxError::Binding {
            binding: name.to_string(),
            reason: err.to_string(),
        })
}

/// Grab a prelude's driver object before cleanup removes its global.
fn global_object(context: &mut Context, name: &str) -> Result<JsObject, SandboxError> {
    let global = context.global_object();
    let value = global
        .get(JsString::from(name), context)
        .map_err(|err| SandboxError::Binding {
            binding: name.to_string(),
            reason: err.to_string(),
        })?;
    value.as_object().cloned().ok_or_else(|| SandboxError::Binding {
        binding: name.to_string(),
        reason: "not installed".to_string(),
    })
}

fn call_method(context: &mut Context, target: &JsObject, name: &str, args: &[JsValue]) -> JsResult<JsValue> {
    let method = target.get(JsString::from(name), context)?;
    let function = method
        .as_callable()
        .ok_or_else(|| JsError::from(JsNativeError::typ().with_message(format!("{} is not a function", name))))?;
    function.call(&JsValue::from(target.clone()), args, context)
}

/// A sandbox ready to run exactly one execution unit.
///
/// [`SandboxContext::evaluate`] consumes it; a context is never reused. The
/// harness and timer driver are reachable only from here.
pub struct SandboxContext {
    context: Context,
    harness: JsObject,
    timers: Option<JsObject>,
}

impl SandboxContext {
    /// Run `code` as the body of an async function and drive it until its
    /// promise settles.
    ///
    /// Jobs are run to exhaustion, then the worker sleeps until the next timer
    /// is due and fires it, until the promise settles or nothing is left that
    /// could settle it. Code that never yields is not interrupted.
    pub fn evaluate(mut self, code: &str) -> Result<UnitReport, SandboxError> {
        let promise = match self.start(code) {
            Ok(promise) => promise,
            Err(rendered) => {
                return Ok(UnitReport::Threw {
                    thrown: ThrownValue::from_engine_error(&rendered),
                })
            }
        };

        self.drive(&promise)?;
        Ok(self.report())
    }

    /// Compile the code and call it. Code that escapes the wrapper fails the
    /// unit like a syntax error.
    fn start(&mut self, code: &str) -> Result<JsPromise, String> {
        let wrapped = format!("(async function () {{\n{}\n}})", code);
        let function = self
            .context
            .eval(Source::from_bytes(&wrapped))
            .map_err(|err| err.to_string())?;
        let promise = function
            .as_callable()
            .ok_or_else(|| "SyntaxError: code must be a function body".to_string())?
            .call(&JsValue::undefined(), &[], &mut self.context)
            .map_err(|err| err.to_string())?;
        promise
            .as_object()
            .cloned()
            .and_then(|object| JsPromise::from_object(object).ok())
            .ok_or_else(|| "SyntaxError: code must be a function body".to_string())
    }

    fn drive(&mut self, promise: &JsPromise) -> Result<(), SandboxError> {
        loop {
            self.context.run_jobs();
            // An uncaught timer error settles the unit first.
            if self.harness_call("isSettled", &[])?.to_boolean() {
                return Ok(());
            }
            match promise.state() {
                PromiseState::Fulfilled(value) => {
                    self.harness_call("returned", &[value])?;
                    return Ok(());
                }
                PromiseState::Rejected(error) => {
                    self.harness_call("uncaught", &[error])?;
                    return Ok(());
                }
                PromiseState::Pending => {}
            }

            let delay = self.timer_call("nextDelay")?;
            if delay < 0.0 {
                return Ok(());
            }
            if delay > 0.0 {
                let wait = Duration::from_millis(delay.min(MAX_TIMER_WAIT_MS).ceil() as u64);
                TimerWait { wait }.log();
                std::thread::sleep(wait);
            }
            self.timer_call("fireNext")?;
        }
    }

    /// Read the outcome back. User code has run by now, so a report the host
    /// cannot read fails the unit rather than the engine.
    fn report(&mut self) -> UnitReport {
        match self.read_report() {
            Ok(report) => report,
            Err(reason) => UnitReport::Threw {
                thrown: ThrownValue::from_engine_error(&SandboxError::Report(reason).to_string()),
            },
        }
    }

    fn read_report(&mut self) -> Result<UnitReport, String> {
        let value = call_method(&mut self.context, &self.harness, "report", &[]).map_err(|err| err.to_string())?;
        let text = value
            .to_string(&mut self.context)
            .map_err(|err| err.to_string())?
            .to_std_string_escaped();
        serde_json::from_str(&text).map_err(|err| err.to_string())
    }

    fn harness_call(&mut self, name: &str, args: &[JsValue]) -> Result<JsValue, SandboxError> {
        call_method(&mut self.context, &self.harness, name, args).map_err(|err| SandboxError::EventLoop(err.to_string()))
    }

    /// `nextDelay` or `fireNext` on the timer driver; -1 when there is none.
    fn timer_call(&mut self, name: &str) -> Result<f64, SandboxError> {
        let Some(timers) = &self.timers else {
            return Ok(-1.0);
        };
        let value = call_method(&mut self.context, timers, name, &[])
            .map_err(|err| SandboxError::EventLoop(err.to_string()))?;
        Ok(value.as_number().unwrap_or(-1.0))
    }
}

impl std::fmt::Debug for SandboxContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixtures::bundle_with_items;
    use crate::dispatch::{RpcBridge, SideChannel};
    use crate::errors::ErrorKind;
    use crate::orchestrator::LocalOrchestrator;
    use crate::sandbox::report::ReturnedValue;
    use crate::task::NodeMode;
    use serde_json::Value;
    use std::time::Instant;
    use tokio::runtime::Handle;

    fn factory(builtin: &str) -> SandboxFactory {
        let resolver = ModuleResolver::new(builtin.parse().unwrap(), "greeter".parse().unwrap())
            .with_external("greeter", "module.exports = (name) => 'hello ' + name;")
            .unwrap();
        SandboxFactory::new(Arc::new(CapabilityTable::standard()), Arc::new(resolver))
    }

    async fn run_with(
        code: &str,
        builtin: &str,
        orchestrator: Arc<LocalOrchestrator>,
    ) -> UnitReport {
        let (side_channel, drain) = SideChannel::spawn(orchestrator.clone(), "t-1");
        let rpc = RpcBridge::new(
            orchestrator,
            Handle::current(),
            "t-1",
            vec!["helpers.httpRequest".to_string()],
        );
        let host = SandboxHost { side_channel, rpc };
        let factory = factory(builtin);
        let code = code.to_string();

        let report = tokio::task::spawn_blocking(move || {
            let bundle = bundle_with_items(2);
            let task = Arc::new(TaskBindings::new(&bundle, NodeMode::RunOnceForAllItems, "manual").unwrap());
            let bindings = UnitBindings::all_items(&task, &bundle).unwrap();
            let sandbox = factory.build(&bindings, &host).unwrap();
            sandbox.evaluate(&code)
        })
        .await
        .unwrap()
        .unwrap();
        let _ = drain.await;
        report
    }

    async fn run(code: &str) -> UnitReport {
        run_with(code, "", Arc::new(LocalOrchestrator::new())).await
    }

    fn returned(report: UnitReport) -> ReturnedValue {
        match report {
            UnitReport::Returned { value } => value,
            other => panic!("expected a returned value, got {:?}", other),
        }
    }

    fn scalar(report: UnitReport) -> Value {
        match returned(report) {
            ReturnedValue::Scalar(value) => value,
            other => panic!("expected a scalar, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_return_value_is_reported() {
        let value = returned(run("return items.map((i) => ({ json: { n: i.json.n * 10 } }));").await);
        assert_eq!(
            value,
            ReturnedValue::Array(vec![
                serde_json::json!({"json": {"n": 0}}),
                serde_json::json!({"json": {"n": 10}})
            ])
        );
    }

    #[tokio::test]
    async fn test_missing_return_is_undefined() {
        assert_eq!(returned(run("const x = 1;").await), ReturnedValue::Undefined);
    }

    #[tokio::test]
    async fn test_thrown_string_keeps_canonical_text() {
        let err = run("throw 'oops';").await.into_result().unwrap_err();
        assert_eq!(err.message, "\"oops\"");
        assert_eq!(err.kind, ErrorKind::NonErrorThrow);
    }

    #[tokio::test]
    async fn test_thrown_error_is_native() {
        let err = run("throw new TypeError('bad input');").await.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NativeExecutionFailure);
        assert_eq!(err.message, "bad input");
        assert_eq!(err.description.as_deref(), Some("TypeError"));
    }

    #[tokio::test]
    async fn test_syntax_error_fails_the_unit() {
        let err = run("return {{;").await.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NativeExecutionFailure);
    }

    #[tokio::test]
    async fn test_code_escaping_the_wrapper_fails_the_unit() {
        let err = run("}); (function () {").await.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NativeExecutionFailure);
        assert_eq!(err.message, "code must be a function body");
    }

    #[tokio::test]
    async fn test_timers_fire_before_settlement() {
        let code = r#"
            const order = [];
            setTimeout(() => order.push('late'), 20);
            setTimeout(() => order.push('early'), 5);
            setImmediate(() => order.push('now'));
            await new Promise((resolve) => setTimeout(resolve, 30));
            return order.join(',');
        "#;
        assert_eq!(scalar(run(code).await), serde_json::json!("now,early,late"));
    }

    #[tokio::test]
    async fn test_cleared_interval_stops() {
        let code = r#"
            let ticks = 0;
            const id = setInterval(() => { ticks += 1; if (ticks === 3) clearInterval(id); }, 1);
            await new Promise((resolve) => setTimeout(resolve, 20));
            return ticks;
        "#;
        assert_eq!(scalar(run(code).await), serde_json::json!(3));
    }

    #[tokio::test]
    async fn test_never_settling_promise_is_pending() {
        let report = run("await new Promise(() => {});").await;
        assert_eq!(report, UnitReport::Pending);
    }

    #[tokio::test]
    async fn test_disallowed_module_is_capability_denied() {
        let err = run("return require('disallowed-module');").await.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapabilityDenied);
        assert!(err.message.contains("disallowed-module"));
    }

    #[tokio::test]
    async fn test_allowed_modules_load_and_cache() {
        let code = r#"
            const path = require('path');
            const again = require('node:path');
            const greet = require('greeter');
            return { joined: path.join('a', 'b', '../c'), same: path === again, greeting: greet('bob') };
        "#;
        let value = returned(run_with(code, "path", Arc::new(LocalOrchestrator::new())).await);
        assert_eq!(
            value,
            ReturnedValue::Object(
                serde_json::json!({"joined": "a/c", "same": true, "greeting": "hello bob"})
                    .as_object()
                    .cloned()
                    .unwrap()
            )
        );
    }

    #[tokio::test]
    async fn test_host_internals_are_not_visible() {
        let code = r#"
            return [
                typeof __sandbox_load_module,
                typeof __sandbox_rpc,
                typeof __sandbox_items,
                typeof __sandbox_harness,
                typeof __sandbox_timers,
                typeof __sandbox_context,
                Object.getOwnPropertyNames(globalThis).filter((key) => key.startsWith('__sandbox')).length,
                typeof fs,
                typeof TextEncoder,
                typeof Buffer,
                typeof FormData,
            ].join(',');
        "#;
        assert_eq!(
            scalar(run(code).await),
            serde_json::json!(
                "undefined,undefined,undefined,undefined,undefined,undefined,0,undefined,function,function,function"
            )
        );
    }

    #[tokio::test]
    async fn test_replaced_json_and_then_do_not_break_the_report() {
        let code = r#"
            JSON.stringify = () => 1;
            JSON.parse = () => 1;
            Promise.prototype.then = () => { throw new Error('hijacked'); };
            await null;
            return [{ json: { ok: true } }];
        "#;
        assert_eq!(
            returned(run(code).await),
            ReturnedValue::Array(vec![serde_json::json!({"json": {"ok": true}})])
        );
    }

    #[tokio::test]
    async fn test_tampered_report_fails_the_unit() {
        let err = run("Object.prototype.toJSON = () => 1; return [];").await.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NativeExecutionFailure);
        assert!(err.message.starts_with("unreadable execution report"), "{}", err.message);
    }

    #[tokio::test]
    async fn test_out_of_range_timer_delay_fires_after_one_ms() {
        let code = r#"
            const fired = [];
            await new Promise((resolve) => setTimeout(() => { fired.push('inf'); resolve(); }, Infinity));
            await new Promise((resolve) => setTimeout(() => { fired.push('neg'); resolve(); }, -5));
            await new Promise((resolve) => setTimeout(() => { fired.push('nan'); resolve(); }, 'soon'));
            return fired.join(',');
        "#;
        let started = Instant::now();
        assert_eq!(scalar(run(code).await), serde_json::json!("inf,neg,nan"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_to_json_returning_undefined_is_undefined() {
        assert_eq!(
            returned(run("return { toJSON() { return undefined; } };").await),
            ReturnedValue::Undefined
        );
    }

    #[tokio::test]
    async fn test_throwing_getter_on_thrown_value_still_fails_the_unit() {
        let code = r#"
            throw { get message() { throw new Error('nested'); } };
        "#;
        let err = run(code).await.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonErrorThrow);
        assert_eq!(err.message, "Unprintable thrown value");
    }

    #[tokio::test]
    async fn test_text_codec_and_buffer() {
        let code = r#"
            const bytes = new TextEncoder().encode('héllo €');
            const text = new TextDecoder().decode(bytes);
            const b64 = Buffer.from('hello').toString('base64');
            const back = Buffer.from(b64, 'base64').toString();
            const hex = Buffer.from([1, 255]).toString('hex');
            const decoder = new TextDecoderStream();
            const streamed = decoder.transform(bytes.subarray(0, 2)) + decoder.transform(bytes.subarray(2)) + decoder.flush();
            return [bytes.length, text, b64, back, hex, streamed].join('|');
        "#;
        assert_eq!(
            scalar(run(code).await),
            serde_json::json!("10|héllo €|aGVsbG8=|hello|01ff|héllo €")
        );
    }

    #[tokio::test]
    async fn test_form_data() {
        let code = r#"
            const form = new FormData();
            form.append('a', 1);
            form.append('a', 2);
            form.set('b', 'x');
            return [form.getAll('a').join('+'), form.get('b'), form.has('c')].join(',');
        "#;
        assert_eq!(scalar(run(code).await), serde_json::json!("1+2,x,false"));
    }

    #[tokio::test]
    async fn test_console_lines_are_forwarded() {
        let orchestrator = Arc::new(LocalOrchestrator::new());
        run_with(
            "console.log('count', 2, { a: 1 }); console.error(new RangeError('nope')); return null;",
            "",
            orchestrator.clone(),
        )
        .await;

        assert_eq!(
            orchestrator.logged_lines(),
            vec!["count 2 {\"a\":1}".to_string(), "RangeError: nope".to_string()]
        );
    }

    #[tokio::test]
    async fn test_helpers_round_trip() {
        let orchestrator = Arc::new(
            LocalOrchestrator::new()
                .with_rpc_response("helpers.httpRequest", Ok(serde_json::json!({"status": 200}))),
        );
        let code = r#"
            const response = await helpers.httpRequest({ url: 'https://example.com' });
            return response.status;
        "#;
        assert_eq!(
            scalar(run_with(code, "", orchestrator.clone()).await),
            serde_json::json!(200)
        );
        assert_eq!(orchestrator.calls()[0].method, "helpers.httpRequest");
    }

    #[tokio::test]
    async fn test_expression_globals() {
        let code = r#"
            let envError;
            try { $env.HOME; } catch (e) { envError = e.message; }
            return [
                $input.all().length,
                $input.first().json.n,
                $json.n,
                $itemIndex,
                $runIndex,
                $mode,
                $workflow.id,
                $execution.mode,
                envError,
            ].join(',');
        "#;
        assert_eq!(
            scalar(run(code).await),
            serde_json::json!("2,0,0,0,0,manual,wf-1,test,access to env vars denied")
        );
    }
}
