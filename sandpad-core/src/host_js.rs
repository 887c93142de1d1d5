//! JavaScript run on the host thread.
//!
//! Every run gets a fresh engine context. `console` and `prompt` are bound to
//! the run's [`ExecutionContext`] instead of patching anything global, so runs
//! are isolated and there is nothing to restore afterwards.

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::script::Script;
use boa_engine::{js_string, Context, JsError, JsResult, JsString, JsValue, NativeFunction, Source};
use boa_gc::{Finalize, Trace};
use sandpad_preview::{CapturedLine, ExecutionResult, RunStatus, Stream};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Receives console lines as they are produced.
pub trait OutputSink {
    fn line(&mut self, line: &CapturedLine);
}

/// Sink that keeps every line; clones share the buffer.
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    lines: Arc<Mutex<Vec<CapturedLine>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl OutputSink for CaptureBuffer {
    fn line(&mut self, line: &CapturedLine) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.clone());
    }
}

/// Lines handed out one per `prompt()` call; `null` once exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdinLines {
    lines: VecDeque<String>,
}

impl StdinLines {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

pub struct ExecutionContext {
    pub sink: Box<dyn OutputSink>,
    pub stdin: StdinLines,
}

impl ExecutionContext {
    pub fn new(sink: impl OutputSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stdin: StdinLines::default(),
        }
    }

    pub fn with_stdin(mut self, stdin: StdinLines) -> Self {
        self.stdin = stdin;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub loop_iteration_limit: u64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 1_000_000,
        }
    }
}

struct Recorder {
    exec: ExecutionContext,
    lines: Vec<CapturedLine>,
}

impl Recorder {
    fn push(&mut self, stream: Stream, text: String) {
        let line = CapturedLine::new(stream, text);
        self.exec.sink.line(&line);
        self.lines.push(line);
    }
}

pub fn run_javascript(code: &str, exec: ExecutionContext, limits: RunLimits) -> ExecutionResult {
    let started = Instant::now();
    let recorder = Rc::new(RefCell::new(Recorder {
        exec,
        lines: Vec::new(),
    }));

    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(limits.loop_iteration_limit);
    if let Err(e) = install_globals(&mut context, &recorder) {
        return ExecutionResult::infra_error(format!("Cannot prepare JavaScript context: {}", e));
    }

    let outcome = match Script::parse(Source::from_bytes(code), None, &mut context) {
        Err(e) => Err((RunStatus::CompileError, describe_error(&e, &mut context))),
        Ok(script) => match script.evaluate(&mut context) {
            Ok(value) => {
                let _ = context.run_jobs();
                Ok(value)
            }
            Err(e) => Err((RunStatus::RuntimeError, describe_error(&e, &mut context))),
        },
    };

    let value = match &outcome {
        Ok(v) if !v.is_undefined() => Some(format_value(v, &mut context)),
        _ => None,
    };
    if let Err((_, message)) = &outcome {
        recorder.borrow_mut().push(Stream::Error, message.clone());
    }
    let lines = std::mem::take(&mut recorder.borrow_mut().lines);
    let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0).round() as u64;

    match outcome {
        Ok(_) => ExecutionResult::success(lines)
            .with_value(value)
            .with_elapsed(elapsed_ms),
        Err((status, message)) => ExecutionResult {
            lines,
            message: Some(message),
            ..ExecutionResult::new(status)
        }
        .with_elapsed(elapsed_ms),
    }
}

fn install_globals(context: &mut Context, recorder: &Rc<RefCell<Recorder>>) -> JsResult<()> {
    let console = ObjectInitializer::new(context)
        .function(console_method(recorder.clone(), Stream::Log), js_string!("log"), 0)
        .function(console_method(recorder.clone(), Stream::Info), js_string!("info"), 0)
        .function(console_method(recorder.clone(), Stream::Warn), js_string!("warn"), 0)
        .function(console_method(recorder.clone(), Stream::Error), js_string!("error"), 0)
        .build();
    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    context.register_global_callable(js_string!("prompt"), 0, prompt_function(recorder.clone()))?;
    Ok(())
}

/// What a native function needs from the run. Holds no engine values, so
/// the collector has nothing to trace.
#[derive(Clone, Trace, Finalize)]
struct Binding {
    #[unsafe_ignore_trace]
    recorder: Rc<RefCell<Recorder>>,
    #[unsafe_ignore_trace]
    stream: Stream,
}

fn console_method(recorder: Rc<RefCell<Recorder>>, stream: Stream) -> NativeFunction {
    NativeFunction::from_copy_closure_with_captures(
        |_this, args, binding: &Binding, context| {
            let text = args
                .iter()
                .map(|a| format_value(a, context))
                .collect::<Vec<_>>()
                .join(" ");
            binding.recorder.borrow_mut().push(binding.stream, text);
            Ok(JsValue::undefined())
        },
        Binding { recorder, stream },
    )
}

fn prompt_function(recorder: Rc<RefCell<Recorder>>) -> NativeFunction {
    NativeFunction::from_copy_closure_with_captures(
        |_this, _args, binding: &Binding, _context| {
            let line = binding.recorder.borrow_mut().exec.stdin.next_line();
            Ok(line.map_or(JsValue::null(), |l| JsValue::from(JsString::from(l.as_str()))))
        },
        Binding {
            recorder,
            stream: Stream::Stdout,
        },
    )
}

/// Strings verbatim; errors as `Name: message`; everything else as 2-space
/// JSON when it serializes, else its string conversion.
fn format_value(value: &JsValue, context: &mut Context) -> String {
    if let Some(s) = value.as_string() {
        return s.to_std_string_escaped();
    }
    // Numbers use JS formatting (`21`, not `21.0`).
    if value.is_undefined() || value.is_number() || value.is_symbol() || value.is_callable() {
        return display(value, context);
    }
    if value.is_object() {
        if let Ok(native) = JsError::from_opaque(value.clone()).try_native(context) {
            return native.to_string();
        }
    }
    match value.to_json(context) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| display(value, context)),
        Err(_) => display(value, context),
    }
}

fn display(value: &JsValue, context: &mut Context) -> String {
    value
        .to_string(context)
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|_| value.display().to_string())
}

fn describe_error(err: &JsError, context: &mut Context) -> String {
    match err.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => match err.as_opaque() {
            Some(value) => format_value(value, context),
            None => err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(code: &str) -> (ExecutionResult, CaptureBuffer) {
        let sink = CaptureBuffer::new();
        let result = run_javascript(code, ExecutionContext::new(sink.clone()), RunLimits::default());
        (result, sink)
    }

    #[test]
    fn console_lines_are_captured_in_order() {
        let (result, sink) = run("console.log('a', 1); console.warn('w'); console.error('e');");
        assert!(result.is_success());
        let texts: Vec<_> = result.lines.iter().map(|l| (l.stream, l.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![(Stream::Log, "a 1"), (Stream::Warn, "w"), (Stream::Error, "e")]
        );
        assert_eq!(sink.lines(), result.lines);
    }

    #[test]
    fn objects_are_pretty_json() {
        let (result, _) = run("console.log({ a: 1, b: [true] });");
        assert_eq!(
            result.lines_of(Stream::Log),
            vec!["{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}"]
        );
    }

    #[test]
    fn final_value_is_recorded() {
        let (result, _) = run("const x = 20; x + 1");
        assert_eq!(result.value.as_deref(), Some("21"));
        assert_eq!(result.lines_of(Stream::Result), vec!["21"]);

        let (result, _) = run("let y = 1;");
        assert_eq!(result.value, None);
    }

    #[test]
    fn syntax_error_is_compile_error() {
        let (result, _) = run("const = ;");
        assert_eq!(result.status, RunStatus::CompileError);
        assert!(result.message.unwrap().contains("SyntaxError"));
    }

    #[test]
    fn thrown_error_is_runtime_error() {
        let (result, _) = run("console.log('before'); null.x;");
        assert_eq!(result.status, RunStatus::RuntimeError);
        assert_eq!(result.lines_of(Stream::Log), vec!["before"]);
        assert!(result.message.as_deref().unwrap().contains("TypeError"));
    }

    #[test]
    fn runaway_loop_hits_limit() {
        let result = run_javascript(
            "while (true) {}",
            ExecutionContext::new(CaptureBuffer::new()),
            RunLimits {
                loop_iteration_limit: 1_000,
            },
        );
        assert_eq!(result.status, RunStatus::RuntimeError);
    }

    #[test]
    fn prompt_reads_stdin_lines() {
        let exec = ExecutionContext::new(CaptureBuffer::new()).with_stdin(StdinLines::from_text("5\n7\n"));
        let result = run_javascript(
            "const a = Number(prompt()); const b = Number(prompt()); console.log(a * b, prompt());",
            exec,
            RunLimits::default(),
        );
        assert_eq!(result.lines_of(Stream::Log), vec!["35 null"]);
    }

    #[test]
    fn bound_console_outlives_collections() {
        let (result, _) = run(
            "let keep = [];\n\
             for (let i = 0; i < 20000; i++) { keep.push({ i }); if (keep.length > 50) keep = []; }\n\
             console.info('still bound', prompt());",
        );
        assert!(result.is_success());
        assert_eq!(result.lines_of(Stream::Info), vec!["still bound null"]);
    }

    #[test]
    fn runs_do_not_share_globals() {
        let (first, _) = run("globalThis.leak = 1; console.log = null;");
        assert!(first.is_success());
        let (second, _) = run("console.log(typeof leak)");
        assert_eq!(second.lines_of(Stream::Log), vec!["undefined"]);
    }
}
