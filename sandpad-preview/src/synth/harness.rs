//! Relay snippet shared by every runnable document.
//!
//! Installs `window.__sandpad`, which collects console lines, posts exactly one
//! result message to the parent frame, and mirrors the outcome into the
//! `#sandpad-status` line. The message shape is decoded by [`crate::relay`].

use crate::escape::{escape_html, js_string_literal};
use crate::relay::CHANNEL;
use std::fmt::{self, Write};

const RELAY_JS: &str = r#"(function () {
  var runId = __RUN_ID__;
  var channel = __CHANNEL__;
  var started = performance.now();
  var lines = [];
  var sent = false;

  function fmt(v) {
    if (typeof v === 'string') return v;
    if (v instanceof Error) return String(v);
    try {
      var s = JSON.stringify(v, null, 2);
      return s === undefined ? String(v) : s;
    } catch (e) {
      return String(v);
    }
  }

  function output(text, isErr) {
    var el = document.getElementById('output');
    if (!el) return;
    var row = document.createElement('div');
    row.className = isErr ? 'line err' : 'line';
    row.textContent = text;
    el.appendChild(row);
  }

  function showStatus(msg) {
    var loading = document.getElementById('sandpad-loading');
    if (loading) loading.hidden = true;
    var el = document.getElementById('sandpad-status');
    if (!el) return;
    var ok = msg.status === 'success';
    var text = (ok ? '✓ ' : '✗ ') + msg.status + ' (' + msg.elapsedMs + ' ms)';
    if (msg.exitCode !== undefined && msg.exitCode !== null) text += ' exit code ' + msg.exitCode;
    if (msg.message) text += ': ' + msg.message;
    el.textContent = text;
    el.className = ok ? 'ok' : 'err';
    el.hidden = false;
  }

  function post(msg) {
    if (sent) return;
    sent = true;
    msg.channel = channel;
    msg.runId = runId;
    if (!msg.lines) msg.lines = lines;
    msg.elapsedMs = Math.round(performance.now() - started);
    showStatus(msg);
    try {
      parent.postMessage(msg, '*');
    } catch (e) {}
  }

  var api = {
    runId: runId,
    output: output,
    mark: function () { started = performance.now(); },
    line: function (stream, args) {
      var text = Array.prototype.map.call(args, fmt).join(' ');
      lines.push({ stream: stream, text: text });
      return text;
    },
    captureConsole: function (onLine) {
      ['log', 'info', 'warn', 'error'].forEach(function (m) {
        var original = console[m];
        console[m] = function () {
          var text = api.line(m, arguments);
          if (onLine) onLine(m, text);
          if (original) original.apply(console, arguments);
        };
      });
    },
    finish: function (status, extra) {
      var msg = extra || {};
      msg.status = status;
      post(msg);
    },
    done: function (extra) { api.finish('success', extra); },
    fail: function (status, err, extra) {
      var msg = extra || {};
      msg.message = String((err && err.message) || err);
      api.finish(status, msg);
    },
    infra: function (src) {
      api.finish('infra-error', { message: 'Failed to load runtime script: ' + src });
    }
  };
  window.__sandpad = api;

  window.addEventListener('error', function (ev) {
    if (ev.target && ev.target !== window) return;
    var err = ev.error || ev.message;
    var status = ev.error && ev.error.name === 'SyntaxError' ? 'compile-error' : 'runtime-error';
    api.fail(status, err);
  });
  window.addEventListener('unhandledrejection', function (ev) {
    api.fail('runtime-error', ev.reason);
  });
})();"#;

/// The relay `<script>` block, bound to `run_id` (or `null`).
pub(crate) fn relay_script(out: &mut String, run_id: Option<&str>) -> fmt::Result {
    let run_id = run_id.map_or_else(|| "null".to_string(), js_string_literal);
    let js = RELAY_JS
        .replace("__RUN_ID__", &run_id)
        .replace("__CHANNEL__", &js_string_literal(CHANNEL));
    writeln!(out, "<script>\n{}\n</script>", js)
}

/// A CDN `<script>` tag that reports `infra-error` when it fails to load.
pub(crate) fn cdn_script(out: &mut String, url: &str) -> fmt::Result {
    let handler = format!("__sandpad.infra({})", js_string_literal(url));
    writeln!(
        out,
        "<script src=\"{}\" onerror=\"{}\"></script>",
        escape_html(url),
        escape_html(&handler)
    )
}

/// Status line plus an optional "loading runtime" indicator.
pub(crate) fn status_markup(out: &mut String, loading: bool) -> fmt::Result {
    if loading {
        writeln!(out, "<div id=\"sandpad-loading\">Loading runtime\u{2026}</div>")?;
    }
    writeln!(out, "<div id=\"sandpad-status\" hidden></div>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_binds_run_id() {
        let mut out = String::new();
        relay_script(&mut out, Some("run-7")).unwrap();
        assert!(out.contains("var runId = \"run-7\";"));
        assert!(out.contains("var channel = \"sandpad\";"));
        assert!(!out.contains("__RUN_ID__"));

        let mut out = String::new();
        relay_script(&mut out, None).unwrap();
        assert!(out.contains("var runId = null;"));
    }

    #[test]
    fn cdn_tag_reports_infra_error() {
        let mut out = String::new();
        cdn_script(&mut out, "https://cdn/x.js?a=1&b=2").unwrap();
        assert_eq!(
            out,
            "<script src=\"https://cdn/x.js?a=1&amp;b=2\" onerror=\"__sandpad.infra(&quot;https://cdn/x.js?a=1&amp;b=2&quot;)\"></script>\n"
        );
    }
}
