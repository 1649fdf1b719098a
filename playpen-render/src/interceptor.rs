//! Console interceptor injected ahead of the user script
//!
//! The interceptor replaces `console.log` and `console.error` inside the
//! isolated context so that every call is posted to the host as
//! `{ type, data }`. The original entry points stay reachable as
//! `console.originalLog` / `console.originalError`.
//!
//! Log arguments go through `JSON.stringify`; error arguments are only
//! converted with `String(...)`, since error objects do not survive JSON
//! serialization. Neither path may throw.

/// Script text of the interceptor
pub const INTERCEPTOR_SOURCE: &str = r#"
console.originalLog = console.log;
console.originalError = console.error;
(function () {
  var describe = function (arg) {
    try {
      return String(arg);
    } catch (_) {
      return '[unserializable]';
    }
  };
  var serialize = function (arg) {
    try {
      var json = JSON.stringify(arg);
      if (typeof json === 'string') {
        return json;
      }
    } catch (_) {}
    return describe(arg);
  };
  var post = function (type, data) {
    try {
      window.parent.postMessage({ type: type, data: data }, '*');
    } catch (_) {}
  };
  console.log = function () {
    post('console', Array.prototype.slice.call(arguments).map(serialize));
  };
  console.error = function () {
    post('console_error', Array.prototype.slice.call(arguments).map(describe));
  };
})();
"#;
