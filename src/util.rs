//! Small text helpers shared by generation and the builder.

/// Replaces `{key}` placeholders in `tpl`. Values are inserted verbatim, so a value that itself
/// contains `{other}` is not expanded again by a later pair.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let replaced = after.find('}').and_then(|close| {
      let key = &after[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (close, *v))
    });
    match replaced {
      Some((close, value)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// The first `max` characters of `s` (not bytes).
pub fn take_chars(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

/// Models like to wrap JSON in a ```json fence; return the inner text if so.
pub fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(inner) = t.strip_prefix("```") else { return t };
  let inner = inner.split_once('\n').map(|(_, body)| body).unwrap_or("");
  inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}
