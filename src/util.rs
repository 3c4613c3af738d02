//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Case-insensitive, whitespace-trimmed form used for exact-repeat comparisons.
pub fn normalize_question(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Log-safe truncation for large strings (char-boundary aware).
/// Keeps raw model output from flooding the logs.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_keys() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn fill_template_leaves_unknown_placeholders() {
    assert_eq!(fill_template("{{\"k\": 1}} {c}", &[("a", "x")]), "{{\"k\": 1}} {c}");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "ééééé";
    let out = trunc_for_log(s, 3);
    assert!(out.starts_with('é'));
    assert!(out.contains("10 bytes total"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }

  #[test]
  fn normalize_question_ignores_case_and_edges() {
    assert_eq!(normalize_question("  What IS a List?  "), "what is a list?");
  }
}
