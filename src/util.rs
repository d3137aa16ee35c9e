//! Small string helpers used across modules.

/// Remove all whitespace. Used for spacing-insensitive comparisons.
pub fn normalize(s: &str) -> String {
  s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole submitted programs.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert_eq!(trunc_for_log("ab→cd", 3), "ab… (7 bytes total)");
  }

  #[test]
  fn normalize_drops_every_space() {
    assert_eq!(normalize(" if  x :\t"), "ifx:");
  }
}
