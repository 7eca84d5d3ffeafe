//! Log helpers for APRS-IS traffic: server lines and packets stay on one log line,
//! and login credentials never reach the log.

/// APRS-IS caps a line at 512 bytes; anything longer is a runaway banner.
const MAX_PREVIEW: usize = 512;

/// Escape `s` for single-line logging.
///
/// CR, LF, tab and backslash become `\r`, `\n`, `\t`, `\\`; other control characters
/// become `\xNN`. Output past [`MAX_PREVIEW`] characters is cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    let mut chars = s.chars();
    for ch in chars.by_ref().take(MAX_PREVIEW) {
        push_escaped(&mut out, ch);
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
        c => out.push(c),
    }
}

/// Mask the passcode in a `user CALL pass NNNNN vers ...` login line.
///
/// Lines that are not login lines are only escaped.
pub fn redact_login(line: &str) -> String {
    let mut words: Vec<&str> = line.trim_end().split(' ').collect();
    if words.first() == Some(&"user") {
        if let Some(i) = words.iter().position(|w| *w == "pass") {
            if let Some(code) = words.get_mut(i + 1) {
                *code = "****";
            }
        }
    }
    escape_log(&words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_server_lines() {
        let s = "# aprsc 2.1.14\r\n# logresp N0CALL unverified\r\n";
        assert_eq!(
            escape_log(s),
            "# aprsc 2.1.14\\r\\n# logresp N0CALL unverified\\r\\n"
        );
        assert_eq!(escape_log("a\u{7}b\\"), "a\\x07b\\\\");
    }

    #[test]
    fn truncates_runaway_text() {
        let esc = escape_log(&"x".repeat(600));
        assert_eq!(esc.chars().count(), 513);
        assert!(esc.ends_with('…'));
        assert_eq!(escape_log(&"x".repeat(512)).chars().count(), 512);
    }

    #[test]
    fn login_passcode_is_masked() {
        assert_eq!(
            redact_login("user N0CALL pass 13023 vers NodeAPRS 1.0\r\n"),
            "user N0CALL pass **** vers NodeAPRS 1.0"
        );
        assert_eq!(redact_login("N0CALL>APRS:>pass 1"), "N0CALL>APRS:>pass 1");
    }
}
