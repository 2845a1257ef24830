//! Context-aware escaping for generated markup.
//!
//! The render step interpolates host identifiers and document payloads into
//! HTML attributes and inline JS string literals. Each destination context
//! has its own escaper; using the wrong one (or none) would let the render
//! step itself become an injection point, independent of the trust level of
//! the stored fields.

/// Escapes a value for interpolation into a double-quoted HTML attribute.
#[must_use]
pub fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes a value for interpolation into a single-quoted JS string literal
/// inside an inline `<script>` block.
///
/// Besides the usual string-literal metacharacters, `<` and `>` are hex
/// escaped so the emitted literal can never form a `</script>` sequence and
/// terminate the surrounding block early, and the JS line separators
/// U+2028/U+2029 are escaped because they are line terminators in source
/// text even inside string literals.
#[must_use]
pub fn escape_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            ch if ch.is_control() => {
                out.push_str(&format!("\\u{:04X}", ch as u32));
            }
            _ => out.push(ch),
        }
    }
    out
}
