//! Safe-HTML filtering for component markup.
//!
//! Deployment payloads originate from a semi-trusted automation and are
//! rendered in front of anonymous visitors, so stored markup is reduced to a
//! safe-HTML subset mirroring a "safe post content" allow-list: common
//! structural, formatting and media tags survive with a vetted attribute
//! set; everything else is stripped. Filtering is total: malformed or
//! hostile markup degrades to less markup, never to a rejected request.
//!
//! Style and script payloads are deliberately not inspected here. Their
//! trust level is governed entirely by the capability policy; content
//! inspection of opaque code buys nothing once the policy has spoken.
//!
//! # Filtering rules
//!
//! - Allow-listed tags keep their allow-listed attributes; all other
//!   attributes are dropped.
//! - `script`, `style` and other content-swallowing containers are removed
//!   together with their contents.
//! - Unknown tags are stripped but their children survive.
//! - Inline `on*` event handlers are always dropped.
//! - URL attributes with a scriptable scheme (`javascript:`, `vbscript:`,
//!   `data:`), including numeric-entity obfuscations of one, are dropped.
//! - Comments, doctypes and processing instructions are removed.
//! - A `<` that does not open a tag is escaped to `&lt;`.

/// Attributes permitted on every allow-listed tag. Sorted.
const GLOBAL_ATTRS: &[&str] = &[
    "align", "class", "dir", "id", "lang", "role", "style", "title",
];

/// Allow-listed tags with their tag-specific attributes. Sorted by tag.
const ALLOWED_TAGS: &[(&str, &[&str])] = &[
    ("a", &["href", "name", "rel", "rev", "target"]),
    ("abbr", &[]),
    ("address", &[]),
    ("audio", &["autoplay", "controls", "loop", "muted", "preload", "src"]),
    ("b", &[]),
    ("blockquote", &["cite"]),
    ("br", &[]),
    ("caption", &[]),
    ("cite", &[]),
    ("code", &[]),
    ("col", &["span", "width"]),
    ("colgroup", &["span", "width"]),
    ("dd", &[]),
    ("del", &["cite", "datetime"]),
    ("details", &["open"]),
    ("dfn", &[]),
    ("div", &[]),
    ("dl", &[]),
    ("dt", &[]),
    ("em", &[]),
    ("figcaption", &[]),
    ("figure", &[]),
    ("footer", &[]),
    ("h1", &[]),
    ("h2", &[]),
    ("h3", &[]),
    ("h4", &[]),
    ("h5", &[]),
    ("h6", &[]),
    ("header", &[]),
    ("hr", &[]),
    ("i", &[]),
    ("img", &["alt", "height", "loading", "src", "srcset", "width"]),
    ("ins", &["cite", "datetime"]),
    ("kbd", &[]),
    ("label", &["for"]),
    ("li", &["value"]),
    ("main", &[]),
    ("mark", &[]),
    ("nav", &[]),
    ("ol", &["reversed", "start", "type"]),
    ("p", &[]),
    ("pre", &[]),
    ("q", &["cite"]),
    ("s", &[]),
    ("section", &[]),
    ("small", &[]),
    ("source", &["media", "sizes", "src", "srcset", "type"]),
    ("span", &[]),
    ("strong", &[]),
    ("sub", &[]),
    ("summary", &[]),
    ("sup", &[]),
    ("table", &["border", "cellpadding", "cellspacing", "summary"]),
    ("tbody", &[]),
    ("td", &["colspan", "headers", "rowspan"]),
    ("tfoot", &[]),
    ("th", &["colspan", "headers", "rowspan", "scope"]),
    ("thead", &[]),
    ("tr", &[]),
    ("track", &["default", "kind", "label", "src", "srclang"]),
    ("u", &[]),
    ("ul", &["type"]),
    (
        "video",
        &[
            "autoplay", "controls", "height", "loop", "muted", "poster", "preload", "src",
            "width",
        ],
    ),
];

/// Tags removed together with their entire contents. Sorted.
const DROPPED_SUBTREES: &[&str] = &[
    "applet", "embed", "iframe", "noscript", "object", "script", "style", "template",
    "textarea",
];

/// Attributes whose values are URLs and must pass the scheme check. Sorted.
const URL_ATTRS: &[&str] = &["cite", "formaction", "href", "poster", "src"];

/// URL schemes permitted in URL attributes; scheme-less (relative) URLs are
/// always permitted.
const ALLOWED_SCHEMES: &[&str] = &["ftp", "ftps", "http", "https", "mailto", "tel"];

/// Reduces an HTML fragment to the safe-HTML subset.
///
/// Total over arbitrary input; never fails. The output contains only
/// allow-listed tags and attributes, with script-bearing constructs
/// removed.
#[must_use]
pub fn sanitize_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let consumed = filter_tag(rest, &mut out);
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Consumes one `<`-initiated construct from the head of `rest`, emitting
/// whatever survives filtering into `out`. Returns the number of bytes
/// consumed (always at least one).
fn filter_tag(rest: &str, out: &mut String) -> usize {
    let bytes = rest.as_bytes();
    debug_assert_eq!(bytes[0], b'<');

    // Comments, doctypes, processing instructions: removed outright.
    if rest.starts_with("<!--") {
        return rest.find("-->").map_or(rest.len(), |end| end + 3);
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        return rest.find('>').map_or(rest.len(), |end| end + 1);
    }

    if rest.starts_with("</") {
        return filter_closing_tag(rest, out);
    }

    if bytes.len() > 1 && bytes[1].is_ascii_alphabetic() {
        return filter_open_tag(rest, out);
    }

    // A bare `<` that opens nothing.
    out.push_str("&lt;");
    1
}

fn filter_closing_tag(rest: &str, out: &mut String) -> usize {
    let name_end = rest[2..]
        .find(|c: char| !c.is_ascii_alphanumeric())
        .map_or(rest.len(), |off| 2 + off);
    let name = rest[2..name_end].to_ascii_lowercase();
    let consumed = rest.find('>').map_or(rest.len(), |end| end + 1);
    if !name.is_empty() && allowed_attrs(&name).is_some() {
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
    consumed
}

fn filter_open_tag(rest: &str, out: &mut String) -> usize {
    let Some(tag) = parse_open_tag(rest) else {
        // No terminating `>`: the dangling tag fragment is dropped.
        return rest.len();
    };

    if DROPPED_SUBTREES.binary_search(&tag.name.as_str()).is_ok() {
        if tag.self_closing {
            return tag.consumed;
        }
        return skip_subtree(rest, &tag.name, tag.consumed);
    }

    let Some(tag_attrs) = allowed_attrs(&tag.name) else {
        // Unknown tag: strip the tag, keep its children.
        return tag.consumed;
    };

    out.push('<');
    out.push_str(&tag.name);
    for (name, value) in &tag.attrs {
        emit_attr(out, tag_attrs, name, value.as_deref());
    }
    if tag.self_closing {
        out.push_str(" />");
    } else {
        out.push('>');
    }
    tag.consumed
}

/// Skips past the matching close tag of a content-swallowing element,
/// dropping everything in between. Without a close tag the remainder of the
/// input is dropped.
fn skip_subtree(rest: &str, name: &str, from: usize) -> usize {
    let needle = format!("</{name}");
    let Some(close) = find_ignore_case(&rest[from..], &needle) else {
        return rest.len();
    };
    let after = from + close + needle.len();
    rest[after..]
        .find('>')
        .map_or(rest.len(), |end| after + end + 1)
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

struct ParsedTag {
    name: String,
    attrs: Vec<(String, Option<String>)>,
    self_closing: bool,
    consumed: usize,
}

/// Parses `<name attr="value" ...>` from the head of `rest`. Returns `None`
/// when the tag never terminates (unterminated tag or attribute quote).
fn parse_open_tag(rest: &str) -> Option<ParsedTag> {
    let bytes = rest.as_bytes();
    let mut i = 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = rest[1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        match bytes[i] {
            b'>' => {
                return Some(ParsedTag {
                    name,
                    attrs,
                    self_closing: false,
                    consumed: i + 1,
                });
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'>' => {
                return Some(ParsedTag {
                    name,
                    attrs,
                    self_closing: true,
                    consumed: i + 2,
                });
            }
            _ => {
                let (attr, next) = parse_attr(rest, i)?;
                if let Some(attr) = attr {
                    attrs.push(attr);
                }
                // Guarantee forward progress on degenerate input.
                i = next.max(i + 1);
            }
        }
    }
}

type Attr = (String, Option<String>);

/// Parses one attribute starting at byte `i`. Returns the attribute (or
/// `None` for a stray character) and the index to resume from; `None`
/// overall when a quoted value never terminates.
fn parse_attr(rest: &str, mut i: usize) -> Option<(Option<Attr>, usize)> {
    let bytes = rest.as_bytes();
    let start = i;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_' | b':'))
    {
        i += 1;
    }
    if i == start {
        // Not an attribute name; skip the stray byte.
        return Some((None, i + 1));
    }
    let name = rest[start..i].to_ascii_lowercase();

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'=' {
        return Some((Some((name, None)), i));
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }

    let value = match bytes[i] {
        quote @ (b'"' | b'\'') => {
            i += 1;
            let end = rest[i..].find(quote as char)?;
            let value = rest[i..i + end].to_string();
            i += end + 1;
            value
        }
        _ => {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                i += 1;
            }
            rest[start..i].to_string()
        }
    };
    Some((Some((name, Some(value))), i))
}

/// Returns the tag-specific attribute allow-list for `name`, or `None` when
/// the tag itself is not allowed.
fn allowed_attrs(name: &str) -> Option<&'static [&'static str]> {
    ALLOWED_TAGS
        .binary_search_by(|(tag, _)| (*tag).cmp(name))
        .ok()
        .map(|idx| ALLOWED_TAGS[idx].1)
}

fn emit_attr(out: &mut String, tag_attrs: &[&str], name: &str, value: Option<&str>) {
    // Event handlers never survive, regardless of allow-lists.
    if name.starts_with("on") {
        return;
    }
    let allowed = GLOBAL_ATTRS.binary_search(&name).is_ok()
        || tag_attrs.contains(&name)
        || name.starts_with("data-")
        || name.starts_with("aria-");
    if !allowed {
        return;
    }

    if URL_ATTRS.binary_search(&name).is_ok() {
        match value {
            Some(url) if is_safe_url(url) => {}
            _ => return,
        }
    }
    if name == "style" && !value.is_none_or(is_safe_inline_style) {
        return;
    }

    out.push(' ');
    out.push_str(name);
    if let Some(value) = value {
        out.push_str("=\"");
        for ch in value.chars() {
            match ch {
                '"' => out.push_str("&quot;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(ch),
            }
        }
        out.push('"');
    }
}

/// Scheme check for URL attribute values.
///
/// The value is decoded (numeric and a small set of named character
/// references) and stripped of whitespace/control characters before the
/// scheme is examined, so `jav&#97;script:` and `java\tscript:` obfuscations
/// do not slip through. Relative URLs pass.
fn is_safe_url(value: &str) -> bool {
    let cleaned = decode_for_scheme_check(value);
    for (i, ch) in cleaned.char_indices() {
        match ch {
            ':' => {
                let scheme = &cleaned[..i];
                return ALLOWED_SCHEMES.binary_search(&scheme).is_ok();
            }
            // Anything of these before a `:` means no scheme.
            '/' | '?' | '#' => return true,
            _ => {}
        }
    }
    true
}

/// Lowercases and strips whitespace/control characters, decoding character
/// references that could hide a scheme separator.
fn decode_for_scheme_check(value: &str) -> String {
    let mut cleaned = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        push_cleaned(&mut cleaned, &rest[..pos]);
        rest = &rest[pos..];
        let (decoded, consumed) = decode_entity(rest);
        match decoded {
            Some(ch) => {
                if !ch.is_whitespace() && !ch.is_control() {
                    cleaned.extend(ch.to_lowercase());
                }
            }
            None => cleaned.push('&'),
        }
        rest = &rest[consumed..];
    }
    push_cleaned(&mut cleaned, rest);
    cleaned
}

fn push_cleaned(cleaned: &mut String, chunk: &str) {
    for ch in chunk.chars() {
        if !ch.is_whitespace() && !ch.is_control() {
            cleaned.extend(ch.to_lowercase());
        }
    }
}

/// Decodes one character reference at the head of `rest` (which starts with
/// `&`). Returns the decoded character, if any, and the bytes consumed.
fn decode_entity(rest: &str) -> (Option<char>, usize) {
    let Some(semi) = rest[1..].find(';').map(|off| off + 1) else {
        return (None, 1);
    };
    if semi > 12 {
        // Too long for any reference we care about.
        return (None, 1);
    }
    let body = &rest[1..semi];
    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match body.to_ascii_lowercase().as_str() {
            "colon" => Some(':'),
            "sol" => Some('/'),
            "tab" => Some('\t'),
            "newline" => Some('\n'),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => None,
        }
    };
    match decoded {
        Some(ch) => (Some(ch), semi + 1),
        None => (None, 1),
    }
}

/// Coarse filter for inline `style` attribute values: anything that could
/// reach script execution or remote fetch drops the attribute.
fn is_safe_inline_style(value: &str) -> bool {
    let folded: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    !(folded.contains("expression(")
        || folded.contains("javascript:")
        || folded.contains("behavior:")
        || folded.contains("url("))
}
