// Structural queries over the facility's server-rendered markup.
//
// The site ships no machine-readable API; everything the decoders need lives
// in nested div soup. This module gives them just enough of a query surface:
// find by tag and class, find by id, attribute and class access, trimmed
// text. It is a linear scanner, not a DOM: elements are located by matching
// open tags and balancing same-name close tags, which is all the documented
// markup shapes require.

/// Tags that never have content or a close tag.
const VOID_TAGS: [&str; 6] = ["img", "br", "hr", "input", "meta", "link"];

/// One located element: its attributes and raw inner markup.
#[derive(Debug, Clone)]
pub struct Element<'a> {
    tag: String,
    attrs: Vec<(String, String)>,
    inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value by case-insensitive name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| *c == class)
    }

    /// Raw markup between the open and close tags.
    pub fn inner(&self) -> &'a str {
        self.inner
    }

    /// Inner text with tags stripped, entities decoded, whitespace collapsed.
    pub fn text(&self) -> String {
        strip_tags(self.inner)
    }
}

/// All elements of `tag` (optionally restricted to a class) in document
/// order, including nested occurrences.
pub fn find_all<'a>(html: &'a str, tag: &str, class: Option<&str>) -> Vec<Element<'a>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(token) = next_tag(html, pos, Some(tag)) {
        pos = token.content_start;
        if token.closing {
            continue;
        }
        let element = materialize(html, token);
        if class.map_or(true, |c| element.has_class(c)) {
            out.push(element);
        }
    }
    out
}

/// First matching element, if any.
pub fn find_first<'a>(html: &'a str, tag: &str, class: Option<&str>) -> Option<Element<'a>> {
    let mut pos = 0;
    while let Some(token) = next_tag(html, pos, Some(tag)) {
        pos = token.content_start;
        if token.closing {
            continue;
        }
        let element = materialize(html, token);
        if class.map_or(true, |c| element.has_class(c)) {
            return Some(element);
        }
    }
    None
}

/// First element of any tag whose id attribute equals `id`.
pub fn find_by_id<'a>(html: &'a str, id: &str) -> Option<Element<'a>> {
    let mut pos = 0;
    while let Some(token) = next_tag(html, pos, None) {
        pos = token.content_start;
        if token.closing {
            continue;
        }
        if token.attrs.iter().any(|(n, v)| n == "id" && v == id) {
            return Some(materialize(html, token));
        }
    }
    None
}

/// Pixel height from an inline style declaration, e.g.
/// `"height: 82px; top: 0"` -> `Some(82.0)`. Only the `height` property
/// itself matches; `max-height`, `line-height` and friends do not.
pub fn style_height_px(style: &str) -> Option<f64> {
    let lower = style.to_ascii_lowercase();
    let mut from = 0;
    while let Some(offset) = lower[from..].find("height") {
        let at = from + offset;
        from = at + "height".len();
        // Must start its own declaration, not end max-height etc.
        let at_boundary = lower[..at]
            .chars()
            .next_back()
            .map_or(true, |c| c == ';' || c.is_whitespace());
        if !at_boundary {
            continue;
        }
        let rest = lower[from..].trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            continue;
        };
        let rest = rest.trim_start();
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if digits.is_empty() || !rest[digits.len()..].trim_start().starts_with("px") {
            continue;
        }
        return digits.parse().ok();
    }
    None
}

/// Tag-stripped text with entities decoded and whitespace collapsed.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// Scanner internals.

struct TagToken {
    name: String,
    attrs: Vec<(String, String)>,
    closing: bool,
    self_closing: bool,
    /// Byte offset of the `<`.
    start: usize,
    /// Byte offset just past the `>`.
    content_start: usize,
}

/// Next tag at or after `from`, optionally restricted to one tag name.
fn next_tag(html: &str, from: usize, name: Option<&str>) -> Option<TagToken> {
    let bytes = html.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        let lt = html[pos..].find('<')? + pos;
        match parse_tag_at(html, lt) {
            Some(token) => {
                if name.map_or(true, |n| token.name.eq_ignore_ascii_case(n)) {
                    return Some(token);
                }
                pos = token.content_start;
            }
            None => pos = lt + 1,
        }
    }
    None
}

/// Parse the tag starting at byte offset `lt` (which must point at `<`).
/// Returns `None` for things that are not tags, e.g. a bare `<` in text.
fn parse_tag_at(html: &str, lt: usize) -> Option<TagToken> {
    let bytes = html.as_bytes();
    let mut i = lt + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = html[name_start..i].to_ascii_lowercase();

    // Scan to the closing '>' respecting quoted attribute values.
    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                self_closing = true;
                i += 1;
            }
            Some(_) if closing => {
                // Close tags carry no attributes; skip to '>'.
                i += 1;
            }
            Some(_) => {
                let (attr, next) = parse_attr(html, i)?;
                if let Some(attr) = attr {
                    attrs.push(attr);
                }
                i = next;
            }
        }
    }

    Some(TagToken {
        name,
        attrs,
        closing,
        self_closing,
        start: lt,
        content_start: i,
    })
}

/// Parse one `name` or `name="value"` attribute starting at `i`.
fn parse_attr(html: &str, i: usize) -> Option<(Option<(String, String)>, usize)> {
    let bytes = html.as_bytes();
    let name_start = i;
    let mut i = i;
    while i < bytes.len() && !matches!(bytes[i], b'=' | b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r')
    {
        i += 1;
    }
    if i == name_start {
        // Stray byte; consume it so the caller makes progress.
        return Some((None, i + 1));
    }
    let name = html[name_start..i].to_ascii_lowercase();
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'=') {
        return Some((Some((name, String::new())), i));
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    match bytes.get(i) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let value_start = i + 1;
            let end = html[value_start..].find(q as char)? + value_start;
            Some((Some((name, html[value_start..end].to_string())), end + 1))
        }
        _ => {
            let value_start = i;
            while i < bytes.len() && !matches!(bytes[i], b'>' | b' ' | b'\t' | b'\n' | b'\r') {
                i += 1;
            }
            Some((Some((name, html[value_start..i].to_string())), i))
        }
    }
}

/// Build an `Element` from an open tag token by locating its close tag.
fn materialize<'a>(html: &'a str, token: TagToken) -> Element<'a> {
    let inner = if token.self_closing || VOID_TAGS.contains(&token.name.as_str()) {
        &html[token.content_start..token.content_start]
    } else {
        let end = matching_close(html, &token.name, token.content_start);
        &html[token.content_start..end]
    };
    Element {
        tag: token.name,
        attrs: token.attrs,
        inner,
    }
}

/// Offset of the close tag balancing an open tag whose content starts at
/// `content_start`. Unbalanced markup swallows the rest of the document.
fn matching_close(html: &str, name: &str, content_start: usize) -> usize {
    let mut depth = 1usize;
    let mut pos = content_start;
    while let Some(token) = next_tag(html, pos, Some(name)) {
        pos = token.content_start;
        if token.closing {
            depth -= 1;
            if depth == 0 {
                return token.start;
            }
        } else if !token.self_closing && !VOID_TAGS.contains(&name) {
            depth += 1;
        }
    }
    html.len()
}
