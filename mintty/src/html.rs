//! Escaping and allowlist sanitizing for markup built from block values.

/// Escape for a text position.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape for a quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline formatting tags kept by [`sanitize`].
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "br", "code", "del", "em", "i", "mark", "p", "s", "small", "span", "strong", "sub",
    "sup", "u",
];

const VOID_TAGS: &[&str] = &["br"];

const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:"];

/// Clean user-authored HTML for interpolation into a text position.
///
/// Allowed tags are re-emitted in normalized form with their attributes
/// stripped, except `href` (safe schemes or relative) and `title` on links.
/// Every other tag is escaped so it shows as text. Comments are dropped.
///
/// The output is balanced: closing tags with no matching open tag are
/// dropped, a closing tag also closes anything opened inside it, and
/// whatever is still open at the end is closed there.
pub fn sanitize(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut open: Vec<String> = Vec::new();
    let mut rest = html;
    while let Some(lt) = rest.find('<') {
        push_text(&mut out, &rest[..lt]);
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }

        match parse_tag(rest) {
            Some((tag, consumed)) => {
                if ALLOWED_TAGS.contains(&tag.name.as_str()) {
                    push_tag(&mut out, &mut open, &tag);
                } else {
                    out.push_str(&escape_text(&rest[..consumed]));
                }
                rest = &rest[consumed..];
            }
            None => {
                out.push_str("&lt;");
                rest = &rest[1..];
            }
        }
    }
    push_text(&mut out, rest);
    while let Some(name) = open.pop() {
        out.push_str(&format!("</{}>", name));
    }
    out
}

fn push_tag(out: &mut String, open: &mut Vec<String>, tag: &Tag) {
    if tag.closing {
        let Some(depth) = open.iter().rposition(|name| *name == tag.name) else {
            return;
        };
        for name in open.drain(depth..).rev() {
            out.push_str(&format!("</{}>", name));
        }
        return;
    }
    out.push_str(&tag.render_open());
    if VOID_TAGS.contains(&tag.name.as_str()) {
        return;
    }
    if tag.self_closing {
        out.push_str(&format!("</{}>", tag.name));
    } else {
        open.push(tag.name.clone());
    }
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    attrs: Vec<(String, Option<String>)>,
}

impl Tag {
    fn render_open(&self) -> String {
        let mut out = format!("<{}", self.name);
        if self.name == "a" {
            for (name, value) in &self.attrs {
                let Some(value) = value else { continue };
                let keep = match name.as_str() {
                    "href" => is_safe_href(value),
                    "title" => true,
                    _ => false,
                };
                if keep {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                }
            }
        }
        if VOID_TAGS.contains(&self.name.as_str()) {
            out.push_str("/>");
        } else {
            out.push('>');
        }
        out
    }
}

fn is_safe_href(href: &str) -> bool {
    let lowered: String = href
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match lowered.find(':') {
        // Relative or fragment reference.
        None => true,
        Some(colon) => {
            let before = &lowered[..colon];
            if before.contains('/') || before.contains('?') || before.contains('#') {
                return true;
            }
            SAFE_SCHEMES.contains(&&lowered[..=colon])
        }
    }
}

/// Parse one tag starting at `<`. Returns the tag and the number of bytes it
/// spans, or `None` if the text at `<` is not a well-formed tag.
fn parse_tag(s: &str) -> Option<(Tag, usize)> {
    let bytes = s.as_bytes();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name = s[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/' | b'"' | b'\'')
        {
            i += 1;
        }
        if i == attr_start {
            return None;
        }
        let attr_name = s[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            attrs.push((attr_name, None));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let value = match bytes.get(i)? {
            q @ (b'"' | b'\'') => {
                let end = s[i + 1..].find(*q as char)? + i + 1;
                let v = &s[i + 1..end];
                i = end + 1;
                v
            }
            _ => {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &s[start..i]
            }
        };
        attrs.push((attr_name, Some(decode_entities(value))));
    }

    Some((
        Tag {
            name,
            closing,
            self_closing,
            attrs,
        },
        i,
    ))
}

/// Decode the few entities that matter for href scheme checks.
fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&colon;", ":")
        .replace("&#58;", ":")
        .replace("&amp;", "&")
}
