//! fetch/html — item extraction from the values page markup.
//!
//! Page shape: every item is a `<div class="pet">` block whose first `<h2>`
//! holds the item name and whose first `<p>` holds the value, possibly with
//! thousands separators ("12,500").
//!
//! Matching is ASCII case-insensitive on tag and attribute names. Byte offsets
//! from the lowercased copy are valid in the original since only ASCII changes.

use log::debug;

use crate::snapshot::ValueMap;

/// Result of parsing one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub values: ValueMap,
    /// `div.pet` blocks seen.
    pub blocks: usize,
    /// Blocks dropped: missing name/value element or non-integer value.
    pub skipped: usize,
}

pub fn parse_values(html: &str) -> ParsedPage {
    let lc = html.to_ascii_lowercase();
    let mut page = ParsedPage::default();
    let mut pos = 0;

    while let Some((start, open_end)) = find_open_tag(&lc, "div", pos) {
        pos = open_end;
        if !has_class(&lc[start..open_end], "pet") {
            continue;
        }
        page.blocks += 1;

        let end = block_end(&lc, "div", open_end).unwrap_or(html.len());
        let inner = &html[open_end..end];
        let inner_lc = &lc[open_end..end];

        let name = element_text(inner, inner_lc, "h2");
        let raw = element_text(inner, inner_lc, "p");
        match (name, raw) {
            (Some(name), Some(raw)) if !name.is_empty() => match parse_value(&raw) {
                Some(v) => {
                    page.values.insert(name, v);
                }
                None => {
                    debug!("skip '{}': value '{}' is not an integer", name, raw);
                    page.skipped += 1;
                }
            },
            _ => {
                debug!("skip item block at byte {}: missing <h2> or <p>", start);
                page.skipped += 1;
            }
        }
    }
    page
}

/// "12,500" -> 12500. Whitespace around the number is allowed.
pub fn parse_value(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|&c| c != ',').collect();
    cleaned.trim().parse::<i64>().ok()
}

/// Locate `<tag` (followed by '>', '/' or whitespace) at or after `from`.
/// Returns (tag start, index just past the closing '>').
fn find_open_tag(lc: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let pat = format!("<{tag}");
    let mut at = from;
    loop {
        let start = lc.get(at..)?.find(&pat)? + at;
        let after = start + pat.len();
        match lc.as_bytes().get(after) {
            Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => {
                let close = lc[after..].find('>')? + after + 1;
                return Some((start, close));
            }
            Some(_) => at = after,
            None => return None,
        }
    }
}

/// Start index of the `</tag` that closes the element opened before `from`,
/// honoring nested elements of the same tag.
fn block_end(lc: &str, tag: &str, from: usize) -> Option<usize> {
    let close_pat = format!("</{tag}");
    let mut depth = 1usize;
    let mut at = from;
    loop {
        let next_close = lc.get(at..)?.find(&close_pat)? + at;
        match find_open_tag(lc, tag, at) {
            Some((open, open_end)) if open < next_close => {
                depth += 1;
                at = open_end;
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                at = next_close + close_pat.len();
            }
        }
    }
}

/// Whitespace-separated class list of an open tag contains `class`.
fn has_class(open_tag_lc: &str, class: &str) -> bool {
    attr_value(open_tag_lc, "class")
        .map(|v| v.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn attr_value<'a>(open_tag: &'a str, name: &str) -> Option<&'a str> {
    let pat = format!("{name}=");
    let mut at = 0;
    let idx = loop {
        let i = open_tag.get(at..)?.find(&pat)? + at;
        // must be a whole attribute name, e.g. not `data-class=`
        let prev = open_tag.as_bytes().get(i.wrapping_sub(1)).copied();
        if i > 0 && matches!(prev, Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            break i;
        }
        at = i + pat.len();
    };
    let rest = &open_tag[idx + pat.len()..];
    match rest.as_bytes().first()? {
        q @ (b'"' | b'\'') => {
            let q = *q as char;
            let body = &rest[1..];
            Some(&body[..body.find(q)?])
        }
        _ => {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len());
            Some(&rest[..end])
        }
    }
}

/// Normalized text of the first `<tag>` element inside `inner`.
fn element_text(inner: &str, inner_lc: &str, tag: &str) -> Option<String> {
    let (_, open_end) = find_open_tag(inner_lc, tag, 0)?;
    let end = inner_lc[open_end..].find(&format!("</{tag}"))? + open_end;
    Some(normalize_ws(&normalize_entities(&strip_tags(&inner[open_end..end]))))
}

fn strip_tags(s: &str) -> String {
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
    out
}

/// Longest `&...;` reference considered for decoding.
const MAX_ENTITY_LEN: usize = 32;

/// Decode character references in one pass: `&#NNN;`, `&#xHH;` and the named
/// entities in `named_entity`. Unknown or malformed references stay as text.
fn normalize_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= MAX_ENTITY_LEN)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name.strip_prefix('#') {
        Some(num) => {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code).filter(|&c| c != '\0')
        }
        None => named_entity(name),
    }
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "deg" => '\u{b0}',
        "times" => '\u{d7}',
        "middot" => '\u{b7}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "Agrave" => '\u{c0}',
        "Aacute" => '\u{c1}',
        "Acirc" => '\u{c2}',
        "Auml" => '\u{c4}',
        "Aring" => '\u{c5}',
        "Ccedil" => '\u{c7}',
        "Egrave" => '\u{c8}',
        "Eacute" => '\u{c9}',
        "Ntilde" => '\u{d1}',
        "Oacute" => '\u{d3}',
        "Ouml" => '\u{d6}',
        "Uuml" => '\u{dc}',
        "szlig" => '\u{df}',
        "agrave" => '\u{e0}',
        "aacute" => '\u{e1}',
        "acirc" => '\u{e2}',
        "auml" => '\u{e4}',
        "aring" => '\u{e5}',
        "ccedil" => '\u{e7}',
        "egrave" => '\u{e8}',
        "eacute" => '\u{e9}',
        "ecirc" => '\u{ea}',
        "euml" => '\u{eb}',
        "iacute" => '\u{ed}',
        "iuml" => '\u{ef}',
        "ntilde" => '\u{f1}',
        "oacute" => '\u{f3}',
        "ocirc" => '\u{f4}',
        "ouml" => '\u{f6}',
        "uacute" => '\u{fa}',
        "uuml" => '\u{fc}',
        _ => return None,
    };
    Some(c)
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_strips_thousands_separators() {
        assert_eq!(parse_value("12,500"), Some(12500));
        assert_eq!(parse_value("  7 "), Some(7));
        assert_eq!(parse_value("-1,000"), Some(-1000));
        assert_eq!(parse_value("N/A"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn open_tag_requires_word_boundary() {
        let lc = "<pre>x</pre><p class=\"v\">1</p>";
        let (start, end) = find_open_tag(lc, "p", 0).unwrap();
        assert_eq!(&lc[start..end], "<p class=\"v\">");
    }

    #[test]
    fn class_match_is_token_based() {
        assert!(has_class("<div class=\"card pet\">", "pet"));
        assert!(has_class("<div class='pet'>", "pet"));
        assert!(has_class("<div class=pet>", "pet"));
        assert!(!has_class("<div class=\"petshop\">", "pet"));
        assert!(!has_class("<div data-class=\"pet\">", "pet"));
    }

    #[test]
    fn nested_divs_stay_inside_the_block() {
        let lc = "<div class=\"pet\"><div><h2>a</h2></div><p>1</p></div><p>9</p>";
        let (_, open_end) = find_open_tag(lc, "div", 0).unwrap();
        let end = block_end(lc, "div", open_end).unwrap();
        assert_eq!(&lc[open_end..end], "<div><h2>a</h2></div><p>1</p>");
    }

    #[test]
    fn malformed_references_stay_as_text() {
        assert_eq!(normalize_entities("a & b"), "a & b");
        assert_eq!(normalize_entities("&bogus; &#xZZ; &#;"), "&bogus; &#xZZ; &#;");
        assert_eq!(normalize_entities("&amp;lt;"), "&lt;");
        assert_eq!(normalize_entities("tail &"), "tail &");
    }

    #[test]
    fn entities_and_whitespace_are_normalized() {
        assert_eq!(
            normalize_ws(&normalize_entities("  Cat&nbsp;&amp;\n Dog ")),
            "Cat & Dog"
        );
    }
}
