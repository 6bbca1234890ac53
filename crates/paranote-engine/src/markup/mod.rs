//! Inline markup engine.
//!
//! Turns a block's display text into a finite sequence of renderable
//! spans. The pipeline mirrors the persisted content format exactly:
//!
//! 1. Split on the wiki-link token pattern `[[...]]`, alternating outside
//!    segments and bracket captures, order preserved.
//! 2. HTML-escape each outside segment, then apply the inline substitution
//!    rules in fixed precedence order against the escaped text. Later
//!    rules operate on earlier rules' output; the ordering is load-bearing
//!    for existing content and must not change.
//! 3. Sanitize the resulting fragment against an explicit allow-list
//!    before treating anything as markup. Fragments that do not pass the
//!    filter are stripped to their text content.
//! 4. Resolve each bracket capture case-insensitively against the current
//!    page-title snapshot.
//!
//! Malformed or unbalanced markup degrades to literal text; this module
//! never returns an error and never panics on user content.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{PageId, PageRef};

/// The wiki-link token pattern. Shared with backlink extraction.
pub static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("wiki-link pattern"));

/// Inline substitution rules, applied in order to the escaped text.
/// Precedence: underline passthrough, bold, italic, strikethrough,
/// inline code, markdown link.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"&lt;u&gt;(.*?)&lt;/u&gt;").expect("underline rule"),
            "<u>$1</u>",
        ),
        (
            Regex::new(r"\*\*(.*?)\*\*").expect("bold rule"),
            "<strong>$1</strong>",
        ),
        (Regex::new(r"\*(.*?)\*").expect("italic rule"), "<em>$1</em>"),
        (
            Regex::new(r"~~(.*?)~~").expect("strikethrough rule"),
            "<del>$1</del>",
        ),
        (
            Regex::new(r"`([^`]+)`").expect("code rule"),
            "<code>$1</code>",
        ),
        (
            Regex::new(r"\[(.*?)\]\((.*?)\)").expect("link rule"),
            r#"<a href="$2" target="_blank" rel="noopener noreferrer">$1</a>"#,
        ),
    ]
});

const ALLOWED_TAGS: [&str; 6] = ["strong", "em", "del", "code", "a", "u"];
const ALLOWED_ATTRS: [&str; 4] = ["href", "target", "rel", "class"];

/// Looks up wiki-link titles against a snapshot of known pages.
pub trait TitleResolver {
    fn resolve(&self, title: &str) -> Option<PageId>;
}

impl TitleResolver for [PageRef] {
    fn resolve(&self, title: &str) -> Option<PageId> {
        self.iter()
            .find(|page| page.title.eq_ignore_ascii_case(title))
            .map(|page| page.id)
    }
}

impl TitleResolver for Vec<PageRef> {
    fn resolve(&self, title: &str) -> Option<PageId> {
        self.as_slice().resolve(title)
    }
}

/// One renderable unit of a block's display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineSpan {
    Plain(String),
    Bold(String),
    Italic(String),
    Strikethrough(String),
    Underline(String),
    Code(String),
    Hyperlink { text: String, href: String },
    /// An in-text `[[Title]]` reference. `target` is present when the
    /// title resolved against the snapshot; a dead link carries `None`.
    WikiLink { title: String, target: Option<PageId> },
}

impl InlineSpan {
    /// The textual content of the span, regardless of styling.
    pub fn text(&self) -> &str {
        match self {
            InlineSpan::Plain(t)
            | InlineSpan::Bold(t)
            | InlineSpan::Italic(t)
            | InlineSpan::Strikethrough(t)
            | InlineSpan::Underline(t)
            | InlineSpan::Code(t) => t,
            InlineSpan::Hyperlink { text, .. } => text,
            InlineSpan::WikiLink { title, .. } => title,
        }
    }
}

/// Render a block's display text into spans, resolving wiki-links against
/// `resolver`. The caller is expected to have stripped any checkbox
/// prefix from `text` already.
pub fn render_markup(text: &str, resolver: &impl TitleResolver) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut last_end = 0;

    for captures in WIKI_LINK.captures_iter(text) {
        let whole = captures.get(0).expect("capture 0 always present");
        if whole.start() > last_end {
            format_inline(&text[last_end..whole.start()], &mut spans);
        }
        let title = &captures[1];
        spans.push(InlineSpan::WikiLink {
            title: title.to_string(),
            target: resolver.resolve(title),
        });
        last_end = whole.end();
    }
    if last_end < text.len() {
        format_inline(&text[last_end..], &mut spans);
    }

    spans
}

/// Render without a title snapshot; every wiki-link comes back unresolved.
pub fn render_markup_plain(text: &str) -> Vec<InlineSpan> {
    render_markup(text, &Vec::<PageRef>::new())
}

/// Escape, apply the substitution rules, then sanitize into spans.
fn format_inline(segment: &str, out: &mut Vec<InlineSpan>) {
    let mut fragment = html_escape::encode_text(segment).into_owned();
    for (rule, replacement) in RULES.iter() {
        fragment = rule.replace_all(&fragment, *replacement).into_owned();
    }
    sanitize_fragment(&fragment, out);
}

struct Tag {
    name: String,
    closing: bool,
    attrs: Vec<(String, String)>,
    /// Bytes consumed from the input, including the angle brackets.
    len: usize,
}

/// Allow-list sanitizer over the substituted fragment.
///
/// Only the allow-listed tags become styled spans; an unknown tag is
/// dropped while its content is kept, an unclosed tag degrades to text,
/// and a stray `<` that does not parse as a tag stays literal. Escaped
/// input cannot contain raw angle brackets, so in practice only the tags
/// the rules above emit ever reach this point; the filter is a hard
/// invariant regardless.
fn sanitize_fragment(fragment: &str, out: &mut Vec<InlineSpan>) {
    let bytes = fragment.as_bytes();
    let mut plain = String::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(open) = fragment[pos..].find('<').map(|i| pos + i) else {
            plain.push_str(&fragment[pos..]);
            break;
        };
        plain.push_str(&fragment[pos..open]);

        let Some(tag) = parse_tag(&fragment[open..]) else {
            plain.push('<');
            pos = open + 1;
            continue;
        };

        if tag.closing || !ALLOWED_TAGS.contains(&tag.name.as_str()) {
            // Unmatched close or disallowed tag: drop the tag itself,
            // keep whatever follows as content.
            pos = open + tag.len;
            continue;
        }

        let body_start = open + tag.len;
        let close_marker = format!("</{}>", tag.name);
        let Some(close) = fragment[body_start..]
            .find(&close_marker)
            .map(|i| body_start + i)
        else {
            // Unclosed tag degrades to text content.
            pos = body_start;
            continue;
        };

        flush_plain(&mut plain, out);
        let inner = decode(&strip_tags(&fragment[body_start..close]));
        out.push(span_for(&tag, inner));
        pos = close + close_marker.len();
    }

    flush_plain(&mut plain, out);
}

fn span_for(tag: &Tag, inner: String) -> InlineSpan {
    match tag.name.as_str() {
        "strong" => InlineSpan::Bold(inner),
        "em" => InlineSpan::Italic(inner),
        "del" => InlineSpan::Strikethrough(inner),
        "u" => InlineSpan::Underline(inner),
        "code" => InlineSpan::Code(inner),
        "a" => {
            let href = tag
                .attrs
                .iter()
                .find(|(name, _)| name == "href")
                .map(|(_, value)| decode(value))
                .unwrap_or_default();
            InlineSpan::Hyperlink { text: inner, href }
        }
        _ => InlineSpan::Plain(inner),
    }
}

fn flush_plain(plain: &mut String, out: &mut Vec<InlineSpan>) {
    if !plain.is_empty() {
        out.push(InlineSpan::Plain(decode(plain)));
        plain.clear();
    }
}

fn decode(escaped: &str) -> String {
    html_escape::decode_html_entities(escaped).into_owned()
}

/// Parse one tag at the start of `s` (which begins with `<`). Returns
/// `None` for anything that does not look like a tag, in which case the
/// `<` stays literal. Attributes not on the allow-list are discarded.
fn parse_tag(s: &str) -> Option<Tag> {
    let end = s.find('>')?;
    let inner = &s[1..end];
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };

    let name_len = inner
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(inner.len());
    if name_len == 0 {
        return None;
    }
    let name = inner[..name_len].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut rest = inner[name_len..].trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let attr_name = rest[..eq].trim().to_ascii_lowercase();
        let after_eq = rest[eq + 1..].strip_prefix('"')?;
        let value_end = after_eq.find('"')?;
        if ALLOWED_ATTRS.contains(&attr_name.as_str()) {
            attrs.push((attr_name, after_eq[..value_end].to_string()));
        }
        rest = after_eq[value_end + 1..].trim_start();
    }

    Some(Tag {
        name,
        closing,
        attrs,
        len: end + 1,
    })
}

/// Remove any `<...>` sequences, keeping the text between them.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}
