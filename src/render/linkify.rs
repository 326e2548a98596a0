//! Bare URL detection for automatic hyperlinking.

/// A run of plain text or a detected link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link { text: &'a str, href: String },
}

const SCHEMES: [&str; 3] = ["https://", "http://", "www."];

/// Characters stripped from the end of a candidate URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', '*', '_', '~'];

/// Split `text` into plain runs and bare-URL links.
///
/// A candidate starts at `http://`, `https://` or `www.` on a word boundary
/// and runs to the next whitespace or `<`. Trailing punctuation and an
/// unbalanced closing parenthesis are left outside the link. Candidates that
/// do not parse as a URL with a host stay plain text.
#[must_use]
pub fn linkify(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let Some((start, end, href)) = next_link(text, cursor) else {
            break;
        };
        if start > plain_start {
            segments.push(Segment::Text(&text[plain_start..start]));
        }
        segments.push(Segment::Link {
            text: &text[start..end],
            href,
        });
        plain_start = end;
        cursor = end;
    }

    if plain_start < text.len() {
        segments.push(Segment::Text(&text[plain_start..]));
    }
    segments
}

/// Find the next valid link at or after `from`: `(start, end, href)`.
fn next_link(text: &str, from: usize) -> Option<(usize, usize, String)> {
    let mut search = from;
    loop {
        let (start, scheme) = SCHEMES
            .iter()
            .filter_map(|scheme| {
                find_ascii_case_insensitive(&text[search..], scheme).map(|i| (search + i, *scheme))
            })
            .min_by_key(|(i, _)| *i)?;

        let at_boundary = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric() && c != '/' && c != '@');

        let raw_end = text[start..]
            .find(|c: char| c.is_whitespace() || c == '<')
            .map_or(text.len(), |i| start + i);
        let end = trim_candidate(text, start, raw_end);

        if at_boundary && end > start + scheme.len() {
            let candidate = &text[start..end];
            let href = if scheme == "www." {
                format!("http://{candidate}")
            } else {
                candidate.to_owned()
            };
            if let Ok(url) = url::Url::parse(&href)
                && url.host_str().is_some_and(|h| h.contains('.') || h == "localhost")
            {
                return Some((start, end, href));
            }
        }

        search = start + scheme.len();
        if search >= text.len() {
            return None;
        }
    }
}

fn trim_candidate(text: &str, start: usize, mut end: usize) -> usize {
    loop {
        let candidate = &text[start..end];
        if let Some(stripped) = candidate.strip_suffix(TRAILING_PUNCTUATION) {
            end = start + stripped.len();
            continue;
        }
        if candidate.ends_with(')') && candidate.matches('(').count() < candidate.matches(')').count()
        {
            end -= 1;
            continue;
        }
        return end;
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len())
        .filter(|&i| haystack.is_char_boundary(i))
        .find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}
