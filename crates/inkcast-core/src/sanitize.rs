//! Normalization of user-entered cell and note content.
//!
//! Rich content is limited to a tiny inline markup subset. Everything else is
//! reduced to its text so that peers and persisted state never carry
//! arbitrary markup.

/// Inline tags that survive sanitizing.
const ALLOWED_TAGS: &[&str] = &["b", "strong", "i", "em", "u", "s", "br"];

/// Block tags whose end becomes a line break.
const BLOCK_TAGS: &[&str] = &["div", "p"];

/// Tags whose contents are dropped along with the tag.
const DROPPED_CONTENT_TAGS: &[&str] = &["script", "style"];

const LINE_BREAK: &str = "<br>";

#[derive(Debug)]
struct Tag {
    name: String,
    closing: bool,
}

fn parse_tag(inner: &str) -> Tag {
    let inner = inner.trim();
    let (closing, rest) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, inner),
    };
    let name = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    Tag { name, closing }
}

enum Piece<'a> {
    Text(&'a str),
    Tag(Tag),
}

/// Split `input` into text runs and tags, in order.
///
/// An unterminated `<` is treated as text.
fn tokenize(input: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        let (text, tail) = rest.split_at(start);
        pieces.push(Piece::Text(text));
        match tail.find('>') {
            Some(end) => {
                pieces.push(Piece::Tag(parse_tag(&tail[1..end])));
                rest = &tail[end + 1..];
            }
            None => {
                pieces.push(Piece::Text(tail));
                rest = "";
            }
        }
    }
    pieces.push(Piece::Text(rest));
    pieces
}

/// Plain cell content: surrounding whitespace removed.
pub fn sanitize_plain(input: &str) -> String {
    input.trim().to_string()
}

/// Rich content reduced to the allowed inline markup subset.
pub fn sanitize_rich(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut skipping: Option<String> = None;

    for piece in tokenize(input) {
        match piece {
            Piece::Text(text) => {
                if skipping.is_none() {
                    out.push_str(&text.replace('<', "&lt;"));
                }
            }
            Piece::Tag(tag) => {
                if let Some(blocked) = &skipping {
                    if tag.closing && &tag.name == blocked {
                        skipping = None;
                    }
                    continue;
                }
                let name = tag.name.as_str();
                if name == "br" {
                    if !tag.closing {
                        out.push_str(LINE_BREAK);
                    }
                } else if ALLOWED_TAGS.contains(&name) {
                    out.push('<');
                    if tag.closing {
                        out.push('/');
                    }
                    out.push_str(name);
                    out.push('>');
                } else if BLOCK_TAGS.contains(&name) {
                    if tag.closing {
                        out.push_str(LINE_BREAK);
                    }
                } else if DROPPED_CONTENT_TAGS.contains(&name) && !tag.closing {
                    skipping = Some(tag.name);
                }
            }
        }
    }

    trim_markup(&out.replace("&nbsp;", " "))
}

/// Strip whitespace and line breaks from both ends.
fn trim_markup(input: &str) -> String {
    let mut s = input.trim();
    loop {
        let before = s.len();
        if let Some(rest) = s.strip_prefix(LINE_BREAK) {
            s = rest.trim_start();
        }
        if let Some(rest) = s.strip_suffix(LINE_BREAK) {
            s = rest.trim_end();
        }
        if s.len() == before {
            return s.to_string();
        }
    }
}

/// Text of rich content as it would be laid out, one `\n` per line break.
pub fn plain_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for piece in tokenize(input) {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Tag(tag) => {
                let line_break = (tag.name == "br" && !tag.closing)
                    || (tag.closing && BLOCK_TAGS.contains(&tag.name.as_str()));
                if line_break {
                    out.push('\n');
                }
            }
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
