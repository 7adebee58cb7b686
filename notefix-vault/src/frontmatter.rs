//! Frontmatter handling: block location, parsing into ordered entries,
//! deterministic re-serialization, and raw-text hygiene scanning.
//!
//! Hygiene runs on the raw pre-parse text because duplicate keys and
//! bracket typos are invisible once the block has been parsed into a map.

use crate::wikilink;
use notefix_types::value::Value;
use thiserror::Error;

const DELIM: &str = "---";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("frontmatter is not valid yaml: {message}")]
    Yaml { message: String },

    #[error("unsupported value for `{key}`: nested structures are not allowed")]
    UnsupportedValue { key: String },
}

/// Frontmatter as ordered key/value entries. Order is document order on
/// parse and write order on serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    entries: Vec<(String, Value)>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace in place, or append when the key is new.
    pub fn set(&mut self, key: &str, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed document: frontmatter plus everything outside the block.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// A located frontmatter block: 0-based line numbers of both delimiters
/// and the raw text between them.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpan {
    pub start_line: usize,
    pub end_line: usize,
    pub raw: String,
}

impl BlockSpan {
    pub fn at_top(&self) -> bool {
        self.start_line == 0
    }
}

/// Find the first delimited block in the file, wherever it sits. A block
/// needs an opening `---` at the start of a line and a closing `---` or
/// `...` further down.
pub fn locate_block(text: &str) -> Option<BlockSpan> {
    let lines: Vec<&str> = text.lines().collect();
    let mut start = None;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start_matches('\u{feff}').trim_end();
        if trimmed == DELIM {
            start = Some(i);
            break;
        }
    }
    let start = start?;

    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.trim_end();
        if trimmed == DELIM || trimmed == "..." {
            let raw = lines[start + 1..i].join("\n");
            return Some(BlockSpan {
                start_line: start,
                end_line: i,
                raw,
            });
        }
    }
    None
}

/// Top-level keys of a raw block, with their 0-based line offsets inside
/// the block, in document order.
pub fn top_level_keys(raw: &str) -> Vec<(String, usize)> {
    let mut out = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let Some(first) = line.chars().next() else {
            continue;
        };
        if first.is_whitespace() || first == '-' || first == '#' {
            continue;
        }
        if let Some(colon) = line.find(':') {
            let key = line[..colon].trim();
            if !key.is_empty() {
                out.push((key.to_string(), i));
            }
        }
    }
    out
}

/// Keys that appear more than once, in first-occurrence order.
pub fn duplicate_keys(raw: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let mut dupes = Vec::new();
    for (key, _) in top_level_keys(raw) {
        if seen.contains(&key) {
            if !dupes.contains(&key) {
                dupes.push(key);
            }
        } else {
            seen.push(key);
        }
    }
    dupes
}

/// Drop later occurrences of duplicated top-level keys, keeping each
/// first occurrence together with its continuation lines.
pub fn dedupe_block(raw: &str) -> String {
    let keys = top_level_keys(raw);
    let lines: Vec<&str> = raw.lines().collect();

    let mut drop_ranges: Vec<(usize, usize)> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for (idx, (key, line)) in keys.iter().enumerate() {
        let end = keys
            .get(idx + 1)
            .map(|(_, next)| *next)
            .unwrap_or(lines.len());
        if seen.contains(&key.as_str()) {
            drop_ranges.push((*line, end));
        } else {
            seen.push(key);
        }
    }

    let mut out: Vec<&str> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if drop_ranges.iter().any(|(s, e)| i >= *s && i < *e) {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Parse a file into frontmatter entries plus body.
///
/// Duplicated keys are deduplicated (first occurrence wins) before the
/// YAML parse so they surface as a hygiene issue, not a parse failure. A
/// file without any block parses to empty frontmatter.
pub fn parse_document(text: &str) -> Result<Document, ParseError> {
    let Some(block) = locate_block(text) else {
        return Ok(Document {
            frontmatter: Frontmatter::default(),
            body: text.to_string(),
        });
    };

    match parse_block(&block.raw) {
        Ok(frontmatter) => {
            let body = body_without_block(text, &block);
            Ok(Document { frontmatter, body })
        }
        // A delimited run further down that does not parse as a mapping is
        // body text (e.g. two horizontal rules), not broken frontmatter.
        Err(_) if !block.at_top() => Ok(Document {
            frontmatter: Frontmatter::default(),
            body: text.to_string(),
        }),
        Err(err) => Err(err),
    }
}

fn body_without_block(text: &str, block: &BlockSpan) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<&str> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i >= block.start_line && i <= block.end_line {
            continue;
        }
        out.push(line);
    }
    let mut body = out.join("\n");
    if text.ends_with('\n') && !body.is_empty() {
        body.push('\n');
    }
    body
}

/// Parse a raw block into ordered entries.
pub fn parse_block(raw: &str) -> Result<Frontmatter, ParseError> {
    let deduped = dedupe_block(raw);
    if deduped.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&deduped).map_err(|e| ParseError::Yaml {
            message: e.to_string(),
        })?;

    let mapping = match parsed {
        serde_yaml::Value::Mapping(m) => m,
        serde_yaml::Value::Null => return Ok(Frontmatter::default()),
        _ => {
            return Err(ParseError::Yaml {
                message: "frontmatter must be a key/value mapping".to_string(),
            });
        }
    };

    let mut fm = Frontmatter::default();
    for (key, value) in &mapping {
        let key = key
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{key:?}"));
        let value = Value::from_yaml(value)
            .ok_or_else(|| ParseError::UnsupportedValue { key: key.clone() })?;
        fm.set(&key, value);
    }
    Ok(fm)
}

/// Serialize frontmatter deterministically: keys named in `field_order`
/// first (in that order), then remaining entries in stored order.
pub fn render_frontmatter(fm: &Frontmatter, field_order: &[String]) -> String {
    let mut out = String::new();
    let mut written: Vec<&str> = Vec::new();

    let mut emit = |key: &str, value: &Value, out: &mut String| {
        let mut mapping = serde_yaml::Mapping::new();
        mapping.insert(serde_yaml::Value::String(key.to_string()), value.to_yaml());
        match serde_yaml::to_string(&mapping) {
            Ok(rendered) => out.push_str(&rendered),
            Err(_) => {
                out.push_str(key);
                out.push_str(": null\n");
            }
        }
    };

    for key in field_order {
        if let Some(value) = fm.get(key) {
            emit(key, value, &mut out);
            written.push(key.as_str());
        }
    }
    for (key, value) in fm.iter() {
        if !written.contains(&key) {
            emit(key, value, &mut out);
        }
    }
    out
}

/// Render a full document with the block at the very top.
pub fn render_document(doc: &Document, field_order: &[String]) -> String {
    let mut out = String::new();
    out.push_str(DELIM);
    out.push('\n');
    out.push_str(&render_frontmatter(&doc.frontmatter, field_order));
    out.push_str(DELIM);
    out.push('\n');
    out.push_str(&doc.body);
    out
}

/// One raw-text hygiene deviation.
#[derive(Debug, Clone, PartialEq)]
pub enum HygieneFinding {
    BlockNotAtTop { start_line: usize },
    DuplicateKey { key: String },
    MalformedWikilink { snippet: String },
}

/// Raw-text hygiene scan of a file. Independent of the parsed map.
pub fn scan_hygiene(text: &str) -> Vec<HygieneFinding> {
    let mut findings = Vec::new();
    let Some(block) = locate_block(text) else {
        return findings;
    };

    if !block.at_top() && parse_block(&block.raw).is_ok() {
        findings.push(HygieneFinding::BlockNotAtTop {
            start_line: block.start_line,
        });
    }

    for key in duplicate_keys(&block.raw) {
        findings.push(HygieneFinding::DuplicateKey { key });
    }

    for snippet in wikilink::find_malformed(&block.raw) {
        findings.push(HygieneFinding::MalformedWikilink { snippet });
    }

    findings
}
