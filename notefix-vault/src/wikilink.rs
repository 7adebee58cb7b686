//! Wikilink parsing and repair: `[[Target]]` / `[[Target|Label]]`.

/// A well-formed cross-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wikilink {
    pub target: String,
    pub label: Option<String>,
}

/// Parse a whole string as one wikilink. Leading/trailing whitespace is
/// tolerated; anything else fails.
pub fn parse(s: &str) -> Option<Wikilink> {
    let s = s.trim();
    let inner = s.strip_prefix("[[")?.strip_suffix("]]")?;
    if inner.contains('[') || inner.contains(']') {
        return None;
    }
    let (target, label) = match inner.split_once('|') {
        Some((t, l)) => (t.trim(), Some(l.trim())),
        None => (inner.trim(), None),
    };
    if target.is_empty() {
        return None;
    }
    if let Some(label) = label
        && label.is_empty()
    {
        return None;
    }
    Some(Wikilink {
        target: target.to_string(),
        label: label.map(str::to_string),
    })
}

pub fn is_wikilink(s: &str) -> bool {
    parse(s).is_some()
}

/// Bracket-delimited references that are almost but not quite well-formed:
/// unbalanced bracket runs, empty targets, empty labels.
pub fn find_malformed(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        scan_line(line, &mut out);
    }
    out
}

fn scan_line(line: &str, out: &mut Vec<String>) {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let open_start = i;
        let mut opens = 0;
        while i < bytes.len() && bytes[i] == b'[' {
            opens += 1;
            i += 1;
        }
        if opens == 1 {
            // A lone bracket is ordinary markdown unless it closes with a
            // double bracket, e.g. `[x]]`.
            let rest = &line[i..];
            if let Some(close) = rest.find(']') {
                if rest[..close].contains('[') {
                    continue;
                }
                let closes = rest[close..].bytes().take_while(|b| *b == b']').count();
                if closes >= 2 {
                    out.push(line[open_start..i + close + closes].to_string());
                    i += close + closes;
                }
            }
            continue;
        }

        // Two or more opening brackets: expect exactly two closers and a
        // non-empty target before the end of the line.
        let rest = &line[i..];
        let Some(close) = rest.find(']') else {
            out.push(line[open_start..].to_string());
            return;
        };
        if rest[..close].contains('[') {
            out.push(line[open_start..i].to_string());
            continue;
        }
        let closes = rest[close..].bytes().take_while(|b| *b == b']').count();
        let snippet = &line[open_start..i + close + closes];
        if opens != 2 || closes != 2 || parse(snippet).is_none() {
            out.push(snippet.to_string());
        }
        i += close + closes;
    }
}

/// Deterministic repair of a malformed snippet: extract the inner target
/// (and label), rebuild canonical double brackets. Returns `None` when no
/// target text survives.
pub fn repair(snippet: &str) -> Option<String> {
    let inner = snippet.trim_matches(|c| c == '[' || c == ']');
    let (target, label) = match inner.split_once('|') {
        Some((t, l)) => (t.trim(), Some(l.trim())),
        None => (inner.trim(), None),
    };
    if target.is_empty() {
        return None;
    }
    match label {
        Some(l) if !l.is_empty() => Some(format!("[[{target}|{l}]]")),
        _ => Some(format!("[[{target}]]")),
    }
}
