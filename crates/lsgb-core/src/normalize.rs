//! OCR-error tolerant token normalization.
//!
//! Scanned delivery notes routinely come back from OCR with digits mangled
//! into look-alike letters (`O` for `0`, `S` for `5`, ...) and with
//! separators injected mid-number. [`normalize`] maps a raw token to a
//! canonical digit string; [`collapse_digit_runs`] repairs whitespace
//! injected between consecutive digits before pattern search.

/// Normalize a raw OCR/text token to a digit-only string.
///
/// Steps, in order:
/// 1. drop separator characters (whitespace incl. non-breaking space,
///    dash, dot, comma, underscore),
/// 2. upper-case,
/// 3. apply the OCR confusion table (`O`/`Q`→`0`, `I`/`L`/`|`/`[`/`]`→`1`,
///    `S`/`$`→`5`, `B`→`8`, `G`→`9`, `Z`→`2`),
/// 4. drop anything still not a digit.
///
/// The confusion table is applied exactly once per character; substituted
/// digits are never re-substituted. Empty input yields an empty string.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .filter(|c| !matches!(c, '-' | '.' | ',' | '_'))
        .map(|c| c.to_ascii_uppercase())
        .filter_map(|c| match c {
            'O' | 'Q' => Some('0'),
            'I' | 'L' | '|' | '[' | ']' => Some('1'),
            'S' | '$' => Some('5'),
            'B' => Some('8'),
            'G' => Some('9'),
            'Z' => Some('2'),
            d if d.is_ascii_digit() => Some(d),
            _ => None,
        })
        .collect()
}

/// Collapse whitespace runs injected between consecutive digits.
///
/// OCR occasionally splits a number into `5777 70` or `5 7 7 7 7 0`. One
/// pass joins one gap per digit pair; three passes are enough for up to
/// four injected gaps, which covers everything observed in practice.
pub fn collapse_digit_runs(text: &str) -> String {
    let mut out = text.to_string();
    for _ in 0..3 {
        out = collapse_once(&out);
    }
    out
}

fn collapse_once(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            out.push(c);
            // Look past a whitespace run for another digit.
            let mut j = i + 1;
            while j < chars.len() && (chars[j].is_whitespace() || chars[j] == '\u{a0}') {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j].is_ascii_digit() {
                i = j;
                continue;
            }
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}
