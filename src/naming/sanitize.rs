//! Canonical name sanitizer.
//!
//! Pipeline (fixed order):
//! 1. NFKC normalization, then lowercase.
//! 2. Digraph mapping (`ä->ae`, `ß->ss`, ...).
//! 3. `/` and `\` become `--`, `+` becomes `..`, whitespace runs become `_`, `,` is dropped.
//! 4. Everything outside `[a-z0-9._-]` is dropped; accented letters keep their base letter.
//! 5. Separator runs collapse, edges are trimmed, numeric segments lose leading zeros.
//! 6. An empty result becomes `x`.
//!
//! The output is stable under re-application: `sanitize(sanitize(s)) == sanitize(s)`.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::decompose_canonical;

/// Name used when nothing survives sanitization (also the missing-ancestor sentinel).
pub const FALLBACK_NAME: &str = "x";

#[inline]
fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || is_separator(c)
}

#[inline]
fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-')
}

/// Letters that expand to more than one ASCII character (or have no canonical decomposition).
fn digraph(c: char) -> Option<&'static str> {
    let s = match c {
        'ä' => "ae",
        'ö' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "oe",
        'þ' => "th",
        'ł' => "l",
        'đ' => "d",
        _ => return None,
    };
    Some(s)
}

/// Push `c` if allowed, otherwise whatever allowed base characters its canonical decomposition yields.
fn push_filtered(out: &mut String, c: char) {
    if is_allowed(c) {
        out.push(c);
        return;
    }
    decompose_canonical(c, |d| {
        if is_allowed(d) {
            out.push(d);
        }
    });
}

/// Map a raw name to its canonical form.
pub fn sanitize(raw: &str) -> String {
    let lowered = raw.nfkc().collect::<String>().to_lowercase();

    let mut mapped = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                mapped.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        match c {
            '/' | '\\' => mapped.push_str("--"),
            '+' => mapped.push_str(".."),
            ',' => {}
            other => match digraph(other) {
                Some(expansion) => mapped.push_str(expansion),
                None => push_filtered(&mut mapped, other),
            },
        }
    }

    let collapsed = collapse_separator_runs(&mapped);
    let trimmed = collapsed.trim_matches(is_separator);
    let name = strip_numeric_leading_zeros(trimmed);

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

/// True when `name` is already in canonical form.
pub fn is_canonical(name: &str) -> bool {
    sanitize(name) == name
}

/// `__` -> `_`, `...` -> `..`, `---` -> `--`.
fn collapse_separator_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if !is_separator(c) {
            out.push(c);
            continue;
        }
        let mut run = 1usize;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        out.push(c);
        if run > 1 && c != '_' {
            out.push(c);
        }
    }
    out
}

fn strip_numeric_leading_zeros(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut segment = String::new();
    for c in s.chars() {
        if is_separator(c) {
            push_segment(&mut out, &segment);
            segment.clear();
            out.push(c);
        } else {
            segment.push(c);
        }
    }
    push_segment(&mut out, &segment);
    out
}

fn push_segment(out: &mut String, segment: &str) {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = segment.trim_start_matches('0');
        out.push_str(if stripped.is_empty() { "0" } else { stripped });
    } else {
        out.push_str(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn german_umlauts_and_comma() {
        assert_eq!(sanitize("Müller, Straße"), "mueller_strasse");
        assert_eq!(sanitize("ÄÖÜ"), "aeoeue");
    }

    #[test]
    fn decomposed_umlaut_is_composed_first() {
        // "u" + COMBINING DIAERESIS
        assert_eq!(sanitize("Mu\u{0308}ller"), "mueller");
    }

    #[test]
    fn separators_and_joiners() {
        assert_eq!(sanitize("A/B"), "a--b");
        assert_eq!(sanitize("a\\b"), "a--b");
        assert_eq!(sanitize("Foo + Bar"), "foo_.._bar");
        assert_eq!(sanitize("a+b"), "a..b");
        assert_eq!(sanitize("a///b"), "a--b");
    }

    #[test]
    fn whitespace_runs_collapse_to_one_underscore() {
        assert_eq!(sanitize("  Box \t 12  "), "box_12");
        assert_eq!(sanitize("a , b"), "a_b");
    }

    #[test]
    fn accents_fold_to_base_letter() {
        assert_eq!(sanitize("Café Crème"), "cafe_creme");
        assert_eq!(sanitize("Łódź"), "lodz");
    }

    #[test]
    fn compatibility_forms_fold() {
        // full-width letters and a no-break space
        assert_eq!(sanitize("ＡＢＣ\u{00A0}1"), "abc_1");
    }

    #[test]
    fn edges_trimmed_and_runs_collapsed() {
        assert_eq!(sanitize("__init__"), "init");
        assert_eq!(sanitize("a....b"), "a..b");
        assert_eq!(sanitize(".hidden."), "hidden");
    }

    #[test]
    fn numeric_segments_lose_leading_zeros() {
        assert_eq!(sanitize("Box 007"), "box_7");
        assert_eq!(sanitize("000"), "0");
        assert_eq!(sanitize("0x01"), "0x01");
        assert_eq!(sanitize("v01.002-0003"), "v01.2-3");
    }

    #[test]
    fn empty_and_unmappable_fall_back() {
        assert_eq!(sanitize(""), "x");
        assert_eq!(sanitize("!!!"), "x");
        assert_eq!(sanitize("日本"), "x");
        assert_eq!(sanitize("._-"), "x");
    }

    #[test]
    fn canonical_names_are_fixed_points() {
        for name in ["box_7", "a..b", "a--b", "x", "foo_.._bar", "0"] {
            assert!(is_canonical(name), "{name} should be canonical");
        }
        assert!(!is_canonical("Box 7"));
    }
}
