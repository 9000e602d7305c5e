//! String helpers for form bodies, query strings and sensor replies.
//!
//! None of these functions fail. Malformed input resolves to an empty
//! string, zero or `false`; the `parse_*` variants return `Option` for
//! callers that need to tell a real zero apart from garbage.

use std::net::Ipv4Addr;

/// Ordered percent-escape table. Entries are applied one after another, so
/// `+` becomes a space before `%2B` becomes a literal `+`.
const URL_DECODE_TABLE: &[(&str, &str)] = &[
    ("%20", " "),
    ("%21", "!"),
    ("%23", "#"),
    ("%24", "$"),
    ("%26", "&"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
    ("+", " "),
    ("%2B", "+"),
    ("%2C", ","),
    ("%2F", "/"),
    ("%3A", ":"),
    ("%3B", ";"),
    ("%3D", "="),
    ("%3F", "?"),
    ("%40", "@"),
    ("%5B", "["),
    ("%5D", "]"),
    ("%22", "\""),
    ("%25", "%"),
    ("%2D", "-"),
    ("%2E", "."),
    ("%3C", "<"),
    ("%3E", ">"),
    ("%5C", "\\"),
    ("%5E", "^"),
    ("%5F", "_"),
    ("%60", "`"),
    ("%7B", "{"),
    ("%7C", "|"),
    ("%7D", "}"),
    ("%7E", "~"),
];

/// Returns the text between the first `keyword` and the next `terminator`.
///
/// When the terminator is missing the value runs to the next line break,
/// and failing that to the end of `text`. A missing keyword yields `""`.
///
/// ```
/// use tempbuddy_common::text::parse_by_keyword;
/// assert_eq!(parse_by_keyword("a=1&b=2", "a=", "&"), "1");
/// ```
pub fn parse_by_keyword<'a>(text: &'a str, keyword: &str, terminator: &str) -> &'a str {
    let Some(key_index) = text.find(keyword) else {
        return "";
    };
    let start = key_index + keyword.len();
    let rest = &text[start..];

    match rest.find(terminator).or_else(|| rest.find('\n')) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Counts matches of `needle`, resuming the scan after each match.
pub fn occurrences(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle).count()
}

pub fn occurrences_of_char(text: &str, needle: char) -> usize {
    text.chars().filter(|c| *c == needle).count()
}

/// Splits `text` on `separator` into the caller's fixed storage.
///
/// Returns how many slots were filled. Once `storage` is full the rest of
/// the text is dropped. A trailing separator does not produce an empty
/// final segment.
pub fn split_into<'a>(text: &'a str, separator: char, storage: &mut [&'a str]) -> usize {
    let mut rest = text;
    let mut filled = 0;

    for slot in storage.iter_mut() {
        if rest.is_empty() {
            break;
        }
        match rest.find(separator) {
            Some(index) => {
                *slot = &rest[..index];
                rest = &rest[index + separator.len_utf8()..];
            }
            None => {
                *slot = rest;
                rest = "";
            }
        }
        filled += 1;
    }

    filled
}

/// Allocating form of [`split_into`] bounded to `max_segments`.
pub fn split(text: &str, separator: char, max_segments: usize) -> Vec<&str> {
    let mut storage = vec![""; max_segments];
    let filled = split_into(text, separator, &mut storage);
    storage.truncate(filled);
    storage
}

/// Byte-indexed substring, `begin` inclusive and `end` exclusive.
///
/// Indices past the end are clamped to the text length and a `begin` past
/// `end` yields `""`. A bound that falls inside a multi-byte character
/// also yields `""`.
pub fn substring(text: &str, begin: usize, end: usize) -> &str {
    let end = end.min(text.len());
    let begin = begin.min(end);
    text.get(begin..end).unwrap_or("")
}

pub fn substring_from(text: &str, begin: usize) -> &str {
    substring(text, begin, text.len())
}

/// Strips leading and trailing bytes at or below `0x20`.
pub fn trim(text: &str) -> &str {
    text.trim_matches(|c: char| c <= ' ')
}

/// Cuts `text` down to at most `length` bytes on a character boundary.
pub fn truncate(text: &str, length: usize) -> &str {
    if text.len() <= length {
        return text;
    }
    let boundary = (0..=length)
        .rev()
        .find(|index| text.is_char_boundary(*index))
        .unwrap_or(0);
    &text[..boundary]
}

/// Decodes only the escapes in the fixed table; anything else, including
/// unknown `%XX` sequences, passes through untouched.
pub fn decode_url_string(text: &str) -> String {
    URL_DECODE_TABLE
        .iter()
        .fold(text.to_string(), |decoded, (escape, literal)| {
            decoded.replace(escape, literal)
        })
}

/// Escapes every character the decode table knows about.
pub fn encode_url_string(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for c in text.chars() {
        match URL_DECODE_TABLE
            .iter()
            .find(|(escape, literal)| escape.starts_with('%') && literal.starts_with(c))
        {
            Some((escape, _)) => encoded.push_str(escape),
            None => encoded.push(c),
        }
    }
    encoded
}

/// Parses bare hex digits (no `0x`). `None` for empty input, a non-hex
/// character or a value that does not fit in `u32`.
pub fn parse_hex(text: &str) -> Option<u32> {
    if text.is_empty() {
        return None;
    }
    text.chars().try_fold(0u32, |acc, c| {
        let digit = c.to_digit(16)?;
        acc.checked_mul(16)?.checked_add(digit)
    })
}

/// Like [`parse_hex`] but collapses every failure to `0`, so `"0"` and
/// `"zz"` are indistinguishable.
pub fn hex_string_to_int(text: &str) -> u32 {
    parse_hex(text).unwrap_or(0)
}

fn is_plain_number(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return false;
    }

    let minus = occurrences_of_char(text, '-');
    if minus > 1 || (minus == 1 && !text.starts_with('-')) {
        return false;
    }

    occurrences_of_char(text, '.') <= 1
}

/// Integer value of a plain decimal string. A fractional part is dropped,
/// so `"4.7"` gives `4`; an empty integer part such as `".5"` is `None`.
pub fn parse_int(text: &str) -> Option<i32> {
    if !is_plain_number(text) {
        return None;
    }
    let whole = text.split('.').next().unwrap_or("");
    if whole.is_empty() {
        return None;
    }
    whole.parse().ok()
}

pub fn parse_float(text: &str) -> Option<f32> {
    if !is_plain_number(text) {
        return None;
    }
    text.parse().ok()
}

pub fn parse_double(text: &str) -> Option<f64> {
    if !is_plain_number(text) {
        return None;
    }
    text.parse().ok()
}

/// `0` when `text` is empty or not a plain number. Use [`parse_int`] to
/// tell that apart from a literal `"0"`.
pub fn to_int(text: &str) -> i32 {
    parse_int(text).unwrap_or(0)
}

pub fn to_float(text: &str) -> f32 {
    parse_float(text).unwrap_or(0.0)
}

pub fn to_double(text: &str) -> f64 {
    parse_double(text).unwrap_or(0.0)
}

/// Unicast host address check used for the remote sensor address.
///
/// Requires exactly three dots. The first octet must be in `1..=223` and
/// the rest in `1..=255`, so any zero octet is rejected (`10.0.0.5` fails).
pub fn valid_dot_notation_ip(text: &str) -> bool {
    if occurrences_of_char(text, '.') != 3 {
        return false;
    }

    let mut octets = [""; 4];
    split_into(text, '.', &mut octets);

    octets.iter().enumerate().all(|(index, octet)| {
        let value = to_int(octet);
        match index {
            0 => (1..=223).contains(&value),
            _ => (1..=255).contains(&value),
        }
    })
}

/// Dotted-quad parse accepting any octet in `0..=255`, for masks and AP
/// addressing where zero octets are normal.
pub fn parse_ipv4(text: &str) -> Option<Ipv4Addr> {
    if occurrences_of_char(text, '.') != 3 {
        return None;
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(text.split('.')) {
        if part.is_empty() || part.len() > 3 || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }

    Some(Ipv4Addr::from(octets))
}

/// Length of the run of identical characters starting at byte `begin`.
/// Zero when `begin` is out of range.
pub fn count_consecutive_repeating_chars(text: &str, begin: usize) -> usize {
    let Some(first) = text.get(begin..).and_then(|rest| rest.chars().next()) else {
        return 0;
    };
    text[begin..].chars().take_while(|c| *c == first).count()
}

/// Reorders the characters of `input` from one mask layout to another.
///
/// `input_pattern` labels each character of `input` (for example
/// `"ddmmyyyy"`). Contiguous runs of the same label form fields. Each run in
/// `desired_pattern` takes that many trailing characters of the first field
/// with the same label; characters with no matching field are copied
/// through as literals.
///
/// ```
/// use tempbuddy_common::text::arrange_digits_using_pattern;
/// assert_eq!(
///     arrange_digits_using_pattern("23022023", "ddmmyyyy", "mmddyyyy"),
///     "02232023"
/// );
/// ```
pub fn arrange_digits_using_pattern(input: &str, input_pattern: &str, desired_pattern: &str) -> String {
    if input.is_empty() || input_pattern.is_empty() || desired_pattern.is_empty() {
        return String::new();
    }
    if input.chars().count() != input_pattern.chars().count() {
        return String::new();
    }

    let mut fields: Vec<(char, Vec<char>)> = Vec::new();
    for (mask, value) in input_pattern.chars().zip(input.chars()) {
        match fields.last_mut() {
            Some((current, content)) if *current == mask => content.push(value),
            _ => fields.push((mask, vec![value])),
        }
    }

    let desired: Vec<char> = desired_pattern.chars().collect();
    let mut result = String::with_capacity(desired.len());
    let mut index = 0;
    while index < desired.len() {
        let mask = desired[index];
        let run = desired[index..].iter().take_while(|c| **c == mask).count();

        match fields.iter().find(|(label, _)| *label == mask) {
            Some((_, content)) => {
                let skip = content.len().saturating_sub(run);
                result.extend(&content[skip..]);
            }
            None => result.extend(std::iter::repeat(mask).take(run)),
        }
        index += run;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyword_value_between_markers() {
        assert_eq!(parse_by_keyword("a=1&b=2", "a=", "&"), "1");
        assert_eq!(parse_by_keyword("a=1&b=2", "b=", "&"), "2");
        assert_eq!(
            parse_by_keyword(
                "This is a sentence and it may contain a lot of data",
                "a ",
                " and"
            ),
            "sentence"
        );
    }

    #[test]
    fn keyword_falls_back_to_line_break_then_end() {
        assert_eq!(parse_by_keyword("temp=71\nhum=40", "temp=", "&"), "71");
        assert_eq!(parse_by_keyword("temp=71", "temp=", "&"), "71");
        assert_eq!(parse_by_keyword("temp=71", "humidity=", "&"), "");
    }

    #[test]
    fn keyword_pulls_legacy_sensor_reading() {
        let body = "<html><body>Temperature: 72.5&deg;F<br>Humidity: 41%</body></html>";
        assert_eq!(trim(parse_by_keyword(body, "Temperature:", "&deg;")), "72.5");
    }

    #[test]
    fn occurrences_advance_past_each_match() {
        assert_eq!(occurrences("aaaa", "aa"), 2);
        assert_eq!(occurrences("a=1&b=2&c=3", "&"), 2);
        assert_eq!(occurrences("abc", ""), 0);
        assert_eq!(occurrences_of_char("192.168.1.1", '.'), 3);
    }

    #[test]
    fn split_respects_storage_budget() {
        let mut storage = [""; 2];
        let filled = split_into("a&b&c&d", '&', &mut storage);

        assert_eq!(filled, 2);
        assert_eq!(storage, ["a", "b"]);
        assert_eq!(split("a,,b", ',', 8), vec!["a", "", "b"]);
        assert_eq!(split("a,b,", ',', 8), vec!["a", "b"]);
        assert_eq!(split(",a", ',', 8), vec!["", "a"]);
        assert!(split("", ',', 8).is_empty());
        assert!(split("a,b", ',', 0).is_empty());
    }

    #[test]
    fn substring_clamps_out_of_range() {
        assert_eq!(substring("hello", 1, 3), "el");
        assert_eq!(substring("hello", 3, 99), "lo");
        assert_eq!(substring("hello", 4, 2), "");
        assert_eq!(substring_from("hello", 2), "llo");
        assert_eq!(substring_from("hello", 10), "");
        assert_eq!(substring("h\u{e9}llo", 2, 4), "");
    }

    #[test]
    fn trim_strips_control_bytes() {
        assert_eq!(trim("\t\r\n  value \u{1}"), "value");
        assert_eq!(trim("   "), "");
        assert_eq!(truncate("TempBuddy", 4), "Temp");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn url_decode_applies_plus_before_escaped_plus() {
        assert_eq!(decode_url_string("a+b%2Bc"), "a b+c");
        assert_eq!(decode_url_string("Temp%20Buddy%21"), "Temp Buddy!");
        assert_eq!(decode_url_string("%5Bx%5D"), "[x]");
        assert_eq!(decode_url_string("100%"), "100%");
        assert_eq!(decode_url_string("%C3%A9"), "%C3%A9");
    }

    #[test]
    fn url_table_entries_survive_encode_then_decode() {
        for (escape, literal) in URL_DECODE_TABLE {
            if !escape.starts_with('%') {
                continue;
            }
            let encoded = encode_url_string(literal);
            assert_eq!(encoded, *escape);
            assert_eq!(decode_url_string(&encoded), *literal);
        }
        assert_eq!(decode_url_string(&encode_url_string("my pass+word!")), "my pass+word!");
    }

    #[test]
    fn hex_parse_flags_invalid_digits() {
        assert_eq!(hex_string_to_int("2B"), 43);
        assert_eq!(hex_string_to_int("ff"), 255);
        assert_eq!(hex_string_to_int("2G"), 0);
        assert_eq!(hex_string_to_int(""), 0);
        assert_eq!(parse_hex("0"), Some(0));
        assert_eq!(parse_hex("zz"), None);
        assert_eq!(parse_hex("1FFFFFFFF"), None);
    }

    #[test]
    fn numeric_sentinels() {
        assert_eq!(to_int("42"), 42);
        assert_eq!(to_int(""), 0);
        assert_eq!(to_int("4.2.3"), 0);
        assert_eq!(to_int("-5"), -5);
        assert_eq!(to_int("5-"), 0);
        assert_eq!(to_int("4.7"), 4);
        assert_eq!(to_int("abc"), 0);
        assert_eq!(to_float("-2.5"), -2.5);
        assert_eq!(to_float("4.2.3"), 0.0);
        assert_eq!(to_float("5-"), 0.0);
        assert_eq!(to_double("70.25"), 70.25);
    }

    #[test]
    fn parse_variants_distinguish_zero_from_garbage() {
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(".5"), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_float("0"), Some(0.0));
        assert_eq!(parse_float("."), None);
        assert_eq!(parse_float("1e5"), None);
        assert_eq!(parse_double("--1"), None);
    }

    #[test]
    fn dot_notation_ip_rules() {
        assert!(valid_dot_notation_ip("192.168.1.1"));
        assert!(valid_dot_notation_ip("223.255.255.255"));
        assert!(!valid_dot_notation_ip("0.168.1.1"));
        assert!(!valid_dot_notation_ip("224.0.0.1"));
        assert!(!valid_dot_notation_ip("192.168.1.256"));
        assert!(!valid_dot_notation_ip("192.168.1"));
        assert!(!valid_dot_notation_ip("192.168.1.1.1"));
        assert!(!valid_dot_notation_ip("192.168.1."));
        assert!(!valid_dot_notation_ip("10.0.0.5"));
        assert!(!valid_dot_notation_ip("a.b.c.d"));
    }

    #[test]
    fn ipv4_parse_allows_zero_octets() {
        assert_eq!(parse_ipv4("255.255.255.0"), Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(parse_ipv4("10.0.0.5"), Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(parse_ipv4("10.0.0"), None);
        assert_eq!(parse_ipv4("10.0..5"), None);
        assert_eq!(parse_ipv4("10.0.0.300"), None);
    }

    #[test]
    fn consecutive_run_length() {
        assert_eq!(count_consecutive_repeating_chars("ddmmyyyy", 0), 2);
        assert_eq!(count_consecutive_repeating_chars("ddmmyyyy", 4), 4);
        assert_eq!(count_consecutive_repeating_chars("ddmmyyyy", 5), 3);
        assert_eq!(count_consecutive_repeating_chars("abc", 9), 0);
    }

    #[test]
    fn arrange_digits_reorders_fields() {
        assert_eq!(
            arrange_digits_using_pattern("23022023", "ddmmyyyy", "mmddyyyy"),
            "02232023"
        );
        assert_eq!(
            arrange_digits_using_pattern("23022023", "ddmmyyyy", "yyyy-mm-dd"),
            "2023-02-23"
        );
        assert_eq!(
            arrange_digits_using_pattern("23022023", "ddmmyyyy", "mm/dd/yy"),
            "02/23/23"
        );
    }

    #[test]
    fn arrange_digits_rejects_bad_input() {
        assert_eq!(arrange_digits_using_pattern("2302", "ddmmyy", "mmdd"), "");
        assert_eq!(arrange_digits_using_pattern("", "", "mm"), "");
        assert_eq!(arrange_digits_using_pattern("2302", "ddmm", ""), "");
    }
}
