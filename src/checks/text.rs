//! Body decoding and whitespace normalization for substring checks.

use chardetng::EncodingDetector;

/// Decodes a response body to UTF-8 using content-sniffed charset
/// detection. The declared header charset is deliberately ignored: servers
/// frequently declare `utf-8` while serving a legacy single-byte encoding.
pub(crate) fn decode_body(body: &[u8]) -> String {
    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Normalizes whitespace for substring search: non-breaking spaces become
/// regular spaces, and runs of spaces/tabs collapse to a single space.
pub(crate) fn normalize_space(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for mut c in s.chars() {
        if c == '\u{a0}' {
            c = ' ';
        }
        if c == ' ' || c == '\t' {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
            continue;
        }
        prev_space = false;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_replaces_nbsp_with_space() {
        assert_eq!(normalize_space("Hello\u{a0}World"), "Hello World");
    }

    #[test]
    fn normalize_collapses_space_and_tab_runs() {
        assert_eq!(normalize_space("a  \t b"), "a b");
        assert_eq!(normalize_space("\t\ta"), " a");
    }

    #[test]
    fn normalize_keeps_newlines() {
        assert_eq!(normalize_space("a\nb"), "a\nb");
    }

    #[test]
    fn decode_handles_plain_utf8() {
        assert_eq!(decode_body("привет".as_bytes()), "привет");
    }

    #[test]
    fn decode_sniffs_windows_1251() {
        // "Добро пожаловать" in windows-1251; a utf-8 read would be mojibake.
        let body: Vec<u8> = vec![
            0xc4, 0xee, 0xe1, 0xf0, 0xee, 0x20, 0xef, 0xee, 0xe6, 0xe0, 0xeb, 0xee, 0xe2, 0xe0,
            0xf2, 0xfc,
        ];
        assert_eq!(decode_body(&body), "Добро пожаловать");
    }
}
