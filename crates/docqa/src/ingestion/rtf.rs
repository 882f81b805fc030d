//! Minimal RTF-to-text conversion used when pandoc is not installed
//!
//! Handles groups, control words, control symbols, `\'hh` escapes and `\uN`
//! unicode escapes, and skips destination groups (font tables, pictures,
//! document info, `\*` extensions).

/// Destinations whose content is never body text
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "object",
];

/// Convert RTF source to plain text. Returns `None` if the input is not RTF.
pub fn rtf_to_text(source: &str) -> Option<String> {
    if !source.trim_start().starts_with("{\\rtf") {
        return None;
    }

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::new();
    // Per-group flag: true while inside a skipped destination
    let mut skip_stack: Vec<bool> = vec![false];
    let mut unicode_skip = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let skipping = *skip_stack.last().unwrap_or(&false);

        match c {
            '{' => {
                skip_stack.push(skipping);
                i += 1;
            }
            '}' => {
                if skip_stack.len() > 1 {
                    skip_stack.pop();
                }
                i += 1;
            }
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };

                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();

                    let num_start = i;
                    if i < chars.len() && chars[i] == '-' {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i32> = chars[num_start..i]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .ok();

                    // A single space delimits the control word
                    if i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }

                    if SKIPPED_DESTINATIONS.contains(&word.as_str()) {
                        if let Some(top) = skip_stack.last_mut() {
                            *top = true;
                        }
                        continue;
                    }
                    if skipping {
                        continue;
                    }

                    match word.as_str() {
                        "par" | "line" | "sect" | "page" => out.push('\n'),
                        "tab" | "cell" => out.push('\t'),
                        "row" => out.push('\n'),
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65536 } else { code };
                                if let Some(ch) = char::from_u32(code as u32) {
                                    out.push(ch);
                                }
                                unicode_skip = 1;
                            }
                        }
                        _ => {}
                    }
                } else {
                    i += 1;
                    match next {
                        '*' => {
                            if let Some(top) = skip_stack.last_mut() {
                                *top = true;
                            }
                        }
                        '\'' => {
                            let hex: String = chars
                                .iter()
                                .skip(i)
                                .take(2)
                                .take_while(|c| c.is_ascii_hexdigit())
                                .collect();
                            i += hex.chars().count();
                            if unicode_skip > 0 {
                                unicode_skip -= 1;
                            } else if !skipping {
                                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                                    out.push(windows_1252(byte));
                                }
                            }
                        }
                        '\\' | '{' | '}' if !skipping => out.push(next),
                        '~' if !skipping => out.push(' '),
                        '\n' | '\r' if !skipping => out.push('\n'),
                        _ => {}
                    }
                }
            }
            '\r' | '\n' => {
                i += 1;
            }
            _ => {
                i += 1;
                if unicode_skip > 0 {
                    unicode_skip -= 1;
                } else if !skipping {
                    out.push(c);
                }
            }
        }
    }

    let text = out
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    Some(text.trim().to_string())
}

/// Map a code-page byte to a char (Latin-1 with the common 0x80-0x9F punctuation)
fn windows_1252(byte: u8) -> char {
    match byte {
        0x91 | 0x92 => '\'',
        0x93 | 0x94 => '"',
        0x95 => '*',
        0x96 | 0x97 => '-',
        0x85 => '.',
        _ => byte as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paragraphs() {
        let rtf = r"{\rtf1\ansi\deff0 {\fonttbl {\f0 Times New Roman;}}\f0\fs24 Hello world.\par Second line.}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "Hello world.\nSecond line.");
    }

    #[test]
    fn test_escapes_and_unicode() {
        let rtf = r"{\rtf1 caf\'e9 \{braces\} \u8364? price}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "café {braces} € price");
    }

    #[test]
    fn test_malformed_hex_escape_keeps_following_text() {
        let rtf = "{\\rtf1 na\\'\u{ef}ve text}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "na\u{ef}ve text");
    }

    #[test]
    fn test_ignorable_destination_skipped() {
        let rtf = r"{\rtf1 {\*\generator Riched20;}Body text}";
        assert_eq!(rtf_to_text(rtf).unwrap(), "Body text");
    }

    #[test]
    fn test_not_rtf() {
        assert!(rtf_to_text("just text").is_none());
    }
}
