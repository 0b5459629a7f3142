use lazy_static::lazy_static;
use regex::Regex;

use crate::symbol::is_reserved;

/// A single word of cleaned-up source plus the line it came from. Columns do
/// not survive the cleanup, so errors report line numbers only.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub text: String,
    pub line: u32,
}

impl Token {
    fn new(text: impl Into<String>, line: u32) -> Self {
        Token {
            text: text.into(),
            line,
        }
    }
}

lazy_static! {
    static ref WS: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Turn raw source into the final token stream: collapse whitespace, strip
/// comments, infer label colons, and compact data-directive operand lists so
/// that a single space can act as the universal token separator.
pub fn scrub(src: &str) -> Vec<Token> {
    let mut out = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let collapsed = WS.replace_all(raw, " ");
        let stripped = match collapsed.find(';') {
            Some(semi) => &collapsed[..semi],
            None => &collapsed,
        };
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut words: Vec<String> = trimmed.split(' ').map(str::to_string).collect();

        // A bare name alone on its line, or one in front of a reserved word,
        // is an unmarked label.
        let needs_colon = {
            let first = &words[0];
            !first.ends_with(':')
                && !is_reserved(first)
                && match words.get(1) {
                    None => true,
                    Some(next) => is_reserved(next),
                }
        };
        if needs_colon {
            words[0].push(':');
        }

        // Data directives take a comma-separated list that may contain string
        // literals with spaces. Fuse the list back into one word: spaces
        // inside quotes become an explicit `,32,` so the byte survives the
        // split, and spaces around item commas vanish.
        if let Some(dir) = words
            .iter()
            .position(|w| w.eq_ignore_ascii_case(".DB") || w.eq_ignore_ascii_case(".DW"))
        {
            if dir + 1 < words.len() {
                let operands = words.split_off(dir + 1).join(" ");
                words.extend(
                    compact_data_operands(&operands)
                        .split(' ')
                        .map(str::to_string),
                );
            }
        }

        for word in words {
            out.push(Token::new(word, line_no));
        }
    }

    out
}

fn compact_data_operands(operands: &str) -> String {
    // "AB CD" -> "AB",32,"CD"
    let mut fused = String::with_capacity(operands.len());
    let mut quote: Option<char> = None;
    for c in operands.chars() {
        match c {
            '"' | '\'' => {
                match quote {
                    Some(q) if q == c => quote = None,
                    None => quote = Some(c),
                    Some(_) => {} // the other quote char, literal inside a string
                }
                fused.push(c);
            }
            ' ' => match quote {
                Some(q) => {
                    fused.push(q);
                    fused.push_str(",32,");
                    fused.push(q);
                }
                None => fused.push(c),
            },
            _ => fused.push(c),
        }
    }

    // `1, 2 ,3` -> `1,2,3`; a space with no comma beside it still separates
    // the list from whatever statement follows on the line.
    let chars: Vec<char> = fused.chars().collect();
    let mut out = String::with_capacity(fused.len());
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '"' | '\'' => {
                match quote {
                    Some(q) if q == c => quote = None,
                    None => quote = Some(c),
                    Some(_) => {}
                }
                out.push(c);
            }
            ' ' if quote.is_none() => {
                let joins_items = out.ends_with(',') || chars.get(i + 1) == Some(&',');
                if !joins_items {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        scrub(src).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn collapses_whitespace_and_comments() {
        let toks = texts("  LDA   #$05\t ; load five\n; whole line comment\n\nBRK");
        assert_eq!(toks, vec!["LDA", "#$05", "BRK"]);
    }

    #[test]
    fn tracks_line_numbers() {
        let toks = scrub("NOP\n\nBRK");
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[1].line, 3);
    }

    #[test]
    fn infers_colon_on_bare_label() {
        assert_eq!(texts("START\nNOP"), vec!["START:", "NOP"]);
    }

    #[test]
    fn infers_colon_before_reserved_word() {
        assert_eq!(texts("LOOP INX"), vec!["LOOP:", "INX"]);
        // EQU is reserved, so assignment names get a colon too; the constant
        // scan strips it back off.
        assert_eq!(texts("FIVE EQU 5"), vec!["FIVE:", "EQU", "5"]);
    }

    #[test]
    fn leaves_reserved_and_marked_labels_alone() {
        assert_eq!(texts("NOP"), vec!["NOP"]);
        assert_eq!(texts("DONE: BRK"), vec!["DONE:", "BRK"]);
        // `=` is not reserved, so assignment names stay bare
        assert_eq!(texts("PTR = $0200"), vec!["PTR", "=", "$0200"]);
    }

    #[test]
    fn compacts_data_operands() {
        assert_eq!(texts(".DB 1, 2, 3"), vec![".DB", "1,2,3"]);
        assert_eq!(texts(".DB \"AB CD\", 10"), vec![".DB", "\"AB\",32,\"CD\",10"]);
        assert_eq!(texts("TAB: .DW 1, $200"), vec!["TAB:", ".DW", "1,$200"]);
    }

    #[test]
    fn preserves_commas_inside_strings() {
        assert_eq!(texts(".DB \"A,B\""), vec![".DB", "\"A,B\""]);
    }

    #[test]
    fn data_list_does_not_swallow_following_statements() {
        assert_eq!(
            texts(".DW START .ORG $8000 START: LDA #$41"),
            vec![".DW", "START", ".ORG", "$8000", "START:", "LDA", "#$41"]
        );
    }
}
