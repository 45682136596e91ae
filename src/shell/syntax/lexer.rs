//! Character-level tokenizer.
//!
//! A deterministic state machine over the NFC-normalized input line. Space
//! and tab delimit words outside quotes; single quotes take everything
//! literally, double quotes honor a restricted escape set, and an unquoted
//! `~` expands to the home directory wherever it appears. An unterminated
//! quote at end of input yields the partial word rather than an error.

use unicode_normalization::UnicodeNormalization;

use super::tokens::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Neutral,
    InSingle,
    InDouble,
    EscapeNeutral,
    EscapeDouble,
}

pub fn lex(line: &str, home: &str) -> Vec<Token> {
    let line: String = line.nfc().collect();
    let mut tokens = Vec::new();
    let mut acc = String::new();
    let mut quoted = false;
    // A quote pair makes a word even when it encloses nothing, so `''` is
    // a real empty argument.
    let mut opened = false;
    let mut state = State::Neutral;

    for c in line.chars() {
        match state {
            State::Neutral => match c {
                '\'' => {
                    state = State::InSingle;
                    quoted = true;
                    opened = true;
                }
                '"' => {
                    state = State::InDouble;
                    quoted = true;
                    opened = true;
                }
                '\\' => {
                    state = State::EscapeNeutral;
                    quoted = true;
                }
                '~' => acc.push_str(home),
                ' ' | '\t' => flush(&mut tokens, &mut acc, &mut quoted, &mut opened),
                _ => acc.push(c),
            },
            State::InSingle => match c {
                '\'' => state = State::Neutral,
                _ => acc.push(c),
            },
            State::InDouble => match c {
                '"' => state = State::Neutral,
                '\\' => state = State::EscapeDouble,
                _ => acc.push(c),
            },
            State::EscapeNeutral => {
                acc.push(c);
                state = State::Neutral;
            }
            State::EscapeDouble => {
                match c {
                    '"' | '\\' | '$' | '`' => acc.push(c),
                    _ => {
                        acc.push('\\');
                        acc.push(c);
                    }
                }
                state = State::InDouble;
            }
        }
    }
    // A trailing backslash has nothing to escape and is dropped; an open
    // quote yields the partial word.
    flush(&mut tokens, &mut acc, &mut quoted, &mut opened);
    tokens
}

fn flush(tokens: &mut Vec<Token>, acc: &mut String, quoted: &mut bool, opened: &mut bool) {
    if !acc.is_empty() || *opened {
        tokens.push(Token {
            text: std::mem::take(acc),
            quoted: *quoted,
        });
    }
    *quoted = false;
    *opened = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/u";

    fn texts(line: &str) -> Vec<String> {
        lex(line, HOME).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_runs_of_whitespace() {
        assert_eq!(texts("echo hello   world"), ["echo", "hello", "world"]);
        assert_eq!(texts("\techo  a\t b "), ["echo", "a", "b"]);
    }

    #[test]
    fn single_quotes_preserve_everything() {
        assert_eq!(texts("echo 'a  b'"), ["echo", "a  b"]);
        assert_eq!(texts(r"echo 'a\nb'"), ["echo", r"a\nb"]);
        assert_eq!(texts("echo 'x~y'"), ["echo", "x~y"]);
    }

    #[test]
    fn double_quote_escape_set() {
        assert_eq!(texts(r#"echo "c\"d""#), ["echo", r#"c"d"#]);
        assert_eq!(texts(r#"echo "a\$b""#), ["echo", "a$b"]);
        assert_eq!(texts(r#"echo "a\\b""#), ["echo", r"a\b"]);
        // Outside the escape set the backslash stays.
        assert_eq!(texts(r#"echo "a\nb""#), ["echo", r"a\nb"]);
    }

    #[test]
    fn neutral_escape_is_literal_next_char() {
        assert_eq!(texts(r"echo a\ b"), ["echo", "a b"]);
        assert_eq!(texts(r"echo \~"), ["echo", "~"]);
    }

    #[test]
    fn tilde_expands_anywhere_unquoted() {
        assert_eq!(texts("cd ~"), ["cd", "/home/u"]);
        assert_eq!(texts("cd ~/src"), ["cd", "/home/u/src"]);
        assert_eq!(texts("echo a~b"), ["echo", "a/home/ub"]);
        assert_eq!(texts(r#"echo "~""#), ["echo", "~"]);
    }

    #[test]
    fn adjacent_quoted_pieces_join_into_one_word() {
        assert_eq!(texts(r#"echo 'a'"b"c"#), ["echo", "abc"]);
    }

    #[test]
    fn unterminated_quote_yields_partial_word() {
        assert_eq!(texts("echo 'abc"), ["echo", "abc"]);
        assert_eq!(texts(r#"echo "abc"#), ["echo", "abc"]);
    }

    #[test]
    fn trailing_backslash_is_dropped() {
        assert_eq!(texts(r"echo a\"), ["echo", "a"]);
    }

    #[test]
    fn quoted_and_escaped_operators_are_marked() {
        let tokens = lex("echo '>' \\| \">>\"", HOME);
        assert_eq!(tokens[0], Token::word("echo"));
        assert_eq!(tokens[1], Token::quoted(">"));
        assert_eq!(tokens[2], Token::quoted("|"));
        assert_eq!(tokens[3], Token::quoted(">>"));
        assert!(!tokens[1].is_operator(">"));
    }

    #[test]
    fn bare_operators_are_unquoted_words() {
        let tokens = lex("echo hi > out.txt", HOME);
        assert!(tokens[2].is_operator(">"));
    }

    #[test]
    fn input_is_nfc_normalized() {
        // e + combining acute normalizes to the precomposed form.
        assert_eq!(texts("echo e\u{0301}"), ["echo", "\u{00e9}"]);
    }

    #[test]
    fn empty_quotes_produce_an_empty_word() {
        assert_eq!(texts("echo ''"), ["echo", ""]);
        assert_eq!(texts("echo \"\" x"), ["echo", "", "x"]);
        let tokens = lex("echo ''", HOME);
        assert_eq!(tokens[1], Token::quoted(""));
    }
}
