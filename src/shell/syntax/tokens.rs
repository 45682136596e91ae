/// A single word produced by the lexer. Quote marks and escape characters
/// have already been consumed. `quoted` records whether any character of the
/// word arrived through quotes or an escape; such a word can never be
/// recognized as a pipe or redirection operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
}

impl Token {
    pub fn word<S: Into<String>>(text: S) -> Token {
        Token {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted<S: Into<String>>(text: S) -> Token {
        Token {
            text: text.into(),
            quoted: true,
        }
    }

    /// True when this token is the bare, unquoted operator `op`.
    pub fn is_operator(&self, op: &str) -> bool {
        !self.quoted && self.text == op
    }
}
