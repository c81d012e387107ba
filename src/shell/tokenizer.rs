use std::fmt;
use std::ops::Range;

/// The units a command line is split into.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A run of characters up to whitespace or one of `( ) , =`.
    /// Keywords, names, `col:type` declarations and unquoted values are all words.
    Word(String),
    /// A literal between matching `'` or `"`, kept with its quotes so that the
    /// type system can strip them (e.g. `"Alice Smith"`).
    Quoted(String),

    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Equal sign `=`
    Equal,

    /// Represents the end of the line.
    Eof,
}

impl Token {
    /// True if this is a word equal to `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

/// Source text of the token.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(s) | Token::Quoted(s) => f.write_str(s),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Equal => f.write_str("="),
            Token::Eof => Ok(()),
        }
    }
}

/// A token and the character positions it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    /// Char indices into the input, end exclusive.
    pub span: Range<usize>,
}

/// A scanner that converts a command line into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending with [Token::Eof].
    ///
    /// # Errors
    /// Returns an error if a quoted literal is not terminated.
    ///
    /// # Example
    /// ```
    /// # use primdb::shell::tokenizer::{Tokenizer, Token};
    /// let tokens = Tokenizer::new("select from users").tokenize().unwrap();
    /// assert!(tokens[0].is_keyword("SELECT"));
    /// assert_eq!(tokens[3], Token::Eof);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        Ok(self
            .tokenize_spanned()?
            .into_iter()
            .map(|spanned| spanned.token)
            .collect())
    }

    /// Like [Tokenizer::tokenize], keeping where each token came from so that callers
    /// can take values from the input verbatim.
    ///
    /// # Errors
    /// Returns an error if a quoted literal is not terminated.
    pub fn tokenize_spanned(&mut self) -> Result<Vec<Spanned>, String> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let start = self.position;
            let token = self.next_token()?;
            tokens.push(Spanned {
                token,
                span: start..self.position,
            });
        }

        let end = self.input.len();
        tokens.push(Spanned {
            token: Token::Eof,
            span: end..end,
        });
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token, String> {
        let ch = self.current_char();

        match ch {
            '(' => {
                self.advance();
                Ok(Token::LeftParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RightParen)
            }
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }
            '=' => {
                self.advance();
                Ok(Token::Equal)
            }
            '\'' | '"' => self.read_quoted(ch),
            _ => Ok(self.read_word()),
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads until whitespace or a symbol. Quotes inside a word are ordinary characters.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() || matches!(ch, '(' | ')' | ',' | '=') {
                break;
            }
            word.push(ch);
            self.advance();
        }

        Token::Word(word)
    }

    /// Reads a literal enclosed in `quote`, keeping both quotes.
    fn read_quoted(&mut self, quote: char) -> Result<Token, String> {
        let mut literal = String::from(quote);
        self.advance(); // Skip the opening quote

        while !self.is_at_end() && self.current_char() != quote {
            literal.push(self.current_char());
            self.advance();
        }

        if self.is_at_end() {
            return Err(format!("Unterminated string {literal}"));
        }

        literal.push(quote);
        self.advance(); // Skip the closing quote

        Ok(Token::Quoted(literal))
    }
}
