use crate::token::{Span, Token, TokenKind};

/// Byte cursor over a single source string.
///
/// The parser backtracks by saving `current_position` and calling `rewind`,
/// which restarts the scan from the beginning. That makes a rewind O(pos),
/// which is fine here since scripts are short and rewinds are rare (one per
/// attempted destructuring assignment).
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    read_position: usize,
    ch: u8,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input,
            position: 0,
            read_position: 0,
            ch: 0,
        };
        lexer.read_char();
        lexer
    }

    /// Byte offset of the scan cursor, used as a rewind target.
    pub fn current_position(&self) -> usize {
        self.position
    }

    /// Restarts the scan and re-consumes tokens until the cursor reaches
    /// `pos`. Token boundaries are deterministic, so the stream after the
    /// rewind is identical to a fresh scan from that offset.
    pub fn rewind(&mut self, pos: usize) {
        self.position = 0;
        self.read_position = 0;
        self.read_char();
        while self.position < pos {
            self.next_token();
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let start = self.position.min(self.input.len());

            let token = match self.ch {
                0 => return Token::eof(self.input.len()),
                b'#' => {
                    self.skip_line();
                    continue;
                }
                b'/' if self.peek_char() == b'/' => {
                    self.skip_line();
                    continue;
                }
                b'=' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::Eq)
                    } else {
                        self.one(start, TokenKind::Assign)
                    }
                }
                b'+' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::PlusAssign)
                    } else {
                        self.one(start, TokenKind::Plus)
                    }
                }
                b'-' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::MinusAssign)
                    } else {
                        self.one(start, TokenKind::Minus)
                    }
                }
                b'!' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::NotEq)
                    } else {
                        self.one(start, TokenKind::Bang)
                    }
                }
                b'*' => {
                    if self.peek_char() == b'*' {
                        self.read_char();
                        if self.peek_char() == b'=' {
                            self.two(start, TokenKind::PowerAssign)
                        } else {
                            Token::new(TokenKind::Power, "**", Span::new(start, 2))
                        }
                    } else if self.peek_char() == b'=' {
                        self.two(start, TokenKind::AsteriskAssign)
                    } else {
                        self.one(start, TokenKind::Asterisk)
                    }
                }
                b'/' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::SlashAssign)
                    } else {
                        self.one(start, TokenKind::Slash)
                    }
                }
                b'%' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::ModuloAssign)
                    } else {
                        self.one(start, TokenKind::Modulo)
                    }
                }
                b'<' => {
                    if self.peek_char() == b'=' {
                        self.read_char();
                        if self.peek_char() == b'>' {
                            self.two(start, TokenKind::Cmp)
                        } else {
                            Token::new(TokenKind::LtEq, "<=", Span::new(start, 2))
                        }
                    } else {
                        self.one(start, TokenKind::Lt)
                    }
                }
                b'>' => {
                    if self.peek_char() == b'=' {
                        self.two(start, TokenKind::GtEq)
                    } else {
                        self.one(start, TokenKind::Gt)
                    }
                }
                b'&' => {
                    if self.peek_char() == b'&' {
                        self.two(start, TokenKind::And)
                    } else {
                        self.one(start, TokenKind::Illegal)
                    }
                }
                b'|' => {
                    if self.peek_char() == b'|' {
                        self.two(start, TokenKind::Or)
                    } else {
                        self.one(start, TokenKind::Pipe)
                    }
                }
                b'~' => self.one(start, TokenKind::Tilde),
                b'.' => {
                    if self.peek_char() == b'.' {
                        self.two(start, TokenKind::Range)
                    } else {
                        self.one(start, TokenKind::Dot)
                    }
                }
                b'?' => {
                    if self.peek_char() == b'.' {
                        self.two(start, TokenKind::QuestionDot)
                    } else {
                        self.one(start, TokenKind::Illegal)
                    }
                }
                b'@' => self.one(start, TokenKind::At),
                b',' => self.one(start, TokenKind::Comma),
                b';' => self.one(start, TokenKind::Semicolon),
                b':' => self.one(start, TokenKind::Colon),
                b'(' => self.one(start, TokenKind::LParen),
                b')' => self.one(start, TokenKind::RParen),
                b'{' => self.one(start, TokenKind::LBrace),
                b'}' => self.one(start, TokenKind::RBrace),
                b'[' => self.one(start, TokenKind::LBracket),
                b']' => self.one(start, TokenKind::RBracket),
                b'"' => {
                    let value = self.read_string();
                    let end = (self.position + 1).min(self.input.len());
                    Token::new(TokenKind::Str, value, Span::new(start, end - start))
                }
                b'$' => {
                    if self.peek_char() == b'(' {
                        let value = self.read_command();
                        let end = self.position.min(self.input.len());
                        Token::new(TokenKind::Command, value, Span::new(start, end - start))
                    } else {
                        self.one(start, TokenKind::Illegal)
                    }
                }
                c if is_letter(c) => {
                    let literal = self.read_identifier();
                    let kind = TokenKind::from(literal);
                    return Token::new(kind, literal, Span::new(start, self.position - start));
                }
                c if c.is_ascii_digit() => {
                    let (literal, kind) = self.read_number();
                    let end = self.position.min(self.input.len());
                    return Token::new(kind, literal, Span::new(start, end - start));
                }
                _ => {
                    // An unexpected multi-byte char is consumed whole so the
                    // cursor never lands inside a UTF-8 sequence.
                    let ch = self.input[self.position..]
                        .chars()
                        .next()
                        .unwrap_or('\u{fffd}');
                    let width = ch.len_utf8();
                    self.read_position = self.position + width;
                    Token::new(
                        TokenKind::Illegal,
                        &self.input[self.position..self.position + width],
                        Span::new(start, width),
                    )
                }
            };

            self.read_char();
            return token;
        }
    }

    fn one(&self, start: usize, kind: TokenKind) -> Token {
        Token::new(kind, (self.ch as char).to_string(), Span::new(start, 1))
    }

    fn two(&mut self, start: usize, kind: TokenKind) -> Token {
        self.read_char();
        let end = (self.position + 1).min(self.input.len());
        Token::new(kind, &self.input[start..end], Span::new(start, end - start))
    }

    fn read_char(&mut self) {
        self.ch = self.input.as_bytes().get(self.read_position).copied().unwrap_or(0);
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> u8 {
        self.input.as_bytes().get(self.read_position).copied().unwrap_or(0)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, b' ' | b'\t' | b'\n' | b'\r') {
            self.read_char();
        }
    }

    fn skip_line(&mut self) {
        while self.ch != b'\n' && self.ch != 0 {
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> &'a str {
        let start = self.position;
        while is_letter(self.ch) {
            self.read_char();
        }
        &self.input[start..self.position.min(self.input.len())]
    }

    /// Scans a number. A `.` followed by another `.` or a non-digit ends the
    /// number (that is what keeps `1..10` a range and `1.str()` a method
    /// call); a second in-number `.` makes the token illegal.
    fn read_number(&mut self) -> (&'a str, TokenKind) {
        let start = self.position;
        let mut has_dot = false;
        while self.ch.is_ascii_digit() || self.ch == b'.' {
            if self.ch == b'.' {
                if self.peek_char() == b'.' || !self.peek_char().is_ascii_digit() {
                    break;
                }
                if has_dot {
                    let literal = &self.input[start..self.read_position];
                    self.read_char();
                    return (literal, TokenKind::Illegal);
                }
                has_dot = true;
            }
            self.read_char();
        }
        (&self.input[start..self.position.min(self.input.len())], TokenKind::Number)
    }

    /// Scans a `"` delimited string supporting `\"` and `\\`; any other
    /// backslash passes through verbatim. An unterminated string ends at EOF.
    fn read_string(&mut self) -> String {
        let mut value = Vec::new();
        loop {
            self.read_char();
            match self.ch {
                0 | b'"' => break,
                b'\\' if self.peek_char() == b'"' => {
                    value.push(b'"');
                    self.read_char();
                }
                b'\\' if self.peek_char() == b'\\' => {
                    value.push(b'\\');
                    self.read_char();
                }
                c => value.push(c),
            }
        }
        String::from_utf8_lossy(&value).into_owned()
    }

    /// Captures the raw text of a `$(...)` command up to the end of the
    /// line. A trailing `)` or `);` is trimmed; in the `);` case the cursor
    /// is moved back so the `;` is emitted as its own token.
    fn read_command(&mut self) -> String {
        let start = self.position + 2;
        loop {
            self.read_char();
            if matches!(self.ch, b'\n' | b'\r' | 0) {
                break;
            }
        }
        let end = self.position.min(self.input.len());
        let mut raw = &self.input[start.min(end)..end];
        if let Some(stripped) = raw.strip_suffix(");") {
            raw = stripped;
            self.position = end - 1;
            self.read_position = self.position;
        } else if let Some(stripped) = raw.strip_suffix(')') {
            raw = stripped;
        }
        raw.to_string()
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let kind = token.kind;
            out.push(kind);
            if kind == Eof {
                return out;
            }
        }
    }

    fn literals(input: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.is(Eof);
            out.push((token.kind, token.literal));
            if done {
                return out;
            }
        }
    }

    #[test]
    fn test_next_token() {
        let input = r#"five = 5;
ten = 10.5;
add = f(x, y) { x + y };
1 <= 2 >= 3;
1 <=> 2;
a && b || !c;
result != true == false;
1..10;
h | first()
x ?. y
@decorated
while for in if else return null
"#;
        let expected = vec![
            Ident, Assign, Number, Semicolon,
            Ident, Assign, Number, Semicolon,
            Ident, Assign, Function, LParen, Ident, Comma, Ident, RParen, LBrace, Ident, Plus,
            Ident, RBrace, Semicolon,
            Number, LtEq, Number, GtEq, Number, Semicolon,
            Number, Cmp, Number, Semicolon,
            Ident, And, Ident, Or, Bang, Ident, Semicolon,
            Ident, NotEq, True, Eq, False, Semicolon,
            Number, Range, Number, Semicolon,
            Ident, Pipe, Ident, LParen, RParen,
            Ident, QuestionDot, Ident,
            At, Ident,
            While, For, In, If, Else, Return, Null,
            Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn test_compound_assign_operators() {
        let input = "+= -= *= /= **= %= ** * =";
        let expected = vec![
            PlusAssign, MinusAssign, AsteriskAssign, SlashAssign, PowerAssign, ModuloAssign,
            Power, Asterisk, Assign, Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn test_number_vs_range_vs_method() {
        assert_eq!(kinds("1..10"), vec![Number, Range, Number, Eof]);
        assert_eq!(kinds("1.23"), vec![Number, Eof]);
        assert_eq!(kinds("1.str()"), vec![Number, Dot, Ident, LParen, RParen, Eof]);
        assert_eq!(
            literals("1.2.3"),
            vec![
                (Illegal, "1.2.".to_string()),
                (Number, "3".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            literals(r#""hel\"lo""#)[0],
            (Str, "hel\"lo".to_string())
        );
        assert_eq!(
            literals(r#""back\\slash""#)[0],
            (Str, "back\\slash".to_string())
        );
        assert_eq!(literals(r#""he\llo""#)[0], (Str, "he\\llo".to_string()));
        // unterminated strings end at EOF
        assert_eq!(literals(r#""abc"#)[0], (Str, "abc".to_string()));
    }

    #[test]
    fn test_command_literals() {
        assert_eq!(
            literals("$(echo hello)"),
            vec![
                (Command, "echo hello".to_string()),
                (Eof, String::new()),
            ]
        );
        assert_eq!(
            literals("$(command; command2);\nx"),
            vec![
                (Command, "command; command2".to_string()),
                (Semicolon, ";".to_string()),
                (Ident, "x".to_string()),
                (Eof, String::new()),
            ]
        );
        // interpolation markers stay raw for the evaluator
        assert_eq!(
            literals("$(echo $a)")[0],
            (Command, "echo $a".to_string())
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let input = "1 # one\n// two\n2";
        assert_eq!(kinds(input), vec![Number, Number, Eof]);
    }

    #[test]
    fn test_illegal_tokens() {
        assert_eq!(kinds("^"), vec![Illegal, Eof]);
        assert_eq!(kinds("? 1"), vec![Illegal, Number, Eof]);
        assert_eq!(kinds("& 1"), vec![Illegal, Number, Eof]);
        assert_eq!(literals("é")[0].0, Illegal);
    }

    #[test]
    fn test_rewind_reproduces_stream() {
        let input = "[a, b] = [1, 2]; other";
        let mut lexer = Lexer::new(input);
        let first = lexer.next_token();
        assert!(first.is(LBracket));
        let saved = lexer.current_position();

        let mut tail = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.is(Eof);
            tail.push(token);
            if done {
                break;
            }
        }

        lexer.rewind(0);
        while lexer.current_position() < saved {
            lexer.next_token();
        }
        let mut replayed = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.is(Eof);
            replayed.push(token);
            if done {
                break;
            }
        }
        assert_eq!(tail, replayed);
    }
}
