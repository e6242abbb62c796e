use std::iter::Peekable;
use std::str::Chars;

use crate::token;
use crate::token::{Token, TokenType};

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input: input.chars().peekable(),
            done: false,
        }
    }

    fn read_char(&mut self) -> Option<char> {
        self.input.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn peek_if<F>(&mut self, mut predicate: F) -> bool
    where
        F: FnMut(char) -> bool,
    {
        match self.peek_char() {
            Some(ch) => predicate(ch),
            None => false,
        }
    }

    fn read_while<F>(&mut self, first: char, mut predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut res = String::new();
        res.push(first);

        while let Some(c) = self.input.next_if(|c| predicate(*c)) {
            res.push(c);
        }

        res
    }

    fn read_string(&mut self) -> String {
        let mut res = String::new();

        while let Some(c) = self.input.next_if(|c| *c != '"') {
            res.push(c);
        }

        // Consume the closing '"'
        self.read_char();

        res
    }

    fn skip_whitespace(&mut self) {
        while self.peek_if(|c| c.is_whitespace()) {
            self.read_char();
        }
    }

    /// Reads `second` if it is next, yielding the two-character token, or the single-character
    /// one otherwise.
    fn either(&mut self, second: char, double: (TokenType, &str), single: (TokenType, &str)) -> Token {
        if self.peek_char() == Some(second) {
            self.read_char();
            Token::new(double.0, double.1)
        } else {
            Token::new(single.0, single.1)
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.read_char() {
            Some(c) => c,
            None => return Token::eof(),
        };

        let single = |t: TokenType| Token::new(t, c.to_string());

        match c {
            '=' => self.either('=', (TokenType::Eq, "=="), (TokenType::Assign, "=")),
            '!' => self.either('=', (TokenType::NotEq, "!="), (TokenType::Bang, "!")),
            '+' => single(TokenType::Plus),
            '-' => single(TokenType::Minus),
            '*' => single(TokenType::Asterisk),
            '/' => single(TokenType::Slash),
            '<' => single(TokenType::Lt),
            '>' => single(TokenType::Gt),
            ',' => single(TokenType::Comma),
            ';' => single(TokenType::Semicolon),
            ':' => single(TokenType::Colon),
            '(' => single(TokenType::LParen),
            ')' => single(TokenType::RParen),
            '{' => single(TokenType::LBrace),
            '}' => single(TokenType::RBrace),
            '[' => single(TokenType::LBracket),
            ']' => single(TokenType::RBracket),
            '"' => Token::new(TokenType::String, self.read_string()),
            c if is_id_start(c) => {
                let ident = self.read_while(c, is_id_continue);
                Token::new(token::lookup_ident(&ident), ident)
            }
            c if c.is_ascii_digit() => {
                Token::new(TokenType::Int, self.read_while(c, |c| c.is_ascii_digit()))
            }
            _ => single(TokenType::Illegal),
        }
    }
}

/// Yields every token up to and including the single `Eof`.
impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }

        let tok = self.next_token();
        if tok.token_type == TokenType::Eof {
            self.done = true;
        }

        Some(tok)
    }
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_uppercase() || c == '_'
}

fn is_id_continue(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit()
}
