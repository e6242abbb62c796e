use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::{trace, trace_span};

use crate::ast::{
    BlockStatement, Expression, FunctionLiteral, HashLiteral, InfixOperator, PrefixOperator,
    Program, Statement,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};

pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {got} instead")]
    UnexpectedToken { expected: TokenType, got: TokenType },
    #[error("no prefix parse function for {0} found")]
    NoPrefixParseFn(TokenType),
    #[error("no infix operator for {0}")]
    NoInfixOperator(TokenType),
    #[error("could not parse {0:?} as integer")]
    InvalidInteger(String),
}

/// Binding power of operator tokens, weakest first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Precedence {
    Lowest,
    /// ==
    Equals,
    /// > or <
    LessGreater,
    /// +
    Sum,
    /// *
    Product,
    /// -x or !x
    Prefix,
    /// my_function(x)
    Call,
    /// array[index]
    Index,
}

fn token_precedence(token_type: TokenType) -> Precedence {
    match token_type {
        TokenType::Eq | TokenType::NotEq => Precedence::Equals,
        TokenType::Lt | TokenType::Gt => Precedence::LessGreater,
        TokenType::Plus | TokenType::Minus => Precedence::Sum,
        TokenType::Asterisk | TokenType::Slash => Precedence::Product,
        TokenType::LParen => Precedence::Call,
        TokenType::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn infix_operator(token_type: TokenType) -> Option<InfixOperator> {
    match token_type {
        TokenType::Plus => Some(InfixOperator::Plus),
        TokenType::Minus => Some(InfixOperator::Minus),
        TokenType::Asterisk => Some(InfixOperator::Asterisk),
        TokenType::Slash => Some(InfixOperator::Slash),
        TokenType::Lt => Some(InfixOperator::Lt),
        TokenType::Gt => Some(InfixOperator::Gt),
        TokenType::Eq => Some(InfixOperator::Eq),
        TokenType::NotEq => Some(InfixOperator::NotEq),
        _ => None,
    }
}

/// Builds an expression starting at the current token.
pub type PrefixParseFn<I> = fn(&mut Parser<I>) -> ParseResult<Expression>;
/// Extends an already-parsed left operand; the current token is the operator.
pub type InfixParseFn<I> = fn(&mut Parser<I>, Expression) -> ParseResult<Expression>;

pub struct Parser<I: Iterator<Item = Token>> {
    tokens: I,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<ParseError>,

    prefix_parse_fns: HashMap<TokenType, PrefixParseFn<I>>,
    infix_parse_fns: HashMap<TokenType, InfixParseFn<I>>,
}

/// Parses `input` in one go, handing back the program only if there were no errors.
pub fn parse(input: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse_program();

    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(parser.errors)
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        let mut p = Parser {
            tokens,
            cur_token: Token::eof(),
            peek_token: Token::eof(),
            errors: vec![],
            prefix_parse_fns: HashMap::new(),
            infix_parse_fns: HashMap::new(),
        };

        p.register_prefix(TokenType::Ident, Self::parse_identifier);
        p.register_prefix(TokenType::Int, Self::parse_integer_literal);
        p.register_prefix(TokenType::String, Self::parse_string_literal);
        p.register_prefix(TokenType::True, Self::parse_boolean);
        p.register_prefix(TokenType::False, Self::parse_boolean);
        p.register_prefix(TokenType::Bang, Self::parse_prefix_expression);
        p.register_prefix(TokenType::Minus, Self::parse_prefix_expression);
        p.register_prefix(TokenType::LParen, Self::parse_grouped_expression);
        p.register_prefix(TokenType::If, Self::parse_if_expression);
        p.register_prefix(TokenType::Function, Self::parse_function_literal);
        p.register_prefix(TokenType::LBracket, Self::parse_array_literal);
        p.register_prefix(TokenType::LBrace, Self::parse_hash_literal);

        for token_type in [
            TokenType::Plus,
            TokenType::Minus,
            TokenType::Asterisk,
            TokenType::Slash,
            TokenType::Lt,
            TokenType::Gt,
            TokenType::Eq,
            TokenType::NotEq,
        ] {
            p.register_infix(token_type, Self::parse_infix_expression);
        }
        p.register_infix(TokenType::LParen, Self::parse_call_expression);
        p.register_infix(TokenType::LBracket, Self::parse_index_expression);

        // Read 2 tokens so that cur_token and peek_token are both initialised
        p.next_token();
        p.next_token();

        p
    }

    pub fn register_prefix(&mut self, token_type: TokenType, f: PrefixParseFn<I>) {
        self.prefix_parse_fns.insert(token_type, f);
    }

    pub fn register_infix(&mut self, token_type: TokenType, f: InfixParseFn<I>) {
        self.infix_parse_fns.insert(token_type, f);
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn cur_token(&self) -> &Token {
        &self.cur_token
    }

    pub fn next_token(&mut self) {
        let next = self.tokens.next().unwrap_or_else(Token::eof);
        self.cur_token = std::mem::replace(&mut self.peek_token, next);
    }

    /// Parses every statement up to the end of input. A statement that fails to parse is left out
    /// of the program and its error recorded, so check `errors()` before trusting the result.
    pub fn parse_program(&mut self) -> Program {
        let mut statements = vec![];

        while !self.cur_token_is(TokenType::Eof) {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    trace!(%err, "dropping statement");
                    self.errors.push(err);
                }
            }
            self.next_token();
        }

        Program { statements }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let _span = trace_span!("statement", token = %self.cur_token.token_type).entered();

        match self.cur_token.token_type {
            TokenType::Let => self.parse_let_statement(),
            TokenType::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        self.expect_peek(TokenType::Ident)?;
        let name = self.cur_token.literal.clone();

        self.expect_peek(TokenType::Assign)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Ok(Statement::Let(name, value))
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let exp = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Ok(Statement::Expression(exp))
    }

    fn skip_optional_semicolon(&mut self) {
        if self.peek_token_is(TokenType::Semicolon) {
            self.next_token();
        }
    }

    /// Precedence climbing: keeps folding infix operators into the left operand while the next
    /// operator binds tighter than `precedence`.
    pub fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let _span = trace_span!(
            "expression",
            token = %self.cur_token.token_type,
            ?precedence
        )
        .entered();

        let prefix = self
            .prefix_parse_fns
            .get(&self.cur_token.token_type)
            .copied()
            .ok_or(ParseError::NoPrefixParseFn(self.cur_token.token_type))?;

        let mut left = prefix(self)?;

        while !self.peek_token_is(TokenType::Semicolon) && precedence < self.peek_precedence() {
            let infix = match self.infix_parse_fns.get(&self.peek_token.token_type) {
                Some(infix) => *infix,
                None => return Ok(left),
            };

            self.next_token();
            left = infix(self, left)?;
        }

        Ok(left)
    }

    fn parse_identifier(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Identifier(self.cur_token.literal.clone()))
    }

    fn parse_integer_literal(&mut self) -> ParseResult<Expression> {
        self.cur_token
            .literal
            .parse()
            .map(Expression::IntegerLiteral)
            .map_err(|_| ParseError::InvalidInteger(self.cur_token.literal.clone()))
    }

    fn parse_string_literal(&mut self) -> ParseResult<Expression> {
        Ok(Expression::StringLiteral(self.cur_token.literal.clone()))
    }

    fn parse_boolean(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Boolean(self.cur_token_is(TokenType::True)))
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<Expression> {
        let operator = match self.cur_token.token_type {
            TokenType::Bang => PrefixOperator::Bang,
            TokenType::Minus => PrefixOperator::Minus,
            other => return Err(ParseError::NoPrefixParseFn(other)),
        };

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Ok(Expression::Prefix(operator, Box::new(right)))
    }

    fn parse_infix_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        let operator = infix_operator(self.cur_token.token_type)
            .ok_or(ParseError::NoInfixOperator(self.cur_token.token_type))?;

        // Feeding the operator's own precedence to the right-hand side makes it left-associative.
        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;

        Ok(Expression::Infix(operator, Box::new(left), Box::new(right)))
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expression> {
        self.next_token();

        let exp = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RParen)?;

        Ok(exp)
    }

    fn parse_if_expression(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenType::LParen)?;
        self.next_token();

        let condition = self.parse_expression(Precedence::Lowest)?;

        self.expect_peek(TokenType::RParen)?;
        self.expect_peek(TokenType::LBrace)?;

        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_token_is(TokenType::Else) {
            self.next_token();
            self.expect_peek(TokenType::LBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Ok(Expression::If(Box::new(condition), consequence, alternative))
    }

    fn parse_block_statement(&mut self) -> ParseResult<BlockStatement> {
        let mut statements = vec![];

        self.next_token();

        while !self.cur_token_is(TokenType::RBrace) {
            if self.cur_token_is(TokenType::Eof) {
                return Err(ParseError::UnexpectedToken {
                    expected: TokenType::RBrace,
                    got: TokenType::Eof,
                });
            }

            statements.push(self.parse_statement()?);
            self.next_token();
        }

        Ok(BlockStatement { statements })
    }

    fn parse_function_literal(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenType::LParen)?;

        let parameters = self.parse_list(TokenType::RParen, Self::parse_parameter)?;

        self.expect_peek(TokenType::LBrace)?;

        let body = self.parse_block_statement()?;

        Ok(Expression::FunctionLiteral(Rc::new(FunctionLiteral {
            parameters,
            body,
        })))
    }

    fn parse_parameter(&mut self) -> ParseResult<String> {
        if self.cur_token_is(TokenType::Ident) {
            Ok(self.cur_token.literal.clone())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: TokenType::Ident,
                got: self.cur_token.token_type,
            })
        }
    }

    fn parse_call_expression(&mut self, function: Expression) -> ParseResult<Expression> {
        let arguments = self.parse_list(TokenType::RParen, Self::parse_list_element)?;

        Ok(Expression::Call(Box::new(function), arguments))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expression> {
        let elements = self.parse_list(TokenType::RBracket, Self::parse_list_element)?;

        Ok(Expression::ArrayLiteral(elements))
    }

    fn parse_index_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        self.next_token();

        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RBracket)?;

        Ok(Expression::IndexExpression(Box::new(left), Box::new(index)))
    }

    fn parse_hash_literal(&mut self) -> ParseResult<Expression> {
        let pairs = self.parse_list(TokenType::RBrace, Self::parse_hash_pair)?;

        Ok(Expression::HashLiteral(HashLiteral { pairs }))
    }

    fn parse_hash_pair(&mut self) -> ParseResult<(Expression, Expression)> {
        let key = self.parse_expression(Precedence::Lowest)?;

        self.expect_peek(TokenType::Colon)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        Ok((key, value))
    }

    fn parse_list_element(&mut self) -> ParseResult<Expression> {
        self.parse_expression(Precedence::Lowest)
    }

    /// Parses `item (, item)*` followed by `end`. The current token is the opening delimiter; an
    /// immediately closing `end` yields an empty list.
    fn parse_list<T>(
        &mut self,
        end: TokenType,
        parse_item: fn(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut list = vec![];

        if self.peek_token_is(end) {
            self.next_token();
            return Ok(list);
        }

        self.next_token();
        list.push(parse_item(self)?);

        while self.peek_token_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            list.push(parse_item(self)?);
        }

        self.expect_peek(end)?;

        Ok(list)
    }

    fn cur_token_is(&self, token_type: TokenType) -> bool {
        self.cur_token.token_type == token_type
    }

    fn peek_token_is(&self, token_type: TokenType) -> bool {
        self.peek_token.token_type == token_type
    }

    fn cur_precedence(&self) -> Precedence {
        token_precedence(self.cur_token.token_type)
    }

    fn peek_precedence(&self) -> Precedence {
        token_precedence(self.peek_token.token_type)
    }

    fn expect_peek(&mut self, token_type: TokenType) -> ParseResult<()> {
        if !self.peek_token_is(token_type) {
            return Err(ParseError::UnexpectedToken {
                expected: token_type,
                got: self.peek_token.token_type,
            });
        }

        self.next_token();
        Ok(())
    }
}
