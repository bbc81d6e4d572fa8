use crate::{
    ast::{Block, Expr, InfixOp, PrefixOp, Program, Scenario, Stmt},
    error::SyntaxError,
    lexer::Lexer,
    token::{Token, TokenKind},
};
use TokenKind::*;

/// Binding strength, weakest first. The variant order is the operator
/// table: `a | b == c` parses as `a | (b == c)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    AndOr,
    Equals,
    LessGreater,
    Sum,
    Product,
    Range,
    Prefix,
    Call,
    Index,
    Dot,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        And | Or | Pipe => Precedence::AndOr,
        Eq | NotEq | Tilde => Precedence::Equals,
        Lt | LtEq | Gt | GtEq | Cmp => Precedence::LessGreater,
        Plus | Minus | PlusAssign | MinusAssign => Precedence::Sum,
        Asterisk | Slash | Power | Modulo | AsteriskAssign | SlashAssign | PowerAssign
        | ModuloAssign => Precedence::Product,
        TokenKind::Range => Precedence::Range,
        LParen => Precedence::Call,
        LBracket => Precedence::Index,
        Dot | QuestionDot => Precedence::Dot,
        _ => Precedence::Lowest,
    }
}

fn infix_op(kind: TokenKind) -> Option<InfixOp> {
    let op = match kind {
        Plus => InfixOp::Plus,
        Minus => InfixOp::Minus,
        Asterisk => InfixOp::Asterisk,
        Slash => InfixOp::Slash,
        Power => InfixOp::Power,
        Modulo => InfixOp::Modulo,
        Lt => InfixOp::Lt,
        Gt => InfixOp::Gt,
        LtEq => InfixOp::LtEq,
        GtEq => InfixOp::GtEq,
        Cmp => InfixOp::Cmp,
        Eq => InfixOp::Eq,
        NotEq => InfixOp::NotEq,
        Tilde => InfixOp::Tilde,
        TokenKind::Range => InfixOp::Range,
        And => InfixOp::And,
        Or => InfixOp::Or,
        _ => return None,
    };
    Some(op)
}

fn compound_op(kind: TokenKind) -> Option<InfixOp> {
    let op = match kind {
        PlusAssign => InfixOp::Plus,
        MinusAssign => InfixOp::Minus,
        AsteriskAssign => InfixOp::Asterisk,
        SlashAssign => InfixOp::Slash,
        PowerAssign => InfixOp::Power,
        ModuloAssign => InfixOp::Modulo,
        _ => return None,
    };
    Some(op)
}

fn is_assign_target(expression: &Expr) -> bool {
    matches!(
        expression,
        Expr::Identifier(_) | Expr::Index { .. } | Expr::Property { .. }
    )
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    peek: Token,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        let mut parser = Self {
            lexer,
            cur: Token::eof(0),
            peek: Token::eof(0),
            errors: Vec::new(),
        };
        // read two tokens so cur and peek are both set
        parser.next_token();
        parser.next_token();
        parser
    }

    // program -> statement*
    pub fn parse_program(mut self) -> (Program, Vec<SyntaxError>) {
        let mut program = Program::default();

        while !self.cur.is(Eof) {
            if let Some(statement) = self.parse_statement() {
                program.statements.push(statement);
            }
            self.next_token();
        }

        (program, self.errors)
    }

    fn next_token(&mut self) {
        self.advance();
        if self.cur.is(Illegal) {
            self.errors.push(SyntaxError::illegal_token(
                self.cur.literal.clone(),
                self.cur.span,
            ));
        }
    }

    fn advance(&mut self) {
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    /// Starts the lexer over and replays tokens up to `position`.
    /// Backtracking is rare enough that rescanning from the top is fine.
    fn rewind(&mut self, position: usize) {
        self.lexer.rewind(0);
        while self.lexer.current_position() < position {
            self.advance();
        }
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.is(kind)
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.next_token();
            true
        } else {
            self.errors.push(SyntaxError::unexpected_token(
                kind,
                self.peek.kind,
                self.peek.span,
            ));
            false
        }
    }

    fn cur_precedence(&self) -> Precedence {
        precedence_of(self.cur.kind)
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek.kind)
    }

    // statement -> return_stmt | destructuring | expression_stmt
    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur.kind {
            Return => self.parse_return_statement(),
            LBracket => self
                .parse_destructuring_statement()
                .or_else(|| self.parse_expression_statement()),
            _ => self.parse_expression_statement(),
        }
    }

    // return_stmt -> "return" expression? ";"?
    fn parse_return_statement(&mut self) -> Option<Stmt> {
        if self.peek_is(RBrace) || self.peek_is(Eof) {
            return Some(Stmt::Return(None));
        }
        if self.peek_is(Semicolon) {
            self.next_token();
            return Some(Stmt::Return(None));
        }

        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(Semicolon) {
            self.next_token();
        }
        Some(Stmt::Return(Some(value)))
    }

    // destructuring -> "[" IDENT ("," IDENT)* "]" "=" expression ";"?
    //
    // Only committed to once the "=" shows up; anything else rewinds and
    // falls through to an ordinary expression (an array literal).
    fn parse_destructuring_statement(&mut self) -> Option<Stmt> {
        let start = self.lexer.current_position();

        let names = match self.parse_destructuring_names() {
            Some(names) if self.peek_is(Assign) => names,
            _ => {
                self.rewind(start);
                return None;
            }
        };

        self.next_token();
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(Semicolon) {
            self.next_token();
        }
        Some(Stmt::Destructure { names, value })
    }

    fn parse_destructuring_names(&mut self) -> Option<Vec<String>> {
        let mut names = Vec::new();

        while self.peek_is(Ident) {
            self.next_token();
            names.push(self.cur.literal.clone());
            if self.peek_is(Comma) {
                self.next_token();
            } else {
                break;
            }
        }

        if names.is_empty() || !self.peek_is(RBracket) {
            return None;
        }
        self.next_token();
        Some(names)
    }

    // expression_stmt -> expression ("=" expression)? ";"?
    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expression = self.parse_expression(Precedence::Lowest)?;

        // x = 1, a[0] = 1 and h.key = 1 all read as an expression first
        // and become assignments when a = follows a valid target.
        if self.peek_is(Assign) && is_assign_target(&expression) {
            self.next_token();
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            if self.peek_is(Semicolon) {
                self.next_token();
            }
            return Some(Stmt::Assign {
                target: expression,
                value,
            });
        }

        if self.peek_is(Semicolon) {
            self.next_token();
        }
        Some(Stmt::Expression(expression))
    }

    // x = 0 inside a for header
    fn parse_simple_assign(&mut self) -> Option<Stmt> {
        let target = Expr::Identifier(self.cur.literal.clone());
        self.next_token();
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(Semicolon) {
            self.next_token();
        }
        Some(Stmt::Assign { target, value })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(Semicolon) && precedence < self.peek_precedence() {
            left = match self.peek.kind {
                LParen => {
                    self.next_token();
                    self.parse_call_expression(left)?
                }
                LBracket => {
                    self.next_token();
                    self.parse_index_expression(left)?
                }
                Dot | QuestionDot => {
                    self.next_token();
                    self.parse_dotted_expression(left)?
                }
                Pipe => {
                    self.next_token();
                    self.parse_pipe_expression(left)?
                }
                kind => {
                    if let Some(op) = compound_op(kind) {
                        self.next_token();
                        self.parse_compound_assignment(op, left)?
                    } else if let Some(op) = infix_op(kind) {
                        self.next_token();
                        self.parse_infix_expression(op, left)?
                    } else {
                        return Some(left);
                    }
                }
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.cur.kind {
            Ident => Some(Expr::Identifier(self.cur.literal.clone())),
            Number => self.parse_number_literal(),
            Str => Some(Expr::Str(self.cur.literal.clone())),
            True => Some(Expr::Boolean(true)),
            False => Some(Expr::Boolean(false)),
            Null => Some(Expr::Null),
            Command => Some(Expr::Command(self.cur.literal.clone())),
            Bang | Minus => self.parse_prefix_expression(),
            LParen => self.parse_grouped_expression(),
            LBracket => self.parse_array_literal(),
            LBrace => self.parse_hash_literal(),
            If => self.parse_if_expression(),
            While => self.parse_while_expression(),
            For => self.parse_for_expression(),
            Function => self.parse_function_literal(),
            At => self.parse_decorator(),
            kind => {
                self.errors
                    .push(SyntaxError::no_prefix_parse_fn(kind, self.cur.span));
                None
            }
        }
    }

    // 1 or 1.1
    fn parse_number_literal(&mut self) -> Option<Expr> {
        match self.cur.literal.parse::<f64>() {
            Ok(value) => Some(Expr::Number(value)),
            Err(_) => {
                self.errors.push(SyntaxError::invalid_number(
                    self.cur.literal.clone(),
                    self.cur.span,
                ));
                None
            }
        }
    }

    // !x or -x
    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let op = match self.cur.kind {
            Bang => PrefixOp::Bang,
            _ => PrefixOp::Minus,
        };
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::prefix(op, right))
    }

    // "(" expression ")"
    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(RParen) {
            return None;
        }
        Some(expression)
    }

    // [1, 2, 3]
    fn parse_array_literal(&mut self) -> Option<Expr> {
        Some(Expr::Array(self.parse_expression_list(RBracket)?))
    }

    // {"a": 1, "b": 2}
    fn parse_hash_literal(&mut self) -> Option<Expr> {
        let mut pairs = Vec::new();

        while !self.peek_is(RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(RBrace) && !self.expect_peek(Comma) {
                return None;
            }
        }

        if !self.expect_peek(RBrace) {
            return None;
        }
        Some(Expr::Hash(pairs))
    }

    // if x { } else if y { } else { }
    //
    // The chain flattens into scenarios tested first-match; a trailing
    // bare else becomes a scenario with a literal true condition.
    fn parse_if_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(LBrace) {
            return None;
        }
        let mut scenarios = vec![Scenario {
            condition,
            consequence: self.parse_block(),
        }];

        while self.peek_is(Else) {
            self.next_token();
            if self.peek_is(If) {
                self.next_token();
                self.next_token();
                let condition = self.parse_expression(Precedence::Lowest)?;
                if !self.expect_peek(LBrace) {
                    return None;
                }
                scenarios.push(Scenario {
                    condition,
                    consequence: self.parse_block(),
                });
            } else {
                if !self.expect_peek(LBrace) {
                    return None;
                }
                scenarios.push(Scenario {
                    condition: Expr::Boolean(true),
                    consequence: self.parse_block(),
                });
                break;
            }
        }

        Some(Expr::If { scenarios })
    }

    // while x > 0 { }
    fn parse_while_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(LBrace) {
            return None;
        }
        Some(Expr::While {
            condition: Box::new(condition),
            block: self.parse_block(),
        })
    }

    // Reads as C-style only while the identifier is followed by =,
    // otherwise this is a for .. in and we switch over.
    //
    // for x = 0; x < 10; x = x + 1 { }
    fn parse_for_expression(&mut self) -> Option<Expr> {
        if !self.expect_peek(Ident) {
            return None;
        }
        if !self.peek_is(Assign) {
            return self.parse_for_in_expression();
        }

        let ident = self.cur.literal.clone();
        let starter = self.parse_simple_assign()?;

        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.next_token();
        self.next_token();

        if !self.cur.is(Ident) {
            self.errors.push(SyntaxError::unexpected_token(
                Ident,
                self.cur.kind,
                self.cur.span,
            ));
            return None;
        }
        if !self.peek_is(Assign) {
            self.errors.push(SyntaxError::unexpected_token(
                Assign,
                self.peek.kind,
                self.peek.span,
            ));
            return None;
        }
        let closer = self.parse_simple_assign()?;

        if !self.expect_peek(LBrace) {
            return None;
        }
        Some(Expr::For {
            ident,
            starter: Box::new(starter),
            condition: Box::new(condition),
            closer: Box::new(closer),
            block: self.parse_block(),
        })
    }

    // for [k,] v in iterable { } [else { }]
    fn parse_for_in_expression(&mut self) -> Option<Expr> {
        let mut key = None;
        let mut value = self.cur.literal.clone();

        if self.peek_is(Comma) {
            self.next_token();
            if !self.expect_peek(Ident) {
                return None;
            }
            key = Some(value);
            value = self.cur.literal.clone();
        }

        if !self.expect_peek(In) {
            return None;
        }
        self.next_token();
        let iterable = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(LBrace) {
            return None;
        }
        let block = self.parse_block();

        let alternative = if self.peek_is(Else) {
            self.next_token();
            if !self.expect_peek(LBrace) {
                return None;
            }
            Some(self.parse_block())
        } else {
            None
        };

        Some(Expr::ForIn {
            key,
            value,
            iterable: Box::new(iterable),
            block,
            alternative,
        })
    }

    // f(x, y) { } or f greet(name) { }
    fn parse_function_literal(&mut self) -> Option<Expr> {
        let name = if self.peek_is(Ident) {
            self.next_token();
            Some(self.cur.literal.clone())
        } else {
            None
        };

        if !self.expect_peek(LParen) {
            return None;
        }
        let params = self.parse_function_parameters()?;

        if !self.expect_peek(LBrace) {
            return None;
        }
        Some(Expr::Function {
            name,
            params,
            body: self.parse_block(),
        })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut params = Vec::new();

        if self.peek_is(RParen) {
            self.next_token();
            return Some(params);
        }

        if !self.expect_peek(Ident) {
            return None;
        }
        params.push(self.cur.literal.clone());

        while self.peek_is(Comma) {
            self.next_token();
            if !self.expect_peek(Ident) {
                return None;
            }
            params.push(self.cur.literal.clone());
        }

        if !self.expect_peek(RParen) {
            return None;
        }
        Some(params)
    }

    // @cached f fetch(url) { } or a further @decorator
    fn parse_decorator(&mut self) -> Option<Expr> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;

        if !self.peek_is(Function) && !self.peek_is(At) {
            self.errors.push(SyntaxError::unexpected_token(
                Function,
                self.peek.kind,
                self.peek.span,
            ));
            return None;
        }
        self.next_token();
        let function = self.parse_expression(Precedence::Lowest)?;

        Some(Expr::Decorator {
            expression: Box::new(expression),
            function: Box::new(function),
        })
    }

    // { statement* }
    fn parse_block(&mut self) -> Block {
        let mut block = Block::new();
        self.next_token();

        while !self.cur.is(RBrace) && !self.cur.is(Eof) {
            if let Some(statement) = self.parse_statement() {
                block.push(statement);
            }
            self.next_token();
        }

        block
    }

    fn parse_infix_expression(&mut self, op: InfixOp, left: Expr) -> Option<Expr> {
        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expr::infix(op, left, right))
    }

    // x += 1; the right side parses from Lowest so x += 1 + 2 adds 3
    fn parse_compound_assignment(&mut self, op: InfixOp, left: Expr) -> Option<Expr> {
        self.next_token();
        let right = self.parse_expression(Precedence::Lowest)?;
        Some(Expr::CompoundAssign {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    // add(1, 2)
    fn parse_call_expression(&mut self, function: Expr) -> Option<Expr> {
        let args = self.parse_expression_list(RParen)?;
        Some(Expr::Call {
            function: Box::new(function),
            args,
        })
    }

    // some[0], some["key"], some[1:2], some[:2], some[1:]
    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        let mut index = None;
        let mut end = None;
        let mut is_range = false;

        if self.peek_is(Colon) {
            is_range = true;
            self.next_token();
        } else {
            self.next_token();
            index = Some(Box::new(self.parse_expression(Precedence::Lowest)?));
            if self.peek_is(Colon) {
                is_range = true;
                self.next_token();
            }
        }

        if is_range && !self.peek_is(RBracket) {
            self.next_token();
            end = Some(Box::new(self.parse_expression(Precedence::Lowest)?));
        }

        if !self.expect_peek(RBracket) {
            return None;
        }
        Some(Expr::Index {
            left: Box::new(left),
            index,
            end,
            is_range,
        })
    }

    // some.function() or some.property; ?. marks either optional
    fn parse_dotted_expression(&mut self, object: Expr) -> Option<Expr> {
        let optional = self.cur.is(QuestionDot);
        self.next_token();

        // A ( after the name commits to a method call, anything else
        // reads as a property access.
        if self.peek_is(LParen) {
            let method = self.cur.literal.clone();
            self.next_token();
            let args = self.parse_expression_list(RParen)?;
            return Some(Expr::Method {
                object: Box::new(object),
                method,
                args,
                optional,
            });
        }

        if !self.cur.is(Ident) {
            self.errors.push(SyntaxError::invalid_property(
                self.cur.literal.clone(),
                self.cur.span,
            ));
        }
        Some(Expr::Property {
            object: Box::new(object),
            property: self.cur.literal.clone(),
            optional,
        })
    }

    // left | name(args), sugar for left.name(args)
    fn parse_pipe_expression(&mut self, object: Expr) -> Option<Expr> {
        if !self.expect_peek(Ident) {
            return None;
        }
        let method = self.cur.literal.clone();

        if !self.expect_peek(LParen) {
            return None;
        }
        let args = self.parse_expression_list(RParen)?;

        Some(Expr::Method {
            object: Box::new(object),
            method,
            args,
            optional: false,
        })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();

        if self.peek_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }
}
