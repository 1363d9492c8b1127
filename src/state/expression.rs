//! Arithmetic expression parsing and submission validation.
//!
//! Expressions are tokenized, parsed by precedence climbing into a small [`Expr`] tree, then
//! evaluated in `f64`. Validation against a [`Puzzle`] requires the value to equal the target
//! and every literal/operator to come from the puzzle. Literals are checked for membership only:
//! a digit may be reused and not every digit has to appear.

use std::fmt;

use thiserror::Error;

use super::puzzle::Puzzle;

/// Longest submission accepted, in characters.
pub const MAX_EXPRESSION_CHARS: usize = 256;
/// Deepest nesting of parentheses, signs and right-hand operands.
pub const MAX_NESTING: usize = 64;

/// Binary operators understood by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `^`
    Power,
    /// `%`
    Modulo,
}

impl Operator {
    /// Whether the operator is one of the four allowed in submissions.
    pub fn is_basic(self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Subtract | Operator::Multiply | Operator::Divide
        )
    }

    fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
            Operator::Power => '^',
            Operator::Modulo => '%',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 1,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 2,
            Operator::Power => 3,
        }
    }

    fn right_associative(self) -> bool {
        matches!(self, Operator::Power)
    }

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => lhs / rhs,
            Operator::Power => lhs.powf(rhs),
            Operator::Modulo => lhs % rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Sign prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Negate,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Signed sub-expression.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator applied.
        op: Operator,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate in floating point. Division by zero yields a non-finite value.
    pub fn evaluate(&self) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Unary(UnaryOp::Plus, operand) => operand.evaluate(),
            Expr::Unary(UnaryOp::Negate, operand) => -operand.evaluate(),
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.evaluate(), rhs.evaluate()),
        }
    }

    /// Visit every node depth-first, stopping at the first error.
    fn try_walk<E>(&self, visit: &mut impl FnMut(&Expr) -> Result<(), E>) -> Result<(), E> {
        visit(self)?;
        match self {
            Expr::Number(_) => Ok(()),
            Expr::Unary(_, operand) => operand.try_walk(visit),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.try_walk(visit)?;
                rhs.try_walk(visit)
            }
        }
    }
}

/// Reasons a submission is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Input is empty or whitespace only.
    #[error("expression is empty")]
    Empty,
    /// Input longer than [`MAX_EXPRESSION_CHARS`].
    #[error("expression is longer than {} characters", MAX_EXPRESSION_CHARS)]
    TooLong,
    /// A character outside the grammar.
    #[error("unexpected character `{character}` at position {position}")]
    UnexpectedCharacter {
        /// Offending character.
        character: char,
        /// Byte offset in the input.
        position: usize,
    },
    /// A literal that cannot be read as a number.
    #[error("malformed number `{0}`")]
    MalformedNumber(String),
    /// Grammar violation.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// The value does not hit the target.
    #[error("expression evaluates to {actual}, expected {expected}")]
    WrongResult {
        /// Puzzle target.
        expected: u64,
        /// Value of the submission.
        actual: f64,
    },
    /// A literal that is not among the puzzle digits.
    #[error("number {0} is not one of the puzzle digits")]
    ForeignNumber(f64),
    /// An operator outside `+ - * /`.
    #[error("operator `{0}` is not allowed")]
    ForbiddenOperator(Operator),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Operator(Operator),
    LeftParen,
    RightParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, character)) = chars.peek() {
        match character {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::MalformedNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LeftParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RightParen);
            }
            c => {
                let operator = match c {
                    '+' => Operator::Add,
                    '-' => Operator::Subtract,
                    '*' => Operator::Multiply,
                    '/' => Operator::Divide,
                    '^' => Operator::Power,
                    '%' => Operator::Modulo,
                    character => {
                        return Err(ExpressionError::UnexpectedCharacter {
                            character,
                            position,
                        });
                    }
                };
                chars.next();
                tokens.push(Token::Operator(operator));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        self.cursor += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExpressionError::Syntax(format!(
                "expression nests deeper than {MAX_NESTING} levels"
            )));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Expr, ExpressionError> {
        self.descend()?;
        let mut lhs = self.unary()?;

        while let Some(Token::Operator(op)) = self.peek() {
            let op = *op;
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let next_min = if op.right_associative() {
                op.precedence()
            } else {
                op.precedence() + 1
            };
            let rhs = self.expression(next_min)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        self.ascend();
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        let sign = match self.peek() {
            Some(Token::Operator(Operator::Subtract)) => UnaryOp::Negate,
            Some(Token::Operator(Operator::Add)) => UnaryOp::Plus,
            _ => return self.primary(),
        };
        self.advance();
        self.descend()?;
        let operand = self.unary()?;
        self.ascend();
        Ok(Expr::Unary(sign, Box::new(operand)))
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LeftParen) => {
                let inner = self.expression(0)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(inner),
                    _ => Err(ExpressionError::Syntax("missing closing parenthesis".into())),
                }
            }
            Some(Token::RightParen) => {
                Err(ExpressionError::Syntax("unexpected closing parenthesis".into()))
            }
            Some(Token::Operator(op)) => Err(ExpressionError::Syntax(format!(
                "operator `{op}` is missing its left operand"
            ))),
            None => Err(ExpressionError::Syntax("unexpected end of expression".into())),
        }
    }
}

/// Parse `input` into an expression tree.
///
/// Input is bounded in length and nesting so the tree stays shallow enough to walk recursively.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    if input.chars().nth(MAX_EXPRESSION_CHARS).is_some() {
        return Err(ExpressionError::TooLong);
    }

    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.expression(0)?;
    if parser.cursor < parser.tokens.len() {
        return Err(ExpressionError::Syntax("unexpected trailing input".into()));
    }
    Ok(expr)
}

/// Check a submission against `puzzle`: exact value first, then the literals and operators.
pub fn validate(input: &str, puzzle: &Puzzle) -> Result<(), ExpressionError> {
    let expr = parse(input)?;

    let actual = expr.evaluate();
    if actual != puzzle.target as f64 {
        return Err(ExpressionError::WrongResult {
            expected: puzzle.target,
            actual,
        });
    }

    expr.try_walk(&mut |node| match node {
        Expr::Number(value) if !puzzle.has_digit(*value) => {
            Err(ExpressionError::ForeignNumber(*value))
        }
        Expr::Binary { op, .. } if !op.is_basic() => Err(ExpressionError::ForbiddenOperator(*op)),
        _ => Ok(()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn puzzle(digits: [u8; 5], target: u64) -> Puzzle {
        Puzzle {
            id: "test0".into(),
            digits,
            target,
        }
    }

    #[test]
    fn respects_precedence_and_parentheses() {
        assert_eq!(parse("1 + 2 * 3").unwrap().evaluate(), 7.0);
        assert_eq!(parse("(1 + 2) * 3").unwrap().evaluate(), 9.0);
        assert_eq!(parse("8 - 4 - 2").unwrap().evaluate(), 2.0);
        assert_eq!(parse("8 / 4 / 2").unwrap().evaluate(), 1.0);
        assert_eq!(parse("2 ^ 3 ^ 2").unwrap().evaluate(), 512.0);
        assert_eq!(parse("-3 + 5").unwrap().evaluate(), 2.0);
        assert_eq!(parse("2 * -(1 + 1)").unwrap().evaluate(), -4.0);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse("   "), Err(ExpressionError::Empty));
        assert!(matches!(parse("(1 + 2"), Err(ExpressionError::Syntax(_))));
        assert!(matches!(parse("1 + 2)"), Err(ExpressionError::Syntax(_))));
        assert!(matches!(parse("1 +"), Err(ExpressionError::Syntax(_))));
        assert!(matches!(parse("* 2"), Err(ExpressionError::Syntax(_))));
        assert!(matches!(parse("1 2"), Err(ExpressionError::Syntax(_))));
        assert!(matches!(
            parse("1.2.3"),
            Err(ExpressionError::MalformedNumber(_))
        ));
        assert_eq!(
            parse("sqrt(4)"),
            Err(ExpressionError::UnexpectedCharacter {
                character: 's',
                position: 0
            })
        );
    }

    #[test]
    fn rejects_oversized_input_before_parsing() {
        let nested = format!("{}5{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse(&nested), Err(ExpressionError::TooLong));

        let chain = vec!["5"; 100_000].join("+");
        assert_eq!(parse(&chain), Err(ExpressionError::TooLong));

        let signs = format!("{}5", "-".repeat(100_000));
        assert_eq!(parse(&signs), Err(ExpressionError::TooLong));
    }

    #[test]
    fn bounds_nesting_depth() {
        let depth = MAX_NESTING + 1;
        let nested = format!("{}5{}", "(".repeat(depth), ")".repeat(depth));
        assert!(nested.len() <= MAX_EXPRESSION_CHARS);
        assert!(matches!(parse(&nested), Err(ExpressionError::Syntax(_))));

        let signs = format!("{}5", "-".repeat(depth));
        assert!(matches!(parse(&signs), Err(ExpressionError::Syntax(_))));

        let shallow = format!("{}5{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse(&shallow).unwrap().evaluate(), 5.0);
        assert_eq!(parse("--5").unwrap().evaluate(), 5.0);
    }

    #[test]
    fn accepts_expression_reaching_target_with_puzzle_digits() {
        let puzzle = puzzle([5, 5, 1, 2, 3], 10);
        assert_eq!(validate("5+5", &puzzle), Ok(()));
        assert_eq!(validate("(5 * 2) * 1", &puzzle), Ok(()));
    }

    #[test]
    fn rejects_wrong_result() {
        let puzzle = puzzle([5, 5, 1, 2, 3], 10);
        assert!(matches!(
            validate("5+3", &puzzle),
            Err(ExpressionError::WrongResult { expected: 10, .. })
        ));
    }

    #[test]
    fn rejects_literals_outside_the_digits() {
        let puzzle = puzzle([5, 5, 1, 2, 3], 10);
        assert_eq!(
            validate("10", &puzzle),
            Err(ExpressionError::ForeignNumber(10.0))
        );
        assert_eq!(
            validate("7 + 3", &puzzle),
            Err(ExpressionError::ForeignNumber(7.0))
        );
    }

    #[test]
    fn rejects_operators_outside_the_basic_four() {
        let puzzle = puzzle([2, 3, 1, 1, 1], 8);
        assert_eq!(
            validate("2 ^ 3", &puzzle),
            Err(ExpressionError::ForbiddenOperator(Operator::Power))
        );
    }

    #[test]
    fn membership_check_is_lenient_about_reuse_and_coverage() {
        let puzzle = puzzle([5, 1, 2, 3, 4], 10);
        // 5 appears once but is used twice; 1..4 are never used.
        assert_eq!(validate("5 + 5", &puzzle), Ok(()));
    }

    #[test]
    fn division_by_zero_never_matches() {
        let puzzle = puzzle([0, 1, 2, 3, 4], 0);
        assert!(matches!(
            validate("1 / 0", &puzzle),
            Err(ExpressionError::WrongResult { .. })
        ));
    }
}
