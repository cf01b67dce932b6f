//! Text syntax for statements and rules.
//!
//! Statements are written `(predicate arg ...)`, with `?name` variables and
//! nested statements as arguments. Rules are written
//! `((condition) (condition) ...) -> (consequent)`, the same syntax
//! [`Display`](std::fmt::Display) renders.

use crate::term::{Statement, Term};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map},
    multi::{many0, many1},
    sequence::{delimited, preceded},
    IResult,
};
use thiserror::Error;

/// Error raised for text that does not match the statement/rule syntax
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The input is not a single well-formed statement
    #[error("malformed statement: `{0}`")]
    Statement(String),
    /// The input is not a single well-formed rule
    #[error("malformed rule: `{0}`")]
    Rule(String),
}

/// Parse one statement, e.g. `(parent john ?x)`.
///
/// # Errors
///
/// Returns [`ParseError::Statement`] if the input is not exactly one
/// well-formed statement.
pub fn parse_statement(input: &str) -> Result<Statement, ParseError> {
    all_consuming(delimited(multispace0, statement, multispace0))(input)
        .map(|(_, statement)| statement)
        .map_err(|_| ParseError::Statement(input.trim().to_string()))
}

/// Parse one rule, e.g.
/// `((parent ?x ?y) (parent ?y ?z)) -> (grandparent ?x ?z)`.
///
/// # Errors
///
/// Returns [`ParseError::Rule`] if the input is not exactly one
/// well-formed rule.
pub fn parse_rule(input: &str) -> Result<(Vec<Statement>, Statement), ParseError> {
    all_consuming(delimited(multispace0, rule, multispace0))(input)
        .map(|(_, rule)| rule)
        .map_err(|_| ParseError::Rule(input.trim().to_string()))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

fn variable(input: &str) -> IResult<&str, Term> {
    map(preceded(char('?'), identifier), |name: &str| {
        Term::Variable(name.to_string())
    })(input)
}

fn symbol(input: &str) -> IResult<&str, Term> {
    map(identifier, |name: &str| Term::Symbol(name.to_string()))(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    alt((variable, map(statement, Term::Compound), symbol))(input)
}

fn statement(input: &str) -> IResult<&str, Statement> {
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, predicate) = identifier(input)?;
    let (input, args) = many0(preceded(multispace1, term))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, Statement::new(predicate, args)))
}

fn rule(input: &str) -> IResult<&str, (Vec<Statement>, Statement)> {
    let (input, _) = char('(')(input)?;
    let (input, lhs) = many1(delimited(multispace0, statement, multispace0))(input)?;
    let (input, _) = char(')')(input)?;
    let (input, _) = delimited(multispace0, tag("->"), multispace0)(input)?;
    let (input, rhs) = statement(input)?;
    Ok((input, (lhs, rhs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KnowledgeBase;

    #[test]
    fn test_parse_statement_with_variables() {
        let statement = parse_statement("(parent john ?x)").unwrap();
        assert_eq!(
            statement,
            Statement::new("parent", vec![Term::sym("john"), Term::var("x")])
        );
    }

    #[test]
    fn test_parse_bare_proposition() {
        let statement = parse_statement("(raining)").unwrap();
        assert_eq!(statement, Statement::new("raining", vec![]));
    }

    #[test]
    fn test_parse_statement_with_nested_compound() {
        let statement = parse_statement("(owns ?who (book hamlet))").unwrap();
        assert_eq!(
            statement,
            Statement::new(
                "owns",
                vec![
                    Term::var("who"),
                    Term::Compound(Statement::new("book", vec![Term::sym("hamlet")])),
                ]
            )
        );
    }

    #[test]
    fn test_parse_statement_rejects_malformed_input() {
        assert!(parse_statement("parent john").is_err());
        assert!(parse_statement("(parent john").is_err());
        assert!(parse_statement("(parent john) extra").is_err());
        assert!(parse_statement("()").is_err());
    }

    #[test]
    fn test_parse_rule_multi_condition() {
        let (lhs, rhs) =
            parse_rule("((parent ?x ?y) (parent ?y ?z)) -> (grandparent ?x ?z)").unwrap();
        assert_eq!(lhs.len(), 2);
        assert_eq!(lhs[0].predicate, "parent");
        assert_eq!(
            rhs,
            Statement::new("grandparent", vec![Term::var("x"), Term::var("z")])
        );
    }

    #[test]
    fn test_parse_rule_rejects_missing_arrow() {
        assert!(parse_rule("((parent ?x ?y)) (grandparent ?x ?y)").is_err());
    }

    #[test]
    fn test_parse_round_trips_display() {
        for text in ["(parent john mary)", "(owns ?who (book hamlet))"] {
            let statement = parse_statement(text).unwrap();
            assert_eq!(statement.to_string(), text);
            assert_eq!(parse_statement(&statement.to_string()).unwrap(), statement);
        }
    }

    #[test]
    fn test_parsed_rule_drives_the_engine() {
        let mut kb = KnowledgeBase::new();
        let (lhs, rhs) =
            parse_rule("((parent ?x ?y) (parent ?y ?z)) -> (grandparent ?x ?z)").unwrap();
        kb.assert_rule(lhs, rhs);
        kb.assert_fact(parse_statement("(parent ann bob)").unwrap());
        kb.assert_fact(parse_statement("(parent bob cal)").unwrap());

        let answers = kb.ask(&parse_statement("(grandparent ann ?z)").unwrap());
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].binding.get("z"), Some(&Term::sym("cal")));
    }
}
