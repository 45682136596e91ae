//! Turns the token list into a pipeline plan.
//!
//! Two passes per line: split on unquoted `|` / `|&` into stages, then pull
//! the first redirection operator and its target out of each stage's argv.

use std::error::Error;
use std::fmt;

use super::ast::{Pipeline, RedirectMode, Redirection, Stage};
use super::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A pipe operator with nothing on one side of it.
    EmptySegment(String),
    /// More than one redirection in a single stage.
    DuplicateRedirection(String),
    /// A redirection operator at the end of the line.
    MissingRedirectTarget(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptySegment(op) | ParseError::DuplicateRedirection(op) => {
                write!(f, "syntax error near unexpected token `{}'", op)
            }
            ParseError::MissingRedirectTarget(_) => {
                write!(f, "syntax error near unexpected token `newline'")
            }
        }
    }
}

impl Error for ParseError {}

fn redirect_operator(token: &Token) -> Option<(u8, RedirectMode)> {
    if token.quoted {
        return None;
    }
    match token.text.as_str() {
        ">" | "1>" => Some((1, RedirectMode::Truncate)),
        ">>" | "1>>" => Some((1, RedirectMode::Append)),
        "2>" => Some((2, RedirectMode::Truncate)),
        "2>>" => Some((2, RedirectMode::Append)),
        _ => None,
    }
}

/// Parse a nonempty token list into a pipeline plan.
pub fn parse(tokens: &[Token]) -> Result<Pipeline, ParseError> {
    let mut stages = Vec::new();
    let mut segment: Vec<&Token> = Vec::new();
    let mut incoming_fd = 1u8;
    let mut last_pipe = String::from("|");

    for token in tokens {
        if token.is_operator("|") || token.is_operator("|&") {
            if segment.is_empty() {
                return Err(ParseError::EmptySegment(token.text.clone()));
            }
            stages.push(build_stage(&segment, incoming_fd)?);
            segment.clear();
            incoming_fd = if token.text == "|&" { 2 } else { 1 };
            last_pipe = token.text.clone();
        } else {
            segment.push(token);
        }
    }
    if segment.is_empty() {
        return Err(ParseError::EmptySegment(last_pipe));
    }
    stages.push(build_stage(&segment, incoming_fd)?);

    Ok(Pipeline { stages })
}

fn build_stage(tokens: &[&Token], pipe_source_fd: u8) -> Result<Stage, ParseError> {
    let mut argv = Vec::new();
    let mut redirection: Option<Redirection> = None;
    let mut first_op = None;
    let mut i = 0;

    while i < tokens.len() {
        if let Some((fd, mode)) = redirect_operator(tokens[i]) {
            let op = tokens[i].text.clone();
            if redirection.is_some() {
                return Err(ParseError::DuplicateRedirection(op));
            }
            let target = tokens
                .get(i + 1)
                .ok_or_else(|| ParseError::MissingRedirectTarget(op.clone()))?;
            redirection = Some(Redirection {
                fd,
                mode,
                target: target.text.clone(),
            });
            first_op = Some(op);
            i += 2;
        } else {
            argv.push(tokens[i].text.clone());
            i += 1;
        }
    }

    if argv.is_empty() {
        // A redirection with no command in front of it.
        return Err(ParseError::EmptySegment(
            first_op.unwrap_or_else(|| String::from("|")),
        ));
    }

    Ok(Stage {
        argv,
        redirection,
        pipe_source_fd,
    })
}
