//! Text front end
//!
//! One item per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! fact: (hero A)
//! rule: ((hero ?x) (person ?x)) -> (goodman ?x)
//! ```
//!
//! Tokens starting with `?` are variables, every other token is a constant.

use regex::Regex;

use crate::error::{Error, Result};
use crate::rule::{Fact, Item, Rule};
use crate::term::{Statement, Term};

const HEADER_PATTERN: &str = r"^\s*(fact|rule)\s*:\s*(.+?)\s*$";

const ARROW: &str = "->";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Arrow,
    Atom(String),
}

fn tokenize(body: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut atom = String::new();

    let flush = |atom: &mut String, tokens: &mut Vec<Token>| {
        if atom.is_empty() {
            return;
        }
        let text = std::mem::take(atom);
        if text == ARROW {
            tokens.push(Token::Arrow);
        } else {
            tokens.push(Token::Atom(text));
        }
    };

    for c in body.chars() {
        match c {
            '(' | ')' => {
                flush(&mut atom, &mut tokens);
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
            }
            c if c.is_whitespace() => flush(&mut atom, &mut tokens),
            c => atom.push(c),
        }
    }
    flush(&mut atom, &mut tokens);
    tokens
}

/// Cursor over the tokens of one line.
struct Tokens {
    line: usize,
    inner: std::iter::Peekable<std::vec::IntoIter<Token>>,
}

impl Tokens {
    fn new(line: usize, body: &str) -> Self {
        Self {
            line,
            inner: tokenize(body).into_iter().peekable(),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.line, message)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        match self.inner.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {}, found {:?}", what, token))),
            None => Err(self.error(format!("expected {}, found end of line", what))),
        }
    }

    /// `( atom atom ... )`
    fn statement(&mut self) -> Result<Statement> {
        self.expect(Token::Open, "'('")?;
        let mut terms = Vec::new();
        loop {
            match self.inner.next() {
                Some(Token::Atom(atom)) => terms.push(Term::from_token(&atom)),
                Some(Token::Close) => break,
                Some(token) => {
                    return Err(self.error(format!("unexpected {:?} inside a statement", token)))
                }
                None => return Err(self.error("unclosed statement")),
            }
        }
        if terms.is_empty() {
            return Err(self.error("empty statement"));
        }
        Ok(Statement::new(terms))
    }

    /// `( statement statement ... ) -> statement`
    fn rule(&mut self) -> Result<Rule> {
        self.expect(Token::Open, "'(' opening the antecedents")?;
        let mut lhs = Vec::new();
        while self.inner.peek() == Some(&Token::Open) {
            lhs.push(self.statement()?);
        }
        self.expect(Token::Close, "')' closing the antecedents")?;
        self.expect(Token::Arrow, "'->'")?;
        let rhs = self.statement()?;
        Rule::new(lhs, rhs).map_err(|e| self.error(e.to_string()))
    }

    fn finish(&mut self) -> Result<()> {
        match self.inner.next() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("trailing {:?}", token))),
        }
    }
}

/// Line parser holding the compiled header pattern.
struct Parser {
    header: Regex,
}

impl Parser {
    fn new() -> Result<Self> {
        let header = Regex::new(HEADER_PATTERN).map_err(|e| Error::parse(0, e.to_string()))?;
        Ok(Self { header })
    }

    fn line(&self, line: usize, text: &str) -> Result<Item> {
        let captures = self
            .header
            .captures(text)
            .ok_or_else(|| Error::parse(line, "expected 'fact:' or 'rule:'"))?;
        let body = captures.get(2).map_or("", |m| m.as_str());

        let mut tokens = Tokens::new(line, body);
        let item = match captures.get(1).map(|m| m.as_str()) {
            Some("fact") => Item::Fact(Fact::new(tokens.statement()?)),
            _ => Item::Rule(tokens.rule()?),
        };
        tokens.finish()?;
        Ok(item)
    }
}

/// Parses a single `fact:` or `rule:` line.
///
/// ```
/// use aingle_kb::syntax::parse_item;
///
/// let item = parse_item("rule: ((hero ?x) (person ?x)) -> (goodman ?x)").unwrap();
/// assert_eq!(item.as_rule().unwrap().lhs().len(), 2);
/// ```
pub fn parse_item(text: &str) -> Result<Item> {
    Parser::new()?.line(1, text)
}

/// Parses a document of `fact:` and `rule:` lines.
///
/// Blank lines and lines starting with `#` are skipped. Errors carry the
/// 1-based line number.
pub fn parse_document(text: &str) -> Result<Vec<Item>> {
    let parser = Parser::new()?;
    let mut items = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        items.push(parser.line(index + 1, trimmed)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fact() {
        let item = parse_item("fact: (hero A)").unwrap();
        assert_eq!(item, Item::Fact(Fact::from_tokens(["hero", "A"])));
    }

    #[test]
    fn test_parse_rule() {
        let item = parse_item("rule: ((rela ?x ?y) (relb ?y ?z)) -> (relc ?x ?z)").unwrap();
        let rule = item.as_rule().unwrap();
        assert_eq!(rule.lhs().len(), 2);
        assert_eq!(rule.rhs(), &Statement::from_tokens(["relc", "?x", "?z"]));
        assert!(rule.lhs()[0].terms()[1].is_variable());
    }

    #[test]
    fn test_display_parses_back() {
        let line = "rule: ((hero ?x) (person ?x)) -> (goodman ?x)";
        assert_eq!(parse_item(line).unwrap().to_string(), line);
    }

    #[test]
    fn test_whitespace_is_flexible() {
        let item = parse_item("  rule :((a ?x)(b ?x))->(c ?x)  ").unwrap();
        assert_eq!(item.to_string(), "rule: ((a ?x) (b ?x)) -> (c ?x)");
    }

    #[test]
    fn test_rejects_malformed_lines() {
        for bad in [
            "(hero A)",
            "fact: hero A",
            "fact: (hero A",
            "fact: ()",
            "fact: (hero A) extra",
            "fact: (hero (A))",
            "rule: (hero ?x) -> (good ?x)",
            "rule: ((hero ?x)) (good ?x)",
            "rule: () -> (good ?x)",
        ] {
            assert!(
                matches!(parse_item(bad), Err(Error::Parse { line: 1, .. })),
                "{:?} should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_document_skips_comments_and_reports_lines() {
        let doc = "# heroes\n\nfact: (hero A)\nrule: ((hero ?x)) -> (good ?x)\n";
        assert_eq!(parse_document(doc).unwrap().len(), 2);

        let err = parse_document("fact: (hero A)\n# ok\nfact: hero").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }));
    }
}
