//! Recursive-descent parser turning a token stream into an [`AstNode`] tree.
//!
//! Precedence from loosest to tightest binding: `;` (sequence), then
//! `&&`/`||` (left-associative, equal precedence, evaluated left to right),
//! then `|` (pipeline), then simple commands with their redirects. A
//! trailing `&` wraps the whole statement in [`AstNode::Background`].
//! `(...)` parses as [`AstNode::Subshell`], `{ ...; }` as
//! [`AstNode::CommandGroup`].

use anyhow::{Result, bail};

use crate::ast::{AstNode, ProcessSubstitutionDirection, Redirect, RedirectKind};
use crate::lexer::{Lexer, Token};

pub fn parse(source: &str) -> Result<AstNode> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_sequence()?;
    parser.expect(Token::Eof)?;
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            bail!("expected {:?}, found {:?}", expected, self.peek())
        }
    }

    /// `stmt (';' stmt)*` — trailing semicolons before EOF/`}` are tolerated.
    fn parse_sequence(&mut self) -> Result<AstNode> {
        let mut node = self.parse_and_or()?;
        while *self.peek() == Token::Semicolon {
            self.advance();
            if matches!(self.peek(), Token::Eof | Token::RBrace | Token::RParen) {
                break;
            }
            let right = self.parse_and_or()?;
            node = AstNode::Sequence(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    /// `background (('&&' | '||') background)*`, left-associative.
    fn parse_and_or(&mut self) -> Result<AstNode> {
        let mut node = self.parse_background()?;
        loop {
            match self.peek() {
                Token::And => {
                    self.advance();
                    let right = self.parse_background()?;
                    node = AstNode::AndList(Box::new(node), Box::new(right));
                }
                Token::Or => {
                    self.advance();
                    let right = self.parse_background()?;
                    node = AstNode::OrList(Box::new(node), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// `pipeline '&'?`
    fn parse_background(&mut self) -> Result<AstNode> {
        let node = self.parse_pipeline()?;
        if *self.peek() == Token::Background {
            self.advance();
            Ok(AstNode::Background(Box::new(node)))
        } else {
            Ok(node)
        }
    }

    /// `command ('|' command)*`
    fn parse_pipeline(&mut self) -> Result<AstNode> {
        let mut stages = vec![self.parse_command()?];
        while *self.peek() == Token::Pipe {
            self.advance();
            stages.push(self.parse_command()?);
        }
        if stages.len() == 1 {
            Ok(stages.remove(0))
        } else {
            Ok(AstNode::Pipeline(stages))
        }
    }

    /// A simple command, a parenthesized subshell, or a brace group, each
    /// optionally followed by redirections.
    fn parse_command(&mut self) -> Result<AstNode> {
        match self.peek() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_sequence()?;
                self.expect(Token::RParen)?;
                self.parse_trailing_redirects(AstNode::Subshell(Box::new(inner)))
            }
            Token::LBrace => {
                self.advance();
                let inner = self.parse_sequence()?;
                self.expect(Token::RBrace)?;
                self.parse_trailing_redirects(AstNode::CommandGroup(Box::new(inner)))
            }
            _ => self.parse_simple_command(),
        }
    }

    fn parse_simple_command(&mut self) -> Result<AstNode> {
        let mut words = Vec::new();
        let mut redirects = Vec::new();

        loop {
            match self.peek().clone() {
                Token::Word(word) => {
                    self.advance();
                    words.push(word);
                }
                Token::RedirectOut
                | Token::RedirectAppend
                | Token::RedirectIn
                | Token::RedirectErr
                | Token::RedirectErrToOut
                | Token::RedirectOutAndErr => {
                    redirects.push(self.parse_redirect()?);
                }
                Token::ProcSubIn | Token::ProcSubOut => {
                    let direction = if *self.peek() == Token::ProcSubIn {
                        ProcessSubstitutionDirection::Input
                    } else {
                        ProcessSubstitutionDirection::Output
                    };
                    self.advance();
                    let inner = self.parse_sequence()?;
                    self.expect(Token::RParen)?;
                    words.push(
                        AstNode::ProcessSubstitution {
                            direction,
                            inner: Box::new(inner),
                        }
                        .to_string(),
                    );
                }
                _ => break,
            }
        }

        if words.is_empty() && redirects.is_empty() {
            bail!("expected a command, found {:?}", self.peek());
        }

        Ok(AstNode::SimpleCommand { words, redirects })
    }

    fn parse_redirect(&mut self) -> Result<Redirect> {
        let kind = match self.advance() {
            Token::RedirectOut => RedirectKind::Out,
            Token::RedirectAppend => RedirectKind::Append,
            Token::RedirectIn => RedirectKind::In,
            Token::RedirectErr => RedirectKind::ErrOut,
            Token::RedirectErrToOut => RedirectKind::ErrToOut,
            Token::RedirectOutAndErr => RedirectKind::OutAndErr,
            other => bail!("expected a redirect operator, found {:?}", other),
        };

        // `2>&1` has no filename target; every other redirect needs one.
        if kind == RedirectKind::ErrToOut {
            return Ok(Redirect {
                kind,
                target: String::new(),
            });
        }

        match self.advance() {
            Token::Word(target) => Ok(Redirect { kind, target }),
            other => bail!("expected a redirect target, found {:?}", other),
        }
    }

    fn parse_trailing_redirects(&mut self, node: AstNode) -> Result<AstNode> {
        let mut redirects = Vec::new();
        while matches!(
            self.peek(),
            Token::RedirectOut
                | Token::RedirectAppend
                | Token::RedirectIn
                | Token::RedirectErr
                | Token::RedirectErrToOut
                | Token::RedirectOutAndErr
        ) {
            redirects.push(self.parse_redirect()?);
        }
        if redirects.is_empty() {
            return Ok(node);
        }
        // Group/subshell redirects apply to the whole node; surface them via
        // a trailing no-op SimpleCommand carrying only the redirects.
        match node {
            AstNode::SimpleCommand {
                words,
                redirects: mut existing,
            } => {
                existing.extend(redirects);
                Ok(AstNode::SimpleCommand {
                    words,
                    redirects: existing,
                })
            }
            other => Ok(AstNode::Pipeline(vec![
                other,
                AstNode::SimpleCommand {
                    words: Vec::new(),
                    redirects,
                },
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstNode;

    #[test]
    fn parses_simple_command() {
        let node = parse("echo hello").unwrap();
        assert_eq!(node, AstNode::simple(vec!["echo".into(), "hello".into()]));
    }

    #[test]
    fn parses_pipeline() {
        let node = parse("cat file.txt | grep pattern").unwrap();
        match node {
            AstNode::Pipeline(stages) => assert_eq!(stages.len(), 2),
            other => panic!("expected pipeline, got {other:?}"),
        }
    }

    #[test]
    fn parses_and_list_left_associative() {
        let node = parse("a && b && c").unwrap();
        match node {
            AstNode::AndList(left, right) => {
                assert_eq!(right.leading_command_name(), Some("c"));
                match *left {
                    AstNode::AndList(inner_left, inner_right) => {
                        assert_eq!(inner_left.leading_command_name(), Some("a"));
                        assert_eq!(inner_right.leading_command_name(), Some("b"));
                    }
                    other => panic!("expected nested AndList, got {other:?}"),
                }
            }
            other => panic!("expected AndList, got {other:?}"),
        }
    }

    #[test]
    fn parses_sequence_of_statements() {
        let node = parse("mkdir out; cd out").unwrap();
        assert!(matches!(node, AstNode::Sequence(_, _)));
    }

    #[test]
    fn parses_subshell() {
        let node = parse("(cd out && ls)").unwrap();
        assert!(matches!(node, AstNode::Subshell(_)));
    }

    #[test]
    fn parses_command_group() {
        let node = parse("{ echo a; echo b; }").unwrap();
        assert!(matches!(node, AstNode::CommandGroup(_)));
    }

    #[test]
    fn parses_background_command() {
        let node = parse("long_task &").unwrap();
        assert!(matches!(node, AstNode::Background(_)));
    }

    #[test]
    fn parses_redirects_on_simple_command() {
        let node = parse("sort < in.txt > out.txt").unwrap();
        match node {
            AstNode::SimpleCommand { redirects, .. } => assert_eq!(redirects.len(), 2),
            other => panic!("expected SimpleCommand, got {other:?}"),
        }
    }

    #[test]
    fn parses_process_substitution_as_diff_argument() {
        let node = parse("diff <(sort a.txt) <(sort b.txt)").unwrap();
        match node {
            AstNode::SimpleCommand { words, .. } => {
                assert_eq!(words[0], "diff");
                assert!(words[1].starts_with("<("));
            }
            other => panic!("expected SimpleCommand, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unterminated_subshell() {
        assert!(parse("(echo a").is_err());
    }
}
