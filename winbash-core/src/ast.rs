//! Abstract syntax tree produced by the [`crate::parser`]. Immutable once
//! built: every pass after parsing (preprocessing, strategy analysis,
//! emulation) reads the tree and produces new strings or a new tree, never
//! mutates nodes in place.

use std::fmt;

/// A single redirection attached to a [`AstNode::SimpleCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `>`
    Out,
    /// `>>`
    Append,
    /// `<`
    In,
    /// `2>`
    ErrOut,
    /// `2>&1`
    ErrToOut,
    /// `&>`
    OutAndErr,
}

/// Which standard stream a process substitution connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSubstitutionDirection {
    /// `<(cmd)` — the command's stdout is exposed to the parent as a
    /// readable path.
    Input,
    /// `>(cmd)` — the command's stdin is exposed to the parent as a
    /// writable path.
    Output,
}

/// The full node set of the parsed command pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// A single command with its argument words and attached redirects.
    SimpleCommand {
        words: Vec<String>,
        redirects: Vec<Redirect>,
    },
    /// `a | b | c` — stdout of each stage feeds stdin of the next.
    Pipeline(Vec<AstNode>),
    /// `a && b` — execute right only if left succeeded.
    AndList(Box<AstNode>, Box<AstNode>),
    /// `a || b` — execute right only if left failed.
    OrList(Box<AstNode>, Box<AstNode>),
    /// `a ; b` — execute both unconditionally, in order.
    Sequence(Box<AstNode>, Box<AstNode>),
    /// `(cmd)` — executed in an isolated subshell environment.
    Subshell(Box<AstNode>),
    /// `{ cmd; }` — executed in the current environment.
    CommandGroup(Box<AstNode>),
    /// `cmd &` — executed without waiting for completion.
    Background(Box<AstNode>),
    /// `<(cmd)` / `>(cmd)` appearing as a command argument.
    ProcessSubstitution {
        direction: ProcessSubstitutionDirection,
        inner: Box<AstNode>,
    },
}

impl AstNode {
    pub fn simple(words: Vec<String>) -> Self {
        AstNode::SimpleCommand {
            words,
            redirects: Vec::new(),
        }
    }

    /// The leading word (command name) of the left-most simple command in
    /// this node, if any — used by the strategy analyzer's pattern matching.
    pub fn leading_command_name(&self) -> Option<&str> {
        match self {
            AstNode::SimpleCommand { words, .. } => words.first().map(String::as_str),
            AstNode::Pipeline(stages) => stages.first().and_then(Self::leading_command_name),
            AstNode::AndList(left, _)
            | AstNode::OrList(left, _)
            | AstNode::Sequence(left, _) => left.leading_command_name(),
            AstNode::Subshell(inner)
            | AstNode::CommandGroup(inner)
            | AstNode::Background(inner) => inner.leading_command_name(),
            AstNode::ProcessSubstitution { inner, .. } => inner.leading_command_name(),
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::SimpleCommand { words, redirects } => {
                write!(f, "Cmd({})", words.join(" "))?;
                for redirect in redirects {
                    write!(f, " [{:?} {}]", redirect.kind, redirect.target)?;
                }
                Ok(())
            }
            AstNode::Pipeline(stages) => {
                let rendered: Vec<String> = stages.iter().map(ToString::to_string).collect();
                write!(f, "Pipeline({})", rendered.join(" | "))
            }
            AstNode::AndList(left, right) => write!(f, "({left} && {right})"),
            AstNode::OrList(left, right) => write!(f, "({left} || {right})"),
            AstNode::Sequence(left, right) => write!(f, "({left} ; {right})"),
            AstNode::Subshell(inner) => write!(f, "({inner})"),
            AstNode::CommandGroup(inner) => write!(f, "{{ {inner}; }}"),
            AstNode::Background(inner) => write!(f, "{inner} &"),
            AstNode::ProcessSubstitution { direction, inner } => match direction {
                ProcessSubstitutionDirection::Input => write!(f, "<({inner})"),
                ProcessSubstitutionDirection::Output => write!(f, ">({inner})"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_command_name_walks_into_pipelines() {
        let node = AstNode::Pipeline(vec![
            AstNode::simple(vec!["cat".into(), "file.txt".into()]),
            AstNode::simple(vec!["grep".into(), "pattern".into()]),
        ]);
        assert_eq!(node.leading_command_name(), Some("cat"));
    }

    #[test]
    fn leading_command_name_walks_into_and_list() {
        let node = AstNode::AndList(
            Box::new(AstNode::simple(vec!["mkdir".into(), "out".into()])),
            Box::new(AstNode::simple(vec!["cd".into(), "out".into()])),
        );
        assert_eq!(node.leading_command_name(), Some("mkdir"));
    }

    #[test]
    fn display_renders_pipeline() {
        let node = AstNode::Pipeline(vec![
            AstNode::simple(vec!["ls".into()]),
            AstNode::simple(vec!["wc".into(), "-l".into()]),
        ]);
        assert_eq!(node.to_string(), "Pipeline(Cmd(ls) | Cmd(wc -l))");
    }
}
