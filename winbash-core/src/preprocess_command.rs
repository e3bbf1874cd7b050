//! Command-level preprocessing: pure string rewrites that never execute a
//! subprocess or touch the filesystem, so they are safe to apply
//! unconditionally regardless of which backend eventually runs the command.
//!
//! Ordered passes, matching §4.5: aliases, tilde, arithmetic, variables,
//! braces. Arithmetic runs strictly before variable/brace expansion so that
//! `$((1..3))`-shaped text is never misread as a brace range, and so
//! `${VAR}`-embedded arithmetic resolves before the brace scanner runs.

use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Virtual Unix home used for tilde expansion, per the Open Question
/// resolution in `SPEC_FULL.md` §9.1 — `~/` expands to the virtual
/// `/home/claude`, translated to a real path by the ordinary path-translation
/// pass, not to the host OS profile directory.
pub const VIRTUAL_HOME: &str = "/home/claude";

const ALIASES: &[(&str, &str)] = &[("ll", "ls -la"), ("la", "ls -A"), ("l", "ls -CF")];

/// Runs every command-level (§4.5) pass over `command`, consulting `env` for
/// variable values. Unset variables are left textually intact so a
/// downstream bash backend can resolve them itself (§4.5 step 4 invariant).
pub fn preprocess_command_level(command: &str, env: &HashMap<String, String>) -> String {
    let command = expand_aliases(command);
    let command = expand_tilde(&command);
    let command = expand_arithmetic(&command);
    let command = expand_variables(&command, env);
    expand_braces(&command)
}

/// Category 2 — translation that is only safe once a PowerShell/`cmd.exe`
/// backend has been chosen (§4.5 "Preprocessor — Command Level", upstream's
/// `preprocess_for_emulation`). `[ expr ]` / `[[ expr ]]` become `test expr`
/// so the `test` emulator translator (§4.6) is the single place that
/// interprets POSIX test syntax.
pub fn preprocess_for_emulation(command: &str) -> String {
    static DOUBLE_BRACKET: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[\[\s+([^\]]+?)\s+\]\]").expect("static pattern"));
    static SINGLE_BRACKET: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[\s+([^\]]+?)\s+\]").expect("static pattern"));

    let command = DOUBLE_BRACKET.replace_all(command, "test $1");
    SINGLE_BRACKET.replace_all(&command, "test $1").into_owned()
}

fn expand_aliases(command: &str) -> String {
    for (alias, expansion) in ALIASES {
        if let Some(rest) = command.strip_prefix(alias) {
            let boundary = rest.chars().next().map_or(true, |c| c == ' ' || c == '\n');
            if boundary {
                return format!("{expansion}{rest}");
            }
        }
    }
    command.to_string()
}

fn expand_tilde(command: &str) -> String {
    static LEADING_OR_EMBEDDED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(^|\s)~(/|$)").expect("static pattern"));

    LEADING_OR_EMBEDDED
        .replace_all(command, |captures: &Captures| {
            let leading = &captures[1];
            let trailer = &captures[2];
            format!("{leading}{VIRTUAL_HOME}{trailer}")
        })
        .into_owned()
}

/// `$((expr))` — integer arithmetic only. Embedded variables are substituted
/// with their values first; an unresolved or malformed expression is left
/// textually intact (never aborts the outer command, matching §7's
/// propagation rule for non-fatal preprocessing failures).
fn expand_arithmetic(command: &str) -> String {
    static ARITHMETIC: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\(\(([^()]+)\)\)").expect("static pattern"));

    ARITHMETIC
        .replace_all(command, |captures: &Captures| {
            let expr = &captures[1];
            match arithmetic::evaluate(expr) {
                Ok(value) => value.to_string(),
                Err(_) => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// The arithmetic expression evaluator backing `expand_arithmetic`. A tiny
/// recursive-descent parser over `+ - * / % **` and parentheses, integer
/// semantics only. Variable names must already be pre-substituted by the
/// caller — this evaluator has no identifier or function-call surface, so it
/// cannot be used as a general `eval`.
mod arithmetic {
    use anyhow::{Result, bail};

    pub fn evaluate(expr: &str) -> Result<i64> {
        let mut parser = Parser {
            chars: expr.chars().collect(),
            pos: 0,
        };
        let value = parser.parse_additive()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            bail!("trailing input in arithmetic expression: `{expr}`");
        }
        Ok(value)
    }

    struct Parser {
        chars: Vec<char>,
        pos: usize,
    }

    impl Parser {
        fn skip_whitespace(&mut self) {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.pos += 1;
            }
        }

        fn peek(&self) -> Option<char> {
            self.chars.get(self.pos).copied()
        }

        fn peek_at(&self, offset: usize) -> Option<char> {
            self.chars.get(self.pos + offset).copied()
        }

        fn parse_additive(&mut self) -> Result<i64> {
            let mut value = self.parse_multiplicative()?;
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some('+') => {
                        self.pos += 1;
                        value += self.parse_multiplicative()?;
                    }
                    Some('-') => {
                        self.pos += 1;
                        value -= self.parse_multiplicative()?;
                    }
                    _ => break,
                }
            }
            Ok(value)
        }

        fn parse_multiplicative(&mut self) -> Result<i64> {
            let mut value = self.parse_power()?;
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some('*') if self.peek_at(1) != Some('*') => {
                        self.pos += 1;
                        value *= self.parse_power()?;
                    }
                    Some('/') => {
                        self.pos += 1;
                        let rhs = self.parse_power()?;
                        if rhs == 0 {
                            bail!("division by zero");
                        }
                        value /= rhs;
                    }
                    Some('%') => {
                        self.pos += 1;
                        let rhs = self.parse_power()?;
                        if rhs == 0 {
                            bail!("division by zero");
                        }
                        value %= rhs;
                    }
                    _ => break,
                }
            }
            Ok(value)
        }

        fn parse_power(&mut self) -> Result<i64> {
            let base = self.parse_unary()?;
            self.skip_whitespace();
            if self.peek() == Some('*') && self.peek_at(1) == Some('*') {
                self.pos += 2;
                let exponent = self.parse_power()?;
                if exponent < 0 {
                    bail!("negative exponent not supported");
                }
                Ok(base.pow(exponent as u32))
            } else {
                Ok(base)
            }
        }

        fn parse_unary(&mut self) -> Result<i64> {
            self.skip_whitespace();
            match self.peek() {
                Some('-') => {
                    self.pos += 1;
                    Ok(-self.parse_unary()?)
                }
                Some('+') => {
                    self.pos += 1;
                    self.parse_unary()
                }
                _ => self.parse_primary(),
            }
        }

        fn parse_primary(&mut self) -> Result<i64> {
            self.skip_whitespace();
            match self.peek() {
                Some('(') => {
                    self.pos += 1;
                    let value = self.parse_additive()?;
                    self.skip_whitespace();
                    if self.peek() != Some(')') {
                        bail!("unbalanced parentheses in arithmetic expression");
                    }
                    self.pos += 1;
                    Ok(value)
                }
                Some(c) if c.is_ascii_digit() => {
                    let start = self.pos;
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.pos += 1;
                    }
                    let text: String = self.chars[start..self.pos].iter().collect();
                    text.parse::<i64>()
                        .map_err(|err| anyhow::anyhow!("invalid integer literal: {err}"))
                }
                other => bail!(
                    "arithmetic evaluator does not support identifiers or function calls (found {other:?})"
                ),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn evaluates_basic_operators() {
            assert_eq!(evaluate("5+3").unwrap(), 8);
            assert_eq!(evaluate("10 - 4").unwrap(), 6);
            assert_eq!(evaluate("6 * 7").unwrap(), 42);
            assert_eq!(evaluate("20 / 3").unwrap(), 6);
            assert_eq!(evaluate("20 % 3").unwrap(), 2);
            assert_eq!(evaluate("2**10").unwrap(), 1024);
        }

        #[test]
        fn respects_precedence_and_parens() {
            assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14);
            assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20);
        }

        #[test]
        fn rejects_identifiers() {
            assert!(evaluate("foo + 1").is_err());
        }

        #[test]
        fn rejects_division_by_zero() {
            assert!(evaluate("1/0").is_err());
        }
    }
}

/// Variable expansion, in the fixed order of §4.5 step 4: length, strip
/// prefix/suffix, substitution, case conversion, default value, plain
/// `${V}`, plain `$V`. Earlier passes consume the forms they own so later
/// (more general) patterns never re-match an already-handled expansion.
/// Exposes the variable-expansion pass alone, for callers (the pipeline
/// preprocessor's heredoc handling) that need to expand an unquoted
/// heredoc body without running alias/tilde/arithmetic/brace passes on it.
pub(crate) fn expand_variables_only(text: &str, env: &HashMap<String, String>) -> String {
    expand_variables(text, env)
}

fn expand_variables(command: &str, env: &HashMap<String, String>) -> String {
    let command = expand_length(command, env);
    let command = expand_strip_prefix(&command, env);
    let command = expand_strip_suffix(&command, env);
    let command = expand_substitution(&command, env);
    let command = expand_case(&command, env);
    let command = expand_default(&command, env);
    let command = expand_plain_braced(&command, env);
    expand_plain(&command, env)
}

fn lookup<'a>(env: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    env.get(name).map(String::as_str)
}

fn expand_length(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{#(\w+)\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| match lookup(env, &captures[1]) {
            Some(value) => value.chars().count().to_string(),
            None => captures[0].to_string(),
        })
        .into_owned()
}

fn expand_strip_prefix(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{(\w+)(#{1,2})([^}]+)\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| {
            let Some(value) = lookup(env, &captures[1]) else {
                return captures[0].to_string();
            };
            let greedy = &captures[2] == "##";
            let glob = &captures[3];
            strip_prefix_matching(value, glob, greedy)
        })
        .into_owned()
}

fn expand_strip_suffix(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{(\w+)(%{1,2})([^}]+)\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| {
            let Some(value) = lookup(env, &captures[1]) else {
                return captures[0].to_string();
            };
            let greedy = &captures[2] == "%%";
            let glob = &captures[3];
            strip_suffix_matching(value, glob, greedy)
        })
        .into_owned()
}

fn expand_substitution(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{(\w+)(/{1,2})([^/}]+)/([^}]*)\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| {
            let Some(value) = lookup(env, &captures[1]) else {
                return captures[0].to_string();
            };
            let replace_all = &captures[2] == "//";
            let glob = &captures[3];
            let replacement = &captures[4];
            substitute_matching(value, glob, replacement, replace_all)
        })
        .into_owned()
}

fn expand_case(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{(\w+)(\^{1,2}|,{1,2})\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| {
            let Some(value) = lookup(env, &captures[1]) else {
                return captures[0].to_string();
            };
            match &captures[2] {
                "^^" => value.to_uppercase(),
                ",," => value.to_lowercase(),
                "^" => capitalize_first(value, true),
                "," => capitalize_first(value, false),
                _ => value.to_string(),
            }
        })
        .into_owned()
}

fn expand_default(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{(\w+):-([^}]*)\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| match lookup(env, &captures[1]) {
            Some(value) if !value.is_empty() => value.to_string(),
            Some(_) => captures[2].to_string(),
            None => captures[0].to_string(),
        })
        .into_owned()
}

fn expand_plain_braced(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| match lookup(env, &captures[1]) {
            Some(value) => value.to_string(),
            None => captures[0].to_string(),
        })
        .into_owned()
}

fn expand_plain(command: &str, env: &HashMap<String, String>) -> String {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$([A-Za-z_]\w*)").expect("static pattern"));
    PATTERN
        .replace_all(command, |captures: &Captures| match lookup(env, &captures[1]) {
            Some(value) => value.to_string(),
            None => captures[0].to_string(),
        })
        .into_owned()
}

fn capitalize_first(value: &str, upper: bool) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => {
            let first = if upper {
                first.to_uppercase().to_string()
            } else {
                first.to_lowercase().to_string()
            };
            format!("{first}{}", chars.as_str())
        }
        None => String::new(),
    }
}

/// Translates a POSIX glob (`*`, `?`, `[...]`) into a regex, anchored per the
/// caller's needs (prefix-anchored for `#`/`##`, suffix-anchored for
/// `%`/`%%`). Needed by variable expansion's prefix/suffix-strip and
/// substitution forms (design note: "glob-to-regex conversion").
fn glob_to_regex(glob: &str, anchor_start: bool, anchor_end: bool) -> Regex {
    let mut pattern = String::new();
    if anchor_start {
        pattern.push('^');
    }
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '[' => {
                pattern.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    pattern.push('^');
                }
                for next in chars.by_ref() {
                    pattern.push(next);
                    if next == ']' {
                        break;
                    }
                }
            }
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    if anchor_end {
        pattern.push('$');
    }
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new(&regex::escape(glob)).expect("escaped literal is always valid"))
}

fn strip_prefix_matching(value: &str, glob: &str, greedy: bool) -> String {
    let regex = glob_to_regex(glob, true, false);
    let Some(matched) = regex.find(value) else {
        return value.to_string();
    };
    if greedy {
        // Longest match: try widening the match window across the string
        // (regex::find already returns the longest leftmost match for `.*`
        // since `.*` is greedy by default).
        return value[matched.end()..].to_string();
    }
    // Shortest match: use a non-greedy translation of the same glob.
    let lazy_pattern = format!("^{}", regex.as_str().trim_start_matches('^').replace(".*", ".*?"));
    match Regex::new(&lazy_pattern) {
        Ok(lazy) => match lazy.find(value) {
            Some(m) => value[m.end()..].to_string(),
            None => value.to_string(),
        },
        Err(_) => value[matched.end()..].to_string(),
    }
}

fn strip_suffix_matching(value: &str, glob: &str, greedy: bool) -> String {
    // Anchored at both ends: each candidate `start` is only a real suffix
    // match if the *entire* remainder matches the glob, not merely some
    // substring of it (an end-only anchor would let `.*` match a dot
    // embedded anywhere in the remainder, not just at its own start).
    let regex = glob_to_regex(glob, true, true);
    if greedy {
        // Longest suffix match: find the earliest start position whose
        // remainder matches the whole-suffix pattern.
        for start in 0..=value.len() {
            if !value.is_char_boundary(start) {
                continue;
            }
            if regex.is_match(&value[start..]) {
                return value[..start].to_string();
            }
        }
        value.to_string()
    } else {
        // Shortest suffix match: search from the end backwards.
        for start in (0..=value.len()).rev() {
            if !value.is_char_boundary(start) {
                continue;
            }
            if regex.is_match(&value[start..]) {
                return value[..start].to_string();
            }
        }
        value.to_string()
    }
}

fn substitute_matching(value: &str, glob: &str, replacement: &str, replace_all: bool) -> String {
    let regex = glob_to_regex(glob, false, false);
    if replace_all {
        regex.replace_all(value, replacement.replace('$', "$$")).into_owned()
    } else {
        regex.replacen(value, 1, replacement.replace('$', "$$")).into_owned()
    }
}

/// Two-pass brace expansion per §4.5: innermost-nested braces first, then a
/// token-level cartesian product pass for adjacent brace groups.
fn expand_braces(command: &str) -> String {
    let command = expand_nested_braces(command);
    expand_adjacent_braces(&command)
}

/// Pass 1 — repeatedly locate the deepest brace pair that is itself nested
/// inside another brace pair and has no further nesting of its own. If it
/// has a prefix (bounded by `,{ \t\n;|&`), fold it into a flattened comma
/// list in place. A brace pair with no enclosing brace (top-level) is never
/// touched here — it is always left for Pass 2, prefix or not.
fn expand_nested_braces(command: &str) -> String {
    const MAX_ITERATIONS: usize = 20;
    let mut command = command.to_string();

    for _ in 0..MAX_ITERATIONS {
        let Some((start, end, content)) = find_innermost_brace(&command) else {
            break;
        };

        let Some(items) = brace_items(content) else {
            break;
        };

        let mut prefix_start = start;
        while prefix_start > 0 {
            let candidate = prefix_start - 1;
            if ",{ \t\n;|&".contains(command.as_bytes()[candidate] as char) {
                break;
            }
            prefix_start = candidate;
        }

        if prefix_start == start {
            // A nested brace with nothing but a delimiter immediately to its
            // left (e.g. the first alternative of `{{1,2},x}`) — no prefix
            // to fold into, so stop and let the rest resolve in pass 2.
            break;
        }

        let prefix = &command[prefix_start..start];
        let expanded = items
            .iter()
            .map(|item| format!("{prefix}{item}"))
            .collect::<Vec<_>>()
            .join(",");
        command = format!("{}{}{}", &command[..prefix_start], expanded, &command[end..]);
    }

    command
}

/// Finds the brace pair with the greatest nesting depth whose contents
/// contain no further `{`/`}`. Returns `(start, end, content)` with `end`
/// exclusive of the closing brace.
fn find_innermost_brace(text: &str) -> Option<(usize, usize, &str)> {
    let bytes = text.as_bytes();
    let mut stack = Vec::new();
    let mut candidates: Vec<(usize, usize, usize)> = Vec::new();

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' if i == 0 || bytes[i - 1] != b'$' => stack.push(i),
            b'}' => {
                if let Some(open) = stack.pop() {
                    candidates.push((open, i + 1, stack.len()));
                }
            }
            _ => {}
        }
    }

    candidates
        .into_iter()
        .filter(|&(start, end, depth)| depth > 0 && !text[start + 1..end - 1].contains(['{', '}']))
        .max_by_key(|&(_, _, depth)| depth)
        .map(|(start, end, _)| (start, end, &text[start + 1..end - 1]))
}

/// Generates the list of items a single (non-nested) brace body expands to,
/// or `None` if the content is not one of the three recognized forms
/// (numeric range, alpha range, comma list) — the brace is then left as
/// literal text.
fn brace_items(content: &str) -> Option<Vec<String>> {
    static NUMERIC_RANGE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d+)\.\.(\d+)$").expect("static pattern"));
    static ALPHA_RANGE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^([a-zA-Z])\.\.([a-zA-Z])$").expect("static pattern"));

    if let Some(captures) = NUMERIC_RANGE.captures(content) {
        let start_text = &captures[1];
        let start: i64 = start_text.parse().ok()?;
        let end: i64 = captures[2].parse().ok()?;
        let padding = if start_text.starts_with('0') { start_text.len() } else { 0 };
        let range: Vec<i64> = if start <= end {
            (start..=end).collect()
        } else {
            (end..=start).rev().collect()
        };
        return Some(
            range
                .into_iter()
                .map(|n| {
                    if padding > 0 {
                        format!("{n:0padding$}")
                    } else {
                        n.to_string()
                    }
                })
                .collect(),
        );
    }

    if let Some(captures) = ALPHA_RANGE.captures(content) {
        let start = captures[1].chars().next()?;
        let end = captures[2].chars().next()?;
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let mut items: Vec<String> = (lo..=hi).map(String::from).collect();
        if start > end {
            items.reverse();
        }
        return Some(items);
    }

    if content.contains(',') {
        return Some(content.split(',').map(str::to_string).collect());
    }

    None
}

/// Pass 2 — split into delimiter-preserving tokens (space/tab/newline/`;`/
/// `|`/`&`), expand any token containing one or more flat brace groups as a
/// cartesian product, and rejoin with spaces for the items produced by a
/// single token.
fn expand_adjacent_braces(command: &str) -> String {
    static DELIMITER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"([ \t\n;|&])").expect("static pattern"));
    static FLAT_BRACE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?:^|[^$])\{[^{}]+\}").expect("static pattern"));

    const MAX_ITERATIONS: usize = 10;
    let mut command = command.to_string();

    for _ in 0..MAX_ITERATIONS {
        if !FLAT_BRACE.is_match(&command) {
            break;
        }

        let mut result = String::new();
        let mut last_end = 0;
        for m in DELIMITER.find_iter(&command) {
            let token = &command[last_end..m.start()];
            result.push_str(&expand_token(token));
            result.push_str(m.as_str());
            last_end = m.end();
        }
        result.push_str(&expand_token(&command[last_end..]));

        if result == command {
            break;
        }
        command = result;
    }

    command
}

fn expand_token(token: &str) -> String {
    static BRACE_GROUP: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$?\{([^{}]+)\}").expect("static pattern"));

    let matches: Vec<_> = BRACE_GROUP
        .captures_iter(token)
        .filter(|c| !c[0].starts_with('$'))
        .collect();

    if matches.is_empty() {
        return token.to_string();
    }

    let mut lists: Vec<Vec<String>> = Vec::new();
    for captures in &matches {
        let content = &captures[1];
        lists.push(brace_items(content).unwrap_or_else(|| vec![format!("{{{content}}}")]));
    }

    let mut combos: Vec<String> = vec![String::new()];
    let mut cursor = 0usize;
    for (captures, items) in matches.iter().zip(lists.iter()) {
        let whole = captures.get(0).expect("group 0 always matches");
        let literal_before = &token[cursor..whole.start()];
        let mut next = Vec::with_capacity(combos.len() * items.len());
        for combo in &combos {
            for item in items {
                next.push(format!("{combo}{literal_before}{item}"));
            }
        }
        combos = next;
        cursor = whole.end();
    }
    let trailing = &token[cursor..];
    combos.iter_mut().for_each(|combo| combo.push_str(trailing));
    combos.join(" ")
}

/// Blanks any `$VAR` / `${VAR}` reference still left textually intact after
/// [`preprocess_command_level`] — meaning `env` has no entry for it. Bash
/// itself would resolve an unset variable to the empty string, so a
/// PowerShell/`cmd.exe` backend (which never sees the shell's variable
/// table) needs this applied immediately before the emulator renders its
/// script. Git Bash backends must *not* run this: they resolve unset
/// variables themselves. See `SPEC_FULL.md` §9.2.
pub fn blank_unset_variables(command: &str, env: &HashMap<String, String>) -> String {
    static BRACED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("static pattern"));
    static PLAIN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$([A-Za-z_]\w*)").expect("static pattern"));

    let command = BRACED
        .replace_all(command, |captures: &Captures| {
            if env.contains_key(&captures[1]) {
                captures[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned();

    PLAIN
        .replace_all(&command, |captures: &Captures| {
            if env.contains_key(&captures[1]) {
                captures[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expands_ll_alias() {
        assert_eq!(preprocess_command_level("ll /tmp", &env(&[])), "ls -la /tmp");
    }

    #[test]
    fn does_not_expand_alias_as_substring() {
        assert_eq!(preprocess_command_level("llama", &env(&[])), "llama");
    }

    #[test]
    fn expands_leading_tilde_to_virtual_home() {
        assert_eq!(
            preprocess_command_level("cd ~/project", &env(&[])),
            "cd /home/claude/project"
        );
    }

    #[test]
    fn arithmetic_example_from_spec() {
        assert_eq!(preprocess_command_level("echo $((5+3))", &env(&[])), "echo 8");
    }

    #[test]
    fn strips_shortest_and_longest_suffix() {
        let e = env(&[("file", "a.tar.gz")]);
        assert_eq!(preprocess_command_level("echo ${file%.*}", &e), "echo a.tar");
        assert_eq!(preprocess_command_level("echo ${file%%.*}", &e), "echo a");
    }

    #[test]
    fn unset_variable_left_textually_intact() {
        assert_eq!(preprocess_command_level("echo $UNSET", &env(&[])), "echo $UNSET");
        assert_eq!(preprocess_command_level("echo ${UNSET}", &env(&[])), "echo ${UNSET}");
    }

    #[test]
    fn blank_unset_variables_clears_non_bash_backend_references() {
        assert_eq!(blank_unset_variables("echo $UNSET", &env(&[])), "echo ");
        assert_eq!(blank_unset_variables("echo ${UNSET}", &env(&[])), "echo ");
        assert_eq!(
            blank_unset_variables("echo $HOME", &env(&[("HOME", "/home/claude")])),
            "echo $HOME"
        );
    }

    #[test]
    fn brace_cartesian_product() {
        assert_eq!(preprocess_command_level("echo {a,b}{1,2}", &env(&[])), "echo a1 a2 b1 b2");
    }

    #[test]
    fn zero_padded_numeric_range() {
        assert_eq!(preprocess_command_level("echo {01..03}", &env(&[])), "echo 01 02 03");
    }

    #[test]
    fn nested_brace_prefix_form() {
        assert_eq!(
            preprocess_command_level("echo file{a,b{1,2}}.txt", &env(&[])),
            "echo filea.txt fileb1.txt fileb2.txt"
        );
    }

    #[test]
    fn variable_then_brace_range() {
        let e = env(&[("VAR", "x")]);
        assert_eq!(
            preprocess_command_level("echo $VAR{1..3}.txt", &e),
            "echo x1.txt x2.txt x3.txt"
        );
    }

    #[test]
    fn case_conversion_forms() {
        let e = env(&[("VAR", "hello")]);
        assert_eq!(preprocess_command_level("echo ${VAR^^}", &e), "echo HELLO");
        let e = env(&[("VAR", "HELLO")]);
        assert_eq!(preprocess_command_level("echo ${VAR,,}", &e), "echo hello");
    }

    #[test]
    fn default_value_form() {
        let e = env(&[("VAR", "")]);
        assert_eq!(preprocess_command_level("echo ${VAR:-fallback}", &e), "echo fallback");
    }

    #[test]
    fn length_form() {
        let e = env(&[("VAR", "hello")]);
        assert_eq!(preprocess_command_level("echo ${#VAR}", &e), "echo 5");
    }

    #[test]
    fn bracket_test_translation_for_emulation() {
        assert_eq!(preprocess_for_emulation("[ -f file.txt ]"), "test -f file.txt");
        assert_eq!(preprocess_for_emulation("[[ -d dir ]]"), "test -d dir");
    }
}
