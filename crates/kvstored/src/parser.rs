//! Command line parser (§4.H) — a plain whitespace tokenizer. No
//! quoting is honored here; `SET key value with spaces` is recovered
//! by the SET handler re-joining tokens, not by this module.

pub const MAX_TOKENS: usize = 32;

/// Split a single already-`\r`/`\n`-stripped line into whitespace-
/// delimited tokens, capped at [`MAX_TOKENS`] (excess silently
/// truncated, per §4.H).
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ' ' || c == '\t')
        .filter(|tok| !tok.is_empty())
        .take(MAX_TOKENS)
        .collect()
}

/// Strip a trailing `\r` left by a `\r\n` line ending.
pub fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
