//! Pure, deterministic tokenizers. Each one turns a string into an ordered list of tokens;
//! output order always equals textual order (§4.1).

use serde::{Deserialize, Serialize};

/// Is `c` a Han ideograph? Range taken from the CJK Unified Ideographs block, the block the
/// ZH tokenizer's "one token per Han character" rule actually cares about (narrower than the
/// full CJK-script range a general segmenter would consider).
pub fn is_han(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4dbf}' |
        '\u{4e00}'..='\u{9fff}' |
        '\u{f900}'..='\u{faff}' |
        '\u{20000}'..='\u{2a6df}'
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tokenizer {
    #[default]
    Whitespace,
    None,
    Zh,
}

/// Split on runs of Unicode whitespace, discarding empty tokens.
pub fn whitespace_tokenize(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_owned).collect()
}

/// One token per Han ideograph, plus whitespace-split tokens for every maximal non-Han run,
/// emitted in left-to-right order.
pub fn hanzi_tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run = String::new();

    for c in s.chars() {
        if is_han(c) {
            if !run.is_empty() {
                tokens.extend(whitespace_tokenize(&run));
                run.clear();
            }
            tokens.push(c.to_string());
        } else {
            run.push(c);
        }
    }
    if !run.is_empty() {
        tokens.extend(whitespace_tokenize(&run));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_discards_empty() {
        assert_eq!(whitespace_tokenize("  Hello   World  "), vec!["Hello", "World"]);
    }

    #[test]
    fn zh_mixed_run() {
        assert_eq!(hanzi_tokenize("你好abc"), vec!["你", "好", "abc"]);
    }

    #[test]
    fn zh_pure_han() {
        assert_eq!(hanzi_tokenize("你好"), vec!["你", "好"]);
    }

    #[test]
    fn zh_leading_and_trailing_latin() {
        assert_eq!(hanzi_tokenize("foo你bar好baz"), vec!["foo", "你", "bar", "好", "baz"]);
    }
}
