//! Positional posting construction and token merge (§4.7.1, §4.7.2). Translated directly from
//! `buildIndexTokens`/`mergeTokenLocs` in the original `indexer/doc_indexer.go`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Gap (in synthetic positions) left between the end of one field's postings and the start of
/// the next, so that phrase queries never span a field boundary (§4.7).
pub const FIELD_GAP: usize = 10;

/// A `(text, locations)` posting contributed to the backend's inverted index. `text` is either
/// a bare token or a field-qualified token (`"f{field_idx}:{token}"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub text: String,
    pub locations: Vec<usize>,
}

/// Builds both the global and the field-qualified posting stream for one field's token list.
///
/// Given tokens `[t_0..t_n)` at base position `b`, produces `2n` entries: entry `i` is
/// `(t_i, [b+i])`, entry `n+i` is `(f{field_idx}:{t_i}, [b+n+i])`.
pub fn build_index_tokens(field_idx: usize, tokens: &[String], start_loc: usize) -> Vec<TokenData> {
    let n = tokens.len();
    let mut result = Vec::with_capacity(n * 2);

    for (i, token) in tokens.iter().enumerate() {
        result.push(TokenData {
            text: token.clone(),
            locations: vec![start_loc + i],
        });
    }
    for (i, token) in tokens.iter().enumerate() {
        result.push(TokenData {
            text: format!("f{field_idx}:{token}"),
            locations: vec![start_loc + n + i],
        });
    }
    result
}

/// Coalesces equal-text entries in place, preserving first-appearance order, concatenating
/// each duplicate occurrence's locations in first-appearance order. Returns the length of the
/// unique-by-text prefix; callers must truncate to that length.
pub fn merge_token_locs(tokens: &mut [TokenData]) -> usize {
    let mut pos: HashMap<String, usize> = HashMap::with_capacity(tokens.len());
    let mut count = 0;

    for i in 0..tokens.len() {
        let text = tokens[i].text.clone();
        match pos.get(&text) {
            None => {
                pos.insert(text, count);
                if count != i {
                    tokens.swap(count, i);
                }
                count += 1;
            }
            Some(&idx) => {
                let locs = std::mem::take(&mut tokens[i].locations);
                tokens[idx].locations.extend(locs);
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_global_and_field_qualified_streams() {
        let tokens = vec!["Hello".to_string(), "World".to_string()];
        let postings = build_index_tokens(1, &tokens, 0);
        assert_eq!(
            postings,
            vec![
                TokenData { text: "Hello".into(), locations: vec![0] },
                TokenData { text: "World".into(), locations: vec![1] },
                TokenData { text: "f1:Hello".into(), locations: vec![2] },
                TokenData { text: "f1:World".into(), locations: vec![3] },
            ]
        );
    }

    #[test]
    fn merge_coalesces_duplicates_and_preserves_location_count() {
        let mut tokens = vec![
            TokenData { text: "a".into(), locations: vec![0] },
            TokenData { text: "b".into(), locations: vec![1] },
            TokenData { text: "a".into(), locations: vec![2] },
        ];
        let total_locations: usize = tokens.iter().map(|t| t.locations.len()).sum();
        let count = merge_token_locs(&mut tokens);
        tokens.truncate(count);

        assert_eq!(count, 2);
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);

        let merged_total: usize = tokens.iter().map(|t| t.locations.len()).sum();
        assert_eq!(merged_total, total_locations);

        let a = tokens.iter().find(|t| t.text == "a").unwrap();
        assert_eq!(a.locations, vec![0, 2]);
    }

    #[test]
    fn field_isolation_gap() {
        let field_a = build_index_tokens(0, &["x".into(), "y".into()], 0);
        let base_b = field_a.len() + FIELD_GAP;
        let field_b = build_index_tokens(1, &["z".into()], base_b);

        let max_a = field_a.iter().flat_map(|t| t.locations.iter()).max().copied().unwrap();
        let min_b = field_b.iter().flat_map(|t| t.locations.iter()).min().copied().unwrap();
        assert!(min_b - max_a >= FIELD_GAP);
    }
}
