// Context assembly: ranked hits -> bounded prompt context
use serde::{Deserialize, Serialize};

use crate::types::SearchHit;

/// Appended whenever the joined blocks did not fit the budget
pub const TRUNCATION_MARKER: &str = "\n...";

/// Separator between hit blocks
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// How an over-budget context is cut down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationStrategy {
    /// Keep exactly the first `max_context_chars` characters
    #[default]
    Characters,
    /// Keep only blocks that fit whole, dropping the least relevant first
    WholeHits,
}

/// Context assembly configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Budget in Unicode scalar values, marker excluded
    pub max_context_chars: usize,
    pub strategy: TruncationStrategy,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 3000,
            strategy: TruncationStrategy::Characters,
        }
    }
}

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context text
    pub text: String,
    /// Number of hit blocks that made it in whole
    pub hits_included: usize,
    /// Whether the budget forced a cut
    pub truncated: bool,
}

/// Context builder for assembling RAG context
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

/// `"Title: <t>\nAbstract: <a>"`
pub fn format_hit(hit: &SearchHit) -> String {
    format!("Title: {}\nAbstract: {}", hit.title, hit.abstract_text)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build context from hits in ranking order
    pub fn build(&self, hits: &[SearchHit]) -> AssembledContext {
        let blocks: Vec<String> = hits.iter().map(format_hit).collect();
        let joined = blocks.join(BLOCK_SEPARATOR);
        let budget = self.config.max_context_chars;

        if char_len(&joined) <= budget {
            return AssembledContext {
                text: joined,
                hits_included: blocks.len(),
                truncated: false,
            };
        }

        match self.config.strategy {
            TruncationStrategy::Characters => truncate_chars(&joined, &blocks, budget),
            TruncationStrategy::WholeHits => {
                truncate_whole(&blocks, budget).unwrap_or_else(|| truncate_chars(&joined, &blocks, budget))
            }
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

fn truncate_chars(joined: &str, blocks: &[String], budget: usize) -> AssembledContext {
    let mut text: String = joined.chars().take(budget).collect();
    text.push_str(TRUNCATION_MARKER);

    // Blocks fully inside the kept prefix
    let mut used = 0;
    let mut hits_included = 0;
    for (i, block) in blocks.iter().enumerate() {
        let sep = if i == 0 { 0 } else { char_len(BLOCK_SEPARATOR) };
        used += sep + char_len(block);
        if used > budget {
            break;
        }
        hits_included += 1;
    }

    AssembledContext {
        text,
        hits_included,
        truncated: true,
    }
}

/// `None` when not even the first block fits
fn truncate_whole(blocks: &[String], budget: usize) -> Option<AssembledContext> {
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0;
    for block in blocks {
        let sep = if kept.is_empty() { 0 } else { char_len(BLOCK_SEPARATOR) };
        let next = used + sep + char_len(block);
        if next > budget {
            break;
        }
        used = next;
        kept.push(block);
    }

    if kept.is_empty() {
        return None;
    }

    let mut text = kept.join(BLOCK_SEPARATOR);
    text.push_str(TRUNCATION_MARKER);
    Some(AssembledContext {
        text,
        hits_included: kept.len(),
        truncated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn hit(title: &str, abstract_text: &str) -> SearchHit {
        SearchHit {
            score: 1.0,
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            url: String::new(),
        }
    }

    fn builder(max_context_chars: usize, strategy: TruncationStrategy) -> ContextBuilder {
        ContextBuilder::with_config(ContextConfig {
            max_context_chars,
            strategy,
        })
    }

    #[test]
    fn test_blocks_joined_in_order() {
        let hits = vec![hit("A", "first"), hit("B", "second")];
        let context = ContextBuilder::new().build(&hits);
        assert_eq!(
            context.text,
            "Title: A\nAbstract: first\n\nTitle: B\nAbstract: second"
        );
        assert_eq!(context.hits_included, 2);
        assert!(!context.truncated);
    }

    #[test]
    fn test_empty_hits_give_empty_context() {
        let context = ContextBuilder::new().build(&[]);
        assert_eq!(context.text, "");
        assert_eq!(context.hits_included, 0);
        assert!(!context.truncated);
    }

    #[test]
    fn test_exact_budget_is_not_truncated() {
        let hits = vec![hit("A", "x")];
        let len = format_hit(&hits[0]).chars().count();
        let context = builder(len, TruncationStrategy::Characters).build(&hits);
        assert!(!context.truncated);
        assert_eq!(context.text.chars().count(), len);
    }

    #[test]
    fn test_character_truncation() {
        let hits = vec![hit("A", &"a".repeat(50)), hit("B", &"b".repeat(50))];
        let context = builder(40, TruncationStrategy::Characters).build(&hits);
        assert!(context.truncated);
        assert_eq!(context.hits_included, 0);
        assert!(context.text.ends_with(TRUNCATION_MARKER));
        assert_eq!(context.text.chars().count(), 40 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_character_truncation_counts_scalars() {
        let hits = vec![hit("Ünïcödé", &"é".repeat(100))];
        let context = builder(10, TruncationStrategy::Characters).build(&hits);
        assert_eq!(context.text, format!("Title: Ünï{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_whole_hits_drops_tail_blocks() {
        let hits = vec![hit("A", "short"), hit("B", &"b".repeat(500))];
        let first = format_hit(&hits[0]);
        let context = builder(100, TruncationStrategy::WholeHits).build(&hits);
        assert!(context.truncated);
        assert_eq!(context.hits_included, 1);
        assert_eq!(context.text, format!("{}{}", first, TRUNCATION_MARKER));
    }

    #[test]
    fn test_whole_hits_falls_back_when_first_block_too_long() {
        let hits = vec![hit("A", &"a".repeat(500))];
        let context = builder(20, TruncationStrategy::WholeHits).build(&hits);
        assert!(context.truncated);
        assert_eq!(context.text.chars().count(), 20 + TRUNCATION_MARKER.len());
    }

    #[quickcheck]
    fn prop_character_truncation_is_prefix_plus_marker(
        texts: Vec<(String, String)>,
        budget: u16,
    ) -> bool {
        let hits: Vec<SearchHit> = texts.iter().map(|(t, a)| hit(t, a)).collect();
        let budget = budget as usize;
        let joined = hits.iter().map(format_hit).collect::<Vec<_>>().join(BLOCK_SEPARATOR);
        let context = builder(budget, TruncationStrategy::Characters).build(&hits);

        if joined.chars().count() > budget {
            let prefix: String = joined.chars().take(budget).collect();
            context.truncated
                && context.text == format!("{}{}", prefix, TRUNCATION_MARKER)
                && context.text.chars().count() == budget + TRUNCATION_MARKER.chars().count()
        } else {
            !context.truncated && context.text == joined
        }
    }

    #[quickcheck]
    fn prop_build_is_deterministic(texts: Vec<(String, String)>, budget: u16) -> bool {
        let hits: Vec<SearchHit> = texts.iter().map(|(t, a)| hit(t, a)).collect();
        let b = builder(budget as usize, TruncationStrategy::WholeHits);
        b.build(&hits) == b.build(&hits)
    }
}
