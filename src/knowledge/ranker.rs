use crate::knowledge::{KnowledgePattern, RankedPattern};
use crate::workflow::types::Language;

const LANGUAGE_BONUS: u32 = 10;
const TAG_WEIGHT: u32 = 5;
const DESCRIPTION_WEIGHT: u32 = 3;
const USE_CASE_WEIGHT: u32 = 2;
const CODE_WEIGHT: u32 = 1;

/// Minimum token length considered for matching.
const MIN_TOKEN_LEN: usize = 3;

/// Rank the corpus against a query and target language.
///
/// Heuristic lexical relevance, not embeddings: whitespace tokens shorter
/// than three characters are dropped, matching is case-insensitive, zero
/// scores are discarded, and the survivors are sorted descending with corpus
/// order preserved on ties before truncation to `k`.
pub fn rank(
    patterns: &[KnowledgePattern],
    query: &str,
    language: Language,
    k: usize,
) -> Vec<RankedPattern> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect();

    let mut ranked: Vec<RankedPattern> = patterns
        .iter()
        .filter_map(|pattern| {
            let score = score_pattern(pattern, &tokens, language);
            if score > 0 {
                Some(RankedPattern {
                    pattern: pattern.clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    // sort_by is stable, so corpus order breaks ties
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(k);
    ranked
}

fn score_pattern(pattern: &KnowledgePattern, tokens: &[String], language: Language) -> u32 {
    let mut score = 0;

    if pattern.languages.contains(&language) {
        score += LANGUAGE_BONUS;
    }

    let description = pattern.description.to_lowercase();
    let use_case = pattern.use_case.to_lowercase();
    let code = pattern.code.to_lowercase();
    let tags: Vec<String> = pattern.tags.iter().map(|t| t.to_lowercase()).collect();

    for token in tokens {
        if tags
            .iter()
            .any(|tag| tag.contains(token.as_str()) || token.contains(tag.as_str()))
        {
            score += TAG_WEIGHT;
        }
        if description.contains(token.as_str()) {
            score += DESCRIPTION_WEIGHT;
        }
        if use_case.contains(token.as_str()) {
            score += USE_CASE_WEIGHT;
        }
        if code.contains(token.as_str()) {
            score += CODE_WEIGHT;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(
        name: &'static str,
        description: &'static str,
        use_case: &'static str,
        tags: &'static [&'static str],
        languages: &'static [Language],
    ) -> KnowledgePattern {
        KnowledgePattern {
            name,
            code: "pass",
            description,
            use_case,
            tags,
            languages,
        }
    }

    fn corpus() -> Vec<KnowledgePattern> {
        vec![
            pattern(
                "sorting",
                "Sort a list ascending",
                "sort records",
                &["sort", "list"],
                &[Language::Python],
            ),
            pattern(
                "retry",
                "Retry an HTTP request",
                "call flaky services",
                &["http", "retry"],
                &[Language::JavaScript],
            ),
        ]
    }

    #[test]
    fn short_tokens_match_nothing() {
        // Every token is under three characters, so no pattern can score.
        let ranked = rank(&corpus(), "a to do it", Language::Python, 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn tag_plus_language_outranks_partial_matches() {
        // "sort" hits a tag and the description of the first pattern, and the
        // language bonus applies; "retry" matches nothing here.
        let ranked = rank(&corpus(), "sort numbers", Language::Python, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].pattern.name, "sorting");
        assert!(ranked[0].score >= LANGUAGE_BONUS + TAG_WEIGHT);
    }

    #[test]
    fn language_alone_scores_the_bonus() {
        let ranked = rank(&corpus(), "unrelated words", Language::JavaScript, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].pattern.name, "retry");
        assert_eq!(ranked[0].score, LANGUAGE_BONUS);
    }

    #[test]
    fn zero_scores_are_discarded() {
        let ranked = rank(&corpus(), "zzz qqq", Language::Rust, 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn ties_preserve_corpus_order() {
        let tied = vec![
            pattern("first", "alpha", "", &["alpha"], &[Language::Python]),
            pattern("second", "alpha", "", &["alpha"], &[Language::Python]),
        ];
        let ranked = rank(&tied, "alpha", Language::Python, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].pattern.name, "first");
        assert_eq!(ranked[1].pattern.name, "second");
    }

    #[test]
    fn results_truncate_to_k() {
        let tied = vec![
            pattern("first", "alpha", "", &["alpha"], &[Language::Python]),
            pattern("second", "alpha", "", &["alpha"], &[Language::Python]),
            pattern("third", "alpha", "", &["alpha"], &[Language::Python]),
        ];
        let ranked = rank(&tied, "alpha", Language::Python, 2);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn token_containing_a_tag_counts_as_a_tag_match() {
        // "sorting" contains the tag "sort".
        let ranked = rank(&corpus(), "sorting", Language::Rust, 10);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].score >= TAG_WEIGHT);
    }
}
