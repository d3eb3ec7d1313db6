pub mod ranker;

use crate::workflow::types::Language;

/// A stored code example with descriptive metadata, ranked lexically against
/// incoming prompts. The corpus is compiled in and never mutated at runtime.
#[derive(Debug, Clone)]
pub struct KnowledgePattern {
    pub name: &'static str,
    pub code: &'static str,
    pub description: &'static str,
    pub use_case: &'static str,
    pub tags: &'static [&'static str],
    pub languages: &'static [Language],
}

/// A pattern that survived ranking, with its relevance score.
#[derive(Debug, Clone)]
pub struct RankedPattern {
    pub pattern: KnowledgePattern,
    pub score: u32,
}

/// Read-only pattern corpus plus retrieval settings.
pub struct KnowledgeBase {
    patterns: Vec<KnowledgePattern>,
    max_patterns: usize,
}

impl KnowledgeBase {
    pub fn new(max_patterns: usize) -> Self {
        Self {
            patterns: builtin_corpus(),
            max_patterns,
        }
    }

    /// Rank the corpus against a query and return the top matches.
    pub fn retrieve(&self, query: &str, language: Language) -> Vec<RankedPattern> {
        ranker::rank(&self.patterns, query, language, self.max_patterns)
    }

    /// Human-readable suggestions derived from retrieved patterns, surfaced
    /// in the final report's recommendation list.
    pub fn recommendations(&self, retrieved: &[RankedPattern]) -> Vec<String> {
        retrieved
            .iter()
            .map(|r| {
                format!(
                    "Consider the '{}' pattern: {}",
                    r.pattern.name, r.pattern.use_case
                )
            })
            .collect()
    }
}

fn builtin_corpus() -> Vec<KnowledgePattern> {
    vec![
        KnowledgePattern {
            name: "guarded input validation",
            code: "def validate(payload):\n    if not isinstance(payload, dict):\n        raise ValueError(\"payload must be a mapping\")\n    missing = [k for k in (\"name\", \"email\") if k not in payload]\n    if missing:\n        raise ValueError(f\"missing fields: {missing}\")\n    return payload\n",
            description: "Validate untrusted input at the boundary and fail with a descriptive error",
            use_case: "validate request payloads before any business logic runs",
            tags: &["validation", "input", "security", "guard"],
            languages: &[Language::Python],
        },
        KnowledgePattern {
            name: "sorted with key function",
            code: "def sort_records(records, field):\n    return sorted(records, key=lambda r: r[field])\n",
            description: "Sort a list ascending with sorted() and an explicit key function",
            use_case: "sort lists of records without mutating the input",
            tags: &["sort", "list", "ascending", "ordering"],
            languages: &[Language::Python],
        },
        KnowledgePattern {
            name: "fetch with retry",
            code: "async function fetchWithRetry(url, attempts = 3) {\n  for (let i = 0; i < attempts; i++) {\n    try {\n      const res = await fetch(url);\n      if (res.ok) return res.json();\n    } catch (err) {\n      if (i === attempts - 1) throw err;\n    }\n    await new Promise((r) => setTimeout(r, 2 ** i * 100));\n  }\n}\n",
            description: "Retry an async HTTP request with exponential backoff",
            use_case: "call flaky upstream services without failing on the first error",
            tags: &["http", "retry", "fetch", "backoff", "async"],
            languages: &[Language::JavaScript, Language::TypeScript],
        },
        KnowledgePattern {
            name: "memoized function",
            code: "function memoize(fn) {\n  const cache = new Map();\n  return (arg) => {\n    if (!cache.has(arg)) cache.set(arg, fn(arg));\n    return cache.get(arg);\n  };\n}\n",
            description: "Cache pure function results keyed by argument",
            use_case: "avoid recomputing expensive pure functions",
            tags: &["cache", "memoize", "performance"],
            languages: &[Language::JavaScript, Language::TypeScript],
        },
        KnowledgePattern {
            name: "binary search",
            code: "def binary_search(items, target):\n    lo, hi = 0, len(items)\n    while lo < hi:\n        mid = (lo + hi) // 2\n        if items[mid] < target:\n            lo = mid + 1\n        else:\n            hi = mid\n    return lo if lo < len(items) and items[lo] == target else -1\n",
            description: "Binary search over a sorted list, returning the index or -1",
            use_case: "search large sorted collections in logarithmic time",
            tags: &["search", "binary", "sorted", "algorithm"],
            languages: &[Language::Python],
        },
        KnowledgePattern {
            name: "result-returning parser",
            code: "fn parse_port(raw: &str) -> Result<u16, String> {\n    raw.trim()\n        .parse::<u16>()\n        .map_err(|e| format!(\"invalid port {raw:?}: {e}\"))\n}\n",
            description: "Parse with an explicit Result instead of panicking",
            use_case: "turn stringly-typed config into typed values with recoverable errors",
            tags: &["parse", "result", "error", "config"],
            languages: &[Language::Rust],
        },
        KnowledgePattern {
            name: "typed error enum",
            code: "#[derive(Debug, thiserror::Error)]\nenum StoreError {\n    #[error(\"not found: {0}\")]\n    NotFound(String),\n    #[error(\"io: {0}\")]\n    Io(#[from] std::io::Error),\n}\n",
            description: "Model failure modes as a closed error enum with Display derived",
            use_case: "give callers a matchable error type instead of strings",
            tags: &["error", "enum", "thiserror"],
            languages: &[Language::Rust],
        },
        KnowledgePattern {
            name: "context manager for resources",
            code: "from contextlib import contextmanager\n\n@contextmanager\ndef open_session(pool):\n    session = pool.acquire()\n    try:\n        yield session\n    finally:\n        pool.release(session)\n",
            description: "Scope resource acquisition and release with a context manager",
            use_case: "guarantee cleanup of pooled resources on every code path",
            tags: &["resource", "cleanup", "context"],
            languages: &[Language::Python],
        },
        KnowledgePattern {
            name: "debounced handler",
            code: "function debounce(fn, waitMs) {\n  let timer;\n  return (...args) => {\n    clearTimeout(timer);\n    timer = setTimeout(() => fn(...args), waitMs);\n  };\n}\n",
            description: "Collapse bursts of calls into one trailing invocation",
            use_case: "rate-limit handlers for chatty event sources",
            tags: &["debounce", "events", "timer", "performance"],
            languages: &[Language::JavaScript, Language::TypeScript],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_entries_are_complete() {
        for pattern in builtin_corpus() {
            assert!(!pattern.code.is_empty(), "{}: empty code", pattern.name);
            assert!(!pattern.tags.is_empty(), "{}: no tags", pattern.name);
            assert!(
                !pattern.languages.is_empty(),
                "{}: no languages",
                pattern.name
            );
        }
    }

    #[test]
    fn recommendations_name_the_pattern() {
        let base = KnowledgeBase::new(3);
        let retrieved = base.retrieve("sort a list ascending", Language::Python);
        assert!(!retrieved.is_empty());

        let recs = base.recommendations(&retrieved);
        assert_eq!(recs.len(), retrieved.len());
        assert!(recs[0].contains(retrieved[0].pattern.name));
    }
}
