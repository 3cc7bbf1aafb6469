//! Name matching strategies.
//!
//! Human-typed identifiers resolve against live object names in three
//! tiers: exact match, case-folded match, then a scored fuzzy match
//! with a configurable minimum score. The scoring algorithm is a
//! swappable strategy so games can substitute their own notion of
//! similarity.
//!
//! A below-cutoff query and an equal-best tie are distinct,
//! recoverable errors; the matcher never guesses.

use super::error::ConvertError;

/// Ties closer than this are ambiguous.
const SCORE_EPSILON: f64 = 1e-9;

/// A similarity score in `[0, 1]` between a query and a candidate.
pub trait MatchStrategy {
    /// Score a candidate against the query; 1.0 is a perfect match.
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Jaro-Winkler similarity, case-folded.
#[derive(Clone, Copy, Debug, Default)]
pub struct JaroWinkler;

impl MatchStrategy for JaroWinkler {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        strsim::jaro_winkler(&query.to_lowercase(), &candidate.to_lowercase())
    }
}

/// Resolves a query string to one candidate.
pub struct NameMatcher {
    cutoff: f64,
    strategy: Box<dyn MatchStrategy>,
}

impl NameMatcher {
    /// Create a matcher with the default Jaro-Winkler strategy.
    #[must_use]
    pub fn new(cutoff: f64) -> Self {
        Self {
            cutoff,
            strategy: Box::new(JaroWinkler),
        }
    }

    /// Substitute the scoring strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Box<dyn MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Minimum accepted fuzzy score.
    #[must_use]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Resolve `query` against `(name, value)` candidates.
    ///
    /// `domain` labels the candidate set in error messages
    /// ("actor", "ability of Alice").
    pub fn best<T: Copy>(
        &self,
        query: &str,
        domain: &str,
        candidates: &[(String, T)],
    ) -> Result<T, ConvertError> {
        // Tier 1: exact.
        if let Some(value) = self.unique_by(query, domain, candidates, |name| name == query)? {
            return Ok(value);
        }

        // Tier 2: case-folded exact.
        let folded = query.to_lowercase();
        if let Some(value) =
            self.unique_by(query, domain, candidates, |name| name.to_lowercase() == folded)?
        {
            return Ok(value);
        }

        // Tier 3: scored.
        let mut best: Option<(f64, &str, T)> = None;
        let mut runner_up: Option<(f64, &str)> = None;
        for (name, value) in candidates {
            let score = self.strategy.score(query, name);
            tracing::trace!(query, candidate = name.as_str(), score, "fuzzy score");
            match &best {
                Some((top, _, _)) if score <= *top => {
                    if runner_up.map_or(true, |(second, _)| score > second) {
                        runner_up = Some((score, name.as_str()));
                    }
                }
                _ => {
                    if let Some((top, top_name, _)) = best {
                        runner_up = Some((top, top_name));
                    }
                    best = Some((score, name.as_str(), *value));
                }
            }
        }

        let Some((top, top_name, value)) = best else {
            return Err(ConvertError::NotFound {
                query: query.to_string(),
                domain: domain.to_string(),
            });
        };
        if top < self.cutoff {
            return Err(ConvertError::NotFound {
                query: query.to_string(),
                domain: domain.to_string(),
            });
        }
        if let Some((second, second_name)) = runner_up {
            if (top - second).abs() < SCORE_EPSILON {
                return Err(ConvertError::Ambiguous {
                    query: query.to_string(),
                    first: top_name.to_string(),
                    second: second_name.to_string(),
                });
            }
        }
        Ok(value)
    }

    /// One candidate matching a predicate, an ambiguity error for
    /// several, `None` for none.
    fn unique_by<T: Copy>(
        &self,
        query: &str,
        _domain: &str,
        candidates: &[(String, T)],
        matches: impl Fn(&str) -> bool,
    ) -> Result<Option<T>, ConvertError> {
        let mut hits = candidates.iter().filter(|(name, _)| matches(name));
        let Some((first_name, value)) = hits.next() else {
            return Ok(None);
        };
        if let Some((second_name, _)) = hits.next() {
            return Err(ConvertError::Ambiguous {
                query: query.to_string(),
                first: first_name.clone(),
                second: second_name.clone(),
            });
        }
        Ok(Some(*value))
    }
}

impl std::fmt::Debug for NameMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameMatcher")
            .field("cutoff", &self.cutoff)
            .finish()
    }
}
