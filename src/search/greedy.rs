//! One-ply greedy recommender.
//!
//! Applies every legal action, evaluates each successor from the requested
//! perspective and keeps the best. Candidates are scored in parallel; the
//! result is collected in generator order, and only a strictly greater score
//! replaces the current best, so ties go to the earliest action (`Pass`).

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::board::{Action, GameState, Side};
use crate::encoding::EncodingSchema;
use crate::eval::{Evaluate, Evaluation};
use crate::movegen::generate;
use crate::opening_book::{lookup, BookConfig, BookHandle, FactionFilter};

use super::{ApplyAction, Recommend, RecommendError, Recommendation, Source};

/// When and how to consult the opening book before searching.
#[derive(Debug, Clone)]
pub struct BookPolicy {
    pub book: Arc<BookHandle>,
    pub filter: FactionFilter,
    pub schema: EncodingSchema,
    pub config: BookConfig,
    /// Minimum lookup confidence for playing a book move.
    pub threshold: f64,
}

/// Greedy recommender over an evaluator and a rules engine.
pub struct GreedyRecommender<E, A> {
    evaluator: E,
    rules: A,
    book: Option<BookPolicy>,
    parallel: bool,
}

impl<E: Evaluate, A: ApplyAction> GreedyRecommender<E, A> {
    pub fn new(evaluator: E, rules: A) -> Self {
        GreedyRecommender {
            evaluator,
            rules,
            book: None,
            parallel: true,
        }
    }

    pub fn with_book(mut self, policy: BookPolicy) -> Self {
        self.book = Some(policy);
        self
    }

    /// Scores candidates on the calling thread instead of the rayon pool.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    fn score(
        &self,
        state: &GameState,
        action: Action,
        perspective: Side,
    ) -> Result<Evaluation, RecommendError> {
        let next = self
            .rules
            .apply(state, &action)
            .map_err(|source| RecommendError::Apply { action, source })?;
        Ok(self.evaluator.evaluate(&next, perspective)?)
    }

    /// Returns a book follow-up if the lookup is confident enough and the
    /// follow-up is legal here. A state the schema cannot encode has no book
    /// move.
    fn book_move(
        &self,
        state: &GameState,
        legal: &[Action],
        perspective: Side,
    ) -> Result<Option<Recommendation>, RecommendError> {
        let Some(policy) = &self.book else {
            return Ok(None);
        };
        let table = policy.book.snapshot();
        let result = match lookup(&table, state, &policy.filter, &policy.schema, &policy.config) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "state outside book schema, skipping book");
                return Ok(None);
            }
        };
        if !result.is_hit() || result.confidence < policy.threshold {
            return Ok(None);
        }
        let Some(action) = result.follow_ups.iter().find(|a| legal.contains(a)).copied() else {
            return Ok(None);
        };
        let evaluation = self.score(state, action, perspective)?;
        debug!(
            hash = %result.hash,
            confidence = result.confidence,
            ?action,
            "book recommendation"
        );
        Ok(Some(Recommendation {
            action,
            evaluation,
            source: Source::Book,
            candidates: legal.len(),
        }))
    }
}

impl<E: Evaluate, A: ApplyAction> Recommend for GreedyRecommender<E, A> {
    fn recommend(&self, state: &GameState, perspective: Side) -> Result<Recommendation, RecommendError> {
        let candidates = generate(state);
        if let Some(rec) = self.book_move(state, &candidates, perspective)? {
            return Ok(rec);
        }

        let scored: Vec<Result<Evaluation, RecommendError>> = if self.parallel {
            candidates
                .par_iter()
                .map(|a| self.score(state, *a, perspective))
                .collect()
        } else {
            candidates
                .iter()
                .map(|a| self.score(state, *a, perspective))
                .collect()
        };

        let mut best: Option<(Action, Evaluation)> = None;
        for (action, result) in candidates.iter().zip(scored) {
            let evaluation = result?;
            trace!(?action, score = evaluation.score, "candidate");
            let better = match &best {
                None => true,
                Some((_, b)) => evaluation.score > b.score,
            };
            if better {
                best = Some((*action, evaluation));
            }
        }

        // `generate` always yields at least `Pass`.
        let (action, evaluation) = best.ok_or_else(|| RecommendError::Apply {
            action: Action::Pass,
            source: "no candidate actions".into(),
        })?;
        debug!(
            candidates = candidates.len(),
            ?action,
            score = evaluation.score,
            "calculated recommendation"
        );
        Ok(Recommendation {
            action,
            evaluation,
            source: Source::Calculated,
            candidates: candidates.len(),
        })
    }
}
