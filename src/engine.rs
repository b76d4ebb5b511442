//! Engine facade.
//!
//! Holds the validated configuration, the evaluator, the shared opening
//! book and the injected rules engine, and answers evaluate and recommend
//! requests given as JSON text.

use std::path::Path;
use std::sync::Arc;

use crate::board::{GameState, Side};
use crate::config::{ConfigError, EngineConfig};
use crate::encoding::EncodeError;
use crate::eval::{EvalError, Evaluate, Evaluation, HeuristicEvaluator};
use crate::opening_book::{
    load_book, lookup, BookError, BookHandle, FactionFilter, LookupResult, OpeningBook,
};
use crate::protocol::{
    format_evaluation, format_recommendation, parse_request, parse_state, ProtocolError, Request,
};
use crate::search::{
    ApplyAction, BookPolicy, GreedyRecommender, Recommend, RecommendError, Recommendation,
};

/// Evaluation and recommendation service over one rules engine.
pub struct Engine<A> {
    config: EngineConfig,
    filter: FactionFilter,
    book: Arc<BookHandle>,
    recommender: GreedyRecommender<HeuristicEvaluator, A>,
}

impl<A: ApplyAction> Engine<A> {
    /// Creates an engine with an empty opening book.
    pub fn new(config: EngineConfig, rules: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let evaluator = HeuristicEvaluator::new(config.weights)?;
        let filter = match &config.recommend.faction {
            Some(name) => FactionFilter::Named(name.clone()),
            None => FactionFilter::Any,
        };
        let book = Arc::new(BookHandle::default());

        let mut recommender = GreedyRecommender::new(evaluator, rules);
        if let Some(threshold) = config.recommend.book_threshold {
            recommender = recommender.with_book(BookPolicy {
                book: Arc::clone(&book),
                filter: filter.clone(),
                schema: config.schema,
                config: config.book.clone(),
                threshold,
            });
        }
        if !config.recommend.parallel {
            recommender = recommender.sequential();
        }

        Ok(Engine {
            config,
            filter,
            book,
            recommender,
        })
    }

    /// Creates an engine and installs a book.
    pub fn with_book(config: EngineConfig, rules: A, book: OpeningBook) -> Result<Self, ConfigError> {
        let engine = Self::new(config, rules)?;
        engine.replace_book(book)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn book(&self) -> &Arc<BookHandle> {
        &self.book
    }

    /// Swaps in a new book. A configured faction must appear in it.
    pub fn replace_book(&self, book: OpeningBook) -> Result<(), ConfigError> {
        if let FactionFilter::Named(name) = &self.filter {
            book.faction_filter(name)
                .map_err(|_| ConfigError::UnknownFaction(name.clone()))?;
        }
        self.book.replace(book);
        Ok(())
    }

    /// Loads a book file and swaps it in.
    pub fn load_book(&self, path: &Path) -> Result<(), BookError> {
        let book = load_book(path)?;
        if let FactionFilter::Named(name) = &self.filter {
            book.faction_filter(name)?;
        }
        self.book.replace(book);
        Ok(())
    }

    pub fn evaluate(&self, state: &GameState, side: Side) -> Result<Evaluation, EvalError> {
        self.recommender.evaluator().evaluate(state, side)
    }

    pub fn recommend(&self, state: &GameState, side: Side) -> Result<Recommendation, RecommendError> {
        self.recommender.recommend(state, side)
    }

    /// Queries the current book with the configured schema and faction.
    pub fn lookup(&self, state: &GameState) -> Result<LookupResult, EncodeError> {
        lookup(
            &self.book.snapshot(),
            state,
            &self.filter,
            &self.config.schema,
            &self.config.book,
        )
    }

    /// Evaluates a JSON state and returns the evaluation as JSON.
    pub fn handle_evaluate(&self, json_state: &str, side: Side) -> Result<String, ProtocolError> {
        let state = parse_state(json_state)?;
        format_evaluation(&self.evaluate(&state, side)?)
    }

    /// Recommends an action for a JSON state and returns it as JSON.
    pub fn handle_recommend(&self, json_state: &str, side: Side) -> Result<String, ProtocolError> {
        let state = parse_state(json_state)?;
        format_recommendation(&self.recommend(&state, side)?)
    }

    /// Dispatches one JSON request line.
    pub fn handle_request(&self, line: &str) -> Result<String, ProtocolError> {
        match parse_request(line)? {
            Request::Evaluate { state, side } => format_evaluation(&self.evaluate(&state, side)?),
            Request::Recommend { state, side } => {
                format_recommendation(&self.recommend(&state, side)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Action;
    use crate::encoding::position_hash;
    use crate::opening_book::{FactionTag, FollowUp, OpeningEntry};
    use crate::search::{ApplyError, Source};

    fn identity(s: &GameState, _: &Action) -> Result<GameState, ApplyError> {
        Ok(s.clone())
    }

    const STATE: &str = r#"{"turn": 3, "phase": "movement", "active_side": "one",
        "board": {"width": 6, "height": 6},
        "sides": [
            {"units": [{"id": 1, "side": "one", "position": {"x": 0, "y": 0},
                        "health": 8, "max_health": 8, "points": 100, "move_range": 1}]},
            {"units": [{"id": 2, "side": "two", "position": {"x": 5, "y": 5},
                        "health": 4, "max_health": 8, "points": 100}]}
        ]}"#;

    fn book_for(state: &GameState, faction: Option<&str>) -> OpeningBook {
        let hash = position_hash(state, &EngineConfig::default().schema).unwrap();
        OpeningBook::from_entries(vec![OpeningEntry {
            hash,
            faction: faction.map(str::to_string).into(),
            match_count: 800,
            win_rate: 0.5,
            avg_turns: 5.0,
            follow_ups: vec![FollowUp {
                action: Action::Move {
                    unit: crate::board::UnitId(1),
                    to: crate::board::Position::new(1, 1),
                },
                frequency: 5,
            }],
        }])
        .unwrap()
    }

    #[test]
    fn handle_evaluate_returns_json() {
        let engine = Engine::new(EngineConfig::default(), identity).unwrap();
        let out = engine.handle_evaluate(STATE, Side::One).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(v["score"].as_f64().unwrap() > 0.5);
        assert_eq!(v["perspective"], "one");
        assert_eq!(v["factors"].as_array().unwrap().len(), 4);
        assert!(v.get("elapsed_us").is_some());
    }

    #[test]
    fn handle_recommend_returns_json() {
        let engine = Engine::new(EngineConfig::default(), identity).unwrap();
        let out = engine.handle_recommend(STATE, Side::One).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        // Identity rules score every successor equally.
        assert_eq!(v["action"]["type"], "pass");
        assert_eq!(v["source"], "calculated");
        assert_eq!(v["candidates"], 4);
    }

    #[test]
    fn malformed_input_maps_to_protocol_error() {
        let engine = Engine::new(EngineConfig::default(), identity).unwrap();
        assert!(matches!(
            engine.handle_evaluate("not json", Side::One),
            Err(ProtocolError::Json(_))
        ));
        let over = STATE.replace(r#""health": 4"#, r#""health": 9"#);
        assert!(matches!(
            engine.handle_recommend(&over, Side::One),
            Err(ProtocolError::State(_))
        ));
    }

    #[test]
    fn schema_caps_only_bind_encoding() {
        // Turn 25 exceeds the default schema; heuristic evaluation does not
        // encode, so it still succeeds.
        let late = STATE.replace(r#""turn": 3"#, r#""turn": 25"#);
        let engine = Engine::new(EngineConfig::default(), identity).unwrap();
        assert!(engine.handle_evaluate(&late, Side::One).is_ok());
        assert!(engine.lookup(&parse_state(&late).unwrap()).is_err());
    }

    #[test]
    fn book_move_used_when_threshold_met() {
        let mut config = EngineConfig::default();
        config.recommend.book_threshold = Some(0.5);
        let state = parse_state(STATE).unwrap();
        let engine = Engine::with_book(config, identity, book_for(&state, None)).unwrap();
        let rec = engine.recommend(&state, Side::One).unwrap();
        assert_eq!(rec.source, Source::Book);
        assert!(engine.lookup(&state).unwrap().is_hit());
    }

    #[test]
    fn book_policy_tolerates_unencodable_state() {
        let mut config = EngineConfig::default();
        config.recommend.book_threshold = Some(0.5);
        let state = parse_state(STATE).unwrap();
        let engine = Engine::with_book(config, identity, book_for(&state, None)).unwrap();
        let late = STATE.replace(r#""turn": 3"#, r#""turn": 21"#);
        let v: serde_json::Value =
            serde_json::from_str(&engine.handle_recommend(&late, Side::One).unwrap()).unwrap();
        assert_eq!(v["source"], "calculated");
        assert_eq!(v["action"]["type"], "pass");
    }

    #[test]
    fn configured_faction_must_exist_in_book() {
        let mut config = EngineConfig::default();
        config.recommend.faction = Some("Orks".into());
        let state = parse_state(STATE).unwrap();
        assert!(matches!(
            Engine::with_book(config.clone(), identity, book_for(&state, Some("Eldar"))),
            Err(ConfigError::UnknownFaction(f)) if f == "Orks"
        ));
        let engine = Engine::with_book(config, identity, book_for(&state, Some("Orks"))).unwrap();
        let hit = engine.lookup(&state).unwrap();
        assert_eq!(
            hit.entry.unwrap().faction,
            FactionTag::Named("Orks".into())
        );
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.weights.tempo = 0.5;
        assert!(matches!(
            Engine::new(config, identity),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn request_dispatch() {
        let engine = Engine::new(EngineConfig::default(), identity).unwrap();
        let line = format!(r#"{{"command": "evaluate", "side": "two", "state": {STATE}}}"#);
        let v: serde_json::Value = serde_json::from_str(&engine.handle_request(&line).unwrap()).unwrap();
        assert_eq!(v["perspective"], "two");
        assert!(v["score"].as_f64().unwrap() < 0.5);
    }
}
