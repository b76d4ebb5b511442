//! Opening book.
//!
//! Loads pre-computed opening statistics from a JSON file and looks up the
//! entry for a game state by its position hash. A hit reports the recorded
//! follow-up actions, most frequent first, with a confidence that grows with
//! the number of games behind the entry.
//!
//! Tables are immutable once loaded. [`BookHandle`] shares one table across
//! threads and swaps in a reloaded table atomically.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Action, GameState};
use crate::config::ConfigError;
use crate::encoding::{position_hash, EncodeError, EncodingSchema, PositionHash};

/// Errors loading or querying a book.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse opening book JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid book record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("faction '{0}' does not appear in the opening book")]
    UnknownFaction(String),
}

/// Confidence curve parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Confidence reported for an entry at or above `saturation_count`.
    pub confidence_ceiling: f64,
    /// Match count at which confidence stops growing.
    pub saturation_count: u32,
}

impl Default for BookConfig {
    fn default() -> Self {
        BookConfig {
            confidence_ceiling: 0.95,
            saturation_count: 500,
        }
    }
}

impl BookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = self.confidence_ceiling;
        if !(c > 0.0 && c <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "confidence_ceiling",
                value: c,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.saturation_count == 0 {
            return Err(ConfigError::OutOfRange {
                field: "saturation_count",
                value: 0.0,
                min: 1.0,
                max: u32::MAX as f64,
            });
        }
        Ok(())
    }

    /// `ceiling * min(1, ln(1 + n) / ln(1 + saturation))`.
    pub fn confidence(&self, match_count: u32) -> f64 {
        let growth = (1.0 + match_count as f64).ln() / (1.0 + self.saturation_count as f64).ln();
        self.confidence_ceiling * growth.min(1.0)
    }
}

/// Which faction an entry was recorded for. `null` in JSON is `Any`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum FactionTag {
    #[default]
    Any,
    Named(String),
}

impl From<Option<String>> for FactionTag {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(name) => FactionTag::Named(name),
            None => FactionTag::Any,
        }
    }
}

impl From<FactionTag> for Option<String> {
    fn from(t: FactionTag) -> Self {
        match t {
            FactionTag::Any => None,
            FactionTag::Named(name) => Some(name),
        }
    }
}

/// Restricts lookups to entries usable by one faction. Built with
/// [`OpeningBook::faction_filter`], which checks the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FactionFilter {
    /// Every entry is eligible.
    Any,
    /// Entries tagged with this faction, or with no faction.
    Named(String),
}

impl FactionFilter {
    fn admits(&self, tag: &FactionTag) -> bool {
        match (self, tag) {
            (FactionFilter::Any, _) | (_, FactionTag::Any) => true,
            (FactionFilter::Named(want), FactionTag::Named(have)) => want == have,
        }
    }
}

/// A recorded follow-up and how often it was played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub action: Action,
    pub frequency: u32,
}

/// One aggregated book record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningEntry {
    pub hash: PositionHash,
    #[serde(default)]
    pub faction: FactionTag,
    pub match_count: u32,
    pub win_rate: f64,
    pub avg_turns: f64,
    /// Most frequent first; equal frequencies keep file order.
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
}

impl OpeningEntry {
    fn validate(&mut self, index: usize) -> Result<(), BookError> {
        let invalid = |reason: String| BookError::InvalidRecord { index, reason };
        if !self.win_rate.is_finite() || !(0.0..=1.0).contains(&self.win_rate) {
            return Err(invalid(format!("win_rate {} outside [0, 1]", self.win_rate)));
        }
        if !self.avg_turns.is_finite() || self.avg_turns < 0.0 {
            return Err(invalid(format!("avg_turns {} must be finite and >= 0", self.avg_turns)));
        }
        if let FactionTag::Named(name) = &self.faction {
            if name.is_empty() {
                return Err(invalid("empty faction name".to_string()));
            }
        }
        self.follow_ups.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        Ok(())
    }
}

#[derive(Deserialize)]
struct BookFile {
    entries: Vec<OpeningEntry>,
}

/// Aggregate outcome figures for a faction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookStats {
    pub entries: usize,
    pub total_matches: u64,
    /// Match-weighted; 0.0 when no matches are recorded.
    pub win_rate: f64,
    /// Match-weighted; 0.0 when no matches are recorded.
    pub avg_turns: f64,
}

/// An immutable opening table indexed by position hash.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: Vec<OpeningEntry>,
    by_hash: HashMap<PositionHash, Vec<usize>>,
    factions: BTreeSet<String>,
}

impl OpeningBook {
    /// Builds a table from entries, validating each.
    pub fn from_entries(mut entries: Vec<OpeningEntry>) -> Result<Self, BookError> {
        let mut by_hash: HashMap<PositionHash, Vec<usize>> = HashMap::new();
        let mut factions = BTreeSet::new();
        for (i, e) in entries.iter_mut().enumerate() {
            e.validate(i)?;
            by_hash.entry(e.hash).or_default().push(i);
            if let FactionTag::Named(name) = &e.faction {
                factions.insert(name.clone());
            }
        }
        Ok(OpeningBook {
            entries,
            by_hash,
            factions,
        })
    }

    pub fn entries(&self) -> &[OpeningEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Named factions present in the table, sorted.
    pub fn factions(&self) -> impl Iterator<Item = &str> {
        self.factions.iter().map(String::as_str)
    }

    /// Resolves a faction name to a filter, rejecting names the table has
    /// never seen.
    pub fn faction_filter(&self, name: &str) -> Result<FactionFilter, BookError> {
        if self.factions.contains(name) {
            Ok(FactionFilter::Named(name.to_string()))
        } else {
            Err(BookError::UnknownFaction(name.to_string()))
        }
    }

    /// Picks the best eligible entry for a hash: most matches, then a named
    /// faction over an untagged one, then file order.
    pub fn best_entry(&self, hash: PositionHash, filter: &FactionFilter) -> Option<&OpeningEntry> {
        let mut best: Option<&OpeningEntry> = None;
        for &i in self.by_hash.get(&hash)? {
            let e = &self.entries[i];
            if !filter.admits(&e.faction) {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let named = |x: &OpeningEntry| matches!(x.faction, FactionTag::Named(_));
                    (e.match_count, named(e)) > (b.match_count, named(b))
                }
            };
            if better {
                best = Some(e);
            }
        }
        best
    }

    /// Looks up an already computed hash.
    pub fn lookup_hash(
        &self,
        hash: PositionHash,
        filter: &FactionFilter,
        config: &BookConfig,
    ) -> LookupResult {
        match self.best_entry(hash, filter) {
            Some(e) => LookupResult {
                hash,
                confidence: config.confidence(e.match_count),
                follow_ups: e.follow_ups.iter().map(|f| f.action).collect(),
                entry: Some(e.clone()),
            },
            None => LookupResult::miss(hash),
        }
    }

    /// Totals over the entries a filter admits.
    pub fn stats(&self, filter: &FactionFilter) -> BookStats {
        let mut stats = BookStats {
            entries: 0,
            total_matches: 0,
            win_rate: 0.0,
            avg_turns: 0.0,
        };
        let mut wins = 0.0;
        let mut turns = 0.0;
        for e in self.entries.iter().filter(|e| filter.admits(&e.faction)) {
            stats.entries += 1;
            stats.total_matches += e.match_count as u64;
            wins += e.win_rate * e.match_count as f64;
            turns += e.avg_turns * e.match_count as f64;
        }
        if stats.total_matches > 0 {
            stats.win_rate = wins / stats.total_matches as f64;
            stats.avg_turns = turns / stats.total_matches as f64;
        }
        stats
    }
}

/// Outcome of a book query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub hash: PositionHash,
    pub entry: Option<OpeningEntry>,
    /// 0.0 on a miss.
    pub confidence: f64,
    /// Most frequent first.
    pub follow_ups: Vec<Action>,
}

impl LookupResult {
    pub fn miss(hash: PositionHash) -> Self {
        LookupResult {
            hash,
            entry: None,
            confidence: 0.0,
            follow_ups: Vec::new(),
        }
    }

    pub fn is_hit(&self) -> bool {
        self.entry.is_some()
    }

    /// Draws a follow-up with probability proportional to its frequency.
    /// Falls back to the most frequent when every frequency is zero.
    pub fn sample(&self, rng: &mut impl Rng) -> Option<Action> {
        let entry = self.entry.as_ref()?;
        let total: u64 = entry.follow_ups.iter().map(|f| f.frequency as u64).sum();
        if total == 0 {
            return entry.follow_ups.first().map(|f| f.action);
        }
        let mut r = rng.gen_range(0..total);
        for f in &entry.follow_ups {
            let w = f.frequency as u64;
            if r < w {
                return Some(f.action);
            }
            r -= w;
        }
        entry.follow_ups.last().map(|f| f.action)
    }
}

/// Hashes the state and queries the book. Only hashing can fail; a missing
/// position is a miss.
pub fn lookup(
    book: &OpeningBook,
    state: &GameState,
    filter: &FactionFilter,
    schema: &EncodingSchema,
    config: &BookConfig,
) -> Result<LookupResult, EncodeError> {
    let hash = position_hash(state, schema)?;
    Ok(book.lookup_hash(hash, filter, config))
}

/// Loads an opening book from a JSON file at the given path.
pub fn load_book(path: &Path) -> Result<OpeningBook, BookError> {
    let data = fs::read_to_string(path).map_err(|source| BookError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_book_from_str(&data)
}

/// Loads an opening book from a JSON string.
pub fn load_book_from_str(json: &str) -> Result<OpeningBook, BookError> {
    let file: BookFile = serde_json::from_str(json)?;
    let book = OpeningBook::from_entries(file.entries)?;
    debug!(entries = book.len(), factions = book.factions.len(), "opening book loaded");
    Ok(book)
}

/// Shared, swappable reference to the current book.
#[derive(Debug, Default)]
pub struct BookHandle {
    current: RwLock<Arc<OpeningBook>>,
}

impl BookHandle {
    pub fn new(book: OpeningBook) -> Self {
        BookHandle {
            current: RwLock::new(Arc::new(book)),
        }
    }

    /// The table as of now. Later replacements do not affect it.
    pub fn snapshot(&self) -> Arc<OpeningBook> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swaps in a new table and returns the previous one.
    pub fn replace(&self, book: OpeningBook) -> Arc<OpeningBook> {
        let next = Arc::new(book);
        debug!(entries = next.len(), "opening book replaced");
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    /// Loads a file and swaps it in. The current table is kept on error.
    pub fn reload(&self, path: &Path) -> Result<(), BookError> {
        let book = load_book(path)?;
        self.replace(book);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardSize, Position, Side, Unit, UnitId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const H1: &str = "00000000000000a1";
    const H2: &str = "00000000000000b2";

    fn book_json() -> String {
        format!(
            r#"{{"entries": [
                {{"hash": "{H1}", "faction": null, "match_count": 40, "win_rate": 0.5,
                  "avg_turns": 5.0, "follow_ups": [
                    {{"action": {{"type": "pass"}}, "frequency": 3}},
                    {{"action": {{"type": "shoot", "unit": 1, "target": 2}}, "frequency": 9}}
                  ]}},
                {{"hash": "{H1}", "faction": "Orks", "match_count": 40, "win_rate": 0.7,
                  "avg_turns": 4.0, "follow_ups": []}},
                {{"hash": "{H1}", "faction": "Eldar", "match_count": 10, "win_rate": 0.2,
                  "avg_turns": 6.0}},
                {{"hash": "{H2}", "faction": "Eldar", "match_count": 0, "win_rate": 0.0,
                  "avg_turns": 0.0}}
            ]}}"#
        )
    }

    fn h(s: &str) -> PositionHash {
        s.parse().unwrap()
    }

    #[test]
    fn load_book_from_json_string() {
        let book = load_book_from_str(&book_json()).unwrap();
        assert_eq!(book.len(), 4);
        assert_eq!(book.factions().collect::<Vec<_>>(), vec!["Eldar", "Orks"]);
        assert_eq!(book.entries()[0].faction, FactionTag::Any);
    }

    #[test]
    fn follow_ups_ordered_by_frequency() {
        let book = load_book_from_str(&book_json()).unwrap();
        let r = book.lookup_hash(h(H1), &book.faction_filter("Eldar").unwrap(), &BookConfig::default());
        // Untagged entry (40) beats the Eldar one (10).
        assert_eq!(r.entry.as_ref().unwrap().faction, FactionTag::Any);
        assert_eq!(
            r.follow_ups,
            vec![
                Action::Shoot {
                    unit: UnitId(1),
                    target: UnitId(2)
                },
                Action::Pass
            ]
        );
    }

    #[test]
    fn named_faction_wins_equal_match_count() {
        let book = load_book_from_str(&book_json()).unwrap();
        let filter = book.faction_filter("Orks").unwrap();
        let e = book.best_entry(h(H1), &filter).unwrap();
        assert_eq!(e.faction, FactionTag::Named("Orks".into()));
        let any = book.best_entry(h(H1), &FactionFilter::Any).unwrap();
        assert_eq!(any.faction, FactionTag::Named("Orks".into()));
    }

    #[test]
    fn filter_excludes_other_factions() {
        let book = load_book_from_str(&book_json()).unwrap();
        let orks = book.faction_filter("Orks").unwrap();
        assert!(book.best_entry(h(H2), &orks).is_none());
        assert!(!book.lookup_hash(h(H2), &orks, &BookConfig::default()).is_hit());
    }

    #[test]
    fn unknown_faction_rejected() {
        let book = load_book_from_str(&book_json()).unwrap();
        assert!(matches!(
            book.faction_filter("Necrons"),
            Err(BookError::UnknownFaction(name)) if name == "Necrons"
        ));
    }

    #[test]
    fn miss_has_zero_confidence() {
        let book = load_book_from_str(&book_json()).unwrap();
        let r = book.lookup_hash(PositionHash(7), &FactionFilter::Any, &BookConfig::default());
        assert_eq!(r, LookupResult::miss(PositionHash(7)));
        assert_eq!(r.confidence, 0.0);
        assert!(r.follow_ups.is_empty());
    }

    #[test]
    fn confidence_grows_with_match_count() {
        let cfg = BookConfig::default();
        let one = cfg.confidence(1);
        let thousand = cfg.confidence(1000);
        assert!(one < thousand, "{one} >= {thousand}");
        assert!(one > 0.0);
        assert_eq!(thousand, cfg.confidence_ceiling);
        assert!(cfg.confidence(499) < cfg.confidence_ceiling);
        assert!((cfg.confidence(500) - cfg.confidence_ceiling).abs() < 1e-12);
        let mut last = 0.0;
        for n in 0..600 {
            let c = cfg.confidence(n);
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn invalid_records_rejected() {
        let cases = [
            r#"{"entries": [{"hash": "00000000000000a1", "faction": null, "match_count": 1,
                "win_rate": 1.5, "avg_turns": 1.0}]}"#,
            r#"{"entries": [{"hash": "00000000000000a1", "faction": null, "match_count": 1,
                "win_rate": 0.5, "avg_turns": -1.0}]}"#,
            r#"{"entries": [{"hash": "00000000000000a1", "faction": "", "match_count": 1,
                "win_rate": 0.5, "avg_turns": 1.0}]}"#,
        ];
        for json in cases {
            assert!(
                matches!(load_book_from_str(json), Err(BookError::InvalidRecord { index: 0, .. })),
                "accepted {json}"
            );
        }
        let bad_hash = r#"{"entries": [{"hash": "xyz", "faction": null, "match_count": 1,
                "win_rate": 0.5, "avg_turns": 1.0}]}"#;
        assert!(matches!(load_book_from_str(bad_hash), Err(BookError::Json(_))));
    }

    #[test]
    fn stats_are_match_weighted() {
        let book = load_book_from_str(&book_json()).unwrap();
        let orks = book.stats(&book.faction_filter("Orks").unwrap());
        // Untagged entry plus the Orks entry.
        assert_eq!(orks.entries, 2);
        assert_eq!(orks.total_matches, 80);
        assert!((orks.win_rate - 0.6).abs() < 1e-12);
        assert!((orks.avg_turns - 4.5).abs() < 1e-12);

        let empty = OpeningBook::default().stats(&FactionFilter::Any);
        assert_eq!(empty.win_rate, 0.0);
    }

    #[test]
    fn lookup_by_state_hash() {
        let state = GameState::builder(BoardSize::new(10, 10))
            .unit(Unit::new(UnitId(1), Side::One, Position::new(1, 1), 3, 3, 20).unwrap())
            .build()
            .unwrap();
        let schema = EncodingSchema::default();
        let hash = position_hash(&state, &schema).unwrap();
        let book = OpeningBook::from_entries(vec![OpeningEntry {
            hash,
            faction: FactionTag::Any,
            match_count: 1000,
            win_rate: 0.55,
            avg_turns: 5.0,
            follow_ups: vec![FollowUp {
                action: Action::Pass,
                frequency: 1,
            }],
        }])
        .unwrap();
        let r = lookup(&book, &state, &FactionFilter::Any, &schema, &BookConfig::default()).unwrap();
        assert!(r.is_hit());
        assert_eq!(r.confidence, 0.95);
        assert_eq!(r.follow_ups, vec![Action::Pass]);
    }

    #[test]
    fn sample_respects_frequencies() {
        let book = load_book_from_str(&book_json()).unwrap();
        let r = book.lookup_hash(h(H1), &FactionFilter::Named("Eldar".into()), &BookConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let mut shoots = 0;
        for _ in 0..1200 {
            if matches!(r.sample(&mut rng), Some(Action::Shoot { .. })) {
                shoots += 1;
            }
        }
        // Expected 900 of 1200.
        assert!((800..1000).contains(&shoots), "shoots {shoots}");
        assert_eq!(LookupResult::miss(PositionHash(0)).sample(&mut rng), None);
    }

    #[test]
    fn handle_snapshots_survive_replace() {
        let handle = BookHandle::new(load_book_from_str(&book_json()).unwrap());
        let before = handle.snapshot();
        let old = handle.replace(OpeningBook::default());
        assert_eq!(before.len(), 4);
        assert_eq!(old.len(), 4);
        assert!(handle.snapshot().is_empty());
    }

    #[test]
    fn reload_from_file() {
        let path = std::env::temp_dir().join(format!("tactica-book-{}.json", std::process::id()));
        fs::write(&path, book_json()).unwrap();
        let handle = BookHandle::default();
        handle.reload(&path).unwrap();
        assert_eq!(handle.snapshot().len(), 4);
        fs::remove_file(&path).unwrap();

        assert!(matches!(handle.reload(&path), Err(BookError::Io { .. })));
        assert_eq!(handle.snapshot().len(), 4);
    }

    #[test]
    fn config_validation() {
        assert!(BookConfig::default().validate().is_ok());
        let zero = BookConfig {
            confidence_ceiling: 0.0,
            ..BookConfig::default()
        };
        assert!(zero.validate().is_err());
        let sat = BookConfig {
            saturation_count: 0,
            ..BookConfig::default()
        };
        assert!(sat.validate().is_err());
    }
}
