use derive_more::Display;

/// One parsed SEARCH/REPLACE unit, plus the advisory line hint the model attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hunk {
	pub search_text: String,
	pub replace_text: String,
	/// Line (1-indexed) of the `<<<<<<< SEARCH` marker within the source text, for diagnostics.
	pub origin_offset: usize,
	pub start_line_hint: Option<usize>,
	pub end_line_hint: Option<usize>,
}

impl Hunk {
	pub fn line_range_hint(&self) -> Option<(usize, usize)> {
		match (self.start_line_hint, self.end_line_hint) {
			(Some(s), Some(e)) => Some((s, e)),
			(Some(s), None) => Some((s, s)),
			_ => None,
		}
	}
}

/// Which tier of the matcher produced a hit. Ordered by priority — a lower-numbered
/// tier that hits always wins over a higher one (§ tier monotonicity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Strategy {
	Exact,
	WhitespaceNormalized,
	LineTolerant,
	AnchorBased,
	FuzzyConstrained,
}

/// Outcome of asking the matcher to locate a hunk's search text in a document.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
	Found {
		byte_range: std::ops::Range<usize>,
		strategy: Strategy,
		confidence: f32,
	},
	Miss,
}

impl MatchOutcome {
	pub fn is_found(&self) -> bool {
		matches!(self, MatchOutcome::Found { .. })
	}
}
