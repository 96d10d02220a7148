/// Tunables for the matcher, shared by every tier. Defaults mirror the ones a host
/// would ship out of the box.
#[derive(Debug, Clone)]
pub struct MatcherOptions {
	pub normalize_whitespace: bool,
	pub ignore_trailing_ws: bool,
	pub ignore_leading_ws: bool,
	pub max_line_diffs: usize,
	pub line_range_expansion: usize,
	pub min_fuzzy_confidence: f32,
	pub use_anchors: bool,
}

impl Default for MatcherOptions {
	fn default() -> Self {
		Self {
			normalize_whitespace: true,
			ignore_trailing_ws: true,
			ignore_leading_ws: false,
			max_line_diffs: 2,
			line_range_expansion: 30,
			min_fuzzy_confidence: 0.85,
			use_anchors: true,
		}
	}
}

/// Policy knobs for the aggregator's recovery/auto-apply behavior.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
	pub matcher: MatcherOptions,
	/// Auto-apply a whitespace-only recovery at or above this confidence.
	pub whitespace_auto_apply_threshold: f32,
	/// Auto-apply any other recovery classification at or above this confidence.
	pub any_auto_apply_threshold: f32,
}

impl Default for AggregatorConfig {
	fn default() -> Self {
		Self {
			matcher: MatcherOptions::default(),
			whitespace_auto_apply_threshold: 0.85,
			any_auto_apply_threshold: 0.95,
		}
	}
}
