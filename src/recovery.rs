use crate::applier::{Symbol, SymbolKind};
use crate::line_index::{LineIndex, normalize_line};
use crate::matcher::{extract_anchors, split_lines};
use crate::options::AggregatorConfig;

/// Why a recovered region differs from the requested search text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMethod {
	WhitespaceAdjust,
	PartialMatch,
	LineReorder,
	SymbolFallback,
}

/// Threshold a symbol's score must clear before its context is searched at all (§4.4 step 4).
const SYMBOL_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
	pub start_line: usize, // 1-indexed
	pub method: RecoveryMethod,
	pub confidence: f32,
	pub auto_recommended: bool,
	/// Byte range of the candidate region in the current document.
	pub byte_range: std::ops::Range<usize>,
	/// Present only for whitespace-adjust: the file's own bytes for that range,
	/// ready to use as the match result directly (no re-matching needed).
	pub adjusted_text: Option<String>,
	/// Human-readable breakdown of why the region was suggested (§4.4 step 5).
	pub diff_summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
	Match,
	Whitespace,
	Content,
}

fn classify(file_line: &str, search_line: &str) -> LineClass {
	if file_line == search_line {
		LineClass::Match
	} else if normalize_line(file_line) == normalize_line(search_line) {
		LineClass::Whitespace
	} else {
		LineClass::Content
	}
}

/// Sub-classification of a `LineClass::Whitespace` pair (§4.4 step 2): which
/// kind of whitespace-only drift separates the file line from the search line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhitespaceKind {
	LeadingIndent,
	TrailingSpace,
	TabsVsSpaces,
	Mixed,
}

fn classify_whitespace(file_line: &str, search_line: &str) -> WhitespaceKind {
	let file_leading_len = file_line.len() - file_line.trim_start().len();
	let search_leading_len = search_line.len() - search_line.trim_start().len();
	let file_trailing_len = file_line.len() - file_line.trim_end().len();
	let search_trailing_len = search_line.len() - search_line.trim_end().len();

	let file_leading = &file_line[..file_leading_len];
	let search_leading = &search_line[..search_leading_len];
	let tabs_involved = file_leading.contains('\t') != search_leading.contains('\t');

	let leading_differs = file_leading_len != search_leading_len;
	let trailing_differs = file_trailing_len != search_trailing_len;

	match (leading_differs, trailing_differs, tabs_involved) {
		(_, _, true) => WhitespaceKind::TabsVsSpaces,
		(true, false, false) => WhitespaceKind::LeadingIndent,
		(false, true, false) => WhitespaceKind::TrailingSpace,
		_ => WhitespaceKind::Mixed,
	}
}

/// Tallies whitespace sub-kinds across a window's lines and renders the
/// human-readable diff summary each `RecoverySuggestion` carries.
#[derive(Debug, Clone, Copy, Default)]
struct WhitespaceTally {
	leading_indent: usize,
	trailing_space: usize,
	tabs_vs_spaces: usize,
	mixed: usize,
}

impl WhitespaceTally {
	fn record(&mut self, kind: WhitespaceKind) {
		match kind {
			WhitespaceKind::LeadingIndent => self.leading_indent += 1,
			WhitespaceKind::TrailingSpace => self.trailing_space += 1,
			WhitespaceKind::TabsVsSpaces => self.tabs_vs_spaces += 1,
			WhitespaceKind::Mixed => self.mixed += 1,
		}
	}

	fn summary(&self, content_diffs: usize) -> String {
		let mut parts = Vec::new();
		if self.leading_indent > 0 {
			parts.push(format!("{} leading-indent", self.leading_indent));
		}
		if self.trailing_space > 0 {
			parts.push(format!("{} trailing-space", self.trailing_space));
		}
		if self.tabs_vs_spaces > 0 {
			parts.push(format!("{} tabs-vs-spaces", self.tabs_vs_spaces));
		}
		if self.mixed > 0 {
			parts.push(format!("{} mixed-whitespace", self.mixed));
		}
		if content_diffs > 0 {
			parts.push(format!("{content_diffs} content"));
		}
		if parts.is_empty() {
			"no line differences".to_string()
		} else {
			format!("line diff: {}", parts.join(", "))
		}
	}
}

/// Attempt to recover from a matcher miss: enumerate plausible starting lines,
/// classify each candidate window, and return ranked suggestions. The caller
/// decides whether `auto_recommended` suggestions should be applied without
/// confirmation (§ auto-apply policy) or merely surfaced.
pub fn attempt(document: &str, search_text: &str, config: &AggregatorConfig) -> Vec<RecoverySuggestion> {
	let index = LineIndex::build(document);
	let search_lines = split_lines(search_text);
	if search_lines.is_empty() {
		return Vec::new();
	}
	let first_norm = normalize_line(search_lines[0]);

	let mut candidates: Vec<usize> = index.find_line(search_lines[0]).to_vec();
	for i in 0..index.line_count() {
		if candidates.contains(&i) {
			continue;
		}
		if let Some(line) = index.normalized_line(i)
			&& jaccard_similarity(line, &first_norm) > 0.8
		{
			candidates.push(i);
		}
	}
	candidates.sort_unstable();
	candidates.dedup();

	let mut suggestions: Vec<RecoverySuggestion> = candidates
		.into_iter()
		.filter_map(|start| analyze_recovery(&index, start, &search_lines, config))
		.collect();

	suggestions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
	suggestions.truncate(5);
	suggestions
}

fn jaccard_similarity(a: &str, b: &str) -> f32 {
	use std::collections::HashSet;
	let ta: HashSet<&str> = a.split_whitespace().collect();
	let tb: HashSet<&str> = b.split_whitespace().collect();
	if ta.is_empty() || tb.is_empty() {
		return 0.0;
	}
	let inter = ta.intersection(&tb).count();
	let union = ta.union(&tb).count();
	if union == 0 { 0.0 } else { inter as f32 / union as f32 }
}

fn analyze_recovery(index: &LineIndex, start: usize, search_lines: &[&str], config: &AggregatorConfig) -> Option<RecoverySuggestion> {
	let window = search_lines.len();
	if start + window > index.line_count() {
		// Try treating this as a missing/extra-line (reorder-ish) case by allowing
		// the window to run past file end only when the shortfall is within tolerance.
		return analyze_with_slack(index, start, search_lines);
	}

	let mut content = 0usize;
	let mut whitespace = 0usize;
	let mut matched = 0usize;
	let mut tally = WhitespaceTally::default();
	for (i, search_line) in search_lines.iter().enumerate().take(window) {
		let file_line = index.line(start + i).unwrap_or("");
		match classify(file_line, search_line) {
			LineClass::Match => matched += 1,
			LineClass::Whitespace => {
				whitespace += 1;
				matched += 1;
				tally.record(classify_whitespace(file_line, search_line));
			}
			LineClass::Content => content += 1,
		}
	}
	let match_ratio = matched as f32 / window as f32;
	let byte_range = index.line_byte_start(start)?..index.line_byte_end(start + window - 1)?;

	if content == 0 && whitespace > 0 {
		let confidence = 0.95;
		let adjusted = whitespace_adjusted_text(index, start, search_lines);
		return Some(RecoverySuggestion {
			start_line: start + 1,
			method: RecoveryMethod::WhitespaceAdjust,
			confidence,
			auto_recommended: confidence >= config.whitespace_auto_apply_threshold,
			byte_range,
			adjusted_text: Some(adjusted),
			diff_summary: Some(tally.summary(0)),
		});
	}
	if content <= 2 && match_ratio >= 0.8 {
		let confidence = match_ratio * 0.9;
		return Some(RecoverySuggestion {
			start_line: start + 1,
			method: RecoveryMethod::PartialMatch,
			confidence,
			auto_recommended: confidence >= config.any_auto_apply_threshold,
			byte_range,
			adjusted_text: None,
			diff_summary: Some(tally.summary(content)),
		});
	}
	analyze_with_extra_line(index, start, search_lines)
}

/// Handles the `missing <= 1, extra <= 1` line-reorder case, where the candidate
/// window's natural length doesn't line up with the search length.
fn analyze_with_slack(index: &LineIndex, start: usize, search_lines: &[&str]) -> Option<RecoverySuggestion> {
	let window = search_lines.len();
	let available = index.line_count().saturating_sub(start);
	if available == 0 || window == 0 {
		return None;
	}
	let missing = window.saturating_sub(available);
	if missing > 1 {
		return None;
	}
	let used = available.min(window);
	let mut content = 0usize;
	for (i, search_line) in search_lines.iter().enumerate().take(used) {
		let file_line = index.line(start + i).unwrap_or("");
		if classify(file_line, search_line) == LineClass::Content {
			content += 1;
		}
	}
	if content > 0 {
		return None;
	}
	let byte_range = index.line_byte_start(start)?..index.line_byte_end(start + used - 1)?;
	Some(RecoverySuggestion {
		start_line: start + 1,
		method: RecoveryMethod::LineReorder,
		confidence: 0.7,
		auto_recommended: false,
		byte_range,
		adjusted_text: None,
		diff_summary: Some(format!("{missing} line(s) missing at end of search window")),
	})
}

/// Handles the other half of the `missing <= 1, extra <= 1` line-reorder row: a
/// file region with one interior line the search text doesn't have. Tries every
/// "skip one file line" alignment over a window one line longer than the search
/// and accepts the first where every remaining file line matches its search line
/// (content-exact; whitespace drift is still tolerated).
fn analyze_with_extra_line(index: &LineIndex, start: usize, search_lines: &[&str]) -> Option<RecoverySuggestion> {
	let window = search_lines.len();
	let extended = window + 1;
	if start + extended > index.line_count() {
		return None;
	}

	for skip in 0..extended {
		let mut content = 0usize;
		let mut search_idx = 0usize;
		for file_idx in 0..extended {
			if file_idx == skip {
				continue;
			}
			let file_line = index.line(start + file_idx).unwrap_or("");
			let search_line = search_lines[search_idx];
			if classify(file_line, search_line) == LineClass::Content {
				content += 1;
				break;
			}
			search_idx += 1;
		}
		if content == 0 && search_idx == window {
			let byte_range = index.line_byte_start(start)?..index.line_byte_end(start + extended - 1)?;
			return Some(RecoverySuggestion {
				start_line: start + 1,
				method: RecoveryMethod::LineReorder,
				confidence: 0.7,
				auto_recommended: false,
				byte_range,
				adjusted_text: None,
				diff_summary: Some(format!("1 extra line in file at offset {skip} relative to search")),
			});
		}
	}
	None
}

/// Build the synthetic search text for a whitespace-only recovery: take the
/// search line's content on lines where content matches, but use the file's own
/// whitespace. This is what actually gets substituted in — the matcher is never
/// re-invoked for a whitespace-adjust recovery.
fn whitespace_adjusted_text(index: &LineIndex, start: usize, search_lines: &[&str]) -> String {
	let mut out = String::new();
	for (i, _) in search_lines.iter().enumerate() {
		if i > 0 {
			out.push('\n');
		}
		out.push_str(index.line(start + i).unwrap_or(""));
	}
	out
}

/// Step 4 — optional symbol-provider fallback. Only runs when the host exposes
/// `Applier::document_symbols`. Extracts the same anchor identifiers the
/// anchor-based matcher tier looks for, scores every symbol whose name matches
/// one, and retries an exact/whitespace-normalized search restricted to a
/// +-5-line window around the best-scoring symbol.
pub fn symbol_fallback(document: &str, search_text: &str, symbols: &[Symbol], config: &AggregatorConfig) -> Option<RecoverySuggestion> {
	let anchors: std::collections::HashSet<String> = extract_anchors(search_text).into_iter().collect();
	if anchors.is_empty() {
		return None;
	}

	let mut best: Option<(&Symbol, f32)> = None;
	for symbol in symbols {
		if !anchors.contains(&symbol.name) {
			continue;
		}
		let mut score: f32 = 0.5
			+ match symbol.kind {
				SymbolKind::Class => 0.3,
				SymbolKind::Interface => 0.25,
				SymbolKind::Function => 0.2,
				SymbolKind::Other => 0.1,
			};
		if let Some(detail) = &symbol.detail
			&& !detail.is_empty()
			&& search_text.contains(detail.as_str())
		{
			score += 0.15;
		}
		score = score.min(1.0);
		if best.is_none_or(|(_, best_score)| score > best_score) {
			best = Some((symbol, score));
		}
	}

	let (symbol, score) = best?;
	if score < SYMBOL_SCORE_THRESHOLD {
		return None;
	}

	let index = LineIndex::build(document);
	let lo = symbol.start_line.saturating_sub(1).saturating_sub(5);
	let hi = (symbol.end_line.saturating_sub(1) + 5).min(index.line_count().saturating_sub(1));
	let context_start = index.line_byte_start(lo)?;
	let context_end = index.line_byte_end(hi)?;
	let context = &document[context_start..context_end];

	// Tier 1 inside the context window.
	if let Some(pos) = context.find(search_text) {
		let byte_range = (context_start + pos)..(context_start + pos + search_text.len());
		return Some(RecoverySuggestion {
			start_line: lo + 1,
			method: RecoveryMethod::SymbolFallback,
			confidence: score,
			auto_recommended: score >= config.any_auto_apply_threshold,
			byte_range,
			adjusted_text: None,
			diff_summary: Some(format!("matched near symbol '{}' (line {})", symbol.name, symbol.start_line)),
		});
	}

	// Tier 2 inside the context window: whitespace-normalized line-by-line search.
	let context_index = LineIndex::build(context);
	let search_lines = split_lines(search_text);
	if search_lines.is_empty() {
		return None;
	}
	let window = search_lines.len();
	for start in 0..=context_index.line_count().saturating_sub(window) {
		let all_match = (0..window).all(|i| context_index.line(start + i).map(normalize_line) == Some(normalize_line(search_lines[i])));
		if all_match {
			let first = context_index.line_byte_start(start)?;
			let last = context_index.line_byte_end(start + window - 1)?;
			return Some(RecoverySuggestion {
				start_line: lo + start + 1,
				method: RecoveryMethod::SymbolFallback,
				confidence: score,
				auto_recommended: score >= config.any_auto_apply_threshold,
				byte_range: (context_start + first)..(context_start + last),
				adjusted_text: None,
				diff_summary: Some(format!("matched near symbol '{}' (line {})", symbol.name, symbol.start_line)),
			});
		}
	}
	None
}
