use once_cell::sync::Lazy;
use regex::Regex;

use crate::hunk::{MatchOutcome, Strategy};
use crate::line_index::{LineIndex, normalize_line};
use crate::options::MatcherOptions;

/// Run every tier in priority order and return the first hit. A hunk that misses
/// all five tiers is a normal outcome (`MatchOutcome::Miss`), not an error — the
/// matcher never fails, it only finds or doesn't.
pub fn find(document: &str, search_text: &str, hint: Option<(usize, usize)>, options: &MatcherOptions) -> MatchOutcome {
	if let Some(outcome) = tier1_exact(document, search_text) {
		tracing::debug!(strategy = "exact", "match hit");
		return outcome;
	}

	let index = LineIndex::build(document);
	let search_lines = split_lines(search_text);

	if options.normalize_whitespace
		&& let Some(outcome) = tier2_whitespace_normalized(&index, &search_lines, options)
	{
		tracing::debug!(strategy = "whitespace_normalized", "match hit");
		return outcome;
	}

	if let Some(outcome) = tier3_line_tolerant(&index, &search_lines, hint, options) {
		tracing::debug!(strategy = "line_tolerant", "match hit");
		return outcome;
	}

	if options.use_anchors
		&& let Some(outcome) = tier4_anchor_based(&index, document, search_text, &search_lines)
	{
		tracing::debug!(strategy = "anchor_based", "match hit");
		return outcome;
	}

	if let Some(outcome) = tier5_fuzzy_constrained(&index, &search_lines, hint, options) {
		tracing::debug!(strategy = "fuzzy_constrained", "match hit");
		return outcome;
	}

	tracing::warn!("all matcher tiers missed");
	MatchOutcome::Miss
}

pub fn split_lines(text: &str) -> Vec<&str> {
	text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect()
}

// region:    --- Tier 1: Exact

fn tier1_exact(document: &str, search_text: &str) -> Option<MatchOutcome> {
	if let Some(start) = document.find(search_text) {
		return Some(found(start..start + search_text.len(), Strategy::Exact, 1.0));
	}

	// CRLF/LF mismatch only: compare line-by-line verbatim (no other normalization).
	let index = LineIndex::build(document);
	let search_lines = split_lines(search_text);
	if search_lines.is_empty() {
		return None;
	}
	for start in 0..=index.line_count().saturating_sub(search_lines.len()) {
		if (0..search_lines.len()).all(|i| index.line(start + i) == Some(search_lines[i])) {
			let range = window_byte_range(&index, start, search_lines.len())?;
			return Some(found(range, Strategy::Exact, 1.0));
		}
	}
	None
}

// endregion: --- Tier 1: Exact

// region:    --- Tier 2: Whitespace-normalized

/// A line's normalized form plus a map from each normalized byte offset back to
/// the original line's byte offset, so a substring hit in the normalized text
/// can be translated back to real document bytes (`map` has one extra trailing
/// entry for the offset just past the normalized line's content).
struct LineNormalization {
	normalized: String,
	map: Vec<usize>,
}

fn ws_normalize_line(line: &str, options: &MatcherOptions) -> LineNormalization {
	let trimmed_start_len = if options.ignore_leading_ws { line.len() - line.trim_start().len() } else { 0 };
	let trimmed_end_len = if options.ignore_trailing_ws { line.len() - line.trim_end().len() } else { 0 };
	let body_end = line.len().saturating_sub(trimmed_end_len).max(trimmed_start_len);
	let body = &line[trimmed_start_len..body_end];

	let mut normalized = String::with_capacity(body.len());
	let mut map = Vec::with_capacity(body.len() + 1);
	for (i, ch) in body.char_indices() {
		let orig_offset = trimmed_start_len + i;
		if ch == '\t' {
			normalized.push_str("  ");
			map.push(orig_offset);
			map.push(orig_offset);
		} else {
			let before = normalized.len();
			normalized.push(ch);
			for _ in 0..(normalized.len() - before) {
				map.push(orig_offset);
			}
		}
	}
	map.push(body_end);
	LineNormalization { normalized, map }
}

fn line_for_normalized_offset(line_starts: &[usize], offset: usize, line_count: usize) -> usize {
	let idx = match line_starts.binary_search(&offset) {
		Ok(i) => i,
		Err(i) => i.saturating_sub(1),
	};
	idx.min(line_count.saturating_sub(1))
}

/// Produce normalized copies of every document line and of the search text (CRLF
/// already gone via `LineIndex`, tab -> two spaces, optional leading/trailing
/// per-line trim), substring-search the joined normalized document, then map the
/// hit's byte range back to the original document by line. Unlike a whole-line
/// alignment check, this also catches a sub-line whitespace-only difference.
fn tier2_whitespace_normalized(index: &LineIndex, search_lines: &[&str], options: &MatcherOptions) -> Option<MatchOutcome> {
	if search_lines.is_empty() {
		return None;
	}

	let mut doc_normalized = String::new();
	let mut line_starts = Vec::with_capacity(index.line_count() + 1);
	let mut line_maps: Vec<Vec<usize>> = Vec::with_capacity(index.line_count());
	for i in 0..index.line_count() {
		line_starts.push(doc_normalized.len());
		let norm = ws_normalize_line(index.line(i).unwrap_or(""), options);
		doc_normalized.push_str(&norm.normalized);
		line_maps.push(norm.map);
		if i + 1 < index.line_count() {
			doc_normalized.push('\n');
		}
	}
	line_starts.push(doc_normalized.len());

	let search_normalized = search_lines.iter().map(|l| ws_normalize_line(l, options).normalized).collect::<Vec<_>>().join("\n");
	if search_normalized.is_empty() {
		return None;
	}

	let pos = doc_normalized.find(&search_normalized)?;
	let end = pos + search_normalized.len();

	let start_line = line_for_normalized_offset(&line_starts, pos, index.line_count());
	let end_line = line_for_normalized_offset(&line_starts, end, index.line_count());
	let start_intra = pos - line_starts[start_line];
	let end_intra = end - line_starts[end_line];

	let start_orig = index.line_byte_start(start_line)? + line_maps[start_line].get(start_intra).copied().unwrap_or(0);
	let end_orig = index.line_byte_start(end_line)? + line_maps[end_line].get(end_intra).copied().unwrap_or(0);

	Some(found(start_orig..end_orig, Strategy::WhitespaceNormalized, 0.95))
}

// endregion: --- Tier 2: Whitespace-normalized

// region:    --- Tier 3: Line-tolerant

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineDiffKind {
	Match,
	Whitespace,
	Content,
}

fn classify_line(file_line: &str, search_line: &str) -> LineDiffKind {
	if file_line == search_line {
		LineDiffKind::Match
	} else if normalize_line(file_line) == normalize_line(search_line) {
		LineDiffKind::Whitespace
	} else {
		LineDiffKind::Content
	}
}

fn tier3_line_tolerant(index: &LineIndex, search_lines: &[&str], hint: Option<(usize, usize)>, options: &MatcherOptions) -> Option<MatchOutcome> {
	line_tolerant_best(index, search_lines, hint, options.line_range_expansion, options.max_line_diffs)
		.map(|(range, confidence)| found(range, Strategy::LineTolerant, confidence))
}

/// Shared by Tier 3 and Tier 4 (the latter restricts the scan range to a window
/// around an anchor occurrence).
fn line_tolerant_best(
	index: &LineIndex,
	search_lines: &[&str],
	hint: Option<(usize, usize)>,
	expansion: usize,
	max_content_diffs: usize,
) -> Option<(std::ops::Range<usize>, f32)> {
	if search_lines.is_empty() {
		return None;
	}
	let window = search_lines.len();
	let last_start = index.line_count().saturating_sub(window);
	let (lo, hi) = scan_bounds(hint, expansion, last_start);

	let mut best: Option<(usize, f32)> = None;
	for start in lo..=hi.min(last_start) {
		let mut content_diffs = 0usize;
		let mut whitespace_diffs = 0usize;
		for (i, search_line) in search_lines.iter().enumerate().take(window) {
			let file_line = index.line(start + i).unwrap_or("");
			match classify_line(file_line, search_line) {
				LineDiffKind::Match => {}
				LineDiffKind::Whitespace => whitespace_diffs += 1,
				LineDiffKind::Content => content_diffs += 1,
			}
		}
		// A window where every line is a content mismatch isn't a near-miss, it's
		// a different region entirely -- require at least one matching/whitespace
		// line so a lone-line search can't tolerant-match an unrelated lone line.
		if content_diffs > max_content_diffs || content_diffs >= window {
			continue;
		}
		let confidence = 1.0 - 0.1 * content_diffs as f32 - 0.02 * whitespace_diffs as f32;
		if confidence < 0.7 {
			continue;
		}
		if best.is_none_or(|(_, best_conf)| confidence > best_conf) {
			best = Some((start, confidence));
		}
	}

	let (start, confidence) = best?;
	let range = window_byte_range(index, start, window)?;
	Some((range, confidence))
}

fn scan_bounds(hint: Option<(usize, usize)>, expansion: usize, last_start: usize) -> (usize, usize) {
	match hint {
		Some((start_line, _end_line)) => {
			// Hints are 1-indexed; clamp into the valid 0-indexed start range.
			let center = start_line.saturating_sub(1);
			let lo = center.saturating_sub(expansion);
			let hi = center.saturating_add(expansion);
			(lo.min(last_start), hi.min(last_start))
		}
		None => (0, last_start),
	}
}

// endregion: --- Tier 3: Line-tolerant

// region:    --- Tier 4: Anchor-based

static RE_FUNCTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:fn|function|def)\s+([A-Za-z_]\w*)").expect("anchor regex"));
static RE_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:class|struct|enum|trait)\s+([A-Za-z_]\w*)").expect("anchor regex"));
static RE_BINDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:const|let|var)\s+([A-Za-z_]\w*)\s*[:=]").expect("anchor regex"));
static RE_INTERFACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:interface|type)\s+([A-Za-z_]\w*)").expect("anchor regex"));
static RE_DECORATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:@|#\[)([A-Za-z_]\w*)").expect("anchor regex"));
static RE_EXPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bexport\s+(?:default\s+)?(?:async\s+)?(?:function|class|const)\s+([A-Za-z_]\w*)").expect("anchor regex"));
static RE_STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']([A-Za-z0-9_]{10,})["']"#).expect("anchor regex"));

pub(crate) fn extract_anchors(search_text: &str) -> Vec<String> {
	let mut anchors = Vec::new();
	for re in [&*RE_FUNCTION, &*RE_CLASS, &*RE_BINDING, &*RE_INTERFACE, &*RE_DECORATED, &*RE_EXPORT, &*RE_STRING_LITERAL] {
		for caps in re.captures_iter(search_text) {
			if let Some(m) = caps.get(1) {
				anchors.push(m.as_str().to_string());
			}
		}
	}
	anchors.sort();
	anchors.dedup();
	anchors
}

fn anchor_uniqueness_score(count: usize) -> f32 {
	match count {
		0 => 0.0,
		1 => 1.0,
		2 => 0.8,
		3..=5 => 0.5,
		_ => 0.2,
	}
}

fn tier4_anchor_based(index: &LineIndex, document: &str, search_text: &str, search_lines: &[&str]) -> Option<MatchOutcome> {
	let anchors = extract_anchors(search_text);
	if anchors.is_empty() {
		return None;
	}

	let mut best_anchor: Option<(&str, usize, f32)> = None;
	for anchor in &anchors {
		let count = document.matches(anchor.as_str()).count();
		let score = anchor_uniqueness_score(count);
		if score <= 0.0 {
			continue;
		}
		if best_anchor.is_none_or(|(_, _, best_score)| score > best_score) {
			best_anchor = Some((anchor.as_str(), count, score));
		}
	}
	let (anchor, _count, anchor_score) = best_anchor?;

	let occurrence_lines: Vec<usize> = (0..index.line_count()).filter(|&i| index.line(i).is_some_and(|l| l.contains(anchor))).collect();

	for occ in occurrence_lines {
		let lo = occ.saturating_sub(20);
		let hi = (occ + 50).min(index.line_count().saturating_sub(1));
		let hint = Some((lo + 1, hi + 1));
		if let Some((range, tier3_confidence)) = line_tolerant_best(index, search_lines, hint, 0, 1) {
			let confidence = (tier3_confidence * anchor_score).min(1.0);
			return Some(found(range, Strategy::AnchorBased, confidence));
		}
	}
	None
}

// endregion: --- Tier 4: Anchor-based

// region:    --- Tier 5: Fuzzy-constrained

fn jaccard(a: &str, b: &str) -> f32 {
	use std::collections::HashSet;
	let ta: HashSet<&str> = a.split_whitespace().filter(|t| t.len() > 1).collect();
	let tb: HashSet<&str> = b.split_whitespace().filter(|t| t.len() > 1).collect();
	if ta.is_empty() && tb.is_empty() {
		return 1.0;
	}
	let inter = ta.intersection(&tb).count();
	let union = ta.union(&tb).count();
	if union == 0 { 0.0 } else { inter as f32 / union as f32 }
}

fn line_similarity(file_line: &str, search_line: &str) -> f32 {
	let ft = file_line.trim();
	let st = search_line.trim();
	if ft == st {
		1.0
	} else if ft.is_empty() != st.is_empty() {
		0.5
	} else {
		jaccard(ft, st)
	}
}

fn tier5_fuzzy_constrained(index: &LineIndex, search_lines: &[&str], hint: Option<(usize, usize)>, options: &MatcherOptions) -> Option<MatchOutcome> {
	if search_lines.is_empty() {
		return None;
	}
	let window = search_lines.len();
	let last_start = index.line_count().saturating_sub(window);
	let (lo, hi) = scan_bounds(hint, options.line_range_expansion.max(index.line_count()), last_start);

	let mut best: Option<(usize, f32)> = None;
	for start in lo..=hi.min(last_start) {
		let mean: f32 = (0..window).map(|i| line_similarity(index.line(start + i).unwrap_or(""), search_lines[i])).sum::<f32>() / window as f32;
		if mean < options.min_fuzzy_confidence {
			continue;
		}
		if best.is_none_or(|(_, best_mean)| mean > best_mean) {
			best = Some((start, mean));
		}
	}

	let (start, confidence) = best?;
	let range = window_byte_range(index, start, window)?;
	Some(found(range, Strategy::FuzzyConstrained, confidence))
}

// endregion: --- Tier 5: Fuzzy-constrained

/// A still-failed block's best similar region, for a human-readable
/// "N% similar match exists" diagnostic (§ error taxonomy `MatchMiss`). Reuses
/// the Tier 5 scorer over the whole document with no confidence floor — this is
/// never treated as a match, only as a hint.
pub(crate) struct SimilarRegion {
	pub text: String,
	pub similarity: f32,
	pub line: usize, // 1-indexed
}

pub(crate) fn best_similar_region(document: &str, search_text: &str) -> Option<SimilarRegion> {
	let index = LineIndex::build(document);
	let search_lines = split_lines(search_text);
	if search_lines.is_empty() {
		return None;
	}
	let window = search_lines.len();
	let last_start = index.line_count().saturating_sub(window);

	let mut best: Option<(usize, f32)> = None;
	for start in 0..=last_start {
		let mean: f32 = (0..window).map(|i| line_similarity(index.line(start + i).unwrap_or(""), search_lines[i])).sum::<f32>() / window as f32;
		if best.is_none_or(|(_, best_mean)| mean > best_mean) {
			best = Some((start, mean));
		}
	}

	let (start, similarity) = best?;
	let range = window_byte_range(&index, start, window)?;
	Some(SimilarRegion {
		text: document[range].to_string(),
		similarity,
		line: start + 1,
	})
}

fn found(byte_range: std::ops::Range<usize>, strategy: Strategy, confidence: f32) -> MatchOutcome {
	MatchOutcome::Found {
		byte_range,
		strategy,
		confidence,
	}
}

fn window_byte_range(index: &LineIndex, start: usize, len: usize) -> Option<std::ops::Range<usize>> {
	let first = index.line_byte_start(start)?;
	let last = index.line_byte_end(start + len - 1)?;
	Some(first..last)
}

/// If the document uses CRLF and the replacement text introduces only bare `\n`,
/// translate the replacement's newlines to match — never the reverse.
pub fn adapt_line_endings(document: &str, replacement: &str) -> String {
	if document.contains("\r\n") && !replacement.contains("\r\n") {
		replacement.replace('\n', "\r\n")
	} else {
		replacement.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn opts() -> MatcherOptions {
		MatcherOptions::default()
	}

	#[test]
	fn tier1_exact_hit() {
		let doc = "alpha\nbeta\ngamma\n";
		let outcome = find(doc, "beta", None, &opts());
		match outcome {
			MatchOutcome::Found { byte_range, strategy, confidence } => {
				assert_eq!(&doc[byte_range], "beta");
				assert_eq!(strategy, Strategy::Exact);
				assert_eq!(confidence, 1.0);
			}
			MatchOutcome::Miss => panic!("expected hit"),
		}
	}

	#[test]
	fn tier1_exact_hit_across_crlf() {
		let doc = "a\r\nbeta line\r\nc\r\n";
		let outcome = find(doc, "beta line", None, &opts());
		assert!(outcome.is_found());
	}

	#[test]
	fn tier2_whitespace_normalized_hit() {
		let doc = "fn a() {\n\treturn 1;\n}\n";
		// A tab normalizes to two spaces (§ LineIndex normalization rule), so a
		// two-space search line is the whitespace-equivalent of the file's tab.
		let outcome = find(doc, "fn a() {\n  return 1;\n}", None, &opts());
		match outcome {
			MatchOutcome::Found { strategy, .. } => assert_eq!(strategy, Strategy::WhitespaceNormalized),
			MatchOutcome::Miss => panic!("expected hit"),
		}
	}

	#[test]
	fn tier2_catches_sub_line_whitespace_drift() {
		// Tier 1 can't find this: the tab-vs-two-spaces difference sits inside a
		// single line together with exact content on both sides, not across a
		// whole line, so a whole-line alignment check (rather than a normalized
		// substring search) would have to fall through past Tier 2 entirely.
		let doc = "if (x) {\n\tlet total = a +\tb;\n}\n";
		let outcome = find(doc, "let total = a +  b;", None, &opts());
		match outcome {
			MatchOutcome::Found { byte_range, strategy, .. } => {
				assert_eq!(strategy, Strategy::WhitespaceNormalized);
				assert_eq!(&doc[byte_range], "let total = a +\tb;");
			}
			MatchOutcome::Miss => panic!("expected hit"),
		}
	}

	#[test]
	fn tier3_line_tolerant_allows_small_content_diff() {
		let doc = "one\ntwo\nthree\nfour\n";
		let outcome = find(doc, "one\nTWOO\nthree", None, &opts());
		match outcome {
			MatchOutcome::Found { strategy, confidence, .. } => {
				assert_eq!(strategy, Strategy::LineTolerant);
				assert!(confidence >= 0.7);
			}
			MatchOutcome::Miss => panic!("expected hit"),
		}
	}

	#[test]
	fn tier5_fuzzy_rescues_reworded_line() {
		let doc = "fn compute(value: i32) -> i32 {\n    value * factor plus offset\n}\n";
		let search = "fn compute(value: i32) -> i32 {\n    value times factor plus offset\n}";
		let outcome = find(doc, search, None, &opts());
		assert!(outcome.is_found());
	}

	#[test]
	fn miss_returns_miss_not_error() {
		let doc = "alpha\nbeta\n";
		let outcome = find(doc, "completely unrelated content block", None, &opts());
		assert!(!outcome.is_found());
	}

	#[test]
	fn line_endings_adapted_to_crlf_document() {
		let doc = "a\r\nb\r\n";
		let adapted = adapt_line_endings(doc, "x\ny");
		assert_eq!(adapted, "x\r\ny");
	}
}
