use once_cell::sync::Lazy;
use regex::Regex;

use crate::hunk::Hunk;

// region:    --- Grammar

// Exactly seven '<' / '>' on the marker lines; an optional `@@ start[-end] @@` hint
// on the SEARCH line; bodies captured non-greedily so adjacent hunks in the same
// text don't bleed into each other.
static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r"(?s)<<<<<<<[ \t]*SEARCH(?:[ \t]*@@[ \t]*(\d+)(?:[ \t]*-[ \t]*(\d+))?[ \t]*@@)?[ \t]*\r?\n(.*?)\r?\n=======\r?\n(.*?)\r?\n>>>>>>>[ \t]*REPLACE[ \t]*>?",
	)
	.expect("valid RE_BLOCK regex")
});

static RE_FENCE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```[a-zA-Z]*[ \t]*$").expect("valid RE_FENCE_LINE regex"));

// endregion: --- Grammar

/// A non-fatal observation about a hunk; logged but the hunk still proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
	UnbalancedFences,
	ShortSearch,
	PossibleTruncation,
}

/// A fatal defect; the hunk is dropped before it ever reaches the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseRejection {
	EmptySearch,
	NestedMarkers,
	JsonArtifact,
}

impl ParseRejection {
	pub fn reason(&self) -> &'static str {
		match self {
			ParseRejection::EmptySearch => "search body is empty",
			ParseRejection::NestedMarkers => "body contains a SEARCH/REPLACE marker literal",
			ParseRejection::JsonArtifact => "body looks like a JSON tool-call artifact, not source text",
		}
	}
}

#[derive(Debug, Clone)]
pub struct ParsedHunk {
	pub hunk: Hunk,
	pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct ParseReport {
	pub hunks: Vec<ParsedHunk>,
	pub rejections: Vec<(usize, ParseRejection)>,
}

impl ParseReport {
	pub fn is_empty(&self) -> bool {
		self.hunks.is_empty()
	}
}

/// Extract every well-formed hunk from `input`. Returns an empty report only when
/// no SEARCH/REPLACE-shaped region exists at all (callers should treat that as
/// `Error::ParseEmpty`); per-hunk validation failures are recorded as rejections
/// instead of aborting the whole parse.
pub fn parse(input: &str) -> ParseReport {
	let mut report = extract(input);
	if report.hunks.is_empty() && report.rejections.is_empty() {
		let stripped = RE_FENCE_LINE.replace_all(input, "");
		report = extract(&stripped);
	}
	report
}

fn extract(input: &str) -> ParseReport {
	let mut report = ParseReport::default();
	for (block_index, caps) in RE_BLOCK.captures_iter(input).enumerate() {
		let origin_offset = input[..caps.get(0).expect("whole match").start()].matches('\n').count() + 1;
		let start_hint = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
		let end_hint = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok()).or(start_hint);

		let mut search_text = sanitize_body(&caps[3]);
		let mut replace_text = sanitize_body(&caps[4]);

		if let Some(rejection) = validate(&search_text, &replace_text) {
			tracing::warn!(block_index, reason = rejection.reason(), "dropping hunk");
			report.rejections.push((block_index, rejection));
			continue;
		}

		let mut warnings = Vec::new();
		let fence_count = search_text.matches("```").count() + replace_text.matches("```").count();
		if !fence_count.is_multiple_of(2) {
			warnings.push(ParseWarning::UnbalancedFences);
		}
		if search_text.trim().len() < 10 {
			warnings.push(ParseWarning::ShortSearch);
		}
		if search_text.matches("...").count() >= 3 {
			warnings.push(ParseWarning::PossibleTruncation);
		}
		for w in &warnings {
			tracing::warn!(block_index, ?w, "hunk warning");
		}

		// Sanitization guard: a regex engine that over-captured into the closing
		// marker leaves a stray trailing '>' on the last line.
		strip_trailing_marker_artifact(&mut search_text);
		strip_trailing_marker_artifact(&mut replace_text);

		report.hunks.push(ParsedHunk {
			hunk: Hunk {
				search_text,
				replace_text,
				origin_offset,
				start_line_hint: start_hint,
				end_line_hint: end_hint,
			},
			warnings,
		});
	}
	report
}

fn sanitize_body(raw: &str) -> String {
	raw.to_string()
}

fn strip_trailing_marker_artifact(body: &mut String) {
	if let Some(stripped) = body.strip_suffix("\n>") {
		*body = stripped.to_string();
	}
}

fn validate(search_text: &str, replace_text: &str) -> Option<ParseRejection> {
	if search_text.trim().is_empty() {
		return Some(ParseRejection::EmptySearch);
	}
	if contains_marker(search_text) || contains_marker(replace_text) {
		return Some(ParseRejection::NestedMarkers);
	}
	if search_text.contains("\"diff\":") || search_text.contains("tool_call") {
		return Some(ParseRejection::JsonArtifact);
	}
	None
}

fn contains_marker(body: &str) -> bool {
	body.contains("<<<<<<< SEARCH") || body.contains(">>>>>>> REPLACE") || body.contains("=======")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_single_block_without_hint() {
		let input = "<<<<<<< SEARCH\nold line\n=======\nnew line\n>>>>>>> REPLACE\n";
		let report = parse(input);
		assert_eq!(report.hunks.len(), 1);
		let h = &report.hunks[0].hunk;
		assert_eq!(h.search_text, "old line");
		assert_eq!(h.replace_text, "new line");
		assert_eq!(h.start_line_hint, None);
	}

	#[test]
	fn parses_line_hint_range() {
		let input = "<<<<<<< SEARCH @@ 10-12 @@\nfoo\nbar\n=======\nbaz\n>>>>>>> REPLACE\n";
		let report = parse(input);
		let h = &report.hunks[0].hunk;
		assert_eq!(h.start_line_hint, Some(10));
		assert_eq!(h.end_line_hint, Some(12));
	}

	#[test]
	fn parses_single_line_hint() {
		let input = "<<<<<<< SEARCH @@ 5 @@\nfoo\n=======\nbar\n>>>>>>> REPLACE\n";
		let report = parse(input);
		let h = &report.hunks[0].hunk;
		assert_eq!(h.start_line_hint, Some(5));
		assert_eq!(h.end_line_hint, Some(5));
	}

	#[test]
	fn retries_inside_markdown_fence() {
		let input = "```diff\n<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE\n```\n";
		let report = parse(input);
		assert_eq!(report.hunks.len(), 1);
	}

	#[test]
	fn rejects_empty_search() {
		let input = "<<<<<<< SEARCH\n\n=======\nnew\n>>>>>>> REPLACE\n";
		let report = parse(input);
		assert!(report.hunks.is_empty());
		assert_eq!(report.rejections.len(), 1);
		assert_eq!(report.rejections[0].1, ParseRejection::EmptySearch);
	}

	#[test]
	fn rejects_nested_markers() {
		let input = "<<<<<<< SEARCH\nfoo\n>>>>>>> REPLACE\n=======\nnew\n>>>>>>> REPLACE\n";
		let report = parse(input);
		assert!(report.hunks.is_empty());
	}

	#[test]
	fn multiple_blocks_in_order() {
		let input = "<<<<<<< SEARCH\na\n=======\nA\n>>>>>>> REPLACE\ntext between\n<<<<<<< SEARCH\nb\n=======\nB\n>>>>>>> REPLACE\n";
		let report = parse(input);
		assert_eq!(report.hunks.len(), 2);
		assert_eq!(report.hunks[0].hunk.search_text, "a");
		assert_eq!(report.hunks[1].hunk.search_text, "b");
	}

	#[test]
	fn empty_input_yields_empty_report() {
		let report = parse("just some unrelated text");
		assert!(report.is_empty());
		assert!(report.rejections.is_empty());
	}

	#[test]
	fn short_search_emits_warning_not_rejection() {
		let input = "<<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE\n";
		let report = parse(input);
		assert_eq!(report.hunks.len(), 1);
		assert!(report.hunks[0].warnings.contains(&ParseWarning::ShortSearch));
	}
}
