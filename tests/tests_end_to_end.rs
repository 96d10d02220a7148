//! End-to-end scenarios driving the real `Aggregator` + `FsApplier` over scratch files.

type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

use mergehunk::matching::find;
use mergehunk::{Aggregator, AggregatorConfig, FsApplier, MatcherOptions, NullSink, Strategy};

mod test_support;

fn write(dir: &simple_fs::SPath, path: &str, content: &str) -> Result<()> {
	let full = dir.join(path);
	simple_fs::ensure_file_dir(full.as_std_path())?;
	std::fs::write(full.as_std_path(), content)?;
	Ok(())
}

#[test]
fn exact_single_hunk() -> Result<()> {
	// -- Setup & Fixtures
	let base_dir = test_support::new_out_dir_path("exact_single_hunk")?;
	write(&base_dir, "f.txt", "alpha\nbeta\ngamma\n")?;
	let raw = "<<<<<<< SEARCH\nbeta\n=======\nBETA\n>>>>>>> REPLACE\n";

	// -- Exec
	let applier = FsApplier::new(base_dir.as_str())?;
	let mut aggregator = Aggregator::new(applier, NullSink, AggregatorConfig::default());
	aggregator.queue("f.txt", raw)?;
	let result = aggregator.flush("f.txt")?;

	// -- Check
	assert_eq!(result.applied, 1);
	assert!(result.success);
	let content = simple_fs::read_to_string(base_dir.join("f.txt").as_std_path())?;
	assert_eq!(content, "alpha\nBETA\ngamma\n");

	Ok(())
}

#[test]
fn crlf_file_lf_replacement_preserves_line_endings() -> Result<()> {
	// -- Setup & Fixtures
	let base_dir = test_support::new_out_dir_path("crlf_file_lf_replacement")?;
	write(&base_dir, "f.txt", "a\r\nb\r\nc\r\n")?;
	let raw = "<<<<<<< SEARCH\nb\n=======\nx\ny\n>>>>>>> REPLACE\n";

	// -- Exec
	let applier = FsApplier::new(base_dir.as_str())?;
	let mut aggregator = Aggregator::new(applier, NullSink, AggregatorConfig::default());
	aggregator.queue("f.txt", raw)?;
	let result = aggregator.flush("f.txt")?;

	// -- Check
	assert!(result.success);
	let content = simple_fs::read_to_string(base_dir.join("f.txt").as_std_path())?;
	assert_eq!(content, "a\r\nx\r\ny\r\nc\r\n");
	assert!(!content.contains("\n\n"), "must not introduce a bare LF next to a CR");

	Ok(())
}

#[test]
fn whitespace_only_drift_hits_tier_two_at_high_confidence() {
	// -- Setup & Fixtures
	let document = "fn f() {\n\t\treturn v;\n}\n";
	let search = "    return v;";

	// -- Exec
	let outcome = find(document, search, None, &MatcherOptions::default());

	// -- Check
	match outcome {
		mergehunk::MatchOutcome::Found { strategy, confidence, .. } => {
			assert_eq!(strategy, Strategy::WhitespaceNormalized);
			assert!(confidence >= 0.9, "expected high confidence, got {confidence}");
		}
		mergehunk::MatchOutcome::Miss => panic!("expected a hit"),
	}
}

#[test]
fn two_hunks_same_file_apply_atomically_in_one_flush() -> Result<()> {
	// -- Setup & Fixtures
	let base_dir = test_support::new_out_dir_path("two_hunks_same_file")?;
	write(&base_dir, "f.txt", "one\ntwo\nthree\nfour\n")?;
	let raw = concat!(
		"<<<<<<< SEARCH\n",
		"one\n",
		"=======\n",
		"ONE\n",
		">>>>>>> REPLACE\n",
		"<<<<<<< SEARCH\n",
		"three\n",
		"=======\n",
		"THREE\n",
		">>>>>>> REPLACE\n",
	);

	// -- Exec
	let applier = FsApplier::new(base_dir.as_str())?;
	let mut aggregator = Aggregator::new(applier, NullSink, AggregatorConfig::default());
	let outcome = aggregator.queue("f.txt", raw)?;
	let result = aggregator.flush("f.txt")?;

	// -- Check
	assert_eq!(outcome.block_count, 2);
	assert_eq!(result.applied, 2);
	let content = simple_fs::read_to_string(base_dir.join("f.txt").as_std_path())?;
	assert_eq!(content, "ONE\ntwo\nTHREE\nfour\n");

	Ok(())
}

#[test]
fn offset_drift_is_avoided_by_descending_order_application() -> Result<()> {
	// -- Setup & Fixtures
	// A 40-byte search earlier in the file and a 5-byte search later; if the engine
	// applied ascending it would target stale post-edit coordinates for the second hunk.
	let base_dir = test_support::new_out_dir_path("offset_drift_avoidance")?;
	let early = "0123456789abcdefghijklmnopqrstuvwxyzEARLY"; // 42 bytes
	let late = "LATER";
	let filler_a = "-".repeat(20);
	let filler_b = "-".repeat(40);
	let doc = format!("{filler_a}\n{early}\n{filler_b}\n{late}\ntail\n");
	write(&base_dir, "f.txt", &doc)?;

	let raw = format!(
		"<<<<<<< SEARCH\n{early}\n=======\nX\n>>>>>>> REPLACE\n<<<<<<< SEARCH\n{late}\n=======\nYYYYYYYYYY\n>>>>>>> REPLACE\n",
	);

	// -- Exec
	let applier = FsApplier::new(base_dir.as_str())?;
	let mut aggregator = Aggregator::new(applier, NullSink, AggregatorConfig::default());
	aggregator.queue("f.txt", &raw)?;
	let result = aggregator.flush("f.txt")?;

	// -- Check
	assert_eq!(result.applied, 2, "both non-overlapping hunks must apply: {result:?}");
	let content = simple_fs::read_to_string(base_dir.join("f.txt").as_std_path())?;
	assert!(content.contains('X'));
	assert!(content.contains("YYYYYYYYYY"));
	assert!(!content.contains(early));
	assert!(!content.contains(late));

	Ok(())
}

#[test]
fn cross_file_flush_flushes_previous_file_before_queueing_the_next() -> Result<()> {
	// -- Setup & Fixtures
	let base_dir = test_support::new_out_dir_path("cross_file_flush")?;
	write(&base_dir, "f1.txt", "hello\n")?;
	write(&base_dir, "f2.txt", "world\n")?;
	let raw1 = "<<<<<<< SEARCH\nhello\n=======\nHELLO\n>>>>>>> REPLACE\n";
	let raw2 = "<<<<<<< SEARCH\nworld\n=======\nWORLD\n>>>>>>> REPLACE\n";

	// -- Exec
	let applier = FsApplier::new(base_dir.as_str())?;
	let mut aggregator = Aggregator::new(applier, NullSink, AggregatorConfig::default());
	aggregator.queue("f1.txt", raw1)?;
	// Queuing a second file must flush f1 first (single-active-file invariant).
	aggregator.queue("f2.txt", raw2)?;
	let result2 = aggregator.flush_all()?;

	// -- Check
	let f1_content = simple_fs::read_to_string(base_dir.join("f1.txt").as_std_path())?;
	let f2_content = simple_fs::read_to_string(base_dir.join("f2.txt").as_std_path())?;
	assert_eq!(f1_content, "HELLO\n");
	assert_eq!(f2_content, "WORLD\n");
	assert_eq!(result2.len(), 1, "only f2 remained queued for flush_all: {result2:?}");

	Ok(())
}

#[test]
fn nested_marker_in_search_body_is_rejected() {
	// -- Setup & Fixtures
	let raw = "<<<<<<< SEARCH\nconst s = \"<<<<<<< SEARCH\";\n=======\nnew\n>>>>>>> REPLACE\n";

	// -- Exec
	let report = mergehunk::parse(raw);

	// -- Check
	assert!(report.hunks.is_empty());
	assert_eq!(report.rejections.len(), 1);
}

#[test]
fn hint_range_outside_document_clamps_and_still_matches() {
	// -- Setup & Fixtures
	let document = "a\nb\nc\nd\ne\n";

	// -- Exec: a hint pointing far past the end of a 5-line document.
	let outcome = find(document, "c", Some((900, 910)), &MatcherOptions::default());

	// -- Check
	assert!(outcome.is_found(), "expansion must clamp and fall back to a full-document scan");
}
