use simple_fs::SPath;

use crate::applier::Applier;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::error::{Error, Result};
use crate::hunk::{Hunk, MatchOutcome};
use crate::matcher;
use crate::options::AggregatorConfig;
use crate::parser;
use crate::recovery;

/// Outcome of queuing one batch of SEARCH/REPLACE text against a file.
#[derive(Debug, Clone)]
pub struct QueueOutcome {
	pub file_path: String,
	pub block_count: usize,
	/// Hunks rejected by the parser's own validation (§ parser), reported here
	/// rather than silently dropped.
	pub rejections: Vec<(usize, String)>,
}

/// Final outcome of applying every queued hunk for one file as a single atomic edit.
#[derive(Debug, Clone, Default)]
pub struct FlushResult {
	pub success: bool,
	pub applied: usize,
	pub total: usize,
	pub errors: Vec<String>,
}

/// Batches hunks per file, matches and (optionally) recovers each one, then
/// applies all accepted edits for a file as a single atomic, descending-order
/// replace. Enforces the single-active-file invariant: enqueuing a hunk for a
/// different file than the one currently queued flushes the previous file first.
pub struct Aggregator<A: Applier, S: DiagnosticSink> {
	applier: A,
	sink: S,
	config: AggregatorConfig,
	queues: Vec<(String, Vec<Hunk>)>,
}

impl<A: Applier, S: DiagnosticSink> Aggregator<A, S> {
	pub fn new(applier: A, sink: S, config: AggregatorConfig) -> Self {
		Self {
			applier,
			sink,
			config,
			queues: Vec::new(),
		}
	}

	fn normalize_path(path: &str) -> String {
		SPath::new(path.replace('\\', "/")).into_collapsed().as_str().to_string()
	}

	/// Parse `raw_text` and enqueue its hunks against `path`. Flushes whichever
	/// other file currently holds queued hunks before starting the new queue, per
	/// the single-active-file rule.
	pub fn queue(&mut self, path: &str, raw_text: &str) -> Result<QueueOutcome> {
		let report = parser::parse(raw_text);
		self.sink.record(DiagnosticEvent::Received {
			file_path: path.to_string(),
			raw_length: raw_text.len(),
			contains_search_marker: raw_text.contains("<<<<<<< SEARCH"),
			contains_replace_marker: raw_text.contains(">>>>>>> REPLACE"),
			line_count: raw_text.lines().count(),
		});

		if report.hunks.is_empty() {
			return Err(Error::ParseEmpty);
		}

		self.sink.record(DiagnosticEvent::Parsed {
			file_path: path.to_string(),
			block_count: report.hunks.len(),
		});

		let key = Self::normalize_path(path);
		let other_keys: Vec<String> = self.queues.iter().filter(|(k, h)| !h.is_empty() && *k != key).map(|(k, _)| k.clone()).collect();
		for other_key in other_keys {
			self.flush(&other_key)?;
		}

		let entry = self.queues.iter_mut().find(|(k, _)| *k == key);
		let new_hunks: Vec<Hunk> = report.hunks.into_iter().map(|p| p.hunk).collect();
		let block_count = new_hunks.len();
		match entry {
			Some((_, hunks)) => hunks.extend(new_hunks),
			None => self.queues.push((key.clone(), new_hunks)),
		}

		Ok(QueueOutcome {
			file_path: key,
			block_count,
			rejections: report.rejections.into_iter().map(|(i, r)| (i, r.reason().to_string())).collect(),
		})
	}

	/// Apply every hunk queued for `path` (normalized) as a single atomic edit.
	pub fn flush(&mut self, path: &str) -> Result<FlushResult> {
		let key = Self::normalize_path(path);
		let hunks = match self.queues.iter_mut().find(|(k, _)| *k == key) {
			Some((_, hunks)) => std::mem::take(hunks),
			None => return Ok(FlushResult { success: true, ..Default::default() }),
		};
		let result = self.flush_hunks(&key, hunks);
		self.queues.retain(|(k, h)| k != &key || !h.is_empty());
		result
	}

	/// Flush every file with queued hunks, in insertion order.
	pub fn flush_all(&mut self) -> Result<Vec<(String, FlushResult)>> {
		let keys: Vec<String> = self.queues.iter().filter(|(_, h)| !h.is_empty()).map(|(k, _)| k.clone()).collect();
		let mut out = Vec::new();
		for key in keys {
			out.push((key.clone(), self.flush(&key)?));
		}
		Ok(out)
	}

	/// Drop all queued state without applying any of it.
	pub fn clear(&mut self) {
		self.queues.clear();
	}

	fn flush_hunks(&mut self, key: &str, hunks: Vec<Hunk>) -> Result<FlushResult> {
		let total = hunks.len();
		if total == 0 {
			return Ok(FlushResult { success: true, ..Default::default() });
		}

		let document = match self.applier.read(key) {
			Ok(doc) => doc,
			// A path escaping the workspace root is not a per-file failure to accumulate —
			// it aborts the flush outright (§ error taxonomy: PathEscape -> abort flush).
			Err(e @ Error::PathEscape { .. }) => return Err(e),
			Err(_) => {
				let errors = vec![format!("file not found: {key}")];
				self.sink.record(DiagnosticEvent::Result {
					file_path: key.to_string(),
					success: false,
					applied: 0,
					total,
					errors: errors.clone(),
				});
				return Ok(FlushResult {
					success: false,
					applied: 0,
					total,
					errors,
				});
			}
		};

		let mut accepted: Vec<(usize, std::ops::Range<usize>, String)> = Vec::new();
		let mut errors = Vec::new();

		for (block_index, hunk) in hunks.iter().enumerate() {
			match matcher::find(&document, &hunk.search_text, hunk.line_range_hint(), &self.config.matcher) {
				MatchOutcome::Found { byte_range, strategy, confidence } => {
					self.sink.record(DiagnosticEvent::MatchAttempt {
						file_path: key.to_string(),
						block_index,
						strategy,
						confidence,
					});
					let replacement = matcher::adapt_line_endings(&document, &hunk.replace_text);
					accepted.push((block_index, byte_range, replacement));
				}
				MatchOutcome::Miss => {
					let mut suggestions = recovery::attempt(&document, &hunk.search_text, &self.config);
					let already_confident = suggestions.first().is_some_and(|s| s.auto_recommended);
					if !already_confident
						&& let Some(symbols) = self.applier.document_symbols(key)
						&& let Some(symbol_hit) = recovery::symbol_fallback(&document, &hunk.search_text, &symbols, &self.config)
					{
						suggestions.push(symbol_hit);
						suggestions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
						suggestions.truncate(5);
					}
					match suggestions.first() {
						Some(best) if best.auto_recommended => {
							let replacement = matcher::adapt_line_endings(&document, &hunk.replace_text);
							accepted.push((block_index, best.byte_range.clone(), replacement));
						}
						_ => {
							let hint = matcher::best_similar_region(&document, &hunk.search_text);
							self.sink.record(DiagnosticEvent::MatchFail {
								file_path: key.to_string(),
								block_index,
								text: hint.as_ref().map(|h| h.text.clone()),
								similarity: hint.as_ref().map(|h| h.similarity),
								line: hint.as_ref().map(|h| h.line),
								full_file_length: document.len(),
							});
							let message = match &hint {
								Some(h) => format!("block #{block_index}: SEARCH not found ({:.0}% similar exists)", h.similarity * 100.0),
								None => format!("block #{block_index}: SEARCH not found"),
							};
							errors.push(message);
						}
					}
				}
			}
		}

		let accepted = drop_overlaps(accepted, &mut errors);

		let mut edits: Vec<(std::ops::Range<usize>, String)> = accepted.into_iter().map(|(_, range, text)| (range, text)).collect();
		// Descending start order: later-in-file edits are applied first so earlier
		// byte offsets stay valid for the edits still to come.
		edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));

		let mut applied = 0usize;
		if !edits.is_empty() {
			match self.applier.apply_atomic(key, &edits) {
				Ok(()) => applied = edits.len(),
				Err(e) => errors.push(e.to_string()),
			}
		}
		let success = applied == total;

		self.sink.record(DiagnosticEvent::Result {
			file_path: key.to_string(),
			success,
			applied,
			total,
			errors: errors.clone(),
		});

		Ok(FlushResult {
			success,
			applied,
			total,
			errors,
		})
	}
}

/// Two accepted edits overlap iff neither ends strictly before the other begins.
/// On overlap, keep only the earliest-in-insertion-order edit in the group and
/// fail the rest — an overlapping edit is never silently applied. `accepted` is
/// already in insertion (block_index) order, so a single linear pass that keeps
/// the first-seen member of each overlapping cluster is enough.
fn drop_overlaps(accepted: Vec<(usize, std::ops::Range<usize>, String)>, errors: &mut Vec<String>) -> Vec<(usize, std::ops::Range<usize>, String)> {
	let mut kept: Vec<(usize, std::ops::Range<usize>, String)> = Vec::new();
	for (block_index, range, text) in accepted {
		let overlaps = kept.iter().any(|(_, kept_range, _)| overlap(kept_range, &range));
		if overlaps {
			errors.push(format!("block #{block_index}: dropped, overlaps an earlier hunk"));
		} else {
			kept.push((block_index, range, text));
		}
	}
	kept
}

fn overlap(a: &std::ops::Range<usize>, b: &std::ops::Range<usize>) -> bool {
	!(a.end <= b.start || b.end <= a.start)
}
