use crate::hunk::Strategy;

/// One append-only diagnostic record. The aggregator emits these at the seams
/// named below; what a host does with them (persist, display, discard) is out
/// of scope for this crate.
#[derive(Debug, Clone)]
pub enum DiagnosticEvent {
	Received {
		file_path: String,
		raw_length: usize,
		contains_search_marker: bool,
		contains_replace_marker: bool,
		line_count: usize,
	},
	Parsed {
		file_path: String,
		block_count: usize,
	},
	MatchAttempt {
		file_path: String,
		block_index: usize,
		strategy: Strategy,
		confidence: f32,
	},
	MatchFail {
		file_path: String,
		block_index: usize,
		/// The best similar region's own text, if the fuzzy scorer found one worth naming.
		text: Option<String>,
		similarity: Option<f32>,
		/// 1-indexed line the similar region starts at.
		line: Option<usize>,
		full_file_length: usize,
	},
	Result {
		file_path: String,
		success: bool,
		applied: usize,
		total: usize,
		errors: Vec<String>,
	},
}

/// Receives diagnostic events as the engine produces them. Injected per
/// `Aggregator` instance rather than reached for as a global singleton.
pub trait DiagnosticSink {
	fn record(&self, event: DiagnosticEvent);
}

/// Drops every record. Useful for embedding the engine where diagnostics aren't
/// wanted at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
	fn record(&self, _event: DiagnosticEvent) {}
}

/// Emits one `tracing` event per record, at a level matching its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
	fn record(&self, event: DiagnosticEvent) {
		match event {
			DiagnosticEvent::Received {
				file_path,
				raw_length,
				contains_search_marker,
				contains_replace_marker,
				line_count,
			} => {
				tracing::debug!(file_path, raw_length, contains_search_marker, contains_replace_marker, line_count, "received edit text");
			}
			DiagnosticEvent::Parsed { file_path, block_count } => {
				tracing::debug!(file_path, block_count, "parsed hunks");
			}
			DiagnosticEvent::MatchAttempt {
				file_path,
				block_index,
				strategy,
				confidence,
			} => {
				tracing::debug!(file_path, block_index, %strategy, confidence, "match attempt succeeded");
			}
			DiagnosticEvent::MatchFail {
				file_path,
				block_index,
				text,
				similarity,
				line,
				full_file_length,
			} => {
				tracing::warn!(file_path, block_index, text, similarity, line, full_file_length, "match attempt failed");
			}
			DiagnosticEvent::Result {
				file_path,
				success,
				applied,
				total,
				errors,
			} => {
				tracing::info!(file_path, success, applied, total, ?errors, "flush result");
			}
		}
	}
}
