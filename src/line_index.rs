use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use twox_hash::xxhash32::Hasher as XxHash32;

type FastMap<K, V> = HashMap<K, V, BuildHasherDefault<XxHash32>>;

/// Normalize one line the way the matcher compares lines: tabs become two spaces,
/// both ends are trimmed, and case is folded. Used only for the lookup index and
/// for line-vs-line comparisons — never for byte-range math, which always goes
/// back to the original bytes.
pub fn normalize_line(line: &str) -> String {
	line.replace('\t', "  ").trim().to_lowercase()
}

/// An immutable index over a document's lines, built once per matcher call.
///
/// Holds the original lines (for byte-offset reconstruction) alongside a
/// normalized-line -> line-indices map for O(1) average lookup of candidate
/// start positions.
#[derive(Debug)]
pub struct LineIndex {
	lines: Vec<String>,
	normalized: Vec<String>,
	by_normalized: FastMap<String, Vec<usize>>,
	/// Byte offset of the start of each line within the original text.
	line_starts: Vec<usize>,
	uses_crlf: bool,
}

impl LineIndex {
	pub fn build(text: &str) -> Self {
		let uses_crlf = text.contains("\r\n");
		let mut lines = Vec::new();
		let mut line_starts = Vec::new();
		let mut offset = 0usize;
		for raw_line in text.split_inclusive('\n') {
			line_starts.push(offset);
			offset += raw_line.len();
			let trimmed = raw_line.strip_suffix('\n').unwrap_or(raw_line);
			let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
			lines.push(trimmed.to_string());
		}
		// A trailing line with no terminator still needs an entry when text doesn't end in '\n'.
		if text.is_empty() || text.ends_with('\n') {
			// split_inclusive already produced every line; nothing to add.
		}

		let normalized: Vec<String> = lines.iter().map(|l| normalize_line(l)).collect();
		let mut by_normalized: FastMap<String, Vec<usize>> = FastMap::default();
		for (idx, norm) in normalized.iter().enumerate() {
			by_normalized.entry(norm.clone()).or_default().push(idx);
		}

		Self {
			lines,
			normalized,
			by_normalized,
			line_starts,
			uses_crlf,
		}
	}

	pub fn line_count(&self) -> usize {
		self.lines.len()
	}

	pub fn line(&self, idx: usize) -> Option<&str> {
		self.lines.get(idx).map(|s| s.as_str())
	}

	pub fn normalized_line(&self, idx: usize) -> Option<&str> {
		self.normalized.get(idx).map(|s| s.as_str())
	}

	pub fn uses_crlf(&self) -> bool {
		self.uses_crlf
	}

	/// Byte offset where line `idx` starts in the original document.
	pub fn line_byte_start(&self, idx: usize) -> Option<usize> {
		self.line_starts.get(idx).copied()
	}

	/// Byte offset just past the end of line `idx`'s content, excluding its terminator.
	pub fn line_byte_end(&self, idx: usize) -> Option<usize> {
		let start = self.line_byte_start(idx)?;
		Some(start + self.lines.get(idx)?.len())
	}

	/// All line indices whose normalized form equals the normalized query line.
	pub fn find_line(&self, query: &str) -> &[usize] {
		self.by_normalized.get(&normalize_line(query)).map(|v| v.as_slice()).unwrap_or(&[])
	}

	/// Starting indices where every line of `query_lines` matches the file's lines
	/// (normalized), starting at that index.
	pub fn find_sequence_start(&self, query_lines: &[&str]) -> Vec<usize> {
		if query_lines.is_empty() {
			return Vec::new();
		}
		let candidates = self.find_line(query_lines[0]);
		let mut out = Vec::new();
		'outer: for &start in candidates {
			if start + query_lines.len() > self.lines.len() {
				continue;
			}
			for (i, q) in query_lines.iter().enumerate() {
				let file_norm = &self.normalized[start + i];
				let q_norm = normalize_line(q);
				let both_blank = file_norm.is_empty() && q_norm.is_empty();
				if *file_norm != q_norm && !both_blank {
					continue 'outer;
				}
			}
			out.push(start);
		}
		out
	}
}
