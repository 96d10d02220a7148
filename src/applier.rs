use simple_fs::SPath;

use crate::error::{Error, Result};

/// A document symbol exposed by a host editor, used by recovery's optional
/// symbol-provider fallback.
#[derive(Debug, Clone)]
pub struct Symbol {
	pub name: String,
	pub kind: SymbolKind,
	pub detail: Option<String>,
	pub start_line: usize, // 1-indexed
	pub end_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
	Class,
	Interface,
	Function,
	Other,
}

/// The minimal contract the matching/recovery/aggregation core depends on. A real
/// editor integration implements this over its own document model; this crate
/// ships `FsApplier`, a filesystem-backed implementation good enough to drive the
/// engine standalone and to exercise it in integration tests.
pub trait Applier {
	fn read(&self, path: &str) -> Result<String>;
	fn exists(&self, path: &str) -> bool;
	/// Apply every (byte_range, replacement) pair to `path` as a single atomic
	/// edit. Pairs are already sorted by the caller in descending start order.
	fn apply_atomic(&self, path: &str, edits: &[(std::ops::Range<usize>, String)]) -> Result<()>;

	fn document_symbols(&self, _path: &str) -> Option<Vec<Symbol>> {
		None
	}

	fn show_diff(&self, _original: &str, _modified: &str, _title: &str) {}
}

/// Filesystem-backed `Applier` scoped to a workspace root. Every read and write
/// is checked against the root before touching disk.
pub struct FsApplier {
	workspace_root: SPath,
}

impl FsApplier {
	pub fn new(workspace_root: impl Into<String>) -> Result<Self> {
		let root = SPath::new(workspace_root.into()).into_collapsed();
		Ok(Self { workspace_root: root })
	}

	pub fn workspace_root(&self) -> &str {
		self.workspace_root.as_str()
	}

	fn resolve(&self, path: &str) -> Result<SPath> {
		let candidate = self.workspace_root.join(path).into_collapsed();
		if !candidate.as_str().starts_with(self.workspace_root.as_str()) {
			return Err(Error::path_escape(candidate.as_str(), self.workspace_root.as_str()));
		}
		Ok(candidate)
	}
}

impl Applier for FsApplier {
	fn read(&self, path: &str) -> Result<String> {
		let resolved = self.resolve(path)?;
		if !resolved.exists() {
			return Err(Error::file_missing(resolved.as_str()));
		}
		Ok(simple_fs::read_to_string(resolved.as_std_path())?)
	}

	fn exists(&self, path: &str) -> bool {
		match self.resolve(path) {
			Ok(resolved) => resolved.exists(),
			Err(_) => false,
		}
	}

	fn apply_atomic(&self, path: &str, edits: &[(std::ops::Range<usize>, String)]) -> Result<()> {
		let resolved = self.resolve(path)?;
		let mut content = self.read(path)?;
		// Caller already sorted descending by start; applying in that order keeps
		// every not-yet-applied range's coordinates valid.
		for (range, replacement) in edits {
			if range.start > content.len() || range.end > content.len() || range.start > range.end {
				return Err(Error::apply_rejected(resolved.as_str()));
			}
			content.replace_range(range.clone(), replacement);
		}
		simple_fs::ensure_file_dir(resolved.as_std_path())?;
		std::fs::write(resolved.as_std_path(), content).map_err(|e| Error::io_write_file(resolved.as_str(), e))?;
		Ok(())
	}
}
