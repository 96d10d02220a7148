use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[display("{_0}")]
	#[from(String, &String, &str)]
	Custom(String),

	// -- Parser
	#[display("No SEARCH/REPLACE blocks found in input")]
	ParseEmpty,
	#[display("Hunk #{block_index} rejected: {reason}")]
	ParseValidation { block_index: usize, reason: String },

	// -- Aggregator / path policy
	#[display("Path '{target}' escapes workspace root '{workspace_root}'")]
	PathEscape { target: String, workspace_root: String },

	// -- Applier
	#[display("File not found: {path}")]
	FileMissing { path: String },
	#[display("Host rejected the atomic apply for '{path}'")]
	ApplyRejected { path: String },

	// -- Matcher / Recovery (reported as data, not propagated, but kept for completeness)
	#[display("SEARCH text not found in '{path}' (block #{block_index})")]
	MatchMiss { path: String, block_index: usize },

	// -- IO plumbing
	#[display("Read file failed: {_0}")]
	IoReadFile(PathAndCause),
	#[display("Write file failed: {_0}")]
	IoWriteFile(PathAndCause),
	#[display("Create dir failed: {_0}")]
	IoCreateDir(PathAndCause),
	#[display("Delete file failed: {_0}")]
	IoDeleteFile(PathAndCause),
	#[display("Rename path failed: {from_path} -> {to_path}, cause: {cause}")]
	IoRenamePath {
		from_path: String,
		to_path: String,
		cause: String,
	},

	#[display("simple_fs error: {cause}")]
	SimpleFs { cause: String },
}

#[derive(Debug, Clone, Display)]
#[display("{path}, cause: {cause}")]
pub struct PathAndCause {
	pub path: String,
	pub cause: String,
}

// region:    --- Custom

impl Error {
	pub fn parse_validation(block_index: usize, reason: impl Into<String>) -> Self {
		Self::ParseValidation {
			block_index,
			reason: reason.into(),
		}
	}

	pub fn path_escape(target: impl Into<String>, workspace_root: impl Into<String>) -> Self {
		Self::PathEscape {
			target: target.into(),
			workspace_root: workspace_root.into(),
		}
	}

	pub fn file_missing(path: impl Into<String>) -> Self {
		Self::FileMissing { path: path.into() }
	}

	pub fn apply_rejected(path: impl Into<String>) -> Self {
		Self::ApplyRejected { path: path.into() }
	}

	pub fn match_miss(path: impl Into<String>, block_index: usize) -> Self {
		Self::MatchMiss {
			path: path.into(),
			block_index,
		}
	}

	pub fn io_read_file(path: impl Into<String>, err: impl std::error::Error) -> Self {
		Self::IoReadFile(PathAndCause {
			path: path.into(),
			cause: err.to_string(),
		})
	}

	pub fn io_write_file(path: impl Into<String>, err: impl std::error::Error) -> Self {
		Self::IoWriteFile(PathAndCause {
			path: path.into(),
			cause: err.to_string(),
		})
	}

	pub fn io_create_dir(path: impl Into<String>, err: impl std::error::Error) -> Self {
		Self::IoCreateDir(PathAndCause {
			path: path.into(),
			cause: err.to_string(),
		})
	}

	pub fn io_delete_file(path: impl Into<String>, err: impl std::error::Error) -> Self {
		Self::IoDeleteFile(PathAndCause {
			path: path.into(),
			cause: err.to_string(),
		})
	}

	pub fn io_rename_path(from_path: impl Into<String>, to_path: impl Into<String>, err: impl std::error::Error) -> Self {
		Self::IoRenamePath {
			from_path: from_path.into(),
			to_path: to_path.into(),
			cause: err.to_string(),
		}
	}

	pub fn simple_fs(err: impl std::error::Error) -> Self {
		Self::SimpleFs { cause: err.to_string() }
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate

// region:    --- Froms

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Custom(err.to_string())
	}
}

impl From<simple_fs::Error> for Error {
	fn from(err: simple_fs::Error) -> Self {
		Self::simple_fs(err)
	}
}

// endregion: --- Froms
