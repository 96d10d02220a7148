use mergehunk::parse;
use std::fs;

type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

fn main() -> Result<()> {
	let file_path = "demos/data/changes-simple.md";
	let content = fs::read_to_string(file_path)?;

	let report = parse(&content);

	if !report.hunks.is_empty() {
		println!("{:#?}", report.hunks);
	} else {
		println!("No hunks found in {file_path}");
	}
	for (block_index, rejection) in &report.rejections {
		println!("block #{block_index} rejected: {}", rejection.reason());
	}

	Ok(())
}
