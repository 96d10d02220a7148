use mergehunk::{Aggregator, AggregatorConfig, FsApplier, NullSink};
use simple_fs::{SPath, SaferRemoveOptions, ensure_dir, read_to_string, safer_remove_dir};

const FILE: &str = "demos/data/changes-with-code-fence.md";
const TARGET: &str = "greeter.js";

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let base_dir = SPath::new("demos/.out/c02-apply");

	// -- Setup & Clean
	// We clean the target directory to ensure a fresh application of the changes.
	if base_dir.exists() {
		safer_remove_dir(&base_dir, SaferRemoveOptions::default().with_must_contain_any(&["demos/"]))?;
	}
	ensure_dir(&base_dir)?;
	std::fs::write(
		base_dir.join(TARGET).as_std_path(),
		"function greet(name) {\n\tconsole.log(\"Hello, \" + name);\n}\n",
	)?;

	// -- Load and Queue
	let md_content = read_to_string(FILE)?;
	let applier = FsApplier::new(base_dir.as_str())?;
	let mut aggregator = Aggregator::new(applier, NullSink, AggregatorConfig::default());
	let outcome = aggregator.queue(TARGET, &md_content)?;
	println!("Found {} hunk(s) for {}", outcome.block_count, outcome.file_path);
	for (block_index, reason) in &outcome.rejections {
		println!("  - block #{block_index} rejected: {reason}");
	}

	// -- Apply
	let result = aggregator.flush(TARGET)?;

	// -- Print Result
	println!("\nApplied changes to: {}", base_dir.join(TARGET));
	println!("  - success: {:<5} applied {}/{}", result.success, result.applied, result.total);
	for err in &result.errors {
		println!("   Error: {err}");
	}

	Ok(())
}
