//! Zips a single directory into a single archive.
//!
//! Invoked as `archiver <source_dir> <dest_zip>` by the worker and node
//! runtimes, which own the retry-with-backoff budget (§4.6) around this
//! process — this binary itself makes exactly one attempt and exits
//! non-zero on any failure, so the caller can tell a transient failure
//! from a successful archive without parsing output.

use std::{
	fs::File,
	io::{Read, Write},
	path::Path,
	process::ExitCode,
};
use zip::{write::FileOptions, ZipWriter};

fn main() -> ExitCode {
	let mut args = std::env::args_os().skip(1);
	let (Some(source_dir), Some(dest_zip)) = (args.next(), args.next()) else {
		eprintln!("usage: archiver <source_dir> <dest_zip>");
		return ExitCode::FAILURE;
	};

	match run(Path::new(&source_dir), Path::new(&dest_zip)) {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			eprintln!("archiver: {error}");
			ExitCode::FAILURE
		}
	}
}

fn run(source_dir: &Path, dest_zip: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let out_file = File::create(dest_zip)?;
	let mut writer = ZipWriter::new(out_file);
	let options: FileOptions<()> =
		FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

	for entry in walkdir::WalkDir::new(source_dir).into_iter() {
		let entry = entry?;
		let relative = entry.path().strip_prefix(source_dir)?;
		if relative.as_os_str().is_empty() {
			continue;
		}
		let name = relative.to_string_lossy().replace('\\', "/");

		if entry.file_type().is_dir() {
			writer.add_directory(format!("{name}/"), options)?;
			continue;
		}

		if !entry.file_type().is_file() {
			continue;
		}

		writer.start_file(name, options)?;
		let mut buf = Vec::new();
		File::open(entry.path())?.read_to_end(&mut buf)?;
		writer.write_all(&buf)?;
	}

	writer.finish()?;
	return Ok(());
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zips_nested_files_under_their_relative_path() {
		let root = std::env::temp_dir().join(format!("archiver-test-{}", std::process::id()));
		std::fs::create_dir_all(root.join("sub")).unwrap();
		std::fs::write(root.join("a.txt"), b"hello").unwrap();
		std::fs::write(root.join("sub/b.txt"), b"world").unwrap();

		let dest = root.with_extension("zip");
		run(&root, &dest).unwrap();

		let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
		let mut a = String::new();
		archive.by_name("a.txt").unwrap().read_to_string(&mut a).unwrap();
		let mut b = String::new();
		archive.by_name("sub/b.txt").unwrap().read_to_string(&mut b).unwrap();
		assert_eq!(a, "hello");
		assert_eq!(b, "world");

		std::fs::remove_dir_all(&root).unwrap();
		std::fs::remove_file(&dest).unwrap();
	}

	#[test]
	fn fails_cleanly_on_a_missing_source_dir() {
		let missing = std::env::temp_dir().join("archiver-test-does-not-exist");
		let dest = std::env::temp_dir().join("archiver-test-missing.zip");
		assert!(run(&missing, &dest).is_err());
	}
}
