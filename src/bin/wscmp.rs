use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use wsfmt::compare;
use wsfmt::input;

#[derive(Parser)]
#[command(author, version, about = "Lexical comparator for WS source trees")]
struct Cli {
    /// Directory or file containing original files
    orig: PathBuf,
    /// Directory or file containing modified files e.g. reformatted files
    modified: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    match walk(&cli.orig, &cli.orig, &cli.modified) {
        Ok(true) => {}
        Ok(false) => process::exit(3),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

// Visits every entry under the original root, pairing it with the path
// re-rooted under the modified root. Returns false on the first
// inequivalent file pair.
fn walk(path: &Path, orig_root: &Path, mod_root: &Path) -> io::Result<bool> {
    let rel = path.strip_prefix(orig_root).unwrap_or(path);
    let paired = mod_root.join(rel);

    let meta = match fs::metadata(&paired) {
        Ok(meta) => meta,
        Err(err) => {
            println!("{}: {}", paired.display(), err);
            return Ok(true);
        }
    };
    let is_dir = path.is_dir();
    if meta.is_dir() != is_dir {
        let (dir, file) = if is_dir {
            (path, paired.as_path())
        } else {
            (paired.as_path(), path)
        };
        println!("File directory mismatch: Directory: {:?} File: {:?}", dir, file);
        return Ok(true);
    }

    if is_dir {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(err) => {
                println!("{}: {}", path.display(), err);
                return Ok(true);
            }
        };
        let mut entries: Vec<_> = entries.collect::<Result<_, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            if !walk(&entry.path(), orig_root, mod_root)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    compare_files(path, &paired)
}

fn compare_files(original: &Path, modified: &Path) -> io::Result<bool> {
    let orig_text = match input::read_source(original) {
        Ok(text) => text,
        Err(err) => {
            println!("{err}");
            return Ok(true);
        }
    };
    let mod_text = match input::read_source(modified) {
        Ok(text) => text,
        Err(err) => {
            println!("{err}");
            return Ok(true);
        }
    };

    let result = compare::compare_sources(&orig_text, &mod_text);
    for error in &result.lex_errors {
        println!("{error}");
    }
    if let Some((left, right)) = result.mismatch {
        println!(
            "Value mismatch {}: {} is not {}: {}",
            original.display(),
            left,
            modified.display(),
            right
        );
        return Ok(false);
    }
    Ok(true)
}
