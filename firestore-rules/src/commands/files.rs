use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use walkdir::{DirEntry, WalkDir};

use crate::rules::errors::Error;

pub(crate) fn read_file_content(file: File) -> Result<String, std::io::Error> {
    let mut file_content = String::new();
    let mut buf_reader = BufReader::new(file);
    buf_reader.read_to_string(&mut file_content)?;
    Ok(file_content)
}

///
/// Every file under `file` (or `file` itself) accepted by `filter`, directories
/// are always descended into. Entries that cannot be read are skipped with a
/// warning.
///
pub(crate) fn get_files_with_filter<S, F>(
    file: &str,
    sort: S,
    filter: F,
) -> Result<Vec<PathBuf>, Error>
where
    S: FnMut(&DirEntry, &DirEntry) -> Ordering + Send + Sync + 'static,
    F: Fn(&DirEntry) -> bool,
{
    let path = PathBuf::from(file);
    if !path.exists() {
        return Err(Error::FileNotFoundError(file.to_string()));
    }

    let mut selected = Vec::with_capacity(10);
    let walker = WalkDir::new(file).sort_by(sort).into_iter();
    let dir_check = |entry: &DirEntry| {
        if entry.path().is_dir() {
            return true;
        }
        filter(entry)
    };
    for entry in walker.filter_entry(dir_check) {
        match entry {
            Ok(entry) => {
                if entry.path().is_file() {
                    selected.push(entry.into_path());
                }
            }
            Err(e) => log::warn!("skipping unreadable entry under {}: {}", file, e),
        }
    }

    Ok(selected)
}

pub(crate) fn alphabetical(first: &DirEntry, second: &DirEntry) -> Ordering {
    first.file_name().cmp(second.file_name())
}

pub(crate) fn has_extension(entry: &DirEntry, extensions: &[&str]) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| extensions.iter().any(|ext| name.ends_with(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_reported() {
        let result = get_files_with_filter("/no/such/rules/dir", alphabetical, |_| true);
        assert!(matches!(result, Err(Error::FileNotFoundError(_))));
    }

    #[test]
    fn walks_resources_for_rules_files() {
        let dir = format!("{}/resources/check", env!("CARGO_MANIFEST_DIR"));
        let files =
            get_files_with_filter(&dir, alphabetical, |entry| has_extension(entry, &[".rules"]))
                .unwrap();
        assert!(!files.is_empty());
        assert!(files
            .iter()
            .all(|f| f.extension().map_or(false, |ext| ext == "rules")));
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }
}
