use std::path::PathBuf;

/// Suffix of in-flight writes; never reported by `list`.
const TEMP_SUFFIX: &str = ".partial";

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> std::io::Result<()>;
    fn size(&self, ident: &str) -> std::io::Result<u64>;
    /// File names directly under `dir` ("" for the root).
    fn list(&self, dir: &str) -> Vec<String>;
}

/// Returns true if `value` can be used as a single path component:
/// not empty, no separators, no parent references, no control characters.
/// Commas are rejected as well, model replies list filenames comma-separated.
pub fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(&['/', '\\', ','][..])
        && !value.chars().any(char::is_control)
        && !value.ends_with(TEMP_SUFFIX)
}

/// Storage identifier of an owner's file.
pub fn owner_ident(owner_id: &str, filename: &str) -> String {
    format!("{owner_id}/{filename}")
}

#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> std::io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    fn path_of(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        self.path_of(ident).is_file()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_of(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.path_of(ident);
        let dir = path.parent().unwrap_or(self.base_dir.as_path());
        std::fs::create_dir_all(dir)?;

        let temp_path = dir.join(format!(
            "{}{TEMP_SUFFIX}",
            rusty_ulid::generate_ulid_string()
        ));

        let result = std::fs::write(&temp_path, data)
            .and_then(|_| std::fs::rename(&temp_path, &path));

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }

        result
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.path_of(ident))
    }

    fn size(&self, ident: &str) -> std::io::Result<u64> {
        std::fs::metadata(self.path_of(ident)).map(|meta| meta.len())
    }

    fn list(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.base_dir.join(dir))
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let path = entry.path();
                        if path.is_file() {
                            path.file_name()
                                .and_then(|name| name.to_str())
                                .filter(|name| !name.ends_with(TEMP_SUFFIX))
                                .map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_components() {
        assert!(is_safe_component("invoice.pdf"));
        assert!(is_safe_component("my photo (1).jpg"));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("../etc/passwd"));
        assert!(!is_safe_component("a/b.txt"));
        assert!(!is_safe_component("a\\b.txt"));
        assert!(!is_safe_component("upload.partial"));
        assert!(!is_safe_component("a, b.pdf"));
        assert!(!is_safe_component("line\nbreak.txt"));
        assert!(!is_safe_component("cr\r.txt"));
        assert!(!is_safe_component("nul\0.txt"));
        assert!(!is_safe_component("tab\t.txt"));
    }

    #[test]
    fn test_write_read_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path().to_str().unwrap()).unwrap();

        store.write(&owner_ident("alice", "b.txt"), b"bee").unwrap();
        store.write(&owner_ident("alice", "a.txt"), b"a").unwrap();
        store.write(&owner_ident("bob", "c.txt"), b"c").unwrap();

        assert_eq!(store.list("alice"), vec!["a.txt", "b.txt"]);
        assert_eq!(store.list("bob"), vec!["c.txt"]);
        assert!(store.list("nobody").is_empty());

        assert_eq!(store.read("alice/b.txt").unwrap(), b"bee");
        assert_eq!(store.size("alice/b.txt").unwrap(), 3);

        store.delete("alice/b.txt").unwrap();
        assert!(!store.exists("alice/b.txt"));
        assert_eq!(store.list("alice"), vec!["a.txt"]);
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path().to_str().unwrap()).unwrap();

        // a directory in the way makes the final rename fail
        std::fs::create_dir_all(dir.path().join("alice/taken.txt")).unwrap();

        assert!(store.write("alice/taken.txt", b"data").is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("alice"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path().to_str().unwrap()).unwrap();

        store.write("config.yaml", b"one").unwrap();
        store.write("config.yaml", b"two").unwrap();

        assert_eq!(store.read("config.yaml").unwrap(), b"two");
        assert_eq!(store.list(""), vec!["config.yaml"]);
    }
}
