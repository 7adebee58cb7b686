//! Atomic file replacement: write-to-temp-then-rename in the target's
//! directory, so a concurrent reader never observes a half-written file.

use anyhow::Context;
use camino::Utf8Path;
use std::io::Write;

pub fn write_atomic(path: &Utf8Path, contents: &str) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("no parent directory for {path}"))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {dir}"))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("write temp file for {path}"))?;
    tmp.persist(path)
        .with_context(|| format!("rename temp file over {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn replaces_existing_contents() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let target = root.join("note.md");

        fs_err::write(&target, "old").unwrap();
        write_atomic(&target, "new").unwrap();
        assert_eq!(fs_err::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn creates_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let target = root.join("fresh.md");

        write_atomic(&target, "contents").unwrap();
        assert_eq!(fs_err::read_to_string(&target).unwrap(), "contents");
    }
}
