// Artifact writing

use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use prost_types::compiler::code_generator_response::File;

use crate::error::{Error, Result};

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o640;

/// Write `file` to `<out_dir>/<file name>`, creating missing directories and
/// replacing an existing file. Returns the written path.
pub fn write_artifact(out_dir: &Path, file: &File) -> Result<PathBuf> {
    let name = Path::new(file.name());
    let path = out_dir.join(name);

    // The name comes from the backend; keep it inside the output directory.
    let escapes = name.as_os_str().is_empty()
        || name
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::Write {
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "generated file name must be a relative path inside the output directory",
            ),
        });
    }

    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    write_file(&path, file.content().as_bytes()).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir)
}

fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut out = options.open(path)?;
    out.write_all(content)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn generated(name: &str, content: &str) -> File {
        File {
            name: Some(name.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("protogen");
        let path = write_artifact(&out, &generated("tilebox/v1/Granule.pb.rs", "pub struct Granule {}\n")).unwrap();
        assert_eq!(path, out.join("tilebox/v1/Granule.pb.rs"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "pub struct Granule {}\n");
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = generated("a/b.pb.rs", "short");
        write_artifact(dir.path(), &generated("a/b.pb.rs", "a much longer first version")).unwrap();
        let path = write_artifact(dir.path(), &file).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
        assert_eq!(fs::read_dir(dir.path().join("a")).unwrap().count(), 1);
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../evil.rs", "/etc/evil.rs", ""] {
            let err = write_artifact(dir.path(), &generated(name, "x")).unwrap_err();
            assert!(matches!(err, Error::Write { .. }), "{name}: {err}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), &generated("x/y.pb.rs", "")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o002, 0, "world-writable: {mode:o}");
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_creation_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let err = write_artifact(dir.path(), &generated("blocker/y.pb.rs", "")).unwrap_err();
        match err {
            Error::CreateDir { path, .. } => assert_eq!(path, dir.path().join("blocker")),
            other => panic!("unexpected error {other}"),
        }
    }
}
