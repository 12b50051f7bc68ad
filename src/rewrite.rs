// Descriptor rewriting
//
// Turns the file descriptor fetched from the catalog into a self-contained
// compilation unit: package and message overrides applied, the logical file
// name derived from them, and the output path option kept in sync.

use prost_types::{FileDescriptorProto, FileDescriptorSet, FileOptions};

use crate::error::{Error, Result};

/// Extension of schema source files.
pub const SCHEMA_EXTENSION: &str = "proto";

/// Optional renames applied to the fetched descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub package: Option<String>,
    pub message_name: Option<String>,
}

impl Overrides {
    /// Build overrides from raw flag values; empty strings mean "not supplied".
    pub fn new(package: Option<String>, message_name: Option<String>) -> Self {
        Overrides {
            package: package.filter(|p| !p.is_empty()),
            message_name: message_name.filter(|n| !n.is_empty()),
        }
    }
}

/// `foo.bar.baz` -> `foo/bar/baz`
pub fn package_path(package: &str) -> String {
    package.replace('.', "/")
}

/// The logical name of the schema unit holding `message` in `package`.
pub fn canonical_file_name(package: &str, message: &str) -> String {
    let file = format!("{message}.{SCHEMA_EXTENSION}");
    if package.is_empty() {
        file
    } else {
        format!("{}/{file}", package_path(package))
    }
}

/// Extract the sole file of a fetched descriptor set.
pub fn single_file(set: FileDescriptorSet) -> Result<FileDescriptorProto> {
    let mut files = set.file;
    match files.len() {
        1 => Ok(files.remove(0)),
        n => Err(Error::Precondition(format!(
            "expected exactly one file descriptor, got {n}"
        ))),
    }
}

/// Apply `overrides` to `file` and recompute its logical name.
///
/// The name is always recomputed, so a descriptor without overrides still ends
/// up at `<package path>/<message>.proto`.
pub fn rewrite(mut file: FileDescriptorProto, overrides: &Overrides) -> Result<FileDescriptorProto> {
    if file.message_type.len() != 1 {
        return Err(Error::Precondition(format!(
            "file {:?} must define exactly one message, found {}",
            file.name(),
            file.message_type.len()
        )));
    }

    if let Some(package) = &overrides.package {
        file.package = Some(package.clone());
        file.options = Some(FileOptions {
            go_package: Some(package_path(package)),
            ..Default::default()
        });
    }

    let message = &mut file.message_type[0];
    if let Some(name) = &overrides.message_name {
        message.name = Some(name.clone());
    }
    let message_name = message.name().to_string();
    if message_name.is_empty() {
        return Err(Error::Precondition("dataset message has no name".to_string()));
    }

    file.name = Some(canonical_file_name(file.package(), &message_name));
    Ok(file)
}
