// Generation request construction and validation
//
// The request is checked against the plugin protocol's structural rules before
// any backend sees it, then linked with prost-reflect as a final consistency
// check.

use std::collections::HashSet;

use prost_reflect::DescriptorPool;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::{DescriptorProto, FileDescriptorProto, FileDescriptorSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request lists no file to generate")]
    NothingToGenerate,

    #[error("file to generate {0} is not part of the descriptor set")]
    MissingFileToGenerate(String),

    #[error("duplicate file {0} in descriptor set")]
    DuplicateFile(String),

    #[error("file {file} imports {dependency}, which is not part of the descriptor set")]
    MissingDependency { file: String, dependency: String },

    #[error("field {field} in {file} refers to unknown type {type_name}")]
    UnresolvedType {
        file: String,
        field: String,
        type_name: String,
    },

    /// Linking the descriptor set failed.
    #[error("{0}")]
    Descriptor(String),
}

/// Package `proto_file` into a request generating `file_to_generate`.
pub fn build_request(
    file_to_generate: String,
    proto_file: Vec<FileDescriptorProto>,
    parameter: Option<String>,
) -> Result<CodeGeneratorRequest, ValidationError> {
    let request = CodeGeneratorRequest {
        file_to_generate: vec![file_to_generate],
        parameter,
        proto_file,
        ..Default::default()
    };
    validate(&request)?;
    Ok(request)
}

/// Check that `request` is self-contained.
pub fn validate(request: &CodeGeneratorRequest) -> Result<(), ValidationError> {
    if request.file_to_generate.is_empty() {
        return Err(ValidationError::NothingToGenerate);
    }

    let mut names = HashSet::new();
    for file in &request.proto_file {
        if !names.insert(file.name()) {
            return Err(ValidationError::DuplicateFile(file.name().to_string()));
        }
    }

    for name in &request.file_to_generate {
        if !names.contains(name.as_str()) {
            return Err(ValidationError::MissingFileToGenerate(name.clone()));
        }
    }

    for file in &request.proto_file {
        if let Some(dependency) = file.dependency.iter().find(|d| !names.contains(d.as_str())) {
            return Err(ValidationError::MissingDependency {
                file: file.name().to_string(),
                dependency: dependency.clone(),
            });
        }
    }

    let types = defined_types(&request.proto_file);
    for file in &request.proto_file {
        let scope = package_scope(file.package());
        for message in &file.message_type {
            check_message_references(file, message, &scope, &types)?;
        }
    }

    let set = FileDescriptorSet {
        file: request.proto_file.clone(),
    };
    DescriptorPool::from_file_descriptor_set(set)
        .map_err(|e| ValidationError::Descriptor(e.to_string()))?;

    Ok(())
}

fn package_scope(package: &str) -> String {
    if package.is_empty() {
        String::new()
    } else {
        format!(".{package}")
    }
}

/// Fully qualified names (with leading dot) of every message and enum in `files`.
fn defined_types(files: &[FileDescriptorProto]) -> HashSet<String> {
    fn add_message(types: &mut HashSet<String>, scope: &str, message: &DescriptorProto) {
        let full_name = format!("{scope}.{}", message.name());
        for nested in &message.nested_type {
            add_message(types, &full_name, nested);
        }
        for e in &message.enum_type {
            types.insert(format!("{full_name}.{}", e.name()));
        }
        types.insert(full_name);
    }

    let mut types = HashSet::new();
    for file in files {
        let scope = package_scope(file.package());
        for message in &file.message_type {
            add_message(&mut types, &scope, message);
        }
        for e in &file.enum_type {
            types.insert(format!("{scope}.{}", e.name()));
        }
    }
    types
}

fn check_message_references(
    file: &FileDescriptorProto,
    message: &DescriptorProto,
    scope: &str,
    types: &HashSet<String>,
) -> Result<(), ValidationError> {
    let message_scope = format!("{scope}.{}", message.name());
    for field in &message.field {
        let type_name = field.type_name();
        if type_name.is_empty() {
            continue;
        }
        if resolve(&message_scope, type_name, types).is_none() {
            return Err(ValidationError::UnresolvedType {
                file: file.name().to_string(),
                field: format!("{}.{}", message_scope.trim_start_matches('.'), field.name()),
                type_name: type_name.to_string(),
            });
        }
    }
    for nested in &message.nested_type {
        check_message_references(file, nested, &message_scope, types)?;
    }
    Ok(())
}

/// Resolve a type reference the way protoc does: absolute names as-is,
/// relative names from the innermost scope outwards.
fn resolve(scope: &str, type_name: &str, types: &HashSet<String>) -> Option<String> {
    if type_name.starts_with('.') {
        return types.contains(type_name).then(|| type_name.to_string());
    }
    let mut scope = scope;
    loop {
        let candidate = format!("{scope}.{type_name}");
        if types.contains(&candidate) {
            return Some(candidate);
        }
        if scope.is_empty() {
            return None;
        }
        scope = scope.rfind('.').map_or("", |i| &scope[..i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::well_known;
    use prost_types::FieldDescriptorProto;
    use prost_types::field_descriptor_proto::{Label, Type};

    fn dataset_file() -> FileDescriptorProto {
        let field = |name: &str, number: i32, r#type: Type, type_name: Option<&str>| FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(r#type as i32),
            type_name: type_name.map(str::to_string),
            ..Default::default()
        };
        FileDescriptorProto {
            name: Some("tilebox/v1/Granule.proto".to_string()),
            package: Some("tilebox.v1".to_string()),
            dependency: vec![
                well_known::TIMESTAMP_FILE.to_string(),
                well_known::WELL_KNOWN_TYPES_FILE.to_string(),
            ],
            message_type: vec![DescriptorProto {
                name: Some("Granule".to_string()),
                field: vec![
                    field("time", 1, Type::Message, Some(".google.protobuf.Timestamp")),
                    field("id", 2, Type::Message, Some(".datasets.v1.UUID")),
                    field("granule_name", 3, Type::String, None),
                ],
                ..Default::default()
            }],
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_request() {
        let file = dataset_file();
        let request = build_request(file.name().to_string(), well_known::assemble(file), None).unwrap();
        assert_eq!(request.file_to_generate, ["tilebox/v1/Granule.proto"]);
        assert_eq!(request.proto_file.len(), 4);
    }

    #[test]
    fn test_missing_file_to_generate() {
        let files = well_known::assemble(dataset_file());
        let err = build_request("other.proto".to_string(), files, None).unwrap_err();
        assert_eq!(err, ValidationError::MissingFileToGenerate("other.proto".to_string()));
    }

    #[test]
    fn test_duplicate_file() {
        let mut files = well_known::assemble(dataset_file());
        files.push(well_known::duration());
        let err = build_request("tilebox/v1/Granule.proto".to_string(), files, None).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateFile(well_known::DURATION_FILE.to_string()));
    }

    #[test]
    fn test_missing_dependency() {
        let file = dataset_file();
        let files = vec![well_known::timestamp(), file];
        let err = build_request("tilebox/v1/Granule.proto".to_string(), files, None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingDependency { ref dependency, .. }
            if dependency == well_known::WELL_KNOWN_TYPES_FILE));
    }

    #[test]
    fn test_unresolved_type() {
        let mut file = dataset_file();
        file.message_type[0].field[1].type_name = Some(".datasets.v1.Missing".to_string());
        let err = build_request(file.name().to_string(), well_known::assemble(file), None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnresolvedType {
                file: "tilebox/v1/Granule.proto".to_string(),
                field: "tilebox.v1.Granule.id".to_string(),
                type_name: ".datasets.v1.Missing".to_string(),
            }
        );
    }

    #[test]
    fn test_relative_resolution() {
        let types: HashSet<String> = [".a.b.Outer", ".a.b.Outer.Inner", ".a.Top"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(resolve(".a.b.Outer", "Inner", &types).as_deref(), Some(".a.b.Outer.Inner"));
        assert_eq!(resolve(".a.b.Outer", "Top", &types).as_deref(), Some(".a.Top"));
        assert_eq!(resolve(".a.b.Outer", "Nope", &types), None);
    }
}
