// Comment extraction from SourceCodeInfo
//
// Builds a map from dotted name paths to comment strings by walking
// the numeric paths in SourceCodeInfo.Location through the descriptor tree.

use std::collections::HashMap;

use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

// Field numbers of the repeated descriptor fields a location path can step through.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const MESSAGE_ONEOF_DECL: i32 = 8;
const ENUM_VALUE: i32 = 2;

/// Extract comments from a FileDescriptorProto's source_code_info.
/// Returns a map from dotted name path (e.g., "MyMessage.my_field") to comment string.
pub fn extract_comments(file: &FileDescriptorProto) -> HashMap<String, String> {
    let mut comments = HashMap::new();

    let Some(source_code_info) = &file.source_code_info else {
        return comments;
    };

    for location in &source_code_info.location {
        // Prefer leading, fall back to trailing
        let Some(comment) = location
            .leading_comments
            .as_deref()
            .or(location.trailing_comments.as_deref())
        else {
            continue;
        };

        if let Some(name_path) = walk_file(file, &location.path) {
            let trimmed = trim_comment(comment);
            if !trimmed.is_empty() {
                comments.insert(name_path, trimmed);
            }
        }
    }

    comments
}

fn walk_file(file: &FileDescriptorProto, path: &[i32]) -> Option<String> {
    match path {
        [FILE_MESSAGE_TYPE, index, rest @ ..] => {
            let message = file.message_type.get(usize::try_from(*index).ok()?)?;
            walk_message(message, rest, message.name().to_string())
        }
        [FILE_ENUM_TYPE, index, rest @ ..] => {
            let e = file.enum_type.get(usize::try_from(*index).ok()?)?;
            walk_enum(e, rest, e.name().to_string())
        }
        _ => None,
    }
}

fn walk_message(message: &DescriptorProto, path: &[i32], prefix: String) -> Option<String> {
    if path.is_empty() {
        return Some(prefix);
    }
    let child = |name: &str| format!("{prefix}.{name}");
    match path {
        [MESSAGE_FIELD, index] => {
            let field = message.field.get(usize::try_from(*index).ok()?)?;
            Some(child(field.name()))
        }
        [MESSAGE_ONEOF_DECL, index] => {
            let oneof = message.oneof_decl.get(usize::try_from(*index).ok()?)?;
            Some(child(oneof.name()))
        }
        [MESSAGE_NESTED_TYPE, index, rest @ ..] => {
            let nested = message.nested_type.get(usize::try_from(*index).ok()?)?;
            walk_message(nested, rest, child(nested.name()))
        }
        [MESSAGE_ENUM_TYPE, index, rest @ ..] => {
            let e = message.enum_type.get(usize::try_from(*index).ok()?)?;
            walk_enum(e, rest, child(e.name()))
        }
        _ => None,
    }
}

fn walk_enum(e: &EnumDescriptorProto, path: &[i32], prefix: String) -> Option<String> {
    match path {
        [] => Some(prefix),
        [ENUM_VALUE, index] => {
            let value = e.value.get(usize::try_from(*index).ok()?)?;
            Some(format!("{prefix}.{}", value.name()))
        }
        _ => None,
    }
}

/// Trim and clean up a comment string.
fn trim_comment(comment: &str) -> String {
    comment
        .lines()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
