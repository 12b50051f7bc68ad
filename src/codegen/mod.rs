// Built-in Rust code generation backend
//
// Renders prost-compatible message types for the files a CodeGeneratorRequest
// asks for, in-process.

use anyhow::{Result, anyhow};
use prost_types::FileDescriptorProto;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

use crate::backend::GenerationBackend;
use crate::rewrite::SCHEMA_EXTENSION;
use crate::well_known::WELL_KNOWN_TYPES_PACKAGE;

mod comments;
mod generator;
mod names;

pub use generator::TypeIndex;

/// Extension of generated Rust files.
pub const OUTPUT_EXTENSION: &str = "pb.rs";

/// Mapping from proto package (or type) prefixes to Rust paths, for types
/// that live outside the generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternPaths {
    paths: Vec<(String, String)>,
}

impl Default for ExternPaths {
    fn default() -> Self {
        let mut paths = ExternPaths::empty();
        paths.insert(".google.protobuf", "::prost_types");
        paths.insert(&format!(".{WELL_KNOWN_TYPES_PACKAGE}"), "crate::datasets::v1");
        paths
    }
}

impl ExternPaths {
    pub fn empty() -> Self {
        ExternPaths { paths: Vec::new() }
    }

    /// Map `proto_path` (`.pkg` or `.pkg.Type`, leading dot optional) to `rust_path`.
    /// A later mapping for the same proto path replaces the earlier one.
    pub fn insert(&mut self, proto_path: &str, rust_path: &str) {
        let proto_path = format!(".{}", proto_path.trim_start_matches('.'));
        let rust_path = rust_path.trim_end_matches("::").to_string();
        self.paths.retain(|(proto, _)| *proto != proto_path);
        self.paths.push((proto_path, rust_path));
    }

    /// Rust path for a fully qualified proto type name, using the longest
    /// matching prefix.
    pub fn resolve(&self, type_name: &str) -> Option<String> {
        let (prefix, rust) = self
            .paths
            .iter()
            .filter(|(proto, _)| {
                type_name
                    .strip_prefix(proto.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
            })
            .max_by_key(|(proto, _)| proto.len())?;

        let rest: Vec<&str> = type_name[prefix.len()..]
            .split('.')
            .filter(|part| !part.is_empty())
            .collect();
        let Some((last, modules)) = rest.split_last() else {
            return Some(rust.clone());
        };
        let mut path = rust.clone();
        for module in modules {
            path.push_str("::");
            path.push_str(&names::module_name(module));
        }
        path.push_str("::");
        path.push_str(&names::type_name(last));
        Some(path)
    }
}

/// `tilebox/v1/Granule.proto` -> `tilebox/v1/Granule.pb.rs`
pub fn output_name(proto_name: &str) -> String {
    let stem = proto_name
        .strip_suffix(&format!(".{SCHEMA_EXTENSION}"))
        .unwrap_or(proto_name);
    format!("{stem}.{OUTPUT_EXTENSION}")
}

/// Emits prost message types; needs no external tools.
#[derive(Debug, Clone, Default)]
pub struct RustBackend {
    extern_paths: ExternPaths,
}

impl RustBackend {
    pub fn new(extern_paths: ExternPaths) -> Self {
        Self { extern_paths }
    }

    fn generate_files(&self, request: &CodeGeneratorRequest) -> Result<Vec<File>> {
        let types = TypeIndex::new(&request.proto_file);
        request
            .file_to_generate
            .iter()
            .map(|name| {
                let file = request
                    .proto_file
                    .iter()
                    .find(|f| f.name() == name)
                    .ok_or_else(|| anyhow!("file {name} not found in request"))?;
                let content = generate(file, &types, &self.extern_paths)?;
                Ok(File {
                    name: Some(output_name(name)),
                    content: Some(content),
                    ..Default::default()
                })
            })
            .collect()
    }
}

impl GenerationBackend for RustBackend {
    fn generate(&self, request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
        Ok(match self.generate_files(&request) {
            Ok(file) => CodeGeneratorResponse {
                file,
                supported_features: Some(Feature::Proto3Optional as u64),
                ..Default::default()
            },
            Err(e) => CodeGeneratorResponse {
                error: Some(format!("{e:#}")),
                ..Default::default()
            },
        })
    }
}

/// Generate formatted Rust source for one file
pub fn generate(file: &FileDescriptorProto, types: &TypeIndex, extern_paths: &ExternPaths) -> Result<String> {
    let tokens = generator::generate_file(file, types, extern_paths)?;

    let syntax_tree = syn::parse2(tokens)?;
    Ok(format!(
        "// @generated by tilebox-generate from {}. DO NOT EDIT.\n\n{}",
        file.name(),
        prettyplease::unparse(&syntax_tree)
    ))
}
