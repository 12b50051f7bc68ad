#![allow(dead_code)]

use std::cell::RefCell;

use anyhow::Result;
use prost_types::compiler::code_generator_response::File;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};

use tilebox_generate::well_known::{TIMESTAMP_FILE, WELL_KNOWN_TYPES_FILE};
use tilebox_generate::{DatasetFetcher, FetchError, GenerationBackend};

fn field(name: &str, number: i32, r#type: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(r#type as i32),
        type_name: type_name.map(str::to_string),
        ..Default::default()
    }
}

/// A file descriptor shaped like the ones the catalog serves.
pub fn sentinel1_file(message_name: &str) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("dataset.proto".to_string()),
        package: Some("datasets.open_data".to_string()),
        dependency: vec![TIMESTAMP_FILE.to_string(), WELL_KNOWN_TYPES_FILE.to_string()],
        message_type: vec![DescriptorProto {
            name: Some(message_name.to_string()),
            field: vec![
                field("time", 1, Type::Message, Some(".google.protobuf.Timestamp")),
                field("id", 2, Type::Message, Some(".datasets.v1.UUID")),
                field("granule_name", 3, Type::String, None),
                field("geometry", 4, Type::Message, Some(".datasets.v1.Geometry")),
                field("polarization", 5, Type::Enum, Some(".datasets.v1.Polarization")),
                field("orbit_number", 6, Type::Int64, None),
            ],
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn sentinel1_set(message_name: &str) -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![sentinel1_file(message_name)],
    }
}

/// Serves a fixed descriptor set, or a fetch error when `set` is `None`.
pub struct FakeFetcher {
    pub set: Option<FileDescriptorSet>,
}

impl DatasetFetcher for FakeFetcher {
    async fn fetch(&self, slug: &str) -> Result<FileDescriptorSet, FetchError> {
        self.set.clone().ok_or_else(|| FetchError::Api {
            endpoint: "fake".to_string(),
            status: 404,
            code: "not_found".to_string(),
            message: format!("dataset {slug} not found"),
        })
    }
}

/// Records requests and answers with a canned response.
pub struct FakeBackend {
    pub response: std::result::Result<CodeGeneratorResponse, String>,
    pub requests: RefCell<Vec<CodeGeneratorRequest>>,
}

impl FakeBackend {
    pub fn files(files: &[(&str, &str)]) -> Self {
        let file = files
            .iter()
            .map(|(name, content)| File {
                name: Some(name.to_string()),
                content: Some(content.to_string()),
                ..Default::default()
            })
            .collect();
        Self::responding(CodeGeneratorResponse {
            file,
            ..Default::default()
        })
    }

    pub fn failing(message: &str) -> Self {
        Self::responding(CodeGeneratorResponse {
            error: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn broken(message: &str) -> Self {
        FakeBackend {
            response: Err(message.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn responding(response: CodeGeneratorResponse) -> Self {
        FakeBackend {
            response: Ok(response),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl GenerationBackend for FakeBackend {
    fn generate(&self, request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
        self.requests.borrow_mut().push(request);
        self.response.clone().map_err(anyhow::Error::msg)
    }
}
