// The generation pipeline
//
// Fetched -> Rewritten -> Assembled -> RequestBuilt -> Generated -> Written.
// Each stage either advances or fails terminally.

use std::path::{Path, PathBuf};

use prost_types::compiler::CodeGeneratorResponse;
use prost_types::compiler::code_generator_response::File;

use crate::backend::GenerationBackend;
use crate::error::{Error, Result};
use crate::fetch::DatasetFetcher;
use crate::request::build_request;
use crate::rewrite::{Overrides, rewrite, single_file};
use crate::well_known::assemble;
use crate::writer::write_artifact;

/// Per-invocation settings of the pipeline.
#[derive(Debug, Clone)]
pub struct Options {
    pub overrides: Overrides,
    /// Root directory the generated file is written under.
    pub out_dir: PathBuf,
    /// Parameter string handed to the backend.
    pub parameter: Option<String>,
}

impl Options {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Options {
            overrides: Overrides::default(),
            out_dir: out_dir.into(),
            parameter: None,
        }
    }
}

/// Generate the message type of dataset `slug` and write it below `options.out_dir`.
/// Returns the path of the written file.
pub async fn generate_dataset<F, B>(fetcher: &F, backend: &B, slug: &str, options: &Options) -> Result<PathBuf>
where
    F: DatasetFetcher,
    B: GenerationBackend + ?Sized,
{
    let set = fetcher.fetch(slug).await.map_err(|source| Error::Fetch {
        slug: slug.to_string(),
        source,
    })?;
    tracing::info!(slug, files = set.file.len(), "dataset descriptor fetched");

    generate_from_descriptor(single_file(set)?, backend, options)
}

/// Everything after the fetch: rewrite, assemble, generate and write.
pub fn generate_from_descriptor<B>(
    fetched: prost_types::FileDescriptorProto,
    backend: &B,
    options: &Options,
) -> Result<PathBuf>
where
    B: GenerationBackend + ?Sized,
{
    let file = rewrite(fetched, &options.overrides)?;
    let file_name = file.name().to_string();
    tracing::info!(file = %file_name, package = file.package(), "descriptor rewritten");

    let request = build_request(file_name.clone(), assemble(file), options.parameter.clone())?;
    tracing::debug!(
        file = %file_name,
        files = request.proto_file.len(),
        "generation request built"
    );

    let response = backend
        .generate(request)
        .map_err(|e| Error::Generation(format!("{e:#}")))?;
    let generated = first_file(response)?;

    write(&options.out_dir, &generated)
}

/// The first generated file of a successful response; extra files are discarded.
pub fn first_file(response: CodeGeneratorResponse) -> Result<File> {
    if let Some(error) = response.error {
        return Err(Error::Generation(error));
    }
    let mut files = response.file.into_iter();
    let first = files
        .next()
        .ok_or_else(|| Error::Generation("backend returned no files".to_string()))?;
    for extra in files {
        tracing::warn!(file = extra.name(), "discarding additional generated file");
    }
    Ok(first)
}

fn write(out_dir: &Path, file: &File) -> Result<PathBuf> {
    let path = write_artifact(out_dir, file)?;
    tracing::info!(path = %path.display(), "file written");
    Ok(path)
}
