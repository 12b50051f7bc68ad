// Code generation backends
//
// A backend consumes a validated CodeGeneratorRequest and answers with a
// CodeGeneratorResponse, exactly like a protoc plugin.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

pub trait GenerationBackend {
    /// `Err` is a transport failure; failures of the generator itself are
    /// reported through `CodeGeneratorResponse::error`.
    fn generate(&self, request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse>;
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for &B {
    fn generate(&self, request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
        (**self).generate(request)
    }
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for Box<B> {
    fn generate(&self, request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
        (**self).generate(request)
    }
}

/// Runs an external `protoc-gen-*` executable.
#[derive(Debug, Clone)]
pub struct PluginBackend {
    program: PathBuf,
}

impl PluginBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl GenerationBackend for PluginBackend {
    fn generate(&self, request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
        let program = self.program.display();
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run plugin {program}"))?;

        let input = request.encode_to_vec();
        let mut stdin = child.stdin.take().context("plugin stdin unavailable")?;
        // A plugin may exit before reading its request, or fill its stderr pipe
        // while we are still writing; feed stdin from its own thread.
        let writer = thread::spawn(move || match stdin.write_all(&input) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            result => result,
        });

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for plugin {program}"))?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("writing the request to plugin {program} panicked"))?;
        if !output.status.success() {
            bail!(
                "plugin {program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.with_context(|| format!("failed to write request to plugin {program}"))?;

        CodeGeneratorResponse::decode(output.stdout.as_slice())
            .with_context(|| format!("failed to decode response from plugin {program}"))
    }
}
