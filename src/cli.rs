// Command-line configuration

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use crate::codegen::ExternPaths;
use crate::fetch::DEFAULT_ENDPOINT;
use crate::pipeline::Options;
use crate::rewrite::Overrides;

/// Generate Tilebox datasets types for Rust.
#[derive(Debug, Parser)]
#[command(name = "tilebox-generate", version, about, arg_required_else_help = true)]
pub struct Cli {
    /// A Tilebox API key
    #[arg(long, env = "TILEBOX_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// A valid dataset slug e.g. 'open_data.copernicus.sentinel1_sar'
    #[arg(long)]
    pub dataset: String,

    /// A directory to write the output to
    #[arg(long, default_value = "protogen")]
    pub out: PathBuf,

    /// Package name
    #[arg(long, default_value = "tilebox.v1")]
    pub package: String,

    /// Override the message name
    #[arg(long)]
    pub name: Option<String>,

    /// Tilebox API endpoint
    #[arg(long, env = "TILEBOX_API_URL", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Run this protoc plugin instead of the built-in Rust generator
    #[arg(long)]
    pub plugin: Option<PathBuf>,

    /// Parameter passed to the generator, e.g. plugin options
    #[arg(long)]
    pub plugin_opt: Option<String>,

    /// Rust path for a proto package or type outside the generated file, as PROTO=RUST
    #[arg(long = "extern-path", value_name = "PROTO=RUST")]
    pub extern_paths: Vec<String>,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub dataset: String,
    pub endpoint: String,
    pub plugin: Option<PathBuf>,
    pub extern_paths: ExternPaths,
    pub options: Options,
}

impl Cli {
    pub fn config(&self) -> Result<Config> {
        if self.api_key.trim().is_empty() {
            bail!("an API key is required");
        }
        if self.dataset.trim().is_empty() {
            bail!("a dataset slug is required");
        }

        let mut extern_paths = ExternPaths::default();
        for mapping in &self.extern_paths {
            let (proto, rust) = parse_extern_path(mapping)
                .with_context(|| format!("invalid --extern-path {mapping:?}"))?;
            extern_paths.insert(proto, rust);
        }

        Ok(Config {
            api_key: self.api_key.clone(),
            dataset: self.dataset.trim().to_string(),
            endpoint: self.endpoint.clone(),
            plugin: self.plugin.clone(),
            extern_paths,
            options: Options {
                overrides: Overrides::new(Some(self.package.clone()), self.name.clone()),
                out_dir: self.out.clone(),
                parameter: self.plugin_opt.clone(),
            },
        })
    }
}

fn parse_extern_path(mapping: &str) -> Result<(&str, &str)> {
    let Some((proto, rust)) = mapping.split_once('=') else {
        bail!("expected PROTO=RUST");
    };
    let (proto, rust) = (proto.trim(), rust.trim());
    if proto.trim_start_matches('.').is_empty() || rust.is_empty() {
        bail!("both the proto path and the Rust path must be non-empty");
    }
    Ok((proto, rust))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from([
            "tilebox-generate",
            "--api-key",
            "key",
            "--dataset",
            "open_data.copernicus.sentinel1_sar",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.dataset, "open_data.copernicus.sentinel1_sar");
        assert_eq!(config.options.out_dir, PathBuf::from("protogen"));
        assert_eq!(config.options.overrides.package.as_deref(), Some("tilebox.v1"));
        assert_eq!(config.options.overrides.message_name, None);
        assert!(config.plugin.is_none());
        assert_eq!(config.extern_paths, ExternPaths::default());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "tilebox-generate",
            "--api-key=key",
            "--dataset=open_data.copernicus.sentinel1_sar",
            "--out=gen",
            "--package=acme.schemas",
            "--name=Sentinel1Sar",
            "--extern-path",
            ".datasets.v1=::tilebox_datasets",
            "--plugin-opt=paths=source_relative",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.options.out_dir, PathBuf::from("gen"));
        assert_eq!(config.options.overrides.package.as_deref(), Some("acme.schemas"));
        assert_eq!(config.options.overrides.message_name.as_deref(), Some("Sentinel1Sar"));
        assert_eq!(config.options.parameter.as_deref(), Some("paths=source_relative"));
        assert_eq!(
            config.extern_paths.resolve(".datasets.v1.UUID").as_deref(),
            Some("::tilebox_datasets::Uuid")
        );
    }

    #[test]
    fn test_empty_package_keeps_fetched_one() {
        let cli = Cli::parse_from(["tilebox-generate", "--api-key=key", "--dataset=x", "--package="]);
        assert_eq!(cli.config().unwrap().options.overrides.package, None);
    }

    #[test]
    fn test_invalid_values() {
        let cli = Cli::parse_from(["tilebox-generate", "--api-key=key", "--dataset= "]);
        assert!(cli.config().is_err());

        let cli = Cli::parse_from(["tilebox-generate", "--api-key=key", "--dataset=x", "--extern-path=nope"]);
        assert!(cli.config().is_err());
    }

    #[test]
    fn test_missing_required() {
        assert!(Cli::try_parse_from(["tilebox-generate", "--api-key=key"]).is_err());

        // The key may come from the environment, so check the declaration itself.
        let command = Cli::command();
        let api_key = command.get_arguments().find(|a| a.get_id() == "api_key").unwrap();
        assert!(api_key.is_required_set());
        assert_eq!(api_key.get_env(), Some(std::ffi::OsStr::new("TILEBOX_API_KEY")));

        let cli = Cli::parse_from(["tilebox-generate", "--api-key=", "--dataset=x"]);
        assert!(cli.config().is_err());
    }
}
