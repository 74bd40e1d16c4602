mod annotations;
mod cosign;
mod errors;
mod reference;
mod shell_completions;
mod verify;

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::annotations::{Annotation, AnnotationSet};
use crate::cosign::{RegistryCosign, RegistryOptions};

/// Verify cosign signatures attached to container images
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log debug information to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The action to execute
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Verify a signature on the supplied container image
    #[command(override_usage = "cosign-verify verify --key <KEY> <IMAGE>")]
    Verify {
        /// Path to the PEM encoded public key
        ///
        /// Required; setting COSIGN_PUBLIC_KEY satisfies it when --key is omitted.
        #[arg(
            short = 'k',
            long,
            env = "COSIGN_PUBLIC_KEY",
            value_parser = NonEmptyStringValueParser::new()
        )]
        key: String,

        /// Whether to check the claims found in the signed payloads
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        check_claims: bool,

        /// Extra key=value pairs the signed payload must carry
        #[arg(short = 'a', long = "annotation", value_name = "KEY=VALUE")]
        annotations: Vec<Annotation>,

        /// Bearer token used to authenticate against the registry
        #[arg(long, env = "COSIGN_REGISTRY_TOKEN", hide_env_values = true)]
        registry_token: Option<String>,

        /// Reach the registry over plain HTTP
        #[arg(long)]
        insecure_registry: bool,

        /// The image to verify
        image: String,
    },
    /// Generate shell completions
    ShellCompletions {
        /// The shell to generate completions for
        shell: clap_complete::aot::Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.action {
        Action::Verify {
            key,
            check_claims,
            annotations,
            registry_token,
            insecure_registry,
            image,
        } => {
            let cosign = RegistryCosign::new(RegistryOptions {
                token: registry_token,
                insecure: insecure_registry,
            })
            .context("Failed to start registry client")?;
            let annotations: AnnotationSet = annotations.into_iter().collect();
            verify::command(&cosign, key, image, check_claims, annotations)
        }
        Action::ShellCompletions { shell } => shell_completions::command(shell),
    }
}
