// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ember - developer tooling for the ember JavaScript engine
//!
//! ## Commands
//!
//! - `disasm`: generate bytecode for a JSON AST and print its listing
//! - `encode` / `decode`: run the string codecs on command line text
//! - `case`: lower or upper case mapping

mod cli;
mod config;

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ember_engine::ast::{self, Program};
use ember_engine::compiler::disassemble;
use ember_engine::string::{self, JsString};
use ember_engine::{GeneratorOptions, generate};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{CaseArgs, CaseMode, Cli, Codec, CodecArgs, Commands, DisasmArgs};
use config::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "ember=debug,ember_engine=debug"
    } else {
        "ember=warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<String> {
    match &cli.command {
        Commands::Disasm(args) => {
            let config = Config::load(cli.config.as_deref())?;
            disasm(args, config.generator)
        }
        Commands::Encode(args) => encode(args),
        Commands::Decode(args) => decode(args),
        Commands::Case(args) => case(args),
    }
}

fn disasm(args: &DisasmArgs, mut options: GeneratorOptions) -> Result<String> {
    let source = read_input(&args.input)?;

    let mut program: Program = serde_json::from_str(&source)
        .with_context(|| format!("invalid AST in {}", args.input.display()))?;

    if let Some(file) = &args.file {
        options.file = file.clone();
    } else if let Some(stem) = args.input.file_stem().filter(|_| args.input != Path::new("-")) {
        options.file = stem.to_string_lossy().into_owned();
    }

    if args.no_lines {
        options.lines = false;
    }

    debug!(file = %options.file, statements = program.body.len(), "disassembling");

    let mut scopes = ast::resolve(&mut program)?;
    let bytecode = generate(&program, &mut scopes, &options)?;

    Ok(disassemble(&bytecode)?.trim_end().to_string())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).context("failed to read stdin")?;
        return Ok(source);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn encode(args: &CodecArgs) -> Result<String> {
    let text = JsString::text(&args.text)?;

    let encoded = match args.codec {
        Codec::Base64 => text.to_base64()?,
        Codec::Base64url => text.to_base64url()?,
        Codec::Hex => text.to_hex()?,
        Codec::Uri => string::encode_uri(&text)?,
        Codec::UriComponent => string::encode_uri_component(&text)?,
        Codec::Latin1 => string::btoa(&text)?,
    };

    Ok(encoded.to_string())
}

fn decode(args: &CodecArgs) -> Result<String> {
    let text = JsString::text(&args.text)?;

    let decoded = match args.codec {
        Codec::Base64 => text.decode_base64()?,
        Codec::Base64url => text.decode_base64url()?,
        Codec::Hex => text.decode_hex()?,
        Codec::Uri => string::decode_uri(&text)?,
        Codec::UriComponent => string::decode_uri_component(&text)?,
        Codec::Latin1 => string::atob(&text)?,
    };

    Ok(decoded.to_string())
}

fn case(args: &CaseArgs) -> Result<String> {
    let text = JsString::text(&args.text)?;

    let mapped = match args.mode {
        CaseMode::Lower => text.to_lower_case()?,
        CaseMode::Upper => text.to_upper_case()?,
    };

    Ok(mapped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(codec: Codec, text: &str) -> CodecArgs {
        CodecArgs {
            codec,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode(&codec(Codec::Base64, "hi")).unwrap(), "aGk=");
        assert_eq!(decode(&codec(Codec::Base64, "aGk=")).unwrap(), "hi");
        assert_eq!(encode(&codec(Codec::Hex, "hi")).unwrap(), "6869");
        assert_eq!(encode(&codec(Codec::UriComponent, "\u{20ac}")).unwrap(), "%E2%82%AC");
        assert!(decode(&codec(Codec::Uri, "%E2")).is_err());
    }

    #[test]
    fn test_case() {
        let args = CaseArgs {
            mode: CaseMode::Upper,
            text: "\u{e9}t\u{e9}".to_string(),
        };
        assert_eq!(case(&args).unwrap(), "\u{c9}T\u{c9}");
    }
}
