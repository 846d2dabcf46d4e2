// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line interface for ember.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// ember - bytecode and string tooling for the ember JavaScript engine
#[derive(Parser, Debug)]
#[command(name = "ember")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log generator decisions
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: <config dir>/ember/config.toml)
    #[arg(short, long, global = true, env = "EMBER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate bytecode for a JSON AST and print the listing
    #[command(alias = "d")]
    Disasm(DisasmArgs),

    /// Encode text
    Encode(CodecArgs),

    /// Decode text
    Decode(CodecArgs),

    /// Map text to lower or upper case
    Case(CaseArgs),
}

#[derive(Args, Debug)]
pub struct DisasmArgs {
    /// JSON AST file, or `-` for stdin
    pub input: PathBuf,

    /// Compile unit name (default: the input file name)
    #[arg(long)]
    pub file: Option<String>,

    /// Do not build the line map
    #[arg(long)]
    pub no_lines: bool,
}

#[derive(Args, Debug)]
pub struct CodecArgs {
    /// Encoding
    #[arg(value_enum)]
    pub codec: Codec,

    /// Input text
    pub text: String,
}

#[derive(Args, Debug)]
pub struct CaseArgs {
    /// Target case
    #[arg(value_enum)]
    pub mode: CaseMode,

    /// Input text
    pub text: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    /// Standard base64 with padding
    Base64,
    /// URL-safe base64 without padding
    Base64url,
    /// Lowercase hex
    Hex,
    /// `encodeURI` / `decodeURI`
    Uri,
    /// `encodeURIComponent` / `decodeURIComponent`
    UriComponent,
    /// `btoa` / `atob`
    Latin1,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseMode {
    /// `toLowerCase`
    Lower,
    /// `toUpperCase`
    Upper,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_disasm() {
        let cli = Cli::parse_from(["ember", "-v", "disasm", "prog.json", "--no-lines"]);
        assert!(cli.verbose);

        match cli.command {
            Commands::Disasm(args) => {
                assert_eq!(args.input, PathBuf::from("prog.json"));
                assert!(args.no_lines);
                assert_eq!(args.file, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_codec_names() {
        let cli = Cli::parse_from(["ember", "encode", "uri-component", "a b"]);
        match cli.command {
            Commands::Encode(args) => {
                assert_eq!(args.codec, Codec::UriComponent);
                assert_eq!(args.text, "a b");
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["ember", "decode", "rot13", "x"]).is_err());
    }
}
