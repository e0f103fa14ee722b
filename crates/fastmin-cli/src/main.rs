#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fastmin")]
#[command(author, version, about = "A JavaScript minifier with stable cross-build renaming", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Minify one or more JavaScript files into a single output
    Minify {
        /// Input files, directories or glob patterns (`src/*.js`)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (if not specified, prints to stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// JSON options file, applied before the flags below
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Enable the compressor (default)
        #[arg(long, overrides_with = "no_compress")]
        compress: bool,

        /// Disable the compressor
        #[arg(long)]
        no_compress: bool,

        /// Define global replacements (e.g., --define DEBUG=false)
        #[arg(long, value_delimiter = ',')]
        define: Vec<String>,

        /// Enable name mangling (default)
        #[arg(long, overrides_with = "no_mangle")]
        mangle: bool,

        /// Disable name mangling
        #[arg(long)]
        no_mangle: bool,

        /// Also mangle top-level names
        #[arg(long)]
        toplevel: bool,

        /// Names that are never mangled
        #[arg(long, value_delimiter = ',')]
        reserved: Vec<String>,

        /// Mangle member names
        #[arg(long)]
        mangle_props: bool,

        /// Only mangle member names matching this regex (implies --mangle-props)
        #[arg(long, value_name = "REGEX")]
        mangle_regex: Option<String>,

        /// Keep member names that appear quoted
        #[arg(long)]
        keep_quoted: bool,

        /// Persist member names in this file across runs
        #[arg(long, value_name = "FILE")]
        name_cache: Option<PathBuf>,

        /// Write an external source map to this file
        #[arg(long, value_name = "FILE")]
        source_map: Option<PathBuf>,

        /// URL written in the sourceMappingURL comment
        #[arg(long, value_name = "URL", conflicts_with = "no_source_map_url")]
        source_map_url: Option<String>,

        /// Do not write a sourceMappingURL comment
        #[arg(long)]
        no_source_map_url: bool,

        /// Embed the source map in the output
        #[arg(long, conflicts_with = "source_map")]
        source_map_inline: bool,

        /// Source map of the inputs, to compose with
        #[arg(long, value_name = "FILE")]
        in_source_map: Option<PathBuf>,

        /// `sourceRoot` of the generated map
        #[arg(long)]
        source_root: Option<String>,

        /// Embed the original sources in the map
        #[arg(long)]
        source_map_include_sources: bool,

        /// Wrap the output in a module assigned to this global
        #[arg(long, value_name = "NAME")]
        wrap: Option<String>,

        /// Export every top-level name from the wrapped module
        #[arg(long, requires = "wrap")]
        export_all: bool,

        /// Allow `return` at the top level
        #[arg(long)]
        bare_returns: bool,

        /// Readable output instead of compact
        #[arg(long)]
        beautify: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    match cli.command {
        None | Some(Commands::Version) => commands::version::run(cli.json),
        Some(Commands::Minify {
            inputs,
            output,
            config,
            compress,
            no_compress,
            define,
            mangle,
            no_mangle,
            toplevel,
            reserved,
            mangle_props,
            mangle_regex,
            keep_quoted,
            name_cache,
            source_map,
            source_map_url,
            no_source_map_url,
            source_map_inline,
            in_source_map,
            source_root,
            source_map_include_sources,
            wrap,
            export_all,
            bare_returns,
            beautify,
        }) => {
            let action = commands::minify::MinifyAction {
                cwd: cli.cwd,
                inputs,
                output,
                config,
                compress: if no_compress {
                    Some(false)
                } else if compress {
                    Some(true)
                } else {
                    None
                },
                define,
                mangle: if no_mangle {
                    Some(false)
                } else if mangle {
                    Some(true)
                } else {
                    None
                },
                toplevel,
                reserved,
                mangle_props: mangle_props || mangle_regex.is_some(),
                mangle_regex,
                keep_quoted,
                name_cache,
                source_map,
                source_map_url,
                no_source_map_url,
                source_map_inline,
                in_source_map,
                source_root,
                include_sources: source_map_include_sources,
                wrap,
                export_all,
                bare_returns,
                beautify,
            };
            commands::minify::run(action, cli.json)
        }
    }
}
