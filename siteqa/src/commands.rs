use clap::{arg, command};
use siteqa_core::report::ReportFormat;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/siteqa/";

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn parse_format(value: &str) -> Result<ReportFormat, String> {
    ReportFormat::from_str(value)
        .ok_or_else(|| format!("unknown report format '{}' (text, json, markdown)", value))
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("siteqa")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("siteqa")
        .about("Crawl a website and report likely QA issues")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false).global(true))
        .arg(
            arg!(-c --"config-dir" <PATH>)
                .required(false)
                .global(true)
                .help("Directory holding the SiteQA database")
                .default_value(DEFAULT_CONFIG_DIR),
        )
        .arg(
            arg!(--"api-url" <URL>)
                .required(false)
                .global(true)
                .help("Base URL of the Firecrawl API (default: https://api.firecrawl.dev)")
                .value_parser(clap::value_parser!(Url)),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the SiteQA database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the SiteQA database (default: --config-dir)"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite any existing database at the location, dropping the stored API key")
                        .required(false),
                ),
        )
        .subcommand(
            command!("key")
                .about("Manage the Firecrawl API key")
                .subcommand_required(true)
                .subcommand(
                    command!("set")
                        .about("Validates the key with Firecrawl and stores it")
                        .arg(arg!(<KEY>).required(true).help("The Firecrawl API key")),
                )
                .subcommand(command!("show").about("Shows the stored key, masked"))
                .subcommand(command!("clear").about("Removes the stored key")),
        )
        .subcommand(
            command!("scan")
                .about("Crawl a website and check every page for QA issues")
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("Website to scan, e.g. example.com or https://example.com"),
                )
                .arg(
                    arg!(-l --"limit" <PAGES>)
                        .required(false)
                        .help("Maximum number of pages to crawl")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(parse_format)
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"allow-unvalidated")
                        .required(false)
                        .help("Use a stored key even if it was never validated")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
