use colored::Colorize;
use siteqa::command_argument_builder;
use siteqa::handlers::{
    GlobalOptions, handle_init, handle_key_clear, handle_key_set, handle_key_show, handle_scan,
    init_tracing,
};
use siteqa_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let global = GlobalOptions::from_matches(&chosen_command);

    init_tracing(global.verbose);

    // Show banner unless --quiet flag is set
    if !global.quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        None => return,
        Some(("init", primary_command)) => handle_init(primary_command, &global),
        Some(("key", primary_command)) => match primary_command.subcommand() {
            Some(("set", secondary_command)) => handle_key_set(secondary_command, &global).await,
            Some(("show", _)) => handle_key_show(&global),
            Some(("clear", _)) => handle_key_clear(&global),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("scan", primary_command)) => handle_scan(primary_command, &global).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
