//! CBot command-line host.

use cbotc::commands::{check_file, lex_file, run_file};
use cbotc::options::parse_run_options;

fn main() {
    cbotc::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" => match parse_run_options(&args[2..]) {
            Ok(options) => run_file(&options),
            Err(err) => {
                eprintln!("error: {err}");
                eprintln!("Usage: cbot run <file.cbot> [options]");
                std::process::exit(1);
            }
        },
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: cbot check <file.cbot>");
                std::process::exit(1);
            }
            check_file(&args[2]);
        }
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: cbot lex <file.cbot>");
                std::process::exit(1);
            }
            lex_file(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("cbot {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("cbot"))
            {
                match parse_run_options(&args[1..]) {
                    Ok(options) => run_file(&options),
                    Err(err) => {
                        eprintln!("error: {err}");
                        std::process::exit(1);
                    }
                }
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("CBot interpreter");
    println!();
    println!("Usage: cbot <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.cbot>      Compile and run an extern function");
    println!("  check <file.cbot>    Compile only and list entry points");
    println!("  lex <file.cbot>      Tokenize and display tokens");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Run options:");
    println!("  --entry=<name>       Extern function to start (default: main)");
    println!("  --budget=<n>         Steps per tick (default: 1000)");
    println!("  --max-ticks=<n>      Stop after n ticks (exit status 2)");
    println!("  --save=<file>        Write the program state when stopping");
    println!("  --restore=<file>     Resume from a saved state");
    println!("  -D<NAME>=<value>     Define a numeric constant");
    println!();
    println!("Logging:");
    println!("  RUST_LOG=cbot_eval=debug      Enable tracing output");
    println!("  CBOT_TRACE_TREE=1             Indented span tree");
    println!();
    println!("Examples:");
    println!("  cbot run bot.cbot");
    println!("  cbot run bot.cbot --budget=10 --max-ticks=5 --save=bot.state");
    println!("  cbot run bot.cbot --restore=bot.state");
    println!("  cbot check bot.cbot");
}
