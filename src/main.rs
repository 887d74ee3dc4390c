use clap::Parser;
use ndax_decoder::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    match commands::run(args) {
        Ok(summary) => {
            process::exit(if summary.passed { 0 } else { 2 });
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
