//! REST API tests - runs YAML scenarios against a REST API
//!
//! Exit codes: 0 when every scenario passed, 1 when one failed, 2 when the
//! local service never became ready, 3 on invalid flags.

use clap::error::ErrorKind;
use clap::Parser;
use rest_api_tests::commands::Args;
use rest_api_tests::common::logging;
use rest_api_tests::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(3);
        }
    };

    logging::init_cli(args.verbose);

    match cli::run(args).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
