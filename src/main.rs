use clap::Parser;
use pilfer::cli::{Action, Cli};

fn main() {
    let cli = Cli::parse();
    pilfer::logging::init(cli.verbose);

    let result = match cli.action {
        Action::Open => pilfer::cli::commands::open::execute(&cli),
        Action::Close => pilfer::cli::commands::close::execute(&cli),
        Action::Status => pilfer::cli::commands::status::execute(),
    };

    if let Err(e) = result {
        pilfer::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
