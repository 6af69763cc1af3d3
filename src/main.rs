use envault::cli;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(cli::exit_code(&err));
    }
}
