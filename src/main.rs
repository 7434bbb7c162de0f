use std::process::ExitCode;

fn main() -> ExitCode {
    check_side_effects::cli::run()
}
