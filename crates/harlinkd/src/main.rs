use std::process::ExitCode;

fn main() -> ExitCode {
    match harlinkd::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be installed if bootstrap itself failed, so
            // report on stderr directly; stdout belongs to the wire.
            eprintln!("harlinkd: {error}");
            ExitCode::FAILURE
        }
    }
}
