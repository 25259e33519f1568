/// Exit code used when the allocator cannot satisfy a request (ENOMEM).
pub const EXIT_ENOMEM: i32 = 12;

/// Exit code used when mandatory graphics entry points are unavailable.
pub const EXIT_MISSING_ENTRY_POINTS: i32 = 1;

/// Reports an unrecoverable failure and terminates the process.
///
/// The message is written to the log and echoed to stderr, since the logger
/// may not be initialized when bring-up fails.
pub fn fatal(code: i32, message: &str) -> ! {
    log::error!("{message}");
    eprintln!("\n----------------\n{message}\n----------------\n");
    std::process::exit(code)
}
