use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_signum: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Registers `SIGINT`/`SIGTERM` handlers that flip a process-wide flag
/// instead of terminating the process, so `main` can drain the server and
/// scheduler before exiting.
pub fn install() {
    // SAFETY: `handle_signal` is `extern "C"`, touches only an `AtomicBool`,
    // and matches `sighandler_t`'s expected signature.
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
    }
}

pub fn requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
