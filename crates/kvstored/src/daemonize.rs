//! Daemonization (§4.N) — classic double-fork + `setsid` + stdio
//! redirect via `libc`. Must run before the Tokio runtime is built:
//! forking a process that already has a multi-threaded reactor
//! running would leave the child with a half-initialized runtime.

use std::io;

/// Fork twice, detach from the controlling terminal, and redirect
/// `stdin`/`stdout`/`stderr` to `/dev/null`. The original process
/// exits; only the grandchild returns from this call.
pub fn daemonize() -> io::Result<()> {
    first_fork()?;

    if unsafe { libc::setsid() } < 0 {
        return Err(io::Error::last_os_error());
    }

    second_fork()?;

    redirect_stdio_to_dev_null()?;

    Ok(())
}

fn first_fork() -> io::Result<()> {
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}

fn second_fork() -> io::Result<()> {
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}

fn redirect_stdio_to_dev_null() -> io::Result<()> {
    use std::ffi::CString;

    let dev_null = CString::new("/dev/null").unwrap();
    let fd = unsafe { libc::open(dev_null.as_ptr(), libc::O_RDWR) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    if fd > libc::STDERR_FILENO {
        unsafe { libc::close(fd) };
    }
    Ok(())
}
