//! Deliberate fault injection for exercising the crash path
//!
//! Only compiled with the `fault-injection` feature.

use std::io;

/// Kind of fault to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Deliver SIGSEGV to the calling thread with `raise`. The handler runs
    /// before `raise` returns and the process survives if a handler is armed.
    Raise,
    /// Write to a freshly mapped `PROT_NONE` page. With the handler armed the
    /// flag is recorded and the process is then terminated by the default
    /// action. The page is unmapped if the write ever returns.
    InvalidAccess,
}

/// Inject `fault` into the current thread
pub fn inject_fault(fault: Fault) -> io::Result<()> {
    log::warn!("Injecting fault: {:?}", fault);

    match fault {
        Fault::Raise => {
            if unsafe { libc::raise(libc::SIGSEGV) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
        Fault::InvalidAccess => {
            let page = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    page_size(),
                    libc::PROT_NONE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            if page == libc::MAP_FAILED {
                return Err(io::Error::last_os_error());
            }
            unsafe {
                (page as *mut u8).write_volatile(0);
                libc::munmap(page, page_size());
            }
            Ok(())
        }
    }
}

fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as usize,
        _ => 4096,
    }
}
