//! Console device interface
//!
//! The syscall layer reads from standard input and writes to standard
//! output through this trait; the concrete device (UART, VGA, a test
//! buffer) lives outside the crate.
//!
//! # Security Considerations
//! - Console I/O is a device operation and never takes the filesystem lock
//! - Output is emitted in whole buffers so lines from different processes
//!   are not interleaved mid-write

/// Raw byte console.
pub trait Console: Send + Sync {
    /// Write a whole buffer to the console.
    fn put_bytes(&self, bytes: &[u8]);

    /// Block until one byte of input is available and return it.
    fn get_byte(&self) -> u8;
}

/// Print formatted text and a newline to a console, as one write.
#[macro_export]
macro_rules! cprintln {
    ($console:expr, $($arg:tt)*) => {{
        let mut line = $crate::__format!($($arg)*);
        line.push('\n');
        $crate::drivers::console::Console::put_bytes($console, line.as_bytes());
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use spin::Mutex;

    struct Capture(Mutex<Vec<u8>>);

    impl Console for Capture {
        fn put_bytes(&self, bytes: &[u8]) {
            self.0.lock().extend_from_slice(bytes);
        }

        fn get_byte(&self) -> u8 {
            0
        }
    }

    #[test]
    fn test_println_is_one_write() {
        let cap = Capture(Mutex::new(Vec::new()));
        cprintln!(&cap, "{}: exit({})", "echo", 0);
        assert_eq!(&*cap.0.lock(), b"echo: exit(0)\n");
    }
}
