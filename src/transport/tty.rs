//! Raw TTY configuration for serial and RFCOMM device files.
//!
//! The device is opened write-only and switched to raw mode so binary data
//! passes through unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR,
//!   ICRNL disabled
//! - **No software flow control**: IXON/IXOFF/IXANY disabled — 0x11 (XON)
//!   and 0x13 (XOFF) appear freely in raster data
//! - **No output processing**: OPOST disabled (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo or canonical mode**

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use log::warn;

use crate::error::BuzonError;

/// Open a device file write-only and configure it for raw binary output.
///
/// `baud` sets the line speed for real serial adapters; RFCOMM nodes ignore
/// speed settings, so pass `None` there.
pub fn open_raw(device: &Path, baud: Option<u32>) -> Result<File, BuzonError> {
    let file = File::options().write(true).open(device).map_err(|e| {
        BuzonError::Transport(format!("Failed to open {}: {}", device.display(), e))
    })?;
    configure_raw(file.as_raw_fd(), baud)?;
    Ok(file)
}

#[cfg(unix)]
fn configure_raw(fd: i32, baud: Option<u32>) -> Result<(), BuzonError> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(BuzonError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    if let Some(baud) = baud {
        let speed = baud_constant(baud);
        unsafe {
            libc::cfsetispeed(&mut termios, speed);
            libc::cfsetospeed(&mut termios, speed);
        }
    }

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(BuzonError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure_raw(_fd: i32, _baud: Option<u32>) -> Result<(), BuzonError> {
    Ok(())
}

/// Map a numeric baud rate to its termios speed constant.
///
/// Unknown rates fall back to 9600 with a warning; thermal printers ship at
/// 9600 or 19200 almost universally.
#[cfg(unix)]
fn baud_constant(baud: u32) -> libc::speed_t {
    match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        other => {
            warn!("Unsupported baud rate {}, falling back to 9600", other);
            libc::B9600
        }
    }
}
