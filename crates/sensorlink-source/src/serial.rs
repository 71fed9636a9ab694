use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::traits::{ByteSource, ReadOutcome};

/// Line settings for a serial device.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub path: PathBuf,
    /// Line speed in bits per second.
    pub baud: u32,
    /// Upper bound on a single read.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Default device path of the sensor board's USB bridge.
    pub const DEFAULT_PATH: &'static str = "/dev/ttyUSB0";
    /// Default line speed.
    pub const DEFAULT_BAUD: u32 = 115_200;
    /// Default read timeout.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// Settings for `path` at the default baud rate and timeout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud: Self::DEFAULT_BAUD,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

/// A tty device in raw 8N1 mode.
///
/// Reads wait for readability with `poll(2)` so a read never outlasts the
/// configured timeout. The device handle is released on drop.
pub struct SerialPort {
    file: File,
    path: PathBuf,
    name: String,
    read_timeout: Duration,
}

impl SerialPort {
    /// Open and configure a serial device.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let speed = baud_constant(config.baud).ok_or(SourceError::UnsupportedBaud(config.baud))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&config.path)
            .map_err(|e| SourceError::Open {
                path: config.path.clone(),
                source: e,
            })?;

        configure_raw(&file, speed).map_err(|e| SourceError::Configure {
            path: config.path.clone(),
            source: e,
        })?;

        info!(path = ?config.path, baud = config.baud, "opened serial device");

        Ok(Self {
            file,
            path: config.path.clone(),
            name: config.path.display().to_string(),
            read_timeout: config.read_timeout,
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Change the read timeout for subsequent reads.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl ByteSource for SerialPort {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if buf.is_empty() {
            return Ok(ReadOutcome::Timeout);
        }

        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = self.read_timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `pfd` is a valid pollfd for an fd owned by `self.file`, and we
        // pass a count of exactly one entry.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(ReadOutcome::Timeout);
            }
            return Err(SourceError::Io(err));
        }
        if rc == 0 {
            return Ok(ReadOutcome::Timeout);
        }
        if pfd.revents & libc::POLLIN == 0
            && pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
        {
            debug!(path = ?self.path, revents = pfd.revents, "serial device hung up");
            return Ok(ReadOutcome::Closed);
        }

        loop {
            match (&self.file).read(buf) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(ReadOutcome::Timeout),
                Err(err) => return Err(SourceError::Io(err)),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

fn configure_raw(file: &File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is a plain C struct; zeroed is a valid initial value that
    // tcgetattr overwrites before any field is read.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by `file` and `tio` is a valid
    // writable termios for the duration of each call.
    unsafe {
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tio);
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cflag &= !(libc::CSTOPB | libc::PARENB | libc::CSIZE);
        tio.c_cflag |= libc::CS8;
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = 0;
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        // Stale bytes from before the open are noise to the decoder.
        libc::tcflush(fd, libc::TCIFLUSH);
    }
    Ok(())
}

/// Map a numeric baud rate to its termios constant.
pub fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1_200 => libc::B1200,
        2_400 => libc::B2400,
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}
