#![allow(unsafe_code)]
//! Raw descriptors handed over by the supervisor and the handles built on them.

use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};

/// A descriptor number inherited from the supervisor at spawn time.
///
/// The value is guaranteed non-negative. It does not own the descriptor:
/// ownership moves into whichever handle is built from it with
/// [`FromRawDescriptor`], and each descriptor must be wrapped at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawDescriptor(RawFd);

impl RawDescriptor {
    /// Returns `None` for negative numbers.
    #[must_use]
    pub fn new(fd: RawFd) -> Option<Self> {
        (fd >= 0).then_some(Self(fd))
    }

    #[must_use]
    pub fn get(self) -> RawFd {
        self.0
    }
}

impl TryFrom<i64> for RawDescriptor {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        RawFd::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("{value} is not a valid descriptor number"))
    }
}

impl AsRawFd for RawDescriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl fmt::Display for RawDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// Construct a typed handle that takes ownership of an inherited descriptor.
///
/// Implementations must wrap the descriptor as-is: no duplication and no
/// closing on success. The handle closes the descriptor when dropped.
pub trait FromRawDescriptor: Sized {
    /// # Errors
    /// Returns an error if the handle cannot adopt the descriptor.
    fn from_raw_descriptor(fd: RawDescriptor) -> io::Result<Self>;
}

macro_rules! adopt_with_from_raw_fd {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromRawDescriptor for $ty {
                fn from_raw_descriptor(fd: RawDescriptor) -> io::Result<Self> {
                    // SAFETY: the supervisor transferred this open, non-negative
                    // descriptor to the process; the caller wraps it once.
                    Ok(unsafe { <$ty as FromRawFd>::from_raw_fd(fd.get()) })
                }
            }
        )+
    };
}

adopt_with_from_raw_fd!(
    OwnedFd,
    std::net::TcpListener,
    std::net::TcpStream,
    std::net::UdpSocket,
    UnixListener,
    UnixStream,
);

/// Registers the listener with the current tokio runtime; must be called
/// from within one.
#[cfg(feature = "tokio")]
impl FromRawDescriptor for tokio::net::TcpListener {
    fn from_raw_descriptor(fd: RawDescriptor) -> io::Result<Self> {
        let listener = std::net::TcpListener::from_raw_descriptor(fd)?;
        listener.set_nonblocking(true)?;
        tokio::net::TcpListener::from_std(listener)
    }
}

/// Registers the listener with the current tokio runtime; must be called
/// from within one.
#[cfg(feature = "tokio")]
impl FromRawDescriptor for tokio::net::UnixListener {
    fn from_raw_descriptor(fd: RawDescriptor) -> io::Result<Self> {
        let listener = UnixListener::from_raw_descriptor(fd)?;
        listener.set_nonblocking(true)?;
        tokio::net::UnixListener::from_std(listener)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::os::fd::IntoRawFd;

    #[test]
    fn rejects_negative_and_oversized_numbers() {
        assert!(RawDescriptor::new(-1).is_none());
        assert!(RawDescriptor::try_from(-3_i64).is_err());
        assert!(RawDescriptor::try_from(i64::from(i32::MAX) + 1).is_err());
        assert_eq!(RawDescriptor::try_from(4_i64).map(RawDescriptor::get), Ok(4));
    }

    #[test]
    fn adopts_a_listening_socket() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let fd = RawDescriptor::new(listener.into_raw_fd()).unwrap();

        let adopted = std::net::TcpListener::from_raw_descriptor(fd).unwrap();
        assert_eq!(adopted.local_addr().unwrap(), addr);
        assert_eq!(adopted.as_raw_fd(), fd.get());
    }

    #[test]
    fn display_names_the_descriptor() {
        assert_eq!(RawDescriptor::new(5).unwrap().to_string(), "fd 5");
    }
}
