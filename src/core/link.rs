use crate::domain::error::FluidComResult;

/// Byte-level duplex channel to the device bus.
///
/// Framing, checksums and reply matching are handled by the session; a link
/// only moves bytes.
pub trait Link: Send {
    /// Write every byte of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> FluidComResult<()>;

    /// Return up to `max_len` bytes that are already available, without
    /// waiting. An empty vector means nothing has arrived yet.
    fn read_available(&mut self, max_len: usize) -> FluidComResult<Vec<u8>>;

    /// Discard anything buffered in either direction.
    fn clear(&mut self) -> FluidComResult<()>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write_all(&mut self, bytes: &[u8]) -> FluidComResult<()> {
        (**self).write_all(bytes)
    }

    fn read_available(&mut self, max_len: usize) -> FluidComResult<Vec<u8>> {
        (**self).read_available(max_len)
    }

    fn clear(&mut self) -> FluidComResult<()> {
        (**self).clear()
    }
}

/// Opens links by port name at a given baud rate.
pub trait LinkOpener {
    fn open(&mut self, port: &str, baud_rate: u32) -> FluidComResult<Box<dyn Link>>;
}
