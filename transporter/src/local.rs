//! The local side of the transporter: IPv6 datagrams to and from the host.
//!
//! Datagrams travel over a byte stream (a pipe to a TUN helper, or stdio),
//! each preceded by its length as a big-endian `u16`.

use std::io::{self, ErrorKind, Read, Write};

use parking_lot::Mutex;
use tunnel::PacketSink;
use wire::{decode_pipe_prefix, encode_pipe_frame, PIPE_PREFIX_LEN};

/// Yields complete IPv6 datagrams from the local network.
pub trait PacketSource: Send {
    /// Reads one or more whole datagrams into `buf`.
    ///
    /// Returns the number of bytes read; 0 means the source is exhausted.
    fn read_datagrams(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Reads length-prefixed datagrams from a byte stream.
#[derive(Debug)]
pub struct PipeSource<R> {
    reader: R,
}

impl<R: Read + Send> PipeSource<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Send> PacketSource for PipeSource<R> {
    fn read_datagrams(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut prefix = [0u8; PIPE_PREFIX_LEN];
        match self.reader.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(0),
            Err(err) => return Err(err),
        }
        let len = decode_pipe_prefix(prefix, buf.len())
            .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))?;
        self.reader.read_exact(&mut buf[..len])?;
        Ok(len)
    }
}

/// Writes length-prefixed datagrams to a byte stream.
///
/// Each frame is written with a single call, so concurrent writers never
/// interleave inside a frame.
#[derive(Debug)]
pub struct PipeSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> PipeSink<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> PacketSink for PipeSink<W> {
    fn write_datagram(&self, datagram: &[u8]) -> io::Result<()> {
        let mut frame = Vec::with_capacity(PIPE_PREFIX_LEN + datagram.len());
        encode_pipe_frame(datagram, &mut frame)
            .map_err(|err| io::Error::new(ErrorKind::InvalidInput, err))?;
        let mut writer = self.writer.lock();
        writer.write_all(&frame)?;
        writer.flush()
    }
}
