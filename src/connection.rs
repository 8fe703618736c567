// ABOUTME: Provides TCP connection management for SMPP v3.4 protocol communication
// ABOUTME: Implements frame-based I/O with buffering for optimal network performance

use crate::client::error::{SmppError, SmppResult};
use crate::codec::{CodecError, Frame, PduHeader, PduRegistry};
use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// SMPP v3.4 Connection Management
///
/// Handles frame-based communication over TCP for SMPP protocol sessions.
/// This implements the transport layer for SMPP v3.4 as defined in Section 2.1
/// of the specification.
///
/// ## SMPP v3.4 Session States (Section 2.1)
///
/// An SMPP session progresses through the following states:
///
/// ```text
/// CLOSED → OPEN → BOUND_TX/BOUND_RX/BOUND_TRX → UNBOUND → CLOSED
/// ```
///
/// ### State Descriptions
/// - **CLOSED**: No TCP connection exists
/// - **OPEN**: TCP connection established but no SMPP bind completed
/// - **BOUND_TX**: Successfully bound as transmitter (can send submit_sm)
/// - **BOUND_RX**: Successfully bound as receiver (can receive deliver_sm)
/// - **BOUND_TRX**: Successfully bound as transceiver (both TX and RX capabilities)
/// - **UNBOUND**: Unbind initiated, session terminating
///
/// ## Implementation Notes
/// This `Connection` struct handles the transport layer (frame I/O) but does not
/// track session state. Higher-level client code must manage the protocol state
/// machine and ensure PDUs are sent in the correct sequence per specification.
///
/// ## References
/// - SMPP v3.4 Specification Section 2.1 (Session States)
/// - SMPP v3.4 Specification Section 2.2 (Protocol Data Units)
#[derive(Debug)]
pub struct Connection {
    // The `TcpStream`. It is decorated with a `BufWriter`, which provides write
    // level buffering. The `BufWriter` implementation provided by Tokio is
    // sufficient for our needs.
    stream: BufWriter<TcpStream>,

    // The buffer for reading frames.
    buffer: BytesMut,

    // Registry of known PDU decoders, shared across reads.
    registry: PduRegistry,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`. Read and write buffers
    /// are initialized.
    pub fn new(socket: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(socket),
            // Default to a 4KB read buffer; real deployments will want to tune
            // this to the expected PDU size distribution.
            buffer: BytesMut::with_capacity(4 * 1024),
            registry: PduRegistry::new(),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// Any data remaining in the read buffer after the frame has been parsed is
    /// kept there for the next call to `read_frame`.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the `TcpStream`
    /// is closed in a way that doesn't break a frame in half, it returns
    /// `None`. Otherwise, an error is returned.
    pub async fn read_frame(&mut self) -> SmppResult<Option<Frame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // There is not enough buffered data to read a frame. Attempt to
            // read more data from the socket. `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer. If
                // there is, this means that the peer closed the socket while
                // sending a frame.
                return self
                    .buffer
                    .is_empty()
                    .then(|| None)
                    .ok_or(SmppError::ConnectionClosed);
            }
        }
    }

    /// Tries to parse a frame from the buffer. If the buffer contains enough
    /// data, the frame is returned and the data removed from the buffer. If not
    /// enough data has been buffered yet, `Ok(None)` is returned. If the
    /// buffered data does not represent a valid frame, `Err` is returned.
    fn parse_frame(&mut self) -> SmppResult<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        let header = match PduHeader::decode(&mut buf) {
            Ok(header) => header,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => return Err(SmppError::InvalidData(e.to_string())),
        };

        let len = header.command_length as usize;
        if self.buffer.len() < len {
            return Ok(None);
        }

        buf.set_position(PduHeader::SIZE as u64);
        let frame = match self.registry.decode_pdu(header, &mut buf) {
            Ok(frame) => frame,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => return Err(SmppError::InvalidData(e.to_string())),
        };

        self.buffer.advance(len);
        Ok(Some(frame))
    }

    /// Write a single `Frame` value to the underlying stream.
    ///
    /// The `Frame` value is encoded via the contained PDU's `Encodable` impl
    /// and written using the various `write_*` functions provided by
    /// `AsyncWrite`. Calling these functions directly on a `TcpStream` is
    /// **not** advised, as this will result in a large number of syscalls.
    /// However, it is fine to call these functions on a *buffered* write
    /// stream; once the buffer is full, it is flushed to the underlying
    /// socket.
    pub async fn write_frame(&mut self, frame: &Frame) -> SmppResult<()> {
        let bytes = frame
            .to_bytes()
            .map_err(|e| SmppError::InvalidData(e.to_string()))?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
