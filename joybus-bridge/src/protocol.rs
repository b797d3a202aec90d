//! Bridge wire protocol.
//!
//! The bridge speaks a fixed request/response framing over its USB serial
//! link. The host states up front how many reply bytes it expects; the
//! firmware answers with exactly that many payload bytes behind a status
//! byte, or with nothing at all.
//!
//! # Frame Format
//!
//! ```text
//! Request: [0x7E] [DataLen:1] [ReplyLen:1] [Data:N]
//! Reply:   [Edges:1] [Payload:ReplyLen]
//! ```
//!
//! Both length fields are single bytes, capping data and reply payloads at
//! 255 bytes. Replies carry no framing of their own; the reader must know
//! `ReplyLen` from the request it sent.
//!
//! ## Bus Writes
//!
//! A bus write tunnels a packet onto the console controller bus:
//!
//! ```text
//! Data: [0x03] [AddrHi] [AddrLo] [Packet:N]
//! ```
//!
//! The address is big-endian. The single reply payload byte of a CRC query
//! is the 8-bit CRC the peripheral hardware computed over the packet.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::error::{Error, Result};

/// Start-of-command marker opening every request frame.
pub const SYNC: u8 = 0x7e;

/// Largest data or reply payload; both length fields are one byte.
pub const MAX_PAYLOAD: usize = 255;

/// Bus-level commands understood by the bridge firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BusCommand {
    /// Write a packet to a peripheral bus address
    Write = 0x03,
}

/// A request frame ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    reply_len: u8,
}

impl Frame {
    /// Build a frame carrying `data` and announcing `reply_len` expected
    /// payload bytes.
    ///
    /// Rejects payloads the one-byte length fields cannot represent; the
    /// length would otherwise wrap and desynchronize the firmware parser.
    pub fn new(data: &[u8], reply_len: usize) -> Result<Self> {
        if data.len() > MAX_PAYLOAD {
            return Err(Error::Protocol(format!(
                "frame data too long: {} bytes (max {})",
                data.len(),
                MAX_PAYLOAD
            )));
        }
        if reply_len > MAX_PAYLOAD {
            return Err(Error::Protocol(format!(
                "expected reply too long: {} bytes (max {})",
                reply_len, MAX_PAYLOAD
            )));
        }
        Ok(Self {
            data: data.to_vec(),
            reply_len: reply_len as u8,
        })
    }

    /// Number of payload bytes the device will answer with.
    pub fn reply_len(&self) -> usize {
        self.reply_len as usize
    }

    /// Total reply size on the wire: status byte plus payload.
    pub fn wire_reply_len(&self) -> usize {
        self.reply_len() + 1
    }

    /// Encode the frame to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + self.data.len());
        buf.put_u8(SYNC);
        buf.put_u8(self.data.len() as u8);
        buf.put_u8(self.reply_len);
        buf.extend_from_slice(&self.data);
        buf
    }
}

/// Assemble the data payload of a bus write: command byte, big-endian
/// address, then the packet contents.
pub fn bus_write_data(command: BusCommand, address: u16, packet: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(3 + packet.len());
    data.put_u8(command as u8);
    data.put_u16(address);
    data.extend_from_slice(packet);
    data
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Count of bus edges the firmware detected while listening
    pub edges_detected: u8,
    /// Response payload (one CRC byte for a CRC query)
    pub payload: Vec<u8>,
}

impl Reply {
    /// Parse a reply from the exact wire bytes of one response.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, io::Error> {
        let Some((&edges_detected, payload)) = bytes.split_first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Reply too short",
            ));
        };

        Ok(Reply {
            edges_detected,
            payload: payload.to_vec(),
        })
    }
}

/// Tokio codec for the request side of the protocol.
///
/// Replies are length-prefixed by the request rather than self-describing,
/// so reads are handled by the link against the reply length it announced;
/// only encoding goes through the codec.
pub struct FrameCodec;

impl Encoder<&Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        let encoded = item.encode();
        trace!(
            data_len = item.data.len(),
            reply_len = item.reply_len,
            frame = ?encoded,
            "TX frame"
        );
        dst.extend_from_slice(&encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn as_hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<String>>()
            .join(" ")
    }

    fn assert_frame(frame: &Frame, expect: &[u8]) {
        let mut codec = FrameCodec;
        let mut encoded = BytesMut::new();
        codec.encode(frame, &mut encoded).unwrap();
        if encoded != expect {
            panic!(
                "mismatch!\nexpected: {}\nactual: {}",
                as_hex(expect),
                as_hex(&encoded[..])
            )
        }
    }

    #[test]
    fn frame_encoding() {
        let frame = Frame::new(&[0x01, 0x02, 0x03], 1).unwrap();
        assert_frame(&frame, &[0x7e, 0x03, 0x01, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn empty_frame_encoding() {
        let frame = Frame::new(&[], 0).unwrap();
        assert_frame(&frame, &[0x7e, 0x00, 0x00]);
    }

    #[test]
    fn bus_write_frame_encoding() {
        let data = bus_write_data(BusCommand::Write, 0x8001, &[0xaa]);
        let frame = Frame::new(&data, 1).unwrap();
        assert_frame(&frame, &[0x7e, 0x04, 0x01, 0x03, 0x80, 0x01, 0xaa]);
    }

    #[test_case(256, 0; "oversized_data")]
    #[test_case(0, 256; "oversized_reply")]
    fn oversized_frames_rejected(data_len: usize, reply_len: usize) {
        let data = vec![0u8; data_len];
        assert!(matches!(
            Frame::new(&data, reply_len),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn max_payload_frame_accepted() {
        let data = vec![0x5a; MAX_PAYLOAD];
        let frame = Frame::new(&data, MAX_PAYLOAD).unwrap();
        let encoded = frame.encode();
        assert_eq!(encoded.len(), 3 + MAX_PAYLOAD);
        assert_eq!(encoded[1], 0xff);
        assert_eq!(encoded[2], 0xff);
    }

    #[test]
    fn reply_parsing() {
        // Status byte plus one CRC byte
        let reply = Reply::parse(&[0x00, 0x5a]).unwrap();
        assert_eq!(reply.edges_detected, 0x00);
        assert_eq!(reply.payload, vec![0x5a]);

        // Status byte alone is a valid zero-payload reply
        let reply = Reply::parse(&[0x07]).unwrap();
        assert_eq!(reply.edges_detected, 0x07);
        assert!(reply.payload.is_empty());

        // Nothing at all is not
        assert!(Reply::parse(&[]).is_err());
    }

    #[test]
    fn retransmitted_frames_encode_identically() {
        let frame = Frame::new(&[0xde, 0xad], 1).unwrap();
        assert_eq!(frame.encode(), frame.encode());
    }
}
