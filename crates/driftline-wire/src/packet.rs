//! Measurement packet encoding
//!
//! Encoding writes into a caller-owned `[u8; PACKET_SIZE]` so a sending node
//! can reuse one buffer for every cycle. Decoding reads the first
//! `PACKET_SIZE` bytes and ignores anything after them.

use bytes::{Buf, BufMut};

use driftline_core::{DeviceTicks, DriftlineError, DriftlineResult, NodeTag, NODE_TAG_LEN};

/// Packet size in bytes
pub const PACKET_SIZE: usize = 13;

/// Reusable packet buffer owned by the sender
pub type PacketBuf = [u8; PACKET_SIZE];

/// One timestamped measurement from a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasurementPacket {
    /// Originating node
    pub node: NodeTag,
    /// Node clock at sampling time
    pub timestamp: DeviceTicks,
    /// Sensor reading, sensor units
    pub measurement: f32,
}

impl MeasurementPacket {
    pub fn new(node: NodeTag, timestamp: DeviceTicks, measurement: f32) -> Self {
        MeasurementPacket {
            node,
            timestamp,
            measurement,
        }
    }

    /// Parse a packet from a datagram payload.
    ///
    /// Payloads shorter than `PACKET_SIZE` are rejected; bytes past
    /// `PACKET_SIZE` are ignored.
    pub fn parse(buf: &[u8]) -> DriftlineResult<Self> {
        if buf.len() < PACKET_SIZE {
            return Err(DriftlineError::BufferTooShort {
                expected: PACKET_SIZE,
                actual: buf.len(),
            });
        }

        let mut cur = &buf[..PACKET_SIZE];

        // Bytes 0-4: Node tag
        let mut tag = [0u8; NODE_TAG_LEN];
        cur.copy_to_slice(&mut tag);

        // Bytes 5-8: Timestamp
        let timestamp = DeviceTicks(cur.get_u32());

        // Bytes 9-12: Measurement
        let measurement = cur.get_f32();

        Ok(MeasurementPacket {
            node: NodeTag::from_bytes(tag),
            timestamp,
            measurement,
        })
    }

    /// Serialize into a reusable packet buffer. Never allocates.
    #[inline]
    pub fn encode_into(&self, buf: &mut PacketBuf) {
        let mut out = &mut buf[..];
        self.put(&mut out);
    }

    /// Serialize into an arbitrary slice
    pub fn serialize(&self, buf: &mut [u8]) -> DriftlineResult<()> {
        if buf.len() < PACKET_SIZE {
            return Err(DriftlineError::BufferTooShort {
                expected: PACKET_SIZE,
                actual: buf.len(),
            });
        }
        let mut out = &mut buf[..PACKET_SIZE];
        self.put(&mut out);
        Ok(())
    }

    /// Append the packet to any `BufMut`
    pub fn put<B: BufMut>(&self, out: &mut B) {
        out.put_slice(&self.node.to_bytes());
        out.put_u32(self.timestamp.as_micros());
        out.put_f32(self.measurement);
    }

    /// Serialize to a fresh array
    pub fn to_bytes(&self) -> PacketBuf {
        let mut buf = [0u8; PACKET_SIZE];
        self.encode_into(&mut buf);
        buf
    }
}

/// Fill `buf` with one packet. Convenience over `MeasurementPacket::encode_into`.
#[inline]
pub fn encode(node: NodeTag, timestamp: DeviceTicks, measurement: f32, buf: &mut PacketBuf) {
    MeasurementPacket::new(node, timestamp, measurement).encode_into(buf);
}

/// Decode one packet. Convenience over `MeasurementPacket::parse`.
#[inline]
pub fn decode(buf: &[u8]) -> DriftlineResult<MeasurementPacket> {
    MeasurementPacket::parse(buf)
}
