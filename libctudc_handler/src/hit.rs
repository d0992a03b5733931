use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt::Display;
use std::io::{Read, Write};

use super::constants::*;
use super::error::CodecError;

/// Which edge of the discriminator pulse the TDC latched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeType {
    #[default]
    Leading,
    Trailing,
    Other(u8),
}

impl From<u8> for EdgeType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Leading,
            1 => Self::Trailing,
            v => Self::Other(v),
        }
    }
}

impl From<EdgeType> for u8 {
    fn from(value: EdgeType) -> Self {
        match value {
            EdgeType::Leading => 0,
            EdgeType::Trailing => 1,
            EdgeType::Other(v) => v,
        }
    }
}

impl Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leading => write!(f, "leading"),
            Self::Trailing => write!(f, "trailing"),
            Self::Other(v) => write!(f, "edge({v})"),
        }
    }
}

/// A single TDC measurement.
///
/// On disk the chamber, wire and edge type share one packed 32 bit channel word
/// (bits 0-7 wire, 8-23 chamber, 28-31 edge). It is unpacked here and never
/// leaves this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hit {
    pub chamber: u16,
    pub wire: u8,
    pub edge: EdgeType,
    /// Drift time in TDC ticks
    pub time: u32,
}

impl Hit {
    pub fn new(chamber: u16, wire: u8, edge: EdgeType, time: u32) -> Self {
        Self {
            chamber,
            wire,
            edge,
            time,
        }
    }

    fn from_raw(channel: u32, time: u32) -> Self {
        Self {
            wire: (channel & CHANNEL_WIRE_MASK) as u8,
            chamber: ((channel >> CHANNEL_CHAMBER_SHIFT) & CHANNEL_CHAMBER_MASK) as u16,
            edge: EdgeType::from((channel >> CHANNEL_EDGE_SHIFT) as u8),
            time,
        }
    }

    fn channel(&self) -> u32 {
        let edge: u8 = self.edge.into();
        (self.wire as u32)
            | ((self.chamber as u32) << CHANNEL_CHAMBER_SHIFT)
            | (((edge & 0xF) as u32) << CHANNEL_EDGE_SHIFT)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let channel = reader.read_u32::<LittleEndian>()?;
        let time = reader.read_u32::<LittleEndian>()?;
        Ok(Self::from_raw(channel, time))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_u32::<LittleEndian>(self.channel())?;
        writer.write_u32::<LittleEndian>(self.time)?;
        Ok(())
    }
}

impl Display for Hit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hit[{}, {}, {}]: {}",
            self.chamber, self.wire, self.edge, self.time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_channel_unpacking() {
        // wire 3, chamber 0x0102, trailing edge
        let channel: u32 = 0x1001_0203;
        let mut bytes = channel.to_le_bytes().to_vec();
        bytes.extend_from_slice(&777u32.to_le_bytes());
        let hit = Hit::read_from(&mut Cursor::new(bytes.clone())).unwrap();
        assert_eq!(hit, Hit::new(0x0102, 3, EdgeType::Trailing, 777));

        let mut out = Vec::new();
        hit.write_to(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_unknown_edge_is_preserved() {
        let hit = Hit::new(15, 2, EdgeType::Other(9), 1);
        let mut out = Vec::new();
        hit.write_to(&mut out).unwrap();
        assert_eq!(Hit::read_from(&mut Cursor::new(out)).unwrap(), hit);
    }

    #[test]
    fn test_short_read() {
        let bytes = vec![0u8; 6];
        assert!(matches!(
            Hit::read_from(&mut Cursor::new(bytes)),
            Err(CodecError::Format(_))
        ));
    }
}
