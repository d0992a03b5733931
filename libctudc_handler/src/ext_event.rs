use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use super::decor_track::DecorTrack;
use super::error::CodecError;
use super::event::Event;
use super::nevod_event::NevodEventMeta;

/// A CTUDC event joined with the matching NEVOD summary and the DECOR reference tracks.
///
/// A CTUDC event without a NEVOD partner carries an all-zero NEVOD meta, which the
/// acquisition never produces itself (event numbers start at one). The record is
/// stored as it is written, so decoding an encoded event gives it back unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtEvent {
    pub ctudc: Event,
    pub nevod: NevodEventMeta,
    pub decor: Vec<DecorTrack>,
}

impl ExtEvent {
    pub fn new(ctudc: Event, nevod: Option<NevodEventMeta>, decor: Vec<DecorTrack>) -> Self {
        Self {
            ctudc,
            nevod: nevod.unwrap_or_default(),
            decor,
        }
    }

    /// The NEVOD summary, None when the event had no NEVOD partner
    pub fn nevod(&self) -> Option<&NevodEventMeta> {
        (!self.nevod.is_empty()).then_some(&self.nevod)
    }

    /// Decode the next record. `Ok(None)` when the stream ended cleanly between records.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>, CodecError> {
        let Some(ctudc) = Event::read_from(reader)? else {
            return Ok(None);
        };
        let nevod = NevodEventMeta::read_from(reader)?;
        let n_tracks = reader.read_u64::<LittleEndian>()?;
        let mut decor = Vec::with_capacity(n_tracks.min(64) as usize);
        for _ in 0..n_tracks {
            decor.push(DecorTrack::read_from(reader)?);
        }
        Ok(Some(Self {
            ctudc,
            nevod,
            decor,
        }))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        self.ctudc.write_to(writer)?;
        self.nevod.write_to(writer)?;
        writer.write_u64::<LittleEndian>(self.decor.len() as u64)?;
        for track in self.decor.iter() {
            track.write_to(writer)?;
        }
        Ok(())
    }
}
