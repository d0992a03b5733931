//! Fixed-layout NEVOD records.
//!
//! All structures are packed little endian with no padding, exactly as the NEVOD
//! acquisition writes them. Sizes are checked in the tests below.
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};

use super::constants::*;
use super::error::CodecError;

fn invalid_data(msg: String) -> CodecError {
    CodecError::Format(std::io::Error::new(ErrorKind::InvalidData, msg))
}

fn write_u16s<W: Write>(writer: &mut W, values: &[u16]) -> std::io::Result<()> {
    values
        .iter()
        .try_for_each(|v| writer.write_u16::<LittleEndian>(*v))
}

fn write_i16s<W: Write>(writer: &mut W, values: &[i16]) -> std::io::Result<()> {
    values
        .iter()
        .try_for_each(|v| writer.write_i16::<LittleEndian>(*v))
}

/// Date and time stamp used in NEVOD record headers (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NevodDateTime {
    pub hsecond: u8,
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl NevodDateTime {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut b = [0u8; 6];
        reader.read_exact(&mut b)?;
        Ok(Self {
            hsecond: b[0],
            second: b[1],
            minute: b[2],
            hour: b[3],
            day: b[4],
            month: b[5],
            year: reader.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(&[
            self.hsecond,
            self.second,
            self.minute,
            self.hour,
            self.day,
            self.month,
        ])?;
        writer.write_u16::<LittleEndian>(self.year)?;
        Ok(())
    }
}

/// Per-trigger summary of the NEVOD array.
///
/// This is the part of a NEVOD event that is attached to a correlated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NevodEventMeta {
    pub event: u32,
    pub run: u32,
    pub trig_nvd: u16,
    /// Number of triggered modules
    pub n_lam: i16,
    pub n_lam_sct: i16,
    pub n_fifo_a: i16,
    pub n_fifo_b: i16,
    pub n_fifo_c: i16,
    pub n_fifo_sct: i16,
    /// Wait time for this event in 100 ns ticks
    pub wait_time: u32,
    pub all_time: [u32; 2],
    pub pressure: u32,
    pub temperature: u32,
    pub id_decor: u32,
    pub status_reg: [[u16; 2]; 8],
    pub mask_bek: u32,
    pub mask_bep: u32,
    pub n_bek: i16,
    pub n_bep: i16,
}

impl NevodEventMeta {
    /// True for the all-zero record written in place of missing NEVOD data
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut meta = Self {
            event: reader.read_u32::<LittleEndian>()?,
            run: reader.read_u32::<LittleEndian>()?,
            trig_nvd: reader.read_u16::<LittleEndian>()?,
            n_lam: reader.read_i16::<LittleEndian>()?,
            n_lam_sct: reader.read_i16::<LittleEndian>()?,
            n_fifo_a: reader.read_i16::<LittleEndian>()?,
            n_fifo_b: reader.read_i16::<LittleEndian>()?,
            n_fifo_c: reader.read_i16::<LittleEndian>()?,
            n_fifo_sct: reader.read_i16::<LittleEndian>()?,
            wait_time: reader.read_u32::<LittleEndian>()?,
            ..Default::default()
        };
        reader.read_u32_into::<LittleEndian>(&mut meta.all_time)?;
        meta.pressure = reader.read_u32::<LittleEndian>()?;
        meta.temperature = reader.read_u32::<LittleEndian>()?;
        meta.id_decor = reader.read_u32::<LittleEndian>()?;
        for reg in meta.status_reg.iter_mut() {
            reader.read_u16_into::<LittleEndian>(reg)?;
        }
        meta.mask_bek = reader.read_u32::<LittleEndian>()?;
        meta.mask_bep = reader.read_u32::<LittleEndian>()?;
        meta.n_bek = reader.read_i16::<LittleEndian>()?;
        meta.n_bep = reader.read_i16::<LittleEndian>()?;
        Ok(meta)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_u32::<LittleEndian>(self.event)?;
        writer.write_u32::<LittleEndian>(self.run)?;
        writer.write_u16::<LittleEndian>(self.trig_nvd)?;
        write_i16s(
            writer,
            &[
                self.n_lam,
                self.n_lam_sct,
                self.n_fifo_a,
                self.n_fifo_b,
                self.n_fifo_c,
                self.n_fifo_sct,
            ],
        )?;
        writer.write_u32::<LittleEndian>(self.wait_time)?;
        for v in self.all_time.iter() {
            writer.write_u32::<LittleEndian>(*v)?;
        }
        writer.write_u32::<LittleEndian>(self.pressure)?;
        writer.write_u32::<LittleEndian>(self.temperature)?;
        writer.write_u32::<LittleEndian>(self.id_decor)?;
        for reg in self.status_reg.iter() {
            write_u16s(writer, reg)?;
        }
        writer.write_u32::<LittleEndian>(self.mask_bek)?;
        writer.write_u32::<LittleEndian>(self.mask_bep)?;
        writer.write_i16::<LittleEndian>(self.n_bek)?;
        writer.write_i16::<LittleEndian>(self.n_bep)?;
        Ok(())
    }

    fn module_counts(&self) -> Result<(usize, usize), CodecError> {
        let n_bek = usize::try_from(self.n_bek)
            .ok()
            .filter(|n| *n <= MAX_BEK)
            .ok_or_else(|| invalid_data(format!("invalid BEK count {}", self.n_bek)))?;
        let n_bep = usize::try_from(self.n_bep)
            .ok()
            .filter(|n| *n <= MAX_BEP)
            .ok_or_else(|| invalid_data(format!("invalid BEP count {}", self.n_bep)))?;
        Ok((n_bek, n_bep))
    }
}

/// Event data from one BEK (scintillator module controller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BekEvent {
    pub id_bek: [i16; 2],
    pub mask_ksm: i16,
    pub mask_hit: [i16; 4],
    /// ADC codes `[ksm][pmt][dynode 12, dynode 9]`
    pub acp: [[[u16; 2]; 6]; 4],
    pub fifo_a: [u16; 4],
    pub fifo_b: [u16; 4],
    pub fifo_c: [u16; 4],
    pub mask_trig: [u16; 4],
}

impl BekEvent {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut bek = Self::default();
        reader.read_i16_into::<LittleEndian>(&mut bek.id_bek)?;
        bek.mask_ksm = reader.read_i16::<LittleEndian>()?;
        reader.read_i16_into::<LittleEndian>(&mut bek.mask_hit)?;
        for ksm in bek.acp.iter_mut() {
            for pmt in ksm.iter_mut() {
                reader.read_u16_into::<LittleEndian>(pmt)?;
            }
        }
        reader.read_u16_into::<LittleEndian>(&mut bek.fifo_a)?;
        reader.read_u16_into::<LittleEndian>(&mut bek.fifo_b)?;
        reader.read_u16_into::<LittleEndian>(&mut bek.fifo_c)?;
        reader.read_u16_into::<LittleEndian>(&mut bek.mask_trig)?;
        Ok(bek)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_i16s(writer, &self.id_bek)?;
        writer.write_i16::<LittleEndian>(self.mask_ksm)?;
        write_i16s(writer, &self.mask_hit)?;
        for ksm in self.acp.iter() {
            for pmt in ksm.iter() {
                write_u16s(writer, pmt)?;
            }
        }
        write_u16s(writer, &self.fifo_a)?;
        write_u16s(writer, &self.fifo_b)?;
        write_u16s(writer, &self.fifo_c)?;
        write_u16s(writer, &self.mask_trig)?;
        Ok(())
    }
}

/// Event data from one BEP (SCT counter controller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BepEvent {
    pub id_bek: [i16; 2],
    pub mask_ksm: i16,
    pub mask_hit: [u8; 8],
    pub acp: [[u16; 5]; 8],
    pub fifo_sct: [[u16; 5]; 8],
    pub mask_trig: [u8; 8],
}

impl BepEvent {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut bep = Self::default();
        reader.read_i16_into::<LittleEndian>(&mut bep.id_bek)?;
        bep.mask_ksm = reader.read_i16::<LittleEndian>()?;
        reader.read_exact(&mut bep.mask_hit)?;
        for ksm in bep.acp.iter_mut() {
            reader.read_u16_into::<LittleEndian>(ksm)?;
        }
        for ksm in bep.fifo_sct.iter_mut() {
            reader.read_u16_into::<LittleEndian>(ksm)?;
        }
        reader.read_exact(&mut bep.mask_trig)?;
        Ok(bep)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_i16s(writer, &self.id_bek)?;
        writer.write_i16::<LittleEndian>(self.mask_ksm)?;
        writer.write_all(&self.mask_hit)?;
        for ksm in self.acp.iter() {
            write_u16s(writer, ksm)?;
        }
        for ksm in self.fifo_sct.iter() {
            write_u16s(writer, ksm)?;
        }
        writer.write_all(&self.mask_trig)?;
        Ok(())
    }
}

/// Header of a DECOR event embedded in a NEVOD event record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecorEventMeta {
    pub start: [u8; 6],
    pub kind: i16,
    pub run: u32,
    pub event: u32,
    pub hund: u8,
    pub sec: u8,
    pub min: u8,
    pub hour: u8,
    pub day: i8,
    pub mon: i8,
    pub year: i16,
    pub mcntr: u32,
    pub len: i16,
    pub trig: u16,
    pub wait_time: u32,
    pub history: [[u8; 16]; 2],
    pub counter: [[u16; 8]; 2],
    pub mask_lam_chan: [u8; 16],
    pub mask_len_mask_mask: u32,
    pub mask_cntr: u32,
    pub len_all_data: i16,
}

impl DecorEventMeta {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut meta = Self::default();
        reader.read_exact(&mut meta.start)?;
        meta.kind = reader.read_i16::<LittleEndian>()?;
        meta.run = reader.read_u32::<LittleEndian>()?;
        meta.event = reader.read_u32::<LittleEndian>()?;
        meta.hund = reader.read_u8()?;
        meta.sec = reader.read_u8()?;
        meta.min = reader.read_u8()?;
        meta.hour = reader.read_u8()?;
        meta.day = reader.read_i8()?;
        meta.mon = reader.read_i8()?;
        meta.year = reader.read_i16::<LittleEndian>()?;
        meta.mcntr = reader.read_u32::<LittleEndian>()?;
        meta.len = reader.read_i16::<LittleEndian>()?;
        meta.trig = reader.read_u16::<LittleEndian>()?;
        meta.wait_time = reader.read_u32::<LittleEndian>()?;
        for h in meta.history.iter_mut() {
            reader.read_exact(h)?;
        }
        for c in meta.counter.iter_mut() {
            reader.read_u16_into::<LittleEndian>(c)?;
        }
        reader.read_exact(&mut meta.mask_lam_chan)?;
        meta.mask_len_mask_mask = reader.read_u32::<LittleEndian>()?;
        meta.mask_cntr = reader.read_u32::<LittleEndian>()?;
        meta.len_all_data = reader.read_i16::<LittleEndian>()?;
        Ok(meta)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(&self.start)?;
        writer.write_i16::<LittleEndian>(self.kind)?;
        writer.write_u32::<LittleEndian>(self.run)?;
        writer.write_u32::<LittleEndian>(self.event)?;
        writer.write_all(&[self.hund, self.sec, self.min, self.hour])?;
        writer.write_i8(self.day)?;
        writer.write_i8(self.mon)?;
        writer.write_i16::<LittleEndian>(self.year)?;
        writer.write_u32::<LittleEndian>(self.mcntr)?;
        writer.write_i16::<LittleEndian>(self.len)?;
        writer.write_u16::<LittleEndian>(self.trig)?;
        writer.write_u32::<LittleEndian>(self.wait_time)?;
        for h in self.history.iter() {
            writer.write_all(h)?;
        }
        for c in self.counter.iter() {
            write_u16s(writer, c)?;
        }
        writer.write_all(&self.mask_lam_chan)?;
        writer.write_u32::<LittleEndian>(self.mask_len_mask_mask)?;
        writer.write_u32::<LittleEndian>(self.mask_cntr)?;
        writer.write_i16::<LittleEndian>(self.len_all_data)?;
        Ok(())
    }
}

/// A DECOR event carried inside a NEVOD event: header plus packed strip data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecorEvent {
    pub meta: DecorEventMeta,
    pub data: Vec<u8>,
}

impl DecorEvent {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let meta = DecorEventMeta::read_from(reader)?;
        let len = usize::try_from(meta.len_all_data)
            .ok()
            .filter(|n| *n <= DECOR_EVENT_BUFFER_SIZE)
            .ok_or_else(|| invalid_data(format!("invalid DECOR data length {}", meta.len_all_data)))?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        Ok(Self { meta, data })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        let mut meta = self.meta;
        meta.len_all_data = self.data.len() as i16;
        meta.write_to(writer)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

/// The optional DECOR block trailing a NEVOD event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecorBlock {
    /// Mask of the controllers polled for this event
    pub conf_event: u32,
    pub event: Option<DecorEvent>,
}

/// A complete NEVOD event record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NevodEvent {
    pub meta: NevodEventMeta,
    pub bek: Vec<BekEvent>,
    pub bep: Vec<BepEvent>,
    pub decor: Option<DecorBlock>,
}

impl NevodEvent {
    /// Decode the event body of a NEVOD event record, including the trailing
    /// additional-data block. Reserved additional words are skipped.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let meta = NevodEventMeta::read_from(reader)?;
        let (n_bek, n_bep) = meta.module_counts()?;
        let bek = (0..n_bek)
            .map(|_| BekEvent::read_from(reader))
            .collect::<Result<Vec<_>, _>>()?;
        let bep = (0..n_bep)
            .map(|_| BepEvent::read_from(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let mut len_add = [0u8; 2];
        reader.read_exact(&mut len_add)?;
        if len_add[0] != 0 {
            super::codec::skip_bytes(reader, 4 * len_add[0] as u64)?;
        }
        let decor = if len_add[1] != 0 {
            let conf_event = reader.read_u32::<LittleEndian>()?;
            let len_event = reader.read_i16::<LittleEndian>()?;
            let event = if len_event != 0 {
                Some(DecorEvent::read_from(reader)?)
            } else {
                None
            };
            Some(DecorBlock { conf_event, event })
        } else {
            None
        };

        Ok(Self {
            meta,
            bek,
            bep,
            decor,
        })
    }

    /// Encode the event body. Module counts in the meta are taken from the payload vectors.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        let mut meta = self.meta;
        meta.n_bek = self.bek.len() as i16;
        meta.n_bep = self.bep.len() as i16;
        meta.write_to(writer)?;
        for bek in self.bek.iter() {
            bek.write_to(writer)?;
        }
        for bep in self.bep.iter() {
            bep.write_to(writer)?;
        }
        match &self.decor {
            Some(block) => {
                writer.write_all(&[0, 1])?;
                writer.write_u32::<LittleEndian>(block.conf_event)?;
                match &block.event {
                    Some(event) => {
                        let len = DECOR_EVENT_META_SIZE + event.data.len();
                        writer.write_i16::<LittleEndian>(len as i16)?;
                        event.write_to(writer)?;
                    }
                    None => writer.write_i16::<LittleEndian>(0)?,
                }
            }
            None => writer.write_all(&[0, 0])?,
        }
        Ok(())
    }
}
