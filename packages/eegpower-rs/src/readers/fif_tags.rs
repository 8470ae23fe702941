//! Sequential FIFF tag scanner
//!
//! The `fiff` crate covers measurement info and raw data buffers. Sensor
//! locations and the bad-channel list are not exposed there, so this module
//! walks the tag chain itself and decodes just those records.
//!
//! Every tag starts with a 16-byte big-endian header:
//! `kind: i32, type: i32, size: i32, next: i32`, followed by `size` bytes.

use crate::error::{EegError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{ErrorKind, Read, Seek, SeekFrom};

const FIFF_BLOCK_START: i32 = 104;
const FIFF_BLOCK_END: i32 = 105;
const FIFF_CH_INFO: i32 = 203;
const FIFF_MNE_CH_NAME_LIST: i32 = 3502;

const FIFFB_MEAS_INFO: i32 = 101;
const FIFFB_MNE_BAD_CHANNELS: i32 = 359;

const FIFFV_NEXT_SEQ: i32 = 0;
const FIFFV_NEXT_NONE: i32 = -1;

const TAG_HEADER_BYTES: u64 = 16;
/// scanNo, logNo, kind, range, cal, coil_type, loc[12], unit, unit_mul, ch_name[16]
const CH_INFO_BYTES: usize = 96;

#[derive(Debug, Clone, PartialEq)]
pub struct TagHeader {
    pub kind: i32,
    pub type_: i32,
    pub size: i32,
    pub next: i32,
    pub pos: u64,
}

/// Decoded `fiffChInfoRec`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    pub scan_no: i32,
    pub log_no: i32,
    pub kind: i32,
    pub range: f32,
    pub cal: f32,
    pub coil_type: i32,
    pub loc: [f32; 12],
    pub unit: i32,
    pub unit_mul: i32,
    pub ch_name: String,
}

impl ChannelRecord {
    /// Sensor origin `r0`, or None when the file stores no location.
    pub fn position(&self) -> Option<[f64; 3]> {
        let r0 = [self.loc[0] as f64, self.loc[1] as f64, self.loc[2] as f64];
        if r0.iter().any(|v| !v.is_finite()) || r0.iter().all(|v| *v == 0.0) {
            None
        } else {
            Some(r0)
        }
    }

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CH_INFO_BYTES {
            return Err(EegError::fif(format!(
                "Channel info record has {} bytes, expected {}",
                data.len(),
                CH_INFO_BYTES
            )));
        }
        let mut cursor = data;
        let scan_no = cursor.read_i32::<BigEndian>()?;
        let log_no = cursor.read_i32::<BigEndian>()?;
        let kind = cursor.read_i32::<BigEndian>()?;
        let range = cursor.read_f32::<BigEndian>()?;
        let cal = cursor.read_f32::<BigEndian>()?;
        let coil_type = cursor.read_i32::<BigEndian>()?;
        let mut loc = [0f32; 12];
        cursor.read_f32_into::<BigEndian>(&mut loc)?;
        let unit = cursor.read_i32::<BigEndian>()?;
        let unit_mul = cursor.read_i32::<BigEndian>()?;
        let name_bytes = &cursor[..16];
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(16);
        let ch_name = String::from_utf8_lossy(&name_bytes[..end]).trim().to_string();

        Ok(Self {
            scan_no,
            log_no,
            kind,
            range,
            cal,
            coil_type,
            loc,
            unit,
            unit_mul,
            ch_name,
        })
    }
}

/// Records pulled out of a FIFF file by [`scan`]
#[derive(Debug, Clone, Default)]
pub struct FifExtras {
    pub channels: Vec<ChannelRecord>,
    pub bad_channels: Vec<String>,
}

impl FifExtras {
    pub fn position_of(&self, ch_name: &str) -> Option<[f64; 3]> {
        self.channels
            .iter()
            .find(|c| c.ch_name == ch_name)
            .and_then(ChannelRecord::position)
    }
}

fn read_tag_header<R: Read>(reader: &mut R, pos: u64) -> Result<Option<TagHeader>> {
    let kind = match reader.read_i32::<BigEndian>() {
        Ok(k) => k,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let type_ = reader.read_i32::<BigEndian>()?;
    let size = reader.read_i32::<BigEndian>()?;
    let next = reader.read_i32::<BigEndian>()?;
    Ok(Some(TagHeader {
        kind,
        type_,
        size,
        next,
        pos,
    }))
}

fn read_tag_data<R: Read>(reader: &mut R, header: &TagHeader) -> Result<Vec<u8>> {
    let mut data = vec![0u8; header.size as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

/// Walk the tag chain from the start of the file, collecting channel info
/// records of the measurement-info block and the bad-channel list.
pub fn scan<R: Read + Seek>(reader: &mut R) -> Result<FifExtras> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let mut extras = FifExtras::default();
    let mut blocks: Vec<i32> = Vec::new();
    let mut pos = 0u64;

    while pos + TAG_HEADER_BYTES <= file_len {
        reader.seek(SeekFrom::Start(pos))?;
        let Some(tag) = read_tag_header(reader, pos)? else {
            break;
        };
        if tag.size < 0 || pos + TAG_HEADER_BYTES + tag.size as u64 > file_len {
            return Err(EegError::fif(format!(
                "Tag {} at byte {} has invalid size {}",
                tag.kind, pos, tag.size
            )));
        }

        match tag.kind {
            FIFF_BLOCK_START => {
                let data = read_tag_data(reader, &tag)?;
                let block = (&data[..]).read_i32::<BigEndian>()?;
                blocks.push(block);
            }
            FIFF_BLOCK_END => {
                blocks.pop();
            }
            FIFF_CH_INFO if blocks.contains(&FIFFB_MEAS_INFO) => {
                let data = read_tag_data(reader, &tag)?;
                extras.channels.push(ChannelRecord::parse(&data)?);
            }
            FIFF_MNE_CH_NAME_LIST if blocks.last() == Some(&FIFFB_MNE_BAD_CHANNELS) => {
                let data = read_tag_data(reader, &tag)?;
                let names = String::from_utf8_lossy(&data);
                extras.bad_channels.extend(
                    names
                        .trim_end_matches('\0')
                        .split(':')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from),
                );
            }
            _ => {}
        }

        pos = match tag.next {
            FIFFV_NEXT_SEQ => pos + TAG_HEADER_BYTES + tag.size as u64,
            FIFFV_NEXT_NONE => break,
            next if (next as u64) > pos => next as u64,
            next => {
                log::warn!("FIFF tag at byte {} points backwards to {}, stopping scan", pos, next);
                break;
            }
        };
    }

    log::debug!(
        "FIFF scan found {} channel records, {} bad channels",
        extras.channels.len(),
        extras.bad_channels.len()
    );
    Ok(extras)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal FIFF byte builder for tests

    pub struct FifBuilder {
        pub bytes: Vec<u8>,
    }

    impl FifBuilder {
        pub fn new() -> Self {
            Self { bytes: Vec::new() }
        }

        pub fn tag_with_next(&mut self, kind: i32, type_: i32, data: &[u8], next: i32) -> &mut Self {
            self.bytes.extend_from_slice(&kind.to_be_bytes());
            self.bytes.extend_from_slice(&type_.to_be_bytes());
            self.bytes.extend_from_slice(&(data.len() as i32).to_be_bytes());
            self.bytes.extend_from_slice(&next.to_be_bytes());
            self.bytes.extend_from_slice(data);
            self
        }

        pub fn tag(&mut self, kind: i32, type_: i32, data: &[u8]) -> &mut Self {
            self.tag_with_next(kind, type_, data, 0)
        }

        /// File id followed by a "no directory" pointer
        pub fn file_header(&mut self) -> &mut Self {
            self.tag(100, 31, &[0u8; 20]).int(101, -1)
        }

        /// Terminating NOP tag
        pub fn end_file(&mut self) -> &mut Self {
            self.tag_with_next(108, 0, &[], -1)
        }

        pub fn int(&mut self, kind: i32, value: i32) -> &mut Self {
            self.tag(kind, 3, &value.to_be_bytes())
        }

        pub fn float(&mut self, kind: i32, value: f32) -> &mut Self {
            self.tag(kind, 4, &value.to_be_bytes())
        }

        pub fn block_start(&mut self, block: i32) -> &mut Self {
            self.tag(104, 3, &block.to_be_bytes())
        }

        pub fn block_end(&mut self, block: i32) -> &mut Self {
            self.tag(105, 3, &block.to_be_bytes())
        }

        pub fn ch_info(&mut self, name: &str, kind: i32, r0: [f32; 3]) -> &mut Self {
            self.ch_info_calibrated(name, kind, r0, 1.0, 1.0)
        }

        pub fn ch_info_calibrated(
            &mut self,
            name: &str,
            kind: i32,
            r0: [f32; 3],
            range: f32,
            cal: f32,
        ) -> &mut Self {
            let mut data = Vec::new();
            data.extend_from_slice(&1i32.to_be_bytes()); // scanNo
            data.extend_from_slice(&1i32.to_be_bytes()); // logNo
            data.extend_from_slice(&kind.to_be_bytes());
            data.extend_from_slice(&range.to_be_bytes());
            data.extend_from_slice(&cal.to_be_bytes());
            data.extend_from_slice(&1i32.to_be_bytes()); // coil_type
            for i in 0..12 {
                let v = if i < 3 { r0[i] } else { 0.0 };
                data.extend_from_slice(&v.to_be_bytes());
            }
            data.extend_from_slice(&107i32.to_be_bytes()); // unit V
            data.extend_from_slice(&0i32.to_be_bytes());
            let mut name_buf = [0u8; 16];
            name_buf[..name.len()].copy_from_slice(name.as_bytes());
            data.extend_from_slice(&name_buf);
            self.tag(203, 30, &data)
        }

        pub fn string(&mut self, kind: i32, s: &str) -> &mut Self {
            self.tag(kind, 10, s.as_bytes())
        }

        /// Float data buffer, `samples[t][ch]` stored time-major
        pub fn data_buffer(&mut self, samples: &[Vec<f32>]) -> &mut Self {
            let data: Vec<u8> = samples
                .iter()
                .flatten()
                .flat_map(|v| v.to_be_bytes())
                .collect();
            self.tag(300, 4, &data)
        }
    }
}
