// EDF (European Data Format) file reader/writer implementation
// Specification: https://www.edfplus.info/specs/edf.html

use crate::error::{EegError, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

const MAIN_HEADER_BYTES: usize = 256;
const SIGNAL_HEADER_BYTES: usize = 256;
/// Byte offset of the "number of data records" field in the main header
const NUM_RECORDS_OFFSET: u64 = 236;

#[derive(Debug, Clone)]
pub struct EdfHeader {
    pub version: String,              // 8 bytes: version of this data format (0)
    pub patient_id: String,           // 80 bytes: local patient identification
    pub recording_id: String,         // 80 bytes: local recording identification
    pub start_date: String,           // 8 bytes: startdate of recording (dd.mm.yy)
    pub start_time: String,           // 8 bytes: starttime of recording (hh.mm.ss)
    pub header_bytes: usize,          // 8 bytes: number of bytes in header record
    pub reserved: String,             // 44 bytes: reserved ("EDF+C"/"EDF+D" for EDF+)
    pub num_data_records: i64,        // 8 bytes: number of data records (-1 if unknown)
    pub duration_of_data_record: f64, // 8 bytes: duration of a data record, in seconds
    pub num_signals: usize,           // 4 bytes: number of signals (channels)
}

impl EdfHeader {
    pub fn is_edf_plus(&self) -> bool {
        self.reserved.starts_with("EDF+")
    }
}

#[derive(Debug, Clone)]
pub struct EdfSignalHeader {
    pub label: String,                 // 16 bytes: label (e.g. EEG Fpz-Cz)
    pub transducer_type: String,       // 80 bytes: transducer type (e.g. AgAgCl electrode)
    pub physical_dimension: String,    // 8 bytes: physical dimension (e.g. uV)
    pub physical_minimum: f64,         // 8 bytes: physical minimum
    pub physical_maximum: f64,         // 8 bytes: physical maximum
    pub digital_minimum: i64,          // 8 bytes: digital minimum
    pub digital_maximum: i64,          // 8 bytes: digital maximum
    pub prefiltering: String,          // 80 bytes: prefiltering
    pub num_samples_per_record: usize, // 8 bytes: number of samples in each data record
    pub reserved: String,              // 32 bytes: reserved
}

impl EdfSignalHeader {
    /// Signal header with the usual 16-bit digital range.
    pub fn new(label: &str, unit: &str, physical_range: (f64, f64), samples_per_record: usize) -> Self {
        Self {
            label: label.to_string(),
            transducer_type: String::new(),
            physical_dimension: unit.to_string(),
            physical_minimum: physical_range.0,
            physical_maximum: physical_range.1,
            digital_minimum: -32768,
            digital_maximum: 32767,
            prefiltering: String::new(),
            num_samples_per_record: samples_per_record,
            reserved: String::new(),
        }
    }

    pub fn sample_frequency(&self, record_duration: f64) -> f64 {
        self.num_samples_per_record as f64 / record_duration
    }

    pub fn gain(&self) -> f64 {
        (self.physical_maximum - self.physical_minimum)
            / (self.digital_maximum - self.digital_minimum) as f64
    }

    pub fn offset(&self) -> f64 {
        self.physical_maximum - self.gain() * self.digital_maximum as f64
    }

    pub fn is_annotation(&self) -> bool {
        self.label.eq_ignore_ascii_case("EDF Annotations")
    }

    /// Factor converting this signal's physical unit to microvolts, if it is a voltage.
    pub fn microvolt_scale(&self) -> Option<f64> {
        match self.physical_dimension.trim() {
            "uV" | "µV" | "μV" | "uv" => Some(1.0),
            "mV" | "mv" => Some(1e3),
            "V" | "v" => Some(1e6),
            "nV" | "nv" => Some(1e-3),
            _ => None,
        }
    }
}

pub struct EdfReader {
    file: BufReader<File>,
    pub header: EdfHeader,
    pub signal_headers: Vec<EdfSignalHeader>,
    data_start_offset: u64,
    record_size: usize,
}

impl EdfReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EegError::FileNotFound(path.display().to_string())
            } else {
                EegError::IoError(e)
            }
        })?;
        let file_len = file.metadata()?.len();
        let mut file = BufReader::new(file);

        let mut header = Self::read_header(&mut file)?;
        let signal_headers = Self::read_signal_headers(&mut file, header.num_signals)?;

        let data_start_offset = header.header_bytes as u64;
        let record_size: usize = signal_headers
            .iter()
            .map(|sh| sh.num_samples_per_record * 2)
            .sum();

        // Writers that crash before finalizing leave -1 behind
        if header.num_data_records < 0 && record_size > 0 {
            header.num_data_records =
                (file_len.saturating_sub(data_start_offset) / record_size as u64) as i64;
            log::warn!(
                "EDF header has unknown record count, inferred {} from file size",
                header.num_data_records
            );
        }

        Ok(Self {
            file,
            header,
            signal_headers,
            data_start_offset,
            record_size,
        })
    }

    fn read_fixed_string<R: Read>(reader: &mut R, size: usize) -> Result<String> {
        let mut buffer = vec![0u8; size];
        reader
            .read_exact(&mut buffer)
            .map_err(|e| EegError::edf(format!("Truncated header: {}", e)))?;
        Ok(String::from_utf8_lossy(&buffer).trim().to_string())
    }

    fn read_number<R: Read, T: std::str::FromStr>(
        reader: &mut R,
        size: usize,
        field: &str,
    ) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let s = Self::read_fixed_string(reader, size)?;
        s.parse::<T>()
            .map_err(|e| EegError::edf(format!("Invalid {} '{}': {}", field, s, e)))
    }

    fn read_header<R: Read>(reader: &mut R) -> Result<EdfHeader> {
        let version = Self::read_fixed_string(reader, 8)?;
        let patient_id = Self::read_fixed_string(reader, 80)?;
        let recording_id = Self::read_fixed_string(reader, 80)?;
        let start_date = Self::read_fixed_string(reader, 8)?;
        let start_time = Self::read_fixed_string(reader, 8)?;
        let header_bytes = Self::read_number(reader, 8, "header bytes")?;
        let reserved = Self::read_fixed_string(reader, 44)?;
        let num_data_records = Self::read_number(reader, 8, "number of data records")?;
        let duration_of_data_record: f64 = Self::read_number(reader, 8, "record duration")?;
        let num_signals = Self::read_number(reader, 4, "number of signals")?;

        if duration_of_data_record <= 0.0 {
            return Err(EegError::edf(format!(
                "Record duration must be positive, got {}",
                duration_of_data_record
            )));
        }

        log::debug!(
            "EDF header parsed: num_data_records={}, duration_of_data_record={}, num_signals={}",
            num_data_records,
            duration_of_data_record,
            num_signals
        );

        Ok(EdfHeader {
            version,
            patient_id,
            recording_id,
            start_date,
            start_time,
            header_bytes,
            reserved,
            num_data_records,
            duration_of_data_record,
            num_signals,
        })
    }

    fn read_signal_headers<R: Read>(
        reader: &mut R,
        num_signals: usize,
    ) -> Result<Vec<EdfSignalHeader>> {
        // Fields are stored column-wise: every label, then every transducer, ...
        let mut column = |size: usize| -> Result<Vec<String>> {
            (0..num_signals)
                .map(|_| Self::read_fixed_string(reader, size))
                .collect()
        };

        let labels = column(16)?;
        let transducer_types = column(80)?;
        let physical_dimensions = column(8)?;
        let physical_minimums = column(8)?;
        let physical_maximums = column(8)?;
        let digital_minimums = column(8)?;
        let digital_maximums = column(8)?;
        let prefilterings = column(80)?;
        let num_samples_per_records = column(8)?;
        let reserveds = column(32)?;

        fn parse<T: std::str::FromStr>(s: &str, field: &str) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            s.parse::<T>()
                .map_err(|e| EegError::edf(format!("Invalid {} '{}': {}", field, s, e)))
        }

        let mut signal_headers = Vec::with_capacity(num_signals);
        for i in 0..num_signals {
            let header = EdfSignalHeader {
                label: labels[i].clone(),
                transducer_type: transducer_types[i].clone(),
                physical_dimension: physical_dimensions[i].clone(),
                physical_minimum: parse(&physical_minimums[i], "physical minimum")?,
                physical_maximum: parse(&physical_maximums[i], "physical maximum")?,
                digital_minimum: parse(&digital_minimums[i], "digital minimum")?,
                digital_maximum: parse(&digital_maximums[i], "digital maximum")?,
                prefiltering: prefilterings[i].clone(),
                num_samples_per_record: parse(&num_samples_per_records[i], "number of samples")?,
                reserved: reserveds[i].clone(),
            };
            if header.digital_maximum == header.digital_minimum {
                return Err(EegError::edf(format!(
                    "Signal '{}' has an empty digital range",
                    header.label
                )));
            }
            signal_headers.push(header);
        }

        Ok(signal_headers)
    }

    pub fn num_records(&self) -> usize {
        self.header.num_data_records.max(0) as usize
    }

    pub fn read_record(&mut self, record_index: usize) -> Result<Vec<Vec<i16>>> {
        if record_index >= self.num_records() {
            return Err(EegError::edf(format!(
                "Record index {} out of bounds ({} records)",
                record_index,
                self.num_records()
            )));
        }

        let record_offset = self.data_start_offset + (record_index * self.record_size) as u64;
        self.file.seek(SeekFrom::Start(record_offset))?;

        let mut buf = vec![0u8; self.record_size];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| EegError::edf(format!("Truncated data record {}: {}", record_index, e)))?;

        let mut signals = Vec::with_capacity(self.signal_headers.len());
        let mut offset = 0;
        for signal_header in &self.signal_headers {
            let len = signal_header.num_samples_per_record * 2;
            let samples = buf[offset..offset + len]
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            signals.push(samples);
            offset += len;
        }

        Ok(signals)
    }

    pub fn read_physical_record(&mut self, record_index: usize) -> Result<Vec<Vec<f64>>> {
        let digital_record = self.read_record(record_index)?;

        // Parallel conversion of digital to physical values across all channels
        let physical_record: Vec<Vec<f64>> = digital_record
            .par_iter()
            .enumerate()
            .map(|(signal_idx, digital_samples)| {
                let signal_header = &self.signal_headers[signal_idx];
                let gain = signal_header.gain();
                let offset = signal_header.offset();

                digital_samples
                    .iter()
                    .map(|&digital| gain * digital as f64 + offset)
                    .collect()
            })
            .collect();

        Ok(physical_record)
    }

    /// Read `num_samples` physical samples starting at `start_sample` for the
    /// given signal indices. All requested signals must share a sample rate.
    pub fn read_signals(
        &mut self,
        signal_indices: &[usize],
        start_sample: usize,
        num_samples: usize,
    ) -> Result<Vec<Vec<f64>>> {
        let Some(&first) = signal_indices.first() else {
            return Ok(Vec::new());
        };
        let per_record = self.signal_headers[first].num_samples_per_record;
        if per_record == 0 {
            return Err(EegError::edf(format!(
                "Signal '{}' has no samples per record",
                self.signal_headers[first].label
            )));
        }

        let mut out: Vec<Vec<f64>> = signal_indices
            .iter()
            .map(|_| Vec::with_capacity(num_samples))
            .collect();

        let start_record = start_sample / per_record;
        let end_sample = start_sample + num_samples;
        let end_record = end_sample.div_ceil(per_record).min(self.num_records());

        for record_idx in start_record..end_record {
            let record = self.read_physical_record(record_idx)?;
            let record_first = record_idx * per_record;
            let from = start_sample.saturating_sub(record_first);
            let to = (end_sample - record_first).min(per_record);
            for (dst, &sig) in out.iter_mut().zip(signal_indices) {
                dst.extend_from_slice(&record[sig][from..to]);
            }
        }

        Ok(out)
    }

    pub fn total_duration(&self) -> f64 {
        self.num_records() as f64 * self.header.duration_of_data_record
    }
}

pub struct EdfWriter {
    file: BufWriter<File>,
    signal_headers: Vec<EdfSignalHeader>,
    records_written: i64,
}

impl EdfWriter {
    pub fn new<P: AsRef<Path>>(
        path: P,
        patient_id: &str,
        recording_id: &str,
        record_duration: f64,
        signal_headers: Vec<EdfSignalHeader>,
    ) -> Result<Self> {
        let num_signals = signal_headers.len();

        let header = EdfHeader {
            version: "0".to_string(),
            patient_id: patient_id.to_string(),
            recording_id: recording_id.to_string(),
            start_date: "01.01.24".to_string(),
            start_time: "00.00.00".to_string(),
            header_bytes: MAIN_HEADER_BYTES + num_signals * SIGNAL_HEADER_BYTES,
            reserved: String::new(),
            num_data_records: -1, // Updated by finalize
            duration_of_data_record: record_duration,
            num_signals,
        };

        let file = File::create(path)?;
        let mut writer = Self {
            file: BufWriter::new(file),
            signal_headers,
            records_written: 0,
        };

        writer.write_header(&header)?;
        Ok(writer)
    }

    fn write_fixed_string(&mut self, s: &str, size: usize) -> Result<()> {
        let mut buffer = vec![b' '; size];
        let bytes = s.as_bytes();
        let copy_len = bytes.len().min(size);
        buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
        self.file.write_all(&buffer)?;
        Ok(())
    }

    fn write_header(&mut self, header: &EdfHeader) -> Result<()> {
        self.write_fixed_string(&header.version, 8)?;
        self.write_fixed_string(&header.patient_id, 80)?;
        self.write_fixed_string(&header.recording_id, 80)?;
        self.write_fixed_string(&header.start_date, 8)?;
        self.write_fixed_string(&header.start_time, 8)?;
        self.write_fixed_string(&header.header_bytes.to_string(), 8)?;
        self.write_fixed_string(&header.reserved, 44)?;
        self.write_fixed_string(&header.num_data_records.to_string(), 8)?;
        self.write_fixed_string(&header.duration_of_data_record.to_string(), 8)?;
        self.write_fixed_string(&header.num_signals.to_string(), 4)?;

        // Signal headers are written column-wise, mirroring the reader
        let column = |f: fn(&EdfSignalHeader) -> String| -> Vec<String> {
            self.signal_headers.iter().map(f).collect()
        };
        let columns = [
            (column(|sh| sh.label.clone()), 16),
            (column(|sh| sh.transducer_type.clone()), 80),
            (column(|sh| sh.physical_dimension.clone()), 8),
            (column(|sh| sh.physical_minimum.to_string()), 8),
            (column(|sh| sh.physical_maximum.to_string()), 8),
            (column(|sh| sh.digital_minimum.to_string()), 8),
            (column(|sh| sh.digital_maximum.to_string()), 8),
            (column(|sh| sh.prefiltering.clone()), 80),
            (column(|sh| sh.num_samples_per_record.to_string()), 8),
            (column(|sh| sh.reserved.clone()), 32),
        ];
        for (values, size) in columns {
            for value in values {
                self.write_fixed_string(&value, size)?;
            }
        }

        Ok(())
    }

    pub fn write_physical_record(&mut self, physical_data: &[Vec<f64>]) -> Result<()> {
        if physical_data.len() != self.signal_headers.len() {
            return Err(EegError::InvalidParameter(format!(
                "Expected {} signals, got {}",
                self.signal_headers.len(),
                physical_data.len()
            )));
        }

        // Parallel conversion of physical to digital, then sequential write
        let digital_data: Result<Vec<Vec<i16>>> = physical_data
            .par_iter()
            .zip(self.signal_headers.par_iter())
            .map(|(physical_samples, signal_header)| {
                if physical_samples.len() != signal_header.num_samples_per_record {
                    return Err(EegError::InvalidParameter(format!(
                        "Signal '{}' expected {} samples, got {}",
                        signal_header.label,
                        signal_header.num_samples_per_record,
                        physical_samples.len()
                    )));
                }

                let gain = signal_header.gain();
                let offset = signal_header.offset();
                let (dmin, dmax) = (
                    signal_header.digital_minimum as f64,
                    signal_header.digital_maximum as f64,
                );

                Ok(physical_samples
                    .iter()
                    .map(|&physical| ((physical - offset) / gain).round().clamp(dmin, dmax) as i16)
                    .collect())
            })
            .collect();

        for digital_samples in digital_data? {
            for digital in digital_samples {
                self.file.write_all(&digital.to_le_bytes())?;
            }
        }

        self.records_written += 1;
        Ok(())
    }

    /// Write the final record count into the header and flush.
    pub fn finalize(mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(NUM_RECORDS_OFFSET))?;
        let count = self.records_written.to_string();
        self.write_fixed_string(&count, 8)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_header_calculations() {
        let header = EdfSignalHeader::new("Test", "uV", (-100.0, 100.0), 256);

        assert_eq!(header.sample_frequency(1.0), 256.0);
        assert!((header.gain() - 0.00305).abs() < 0.001);
        assert_eq!(header.microvolt_scale(), Some(1.0));
    }

    #[test]
    fn test_unit_scales() {
        let mut header = EdfSignalHeader::new("Test", "mV", (-1.0, 1.0), 1);
        assert_eq!(header.microvolt_scale(), Some(1e3));
        header.physical_dimension = "V".to_string();
        assert_eq!(header.microvolt_scale(), Some(1e6));
        header.physical_dimension = "degC".to_string();
        assert_eq!(header.microvolt_scale(), None);
    }

    #[test]
    fn test_write_then_read_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.edf");

        let headers = vec![
            EdfSignalHeader::new("EEG Fz", "uV", (-500.0, 500.0), 4),
            EdfSignalHeader::new("EEG Cz", "uV", (-500.0, 500.0), 4),
        ];
        let mut writer = EdfWriter::new(&path, "X", "Y", 1.0, headers).unwrap();
        writer
            .write_physical_record(&[vec![0.0, 10.0, 20.0, 30.0], vec![-5.0; 4]])
            .unwrap();
        writer
            .write_physical_record(&[vec![40.0, 50.0, 60.0, 70.0], vec![5.0; 4]])
            .unwrap();
        writer.finalize().unwrap();

        let mut reader = EdfReader::new(&path).unwrap();
        assert_eq!(reader.num_records(), 2);
        assert_eq!(reader.header.num_signals, 2);
        assert_eq!(reader.signal_headers[1].label, "EEG Cz");

        let data = reader.read_signals(&[0, 1], 2, 4).unwrap();
        assert_eq!(data[0].len(), 4);
        let expected = [20.0, 30.0, 40.0, 50.0];
        for (got, want) in data[0].iter().zip(expected) {
            assert!((got - want).abs() < 0.05, "{} vs {}", got, want);
        }
        assert!((data[1][1] + 5.0).abs() < 0.05);
        assert!((data[1][2] - 5.0).abs() < 0.05);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EdfReader::new("/nonexistent/file.edf"),
            Err(EegError::FileNotFound(_))
        ));
    }
}
