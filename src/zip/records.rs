use std::io::{self, Cursor, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Version 2.0, both made-by and needed-to-extract
const VERSION: u16 = 0x14;
const METHOD_DEFLATE: u16 = 8;
/// Internal attributes: text file
const INTERNAL_ATTR_TEXT: u16 = 1;
const EXTERNAL_ATTR: u32 = 2;

/// Extra field id used to pad a local header to a chosen length
pub const PADDING_EXTRA_ID: u16 = 0x5150;

/// MS-DOS packed modification time and date
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// Pack a civil date and time; seconds are stored halved, years before
    /// 1980 clamp to the DOS epoch
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let year = year.clamp(1980, 2107);
        Self {
            time: (u16::from(hour) << 11) | (u16::from(minute) << 5) | u16::from(second / 2),
            date: ((year - 1980) << 9) | (u16::from(month) << 5) | u16::from(day),
        }
    }

    /// UTC wall clock at `time`
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let (days, rem) = (secs / 86_400, secs % 86_400);
        let (year, month, day) = civil_from_days(days as i64);
        Self::new(
            year.clamp(0, u16::MAX as i64) as u16,
            month,
            day,
            (rem / 3600) as u8,
            (rem % 3600 / 60) as u8,
            (rem % 60) as u8,
        )
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Local File Header - 30 bytes plus name and extra field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;
    /// Offset of the CRC-32 field from the start of the record
    pub const CRC_OFFSET: usize = 14;

    pub fn encoded_len(&self) -> usize {
        Self::SIZE + self.name.len() + self.extra.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION)?;
        w.write_u16::<LittleEndian>(0)?; // flags
        w.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name.len() as u16)?;
        w.write_u16::<LittleEndian>(self.extra.len() as u16)?;
        w.write_all(&self.name)?;
        w.write_all(&self.extra)
    }

    /// Parse a header at the start of `data`; `None` if it is not one
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || &data[..4] != Self::SIGNATURE {
            return None;
        }
        let mut cursor = Cursor::new(&data[8..Self::SIZE]);
        let _method = cursor.read_u16::<LittleEndian>().ok()?;
        let time = cursor.read_u16::<LittleEndian>().ok()?;
        let date = cursor.read_u16::<LittleEndian>().ok()?;
        let crc32 = cursor.read_u32::<LittleEndian>().ok()?;
        let compressed_size = cursor.read_u32::<LittleEndian>().ok()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>().ok()?;
        let name_len = cursor.read_u16::<LittleEndian>().ok()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>().ok()? as usize;

        let name_end = Self::SIZE + name_len;
        let extra_end = name_end + extra_len;
        if data.len() < extra_end {
            return None;
        }
        Some(Self {
            modified: DosDateTime { time, date },
            crc32,
            compressed_size,
            uncompressed_size,
            name: data[Self::SIZE..name_end].to_vec(),
            extra: data[name_end..extra_end].to_vec(),
        })
    }
}

/// Central Directory File Header - 46 bytes plus name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    /// Per-entry file comment
    pub comment: Vec<u8>,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;
    pub const CRC_OFFSET: usize = 16;

    pub fn encoded_len(&self) -> usize {
        Self::SIZE + self.name.len() + self.comment.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION)?; // made by
        w.write_u16::<LittleEndian>(VERSION)?; // needed
        w.write_u16::<LittleEndian>(0)?; // flags
        w.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?; // extra
        w.write_u16::<LittleEndian>(self.comment.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?; // disk
        w.write_u16::<LittleEndian>(INTERNAL_ATTR_TEXT)?;
        w.write_u32::<LittleEndian>(EXTERNAL_ATTR)?;
        w.write_u32::<LittleEndian>(self.local_header_offset)?;
        w.write_all(&self.name)?;
        w.write_all(&self.comment)
    }
}

/// End of Central Directory (EOCD) - 22 bytes, no comment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(0)?; // this disk
        w.write_u16::<LittleEndian>(0)?; // disk with the directory
        w.write_u16::<LittleEndian>(self.entries)?;
        w.write_u16::<LittleEndian>(self.entries)?;
        w.write_u32::<LittleEndian>(self.cd_size)?;
        w.write_u32::<LittleEndian>(self.cd_offset)?;
        w.write_u16::<LittleEndian>(0) // comment
    }

    /// Parse the record ending `data`
    pub fn from_tail(data: &[u8]) -> Option<Self> {
        let start = data.len().checked_sub(Self::SIZE)?;
        let record = &data[start..];
        if &record[..4] != Self::SIGNATURE {
            return None;
        }
        let mut cursor = Cursor::new(&record[8..]);
        let _disk_entries = cursor.read_u16::<LittleEndian>().ok()?;
        Some(Self {
            entries: cursor.read_u16::<LittleEndian>().ok()?,
            cd_size: cursor.read_u32::<LittleEndian>().ok()?,
            cd_offset: cursor.read_u32::<LittleEndian>().ok()?,
        })
    }
}

/// Extra field that pads a local header by exactly `len` bytes.
///
/// # Panics
///
/// If `len` is 1 to 3: the field's own id and size take four bytes.
pub fn padding_extra(len: usize) -> Vec<u8> {
    if len == 0 {
        return Vec::new();
    }
    assert!(len >= 4, "padding of {len} bytes cannot hold an extra field header");
    let mut extra = Vec::with_capacity(len);
    extra.extend_from_slice(&PADDING_EXTRA_ID.to_le_bytes());
    extra.extend_from_slice(&((len - 4) as u16).to_le_bytes());
    extra.resize(len, 0);
    extra
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> LocalFileHeader {
        LocalFileHeader {
            modified: DosDateTime { time: 0x6000, date: 0x5A21 },
            crc32: 0xDEAD_BEEF,
            compressed_size: 10,
            uncompressed_size: 20,
            name: b"hello.txt".to_vec(),
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_dos_date_time() {
        let t = DosDateTime::new(2024, 3, 15, 13, 45, 31);
        assert_eq!(t.time, (13 << 11) | (45 << 5) | 15);
        assert_eq!(t.date, (44 << 9) | (3 << 5) | 15);
        assert_eq!(DosDateTime::new(1970, 1, 1, 0, 0, 0).date, (1 << 5) | 1);
    }

    #[test]
    fn test_from_system_time() {
        // 2021-02-28 23:59:58 UTC
        let time = UNIX_EPOCH + std::time::Duration::from_secs(1_614_556_798);
        assert_eq!(DosDateTime::from_system_time(time), DosDateTime::new(2021, 2, 28, 23, 59, 58));
        // 2000-03-01 00:00:00 UTC, just past a leap day
        let time = UNIX_EPOCH + std::time::Duration::from_secs(951_868_800);
        assert_eq!(DosDateTime::from_system_time(time), DosDateTime::new(2000, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_local_header_layout() {
        let mut buf = Vec::new();
        header().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), header().encoded_len());
        assert_eq!(&buf[..4], b"PK\x03\x04");
        assert_eq!(&buf[4..10], &[0x14, 0, 0, 0, 8, 0]);
        let crc = LocalFileHeader::CRC_OFFSET;
        assert_eq!(&buf[crc..crc + 4], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&buf[30..], b"hello.txt");
        assert_eq!(LocalFileHeader::from_bytes(&buf), Some(header()));
        assert_eq!(LocalFileHeader::from_bytes(&buf[..29]), None);
    }

    #[test]
    fn test_central_header_layout() {
        let cd = CentralDirectoryHeader {
            modified: DosDateTime::default(),
            crc32: 0x0102_0304,
            compressed_size: 1,
            uncompressed_size: 2,
            name: b"a".to_vec(),
            comment: b"xyz".to_vec(),
            local_header_offset: 77,
        };
        let mut buf = Vec::new();
        cd.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 50);
        assert_eq!(buf.len(), cd.encoded_len());
        assert_eq!(&buf[32..34], &[3, 0]);
        assert_eq!(&buf[46..], b"axyz");
        assert_eq!(&buf[..4], b"PK\x01\x02");
        let crc = CentralDirectoryHeader::CRC_OFFSET;
        assert_eq!(&buf[crc..crc + 4], &[4, 3, 2, 1]);
        assert_eq!(&buf[36..38], &[1, 0]);
        assert_eq!(&buf[38..42], &[2, 0, 0, 0]);
        assert_eq!(&buf[42..46], &77u32.to_le_bytes());
    }

    #[test]
    fn test_end_of_central_directory() {
        let eocd = EndOfCentralDirectory { entries: 2, cd_size: 100, cd_offset: 500 };
        let mut buf = vec![0xAA; 7];
        eocd.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 7 + EndOfCentralDirectory::SIZE);
        assert_eq!(EndOfCentralDirectory::from_tail(&buf), Some(eocd));
        assert_eq!(EndOfCentralDirectory::from_tail(&buf[..20]), None);
    }

    #[test]
    fn test_padding_extra() {
        assert!(padding_extra(0).is_empty());
        let extra = padding_extra(9);
        assert_eq!(extra, vec![0x50, 0x51, 5, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "cannot hold")]
    fn test_padding_too_small() {
        padding_extra(2);
    }
}
