//! Assembling self-containing archives.
//!
//! A single archive is `P Q S`: the regular entries and the quine entry's
//! local header (`P`), the quine stream (`Q`), and the central directory
//! with its end record (`S`). `Q` inflates to the whole archive.

use tracing::{debug, info, warn};

use super::records::{
    padding_extra, CentralDirectoryHeader, DosDateTime, EndOfCentralDirectory, LocalFileHeader,
};
use crate::crc::{bruteforce, crc32, solve_crc_system, solve_rank1, CrcFile};
use crate::deflate::{inflate, tokenize};
use crate::error::{Error, Result};
use crate::huffman::StaticHuffmanEncoder;
use crate::quine::{generate_quine, generate_quine_loop, Quine};
use crate::{CrcMode, QuineConfig};

/// A file to store next to the quine entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: data.into() }
    }
}

/// Compressed regular entries: their local records and central headers
struct Entries {
    local: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

/// Compress one input with the crate's own encoder
pub fn compress(data: &[u8], config: &QuineConfig) -> Vec<u8> {
    let tokens = tokenize(data, config.window_size, config.lookahead, config.min_match);
    if config.print_tokens {
        let listing: String = tokens.iter().map(|t| t.to_string()).collect();
        debug!(tokens = tokens.len(), "{}", listing);
    }
    let mut encoder = StaticHuffmanEncoder::new();
    encoder.encode(&tokens);
    encoder.into_bytes()
}

fn compress_entries(inputs: &[InputFile], config: &QuineConfig) -> Result<Entries> {
    let mut entries = Entries { local: Vec::new(), central: Vec::new(), count: 0 };
    for input in inputs {
        let compressed = compress(&input.data, config);
        let crc32 = crc32fast::hash(&input.data);
        debug!(
            name = %input.name,
            size = input.data.len(),
            compressed = compressed.len(),
            "Compressed input"
        );

        let offset = entries.local.len() as u32;
        LocalFileHeader {
            modified: config.timestamp,
            crc32,
            compressed_size: compressed.len() as u32,
            uncompressed_size: input.data.len() as u32,
            name: input.name.as_bytes().to_vec(),
            extra: Vec::new(),
        }
        .write_to(&mut entries.local)?;
        entries.local.extend_from_slice(&compressed);

        CentralDirectoryHeader {
            modified: config.timestamp,
            crc32,
            compressed_size: compressed.len() as u32,
            uncompressed_size: input.data.len() as u32,
            name: input.name.as_bytes().to_vec(),
            comment: Vec::new(),
            local_header_offset: offset,
        }
        .write_to(&mut entries.central)?;
        entries.count += 1;
    }
    Ok(entries)
}

/// Longest comment added to a loop archive's quine entry to find closing
/// repeats
const MAX_COMMENT_PADDING: usize = 64;

/// Prefix and suffix around a quine entry, for given entry sizes
struct Frame {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

struct QuineEntry<'a> {
    name: &'a str,
    extra: Vec<u8>,
    comment: Vec<u8>,
    compressed_size: u32,
    uncompressed_size: u32,
    modified: DosDateTime,
}

fn frame(entries: &Entries, quine: &QuineEntry<'_>) -> Result<Frame> {
    let mut prefix = entries.local.clone();
    LocalFileHeader {
        modified: quine.modified,
        crc32: 0,
        compressed_size: quine.compressed_size,
        uncompressed_size: quine.uncompressed_size,
        name: quine.name.as_bytes().to_vec(),
        extra: quine.extra.clone(),
    }
    .write_to(&mut prefix)?;

    let mut suffix = entries.central.clone();
    CentralDirectoryHeader {
        modified: quine.modified,
        crc32: 0,
        compressed_size: quine.compressed_size,
        uncompressed_size: quine.uncompressed_size,
        name: quine.name.as_bytes().to_vec(),
        comment: quine.comment.clone(),
        local_header_offset: entries.local.len() as u32,
    }
    .write_to(&mut suffix)?;

    EndOfCentralDirectory {
        entries: entries.count + 1,
        cd_size: suffix.len() as u32,
        cd_offset: (prefix.len() + quine.compressed_size as usize) as u32,
    }
    .write_to(&mut suffix)?;

    Ok(Frame { prefix, suffix })
}

/// Build an archive holding `inputs` and, under `quine_name`, itself
pub fn create_zip_file(inputs: &[InputFile], quine_name: &str, config: &QuineConfig) -> Result<Vec<u8>> {
    let entries = compress_entries(inputs, config)?;
    let mut entry = QuineEntry {
        name: quine_name,
        extra: Vec::new(),
        comment: Vec::new(),
        compressed_size: 0,
        uncompressed_size: 0,
        modified: config.timestamp,
    };

    // sizes are fixed-width fields, so the first pass fixes the layout
    let f = frame(&entries, &entry)?;
    let first = generate_quine(&f.prefix, &f.suffix)?;
    entry.compressed_size = first.len() as u32;
    entry.uncompressed_size = (f.prefix.len() + first.len() + f.suffix.len()) as u32;

    let f = frame(&entries, &entry)?;
    let quine = generate_quine(&f.prefix, &f.suffix)?;
    if quine.len() != first.len() {
        return Err(Error::QuineSizeChanged { first: first.len(), second: quine.len() });
    }
    info!(entries = entries.count, quine = quine.len(), "Generated quine entry");

    let mut archive = [f.prefix.as_slice(), &quine.bytes, &f.suffix].concat();
    let slots = single_crc_slots(&entries, &f, &quine);
    let crc = fill_crc(&mut archive, &slots, config)?;

    if config.verify {
        let start = f.prefix.len();
        verify_entry(&archive, entries.local.len(), start..start + quine.len(), &archive)?;
    }
    info!(size = archive.len(), crc = format_args!("{crc:08x}"), "Built zip quine");
    Ok(archive)
}

/// Every place the quine entry's checksum appears in a single archive
fn single_crc_slots(entries: &Entries, f: &Frame, quine: &Quine) -> Vec<usize> {
    let local = entries.local.len() + LocalFileHeader::CRC_OFFSET;
    let central = entries.central.len() + CentralDirectoryHeader::CRC_OFFSET;
    let stream = f.prefix.len();

    let mut slots = vec![local];
    slots.extend(quine.layout.prefix_slots(stream, local));
    slots.push(quine.layout.tail_slot(stream, quine.layout.tail_len + central));
    slots.push(stream + quine.len() + central);
    slots
}

fn fill_crc(archive: &mut [u8], slots: &[usize], config: &QuineConfig) -> Result<u32> {
    match config.crc {
        CrcMode::Solve => Ok(solve_rank1(archive, slots)),
        CrcMode::Bruteforce => {
            info!(threads = config.effective_threads(), "Brute-forcing CRC-32");
            match bruteforce(archive, slots, config.effective_threads())? {
                Some(crc) => {
                    for &slot in slots {
                        archive[slot..slot + 4].copy_from_slice(&crc.to_le_bytes());
                    }
                    Ok(crc)
                }
                None => {
                    warn!("No self-consistent CRC-32 exists; leaving it zero");
                    Ok(0)
                }
            }
        }
        CrcMode::Skip => Ok(0),
    }
}

/// Build two archives, each holding one input and the other archive.
///
/// Archive A stores `inputs[0]` and archive B under `names[1]`; archive B
/// stores `inputs[1]` and archive A under `names[0]`.
pub fn create_zip_loop(
    inputs: &[InputFile],
    names: [&str; 2],
    config: &QuineConfig,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let [input_a, input_b] = inputs else {
        return Err(Error::LoopNeedsTwoInputs(inputs.len()));
    };
    let entries_a = compress_entries(std::slice::from_ref(input_a), config)?;
    let entries_b = compress_entries(std::slice::from_ref(input_b), config)?;

    // A holds B under B's name, and B holds A
    let bare_a = entries_a.local.len() + LocalFileHeader::SIZE + names[1].len();
    let bare_b = entries_b.local.len() + LocalFileHeader::SIZE + names[0].len();
    let mut target = bare_a.max(bare_b);
    while (1..4).contains(&(target - bare_a)) || (1..4).contains(&(target - bare_b)) {
        target += 1;
    }

    let mut entry_a = QuineEntry {
        name: names[1],
        extra: padding_extra(target - bare_a),
        comment: Vec::new(),
        compressed_size: 0,
        uncompressed_size: 0,
        modified: config.timestamp,
    };
    let mut entry_b = QuineEntry {
        name: names[0],
        extra: padding_extra(target - bare_b),
        comment: Vec::new(),
        compressed_size: 0,
        uncompressed_size: 0,
        modified: config.timestamp,
    };

    // some pairs of suffix lengths have no closing repeats of equal size;
    // lengthening B's entry comment shifts its suffix until one exists
    let first = loop {
        let (fa, fb) = (frame(&entries_a, &entry_a)?, frame(&entries_b, &entry_b)?);
        match generate_quine_loop(&fa.prefix, &fa.suffix, &fb.prefix, &fb.suffix) {
            Err(Error::NoFixedPoint(reason)) if entry_b.comment.len() < MAX_COMMENT_PADDING => {
                entry_b.comment.push(b' ');
                debug!(padding = entry_b.comment.len(), %reason, "Padding loop suffix");
            }
            result => break result?,
        }
    };
    let (fa, fb) = (frame(&entries_a, &entry_a)?, frame(&entries_b, &entry_b)?);
    let size = first.a.len();
    let total_a = fa.prefix.len() + size + fa.suffix.len();
    let total_b = fb.prefix.len() + size + fb.suffix.len();
    entry_a.compressed_size = size as u32;
    entry_a.uncompressed_size = total_b as u32;
    entry_b.compressed_size = size as u32;
    entry_b.uncompressed_size = total_a as u32;

    let (fa, fb) = (frame(&entries_a, &entry_a)?, frame(&entries_b, &entry_b)?);
    let pair = generate_quine_loop(&fa.prefix, &fa.suffix, &fb.prefix, &fb.suffix)?;
    if pair.a.len() != size {
        return Err(Error::QuineSizeChanged { first: size, second: pair.a.len() });
    }
    info!(quine = size, "Generated quine loop entries");

    let mut archive_a = [fa.prefix.as_slice(), &pair.a.bytes, &fa.suffix].concat();
    let mut archive_b = [fb.prefix.as_slice(), &pair.b.bytes, &fb.suffix].concat();

    if config.crc != CrcMode::Skip {
        if config.crc == CrcMode::Bruteforce {
            warn!("Loop checksums depend on each other; solving them instead of brute-forcing");
        }
        let sides = LoopSides {
            a: Side { entries: &entries_a, frame: &fa, quine: &pair.a },
            b: Side { entries: &entries_b, frame: &fb, quine: &pair.b },
        };
        let slots_a = sides.slots(true);
        let slots_b = sides.slots(false);

        let crcs = {
            let file_a = slots_a.iter().fold(CrcFile::new(&archive_a), |f, &(o, id)| f.slot(o, id));
            let file_b = slots_b.iter().fold(CrcFile::new(&archive_b), |f, &(o, id)| f.slot(o, id));
            solve_crc_system(&[file_a, file_b])
        };
        for (archive, slots) in [(&mut archive_a, &slots_a), (&mut archive_b, &slots_b)] {
            for &(offset, id) in slots {
                archive[offset..offset + 4].copy_from_slice(&crcs[id].to_le_bytes());
            }
        }
        debug!(
            crc_a = format_args!("{:08x}", crcs[0]),
            crc_b = format_args!("{:08x}", crcs[1]),
            "Solved loop CRCs"
        );
    }

    if config.verify {
        let start = fa.prefix.len();
        verify_entry(&archive_a, entries_a.local.len(), start..start + size, &archive_b)?;
        let start = fb.prefix.len();
        verify_entry(&archive_b, entries_b.local.len(), start..start + size, &archive_a)?;
    }
    info!(size_a = archive_a.len(), size_b = archive_b.len(), "Built zip quine loop");
    Ok((archive_a, archive_b))
}

struct Side<'a> {
    entries: &'a Entries,
    frame: &'a Frame,
    quine: &'a Quine,
}

struct LoopSides<'a> {
    a: Side<'a>,
    b: Side<'a>,
}

impl LoopSides<'_> {
    /// Checksum slots of archive A (`for_a`) or B, each mapped to the
    /// archive whose checksum it holds: 0 for A, 1 for B
    fn slots(&self, for_a: bool) -> Vec<(usize, usize)> {
        let (own, peer, own_id, peer_id) =
            if for_a { (&self.a, &self.b, 0, 1) } else { (&self.b, &self.a, 1, 0) };
        let local = |side: &Side<'_>| side.entries.local.len() + LocalFileHeader::CRC_OFFSET;
        let central = |side: &Side<'_>| side.entries.central.len() + CentralDirectoryHeader::CRC_OFFSET;
        let stream = own.frame.prefix.len();
        let layout = &own.quine.layout;

        // each archive's quine entry holds the other archive
        let mut slots = vec![(local(own), peer_id)];
        let copies = layout.prefix_slots(stream, 0);
        slots.push((copies[0] + local(peer), own_id));
        slots.push((copies[1] + local(own), peer_id));

        // the closing literal is Y_B S_B Y_A S_A in both streams
        let (y_a, y_b) = (self.a.quine.layout.tail_len, self.b.quine.layout.tail_len);
        let s_b = self.b.frame.suffix.len();
        slots.push((layout.tail_slot(stream, y_b + central(&self.b)), 0));
        slots.push((layout.tail_slot(stream, y_b + s_b + y_a + central(&self.a)), 1));

        slots.push((stream + own.quine.len() + central(own), peer_id));
        slots
    }
}

/// Check that the deflate data at `stream` inflates to `expected`, and
/// that the quine entry's stored checksum matches when one was written
fn verify_entry(
    archive: &[u8],
    header_offset: usize,
    stream: std::ops::Range<usize>,
    expected: &[u8],
) -> Result<()> {
    let header = LocalFileHeader::from_bytes(&archive[header_offset..])
        .ok_or_else(|| Error::VerificationFailed("quine local header is unreadable".into()))?;
    if header.compressed_size as usize != stream.len() {
        return Err(Error::VerificationFailed(format!(
            "header says {} compressed bytes, stream has {}",
            header.compressed_size,
            stream.len()
        )));
    }

    let inflated = inflate(&archive[stream])?;
    if inflated != expected {
        return Err(Error::VerificationFailed(format!(
            "entry inflates to {} bytes that differ from the expected {}",
            inflated.len(),
            expected.len()
        )));
    }

    let actual = crc32(expected);
    if header.crc32 != 0 && header.crc32 != actual {
        return Err(Error::VerificationFailed(format!(
            "stored CRC-32 {:08x} but contents hash to {actual:08x}",
            header.crc32
        )));
    }
    debug!(size = inflated.len(), "Verified quine entry");
    Ok(())
}
