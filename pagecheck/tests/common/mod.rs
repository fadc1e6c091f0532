//! Fixture builders shared by the property tests: synthetic ELF images and
//! in-memory ZIP archives.

#![allow(dead_code)]

pub const PT_LOAD: u32 = 1;
pub const PT_DYNAMIC: u32 = 2;

/// One program header to place in a synthetic image.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub p_type: u32,
    pub p_align: u64,
    pub p_offset: u64,
    pub p_vaddr: u64,
}

impl Segment {
    pub fn load(p_align: u64, p_offset: u64, p_vaddr: u64) -> Self {
        Self {
            p_type: PT_LOAD,
            p_align,
            p_offset,
            p_vaddr,
        }
    }
}

/// Little-endian ELF64 shared object holding `segments`.
pub fn elf64(segments: &[Segment]) -> Vec<u8> {
    let mut elf = vec![0u8; 64 + 56 * segments.len()];
    elf[0..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
    elf[4] = 2; // ELFCLASS64
    elf[5] = 1; // ELFDATA2LSB
    elf[6] = 1;
    elf[16..18].copy_from_slice(&3u16.to_le_bytes()); // ET_DYN
    elf[18..20].copy_from_slice(&183u16.to_le_bytes()); // EM_AARCH64
    elf[32..40].copy_from_slice(&64u64.to_le_bytes());
    elf[54..56].copy_from_slice(&56u16.to_le_bytes());
    elf[56..58].copy_from_slice(&(segments.len() as u16).to_le_bytes());

    for (i, seg) in segments.iter().enumerate() {
        let base = 64 + 56 * i;
        elf[base..base + 4].copy_from_slice(&seg.p_type.to_le_bytes());
        elf[base + 8..base + 16].copy_from_slice(&seg.p_offset.to_le_bytes());
        elf[base + 16..base + 24].copy_from_slice(&seg.p_vaddr.to_le_bytes());
        elf[base + 48..base + 56].copy_from_slice(&seg.p_align.to_le_bytes());
    }
    elf
}

/// Big-endian ELF32 shared object holding `segments` (fields truncated to 32 bits).
pub fn elf32_be(segments: &[Segment]) -> Vec<u8> {
    let mut elf = vec![0u8; 52 + 32 * segments.len()];
    elf[0..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
    elf[4] = 1; // ELFCLASS32
    elf[5] = 2; // ELFDATA2MSB
    elf[6] = 1;
    elf[28..32].copy_from_slice(&52u32.to_be_bytes());
    elf[42..44].copy_from_slice(&32u16.to_be_bytes());
    elf[44..46].copy_from_slice(&(segments.len() as u16).to_be_bytes());

    for (i, seg) in segments.iter().enumerate() {
        let base = 52 + 32 * i;
        elf[base..base + 4].copy_from_slice(&seg.p_type.to_be_bytes());
        elf[base + 4..base + 8].copy_from_slice(&(seg.p_offset as u32).to_be_bytes());
        elf[base + 8..base + 12].copy_from_slice(&(seg.p_vaddr as u32).to_be_bytes());
        elf[base + 28..base + 32].copy_from_slice(&(seg.p_align as u32).to_be_bytes());
    }
    elf
}

/// Build a ZIP archive; `deflate` selects the compression of every entry.
pub fn zip(entries: &[(&str, Vec<u8>)], deflate: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();
    let method: u16 = if deflate { 8 } else { 0 };

    for (name, data) in entries {
        let offset = out.len() as u32;
        let crc = crc32fast::hash(data);
        let payload = if deflate {
            miniz_oxide::deflate::compress_to_vec(data, 6)
        } else {
            data.clone()
        };

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        central.extend_from_slice(b"PK\x01\x02");
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&method.to_le_bytes());
        central.extend_from_slice(&[0; 4]);
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0; 12]);
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let cd_offset = out.len() as u32;
    out.extend_from_slice(&central);
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}
