//! `pagecheck inspect`: dump one library's program headers.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use pagecheck::elf::{
    ET_DYN, ET_EXEC, PT_DYNAMIC, PT_GNU_RELRO, PT_INTERP, PT_LOAD, PT_NOTE, PT_NULL, PT_PHDR,
};
use pagecheck::{evaluate, AlignmentIssue, ElfImage, PageSize};

use crate::check::read_input;
use crate::cli::InspectArgs;
use crate::error::PageCheckError;
use crate::settings::{self, Settings};

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub class: String,
    pub endianness: String,
    pub object_type: String,
    pub machine: String,
    pub page_size: u64,
    pub segments: Vec<SegmentRow>,
    pub compliant: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_align: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<AlignmentIssue>,
}

impl InspectReport {
    pub fn failing_segments(&self) -> usize {
        self.segments.iter().filter(|s| s.issue.is_some()).count()
    }
}

fn object_type_name(e_type: u16) -> String {
    match e_type {
        ET_EXEC => "EXEC".into(),
        ET_DYN => "DYN".into(),
        other => format!("{other:#x}"),
    }
}

fn segment_type_name(p_type: u32) -> String {
    match p_type {
        PT_NULL => "NULL".into(),
        PT_LOAD => "LOAD".into(),
        PT_DYNAMIC => "DYNAMIC".into(),
        PT_INTERP => "INTERP".into(),
        PT_NOTE => "NOTE".into(),
        PT_PHDR => "PHDR".into(),
        PT_GNU_RELRO => "GNU_RELRO".into(),
        other => format!("{other:#x}"),
    }
}

/// Build the report for an in-memory image.
pub fn inspect_bytes(path: &Path, bytes: &[u8], page_size: PageSize) -> Result<InspectReport, PageCheckError> {
    let image = ElfImage::parse(bytes)?;
    let segments: Vec<SegmentRow> = image
        .program_headers()
        .map(|entry| SegmentRow {
            kind: segment_type_name(entry.p_type),
            p_offset: entry.p_offset,
            p_vaddr: entry.p_vaddr,
            p_align: entry.p_align,
            issue: evaluate(&entry, page_size),
        })
        .collect();
    let compliant = segments.iter().all(|s| s.issue.is_none());
    let machine = match image.machine_name() {
        "unknown" => format!("unknown ({:#x})", image.machine()),
        name => name.to_string(),
    };

    Ok(InspectReport {
        path: path.to_path_buf(),
        class: image.class().to_string(),
        endianness: image.endianness().to_string(),
        object_type: object_type_name(image.object_type()),
        machine,
        page_size: page_size.get(),
        segments,
        compliant,
    })
}

pub fn run(args: &InspectArgs, settings: &Settings) -> Result<InspectReport, PageCheckError> {
    let page_size = settings::page_size(args.page_size, settings)?;
    let bytes = read_input(&args.library)?;
    log::info!(
        "[PageCheck] Inspecting {} ({} bytes)",
        args.library.display(),
        bytes.len()
    );
    inspect_bytes(&args.library, &bytes, page_size)
}

/// Exit verdict for an inspected library.
pub fn verdict(report: &InspectReport) -> Result<(), PageCheckError> {
    if report.compliant {
        Ok(())
    } else {
        Err(PageCheckError::MisalignedLibrary {
            path: report.path.clone(),
            failing: report.failing_segments(),
        })
    }
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} {} {} {}",
            self.path.display(),
            self.class,
            self.endianness,
            self.object_type,
            self.machine
        )?;
        writeln!(
            f,
            "  {:<10} {:>18} {:>18} {:>10}",
            "TYPE", "OFFSET", "VADDR", "ALIGN"
        )?;
        for seg in &self.segments {
            writeln!(
                f,
                "  {:<10} {:>#18x} {:>#18x} {:>#10x}{}",
                seg.kind,
                seg.p_offset,
                seg.p_vaddr,
                seg.p_align,
                if seg.issue.is_some() { "  <- misaligned" } else { "" }
            )?;
        }
        if self.compliant {
            write!(f, "compliant with {}-byte pages", self.page_size)
        } else {
            write!(
                f,
                "not compliant with {}-byte pages ({} segment(s) misaligned)",
                self.page_size,
                self.failing_segments()
            )
        }
    }
}
