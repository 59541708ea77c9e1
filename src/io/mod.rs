use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::{Mmap, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct LineReader {
    // Zero-length files cannot be mapped
    mmap: Option<Mmap>,
}

impl LineReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open input file: {}", path.as_ref().display()))?;

        let metadata = file.metadata()?;
        if metadata.len() == 0 {
            return Ok(Self { mmap: None });
        }

        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .with_context(|| "Failed to memory-map input file")?
        };

        Ok(Self { mmap: Some(mmap) })
    }

    pub fn total_bytes(&self) -> usize {
        self.mmap.as_ref().map_or(0, |mmap| mmap.len())
    }

    /// Splits the mapped file into lines, dropping `\n` / `\r\n` terminators.
    pub fn lines(&self) -> Result<Vec<&str>> {
        let bytes = match &self.mmap {
            Some(mmap) => &mmap[..],
            None => return Ok(Vec::new()),
        };

        let text = std::str::from_utf8(bytes).with_context(|| "Input file is not valid UTF-8")?;
        Ok(text.lines().collect())
    }
}

pub struct LineWriter {
    writer: BufWriter<File>,
    lines_written: usize,
}

impl LineWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| {
                format!("Failed to create output file: {}", path.as_ref().display())
            })?;

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, file), // 1MB buffer
            lines_written: 0,
        })
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| "Failed to flush output file")?;
        Ok(self.lines_written)
    }
}

pub fn create_progress_bar(total_lines: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total_lines as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
