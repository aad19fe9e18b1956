//! Single-file processing
//!
//! Streams one input log through the [`FrameDecoder`], writing decoded
//! records to the parsed output and unresolved lines, unchanged, to the skip
//! output. Every line lands in exactly one of the two.

use crate::config::PipelineConfig;
use crate::decoder::FrameDecoder;
use crate::formats::{LogLine, LogLines, MAX_LINE_LEN};
use crate::signals::MessageCatalog;
use crate::types::{format_float, DecodedSignal, DecoderError, Result, SkipReason};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One unit of batch work: an input file and where its outputs go
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileJob {
    /// Input log file
    pub source: PathBuf,
    /// Path of the input relative to the batch root
    pub relative: PathBuf,
    /// Decoded records: `<output_root>/<relative>.<ext>`
    pub parsed_output: PathBuf,
    /// Skipped lines: `<output_root>/<relative>.skipped.<ext>`
    pub skip_output: PathBuf,
}

impl FileJob {
    /// Derive both output paths by mirroring `relative` under `output_root`
    pub fn new(
        source: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
        output_root: &Path,
        extension: &str,
    ) -> Self {
        let relative = relative.into();
        let parsed_output = output_root.join(relative.with_extension(extension));
        let skip_output = output_root.join(relative.with_extension(format!("skipped.{}", extension)));

        Self {
            source: source.into(),
            relative,
            parsed_output,
            skip_output,
        }
    }
}

/// Line and record counts for one processed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    /// Lines read from the input
    pub lines: usize,
    /// Lines that produced parsed records
    pub decoded_lines: usize,
    /// Lines written to the skip output
    pub skipped_lines: usize,
    /// Records written to the parsed output
    pub records: usize,
    /// Skipped lines by reason
    pub skip_reasons: BTreeMap<SkipReason, usize>,
}

impl FileStats {
    fn record_skip(&mut self, reason: SkipReason) {
        self.skipped_lines += 1;
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
    }
}

/// Skip output, created on the first skipped line
struct SkipSink<'p> {
    path: &'p Path,
    writer: Option<BufWriter<File>>,
}

impl<'p> SkipSink<'p> {
    fn new(path: &'p Path) -> Self {
        Self { path, writer: None }
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => BufWriter::new(File::create(self.path)?),
        };
        self.writer.insert(writer).write_all(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer {
            Some(ref mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// Processes individual files against a shared catalog
pub struct FileProcessor<'a, C: MessageCatalog> {
    decoder: FrameDecoder<'a, C>,
    config: &'a PipelineConfig,
}

impl<'a, C: MessageCatalog> FileProcessor<'a, C> {
    pub fn new(catalog: &'a C, config: &'a PipelineConfig) -> Self {
        Self {
            decoder: FrameDecoder::new(catalog, config),
            config,
        }
    }

    /// Decode one file and write its parsed and skip outputs
    ///
    /// Outputs are flushed before returning, including when an I/O error
    /// stops the file early. When no line was skipped the skip output does
    /// not exist afterwards, even if an earlier run left one behind.
    pub fn process(&self, job: &FileJob) -> Result<FileStats> {
        log::debug!("Processing file: {:?}", job.source);

        let input = File::open(&job.source).map_err(|e| DecoderError::file_failure(&job.source, e))?;

        for output in [&job.parsed_output, &job.skip_output] {
            if let Some(parent) = output.parent() {
                // create_dir_all treats a directory created concurrently as success
                fs::create_dir_all(parent).map_err(|e| DecoderError::file_failure(parent, e))?;
            }
        }

        let parsed_file = File::create(&job.parsed_output)
            .map_err(|e| DecoderError::file_failure(&job.parsed_output, e))?;
        let mut parsed = BufWriter::new(parsed_file);
        let mut skipped = SkipSink::new(&job.skip_output);
        let mut stats = FileStats::default();

        let streamed = self.stream(BufReader::new(input), &mut parsed, &mut skipped, &mut stats);
        let flushed = parsed.flush().and(skipped.flush());
        drop(parsed);
        drop(skipped);
        streamed
            .and(flushed)
            .map_err(|e| DecoderError::file_failure(&job.source, e))?;

        if stats.skipped_lines == 0 {
            match fs::remove_file(&job.skip_output) {
                Ok(()) => log::debug!("Removed stale skip output {:?}", job.skip_output),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(DecoderError::file_failure(&job.skip_output, e)),
            }
        }

        if stats.decoded_lines == 0 {
            log::warn!("No decodable lines in {:?} ({} lines read)", job.source, stats.lines);
        }

        log::info!(
            "Processed {:?}: {} lines, {} decoded, {} skipped",
            job.relative,
            stats.lines,
            stats.decoded_lines,
            stats.skipped_lines
        );

        Ok(stats)
    }

    fn stream<R: BufRead, W: Write>(
        &self,
        reader: R,
        parsed: &mut W,
        skipped: &mut SkipSink<'_>,
        stats: &mut FileStats,
    ) -> io::Result<()> {
        let mut records = RecordWriter::new(self.config.quote_fields);

        for item in LogLines::new(reader) {
            let line = match item? {
                LogLine::Complete(line) => line,
                LogLine::Oversized { chunk, first } => {
                    if first {
                        stats.lines += 1;
                        log::debug!(
                            "Skipping line {} (longer than {} bytes)",
                            stats.lines,
                            MAX_LINE_LEN
                        );
                        stats.record_skip(SkipReason::Malformed);
                    }
                    skipped.write_line(&chunk)?;
                    continue;
                }
            };
            stats.lines += 1;

            match self.decoder.decode_line(&line) {
                Ok(signals) => {
                    stats.decoded_lines += 1;
                    for signal in &signals {
                        records.write(parsed, signal)?;
                        stats.records += 1;
                    }
                }
                Err(reason) => {
                    log::debug!("Skipping line {} ({})", stats.lines, reason);
                    skipped.write_line(&line)?;
                    stats.record_skip(reason);
                }
            }
        }

        Ok(())
    }
}

/// Writes `timestamp, name, value` records to the parsed output
///
/// Fields are quoted by the `csv` writer only when they need it, so plain
/// records keep the `, ` separated layout.
struct RecordWriter {
    quote: bool,
    warned_unquoted: bool,
    builder: csv::WriterBuilder,
    scratch: Vec<u8>,
}

impl RecordWriter {
    fn new(quote: bool) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder
            .quote_style(csv::QuoteStyle::Necessary)
            .has_headers(false)
            .buffer_capacity(256);

        Self {
            quote,
            warned_unquoted: false,
            builder,
            scratch: Vec::new(),
        }
    }

    fn write<W: Write>(&mut self, out: &mut W, signal: &DecodedSignal) -> io::Result<()> {
        let value = signal.value.to_string();

        out.write_all(format_float(signal.timestamp).as_bytes())?;
        for field in [signal.name.as_str(), value.as_str()] {
            out.write_all(b", ")?;
            if self.quote {
                self.encode(field)?;
                out.write_all(&self.scratch)?;
                continue;
            }

            if !self.warned_unquoted {
                self.encode(field)?;
                if self.scratch != field.as_bytes() {
                    log::warn!(
                        "Signal '{}' contains a separator; unquoted output will be ambiguous",
                        signal.name
                    );
                    self.warned_unquoted = true;
                }
            }
            out.write_all(field.as_bytes())?;
        }
        out.write_all(b"\n")
    }

    /// Leave the csv encoding of `field` in the scratch buffer
    fn encode(&mut self, field: &str) -> io::Result<()> {
        self.scratch.clear();
        let mut writer = self.builder.from_writer(&mut self.scratch);
        writer.write_field(field)?;
        writer.flush()
    }
}
