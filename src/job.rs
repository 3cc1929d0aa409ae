//! # Print Job Model
//!
//! An [`OutputJob`] is an ordered sequence of render instructions built once
//! per message and handed opaquely to a transport. Jobs are immutable after
//! construction; `encode()` lowers them to ESC/POS bytes.
//!
//! ## Design
//!
//! The job is a small instruction list rather than raw bytes so tests can
//! inspect structure (did the body text make it in? is there a trailing
//! cut?) without parsing the wire protocol.

use crate::protocol::commands::{self, Alignment};
use crate::protocol::{cp437, raster};
use crate::render::photo::RasterBlock;

/// Feed distance (in vertical motion units) before the cut, so the last
/// printed line clears the cutter.
const CUT_FEED_UNITS: u8 = 3;

/// One render instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOp {
    /// Sticky style change applying to following text.
    Style {
        bold: bool,
        align: Alignment,
        /// Character cell multiplier (width, height), 1 = normal.
        size: (u8, u8),
    },
    /// A text block. `wrap` gives the column width to word-wrap at;
    /// `None` prints the text as its own single line.
    Text {
        content: String,
        wrap: Option<usize>,
    },
    /// A 1-bit raster image.
    Raster(RasterBlock),
    /// Feed n blank lines.
    Feed(u8),
    /// Feed to the cutter and cut. Terminates every job.
    Cut,
}

/// An ordered print job. Always ends with [`JobOp::Cut`] when built through
/// [`OutputJob::receipt`], so consecutive jobs are physically separated.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputJob {
    pub ops: Vec<JobOp>,
}

impl OutputJob {
    /// Assemble the standard message receipt:
    /// header, timestamp, divider, sender, wrapped body, photos, cut.
    pub fn receipt(
        header: &str,
        timestamp: &str,
        sender_label: &str,
        text: &str,
        rasters: &[RasterBlock],
        line_width: usize,
    ) -> Self {
        let mut ops = vec![
            JobOp::Style {
                bold: true,
                align: Alignment::Center,
                size: (2, 2),
            },
            JobOp::Text {
                content: header.to_string(),
                wrap: None,
            },
            JobOp::Style {
                bold: false,
                align: Alignment::Center,
                size: (1, 1),
            },
            JobOp::Text {
                content: timestamp.to_string(),
                wrap: None,
            },
            JobOp::Text {
                content: "-".repeat(line_width),
                wrap: None,
            },
            JobOp::Style {
                bold: true,
                align: Alignment::Left,
                size: (1, 1),
            },
            JobOp::Text {
                content: format!("From: {}", sender_label),
                wrap: Some(line_width),
            },
            JobOp::Feed(1),
        ];

        if !text.is_empty() {
            ops.push(JobOp::Style {
                bold: false,
                align: Alignment::Left,
                size: (1, 1),
            });
            ops.push(JobOp::Text {
                content: text.to_string(),
                wrap: Some(line_width),
            });
            ops.push(JobOp::Feed(1));
        }

        for block in rasters {
            ops.push(JobOp::Style {
                bold: false,
                align: Alignment::Center,
                size: (1, 1),
            });
            ops.push(JobOp::Raster(block.clone()));
            ops.push(JobOp::Feed(1));
        }

        ops.push(JobOp::Cut);
        Self { ops }
    }

    /// Whether the job carries at least one raster block.
    pub fn has_raster(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, JobOp::Raster(_)))
    }

    /// Lower the job to printer bytes. Starts with an init so stale styling
    /// from an aborted job cannot leak in.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = commands::init();
        for op in &self.ops {
            match op {
                JobOp::Style { bold, align, size } => {
                    out.extend(commands::bold(*bold));
                    out.extend(commands::align(*align));
                    out.extend(commands::char_size(size.0, size.1));
                }
                JobOp::Text { content, wrap } => {
                    let lines = match wrap {
                        Some(width) => wrap_text(content, *width),
                        None => vec![content.clone()],
                    };
                    for line in lines {
                        out.extend(cp437::encode(&line));
                        out.extend(commands::line_feed());
                    }
                }
                JobOp::Raster(block) => {
                    out.extend(raster::raster(block.width, block.height, &block.data));
                }
                JobOp::Feed(n) => out.extend(commands::feed_lines(*n)),
                JobOp::Cut => out.extend(commands::cut_feed(CUT_FEED_UNITS)),
            }
        }
        out
    }
}

/// Word-wrap text to a column width.
///
/// Paragraphs (input lines) wrap independently; words longer than the width
/// are hard-broken. An empty input yields one empty line so paragraph
/// spacing survives.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let paragraphs: Vec<&str> = if text.is_empty() {
        vec![""]
    } else {
        text.lines().collect()
    };

    for para in paragraphs {
        if para.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in para.split_whitespace() {
            let mut word = word;
            // Hard-break words that can never fit
            while word.chars().count() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split: usize = word.chars().take(width).map(|c| c.len_utf8()).sum();
                lines.push(word[..split].to_string());
                word = &word[split..];
            }
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines
}

// ============================================================================
// TESTS
// ============================================================================
