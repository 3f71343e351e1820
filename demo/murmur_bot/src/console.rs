//! Console rendering of outbound messages.
//!
//! Delivered voice records belong to the caller; once printed, the console has
//! no further use for them and deletes them.

use murmur_core::chat::path_from_file_url;
use murmur_core::{OutboundMessage, Segment};
use std::io::{self, Write};
use tracing::{debug, warn};

pub fn deliver(out: &OutboundMessage, sink: &mut impl Write) -> io::Result<()> {
    for segment in &out.segments {
        match segment {
            Segment::Text(text) => writeln!(sink, "{text}")?,
            Segment::Record { file } => {
                writeln!(sink, "[voice] {file}")?;
                discard_record(file);
            }
        }
    }
    Ok(())
}

fn discard_record(url: &str) {
    let Some(path) = path_from_file_url(url) else {
        warn!(target = "murmur_bot", url, "Record URL has no local path");
        return;
    };
    match std::fs::remove_file(&path) {
        Ok(()) => debug!(target = "murmur_bot", path = ?path, "Removed delivered record"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(target = "murmur_bot", path = ?path, error = %e, "Failed to remove delivered record"),
    }
}
