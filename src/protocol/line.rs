//! Line assembly for the device's newline-delimited ASCII stream.

use log::warn;

/// Accumulates raw serial chunks and yields complete, trimmed lines.
///
/// The pending tail is kept as bytes so a multi-byte character split across
/// two reads is decoded intact. The tail is capped at `max_line_len`: once it
/// overflows it is dropped and everything up to the next newline is
/// discarded. Complete lines over the cap are dropped as well, which keeps
/// the output independent of how the stream was chunked.
#[derive(Debug)]
pub struct LineAssembler {
    tail: Vec<u8>,
    max_line_len: usize,
    discarding: bool,
}

impl LineAssembler {
    pub fn new(max_line_len: usize) -> Self {
        LineAssembler {
            tail: Vec::with_capacity(256),
            max_line_len,
            discarding: false,
        }
    }

    /// Feed one chunk, returning the lines it completed in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (segment, after) = rest.split_at(pos);
            rest = &after[1..];

            if self.discarding {
                self.discarding = false;
                self.tail.clear();
                continue;
            }

            self.tail.extend_from_slice(segment);
            let raw = std::mem::take(&mut self.tail);
            if raw.len() > self.max_line_len {
                warn!("dropping {} byte line over the {} byte limit", raw.len(), self.max_line_len);
                continue;
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        if !self.discarding {
            self.tail.extend_from_slice(rest);
            if self.tail.len() > self.max_line_len {
                warn!(
                    "partial line exceeded {} bytes, discarding until next newline",
                    self.max_line_len
                );
                self.tail.clear();
                self.discarding = true;
            }
        }

        lines
    }

    /// Bytes held for the next, not yet terminated line.
    pub fn pending(&self) -> &[u8] {
        &self.tail
    }

    pub fn is_discarding(&self) -> bool {
        self.discarding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] =
        b"CARDS:\r\nAA:BB:CC:DD,Front door\r\n\r\n  PONG \nMEMORY_USAGE:120,512\nNEW_LOG:9,AA:BB";

    fn collect(assembler: &mut LineAssembler, chunks: &[&[u8]]) -> Vec<String> {
        chunks.iter().flat_map(|c| assembler.push(c)).collect()
    }

    #[test]
    fn test_complete_lines_are_trimmed_and_empty_lines_skipped() {
        let mut assembler = LineAssembler::new(4096);
        let lines = assembler.push(STREAM);
        assert_eq!(
            lines,
            vec!["CARDS:", "AA:BB:CC:DD,Front door", "PONG", "MEMORY_USAGE:120,512"]
        );
        assert_eq!(assembler.pending(), b"NEW_LOG:9,AA:BB");
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_output() {
        let whole = LineAssembler::new(4096).push(STREAM);
        for size in 1..STREAM.len() {
            let mut assembler = LineAssembler::new(4096);
            let chunks: Vec<&[u8]> = STREAM.chunks(size).collect();
            assert_eq!(collect(&mut assembler, &chunks), whole, "chunk size {size}");
            assert_eq!(assembler.pending(), b"NEW_LOG:9,AA:BB");
        }
        for split in 0..=STREAM.len() {
            let mut assembler = LineAssembler::new(4096);
            let (a, b) = STREAM.split_at(split);
            assert_eq!(collect(&mut assembler, &[a, b]), whole, "split at {split}");
        }
    }

    #[test]
    fn test_unterminated_line_waits_for_newline() {
        let mut assembler = LineAssembler::new(4096);
        assert!(assembler.push(b"LOGS_CLEA").is_empty());
        assert!(assembler.push(b"RED").is_empty());
        assert_eq!(assembler.push(b"\n"), vec!["LOGS_CLEARED"]);
        assert!(assembler.pending().is_empty());
    }

    #[test]
    fn test_split_multibyte_character_survives() {
        let text = "AA:BB:CC:DD,Café\n".as_bytes();
        let split = text.len() - 2;
        let mut assembler = LineAssembler::new(4096);
        assert!(assembler.push(&text[..split]).is_empty());
        assert_eq!(assembler.push(&text[split..]), vec!["AA:BB:CC:DD,Café"]);
    }

    #[test]
    fn test_overflowing_tail_resynchronises_on_next_newline() {
        let mut assembler = LineAssembler::new(8);
        assert!(assembler.push(b"0123456789").is_empty());
        assert!(assembler.is_discarding());
        assert!(assembler.pending().is_empty());
        assert!(assembler.push(b"more garbage").is_empty());
        assert_eq!(assembler.push(b"tail\nPONG\n"), vec!["PONG"]);
        assert!(!assembler.is_discarding());
    }

    #[test]
    fn test_overlong_line_dropped_regardless_of_chunking() {
        let stream = b"PONG\n0123456789ABC\nCARD_ADDED\n";
        let whole = LineAssembler::new(12).push(stream);
        assert_eq!(whole, vec!["PONG", "CARD_ADDED"]);
        for size in 1..stream.len() {
            let mut assembler = LineAssembler::new(12);
            let chunks: Vec<&[u8]> = stream.chunks(size).collect();
            assert_eq!(collect(&mut assembler, &chunks), whole, "chunk size {size}");
        }
    }
}
