use std::ops::AddAssign;

/// Counters for one `write` call, or accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub processed: u64,
    pub written: u64,
    pub duplicates: u64,
    pub malformed_edges: u64,
    pub part_files: u64,
    pub headers: u64,
}

impl WriteStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_processed(&mut self) {
        self.processed += 1;
    }

    pub fn add_written(&mut self, count: u64) {
        self.written += count;
    }

    pub fn inc_duplicates(&mut self) {
        self.duplicates += 1;
    }

    pub fn inc_malformed_edges(&mut self) {
        self.malformed_edges += 1;
    }

    pub fn inc_part_files(&mut self) {
        self.part_files += 1;
    }

    pub fn inc_headers(&mut self) {
        self.headers += 1;
    }

    /// Input was seen but nothing reached a part file.
    pub fn nothing_written(&self) -> bool {
        self.processed > 0 && self.written == 0
    }
}

impl AddAssign for WriteStats {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.written += other.written;
        self.duplicates += other.duplicates;
        self.malformed_edges += other.malformed_edges;
        self.part_files += other.part_files;
        self.headers += other.headers;
    }
}
