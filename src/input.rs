use crate::error::{Result, WriteError};
use crate::models::Entity;
use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Streams entities from a JSON Lines file, one entity per line.
/// Files ending in `.bz2` are decompressed on the fly.
pub struct EntityReader {
    path: PathBuf,
    lines: std::io::Lines<BufReader<Box<dyn Read>>>,
    line_no: u64,
}

impl EntityReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| WriteError::io(path, e))?;
        let inner: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "bz2") {
            Box::new(BzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::with_capacity(128 * 1024, inner).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for EntityReader {
    type Item = Result<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(WriteError::io(&self.path, e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(serde_json::from_str(trimmed).map_err(|e| {
                WriteError::InvalidInputShape {
                    index: self.line_no,
                    reason: e.to_string(),
                }
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{"kind":"node","id":"P1","label":"protein","properties":{"name":"BRCA1"}}

{"kind":"edge","source":"P1","target":"P2","label":"interacts_with"}
"#;

    #[test]
    fn reads_plain_jsonl_skipping_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entities.jsonl");
        std::fs::write(&path, SAMPLE).unwrap();

        let entities: Vec<Entity> = EntityReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].kind(), EntityKind::Node);
        assert_eq!(entities[1].kind(), EntityKind::Edge);
    }

    #[test]
    fn reads_bz2_jsonl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entities.jsonl.bz2");
        let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let count = EntityReader::open(&path).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn bad_line_is_invalid_input_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entities.jsonl");
        std::fs::write(&path, "{\"kind\":\"node\",\"id\":\"P1\",\"label\":\"x\"}\n[1,2,3]\n").unwrap();

        let items: Vec<_> = EntityReader::open(&path).unwrap().collect();
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(WriteError::InvalidInputShape { index: 2, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = EntityReader::open(&dir.path().join("absent.jsonl"));
        assert!(matches!(result, Err(WriteError::Io { .. })));
    }
}
