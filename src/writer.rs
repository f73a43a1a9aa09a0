//! The streaming dispatcher: pulls entities, drops duplicates and malformed
//! edges, groups the rest into per-label batches, flushes full batches to
//! part files and finally writes one header per label.

use crate::batch::compile_batch;
use crate::call::ImportCall;
use crate::config::{CsvFormat, WriterConfig};
use crate::dedup::DuplicateTracker;
use crate::error::{Result, WriteError};
use crate::header::HeaderWriter;
use crate::models::{Entity, EntityKind};
use crate::ontology::{LabelTranslator, OntologyAdapter, PascalCase};
use crate::parts::PartFileWriter;
use crate::schema::{resolve_property_types, PropertyTypes};
use crate::stats::WriteStats;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Streaming,
    Draining,
    Done,
}

type BatchKey = (EntityKind, String);

pub struct BatchWriter {
    config: WriterConfig,
    format: CsvFormat,
    batch_size: usize,
    outdir: PathBuf,
    ontology: Box<dyn OntologyAdapter>,
    translator: Box<dyn LabelTranslator>,
    parts: PartFileWriter,
    headers: HeaderWriter,

    state: DispatchState,
    property_types: BTreeMap<BatchKey, PropertyTypes>,
    labels: FxHashMap<String, String>,
    file_stems: FxHashMap<String, BatchKey>,
    tracker: DuplicateTracker,
    reported_duplicates: Option<String>,
    call: ImportCall,
    stats: WriteStats,
}

impl BatchWriter {
    /// Validates the config and creates the output directory.
    pub fn new(config: WriterConfig, ontology: Box<dyn OntologyAdapter>) -> Result<Self> {
        Self::with_translator(config, ontology, Box::new(PascalCase))
    }

    pub fn with_translator(
        config: WriterConfig,
        ontology: Box<dyn OntologyAdapter>,
        translator: Box<dyn LabelTranslator>,
    ) -> Result<Self> {
        config.validate()?;

        let outdir = config.resolved_output_dir();
        info!(path = %outdir.display(), "Creating output directory");
        fs::create_dir_all(&outdir).map_err(|e| WriteError::io(&outdir, e))?;
        let outdir = fs::canonicalize(&outdir).map_err(|e| WriteError::io(&outdir, e))?;

        Ok(Self {
            format: config.format(),
            batch_size: config.effective_batch_size(),
            parts: PartFileWriter::new(&outdir),
            headers: HeaderWriter::new(&outdir, &config.delimiter),
            outdir,
            config,
            ontology,
            translator,
            state: DispatchState::Idle,
            property_types: BTreeMap::new(),
            labels: FxHashMap::default(),
            file_stems: FxHashMap::default(),
            tracker: DuplicateTracker::new(),
            reported_duplicates: None,
            call: ImportCall::new(),
            stats: WriteStats::new(),
        })
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Overrides the configured batch size; `0` restores the fallback.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = if batch_size == 0 {
            WriterConfig::default().effective_batch_size()
        } else {
            batch_size
        };
    }

    pub fn tracker(&self) -> &DuplicateTracker {
        &self.tracker
    }

    pub fn call(&self) -> &ImportCall {
        &self.call
    }

    /// Counters accumulated since construction or the last `reset`.
    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    pub fn property_types(&self, kind: EntityKind, label: &str) -> Option<&PropertyTypes> {
        self.property_types.get(&(kind, label.to_string()))
    }

    /// The `:LABEL` value used for nodes of `label`.
    pub fn label_set(&self, label: &str) -> Option<&str> {
        self.labels.get(label).map(String::as_str)
    }

    /// Drops all schema, label, duplicate and call state for a fresh run.
    pub fn reset(&mut self) {
        self.property_types = BTreeMap::new();
        self.labels = FxHashMap::default();
        self.file_stems = FxHashMap::default();
        self.tracker = DuplicateTracker::new();
        self.reported_duplicates = None;
        self.call = ImportCall::new();
        self.stats = WriteStats::new();
        self.state = DispatchState::Idle;
    }

    /// Writes an in-memory entity stream. See [`BatchWriter::try_write`].
    pub fn write<I>(&mut self, entities: I) -> Result<WriteStats>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.try_write(entities.into_iter().map(Ok))
    }

    /// Streams entities to part files and writes headers for every label seen.
    ///
    /// An `Err` item, a schema mismatch or an I/O failure aborts the call;
    /// part files flushed before the failure stay on disk.
    pub fn try_write<I>(&mut self, entities: I) -> Result<WriteStats>
    where
        I: IntoIterator<Item = Result<Entity>>,
    {
        let mut call_stats = WriteStats::new();
        let mut pending: BTreeMap<BatchKey, Vec<Entity>> = BTreeMap::new();

        let result = self
            .stream(entities, &mut pending, &mut call_stats)
            .and_then(|_| self.drain(&mut pending, &mut call_stats));

        self.stats += call_stats;

        match result {
            Ok(()) => {
                self.state = DispatchState::Done;
                Ok(call_stats)
            }
            Err(e) => {
                self.state = DispatchState::Idle;
                Err(e)
            }
        }
    }

    fn stream<I>(
        &mut self,
        entities: I,
        pending: &mut BTreeMap<BatchKey, Vec<Entity>>,
        stats: &mut WriteStats,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Result<Entity>>,
    {
        self.state = DispatchState::Streaming;

        for item in entities {
            let entity = item?;
            stats.inc_processed();
            let kind = entity.kind();

            let Some(identity) = entity.identity() else {
                error!(entity = ?entity, "Edge must have source and target node");
                stats.inc_malformed_edges();
                continue;
            };

            if !self.tracker.observe(kind, &identity, entity.label()) {
                stats.inc_duplicates();
                continue;
            }

            let key = (kind, entity.label().to_string());
            if !self.property_types.contains_key(&key) {
                self.first_sighting(&key, &entity)?;
            }

            let batch = pending.entry(key.clone()).or_default();
            batch.push(entity);

            if batch.len() >= self.batch_size {
                let batch = std::mem::take(batch);
                self.flush(&key, &batch, stats)?;
            }
        }
        Ok(())
    }

    fn first_sighting(&mut self, key: &BatchKey, sample: &Entity) -> Result<()> {
        let (kind, label) = key;

        // Header and part files are named by label alone.
        let stem = self.translator.to_pascal(label);
        if let Some((other_kind, other_label)) = self.file_stems.get(&stem) {
            if (other_kind, other_label) != (kind, label) {
                let err = WriteError::LabelCollision {
                    kind: *kind,
                    label: label.clone(),
                    other_kind: *other_kind,
                    other_label: other_label.clone(),
                    file_stem: stem,
                };
                error!("{err}");
                return Err(err);
            }
        }
        self.file_stems.insert(stem, key.clone());

        let types = resolve_property_types(self.ontology.as_ref(), label, *kind, Some(sample));
        self.property_types.insert(key.clone(), types);

        if *kind == EntityKind::Node && !self.labels.contains_key(label) {
            let ancestors = self
                .ontology
                .ancestors(label)
                .unwrap_or_else(|| vec![label.clone()]);
            let mut unique: Vec<String> = Vec::with_capacity(ancestors.len());
            for a in ancestors {
                if !unique.contains(&a) {
                    unique.push(a);
                }
            }
            self.labels
                .insert(label.clone(), unique.join(&self.format.array_delimiter));
        }
        Ok(())
    }

    fn flush(&self, key: &BatchKey, batch: &[Entity], stats: &mut WriteStats) -> Result<()> {
        let (kind, label) = key;
        let empty = PropertyTypes::new();
        let types = self.property_types.get(key).unwrap_or(&empty);
        let labels = match kind {
            EntityKind::Node => self.labels.get(label).map(String::as_str),
            EntityKind::Edge => None,
        };

        let lines = compile_batch(batch, types, labels, &self.format)?;
        let pascal = self.translator.to_pascal(label);
        if self.parts.append_batch(&pascal, &lines)?.is_some() {
            stats.inc_part_files();
        }
        stats.add_written(lines.len() as u64);
        Ok(())
    }

    fn drain(
        &mut self,
        pending: &mut BTreeMap<BatchKey, Vec<Entity>>,
        stats: &mut WriteStats,
    ) -> Result<()> {
        self.state = DispatchState::Draining;

        for (key, batch) in std::mem::take(pending) {
            if !batch.is_empty() {
                self.flush(&key, &batch, stats)?;
            }
        }

        info!(
            processed = stats.processed,
            written = stats.written,
            "Processed entities and wrote them to CSV"
        );
        if stats.nothing_written() {
            warn!(
                "No entities were written in this call; they may all have been duplicates \
                 or malformed, or `reset` was not called between runs"
            );
        }
        if let Some(report) = self.new_duplicate_report() {
            warn!("{report}");
        }

        self.write_headers(EntityKind::Node, stats)?;
        self.write_headers(EntityKind::Edge, stats)
    }

    /// The duplicate report, unless the same one was already emitted since
    /// the last `reset`.
    fn new_duplicate_report(&mut self) -> Option<String> {
        let report = self.tracker.report()?;
        if self.reported_duplicates.as_deref() == Some(report.as_str()) {
            return None;
        }
        self.reported_duplicates = Some(report.clone());
        Some(report)
    }

    fn write_headers(&mut self, kind: EntityKind, stats: &mut WriteStats) -> Result<()> {
        let mut any = false;
        for ((k, label), types) in &self.property_types {
            if *k != kind {
                continue;
            }
            any = true;
            let pascal = self.translator.to_pascal(label);
            if self
                .headers
                .write_header(&pascal, kind, types, &mut self.call)?
            {
                stats.inc_headers();
            }
        }
        if !any {
            warn!(%kind, "No header information; the data contained no {kind}s");
        }
        Ok(())
    }

    /// Writes the neo4j-admin call for everything registered so far.
    pub fn write_call(&self) -> Result<PathBuf> {
        self.call.write_script(&self.outdir, &self.config)
    }

    pub fn compile_call(&self) -> String {
        self.call.compile(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Properties, PropValue};
    use crate::ontology::StaticOntology;
    use tempfile::TempDir;

    fn writer(dir: &TempDir, batch_size: usize) -> BatchWriter {
        let config = WriterConfig {
            output_dir: Some(dir.path().to_path_buf()),
            batch_size,
            ..WriterConfig::default()
        };
        BatchWriter::new(config, Box::new(StaticOntology::new())).unwrap()
    }

    fn protein(id: &str) -> Entity {
        let mut props = Properties::new();
        props.insert("name".to_string(), PropValue::from(id));
        Entity::node(id, "protein", props)
    }

    #[test]
    fn starts_idle_and_ends_done() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 10);
        assert_eq!(w.state(), DispatchState::Idle);
        w.write(vec![protein("P1")]).unwrap();
        assert_eq!(w.state(), DispatchState::Done);
    }

    #[test]
    fn first_instance_defines_schema() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 10);
        w.write(vec![protein("P1")]).unwrap();
        let types = w.property_types(EntityKind::Node, "protein").unwrap();
        assert_eq!(types.get("name").map(String::as_str), Some("str"));
        assert_eq!(w.label_set("protein"), Some("protein"));
    }

    #[test]
    fn full_batch_flushes_immediately() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 2);
        let stats = w
            .write(vec![protein("P1"), protein("P2"), protein("P3")])
            .unwrap();
        assert_eq!(stats.written, 3);
        assert_eq!(stats.part_files, 2);
        assert!(dir.path().join("Protein-part000.csv").exists());
        assert!(dir.path().join("Protein-part001.csv").exists());
    }

    #[test]
    fn reset_clears_run_state() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 10);
        w.write(vec![protein("P1"), protein("P1")]).unwrap();
        assert_eq!(w.tracker().total_duplicates(), 1);
        assert!(!w.call().is_empty());

        w.reset();
        assert_eq!(w.state(), DispatchState::Idle);
        assert_eq!(w.tracker().total_duplicates(), 0);
        assert!(w.call().is_empty());
        assert!(w.property_types(EntityKind::Node, "protein").is_none());
        assert_eq!(w.stats(), WriteStats::default());
    }

    #[test]
    fn input_error_aborts_and_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 10);
        let items = vec![
            Ok(protein("P1")),
            Err(WriteError::InvalidInputShape {
                index: 2,
                reason: "not an entity".to_string(),
            }),
        ];
        let err = w.try_write(items).unwrap_err();
        assert!(matches!(err, WriteError::InvalidInputShape { index: 2, .. }));
        assert_eq!(w.state(), DispatchState::Idle);
        assert!(!dir.path().join("Protein-header.csv").exists());
    }

    #[test]
    fn duplicate_report_emitted_once_per_label_set() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 10);

        w.write(vec![protein("P1"), protein("P1")]).unwrap();
        let first = w.reported_duplicates.clone().unwrap();
        assert!(first.contains("node labels: protein"));

        // Same labels again: nothing new to report.
        w.write(vec![protein("P1")]).unwrap();
        assert_eq!(w.new_duplicate_report(), None);
        assert_eq!(w.reported_duplicates.as_deref(), Some(first.as_str()));

        let mut props = Properties::new();
        props.insert("symbol".to_string(), PropValue::from("TP53"));
        let gene = Entity::node("G1", "gene", props);
        w.write(vec![gene.clone(), gene]).unwrap();
        let second = w.reported_duplicates.clone().unwrap();
        assert!(second.contains("gene, protein"));

        w.reset();
        assert!(w.reported_duplicates.is_none());
    }

    #[test]
    fn labels_sharing_a_file_prefix_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 10);
        let err = w
            .write(vec![
                Entity::node("P1", "protein complex", Properties::new()),
                Entity::node("P2", "protein_complex", Properties::new()),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            WriteError::LabelCollision { ref file_stem, .. } if file_stem == "ProteinComplex"
        ));
        assert_eq!(w.state(), DispatchState::Idle);
    }

    #[test]
    fn set_batch_size_zero_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir, 5);
        assert_eq!(w.batch_size(), 5);
        w.set_batch_size(0);
        assert_eq!(w.batch_size(), crate::config::BATCH_SIZE_FALLBACK);
    }
}
