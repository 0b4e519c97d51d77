// 🗄️ Record Store - load / append / persist for the two flat tables
//
// Files are `;`-delimited UTF-8, header row first, one record per line.
// Load never fails: a missing or malformed file degrades to an empty table
// and the caller gets a status it can show to the user.

use crate::config::Config;
use crate::error::{RecordError, RecordResult};
use crate::records::{CalfRecord, TableRecord, TreatmentRecord};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

pub const FIELD_DELIMITER: u8 = b';';

// ============================================================================
// LOAD RESULT
// ============================================================================

#[derive(Debug)]
pub enum LoadStatus {
    Loaded,
    /// No file yet, started from an empty table
    Missing,
    /// File present but unreadable; records were replaced by an empty table
    Recovered(RecordError),
}

impl LoadStatus {
    pub fn is_warning(&self) -> bool {
        matches!(self, LoadStatus::Recovered(_))
    }

    /// User-facing message for this outcome
    pub fn notice(&self, label: &str) -> Notice {
        match self {
            LoadStatus::Loaded => Notice::info(format!("Dados de {} carregados com sucesso.", label)),
            LoadStatus::Missing => Notice::info(format!(
                "Arquivo de {} não encontrado, criando nova tabela.",
                label
            )),
            LoadStatus::Recovered(err) => {
                Notice::warning(format!("Erro ao carregar os dados de {}: {}", label, err))
            }
        }
    }
}

/// Records read from disk plus the canonical column set of their table
#[derive(Debug)]
pub struct LoadedTable<T> {
    pub records: Vec<T>,
    pub columns: &'static [&'static str],
    pub status: LoadStatus,
}

impl<T: TableRecord> LoadedTable<T> {
    fn empty(status: LoadStatus) -> Self {
        LoadedTable {
            records: Vec::new(),
            columns: T::COLUMNS,
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }
}

// ============================================================================
// GENERIC TABLE I/O
// ============================================================================

/// Strict read: any problem is an error
pub fn read_table<T: TableRecord>(path: &Path) -> RecordResult<Vec<T>> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            RecordError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            RecordError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut reader = ReaderBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(file);

    let headers = reader.headers().map_err(|source| RecordError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let missing: Vec<String> = T::COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RecordError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: T = result.map_err(|source| RecordError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Lenient read used at session start
pub fn load_table<T: TableRecord>(path: &Path) -> LoadedTable<T> {
    match read_table::<T>(path) {
        Ok(records) => {
            info!("loaded {} {} rows from {}", records.len(), T::LABEL, path.display());
            LoadedTable {
                records,
                columns: T::COLUMNS,
                status: LoadStatus::Loaded,
            }
        }
        Err(err) if err.is_not_found() => {
            info!("{} not found, starting empty {} table", path.display(), T::LABEL);
            LoadedTable::empty(LoadStatus::Missing)
        }
        Err(err) => {
            warn!("could not load {} table: {}", T::LABEL, err);
            LoadedTable::empty(LoadStatus::Recovered(err))
        }
    }
}

/// Overwrite `path` with the full table. Not atomic.
pub fn persist_table<T: TableRecord>(path: &Path, records: &[T]) -> RecordResult<()> {
    let io_err = |source: io::Error| RecordError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source: csv::Error| RecordError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;

    // Header is written by hand so an empty table still carries its columns
    let mut writer = WriterBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .has_headers(false)
        .from_writer(file);

    writer.write_record(T::COLUMNS).map_err(csv_err)?;
    for record in records {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;

    info!("saved {} {} rows to {}", records.len(), T::LABEL, path.display());
    Ok(())
}

/// New sequence = `records` + `record`. The input is left untouched.
pub fn append_record<T: Clone>(records: &[T], record: T) -> Vec<T> {
    let mut next = Vec::with_capacity(records.len() + 1);
    next.extend_from_slice(records);
    next.push(record);
    next
}

// ============================================================================
// TABLE-SPECIFIC OPERATIONS
// ============================================================================

pub fn load_calf_registry(path: &Path) -> LoadedTable<CalfRecord> {
    load_table(path)
}

pub fn load_treatment_log(path: &Path) -> LoadedTable<TreatmentRecord> {
    load_table(path)
}

pub fn append_calf(registry: &[CalfRecord], record: CalfRecord) -> Vec<CalfRecord> {
    append_record(registry, record)
}

pub fn append_treatment(log: &[TreatmentRecord], record: TreatmentRecord) -> Vec<TreatmentRecord> {
    append_record(log, record)
}

pub fn persist_calf_registry(path: &Path, registry: &[CalfRecord]) -> RecordResult<()> {
    persist_table(path, registry)
}

pub fn persist_treatment_log(path: &Path, log: &[TreatmentRecord]) -> RecordResult<()> {
    persist_table(path, log)
}

// ============================================================================
// SESSION STORE
// ============================================================================

/// Session-scoped owner of both tables
///
/// The on-disk files are the source of truth across sessions. No locking:
/// two sessions writing the same file will clobber each other.
#[derive(Debug)]
pub struct RecordStore {
    calf_path: PathBuf,
    treatment_path: PathBuf,
    calves: Vec<CalfRecord>,
    treatments: Vec<TreatmentRecord>,
    notices: Vec<Notice>,
}

impl RecordStore {
    pub fn open(calf_path: impl Into<PathBuf>, treatment_path: impl Into<PathBuf>) -> Self {
        let mut store = RecordStore {
            calf_path: calf_path.into(),
            treatment_path: treatment_path.into(),
            calves: Vec::new(),
            treatments: Vec::new(),
            notices: Vec::new(),
        };
        store.refresh();
        store
    }

    pub fn from_config(config: &Config) -> Self {
        Self::open(config.calf_registry_path(), config.treatment_log_path())
    }

    /// Re-read both files. A table whose file turns out unreadable keeps
    /// its current in-memory rows.
    pub fn refresh(&mut self) {
        let treatments = load_treatment_log(&self.treatment_path);
        self.notices.push(treatments.status.notice(TreatmentRecord::LABEL));
        if !treatments.status.is_warning() {
            self.treatments = treatments.records;
        }

        let calves = load_calf_registry(&self.calf_path);
        self.notices.push(calves.status.notice(CalfRecord::LABEL));
        if !calves.status.is_warning() {
            self.calves = calves.records;
        }
    }

    pub fn calves(&self) -> &[CalfRecord] {
        &self.calves
    }

    pub fn treatments(&self) -> &[TreatmentRecord] {
        &self.treatments
    }

    pub fn calf_path(&self) -> &Path {
        &self.calf_path
    }

    pub fn treatment_path(&self) -> &Path {
        &self.treatment_path
    }

    /// Append + persist. On a write failure the previous rows are kept.
    pub fn add_calf(&mut self, record: CalfRecord) -> RecordResult<()> {
        let next = append_calf(&self.calves, record);
        let result = persist_calf_registry(&self.calf_path, &next);
        self.note_save(&result, CalfRecord::LABEL);
        if result.is_ok() {
            self.calves = next;
        }
        result
    }

    pub fn add_treatment(&mut self, record: TreatmentRecord) -> RecordResult<()> {
        let next = append_treatment(&self.treatments, record);
        let result = persist_treatment_log(&self.treatment_path, &next);
        self.note_save(&result, TreatmentRecord::LABEL);
        if result.is_ok() {
            self.treatments = next;
        }
        result
    }

    fn note_save(&mut self, result: &RecordResult<()>, label: &str) {
        let notice = match result {
            Ok(()) => Notice::info(format!("Dados de {} salvos com sucesso.", label)),
            Err(err) => {
                warn!("could not save {} table: {}", label, err);
                Notice::warning(format!("Erro ao salvar os dados de {}: {}", label, err))
            }
        };
        self.notices.push(notice);
    }

    /// Drain pending user-facing messages
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
