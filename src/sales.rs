use crate::branch::BranchRegistry;
use crate::error::SalesError;
use crate::lines::read_lines;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub const RECORD_EXTENSION: &str = "rcd";

static RECORD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^([0-9]{{8}})\.{}$",
        regex::escape(RECORD_EXTENSION)
    ))
    .expect("Invalid regex pattern")
});

static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("Invalid regex pattern"));

/// A daily sales file named `NNNNNNNN.rcd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFile {
    pub path: PathBuf,
    pub name: String,
    pub stem: u32,
}

impl RecordFile {
    /// Returns `None` unless `name` is exactly eight digits plus the record extension.
    pub fn from_name(dir: &Path, name: &str) -> Option<Self> {
        let stem = RECORD_NAME.captures(name)?.get(1)?.as_str().parse().ok()?;

        Some(Self {
            path: dir.join(name),
            name: name.to_string(),
            stem,
        })
    }
}

/// A parsed record file: one branch code and one amount.
#[derive(Debug, PartialEq, Eq)]
pub struct SaleRecord {
    pub code: String,
    pub amount: String,
}

impl SaleRecord {
    pub fn read(file: &RecordFile) -> Result<Self, SalesError> {
        let lines = read_lines(&file.path).map_err(|err| {
            warn!(file = %file.name, %err, "could not read record file");
            err
        })?;

        let [code, amount]: [String; 2] = lines.try_into().map_err(|lines: Vec<String>| {
            warn!(file = %file.name, lines = lines.len(), "record file needs exactly two lines");
            SalesError::InvalidRecordFormat {
                file: file.name.clone(),
            }
        })?;

        Ok(Self { code, amount })
    }

    pub fn amount(&self) -> Result<u64, SalesError> {
        if !AMOUNT.is_match(&self.amount) {
            warn!(amount = %self.amount, "amount is not a non-negative integer");
            return Err(SalesError::unknown());
        }

        // only digits remain, so a parse failure means the value is too large
        self.amount.parse().map_err(|_| SalesError::AmountOverflow)
    }
}

/// Lists `dir` and keeps the regular files named like record files, in no particular order.
pub fn select_record_files(dir: &Path) -> Result<Vec<RecordFile>, SalesError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        let Some(file) = RecordFile::from_name(dir, &name) else {
            continue;
        };

        if file.path.is_file() {
            files.push(file);
        } else {
            debug!(name = %name, "skipping record-like entry that is not a file");
        }
    }

    debug!(files = files.len(), dir = %dir.display(), "selected record files");
    Ok(files)
}

/// Sorts the record files and checks their stems form a gapless ascending run.
pub fn into_sequence(mut files: Vec<RecordFile>) -> Result<Vec<RecordFile>, SalesError> {
    files.sort_by(|a, b| a.name.cmp(&b.name));

    if let Some(pair) = files
        .windows(2)
        .find(|pair| pair[1].stem != pair[0].stem + 1)
    {
        warn!(
            former = %pair[0].name,
            latter = %pair[1].name,
            "record files are not sequential"
        );
        return Err(SalesError::NonSequentialFiles);
    }

    Ok(files)
}

/// Folds every record file into `registry`, stopping at the first failure.
pub fn aggregate(files: &[RecordFile], registry: &mut BranchRegistry) -> Result<(), SalesError> {
    for file in files {
        let record = SaleRecord::read(file)?;

        let branch = registry.get_mut(&record.code).ok_or_else(|| {
            warn!(file = %file.name, code = %record.code, "unknown branch code");
            SalesError::UnknownBranchCode {
                file: file.name.clone(),
            }
        })?;

        let amount = record.amount()?;
        if let Err(err) = branch.add_sale(amount) {
            warn!(
                file = %file.name,
                code = %record.code,
                total = branch.total,
                amount,
                "total exceeds ten digits"
            );
            return Err(err);
        }

        debug!(file = %file.name, code = %record.code, amount, total = branch.total, "record");
    }

    info!(files = files.len(), "aggregated record files");
    Ok(())
}

/// Owns the branch registry for one run over a target directory.
pub struct SalesProcessor {
    dir: PathBuf,
    branches: BranchRegistry,
}

impl SalesProcessor {
    pub const BRANCH_FILE: &'static str = "branch.lst";
    pub const SUMMARY_FILE: &'static str = "branch.out";

    pub fn load<P>(dir: P) -> Result<Self, SalesError>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref().to_path_buf();
        let branches = BranchRegistry::load(dir.join(Self::BRANCH_FILE))?;

        Ok(Self { dir, branches })
    }

    pub fn process_sales(&mut self) -> Result<(), SalesError> {
        let files = into_sequence(select_record_files(&self.dir)?)?;
        aggregate(&files, &mut self.branches)
    }

    pub fn write_summary(&self) -> Result<(), SalesError> {
        self.branches.write_summary(self.dir.join(Self::SUMMARY_FILE))
    }
}
