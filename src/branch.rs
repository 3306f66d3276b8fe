use crate::error::SalesError;
use crate::lines::read_lines;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::{borrow::Borrow, fmt, fs, io, path::Path};
use tracing::{debug, info, warn};

/// Totals must stay strictly below this, i.e. at most 10 digits.
pub const TOTAL_LIMIT: u64 = 10_000_000_000;

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{3}$").expect("Invalid regex pattern"));

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub struct BranchCode(String);

impl BranchCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchCode {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if CODE_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err("Branch code must be exactly three digits")
        }
    }
}

impl Borrow<str> for BranchCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize, Debug)]
struct BranchLine {
    code: BranchCode,
    name: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub total: u64,
}

impl Branch {
    pub fn new(name: String) -> Self {
        Self { name, total: 0 }
    }

    /// Adds `amount` to the running total. The total is left untouched on overflow.
    pub fn add_sale(&mut self, amount: u64) -> Result<(), SalesError> {
        let total = self
            .total
            .checked_add(amount)
            .filter(|total| *total < TOTAL_LIMIT)
            .ok_or(SalesError::AmountOverflow)?;
        self.total = total;

        Ok(())
    }
}

/// Branch code to branch, in branch definition file order.
#[derive(Debug, Default)]
pub struct BranchRegistry {
    branches: IndexMap<BranchCode, Branch>,
}

impl BranchRegistry {
    pub fn load<P>(path: P) -> Result<Self, SalesError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "branch definition file is missing");
            return Err(SalesError::FileNotFound);
        }

        let mut branches = IndexMap::new();
        for (index, text) in read_lines(path)?.iter().enumerate() {
            let record = csv::StringRecord::from(text.split(',').collect::<Vec<_>>());
            let line = parse_line(index + 1, &record)?;
            if branches.contains_key(&line.code) {
                warn!(code = %line.code, "duplicate branch code");
                return Err(SalesError::InvalidMasterFormat);
            }
            branches.insert(line.code, Branch::new(line.name));
        }

        info!(branches = branches.len(), path = %path.display(), "loaded branch definitions");
        Ok(Self { branches })
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Branch> {
        self.branches.get_mut(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BranchCode, &Branch)> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Writes `code,name,total` per branch. The file is staged next to `path` and only
    /// renamed into place once fully written, so a failed run never leaves a partial summary.
    pub fn write_summary<P>(&self, path: P) -> Result<(), SalesError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let staging = staging_builder().tempfile_in(dir)?;
        if let Ok(metadata) = fs::metadata(path) {
            staging.as_file().set_permissions(metadata.permissions())?;
        }
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(staging);

        for (code, branch) in self.iter() {
            wtr.serialize((code.as_str(), branch.name.as_str(), branch.total))?;
        }

        let staging = wtr
            .into_inner()
            .map_err(|err| io::Error::new(err.error().kind(), err.to_string()))?;
        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|err| err.error)?;

        info!(branches = self.len(), path = %path.display(), "wrote branch summary");
        Ok(())
    }
}

/// Staged summaries get the umask-filtered 0666 of a plainly created file, not tempfile's 0600.
fn staging_builder() -> tempfile::Builder<'static, 'static> {
    #[allow(unused_mut)]
    let mut builder = tempfile::Builder::new();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    builder
}

fn parse_line(line: usize, record: &csv::StringRecord) -> Result<BranchLine, SalesError> {
    if record.len() != 2 {
        warn!(line, fields = record.len(), "branch definition needs exactly two fields");
        return Err(SalesError::InvalidMasterFormat);
    }

    let branch: BranchLine = record.deserialize(None).map_err(|err| {
        warn!(line, %err, "invalid branch definition");
        SalesError::InvalidMasterFormat
    })?;

    // a branch needs a name
    if branch.name.is_empty() {
        warn!(line, "branch name is empty");
        return Err(SalesError::InvalidMasterFormat);
    }

    debug!(line, code = %branch.code, name = %branch.name, "branch definition");
    Ok(branch)
}
