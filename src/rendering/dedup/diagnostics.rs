use crate::rendering::common::resource::ModelResourceLocation;
use anyhow::Context;
use itertools::Itertools;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const NAMES_FILE: &str = "bakedModelNames.txt";
pub const NAMESPACE_COUNTS_FILE: &str = "bakedModelCountsPerNamespace.txt";
pub const LOCATION_COUNTS_FILE: &str = "bakedModelCountsPerLocation.txt";

/// How the baked models are spread over namespaces and locations, mostly to find out which mod is
/// responsible for the bulk of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCountReport {
    pub names: Vec<String>,
    pub per_namespace: Vec<(String, usize)>,
    pub per_location: Vec<(String, usize)>,
}

// Most frequent first, ties in name order.
fn by_count(counts: impl IntoIterator<Item = (String, usize)>) -> Vec<(String, usize)> {
    counts
        .into_iter()
        .sorted_by(|(a_name, a_count), (b_name, b_count)| b_count.cmp(a_count).then_with(|| a_name.cmp(b_name)))
        .collect_vec()
}

impl ModelCountReport {
    pub fn collect(keys: &[ModelResourceLocation]) -> Self {
        let names = keys.iter().map(|key| key.to_string()).sorted().collect_vec();
        let per_namespace = keys
            .iter()
            .map(|key| key.namespace().to_string())
            .counts();
        let per_location = keys
            .iter()
            .map(|key| key.location.to_string())
            .counts();

        Self {
            names,
            per_namespace: by_count(per_namespace),
            per_location: by_count(per_location),
        }
    }

    /// Writes the three reports into `dir`.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<()> {
        write_lines(&dir.join(NAMES_FILE), self.names.iter())?;
        write_lines(
            &dir.join(NAMESPACE_COUNTS_FILE),
            self.per_namespace
                .iter()
                .map(|(name, count)| format!("{}: {}", name, count)),
        )?;
        write_lines(
            &dir.join(LOCATION_COUNTS_FILE),
            self.per_location
                .iter()
                .map(|(name, count)| format!("{}: {}", name, count)),
        )?;

        info!("Wrote baked model counts for {} models to {}", self.names.len(), dir.display());
        Ok(())
    }
}

fn write_lines<S: AsRef<str>>(path: &Path, lines: impl Iterator<Item = S>) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line.as_ref()).with_context(|| format!("Writing {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing {}", path.display()))
}
