//! # Input and Output
//!
//! CSV reading of the scraped product table and writers for every report the
//! pipeline produces. Outputs are staged as temporary files inside the output
//! directory and only renamed into place by [`StagedOutputs::commit`], so a
//! failed run leaves no partial output behind.

use crate::analysis::IngredientSummary;
use crate::deduplication::DuplicateEntry;
use crate::errors::{error_logging, AppError, AppResult};
use crate::features::FeatureTable;
use crate::junction::JunctionRelation;
use crate::records::RawProductRecord;
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const FEATURES_FILE: &str = "features.csv";
pub const JUNCTION_FILE: &str = "junction.csv";
pub const DUPLICATES_FILE: &str = "duplicated_products.txt";
pub const INCOMPLETE_FILE: &str = "incomplete_ingredients.txt";
pub const SUMMARY_FILE: &str = "ingredient_summary.csv";

const SUMMARY_HEADER: [&str; 6] = [
    "ingredient",
    "products_containing",
    "percent_containing",
    "top_rated_containing",
    "percent_top_rated_containing",
    "mean_rating",
];

/// Read every observation from a scraped product CSV
pub fn read_products(path: &Path) -> AppResult<Vec<RawProductRecord>> {
    let file = fs::File::open(path).map_err(|e| {
        AppError::FileSystem(format!("failed to open input '{}': {}", path.display(), e))
    })?;
    let records = read_products_from(file).map_err(|e| match e {
        AppError::Data(msg) => AppError::Data(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;
    info!(path = %path.display(), observations = records.len(), "Read product observations");
    Ok(records)
}

/// Required input columns; each entry lists the accepted header names
const REQUIRED_COLUMNS: [&[&str]; 7] = [
    &["key", "sku"],
    &["name", "product_name"],
    &["brand"],
    &["rating"],
    &["rating_count"],
    &["raw_ingredients", "ingredients"],
    &["category", "subcategory"],
];

fn check_required_columns(headers: &csv::StringRecord) -> AppResult<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|names| !names.iter().any(|name| headers.iter().any(|h| h == *name)))
        .map(|names| names[0])
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Data(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Read observations from any CSV source with a header row.
///
/// Every required column must be present even when there are no rows.
/// The first malformed row aborts the read.
pub fn read_products_from<R: Read>(reader: R) -> AppResult<Vec<RawProductRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    check_required_columns(csv_reader.headers()?)?;
    let mut records = Vec::new();
    for row in csv_reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the feature table with its dynamic `contains_*` columns
pub fn write_features<W: Write>(writer: W, table: &FeatureTable) -> AppResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = vec![
        "key",
        "name",
        "brand",
        "price",
        "rating",
        "rating_count",
        "category",
        "ingredients",
        "ingredient_count",
    ];
    header.extend(table.contains_columns.iter().map(String::as_str));
    header.push("star_ingredient_portion");
    if table.has_top_portion {
        header.push("top_star_ingredient_count");
    }
    header.push("rating_bin");
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let product = &row.product;
        let mut record = vec![
            product.key.clone(),
            product.name.clone(),
            product.brand.clone(),
            optional(product.price),
            product.rating.to_string(),
            product.rating_count.to_string(),
            product.category.clone(),
            row.cleaned_ingredients.clone().unwrap_or_default(),
            row.ingredient_count.to_string(),
        ];
        record.extend(row.contains.iter().map(|flag| flag.to_string()));
        record.push(optional(row.star_ingredient_portion));
        if table.has_top_portion {
            record.push(optional(row.top_star_ingredient_count));
        }
        record.push(optional(row.rating_bin));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    debug!(rows = table.rows.len(), "Wrote feature table");
    Ok(())
}

/// Write the two-column junction relation
pub fn write_junction<W: Write>(writer: W, relation: &JunctionRelation) -> AppResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if relation.is_empty() {
        csv_writer.write_record(["key", "ingredient_name"])?;
    }
    for row in relation.rows() {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write one `name:key:[category, category]` line per duplicated key
pub fn write_duplicates<W: Write>(mut writer: W, duplicates: &[DuplicateEntry]) -> AppResult<()> {
    for entry in duplicates {
        writeln!(
            writer,
            "{}:{}:[{}]",
            entry.name,
            entry.key,
            entry.categories.join(", ")
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `key,ingredients` lines without a header for manual curation
pub fn write_incomplete<'a, W: Write>(
    writer: W,
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> AppResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for (key, ingredients) in entries {
        csv_writer.write_record([key, ingredients])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_summary<W: Write>(writer: W, summaries: &[IngredientSummary]) -> AppResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if summaries.is_empty() {
        csv_writer.write_record(SUMMARY_HEADER)?;
    }
    for summary in summaries {
        csv_writer.serialize(summary)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Output files written to temporary paths, renamed into place together
pub struct StagedOutputs {
    dir: PathBuf,
    staged: Vec<(String, NamedTempFile)>,
}

impl StagedOutputs {
    pub fn new(dir: &Path) -> AppResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::FileSystem(format!(
                "failed to create output directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            staged: Vec::new(),
        })
    }

    /// Write one output to a temporary file next to its final location
    pub fn stage<F>(&mut self, file_name: &str, write: F) -> AppResult<()>
    where
        F: FnOnce(&mut dyn Write) -> AppResult<()>,
    {
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer)?;
            writer.flush()?;
        }
        debug!(file = file_name, temp = %temp.path().display(), "Staged output");
        self.staged.push((file_name.to_string(), temp));
        Ok(())
    }

    /// Names of the outputs staged so far
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.staged.iter().map(|(name, _)| name.as_str())
    }

    /// Move every staged file to its final name; returns the final paths.
    ///
    /// Destinations are checked before anything is renamed, and files already
    /// renamed by this commit are removed again if a later rename fails.
    pub fn commit(self) -> AppResult<Vec<PathBuf>> {
        let destinations: Vec<PathBuf> = self
            .staged
            .iter()
            .map(|(name, _)| self.dir.join(name))
            .collect();
        for path in &destinations {
            if path.is_dir() {
                let err = AppError::FileSystem(format!(
                    "cannot write '{}': a directory is in the way",
                    path.display()
                ));
                error_logging::log_filesystem_error(&err, "check_output", path.to_str());
                return Err(err);
            }
        }

        let mut written: Vec<PathBuf> = Vec::with_capacity(destinations.len());
        for ((_, temp), path) in self.staged.into_iter().zip(destinations) {
            if let Err(e) = temp.persist(&path) {
                error_logging::log_filesystem_error(&e.error, "persist_output", path.to_str());
                roll_back(&written);
                return Err(AppError::FileSystem(format!(
                    "failed to write '{}': {}",
                    path.display(),
                    e.error
                )));
            }
            written.push(path);
        }
        info!(dir = %self.dir.display(), files = written.len(), "Committed pipeline outputs");
        Ok(written)
    }
}

fn roll_back(written: &[PathBuf]) {
    for path in written {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove output after aborted commit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::IngredientOccurrence;

    #[test]
    fn test_read_products_from_reports_bad_rows() {
        let good = "key,name,brand,rating,rating_count,raw_ingredients,category\n\
                    A,Toner,Acme,4.2,3,\"Water, Glycerin\",Toners\n";
        assert_eq!(read_products_from(good.as_bytes()).unwrap().len(), 1);

        let bad = "key,name,brand,rating,rating_count,raw_ingredients,category\n\
                   A,Toner,Acme,4.2,many,Water,Toners\n";
        assert!(matches!(read_products_from(bad.as_bytes()), Err(AppError::Data(_))));

        let missing_column = "key,name,rating,rating_count,raw_ingredients,category\n\
                              A,Toner,4.2,3,Water,Toners\n";
        assert!(read_products_from(missing_column.as_bytes()).is_err());
    }

    #[test]
    fn test_read_products_requires_every_column() {
        let no_ingredients = "key,name,brand,rating,rating_count,category\n\
                              A,Toner,Acme,4.2,3,Toners\n";
        match read_products_from(no_ingredients.as_bytes()) {
            Err(AppError::Data(msg)) => assert!(msg.contains("raw_ingredients")),
            other => panic!("expected a data error, got {:?}", other),
        }

        match read_products_from("key,name\n".as_bytes()) {
            Err(AppError::Data(msg)) => {
                assert!(msg.contains("brand"));
                assert!(msg.contains("category"));
            }
            other => panic!("expected a data error, got {:?}", other),
        }

        assert!(matches!(read_products_from("".as_bytes()), Err(AppError::Data(_))));
    }

    #[test]
    fn test_header_only_input_with_aliases_is_empty() {
        let header = "sku,product_name,brand,rating,rating_count,ingredients,subcategory\n";
        assert!(read_products_from(header.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_write_duplicates_format() {
        let mut out = Vec::new();
        write_duplicates(
            &mut out,
            &[DuplicateEntry {
                name: "Toner".to_string(),
                key: "ABC-123".to_string(),
                categories: vec!["Toners".to_string(), "Serums".to_string()],
            }],
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Toner:ABC-123:[Toners, Serums]\n");
    }

    #[test]
    fn test_write_incomplete_has_no_header() {
        let mut out = Vec::new();
        write_incomplete(&mut out, vec![("A", "Water Glycerin"), ("B", "1,2-Hexanediol")]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "A,Water Glycerin\nB,\"1,2-Hexanediol\"\n"
        );
    }

    #[test]
    fn test_write_empty_junction_keeps_header() {
        let mut out = Vec::new();
        write_junction(&mut out, &JunctionRelation::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "key,ingredient_name\n");
    }

    #[test]
    fn test_occurrence_serializes_as_two_columns() {
        let mut csv_writer = csv::Writer::from_writer(Vec::new());
        csv_writer
            .serialize(IngredientOccurrence {
                key: "A".to_string(),
                ingredient_name: "1,2-Hexanediol".to_string(),
            })
            .unwrap();
        let out = String::from_utf8(csv_writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "key,ingredient_name\nA,\"1,2-Hexanediol\"\n");
    }

    #[test]
    fn test_staged_outputs_only_appear_on_commit() {
        let dir = tempfile::tempdir().unwrap();
        let mut outputs = StagedOutputs::new(dir.path()).unwrap();
        outputs
            .stage(DUPLICATES_FILE, |w| {
                writeln!(w, "Toner:A:[Toners, Serums]")?;
                Ok(())
            })
            .unwrap();
        assert!(!dir.path().join(DUPLICATES_FILE).exists());
        assert_eq!(outputs.file_names().collect::<Vec<_>>(), vec![DUPLICATES_FILE]);

        let written = outputs.commit().unwrap();
        assert_eq!(written, vec![dir.path().join(DUPLICATES_FILE)]);
        let content = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content, "Toner:A:[Toners, Serums]\n");
    }

    #[test]
    fn test_write_empty_summary_keeps_header() {
        let mut out = Vec::new();
        write_summary(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ingredient,products_containing,percent_containing,top_rated_containing,percent_top_rated_containing,mean_rating\n"
        );
    }

    #[test]
    fn test_blocked_destination_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(SUMMARY_FILE)).unwrap();

        let mut outputs = StagedOutputs::new(dir.path()).unwrap();
        outputs.stage(FEATURES_FILE, |w| Ok(w.write_all(b"key\n")?)).unwrap();
        outputs.stage(SUMMARY_FILE, |w| Ok(w.write_all(b"ingredient\n")?)).unwrap();

        assert!(matches!(outputs.commit(), Err(AppError::FileSystem(_))));
        assert!(!dir.path().join(FEATURES_FILE).exists());
        // Only the pre-existing directory is left
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_roll_back_removes_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join(FEATURES_FILE);
        fs::write(&first, "key\n").unwrap();
        roll_back(&[first.clone(), dir.path().join("never_written.csv")]);
        assert!(!first.exists());
    }

    #[test]
    fn test_dropped_staged_outputs_leave_nothing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut outputs = StagedOutputs::new(dir.path()).unwrap();
            outputs.stage(FEATURES_FILE, |w| Ok(w.write_all(b"key\n")?)).unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
