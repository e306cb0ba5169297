//! Guards against clobbering input data with report files.

use anyhow::{bail, Result};
use std::path::Path;

/// Validate that a report output path cannot overwrite an input file.
///
/// The miss log and the stats report are the only files a batch run
/// writes; neither may land on the catalog, the records file or the
/// transliteration table. Reports are also refused a `.csv` extension,
/// since every input in this pipeline is a `.csv` or `.json` file and a
/// mistyped flag should fail loudly rather than truncate data.
pub fn validate_output_path(output: &Path, sources: &[&Path]) -> Result<()> {
    for source in sources {
        if output == *source {
            bail!(
                "output '{}' would overwrite input '{}'",
                output.display(),
                source.display()
            );
        }
    }

    if output.extension().and_then(|e| e.to_str()) == Some("csv") {
        bail!(
            "refusing to write report '{}': reports must not use the .csv extension of input data",
            output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn distinct_log_path_is_accepted() {
        let output = PathBuf::from("/tmp/misses.log");
        let source = PathBuf::from("/data/catalog.csv");
        assert!(validate_output_path(&output, &[&source]).is_ok());
    }

    #[test]
    fn output_equal_to_source_is_rejected() {
        let path = PathBuf::from("/data/records.json");
        let result = validate_output_path(&path, &[&path]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("would overwrite input"));
    }

    #[test]
    fn csv_extension_is_rejected() {
        let output = PathBuf::from("/tmp/report.csv");
        let source = PathBuf::from("/data/catalog.csv");
        assert!(validate_output_path(&output, &[&source]).is_err());
    }
}
