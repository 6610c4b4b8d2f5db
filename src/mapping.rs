use std::fs;

use thiserror::Error;

/// Output classes of the bundled brain MRI model, in model output order.
pub const DEFAULT_CLASSES: [&str; 4] = [
    "glioma_tumor",
    "meningioma_tumor",
    "no_tumor",
    "pituitary_tumor",
];

#[derive(Debug, Error)]
pub enum LabelsError {
    #[error("cannot read labels file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("labels file {0} contains no labels")]
    Empty(String),
}

pub fn default_labels() -> Vec<String> {
    DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect()
}

/// One label per line, 0-indexed by line order; blank lines are skipped.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_class_mapping(file_path: &str) -> Result<Vec<String>, LabelsError> {
    let text = fs::read_to_string(file_path).map_err(|source| LabelsError::Read {
        path: file_path.to_string(),
        source,
    })?;
    let labels = parse_labels(&text);
    if labels.is_empty() {
        return Err(LabelsError::Empty(file_path.to_string()));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_lines_and_trims() {
        let labels = parse_labels("glioma_tumor\n\n  no_tumor \r\npituitary_tumor\n");
        assert_eq!(labels, vec!["glioma_tumor", "no_tumor", "pituitary_tumor"]);
    }

    #[test]
    fn default_labels_follow_model_order() {
        assert_eq!(default_labels()[0], "glioma_tumor");
        assert_eq!(default_labels().len(), 4);
    }

    #[test]
    fn empty_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("mri-assist-labels-{}.txt", std::process::id()));
        fs::write(&path, "\n  \n").unwrap();
        let err = load_class_mapping(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LabelsError::Empty(_)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_class_mapping("/nonexistent/labels.txt").unwrap_err();
        assert!(matches!(err, LabelsError::Read { .. }));
    }
}
