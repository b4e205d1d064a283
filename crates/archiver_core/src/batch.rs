use std::path::PathBuf;

/// Number of files committed and pushed together.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// One stage → commit → push cycle of the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishBatch<'a> {
    /// 1-based batch number.
    pub number: usize,
    pub total: usize,
    pub files: &'a [PathBuf],
}

impl PublishBatch<'_> {
    pub fn commit_message(&self, base: &str) -> String {
        format!("{base} - batch {} of {}", self.number, self.total)
    }
}

/// Splits `files` into consecutive batches of at most `batch_size` files.
/// A zero batch size is treated as one.
pub fn plan_batches(files: &[PathBuf], batch_size: usize) -> Vec<PublishBatch<'_>> {
    let batch_size = batch_size.max(1);
    let total = files.len().div_ceil(batch_size);
    files
        .chunks(batch_size)
        .enumerate()
        .map(|(idx, files)| PublishBatch {
            number: idx + 1,
            total,
            files,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("f{i}"))).collect()
    }

    #[test]
    fn hundred_twenty_files_make_three_batches() {
        let files = files(120);
        let batches = plan_batches(&files, DEFAULT_BATCH_SIZE);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].files.len(), 50);
        assert_eq!(batches[2].files.len(), 20);
        assert_eq!(
            batches[2].commit_message("Nightly archive update"),
            "Nightly archive update - batch 3 of 3"
        );
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert!(plan_batches(&[], DEFAULT_BATCH_SIZE).is_empty());
    }
}
