//! CSV trial-record storage.
//!
//! One row per judged trial, no header:
//! `participant,scenario,trial_number,trial_length,answered_correctly`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use tonespan_core::TrialRecord;
use tonespan_session::ResultsRecorder;

pub struct CsvRecorder {
    path: PathBuf,
    file: File,
}

impl CsvRecorder {
    /// Open `results/<participant>.csv` under the working directory, creating
    /// the directory if needed. Fails fast if the file already exists so a
    /// session can never clobber earlier data.
    pub fn create(participant: &str) -> Result<Self> {
        let dir = PathBuf::from("results");
        if dir.exists() && !dir.is_dir() {
            bail!("'results' exists but is not a directory");
        }
        std::fs::create_dir_all(&dir).context("creating results directory")?;
        Self::create_in(&dir, participant)
    }

    /// As [`CsvRecorder::create`], with an explicit destination directory.
    pub fn create_in(dir: &Path, participant: &str) -> Result<Self> {
        let path = dir.join(format!("{participant}.csv"));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| {
                format!(
                    "results file {} already exists or cannot be created",
                    path.display()
                )
            })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_row(out: &mut impl Write, record: &TrialRecord) -> std::io::Result<()> {
    writeln!(
        out,
        "{},{},{},{},{}",
        record.participant, record.scenario, record.trial_number, record.length, record.correct
    )
}

impl ResultsRecorder for CsvRecorder {
    fn append(&mut self, record: &TrialRecord) -> Result<()> {
        write_row(&mut self.file, record).context("appending trial record")?;
        self.file.flush().context("flushing results file")?;
        Ok(())
    }

    fn rewrite(&mut self, records: &[TrialRecord]) -> Result<()> {
        let mut file = File::create(&self.path).context("rewriting results file")?;
        for record in records {
            write_row(&mut file, record)?;
        }
        file.flush().context("flushing results file")?;
        self.file = file;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CsvRecorder;
    use tonespan_core::TrialRecord;
    use tonespan_session::ResultsRecorder;

    fn record(trial_number: usize, length: usize, correct: bool) -> TrialRecord {
        TrialRecord {
            participant: "p01".to_string(),
            scenario: "harmonic".to_string(),
            trial_number,
            length,
            correct,
        }
    }

    #[test]
    fn append_and_rewrite_produce_identical_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = CsvRecorder::create_in(dir.path(), "p01").expect("create");

        let records = vec![record(1, 1, true), record(2, 2, false)];
        for r in &records {
            recorder.append(r).expect("append");
        }
        let appended = std::fs::read_to_string(recorder.path()).expect("read");
        assert_eq!(appended, "p01,harmonic,1,1,true\np01,harmonic,2,2,false\n");

        recorder.rewrite(&records).expect("rewrite");
        let rewritten = std::fs::read_to_string(recorder.path()).expect("read");
        assert_eq!(rewritten, appended);
    }

    #[test]
    fn existing_file_aborts_setup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _first = CsvRecorder::create_in(dir.path(), "p02").expect("create");
        assert!(CsvRecorder::create_in(dir.path(), "p02").is_err());
    }
}
