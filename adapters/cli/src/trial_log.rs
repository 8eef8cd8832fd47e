//! Comma-separated trial log written one row per completed round.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use bart_core::{ParticipantId, RoundRecord, SinkError, TrialLogger, TRIAL_LOG_LINE_TERMINATOR};

/// Location of the participant's trial log inside the output directory.
pub(crate) fn trial_log_path(output_dir: &Path, participant: &ParticipantId) -> PathBuf {
    output_dir.join(format!("BART_multirisk_data_{participant}.csv"))
}

/// Trial logger that flushes every row so a crash loses at most the current round.
#[derive(Debug)]
pub(crate) struct CsvTrialLogger<W: Write> {
    writer: Option<W>,
}

impl CsvTrialLogger<BufWriter<File>> {
    /// Creates or truncates the file and writes the header row.
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file))
    }
}

impl<W: Write> CsvTrialLogger<W> {
    pub(crate) fn from_writer(mut writer: W) -> io::Result<Self> {
        write_line(&mut writer, &RoundRecord::csv_header())?;
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl<W: Write> TrialLogger for CsvTrialLogger<W> {
    fn append(&mut self, record: &RoundRecord) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        write_line(writer, &record.to_csv_row())?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(TRIAL_LOG_LINE_TERMINATOR.as_bytes())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bart_core::RiskTier;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bart-trial-log-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn record(num_keypresses: u32, popped: bool, risk: RiskTier) -> RoundRecord {
        RoundRecord {
            num_keypresses,
            round_money_won: if popped { 0 } else { num_keypresses },
            total_money_won: 7,
            popped,
            risk,
        }
    }

    #[test]
    fn path_embeds_participant_id() {
        let participant = ParticipantId::parse("0007").expect("valid id");

        assert_eq!(
            trial_log_path(Path::new("out"), &participant),
            PathBuf::from("out").join("BART_multirisk_data_0007.csv")
        );
    }

    #[test]
    fn rows_are_visible_on_disk_before_close() {
        let dir = scratch_dir("flush");
        let path = dir.join("log.csv");
        let mut logger = CsvTrialLogger::create(&path).expect("create log");

        logger
            .append(&record(3, false, RiskTier::Low))
            .expect("append row");

        let contents = fs::read_to_string(&path).expect("read log");
        assert_eq!(
            contents,
            "num_keypresses,round_money_won,total_money_won,popped,risk\r\n3,3,7,False,low\r\n"
        );

        logger.close().expect("close log");
        fs::remove_dir_all(dir).expect("remove scratch dir");
    }

    #[test]
    fn create_truncates_existing_file() {
        let dir = scratch_dir("truncate");
        let path = dir.join("log.csv");
        fs::write(&path, "stale contents\r\n").expect("seed stale file");

        let mut logger = CsvTrialLogger::create(&path).expect("create log");
        logger
            .append(&record(2, true, RiskTier::High))
            .expect("append row");
        logger.close().expect("close log");

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(!contents.contains("stale"));
        assert!(contents.ends_with("2,0,7,True,high\r\n"));
        fs::remove_dir_all(dir).expect("remove scratch dir");
    }

    #[test]
    fn append_after_close_is_rejected() {
        let mut logger = CsvTrialLogger::from_writer(Vec::new()).expect("in-memory log");
        logger.close().expect("close log");

        let error = logger
            .append(&record(1, false, RiskTier::Medium))
            .expect_err("closed logger must refuse rows");
        assert!(matches!(error, SinkError::Closed));
        assert!(logger.close().is_ok());
    }
}
