//! Filesystem and network backed session resources.

use std::{fs, path::PathBuf};

use bart_core::{
    ProbabilityTable, ResourceProvider, SessionConfig, SessionResources, SetupError, TriggerSink,
};
use tracing::info;

use crate::{
    trial_log::{trial_log_path, CsvTrialLogger},
    trigger::{DiscardTrigger, TcpTrigger},
};

/// Where trigger markers are delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TriggerTarget {
    /// TCP endpoint of the recording software.
    Tcp(String),
    /// Markers are dropped.
    Disabled,
}

/// Opens the probability file, the trigger channel and the trial log when setup runs.
///
/// The probability file is read and the trigger connected before the trial
/// log is created, so a failed setup never truncates an earlier data file.
#[derive(Clone, Debug)]
pub(crate) struct FileResourceProvider {
    probabilities: PathBuf,
    output_dir: PathBuf,
    trigger: TriggerTarget,
}

impl FileResourceProvider {
    pub(crate) fn new(probabilities: PathBuf, output_dir: PathBuf, trigger: TriggerTarget) -> Self {
        Self {
            probabilities,
            output_dir,
            trigger,
        }
    }
}

impl ResourceProvider for FileResourceProvider {
    fn open(&mut self, config: &SessionConfig) -> Result<SessionResources, SetupError> {
        let source =
            fs::read_to_string(&self.probabilities).map_err(SetupError::ProbabilitySource)?;
        let probabilities = ProbabilityTable::parse(&source)?;

        let trigger: Box<dyn TriggerSink> = match &self.trigger {
            TriggerTarget::Tcp(address) => {
                let trigger =
                    TcpTrigger::connect(address.as_str()).map_err(SetupError::Trigger)?;
                info!(%address, "trigger channel connected");
                Box::new(trigger)
            }
            TriggerTarget::Disabled => Box::new(DiscardTrigger::default()),
        };

        let path = trial_log_path(&self.output_dir, &config.participant);
        let logger = CsvTrialLogger::create(&path).map_err(SetupError::TrialLog)?;
        info!(path = %path.display(), "trial log created");

        Ok(SessionResources {
            logger: Box::new(logger),
            trigger,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bart_core::{ParticipantId, RiskTier, RoundCount};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bart-provider-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn config() -> SessionConfig {
        SessionConfig::new(
            ParticipantId::parse("0314").expect("valid id"),
            RoundCount::new(3).expect("valid rounds"),
            false,
            None,
        )
    }

    #[test]
    fn opens_every_resource_from_disk() {
        let dir = scratch_dir("open");
        let probabilities = dir.join("probabilities_risk.txt");
        fs::write(&probabilities, "5,6,7\n2, 3\n1\n").expect("write probabilities");
        let mut provider =
            FileResourceProvider::new(probabilities, dir.clone(), TriggerTarget::Disabled);

        let resources = provider.open(&config()).expect("resources open");

        assert_eq!(
            resources.probabilities.denominators(RiskTier::Medium),
            &[2, 3, 1]
        );
        let header = fs::read_to_string(dir.join("BART_multirisk_data_0314.csv"))
            .expect("trial log created");
        assert_eq!(
            header,
            "num_keypresses,round_money_won,total_money_won,popped,risk\r\n"
        );
        drop(resources);
        fs::remove_dir_all(dir).expect("remove scratch dir");
    }

    #[test]
    fn missing_probability_file_leaves_no_trial_log() {
        let dir = scratch_dir("missing");
        let mut provider = FileResourceProvider::new(
            dir.join("absent.txt"),
            dir.clone(),
            TriggerTarget::Disabled,
        );

        let error = provider.open(&config()).expect_err("no probability file");

        assert!(matches!(error, SetupError::ProbabilitySource(_)));
        assert!(!dir.join("BART_multirisk_data_0314.csv").exists());
        fs::remove_dir_all(dir).expect("remove scratch dir");
    }

    #[test]
    fn malformed_probabilities_are_reported() {
        let dir = scratch_dir("malformed");
        let probabilities = dir.join("probabilities_risk.txt");
        fs::write(&probabilities, "5,x\n2\n1\n").expect("write probabilities");
        let mut provider =
            FileResourceProvider::new(probabilities, dir.clone(), TriggerTarget::Disabled);

        let error = provider.open(&config()).expect_err("bad entry");

        assert!(matches!(error, SetupError::Probabilities(_)));
        fs::remove_dir_all(dir).expect("remove scratch dir");
    }
}
