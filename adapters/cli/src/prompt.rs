//! Interactive collection of the session settings the experimenter did not pass as flags.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use bart_core::{Background, ParticipantId, RoundCount, SessionConfig};

const PARTICIPANT_PROMPT: &str = "Please enter the user ID (4 digits):> ";
const ROUNDS_PROMPT: &str = "Please enter the number of rounds (1 to 240):> ";
const BACKGROUND_PROMPT: &str =
    "Please choose which background image to use: police, trees, gambling, or none (type which option):> ";
const ACTIVE_RESPONSE_PROMPT: &str = "Turn on active responses? (y/n):> ";
const RETRY_ACKNOWLEDGEMENT: &str = "Invalid string entered. Press enter to try again.";

/// Session settings supplied up front; missing entries are prompted for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PresetSession {
    pub(crate) participant: Option<ParticipantId>,
    pub(crate) rounds: Option<RoundCount>,
    /// `Some(None)` records an explicit "no background" choice.
    pub(crate) background: Option<Option<Background>>,
    pub(crate) active_response: Option<bool>,
}

/// Console dialogue that keeps asking until each answer validates.
#[derive(Debug)]
pub(crate) struct SessionPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> SessionPrompt<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Fills in every setting the preset leaves open, in the order
    /// participant, rounds, background, active responses.
    pub(crate) fn complete(&mut self, preset: PresetSession) -> Result<SessionConfig> {
        let participant = match preset.participant {
            Some(participant) => participant,
            None => self.participant()?,
        };
        let rounds = match preset.rounds {
            Some(rounds) => rounds,
            None => self.rounds()?,
        };
        let background = match preset.background {
            Some(background) => background,
            None => self.background()?,
        };
        let active_response = match preset.active_response {
            Some(active_response) => active_response,
            None => self.active_response()?,
        };
        Ok(SessionConfig::new(
            participant,
            rounds,
            active_response,
            background,
        ))
    }

    fn participant(&mut self) -> Result<ParticipantId> {
        loop {
            let answer = self.ask(PARTICIPANT_PROMPT)?;
            match ParticipantId::parse(&answer) {
                Ok(participant) => return Ok(participant),
                Err(_) => self.say("Inputted user ID is invalid. Please try again.")?,
            }
        }
    }

    fn rounds(&mut self) -> Result<RoundCount> {
        loop {
            let answer = self.ask(ROUNDS_PROMPT)?;
            let parsed = answer
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|value| RoundCount::new(value).ok());
            if let Some(rounds) = parsed {
                return Ok(rounds);
            }
        }
    }

    fn background(&mut self) -> Result<Option<Background>> {
        loop {
            let answer = self.ask(BACKGROUND_PROMPT)?;
            match Background::parse_selection(&answer) {
                Ok(background) => return Ok(background),
                Err(_) => self.acknowledge_retry()?,
            }
        }
    }

    fn active_response(&mut self) -> Result<bool> {
        loop {
            match self.ask(ACTIVE_RESPONSE_PROMPT)?.trim() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => self.acknowledge_retry()?,
            }
        }
    }

    fn acknowledge_retry(&mut self) -> Result<()> {
        let _ = self.ask(RETRY_ACKNOWLEDGEMENT)?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").context("failed to write prompt")?;
        self.output.flush().context("failed to flush prompt")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read answer")?;
        if read == 0 {
            bail!("input closed while waiting for an answer to {prompt:?}");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}").context("failed to write message")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(script: &str, preset: PresetSession) -> (Result<SessionConfig>, String) {
        let mut output = Vec::new();
        let result = SessionPrompt::new(Cursor::new(script.as_bytes()), &mut output).complete(preset);
        (result, String::from_utf8(output).expect("prompt output is utf-8"))
    }

    #[test]
    fn collects_every_setting_in_order() {
        let (result, transcript) = run("0042\n12\ntrees\ny\n", PresetSession::default());

        let config = result.expect("valid answers");
        assert_eq!(config.participant.as_str(), "0042");
        assert_eq!(config.rounds.get(), 12);
        assert_eq!(config.background, Some(Background::Trees));
        assert!(config.active_response);
        assert_eq!(
            transcript,
            format!("{PARTICIPANT_PROMPT}{ROUNDS_PROMPT}{BACKGROUND_PROMPT}{ACTIVE_RESPONSE_PROMPT}")
        );
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let script = "42\nabcd\n1234\n0\n241\nten\n240\npurple\n\nnone\nmaybe\n\nn\n";
        let (result, transcript) = run(script, PresetSession::default());

        let config = result.expect("eventually valid answers");
        assert_eq!(config.participant.as_str(), "1234");
        assert_eq!(config.rounds.get(), 240);
        assert_eq!(config.background, None);
        assert!(!config.active_response);
        assert_eq!(transcript.matches(PARTICIPANT_PROMPT).count(), 3);
        assert_eq!(
            transcript
                .matches("Inputted user ID is invalid. Please try again.")
                .count(),
            2
        );
        assert_eq!(transcript.matches(ROUNDS_PROMPT).count(), 4);
        assert_eq!(transcript.matches(RETRY_ACKNOWLEDGEMENT).count(), 2);
    }

    #[test]
    fn preset_settings_are_not_prompted() {
        let preset = PresetSession {
            participant: ParticipantId::parse("9876").ok(),
            rounds: RoundCount::new(30).ok(),
            background: Some(Some(Background::Police)),
            active_response: None,
        };
        let (result, transcript) = run("y\n", preset);

        let config = result.expect("remaining answer valid");
        assert_eq!(config.participant.as_str(), "9876");
        assert_eq!(config.background, Some(Background::Police));
        assert_eq!(transcript, ACTIVE_RESPONSE_PROMPT);
    }

    #[test]
    fn closed_input_is_an_error() {
        let (result, _) = run("12", PresetSession::default());

        let error = result.expect_err("participant never validated");
        assert!(error.to_string().contains("input closed"));
    }
}
