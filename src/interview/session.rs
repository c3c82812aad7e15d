//! Conversational wrapper around [`Interviewer`] for line-oriented front ends.

use tracing::info;

use super::{Interviewer, SessionState};
use crate::collaborators::ResumeArtifact;
use crate::error::{AppResult, InterviewError};

/// Asked after the report is shown.
pub const RESTART_PROMPT: &str = "The interview has finished. Would you like to run it again? (yes/no)";

/// Shown when the candidate declines a restart.
pub const CLOSING_MESSAGE: &str = "The interview is closed. Thank you for your time.";

/// Answers accepted as "run it again".
const RESTART_ANSWERS: [&str; 3] = ["yes", "y", "예"];

/// Where the conversation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No resume loaded yet.
    Idle,
    /// Waiting for an answer to the current question.
    Interviewing,
    /// Report shown, waiting for the restart answer.
    AwaitingRestart,
    Closed,
}

/// What the front end should show next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Next interview question.
    Question(String),
    /// Final report followed by the restart prompt.
    Finished {
        report: String,
        restart_prompt: String,
    },
    /// Usage hint; nothing changed.
    Guidance(String),
    /// The candidate declined a restart.
    Closed(String),
}

/// One candidate's conversation, possibly spanning several interviews of the same resume.
pub struct InterviewSession {
    interviewer: Interviewer,
    resume: Option<ResumeArtifact>,
    state: Option<SessionState>,
    phase: SessionPhase,
}

impl InterviewSession {
    pub fn new(interviewer: Interviewer) -> Self {
        Self {
            interviewer,
            resume: None,
            state: None,
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// State of the current interview, if one was started.
    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    /// Whether `text` asks for another interview.
    pub fn is_restart(text: &str) -> bool {
        let answer = text.trim().to_lowercase();
        RESTART_ANSWERS.contains(&answer.as_str())
    }

    /// Load a resume and ask the opening question.
    pub async fn begin(&mut self, resume: ResumeArtifact) -> AppResult<Reply> {
        let state = self.interviewer.start(&resume).await?;
        let question = state.current_question.clone();
        self.resume = Some(resume);
        self.state = Some(state);
        self.phase = SessionPhase::Interviewing;
        Ok(Reply::Question(question))
    }

    /// Handle one line from the candidate.
    ///
    /// Collaborator failures are returned as errors and leave the session
    /// exactly as it was, so the same answer can be sent again.
    pub async fn reply(&mut self, text: &str) -> AppResult<Reply> {
        match self.phase {
            SessionPhase::Idle => Ok(Reply::Guidance(InterviewError::NoActiveSession.to_string())),
            SessionPhase::Closed => {
                let session_id = self
                    .state
                    .as_ref()
                    .map(|s| s.session_id.clone())
                    .unwrap_or_default();
                Ok(Reply::Guidance(
                    InterviewError::SessionFinished { session_id }.to_string(),
                ))
            }
            SessionPhase::AwaitingRestart => self.handle_restart(text).await,
            SessionPhase::Interviewing => self.handle_answer(text).await,
        }
    }

    async fn handle_answer(&mut self, text: &str) -> AppResult<Reply> {
        let current = match &self.state {
            Some(state) => state,
            None => return Ok(Reply::Guidance(InterviewError::NoActiveSession.to_string())),
        };

        let next = self.interviewer.submit_answer(current, text).await?;
        let reply = match &next.report {
            Some(report) if next.is_finished() => {
                self.phase = SessionPhase::AwaitingRestart;
                Reply::Finished {
                    report: report.text.clone(),
                    restart_prompt: RESTART_PROMPT.to_string(),
                }
            }
            _ => Reply::Question(next.current_question.clone()),
        };
        self.state = Some(next);
        Ok(reply)
    }

    async fn handle_restart(&mut self, text: &str) -> AppResult<Reply> {
        if !Self::is_restart(text) {
            self.phase = SessionPhase::Closed;
            info!("Candidate declined a restart");
            return Ok(Reply::Closed(CLOSING_MESSAGE.to_string()));
        }

        match self.resume.clone() {
            Some(resume) => {
                info!("Restarting interview from the same resume");
                self.begin(resume).await
            }
            None => {
                self.phase = SessionPhase::Idle;
                Ok(Reply::Guidance(InterviewError::NoActiveSession.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_restart_answers() {
        for yes in ["yes", " Y ", "YES", "예"] {
            assert!(InterviewSession::is_restart(yes), "{}", yes);
        }
        for no in ["no", "n", "", "yes please", "아니오"] {
            assert!(!InterviewSession::is_restart(no), "{}", no);
        }
    }
}
