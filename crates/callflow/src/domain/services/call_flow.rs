//! Call Flow - Scripted call state machine
//!
//! Pure functions of (session, event, now). Each handler mutates the session
//! in place and returns the instructions for the provider plus the audit
//! events to persist with it. Loading and saving the session is the caller's
//! job.

use chrono::{DateTime, Utc};

use crate::domain::entities::{CallEvent, CallEventKind, CallSession, ScriptStep};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{CallStatus, Instruction, ProviderStatus, WebhookUrls};

/// Fixed phrases spoken outside of a script
#[derive(Debug, Clone)]
pub struct FlowMessages {
    /// Unknown or finished calls
    pub goodbye: String,
    /// Internal faults
    pub apology: String,
    pub no_input: String,
    /// Rejected entry on a step without its own on-invalid prompt
    pub invalid_input: String,
    pub too_many_attempts: String,
}

impl Default for FlowMessages {
    fn default() -> Self {
        Self {
            goodbye: "Thank you for calling. Goodbye.".to_string(),
            apology: "We're sorry, something went wrong. Goodbye.".to_string(),
            no_input: "No digits received. Goodbye.".to_string(),
            invalid_input: "Sorry, that entry was not valid. Please try again.".to_string(),
            too_many_attempts: "Too many invalid attempts. Goodbye.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowSettings {
    /// Rejected entries allowed per step before the call fails; `None` re-prompts forever
    pub max_invalid_attempts: Option<u32>,
    pub messages: FlowMessages,
}

/// Result of applying one event to a session
#[derive(Debug, Clone)]
pub struct Transition {
    pub instructions: Vec<Instruction>,
    pub events: Vec<CallEvent>,
    /// Whether the session itself was modified and must be saved
    pub changed: bool,
}

impl Transition {
    fn unchanged(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            events: Vec::new(),
            changed: false,
        }
    }

    fn changed(instructions: Vec<Instruction>, events: Vec<CallEvent>) -> Self {
        Self {
            instructions,
            events,
            changed: true,
        }
    }

    pub fn requests_input(&self) -> bool {
        self.instructions.iter().any(Instruction::is_input_request)
    }
}

/// The call-session state machine
#[derive(Debug, Clone)]
pub struct CallFlow {
    settings: FlowSettings,
    urls: WebhookUrls,
}

impl CallFlow {
    pub fn new(settings: FlowSettings, urls: WebhookUrls) -> Self {
        Self { settings, urls }
    }

    pub fn urls(&self) -> &WebhookUrls {
        &self.urls
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Safe response for calls this system cannot drive
    pub fn goodbye(&self) -> Vec<Instruction> {
        vec![Instruction::speak(self.settings.messages.goodbye.clone())]
    }

    /// Safe response after an internal fault
    pub fn apology(&self) -> Vec<Instruction> {
        vec![Instruction::speak(self.settings.messages.apology.clone())]
    }

    /// The provider reports the callee picked up
    ///
    /// A repeated answer re-emits the current step without resetting it.
    pub fn on_answered(&self, session: &mut CallSession, now: DateTime<Utc>) -> Transition {
        if session.is_terminal() || session.status == CallStatus::Escalated {
            return Transition::unchanged(self.goodbye());
        }

        let first_answer = session.status == CallStatus::Ringing;
        let step = match session.current_step().cloned() {
            Some(step) => step,
            None => return self.finish(session, now, Vec::new()),
        };

        let mut instructions = Vec::new();
        if first_answer && session.recording_enabled {
            instructions.push(Instruction::Record {
                callback_url: self.urls.recording(),
            });
        }
        instructions.extend(self.prompt(session, &step, &step.message));

        if session.status == CallStatus::InProgress {
            return Transition::unchanged(instructions);
        }

        session.transition_to(CallStatus::InProgress, now);
        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::Answered,
            serde_json::json!({ "step": session.current_step, "repeated": !first_answer }),
            now,
        );
        Transition::changed(instructions, vec![event])
    }

    /// The provider delivers keypad input (or reports that none was entered)
    pub fn on_digits(
        &self,
        session: &mut CallSession,
        digits: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        if !session.status.accepts_input() {
            return Ok(Transition::unchanged(self.goodbye()));
        }

        let digits = digits.map(str::trim).unwrap_or_default();
        if digits.is_empty() {
            let event = CallEvent::new(
                &session.call_id,
                CallEventKind::NoInput,
                serde_json::json!({ "step": session.current_step }),
                now,
            );
            session.transition_to(CallStatus::Completed, now);
            return Ok(Transition::changed(
                vec![Instruction::speak(self.settings.messages.no_input.clone())],
                vec![event],
            ));
        }

        let step = match session.current_step().cloned() {
            Some(step) => step,
            None => return Ok(self.finish(session, now, Vec::new())),
        };

        if !step.accepts(digits)? {
            return Ok(self.reject(session, &step, digits, now));
        }

        let accepted = CallEvent::new(
            &session.call_id,
            CallEventKind::DigitsAccepted,
            serde_json::json!({ "step": session.current_step, "digits": digits }),
            now,
        );
        session.accept_digits(digits, now);

        match session.current_step().cloned() {
            Some(next) => {
                session.transition_to(CallStatus::AwaitingInput, now);
                let instructions = self.prompt(session, &next, &next.message);
                Ok(Transition::changed(instructions, vec![accepted]))
            }
            None => Ok(self.finish(session, now, vec![accepted])),
        }
    }

    /// Generic status ping from the provider
    pub fn on_provider_status(
        &self,
        session: &mut CallSession,
        status: &ProviderStatus,
        now: DateTime<Utc>,
    ) -> Transition {
        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::ProviderStatus,
            serde_json::json!({ "status": status.to_string(), "session_status": session.status }),
            now,
        );

        match status.session_status() {
            Some(target) if !session.is_terminal() => {
                session.transition_to(target, now);
                Transition::changed(Vec::new(), vec![event])
            }
            _ => Transition {
                instructions: Vec::new(),
                events: vec![event],
                changed: false,
            },
        }
    }

    /// Attach a finished recording; the same URL twice is a no-op
    ///
    /// Allowed on terminal sessions: recordings arrive after the call ends and
    /// do not change the call's status.
    pub fn on_recording_ready(
        &self,
        session: &mut CallSession,
        recording_url: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        if session.recording_url.as_deref() == Some(recording_url) {
            return Transition::unchanged(Vec::new());
        }

        session.recording_url = Some(recording_url.to_string());
        session.updated_at = now;
        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::RecordingReady,
            serde_json::json!({ "recording_url": recording_url }),
            now,
        );
        Transition::changed(Vec::new(), vec![event])
    }

    /// Operator hands the live call to a human
    ///
    /// The returned instructions are the provider transfer destination.
    pub fn escalate(
        &self,
        session: &mut CallSession,
        transfer_to: &str,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        self.ensure_live(session, "escalate")?;

        session.transition_to(CallStatus::Escalated, now);
        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::Escalated,
            serde_json::json!({ "to": transfer_to }),
            now,
        );
        Ok(Transition::changed(
            vec![Instruction::Transfer {
                number: transfer_to.to_string(),
            }],
            vec![event],
        ))
    }

    /// Operator ends the call
    pub fn hang_up(
        &self,
        session: &mut CallSession,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        self.ensure_live(session, "hang up")?;

        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::HungUp,
            serde_json::json!({ "previous_status": session.status }),
            now,
        );
        session.transition_to(CallStatus::HungUp, now);
        Ok(Transition::changed(Vec::new(), vec![event]))
    }

    /// Operator turns on recording for a live call
    pub fn start_recording(
        &self,
        session: &mut CallSession,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        self.ensure_live(session, "record")?;

        session.recording_enabled = true;
        session.updated_at = now;
        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::RecordingStarted,
            serde_json::json!({}),
            now,
        );
        Ok(Transition::changed(Vec::new(), vec![event]))
    }

    fn ensure_live(&self, session: &CallSession, action: &str) -> Result<(), DomainError> {
        if session.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "cannot {} call {}: session is {}",
                action, session.call_id, session.status
            )));
        }
        Ok(())
    }

    fn prompt(&self, session: &CallSession, step: &ScriptStep, text: &str) -> Vec<Instruction> {
        vec![
            Instruction::speak_as(text, &session.voice, &session.language),
            Instruction::CollectInput {
                max_digits: step.expected_digits,
                timeout_seconds: step.timeout,
                callback_url: self.urls.dtmf(&session.call_id),
            },
        ]
    }

    fn reject(
        &self,
        session: &mut CallSession,
        step: &ScriptStep,
        digits: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        session.invalid_attempts += 1;
        tracing::debug!(
            "Rejected input for call {} at step {} (attempt {})",
            session.call_id,
            session.current_step,
            session.invalid_attempts
        );
        let mut events = vec![CallEvent::new(
            &session.call_id,
            CallEventKind::DigitsRejected,
            serde_json::json!({
                "step": session.current_step,
                "digits": digits,
                "attempt": session.invalid_attempts,
            }),
            now,
        )];

        if let Some(max) = self.settings.max_invalid_attempts {
            if session.invalid_attempts >= max {
                events.push(CallEvent::new(
                    &session.call_id,
                    CallEventKind::InvalidAttemptsExhausted,
                    serde_json::json!({ "step": session.current_step, "attempts": max }),
                    now,
                ));
                session.transition_to(CallStatus::Failed, now);
                return Transition::changed(
                    vec![Instruction::speak(
                        self.settings.messages.too_many_attempts.clone(),
                    )],
                    events,
                );
            }
        }

        session.transition_to(CallStatus::AwaitingInput, now);
        let text = step
            .on_invalid
            .as_ref()
            .map(|p| p.message.as_str())
            .unwrap_or(self.settings.messages.invalid_input.as_str());
        Transition::changed(self.prompt(session, step, text), events)
    }

    fn finish(
        &self,
        session: &mut CallSession,
        now: DateTime<Utc>,
        mut events: Vec<CallEvent>,
    ) -> Transition {
        session.transition_to(CallStatus::Completed, now);
        events.push(CallEvent::new(
            &session.call_id,
            CallEventKind::Completed,
            serde_json::json!({ "steps": session.collected.len() }),
            now,
        ));
        Transition::changed(
            vec![Instruction::speak_as(
                session.flow.final_message.clone(),
                &session.voice,
                &session.language,
            )],
            events,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ScriptFlow, ScriptStep};
    use crate::domain::value_objects::ValidationRule;

    const BASE: &str = "https://calls.example.com";

    fn flow_machine(settings: FlowSettings) -> CallFlow {
        CallFlow::new(settings, WebhookUrls::new(BASE))
    }

    fn two_step_session() -> CallSession {
        let flow = ScriptFlow::new(
            vec![
                ScriptStep::new("Enter your six digit code.", 6, 30)
                    .with_validation(ValidationRule::ExactLength { length: 6 })
                    .with_on_invalid("That code was incorrect."),
                ScriptStep::new("Press 1 to confirm.", 1, 10),
            ],
            "Your appointment is confirmed. Goodbye.",
        );
        CallSession::new(
            "X".to_string(),
            "+15550100".to_string(),
            flow,
            "en-US".to_string(),
            "Joey".to_string(),
        )
    }

    fn spoken(t: &Transition) -> Vec<String> {
        t.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Speak { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn input_request(t: &Transition) -> Option<(u32, u32, String)> {
        t.instructions.iter().find_map(|i| match i {
            Instruction::CollectInput {
                max_digits,
                timeout_seconds,
                callback_url,
            } => Some((*max_digits, *timeout_seconds, callback_url.clone())),
            _ => None,
        })
    }

    #[test]
    fn test_two_step_script_scenario() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        let now = Utc::now();

        let answered = machine.on_answered(&mut session, now);
        assert_eq!(spoken(&answered), vec!["Enter your six digit code."]);
        assert_eq!(
            input_request(&answered),
            Some((
                6,
                30,
                "https://calls.example.com/api/advanced-calls/dtmf-handler/X".to_string()
            ))
        );
        assert_eq!(session.status, CallStatus::InProgress);

        let first = machine.on_digits(&mut session, Some("123456"), now).unwrap();
        assert_eq!(spoken(&first), vec!["Press 1 to confirm."]);
        assert_eq!(input_request(&first).map(|(d, t, _)| (d, t)), Some((1, 10)));
        assert_eq!(session.current_step, 1);
        assert_eq!(session.status, CallStatus::AwaitingInput);

        let last = machine.on_digits(&mut session, Some("1"), now).unwrap();
        assert_eq!(
            spoken(&last),
            vec!["Your appointment is confirmed. Goodbye."]
        );
        assert!(!last.requests_input());
        assert_eq!(session.status, CallStatus::Completed);
        assert!(session.ended_at.is_some());
        assert_eq!(session.collected.len(), 2);
        assert_eq!(session.collected[1].digits, "1");
    }

    #[test]
    fn test_valid_digits_advance_exactly_one_step() {
        let machine = flow_machine(FlowSettings::default());
        for digits in ["000000", "123456", "999999"] {
            let mut session = two_step_session();
            machine.on_answered(&mut session, Utc::now());
            machine.on_digits(&mut session, Some(digits), Utc::now()).unwrap();
            assert_eq!(session.current_step, 1);
        }
    }

    #[test]
    fn test_invalid_digits_reprompt_same_step() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());

        for digits in ["123", "1234567", "12a456", "*23456"] {
            let t = machine.on_digits(&mut session, Some(digits), Utc::now()).unwrap();
            assert_eq!(spoken(&t), vec!["That code was incorrect."]);
            assert_eq!(input_request(&t).map(|(d, _, _)| d), Some(6));
            assert_eq!(session.current_step, 0);
            assert_eq!(session.status, CallStatus::AwaitingInput);
        }
        assert_eq!(session.invalid_attempts, 4);
        assert!(session.collected.is_empty());
    }

    #[test]
    fn test_invalid_without_on_invalid_uses_generic_prompt() {
        let machine = flow_machine(FlowSettings::default());
        let flow = ScriptFlow::new(
            vec![ScriptStep::new("Press 1 or 2.", 1, 10).with_validation(
                ValidationRule::Pattern {
                    pattern: "[12]".to_string(),
                },
            )],
            "Bye.",
        );
        let mut session = CallSession::new(
            "Y".to_string(),
            "+15550101".to_string(),
            flow,
            "en-US".to_string(),
            "Joey".to_string(),
        );
        machine.on_answered(&mut session, Utc::now());

        let t = machine.on_digits(&mut session, Some("7"), Utc::now()).unwrap();
        assert_eq!(
            spoken(&t),
            vec!["Sorry, that entry was not valid. Please try again."]
        );
    }

    #[test]
    fn test_invalid_input_is_not_capped_by_default() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());

        for _ in 0..50 {
            let t = machine.on_digits(&mut session, Some("1"), Utc::now()).unwrap();
            assert!(t.requests_input());
        }
        assert_eq!(session.status, CallStatus::AwaitingInput);
        assert_eq!(session.invalid_attempts, 50);
    }

    #[test]
    fn test_invalid_attempt_cap_fails_call() {
        let machine = flow_machine(FlowSettings {
            max_invalid_attempts: Some(3),
            ..FlowSettings::default()
        });
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());

        machine.on_digits(&mut session, Some("1"), Utc::now()).unwrap();
        machine.on_digits(&mut session, Some("1"), Utc::now()).unwrap();
        let t = machine.on_digits(&mut session, Some("1"), Utc::now()).unwrap();

        assert_eq!(spoken(&t), vec!["Too many invalid attempts. Goodbye."]);
        assert!(!t.requests_input());
        assert_eq!(session.status, CallStatus::Failed);
        assert!(t
            .events
            .iter()
            .any(|e| e.kind == CallEventKind::InvalidAttemptsExhausted));
    }

    #[test]
    fn test_valid_entry_resets_invalid_counter() {
        let machine = flow_machine(FlowSettings {
            max_invalid_attempts: Some(2),
            ..FlowSettings::default()
        });
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());

        machine.on_digits(&mut session, Some("1"), Utc::now()).unwrap();
        machine.on_digits(&mut session, Some("123456"), Utc::now()).unwrap();
        assert_eq!(session.invalid_attempts, 0);
        assert_eq!(session.status, CallStatus::AwaitingInput);
    }

    #[test]
    fn test_empty_digits_complete_call_at_any_step() {
        let machine = flow_machine(FlowSettings::default());

        for (advance, digits) in [(false, None), (false, Some("")), (true, Some("   "))] {
            let mut session = two_step_session();
            machine.on_answered(&mut session, Utc::now());
            if advance {
                machine.on_digits(&mut session, Some("123456"), Utc::now()).unwrap();
            }
            let t = machine.on_digits(&mut session, digits, Utc::now()).unwrap();
            assert_eq!(spoken(&t), vec!["No digits received. Goodbye."]);
            assert!(!t.requests_input());
            assert_eq!(session.status, CallStatus::Completed);
        }
    }

    #[test]
    fn test_answer_never_reverts_terminal_session() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());
        machine.on_digits(&mut session, None, Utc::now()).unwrap();
        assert_eq!(session.status, CallStatus::Completed);

        let t = machine.on_answered(&mut session, Utc::now());
        assert!(!t.changed);
        assert_eq!(session.status, CallStatus::Completed);
        assert_eq!(spoken(&t), vec!["Thank you for calling. Goodbye."]);
    }

    #[test]
    fn test_repeated_answer_replays_current_step() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());
        machine.on_digits(&mut session, Some("123456"), Utc::now()).unwrap();

        let t = machine.on_answered(&mut session, Utc::now());
        assert_eq!(session.current_step, 1);
        assert_eq!(spoken(&t), vec!["Press 1 to confirm."]);
        assert_eq!(session.status, CallStatus::InProgress);

        let again = machine.on_answered(&mut session, Utc::now());
        assert!(!again.changed);
    }

    #[test]
    fn test_recording_prepended_on_first_answer() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session().with_recording(true);

        let t = machine.on_answered(&mut session, Utc::now());
        assert_eq!(
            t.instructions[0],
            Instruction::Record {
                callback_url: "https://calls.example.com/webhooks/recording".to_string()
            }
        );
    }

    #[test]
    fn test_digits_before_answer_are_ignored() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();

        let t = machine.on_digits(&mut session, Some("123456"), Utc::now()).unwrap();
        assert!(!t.changed);
        assert_eq!(session.status, CallStatus::Ringing);
        assert_eq!(session.current_step, 0);
    }

    #[test]
    fn test_provider_status_mapping_applies_once() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();

        let ringing = machine.on_provider_status(&mut session, &"ringing".into(), Utc::now());
        assert!(!ringing.changed);
        assert_eq!(ringing.events.len(), 1);

        let busy = machine.on_provider_status(&mut session, &"busy".into(), Utc::now());
        assert!(busy.changed);
        assert_eq!(session.status, CallStatus::Failed);

        let completed = machine.on_provider_status(&mut session, &"completed".into(), Utc::now());
        assert!(!completed.changed);
        assert_eq!(session.status, CallStatus::Failed);
    }

    #[test]
    fn test_caller_hanging_up_mid_script() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());

        machine.on_provider_status(&mut session, &"completed".into(), Utc::now());
        assert_eq!(session.status, CallStatus::HungUp);
    }

    #[test]
    fn test_recording_attach_is_idempotent() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        session.transition_to(CallStatus::Completed, Utc::now());

        let url = "https://api.example.com/recordings/1";
        let first = machine.on_recording_ready(&mut session, url, Utc::now());
        assert!(first.changed);
        assert_eq!(session.recording_url.as_deref(), Some(url));
        assert_eq!(session.status, CallStatus::Completed);

        let second = machine.on_recording_ready(&mut session, url, Utc::now());
        assert!(!second.changed);
        assert!(second.events.is_empty());
    }

    #[test]
    fn test_operator_actions_rejected_on_terminal_session() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        session.transition_to(CallStatus::HungUp, Utc::now());

        assert!(machine
            .escalate(&mut session, "+15550199", Utc::now())
            .unwrap_err()
            .is_conflict());
        assert!(machine.hang_up(&mut session, Utc::now()).is_err());
        assert!(machine.start_recording(&mut session, Utc::now()).is_err());
    }

    #[test]
    fn test_escalated_call_can_still_be_hung_up() {
        let machine = flow_machine(FlowSettings::default());
        let mut session = two_step_session();
        machine.on_answered(&mut session, Utc::now());

        let t = machine.escalate(&mut session, "+15550199", Utc::now()).unwrap();
        assert_eq!(
            t.instructions,
            vec![Instruction::Transfer {
                number: "+15550199".to_string()
            }]
        );
        assert_eq!(session.status, CallStatus::Escalated);

        let digits = machine.on_digits(&mut session, Some("123456"), Utc::now()).unwrap();
        assert!(!digits.changed);

        machine.hang_up(&mut session, Utc::now()).unwrap();
        assert_eq!(session.status, CallStatus::HungUp);
    }
}
