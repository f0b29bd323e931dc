//! Call Flow Application Service (Use Case)
//!
//! Wraps the call-flow state machine with load → decide → save. Webhook
//! handlers here never fail: whatever goes wrong, the provider gets a
//! playable instruction list.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use callflow::{
    CallEvent, CallEventKind, CallFlow, CallSession, CallSessionRepository, CallStats, CallStatus,
    DeliveryTaskRepository, DomainError, EventPublisher, Instruction, OutboundCall,
    ProviderStatus, ScriptFlow, ScriptRepository, TelephonyProvider, Transition,
    DEFAULT_LANGUAGE, DEFAULT_VOICE,
};

use super::call_locks::CallLocks;
use super::delivery_queue::DeliveryQueue;

/// Stale writes are re-decided against fresh state this many times in total
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// A transition that was applied to a stored session
#[derive(Debug)]
pub struct Applied {
    pub session: CallSession,
    pub transition: Transition,
}

/// Request to place a scripted call
#[derive(Debug, Clone, Default)]
pub struct InitiateCall {
    pub phone_number: String,
    pub script_id: Option<Uuid>,
    pub flow: Option<ScriptFlow>,
    pub language: Option<String>,
    pub voice: Option<String>,
    pub recording_enabled: bool,
    pub status_callback_url: Option<String>,
}

/// Application service for call sessions
pub struct CallFlowService<S, R, Q>
where
    S: CallSessionRepository,
    R: ScriptRepository,
    Q: DeliveryTaskRepository,
{
    sessions: Arc<S>,
    scripts: Arc<R>,
    deliveries: Arc<DeliveryQueue<Q>>,
    telephony: Option<Arc<dyn TelephonyProvider>>,
    publisher: Arc<dyn EventPublisher>,
    flow: CallFlow,
    locks: CallLocks,
    admin_phone: Option<String>,
}

impl<S, R, Q> CallFlowService<S, R, Q>
where
    S: CallSessionRepository,
    R: ScriptRepository,
    Q: DeliveryTaskRepository,
{
    pub fn new(
        sessions: Arc<S>,
        scripts: Arc<R>,
        deliveries: Arc<DeliveryQueue<Q>>,
        flow: CallFlow,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            scripts,
            deliveries,
            telephony: None,
            publisher,
            flow,
            locks: CallLocks::new(),
            admin_phone: None,
        }
    }

    pub fn with_telephony(mut self, telephony: Option<Arc<dyn TelephonyProvider>>) -> Self {
        self.telephony = telephony;
        self
    }

    pub fn with_admin_phone(mut self, admin_phone: Option<String>) -> Self {
        self.admin_phone = admin_phone;
        self
    }

    /// Safe reply for webhooks that cannot be tied to a call
    pub fn goodbye(&self) -> Vec<Instruction> {
        self.flow.goodbye()
    }

    // --- Provider webhooks ---

    /// The provider asks what to do with an answered call
    pub async fn handle_answered(&self, call_id: &str) -> Vec<Instruction> {
        let result = self
            .apply(call_id, |flow, session, now| {
                Ok(flow.on_answered(session, now))
            })
            .await;

        match result {
            Ok(Some(applied)) => {
                self.publisher.publish(
                    "call.answered",
                    serde_json::json!({
                        "call_id": call_id,
                        "status": applied.session.status,
                        "step": applied.session.current_step,
                    }),
                );
                applied.transition.instructions
            }
            Ok(None) => {
                tracing::warn!("⚠️  Answer webhook for unknown call {}", call_id);
                self.flow.goodbye()
            }
            Err(e) => {
                tracing::error!("❌ Failed to handle answer for call {}: {}", call_id, e);
                self.flow.apology()
            }
        }
    }

    /// The provider delivers keypad input for a call
    pub async fn handle_digits(&self, call_id: &str, digits: Option<&str>) -> Vec<Instruction> {
        let result = self
            .apply(call_id, |flow, session, now| {
                flow.on_digits(session, digits, now)
            })
            .await;

        match result {
            Ok(Some(applied)) => {
                self.publisher.publish(
                    "call.digits",
                    serde_json::json!({
                        "call_id": call_id,
                        "digits": digits.unwrap_or_default(),
                        "status": applied.session.status,
                        "step": applied.session.current_step,
                    }),
                );
                applied.transition.instructions
            }
            Ok(None) => {
                tracing::warn!("⚠️  Digits for unknown call {}", call_id);
                self.flow.goodbye()
            }
            Err(e) => {
                tracing::error!("❌ Failed to handle digits for call {}: {}", call_id, e);
                self.flow.apology()
            }
        }
    }

    /// A finished recording is available
    pub async fn handle_recording(&self, call_id: &str, recording_url: &str) {
        let result = self
            .apply(call_id, |flow, session, now| {
                Ok(flow.on_recording_ready(session, recording_url, now))
            })
            .await;

        match result {
            Ok(Some(applied)) if applied.transition.changed => {
                tracing::info!("🎙️  Recording attached to call {}", call_id);
                self.publisher.publish(
                    "call.recording",
                    serde_json::json!({ "call_id": call_id, "recording_url": recording_url }),
                );
            }
            Ok(Some(_)) => {}
            Ok(None) => tracing::warn!("⚠️  Recording for unknown call {}", call_id),
            Err(e) => {
                tracing::error!("❌ Failed to attach recording to call {}: {}", call_id, e)
            }
        }
    }

    /// Generic provider event; carries a status when it has `uuid` and `status`
    pub async fn handle_provider_event(&self, event: &serde_json::Value) {
        self.publisher.publish("provider.event", event.clone());

        let (Some(call_id), Some(status)) = (
            event.get("uuid").and_then(|v| v.as_str()),
            event.get("status").and_then(|v| v.as_str()),
        ) else {
            return;
        };

        let status = ProviderStatus::from(status);
        let result = self
            .apply(call_id, |flow, session, now| {
                Ok(flow.on_provider_status(session, &status, now))
            })
            .await;

        match result {
            Ok(Some(applied)) => {
                if applied.transition.changed {
                    tracing::info!(
                        "📞 Call {} is now {} (provider: {})",
                        call_id,
                        applied.session.status,
                        status
                    );
                }
                self.publisher.publish(
                    "call.status",
                    serde_json::json!({
                        "call_id": call_id,
                        "provider_status": status.to_string(),
                        "status": applied.session.status,
                    }),
                );
            }
            Ok(None) => tracing::debug!("Provider event for unknown call {}", call_id),
            Err(e) => tracing::error!("❌ Failed to apply provider status to {}: {}", call_id, e),
        }
    }

    // --- Operator actions ---

    /// Place a new scripted call
    pub async fn initiate_call(&self, request: InitiateCall) -> Result<CallSession, DomainError> {
        let phone_number = request.phone_number.trim().to_string();
        if phone_number.is_empty() {
            return Err(DomainError::Validation("phone number is required".to_string()));
        }

        let (flow, script_id, language, voice) = match (request.script_id, request.flow) {
            (Some(id), None) => {
                let script = self
                    .scripts
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Script", id))?;
                (
                    script.flow,
                    Some(script.id),
                    request.language.unwrap_or(script.language),
                    request.voice.unwrap_or(script.voice),
                )
            }
            (None, Some(flow)) => {
                flow.validate()?;
                (
                    flow,
                    None,
                    request
                        .language
                        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                    request.voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
                )
            }
            _ => {
                return Err(DomainError::Validation(
                    "exactly one of script_id or flow is required".to_string(),
                ))
            }
        };

        let telephony = self.telephony()?;
        let call_id = telephony
            .create_call(&OutboundCall::new(&phone_number, self.flow.urls()))
            .await?;

        let mut session = CallSession::new(call_id, phone_number, flow, language, voice)
            .with_recording(request.recording_enabled)
            .with_status_callback(request.status_callback_url);
        session.script_id = script_id;

        let event = CallEvent::new(
            &session.call_id,
            CallEventKind::Initiated,
            serde_json::json!({ "phone_number": session.phone_number, "script_id": script_id }),
            session.created_at,
        );
        let saved = self.sessions.insert(&session, &[event]).await?;

        tracing::info!("📞 Initiated call {} to {}", saved.call_id, saved.phone_number);
        self.publisher.publish(
            "call.initiated",
            serde_json::json!({ "call_id": saved.call_id, "phone_number": saved.phone_number }),
        );
        Ok(saved)
    }

    /// Transfer a live call to the operator phone
    pub async fn escalate(&self, call_id: &str) -> Result<CallSession, DomainError> {
        let transfer_to = self.admin_phone.clone().ok_or_else(|| {
            DomainError::Validation("no operator phone configured (ADMIN_PHONE)".to_string())
        })?;
        let telephony = self.telephony()?;

        let session = self
            .operator_action(
                call_id,
                |flow, session, now| flow.escalate(session, &transfer_to, now),
                |instructions| async move { telephony.transfer(call_id, &instructions).await },
            )
            .await?;

        tracing::info!("🆘 Call {} escalated to {}", call_id, transfer_to);
        self.publisher.publish(
            "call.escalated",
            serde_json::json!({ "call_id": call_id, "to": transfer_to }),
        );
        Ok(session)
    }

    /// End a live call
    pub async fn hang_up(&self, call_id: &str) -> Result<CallSession, DomainError> {
        let telephony = self.telephony()?;

        let session = self
            .operator_action(
                call_id,
                |flow, session, now| flow.hang_up(session, now),
                |_| async move { telephony.hang_up(call_id).await },
            )
            .await?;

        tracing::info!("📴 Call {} hung up by operator", call_id);
        self.publisher
            .publish("call.hung_up", serde_json::json!({ "call_id": call_id }));
        Ok(session)
    }

    /// Start recording a live call
    pub async fn start_recording(&self, call_id: &str) -> Result<CallSession, DomainError> {
        let telephony = self.telephony()?;

        let session = self
            .operator_action(
                call_id,
                |flow, session, now| flow.start_recording(session, now),
                |_| async move { telephony.start_recording(call_id).await },
            )
            .await?;

        tracing::info!("🎙️  Recording started for call {}", call_id);
        Ok(session)
    }

    // --- Queries ---

    pub async fn get_call(&self, call_id: &str) -> Result<(CallSession, Vec<CallEvent>), DomainError> {
        let session = self
            .sessions
            .find_by_call_id(call_id)
            .await?
            .ok_or_else(|| DomainError::not_found_str("CallSession", call_id))?;
        let events = self.sessions.find_events(call_id).await?;
        Ok((session, events))
    }

    pub async fn list_calls(
        &self,
        status: Option<CallStatus>,
        limit: i64,
    ) -> Result<Vec<CallSession>, DomainError> {
        self.sessions.find_recent(status, limit.clamp(1, 500)).await
    }

    pub async fn stats(&self) -> Result<CallStats, DomainError> {
        self.sessions.stats().await
    }

    // --- Internals ---

    fn telephony(&self) -> Result<Arc<dyn TelephonyProvider>, DomainError> {
        self.telephony.clone().ok_or_else(|| {
            DomainError::ExternalService("telephony provider not configured".to_string())
        })
    }

    /// Serialize on the call, then load → decide → save
    async fn apply<F>(&self, call_id: &str, decide: F) -> Result<Option<Applied>, DomainError>
    where
        F: Fn(&CallFlow, &mut CallSession, DateTime<Utc>) -> Result<Transition, DomainError>,
    {
        let _guard = self.locks.lock(call_id).await;
        self.apply_locked(call_id, &decide).await
    }

    /// Load → decide → save; caller holds the call's lock
    async fn apply_locked<F>(
        &self,
        call_id: &str,
        decide: &F,
    ) -> Result<Option<Applied>, DomainError>
    where
        F: Fn(&CallFlow, &mut CallSession, DateTime<Utc>) -> Result<Transition, DomainError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let Some(mut session) = self.sessions.find_by_call_id(call_id).await? else {
                return Ok(None);
            };
            let previous = session.status;
            let transition = decide(&self.flow, &mut session, Utc::now())?;

            if !transition.changed {
                self.sessions.append_events(&transition.events).await?;
                return Ok(Some(Applied {
                    session,
                    transition,
                }));
            }

            match self.sessions.update(&session, &transition.events).await {
                Ok(saved) => {
                    if saved.status != previous {
                        self.notify_status(&saved).await;
                    }
                    return Ok(Some(Applied {
                        session: saved,
                        transition,
                    }));
                }
                Err(e) if e.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(
                        "🔁 Stale write on call {} (attempt {}), re-deciding",
                        call_id,
                        attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Validate against current state, ask the provider, then persist
    ///
    /// A provider failure leaves the session untouched.
    async fn operator_action<F, A, Fut>(
        &self,
        call_id: &str,
        decide: F,
        provider: A,
    ) -> Result<CallSession, DomainError>
    where
        F: Fn(&CallFlow, &mut CallSession, DateTime<Utc>) -> Result<Transition, DomainError>,
        A: FnOnce(Vec<Instruction>) -> Fut,
        Fut: std::future::Future<Output = Result<(), DomainError>>,
    {
        let _guard = self.locks.lock(call_id).await;

        let mut preview = self
            .sessions
            .find_by_call_id(call_id)
            .await?
            .ok_or_else(|| DomainError::not_found_str("CallSession", call_id))?;
        let planned = decide(&self.flow, &mut preview, Utc::now())?;

        provider(planned.instructions).await?;

        self.apply_locked(call_id, &decide)
            .await?
            .map(|applied| applied.session)
            .ok_or_else(|| DomainError::not_found_str("CallSession", call_id))
    }

    /// Queue a lifecycle notification for sessions that asked for one
    async fn notify_status(&self, session: &CallSession) {
        let notable = session.is_terminal() || session.status == CallStatus::Escalated;
        let Some(url) = session.status_callback_url.clone() else {
            return;
        };
        if !notable {
            return;
        }

        let kind = format!("call.{}", session.status);
        if let Err(e) = self
            .deliveries
            .enqueue(kind, session.notification_payload(), url, None)
            .await
        {
            tracing::error!(
                "❌ Failed to queue status notification for call {}: {}",
                session.call_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{
        FakeTelephony, InMemoryDeliveries, InMemoryScripts, InMemorySessions, RecordingPublisher,
    };
    use callflow::{FlowSettings, ScriptStep, ValidationRule, WebhookUrls};

    type TestService = CallFlowService<InMemorySessions, InMemoryScripts, InMemoryDeliveries>;

    struct Harness {
        service: TestService,
        sessions: Arc<InMemorySessions>,
        deliveries: Arc<InMemoryDeliveries>,
        telephony: Arc<FakeTelephony>,
        publisher: Arc<RecordingPublisher>,
    }

    fn harness_with(telephony: FakeTelephony) -> Harness {
        let sessions = Arc::new(InMemorySessions::default());
        let deliveries = Arc::new(InMemoryDeliveries::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let telephony = Arc::new(telephony);
        let queue = Arc::new(DeliveryQueue::new(deliveries.clone(), publisher.clone(), 3));

        let service = CallFlowService::new(
            sessions.clone(),
            Arc::new(InMemoryScripts::default()),
            queue,
            CallFlow::new(
                FlowSettings::default(),
                WebhookUrls::new("https://calls.example.com"),
            ),
            publisher.clone(),
        )
        .with_telephony(Some(telephony.clone() as Arc<dyn TelephonyProvider>))
        .with_admin_phone(Some("15550199".to_string()));

        Harness {
            service,
            sessions,
            deliveries,
            telephony,
            publisher,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeTelephony::default())
    }

    fn two_step_flow() -> ScriptFlow {
        ScriptFlow::new(
            vec![
                ScriptStep::new("Enter your six digit code.", 6, 30)
                    .with_validation(ValidationRule::ExactLength { length: 6 }),
                ScriptStep::new("Press 1 to confirm.", 1, 10)
                    .with_validation(ValidationRule::ExactLength { length: 1 }),
            ],
            "Confirmed. Goodbye.",
        )
    }

    async fn place_call(h: &Harness, callback: Option<&str>) -> String {
        h.service
            .initiate_call(InitiateCall {
                phone_number: "15550111".to_string(),
                flow: Some(two_step_flow()),
                status_callback_url: callback.map(String::from),
                ..InitiateCall::default()
            })
            .await
            .unwrap()
            .call_id
    }

    fn spoken(instructions: &[Instruction]) -> Vec<&str> {
        instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Speak { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_call_persists_and_notifies() {
        let h = harness();
        let call_id = place_call(&h, Some("https://hooks.example.com/calls")).await;
        assert_eq!(h.sessions.get(&call_id).unwrap().status, CallStatus::Ringing);

        let answered = h.service.handle_answered(&call_id).await;
        assert_eq!(spoken(&answered), vec!["Enter your six digit code."]);

        h.service.handle_digits(&call_id, Some("123456")).await;
        let last = h.service.handle_digits(&call_id, Some("1")).await;
        assert_eq!(spoken(&last), vec!["Confirmed. Goodbye."]);

        let stored = h.sessions.get(&call_id).unwrap();
        assert_eq!(stored.status, CallStatus::Completed);
        assert_eq!(stored.version, 3);

        let kinds: Vec<CallEventKind> = h
            .sessions
            .events_for(&call_id)
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                CallEventKind::Initiated,
                CallEventKind::Answered,
                CallEventKind::DigitsAccepted,
                CallEventKind::DigitsAccepted,
                CallEventKind::Completed,
            ]
        );

        let notifications = h.deliveries.all();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "call.completed");
        assert_eq!(notifications[0].payload["collected"][1]["digits"], "1");
    }

    #[tokio::test]
    async fn test_no_notification_without_callback() {
        let h = harness();
        let call_id = place_call(&h, None).await;
        h.service.handle_answered(&call_id).await;
        h.service.handle_digits(&call_id, None).await;

        assert_eq!(h.sessions.get(&call_id).unwrap().status, CallStatus::Completed);
        assert!(h.deliveries.all().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_call_gets_safe_goodbye() {
        let h = harness();
        let digits = h.service.handle_digits("nope", Some("1")).await;
        assert_eq!(spoken(&digits), vec!["Thank you for calling. Goodbye."]);
        assert!(!digits.iter().any(Instruction::is_input_request));

        let answered = h.service.handle_answered("nope").await;
        assert_eq!(spoken(&answered), vec!["Thank you for calling. Goodbye."]);
    }

    #[tokio::test]
    async fn test_stale_write_is_redecided() {
        let h = harness();
        let call_id = place_call(&h, None).await;
        *h.sessions.conflicts.lock().unwrap() = 2;

        let answered = h.service.handle_answered(&call_id).await;
        assert_eq!(spoken(&answered), vec!["Enter your six digit code."]);
        assert_eq!(h.sessions.get(&call_id).unwrap().status, CallStatus::InProgress);
    }

    #[tokio::test]
    async fn test_persistent_conflict_apologizes() {
        let h = harness();
        let call_id = place_call(&h, None).await;
        *h.sessions.conflicts.lock().unwrap() = 3;

        let answered = h.service.handle_answered(&call_id).await;
        assert_eq!(
            spoken(&answered),
            vec!["We're sorry, something went wrong. Goodbye."]
        );
        assert_eq!(h.sessions.get(&call_id).unwrap().status, CallStatus::Ringing);
    }

    #[tokio::test]
    async fn test_concurrent_digits_are_serialized() {
        let h = Arc::new(harness());
        let call_id = place_call(&h, None).await;
        h.service.handle_answered(&call_id).await;

        let a = {
            let h = h.clone();
            let call_id = call_id.clone();
            tokio::spawn(async move { h.service.handle_digits(&call_id, Some("123456")).await })
        };
        let b = {
            let h = h.clone();
            let call_id = call_id.clone();
            tokio::spawn(async move { h.service.handle_digits(&call_id, Some("654321")).await })
        };
        a.await.unwrap();
        b.await.unwrap();

        // Whichever entry lands second is checked against step two and rejected
        let stored = h.sessions.get(&call_id).unwrap();
        assert_eq!(stored.current_step, 1);
        assert_eq!(stored.collected.len(), 1);
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn test_provider_event_fails_busy_call() {
        let h = harness();
        let call_id = place_call(&h, Some("https://hooks.example.com/calls")).await;

        h.service
            .handle_provider_event(&serde_json::json!({ "uuid": call_id, "status": "busy" }))
            .await;
        h.service
            .handle_provider_event(&serde_json::json!({ "uuid": call_id, "status": "completed" }))
            .await;
        h.service
            .handle_provider_event(&serde_json::json!({ "type": "heartbeat" }))
            .await;

        assert_eq!(h.sessions.get(&call_id).unwrap().status, CallStatus::Failed);
        assert_eq!(h.deliveries.all()[0].kind, "call.failed");
        assert_eq!(
            h.publisher
                .kinds()
                .iter()
                .filter(|k| *k == "provider.event")
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn test_recording_attached_once() {
        let h = harness();
        let call_id = place_call(&h, None).await;
        let url = "https://api.example.com/v1/files/rec-1";

        h.service.handle_recording(&call_id, url).await;
        h.service.handle_recording(&call_id, url).await;

        let stored = h.sessions.get(&call_id).unwrap();
        assert_eq!(stored.recording_url.as_deref(), Some(url));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_escalate_transfers_then_marks() {
        let h = harness();
        let call_id = place_call(&h, Some("https://hooks.example.com/calls")).await;
        h.service.handle_answered(&call_id).await;

        let session = h.service.escalate(&call_id).await.unwrap();
        assert_eq!(session.status, CallStatus::Escalated);
        assert!(h
            .telephony
            .actions()
            .contains(&format!("transfer {} 15550199", call_id)));
        assert_eq!(h.deliveries.all()[0].kind, "call.escalated");

        let answered = h.service.handle_answered(&call_id).await;
        assert_eq!(spoken(&answered), vec!["Thank you for calling. Goodbye."]);
    }

    #[tokio::test]
    async fn test_operator_action_on_terminal_call_conflicts() {
        let h = harness();
        let call_id = place_call(&h, None).await;
        h.service.hang_up(&call_id).await.unwrap();

        let err = h.service.hang_up(&call_id).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(h.service.escalate(&call_id).await.is_err());
        assert_eq!(
            h.telephony
                .actions()
                .iter()
                .filter(|a| a.starts_with("hangup"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_session_unchanged() {
        let h = harness();
        let call_id = place_call(&h, None).await;
        let failing = harness_with(FakeTelephony::failing());
        failing
            .sessions
            .insert(&h.sessions.get(&call_id).unwrap(), &[])
            .await
            .unwrap();

        let err = failing.service.hang_up(&call_id).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(_)));
        assert_eq!(
            failing.sessions.get(&call_id).unwrap().status,
            CallStatus::Ringing
        );
    }

    #[tokio::test]
    async fn test_initiate_requires_script_or_flow() {
        let h = harness();
        let err = h
            .service
            .initiate_call(InitiateCall {
                phone_number: "15550111".to_string(),
                ..InitiateCall::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = h
            .service
            .initiate_call(InitiateCall {
                phone_number: "15550111".to_string(),
                script_id: Some(Uuid::new_v4()),
                ..InitiateCall::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(h.telephony.actions().is_empty());
    }

    #[tokio::test]
    async fn test_stats_count_outcomes() {
        let h = harness();
        let done = place_call(&h, None).await;
        let _ringing = place_call(&h, None).await;
        h.service.handle_answered(&done).await;
        h.service.handle_digits(&done, None).await;

        let stats = h.service.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 1);
    }
}
