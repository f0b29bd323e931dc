//! In-memory port implementations for application tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use callflow::{
    CallEvent, CallSession, CallSessionRepository, CallStats, CallStatus, DeliveryOutcome,
    DeliveryStatus, DeliveryTask, DeliveryTaskRepository, DeliveryTransport, DomainError,
    EventPublisher, Instruction, OutboundCall, Script, ScriptRepository, TelephonyProvider,
};

#[derive(Default)]
pub struct InMemorySessions {
    sessions: Mutex<HashMap<String, CallSession>>,
    events: Mutex<Vec<CallEvent>>,
    /// Number of upcoming updates to fail with a version conflict
    pub conflicts: Mutex<u32>,
}

impl InMemorySessions {
    pub fn get(&self, call_id: &str) -> Option<CallSession> {
        self.sessions.lock().unwrap().get(call_id).cloned()
    }

    pub fn events_for(&self, call_id: &str) -> Vec<CallEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.call_id == call_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CallSessionRepository for InMemorySessions {
    async fn find_by_call_id(&self, call_id: &str) -> Result<Option<CallSession>, DomainError> {
        Ok(self.get(call_id))
    }

    async fn insert(
        &self,
        session: &CallSession,
        events: &[CallEvent],
    ) -> Result<CallSession, DomainError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.call_id) {
            return Err(DomainError::Conflict(format!(
                "call {} already exists",
                session.call_id
            )));
        }
        sessions.insert(session.call_id.clone(), session.clone());
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(session.clone())
    }

    async fn update(
        &self,
        session: &CallSession,
        events: &[CallEvent],
    ) -> Result<CallSession, DomainError> {
        {
            let mut conflicts = self.conflicts.lock().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(DomainError::stale_session(&session.call_id, session.version));
            }
        }

        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions
            .get_mut(&session.call_id)
            .ok_or_else(|| DomainError::not_found_str("CallSession", &session.call_id))?;
        if stored.version != session.version {
            return Err(DomainError::stale_session(&session.call_id, session.version));
        }

        let mut saved = session.clone();
        saved.version += 1;
        *stored = saved.clone();
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(saved)
    }

    async fn append_events(&self, events: &[CallEvent]) -> Result<(), DomainError> {
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }

    async fn find_recent(
        &self,
        status: Option<CallStatus>,
        limit: i64,
    ) -> Result<Vec<CallSession>, DomainError> {
        let mut sessions: Vec<CallSession> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit as usize);
        Ok(sessions)
    }

    async fn find_events(&self, call_id: &str) -> Result<Vec<CallEvent>, DomainError> {
        Ok(self.events_for(call_id))
    }

    async fn stats(&self) -> Result<CallStats, DomainError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(CallStats::from_counts(
            sessions.values().map(|s| (s.status, 1)),
        ))
    }
}

#[derive(Default)]
pub struct InMemoryScripts {
    scripts: Mutex<HashMap<Uuid, Script>>,
}

#[async_trait]
impl ScriptRepository for InMemoryScripts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Script>, DomainError> {
        Ok(self.scripts.lock().unwrap().get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Script>, DomainError> {
        Ok(self.scripts.lock().unwrap().values().cloned().collect())
    }

    async fn save(&self, script: &Script) -> Result<Script, DomainError> {
        self.scripts
            .lock()
            .unwrap()
            .insert(script.id, script.clone());
        Ok(script.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.scripts.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryDeliveries {
    tasks: Mutex<HashMap<Uuid, DeliveryTask>>,
}

impl InMemoryDeliveries {
    pub fn all(&self) -> Vec<DeliveryTask> {
        self.tasks.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl DeliveryTaskRepository for InMemoryDeliveries {
    async fn insert(&self, task: &DeliveryTask) -> Result<DeliveryTask, DomainError> {
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn update(&self, task: &DeliveryTask) -> Result<DeliveryTask, DomainError> {
        let mut tasks = self.tasks.lock().unwrap();
        let stored = tasks
            .get_mut(&task.id)
            .ok_or_else(|| DomainError::not_found("DeliveryTask", task.id))?;
        *stored = task.clone();
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryTask>, DomainError> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn find_recent(
        &self,
        status: Option<DeliveryStatus>,
        limit: i64,
    ) -> Result<Vec<DeliveryTask>, DomainError> {
        let mut tasks: Vec<DeliveryTask> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| status.map_or(true, |st| t.status == st))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(limit as usize);
        Ok(tasks)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<DeliveryTask>, DomainError> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut due: Vec<&mut DeliveryTask> =
            tasks.values_mut().filter(|t| t.is_due(now)).collect();
        due.sort_by_key(|t| t.next_attempt_at);

        Ok(due
            .into_iter()
            .take(limit as usize)
            .map(|t| {
                t.claim(now, lease);
                t.clone()
            })
            .collect())
    }
}

/// Telephony fake recording every request
#[derive(Default)]
pub struct FakeTelephony {
    pub actions: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeTelephony {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::ExternalService("provider unavailable".to_string()));
        }
        self.actions.lock().unwrap().push(action);
        Ok(())
    }
}

#[async_trait]
impl TelephonyProvider for FakeTelephony {
    async fn create_call(&self, call: &OutboundCall) -> Result<String, DomainError> {
        self.record(format!("create {}", call.to))?;
        Ok(format!("call-{}", self.actions.lock().unwrap().len()))
    }

    async fn hang_up(&self, call_id: &str) -> Result<(), DomainError> {
        self.record(format!("hangup {}", call_id))
    }

    async fn transfer(
        &self,
        call_id: &str,
        instructions: &[Instruction],
    ) -> Result<(), DomainError> {
        let target = instructions
            .iter()
            .find_map(|i| match i {
                Instruction::Transfer { number } => Some(number.as_str()),
                _ => None,
            })
            .unwrap_or("?");
        self.record(format!("transfer {} {}", call_id, target))
    }

    async fn start_recording(&self, call_id: &str) -> Result<(), DomainError> {
        self.record(format!("record {}", call_id))
    }
}

/// Publisher keeping every event
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingPublisher {
    pub fn kinds(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, kind: &str, payload: serde_json::Value) {
        self.events.lock().unwrap().push((kind.to_string(), payload));
    }
}

/// Transport answering every attempt with the same outcome
pub struct StaticTransport {
    pub outcome: DeliveryOutcome,
    pub attempts: Mutex<u32>,
}

impl StaticTransport {
    pub fn new(outcome: DeliveryOutcome) -> Self {
        Self {
            outcome,
            attempts: Mutex::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl DeliveryTransport for StaticTransport {
    async fn deliver(&self, _task: &DeliveryTask) -> DeliveryOutcome {
        *self.attempts.lock().unwrap() += 1;
        self.outcome.clone()
    }
}

/// Transport whose endpoint never answers
pub struct HangingTransport;

#[async_trait]
impl DeliveryTransport for HangingTransport {
    async fn deliver(&self, _task: &DeliveryTask) -> DeliveryOutcome {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        DeliveryOutcome::Delivered { status_code: 200 }
    }
}
