// libs/lead-cell/src/services/notes.rs
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CallNotes, LeadError, NoteSection};

/// Drafts are persisted this often while a notes view stays open.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

pub struct CallNotesService {
    supabase: Arc<SupabaseClient>,
}

impl CallNotesService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Notes for a booking, if any were taken yet.
    pub async fn get_notes(
        &self,
        call_booking_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<CallNotes>, LeadError> {
        let path = format!(
            "/rest/v1/call_booking_notes?call_booking_id=eq.{}",
            call_booking_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| LeadError::DatabaseError(format!("Failed to parse notes: {}", e))),
            None => Ok(None),
        }
    }

    /// Persist notes, inserting on first save and updating afterwards.
    pub async fn save_notes(
        &self,
        notes: &CallNotes,
        auth_token: &str,
    ) -> Result<CallNotes, LeadError> {
        let notes_data = json!({
            "call_booking_id": notes.call_booking_id,
            "call_summary": notes.call_summary,
            "follow_up_actions": notes.follow_up_actions,
            "call_outcome": notes.call_outcome,
            "callback_date": notes.callback_date,
            "internal_notes": notes.internal_notes,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = if let Some(id) = notes.id {
            self.supabase
                .request_with_headers(
                    Method::PATCH,
                    &format!("/rest/v1/call_booking_notes?id=eq.{}", id),
                    Some(auth_token),
                    Some(notes_data),
                    Some(headers),
                )
                .await
        } else {
            self.supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/call_booking_notes",
                    Some(auth_token),
                    Some(notes_data),
                    Some(headers),
                )
                .await
        }
        .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| LeadError::DatabaseError("Save returned no row".to_string()))?;

        let saved: CallNotes = serde_json::from_value(row)
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse notes: {}", e)))?;

        debug!("Notes saved for booking {}", saved.call_booking_id);
        Ok(saved)
    }
}

/// Which sections of the contact sheet apply to a client, derived from the
/// services their quote request declares. The record itself stays flat; only
/// visibility changes.
pub fn visible_sections(services: &[String]) -> Vec<NoteSection> {
    let lowered: Vec<String> = services.iter().map(|s| s.to_lowercase()).collect();
    let has = |keywords: &[&str]| {
        lowered
            .iter()
            .any(|s| keywords.iter().any(|k| s.contains(k)))
    };

    let mut sections = vec![
        NoteSection::GeneralQuestions,
        NoteSection::CallInfo,
        NoteSection::Business,
    ];

    if has(&["site", "web", "website", "webapp"]) {
        sections.push(NoteSection::Website);
    }
    if has(&["mobile"]) || (has(&["app"]) && !has(&["webapp"])) {
        sections.push(NoteSection::MobileApp);
    }
    if has(&["automation", "automatisation"]) {
        sections.push(NoteSection::Automation);
    }
    if has(&["ecommerce", "e-commerce", "boutique", "shop"]) {
        sections.push(NoteSection::Ecommerce);
    }
    if has(&["logo", "branding", "site", "web"]) {
        sections.push(NoteSection::VisualIdentity);
    }

    sections.push(NoteSection::ProjectManagement);
    sections.push(NoteSection::Estimation);
    sections
}

/// Periodic draft persistence scoped to an open notes view.
///
/// The task is owned: it starts when the view opens and is aborted when the
/// view closes or the handle is dropped, so it can never outlive its view
/// and write after teardown.
pub struct NotesAutosave {
    handle: JoinHandle<()>,
}

impl NotesAutosave {
    pub fn spawn(
        service: Arc<CallNotesService>,
        auth_token: String,
        draft: watch::Receiver<CallNotes>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so an untouched
            // draft is not written straight away.
            ticker.tick().await;

            // The first successful save assigns the record id; later ticks
            // must reuse it or every autosave would insert a new row.
            let mut record_id = None;
            let mut last_saved: Option<CallNotes> = None;
            loop {
                ticker.tick().await;

                let mut current = draft.borrow().clone();
                if current.id.is_none() {
                    current.id = record_id;
                }
                if current.is_empty() || last_saved.as_ref() == Some(&current) {
                    continue;
                }

                match service.save_notes(&current, &auth_token).await {
                    Ok(saved) => {
                        debug!("Autosaved notes for booking {}", saved.call_booking_id);
                        record_id = saved.id;
                        current.id = record_id;
                        last_saved = Some(current);
                    }
                    Err(e) => warn!("Notes autosave failed: {}", e),
                }
            }
        });

        Self { handle }
    }

    /// Cancel the task on view close.
    pub fn stop(self) {
        info!("Stopping notes autosave task");
        self.handle.abort();
    }
}

impl Drop for NotesAutosave {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Open note drafts, one per booking, each with its own autosave task.
///
/// A draft session starts on the first draft write for a booking and ends
/// when the view closes; closing cancels the task before dropping the draft.
#[derive(Default)]
pub struct DraftSessions {
    sessions: std::sync::Mutex<std::collections::HashMap<Uuid, DraftSession>>,
}

struct DraftSession {
    sender: watch::Sender<CallNotes>,
    autosave: NotesAutosave,
}

impl DraftSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest draft for a booking, starting the autosave task if
    /// this is the first write since the view opened.
    pub fn update(&self, service: Arc<CallNotesService>, auth_token: &str, notes: CallNotes) {
        let mut sessions = self.sessions.lock().unwrap();

        match sessions.get(&notes.call_booking_id) {
            Some(session) => {
                let _ = session.sender.send(notes);
            }
            None => {
                let booking_id = notes.call_booking_id;
                let (sender, receiver) = watch::channel(notes);
                let autosave = NotesAutosave::spawn(
                    service,
                    auth_token.to_string(),
                    receiver,
                    AUTOSAVE_INTERVAL,
                );
                sessions.insert(booking_id, DraftSession { sender, autosave });
                debug!("Opened draft session for booking {}", booking_id);
            }
        }
    }

    /// Close the view for a booking: cancel its autosave task and drop the
    /// draft. Returns whether a session was open.
    pub fn close(&self, call_booking_id: Uuid) -> bool {
        let session = self.sessions.lock().unwrap().remove(&call_booking_id);
        match session {
            Some(session) => {
                session.autosave.stop();
                debug!("Closed draft session for booking {}", call_booking_id);
                true
            }
            None => false,
        }
    }

    pub fn open_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_sections_always_visible() {
        let sections = visible_sections(&services(&["logo"]));
        assert!(sections.contains(&NoteSection::GeneralQuestions));
        assert!(sections.contains(&NoteSection::CallInfo));
        assert!(sections.contains(&NoteSection::Business));
        assert!(sections.contains(&NoteSection::ProjectManagement));
        assert!(sections.contains(&NoteSection::Estimation));
    }

    #[test]
    fn test_website_service_reveals_website_and_identity() {
        let sections = visible_sections(&services(&["website"]));
        assert!(sections.contains(&NoteSection::Website));
        assert!(sections.contains(&NoteSection::VisualIdentity));
        assert!(!sections.contains(&NoteSection::MobileApp));
        assert!(!sections.contains(&NoteSection::Ecommerce));
    }

    #[test]
    fn test_mobile_service_does_not_imply_website() {
        let sections = visible_sections(&services(&["mobile"]));
        assert!(sections.contains(&NoteSection::MobileApp));
        assert!(!sections.contains(&NoteSection::Website));
    }

    #[test]
    fn test_webapp_counts_as_web_not_mobile() {
        let sections = visible_sections(&services(&["webapp"]));
        assert!(sections.contains(&NoteSection::Website));
        assert!(!sections.contains(&NoteSection::MobileApp));
    }

    #[test]
    fn test_no_services_yields_base_sections_only() {
        let sections = visible_sections(&[]);
        assert_eq!(
            sections,
            vec![
                NoteSection::GeneralQuestions,
                NoteSection::CallInfo,
                NoteSection::Business,
                NoteSection::ProjectManagement,
                NoteSection::Estimation,
            ]
        );
    }

    #[test]
    fn test_automation_keyword_matches_french_spelling() {
        let sections = visible_sections(&services(&["Automatisation de processus"]));
        assert!(sections.contains(&NoteSection::Automation));
    }
}
