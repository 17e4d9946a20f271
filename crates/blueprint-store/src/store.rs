use crate::types::*;
use blueprint_common::{Blueprint, BlueprintError, ComponentRef, GeneratedFiles, PageId, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Entry produced by [`PageStore::list_pages`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub id: PageId,
    /// Name of the page's current blueprint, if one is loaded.
    pub name: Option<String>,
}

/// The document a request was issued against, tagged with the page revision.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub blueprint: Option<Blueprint>,
    pub revision: u64,
}

/// Handed out when a generation request starts; required to commit its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    seq: u64,
}

#[derive(Debug, Default)]
struct PageSlot {
    state: PageState,
    generations_issued: u64,
    generations_committed: u64,
    // Tickets at or below this were issued before the last baseline reset.
    generation_floor: u64,
}

/// Registry of page slots, fixed at construction.
///
/// Each page sits behind its own lock, held only for the state transition
/// itself. Nothing here is shared between pages.
pub struct PageStore {
    order: Vec<PageId>,
    pages: HashMap<PageId, Mutex<PageSlot>>,
}

impl PageStore {
    pub fn new<I, S>(page_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<PageId>,
    {
        let mut order = Vec::new();
        let mut pages = HashMap::new();

        for id in page_ids {
            let id: PageId = id.into();
            let id = id.trim().to_string();
            if id.is_empty() {
                return Err(BlueprintError::Config("page identifier must not be empty".to_string()));
            }
            if pages.contains_key(&id) {
                return Err(BlueprintError::Config(format!("duplicate page identifier '{}'", id)));
            }
            pages.insert(id.clone(), Mutex::new(PageSlot::default()));
            order.push(id);
        }

        if order.is_empty() {
            return Err(BlueprintError::Config("at least one page is required".to_string()));
        }

        info!("Page store ready with {} page(s): {}", order.len(), order.join(", "));
        Ok(Self { order, pages })
    }

    /// Page identifiers in registration order.
    pub fn page_ids(&self) -> &[PageId] {
        &self.order
    }

    fn lock(&self, page: &str) -> Result<MutexGuard<'_, PageSlot>> {
        let slot = self
            .pages
            .get(page)
            .ok_or_else(|| BlueprintError::UnknownPage(page.to_string()))?;
        // A panic elsewhere never leaves a half-written record: every write is a
        // single assignment, so the inner value is still consistent.
        Ok(slot.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Copy of the page's record.
    pub fn get(&self, page: &str) -> Result<PageState> {
        Ok(self.lock(page)?.state.clone())
    }

    /// Run `f` against the page's record while holding its lock.
    pub fn read<R>(&self, page: &str, f: impl FnOnce(&PageState) -> R) -> Result<R> {
        let slot = self.lock(page)?;
        Ok(f(&slot.state))
    }

    pub fn snapshot(&self, page: &str) -> Result<Snapshot> {
        let slot = self.lock(page)?;
        Ok(Snapshot {
            blueprint: slot.state.blueprint.clone(),
            revision: slot.state.revision,
        })
    }

    /// Replace the blueprint without touching history. Returns the new revision.
    pub fn set_blueprint(&self, page: &str, blueprint: Blueprint) -> Result<u64> {
        blueprint.validate()?;
        let mut slot = self.lock(page)?;
        slot.state.replace_blueprint(blueprint);
        debug!("Blueprint set on '{}' (revision {})", page, slot.state.revision);
        Ok(slot.state.revision)
    }

    /// Push the current blueprint onto history and install `patched`, but only
    /// if the page is still at `expected_revision`. Returns the history length.
    pub fn commit_edit(&self, page: &str, expected_revision: u64, patched: Blueprint) -> Result<usize> {
        patched.validate()?;
        let mut slot = self.lock(page)?;
        let state = &mut slot.state;

        if state.revision != expected_revision {
            warn!(
                "Discarding stale edit for '{}': issued at revision {}, page is at {}",
                page, expected_revision, state.revision
            );
            return Err(BlueprintError::Superseded { page: page.to_string() });
        }

        let previous = state
            .blueprint
            .take()
            .ok_or_else(|| BlueprintError::NoActiveDocument(page.to_string()))?;
        state.history.push(previous);
        state.replace_blueprint(patched);

        info!("Committed edit on '{}' (revision {}, history {})", page, state.revision, state.history.len());
        Ok(state.history.len())
    }

    /// Install a freshly uploaded blueprint as the page's new baseline.
    ///
    /// History, generated files and UI state are cleared; in-flight generation
    /// requests issued before this call can no longer commit.
    pub fn reset_baseline(&self, page: &str, expected_revision: u64, blueprint: Blueprint) -> Result<u64> {
        blueprint.validate()?;
        let mut slot = self.lock(page)?;

        if slot.state.revision != expected_revision {
            warn!(
                "Discarding stale upload for '{}': issued at revision {}, page is at {}",
                page, expected_revision, slot.state.revision
            );
            return Err(BlueprintError::Superseded { page: page.to_string() });
        }

        slot.generation_floor = slot.generations_issued;
        let state = &mut slot.state;
        state.history.clear();
        state.generated = None;
        state.ui_state = UiState::default();
        state.replace_blueprint(blueprint);

        info!("New baseline on '{}' (revision {})", page, state.revision);
        Ok(state.revision)
    }

    /// Restore the most recent history entry. Returns the restored blueprint.
    pub fn undo(&self, page: &str) -> Result<Blueprint> {
        let mut slot = self.lock(page)?;
        let state = &mut slot.state;

        let previous = state
            .history
            .pop()
            .ok_or_else(|| BlueprintError::NothingToUndo(page.to_string()))?;
        state.replace_blueprint(previous.clone());

        info!("Undo on '{}' (revision {}, history {})", page, state.revision, state.history.len());
        Ok(previous)
    }

    pub fn begin_generation(&self, page: &str) -> Result<GenerationTicket> {
        let mut slot = self.lock(page)?;
        slot.generations_issued += 1;
        Ok(GenerationTicket {
            seq: slot.generations_issued,
        })
    }

    /// Store a generation result, replacing any previous artifact wholesale.
    ///
    /// Fails with `Superseded` when a newer generation already committed or the
    /// page was re-uploaded after the ticket was issued.
    pub fn commit_generation(&self, page: &str, ticket: GenerationTicket, files: GeneratedFiles) -> Result<()> {
        let mut slot = self.lock(page)?;

        if ticket.seq <= slot.generations_committed || ticket.seq <= slot.generation_floor {
            warn!("Discarding stale generation #{} for '{}'", ticket.seq, page);
            return Err(BlueprintError::Superseded { page: page.to_string() });
        }

        slot.generations_committed = ticket.seq;
        slot.state.generated = Some(files);
        debug!("Stored generation #{} on '{}'", ticket.seq, page);
        Ok(())
    }

    /// Select a component, or clear the selection with `None`.
    pub fn select(&self, page: &str, selection: Option<ComponentRef>) -> Result<()> {
        let mut slot = self.lock(page)?;
        let state = &mut slot.state;

        if let Some(target) = &selection {
            let blueprint = state
                .blueprint
                .as_ref()
                .ok_or_else(|| BlueprintError::NoActiveDocument(page.to_string()))?;
            if blueprint.resolve(target).is_none() {
                return Err(BlueprintError::InvalidSelection(format!(
                    "no component at {} on page '{}'",
                    target, page
                )));
            }
        }

        state.ui_state.selection = selection;
        Ok(())
    }

    /// Zoom is clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_viewport(&self, page: &str, zoom: f64, pan: Pan) -> Result<UiState> {
        if !zoom.is_finite() || !pan.x.is_finite() || !pan.y.is_finite() {
            return Err(BlueprintError::InvalidViewport(format!(
                "zoom {} pan ({}, {})",
                zoom, pan.x, pan.y
            )));
        }

        let mut slot = self.lock(page)?;
        let ui = &mut slot.state.ui_state;
        ui.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        ui.pan = pan;
        Ok(ui.clone())
    }

    /// Change only the zoom, leaving pan where it is.
    pub fn set_zoom(&self, page: &str, zoom: f64) -> Result<UiState> {
        if !zoom.is_finite() {
            return Err(BlueprintError::InvalidViewport(format!("zoom {}", zoom)));
        }

        let mut slot = self.lock(page)?;
        let ui = &mut slot.state.ui_state;
        ui.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(ui.clone())
    }

    /// Back to zoom 1.0 with no pan. Selection is kept.
    pub fn reset_viewport(&self, page: &str) -> Result<UiState> {
        let mut slot = self.lock(page)?;
        let defaults = UiState::default();
        let ui = &mut slot.state.ui_state;
        ui.zoom = defaults.zoom;
        ui.pan = defaults.pan;
        Ok(ui.clone())
    }

    /// One summary per page in registration order, read lazily as the
    /// iterator advances.
    pub fn list_pages(&self) -> impl Iterator<Item = PageSummary> + '_ {
        self.order.iter().filter_map(move |id| {
            let slot = self.lock(id).ok()?;
            Some(PageSummary {
                id: id.clone(),
                name: slot.state.blueprint.as_ref().map(|b| b.name.clone()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_common::{BBox, Component};
    use std::sync::Arc;

    fn store() -> PageStore {
        PageStore::new(["home", "about", "pricing"]).unwrap()
    }

    fn doc(name: &str, width: f64) -> Blueprint {
        Blueprint::new(name).with_component(
            Component::new("button")
                .with_text("Buy")
                .with_bbox(BBox::new(0.0, 0.0, width, 40.0)),
        )
    }

    #[test]
    fn test_rejects_bad_registries() {
        assert!(matches!(PageStore::new(["home", "home"]), Err(BlueprintError::Config(_))));
        assert!(matches!(PageStore::new([" "]), Err(BlueprintError::Config(_))));
        assert!(matches!(PageStore::new(Vec::<String>::new()), Err(BlueprintError::Config(_))));
    }

    #[test]
    fn test_unknown_page() {
        let store = store();
        assert!(matches!(store.get("contact"), Err(BlueprintError::UnknownPage(p)) if p == "contact"));
        assert!(matches!(
            store.set_blueprint("contact", doc("x", 1.0)),
            Err(BlueprintError::UnknownPage(_))
        ));
    }

    #[test]
    fn test_set_blueprint_is_isolated() {
        let store = store();
        let before_about = store.get("about").unwrap();

        store.set_blueprint("home", doc("home", 100.0)).unwrap();

        let home = store.get("home").unwrap();
        assert_eq!(home.blueprint, Some(doc("home", 100.0)));
        assert!(home.history.is_empty());
        assert_eq!(store.get("about").unwrap(), before_about);
    }

    #[test]
    fn test_list_pages_stable_order() {
        let store = store();
        store.set_blueprint("about", doc("About us", 10.0)).unwrap();

        let first: Vec<PageSummary> = store.list_pages().collect();
        let second: Vec<PageSummary> = store.list_pages().collect();

        assert_eq!(first, second);
        let ids: Vec<&str> = first.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["home", "about", "pricing"]);
        assert_eq!(first[0].name, None);
        assert_eq!(first[1].name.as_deref(), Some("About us"));
    }

    #[test]
    fn test_commit_edit_appends_pre_edit_snapshot() {
        let store = store();
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();

        let len = store.commit_edit("home", rev, doc("home", 150.0)).unwrap();

        let state = store.get("home").unwrap();
        assert_eq!(len, 1);
        assert_eq!(state.history, vec![doc("home", 100.0)]);
        assert_eq!(state.blueprint, Some(doc("home", 150.0)));
        assert_eq!(state.revision, rev + 1);
    }

    #[test]
    fn test_stale_commit_is_discarded() {
        let store = store();
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();
        store.commit_edit("home", rev, doc("home", 150.0)).unwrap();

        let err = store.commit_edit("home", rev, doc("home", 200.0)).unwrap_err();

        assert!(matches!(err, BlueprintError::Superseded { .. }));
        let state = store.get("home").unwrap();
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.blueprint, Some(doc("home", 150.0)));
    }

    #[test]
    fn test_invalid_patch_never_lands() {
        let store = store();
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();
        let before = store.get("home").unwrap();

        let err = store.commit_edit("home", rev, doc("home", -1.0)).unwrap_err();

        assert!(matches!(err, BlueprintError::InvalidBlueprint(_)));
        assert_eq!(store.get("home").unwrap(), before);
    }

    #[test]
    fn test_undo_consumes_history_tail() {
        let store = store();
        let mut rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();
        store.commit_edit("home", rev, doc("home", 150.0)).unwrap();
        rev = store.get("home").unwrap().revision;
        store.commit_edit("home", rev, doc("home", 200.0)).unwrap();

        assert_eq!(store.undo("home").unwrap(), doc("home", 150.0));
        assert_eq!(store.undo("home").unwrap(), doc("home", 100.0));
        assert!(matches!(store.undo("home"), Err(BlueprintError::NothingToUndo(_))));

        let state = store.get("home").unwrap();
        assert!(state.history.is_empty());
        assert_eq!(state.blueprint, Some(doc("home", 100.0)));
    }

    #[test]
    fn test_reset_baseline_clears_context() {
        let store = store();
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();
        store.commit_edit("home", rev, doc("home", 150.0)).unwrap();
        let ticket = store.begin_generation("home").unwrap();
        store
            .commit_generation("home", ticket, [("App.tsx", "x")].into_iter().collect())
            .unwrap();
        store.select("home", Some(ComponentRef::root(0))).unwrap();

        let rev = store.get("home").unwrap().revision;
        store.reset_baseline("home", rev, doc("fresh", 10.0)).unwrap();

        let state = store.get("home").unwrap();
        assert_eq!(state.blueprint, Some(doc("fresh", 10.0)));
        assert!(state.history.is_empty());
        assert!(state.generated.is_none());
        assert_eq!(state.ui_state, UiState::default());
    }

    #[test]
    fn test_generation_tickets_discard_late_results() {
        let store = store();
        store.set_blueprint("home", doc("home", 100.0)).unwrap();

        let older = store.begin_generation("home").unwrap();
        let newer = store.begin_generation("home").unwrap();

        store
            .commit_generation("home", newer, [("New.tsx", "new")].into_iter().collect())
            .unwrap();
        let err = store
            .commit_generation("home", older, [("Old.tsx", "old")].into_iter().collect())
            .unwrap_err();

        assert!(matches!(err, BlueprintError::Superseded { .. }));
        let files = store.get("home").unwrap().generated.unwrap();
        assert_eq!(files.file_names(), vec!["New.tsx"]);
    }

    #[test]
    fn test_generation_issued_before_upload_is_dropped() {
        let store = store();
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();
        let ticket = store.begin_generation("home").unwrap();

        store.reset_baseline("home", rev, doc("home", 120.0)).unwrap();

        assert!(store
            .commit_generation("home", ticket, [("App.tsx", "x")].into_iter().collect())
            .is_err());
        assert!(store.get("home").unwrap().generated.is_none());
    }

    #[test]
    fn test_selection_follows_document() {
        let store = store();
        assert!(matches!(
            store.select("home", Some(ComponentRef::root(0))),
            Err(BlueprintError::NoActiveDocument(_))
        ));

        let two = doc("home", 100.0).with_component(Component::new("heading"));
        let rev = store.set_blueprint("home", two).unwrap();
        store.select("home", Some(ComponentRef::root(1))).unwrap();
        assert_eq!(
            store.get("home").unwrap().selected_component().map(|c| c.kind.as_str()),
            Some("heading")
        );

        assert!(matches!(
            store.select("home", Some(ComponentRef::root(5))),
            Err(BlueprintError::InvalidSelection(_))
        ));

        // The patched document lost the heading, so the selection goes too.
        store.commit_edit("home", rev, doc("home", 100.0)).unwrap();
        assert_eq!(store.get("home").unwrap().ui_state.selection, None);
    }

    #[test]
    fn test_viewport_clamps_and_rejects_nan() {
        let store = store();
        let ui = store.set_viewport("home", 40.0, Pan { x: 5.0, y: -3.0 }).unwrap();
        assert_eq!(ui.zoom, MAX_ZOOM);
        assert_eq!(ui.pan, Pan { x: 5.0, y: -3.0 });

        assert!(matches!(
            store.set_viewport("home", f64::NAN, Pan::default()),
            Err(BlueprintError::InvalidViewport(_))
        ));
        assert!(matches!(
            store.set_viewport("home", 1.0, Pan { x: f64::INFINITY, y: 0.0 }),
            Err(BlueprintError::InvalidViewport(_))
        ));
        assert!(matches!(
            store.set_viewport("home", 1.0, Pan { x: 0.0, y: f64::NEG_INFINITY }),
            Err(BlueprintError::InvalidViewport(_))
        ));
        // Rejected calls leave the previous viewport in place.
        assert_eq!(store.get("home").unwrap().ui_state.pan, Pan { x: 5.0, y: -3.0 });

        assert_eq!(store.reset_viewport("home").unwrap(), UiState::default());
        assert_eq!(store.get("home").unwrap().ui_state, UiState::default());
        assert_eq!(store.get("about").unwrap().ui_state, UiState::default());
    }

    #[test]
    fn test_set_zoom_keeps_pan() {
        let store = store();
        store.set_viewport("home", 2.0, Pan { x: 12.0, y: 7.0 }).unwrap();

        let ui = store.set_zoom("home", 0.01).unwrap();
        assert_eq!(ui.zoom, MIN_ZOOM);
        assert_eq!(ui.pan, Pan { x: 12.0, y: 7.0 });

        assert!(matches!(
            store.set_zoom("home", f64::INFINITY),
            Err(BlueprintError::InvalidViewport(_))
        ));
        assert_eq!(store.get("home").unwrap().ui_state.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_stale_upload_is_discarded() {
        let store = store();
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();
        store.commit_edit("home", rev, doc("home", 150.0)).unwrap();
        let before = store.get("home").unwrap();

        let err = store.reset_baseline("home", rev, doc("fresh", 10.0)).unwrap_err();

        assert!(matches!(err, BlueprintError::Superseded { ref page } if page == "home"));
        let after = store.get("home").unwrap();
        assert_eq!(after, before);
        assert_eq!(after.blueprint, Some(doc("home", 150.0)));
        assert_eq!(after.history, vec![doc("home", 100.0)]);
    }

    #[test]
    fn test_racing_commits_keep_exactly_one() {
        let store = Arc::new(store());
        let rev = store.set_blueprint("home", doc("home", 100.0)).unwrap();

        let results: Vec<Result<usize>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = store.clone();
                    scope.spawn(move || store.commit_edit("home", rev, doc("home", 200.0 + i as f64)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let state = store.get("home").unwrap();
        assert_eq!(state.history, vec![doc("home", 100.0)]);
    }
}
