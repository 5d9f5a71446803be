//! WASM bridge for Studio: exposes the page editor to JavaScript.
//!
//! Compiled via `wasm-pack build --target web` and loaded by the browser
//! editor. Documents, props and id lists cross the boundary as JSON strings;
//! malformed input is logged and reported as `false`/`undefined`.

use serde::de::DeserializeOwned;
use studio_core::{ComponentId, PageData, Props, Severity, ZoneId, validate_document};
use studio_editor::{
    ComponentPatch, EditorSession, HistoryConfig, StudioError, Studio,
    session::DEFAULT_ID_PREFIX,
};
use wasm_bindgen::prelude::*;

/// The WASM-facing editor handle.
///
/// Holds one editing session and its selection. All interaction from the
/// page-builder UI goes through this struct.
#[wasm_bindgen]
pub struct StudioHandle {
    studio: Studio,
}

impl Default for StudioHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl StudioHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook_setup();
        Self {
            studio: Studio::new(),
        }
    }

    /// A handle whose undo history keeps `limit` steps.
    pub fn with_history_limit(limit: usize) -> StudioHandle {
        console_error_panic_hook_setup();
        let session = EditorSession::with_config(HistoryConfig { limit }, DEFAULT_ID_PREFIX);
        Self {
            studio: Studio::from_session(session),
        }
    }

    // ─── Document ────────────────────────────────────────────────────────

    /// Open a page from JSON. Returns `{"ok":true}` or
    /// `{"ok":false,"error":"..."}`. With `strict`, pages with structural
    /// errors are refused.
    pub fn load(&mut self, site_id: &str, page_id: &str, json: &str, strict: bool) -> String {
        let result = if strict {
            self.studio.session.load_json_strict(site_id, page_id, json)
        } else {
            self.studio.session.load_json(site_id, page_id, json)
        };
        match result {
            Ok(()) => {
                self.studio.selection.clear_selection();
                r#"{"ok":true}"#.to_string()
            }
            Err(e) => {
                log::warn!("studio-wasm: load failed: {e}");
                error_json(&e)
            }
        }
    }

    /// The current page as JSON.
    pub fn get_data(&self) -> String {
        self.studio
            .session
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Replace the whole page (one undo step). Returns `false` on bad JSON.
    pub fn set_data(&mut self, json: &str) -> bool {
        let Some(data) = parse::<PageData>("page", json) else {
            return false;
        };
        let changed = self.studio.session.set_data(data);
        self.studio.sync_selection();
        changed
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Add a component. `parent_id` of `""` or `"root"` means top level.
    /// Returns the new id.
    pub fn add_component(
        &mut self,
        kind: &str,
        props_json: &str,
        parent_id: &str,
        index: Option<u32>,
        zone_id: Option<String>,
    ) -> Option<String> {
        let props = parse_props(props_json)?;
        let created = self.studio.session.add_component(
            kind,
            props,
            parent(parent_id),
            index.map(|i| i as usize),
            zone_id.as_deref().map(ZoneId::from),
        )?;
        Some(created.as_str().to_string())
    }

    /// Shallow-merge `{"type","props","locked","hidden"}` fields.
    pub fn update_component(&mut self, id: &str, patch_json: &str) -> bool {
        let Some(patch) = parse::<ComponentPatch>("patch", patch_json) else {
            return false;
        };
        self.studio
            .session
            .update_component(ComponentId::intern(id), patch)
    }

    pub fn update_component_props(&mut self, id: &str, props_json: &str) -> bool {
        let Some(props) = parse_props(props_json) else {
            return false;
        };
        self.studio
            .session
            .update_component_props(ComponentId::intern(id), props)
    }

    pub fn update_root_props(&mut self, props_json: &str) -> bool {
        let Some(props) = parse_props(props_json) else {
            return false;
        };
        self.studio.session.update_root_props(props)
    }

    pub fn delete_component(&mut self, id: &str) -> bool {
        let changed = self
            .studio
            .session
            .delete_component(ComponentId::intern(id));
        self.studio.sync_selection();
        changed
    }

    /// Delete several components given as a JSON array of ids.
    pub fn delete_components(&mut self, ids_json: &str) -> bool {
        let Some(ids) = parse_ids(ids_json) else {
            return false;
        };
        let changed = self.studio.session.delete_components(&ids);
        self.studio.sync_selection();
        changed
    }

    pub fn duplicate_component(&mut self, id: &str) -> Option<String> {
        self.studio
            .session
            .duplicate_component(ComponentId::intern(id))
            .map(|clone| clone.as_str().to_string())
    }

    pub fn move_component(
        &mut self,
        id: &str,
        parent_id: &str,
        index: u32,
        zone_id: Option<String>,
    ) -> bool {
        self.studio.session.move_component(
            ComponentId::intern(id),
            parent(parent_id),
            index as usize,
            zone_id.as_deref().map(ZoneId::from),
        )
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let undone = self.studio.session.undo().is_some();
        self.studio.sync_selection();
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.studio.session.redo().is_some();
        self.studio.sync_selection();
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.studio.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.studio.session.can_redo()
    }

    /// Start a drag gesture; changes until `end_batch` undo as one step.
    pub fn begin_batch(&mut self, label: &str) {
        self.studio.session.begin_batch(label);
    }

    pub fn end_batch(&mut self) {
        self.studio.session.end_batch();
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select(&mut self, id: &str) {
        self.studio.selection.select(ComponentId::intern(id));
    }

    pub fn toggle_select(&mut self, id: &str) {
        self.studio.selection.toggle_select(ComponentId::intern(id));
    }

    pub fn add_to_selection(&mut self, id: &str) {
        self.studio
            .selection
            .add_to_selection(ComponentId::intern(id));
    }

    pub fn remove_from_selection(&mut self, id: &str) {
        self.studio
            .selection
            .remove_from_selection(ComponentId::intern(id));
    }

    /// Replace the selection with a JSON array of ids.
    pub fn select_multiple(&mut self, ids_json: &str) -> bool {
        let Some(ids) = parse_ids(ids_json) else {
            return false;
        };
        self.studio.selection.select_multiple(&ids);
        true
    }

    pub fn clear_selection(&mut self) {
        self.studio.selection.clear_selection();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.studio.selection.is_selected(ComponentId::intern(id))
    }

    pub fn set_multi_select(&mut self, enabled: bool) {
        self.studio.selection.set_multi_select(enabled);
    }

    pub fn select_next(&mut self) -> bool {
        self.studio.selection.select_next(self.studio.session.data())
    }

    pub fn select_previous(&mut self) -> bool {
        self.studio
            .selection
            .select_previous(self.studio.session.data())
    }

    /// `{"primaryId":..,"selectedIds":[..],"isMultiSelect":..}`
    pub fn get_selection(&self) -> String {
        serde_json::to_string(&self.studio.selection).unwrap_or_else(|_| "{}".to_string())
    }

    // ─── Save state ──────────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.studio.session.is_dirty
    }

    pub fn is_saving(&self) -> bool {
        self.studio.session.is_saving
    }

    pub fn mark_dirty(&mut self) {
        self.studio.session.mark_dirty();
    }

    pub fn mark_saved(&mut self) {
        self.studio.session.mark_saved();
    }

    pub fn set_saving(&mut self, saving: bool) {
        self.studio.session.set_saving(saving);
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.studio.session.set_error(error);
    }

    pub fn get_error(&self) -> Option<String> {
        self.studio.session.error.clone()
    }

    /// RFC 3339 timestamp of the last successful save.
    pub fn last_saved_at(&self) -> Option<String> {
        self.studio
            .session
            .last_saved_at
            .map(|at| at.to_rfc3339())
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns whether the page or selection changed.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        self.studio.handle_key(key, ctrl, shift, alt, meta)
    }
}

// ─── Standalone validation (no session needed) ───────────────────────────

/// Check a page for structural problems. Returns JSON:
/// `{"ok":bool,"diagnostics":[{"id","rule","severity","message"}]}`.
#[wasm_bindgen]
pub fn validate(json: &str) -> String {
    let data = match PageData::from_json(json) {
        Ok(data) => data,
        Err(e) => return error_json(&StudioError::Json(e)),
    };
    let diags = validate_document(&data);
    let ok = diags.iter().all(|d| d.severity != Severity::Error);
    let items: Vec<serde_json::Value> = diags
        .iter()
        .map(|d| {
            serde_json::json!({
                "id": d.component_id.as_str(),
                "rule": d.rule,
                "severity": match d.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                },
                "message": d.message,
            })
        })
        .collect();
    serde_json::json!({ "ok": ok, "diagnostics": items }).to_string()
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn parent(id: &str) -> ComponentId {
    if id.is_empty() {
        ComponentId::root()
    } else {
        ComponentId::intern(id)
    }
}

fn parse<T: DeserializeOwned>(what: &str, json: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("studio-wasm: rejected {what} JSON: {e}");
            None
        }
    }
}

/// Props object; an empty string stands for `{}`.
fn parse_props(json: &str) -> Option<Props> {
    if json.trim().is_empty() {
        return Some(Props::new());
    }
    parse("props", json)
}

fn parse_ids(json: &str) -> Option<Vec<ComponentId>> {
    parse("id list", json)
}

fn error_json(e: &StudioError) -> String {
    serde_json::json!({ "ok": false, "error": e.to_string() }).to_string()
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Studio WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
