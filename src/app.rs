//! Application shell.
//!
//! [`App`] owns the editor, the annotation store of the current image, the
//! class list and the persistence bridge, and routes events between them.
//! A host drives it by forwarding input, calling [`App::tick`] once per
//! frame and painting [`App::frame`] when a redraw is due.

use std::time::Duration;

use web_time::Instant;

use crate::config::AppConfig;
use crate::editor::{EditContext, Editor};
use crate::image_cache::ImageCache;
use crate::keybindings::{KeyBindings, KeyPress, ShortcutAction};
use crate::list_sync::ListRefresh;
use crate::message::{EditorEvent, Tool};
use crate::model::{AnnotationId, ClassError, ClassList, ImageEntry, Point};
use crate::persistence::{AnnotationBackend, BridgeRequest, BridgeResponse, PersistenceBridge, PersistenceError};
use crate::render::{Frame, FrameInput, render};
use crate::store::AnnotationStore;
use crate::view_math::{Size, ViewTransform};

// ============================================================================
// Host-facing types
// ============================================================================

/// What the host should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Repaint the canvas from [`App::frame`].
    pub redraw: bool,
    /// Rebuild the annotation and image lists.
    pub refresh_list: bool,
}

/// Transient message for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Info(msg) | Notification::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }
}

/// Image navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

// ============================================================================
// App
// ============================================================================

/// The annotation editor application.
pub struct App {
    bridge: PersistenceBridge,
    keybindings: KeyBindings,

    editor: Editor,
    store: AnnotationStore,
    classes: ClassList,

    /// Images in navigation order, as last listed by the backend
    images: Vec<ImageEntry>,
    /// Image being edited
    current: Option<String>,
    /// Image whose annotations were requested but not yet received.
    /// Editing is disabled while this is set.
    loading: Option<String>,
    /// The last annotation load of the current image failed. Editing and
    /// saving stay disabled until a reload succeeds, so the stored list is
    /// never replaced by the empty store.
    load_failed: bool,
    image_cache: ImageCache,

    viewport: Size,
    margin: f32,

    list_refresh: ListRefresh,
    needs_redraw: bool,
    notifications: Vec<Notification>,
}

impl App {
    /// Start the persistence worker and request the image list and classes.
    pub fn new<B: AnnotationBackend + 'static>(backend: B, config: &AppConfig) -> Result<Self, PersistenceError> {
        let mut bridge = PersistenceBridge::spawn(backend)?;
        bridge.send(BridgeRequest::ListImages)?;
        bridge.send(BridgeRequest::LoadClasses)?;

        Ok(Self {
            bridge,
            keybindings: KeyBindings::from_config(&config.shortcuts),
            editor: Editor::new(),
            store: AnnotationStore::new(),
            classes: ClassList::default(),
            images: Vec::new(),
            current: None,
            loading: None,
            load_failed: false,
            image_cache: ImageCache::new(),
            viewport: Size::default(),
            margin: config.preferences.fit_margin(),
            list_refresh: ListRefresh::new().with_debounce_delay(config.preferences.list_refresh_interval()),
            needs_redraw: true,
            notifications: Vec::new(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn image_cache(&self) -> &ImageCache {
        &self.image_cache
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    /// Whether annotations for the current image are still being fetched.
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Whether the current image's annotations could not be loaded.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Images whose name contains `term`, ignoring case. A blank term matches all.
    pub fn filter_images(&self, term: &str) -> Vec<&ImageEntry> {
        let term = term.trim().to_lowercase();
        self.images
            .iter()
            .filter(|e| term.is_empty() || e.name.to_lowercase().contains(&term))
            .collect()
    }

    /// Number of storage requests still in flight.
    pub fn pending_requests(&self) -> usize {
        self.bridge.pending()
    }

    /// Drain queued notifications.
    pub fn notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Transform for the current frame, None while editing is unavailable.
    pub fn transform(&self) -> Option<ViewTransform> {
        if self.loading.is_some() || self.load_failed {
            return None;
        }
        let size = self.image_cache.size_of(self.current.as_deref()?)?;
        ViewTransform::fit(size, self.viewport, self.margin)
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Process finished storage work and queued editor events.
    pub fn tick(&mut self) -> TickOutcome {
        while let Some(response) = self.bridge.take_one_result() {
            self.handle_response(response);
        }
        self.flush_editor_events();

        TickOutcome {
            redraw: std::mem::take(&mut self.needs_redraw),
            refresh_list: self.list_refresh.take_due(),
        }
    }

    /// Block until every storage request has been answered, or `timeout` passes.
    /// Returns true if nothing is left in flight.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.flush_editor_events();
            if self.bridge.pending() == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                log::warn!("{} storage requests still pending", self.bridge.pending());
                return false;
            }
            if let Some(response) = self.bridge.recv_timeout(deadline - now) {
                self.handle_response(response);
            }
        }
    }

    fn handle_response(&mut self, response: BridgeResponse) {
        match response {
            BridgeResponse::Images(Ok(images)) => self.on_images_listed(images),
            BridgeResponse::Images(Err(e)) => {
                self.notify_error(format!("Failed to load image list: {}", e));
            }
            BridgeResponse::Annotations { image, result } => {
                if self.loading.as_deref() != Some(image.as_str()) {
                    log::debug!("Ignoring stale annotations for {}", image);
                    return;
                }
                self.loading = None;
                match result {
                    Ok(annotations) => {
                        log::info!("Loaded {} annotations for {}", annotations.len(), image);
                        self.load_failed = false;
                        self.store.load(image, annotations);
                    }
                    Err(e) => {
                        self.load_failed = true;
                        self.notify_error(format!("Failed to load annotations for {}: {}", image, e));
                    }
                }
                self.list_refresh.mark_changed();
                self.needs_redraw = true;
            }
            BridgeResponse::AnnotationsSaved { image, result } => match result {
                Ok(()) => {
                    log::info!("Saved annotations for {}", image);
                    self.notify_info("Annotations saved");
                    // Keep per-image annotation counts current
                    self.request(BridgeRequest::ListImages);
                }
                Err(e) => {
                    self.notify_error(format!("Failed to save annotations for {}: {}", image, e));
                }
            },
            BridgeResponse::Classes(Ok(classes)) => {
                log::info!("Loaded {} classes", classes.len());
                self.classes.replace(classes);
                self.list_refresh.mark_changed();
                self.needs_redraw = true;
            }
            BridgeResponse::Classes(Err(e)) => {
                self.notify_error(format!("Failed to load classes: {}", e));
            }
            BridgeResponse::ClassesSaved(Ok(())) => log::debug!("Class list saved"),
            BridgeResponse::ClassesSaved(Err(e)) => {
                self.notify_error(format!("Failed to save classes: {}", e));
            }
            BridgeResponse::Image { image, result } => {
                let decoded = result.and_then(|bytes| {
                    self.image_cache
                        .insert_bytes(&image, bytes)
                        .map_err(PersistenceError::from)
                });
                if let Err(e) = decoded {
                    self.image_cache.mark_failed(&image, e.to_string());
                    self.notify_error(format!("Failed to load image {}: {}", image, e));
                }
                if self.current.as_deref() == Some(image.as_str()) {
                    self.needs_redraw = true;
                }
            }
        }
    }

    fn on_images_listed(&mut self, images: Vec<ImageEntry>) {
        log::debug!("Image list: {} images", images.len());
        self.images = images;
        let names: Vec<&str> = self.images.iter().map(|e| e.name.as_str()).collect();
        self.image_cache.retain(|name| names.contains(&name));
        self.list_refresh.mark_changed();

        let current_listed = self
            .current
            .as_deref()
            .is_some_and(|current| self.images.iter().any(|e| e.name == current));
        if current_listed {
            return;
        }
        match self.images.first().map(|e| e.name.clone()) {
            Some(first) => {
                self.select_image(&first);
            }
            None => {
                if self.current.take().is_some() {
                    self.editor.reset();
                    self.store.reset(None);
                    self.loading = None;
                    self.load_failed = false;
                    self.flush_editor_events();
                }
            }
        }
    }

    /// Route queued editor events to their consumers.
    fn flush_editor_events(&mut self) {
        for event in self.editor.take_events() {
            match event {
                EditorEvent::Redraw => self.needs_redraw = true,
                EditorEvent::ListChanged => self.list_refresh.mark_changed(),
                EditorEvent::Commit(reason) => {
                    log::debug!("Commit: {:?}", reason);
                    self.save_store();
                }
            }
        }
    }

    /// Queue a save of the whole store for the image it belongs to.
    fn save_store(&mut self) {
        if self.loading.is_some() {
            log::warn!("Not saving while annotations are loading");
            return;
        }
        if self.load_failed {
            log::warn!("Not saving: stored annotations of this image failed to load");
            return;
        }
        let Some(image) = self.store.image().map(str::to_string) else {
            log::warn!("Nothing to save: no image loaded");
            return;
        };
        let annotations = self.store.snapshot();
        self.request(BridgeRequest::SaveAnnotations { image, annotations });
    }

    fn request(&mut self, request: BridgeRequest) {
        if let Err(e) = self.bridge.send(request) {
            self.notify_error(format!("Storage unavailable: {}", e));
        }
    }

    fn notify_info(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::Info(message.into()));
    }

    fn notify_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.notifications.push(Notification::Error(message));
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Switch to another image. Returns false if the image is not listed.
    ///
    /// Any gesture in progress is finished against the old image first.
    pub fn select_image(&mut self, name: &str) -> bool {
        if !self.images.iter().any(|e| e.name == name) {
            log::warn!("Unknown image {}", name);
            return false;
        }
        if self.current.as_deref() == Some(name) {
            self.retry_current(name);
            return true;
        }

        self.editor.finish_gesture(&self.store);
        self.flush_editor_events();

        log::info!("Selecting image {}", name);
        self.editor.reset();
        self.store.reset(Some(name.to_string()));
        self.current = Some(name.to_string());
        self.loading = Some(name.to_string());
        self.load_failed = false;
        self.request(BridgeRequest::LoadAnnotations {
            image: name.to_string(),
        });
        if self.image_cache.request(name) {
            self.request(BridgeRequest::LoadImage {
                image: name.to_string(),
            });
        }
        self.flush_editor_events();
        true
    }

    /// Re-request whatever failed to load for the image already selected.
    fn retry_current(&mut self, name: &str) {
        if self.load_failed && self.loading.is_none() {
            log::info!("Reloading annotations for {}", name);
            self.load_failed = false;
            self.loading = Some(name.to_string());
            self.request(BridgeRequest::LoadAnnotations {
                image: name.to_string(),
            });
        }
        if self.image_cache.request(name) {
            log::info!("Reloading image {}", name);
            self.request(BridgeRequest::LoadImage {
                image: name.to_string(),
            });
        }
    }

    /// Step to the previous or next image, wrapping around.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let Some(current) = self.current.as_deref() else {
            return false;
        };
        let Some(index) = self.images.iter().position(|e| e.name == current) else {
            return false;
        };
        let len = self.images.len();
        let target = match direction {
            Direction::Prev => (index + len - 1) % len,
            Direction::Next => (index + 1) % len,
        };
        let name = self.images[target].name.clone();
        self.select_image(&name)
    }

    // =========================================================================
    // Canvas input
    // =========================================================================

    fn edit(&mut self, f: impl FnOnce(&mut Editor, &mut EditContext<'_>)) {
        let transform = self.transform();
        let mut ctx = EditContext {
            store: &mut self.store,
            transform,
            active_class: self.classes.active().map(|c| c.name.as_str()),
        };
        f(&mut self.editor, &mut ctx);
        self.flush_editor_events();
    }

    pub fn pointer_down(&mut self, screen: Point) {
        self.edit(|editor, ctx| editor.pointer_down(screen, ctx));
    }

    pub fn pointer_move(&mut self, screen: Point) {
        self.edit(|editor, ctx| editor.pointer_move(screen, ctx));
    }

    pub fn pointer_up(&mut self, screen: Point) {
        self.edit(|editor, ctx| editor.pointer_up(screen, ctx));
    }

    pub fn double_click(&mut self, screen: Point) {
        self.edit(|editor, ctx| editor.double_click(screen, ctx));
    }

    pub fn pointer_leave(&mut self) {
        self.editor.pointer_leave(&self.store);
        self.flush_editor_events();
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.editor.set_tool(tool, &self.store);
        self.flush_editor_events();
    }

    /// New canvas size. The transform follows on the next event.
    pub fn resize_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Size::new(width, height);
        self.needs_redraw = true;
    }

    // =========================================================================
    // List actions
    // =========================================================================

    /// Select an annotation from the list, or clear the selection.
    pub fn select_annotation(&mut self, id: Option<AnnotationId>) {
        self.editor.select(id, &self.store);
        self.flush_editor_events();
    }

    /// Delete the annotation at a list position.
    pub fn delete_annotation(&mut self, index: usize) -> bool {
        let deleted = self.editor.delete_at(index, &mut self.store);
        self.flush_editor_events();
        deleted
    }

    /// Remove every annotation of the current image.
    pub fn clear_annotations(&mut self) -> bool {
        if self.store.is_empty() {
            self.notify_info("No annotations to clear");
            return false;
        }
        let cleared = self.editor.clear(&mut self.store);
        self.flush_editor_events();
        cleared
    }

    /// Save the current image's annotations now.
    pub fn save_now(&mut self) {
        if self.current.is_none() {
            self.notify_info("No image selected");
            return;
        }
        if self.load_failed {
            self.notify_error("Annotations failed to load; select the image again to retry");
            return;
        }
        self.save_store();
    }

    // =========================================================================
    // Classes
    // =========================================================================

    pub fn add_class(&mut self, name: &str, color: &str) -> Result<(), ClassError> {
        let result = self.classes.add(name, color);
        self.after_class_change(result)
    }

    pub fn edit_class(&mut self, index: usize, name: &str, color: &str) -> Result<(), ClassError> {
        let result = self.classes.edit(index, name, color);
        self.after_class_change(result)
    }

    /// Remove a class. Annotations keep the removed name.
    pub fn delete_class(&mut self, index: usize) -> Result<(), ClassError> {
        let result = self.classes.remove(index).map(|removed| {
            log::info!("Removed class {}", removed.name);
        });
        self.after_class_change(result)
    }

    /// Make a class active for new shapes.
    pub fn select_class(&mut self, name: &str) -> bool {
        let selected = self.classes.select(name);
        if selected {
            self.list_refresh.mark_changed();
        } else {
            log::warn!("Unknown class {}", name);
        }
        selected
    }

    /// Clear the active class. New shapes are discarded until one is selected.
    pub fn deselect_class(&mut self) {
        self.classes.deselect();
        self.list_refresh.mark_changed();
    }

    fn after_class_change(&mut self, result: Result<(), ClassError>) -> Result<(), ClassError> {
        match &result {
            Ok(()) => {
                let classes = self.classes.as_slice().to_vec();
                self.request(BridgeRequest::SaveClasses { classes });
                self.list_refresh.mark_changed();
                self.needs_redraw = true;
            }
            Err(e) => self.notify_error(e.to_string()),
        }
        result
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Draw commands for the current state.
    pub fn frame(&self) -> Frame {
        let image = self
            .current
            .as_deref()
            .and_then(|name| self.image_cache.size_of(name).map(|size| (name, size)));
        render(&FrameInput {
            viewport: self.viewport,
            margin: self.margin,
            image,
            annotations: self.store.as_slice(),
            classes: &self.classes,
            selected: self.editor.selected(),
            session: self.editor.session(),
        })
    }

    /// Dispatch a key press to the bound shortcut. Returns true if one matched.
    pub fn handle_key(&mut self, press: &KeyPress) -> bool {
        let Some(action) = self.keybindings.action_for(press) else {
            return false;
        };
        log::debug!("Shortcut: {}", action.name());
        match action {
            ShortcutAction::Save => self.save_now(),
            ShortcutAction::Clear => {
                self.clear_annotations();
            }
            ShortcutAction::PrevImage => {
                self.navigate(Direction::Prev);
            }
            ShortcutAction::NextImage => {
                self.navigate(Direction::Next);
            }
        }
        true
    }
}
