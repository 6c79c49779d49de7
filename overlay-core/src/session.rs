//! Editor session: one open document with its elements, viewport and gestures.

use std::collections::BTreeMap;

use crate::{
    event::{PointerEvent, PointerPhase},
    gesture::{GestureEngine, GestureOutcome, Preview, TextDefaults},
    measure::TextMeasure,
    source::{RasterizationService, RenderedPage},
    transform::PageMapping,
    upload::{validate_document, ImageUpload, UploadLimits},
    viewport::{Viewport, ViewportConfig},
    Bounds, CoreError, CoreResult, Element, ElementId, ElementPatch, ElementStore, Point,
    TextStyle,
};

/// Where inserted images are placed, in element space.
pub const IMAGE_INSERT_ORIGIN: Point = Point::new(100.0, 100.0);

/// Configuration of an [`EditorSession`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Zoom limits and fit margin.
    pub viewport: ViewportConfig,
    /// Image upload caps.
    pub upload: UploadLimits,
    /// Style and size of new text.
    pub text: TextDefaults,
}

/// Response to a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerResponse {
    /// Nothing to show or commit.
    None,
    /// Candidate geometry to draw while the pointer moves.
    Preview(Preview),
    /// Result of a press or release.
    Outcome(GestureOutcome),
}

/// An open document being edited.
///
/// All collaborators are injected; the session owns its store, viewport and
/// gesture engine and keeps them consistent across page and zoom changes.
///
/// Elements are stored in element space: overlay pixels at the viewport's
/// reference scale. Zooming never touches stored geometry. Pointer positions,
/// previews and edit heights cross the session boundary in view pixels at
/// the current zoom.
pub struct EditorSession {
    store: ElementStore,
    viewport: Viewport,
    engine: GestureEngine,
    measure: Box<dyn TextMeasure>,
    source: Box<dyn RasterizationService>,
    config: SessionConfig,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("store", &self.store)
            .field("viewport", &self.viewport)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Create a session with no document open.
    #[must_use]
    pub fn new(
        source: Box<dyn RasterizationService>,
        measure: Box<dyn TextMeasure>,
        config: SessionConfig,
    ) -> Self {
        let viewport = Viewport::new(Vec::new(), config.viewport);
        let engine = GestureEngine::with_defaults(viewport.reference_size(), config.text.clone());
        Self {
            store: ElementStore::new(),
            viewport,
            engine,
            measure,
            source,
            config,
        }
    }

    /// Element store.
    #[must_use]
    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    /// Viewport state.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Gesture engine state.
    #[must_use]
    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    /// Open a document, replacing any previous one and all its elements.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInputFormat`] if the bytes are not a PDF,
    /// or the rasterization service's error if it cannot open the document.
    pub fn open_document(&mut self, bytes: &[u8]) -> CoreResult<u32> {
        validate_document(bytes)?;
        let pages = self.source.open(bytes)?;
        let sizes = (1..=pages)
            .map(|page| self.source.page_size(page))
            .collect::<CoreResult<Vec<_>>>()?;

        self.viewport = Viewport::new(sizes, self.config.viewport);
        self.store.clear_all();
        self.store.switch_page(1);
        self.engine =
            GestureEngine::with_defaults(self.viewport.reference_size(), self.config.text.clone());
        tracing::info!(pages, bytes = bytes.len(), "document opened");
        Ok(pages)
    }

    /// Render the current page at the current zoom.
    ///
    /// # Errors
    ///
    /// Propagates rasterization service errors.
    pub fn render_current_page(&mut self) -> CoreResult<RenderedPage> {
        self.source
            .render_page(self.viewport.current_page(), self.viewport.scale())
    }

    /// Commit whatever gesture is in progress.
    fn settle(&mut self) -> CoreResult<()> {
        if !self.engine.is_idle() {
            self.engine.commit(&mut self.store, self.measure.as_ref())?;
        }
        Ok(())
    }

    fn sync_page(&mut self) {
        self.store.switch_page(self.viewport.current_page());
        self.engine.set_container(self.viewport.reference_size());
        tracing::debug!(page = self.viewport.current_page(), "page changed");
    }

    /// Go to the next page. Returns `false` on the last page.
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn next_page(&mut self) -> CoreResult<bool> {
        self.settle()?;
        let moved = self.viewport.next_page();
        if moved {
            self.sync_page();
        }
        Ok(moved)
    }

    /// Go to the previous page. Returns `false` on the first page.
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn previous_page(&mut self) -> CoreResult<bool> {
        self.settle()?;
        let moved = self.viewport.previous_page();
        if moved {
            self.sync_page();
        }
        Ok(moved)
    }

    /// Jump to a page.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for an out-of-range page.
    pub fn go_to_page(&mut self, page: u32) -> CoreResult<()> {
        self.settle()?;
        self.viewport.go_to(page)?;
        self.sync_page();
        Ok(())
    }

    fn zoom_with(&mut self, change: impl FnOnce(&mut Viewport) -> f32) -> CoreResult<f32> {
        self.settle()?;
        let old = self.viewport.scale();
        let new = change(&mut self.viewport);
        if (new - old).abs() > f32::EPSILON {
            tracing::debug!(old, new, "zoom changed");
        }
        Ok(new)
    }

    /// Zoom in one step.
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn zoom_in(&mut self) -> CoreResult<f32> {
        self.zoom_with(Viewport::zoom_in)
    }

    /// Zoom out one step.
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn zoom_out(&mut self) -> CoreResult<f32> {
        self.zoom_with(Viewport::zoom_out)
    }

    /// Set an explicit zoom scale (clamped).
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn set_zoom(&mut self, scale: f32) -> CoreResult<f32> {
        self.zoom_with(|viewport| viewport.set_scale(scale))
    }

    /// Fit the current page's width into a container.
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn fit_width(&mut self, container_width: f32) -> CoreResult<f32> {
        self.zoom_with(|viewport| viewport.fit_width(container_width))
    }

    /// Fit the whole current page into a container.
    ///
    /// # Errors
    ///
    /// Propagates errors from committing an open edit.
    pub fn fit_page(&mut self, container_width: f32, container_height: f32) -> CoreResult<f32> {
        self.zoom_with(|viewport| viewport.fit_page(container_width, container_height))
    }

    /// Insert an uploaded image on the current page and select it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInputFormat`] or
    /// [`CoreError::SizeLimitExceeded`] for rejected uploads.
    pub fn insert_image(&mut self, bytes: Vec<u8>) -> CoreResult<Element> {
        let upload = ImageUpload::from_bytes(bytes, &self.config.upload)?;
        let size = upload.display_size(self.config.upload.max_display);
        let page = self.viewport.current_page();
        let element = self.store.create_image(
            page,
            IMAGE_INSERT_ORIGIN,
            upload.data,
            size.width,
            size.height,
        );
        self.store.select(element.id)?;
        Ok(element)
    }

    /// Create a text element.
    pub fn create_text_element(
        &mut self,
        page: u32,
        origin: Point,
        content: impl Into<String>,
        style: TextStyle,
    ) -> Element {
        self.store.create_text(page, origin, content, style)
    }

    /// Create an image element with an explicit intrinsic size.
    pub fn create_image_element(
        &mut self,
        page: u32,
        origin: Point,
        data: Vec<u8>,
        width: f32,
        height: f32,
    ) -> Element {
        self.store.create_image(page, origin, data, width, height)
    }

    /// Patch an element.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] or [`CoreError::InvalidOperation`].
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> CoreResult<Element> {
        self.store.update(id, patch)
    }

    /// Delete an element. An open edit of that element is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if it does not exist.
    pub fn delete_element(&mut self, id: ElementId) -> CoreResult<()> {
        if self.engine.editing() == Some(id) {
            self.engine.abandon();
        }
        if self.store.delete(id) {
            Ok(())
        } else {
            Err(CoreError::ElementNotFound(id))
        }
    }

    /// Delete the selected element. Ignored while a gesture is active.
    pub fn delete_selected(&mut self) -> Option<ElementId> {
        if self.engine.is_idle() {
            self.store.delete_selected()
        } else {
            None
        }
    }

    /// Dispatch a pointer event to the gesture engine.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GestureRejected`] for presses during an edit, or
    /// store errors on commit.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> CoreResult<PointerResponse> {
        let point = event.position();
        match event.phase {
            PointerPhase::Down => self.pointer_down(point).map(PointerResponse::Outcome),
            PointerPhase::Move => Ok(self
                .pointer_move(point)
                .map_or(PointerResponse::None, PointerResponse::Preview)),
            PointerPhase::Up => self.pointer_up(point).map(PointerResponse::Outcome),
        }
    }

    /// Pointer pressed at a view position.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::pointer_down`].
    pub fn pointer_down(&mut self, point: Point) -> CoreResult<GestureOutcome> {
        let point = self.viewport.to_element_space(point);
        self.engine.pointer_down(&mut self.store, point)
    }

    /// Pointer moved to a view position. The preview is in view pixels.
    pub fn pointer_move(&mut self, point: Point) -> Option<Preview> {
        let point = self.viewport.to_element_space(point);
        self.engine
            .pointer_move(point)
            .map(|preview| self.preview_to_view(preview))
    }

    /// Pointer released at a view position.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::pointer_up`].
    pub fn pointer_up(&mut self, point: Point) -> CoreResult<GestureOutcome> {
        let point = self.viewport.to_element_space(point);
        self.engine
            .pointer_up(&mut self.store, self.measure.as_ref(), point)
    }

    fn preview_to_view(&self, preview: Preview) -> Preview {
        match preview {
            Preview::Position { id, origin } => {
                let factor = self.viewport.view_factor();
                Preview::Position {
                    id,
                    origin: Point::new(origin.x * factor, origin.y * factor),
                }
            }
            Preview::Bounds { id, bounds } => Preview::Bounds {
                id,
                bounds: self.viewport.to_view(&bounds),
            },
            Preview::Marquee(bounds) => Preview::Marquee(self.viewport.to_view(&bounds)),
        }
    }

    /// Where an element is drawn at the current zoom, in view pixels.
    #[must_use]
    pub fn view_bounds(&self, element: &Element) -> Bounds {
        self.viewport.to_view(&element.bounds)
    }

    /// Enter add-text mode.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::begin_add_text`].
    pub fn begin_add_text(&mut self) -> CoreResult<()> {
        self.engine.begin_add_text()
    }

    /// Start editing a text element.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::begin_edit`].
    pub fn begin_edit(&mut self, id: ElementId) -> CoreResult<()> {
        self.engine.begin_edit(&mut self.store, id)
    }

    /// Update the edit buffer; returns the height the edit field should show,
    /// in view pixels.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::edit_input`].
    pub fn edit_input(&mut self, text: &str) -> CoreResult<f32> {
        let height = self
            .engine
            .edit_input(&self.store, self.measure.as_ref(), text)?;
        Ok(height * self.viewport.view_factor())
    }

    /// Confirm (or blur) the open edit.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::confirm_edit`].
    pub fn confirm_edit(&mut self) -> CoreResult<GestureOutcome> {
        self.engine.confirm_edit(&mut self.store)
    }

    /// Cancel key: revert an edit or leave add-text mode.
    ///
    /// # Errors
    ///
    /// See [`GestureEngine::cancel`].
    pub fn cancel(&mut self) -> CoreResult<GestureOutcome> {
        self.engine.cancel(&mut self.store)
    }

    /// Export/overlay size pairs for every page, for the export pipeline.
    #[must_use]
    pub fn page_dimensions(&self) -> BTreeMap<u32, PageMapping> {
        self.viewport.page_dimensions()
    }
}
