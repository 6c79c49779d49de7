//! Interactive geometry: the gesture state machine.
//!
//! ```text
//!            pointer-down on handle          pointer-up
//!   Idle ───────────────────────────► Resizing ──────────► Idle
//!    │  pointer-down on body                      pointer-up
//!    ├────────────────────────────────► Dragging ─────────► Idle
//!    │  begin_edit                                confirm / cancel
//!    ├────────────────────────────────► EditingText ──────► Idle
//!    │  begin_add_text           pointer-up
//!    └────────────────► AddingText ───────────► EditingText
//! ```
//!
//! Drag and resize only move a candidate box while the pointer is down. The
//! store sees exactly one `update` per gesture, on release. Text editing keeps
//! its buffer and visual height here until the edit is confirmed or cancelled.

use serde::{Deserialize, Serialize};

use crate::{
    handle::ResizeHandle,
    measure::{content_height, TextMeasure},
    store::DEFAULT_TEXT_SIZE,
    Bounds, CoreError, CoreResult, Element, ElementId, ElementPatch, ElementStore, Point, Size,
    TextStyle, MIN_HEIGHT, MIN_WIDTH,
};

/// Manhattan distance after which an add-text press becomes a rectangle.
pub const ADD_TEXT_DRAG_THRESHOLD: f32 = 20.0;

/// Style and box size used for newly added text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDefaults {
    /// Style of new text elements.
    pub style: TextStyle,
    /// Box size of a click-created text element.
    pub box_size: Size,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            style: TextStyle::default(),
            box_size: DEFAULT_TEXT_SIZE,
        }
    }
}

/// The interaction currently in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Nothing in progress.
    Idle,

    /// Moving an element.
    Dragging {
        /// Element being moved.
        id: ElementId,
        /// Pointer offset from the element's top-left corner.
        offset: Point,
        /// Element size, used for the container clamp.
        size: Size,
        /// Candidate top-left corner.
        candidate: Point,
    },

    /// Resizing an element from one of its handles.
    Resizing {
        /// Element being resized.
        id: ElementId,
        /// Handle being dragged.
        handle: ResizeHandle,
        /// Box when the gesture started.
        start: Bounds,
        /// Pointer position when the gesture started.
        start_pointer: Point,
        /// Candidate box.
        candidate: Bounds,
    },

    /// Editing the content of a text element.
    EditingText {
        /// Element being edited.
        id: ElementId,
        /// Content before the edit started.
        original: String,
        /// Current edit buffer.
        buffer: String,
        /// Element height when the edit started; the visual height never drops below it.
        base_height: f32,
        /// Height the edit field currently shows.
        visual_height: f32,
    },

    /// Waiting for, or capturing, the box of a new text element.
    AddingText {
        /// Pointer-down position, once pressed.
        start: Option<Point>,
        /// Latest pointer position.
        current: Point,
        /// Whether the press has moved far enough to become a rectangle.
        rectangle: bool,
    },
}

impl Gesture {
    /// Short name of the gesture, for logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging { .. } => "dragging",
            Self::Resizing { .. } => "resizing",
            Self::EditingText { .. } => "editing text",
            Self::AddingText { .. } => "adding text",
        }
    }
}

/// What a pointer move should show on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    /// Draw the dragged element at a new top-left corner.
    Position {
        /// Element being dragged.
        id: ElementId,
        /// Candidate top-left corner.
        origin: Point,
    },
    /// Draw the resized element with a new box.
    Bounds {
        /// Element being resized.
        id: ElementId,
        /// Candidate box.
        bounds: Bounds,
    },
    /// Draw the rectangle a new text box will fill.
    Marquee(Bounds),
}

/// Result of an input that may end or start a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing changed in the store.
    None,
    /// An element was selected.
    Selected(ElementId),
    /// The selection was cleared.
    Deselected,
    /// Geometry or content was written to the store.
    Committed(Element),
    /// A text element was created and is now being edited.
    Created(Element),
    /// An element was deleted.
    Deleted(ElementId),
    /// Add-text mode was left without creating anything.
    Cancelled,
}

/// Candidate box for a resize from `start` by pointer `delta`.
///
/// Width and height never go below the minimum size. When the floor is hit on
/// an edge that also moves the anchor (west or north), the anchor is
/// recomputed so the opposite edge stays where it was.
#[must_use]
pub fn resize_bounds(start: &Bounds, handle: ResizeHandle, delta: Point) -> Bounds {
    let mut bounds = *start;
    if handle.has_east() {
        bounds.width = start.width + delta.x;
    }
    if handle.has_west() {
        bounds.width = start.width - delta.x;
        bounds.x = start.x + delta.x;
    }
    if handle.has_south() {
        bounds.height = start.height + delta.y;
    }
    if handle.has_north() {
        bounds.height = start.height - delta.y;
        bounds.y = start.y + delta.y;
    }

    if bounds.width < MIN_WIDTH {
        bounds.width = MIN_WIDTH;
        if handle.has_west() {
            bounds.x = start.right() - MIN_WIDTH;
        }
    }
    if bounds.height < MIN_HEIGHT {
        bounds.height = MIN_HEIGHT;
        if handle.has_north() {
            bounds.y = start.bottom() - MIN_HEIGHT;
        }
    }
    bounds
}

/// Candidate top-left corner for a drag, kept inside `container`.
///
/// When the element is larger than the container the lower bound wins.
#[must_use]
pub fn clamp_drag(pointer: Point, offset: Point, size: Size, container: Size) -> Point {
    Point::new(
        (pointer.x - offset.x)
            .min(container.width - size.width)
            .max(0.0),
        (pointer.y - offset.y)
            .min(container.height - size.height)
            .max(0.0),
    )
}

/// The gesture state machine.
///
/// The engine owns no elements. Every call that commits receives the store
/// (and, where text has to be measured, a [`TextMeasure`]) explicitly.
#[derive(Debug, Clone)]
pub struct GestureEngine {
    state: Gesture,
    container: Size,
    defaults: TextDefaults,
}

impl GestureEngine {
    /// Create an idle engine for an overlay of `container` size.
    #[must_use]
    pub fn new(container: Size) -> Self {
        Self::with_defaults(container, TextDefaults::default())
    }

    /// Create an idle engine with custom text defaults.
    #[must_use]
    pub fn with_defaults(container: Size, defaults: TextDefaults) -> Self {
        Self {
            state: Gesture::Idle,
            container,
            defaults,
        }
    }

    /// The gesture in progress.
    #[must_use]
    pub fn state(&self) -> &Gesture {
        &self.state
    }

    /// Whether no gesture is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, Gesture::Idle)
    }

    /// Element whose text is being edited, if any.
    #[must_use]
    pub fn editing(&self) -> Option<ElementId> {
        match &self.state {
            Gesture::EditingText { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Overlay size that drags are clamped to.
    #[must_use]
    pub fn container(&self) -> Size {
        self.container
    }

    /// Update the overlay size (after a zoom or page change).
    pub fn set_container(&mut self, container: Size) {
        self.container = container;
    }

    /// Defaults used for new text.
    #[must_use]
    pub fn defaults(&self) -> &TextDefaults {
        &self.defaults
    }

    /// Replace the style used for new text.
    pub fn set_default_style(&mut self, style: TextStyle) {
        self.defaults.style = style;
    }

    fn reject(&self, action: &str) -> CoreError {
        CoreError::GestureRejected(format!("cannot {action} while {}", self.state.name()))
    }

    /// Enter add-text mode. The next press captures the new box.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GestureRejected`] unless the engine is idle.
    pub fn begin_add_text(&mut self) -> CoreResult<()> {
        if !self.is_idle() {
            return Err(self.reject("add text"));
        }
        self.state = Gesture::AddingText {
            start: None,
            current: Point::default(),
            rectangle: false,
        };
        Ok(())
    }

    /// Handle a pointer press.
    ///
    /// In idle state, a handle of the selected element starts a resize, an
    /// element body selects it and starts a drag, and empty space clears the
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GestureRejected`] while another gesture is active.
    pub fn pointer_down(
        &mut self,
        store: &mut ElementStore,
        point: Point,
    ) -> CoreResult<GestureOutcome> {
        match &mut self.state {
            Gesture::AddingText { start, current, .. } if start.is_none() => {
                *start = Some(point);
                *current = point;
                return Ok(GestureOutcome::None);
            }
            Gesture::Idle => {}
            _ => return Err(self.reject("start a gesture")),
        }

        if let Some(selected) = store.selected() {
            if selected.is_resizable() {
                if let Some(handle) = ResizeHandle::hit_test(&selected.bounds, point) {
                    tracing::debug!(id = %selected.id, ?handle, "resize started");
                    self.state = Gesture::Resizing {
                        id: selected.id,
                        handle,
                        start: selected.bounds,
                        start_pointer: point,
                        candidate: selected.bounds,
                    };
                    return Ok(GestureOutcome::None);
                }
            }
        }

        let hit = store
            .element_at(store.current_page(), point)
            .map(|e| (e.id, e.bounds));
        match hit {
            Some((id, bounds)) => {
                store.select(id)?;
                self.state = Gesture::Dragging {
                    id,
                    offset: Point::new(point.x - bounds.x, point.y - bounds.y),
                    size: bounds.size(),
                    candidate: bounds.origin(),
                };
                Ok(GestureOutcome::Selected(id))
            }
            None => {
                store.deselect();
                Ok(GestureOutcome::Deselected)
            }
        }
    }

    /// Handle a pointer move. Never writes to the store.
    pub fn pointer_move(&mut self, point: Point) -> Option<Preview> {
        let container = self.container;
        match &mut self.state {
            Gesture::Dragging {
                id,
                offset,
                size,
                candidate,
            } => {
                *candidate = clamp_drag(point, *offset, *size, container);
                Some(Preview::Position {
                    id: *id,
                    origin: *candidate,
                })
            }
            Gesture::Resizing {
                id,
                handle,
                start,
                start_pointer,
                candidate,
            } => {
                let delta = Point::new(point.x - start_pointer.x, point.y - start_pointer.y);
                *candidate = resize_bounds(start, *handle, delta);
                Some(Preview::Bounds {
                    id: *id,
                    bounds: *candidate,
                })
            }
            Gesture::AddingText {
                start: Some(start),
                current,
                rectangle,
            } => {
                *current = point;
                if !*rectangle && start.manhattan(point) > ADD_TEXT_DRAG_THRESHOLD {
                    *rectangle = true;
                }
                rectangle.then(|| Preview::Marquee(Bounds::from_corners(*start, point)))
            }
            _ => None,
        }
    }

    /// Handle a pointer release, committing the gesture in progress.
    ///
    /// The release position only matters when adding text; drags and resizes
    /// commit their last candidate wherever the pointer was released.
    ///
    /// # Errors
    ///
    /// Propagates store errors (for example if the element vanished mid-gesture).
    pub fn pointer_up(
        &mut self,
        store: &mut ElementStore,
        measure: &dyn TextMeasure,
        point: Point,
    ) -> CoreResult<GestureOutcome> {
        match self.state {
            Gesture::AddingText { start: Some(_), .. } => {
                self.pointer_move(point);
                self.finish_add_text(store)
            }
            Gesture::Dragging { .. } | Gesture::Resizing { .. } => self.commit(store, measure),
            _ => Ok(GestureOutcome::None),
        }
    }

    /// Commit whatever gesture is active: drags and resizes at their last
    /// candidate, text edits as confirmed. Add-text mode is cancelled.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn commit(
        &mut self,
        store: &mut ElementStore,
        measure: &dyn TextMeasure,
    ) -> CoreResult<GestureOutcome> {
        match std::mem::replace(&mut self.state, Gesture::Idle) {
            Gesture::Idle => Ok(GestureOutcome::None),
            Gesture::Dragging { id, candidate, .. } => {
                let element = store.update(id, &ElementPatch::position(candidate))?;
                tracing::debug!(%id, x = candidate.x, y = candidate.y, "drag committed");
                Ok(GestureOutcome::Committed(element))
            }
            Gesture::Resizing { id, candidate, .. } => {
                let element = store.update(id, &ElementPatch::bounds(candidate))?;
                let element = fit_content_height(store, measure, element)?;
                tracing::debug!(%id, bounds = ?element.bounds, "resize committed");
                Ok(GestureOutcome::Committed(element))
            }
            editing @ Gesture::EditingText { .. } => {
                self.state = editing;
                self.confirm_edit(store)
            }
            Gesture::AddingText { .. } => Ok(GestureOutcome::Cancelled),
        }
    }

    /// Drop the gesture in progress without touching the store.
    pub fn abandon(&mut self) {
        if !self.is_idle() {
            tracing::debug!(gesture = self.state.name(), "gesture abandoned");
        }
        self.state = Gesture::Idle;
    }

    fn finish_add_text(&mut self, store: &mut ElementStore) -> CoreResult<GestureOutcome> {
        let Gesture::AddingText {
            start: Some(start),
            current,
            rectangle,
        } = self.state
        else {
            return Ok(GestureOutcome::None);
        };

        let bounds = if rectangle {
            Bounds::from_corners(start, current)
        } else {
            Bounds::new(
                start.x,
                start.y,
                self.defaults.box_size.width,
                self.defaults.box_size.height,
            )
        };
        let page = store.current_page();
        let element = store.create_text_in(page, bounds, "", self.defaults.style.clone());
        store.select(element.id)?;
        self.state = Gesture::EditingText {
            id: element.id,
            original: String::new(),
            buffer: String::new(),
            base_height: element.bounds.height,
            visual_height: element.bounds.height,
        };
        Ok(GestureOutcome::Created(element))
    }

    /// Open a text edit on an element.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GestureRejected`] unless idle,
    /// [`CoreError::ElementNotFound`] if the element is not on the current
    /// page, or [`CoreError::InvalidOperation`] for image elements.
    pub fn begin_edit(&mut self, store: &mut ElementStore, id: ElementId) -> CoreResult<()> {
        if !self.is_idle() {
            return Err(self.reject("edit text"));
        }
        let element = store.get(id).ok_or(CoreError::ElementNotFound(id))?;
        let content = element
            .text_content()
            .ok_or_else(|| {
                CoreError::InvalidOperation(format!("element {id} does not hold text"))
            })?
            .to_string();
        let height = element.bounds.height;
        store.select(id)?;
        self.state = Gesture::EditingText {
            id,
            original: content.clone(),
            buffer: content,
            base_height: height,
            visual_height: height,
        };
        Ok(())
    }

    /// Replace the edit buffer and return the height the edit field should show.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] when no edit is open, or
    /// [`CoreError::ElementNotFound`] if the element disappeared.
    pub fn edit_input(
        &mut self,
        store: &ElementStore,
        measure: &dyn TextMeasure,
        text: &str,
    ) -> CoreResult<f32> {
        let Gesture::EditingText {
            id,
            buffer,
            base_height,
            visual_height,
            ..
        } = &mut self.state
        else {
            return Err(CoreError::InvalidOperation(
                "no text edit in progress".to_string(),
            ));
        };
        let element = store.get(*id).ok_or(CoreError::ElementNotFound(*id))?;
        let style = element.text_style().ok_or_else(|| {
            CoreError::InvalidOperation(format!("element {id} does not hold text"))
        })?;
        let needed = content_height(text, style, element.bounds.width, measure);
        *visual_height = base_height.max(needed);
        text.clone_into(buffer);
        Ok(*visual_height)
    }

    /// End the edit, writing content and height (or deleting the element when
    /// the content is blank). Also used for blur.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn confirm_edit(&mut self, store: &mut ElementStore) -> CoreResult<GestureOutcome> {
        if !matches!(self.state, Gesture::EditingText { .. }) {
            return Ok(GestureOutcome::None);
        }
        let Gesture::EditingText {
            id,
            buffer,
            visual_height,
            ..
        } = std::mem::replace(&mut self.state, Gesture::Idle)
        else {
            return Ok(GestureOutcome::None);
        };
        finish_edit(store, id, buffer, visual_height)
    }

    /// Cancel the gesture in progress.
    ///
    /// A text edit reverts to its original content and then finishes like a
    /// confirm. Add-text mode is left. Drags and resizes are unaffected; they
    /// only end on release.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn cancel(&mut self, store: &mut ElementStore) -> CoreResult<GestureOutcome> {
        match &self.state {
            Gesture::EditingText { .. } => {
                let Gesture::EditingText {
                    id,
                    original,
                    base_height,
                    ..
                } = std::mem::replace(&mut self.state, Gesture::Idle)
                else {
                    return Ok(GestureOutcome::None);
                };
                finish_edit(store, id, original, base_height)
            }
            Gesture::AddingText { .. } => {
                self.state = Gesture::Idle;
                Ok(GestureOutcome::Cancelled)
            }
            _ => Ok(GestureOutcome::None),
        }
    }
}

fn finish_edit(
    store: &mut ElementStore,
    id: ElementId,
    content: String,
    height: f32,
) -> CoreResult<GestureOutcome> {
    if content.trim().is_empty() {
        store.delete(id);
        tracing::debug!(%id, "blank text element removed");
        return Ok(GestureOutcome::Deleted(id));
    }
    let patch = ElementPatch::default()
        .with_content(content)
        .with_height(height);
    let element = store.update(id, &patch)?;
    tracing::debug!(%id, height, "text edit committed");
    Ok(GestureOutcome::Committed(element))
}

/// Grow a freshly resized text element so its content is not clipped.
fn fit_content_height(
    store: &mut ElementStore,
    measure: &dyn TextMeasure,
    element: Element,
) -> CoreResult<Element> {
    let needed = match (element.text_content(), element.text_style()) {
        (Some(content), Some(style)) if !content.is_empty() => {
            content_height(content, style, element.bounds.width, measure)
        }
        _ => return Ok(element),
    };
    if needed <= element.bounds.height {
        return Ok(element);
    }
    store.update(element.id, &ElementPatch::default().with_height(needed))
}
