//! Element storage keyed by page, plus selection state.
//!
//! The store is the single owner of committed element state. Everything the
//! geometry engine shows while a gesture is in flight lives outside of it and
//! reaches the store through [`ElementStore::update`] exactly once per gesture.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    Bounds, CoreError, CoreResult, Element, ElementId, ElementPatch, Point, Size, TextStyle,
};

/// Size of a text box created from a single click.
pub const DEFAULT_TEXT_SIZE: Size = Size::new(200.0, 40.0);

/// Owns every element of a document, grouped per page in insertion order.
///
/// # Example
///
/// ```
/// use overlay_core::{ElementStore, Point, TextStyle};
///
/// let mut store = ElementStore::new();
/// let element = store.create_text(1, Point::new(20.0, 40.0), "Hello", TextStyle::default());
///
/// assert_eq!(store.list_for_page(1).len(), 1);
/// assert!(store.get(element.id).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ElementStore {
    /// Elements per page number, in insertion (z) order.
    pages: BTreeMap<u32, Vec<Element>>,
    /// Owning page of every element.
    index: HashMap<ElementId, u32>,
    /// Page the selection is scoped to.
    current_page: u32,
    /// Currently selected element.
    selected: Option<ElementId>,
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementStore {
    /// Create an empty store scoped to page 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
            index: HashMap::new(),
            current_page: 1,
            selected: None,
        }
    }

    /// Page the selection is currently scoped to.
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Create a default-sized text element with its top-left corner at `origin`.
    pub fn create_text(
        &mut self,
        page: u32,
        origin: Point,
        content: impl Into<String>,
        style: TextStyle,
    ) -> Element {
        let bounds = Bounds::new(
            origin.x,
            origin.y,
            DEFAULT_TEXT_SIZE.width,
            DEFAULT_TEXT_SIZE.height,
        );
        self.create_text_in(page, bounds, content, style)
    }

    /// Create a text element filling `bounds` (raised to the minimum size).
    pub fn create_text_in(
        &mut self,
        page: u32,
        bounds: Bounds,
        content: impl Into<String>,
        style: TextStyle,
    ) -> Element {
        self.insert(Element::text(page, bounds, content, style))
    }

    /// Create an image element at `origin` with the given intrinsic size.
    pub fn create_image(
        &mut self,
        page: u32,
        origin: Point,
        data: Vec<u8>,
        width: f32,
        height: f32,
    ) -> Element {
        self.insert(Element::image(page, origin, data, width, height))
    }

    fn insert(&mut self, element: Element) -> Element {
        tracing::debug!(id = %element.id, page = element.page, "element created");
        self.index.insert(element.id, element.page);
        self.pages
            .entry(element.page)
            .or_default()
            .push(element.clone());
        element
    }

    /// Apply a patch to an element and return its new state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the element does not exist, or
    /// [`CoreError::InvalidOperation`] if the patch does not fit the element.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> CoreResult<Element> {
        let element = self.get_mut(id).ok_or(CoreError::ElementNotFound(id))?;
        element.apply(patch)?;
        Ok(element.clone())
    }

    /// Remove an element. Returns `false` if it did not exist.
    pub fn delete(&mut self, id: ElementId) -> bool {
        let Some(page) = self.index.remove(&id) else {
            return false;
        };
        if let Some(elements) = self.pages.get_mut(&page) {
            elements.retain(|e| e.id != id);
            if elements.is_empty() {
                self.pages.remove(&page);
            }
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        tracing::debug!(%id, page, "element deleted");
        true
    }

    /// Delete the selected element, returning its id.
    pub fn delete_selected(&mut self) -> Option<ElementId> {
        let id = self.selected?;
        self.delete(id).then_some(id)
    }

    /// Select an element on the current page.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the element is not on the current page.
    pub fn select(&mut self, id: ElementId) -> CoreResult<()> {
        if self.index.get(&id) == Some(&self.current_page) {
            self.selected = Some(id);
            Ok(())
        } else {
            Err(CoreError::ElementNotFound(id))
        }
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Currently selected element.
    #[must_use]
    pub fn selected(&self) -> Option<&Element> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Id of the currently selected element.
    #[must_use]
    pub fn selected_id(&self) -> Option<ElementId> {
        self.selected
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        let page = self.index.get(&id)?;
        self.pages.get(page)?.iter().find(|e| e.id == id)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let page = self.index.get(&id)?;
        self.pages.get_mut(page)?.iter_mut().find(|e| e.id == id)
    }

    /// Elements of a page in insertion order (bottom to top).
    #[must_use]
    pub fn list_for_page(&self, page: u32) -> &[Element] {
        self.pages.get(&page).map_or(&[], Vec::as_slice)
    }

    /// Topmost element of `page` containing `point`.
    #[must_use]
    pub fn element_at(&self, page: u32, point: Point) -> Option<&Element> {
        self.list_for_page(page)
            .iter()
            .rev()
            .find(|e| e.contains_point(point))
    }

    /// Remove every element of a page.
    pub fn clear_page(&mut self, page: u32) {
        if let Some(elements) = self.pages.remove(&page) {
            for element in &elements {
                self.index.remove(&element.id);
                if self.selected == Some(element.id) {
                    self.selected = None;
                }
            }
        }
    }

    /// Remove every element of every page.
    pub fn clear_all(&mut self) {
        self.pages.clear();
        self.index.clear();
        self.selected = None;
    }

    /// Scope the store to another page. Always clears the selection.
    pub fn switch_page(&mut self, page: u32) {
        self.current_page = page;
        self.selected = None;
    }

    /// Iterate `(page, elements)` in ascending page order.
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[Element])> {
        self.pages.iter().map(|(page, elements)| (*page, elements.as_slice()))
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Serialize all elements to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        let snapshot = StoreSnapshot {
            current_page: self.current_page,
            elements: self.pages.values().flatten().cloned().collect(),
        };
        serde_json::to_string_pretty(&snapshot).map_err(CoreError::Serialization)
    }

    /// Rebuild a store from JSON produced by [`ElementStore::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or contains duplicate ids.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        let mut seen = HashSet::new();
        let mut store = Self::new();
        store.current_page = snapshot.current_page.max(1);
        for mut element in snapshot.elements {
            if !seen.insert(element.id) {
                return Err(CoreError::InvalidOperation(format!(
                    "duplicate element id {}",
                    element.id
                )));
            }
            element.bounds = element.bounds.with_min_size();
            store.index.insert(element.id, element.page);
            store.pages.entry(element.page).or_default().push(element);
        }
        Ok(store)
    }
}

/// Serialized form of an [`ElementStore`].
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    #[serde(default = "first_page")]
    current_page: u32,
    elements: Vec<Element>,
}

fn first_page() -> u32 {
    1
}
