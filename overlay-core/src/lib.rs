//! # PDF Overlay Core
//!
//! Element model and interaction logic for placing text and images on top of
//! rendered PDF pages. Nothing in this crate renders; it produces committed
//! element geometry in overlay space and the page mappings needed to move it
//! into page space.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               EditorSession                 │
//! ├─────────────────────────────────────────────┤
//! │  Viewport        │  Gesture Engine          │
//! │  - Zoom / fit    │  - Drag / resize         │
//! │  - Navigation    │  - Text edit auto-grow   │
//! │                  │  - Add-text capture      │
//! ├─────────────────────────────────────────────┤
//! │  Element Store   │  Coordinate Transform    │
//! │  - Pages         │  - Overlay → page points │
//! │  - Selection     │  - Y-axis flip           │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod element;
pub mod error;
pub mod event;
pub mod gesture;
pub mod handle;
pub mod measure;
pub mod session;
pub mod source;
pub mod store;
pub mod transform;
pub mod upload;
pub mod viewport;

pub use element::{
    Bounds, Element, ElementId, ElementKind, ElementPatch, ImageFormat, Point, Rgb, Size,
    TextStyle, MIN_HEIGHT, MIN_WIDTH,
};
pub use error::{CoreError, CoreResult};
pub use event::{PointerEvent, PointerPhase};
pub use gesture::{Gesture, GestureEngine, GestureOutcome, Preview, TextDefaults};
pub use handle::ResizeHandle;
pub use measure::{FixedAdvance, TextMeasure};
pub use session::{EditorSession, PointerResponse, SessionConfig};
pub use source::{RasterizationService, RenderedPage};
pub use store::ElementStore;
pub use transform::{ExportPoint, ExportRect, PageMapping};
pub use upload::{ImageUpload, UploadLimits};
pub use viewport::{Viewport, ViewportConfig};

/// Overlay core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
