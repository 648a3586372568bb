//! Registry-backed values that appear inside packets and item components.

pub mod attribute;
pub mod painting;

pub use attribute::{AttributeDisplay, AttributeDisplayType, ATTRIBUTE_DISPLAY_TYPES};
pub use painting::{PaintingHolder, PaintingVariant, PaintingVariantComponent, PAINTING_VARIANTS};
