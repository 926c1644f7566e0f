//! Event results produced by algorithm steps.

pub mod handler;
pub mod tree;

pub use handler::{EventHandle, ResultHandler};
pub use tree::{
    AnnotationCollection, Event, LabelAnnotation, PointAnnotation, ResultSet, ScenarioResultSet,
    SegmentAnnotation, SymbolResultSet,
};
