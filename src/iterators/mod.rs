//! Iteration framework: index arithmetic, stepping strategies, value access
//! and the plain and composed field iterators built from them.

pub mod composed;
pub mod field;
pub mod index_space;
pub mod pure;
pub mod stepper;
pub mod value;

pub use composed::ComposedFieldIterator;
pub use field::{BoundaryIterator, FieldIterator};
pub use index_space::IndexSpace;
pub use pure::{PureFieldIterator, ValueFieldBoundaryIterator, ValueFieldIterator};
pub use stepper::{
    BoundaryStepper, BoundaryStepping, ExecutionContext, SteppingStrategy, WholeFieldStepper,
};
pub use value::{FieldData, ValueArray, ValueType};
