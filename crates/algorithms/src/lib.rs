//! # Topotrace Algorithms
//!
//! Geometry operations and boundary tracing on top of `topotrace-core`.
//!
//! ## Components
//!
//! - **engine**: Overlay, DE-9IM predicates, buffers, split, reshape,
//!   subdivide, metrics, Delaunay/Voronoi, validity
//! - **tracer**: Shortest paths along the boundaries of layer features

pub mod engine;
pub mod tracer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{
        BufferParams, BufferSide, EndCapStyle, EngineContext, EngineError, GeometryEngine,
        JoinStyle, Matrix, OperationResult, Predicate, SplitOutcome, ValidityError,
    };
    pub use crate::tracer::{PathError, Tracer, TracerState};
    pub use topotrace_core::prelude::*;
}
