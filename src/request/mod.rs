// src/request/mod.rs

//! Observation requests: the registration surface of a session.

pub mod model;
pub(crate) mod validate;

pub use model::{Discipline, SkipPattern, TailRequest, TrackRequest, TrackedValue};

pub(crate) use model::ObservationSpec;
pub(crate) use validate::{build_tail_spec, build_track_spec, check_exclusion};
