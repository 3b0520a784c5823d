//! Database query layer for encuesta-srv

pub mod answers;
pub mod responses;
pub mod templates;
