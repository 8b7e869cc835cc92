//! Resumable multi-mirror chunked downloads.
//!
//! An object served identically by several HTTP mirrors is split into
//! fixed-size chunks. Worker threads (several per mirror) claim chunks from
//! a shared [`queue::WorkQueue`], fetch them with ranged GETs and write them
//! into a [`sink::ByteSink`]. Every committed chunk is appended to a
//! [`journal::Journal`] so an interrupted download resumes where it left off.

pub mod config;
pub mod logging;

pub mod chunk;
pub mod control;
pub mod journal;
pub mod observer;
pub mod queue;
pub mod request;
pub mod session;
pub mod sink;
pub mod speed;
pub mod storage;
pub mod transport;

pub use session::{DownloadSession, SessionError, SessionOptions, SessionReport};
