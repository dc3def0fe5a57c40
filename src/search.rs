//! Quality/scale search that converges on a byte budget.
//!
//! The search is a small state machine over `(quality, scale)`:
//!
//! ```text
//! encode at (q, s)
//!   ├─ size <= target                       → Accepted
//!   ├─ q <= min_q and width/height at floor → ForcedStop
//!   ├─ q >  min_q                           → q = max(min_q, ⌊q × quality_decay⌋)
//!   └─ otherwise                            → s = s × scale_decay
//! iteration += 1; iteration >= max_iterations → IterationCapReached
//! ```
//!
//! [`advance`] is the pure transition function: it only sees the current
//! state, the size and dimensions of the candidate just produced, and the
//! request. [`run_search`] drives it against an [`ImageBackend`], so the
//! stopping rules can be tested without encoding anything.
//!
//! Quality falls by a fixed factor to a hard floor in a bounded number of
//! steps, then scale falls by another fixed factor. Neither ever increases,
//! and the iteration cap bounds the loop even when a floor is never reached.

use crate::cancel::CancelToken;
use crate::imaging::{
    BackendError, Candidate, Dimensions, EncodeParams, ImageBackend, Quality, at_dimension_floor,
    decay_quality,
};
use crate::types::{CompressionRequest, StopReason};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Encoding candidate failed: {0}")]
    Encode(#[from] BackendError),
    #[error("Search cancelled")]
    Cancelled,
}

/// Position of the search between two encodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    pub quality: u8,
    pub scale: f64,
    /// Number of candidates produced so far.
    pub iteration: u32,
}

impl SearchState {
    pub fn initial(request: &CompressionRequest) -> Self {
        Self {
            quality: request.initial_quality,
            scale: 1.0,
            iteration: 0,
        }
    }
}

/// What the transition needs to know about the candidate just encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub size: u64,
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Continue(SearchState),
    Stop(StopReason),
}

/// Pure transition: decide whether `sample` ends the search, or where to go next.
pub fn advance(state: SearchState, sample: Sample, request: &CompressionRequest) -> Transition {
    if sample.size <= request.target_bytes {
        return Transition::Stop(StopReason::Accepted);
    }
    if state.quality <= request.min_quality
        && at_dimension_floor(sample.dimensions.as_tuple(), request.dimension_floor())
    {
        return Transition::Stop(StopReason::ForcedStop);
    }

    let mut next = state;
    if state.quality > request.min_quality {
        next.quality = decay_quality(state.quality, request.min_quality, request.quality_decay);
    } else {
        next.scale = state.scale * request.scale_decay;
    }
    next.iteration += 1;

    if next.iteration >= request.max_iterations {
        Transition::Stop(StopReason::IterationCap)
    } else {
        Transition::Continue(next)
    }
}

/// Terminal outcome, carrying the one candidate that survives the search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Accepted(Candidate),
    ForcedStop(Candidate),
    IterationCapReached(Candidate),
}

impl SearchOutcome {
    fn new(reason: StopReason, candidate: Candidate) -> Self {
        match reason {
            StopReason::Accepted => SearchOutcome::Accepted(candidate),
            StopReason::ForcedStop => SearchOutcome::ForcedStop(candidate),
            StopReason::IterationCap => SearchOutcome::IterationCapReached(candidate),
        }
    }

    pub fn stop_reason(&self) -> StopReason {
        match self {
            SearchOutcome::Accepted(_) => StopReason::Accepted,
            SearchOutcome::ForcedStop(_) => StopReason::ForcedStop,
            SearchOutcome::IterationCapReached(_) => StopReason::IterationCap,
        }
    }

    pub fn candidate(&self) -> &Candidate {
        match self {
            SearchOutcome::Accepted(c)
            | SearchOutcome::ForcedStop(c)
            | SearchOutcome::IterationCapReached(c) => c,
        }
    }

    pub fn into_candidate(self) -> Candidate {
        match self {
            SearchOutcome::Accepted(c)
            | SearchOutcome::ForcedStop(c)
            | SearchOutcome::IterationCapReached(c) => c,
        }
    }
}

/// One encode, kept for diagnostics after its bytes are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub quality: u8,
    pub scale: f64,
    pub dimensions: Dimensions,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub attempts: Vec<Attempt>,
}

impl SearchReport {
    pub fn iterations(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Run the search for `image` until a terminal condition.
///
/// `cancel` is checked before every encode; cancellation returns
/// [`SearchError::Cancelled`] and drops all candidates.
pub fn run_search(
    backend: &impl ImageBackend,
    image: &RgbImage,
    request: &CompressionRequest,
    cancel: &CancelToken,
) -> Result<SearchReport, SearchError> {
    let mut state = SearchState::initial(request);
    let mut attempts = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let params = EncodeParams::new(Quality::new(state.quality.into()), state.scale);
        let candidate = backend.encode(image, params)?;
        let sample = Sample {
            size: candidate.size(),
            dimensions: candidate.dimensions,
        };
        debug!(
            iteration = state.iteration,
            quality = state.quality,
            scale = state.scale,
            width = sample.dimensions.width,
            height = sample.dimensions.height,
            size = sample.size,
            target = request.target_bytes,
            "candidate encoded"
        );
        attempts.push(Attempt {
            quality: candidate.quality,
            scale: candidate.scale,
            dimensions: candidate.dimensions,
            size: sample.size,
        });

        match advance(state, sample, request) {
            Transition::Continue(next) => state = next,
            Transition::Stop(reason) => {
                return Ok(SearchReport {
                    outcome: SearchOutcome::new(reason, candidate),
                    attempts,
                });
            }
        }
    }
}
