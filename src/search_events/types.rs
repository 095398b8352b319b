//! Event type definitions for the search event system

use serde::{Deserialize, Serialize};

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Every selected project was searched
    Completed,
    /// `stop_searching` was called
    Stopped,
    /// A newer search replaced this one
    Superseded,
}

/// Events emitted while a search runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchEvent {
    /// Emitted after results were cleared and progress reset
    SearchStarted {
        generation: u64,
        query: String,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A request to `gitlab_id` is held back until its quota window resets
    RateLimitWaiting {
        generation: u64,
        gitlab_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// One project's search call finished (failed calls report zero results)
    ProjectSearched {
        generation: u64,
        gitlab_id: String,
        project_id: u64,
        results: usize,
        failed: bool,
        done: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Search ended and progress was cleared
    SearchFinished {
        generation: u64,
        reason: FinishReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SearchEvent {
    #[must_use]
    pub fn search_started(generation: u64, query: String, total: usize) -> Self {
        Self::SearchStarted {
            generation,
            query,
            total,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn rate_limit_waiting(generation: u64, gitlab_id: String) -> Self {
        Self::RateLimitWaiting {
            generation,
            gitlab_id,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn project_searched(
        generation: u64,
        gitlab_id: String,
        project_id: u64,
        results: usize,
        failed: bool,
        done: usize,
        total: usize,
    ) -> Self {
        Self::ProjectSearched {
            generation,
            gitlab_id,
            project_id,
            results,
            failed,
            done,
            total,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn search_finished(generation: u64, reason: FinishReason) -> Self {
        Self::SearchFinished {
            generation,
            reason,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Search run this event belongs to
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            Self::SearchStarted { generation, .. }
            | Self::RateLimitWaiting { generation, .. }
            | Self::ProjectSearched { generation, .. }
            | Self::SearchFinished { generation, .. } => *generation,
        }
    }
}
