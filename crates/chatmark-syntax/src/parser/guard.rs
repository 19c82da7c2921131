//! Bounds on parsing loops.
//!
//! Every block loop and every inline loop owns a [`LoopGuard`]. Each
//! iteration reports the cursor position; the guard aborts when the cursor
//! stops moving, when too many iterations in a row yield no block, or when
//! the loop has run longer than the configured time limit.

use std::time::{Duration, Instant};

use crate::config::ParserConfig;
use crate::error::{GuardScope, ParseError};

/// Iterations allowed at one position in a block loop.
pub(crate) const BLOCK_STALL_LIMIT: usize = 10;
/// Iterations allowed at one position in an inline loop.
pub(crate) const INLINE_STALL_LIMIT: usize = 50;
/// Consecutive block iterations allowed to produce nothing.
pub(crate) const EMPTY_BLOCK_LIMIT: usize = 50;
/// Tokens a code span may search for its closing run.
pub(crate) const CODE_SPAN_SCAN_LIMIT: usize = 1000;

#[derive(Debug)]
pub(crate) struct LoopGuard {
    scope: GuardScope,
    started: Instant,
    limit: Option<Duration>,
    last_position: Option<usize>,
    stalls: usize,
    max_stalls: usize,
    empty_runs: usize,
}

impl LoopGuard {
    fn new(scope: GuardScope, max_stalls: usize, limit: Option<Duration>) -> Self {
        Self {
            scope,
            started: Instant::now(),
            limit,
            last_position: None,
            stalls: 0,
            max_stalls,
            empty_runs: 0,
        }
    }

    pub(crate) fn block(config: &ParserConfig) -> Self {
        Self::new(GuardScope::Block, BLOCK_STALL_LIMIT, config.parsing_time_limit())
    }

    pub(crate) fn inline(config: &ParserConfig) -> Self {
        Self::new(GuardScope::Inline, INLINE_STALL_LIMIT, config.parsing_time_limit())
    }

    /// Called at the top of every iteration.
    pub(crate) fn check(&mut self, position: usize) -> Result<(), ParseError> {
        if self.limit.is_some_and(|limit| self.started.elapsed() > limit) {
            log::warn!("{} parsing exceeded its time limit", self.scope);
            return Err(ParseError::Timeout { scope: self.scope });
        }

        if self.last_position == Some(position) {
            self.stalls += 1;
            if self.stalls >= self.max_stalls {
                log::warn!("{} parser made no progress at token {position}", self.scope);
                return Err(ParseError::Stuck {
                    scope: self.scope,
                    position,
                });
            }
        } else {
            self.last_position = Some(position);
            self.stalls = 0;
        }
        Ok(())
    }

    /// An iteration produced a block.
    pub(crate) fn produced(&mut self) {
        self.empty_runs = 0;
    }

    /// An iteration produced nothing.
    pub(crate) fn empty(&mut self) -> Result<(), ParseError> {
        self.empty_runs += 1;
        if self.empty_runs >= EMPTY_BLOCK_LIMIT {
            log::warn!("{} consecutive empty blocks", self.empty_runs);
            return Err(ParseError::TooManyEmptyBlocks);
        }
        Ok(())
    }
}
