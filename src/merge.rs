/*!
 * Dual-track interval merge.
 *
 * Two independently timed tracks become one. A secondary caption whose
 * interval fits inside a primary caption's interval, widened by the time
 * shift on both sides, is appended to that primary caption as an extra line.
 * Everything else is interleaved by begin time.
 */

use std::collections::VecDeque;

use log::debug;

use crate::app_config::{Config, MergeStrategy, Precedence};
use crate::errors::SubtitleError;
use crate::script_classifier::{cjk_count, cjk_fraction, contains_cjk};
use crate::subtitle_processor::{Caption, Track};

/// Settings for a single merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub time_shift_ms: u64,
    pub precedence: Precedence,
    pub strategy: MergeStrategy,
}

impl MergeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            time_shift_ms: config.time_shift_ms,
            precedence: config.precedence,
            strategy: config.merge_strategy,
        }
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Order two tracks as `(primary, secondary)`. Ties keep the argument order.
pub fn order_by_precedence(a: Track, b: Track, rule: Precedence) -> (Track, Track) {
    let (text_a, text_b) = (a.text(), b.text());
    let b_wins = match rule {
        Precedence::CjkFraction => cjk_fraction(&text_a) < cjk_fraction(&text_b),
        Precedence::CjkCount => cjk_count(&text_a) < cjk_count(&text_b),
        Precedence::AnyCjk => !contains_cjk(&text_a) && contains_cjk(&text_b),
    };

    if b_wins { (b, a) } else { (a, b) }
}

fn nests(primary: &Caption, secondary: &Caption, shift: u64) -> bool {
    primary.begin_ms().saturating_sub(shift) <= secondary.begin_ms()
        && primary.end_ms() + shift >= secondary.end_ms()
}

enum Step {
    Absorb,
    EmitPrimary,
    EmitSecondary,
}

/// Nesting merge. A primary caption may absorb any number of secondaries;
/// its timestamps never change. Sorted inputs give sorted output.
pub fn merge_tracks(primary: Track, secondary: Track, time_shift_ms: u64) -> Track {
    let capacity = primary.len() + secondary.len();
    let mut primary: VecDeque<Caption> = primary.into_captions().into();
    let mut secondary: VecDeque<Caption> = secondary.into_captions().into();
    let mut merged = Vec::with_capacity(capacity);
    let mut absorbed = 0usize;

    loop {
        let step = match (primary.front(), secondary.front()) {
            (Some(p), Some(s)) if nests(p, s, time_shift_ms) => Step::Absorb,
            (Some(p), Some(s)) if p.begin_ms() < s.begin_ms() => Step::EmitPrimary,
            (Some(_), Some(_)) => Step::EmitSecondary,
            _ => break,
        };

        match step {
            Step::Absorb => {
                if let (Some(s), Some(p)) = (secondary.pop_front(), primary.front_mut()) {
                    p.absorb(s);
                    absorbed += 1;
                }
            }
            Step::EmitPrimary => merged.extend(primary.pop_front()),
            Step::EmitSecondary => merged.extend(secondary.pop_front()),
        }
    }

    merged.extend(primary);
    merged.extend(secondary);

    debug!("Nesting merge: {} captions, {} secondary lines absorbed", merged.len(), absorbed);
    Track::from_captions(merged)
}

/// Lock-step merge. Each decision consumes one caption from either side or
/// one from both; a primary absorbs at most one secondary and only begin
/// times are compared.
pub fn merge_lock_step(primary: Track, secondary: Track, time_shift_ms: u64) -> Track {
    let capacity = primary.len() + secondary.len();
    let mut primary: VecDeque<Caption> = primary.into_captions().into();
    let mut secondary: VecDeque<Caption> = secondary.into_captions().into();
    let mut merged = Vec::with_capacity(capacity);

    let (mut t1, mut t2) = (0u64, 0u64);
    while !primary.is_empty() || !secondary.is_empty() {
        if let Some(p) = primary.front() {
            t1 = p.begin_ms();
        }
        if let Some(s) = secondary.front() {
            t2 = s.begin_ms();
        }

        // Which side waits this round
        let hold_primary = primary.is_empty() || (t1 > t2 + time_shift_ms && !secondary.is_empty());
        let hold_secondary =
            !hold_primary && (secondary.is_empty() || (t2 > t1 + time_shift_ms && !primary.is_empty()));

        let mut current = None;
        if !hold_primary {
            current = primary.pop_front();
            if hold_secondary {
                merged.extend(current.take());
            }
        }
        if !hold_secondary {
            match (current.take(), secondary.pop_front()) {
                (Some(mut p), Some(s)) => {
                    p.absorb(s);
                    merged.push(p);
                }
                (Some(c), None) | (None, Some(c)) => merged.push(c),
                (None, None) => {}
            }
        }
    }

    debug!("Lock-step merge: {} captions", merged.len());
    Track::from_captions(merged)
}

/// Order, then merge with the configured strategy. Both inputs must have captions.
pub fn merge_pair(a: Track, b: Track, options: &MergeOptions) -> Result<Track, SubtitleError> {
    if a.is_empty() {
        return Err(SubtitleError::EmptySource("first track".to_string()));
    }
    if b.is_empty() {
        return Err(SubtitleError::EmptySource("second track".to_string()));
    }

    let (primary, secondary) = order_by_precedence(a, b, options.precedence);
    let merged = match options.strategy {
        MergeStrategy::Nesting => merge_tracks(primary, secondary, options.time_shift_ms),
        MergeStrategy::LockStep => merge_lock_step(primary, secondary, options.time_shift_ms),
    };
    Ok(merged)
}
