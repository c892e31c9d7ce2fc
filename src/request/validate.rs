// src/request/validate.rs

//! Registration-time validation: turns raw requests into compiled
//! [`ObservationSpec`]s.
//!
//! Everything that can be rejected synchronously is rejected here — glob
//! syntax, label/tracked-value co-constraints, capture-group arity — so
//! workers never have to surface configuration mistakes asynchronously.

use crate::errors::{MonitorError, Result};
use crate::parse::Matcher;
use crate::request::model::{
    Discipline, ObservationSpec, TailRequest, TrackRequest, TrackedValue,
};
use crate::watch::patterns::compile_glob;

pub(crate) fn build_track_spec(request: TrackRequest) -> Result<ObservationSpec> {
    check_globs(&request.globs)?;
    let matchers = build_matchers(
        request.tracked,
        request.labels,
        Discipline::Snapshot,
    )?;

    Ok(ObservationSpec {
        discipline: Discipline::Snapshot,
        globs: request.globs,
        matchers,
        callback: request.callback,
        snapshot_parser: request.parser,
        delta_parser: None,
        parser_args: request.parser_args,
        static_read: request.static_read,
        file_type: request.file_type,
        skip_lines: Vec::new(),
    })
}

pub(crate) fn build_tail_spec(request: TailRequest) -> Result<ObservationSpec> {
    check_globs(&request.globs)?;

    if request.parser.is_some() && !(request.tracked.is_empty() && request.labels.is_empty()) {
        return Err(MonitorError::ParserFilterConflict);
    }

    let matchers = build_matchers(
        request.tracked,
        request.labels,
        Discipline::Incremental,
    )?;

    Ok(ObservationSpec {
        discipline: Discipline::Incremental,
        globs: request.globs,
        matchers,
        callback: request.callback,
        snapshot_parser: None,
        delta_parser: request.parser,
        parser_args: request.parser_args,
        static_read: false,
        file_type: None,
        skip_lines: request.skip_lines,
    })
}

fn check_globs(globs: &[String]) -> Result<()> {
    for glob in globs {
        compile_glob(glob)?;
    }
    Ok(())
}

/// Pair tracked values with their positional labels and enforce the label
/// constraints of the given discipline.
///
/// Snapshot entries filter payload keys, so the matched key itself is always
/// an acceptable label and explicit labels are optional renames. Incremental
/// entries extract from raw lines: only a two-capture-group regex carries
/// its own label, everything else needs an explicit one.
fn build_matchers(
    tracked: Vec<TrackedValue>,
    labels: Vec<Option<String>>,
    discipline: Discipline,
) -> Result<Vec<Matcher>> {
    if !labels.is_empty() && labels.len() != tracked.len() {
        return Err(MonitorError::LabelCountMismatch {
            labels: labels.len(),
            tracked: tracked.len(),
        });
    }

    let mut labels = labels.into_iter();
    let mut matchers = Vec::with_capacity(tracked.len());

    for value in tracked {
        let label = labels.next().flatten();

        let matcher = match value {
            TrackedValue::Key(text) => {
                if discipline == Discipline::Incremental && label.is_none() {
                    return Err(MonitorError::LabelRequired { pattern: text });
                }
                Matcher::Literal { text, label }
            }
            TrackedValue::Pattern(regex) => {
                if discipline == Discipline::Incremental {
                    let groups = regex.captures_len() - 1;
                    if groups > 2 {
                        return Err(MonitorError::TooManyCaptures {
                            pattern: regex.as_str().to_string(),
                        });
                    }
                    if groups < 2 && label.is_none() {
                        return Err(MonitorError::LabelRequired {
                            pattern: regex.as_str().to_string(),
                        });
                    }
                }
                Matcher::Pattern { regex, label }
            }
        };
        matchers.push(matcher);
    }

    Ok(matchers)
}

/// Validate a single exclusion pattern.
pub(crate) fn check_exclusion(pattern: &str) -> Result<()> {
    compile_glob(pattern).map(|_| ())
}
