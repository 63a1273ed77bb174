#![forbid(unsafe_code)]

//! Subcommand bodies. Each writes JSON (or a bare link) to `out`.

use std::collections::VecDeque;
use std::io::Write;

use chime_core::{DisplayOptions, FieldValues, ParsedParameters, StoreSnapshot, Timestamp};
use chime_runtime::{Clock, DashboardConfig, Reconciler, SyncCmd, SyncEvent, SystemClock};
use chime_web::{ExportRequest, MAX_SETTLE_STEPS, export_href};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cli::{FragmentArgs, ParamsArgs, ReplayArgs};
use crate::error::{CliError, Result};

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// decode / params / export-query
// ---------------------------------------------------------------------------

pub fn run_decode(args: &FragmentArgs, config: &DashboardConfig, out: &mut impl Write) -> Result<()> {
    let values = config.codec().decode_fragment(&args.fragment);
    write_json(out, &values)
}

#[derive(Debug, Serialize)]
struct ParamsReport {
    parameters: ParsedParameters,
    display: DisplayOptions,
}

pub fn run_params(args: &ParamsArgs, config: &DashboardConfig, out: &mut impl Write) -> Result<()> {
    let codec = config.codec();
    let report = if args.query {
        let request = ExportRequest::from_query(&codec, &args.input)?;
        ParamsReport {
            parameters: request.params,
            display: request.display,
        }
    } else {
        let values = codec.decode_fragment(&args.input);
        ParamsReport {
            parameters: codec.to_parameters(&values)?,
            display: codec.display_options(&values),
        }
    };
    write_json(out, &report)
}

pub fn run_export_query(
    args: &FragmentArgs,
    config: &DashboardConfig,
    out: &mut impl Write,
) -> Result<()> {
    let codec = config.codec();
    let values = codec.decode_fragment(&args.fragment);
    let root = StoreSnapshot {
        values,
        modified_at: None,
    };
    writeln!(out, "{}", export_href(&codec, &root))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

/// One scripted browser event.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    /// Epoch milliseconds; the system clock when absent.
    #[serde(default)]
    pub at: Option<u64>,
    pub event: SyncEvent,
}

#[derive(Debug, Serialize)]
struct StepRecord<'a> {
    at: Timestamp,
    event: &'static str,
    echo: bool,
    commands: &'a [SyncCmd],
}

#[derive(Debug, Serialize)]
struct ReplaySummary<'a> {
    steps: usize,
    location_hash: &'a str,
    root: &'a StoreSnapshot,
    sidebar: &'a StoreSnapshot,
    errors: Vec<String>,
}

pub fn run_replay(args: &ReplayArgs, config: &DashboardConfig, out: &mut impl Write) -> Result<()> {
    let raw = std::fs::read_to_string(&args.script).map_err(|source| CliError::Script {
        path: args.script.clone(),
        source,
    })?;
    let script: Vec<ScriptStep> = serde_json::from_str(&raw)?;
    info!(steps = script.len(), echo = args.echo, "replaying script");

    let mut reconciler = Reconciler::from_config(config);
    let mut last: Option<Timestamp> = None;
    let mut steps = 0;
    for (index, step) in script.into_iter().enumerate() {
        let requested = step.at.map_or_else(|| SystemClock.now(), Timestamp::from_millis);
        let mut pending = VecDeque::from([(step.event, false)]);
        let mut dispatched = 0;
        while let Some((event, echo)) = pending.pop_front() {
            dispatched += 1;
            if dispatched > MAX_SETTLE_STEPS {
                return Err(CliError::NotSettled {
                    step: index,
                    limit: MAX_SETTLE_STEPS,
                });
            }
            // Browser events never share a modification time.
            let at = match last {
                Some(prev) if requested <= prev => Timestamp::from_millis(prev.as_millis().saturating_add(1)),
                _ => requested,
            };
            last = Some(at);

            let kind = event.kind();
            let commands = reconciler.dispatch(event, at)?;
            steps += 1;
            write_json(
                out,
                &StepRecord {
                    at,
                    event: kind,
                    echo,
                    commands: &commands,
                },
            )?;
            if args.echo {
                pending.extend(echoes(&commands).map(|event| (event, true)));
            }
        }
    }

    let errors = validation_messages(&reconciler, reconciler.root().values());
    write_json(
        out,
        &ReplaySummary {
            steps,
            location_hash: reconciler.location_hash(),
            root: reconciler.root().snapshot(),
            sidebar: reconciler.sidebar().snapshot(),
            errors,
        },
    )
}

/// Events a browser fires after applying `commands`.
fn echoes(commands: &[SyncCmd]) -> impl Iterator<Item = SyncEvent> + '_ {
    commands.iter().filter_map(|cmd| match cmd {
        SyncCmd::WriteHash(hash) => Some(SyncEvent::HashChanged(hash.clone())),
        SyncCmd::SetFormFields(fields) => Some(SyncEvent::FieldsSubmitted(fields.clone())),
        SyncCmd::RootChanged(_) => None,
    })
}

fn validation_messages(reconciler: &Reconciler, values: &FieldValues) -> Vec<String> {
    if values.is_empty() {
        return Vec::new();
    }
    match reconciler.codec().to_parameters(values) {
        Ok(_) => Vec::new(),
        Err(errors) => errors.errors().iter().map(ToString::to_string).collect(),
    }
}
