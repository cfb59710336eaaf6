//! Command execution
//!
//! Commands run in order against one [`Session`]. The first failing command
//! stops the script; entities registered before it stay registered.

use std::io::Write;
use std::rc::Rc;
use tracing::debug;

use crate::core::error::{Result, SlatError};
use crate::core::registry::Registry;
use crate::core::session::Session;
use crate::entities::compgroup::ComponentGroup;
use crate::entities::detfn::{DetFn, DetFnKind, DetFnParams};
use crate::entities::edp::DemandParameter;
use crate::entities::fragility::FragilityFn;
use crate::entities::im::IntensityMeasure;
use crate::entities::lossfn::LossFn;
use crate::entities::probfn::ProbFn;
use crate::entities::structure::Structure;
use crate::math::integration::{IntegrationMethod, SearchMethod};
use crate::math::lognormal::{LogNormalDist, MuType, SigmaType};
use crate::recorder::sink::{open_output, resolve_path};
use crate::recorder::{Destination, Recorder, RecorderOptions};
use crate::script::command::*;
use crate::script::import;

/// How much of a script to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run every command
    Execute,
    /// Run everything except `analyze` and output commands
    Check,
}

/// Run `script` against `session`, returning the number of commands run
pub fn run(session: &mut Session, script: &Script, mode: Mode) -> Result<usize> {
    let mut executed = 0;
    for (i, command) in script.commands.iter().enumerate() {
        let skip = match mode {
            Mode::Execute => false,
            Mode::Check => matches!(command, Command::Analyze | Command::Print(_) | Command::IntStats(_)),
        };
        if skip {
            debug!(index = i + 1, command = command.name(), "skipped");
            continue;
        }
        debug!(index = i + 1, command = command.name(), "executing");
        execute(session, command).map_err(|e| SlatError::in_command(i + 1, command.name(), e))?;
        executed += 1;
    }
    Ok(executed)
}

/// Execute one command
pub fn execute(session: &mut Session, command: &Command) -> Result<()> {
    match command {
        Command::Title(title) => {
            session.add_title(title.clone());
            Ok(())
        }
        Command::Print(args) => print(session, args),
        Command::DetFn(args) => {
            let f = detfn(args)?;
            register(&mut session.detfns, &args.id, f);
            Ok(())
        }
        Command::ProbFn(args) => {
            let f = probfn(session, args)?;
            register(&mut session.probfns, &args.id, f);
            Ok(())
        }
        Command::Im(args) => {
            let rate = session.detfns.lookup(&args.function)?;
            register(&mut session.ims, &args.id, IntensityMeasure::new(&args.id, rate));
            Ok(())
        }
        Command::Collapse(args) => {
            let im = session.ims.lookup(&args.im)?;
            im.set_collapse(curve(args)?)
        }
        Command::Demolition(args) => {
            let im = session.ims.lookup(&args.im)?;
            im.set_demolition(curve(args)?)
        }
        Command::Edp(args) => {
            let im = session.ims.lookup(&args.im)?;
            let demand = session.probfns.lookup(&args.function)?;
            register(&mut session.edps, &args.id, DemandParameter::new(&args.id, im, demand));
            Ok(())
        }
        Command::FragFn(args) => {
            let f = fragfn(args)?;
            register(&mut session.fragfns, &args.id, f);
            Ok(())
        }
        Command::LossFn(args) => {
            let f = lossfn(args)?;
            register(&mut session.lossfns, &args.id, f);
            Ok(())
        }
        Command::CompGroup(args) => {
            let g = compgroup(session, args)?;
            register(&mut session.compgroups, &args.id, g);
            Ok(())
        }
        Command::Structure(args) => structure(session, args),
        Command::RebuildCost(args) => {
            let s = session.structures.lookup(&args.structure)?;
            s.set_rebuild_cost(structure_cost(args)?);
            Ok(())
        }
        Command::DemolitionCost(args) => {
            let s = session.structures.lookup(&args.structure)?;
            s.set_demolition_cost(structure_cost(args)?);
            Ok(())
        }
        Command::ImportProbFn(args) => {
            let path = resolve_path(&args.file, session.input_dir(), "csv");
            let f = import::import_probfn(&args.id, &path)?;
            register(&mut session.probfns, &args.id, f);
            Ok(())
        }
        Command::ImportImFn(args) => {
            let path = resolve_path(&args.file, session.input_dir(), "csv");
            let im = import::import_im(&args.id, &path)?;
            register(&mut session.ims, &args.id, im);
            Ok(())
        }
        Command::Integration(args) => integration(session, args),
        Command::IntStats(IntStatsAction::Print) => {
            let stats = session.integrator().stats().snapshot();
            writeln!(session.console(), "{}", stats)?;
            Ok(())
        }
        Command::IntStats(IntStatsAction::Reset) => {
            session.integrator().stats().reset();
            Ok(())
        }
        Command::Recorder(args) => {
            let recorder = recorder(session, args)?;
            session.add_recorder(recorder);
            Ok(())
        }
        Command::Analyze => session.analyze(),
    }
}

fn register<T>(registry: &mut Registry<T>, id: &str, value: T) {
    if registry.insert(id, Rc::new(value)) {
        debug!(kind = %registry.kind(), id, "redefined");
    } else {
        debug!(kind = %registry.kind(), id, "defined");
    }
}

fn print(session: &mut Session, args: &PrintArgs) -> Result<()> {
    let mut lines = Vec::new();
    if args.title {
        lines.extend(session.titles().iter().cloned());
    }
    if let Some(message) = &args.message {
        lines.push(message.clone());
    }
    if let Some(entity) = &args.entity {
        lines.push(session.describe(entity.kind, &entity.id)?);
    }

    match &args.filename {
        None => {
            let console = session.console();
            for line in &lines {
                writeln!(console, "{}", line)?;
            }
            console.flush()?;
        }
        Some(name) => {
            let path = resolve_path(name, session.output_dir(), "txt");
            let mut out = open_output(&path, args.append)?;
            for line in &lines {
                writeln!(out, "{}", line).map_err(|e| SlatError::io(&path, e))?;
            }
            out.flush().map_err(|e| SlatError::io(&path, e))?;
        }
    }
    Ok(())
}

fn detfn(args: &DetFnArgs) -> Result<DetFn> {
    let kind: DetFnKind = args.kind.parse()?;
    let params = if kind.is_interpolated() {
        match (&args.x, &args.y) {
            (Some(x), Some(y)) => DetFnParams::Table {
                x: x.clone(),
                y: y.clone(),
            },
            _ => {
                return Err(SlatError::invalid(
                    format!("parameters of detfn '{}'", args.id),
                    "missing x or y",
                    &["x: [...] and y: [...] for interpolated functions"],
                ))
            }
        }
    } else {
        match &args.parameters {
            Some(p) => DetFnParams::Formula(p.clone()),
            None => {
                return Err(SlatError::invalid(
                    format!("parameters of detfn '{}'", args.id),
                    "missing parameters",
                    &["parameters: [...] for formula functions"],
                ))
            }
        }
    };
    DetFn::new(Some(args.id.clone()), kind, params)
}

fn probfn(session: &Session, args: &ProbFnArgs) -> Result<ProbFn> {
    if !args.kind.eq_ignore_ascii_case("lognormal") {
        return Err(SlatError::invalid("probfn type", &args.kind, &["lognormal"]));
    }
    let mu_type: MuType = args.mu.role.parse()?;
    let sigma_type: SigmaType = args.sigma.role.parse()?;
    let mu_fn = session.detfns.lookup(&args.mu.function)?;
    let sigma_fn = session.detfns.lookup(&args.sigma.function)?;
    Ok(ProbFn::new(&args.id, mu_type, mu_fn, sigma_type, sigma_fn))
}

/// Parse optional roles, falling back to the given defaults
fn roles(
    mu_role: &Option<String>,
    sigma_role: &Option<String>,
    defaults: (MuType, SigmaType),
) -> Result<(MuType, SigmaType)> {
    let mu = match mu_role {
        Some(r) => r.parse()?,
        None => defaults.0,
    };
    let sigma = match sigma_role {
        Some(r) => r.parse()?,
        None => defaults.1,
    };
    Ok((mu, sigma))
}

fn curve(args: &CurveArgs) -> Result<LogNormalDist> {
    let (mu_type, sigma_type) = roles(&args.mu_role, &args.sigma_role, (MuType::MedianX, SigmaType::SdLnX))?;
    Ok(LogNormalDist::from_parameters(args.mu, mu_type, args.sigma, sigma_type))
}

fn structure_cost(args: &StructureCostArgs) -> Result<LogNormalDist> {
    let (mu_type, sigma_type) = roles(&args.mu_role, &args.sigma_role, (MuType::MeanX, SigmaType::SdLnX))?;
    Ok(LogNormalDist::from_parameters(args.mu, mu_type, args.sigma, sigma_type))
}

/// Turn `[mu, sigma]` pairs into distributions
fn state_dists(
    what: &str,
    id: &str,
    states: impl Iterator<Item = Option<Vec<f64>>>,
    roles: (MuType, SigmaType),
) -> Result<Vec<LogNormalDist>> {
    states
        .enumerate()
        .map(|(i, state)| match state.as_deref() {
            None => Ok(LogNormalDist::zero()),
            Some([mu, sigma]) => Ok(LogNormalDist::from_parameters(*mu, roles.0, *sigma, roles.1)),
            Some(other) => Err(SlatError::shape(
                format!("damage state {} of {} '{}'", i + 1, what, id),
                2,
                other.len(),
            )),
        })
        .collect()
}

fn fragfn(args: &FragFnArgs) -> Result<FragilityFn> {
    let roles = roles(&args.mu_role, &args.sigma_role, (MuType::MedianX, SigmaType::SdLnX))?;
    let onsets = state_dists("fragfn", &args.id, args.states.iter().cloned().map(Some), roles)?;
    FragilityFn::new(&args.id, onsets)
}

fn lossfn(args: &LossFnArgs) -> Result<LossFn> {
    if !args.kind.eq_ignore_ascii_case("simple") {
        return Err(SlatError::invalid("lossfn type", &args.kind, &["simple"]));
    }
    let roles = roles(&args.mu_role, &args.sigma_role, (MuType::MeanX, SigmaType::SdLnX))?;
    let states = state_dists("lossfn", &args.id, args.states.iter().cloned(), roles)?;
    LossFn::new(&args.id, states)
}

fn compgroup(session: &Session, args: &CompGroupArgs) -> Result<ComponentGroup> {
    let edp = session.edps.lookup(&args.edp)?;
    let fragility = session.fragfns.lookup(&args.fragfn)?;
    let cost = session.lossfns.lookup(&args.cost)?;
    let delay = args
        .delay
        .as_deref()
        .map(|d| session.lossfns.lookup(d))
        .transpose()?;
    ComponentGroup::new(&args.id, edp, fragility, cost, delay, args.count)?
        .with_factors(args.cost_factor.unwrap_or(1.0), args.delay_factor.unwrap_or(1.0))
}

fn structure(session: &mut Session, args: &StructureArgs) -> Result<()> {
    let groups = args
        .groups
        .iter()
        .map(|g| session.compgroups.lookup(g))
        .collect::<Result<Vec<_>>>()?;

    let s = match session.structures.get(&args.id) {
        Some(existing) => existing,
        None => {
            let s = Rc::new(Structure::new(&args.id));
            session.structures.insert(&args.id, Rc::clone(&s));
            debug!(id = %args.id, "structure defined");
            s
        }
    };
    for g in groups {
        s.add_comp_group(g)?;
    }
    Ok(())
}

fn integration(session: &mut Session, args: &IntegrationArgs) -> Result<()> {
    let mut config = *session.integrator().config();
    if let Some(method) = &args.method {
        config.method = method.parse::<IntegrationMethod>()?;
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(max_evals) = args.max_evals {
        config.max_evals = max_evals;
    }
    if let Some(search) = &args.search {
        config.search = search.parse::<SearchMethod>()?;
    }
    if let Some(limit) = args.search_limit {
        config.search_limit = limit;
    }
    debug!(?config, "integration settings");
    session.integrator_mut().set_config(config)
}

fn recorder(session: &Session, args: &RecorderArgs) -> Result<Recorder> {
    let expected = args.kind.target_kind();
    let target = match session.target(expected, &args.target) {
        Ok(t) => t,
        Err(err) => {
            return Err(match session.kind_of(&args.target) {
                Some(found) => SlatError::TargetMismatch {
                    recorder: args.id.clone(),
                    kind: args.kind.to_string(),
                    target: args.target.clone(),
                    expected,
                    found,
                },
                None => err,
            })
        }
    };

    let grid = args
        .at
        .as_ref()
        .map(|g| g.resolve(&format!("recorder '{}'", args.id)))
        .transpose()?;

    let destination = match &args.filename {
        Some(name) => Destination::file(name, session.output_dir(), args.append),
        None => Destination::Console,
    };
    let options = RecorderOptions {
        destination,
        discount_rate: args.discount_rate,
        normalise: args.normalise,
        structcost: args.structcost,
    };

    Recorder::new(&args.id, args.kind, target, options, args.columns.clone(), grid)
}
