// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use mvv_cli::parse_recording;
use mvv_consensus::LinkageMethod;
use mvv_core::{
    BudgetMode, Constraints, MvvError, Recording, SweepContext, SweepDiagnostics,
};
use mvv_eval::{
    ConfusionCounts, EvalConfig, LabelPolarity, ScenarioVerdict, SweepResult, WindowEvaluator,
};
use mvv_reduce::{
    McdConfig, PcaMahalanobis, PcaMahalanobisConfig, ScoreReducer, WaveletMahalanobis,
    DEFAULT_NUM_COMPONENTS,
};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

struct Cli {
    command: Command,
}

enum Command {
    Sweep(SweepArgs),
    Verify(VerifyArgs),
}

#[derive(Debug)]
struct SweepArgs {
    reducer: ReducerArg,
    num_pcs: usize,
    num_pcs_explicit: bool,
    seed: Option<u64>,
    thresholds: Vec<f64>,
    window_sizes: Vec<usize>,
    stride: usize,
    degeneracy_threshold: f64,
    polarity: PolarityArg,
    linkage: LinkageArg,
    time_budget_ms: Option<u64>,
    window_budget_ms: Option<u64>,
    soft_budget: bool,
    input: PathBuf,
    output: Option<PathBuf>,
}

impl Default for SweepArgs {
    fn default() -> Self {
        Self {
            reducer: ReducerArg::Pca,
            num_pcs: DEFAULT_NUM_COMPONENTS,
            num_pcs_explicit: false,
            seed: None,
            thresholds: vec![1.3, 1.5],
            window_sizes: vec![200, 250],
            stride: 1,
            degeneracy_threshold: mvv_consensus::DEFAULT_DEGENERACY_THRESHOLD,
            polarity: PolarityArg::NonOverlap,
            linkage: LinkageArg::Average,
            time_budget_ms: None,
            window_budget_ms: None,
            soft_budget: false,
            input: PathBuf::new(),
            output: None,
        }
    }
}

#[derive(Debug)]
struct VerifyArgs {
    reducer: ReducerArg,
    num_pcs: usize,
    num_pcs_explicit: bool,
    seed: Option<u64>,
    thresholds: Vec<f64>,
    degeneracy_threshold: f64,
    linkage: LinkageArg,
    input: PathBuf,
    output: Option<PathBuf>,
}

impl Default for VerifyArgs {
    fn default() -> Self {
        Self {
            reducer: ReducerArg::Pca,
            num_pcs: DEFAULT_NUM_COMPONENTS,
            num_pcs_explicit: false,
            seed: None,
            thresholds: vec![1.3],
            degeneracy_threshold: mvv_consensus::DEFAULT_DEGENERACY_THRESHOLD,
            linkage: LinkageArg::Average,
            input: PathBuf::new(),
            output: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ReducerArg {
    Pca,
    Wavelet,
}

impl ReducerArg {
    fn parse(raw: &str) -> Result<Self, CliError> {
        match raw.to_ascii_lowercase().as_str() {
            "pca" => Ok(Self::Pca),
            "wavelet" => Ok(Self::Wavelet),
            _ => Err(CliError::invalid_input(format!(
                "invalid --reducer '{raw}'; expected one of: pca, wavelet"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum PolarityArg {
    NonOverlap,
    Overlap,
}

impl PolarityArg {
    fn parse(raw: &str) -> Result<Self, CliError> {
        match raw.to_ascii_lowercase().as_str() {
            "non-overlap" | "non_overlap" => Ok(Self::NonOverlap),
            "overlap" => Ok(Self::Overlap),
            _ => Err(CliError::invalid_input(format!(
                "invalid --polarity '{raw}'; expected one of: non-overlap, overlap"
            ))),
        }
    }

    fn to_polarity(self) -> LabelPolarity {
        match self {
            Self::NonOverlap => LabelPolarity::NonOverlap,
            Self::Overlap => LabelPolarity::Overlap,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum LinkageArg {
    Average,
    Single,
}

impl LinkageArg {
    fn parse(raw: &str) -> Result<Self, CliError> {
        match raw.to_ascii_lowercase().as_str() {
            "average" => Ok(Self::Average),
            "single" => Ok(Self::Single),
            _ => Err(CliError::invalid_input(format!(
                "invalid --linkage '{raw}'; expected one of: average, single"
            ))),
        }
    }

    fn to_method(self) -> LinkageMethod {
        match self {
            Self::Average => LinkageMethod::Average,
            Self::Single => LinkageMethod::Single,
        }
    }
}

enum CliError {
    Mvv(MvvError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Mvv(MvvError::InvalidInput(_)) | Self::InvalidInput(_) => "invalid_input",
            Self::Mvv(MvvError::InsufficientSamples(_)) => "insufficient_samples",
            Self::Mvv(MvvError::DegenerateWindow(_)) => "degenerate_window",
            Self::Mvv(MvvError::NumericalIssue(_)) => "numerical_issue",
            Self::Mvv(MvvError::ResourceLimit(_)) => "resource_limit",
            Self::Mvv(MvvError::Cancelled) => "cancelled",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mvv(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<MvvError> for CliError {
    fn from(value: MvvError) -> Self {
        Self::Mvv(value)
    }
}

#[derive(Serialize)]
struct InputSummary {
    path: String,
    frames: usize,
    dims: usize,
    fake_start: usize,
    fake_end: usize,
}

impl InputSummary {
    fn new(path: &Path, recording: &Recording) -> Self {
        let (fake_start, fake_end) = recording.fake_interval();
        Self {
            path: path.display().to_string(),
            frames: recording.frames(),
            dims: recording.dims(),
            fake_start,
            fake_end,
        }
    }
}

#[derive(Serialize)]
struct CellOutput {
    threshold: f64,
    window_len: usize,
    fake_count: usize,
    counts: ConfusionCounts,
    tpr: f64,
    fpr: f64,
    accuracy: f64,
}

#[derive(Serialize)]
struct SweepOutput {
    command: &'static str,
    input: InputSummary,
    reducer: String,
    thresholds: Vec<f64>,
    window_sizes: Vec<usize>,
    stride: usize,
    cells: Vec<CellOutput>,
    diagnostics: SweepDiagnostics,
}

#[derive(Serialize)]
struct VerifyOutput {
    command: &'static str,
    input: InputSummary,
    reducer: String,
    thresholds: Vec<f64>,
    verdicts: Vec<ScenarioVerdict>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Sweep(args) => handle_sweep(args),
        Command::Verify(args) => handle_verify(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "sweep" => Command::Sweep(parse_sweep_args(rest)?),
        "verify" => Command::Verify(parse_verify_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: sweep, verify"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_sweep_args(tokens: &[String]) -> Result<SweepArgs, CliError> {
    let mut args = SweepArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--reducer" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.reducer = ReducerArg::parse(raw.as_str())?;
            }
            "--num-pcs" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.num_pcs = parse_usize_arg(raw.as_str(), flag)?;
                args.num_pcs_explicit = true;
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.seed = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--thresholds" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.thresholds = parse_f64_list(raw.as_str(), flag)?;
            }
            "--window-sizes" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.window_sizes = parse_usize_list(raw.as_str(), flag)?;
            }
            "--stride" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.stride = parse_usize_arg(raw.as_str(), flag)?;
            }
            "--degeneracy-threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.degeneracy_threshold = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--polarity" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.polarity = PolarityArg::parse(raw.as_str())?;
            }
            "--linkage" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.linkage = LinkageArg::parse(raw.as_str())?;
            }
            "--time-budget-ms" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.time_budget_ms = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--window-budget-ms" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.window_budget_ms = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--soft-budget" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.soft_budget = true;
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown sweep option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("sweep requires --input <path>"));
    }
    check_reducer_flags(args.reducer, args.num_pcs_explicit)?;

    Ok(args)
}

fn parse_verify_args(tokens: &[String]) -> Result<VerifyArgs, CliError> {
    let mut args = VerifyArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--reducer" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.reducer = ReducerArg::parse(raw.as_str())?;
            }
            "--num-pcs" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.num_pcs = parse_usize_arg(raw.as_str(), flag)?;
                args.num_pcs_explicit = true;
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.seed = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--thresholds" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.thresholds = parse_f64_list(raw.as_str(), flag)?;
            }
            "--degeneracy-threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.degeneracy_threshold = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--linkage" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.linkage = LinkageArg::parse(raw.as_str())?;
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown verify option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("verify requires --input <path>"));
    }
    check_reducer_flags(args.reducer, args.num_pcs_explicit)?;

    Ok(args)
}

fn check_reducer_flags(reducer: ReducerArg, num_pcs_explicit: bool) -> Result<(), CliError> {
    if matches!(reducer, ReducerArg::Wavelet) && num_pcs_explicit {
        return Err(CliError::invalid_input(
            "--num-pcs only applies to --reducer pca",
        ));
    }
    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), CliError> {
    let recording = load_recording(args.input.as_path())?;
    let input = InputSummary::new(args.input.as_path(), &recording);

    let config = EvalConfig {
        thresholds: args.thresholds.clone(),
        window_sizes: args.window_sizes.clone(),
        stride: args.stride,
        degeneracy_threshold: args.degeneracy_threshold,
        polarity: args.polarity.to_polarity(),
        linkage: args.linkage.to_method(),
    };
    let constraints = Constraints {
        time_budget_ms: args.time_budget_ms,
        window_time_budget_ms: args.window_budget_ms,
    };
    let budget_mode = if args.soft_budget {
        BudgetMode::SoftDegrade
    } else {
        BudgetMode::HardFail
    };
    let ctx = SweepContext::new(&constraints).with_budget_mode(budget_mode);

    let (label, result) = match args.reducer {
        ReducerArg::Pca => {
            let reducer = pca_reducer(args.num_pcs, args.seed)?;
            run_sweep(reducer, config, &recording, &ctx)?
        }
        ReducerArg::Wavelet => run_sweep(WaveletMahalanobis::new(), config, &recording, &ctx)?,
    };

    let cells = result
        .cells
        .iter()
        .map(|cell| CellOutput {
            threshold: cell.threshold,
            window_len: cell.window_len,
            fake_count: cell.scenario.fake_count(),
            counts: cell.counts,
            tpr: cell.counts.tpr(),
            fpr: cell.counts.fpr(),
            accuracy: cell.counts.accuracy(),
        })
        .collect();

    write_json_output(
        &SweepOutput {
            command: "sweep",
            input,
            reducer: label,
            thresholds: args.thresholds,
            window_sizes: args.window_sizes,
            stride: args.stride,
            cells,
            diagnostics: result.diagnostics,
        },
        args.output.as_deref(),
    )
}

fn handle_verify(args: VerifyArgs) -> Result<(), CliError> {
    let recording = load_recording(args.input.as_path())?;
    let input = InputSummary::new(args.input.as_path(), &recording);

    let config = EvalConfig {
        thresholds: args.thresholds.clone(),
        degeneracy_threshold: args.degeneracy_threshold,
        linkage: args.linkage.to_method(),
        ..EvalConfig::default()
    };
    let constraints = Constraints::default();
    let ctx = SweepContext::new(&constraints);

    let (label, verdicts) = match args.reducer {
        ReducerArg::Pca => {
            let reducer = pca_reducer(args.num_pcs, args.seed)?;
            run_verify(reducer, config, &recording, &ctx)?
        }
        ReducerArg::Wavelet => run_verify(WaveletMahalanobis::new(), config, &recording, &ctx)?,
    };

    write_json_output(
        &VerifyOutput {
            command: "verify",
            input,
            reducer: label,
            thresholds: args.thresholds,
            verdicts,
        },
        args.output.as_deref(),
    )
}

fn pca_reducer(num_pcs: usize, seed: Option<u64>) -> Result<PcaMahalanobis, CliError> {
    let mut mcd = McdConfig::default();
    if let Some(seed) = seed {
        mcd.seed = seed;
    }
    PcaMahalanobis::new(PcaMahalanobisConfig {
        num_components: num_pcs,
        mcd,
    })
    .map_err(CliError::from)
}

fn run_sweep<R: ScoreReducer + Sync>(
    reducer: R,
    config: EvalConfig,
    recording: &Recording,
    ctx: &SweepContext<'_>,
) -> Result<(String, SweepResult), CliError> {
    let evaluator = WindowEvaluator::new(reducer, config)?;
    let label = evaluator.reducer().label().to_string();
    let result = evaluator.sweep(recording, ctx)?;
    Ok((label, result))
}

fn run_verify<R: ScoreReducer + Sync>(
    reducer: R,
    config: EvalConfig,
    recording: &Recording,
    ctx: &SweepContext<'_>,
) -> Result<(String, Vec<ScenarioVerdict>), CliError> {
    let evaluator = WindowEvaluator::new(reducer, config)?;
    let label = evaluator.reducer().label().to_string();
    let verdicts = evaluator.verify(recording, ctx)?;
    Ok((label, verdicts))
}

fn load_recording(path: &Path) -> Result<Recording, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    parse_recording(raw.as_str()).map_err(CliError::from)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn ensure_no_inline_value(flag: &str, inline_value: Option<String>) -> Result<(), CliError> {
    if inline_value.is_some() {
        return Err(CliError::invalid_input(format!(
            "{flag} does not accept a value"
        )));
    }
    Ok(())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_u64_arg(raw: &str, flag: &str) -> Result<u64, CliError> {
    raw.parse::<u64>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn parse_f64_list(raw: &str, flag: &str) -> Result<Vec<f64>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| parse_f64_arg(piece, flag))
        .collect()
}

fn parse_usize_list(raw: &str, flag: &str) -> Result<Vec<usize>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| parse_usize_arg(piece, flag))
        .collect()
}

fn print_version() {
    println!("mvv {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "mvv {}\n\nUSAGE:\n  mvv <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  sweep    Sliding-window grid evaluation over a recording\n  verify   One whole-sequence verdict per scenario\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'mvv <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "sweep" => {
            println!(
                "USAGE:\n  mvv sweep --input <path> [OPTIONS]\n\nOPTIONS:\n  --reducer <pca|wavelet>            Default: pca\n  --num-pcs <usize>                  Default: 5 (pca only)\n  --seed <u64>                       Robust fit subsample seed\n  --thresholds <f64,f64,...>         Default: 1.3,1.5\n  --window-sizes <usize,usize,...>   Default: 200,250\n  --stride <usize>                   Default: 1\n  --degeneracy-threshold <f64>       Default: 10\n  --polarity <non-overlap|overlap>   Default: non-overlap\n  --linkage <average|single>         Default: average\n  --time-budget-ms <u64>\n  --window-budget-ms <u64>\n  --soft-budget                      Degrade instead of failing on budget\n  --input <path>                     Required recording JSON\n  --output <path>                    Write JSON output to file"
            );
            Ok(())
        }
        "verify" => {
            println!(
                "USAGE:\n  mvv verify --input <path> [OPTIONS]\n\nOPTIONS:\n  --reducer <pca|wavelet>            Default: pca\n  --num-pcs <usize>                  Default: 5 (pca only)\n  --seed <u64>                       Robust fit subsample seed\n  --thresholds <f64,f64,...>         Default: 1.3\n  --degeneracy-threshold <f64>       Default: 10\n  --linkage <average|single>         Default: average\n  --input <path>                     Required recording JSON\n  --output <path>                    Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: sweep, verify"
        ))),
    }
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
