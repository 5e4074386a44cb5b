use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use gumdrop::Options;
use serde::Serialize;

use swipetype::classifier::{TouchKind, TouchTracker};
use swipetype::config::EngineConfig;
use swipetype::correction::{Correction, CorrectionScorer};
use swipetype::dictionary::Dictionary;
use swipetype::engine::SwipeEngine;
use swipetype::gesture::GestureShape;
use swipetype::layout::KeyboardLayout;
use swipetype::mapper::{KeyCandidate, SpatialKeyMapper};
use swipetype::predictor::{LexiconBackend, ScoredWord};
use swipetype::simplify::simplify;
use swipetype::types::{Point, TimedPoint, Trajectory};

trait OutputWriter {
    fn write_corrections(&mut self, word: &str, corrections: &[Correction]);
    fn finish(&mut self) -> anyhow::Result<()>;
}

struct StdoutWriter;

impl OutputWriter for StdoutWriter {
    fn write_corrections(&mut self, word: &str, corrections: &[Correction]) {
        println!("Input: {}", word);
        for c in corrections {
            println!("{}\t\t{}\t{:.2}", c.word, c.score, c.confidence);
        }
        println!();
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct CorrectionRequest {
    word: String,
    corrections: Vec<Correction>,
}

#[derive(Serialize)]
struct JsonWriter {
    results: Vec<CorrectionRequest>,
}

impl JsonWriter {
    pub fn new() -> JsonWriter {
        JsonWriter { results: vec![] }
    }
}

impl OutputWriter for JsonWriter {
    fn write_corrections(&mut self, word: &str, corrections: &[Correction]) {
        self.results.push(CorrectionRequest {
            word: word.to_owned(),
            corrections: corrections.to_vec(),
        });
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

#[derive(Debug, Options)]
struct Args {
    #[options(help = "print help message")]
    help: bool,

    #[options(command)]
    command: Option<Command>,
}

#[derive(Debug, Options)]
enum Command {
    #[options(help = "classify a touch as tap or swipe and name its gesture shape")]
    Classify(TrajectoryArgs),

    #[options(help = "simplify a trajectory")]
    Simplify(TrajectoryArgs),

    #[options(help = "detect the keys along a trajectory")]
    Keys(TrajectoryArgs),

    #[options(help = "get corrections for provided words")]
    Correct(CorrectArgs),

    #[options(help = "predict words for a swiped trajectory")]
    Predict(PredictArgs),
}

#[derive(Debug, Options)]
struct TrajectoryArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(help = "JSON engine configuration")]
    config: Option<PathBuf>,

    #[options(help = "JSON keyboard layout (default: QWERTY)")]
    layout: Option<PathBuf>,

    #[options(no_short, help = "keyboard width in pixels")]
    width: Option<f32>,

    #[options(no_short, help = "keyboard height in pixels")]
    height: Option<f32>,

    #[options(help = "simplification tolerance, overriding the configuration")]
    epsilon: Option<f32>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "file of `x y [time_ms]` lines (default: stdin)")]
    input: Option<PathBuf>,
}

#[derive(Debug, Options)]
struct CorrectArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(help = "JSON engine configuration")]
    config: Option<PathBuf>,

    #[options(help = "TSV dictionary of `word<TAB>frequency` lines", required)]
    dictionary: PathBuf,

    #[options(help = "maximum number of results")]
    nbest: Option<usize>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "words to be processed")]
    inputs: Vec<String>,
}

#[derive(Debug, Options)]
struct PredictArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(help = "JSON engine configuration")]
    config: Option<PathBuf>,

    #[options(help = "JSON keyboard layout (default: QWERTY)")]
    layout: Option<PathBuf>,

    #[options(help = "TSV dictionary of `word<TAB>frequency` lines", required)]
    dictionary: PathBuf,

    #[options(no_short, help = "keyboard width in pixels")]
    width: Option<f32>,

    #[options(no_short, help = "keyboard height in pixels")]
    height: Option<f32>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "file of `x y [time_ms]` lines (default: stdin)")]
    input: Option<PathBuf>,
}

const DEFAULT_WIDTH: f32 = 1000.0;
const DEFAULT_HEIGHT: f32 = 300.0;

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_layout(path: Option<&Path>) -> anyhow::Result<KeyboardLayout> {
    match path {
        Some(path) => KeyboardLayout::from_path(path)
            .with_context(|| format!("loading layout {}", path.display())),
        None => Ok(KeyboardLayout::qwerty()),
    }
}

fn load_dictionary(path: &Path) -> anyhow::Result<Dictionary> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let dictionary = Dictionary::from_tsv(BufReader::new(file))?;
    log::info!("loaded {} words from {}", dictionary.len(), path.display());
    Ok(dictionary)
}

/// Reads `x y [time_ms]` lines. Samples without a time are spaced 1 ms apart.
fn read_trajectory(input: Option<&Path>) -> anyhow::Result<Trajectory> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => {
            eprintln!("Reading from stdin...");
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Box::new(io::Cursor::new(buffer))
        }
    };

    let mut trajectory = Trajectory::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            anyhow::bail!("line {}: expected `x y [time_ms]`", n + 1);
        }

        let x: f32 = fields[0].parse().with_context(|| format!("line {}: x", n + 1))?;
        let y: f32 = fields[1].parse().with_context(|| format!("line {}: y", n + 1))?;
        let t: u64 = match fields.get(2) {
            Some(t) => t.parse().with_context(|| format!("line {}: time", n + 1))?,
            None => trajectory.samples().last().map(|s| s.time_ms + 1).unwrap_or(0),
        };

        trajectory.push(Point::new(x, y), t);
    }

    Ok(trajectory)
}

#[derive(Serialize)]
struct ClassifyReport {
    kind: TouchKind,
    shape: GestureShape,
    starting_key: Option<usize>,
    total_distance: f32,
    elapsed_ms: u64,
    starting_key_width: f32,
}

fn classify(args: TrajectoryArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let layout = load_layout(args.layout.as_deref())?;
    let trajectory = read_trajectory(args.input.as_deref())?;
    let width = args.width.unwrap_or(DEFAULT_WIDTH);
    let height = args.height.unwrap_or(DEFAULT_HEIGHT);

    let samples = trajectory.samples();
    let first = samples.first().context("empty trajectory")?;
    let mut tracker = TouchTracker::new(
        &layout,
        width,
        height,
        &config.gesture,
        first.point,
        first.time_ms,
    );

    for s in &samples[1..] {
        tracker.move_to(s.point, s.time_ms);
    }

    let summary = tracker.summary();
    let done = tracker.finish();
    let report = ClassifyReport {
        kind: done.kind,
        shape: done.shape,
        starting_key: done.starting_key.map(|k| k.0),
        total_distance: summary.total_distance,
        elapsed_ms: summary.elapsed_ms,
        starting_key_width: summary.starting_key_width,
    };

    if args.use_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{:?}\t{:?}", report.kind, report.shape);
        println!(
            "distance: {:.1}, elapsed: {} ms, starting key width: {:.1}",
            report.total_distance, report.elapsed_ms, report.starting_key_width
        );
    }

    Ok(())
}

fn simplify_command(args: TrajectoryArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let trajectory = read_trajectory(args.input.as_deref())?;
    let epsilon = args.epsilon.unwrap_or(config.detection.simplify_epsilon);

    let simplified = simplify(&trajectory, epsilon);
    eprintln!("{} -> {} points", trajectory.len(), simplified.len());

    if args.use_json {
        let samples: &[TimedPoint] = simplified.samples();
        println!("{}", serde_json::to_string_pretty(samples)?);
    } else {
        for s in simplified.samples() {
            println!("{} {} {}", s.point.x, s.point.y, s.time_ms);
        }
    }

    Ok(())
}

fn keys(args: TrajectoryArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    let layout = load_layout(args.layout.as_deref())?;
    let trajectory = read_trajectory(args.input.as_deref())?;

    if let Some(epsilon) = args.epsilon {
        config.detection.simplify_epsilon = epsilon;
    }

    let mapper = SpatialKeyMapper::new(
        &layout,
        args.width.unwrap_or(DEFAULT_WIDTH),
        args.height.unwrap_or(DEFAULT_HEIGHT),
        &config.detection,
    );
    let simplified = simplify(&trajectory, config.detection.simplify_epsilon);
    let found: Vec<KeyCandidate> = mapper.detect_trajectory(&simplified);

    if args.use_json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        for k in &found {
            println!("{}\t{:.3}\t{}", k.letter, k.probability, k.path_index);
        }
    }

    Ok(())
}

fn correct(args: CorrectArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let dictionary = load_dictionary(&args.dictionary)?;
    let scorer = CorrectionScorer::new(config.correction.clone());
    let nbest = args.nbest.unwrap_or(config.correction.max_suggestions);

    let mut writer: Box<dyn OutputWriter> = if args.use_json {
        Box::new(JsonWriter::new())
    } else {
        Box::new(StdoutWriter)
    };

    let words: Vec<String> = if args.inputs.is_empty() {
        eprintln!("Reading from stdin...");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
            .lines()
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect()
    } else {
        args.inputs
    };

    for word in words {
        let corrections = scorer.suggest(&word, dictionary.words().map(|w| w.as_str()), nbest);
        writer.write_corrections(&word, &corrections);
    }

    writer.finish()
}

#[derive(Serialize)]
struct PredictReport {
    touched: String,
    candidates: usize,
    results: Vec<ScoredWord>,
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let layout = Arc::new(load_layout(args.layout.as_deref())?);
    let dictionary = load_dictionary(&args.dictionary)?;
    let trajectory = read_trajectory(args.input.as_deref())?;
    let width = args.width.unwrap_or(DEFAULT_WIDTH);
    let height = args.height.unwrap_or(DEFAULT_HEIGHT);

    let backend = LexiconBackend::new(&layout, width, height, dictionary.clone(), &config);
    let engine = SwipeEngine::new(config, layout, width, height, dictionary, Arc::new(backend))?;

    let candidates = engine.candidates(&trajectory);
    let results = match engine.submit(trajectory).wait() {
        Some(result) => result?,
        None => anyhow::bail!("prediction was superseded"),
    };

    let report = PredictReport {
        touched: candidates.touched.iter().collect(),
        candidates: candidates.words.len(),
        results: results.entries().to_vec(),
    };

    if args.use_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Keys: {}\t({} candidates)", report.touched, report.candidates);
        for r in &report.results {
            println!("{}\t\t{}", r.word, r.score);
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse_args_default_or_exit();

    match args.command {
        None => Ok(()),
        Some(Command::Classify(args)) => classify(args),
        Some(Command::Simplify(args)) => simplify_command(args),
        Some(Command::Keys(args)) => keys(args),
        Some(Command::Correct(args)) => correct(args),
        Some(Command::Predict(args)) => predict(args),
    }
}
