use chrono::prelude::*;
use std::error::Error;
use std::time::{Duration, Instant, SystemTime};

use distance::damerau_levenshtein;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use structopt::clap::{App, AppSettings, Arg};
use swipetype::config::EngineConfig;
use swipetype::correction::{Correction, CorrectionScorer};
use swipetype::dictionary::Dictionary;

static CFG: EngineConfig = EngineConfig::default();

fn load_words(
    path: &str,
    max_words: Option<usize>,
) -> Result<Vec<(String, String)>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    Ok(rdr
        .records()
        .filter_map(Result::ok)
        .filter_map(|r| {
            r.get(0)
                .and_then(|x| r.get(1).map(|y| (x.to_string(), y.to_string())))
        })
        .take(max_words.unwrap_or(std::usize::MAX))
        .collect())
}

fn load_dictionary(path: &str) -> Result<Dictionary, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    Ok(Dictionary::from_tsv(std::io::BufReader::new(file))?)
}

#[derive(Debug, Default, Serialize, PartialOrd, Ord, PartialEq, Eq, Clone, Copy)]
struct Time {
    secs: u64,
    subsec_nanos: u32,
}

impl From<Duration> for Time {
    fn from(d: Duration) -> Time {
        Time {
            secs: d.as_secs(),
            subsec_nanos: d.subsec_nanos(),
        }
    }
}

impl Time {
    fn as_duration(&self) -> Duration {
        Duration::new(self.secs, self.subsec_nanos)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        let ms = self.secs * 1000 + (self.subsec_nanos as u64 / 1_000_000);
        write!(f, "{}ms", ms)
    }
}

#[derive(Debug, Serialize)]
struct AccuracyResult<'a> {
    input: &'a str,
    expected: &'a str,
    distance: usize,
    corrections: Vec<Correction>,
    position: Option<usize>,
    time: Time,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    dictionary_size: usize,
    config: &'a EngineConfig,
    summary: Summary,
    results: Vec<AccuracyResult<'a>>,
    start_timestamp: Time,
    total_time: Time,
}

#[derive(Serialize, Default, Debug, Clone)]
struct Summary {
    total_words: u32,
    first_position: u32,
    top_five: u32,
    any_position: u32,
    no_corrections: u32,
    wrong_corrections: u32,
    slowest_lookup: Time,
    fastest_lookup: Time,
    average_time: Time,
    average_time_95pc: Time,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        let percent =
            |v: u32| -> String { format!("{:.2}%", v as f32 / self.total_words as f32 * 100f32) };

        write!(
            f,
            "[#1] {} [^5] {} [any] {} [none] {} [wrong] {} [fast] {} [slow] {} [avg] {}",
            percent(self.first_position),
            percent(self.top_five),
            percent(self.any_position),
            percent(self.no_corrections),
            percent(self.wrong_corrections),
            self.fastest_lookup,
            self.slowest_lookup,
            self.average_time
        )
    }
}

fn average(times: &[Time]) -> Time {
    if times.is_empty() {
        return Time::default();
    }

    let total: Duration = times.iter().map(Time::as_duration).sum();
    (total / times.len() as u32).into()
}

impl Summary {
    fn new<'a>(results: &[AccuracyResult<'a>]) -> Summary {
        let mut summary = Summary::default();

        results.iter().for_each(|result| {
            summary.total_words += 1;

            if let Some(position) = result.position {
                summary.any_position += 1;

                if position == 0 {
                    summary.first_position += 1;
                }

                if position < 5 {
                    summary.top_five += 1;
                }
            } else if result.corrections.is_empty() {
                summary.no_corrections += 1;
            } else {
                summary.wrong_corrections += 1;
            }
        });

        let mut times: Vec<Time> = results.iter().map(|r| r.time).collect();
        times.sort();

        summary.slowest_lookup = times.last().copied().unwrap_or_default();
        summary.fastest_lookup = times.first().copied().unwrap_or_default();
        summary.average_time = average(&times);
        summary.average_time_95pc = average(&times[..times.len() * 95 / 100]);

        summary
    }
}

fn git(args: &[&str]) -> Result<String, Box<dyn Error>> {
    let output = std::process::Command::new("git").args(args).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Appends one line per run so accuracy can be tracked across commits.
fn append_tsv(path: &str, summary: &Summary) -> Result<(), Box<dyn Error>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
    if is_new {
        writer.write_record(&[
            "commit",
            "date",
            "describe",
            "top1",
            "top5",
            "any",
            "no corrections",
            "wrong corrections",
            "avg time",
        ])?;
    }

    writer.write_record(&[
        git(&["rev-parse", "--short", "HEAD"])?,
        Local::now().to_rfc3339(),
        git(&["describe"])?,
        summary.first_position.to_string(),
        summary.top_five.to_string(),
        summary.any_position.to_string(),
        summary.no_corrections.to_string(),
        summary.wrong_corrections.to_string(),
        summary.average_time.to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let matches = App::new("swipetype-accuracy")
        .setting(AppSettings::ArgRequiredElseHelp)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Accuracy testing for swipetype corrections.")
        .arg(
            Arg::with_name("config")
                .short("c")
                .takes_value(true)
                .help("Provide JSON config file to override test defaults"),
        )
        .arg(
            Arg::with_name("words")
                .value_name("WORDS")
                .help("The 'input -> expected' list in tab-delimited value file (TSV)"),
        )
        .arg(
            Arg::with_name("dictionary")
                .value_name("DICTIONARY")
                .help("The 'word -> frequency' dictionary in tab-delimited value file (TSV)"),
        )
        .arg(
            Arg::with_name("json-output")
                .short("o")
                .value_name("JSON-OUTPUT")
                .help("The file path for the JSON report output"),
        )
        .arg(
            Arg::with_name("tsv-output")
                .short("t")
                .value_name("TSV-OUTPUT")
                .help("The file path for the TSV line append"),
        )
        .arg(
            Arg::with_name("max-words")
                .short("w")
                .takes_value(true)
                .help("Truncate typos list to max number of words specified"),
        )
        .get_matches();

    let cfg: EngineConfig = match matches.value_of("config") {
        Some(path) => EngineConfig::from_path(path)?,
        None => CFG.clone(),
    };

    let dictionary = match matches.value_of("dictionary") {
        Some(path) => load_dictionary(path)?,
        None => {
            eprintln!("No dictionary for given path; aborting.");
            std::process::exit(1);
        }
    };

    let words = match matches.value_of("words") {
        Some(path) => load_words(
            path,
            matches
                .value_of("max-words")
                .and_then(|x| x.parse::<usize>().ok()),
        )?,
        None => {
            eprintln!("No word list for given path; aborting.");
            std::process::exit(1);
        }
    };

    let scorer = CorrectionScorer::new(cfg.correction.clone());
    let vocabulary: Vec<&str> = dictionary.words().map(|w| w.as_str()).collect();

    let pb = ProgressBar::new(words.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{pos}/{len} [{percent}%] {wide_bar} {elapsed_precise}"),
    );

    let start_time = Instant::now();
    let results = words
        .par_iter()
        .progress_with(pb)
        .map(|(input, expected)| {
            let now = Instant::now();
            let corrections = scorer.suggest(input, &vocabulary, cfg.correction.max_suggestions);
            let time = now.elapsed().into();

            let position = corrections.iter().position(|x| x.word == expected.as_str());

            let distance = damerau_levenshtein(input, expected);
            AccuracyResult {
                input,
                expected,
                distance,
                time,
                corrections,
                position,
            }
        })
        .collect::<Vec<_>>();

    let total_time: Time = start_time.elapsed().into();
    let start_timestamp: Time = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .into();

    let summary = Summary::new(&results);
    println!("{}", summary);

    if let Some(path) = matches.value_of("json-output") {
        let output = std::fs::File::create(path)?;
        let report = Report {
            dictionary_size: dictionary.len(),
            config: &cfg,
            summary,
            results,
            start_timestamp,
            total_time,
        };
        println!("Writing JSON report…");
        serde_json::to_writer_pretty(output, &report)?;
    } else if let Some(path) = matches.value_of("tsv-output") {
        append_tsv(path, &summary)?;
    }

    println!("Done!");
    Ok(())
}
