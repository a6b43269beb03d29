use clap::{ Arg, App, AppSettings, ArgMatches, SubCommand };
use env_logger::Env;

use std::error::Error;
use std::io::{ self, BufRead };

use lpr_stream::config::{ Acceleration, Config };
use lpr_stream::report::Verdict;
use lpr_stream::text::{ RecognitionLine, TextAggregator };
use lpr_stream::validator::PlateValidator;


fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config_arg = Arg::with_name("config")
        .long("config")
        .short("c")
        .takes_value(true)
        .help("JSON config file, missing keys keep their defaults");
    let matches = App::new("lpr-stream")
                    .version("0.1.0")
                    .about("Reads license plates from a stream of frames")
                    .setting(AppSettings::SubcommandRequiredElseHelp)
                    .subcommand(SubCommand::with_name("run")
                        .about("Detect, recognize and validate plates frame by frame")
                        .arg(Arg::with_name("INPUT")
                            .help("image file or directory of frames")
                            .required(true)
                            .index(1))
                        .arg(config_arg.clone())
                        .arg(Arg::with_name("detector-model").long("detector-model").takes_value(true))
                        .arg(Arg::with_name("ocr-model").long("ocr-model").takes_value(true))
                        .arg(Arg::with_name("threshold")
                            .long("threshold")
                            .takes_value(true)
                            .help("minimum detection confidence to read a plate"))
                        .arg(Arg::with_name("cpu").long("cpu").help("keep both engines off the GPU"))
                        .arg(Arg::with_name("json")
                            .long("json")
                            .takes_value(true)
                            .help("also write events as JSON lines to this file, '-' for stdout"))
                        .arg(Arg::with_name("post-url")
                            .long("post-url")
                            .takes_value(true)
                            .help("POST valid plates to this endpoint"))
                        .arg(Arg::with_name("annotate-dir")
                            .long("annotate-dir")
                            .takes_value(true)
                            .help("save frames with plate regions drawn on them"))
                        .arg(Arg::with_name("font")
                            .long("font")
                            .takes_value(true)
                            .requires("annotate-dir")
                            .help("TTF font for plate text in annotated frames")))
                    .subcommand(SubCommand::with_name("validate")
                        .about("Validate recognized plate text, from arguments or stdin lines")
                        .arg(Arg::with_name("TEXT").multiple(true).index(1))
                        .arg(config_arg))
                    .get_matches();

    match matches.subcommand() {
        ("run", Some(sub)) => run(sub),
        ("validate", Some(sub)) => validate(sub),
        _ => Ok(()),
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(path) = matches.value_of("detector-model") {
        config.detection.model_path = path.into();
    }
    if let Some(path) = matches.value_of("ocr-model") {
        config.recognition.model_path = path.into();
    }
    if let Some(threshold) = matches.value_of("threshold") {
        config.detection.acceptance_threshold = threshold.parse()?;
    }
    if matches.is_present("cpu") {
        config.detection.acceleration = Acceleration::Cpu;
        config.recognition.acceleration = Acceleration::Cpu;
    }
    config.check()?;
    Ok(config)
}

fn validate(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let config = load_config(matches)?;
    let aggregator = TextAggregator::new(&config.noise);
    let validator = PlateValidator::new(config.regions(), &config.noise);

    let texts: Vec<String> = match matches.values_of("TEXT") {
        Some(values) => values.map(String::from).collect(),
        None => io::stdin().lock().lines().collect::<Result<Vec<String>, _>>()?,
    };
    for text in texts {
        match aggregator.candidate(&[RecognitionLine::new(text.as_str(), 1.0)]) {
            Some(candidate) => match Verdict::from(validator.validate(&candidate)) {
                Verdict::Valid { region, numeric, suffix } => println!("valid: {} {} {}", region, numeric, suffix),
                Verdict::Invalid { reason, raw } => println!("invalid ({}): {}", reason, raw),
            },
            None => println!("empty: {:?}", text),
        }
    }
    Ok(())
}

#[cfg(not(feature = "tf-engine"))]
fn run(_: &ArgMatches) -> Result<(), Box<dyn Error>> {
    Err("this build has no inference engine, rebuild with `--features tf-engine`".into())
}

#[cfg(feature = "tf-engine")]
fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    use lpr_stream::FrameProcessor;
    use lpr_stream::annotate::Annotator;
    use lpr_stream::report::{ FanOut, HttpSink, JsonLinesSink, LogSink };
    use lpr_stream::source::ImageSequence;
    use lpr_stream::tf::{ TfDetector, TfRecognizer };
    use log::info;

    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    let config = load_config(matches)?;
    let input = matches.value_of("INPUT").ok_or("frames are required")?;

    let mut sink = FanOut::default();
    sink.push(Box::new(LogSink));
    match matches.value_of("json") {
        Some("-") => sink.push(Box::new(JsonLinesSink::new(io::stdout()))),
        Some(path) => sink.push(Box::new(JsonLinesSink::new(BufWriter::new(File::create(path)?)))),
        None => {}
    }
    if let Some(url) = matches.value_of("post-url") {
        sink.push(Box::new(HttpSink::new(url)?));
    }
    let annotator = match matches.value_of("annotate-dir") {
        Some(dir) => Some(Annotator::new(dir, matches.value_of("font").map(Path::new))?),
        None => None,
    };

    let detector = TfDetector::new(&config.detection)?;
    let recognizer = TfRecognizer::new(&config.recognition)?;
    let mut processor = FrameProcessor::new(detector, recognizer, &config);
    let mut source = ImageSequence::open(input)?;
    info!("reading {} frames from {}", source.len(), input);

    processor.run(&mut source, &mut sink, annotator.as_ref());
    Ok(())
}
