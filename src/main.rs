use facevote::{
    cli::{build_display, Tester, Trainer, Validator},
    common::{Config, DisplayMode},
    core::{Annotator, DetectionModel, DistanceComparator, FaceRecognizer, OnnxFaceDetector, OnnxFaceEncoder},
    storage::{EncodingStore, ImageFilter},
};

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

const TEST_GUIDANCE: &str = "--test needs an image: pass it with -f <path>, e.g. `facevote --test -f unknown.jpg`";
const NO_ACTION_HINT: &str = "Nothing to do. Use --train, --validate or --test -f <path> (see --help).";

#[derive(Parser, Debug)]
#[command(name = "facevote")]
#[command(about = "Recognize faces in images against a trained set of identities")]
struct Cli {
    /// Encode every face under the training directory
    #[arg(long)]
    train: bool,

    /// Run recognition over every file in the validation directory
    #[arg(long)]
    validate: bool,

    /// Run recognition on the image given with -f
    #[arg(long)]
    test: bool,

    /// Face detection model
    #[arg(short = 'm', value_enum, default_value_t = DetectionModel::Hog)]
    model: DetectionModel,

    /// Image to recognize with --test
    #[arg(short = 'f')]
    file: Option<PathBuf>,

    /// Config file (defaults to configs/facevote.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override how annotated images are shown
    #[arg(long, value_enum)]
    display: Option<DisplayMode>,

    /// Debug logging with source locations
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    if !cli.train && !cli.validate && !cli.test {
        println!("{}", NO_ACTION_HINT);
        return Ok(());
    }

    let tester = match (cli.test, &cli.file) {
        (true, Some(path)) => Some(Tester::new(path)),
        (true, None) => {
            println!("{}", TEST_GUIDANCE);
            None
        }
        (false, _) => None,
    };

    if !cli.train && !cli.validate && tester.is_none() {
        return Ok(());
    }

    if let Some(tester) = &tester {
        tester.check_input()?;
    }

    let config = Config::load(cli.config.as_deref())?;
    let recognizer = build_recognizer(&config, cli.model)?;
    let mut display = build_display(
        cli.display.unwrap_or(config.display.mode),
        &config.paths.output_dir,
    );

    if cli.train {
        Trainer::new(&config.paths.training_dir).train(&recognizer)?;
    }

    if cli.validate {
        let summary = Validator::new(&config.paths.validation_dir)
            .validate(&recognizer, display.as_mut())?;
        println!(
            "Validated {} image(s): {} face(s), {} unknown",
            summary.images, summary.faces, summary.unknown
        );
    }

    if let Some(tester) = tester {
        tester.test(&recognizer, display.as_mut())?;
    }

    Ok(())
}

fn build_recognizer(config: &Config, model: DetectionModel) -> Result<FaceRecognizer> {
    tracing::info!("Using {} detection model", model);

    let detector = OnnxFaceDetector::new(config, model)?;
    let encoder = OnnxFaceEncoder::new(config)?;
    let store = EncodingStore::new(
        &config.paths.encodings_path,
        ImageFilter::new(&config.training.image_extensions),
    );

    Ok(FaceRecognizer::new(
        Box::new(detector),
        Box::new(encoder),
        Box::new(DistanceComparator::new(config.matching.tolerance)),
        store,
        Annotator::from_config(&config.display),
    ))
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facevote::FaceVoteError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("facevote").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_parse() {
        let cli = parse(&["--train", "--validate", "-m", "cnn"]);
        assert!(cli.train && cli.validate && !cli.test);
        assert_eq!(cli.model, DetectionModel::Cnn);
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_model_defaults_to_hog() {
        assert_eq!(parse(&["--test"]).model, DetectionModel::Hog);
    }

    #[test]
    fn test_rejects_unknown_model() {
        let args = ["facevote", "--train", "-m", "svm"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_test_without_file_prints_guidance_and_succeeds() {
        assert!(run(parse(&["--test"])).is_ok());
    }

    #[test]
    fn test_no_action_is_ok() {
        assert!(run(parse(&[])).is_ok());
    }

    #[test]
    fn test_test_with_missing_file_is_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nobody.jpg");
        let cli = parse(&["--test", "-f", missing.to_str().unwrap()]);

        let err = run(cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FaceVoteError>(),
            Some(FaceVoteError::ImageLoad { .. })
        ));
    }
}
