//! `aerolex-evaluate`: offline batch WER/CER report for a session's
//! `asr_results.jsonl` against a ground-truth reference file, or a
//! direct one-off comparison of two strings.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aerolex_asr::evaluate::{evaluate_asr_results, EvaluationReport};
use aerolex_asr::levenshtein::distance;
use aerolex_asr::matcher::find_best_match;
use aerolex_asr::reference_set::ReferenceSet;

#[derive(Debug, Parser)]
#[command(name = "aerolex-evaluate", about = "Batch-evaluate ASR results against ground truth")]
struct Args {
    /// Path to the ground-truth reference file (.txt or .json).
    ground_truth: Option<PathBuf>,

    /// Path to the session's asr_results.jsonl file.
    asr_results: Option<PathBuf>,

    /// Write the detailed per-utterance report as JSON to this path.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Similarity threshold for matching (0.0-1.0).
    #[arg(short = 't', long = "threshold", default_value_t = 0.3)]
    threshold: f64,

    /// Compare two texts directly instead of batch evaluation.
    #[arg(long = "compare", num_args = 2, value_names = ["REF", "HYP"])]
    compare: Option<Vec<String>>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Some(pair) = &args.compare {
        run_compare(&pair[0], &pair[1]);
        return ExitCode::SUCCESS;
    }

    let (Some(ground_truth), Some(asr_results)) = (&args.ground_truth, &args.asr_results) else {
        eprintln!("ground_truth and asr_results are required for batch evaluation");
        return ExitCode::FAILURE;
    };

    match evaluate_asr_results(ground_truth, asr_results, args.threshold) {
        Ok(report) => {
            print_summary(&report);
            if let Some(output) = &args.output {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => {
                        if let Err(err) = std::fs::write(output, json) {
                            eprintln!("failed to write output report: {err}");
                            return ExitCode::FAILURE;
                        }
                        println!("\nDetailed results saved to: {}", output.display());
                    }
                    Err(err) => {
                        eprintln!("failed to serialize report: {err}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("evaluation failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_compare(reference: &str, hypothesis: &str) {
    let refs = ReferenceSet::from_messages(vec![reference.to_string()]);
    let score = find_best_match(hypothesis, &refs, 0.0);
    let edit_distance = distance(reference, hypothesis);

    println!("Reference:  '{reference}'");
    println!("Hypothesis: '{hypothesis}'");
    println!();
    println!("Similarity Score:    {:.1}%", score.similarity * 100.0);
    println!("Word Error Rate:     {:.1}%", score.wer * 100.0);
    println!("Character Error Rate:{:.1}%", score.cer * 100.0);
    println!("Edit Distance:       {edit_distance}");
}

fn print_summary(report: &EvaluationReport) {
    let stats = &report.overall_stats;
    println!("{}", "=".repeat(60));
    println!("ASR EVALUATION SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total ASR Results:        {}", stats.total_asr_results);
    println!("Total Ground Truth:       {}", stats.total_ground_truth);
    println!("Matched Transcriptions:   {}", stats.matched_transcriptions);
    println!("Unmatched Transcriptions: {}", stats.unmatched_transcriptions);
    println!("Unmatched Ground Truth:   {}", stats.unmatched_ground_truth);
    println!();
    println!("Match Rate:               {:.1}%", stats.match_rate * 100.0);
    println!("Coverage Rate:            {:.1}%", stats.coverage_rate * 100.0);
    println!();
    println!("ACCURACY METRICS (for matched transcriptions):");
    println!("Average Word Error Rate:  {:.1}%", stats.average_wer * 100.0);
    println!("Average Char Error Rate:  {:.1}%", stats.average_cer * 100.0);
    println!("Average Word Accuracy:    {:.1}%", stats.average_word_accuracy * 100.0);
    println!("Average Char Accuracy:    {:.1}%", stats.average_char_accuracy * 100.0);
    println!("Average Similarity:       {:.1}%", stats.average_similarity * 100.0);
    println!("{}", "=".repeat(60));
}
