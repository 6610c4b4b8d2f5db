use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use mri_assist::cli::{AnalyzeArgs, ChatArgs, ClientArgs, Command, ServeArgs};
use mri_assist::{
    Analysis, Args, Assistant, FaqResponder, InferenceService, PatientRecord, PredictionClient,
    PreprocessConfig, Processor, ReportSynthesizer, chat::QUICK_QUESTIONS,
    default_labels, load_class_mapping, load_classifier, router,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Serve(serve) => run_server(serve).await.map(|_| ExitCode::SUCCESS),
        Command::Analyze(analyze) => run_analyze(analyze).await,
        Command::Chat(chat) => run_chat(chat).await.map(|_| ExitCode::SUCCESS),
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let labels = match &args.labels {
        Some(path) => load_class_mapping(path)?,
        None => default_labels(),
    };
    tracing::info!(classes = ?labels, "class labels");

    let processor = Processor::new(PreprocessConfig::square(
        args.input_size as usize,
        args.layout,
    ));
    let classifier = load_classifier(&args.model, args.cuda);
    let service = InferenceService::new(classifier, processor, labels).with_softmax(args.softmax);
    let app = router(Arc::new(service), args.max_upload_bytes);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!("Brain tumor detection API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn connect(args: &ClientArgs) -> Result<PredictionClient> {
    Ok(PredictionClient::new(
        args.server.clone(),
        Duration::from_secs(args.timeout_secs),
    )?)
}

async fn run_analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let image = tokio::fs::read(&args.source)
        .await
        .with_context(|| format!("cannot read {}", args.source))?;
    let mut assistant = Assistant::new(
        FaqResponder::default(),
        connect(&args.client)?,
        ReportSynthesizer::default(),
    );

    match assistant.analyze(&image, &args.patient.record()).await {
        Ok(analysis) => {
            save_report(&analysis, Path::new(&args.output)).await?;
            print_analysis(&analysis, &args.output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "analysis failed");
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn save_report(analysis: &Analysis, path: &Path) -> Result<()> {
    tokio::fs::write(path, &analysis.report)
        .await
        .with_context(|| format!("cannot write report to {}", path.display()))
}

fn print_analysis(analysis: &Analysis, report_path: &str) {
    let result = analysis.result();
    println!("Analysis Complete!");
    println!("Detected Condition: {}", result.label.to_uppercase());
    println!("Confidence Level:   {}%", result.confidence);
    let ranked = analysis.response.ranked_predictions();
    if !ranked.is_empty() {
        println!("Detailed Probabilities:");
        for (label, pct) in ranked {
            println!("  {}: {:.2}%", label.to_uppercase(), pct);
        }
    }
    println!("PDF report written to {report_path}");
}

async fn run_chat(args: ChatArgs) -> Result<()> {
    let patient: PatientRecord = args.patient.record();
    let mut assistant = Assistant::new(
        FaqResponder::default(),
        connect(&args.client)?,
        ReportSynthesizer::default(),
    );

    println!("Hi! I'm your Brain Tumor Medical Assistant. Ask me anything about brain tumors.");
    println!("Commands: /quick, /analyze <image>, /history, /clear, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/clear", _) => {
                assistant.clear();
                println!("Chat cleared!");
            }
            ("/history", _) => {
                for message in assistant.transcript().messages() {
                    println!("{message}");
                }
            }
            ("/quick", _) => {
                for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
                    println!("  {}. {}", i + 1, question);
                }
            }
            ("/analyze", "") => println!("Usage: /analyze <image path>"),
            ("/analyze", path) => {
                let image = match tokio::fs::read(path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        println!("Cannot read {path}: {e}");
                        continue;
                    }
                };
                match assistant.analyze(&image, &patient).await {
                    Ok(analysis) => {
                        let report_path = Path::new(&args.report_dir).join(analysis.report_file_name);
                        save_report(&analysis, &report_path).await?;
                        print_analysis(&analysis, &report_path.display().to_string());
                        if let Some(message) = assistant.transcript().last() {
                            println!("{message}");
                        }
                    }
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            _ => {
                let question = quick_question(line).unwrap_or(line);
                let answer = assistant.ask(question);
                println!("Assistant: {answer}");
            }
        }
    }
    Ok(())
}

/// A bare number picks the matching quick question.
fn quick_question(input: &str) -> Option<&'static str> {
    let index: usize = input.parse().ok()?;
    QUICK_QUESTIONS.get(index.checked_sub(1)?).copied()
}
