mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use laterlist::aggregator::{ScanOutcome, ScanReport};
use laterlist::config::Config;
use laterlist::element::ListElement;
use laterlist::error::InputError;
use laterlist::prompt::{AssumeYes, Prompt, StdinPrompt};
use laterlist::reconsider::RerateReport;
use laterlist::{FieldChange, Laterlist, PushOutcome, Review};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("laterlist=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = match open(&cli).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&app, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(input) = e.downcast_ref::<InputError>() {
                eprintln!("{input}");
                if matches!(input, InputError::UnknownList(_)) {
                    eprintln!("Known lists: {}", app.list_names().join(", "));
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn open(cli: &Cli) -> Result<Laterlist> {
    let config = Config::load(cli.config.as_deref())?;
    Laterlist::connect(&config).await
}

async fn run(app: &Laterlist, cli: Cli) -> Result<()> {
    let prompt: Box<dyn Prompt> = if cli.yes { Box::new(AssumeYes) } else { Box::new(StdinPrompt) };
    let prompt = prompt.as_ref();

    match cli.command {
        Commands::Scan { list: Some(list) } => print_scan(&app.scan(&list).await?),
        Commands::Scan { list: None } => {
            for (list, result) in app.scan_all().await {
                match result {
                    Ok(report) => print_scan(&report),
                    Err(e) => eprintln!("{list}: scan failed: {e:#}"),
                }
            }
            println!("Finished scanning all lists.");
        }
        Commands::Push { list, url } => match app.push(&list, &url, prompt).await? {
            PushOutcome::Added(element) => println!("{}", element.render_detail()),
            PushOutcome::Declined => println!("Nothing added."),
            PushOutcome::Failed(e) => eprintln!("Could not add {url}: {e}"),
        },
        Commands::Next { list } => match app.next(&list).await? {
            Some(element) => println!("{}", element.render_detail()),
            None => println!("No active entries in {list}."),
        },
        Commands::Pop { list } => {
            if let Some(top) = app.next(&list).await? {
                println!("{}", top.render_detail());
            }
            print_change(app.pop(&list, prompt).await?, "finished");
        }
        Commands::List { list, limit } => print_numbered(&app.list(&list, limit).await?),
        Commands::Detail { list, id } => match app.detail(&list, id).await? {
            Some(element) => println!("{}", element.render_detail()),
            None => println!("Entry {id} not found in {list}."),
        },
        Commands::Finish { list, id } => print_change(app.finish(&list, id, prompt).await?, "finished"),
        Commands::Remove { list, id } => print_change(app.remove(&list, id, prompt).await?, "removed"),
        Commands::Reactivate { list, id } => print_change(app.reactivate(&list, id).await?, "reactivated"),
        Commands::Review { list, filters } => match app.review(&list, &filters).await? {
            Review::Active(active) => print_numbered(&active),
            Review::Filtered { finished, removed } => {
                if let Some(finished) = finished {
                    println!("Finished ({}):", finished.len());
                    print_numbered(&finished);
                }
                if let Some(removed) = removed {
                    println!("Removed ({}):", removed.len());
                    print_numbered(&removed);
                }
            }
        },
        Commands::Search { list, keyword } => {
            let hits = app.search(&list, &keyword).await?;
            if hits.is_empty() {
                println!("No results found");
            } else {
                print_numbered(&hits);
            }
        }
        Commands::Reconsider { list, ids } => print_rerate(&app.reconsider(&list, &ids).await?),
        Commands::Lists => {
            for name in app.list_names() {
                println!("{name}");
            }
        }
        Commands::Sources => {
            for (name, domain) in app.sources().list_sources() {
                println!("{name:<16} {domain}");
            }
        }
    }
    Ok(())
}

fn print_numbered(elements: &[ListElement]) {
    for (i, element) in elements.iter().enumerate() {
        println!("{:>3}. {}", i + 1, element.render_summary());
    }
}

fn print_change(change: FieldChange, verb: &str) {
    match change {
        FieldChange::Changed(element) => println!("{} {verb}.", element.render_summary()),
        FieldChange::NotFound => println!("Entry not found."),
        FieldChange::Declined => println!("Cancelled."),
    }
}

fn print_scan(report: &ScanReport) {
    let list = &report.list_name;
    for url in &report.invalid {
        println!("{list}: skipping invalid line: {url}");
    }
    for url in &report.duplicates {
        println!("{list}: skipping duplicate: {url}");
    }
    for url in &report.unsupported {
        println!("{list}: no source for {url}");
    }
    for url in &report.failed {
        println!("{list}: could not resolve {url}");
    }
    match report.outcome {
        ScanOutcome::NoPending => println!("{list}: no new records."),
        ScanOutcome::NothingCollected => println!("{list}: no records after filtering."),
        ScanOutcome::Stored => {
            println!("{list}: added {} of {} URLs.", report.stored.len(), report.dispatched);
            print_numbered(&report.stored);
        }
    }
}

fn print_rerate(report: &RerateReport) {
    for id in &report.not_found {
        println!("Entry {id} not found.");
    }
    for (id, reason) in &report.failed {
        println!("Entry {id}: {reason}");
    }
    for change in &report.updated {
        println!("[{:>4}] {}: {:.2} -> {:.2}", change.id, change.name, change.previous, change.current);
    }
    println!("{} updated, {} unchanged.", report.updated.len(), report.unchanged);
    if let Some(list) = &report.list {
        print_numbered(list);
    }
}
