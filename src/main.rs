use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod knowledge;
mod semantic;
mod snapshot;
#[cfg(test)]
mod tests;
mod web;

use cli::Command;
use config::Config;
use knowledge::EntryKind;
use semantic::{FastEmbedder, SearchService, UserProfile};
use snapshot::BuildInput;

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "kbsearch=debug,tower_http=debug"
    } else {
        "kbsearch=info,tower_http=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let base_path = config::resolve_base_path(args.base_path)?;
    let mut config = Config::load_with(&base_path)
        .with_context(|| format!("failed to load config from {}", base_path.display()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match args.command {
        Command::Search {
            query,
            limit,
            min_score,
        } => {
            if let Some(limit) = limit {
                config.search.limit = limit;
            }
            if let Some(min_score) = min_score {
                config.search.min_score = min_score;
            }
            config.validate()?;
            let service = SearchService::from_config(&config)?;
            let hits = runtime.block_on(service.search(&query.join(" ")))?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }

        Command::Recommend {
            role,
            interest,
            limit,
        } => {
            if let Some(limit) = limit {
                config.search.recommend_limit = limit;
            }
            config.validate()?;
            let profile = UserProfile {
                role,
                interests: interest,
            };
            let service = SearchService::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&service.recommend(&profile))?);
        }

        Command::Serve { listen, eager } => {
            let listen = listen.unwrap_or_else(|| config.server.listen.clone());
            let service = Arc::new(SearchService::from_config(&config)?);
            let options = service.options();
            log::info!(
                "Ranking with min_score {} and limit {}",
                options.min_score,
                options.limit
            );

            runtime.block_on(async {
                if eager {
                    service.initialize().await?;
                }
                web::serve(service, &listen).await
            })?;
        }

        Command::Build {
            laws,
            schemes,
            output,
        } => {
            let inputs: Vec<BuildInput> = [(laws, EntryKind::Law), (schemes, EntryKind::Scheme)]
                .into_iter()
                .filter_map(|(path, kind)| path.map(|path| BuildInput { path, kind }))
                .collect();
            if inputs.is_empty() {
                bail!("nothing to build, pass --laws and/or --schemes");
            }

            let embedder = FastEmbedder::new(
                &config.search.model,
                config.base_path().to_path_buf(),
                Some(std::time::Duration::from_secs(
                    config.search.download_timeout_secs,
                )),
            )?;
            log::info!("Embedding with {} ({} dimensions)", embedder.name(), embedder.dimensions());
            let report = snapshot::build(&inputs, &embedder, &output, true)?;
            println!(
                "{} entries written to {} ({} skipped, {} dimensions)\ntext digest {}",
                report.written,
                output.display(),
                report.skipped,
                report.dimensions.unwrap_or_default(),
                report.text_digest
            );
        }
    }

    Ok(())
}
