mod display;
mod parser;
mod repl;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use litreview_client::{
    Delivery, ExportCoordinator, HttpService, JobPoller, JobService, PollHandle,
    ReviewWorkspace, SearchService,
};
use litreview_core::search::DEFAULT_RELATED_K;
use litreview_core::{
    ArtifactKind, ExportFormat, FilterSet, LlmProvider, ParsedFragment, RefinementSession,
    RunRequest, SearchRequest, SearchResponse, ServiceConfig, merge,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::parser::{DIRECTIVES, DirectiveParser, parse_directives};
use crate::repl::{HELP, Input, parse_input};

#[derive(Parser, Debug)]
#[command(
    name = "litreview",
    about = "Run, refine, and export literature reviews against a litreview analysis service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Service base URL [env: LITREVIEW_BACKEND_URL, default: http://localhost:8000]
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds [env: LITREVIEW_HTTP_TIMEOUT_SECS, default: 30]
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a review job
    Run {
        /// Research topic
        topic: String,
        #[arg(long)]
        since: Option<i32>,
        #[arg(long)]
        until: Option<i32>,
        /// Comma-separated keywords that must appear
        #[arg(long)]
        include: Option<String>,
        /// Comma-separated keywords to exclude
        #[arg(long)]
        exclude: Option<String>,
        /// Comma-separated venues
        #[arg(long)]
        venues: Option<String>,
        #[arg(long, default_value_t = litreview_core::DEFAULT_LIMIT)]
        limit: u32,
        /// LLM used for summarisation (openai or anthropic)
        #[arg(long)]
        provider: Option<LlmProvider>,
        /// Follow the job until it finishes
        #[arg(long)]
        watch: bool,
    },
    /// List jobs, most recent first
    Jobs,
    /// Follow a job until it finishes
    Watch { job_id: String },
    /// Download a finished job's report
    Download {
        job_id: String,
        /// md, json or csv
        #[arg(default_value = "md")]
        kind: ArtifactKind,
        /// Output file (defaults to <job_id>.<kind>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search the paper index; accepts `key:value` directives
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Retrieval mode
        #[arg(long)]
        mode: Option<String>,
        /// Show abstracts
        #[arg(long)]
        abstracts: bool,
    },
    /// Papers related to one paper
    Related {
        paper_id: String,
        #[arg(short, default_value_t = DEFAULT_RELATED_K)]
        k: u32,
    },
    /// Ask a question about a set of papers
    Ask {
        question: String,
        /// Paper ids to ground the answer in
        #[arg(long = "paper", num_args = 1..)]
        papers: Vec<String>,
    },
    /// Search, then export the results
    Export {
        /// markdown, bibtex, ris, json, csv or pdf
        format: ExportFormat,
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Interactive search and refinement
    Session {
        #[arg(long)]
        mode: Option<String>,
    },
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::from_env();
        if let Some(url) = &self.base_url {
            config = ServiceConfig::new(url).with_timeout(config.timeout);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.service_config();
    tracing::debug!(base_url = %config.base_url, timeout = ?config.timeout, "litreview v{}", env!("CARGO_PKG_VERSION"));
    let service = Arc::new(HttpService::new(&config).context("building HTTP client")?);

    match cli.command {
        Command::Run {
            topic,
            since,
            until,
            include,
            exclude,
            venues,
            limit,
            provider,
            watch,
        } => {
            let split = |s: Option<String>| -> Vec<String> {
                s.map(|s| s.split(',').map(|p| p.trim().to_string()).collect())
                    .unwrap_or_default()
            };
            let fragment = ParsedFragment {
                start_year: since,
                end_year: until,
                include_keywords: split(include),
                exclude_keywords: split(exclude),
                venues: split(venues),
                limit: Some(limit),
                ..ParsedFragment::default()
            };
            let filters = merge(&FilterSet::new(), &fragment);
            let mut request = RunRequest::new(topic, &filters);
            if let Some(provider) = provider {
                request = request.with_provider(provider);
            }

            if watch {
                let handle = JobPoller::new(service).submit(request);
                follow_job(&handle).await?;
            } else {
                let job = service.run_job(&request).await.context("submitting job")?;
                println!("submitted {}", job.job_id);
                println!("follow with: litreview watch {}", job.job_id);
            }
        }
        Command::Jobs => {
            let jobs = service.list_jobs().await.context("listing jobs")?;
            display::print_jobs_table(&jobs);
        }
        Command::Watch { job_id } => {
            let handle = JobPoller::new(service).watch(job_id);
            follow_job(&handle).await?;
        }
        Command::Download {
            job_id,
            kind,
            output,
        } => {
            let bytes = service
                .download(&job_id, kind)
                .await
                .with_context(|| format!("downloading {kind} report of {job_id}"))?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{job_id}.{kind}")));
            write_file(&path, &bytes)?;
        }
        Command::Search {
            query,
            mode,
            abstracts,
        } => {
            let (_, response) = one_shot_search(&service, &query.join(" "), mode).await?;
            display::print_papers(&response);
            if abstracts {
                println!();
                display::print_abstracts(&response);
            }
        }
        Command::Related { paper_id, k } => {
            let related = service
                .related(&paper_id, k)
                .await
                .context("fetching related papers")?;
            display::print_related(&paper_id, &related);
        }
        Command::Ask { question, papers } => {
            let answer = service.ask(&question, &papers).await.context("asking")?;
            println!("{answer}");
        }
        Command::Export { format, query, dir } => {
            let (filters, response) = one_shot_search(&service, &query.join(" "), None).await?;
            let exporter = ExportCoordinator::new(service);
            let file = exporter
                .export(format, &filters, &response)
                .await
                .with_context(|| format!("exporting {format}"))?;
            write_file(&dir.join(&file.filename), &file.bytes)?;
        }
        Command::Session { mode } => run_session(service, mode).await?,
    }

    Ok(())
}

async fn one_shot_search(
    service: &HttpService,
    text: &str,
    mode: Option<String>,
) -> anyhow::Result<(FilterSet, SearchResponse)> {
    let intent = RefinementSession::new(DirectiveParser).search(text)?;
    let mut request = SearchRequest::from_intent(&intent);
    if let Some(mode) = mode {
        request = request.with_mode(mode);
    }
    let response = litreview_client::retry_transient("search", || service.search(&request))
        .await
        .context("searching")?;
    Ok((intent.filters, response))
}

/// Print progress until the job settles. Ctrl-C stops following.
async fn follow_job(handle: &PollHandle) -> anyhow::Result<()> {
    let mut rx = handle.subscribe();
    let mut last_shown = None;
    let snapshot = loop {
        let snapshot = rx.borrow_and_update().clone();
        let shown = (snapshot.phase, snapshot.polls, snapshot.last_error.clone());
        if last_shown.as_ref() != Some(&shown) {
            display::print_job_progress(&snapshot);
            last_shown = Some(shown);
        }
        if snapshot.is_settled() {
            break snapshot;
        }
        tokio::select! {
            changed = rx.changed() => changed.context("job channel closed")?,
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                println!("stopped following; resume with: litreview watch <job-id>");
                return Ok(());
            }
        }
    };

    if let Some(job) = &snapshot.job {
        println!();
        display::print_job_card(job);
    }
    if snapshot.stopped {
        bail!(
            "stopped polling: {}",
            snapshot.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

async fn run_session(service: Arc<HttpService>, mode: Option<String>) -> anyhow::Result<()> {
    let mut workspace = ReviewWorkspace::new(DirectiveParser, Arc::clone(&service));
    if let Some(mode) = mode {
        workspace = workspace.with_mode(mode);
    }
    let exporter = ExportCoordinator::new(service);

    println!("litreview session. Type a topic to search, :help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            break;
        };
        let input = match parse_input(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let pending = match input {
            Input::Utterance(text) => {
                let has_result = workspace.channel().snapshot().result.is_some();
                if has_result {
                    workspace.refine(&text)
                } else {
                    workspace.search(&text)
                }
            }
            Input::Fresh(text) => workspace.search(&text),
            Input::Set(directives) => Ok(workspace.apply(&parse_directives(&directives))),
            Input::Remove { field, value } => {
                Ok(workspace.remove_constraint(field, value.as_deref()))
            }
            Input::Clear => Ok(workspace.clear_all()),
            Input::Filters => {
                print!("{}", display::render_filters(workspace.session().filters()));
                continue;
            }
            Input::Advanced => {
                let open = workspace.toggle_advanced();
                println!("query display {}", if open { "on" } else { "off" });
                continue;
            }
            Input::Abstracts => {
                match workspace.channel().snapshot().result {
                    Some(result) => display::print_abstracts(&result),
                    None => eprintln!("nothing to show yet"),
                }
                continue;
            }
            Input::Export(format) => {
                let Some(result) = workspace.channel().snapshot().result else {
                    eprintln!("nothing to export yet");
                    continue;
                };
                match exporter
                    .export(format, workspace.session().filters(), &result)
                    .await
                {
                    Ok(file) => write_file(Path::new(&file.filename), &file.bytes)?,
                    Err(e) => eprintln!("export failed: {e}"),
                }
                continue;
            }
            Input::Related(paper_id) => {
                match workspace.related(&paper_id).await {
                    Ok(related) => display::print_related(&paper_id, &related),
                    Err(e) => eprintln!("related failed: {e}"),
                }
                continue;
            }
            Input::Ask(question) => {
                match workspace.ask(&question).await {
                    Ok(answer) => println!("{answer}"),
                    Err(e) => eprintln!("ask failed: {e}"),
                }
                continue;
            }
            Input::Help => {
                println!("{HELP}\n\nDirectives:");
                for (syntax, meaning) in DIRECTIVES {
                    println!("  {syntax:<24}{meaning}");
                }
                continue;
            }
            Input::Quit => break,
        };

        let handle = match pending {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        display::print_search_state(&workspace.channel().snapshot());
        let delivery = handle.await.context("search task panicked")?;
        let snapshot = workspace.channel().snapshot();
        match delivery {
            Delivery::Applied => {
                if let Some(result) = &snapshot.result {
                    display::print_papers(result);
                }
                if workspace.session().context().advanced_open() {
                    print!("{}", display::render_filters(workspace.session().filters()));
                }
            }
            Delivery::Failed => display::print_search_state(&snapshot),
            Delivery::Stale => {}
        }
    }
    Ok(())
}
